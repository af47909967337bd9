//! 订单查询智能体

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{order_ids, AgentKind, AgentPayload, AgentResult, WorkerAgent};
use crate::error::AgentError;
use crate::parser::EntityRef;
use crate::store::OrderStore;

/// 按订单编号查询订单状态（支付 / 发货进度）
pub struct OrderAgent {
    store: Arc<dyn OrderStore>,
}

impl OrderAgent {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WorkerAgent for OrderAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Order
    }

    async fn handle(&self, entities: &[EntityRef]) -> AgentResult {
        let ids = order_ids(entities);
        if ids.is_empty() {
            return Err(AgentError::InvalidInput("缺少订单编号".to_string()));
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            tracing::debug!(order_id = id, "查询订单");
            // NotFound / 连接错误原样上抛，是否重试由外层判定
            let record = self.store.fetch_order(id).await?;
            records.push(record);
        }
        Ok(AgentPayload::Orders(records))
    }
}

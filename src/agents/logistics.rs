//! 物流查询智能体

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{order_ids, AgentKind, AgentPayload, AgentResult, WorkerAgent};
use crate::error::AgentError;
use crate::parser::EntityRef;
use crate::store::LogisticsStore;

/// 按订单编号查询物流轨迹
pub struct LogisticsAgent {
    store: Arc<dyn LogisticsStore>,
}

impl LogisticsAgent {
    pub fn new(store: Arc<dyn LogisticsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WorkerAgent for LogisticsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Logistics
    }

    async fn handle(&self, entities: &[EntityRef]) -> AgentResult {
        let ids = order_ids(entities);
        if ids.is_empty() {
            return Err(AgentError::InvalidInput("缺少订单编号".to_string()));
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            tracing::debug!(order_id = id, "查询物流");
            let record = self.store.fetch_logistics(id).await?;
            records.push(record);
        }
        Ok(AgentPayload::Logistics(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockLogisticsStore;

    #[tokio::test]
    async fn test_handle_returns_structured_payload() {
        let agent = LogisticsAgent::new(Arc::new(MockLogisticsStore::new()));
        match agent
            .handle(&[EntityRef::order_id("ORD002")])
            .await
            .unwrap()
        {
            AgentPayload::Logistics(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].logistics_status, "运输中");
                assert_eq!(records[0].current_location.as_deref(), Some("北京转运中心"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_logistics_is_fatal() {
        let agent = LogisticsAgent::new(Arc::new(MockLogisticsStore::new()));
        let err = agent
            .handle(&[EntityRef::order_id("ORD999")])
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::NotFound { id: "ORD999".into() });
    }
}

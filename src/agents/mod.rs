//! 工作智能体层
//!
//! WorkerAgent 是按能力划分的无状态单元：订单 / 物流各答一类子查询；
//! SummaryAgent 不查询数据，只把终态结果渲染成用户回复。
//! 智能体自身从不重试，重试归外层 retry 模块统一负责。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::parser::{EntityKind, EntityRef};
use crate::store::{LogisticsRecord, OrderRecord};

pub mod logistics;
pub mod order;
pub mod summary;

pub use logistics::LogisticsAgent;
pub use order::OrderAgent;
pub use summary::SummaryAgent;

/// 智能体种类：排序即汇总输出的稳定顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Order,
    Logistics,
}

impl AgentKind {
    /// 面向用户文案中的类别名
    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::Order => "订单",
            AgentKind::Logistics => "物流",
        }
    }
}

/// 智能体成功时返回的结构化载荷，渲染为文本是 SummaryAgent 的事
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPayload {
    Orders(Vec<OrderRecord>),
    Logistics(Vec<LogisticsRecord>),
}

/// 一次任务的终态结果
pub type AgentResult = Result<AgentPayload, AgentError>;

/// 工作智能体契约：handle 必须幂等（外层可能因重试多次调用）
#[async_trait]
pub trait WorkerAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn handle(&self, entities: &[EntityRef]) -> AgentResult;
}

/// 取出实体中的订单编号
pub(crate) fn order_ids(entities: &[EntityRef]) -> Vec<&str> {
    entities
        .iter()
        .filter(|e| e.kind == EntityKind::OrderId)
        .map(|e| e.value.as_str())
        .collect()
}

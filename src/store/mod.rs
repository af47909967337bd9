//! 后端数据存储：订单 / 物流查询接口与记录形状
//!
//! 编排核心只消费这里的契约；具体实现（Mock / 真实服务）由装配方注入。
//! 错误沿用 AgentError 分类：NotFound 致命，连接 / 超时可由外层重试。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

pub mod mock;

pub use mock::{MockLogisticsStore, MockOrderStore};

/// 订单内单件商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

/// 订单记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub order_status: String,
    pub payment_status: String,
    pub shipping_status: String,
    pub total_amount: f64,
    pub items: Vec<OrderItem>,
}

/// 单条物流轨迹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub time: DateTime<Utc>,
    pub status: String,
    pub location: String,
}

/// 物流记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsRecord {
    pub order_id: String,
    pub logistics_status: String,
    pub current_location: Option<String>,
    pub estimated_delivery: Option<String>,
    pub tracking_history: Vec<TrackingEvent>,
}

/// 订单存储
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn fetch_order(&self, order_id: &str) -> Result<OrderRecord, AgentError>;
}

/// 物流存储（按订单编号检索）
#[async_trait]
pub trait LogisticsStore: Send + Sync {
    async fn fetch_logistics(&self, order_id: &str) -> Result<LogisticsRecord, AgentError>;
}

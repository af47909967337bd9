//! Mock 数据存储：内存固定数据，无需外部服务
//!
//! ORD001 ~ ORD005 覆盖待发货 / 运输中 / 已送达 / 已取消 / 支付中等状态。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AgentError;
use crate::store::{
    LogisticsRecord, LogisticsStore, OrderItem, OrderRecord, OrderStore, TrackingEvent,
};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("固定时间戳")
}

fn item(product_id: &str, name: &str, quantity: u32, price: f64) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        name: name.to_string(),
        quantity,
        price,
    }
}

fn event(time: &str, status: &str, location: &str) -> TrackingEvent {
    TrackingEvent {
        time: ts(time),
        status: status.to_string(),
        location: location.to_string(),
    }
}

/// 内存订单存储
pub struct MockOrderStore {
    orders: HashMap<String, OrderRecord>,
}

impl Default for MockOrderStore {
    fn default() -> Self {
        let records = vec![
            OrderRecord {
                order_id: "ORD001".to_string(),
                created_at: ts("2024-01-01T10:00:00Z"),
                order_status: "待发货".to_string(),
                payment_status: "已支付".to_string(),
                shipping_status: "未发货".to_string(),
                total_amount: 299.00,
                items: vec![
                    item("P001", "商品A", 1, 199.00),
                    item("P002", "商品B", 1, 100.00),
                ],
            },
            OrderRecord {
                order_id: "ORD002".to_string(),
                created_at: ts("2024-01-02T14:30:00Z"),
                order_status: "已发货".to_string(),
                payment_status: "已支付".to_string(),
                shipping_status: "运输中".to_string(),
                total_amount: 599.00,
                items: vec![item("P003", "商品C", 2, 299.50)],
            },
            OrderRecord {
                order_id: "ORD003".to_string(),
                created_at: ts("2024-01-03T09:15:00Z"),
                order_status: "已完成".to_string(),
                payment_status: "已支付".to_string(),
                shipping_status: "已送达".to_string(),
                total_amount: 899.00,
                items: vec![item("P004", "商品D", 1, 899.00)],
            },
            OrderRecord {
                order_id: "ORD004".to_string(),
                created_at: ts("2024-01-04T16:45:00Z"),
                order_status: "已取消".to_string(),
                payment_status: "未支付".to_string(),
                shipping_status: "未发货".to_string(),
                total_amount: 399.00,
                items: vec![item("P005", "商品E", 1, 399.00)],
            },
            OrderRecord {
                order_id: "ORD005".to_string(),
                created_at: ts("2024-01-05T08:00:00Z"),
                order_status: "支付中".to_string(),
                payment_status: "待支付".to_string(),
                shipping_status: "未发货".to_string(),
                total_amount: 1599.00,
                items: vec![item("P006", "商品F", 1, 1599.00)],
            },
        ];
        Self {
            orders: records
                .into_iter()
                .map(|r| (r.order_id.clone(), r))
                .collect(),
        }
    }
}

impl MockOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MockOrderStore {
    async fn fetch_order(&self, order_id: &str) -> Result<OrderRecord, AgentError> {
        self.orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| AgentError::NotFound {
                id: order_id.to_string(),
            })
    }
}

/// 内存物流存储
pub struct MockLogisticsStore {
    logistics: HashMap<String, LogisticsRecord>,
}

impl Default for MockLogisticsStore {
    fn default() -> Self {
        let records = vec![
            LogisticsRecord {
                order_id: "ORD001".to_string(),
                logistics_status: "未发货".to_string(),
                current_location: Some("上海仓库".to_string()),
                estimated_delivery: None,
                tracking_history: vec![event("2024-01-01T10:00:00Z", "订单创建", "上海仓库")],
            },
            LogisticsRecord {
                order_id: "ORD002".to_string(),
                logistics_status: "运输中".to_string(),
                current_location: Some("北京转运中心".to_string()),
                estimated_delivery: Some("3天".to_string()),
                tracking_history: vec![
                    event("2024-01-02T14:30:00Z", "订单创建", "上海仓库"),
                    event("2024-01-02T18:00:00Z", "已发货", "上海仓库"),
                    event("2024-01-03T08:00:00Z", "运输中", "北京转运中心"),
                ],
            },
            LogisticsRecord {
                order_id: "ORD003".to_string(),
                logistics_status: "已送达".to_string(),
                current_location: Some("北京市朝阳区XX路XX号".to_string()),
                estimated_delivery: Some("已送达".to_string()),
                tracking_history: vec![
                    event("2024-01-03T09:15:00Z", "订单创建", "广州仓库"),
                    event("2024-01-03T15:00:00Z", "已发货", "广州仓库"),
                    event("2024-01-04T10:00:00Z", "运输中", "上海转运中心"),
                    event("2024-01-04T16:00:00Z", "派送中", "北京市朝阳区配送站"),
                    event("2024-01-04T18:30:00Z", "已送达", "北京市朝阳区XX路XX号"),
                ],
            },
            LogisticsRecord {
                order_id: "ORD004".to_string(),
                logistics_status: "已取消".to_string(),
                current_location: None,
                estimated_delivery: None,
                tracking_history: vec![
                    event("2024-01-04T16:45:00Z", "订单创建", "深圳仓库"),
                    event("2024-01-04T17:00:00Z", "已取消", "深圳仓库"),
                ],
            },
            LogisticsRecord {
                order_id: "ORD005".to_string(),
                logistics_status: "待发货".to_string(),
                current_location: Some("杭州仓库".to_string()),
                estimated_delivery: None,
                tracking_history: vec![event("2024-01-05T08:00:00Z", "订单创建", "杭州仓库")],
            },
        ];
        Self {
            logistics: records
                .into_iter()
                .map(|r| (r.order_id.clone(), r))
                .collect(),
        }
    }
}

impl MockLogisticsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogisticsStore for MockLogisticsStore {
    async fn fetch_logistics(&self, order_id: &str) -> Result<LogisticsRecord, AgentError> {
        self.logistics
            .get(order_id)
            .cloned()
            .ok_or_else(|| AgentError::NotFound {
                id: order_id.to_string(),
            })
    }
}

//! 查询解析：实体提取与意图识别
//!
//! 规则路径：正则提取订单编号 + 关键词匹配意图，纯函数、不抛错；
//! 混合路径：规则无法判定时调用 LLM 分类一次，失败则沿用规则结果。

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, LlmError, Message};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// 查询意图（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// 订单状态（支付、发货进度等）
    OrderStatus,
    /// 物流跟踪
    Logistics,
    /// 无法判定
    Unknown,
}

/// 实体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    OrderId,
}

/// 从查询文本中提取出的标识符
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub value: String,
}

impl EntityRef {
    pub fn order_id(value: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::OrderId,
            value: value.into(),
        }
    }
}

/// 解析结果：有序去重的意图集合 + 按出现顺序排列的实体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub intents: BTreeSet<Intent>,
    pub entities: Vec<EntityRef>,
}

impl ParsedQuery {
    /// 是否可以分发给工作智能体
    pub fn is_actionable(&self) -> bool {
        !self.intents.is_empty() && !self.intents.contains(&Intent::Unknown)
    }

    /// 命中多个类别（订单 + 物流）
    pub fn is_combined(&self) -> bool {
        self.intents.len() > 1
    }
}

/// 意图解析策略：规则解析器与混合解析器实现同一契约，编排器不感知差异
#[async_trait]
pub trait IntentParser: Send + Sync {
    async fn parse(&self, text: &str) -> ParsedQuery;
}

/// 订单状态类关键词
const ORDER_TERMS: &[&str] = &[
    "订单", "状态", "支付", "取消", "下单", "order", "status", "payment", "cancel",
];

/// 物流类关键词
const LOGISTICS_TERMS: &[&str] = &[
    "物流", "快递", "发货", "包裹", "配送", "送到", "追踪", "轨迹", "logistics",
    "delivery", "tracking", "shipping",
];

/// 规则查询解析器
pub struct QueryParser {
    /// ORD 前缀 + 至少 3 位数字，大小写不敏感
    order_id_re: Regex,
    /// 无 ORD 前缀时的兜底：4 位以上连续数字
    digits_re: Regex,
}

impl QueryParser {
    pub fn new() -> Self {
        Self {
            order_id_re: Regex::new(r"(?i)ORD[0-9]{3,}").expect("静态正则"),
            digits_re: Regex::new(r"[0-9]{4,}").expect("静态正则"),
        }
    }

    /// 提取订单编号：全部匹配、去重、保留原文出现顺序，统一转大写
    pub fn extract_entities(&self, text: &str) -> Vec<EntityRef> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for m in self.order_id_re.find_iter(text) {
            let id = m.as_str().to_uppercase();
            if seen.insert(id.clone()) {
                entities.push(EntityRef::order_id(id));
            }
        }
        if entities.is_empty() {
            for m in self.digits_re.find_iter(text) {
                let id = m.as_str().to_string();
                if seen.insert(id.clone()) {
                    entities.push(EntityRef::order_id(id));
                }
            }
        }
        entities
    }

    /// 关键词分类：多个类别同时命中则全部返回；
    /// 无关键词但有实体时默认订单状态；两者皆无为 Unknown
    fn classify(&self, text: &str, has_entity: bool) -> BTreeSet<Intent> {
        let lower = text.to_lowercase();
        let mut intents = BTreeSet::new();
        if ORDER_TERMS.iter().any(|t| lower.contains(t)) {
            intents.insert(Intent::OrderStatus);
        }
        if LOGISTICS_TERMS.iter().any(|t| lower.contains(t)) {
            intents.insert(Intent::Logistics);
        }
        if intents.is_empty() {
            if has_entity {
                intents.insert(Intent::OrderStatus);
            } else {
                intents.insert(Intent::Unknown);
            }
        }
        intents
    }

    /// 完整解析，纯函数，畸形输入不抛错
    pub fn parse(&self, text: &str) -> ParsedQuery {
        let entities = self.extract_entities(text);
        let intents = self.classify(text, !entities.is_empty());
        tracing::debug!(?intents, entity_count = entities.len(), "查询解析完成");
        ParsedQuery { intents, entities }
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentParser for QueryParser {
    async fn parse(&self, text: &str) -> ParsedQuery {
        QueryParser::parse(self, text)
    }
}

const CLASSIFY_PROMPT: &str = r#"You are an intent classifier for an e-commerce customer-service assistant. Classify the user's query.

Output ONLY one of these tags (no explanation):
- order_status: order state, payment, shipping progress
- logistics: package tracking, delivery, courier
- combined: both of the above
- unknown: cannot determine

Output format: just the tag, nothing else."#;

/// 混合解析器：规则优先，规则判定为 Unknown 时调用 LLM 分类一次
pub struct HybridQueryParser {
    rules: QueryParser,
    llm: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl HybridQueryParser {
    pub fn new(llm: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self {
            rules: QueryParser::new(),
            llm,
            policy,
        }
    }

    async fn llm_classify(&self, text: &str) -> Result<BTreeSet<Intent>, LlmError> {
        let messages = vec![
            Message::system(CLASSIFY_PROMPT),
            Message::user(format!("User query: {}", text)),
        ];
        let reply = retry_with_backoff(
            &self.policy,
            || self.llm.complete(&messages),
            LlmError::is_retryable,
        )
        .await?;

        let mut intents = BTreeSet::new();
        match reply.trim().to_lowercase().as_str() {
            "order_status" => {
                intents.insert(Intent::OrderStatus);
            }
            "logistics" => {
                intents.insert(Intent::Logistics);
            }
            "combined" => {
                intents.insert(Intent::OrderStatus);
                intents.insert(Intent::Logistics);
            }
            _ => {}
        }
        Ok(intents)
    }
}

#[async_trait]
impl IntentParser for HybridQueryParser {
    async fn parse(&self, text: &str) -> ParsedQuery {
        let parsed = self.rules.parse(text);
        if parsed.is_actionable() {
            return parsed;
        }
        match self.llm_classify(text).await {
            Ok(intents) if !intents.is_empty() => {
                tracing::debug!(?intents, "规则未命中，采用模型分类结果");
                ParsedQuery {
                    intents,
                    entities: parsed.entities,
                }
            }
            Ok(_) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "模型意图识别失败，沿用规则结果");
                parsed
            }
        }
    }
}

//! 结果汇总智能体
//!
//! 对已终态的结果做只读变换：成功载荷按固定规则渲染，失败按错误类别
//! 如实说明，绝不编造数据，也不触发任何新的查询或重试。
//! 配置了 LLM 时先尝试让模型润色，失败回退到规则渲染。

use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::json;

use crate::agents::{AgentKind, AgentPayload, AgentResult};
use crate::error::AgentError;
use crate::llm::{LlmClient, LlmError, Message};
use crate::manager::{FinalResponse, TaskAssignment};
use crate::parser::EntityKind;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::store::{LogisticsRecord, OrderRecord};

const SYSTEM_PROMPT: &str =
    "你是一个专业的电商客服助手，负责整合订单和物流信息，向用户提供清晰、友好的回复。";

/// 结果汇总智能体
pub struct SummaryAgent {
    llm: Option<Arc<dyn LlmClient>>,
    policy: RetryPolicy,
}

impl SummaryAgent {
    /// 纯规则渲染（确定性输出）
    pub fn rule_based() -> Self {
        Self {
            llm: None,
            policy: RetryPolicy::default(),
        }
    }

    /// 规则渲染 + LLM 润色，模型调用经退避重试，失败回退规则结果
    pub fn with_llm(llm: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self {
            llm: Some(llm),
            policy,
        }
    }

    /// 把一组终态结果合成为最终回复
    pub async fn synthesize(
        &self,
        raw_query: &str,
        results: &[(TaskAssignment, AgentResult)],
    ) -> FinalResponse {
        if results.is_empty() || results.iter().all(|(_, r)| r.is_err()) {
            return FinalResponse {
                text: all_failed_text(results),
            };
        }

        let rendered = render(results);

        if let Some(llm) = &self.llm {
            match self.polish(llm.as_ref(), raw_query, results).await {
                Ok(text) if !text.trim().is_empty() => return FinalResponse { text },
                Ok(_) => tracing::warn!("LLM 返回空回复，回退规则渲染"),
                Err(e) => tracing::warn!(error = %e, "LLM 汇总失败，回退规则渲染"),
            }
        }

        FinalResponse { text: rendered }
    }

    async fn polish(
        &self,
        llm: &dyn LlmClient,
        raw_query: &str,
        results: &[(TaskAssignment, AgentResult)],
    ) -> Result<String, LlmError> {
        let structured: Vec<_> = results
            .iter()
            .map(|(assignment, result)| match result {
                Ok(payload) => json!({
                    "agent_kind": assignment.agent_kind,
                    "success": true,
                    "payload": payload,
                }),
                Err(e) => json!({
                    "agent_kind": assignment.agent_kind,
                    "success": false,
                    "error": e.to_string(),
                }),
            })
            .collect();

        let prompt = format!(
            "用户查询: {}\n\n结构化查询结果(JSON):\n{}\n\n\
             请基于以上信息生成一个清晰、友好、专业的中文回复，直接回答用户的问题；\
             查询失败的部分请如实说明，不要编造任何数据。",
            raw_query,
            serde_json::to_string_pretty(&structured).unwrap_or_default()
        );

        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        retry_with_backoff(
            &self.policy,
            || llm.complete(&messages),
            LlmError::is_retryable,
        )
        .await
    }
}

/// 全部失败时的单条明确失败语句
fn all_failed_text(results: &[(TaskAssignment, AgentResult)]) -> String {
    let not_found = results.iter().find_map(|(_, r)| match r {
        Err(AgentError::NotFound { id }) => Some(id.clone()),
        _ => None,
    });
    if let Some(id) = not_found {
        return format!("未找到订单 {} 的相关信息，请确认订单编号是否正确。", id);
    }
    if results
        .iter()
        .any(|(_, r)| matches!(r, Err(AgentError::Timeout)))
    {
        return "查询超时，请稍后再试。".to_string();
    }
    "抱歉，暂时无法获取相关信息，请稍后再试。".to_string()
}

/// 确定性渲染：输入顺序（按 AgentKind 排序）即输出顺序
fn render(results: &[(TaskAssignment, AgentResult)]) -> String {
    let mut out = String::new();
    match first_order_id(results) {
        Some(id) => {
            let _ = writeln!(out, "关于订单 {}：", id);
        }
        None => {
            let _ = writeln!(out, "查询结果：");
        }
    }

    for (assignment, result) in results {
        out.push('\n');
        match result {
            Ok(AgentPayload::Orders(records)) => {
                for record in records {
                    render_order(&mut out, record);
                }
            }
            Ok(AgentPayload::Logistics(records)) => {
                for record in records {
                    render_logistics(&mut out, record);
                }
            }
            Err(e) => render_failure(&mut out, assignment.agent_kind, e),
        }
    }
    out
}

fn first_order_id(results: &[(TaskAssignment, AgentResult)]) -> Option<&str> {
    results.iter().find_map(|(assignment, _)| {
        assignment
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::OrderId)
            .map(|e| e.value.as_str())
    })
}

fn render_order(out: &mut String, record: &OrderRecord) {
    let _ = writeln!(out, "【订单信息】{}", record.order_id);
    let _ = writeln!(out, "- 订单状态：{}", record.order_status);
    let _ = writeln!(out, "- 支付状态：{}", record.payment_status);
    let _ = writeln!(out, "- 发货状态：{}", record.shipping_status);
    let _ = writeln!(out, "- 订单金额：¥{:.2}", record.total_amount);
    let _ = writeln!(out, "- 商品数量：{} 件", record.items.len());
    if let Some(advice) = order_advice(record) {
        let _ = writeln!(out, "{}", advice);
    }
}

/// 依订单状态给出的固定建议语
fn order_advice(record: &OrderRecord) -> Option<&'static str> {
    if record.order_status.contains("待发货") && record.payment_status.contains("已支付") {
        Some("您的订单已完成支付，商家正在准备发货，请耐心等待。")
    } else if record.payment_status.contains("待支付") {
        Some("您的订单尚未支付，请尽快完成支付以便商家发货。")
    } else if record.order_status.contains("已取消") {
        Some("您的订单已取消。")
    } else if record.order_status.contains("已完成") {
        Some("您的订单已完成。")
    } else {
        None
    }
}

fn render_logistics(out: &mut String, record: &LogisticsRecord) {
    let _ = writeln!(out, "【物流信息】{}", record.order_id);
    let _ = writeln!(out, "- 物流状态：{}", record.logistics_status);
    let _ = writeln!(
        out,
        "- 当前位置：{}",
        record.current_location.as_deref().unwrap_or("未知")
    );
    let _ = writeln!(
        out,
        "- 预计送达：{}",
        record.estimated_delivery.as_deref().unwrap_or("暂无")
    );
    if let Some(latest) = record.tracking_history.last() {
        let _ = writeln!(
            out,
            "- 最新轨迹：{} {} @ {}",
            latest.time.format("%Y-%m-%d %H:%M"),
            latest.status,
            latest.location
        );
    }
}

/// 失败按类别如实降级说明，不编造字段
fn render_failure(out: &mut String, kind: AgentKind, error: &AgentError) {
    let label = kind.label();
    let line = match error {
        AgentError::NotFound { id } => {
            format!("未找到订单 {} 的{}信息，请确认订单编号是否正确。", id, label)
        }
        AgentError::Timeout => format!("{}信息查询超时，请稍后再试。", label),
        other => format!("{}信息暂时无法获取：{}。", label, other),
    };
    let _ = writeln!(out, "{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::parser::EntityRef;
    use crate::store::{MockLogisticsStore, MockOrderStore, OrderStore};
    use crate::store::LogisticsStore;
    use async_trait::async_trait;
    use std::time::Duration;
    use uuid::Uuid;

    fn assignment(kind: AgentKind, entities: Vec<EntityRef>) -> TaskAssignment {
        TaskAssignment {
            agent_kind: kind,
            query_id: Uuid::new_v4(),
            entities,
        }
    }

    async fn ord001_results() -> Vec<(TaskAssignment, AgentResult)> {
        let order = MockOrderStore::new().fetch_order("ORD001").await.unwrap();
        let logistics = MockLogisticsStore::new()
            .fetch_logistics("ORD001")
            .await
            .unwrap();
        vec![
            (
                assignment(AgentKind::Order, vec![EntityRef::order_id("ORD001")]),
                Ok(AgentPayload::Orders(vec![order])),
            ),
            (
                assignment(AgentKind::Logistics, vec![EntityRef::order_id("ORD001")]),
                Ok(AgentPayload::Logistics(vec![logistics])),
            ),
        ]
    }

    #[tokio::test]
    async fn test_renders_success_payloads() {
        let agent = SummaryAgent::rule_based();
        let results = ord001_results().await;
        let response = agent.synthesize("我的订单ORD001为什么还没发货？", &results).await;
        assert!(response.text.contains("关于订单 ORD001"));
        assert!(response.text.contains("待发货"));
        assert!(response.text.contains("已支付"));
        assert!(response.text.contains("未发货"));
        assert!(response.text.contains("商家正在准备发货"));
    }

    #[tokio::test]
    async fn test_partial_failure_is_honest() {
        let agent = SummaryAgent::rule_based();
        let order = MockOrderStore::new().fetch_order("ORD002").await.unwrap();
        let results = vec![
            (
                assignment(AgentKind::Order, vec![EntityRef::order_id("ORD002")]),
                Ok(AgentPayload::Orders(vec![order])),
            ),
            (
                assignment(AgentKind::Logistics, vec![EntityRef::order_id("ORD002")]),
                Err(AgentError::Timeout),
            ),
        ];
        let response = agent.synthesize("ORD002到哪了", &results).await;
        assert!(response.text.contains("运输中"));
        assert!(response.text.contains("物流信息查询超时"));
    }

    #[tokio::test]
    async fn test_all_failed_single_statement() {
        let agent = SummaryAgent::rule_based();
        let results = vec![(
            assignment(AgentKind::Order, vec![EntityRef::order_id("ORD999")]),
            Err(AgentError::NotFound { id: "ORD999".into() }),
        )];
        let response = agent.synthesize("ORD999", &results).await;
        assert!(response.text.contains("未找到订单 ORD999"));
        assert!(!response.text.contains("支付状态"));
        assert!(!response.text.contains("物流状态"));
    }

    #[tokio::test]
    async fn test_llm_polish_replaces_rendered_text() {
        let llm = Arc::new(MockLlmClient::with_reply("您的订单很快就到。"));
        let agent = SummaryAgent::with_llm(llm, RetryPolicy::default());
        let results = ord001_results().await;
        let response = agent.synthesize("ORD001呢", &results).await;
        assert_eq!(response.text, "您的订单很快就到。");
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_rules() {
        struct FailingLlm;

        #[async_trait]
        impl LlmClient for FailingLlm {
            async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
                Err(LlmError::InvalidResponse("boom".into()))
            }
        }

        let policy = RetryPolicy::new().with_initial_delay(Duration::from_millis(1));
        let agent = SummaryAgent::with_llm(Arc::new(FailingLlm), policy);
        let results = ord001_results().await;
        let response = agent.synthesize("ORD001呢", &results).await;
        assert!(response.text.contains("待发货"));
    }
}

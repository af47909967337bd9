//! 智能体编排器
//!
//! 主流程：解析查询 → 意图路由（静态表）→ 并行分发（每个任务外层包退避重试）
//! → 共享超时下汇合 → 交给 SummaryAgent 合成最终回复。
//! 任何单个智能体的失败都不中断整体流程，失败以显式标记进入汇总。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use uuid::Uuid;

use crate::agents::{AgentKind, AgentResult, SummaryAgent, WorkerAgent};
use crate::error::AgentError;
use crate::parser::{EntityRef, Intent, IntentParser, ParsedQuery, QueryParser};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// 一次用户请求，创建后只读
#[derive(Debug, Clone)]
pub struct Query {
    pub id: Uuid,
    pub raw_text: String,
    pub received_at: DateTime<Utc>,
}

impl Query {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_text: raw_text.into(),
            received_at: Utc::now(),
        }
    }
}

/// 分发给某一类智能体的一个任务，连同其重试一起恰好消费一次
#[derive(Debug, Clone, PartialEq)]
pub struct TaskAssignment {
    pub agent_kind: AgentKind,
    pub query_id: Uuid,
    pub entities: Vec<EntityRef>,
}

/// 返回给调用方的最终回复
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResponse {
    pub text: String,
}

/// 未识别出意图时的兜底回复
pub const CANNED_UNKNOWN: &str =
    "抱歉，我没有理解您的问题，请提供订单编号或说明您想查询的内容。";

/// 意图 → 智能体种类的静态路由表
fn route(intent: Intent) -> &'static [AgentKind] {
    match intent {
        Intent::OrderStatus => &[AgentKind::Order],
        Intent::Logistics => &[AgentKind::Logistics],
        Intent::Unknown => &[],
    }
}

/// 智能体编排器：持有解析策略、智能体注册表、重试策略与分发超时
pub struct AgentManager {
    parser: Arc<dyn IntentParser>,
    agents: HashMap<AgentKind, Arc<dyn WorkerAgent>>,
    summary: SummaryAgent,
    policy: RetryPolicy,
    dispatch_timeout: Duration,
}

impl AgentManager {
    pub fn new(
        agents: Vec<Arc<dyn WorkerAgent>>,
        summary: SummaryAgent,
        policy: RetryPolicy,
        dispatch_timeout: Duration,
    ) -> Self {
        let agents: HashMap<_, _> = agents.into_iter().map(|a| (a.kind(), a)).collect();
        tracing::info!(agent_kinds = ?agents.keys().collect::<Vec<_>>(), "编排器初始化完成");
        Self {
            parser: Arc::new(QueryParser::new()),
            agents,
            summary,
            policy,
            dispatch_timeout,
        }
    }

    /// 替换意图解析策略（如换成混合 / 模型分类器）
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn IntentParser>) -> Self {
        self.parser = parser;
        self
    }

    /// 处理一次查询，总是返回 FinalResponse，从不向上抛错
    pub async fn process(&self, query: &Query) -> FinalResponse {
        let started = std::time::Instant::now();
        tracing::info!(query_id = %query.id, raw = %query.raw_text, "开始处理查询");

        let parsed = self.parser.parse(&query.raw_text).await;
        if !parsed.is_actionable() {
            tracing::info!(query_id = %query.id, "未识别出意图，返回兜底回复");
            return FinalResponse {
                text: CANNED_UNKNOWN.to_string(),
            };
        }

        let assignments = self.build_assignments(query, &parsed);
        tracing::info!(
            query_id = %query.id,
            count = assignments.len(),
            kinds = ?assignments.iter().map(|a| a.agent_kind).collect::<Vec<_>>(),
            "分发任务"
        );

        let results = self.dispatch(assignments).await;
        let response = self.summary.synthesize(&query.raw_text, &results).await;

        tracing::info!(
            query_id = %query.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "查询处理完成"
        );
        response
    }

    /// 按路由表构建任务：同一种智能体在一次查询中至多调度一次
    fn build_assignments(&self, query: &Query, parsed: &ParsedQuery) -> Vec<TaskAssignment> {
        let mut kinds = BTreeSet::new();
        for intent in &parsed.intents {
            for kind in route(*intent) {
                if self.agents.contains_key(kind) {
                    kinds.insert(*kind);
                }
            }
        }
        kinds
            .into_iter()
            .map(|agent_kind| TaskAssignment {
                agent_kind,
                query_id: query.id,
                entities: parsed.entities.clone(),
            })
            .collect()
    }

    /// 并行分发并汇合：每个任务必达终态（成功 / 失败 / 超时标记），
    /// 超时后取消仍在飞行的任务，结果按 AgentKind 排序保证汇总确定性
    async fn dispatch(
        &self,
        assignments: Vec<TaskAssignment>,
    ) -> Vec<(TaskAssignment, AgentResult)> {
        let mut set: JoinSet<(TaskAssignment, AgentResult)> = JoinSet::new();
        let mut pending: HashMap<AgentKind, TaskAssignment> = HashMap::new();

        for assignment in assignments {
            let Some(agent) = self.agents.get(&assignment.agent_kind) else {
                continue;
            };
            pending.insert(assignment.agent_kind, assignment.clone());
            let agent = Arc::clone(agent);
            let policy = self.policy.clone();
            set.spawn(async move {
                let result = retry_with_backoff(
                    &policy,
                    || agent.handle(&assignment.entities),
                    AgentError::is_retryable,
                )
                .await;
                (assignment, result)
            });
        }

        let deadline = tokio::time::Instant::now() + self.dispatch_timeout;
        let mut results = Vec::new();
        while !set.is_empty() {
            match timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((assignment, result)))) => {
                    pending.remove(&assignment.agent_kind);
                    results.push((assignment, result));
                }
                Ok(Some(Err(join_err))) => {
                    // 任务 panic：留在 pending 中，循环结束后补失败标记
                    tracing::error!(error = %join_err, "智能体任务异常退出");
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.dispatch_timeout.as_millis() as u64,
                        "分发超时，取消未完成的任务"
                    );
                    set.abort_all();
                    break;
                }
            }
        }

        for (_, assignment) in pending {
            results.push((assignment, Err(AgentError::Timeout)));
        }

        results.sort_by_key(|(a, _)| a.agent_kind);
        results
    }
}

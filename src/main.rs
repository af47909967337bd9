//! Kefu - Rust 多智能体客服系统
//!
//! 入口：初始化日志、装配 Mock 存储与智能体，stdin 交互式查询。

use std::io::BufRead;
use std::sync::Arc;

use kefu::agents::{LogisticsAgent, OrderAgent, SummaryAgent, WorkerAgent};
use kefu::config::{load_config, AppConfig};
use kefu::llm::create_llm_from_config;
use kefu::manager::{AgentManager, Query};
use kefu::parser::HybridQueryParser;
use kefu::store::{MockLogisticsStore, MockOrderStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kefu::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let policy = cfg.retry.to_policy();

    let agents: Vec<Arc<dyn WorkerAgent>> = vec![
        Arc::new(OrderAgent::new(Arc::new(MockOrderStore::new()))),
        Arc::new(LogisticsAgent::new(Arc::new(MockLogisticsStore::new()))),
    ];

    // 有可用 LLM 时走混合解析 + 模型润色，否则纯规则
    let llm = create_llm_from_config(&cfg);
    let summary = match &llm {
        Some(client) => SummaryAgent::with_llm(Arc::clone(client), policy.clone()),
        None => SummaryAgent::rule_based(),
    };
    let mut manager = AgentManager::new(agents, summary, policy.clone(), cfg.dispatch.timeout());
    if let Some(client) = llm {
        manager = manager.with_parser(Arc::new(HybridQueryParser::new(client, policy)));
    }

    println!("Kefu 多智能体客服（Ctrl-D 退出）");
    println!("示例：我的订单ORD001为什么还没发货？");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let query = Query::new(text);
        let response = manager.process(&query).await;
        println!("\n{}", response.text);
    }

    Ok(())
}

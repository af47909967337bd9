//! Kefu - Rust 多智能体客服系统
//!
//! 模块划分：
//! - **agents**: 工作智能体（订单 / 物流）与结果汇总
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: 错误分类（可重试 / 致命）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **manager**: 编排器：意图路由、并行分发、超时汇合
//! - **observability**: tracing 初始化
//! - **parser**: 查询解析（实体提取 + 意图识别）
//! - **retry**: 指数退避重试
//! - **store**: 后端数据存储接口与 Mock 数据

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod manager;
pub mod observability;
pub mod parser;
pub mod retry;
pub mod store;

pub use manager::{AgentManager, FinalResponse, Query};

//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{LlmClient, LlmError, Message, Role};

use crate::config::AppConfig;

/// 根据配置与环境变量选择 LLM 后端；无可用后端时返回 None（走纯规则路径）
pub fn create_llm_from_config(cfg: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    match cfg.llm.provider.to_lowercase().as_str() {
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) => {
                tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
                Some(Arc::new(OpenAiClient::new(
                    cfg.llm.base_url.as_deref(),
                    &cfg.llm.model,
                    Some(&key),
                )))
            }
            Err(_) => {
                tracing::warn!("OPENAI_API_KEY not set, using rule-based pipeline");
                None
            }
        },
        "mock" => Some(Arc::new(MockLlmClient::new())),
        other => {
            tracing::warn!("Unknown LLM provider '{}', using rule-based pipeline", other);
            None
        }
    }
}

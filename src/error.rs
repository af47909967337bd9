//! 智能体错误类型与重试分类
//!
//! 与 retry 模块配合：is_retryable 决定外层重试器是否再次调用；
//! NotFound / InvalidInput 属于数据层面的确定性失败，重试无意义。

use thiserror::Error;

/// 工作智能体及其后端调用可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 订单编号在后端不存在，致命（数据本身缺失）
    #[error("订单不存在: {id}")]
    NotFound { id: String },

    #[error("连接失败: {0}")]
    Connection(String),

    #[error("请求超时")]
    Timeout,

    #[error("请求被限流")]
    RateLimited,

    /// 请求本身不合法（如缺少订单编号），致命
    #[error("无效请求: {0}")]
    InvalidInput(String),
}

impl AgentError {
    /// 瞬时性故障（连接 / 超时 / 限流）可重试，其余直接返回
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Connection(_) | AgentError::Timeout | AgentError::RateLimited
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AgentError::Connection("refused".into()).is_retryable());
        assert!(AgentError::Timeout.is_retryable());
        assert!(AgentError::RateLimited.is_retryable());
        assert!(!AgentError::NotFound { id: "ORD999".into() }.is_retryable());
        assert!(!AgentError::InvalidInput("缺少订单编号".into()).is_retryable());
    }
}

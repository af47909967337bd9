//! 指数退避重试
//!
//! 所有出站调用（后端存储、LLM）统一经由 retry_with_backoff 包裹；
//! 是否重试由调用方传入的 is_retryable 判定，致命错误立即返回。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// 重试策略：共享只读配置，单次调用的计数状态留在函数栈上
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 首次重试前的延迟
    pub initial_delay: Duration,
    /// 退避因子
    pub multiplier: f64,
    /// 延迟上限
    pub max_delay: Duration,
    /// 总调用次数上限（含首次）
    pub max_attempts: u32,
    /// 是否在延迟上叠加最多 25% 的抖动
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            max_attempts: 3,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// 下一轮延迟：当前值乘退避因子，封顶 max_delay
    fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier)
            .min(self.max_delay.as_millis() as f64);
        Duration::from_millis(next_ms as u64)
    }

    /// 启用抖动时在 [delay, delay * 1.25) 内取值
    fn apply_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let range = delay.as_millis() as u64 / 4;
        delay + Duration::from_millis(pseudo_jitter(range))
    }
}

/// 简易伪随机抖动，用系统时钟纳秒做源，避免引入 rand 依赖
fn pseudo_jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % max
}

/// 以退避策略执行一次逻辑调用
///
/// 成功立即返回；致命错误（is_retryable 为 false）不重试；
/// 可重试错误在 sleep（挂起点，不阻塞其它任务）后再次调用，
/// 次数耗尽时返回最后一次的错误。
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delay = policy.initial_delay;
    for attempt in 1..=policy.max_attempts.max(1) {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "重试后调用成功");
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable(&e) {
                    tracing::debug!(attempt, error = %e, "致命错误，不重试");
                    return Err(e);
                }
                if attempt >= policy.max_attempts.max(1) {
                    tracing::warn!(attempt, error = %e, "重试次数耗尽");
                    return Err(e);
                }
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "调用失败，等待后重试"
                );
                sleep(policy.apply_jitter(delay)).await;
                delay = policy.next_delay(delay);
            }
        }
    }
    unreachable!("重试循环必然从成功或错误分支返回")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.multiplier, 2.0);
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert_eq!(policy.max_attempts, 3);
        assert!(!policy.jitter);
    }

    #[test]
    fn test_next_delay_doubles_and_clamps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(policy.next_delay(Duration::from_secs(2)), Duration::from_secs(4));
        assert_eq!(policy.next_delay(Duration::from_secs(8)), Duration::from_secs(10));
        assert_eq!(policy.next_delay(Duration::from_secs(10)), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::new().with_jitter(true);
        let base = Duration::from_millis(1000);
        for _ in 0..10 {
            let jittered = policy.apply_jitter(base);
            assert!(jittered >= base);
            assert!(jittered < base + Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn test_success_first_attempt_no_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<u32, AgentError> = retry_with_backoff(
            &RetryPolicy::default(),
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
            AgentError::is_retryable,
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_invoked_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<u32, AgentError> = retry_with_backoff(
            &RetryPolicy::default().with_max_attempts(5),
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(AgentError::NotFound { id: "ORD999".into() })
                }
            },
            AgentError::is_retryable,
        )
        .await;
        assert_eq!(result, Err(AgentError::NotFound { id: "ORD999".into() }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// 默认策略下持续可重试失败：共调用 3 次，重试前延迟依次为 1s、2s
    #[tokio::test(start_paused = true)]
    async fn test_delay_sequence_exhausted() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let o = offsets.clone();
        let result: Result<u32, AgentError> = retry_with_backoff(
            &RetryPolicy::default(),
            || {
                let o = o.clone();
                async move {
                    o.lock().unwrap().push(start.elapsed());
                    Err(AgentError::Connection("refused".into()))
                }
            },
            AgentError::is_retryable,
        )
        .await;
        assert_eq!(result, Err(AgentError::Connection("refused".into())));
        let offsets = offsets.lock().unwrap();
        assert_eq!(
            *offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3),
            ]
        );
    }

    /// 前两次连接失败、第三次成功：总附加延迟恰为 1s + 2s
    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let c = calls.clone();
        let result: Result<u32, AgentError> = retry_with_backoff(
            &RetryPolicy::default(),
            || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AgentError::Connection("refused".into()))
                    } else {
                        Ok(7)
                    }
                }
            },
            AgentError::is_retryable,
        )
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}

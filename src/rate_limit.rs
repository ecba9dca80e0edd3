//! 按来源限流 - KV 固定窗口计数器
//!
//! 计数状态以 JSON 存在 KV 里，由存储端的 TTL 兜底清理。
//! 读取-递增-写回不是原子操作，并发请求可能少计数，
//! 限流是保护性的近似控制，不追求精确计数。

use crate::store::KvStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 窗口计数状态
#[derive(Debug, Serialize, Deserialize)]
struct RateWindow {
    count: u32,
    reset_at_ms: i64,
}

/// 限流结论
#[derive(Debug, Clone, PartialEq)]
pub struct RateDecision {
    pub allowed: bool,
    pub error: Option<String>,
}

impl RateDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            error: None,
        }
    }

    fn denied(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            error: Some(message.into()),
        }
    }
}

/// 限流器
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// 检查并计数
    ///
    /// 放行的调用计入当前窗口。存储故障时放行并告警，
    /// 计数器不可用不应当拖垮转发本身。
    pub async fn check(&self, key: &str, now_ms: i64) -> RateDecision {
        let store_key = format!("rate:{key}");

        let existing = match self.store.get(&store_key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limit store read failed, allowing request");
                return RateDecision::allowed();
            }
        };

        let window_ms = self.window.as_millis() as i64;
        let window = existing
            .and_then(|raw| serde_json::from_str::<RateWindow>(&raw).ok())
            .filter(|w| w.reset_at_ms > now_ms);

        let next = match window {
            Some(w) if w.count >= self.max_requests => {
                debug!(key = %key, count = w.count, "Rate limit exceeded");
                return RateDecision::denied(format!(
                    "Rate limit exceeded: max {} requests per {}s",
                    self.max_requests,
                    self.window.as_secs()
                ));
            }
            Some(w) => RateWindow {
                count: w.count + 1,
                reset_at_ms: w.reset_at_ms,
            },
            None => RateWindow {
                count: 1,
                reset_at_ms: now_ms + window_ms,
            },
        };

        let ttl = Duration::from_millis((next.reset_at_ms - now_ms).max(1) as u64);
        let raw = match serde_json::to_string(&next) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate window serialization failed, allowing request");
                return RateDecision::allowed();
            }
        };
        if let Err(e) = self.store.put(&store_key, &raw, ttl).await {
            warn!(key = %key, error = %e, "Rate limit store write failed, allowing request");
        }

        RateDecision::allowed()
    }
}

/// 限流键推导：设备标识优先，其次客户端 IP，都没有则归入 unknown
pub fn derive_rate_key(device: &str, client_ip: Option<&str>) -> String {
    let device = device.trim();
    if !device.is_empty() && device != crate::fingerprint::UNKNOWN_DEVICE {
        return format!("device:{device}");
    }
    match client_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
        Some(ip) => format!("ip:{ip}"),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use anyhow::Result;
    use async_trait::async_trait;

    const NOW: i64 = 1_700_000_000_000;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), max, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_under_threshold_allowed() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.check("device:test", NOW).await.allowed);
        }
    }

    #[tokio::test]
    async fn test_exceeding_threshold_denied() {
        let limiter = limiter(2);
        assert!(limiter.check("device:test", NOW).await.allowed);
        assert!(limiter.check("device:test", NOW).await.allowed);

        let decision = limiter.check("device:test", NOW).await;
        assert!(!decision.allowed);
        assert!(decision.error.unwrap().contains("Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_new_window_after_reset() {
        let limiter = limiter(1);
        assert!(limiter.check("device:test", NOW).await.allowed);
        assert!(!limiter.check("device:test", NOW).await.allowed);

        // 窗口过期后重新计数
        let later = NOW + 61_000;
        assert!(limiter.check("device:test", later).await.allowed);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let limiter = limiter(1);
        assert!(limiter.check("device:a", NOW).await.allowed);
        assert!(limiter.check("device:b", NOW).await.allowed);
        assert!(!limiter.check("device:a", NOW).await.allowed);
    }

    /// 总是失败的存储，验证放行策略
    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("store unavailable")
        }

        async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            anyhow::bail!("store unavailable")
        }
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(BrokenStore), 1, Duration::from_secs(60));
        assert!(limiter.check("device:test", NOW).await.allowed);
        assert!(limiter.check("device:test", NOW).await.allowed);
    }

    #[test]
    fn test_derive_key_prefers_device() {
        assert_eq!(
            derive_rate_key("iPhone-12", Some("1.2.3.4")),
            "device:iPhone-12"
        );
    }

    #[test]
    fn test_derive_key_falls_back_to_ip() {
        assert_eq!(derive_rate_key("unknown", Some("1.2.3.4")), "ip:1.2.3.4");
        assert_eq!(derive_rate_key("", Some("1.2.3.4")), "ip:1.2.3.4");
        assert_eq!(derive_rate_key("  ", Some(" 1.2.3.4 ")), "ip:1.2.3.4");
    }

    #[test]
    fn test_derive_key_unknown_without_ip() {
        assert_eq!(derive_rate_key("unknown", None), "unknown");
        assert_eq!(derive_rate_key("", Some("")), "unknown");
    }
}

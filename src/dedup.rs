//! 内容去重 - 指纹短 TTL 缓存，窗口内同一条短信至多投递一次
//!
//! iOS 快捷指令和 webhook 转发经常会重复触发同一条短信，
//! 这里用内容指纹在 300 秒窗口内挡掉重复。窗口过期后同样的
//! 内容可以重新投递，这是去重窗口的既定边界，不是跨时间的保证。

use crate::fingerprint::fingerprint;
use crate::store::KvStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 去重记录，按指纹存入 KV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeRecord {
    /// 来源设备
    pub device: String,
    /// 记录写入时间（Unix 毫秒）
    pub timestamp_ms: i64,
    /// 内容前 100 字符，够排查用，不存全文
    pub content: String,
}

/// 去重器
pub struct Deduplicator {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// 查重并占位
    ///
    /// 命中返回 true；未命中写入记录后返回 false。
    /// 读和写之间没有原子性，并发提交同一内容可能双双通过，
    /// 接受这种窗口内的偶发重复。存储故障按未命中处理。
    pub async fn check_and_reserve(&self, device: &str, content: &str, now_ms: i64) -> bool {
        let key = format!("sms:{}", fingerprint(device, content));

        match self.store.get(&key).await {
            Ok(Some(_)) => {
                let prefix = &key[..16.min(key.len())];
                debug!(key = %prefix, "Duplicate SMS detected");
                return true;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Dedup store read failed, treating as novel");
            }
        }

        let record = DedupeRecord {
            device: device.to_string(),
            timestamp_ms: now_ms,
            content: truncate_chars(content, 100),
        };
        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Dedup record serialization failed");
                return false;
            }
        };
        if let Err(e) = self.store.put(&key, &raw, self.ttl).await {
            warn!(error = %e, "Dedup store write failed, delivery proceeds without reservation");
        }

        false
    }
}

/// 按字符截断，避免在多字节边界上切断 UTF-8
fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const NOW: i64 = 1_700_000_000_000;

    fn dedup(store: Arc<MemoryStore>) -> Deduplicator {
        Deduplicator::new(store, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_first_submission_is_novel() {
        let dedup = dedup(Arc::new(MemoryStore::new()));
        assert!(!dedup.check_and_reserve("iPhone-12", "验证码 123456", NOW).await);
    }

    #[tokio::test]
    async fn test_second_submission_is_duplicate() {
        let dedup = dedup(Arc::new(MemoryStore::new()));
        assert!(!dedup.check_and_reserve("iPhone-12", "验证码 123456", NOW).await);
        assert!(dedup.check_and_reserve("iPhone-12", "验证码 123456", NOW).await);
        assert!(dedup.check_and_reserve("iPhone-12", "验证码 123456", NOW).await);
    }

    #[tokio::test]
    async fn test_different_devices_not_deduplicated() {
        let dedup = dedup(Arc::new(MemoryStore::new()));
        assert!(!dedup.check_and_reserve("iPhone-12", "same content", NOW).await);
        assert!(!dedup.check_and_reserve("Pixel-8", "same content", NOW).await);
    }

    #[tokio::test]
    async fn test_unknown_devices_dedup_on_content() {
        let dedup = dedup(Arc::new(MemoryStore::new()));
        assert!(!dedup.check_and_reserve("unknown", "same content", NOW).await);
        assert!(dedup.check_and_reserve("unknown", "same content", NOW).await);
    }

    #[tokio::test]
    async fn test_window_expiry_allows_resend() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store, Duration::from_millis(50));

        assert!(!dedup.check_and_reserve("iPhone-12", "content", NOW).await);
        assert!(dedup.check_and_reserve("iPhone-12", "content", NOW).await);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!dedup.check_and_reserve("iPhone-12", "content", NOW).await);
    }

    #[tokio::test]
    async fn test_record_stores_content_prefix() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store.clone(), Duration::from_secs(300));

        let long_content = "x".repeat(250);
        dedup.check_and_reserve("iPhone-12", &long_content, NOW).await;

        let key = format!("sms:{}", fingerprint("iPhone-12", &long_content));
        let raw = store.get(&key).await.unwrap().unwrap();
        let record: DedupeRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.device, "iPhone-12");
        assert_eq!(record.timestamp_ms, NOW);
        assert_eq!(record.content.chars().count(), 100);
    }

    #[test]
    fn test_truncate_chars_multibyte_safe() {
        let s = "验证码".repeat(50);
        let truncated = truncate_chars(&s, 100);
        assert_eq!(truncated.chars().count(), 100);
    }
}

//! KV 存储抽象 - 去重缓存和限流计数器共用的键值存储接口

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 带过期时间的键值存储
///
/// 去重和限流都只读写单个键，过期由存储端负责。
/// 线上可以换成 Redis 等外部存储，测试和单机部署用 [`MemoryStore`]。
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取键值，不存在或已过期返回 None
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入键值并设置过期时间
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// 进程内存储 - HashMap 加惰性过期清理
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, (_, deadline)| *deadline > now);
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

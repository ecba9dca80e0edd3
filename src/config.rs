//! 服务配置 - 启动时从环境变量一次性加载
//!
//! 加载之后全部显式传递，管道内部不再读任何环境变量。

use anyhow::{Context, Result};
use std::env;

/// Bark 命名设备键
#[derive(Debug, Clone, PartialEq)]
pub struct BarkKey {
    /// 键名（请求的 target 数组按名字选择目标）
    pub name: String,
    /// Bark 设备密钥
    pub key: String,
}

/// 网关配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 监听地址
    pub bind_address: String,
    /// 转发接口的 Bearer token
    pub api_token: String,
    /// 飞书机器人 webhook 地址
    pub feishu_webhook: Option<String>,
    /// 企业微信机器人 webhook 地址
    pub wecom_webhook: Option<String>,
    /// 钉钉机器人 webhook 地址
    pub dingtalk_webhook: Option<String>,
    /// 钉钉加签密钥（可选）
    pub dingtalk_secret: Option<String>,
    /// Bark 服务端地址
    pub bark_server: String,
    /// Bark 设备键列表，`name:key` 逗号分隔
    pub bark_keys: Vec<BarkKey>,
    /// Debug 模式：只做校验和去重记录，不推送
    pub debug: bool,
    /// 限流窗口内允许的最大请求数
    pub rate_limit_max: u32,
    /// 限流窗口长度（秒）
    pub rate_limit_window_secs: u64,
    /// 去重记录保留时间（秒）
    pub dedupe_ttl_secs: u64,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8787".into()),
            api_token: env::var("API_TOKEN").context("API_TOKEN must be set")?,
            feishu_webhook: env::var("FEISHU_WEBHOOK").ok().filter(|s| !s.is_empty()),
            wecom_webhook: env::var("WECOM_WEBHOOK").ok().filter(|s| !s.is_empty()),
            dingtalk_webhook: env::var("DINGTALK_WEBHOOK").ok().filter(|s| !s.is_empty()),
            dingtalk_secret: env::var("DINGTALK_SECRET").ok().filter(|s| !s.is_empty()),
            bark_server: env::var("BARK_SERVER").unwrap_or_else(|_| "https://api.day.app".into()),
            bark_keys: env::var("BARK_KEYS")
                .map(|s| parse_bark_keys(&s))
                .unwrap_or_default(),
            debug: env::var("DEBUG").map(|v| v == "true").unwrap_or(false),
            rate_limit_max: env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            dedupe_ttl_secs: env::var("DEDUPE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        })
    }

    /// 各渠道是否已配置，供 `check` 子命令打印
    pub fn channel_summary(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("feishu", self.feishu_webhook.is_some()),
            ("wecom", self.wecom_webhook.is_some()),
            ("dingtalk", self.dingtalk_webhook.is_some()),
            ("bark", !self.bark_keys.is_empty()),
        ]
    }

    /// 测试用默认配置：无渠道、宽限流、token 固定
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".into(),
            api_token: "test-token".into(),
            feishu_webhook: None,
            wecom_webhook: None,
            dingtalk_webhook: None,
            dingtalk_secret: None,
            bark_server: "https://api.day.app".into(),
            bark_keys: Vec::new(),
            debug: false,
            rate_limit_max: 100,
            rate_limit_window_secs: 60,
            dedupe_ttl_secs: 300,
        }
    }
}

/// 解析 `name:key,name:key` 格式的 Bark 键列表
///
/// 没有名字的条目以键本身作为名字。空白条目忽略。
pub fn parse_bark_keys(raw: &str) -> Vec<BarkKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((name, key)) => BarkKey {
                name: name.trim().to_string(),
                key: key.trim().to_string(),
            },
            None => BarkKey {
                name: entry.to_string(),
                key: entry.to_string(),
            },
        })
        .filter(|k| !k.key.is_empty())
        .collect()
}

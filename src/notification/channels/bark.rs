//! Bark 推送渠道 - 向多个设备键广播并统计实际送达数量
//!
//! 和其他渠道不同，Bark 是一对多：配置里是一组命名设备键，
//! 请求可以用 target 数组按名字选择子集，结果报送达数量而不是单个布尔。

use super::USER_AGENT;
use crate::config::BarkKey;
use crate::fingerprint::UNKNOWN_DEVICE;
use crate::notification::channel::{ChannelResult, NotificationChannel, PushMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

/// Bark 渠道
pub struct BarkChannel {
    server: String,
    keys: Vec<BarkKey>,
    client: Client,
}

impl BarkChannel {
    pub fn new(server: impl Into<String>, keys: Vec<BarkKey>, client: Client) -> Self {
        Self {
            server: server.into(),
            keys,
            client,
        }
    }

    /// 推送单个设备键，成功返回 Ok，失败返回错误描述
    async fn push_one(&self, key: &BarkKey, title: &str, body: &str) -> Result<(), String> {
        let url = format!("{}/push", self.server.trim_end_matches('/'));
        let payload = json!({
            "title": title,
            "body": body,
            "device_key": key.key,
            "group": "sms",
        });

        let response = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("{}: HTTP request failed: {e}", key.name))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or_else(|_| json!({}));

        // Bark 成功返回 code = 200
        if status.is_success() && body.get("code").and_then(Value::as_i64) == Some(200) {
            return Ok(());
        }

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        Err(format!("{}: {message}", key.name))
    }
}

#[async_trait]
impl NotificationChannel for BarkChannel {
    fn name(&self) -> &str {
        "bark"
    }

    async fn send(&self, message: &PushMessage) -> ChannelResult {
        if self.keys.is_empty() {
            return ChannelResult::failed("No Bark keys configured");
        }

        let selected = select_keys(&self.keys, message.targets.as_deref());
        if selected.is_empty() {
            return ChannelResult::broadcast(0, Some("No matching Bark targets".into()));
        }

        let (title, body) = build_bark_content(
            message.code.as_deref(),
            &message.content,
            &message.device,
        );

        let pushes = selected
            .iter()
            .map(|key| self.push_one(key, &title, &body));
        let results = futures::future::join_all(pushes).await;

        let delivered = results.iter().filter(|r| r.is_ok()).count() as u32;
        let errors: Vec<String> = results.into_iter().filter_map(Result::err).collect();

        info!(
            channel = "bark",
            delivered,
            targets = selected.len(),
            "Bark push finished"
        );

        let error = if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        };
        ChannelResult::broadcast(delivered, error)
    }
}

/// 按 target 名单筛选设备键
///
/// 没给名单时推送全部；名单里的 null 和未知名字直接忽略。
fn select_keys<'a>(keys: &'a [BarkKey], targets: Option<&[Option<String>]>) -> Vec<&'a BarkKey> {
    match targets {
        None => keys.iter().collect(),
        Some(targets) => {
            let wanted: Vec<&str> = targets
                .iter()
                .flatten()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            keys.iter().filter(|k| wanted.contains(&k.name.as_str())).collect()
        }
    }
}

/// Bark 的标题和正文：标题直接带验证码，锁屏上一眼可见
fn build_bark_content(code: Option<&str>, content: &str, device: &str) -> (String, String) {
    let title = match code {
        Some(code) => format!("短信验证码 {code}"),
        None => "新短信".to_string(),
    };
    let body = if device != UNKNOWN_DEVICE {
        format!("{content}\n来自: {device}")
    } else {
        content.to_string()
    };
    (title, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<BarkKey> {
        vec![
            BarkKey {
                name: "alice".into(),
                key: "key-a".into(),
            },
            BarkKey {
                name: "bob".into(),
                key: "key-b".into(),
            },
        ]
    }

    #[test]
    fn test_no_targets_selects_all() {
        let keys = keys();
        let selected = select_keys(&keys, None);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_targets_select_subset() {
        let keys = keys();
        let targets = vec![Some("alice".to_string()), None];
        let selected = select_keys(&keys, Some(&targets));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "alice");
    }

    #[test]
    fn test_unknown_target_names_ignored() {
        let keys = keys();
        let targets = vec![Some("carol".to_string())];
        let selected = select_keys(&keys, Some(&targets));
        assert!(selected.is_empty());
    }

    #[test]
    fn test_all_null_targets_select_nothing() {
        let keys = keys();
        let targets = vec![None, None];
        let selected = select_keys(&keys, Some(&targets));
        assert!(selected.is_empty());
    }

    #[test]
    fn test_content_with_code() {
        let (title, body) = build_bark_content(Some("847291"), "Your code is 847291", "iPhone-12");
        assert_eq!(title, "短信验证码 847291");
        assert!(body.contains("来自: iPhone-12"));
    }

    #[test]
    fn test_content_without_code_or_device() {
        let (title, body) = build_bark_content(None, "hello", "unknown");
        assert_eq!(title, "新短信");
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_no_keys_short_circuits() {
        let channel = BarkChannel::new("https://api.day.app", Vec::new(), Client::new());
        let result = channel.send(&PushMessage::new("📩 新短信", "hello")).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No Bark keys configured"));
        assert_eq!(result.delivered, None);
    }

    #[tokio::test]
    async fn test_unmatched_targets_deliver_zero() {
        let channel = BarkChannel::new("https://api.day.app", keys(), Client::new());
        let message = PushMessage::new("📩 新短信", "hello")
            .with_targets(Some(vec![Some("carol".to_string())]));
        let result = channel.send(&message).await;

        assert!(!result.success);
        assert_eq!(result.delivered, Some(0));
    }
}

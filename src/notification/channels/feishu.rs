//! 飞书 Webhook 机器人推送渠道
//!
//! 使用 interactive 卡片格式，有验证码时卡片头是蓝色并单独高亮一行。

use super::{local_time_label, USER_AGENT};
use crate::fingerprint::UNKNOWN_DEVICE;
use crate::notification::channel::{ChannelResult, NotificationChannel, PushMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

/// 飞书渠道
pub struct FeishuChannel {
    webhook: Option<String>,
    client: Client,
}

impl FeishuChannel {
    pub fn new(webhook: Option<String>, client: Client) -> Self {
        Self { webhook, client }
    }
}

#[async_trait]
impl NotificationChannel for FeishuChannel {
    fn name(&self) -> &str {
        "feishu"
    }

    async fn send(&self, message: &PushMessage) -> ChannelResult {
        let Some(webhook) = &self.webhook else {
            return ChannelResult::failed("No Feishu webhook configured");
        };

        let card = build_feishu_card(
            &message.title,
            &message.content,
            &message.device,
            message.code.as_deref(),
        );

        let response = match self
            .client
            .post(webhook)
            .header("User-Agent", USER_AGENT)
            .json(&card)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ChannelResult::failed(format!("HTTP request failed: {e}")),
        };

        let status = response.status();
        let body: Value = response.json().await.unwrap_or_else(|_| json!({}));

        // 飞书成功返回 code = 0
        if status.is_success() && body.get("code").and_then(Value::as_i64) == Some(0) {
            info!(channel = "feishu", "Push success");
            return ChannelResult::ok();
        }

        let error = body
            .get("msg")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        ChannelResult::failed(error)
    }
}

/// 构建飞书卡片消息
pub fn build_feishu_card(title: &str, content: &str, device: &str, code: Option<&str>) -> Value {
    let mut elements = Vec::new();

    // 验证码单独高亮一行
    if let Some(code) = code {
        elements.push(json!({
            "tag": "div",
            "text": {
                "tag": "lark_md",
                "content": format!("**🔐 验证码: `{code}`**"),
            },
        }));
        elements.push(json!({"tag": "hr"}));
    }

    elements.push(json!({
        "tag": "div",
        "text": {
            "tag": "lark_md",
            "content": format!("📝 **短信内容**\n{}", escape_feishu_markdown(content)),
        },
    }));

    if device != UNKNOWN_DEVICE {
        elements.push(json!({
            "tag": "note",
            "elements": [{
                "tag": "plain_text",
                "content": format!("📱 来自: {device}"),
            }],
        }));
    }

    elements.push(json!({
        "tag": "note",
        "elements": [{
            "tag": "plain_text",
            "content": format!("🕐 {}", local_time_label()),
        }],
    }));

    json!({
        "msg_type": "interactive",
        "card": {
            "header": {
                "title": {
                    "tag": "plain_text",
                    "content": title,
                },
                "template": if code.is_some() { "blue" } else { "turquoise" },
            },
            "elements": elements,
        },
    })
}

/// 转义 lark_md 特殊字符
fn escape_feishu_markdown(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('*', "\\*")
        .replace('`', "\\`")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_with_code_is_blue_and_highlights() {
        let card = build_feishu_card("📩 短信验证码", "验证码 123456", "iPhone-12", Some("123456"));

        assert_eq!(card["msg_type"], json!("interactive"));
        assert_eq!(card["card"]["header"]["template"], json!("blue"));

        let elements = card["card"]["elements"].as_array().unwrap();
        let first = elements[0]["text"]["content"].as_str().unwrap();
        assert!(first.contains("验证码: `123456`"));
        assert_eq!(elements[1]["tag"], json!("hr"));
    }

    #[test]
    fn test_card_without_code_is_turquoise() {
        let card = build_feishu_card("📩 新短信", "hello", "iPhone-12", None);

        assert_eq!(card["card"]["header"]["template"], json!("turquoise"));
        let elements = card["card"]["elements"].as_array().unwrap();
        // 没有验证码行和分隔线，第一个元素就是内容
        let first = elements[0]["text"]["content"].as_str().unwrap();
        assert!(first.contains("短信内容"));
    }

    #[test]
    fn test_unknown_device_omits_source_note() {
        let card = build_feishu_card("📩 新短信", "hello", "unknown", None);
        let rendered = card.to_string();
        assert!(!rendered.contains("来自"));
    }

    #[test]
    fn test_named_device_has_source_note() {
        let card = build_feishu_card("📩 新短信", "hello", "iPhone-12", None);
        let rendered = card.to_string();
        assert!(rendered.contains("来自: iPhone-12"));
    }

    #[test]
    fn test_markdown_escaping() {
        assert_eq!(escape_feishu_markdown("a*b`c\\d"), "a\\*b\\`c\\\\d");
    }

    #[tokio::test]
    async fn test_unconfigured_channel_short_circuits() {
        let channel = FeishuChannel::new(None, Client::new());
        let result = channel
            .send(&PushMessage::new("📩 新短信", "hello"))
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No Feishu webhook configured"));
    }
}

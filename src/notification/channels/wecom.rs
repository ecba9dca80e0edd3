//! 企业微信 Webhook 机器人推送渠道
//!
//! 使用 markdown 消息格式，验证码用 warning 颜色标记高亮。

use super::{local_time_label, USER_AGENT};
use crate::fingerprint::UNKNOWN_DEVICE;
use crate::notification::channel::{ChannelResult, NotificationChannel, PushMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

/// 企业微信渠道
pub struct WecomChannel {
    webhook: Option<String>,
    client: Client,
}

impl WecomChannel {
    pub fn new(webhook: Option<String>, client: Client) -> Self {
        Self { webhook, client }
    }
}

#[async_trait]
impl NotificationChannel for WecomChannel {
    fn name(&self) -> &str {
        "wecom"
    }

    async fn send(&self, message: &PushMessage) -> ChannelResult {
        let Some(webhook) = &self.webhook else {
            return ChannelResult::failed("No WeCom webhook configured");
        };

        let markdown = build_wecom_markdown(
            &message.title,
            &message.content,
            &message.device,
            message.code.as_deref(),
        );
        let payload = json!({
            "msgtype": "markdown",
            "markdown": { "content": markdown },
        });

        let response = match self
            .client
            .post(webhook)
            .header("User-Agent", USER_AGENT)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ChannelResult::failed(format!("HTTP request failed: {e}")),
        };

        let status = response.status();
        let body: Value = response.json().await.unwrap_or_else(|_| json!({}));

        // 企业微信成功返回 errcode = 0
        if status.is_success() && body.get("errcode").and_then(Value::as_i64) == Some(0) {
            info!(channel = "wecom", "Push success");
            return ChannelResult::ok();
        }

        let error = body
            .get("errmsg")
            .or_else(|| body.get("msg"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        ChannelResult::failed(error)
    }
}

/// 构建企业微信 Markdown 消息
pub fn build_wecom_markdown(title: &str, content: &str, device: &str, code: Option<&str>) -> String {
    let mut lines = Vec::new();

    lines.push(format!("### {title}"));

    if let Some(code) = code {
        lines.push(format!(
            "> **🔐 验证码: <font color=\"warning\">{code}</font>**"
        ));
        lines.push(String::new());
    }

    lines.push("**📝 短信内容**".to_string());
    lines.push(format!("> {}", escape_wecom_markdown(content)));
    lines.push(String::new());

    if device != UNKNOWN_DEVICE {
        lines.push(format!("📱 **来自**: {device}"));
    }

    lines.push(format!("🕐 **时间**: {}", local_time_label()));

    lines.join("\n")
}

/// 转义企业微信 Markdown 特殊字符
fn escape_wecom_markdown(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

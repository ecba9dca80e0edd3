//! 钉钉 Webhook 机器人推送渠道
//!
//! 使用 actionCard 卡片格式。配置了加签密钥时在 webhook 地址上
//! 附加 timestamp + sign 参数（HMAC-SHA256，base64 输出）。

use super::{local_time_label, USER_AGENT};
use crate::fingerprint::UNKNOWN_DEVICE;
use crate::notification::channel::{ChannelResult, NotificationChannel, PushMessage};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::info;

type HmacSha256 = Hmac<Sha256>;

/// 钉钉渠道
pub struct DingtalkChannel {
    webhook: Option<String>,
    secret: Option<String>,
    client: Client,
}

impl DingtalkChannel {
    pub fn new(webhook: Option<String>, secret: Option<String>, client: Client) -> Self {
        Self {
            webhook,
            secret,
            client,
        }
    }

    /// 拼出最终请求地址，配置了密钥时带上签名参数
    fn signed_url(&self, webhook: &str, timestamp_ms: i64) -> String {
        let Some(secret) = &self.secret else {
            return webhook.to_string();
        };
        let sign = sign_dingtalk(secret, timestamp_ms);
        let separator = if webhook.contains('?') { '&' } else { '?' };
        format!(
            "{webhook}{separator}timestamp={timestamp_ms}&sign={}",
            percent_encode(&sign)
        )
    }
}

#[async_trait]
impl NotificationChannel for DingtalkChannel {
    fn name(&self) -> &str {
        "dingtalk"
    }

    async fn send(&self, message: &PushMessage) -> ChannelResult {
        let Some(webhook) = &self.webhook else {
            return ChannelResult::failed("No DingTalk webhook configured");
        };

        let url = self.signed_url(webhook, chrono::Utc::now().timestamp_millis());
        let markdown = build_dingtalk_markdown(
            &message.title,
            &message.content,
            &message.device,
            message.code.as_deref(),
        );
        let payload = json!({
            "msgtype": "actionCard",
            "actionCard": {
                "title": message.title,
                "text": markdown,
                "hideAvatar": "0",
                "btnOrientation": "0",
                "singleTitle": "查看详情",
                "singleURL": "dingtalk://dingtalkclient/action/openapp",
            },
        });

        let response = match self
            .client
            .post(&url)
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

        // 钉钉成功返回 errcode = 0
        if status.is_success() && body.get("errcode").and_then(Value::as_i64) == Some(0) {
            info!(channel = "dingtalk", "Push success");
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

/// 钉钉加签：HMAC-SHA256(`{timestamp}\n{secret}`)，密钥先裁剪空白
pub fn sign_dingtalk(secret: &str, timestamp_ms: i64) -> String {
    let secret = secret.trim();
    let string_to_sign = format!("{timestamp_ms}\n{secret}");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// base64 签名放进 query 参数，+ / = 需要百分号编码
fn percent_encode(sign: &str) -> String {
    sign.replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

/// 构建钉钉 Markdown 消息内容
pub fn build_dingtalk_markdown(
    title: &str,
    content: &str,
    device: &str,
    code: Option<&str>,
) -> String {
    let mut lines = Vec::new();

    lines.push(format!("### {title}"));
    lines.push(String::new());

    if let Some(code) = code {
        lines.push(format!("> **🔐 验证码: `{code}`**"));
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
    }

    lines.push("**📝 短信内容**".to_string());
    lines.push(String::new());
    lines.push(format!("> {}", escape_dingtalk_markdown(content)));
    lines.push(String::new());

    if device != UNKNOWN_DEVICE {
        lines.push(format!("📱 **来自**: {device}"));
        lines.push(String::new());
    }

    lines.push(format!("🕐 **时间**: {}", local_time_label()));

    lines.join("\n")
}

/// 转义钉钉 Markdown 特殊字符
fn escape_dingtalk_markdown(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace('*', "\\*")
        .replace('_', "\\_")
}

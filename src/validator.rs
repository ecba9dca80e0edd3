//! 请求校验 - 鉴权、解析请求体、内容与时间戳检查
//!
//! 纯门卫：除了拒绝响应没有任何副作用。通过校验的请求
//! 产出一个 [`InboundEvent`]，后续阶段只认这个结构。

use crate::code_extract::extract_code;
use crate::error::ForwardError;
use crate::fingerprint::UNKNOWN_DEVICE;
use crate::timestamp::validate_timestamp;
use serde::Deserialize;
use serde_json::Value;

/// 内容长度上限（字符数）
const MAX_CONTENT_CHARS: usize = 1000;

/// 校验通过的转发事件，一次请求构造一次，响应后丢弃
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// 来源设备，缺省为 "unknown"
    pub device: String,
    /// 已裁剪的短信内容
    pub content: String,
    /// 调用方指定或从内容提取的验证码
    pub code: Option<String>,
    /// 请求携带的毫秒时间戳
    pub timestamp_ms: i64,
    /// Bark 目标键名列表，非字符串条目保留为 None
    pub targets: Option<Vec<Option<String>>>,
}

/// 原始请求体。字段全部宽松接收，类型检查在下面逐个做。
#[derive(Debug, Deserialize)]
struct RawBody {
    #[serde(default)]
    device: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    target: Option<Value>,
}

/// 校验 Authorization 头
///
/// 裁剪空白后和 `Bearer <token>` 做完整字符串比较，
/// 不匹配立即拒绝，后续阶段一概不执行。
pub fn check_auth(auth_header: Option<&str>, api_token: &str) -> Result<(), ForwardError> {
    let auth = auth_header.unwrap_or("").trim();
    let expected = format!("Bearer {api_token}");
    if auth != expected {
        return Err(ForwardError::Unauthorized);
    }
    Ok(())
}

/// 解析并校验请求体，产出 InboundEvent
pub fn parse_event(raw_body: &str, now_ms: i64) -> Result<InboundEvent, ForwardError> {
    let body: RawBody =
        serde_json::from_str(raw_body).map_err(|_| ForwardError::InvalidJson)?;

    // 无条件转字符串，兼容 iOS 快捷指令 / webhook / curl 发来的各种类型，
    // 先转换再判空，保证错误信息稳定
    let content = coerce_to_string(body.content.as_ref());
    let content = content.trim();
    if content.is_empty() {
        return Err(ForwardError::InvalidContent(
            "Missing or invalid content field".into(),
        ));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ForwardError::InvalidContent("Content too long".into()));
    }

    let timestamp_ms = body
        .timestamp
        .as_ref()
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let verdict = validate_timestamp(timestamp_ms, now_ms);
    if !verdict.valid {
        return Err(ForwardError::InvalidTimestamp(
            verdict.error.unwrap_or_else(|| "Invalid timestamp".into()),
        ));
    }

    // 设备标识只认非空字符串
    let device = body
        .device
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_DEVICE)
        .to_string();

    // 调用方给的 code 优先，否则从内容里提取
    let code = declared_code(body.code.as_ref()).or_else(|| extract_code(content));

    Ok(InboundEvent {
        device,
        content: content.to_string(),
        code,
        timestamp_ms,
        targets: parse_targets(body.target.as_ref()),
    })
}

/// 任意 JSON 值转字符串：null 视为空，数字和布尔取显示形式，
/// 数组和对象取 JSON 文本
fn coerce_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// 调用方声明的 code：非空字符串或数字才算数
fn declared_code(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// target 字段：数组才接受，字符串条目保留，其余（含 null）置为 None
fn parse_targets(value: Option<&Value>) -> Option<Vec<Option<String>>> {
    match value {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| item.as_str().map(|s| s.to_string()))
                .collect(),
        ),
        _ => None,
    }
}

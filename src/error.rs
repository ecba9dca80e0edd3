//! 请求级错误 - 每种拒绝原因对应一个 HTTP 状态码和 JSON 响应体
//!
//! 所有错误都终结当前请求并直接返回给调用方，不做内部重试。
//! 单渠道推送失败不在这里：只有全部渠道失败才升级为 AllChannelsFailed。

use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    /// Authorization 头缺失或 token 不匹配
    #[error("Unauthorized")]
    Unauthorized,

    /// 请求体不是合法 JSON
    #[error("Invalid JSON")]
    InvalidJson,

    /// content 字段为空或超长
    #[error("{0}")]
    InvalidContent(String),

    /// 时间戳缺失、过期或超前
    #[error("{0}")]
    InvalidTimestamp(String),

    /// 触发限流
    #[error("{0}")]
    RateLimited(String),

    /// 所有渠道推送失败，携带每个渠道的错误信息
    #[error("Push failed")]
    AllChannelsFailed(Value),
}

impl ForwardError {
    /// 对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidJson | Self::InvalidContent(_) | Self::InvalidTimestamp(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::AllChannelsFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// 响应 JSON
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });
        if let Self::AllChannelsFailed(errors) = self {
            body["errors"] = errors.clone();
        }
        body
    }
}

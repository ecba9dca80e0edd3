//! 通知渠道 trait 定义

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 待推送的消息
#[derive(Debug, Clone)]
pub struct PushMessage {
    /// 推送标题
    pub title: String,
    /// 短信内容
    pub content: String,
    /// 来源设备（"unknown" 表示未知，渠道据此省略来源行）
    pub device: String,
    /// 提取或指定的验证码
    pub code: Option<String>,
    /// 广播渠道的目标键名（None 表示推送全部目标）
    pub targets: Option<Vec<Option<String>>>,
}

impl PushMessage {
    /// 创建简单消息
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            device: crate::fingerprint::UNKNOWN_DEVICE.to_string(),
            code: None,
            targets: None,
        }
    }

    /// 设置来源设备
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// 设置验证码
    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    /// 设置广播目标
    pub fn with_targets(mut self, targets: Option<Vec<Option<String>>>) -> Self {
        self.targets = targets;
        self
    }
}

/// 单渠道发送结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResult {
    /// 是否送达（广播渠道指至少送达一个目标）
    pub success: bool,
    /// 失败原因
    pub error: Option<String>,
    /// 广播渠道实际送达的目标数量
    pub delivered: Option<u32>,
}

impl ChannelResult {
    /// 发送成功
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            delivered: None,
        }
    }

    /// 发送失败
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            delivered: None,
        }
    }

    /// 广播结果：送达数量为 0 视为失败
    pub fn broadcast(delivered: u32, error: Option<String>) -> Self {
        Self {
            success: delivered > 0,
            error,
            delivered: Some(delivered),
        }
    }
}

/// 通知渠道 trait
///
/// `send` 把所有传输错误和服务端错误码折叠进 [`ChannelResult`]，
/// 永远不向调用方抛错，分发器据此做整体成败汇总。
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志和响应字段）
    fn name(&self) -> &str;

    /// 发送消息。未配置的渠道直接返回失败，不发网络请求。
    async fn send(&self, message: &PushMessage) -> ChannelResult;
}

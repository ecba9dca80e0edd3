//! 通知分发器 - 并发调用所有渠道并汇总结果

use super::channel::{ChannelResult, NotificationChannel, PushMessage};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// 一次分发的汇总结果
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// 是否至少有一个渠道送达
    pub any_success: bool,
    /// 各渠道结果，保持注册顺序
    pub per_channel: Vec<(String, ChannelResult)>,
}

impl DispatchOutcome {
    /// 全部失败时的错误对象：渠道名 -> 错误信息
    pub fn errors_json(&self) -> Value {
        let mut errors = Map::new();
        for (name, result) in &self.per_channel {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            errors.insert(name.clone(), json!(message));
        }
        Value::Object(errors)
    }

    /// 成功响应里的渠道字段：广播渠道给送达数量，其余给布尔
    pub fn results_json(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        for (name, result) in &self.per_channel {
            let value = match result.delivered {
                Some(count) => json!(count),
                None => json!(result.success),
            };
            fields.insert(name.clone(), value);
        }
        fields
    }
}

/// 通知分发器 - 管理多个渠道并把一条消息推到全部渠道
pub struct NotificationDispatcher {
    /// 所有注册的渠道
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// 注册渠道
    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(channel = channel.name(), "Registering notification channel");
        self.channels.push(channel);
    }

    /// 获取已注册的渠道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 获取已注册的渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// 并发分发到所有渠道
    ///
    /// 所有渠道同时发送，慢渠道不阻塞其他渠道；等全部完成后
    /// 汇总，不在第一个成功或失败时提前返回，保证报告完整。
    pub async fn dispatch(&self, message: &PushMessage) -> DispatchOutcome {
        let sends = self.channels.iter().map(|channel| {
            let name = channel.name().to_string();
            async move {
                let result = channel.send(message).await;
                if !result.success {
                    warn!(
                        channel = %name,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "Channel send failed"
                    );
                }
                (name, result)
            }
        });

        let per_channel = futures::future::join_all(sends).await;
        let any_success = per_channel.iter().any(|(_, result)| result.success);

        DispatchOutcome {
            any_success,
            per_channel,
        }
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

//! 通知抽象层 - 统一管理所有推送渠道
//!
//! # 设计目标
//! 1. 统一接口：所有渠道实现 `NotificationChannel` trait
//! 2. 渠道解耦：每个渠道独立实现，互不影响
//! 3. 并发分发：`NotificationDispatcher` 同时调用全部渠道，等齐后汇总
//! 4. 局部失败：单渠道失败只记录在结果里，不影响其他渠道

pub mod channel;
pub mod channels;
pub mod dispatcher;

pub use channel::{ChannelResult, NotificationChannel, PushMessage};
pub use channels::{BarkChannel, DingtalkChannel, FeishuChannel, WecomChannel};
pub use dispatcher::{DispatchOutcome, NotificationDispatcher};

//! SMS Forward Gateway - 接收短信转发并分发到多个推送渠道

pub mod code_extract;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod notification;
pub mod pipeline;
pub mod rate_limit;
pub mod server;
pub mod store;
pub mod timestamp;
pub mod validator;

pub use config::{AppConfig, BarkKey};
pub use dedup::{DedupeRecord, Deduplicator};
pub use error::ForwardError;
pub use notification::{
    ChannelResult, DispatchOutcome, NotificationChannel, NotificationDispatcher, PushMessage,
};
pub use pipeline::{ForwardPipeline, ForwardReply};
pub use rate_limit::{derive_rate_key, RateLimiter};
pub use server::{build_router, client_ip_from_headers, serve};
pub use store::{KvStore, MemoryStore};
pub use validator::InboundEvent;

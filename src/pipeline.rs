//! 转发管道 - 鉴权、校验、限流、去重、分发的串联
//!
//! 阶段严格顺序执行：validate → rate-limit → dedup → dispatch。
//! 在前面阶段被拒绝的请求不会触发任何后续阶段的副作用。

use crate::config::AppConfig;
use crate::dedup::Deduplicator;
use crate::error::ForwardError;
use crate::notification::channels::{BarkChannel, DingtalkChannel, FeishuChannel, WecomChannel};
use crate::notification::{NotificationDispatcher, PushMessage};
use crate::rate_limit::{derive_rate_key, RateLimiter};
use crate::store::KvStore;
use crate::timestamp::now_ms;
use crate::validator::{check_auth, parse_event};
use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 管道处理结果：状态码加 JSON 响应体
#[derive(Debug, Clone)]
pub struct ForwardReply {
    pub status: StatusCode,
    pub body: Value,
}

impl ForwardReply {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

/// 转发管道
pub struct ForwardPipeline {
    config: AppConfig,
    rate_limiter: RateLimiter,
    deduplicator: Deduplicator,
    dispatcher: NotificationDispatcher,
}

impl ForwardPipeline {
    /// 按配置构建完整管道，注册全部渠道
    ///
    /// 未配置的渠道也注册进去，它们在发送时短路返回失败，
    /// 这样响应里始终能看到每个渠道的状态。
    pub fn new(config: AppConfig, store: Arc<dyn KvStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let mut dispatcher = NotificationDispatcher::new();
        dispatcher.register_channel(Arc::new(FeishuChannel::new(
            config.feishu_webhook.clone(),
            client.clone(),
        )));
        dispatcher.register_channel(Arc::new(WecomChannel::new(
            config.wecom_webhook.clone(),
            client.clone(),
        )));
        dispatcher.register_channel(Arc::new(DingtalkChannel::new(
            config.dingtalk_webhook.clone(),
            config.dingtalk_secret.clone(),
            client.clone(),
        )));
        dispatcher.register_channel(Arc::new(BarkChannel::new(
            config.bark_server.clone(),
            config.bark_keys.clone(),
            client,
        )));

        Ok(Self::with_dispatcher(config, store, dispatcher))
    }

    /// 用外部组装的分发器构建管道（测试时注入 mock 渠道）
    pub fn with_dispatcher(
        config: AppConfig,
        store: Arc<dyn KvStore>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        let rate_limiter = RateLimiter::new(
            store.clone(),
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        let deduplicator = Deduplicator::new(store, Duration::from_secs(config.dedupe_ttl_secs));
        Self {
            config,
            rate_limiter,
            deduplicator,
            dispatcher,
        }
    }

    /// 处理一次转发请求
    ///
    /// `auth_header` 是原始 Authorization 头；`client_ip` 是已经从
    /// 代理头里解析出的首个地址；`debug_query` 来自 `?debug=true`。
    pub async fn handle(
        &self,
        auth_header: Option<&str>,
        client_ip: Option<&str>,
        debug_query: bool,
        raw_body: &str,
    ) -> ForwardReply {
        match self.run(auth_header, client_ip, debug_query, raw_body).await {
            Ok(reply) => reply,
            Err(e) => ForwardReply {
                status: e.status(),
                body: e.to_body(),
            },
        }
    }

    async fn run(
        &self,
        auth_header: Option<&str>,
        client_ip: Option<&str>,
        debug_query: bool,
        raw_body: &str,
    ) -> Result<ForwardReply, ForwardError> {
        // 1. Token 鉴权，失败立即返回，不碰任何存储
        check_auth(auth_header, &self.config.api_token).map_err(|e| {
            info!("Auth failed");
            e
        })?;

        // 2. 解析并校验请求体
        let now = now_ms();
        let event = parse_event(raw_body, now)?;

        info!(
            device = %event.device,
            content_len = event.content.chars().count(),
            has_code = event.code.is_some(),
            "Received SMS forward request"
        );

        // 3. 限流
        let rate_key = derive_rate_key(&event.device, client_ip);
        let decision = self.rate_limiter.check(&rate_key, now).await;
        if !decision.allowed {
            return Err(ForwardError::RateLimited(
                decision
                    .error
                    .unwrap_or_else(|| "Rate limit exceeded".into()),
            ));
        }

        // 4. 去重：命中是正常的幂等结果，按成功返回并带上验证码
        if self
            .deduplicator
            .check_and_reserve(&event.device, &event.content, now)
            .await
        {
            return Ok(ForwardReply::ok(json!({
                "success": true,
                "message": "skipped",
                "reason": "duplicate",
                "code": event.code,
            })));
        }

        // 5. Debug 模式：去重记录照写，推送全部跳过
        if debug_query || self.config.debug {
            info!("Debug mode: skipping all pushes");
            return Ok(ForwardReply::ok(json!({
                "success": true,
                "message": "debug",
                "code": event.code,
                "note": "All pushes skipped in debug mode",
            })));
        }

        // 6. 并发推送所有渠道
        let title = if event.code.is_some() {
            "📩 短信验证码"
        } else {
            "📩 新短信"
        };
        let message = PushMessage::new(title, &event.content)
            .with_device(&event.device)
            .with_code(event.code.clone())
            .with_targets(event.targets.clone());

        let outcome = self.dispatcher.dispatch(&message).await;

        if !outcome.any_success {
            error!("All push channels failed");
            return Err(ForwardError::AllChannelsFailed(outcome.errors_json()));
        }

        info!(code = ?event.code, "SMS forwarded");

        let mut body = json!({
            "success": true,
            "message": "forwarded",
            "code": event.code,
        });
        for (name, value) in outcome.results_json() {
            body[name.as_str()] = value;
        }
        Ok(ForwardReply::ok(body))
    }
}

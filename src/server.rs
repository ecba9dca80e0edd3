//! HTTP 服务 - 路由和请求适配
//!
//! 这一层只做 axum 类型到管道入参的转换，所有业务规则在
//! [`crate::pipeline::ForwardPipeline`] 里，可以脱离 HTTP 测试。

use crate::config::AppConfig;
use crate::pipeline::ForwardPipeline;
use crate::store::{KvStore, MemoryStore};
use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ForwardQuery {
    debug: Option<String>,
}

/// 组装路由
pub fn build_router(pipeline: ForwardPipeline) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sms", post(forward_sms))
        .with_state(Arc::new(pipeline))
}

async fn health() -> &'static str {
    "ok"
}

async fn forward_sms(
    State(pipeline): State<Arc<ForwardPipeline>>,
    Query(query): Query<ForwardQuery>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let auth = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok());
    let client_ip = client_ip_from_headers(&headers);
    let debug = query.debug.as_deref() == Some("true");

    let reply = pipeline
        .handle(auth, client_ip.as_deref(), debug, &body)
        .await;
    (reply.status, Json(reply.body))
}

/// 从代理头解析客户端 IP
///
/// CF-Connecting-IP 优先，其次 X-Forwarded-For 的首个地址。
/// 只用于限流键，不做格式校验。
pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    for name in ["CF-Connecting-IP", "X-Forwarded-For"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    None
}

/// 启动 HTTP 网关
pub async fn serve(config: AppConfig) -> Result<()> {
    let bind = config.bind_address.clone();
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let pipeline = ForwardPipeline::new(config, store)?;
    let app = build_router(pipeline);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(address = %bind, "SMS forward gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// crates/prompt-gate-gateway/src/server.rs
// ============================================================================
// Module: HTTP Surface
// Description: Axum router, handlers, and HTTP error taxonomy.
// Purpose: Enforce the per-request pipeline ordering behind one router.
// Dependencies: axum, prompt-gate-core, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! The server wires the fixed per-request pipeline: admission, trace
//! derivation, authentication, quota, rule evaluation, and only then the
//! upstream forwarder. Blocked and guided verdicts synthesize a
//! completion-shaped body locally so the upstream is never consulted for
//! rejected prompts. Administrative endpoints sit behind the constant-time
//! admin token and always fail with one fixed body.
//!
//! ## Invariants
//! - The admission permit is held for the full handler scope and released
//!   on drop, covering every error path.
//! - A malformed inbound `traceparent` never fails a request; a fresh root
//!   context is generated instead.
//! - Every response carries the derived `traceparent` and a request id.
//!
//! ## Security posture
//! Handlers treat headers and bodies as untrusted; admin verification runs
//! in constant time and rejections are indistinguishable by cause.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::RETRY_AFTER;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use prompt_gate_core::ProviderKind;
use prompt_gate_core::QuotaExceeded;
use prompt_gate_core::QuotaGuard;
use prompt_gate_core::RuleAction;
use prompt_gate_core::RuleResult;
use prompt_gate_core::TRACEPARENT_HEADER;
use prompt_gate_core::TraceContext;

use crate::admission::AdmissionController;
use crate::admission::RequestKind;
use crate::auth::AdminToken;
use crate::auth::AuthError;
use crate::auth::AuthResolver;
use crate::auth::Unauthorized;
use crate::engine::RuleEngine;
use crate::forward::ChatCompletionRequest;
use crate::forward::CompletionForwarder;
use crate::forward::ForwardError;
use crate::metrics::MetricsAggregator;
use crate::store::TenantStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Endpoint label for completion metrics.
const CHAT_ENDPOINT: &str = "/v1/chat/completions";

/// Request id header echoed or generated on every completion response.
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Shared handler state, constructed once by the composition root.
///
/// # Invariants
/// - Every field is injected; the server owns no global state.
#[derive(Clone)]
pub struct GatewayState {
    /// Dual-pool admission gate.
    pub admission: Arc<AdmissionController>,
    /// Cached credential resolver.
    pub auth: Arc<AuthResolver>,
    /// Moderation rule engine.
    pub engine: Arc<RuleEngine>,
    /// Counter aggregator.
    pub metrics: Arc<MetricsAggregator>,
    /// Upstream completion forwarder.
    pub forwarder: Arc<dyn CompletionForwarder>,
    /// Tenant store, consulted directly only for health reporting.
    pub store: Arc<dyn TenantStore>,
    /// Privileged admin token.
    pub admin: AdminToken,
    /// Current academic week for rule scoping and quota resets.
    pub current_week: u32,
}

/// Builds the gateway router over `state`.
#[must_use]
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/health", get(health))
        .route("/metrics", get(metrics_exposition))
        .route("/stats", get(stats))
        .route("/metrics/router", get(admission_stats))
        .route("/admin/rules/reload", post(reload_rules))
        .with_state(state)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Handler failures mapped onto the HTTP error taxonomy.
///
/// # Invariants
/// - Rendered bodies never include credential material or internal detail
///   beyond the variant's fixed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Missing or unknown tenant credential.
    #[error("invalid or missing API key")]
    Unauthenticated,
    /// Missing or wrong admin token.
    #[error("invalid or missing admin token")]
    Unauthorized,
    /// The tenant's weekly budget is exhausted.
    #[error("weekly quota exceeded")]
    Quota(QuotaExceeded),
    /// The admission wait elapsed; the caller should retry shortly.
    #[error("server is at capacity")]
    AdmissionRejected,
    /// The upstream call failed.
    #[error(transparent)]
    Forward(#[from] ForwardError),
    /// Unexpected internal failure.
    #[error("internal error")]
    Internal,
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::Store(_) => Self::Internal,
        }
    }
}

impl From<Unauthorized> for GatewayError {
    fn from(_err: Unauthorized) -> Self {
        Self::Unauthorized
    }
}

impl GatewayError {
    /// HTTP status for this failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            // Backpressure shares 429 with quota exhaustion rather than a
            // 5xx; the bodies stay distinguishable.
            Self::Quota(_) | Self::AdmissionRejected => StatusCode::TOO_MANY_REQUESTS,
            Self::Forward(_) => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Quota(exceeded) => (
                status,
                Json(json!({
                    "error": "weekly quota exceeded",
                    "remaining": exceeded.remaining,
                    "reset_week": exceeded.reset_week,
                })),
            )
                .into_response(),
            Self::AdmissionRejected => (
                status,
                [(RETRY_AFTER, HeaderValue::from_static("1"))],
                Json(json!({
                    "detail": "server is at capacity, please retry shortly",
                })),
            )
                .into_response(),
            other => (status, Json(json!({ "detail": other.to_string() }))).into_response(),
        }
    }
}

// ============================================================================
// SECTION: Completion Handler
// ============================================================================

/// `POST /v1/chat/completions`: the full moderated completion pipeline.
pub async fn chat_completions(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let start = Instant::now();
    let response = match handle_completion(&state, &headers, &request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    state
        .metrics
        .record_request(CHAT_ENDPOINT, start.elapsed(), response.status().as_u16());
    response
}

/// Runs the pipeline for one completion request.
///
/// # Errors
///
/// Returns [`GatewayError`] for any stage failure; the admission permit is
/// released on every path when this scope ends.
async fn handle_completion(
    state: &GatewayState,
    headers: &HeaderMap,
    request: &ChatCompletionRequest,
) -> Result<Response, GatewayError> {
    let kind = if request.stream {
        RequestKind::Streaming
    } else {
        RequestKind::Normal
    };
    let _permit = state
        .admission
        .acquire(kind)
        .await
        .ok_or(GatewayError::AdmissionRejected)?;

    let parent = headers
        .get(TRACEPARENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(TraceContext::parse)
        .unwrap_or_else(TraceContext::generate);
    let child = parent.derive_child();
    let request_id = headers
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| child.trace_id().to_string(), str::to_string);

    let tenant = state.auth.resolve(headers).await?;

    let quota = QuotaGuard.check(&tenant, state.current_week);
    state.metrics.record_quota_check(quota.is_err());
    quota.map_err(GatewayError::Quota)?;

    let prompt = request.last_user_message().unwrap_or_default();
    let verdict = state.engine.evaluate(prompt, state.current_week).await;
    let body = match verdict.action {
        RuleAction::Blocked | RuleAction::Guided => synthesized_completion(&verdict, &request.model),
        RuleAction::Passed => {
            let traceparent = child.to_traceparent();
            let upstream = state
                .forwarder
                .forward(request, tenant.provider_credential.as_deref(), &traceparent)
                .await?;
            state
                .metrics
                .record_provider_request(provider_label(tenant.provider_kind));
            upstream
        }
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    attach_trace_headers(&mut response, &child, &request_id);
    Ok(response)
}

/// Builds a completion-shaped body for a blocked or guided verdict without
/// contacting the upstream.
fn synthesized_completion(verdict: &RuleResult, model: &str) -> Value {
    let prefix = if verdict.action == RuleAction::Guided {
        "guided"
    } else {
        "blocked"
    };
    let rule_id = verdict.rule_id.as_deref().unwrap_or("unknown");
    let message = verdict.message.as_deref().unwrap_or_default();
    json!({
        "id": format!("{prefix}-{rule_id}"),
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": message },
            "finish_reason": "stop",
        }],
        "usage": { "prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0 },
    })
}

/// Attaches the derived trace context and request id to a response.
fn attach_trace_headers(response: &mut Response, trace: &TraceContext, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(&trace.to_traceparent()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(TRACEPARENT_HEADER), value);
    }
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

/// Stats label for a tenant's provider.
const fn provider_label(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "openai",
        ProviderKind::OpenRouter => "openrouter",
        ProviderKind::DeepSeek => "deepseek",
        ProviderKind::Mock => "mock",
    }
}

// ============================================================================
// SECTION: Admin Handlers
// ============================================================================

/// `GET /metrics`: scrape-format exposition, admin only.
pub async fn metrics_exposition(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    state.admin.verify_headers(&headers)?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"))],
        state.metrics.exposition(),
    )
        .into_response())
}

/// `GET /stats`: aggregated summary, admin only.
pub async fn stats(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    state.admin.verify_headers(&headers)?;
    Ok(Json(state.metrics.summary()).into_response())
}

/// `GET /metrics/router`: admission pool snapshot, admin only.
pub async fn admission_stats(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    state.admin.verify_headers(&headers)?;
    Ok(Json(state.admission.stats()).into_response())
}

/// `POST /admin/rules/reload`: drops the cached rule set, admin only.
pub async fn reload_rules(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    state.admin.verify_headers(&headers)?;
    state.engine.reload();
    Ok(Json(json!({ "status": "reloaded" })).into_response())
}

// ============================================================================
// SECTION: Health Handler
// ============================================================================

/// `GET /health`: per-component status, unauthenticated.
pub async fn health(State(state): State<GatewayState>) -> Response {
    let store_ok = state.store.healthy().await;
    let upstream_ok = state.forwarder.healthy().await;
    let status = if store_ok && upstream_ok { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "components": {
            "tenant_store": component(store_ok),
            "key_cache": {
                "status": "ok",
                "entries": state.auth.cached_entries(),
            },
            "upstream": component(upstream_ok),
        },
    }))
    .into_response()
}

/// Renders one component status block.
fn component(ok: bool) -> Value {
    json!({ "status": if ok { "ok" } else { "degraded" } })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/prompt-gate-gateway/src/forward.rs
// ============================================================================
// Module: Completion Forwarder
// Description: Upstream chat-completion relay with trace propagation.
// Purpose: Provide the outbound seam between moderation and the provider.
// Dependencies: async-trait, reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The forwarder relays admitted chat-completion requests to the configured
//! upstream provider. Each call carries the tenant's own provider credential
//! as the bearer token and the derived trace context header, so upstream
//! logs correlate with gateway traces. The request body is the familiar
//! chat-completion shape and the upstream response body is returned as
//! opaque JSON; the gateway never rewrites provider output.
//!
//! ## Invariants
//! - Requests without a tenant provider credential are rejected before any
//!   network traffic.
//! - The configured request timeout bounds the full call lifecycle.
//!
//! ## Security posture
//! Provider credentials pass through request headers only and are never
//! retained or rendered in errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use prompt_gate_core::TRACEPARENT_HEADER;

// ============================================================================
// SECTION: Request Model
// ============================================================================

/// One message in a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role, e.g. `"user"` or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Chat-completion request body relayed to the upstream provider.
///
/// # Invariants
/// - Optional fields serialize only when present, so the upstream sees the
///   caller's request shape unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier requested by the caller.
    pub model: String,
    /// Conversation messages in order.
    pub messages: Vec<ChatMessage>,
    /// Streaming flag; also selects the admission pool.
    #[serde(default)]
    pub stream: bool,
    /// Optional completion token cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Optional sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl ChatCompletionRequest {
    /// Returns the content of the last user-role message, the text the
    /// moderation rules evaluate.
    #[must_use]
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == "user")
            .map(|message| message.content.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors emitted when relaying to the upstream provider.
///
/// # Invariants
/// - Variants never carry credential material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    /// The tenant has no provider credential configured.
    #[error("tenant has no provider credential configured")]
    MissingCredential,
    /// The upstream could not be reached or the call timed out.
    #[error("upstream request failed: {0}")]
    Unreachable(String),
    /// The upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),
    /// The upstream body was not valid JSON.
    #[error("upstream returned a malformed body")]
    MalformedBody,
}

// ============================================================================
// SECTION: Forwarder Seam
// ============================================================================

/// Outbound seam between moderation and the upstream provider.
#[async_trait]
pub trait CompletionForwarder: Send + Sync {
    /// Relays `request` upstream with the tenant's credential and the given
    /// trace context header value.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError`] when the credential is missing, the upstream
    /// is unreachable, or the response is unusable.
    async fn forward(
        &self,
        request: &ChatCompletionRequest,
        provider_credential: Option<&str>,
        traceparent: &str,
    ) -> Result<Value, ForwardError>;

    /// Returns true when the upstream is considered reachable, for health
    /// reporting.
    async fn healthy(&self) -> bool;
}

// ============================================================================
// SECTION: HTTP Forwarder
// ============================================================================

/// Configuration for the HTTP forwarder.
///
/// # Invariants
/// - `timeout` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpForwarderConfig {
    /// Upstream base URL, e.g. `https://openrouter.ai/api`.
    pub base_url: String,
    /// Full-lifecycle request timeout.
    pub timeout: Duration,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpForwarderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api".to_string(),
            timeout: Duration::from_secs(60),
            user_agent: "prompt-gate/0.1".to_string(),
        }
    }
}

/// Reqwest-backed forwarder targeting one upstream base URL.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    /// Forwarder configuration.
    config: HttpForwarderConfig,
    /// Shared HTTP client.
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Creates a forwarder with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Unreachable`] when the HTTP client cannot be
    /// built.
    pub fn new(config: HttpForwarderConfig) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|_| ForwardError::Unreachable("http client build failed".to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Completion endpoint URL under the configured base.
    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionForwarder for HttpForwarder {
    async fn forward(
        &self,
        request: &ChatCompletionRequest,
        provider_credential: Option<&str>,
        traceparent: &str,
    ) -> Result<Value, ForwardError> {
        let credential = provider_credential.ok_or(ForwardError::MissingCredential)?;
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(credential)
            .header(TRACEPARENT_HEADER, traceparent)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ForwardError::Unreachable("upstream request timed out".to_string())
                } else {
                    ForwardError::Unreachable("upstream connection failed".to_string())
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForwardError::UpstreamStatus(status.as_u16()));
        }
        response.json::<Value>().await.map_err(|_| ForwardError::MalformedBody)
    }

    async fn healthy(&self) -> bool {
        // Reachability is judged per request; a built client is reported
        // healthy until a probe endpoint exists upstream.
        true
    }
}

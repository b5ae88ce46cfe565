// crates/prompt-gate-gateway/src/main.rs
// ============================================================================
// Module: Gateway Entry Point
// Description: Composition root wiring configuration into the HTTP server.
// Purpose: Build shared state once and serve; no logic lives here.
// Dependencies: prompt-gate-gateway, thiserror, tokio
// ============================================================================

//! ## Overview
//! The binary loads configuration from the environment, constructs every
//! collaborator exactly once, and hands the wired router to `axum::serve`.
//! A missing admin token or unbindable address aborts startup with a
//! descriptive message on stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;

use prompt_gate_gateway::admission::AdmissionConfig;
use prompt_gate_gateway::admission::AdmissionController;
use prompt_gate_gateway::auth::AdminToken;
use prompt_gate_gateway::auth::AuthResolver;
use prompt_gate_gateway::config::ConfigError;
use prompt_gate_gateway::config::GatewayConfig;
use prompt_gate_gateway::engine::RuleEngine;
use prompt_gate_gateway::forward::CompletionForwarder;
use prompt_gate_gateway::forward::ForwardError;
use prompt_gate_gateway::forward::HttpForwarder;
use prompt_gate_gateway::forward::HttpForwarderConfig;
use prompt_gate_gateway::metrics::MetricsAggregator;
use prompt_gate_gateway::server::GatewayState;
use prompt_gate_gateway::server::router;
use prompt_gate_gateway::store::InMemoryTenantStore;
use prompt_gate_gateway::store::TenantStore;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Startup failures that abort the process.
#[derive(Debug, Error)]
enum StartupError {
    /// Configuration loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The HTTP client for the forwarder could not be built.
    #[error(transparent)]
    Forwarder(#[from] ForwardError),
    /// Binding or serving the listener failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Wires shared state and serves until shutdown.
async fn run() -> Result<(), StartupError> {
    let config = GatewayConfig::from_env()?;

    let metrics = Arc::new(MetricsAggregator::new());
    let store: Arc<dyn TenantStore> = Arc::new(InMemoryTenantStore::new());
    let forwarder: Arc<dyn CompletionForwarder> = Arc::new(HttpForwarder::new(
        HttpForwarderConfig {
            base_url: config.upstream_base_url.clone(),
            timeout: config.upstream_timeout,
            user_agent: format!("prompt-gate/{}", env!("CARGO_PKG_VERSION")),
        },
    )?);
    let state = GatewayState {
        admission: Arc::new(AdmissionController::new(&AdmissionConfig {
            streaming_limit: config.streaming_limit,
            normal_limit: config.normal_limit,
            acquire_timeout: config.acquire_timeout,
        })),
        auth: Arc::new(AuthResolver::new(
            Arc::clone(&store),
            config.key_cache_ttl,
            config.key_cache_capacity,
        )),
        engine: Arc::new(RuleEngine::new(
            None,
            Arc::clone(&metrics),
            config.rule_cache_ttl,
            config.match_timeout,
        )),
        metrics,
        forwarder,
        store,
        admin: AdminToken::new(&config.admin_token),
        current_week: config.current_week,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a startup failure to stderr and maps it to a failing exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}

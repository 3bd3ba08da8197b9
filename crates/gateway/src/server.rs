use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{DefaultBodyLimit, State},
        http::header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        response::{IntoResponse, Json},
        routing::{any, get},
    },
    tower_http::{
        sensitive_headers::{SetSensitiveRequestHeadersLayer, SetSensitiveResponseHeadersLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use food_dispatch_config::DispatchConfig;

use crate::{proxy, state::GatewayState};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let mount = state.mount_path.clone();
    let router = Router::new().route("/health", get(health_handler));

    let router = if mount.is_empty() {
        router
            .route("/", any(proxy::handle))
            .route("/{*path}", any(proxy::handle))
    } else {
        router
            .route(&mount, any(proxy::handle))
            .route(&format!("{mount}/"), any(proxy::handle))
            .route(&format!("{mount}/{{*path}}"), any(proxy::handle))
    };

    router
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(SetSensitiveResponseHeadersLayer::new([SET_COOKIE]))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION, COOKIE]))
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start_gateway(config: DispatchConfig) -> anyhow::Result<()> {
    let state = GatewayState::from_config(&config)?;
    let app = build_gateway_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let mount = if state.mount_path.is_empty() {
        "/"
    } else {
        state.mount_path.as_str()
    };
    let lines = [
        format!("food-dispatch gateway v{}", state.version),
        format!("listening on {addr}, proxying {mount}"),
        format!("backend: {}", state.upstream.base_url()),
        format!(
            "session cookie: {} (secure: {})",
            state.cookies.name(),
            state.cookies.is_secure()
        ),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "backend": state.upstream.base_url().as_str(),
    }))
}

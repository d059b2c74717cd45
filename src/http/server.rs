//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the compose and history handlers
//! - Wire up middleware (tracing, body limit, request ID, timeout)
//! - Bind server to listener and stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::compose::{Composer, HistorySink, MemoryHistory, NoHistory};
use crate::config::ComposerConfig;
use crate::forward::ForwardError;
use crate::http::request::{caller_context, parse_compose_body, request_id, ComposeQuery, MakeRequestUuid};

pub const COMPOSE_PATH: &str = "/cgi-bin/composer";
pub const HISTORY_PATH: &str = "/cgi-bin/history";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub composer: Composer,
    pub history: Option<Arc<MemoryHistory>>,
}

impl AppState {
    pub fn from_config(config: &ComposerConfig) -> Result<Self, ForwardError> {
        let history = config
            .history
            .enabled
            .then(|| Arc::new(MemoryHistory::new(config.history.capacity)));
        let sink: Arc<dyn HistorySink> = match &history {
            Some(history) => history.clone(),
            None => Arc::new(NoHistory),
        };
        Ok(Self {
            composer: Composer::new(config, sink)?,
            history,
        })
    }
}

/// HTTP server exposing the composer.
pub struct ComposeServer {
    router: Router,
}

impl ComposeServer {
    pub fn new(config: &ComposerConfig) -> Result<Self, ForwardError> {
        Ok(Self::with_state(config, AppState::from_config(config)?))
    }

    pub fn with_state(config: &ComposerConfig, state: AppState) -> Self {
        Self {
            router: build_router(config, state),
        }
    }

    /// The router without connect info; tests drive it with `oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ComposerConfig, state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

    Router::new()
        .route(COMPOSE_PATH, post(compose_handler))
        .route(HISTORY_PATH, get(history_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.limits.max_request_body))
        .layer(middleware)
}

async fn compose_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<ComposeQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id(&headers).to_string();
    let request = match parse_compose_body(&headers, &body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected compose body");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    drop(body);

    let caller = caller_context(&headers, addr, &query);
    tracing::debug!(
        request_id = %request_id,
        client = %addr,
        need_response = caller.need_response,
        "Compose request received"
    );
    Json(state.composer.compose(request, caller).await).into_response()
}

async fn history_handler(State(state): State<AppState>) -> Response {
    let entries = state
        .history
        .as_ref()
        .map(|history| history.snapshot())
        .unwrap_or_default();
    Json(entries).into_response()
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum app whose fallback runs match + dispatch
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Register the static mounts declared in config
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{MountConfig, ServerConfig};
use crate::dispatch::{DispatchChain, Fallbacks, ResponseSink};
use crate::error::{RegistrationError, ServerError};
use crate::http::request::{MakeRequestUuid, RequestContext};
use crate::observability::metrics;
use crate::routing::{RouteRegistry, StaticOptions};

/// Application state injected into the dispatch handler.
#[derive(Clone)]
struct AppState {
    registry: Arc<RouteRegistry>,
    fallbacks: Arc<Fallbacks>,
    subdomain_offset: usize,
    max_body_size: usize,
}

/// HTTP server driving a [`RouteRegistry`].
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    registry: Arc<RouteRegistry>,
}

impl HttpServer {
    /// Create a server from a fully populated registry.
    pub fn new(config: ServerConfig, registry: RouteRegistry, fallbacks: Fallbacks) -> Self {
        let registry = Arc::new(registry);
        let state = AppState {
            registry: registry.clone(),
            fallbacks: Arc::new(fallbacks),
            subdomain_offset: config.routing.subdomain_offset,
            max_body_size: config.limits.max_body_size,
        };

        tracing::info!(
            mounts = registry.mounts().len(),
            routes = registry.routes().len(),
            "Route registry frozen"
        );

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
        }
    }

    /// Create a server serving only the mounts declared in `config`.
    pub fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        let mut registry = RouteRegistry::new().with_case_sensitive(config.routing.case_sensitive);
        register_mounts(&mut registry, &config.mounts)?;
        Ok(Self::new(config, registry, Fallbacks::default()))
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.limits.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled Axum app, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Register every `[[mounts]]` entry, failing on the first bad one.
pub fn register_mounts(registry: &mut RouteRegistry, mounts: &[MountConfig]) -> Result<(), RegistrationError> {
    for mount in mounts {
        let options = StaticOptions {
            path: Some(mount.path.clone()),
            sub_domain: Some(mount.sub_domain.clone()),
            case_sensitive: mount.case_sensitive,
            dotfiles: mount.dotfiles,
        };
        registry.add_static(&mount.root, options)?;
    }
    Ok(())
}

/// Closes the sink if the request future is dropped before the chain ends.
struct CloseOnDrop(ResponseSink);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Entry point for every request: buffer, normalize, match, dispatch.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(method = %parts.method, path = %parts.uri.path(), error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let context = Arc::new(RequestContext::from_parts(parts, body, state.subdomain_offset));
    let matches = state.registry.match_request(&context);
    let match_count = matches.len();

    tracing::debug!(
        request_id = %context.request_id(),
        method = %context.method(),
        path = %context.path(),
        sub_domain = ?context.sub_domain(),
        matches = match_count,
        "Dispatching request"
    );

    let sink = ResponseSink::new();
    let _close = CloseOnDrop(sink.clone());
    let outcome = DispatchChain::new(matches, &state.fallbacks)
        .run(context.clone(), sink.clone())
        .await;
    let response = sink.take_response();

    metrics::record_request(outcome.as_str(), response.status().as_u16(), match_count, start);
    tracing::debug!(
        request_id = %context.request_id(),
        status = response.status().as_u16(),
        outcome = outcome.as_str(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request dispatched"
    );

    response
}

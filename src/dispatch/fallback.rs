//! Built-in fallback responses and host overrides.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::FutureExt;

use crate::dispatch::handler::{ErrorHandler, Handler, HandlerError, HandlerRequest};
use crate::dispatch::response::ResponseSink;

/// Fallback categories surfaced to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fallback {
    NotFound,
    Unauthorized,
    Forbidden,
    ServerError,
}

impl Fallback {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::ServerError => "server_error",
        }
    }

    fn default_body(self) -> &'static str {
        self.status().canonical_reason().unwrap_or("Error")
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overridable fallback handlers. Unset slots use the built-in response.
#[derive(Clone, Default)]
pub struct Fallbacks {
    not_found: Option<Arc<dyn Handler>>,
    unauthorized: Option<Arc<dyn Handler>>,
    forbidden: Option<Arc<dyn Handler>>,
    server_error: Option<Arc<dyn ErrorHandler>>,
}

impl Fallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    pub fn on_unauthorized(mut self, handler: impl Handler) -> Self {
        self.unauthorized = Some(Arc::new(handler));
        self
    }

    pub fn on_forbidden(mut self, handler: impl Handler) -> Self {
        self.forbidden = Some(Arc::new(handler));
        self
    }

    pub fn on_server_error(mut self, handler: impl ErrorHandler) -> Self {
        self.server_error = Some(Arc::new(handler));
        self
    }

    /// Render `kind` into `res`.
    ///
    /// A terminated or closed sink is left alone. An override that fails or
    /// leaves the sink open is finished with the built-in response.
    pub async fn render(&self, kind: Fallback, req: HandlerRequest, res: ResponseSink, error: Option<HandlerError>) {
        if res.is_terminated() || res.is_closed() {
            return;
        }

        let invocation = catch_unwind(AssertUnwindSafe(|| match kind {
            Fallback::NotFound => self.not_found.as_ref().map(|h| h.call(req, res.clone())),
            Fallback::Unauthorized => self.unauthorized.as_ref().map(|h| h.call(req, res.clone())),
            Fallback::Forbidden => self.forbidden.as_ref().map(|h| h.call(req, res.clone())),
            Fallback::ServerError => self.server_error.as_ref().map(|h| {
                let error = error.unwrap_or_else(|| "handler requested the server error fallback".into());
                h.call(req, res.clone(), error)
            }),
        }));
        let invocation = match invocation {
            Ok(invocation) => invocation,
            Err(_) => {
                tracing::error!(fallback = %kind, "Fallback handler panicked");
                None
            }
        };

        if let Some(fut) = invocation {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::error!(fallback = %kind, error = %e, "Fallback handler failed");
                }
                Err(_) => {
                    tracing::error!(fallback = %kind, "Fallback handler panicked");
                }
            }
        }

        finish_default(kind, &res);
    }
}

/// End an open sink with the built-in response for `kind`. A sink the
/// override already wrote to is ended as-is.
fn finish_default(kind: Fallback, res: &ResponseSink) {
    if res.is_terminated() || res.is_closed() {
        return;
    }
    let result = if res.written() == 0 {
        res.end_with(kind.status(), kind.default_body())
    } else {
        res.end()
    };
    if let Err(e) = result {
        tracing::debug!(fallback = %kind, error = %e, "Fallback response discarded");
    }
}

impl fmt::Debug for Fallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallbacks")
            .field("not_found", &self.not_found.is_some())
            .field("unauthorized", &self.unauthorized.is_some())
            .field("forbidden", &self.forbidden.is_some())
            .field("server_error", &self.server_error.is_some())
            .finish()
    }
}

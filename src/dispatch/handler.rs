//! Handler traits and the tagged result that drives the dispatch chain.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use futures_util::future::BoxFuture;

use crate::dispatch::fallback::Fallback;
use crate::dispatch::response::ResponseSink;
use crate::http::request::RequestContext;
use crate::routing::segment::Params;

/// Error returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a handler returns to the chain.
pub type HandlerResult = Result<Flow, HandlerError>;

/// Continuation signal returned by every handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next matched entry.
    Continue,
    /// Stop the chain. An open sink is ended as-is.
    Terminated,
    /// Stop the chain and render one of the fallback categories.
    Fallback(Fallback),
}

impl Flow {
    /// `Ok(Flow::Continue)`, typed so it can close a handler body.
    pub fn next() -> HandlerResult {
        Ok(Self::Continue)
    }

    /// `Ok(Flow::Terminated)`.
    pub fn done() -> HandlerResult {
        Ok(Self::Terminated)
    }
}

/// A request handler bound to a route, a static mount or a fallback slot.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: HandlerRequest, res: ResponseSink) -> BoxFuture<'static, HandlerResult>;
}

/// A fallback handler that also receives the error that caused it.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call(&self, req: HandlerRequest, res: ResponseSink, error: HandlerError) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter turning an async closure into a [`Handler`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap `f` as a [`Handler`].
///
/// ```
/// use waypoint::dispatch::{handler_fn, Flow};
///
/// let hello = handler_fn(|req, res| async move {
///     res.end_with(axum::http::StatusCode::OK, format!("hello {}", req.param("name").unwrap_or("?")))?;
///     Flow::done()
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(HandlerRequest, ResponseSink) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(HandlerRequest, ResponseSink) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: HandlerRequest, res: ResponseSink) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.f)(req, res))
    }
}

/// Adapter turning an async closure into an [`ErrorHandler`].
#[derive(Clone)]
pub struct ErrorHandlerFn<F> {
    f: F,
}

pub fn error_handler_fn<F, Fut>(f: F) -> ErrorHandlerFn<F>
where
    F: Fn(HandlerRequest, ResponseSink, HandlerError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    ErrorHandlerFn { f }
}

impl<F, Fut> ErrorHandler for ErrorHandlerFn<F>
where
    F: Fn(HandlerRequest, ResponseSink, HandlerError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: HandlerRequest, res: ResponseSink, error: HandlerError) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.f)(req, res, error))
    }
}

/// The request as seen by one handler: the shared normalized request plus
/// the parameters captured for this particular match.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    context: Arc<RequestContext>,
    params: Params,
}

impl HandlerRequest {
    pub fn new(context: Arc<RequestContext>, params: Params) -> Self {
        Self { context, params }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn method(&self) -> &Method {
        self.context.method()
    }

    pub fn uri(&self) -> &Uri {
        self.context.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.context.headers()
    }

    pub fn sub_domain(&self) -> Option<&str> {
        self.context.sub_domain()
    }

    pub fn segments(&self) -> &[String] {
        self.context.segments()
    }

    pub fn body(&self) -> &Bytes {
        self.context.body()
    }

    pub fn request_id(&self) -> &str {
        self.context.request_id()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Raw captured value for `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

//! Dispatch chain: runs the ordered match list for one request.
//!
//! ```text
//! PENDING → RUNNING(0) → RUNNING(1) → ... → TERMINATED
//!                 │            │
//!                 └────────────┴──→ TERMINATED (sink ended, fallback, fault, closed)
//! ```

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;

use crate::dispatch::fallback::{Fallback, Fallbacks};
use crate::dispatch::handler::{Flow, HandlerError, HandlerRequest};
use crate::dispatch::response::ResponseSink;
use crate::http::request::RequestContext;
use crate::routing::segment::Params;
use crate::routing::RouteMatch;

/// Where the chain is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Pending,
    Running(usize),
    Terminated,
}

/// How the chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The entry at `index` produced the response.
    Handled { index: usize },
    /// Nothing matched the request.
    NoMatch,
    /// Every matched entry continued.
    Exhausted,
    /// A handler asked for a fallback category.
    Fallback(Fallback),
    /// A handler returned an error or panicked.
    Failed { index: usize },
    /// The connection closed before the chain finished.
    Cancelled,
}

impl ChainOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handled { .. } => "handled",
            Self::NoMatch => "no_match",
            Self::Exhausted => "exhausted",
            Self::Fallback(_) => "fallback",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Sequential, continuation-driven execution of one request's matches.
pub struct DispatchChain<'a> {
    matches: Vec<RouteMatch>,
    fallbacks: &'a Fallbacks,
    state: ChainState,
}

impl<'a> DispatchChain<'a> {
    pub fn new(matches: Vec<RouteMatch>, fallbacks: &'a Fallbacks) -> Self {
        Self {
            matches,
            fallbacks,
            state: ChainState::Pending,
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Drive the chain to completion, leaving the response in `res`.
    pub async fn run(&mut self, context: Arc<RequestContext>, res: ResponseSink) -> ChainOutcome {
        if self.state != ChainState::Pending {
            return ChainOutcome::Cancelled;
        }

        if self.matches.is_empty() {
            self.state = ChainState::Terminated;
            self.render(Fallback::NotFound, &context, &res, None).await;
            return ChainOutcome::NoMatch;
        }

        self.state = ChainState::Running(0);
        while let ChainState::Running(index) = self.state {
            if res.is_closed() {
                tracing::debug!(request_id = %context.request_id(), index, "Connection closed, abandoning chain");
                self.state = ChainState::Terminated;
                return ChainOutcome::Cancelled;
            }

            let Some(entry) = self.matches.get(index) else {
                self.state = ChainState::Terminated;
                tracing::debug!(request_id = %context.request_id(), "All matches continued");
                self.render(Fallback::NotFound, &context, &res, None).await;
                return ChainOutcome::Exhausted;
            };

            let req = HandlerRequest::new(context.clone(), entry.params.clone());
            let handler = entry.entry.handler().clone();
            tracing::trace!(
                request_id = %context.request_id(),
                index,
                entry = %entry.entry,
                "Invoking handler"
            );

            let result = match catch_unwind(AssertUnwindSafe(|| handler.call(req, res.clone()))) {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(panic) => Err(panic),
            };

            let flow = match result {
                Ok(Ok(flow)) => flow,
                Ok(Err(error)) => {
                    tracing::error!(request_id = %context.request_id(), entry = %entry.entry, error = %error, "Handler failed");
                    return self.fail(index, &context, &res, error).await;
                }
                Err(panic) => {
                    let error: HandlerError = panic_message(panic).into();
                    tracing::error!(request_id = %context.request_id(), entry = %entry.entry, error = %error, "Handler panicked");
                    return self.fail(index, &context, &res, error).await;
                }
            };

            if res.is_terminated() {
                self.state = ChainState::Terminated;
                return ChainOutcome::Handled { index };
            }

            match flow {
                Flow::Continue => self.state = ChainState::Running(index + 1),
                Flow::Terminated => {
                    self.state = ChainState::Terminated;
                    if let Err(e) = res.end() {
                        tracing::debug!(request_id = %context.request_id(), error = %e, "Response discarded");
                    }
                    return ChainOutcome::Handled { index };
                }
                Flow::Fallback(kind) => {
                    self.state = ChainState::Terminated;
                    self.render(kind, &context, &res, None).await;
                    return ChainOutcome::Fallback(kind);
                }
            }
        }

        ChainOutcome::Cancelled
    }

    async fn fail(&mut self, index: usize, context: &Arc<RequestContext>, res: &ResponseSink, error: HandlerError) -> ChainOutcome {
        self.state = ChainState::Terminated;
        self.render(Fallback::ServerError, context, res, Some(error)).await;
        ChainOutcome::Failed { index }
    }

    /// Render a fallback in place of whatever earlier handlers left in the sink.
    async fn render(&self, kind: Fallback, context: &Arc<RequestContext>, res: &ResponseSink, error: Option<HandlerError>) {
        if let Err(e) = res.reset() {
            tracing::debug!(request_id = %context.request_id(), fallback = %kind, error = %e, "Sink not reset");
        }
        let req = HandlerRequest::new(context.clone(), Params::new());
        self.fallbacks.render(kind, req, res.clone(), error).await;
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

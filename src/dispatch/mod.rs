//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Vec<RouteMatch> (from routing::RouteRegistry)
//!     → chain.rs (run handlers in order)
//!         → handler.rs (Flow::Continue / Terminated / Fallback)
//!         → response.rs (shared ResponseSink)
//!     → fallback.rs (not found / unauthorized / forbidden / server error)
//!     → ResponseSink::take_response → client
//! ```
//!
//! # Design Decisions
//! - Handlers return an explicit `Flow` instead of calling a continuation
//! - A sink that has been ended stops the chain, whatever the handler returned
//! - Handler errors and panics are caught and rendered as server errors
//! - Running out of matches renders the same response as matching nothing

pub mod chain;
pub mod fallback;
pub mod handler;
pub mod response;

pub use chain::{ChainOutcome, ChainState, DispatchChain};
pub use fallback::{Fallback, Fallbacks};
pub use handler::{
    error_handler_fn, handler_fn, ErrorHandler, Flow, Handler, HandlerError, HandlerRequest, HandlerResult,
};
pub use response::{ResponseSink, SinkError};

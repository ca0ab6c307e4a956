//! Waypoint: an ordered, fall-through HTTP route dispatcher.
//!
//! Static directory mounts and dynamic `<:name>` routes share one registry.
//! Every entry that matches a request runs in order until one ends the
//! response; the rest fall through to the next, and a miss ends in the
//! not-found page.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use dispatch::{Fallback, Fallbacks, Flow, Handler, HandlerRequest, HandlerResult, ResponseSink};
pub use error::{RegistrationError, ServerError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{DotfilePolicy, RouteMethod, RouteOptions, RouteRegistry, StaticOptions};

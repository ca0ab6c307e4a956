//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body buffering)
//!     → request.rs (request ID, subdomain, path segments)
//!     → routing::RouteRegistry (ordered match list)
//!     → dispatch::DispatchChain (handlers, fallbacks)
//!     → static_files.rs (when a static mount is in the chain)
//!     → ResponseSink → Send to client
//! ```

pub mod request;
pub mod server;
pub mod static_files;

pub use request::{MakeRequestUuid, RequestContext, X_REQUEST_ID};
pub use server::{register_mounts, HttpServer};
pub use static_files::StaticFileHandler;

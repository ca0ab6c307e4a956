//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     add / add_static
//!     → segment.rs (compile `<:name>` templates once)
//!     → mount.rs (validate static roots once)
//!     → registry.rs (static mounts first, then routes, each in insertion order)
//!
//! Incoming Request (method, host, path)
//!     → path.rs (split segments, derive subdomain)
//!     → registry.rs (collect every matching entry, in order)
//!     → Return: Vec<RouteMatch> (may be empty)
//! ```
//!
//! # Design Decisions
//! - Templates compiled at registration, no regex in the hot path
//! - Deterministic: same input always yields the same ordered match list
//! - Params belong to the match, never to the registered entry

pub mod mount;
pub mod path;
pub mod registry;
pub mod route;
pub mod segment;

pub use mount::{DotfilePolicy, StaticMount, StaticOptions};
pub use registry::{Entry, RouteMatch, RouteRegistry};
pub use route::{Route, RouteMethod, RouteOptions, ANY_SUBDOMAIN};
pub use segment::{Params, PathTemplate};

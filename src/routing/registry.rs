//! Route registry and lookup.
//!
//! # Responsibilities
//! - Store static mounts and dynamic routes in registration order
//! - Return every entry matching a request, static mounts first
//! - Hand captured parameters back with each match
//!
//! # Design Decisions
//! - Immutable after start-up; shared via `Arc` without locks
//! - No ranking by specificity: order is mounts then routes, each as added
//! - Parameters live in the returned `RouteMatch`, never on the entry

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use axum::http::Method;

use crate::dispatch::handler::{handler_fn, Handler, HandlerRequest, HandlerResult};
use crate::dispatch::response::ResponseSink;
use crate::error::RegistrationError;
use crate::http::request::RequestContext;
use crate::routing::mount::{StaticMount, StaticOptions};
use crate::routing::route::{Route, RouteMethod, RouteOptions};
use crate::routing::segment::Params;

/// A registry entry of either kind.
#[derive(Debug, Clone)]
pub enum Entry {
    Static(Arc<StaticMount>),
    Route(Arc<Route>),
}

impl Entry {
    pub fn handler(&self) -> &Arc<dyn Handler> {
        match self {
            Self::Static(mount) => mount.handler(),
            Self::Route(route) => route.handler(),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(mount) => write!(f, "STATIC /{}", mount.path().join("/")),
            Self::Route(route) => write!(f, "{} {}", route.method(), route.template()),
        }
    }
}

/// One matched entry together with the parameters captured for this request.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Entry,
    pub params: Params,
}

/// All registered routes and static mounts.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    mounts: Vec<Arc<StaticMount>>,
    routes: Vec<Arc<Route>>,
    all: Vec<Entry>,
    case_sensitive: bool,
}

macro_rules! verb_helpers {
    ($($name:ident => $method:expr),* $(,)?) => {
        $(
            #[doc = concat!("Register an async closure for `", stringify!($name), "` requests.")]
            pub fn $name<F, Fut>(&mut self, template: &str, f: F) -> Result<(), RegistrationError>
            where
                F: Fn(HandlerRequest, ResponseSink) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = HandlerResult> + Send + 'static,
            {
                self.add($method, template, handler_fn(f), RouteOptions::default())
            }
        )*
    };
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default case rule for entries that do not set one (insensitive unless changed).
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Register a dynamic route.
    pub fn add(
        &mut self,
        method: impl Into<RouteMethod>,
        template: &str,
        handler: impl Handler,
        options: RouteOptions,
    ) -> Result<(), RegistrationError> {
        let case_sensitive = options.case_sensitive.unwrap_or(self.case_sensitive);
        let route = Route::new(method.into(), template, Arc::new(handler), options.sub_domain, case_sensitive)?;

        tracing::debug!(
            method = %route.method(),
            template = %route.template(),
            sub_domain = %route.sub_domain(),
            case_sensitive,
            catch_all = route.path().is_catch_all(),
            params = ?route.path().param_names(),
            "Route registered"
        );
        self.routes.push(Arc::new(route));
        self.rebuild();
        Ok(())
    }

    verb_helpers! {
        get => Method::GET,
        post => Method::POST,
        put => Method::PUT,
        patch => Method::PATCH,
        delete => Method::DELETE,
        head => Method::HEAD,
        options => Method::OPTIONS,
        any => RouteMethod::Use,
    }

    /// Register a static mount serving files below `root`.
    pub fn add_static(&mut self, root: impl AsRef<Path>, options: StaticOptions) -> Result<(), RegistrationError> {
        let mount = StaticMount::new(root.as_ref(), options, self.case_sensitive)?;

        tracing::debug!(
            root = %mount.root().display(),
            path = %format!("/{}", mount.path().join("/")),
            sub_domain = %mount.sub_domain(),
            dotfiles = %mount.dotfiles(),
            "Static mount registered"
        );
        self.mounts.push(Arc::new(mount));
        self.rebuild();
        Ok(())
    }

    fn rebuild(&mut self) {
        self.all = self
            .mounts
            .iter()
            .cloned()
            .map(Entry::Static)
            .chain(self.routes.iter().cloned().map(Entry::Route))
            .collect();
    }

    /// Every entry in match order: static mounts, then routes.
    pub fn entries(&self) -> &[Entry] {
        &self.all
    }

    pub fn mounts(&self) -> &[Arc<StaticMount>] {
        &self.mounts
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Match a normalized request.
    pub fn match_request(&self, req: &RequestContext) -> Vec<RouteMatch> {
        self.match_parts(req.method(), req.sub_domain(), req.segments())
    }

    /// Match on the three normalized fields directly. Never fails: no match
    /// is an empty list.
    pub fn match_parts(&self, method: &Method, sub_domain: Option<&str>, segments: &[String]) -> Vec<RouteMatch> {
        self.all
            .iter()
            .filter_map(|entry| {
                let params = match entry {
                    Entry::Static(mount) => mount.match_request(sub_domain, segments).then(Params::new)?,
                    Entry::Route(route) => route.match_request(method, sub_domain, segments)?,
                };
                Some(RouteMatch {
                    entry: entry.clone(),
                    params,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::Flow;
    use crate::routing::path::split_segments;

    fn temp_root() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("waypoint-registry-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn matched(registry: &RouteRegistry, method: Method, path: &str) -> Vec<RouteMatch> {
        registry.match_parts(&method, None, &split_segments(path))
    }

    #[test]
    fn test_single_param_round_trip() {
        let mut registry = RouteRegistry::new();
        registry.get("/users/<:id>", |_req, _res| async { Flow::next() }).unwrap();

        let matches = matched(&registry, Method::GET, "/users/42");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].params.get("id"), Some("42"));
    }

    #[test]
    fn test_method_rule() {
        let mut registry = RouteRegistry::new();
        registry.get("/a", |_req, _res| async { Flow::next() }).unwrap();
        registry.post("/a", |_req, _res| async { Flow::next() }).unwrap();
        registry.any("/a", |_req, _res| async { Flow::next() }).unwrap();

        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE] {
            for m in matched(&registry, method.clone(), "/a") {
                let Entry::Route(route) = &m.entry else {
                    panic!("only routes registered");
                };
                assert!(route.method().matches(&method));
            }
        }
        assert_eq!(matched(&registry, Method::GET, "/a").len(), 2);
        assert_eq!(matched(&registry, Method::PUT, "/a").len(), 1);
    }

    #[test]
    fn test_static_before_dynamic_regardless_of_registration_order() {
        let root = temp_root();
        let mut registry = RouteRegistry::new();
        registry.get("/assets/<:name>", |_req, _res| async { Flow::next() }).unwrap();
        registry.any("*", |_req, _res| async { Flow::next() }).unwrap();
        registry.add_static(&root, StaticOptions::default().path("/assets")).unwrap();

        let matches = matched(&registry, Method::GET, "/assets/logo.png");
        assert_eq!(matches.len(), 3);
        assert!(matches[0].entry.is_static());
        assert!(!matches[1].entry.is_static());
        assert_eq!(matches[1].params.get("name"), Some("logo.png"));
        assert_eq!(matches[2].entry.to_string(), "USE *");
    }

    #[test]
    fn test_registration_order_preserved_within_kind() {
        let mut registry = RouteRegistry::new();
        registry.get("/<:a>", |_req, _res| async { Flow::next() }).unwrap();
        registry.get("/fixed", |_req, _res| async { Flow::next() }).unwrap();

        let matches = matched(&registry, Method::GET, "/fixed");
        let names: Vec<String> = matches.iter().map(|m| m.entry.to_string()).collect();
        assert_eq!(names, vec!["GET /<:a>", "GET /fixed"]);
    }

    #[test]
    fn test_catch_all_any_length() {
        let mut registry = RouteRegistry::new();
        registry.get("*", |_req, _res| async { Flow::next() }).unwrap();
        assert_eq!(matched(&registry, Method::GET, "/").len(), 1);
        assert_eq!(matched(&registry, Method::GET, "/a/b/c/d/e").len(), 1);
        assert!(matched(&registry, Method::POST, "/a").is_empty());
    }

    #[test]
    fn test_no_match_is_empty() {
        let mut registry = RouteRegistry::new();
        registry.get("/archive/<:y>-<:m>", |_req, _res| async { Flow::next() }).unwrap();
        assert!(matched(&registry, Method::GET, "/archive/202407").is_empty());

        let matches = matched(&registry, Method::GET, "/archive/2024-07");
        assert_eq!(matches[0].params.get("y"), Some("2024"));
        assert_eq!(matches[0].params.get("m"), Some("07"));
    }

    #[test]
    fn test_params_not_shared_between_requests() {
        let mut registry = RouteRegistry::new();
        registry.get("/users/<:id>", |_req, _res| async { Flow::next() }).unwrap();
        let first = matched(&registry, Method::GET, "/users/1");
        let second = matched(&registry, Method::GET, "/users/2");
        assert_eq!(first[0].params.get("id"), Some("1"));
        assert_eq!(second[0].params.get("id"), Some("2"));
    }

    #[test]
    fn test_registry_case_default() {
        let mut registry = RouteRegistry::new().with_case_sensitive(true);
        registry.get("/Users", |_req, _res| async { Flow::next() }).unwrap();
        registry
            .add(Method::GET, "/Admin", handler_fn(|_req, _res| async { Flow::next() }), RouteOptions::default().case_sensitive(false))
            .unwrap();
        assert!(matched(&registry, Method::GET, "/users").is_empty());
        assert_eq!(matched(&registry, Method::GET, "/admin").len(), 1);
    }

    #[test]
    fn test_registration_errors() {
        let mut registry = RouteRegistry::new();
        assert!(matches!(
            registry.get("", |_req, _res| async { Flow::next() }),
            Err(RegistrationError::EmptyTemplate)
        ));
        assert!(matches!(
            registry.get("/<:id", |_req, _res| async { Flow::next() }),
            Err(RegistrationError::MalformedTemplate { .. })
        ));
        let missing = std::env::temp_dir().join(format!("waypoint-none-{}", uuid::Uuid::new_v4()));
        assert!(matches!(
            registry.add_static(&missing, StaticOptions::default()),
            Err(RegistrationError::RootNotFound(_))
        ));
        assert!(registry.is_empty());
    }
}

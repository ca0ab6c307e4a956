//! Dynamic pattern routes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::Method;

use crate::dispatch::handler::Handler;
use crate::error::RegistrationError;
use crate::routing::path::eq_with_case;
use crate::routing::segment::{Params, PathTemplate};

/// Subdomain wildcard.
pub const ANY_SUBDOMAIN: &str = "*";

/// The method a route is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    /// `USE`: any method.
    Use,
    /// One of the standard HTTP verbs.
    Verb(Method),
}

impl RouteMethod {
    const VERBS: [Method; 9] = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::CONNECT,
        Method::OPTIONS,
        Method::TRACE,
        Method::PATCH,
    ];

    /// Parse `USE` or a standard verb. Names are case-sensitive.
    pub fn parse(s: &str) -> Result<Self, RegistrationError> {
        if s == "USE" {
            return Ok(Self::Use);
        }
        Self::VERBS
            .iter()
            .find(|m| m.as_str() == s)
            .map(|m| Self::Verb(m.clone()))
            .ok_or_else(|| RegistrationError::InvalidMethod(s.to_string()))
    }

    /// Reject extension methods; only the fixed verb set is routable.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        match self {
            Self::Use => Ok(()),
            Self::Verb(m) if Self::VERBS.contains(m) => Ok(()),
            Self::Verb(m) => Err(RegistrationError::InvalidMethod(m.to_string())),
        }
    }

    /// `USE` matches everything; a verb matches only itself.
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            Self::Use => true,
            Self::Verb(m) => m == method,
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        Self::Verb(method)
    }
}

impl FromStr for RouteMethod {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Use => f.write_str("USE"),
            Self::Verb(m) => f.write_str(m.as_str()),
        }
    }
}

/// Per-route registration options.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Overrides the registry default when set.
    pub case_sensitive: Option<bool>,
    /// Host label scope; `None` means `*`.
    pub sub_domain: Option<String>,
}

impl RouteOptions {
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = Some(yes);
        self
    }

    pub fn sub_domain(mut self, label: impl Into<String>) -> Self {
        self.sub_domain = Some(label.into());
        self
    }
}

/// A registered dynamic route.
pub struct Route {
    method: RouteMethod,
    template: String,
    path: PathTemplate,
    sub_domain: String,
    case_sensitive: bool,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub(crate) fn new(
        method: RouteMethod,
        template: &str,
        handler: Arc<dyn Handler>,
        sub_domain: Option<String>,
        case_sensitive: bool,
    ) -> Result<Self, RegistrationError> {
        method.validate()?;
        let path = PathTemplate::compile(template)?;
        Ok(Self {
            method,
            template: template.to_string(),
            path,
            sub_domain: sub_domain.unwrap_or_else(|| ANY_SUBDOMAIN.to_string()),
            case_sensitive,
            handler,
        })
    }

    pub fn method(&self) -> &RouteMethod {
        &self.method
    }

    /// The template as registered.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    pub fn sub_domain(&self) -> &str {
        &self.sub_domain
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Method, subdomain and path test. Captured parameters are returned to
    /// the caller, never stored on the route.
    pub fn match_request(&self, method: &Method, sub_domain: Option<&str>, segments: &[String]) -> Option<Params> {
        if !self.method.matches(method) {
            return None;
        }
        if !sub_domain_matches(&self.sub_domain, sub_domain, self.case_sensitive) {
            return None;
        }
        self.path.match_path(segments, self.case_sensitive)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("sub_domain", &self.sub_domain)
            .field("case_sensitive", &self.case_sensitive)
            .finish_non_exhaustive()
    }
}

/// Subdomain rule shared by routes and mounts. A request without a
/// subdomain is treated as `*` and therefore matches every scope.
pub(crate) fn sub_domain_matches(scope: &str, requested: Option<&str>, case_sensitive: bool) -> bool {
    if scope == ANY_SUBDOMAIN {
        return true;
    }
    match requested {
        None => true,
        Some(label) => eq_with_case(scope, label, case_sensitive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::{handler_fn, Flow};

    fn route(method: RouteMethod, template: &str, opts: RouteOptions) -> Route {
        let handler = Arc::new(handler_fn(|_req, _res| async { Flow::next() }));
        Route::new(method, template, handler, opts.sub_domain, opts.case_sensitive.unwrap_or(false)).unwrap()
    }

    fn segs(path: &str) -> Vec<String> {
        crate::routing::path::split_segments(path)
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(RouteMethod::parse("USE").unwrap(), RouteMethod::Use);
        assert_eq!(RouteMethod::parse("GET").unwrap(), RouteMethod::Verb(Method::GET));
        assert!(RouteMethod::parse("get").is_err());
        assert!(RouteMethod::parse("PURGE").is_err());
        assert!(RouteMethod::Verb(Method::from_bytes(b"PURGE").unwrap()).validate().is_err());
    }

    #[test]
    fn test_method_filter() {
        let get = route(Method::GET.into(), "/a", RouteOptions::default());
        assert!(get.match_request(&Method::GET, None, &segs("/a")).is_some());
        assert!(get.match_request(&Method::POST, None, &segs("/a")).is_none());

        let any = route(RouteMethod::Use, "/a", RouteOptions::default());
        assert!(any.match_request(&Method::DELETE, None, &segs("/a")).is_some());
    }

    #[test]
    fn test_sub_domain_filter() {
        let scoped = route(Method::GET.into(), "/a", RouteOptions::default().sub_domain("API"));
        assert!(scoped.match_request(&Method::GET, Some("api"), &segs("/a")).is_some());
        assert!(scoped.match_request(&Method::GET, Some("www"), &segs("/a")).is_none());
        // No subdomain on the request side behaves like `*`.
        assert!(scoped.match_request(&Method::GET, None, &segs("/a")).is_some());

        let strict = route(
            Method::GET.into(),
            "/a",
            RouteOptions::default().sub_domain("API").case_sensitive(true),
        );
        assert!(strict.match_request(&Method::GET, Some("api"), &segs("/a")).is_none());
    }

    #[test]
    fn test_invalid_method_rejected_at_construction() {
        let handler = Arc::new(handler_fn(|_req, _res| async { Flow::next() }));
        let purge = RouteMethod::Verb(Method::from_bytes(b"PURGE").unwrap());
        assert!(matches!(
            Route::new(purge, "/a", handler, None, false),
            Err(RegistrationError::InvalidMethod(_))
        ));
    }
}

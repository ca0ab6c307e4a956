//! Request normalization and request IDs.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Reduce an inbound request to what matching needs: method, subdomain, segments
//! - Keep the original headers and buffered body for handlers
//!
//! # Design Decisions
//! - Body accumulation happens before matching; matching never suspends
//! - Path segments keep their percent-encoding; decoding is per use

use axum::body::{Body, Bytes};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri, Version};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::routing::path::{split_segments, subdomain_from_host};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Produces UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// A normalized inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    sub_domain: Option<String>,
    segments: Vec<String>,
    body: Bytes,
}

impl RequestContext {
    /// Normalize request parts and an already-buffered body.
    pub fn from_parts(parts: Parts, body: Bytes, subdomain_offset: usize) -> Self {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()));
        let sub_domain = host.and_then(|h| subdomain_from_host(&h, subdomain_offset));

        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            request_id,
            segments: split_segments(parts.uri.path()),
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            sub_domain,
            body,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `None` when the host carries no subdomain; matches every scope.
    pub fn sub_domain(&self) -> Option<&str> {
        self.sub_domain.as_deref()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Rebuild a body-less request with the original method, URI and
    /// headers, for services such as `ServeFile` that want an `http::Request`.
    pub fn to_http_request(&self) -> Request<Body> {
        let mut req = Request::new(Body::empty());
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.version_mut() = self.version;
        *req.headers_mut() = self.headers.clone();
        req
    }

    #[cfg(test)]
    pub(crate) fn for_test(method: &str, uri: &str) -> Self {
        let (parts, ()) = Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .expect("valid test request")
            .into_parts();
        Self::from_parts(parts, Bytes::new(), 2)
    }
}

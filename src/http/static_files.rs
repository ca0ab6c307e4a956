//! File resolution for static mounts.
//!
//! The handler walks the request segments past the mount point inside the
//! mount root. Anything it cannot resolve falls through to the next match;
//! only a resolved regular file is answered, by `tower_http`'s `ServeFile`
//! (ranges, conditional requests, content type).

use std::path::PathBuf;

use axum::body::Body;
use axum::http::Method;
use futures_util::future::BoxFuture;
use percent_encoding::percent_decode_str;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::dispatch::fallback::Fallback;
use crate::dispatch::handler::{Flow, Handler, HandlerRequest, HandlerResult};
use crate::dispatch::response::ResponseSink;
use crate::routing::mount::DotfilePolicy;

/// Built-in handler attached to every static mount.
#[derive(Debug, Clone)]
pub struct StaticFileHandler {
    root: PathBuf,
    mount_len: usize,
    dotfiles: DotfilePolicy,
}

/// Result of walking the request path below the root.
#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    File(PathBuf),
    Absent,
    Denied,
}

impl StaticFileHandler {
    pub fn new(root: PathBuf, mount_len: usize, dotfiles: DotfilePolicy) -> Self {
        Self {
            root,
            mount_len,
            dotfiles,
        }
    }

    async fn resolve(&self, segments: &[String]) -> Resolution {
        // Compare counts: a request shorter than the mount point has nothing to serve.
        if segments.len() < self.mount_len {
            return Resolution::Absent;
        }
        let Some(names) = segments[self.mount_len..]
            .iter()
            .map(|s| decode_segment(s))
            .collect::<Option<Vec<_>>>()
        else {
            return Resolution::Absent;
        };
        let Some((file, dirs)) = names.split_last() else {
            return Resolution::Absent;
        };

        // Every name below the mount is checked, not just the file name, so
        // `ignore`/`deny` also hide files inside dot-directories (`/.git/config`).
        // `allow` resolves them like any other path.
        if names.iter().any(|name| name.starts_with('.')) {
            match self.dotfiles {
                DotfilePolicy::Ignore => return Resolution::Absent,
                DotfilePolicy::Deny => return Resolution::Denied,
                DotfilePolicy::Allow => {}
            }
        }

        let mut candidate = self.root.clone();
        for dir in dirs {
            candidate.push(dir);
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_dir() => {}
                _ => return Resolution::Absent,
            }
        }

        candidate.push(file);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Resolution::File(candidate),
            _ => Resolution::Absent,
        }
    }
}

/// Percent-decode one segment, refusing anything that could leave the directory.
fn decode_segment(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.contains(['/', '\\', '\0'])
    {
        return None;
    }
    Some(decoded.into_owned())
}

impl Handler for StaticFileHandler {
    fn call(&self, req: HandlerRequest, res: ResponseSink) -> BoxFuture<'static, HandlerResult> {
        let this = self.clone();
        Box::pin(async move {
            if req.method() != Method::GET && req.method() != Method::HEAD {
                return Flow::next();
            }

            let path = match this.resolve(req.segments()).await {
                Resolution::File(path) => path,
                Resolution::Absent => return Flow::next(),
                Resolution::Denied => {
                    tracing::debug!(request_id = %req.request_id(), path = %req.uri().path(), "Dotfile denied");
                    return Ok(Flow::Fallback(Fallback::Unauthorized));
                }
            };

            tracing::debug!(request_id = %req.request_id(), file = %path.display(), "Serving static file");
            let response = match ServeFile::new(&path).oneshot(req.context().to_http_request()).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            res.send(response.map(Body::new))?;
            Flow::done()
        })
    }
}

//! Response sink shared between the chain and its handlers.
//!
//! Handlers either build a response piecemeal (`set_status`, `insert_header`,
//! `write`, then `end`) or hand over a finished one with `send`. Once ended,
//! the sink is terminated and the chain stops. A closed sink (client gone)
//! silently rejects further output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use thiserror::Error;

/// Errors returned when writing to a sink that no longer accepts output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("Response already terminated")]
    Terminated,
    #[error("Connection closed")]
    Closed,
}

#[derive(Debug)]
struct SinkState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    ended: bool,
    sent: Option<Response>,
}

impl Default for SinkState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            ended: false,
            sent: None,
        }
    }
}

/// Cheaply clonable handle to one request's response.
#[derive(Debug, Clone, Default)]
pub struct ResponseSink {
    state: Arc<Mutex<SinkState>>,
    closed: Arc<AtomicBool>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writable(&self) -> Result<MutexGuard<'_, SinkState>, SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        let state = self.lock();
        if state.ended {
            return Err(SinkError::Terminated);
        }
        Ok(state)
    }

    /// Whether a terminal action (`end`, `end_with`, `send`) has happened.
    pub fn is_terminated(&self) -> bool {
        self.lock().ended
    }

    /// Whether the underlying connection has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the connection as gone. Later output is discarded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn status(&self) -> StatusCode {
        self.lock().status
    }

    pub fn set_status(&self, status: StatusCode) -> Result<(), SinkError> {
        self.writable()?.status = status;
        Ok(())
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        self.writable()?.headers.insert(name, value);
        Ok(())
    }

    /// Append to the buffered body.
    pub fn write(&self, chunk: impl AsRef<[u8]>) -> Result<(), SinkError> {
        self.writable()?.body.extend_from_slice(chunk.as_ref());
        Ok(())
    }

    /// Number of body bytes written so far.
    pub fn written(&self) -> usize {
        self.lock().body.len()
    }

    /// Discard the status, headers and body written so far. Fails once ended.
    pub fn reset(&self) -> Result<(), SinkError> {
        *self.writable()? = SinkState::default();
        Ok(())
    }

    /// Terminate with whatever has been written.
    pub fn end(&self) -> Result<(), SinkError> {
        self.writable()?.ended = true;
        Ok(())
    }

    /// Set status, write a plain-text body and terminate.
    pub fn end_with(&self, status: StatusCode, body: impl Into<String>) -> Result<(), SinkError> {
        let mut state = self.writable()?;
        state.status = status;
        if !state.headers.contains_key(header::CONTENT_TYPE) {
            state.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }
        state.body = body.into().into_bytes();
        state.ended = true;
        Ok(())
    }

    /// Hand over a complete response and terminate.
    pub fn send(&self, response: Response) -> Result<(), SinkError> {
        let mut state = self.writable()?;
        state.sent = Some(response);
        state.ended = true;
        Ok(())
    }

    /// Build the final response, leaving an empty one behind.
    pub fn take_response(&self) -> Response {
        let mut state = self.lock();
        let state = std::mem::take(&mut *state);
        if let Some(response) = state.sent {
            return response;
        }

        let mut response = Response::new(Body::from(state.body));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers;
        response
    }
}

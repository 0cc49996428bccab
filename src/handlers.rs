//! # Error and Response Handlers
//!
//! Collaborators that decide how failures (and, optionally, successes) become
//! responses.
//!
//! - [`ErrorHandler`] receives every request-time and handler-result error of a route.
//!   [`DefaultErrorHandler`] takes the status from an [`ApiError`](crate::ApiError) or
//!   [`JsonError`] in the error chain (500 otherwise) and writes either the JSON
//!   document of a `JsonError` or the plain error text.
//! - [`ResponseHandler`] is a host override that replaces the Renderer Set entirely
//!   for a route: it sees the raw [`Outcome`] of every invocation, success or failure.

use crate::error::{status_code_of, JsonError};
use crate::render::{ResponseBody, APPLICATION_JSON};
use crate::server::{Request, ResponseWriter};
use tracing::{debug, warn};

pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, w: &ResponseWriter, r: &Request, err: anyhow::Error);
}

impl<F> ErrorHandler for F
where
    F: Fn(&ResponseWriter, &Request, anyhow::Error) + Send + Sync,
{
    fn handle_error(&self, w: &ResponseWriter, r: &Request, err: anyhow::Error) {
        (self)(w, r, err);
    }
}

/// Status from the error chain, JSON body for [`JsonError`], plain text otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle_error(&self, w: &ResponseWriter, r: &Request, err: anyhow::Error) {
        let status = status_code_of(&err).unwrap_or(500);

        // E1: Error handler invoked
        debug!(
            request_id = %r.request_id(),
            status = status,
            error = %err,
            "Rendering handler error"
        );

        if let Some(json) = err.chain().find_map(|e| e.downcast_ref::<JsonError>()) {
            match serde_json::to_vec(&json.body) {
                Ok(bytes) => {
                    w.set_header(http::header::CONTENT_TYPE.as_str(), APPLICATION_JSON);
                    w.write_header(status);
                    w.write(&bytes);
                    return;
                }
                Err(e) => {
                    // E2: JSON error body failed to encode, fall back to text
                    warn!(
                        request_id = %r.request_id(),
                        error = %e,
                        "Failed to encode JSON error body"
                    );
                }
            }
        }

        w.set_header(
            http::header::CONTENT_TYPE.as_str(),
            "text/plain; charset=utf-8",
        );
        w.set_header("x-content-type-options", "nosniff");
        w.write_header(status);
        w.write(err.to_string().as_bytes());
    }
}

/// Everything a handler invocation produced.
///
/// A request-time failure (a provider error) arrives as an outcome with only
/// `error` set.
#[derive(Debug, Default)]
pub struct Outcome {
    pub error: Option<anyhow::Error>,
    /// Status slot value, if set and valid.
    pub status: Option<u16>,
    pub body: Option<ResponseBody>,
}

/// Route-level override of all response rendering.
pub trait ResponseHandler: Send + Sync {
    fn handle_response(&self, w: &ResponseWriter, r: &Request, outcome: Outcome);
}

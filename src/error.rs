//! # Error Types
//!
//! Two families of errors flow through brrtbind:
//!
//! - [`ConfigError`] is raised while a route is being built. It is fatal: the route is
//!   never installed and the caller must fix the handler definition.
//! - Request-time and handler-result errors travel as [`anyhow::Error`]. The
//!   [`ErrorHandler`](crate::handlers::ErrorHandler) inspects the chain for an
//!   [`ApiError`] (to pick the status code) or a [`JsonError`] (to render a JSON body).
//!
//! ```rust
//! use brrtbind::ApiError;
//!
//! let err = ApiError::new(404, "");
//! assert_eq!(err.status(), 404);
//! assert_eq!(err.message(), "Not Found");
//!
//! let err = ApiError::new(42, "weird");
//! assert_eq!(err.status(), 500);
//! ```

use std::fmt;

/// An error that carries an HTTP status code, a message and an optional cause.
///
/// Construction rules:
/// - a status outside `100..=999` becomes `500`
/// - an empty message becomes the canonical reason phrase of the status
#[derive(Debug)]
pub struct ApiError {
    status: u16,
    message: String,
    cause: Option<anyhow::Error>,
}

fn normalize_status(status: u16) -> u16 {
    if (100..=999).contains(&status) {
        status
    } else {
        500
    }
}

fn reason_phrase(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

impl ApiError {
    /// Create an error with the given status and message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        let status = normalize_status(status);
        let mut message = message.into();
        if message.is_empty() {
            message = reason_phrase(status).to_string();
        }
        Self {
            status,
            message,
            cause: None,
        }
    }

    /// Error with the reason phrase of `status` as its message.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self::new(status, "")
    }

    /// Wrap an existing error. The cause stays reachable through
    /// [`std::error::Error::source`] but is not folded into the message.
    pub fn wrap(status: u16, cause: impl Into<anyhow::Error>) -> Self {
        let mut err = Self::from_status(status);
        err.cause = Some(cause.into());
        err
    }

    /// `400 Bad Request` wrapping `cause`.
    pub fn bad_request(cause: impl Into<anyhow::Error>) -> Self {
        Self::wrap(400, cause)
    }

    /// `500 Internal Server Error` with a message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// Replace the message, keeping status and cause.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        if !message.is_empty() {
            self.message = message;
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// An error that renders itself as a JSON document.
///
/// The default error handler writes `body` with `Content-Type: application/json`
/// and `status` as the response code.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonError {
    pub status: u16,
    pub body: serde_json::Value,
}

impl JsonError {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            status: normalize_status(status),
            body,
        }
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

impl std::error::Error for JsonError {}

/// Status code carried anywhere in the error chain, outermost first.
#[must_use]
pub fn status_code_of(err: &anyhow::Error) -> Option<u16> {
    err.chain().find_map(|e| {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            Some(api.status())
        } else {
            e.downcast_ref::<JsonError>().map(|j| j.status)
        }
    })
}

/// Build-time failure. A route whose handler cannot be planned is never installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two extractors produce the same type.
    DuplicateMapping {
        /// Produced type name
        type_name: String,
    },
    /// An `ArgExtractor` was registered without an extraction function.
    MissingExtract {
        /// Produced type name
        type_name: String,
    },
    /// No provider applies to the parameter at `index`.
    UnresolvableArg {
        /// Zero-based parameter position
        index: usize,
        /// Declared type name
        type_name: String,
    },
    /// More than one parameter would consume the request body.
    MultipleBodyReaders,
    /// A `Variadic<T>` parameter that is not the trailing one.
    VariadicNotLast {
        /// Zero-based parameter position
        index: usize,
    },
    /// A single path segment requested after a parameter took the remaining ones.
    PathSegmentAfterRest {
        /// Zero-based parameter position
        index: usize,
    },
    MultipleErrorReturns,
    MultipleStatusReturns,
    MultipleBodyReturns,
    TooManyReturns {
        /// Number of declared return slots
        count: usize,
    },
    /// A by-name handler target with no matching method on the host.
    UnknownHandler {
        /// Method name looked up
        name: String,
    },
    /// A by-name handler target but the builder has no host table.
    NoHostApi {
        /// Method name looked up
        name: String,
    },
    /// The path template could not be compiled.
    InvalidPathTemplate {
        /// The template as given
        template: String,
        /// Underlying regex error
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateMapping { type_name } => {
                write!(f, "multiple mappings for arg type '{type_name}'")
            }
            ConfigError::MissingExtract { type_name } => {
                write!(f, "ArgExtractor[{type_name}] missing 'Extract' function")
            }
            ConfigError::UnresolvableArg { index, .. } => {
                write!(f, "cannot determine arg {index}")
            }
            ConfigError::MultipleBodyReaders => {
                f.write_str("multiple args could be from request.Body")
            }
            ConfigError::VariadicNotLast { index } => {
                write!(f, "variadic arg {index} must be the last arg")
            }
            ConfigError::PathSegmentAfterRest { index } => {
                write!(f, "arg {index} reads a path param after the remaining ones were taken")
            }
            ConfigError::MultipleErrorReturns => {
                f.write_str("handler has multiple error return args")
            }
            ConfigError::MultipleStatusReturns => {
                f.write_str("handler has multiple status code return args")
            }
            ConfigError::MultipleBodyReturns => {
                f.write_str("handler has multiple marshalable return args")
            }
            ConfigError::TooManyReturns { count } => {
                write!(f, "handler has too many return args ({count})")
            }
            ConfigError::UnknownHandler { name } => {
                write!(f, "host api has no handler named '{name}'")
            }
            ConfigError::NoHostApi { name } => {
                write!(f, "handler '{name}' given by name but no host api is configured")
            }
            ConfigError::InvalidPathTemplate { template, reason } => {
                write!(f, "invalid path template '{template}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_status_becomes_500() {
        let err = ApiError::new(0, "");
        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), "Internal Server Error");
    }

    #[test]
    fn test_empty_message_uses_reason_phrase() {
        assert_eq!(ApiError::from_status(418).message(), "I'm a teapot");
        assert_eq!(ApiError::new(404, "no pet").message(), "no pet");
    }

    #[test]
    fn test_wrap_keeps_cause_out_of_message() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = ApiError::wrap(503, io);
        assert_eq!(err.to_string(), "Service Unavailable");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn test_status_code_of_searches_chain() {
        let err = anyhow::Error::new(ApiError::from_status(409)).context("saving pet");
        assert_eq!(status_code_of(&err), Some(409));
        assert_eq!(status_code_of(&anyhow::anyhow!("plain")), None);

        let json = anyhow::Error::new(JsonError::new(422, serde_json::json!({"x": 1})));
        assert_eq!(status_code_of(&json), Some(422));
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::MultipleBodyReaders.to_string(),
            "multiple args could be from request.Body"
        );
        assert_eq!(
            ConfigError::DuplicateMapping {
                type_name: "Tenant".into()
            }
            .to_string(),
            "multiple mappings for arg type 'Tenant'"
        );
        assert_eq!(
            ConfigError::UnresolvableArg {
                index: 2,
                type_name: "u64".into()
            }
            .to_string(),
            "cannot determine arg 2"
        );
    }
}

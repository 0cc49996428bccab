use super::SerializeJson;
use crate::typed::RawJson;
use serde::Serialize;
use std::fmt;

/// Body of a [`JsonResponse`].
pub enum JsonBody {
    /// Serialized with `serde_json` at render time.
    Value(Box<dyn SerializeJson>),
    /// Already-encoded JSON, written verbatim. Empty renders as no body.
    Raw(RawJson),
}

impl fmt::Debug for JsonBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonBody::Value(_) => f.write_str("Value(..)"),
            JsonBody::Raw(raw) => f.debug_tuple("Raw").field(&raw.0.len()).finish(),
        }
    }
}

/// Structured JSON response envelope.
///
/// - `error` set: the error handler renders the response instead
/// - `status_code` of `0` means unset
/// - `headers` are applied before the body is written
#[derive(Debug, Default)]
pub struct JsonResponse {
    pub error: Option<anyhow::Error>,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonBody>,
}

impl JsonResponse {
    /// Envelope with a serializable body.
    pub fn ok(body: impl Serialize + Send + 'static) -> Self {
        Self {
            body: Some(JsonBody::Value(Box::new(body))),
            ..Self::default()
        }
    }

    /// Envelope with pre-encoded JSON.
    pub fn raw(json: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Some(JsonBody::Raw(RawJson(json.into()))),
            ..Self::default()
        }
    }

    /// Envelope that delegates to the error handler.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        Self {
            error: Some(err.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn status(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

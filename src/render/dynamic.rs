use super::{JsonResponse, ResponseMarshaler, SerializeJson};
use serde::Serialize;

/// A body whose renderer is picked per invocation from its variant.
///
/// Handlers return `Dynamic` when different calls produce different kinds of
/// responses. Without a separate error slot in the signature, the `Error` variant
/// is handed to the error handler.
pub enum Dynamic {
    Bytes(Vec<u8>),
    Envelope(JsonResponse),
    EnvelopePtr(Option<Box<JsonResponse>>),
    Marshaler(Box<dyn ResponseMarshaler>),
    Error(anyhow::Error),
    Json(Box<dyn SerializeJson>),
    Nil,
}

impl Dynamic {
    pub fn json(value: impl Serialize + Send + 'static) -> Self {
        Dynamic::Json(Box::new(value))
    }

    pub fn error(err: impl Into<anyhow::Error>) -> Self {
        Dynamic::Error(err.into())
    }

    pub fn marshaler(m: impl ResponseMarshaler + 'static) -> Self {
        Dynamic::Marshaler(Box::new(m))
    }

    /// Variant name, for logs.
    #[must_use]
    pub fn variant(&self) -> &'static str {
        match self {
            Dynamic::Bytes(_) => "bytes",
            Dynamic::Envelope(_) => "envelope",
            Dynamic::EnvelopePtr(_) => "envelope_ptr",
            Dynamic::Marshaler(_) => "marshaler",
            Dynamic::Error(_) => "error",
            Dynamic::Json(_) => "json",
            Dynamic::Nil => "nil",
        }
    }
}

impl From<Vec<u8>> for Dynamic {
    fn from(bytes: Vec<u8>) -> Self {
        Dynamic::Bytes(bytes)
    }
}

impl From<JsonResponse> for Dynamic {
    fn from(env: JsonResponse) -> Self {
        Dynamic::Envelope(env)
    }
}

impl From<anyhow::Error> for Dynamic {
    fn from(err: anyhow::Error) -> Self {
        Dynamic::Error(err)
    }
}

impl std::fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dynamic::{}", self.variant())
    }
}

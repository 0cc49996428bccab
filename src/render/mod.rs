//! # Renderer Set
//!
//! Turns the body slot of a handler's output into a response.
//!
//! | Renderer      | Value                                   | Default status            |
//! |---------------|-----------------------------------------|---------------------------|
//! | `Bytes`       | `Vec<u8>`, `Option<Vec<u8>>`, `RawBody` | 204 empty, 200 otherwise  |
//! | `Envelope`    | [`JsonResponse`]                        | 204 no body, 200 otherwise|
//! | `EnvelopePtr` | `Option<Box<JsonResponse>>`             | as `Envelope`             |
//! | `Marshaler`   | [`ResponseMarshaler`] implementors      | 204 empty, 200 otherwise  |
//! | `Dynamic`     | [`Dynamic`]                             | per variant               |
//! | `Generic`     | anything `Serialize`                    | 200                       |
//!
//! Status precedence is renderer-intrinsic code (envelope `status_code`, marshaler
//! status) over the handler's status slot (the hint) over the default above.
//!
//! A renderer returns `false` when it did not handle the value (a `None` pointer, a
//! `Nil` dynamic); the caller then writes a bare response at the resolved status.

mod dynamic;
mod envelope;
mod marshal;

pub use dynamic::Dynamic;
pub use envelope::{JsonBody, JsonResponse};
pub use marshal::{Marshaled, ResponseMarshaler};

use crate::error::ApiError;
use crate::handlers::ErrorHandler;
use crate::server::{Request, ResponseWriter};
use crate::typed::RendererKind;
use serde::Serialize;
use tracing::debug;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Object-safe JSON serialization, evaluated lazily at render time.
pub trait SerializeJson: Send {
    fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error>;
}

impl<T: Serialize + Send> SerializeJson for T {
    fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Runtime value of a body slot.
pub enum ResponseBody {
    Bytes(Option<Vec<u8>>),
    Envelope(JsonResponse),
    EnvelopePtr(Option<Box<JsonResponse>>),
    Marshaler(Option<Box<dyn ResponseMarshaler>>),
    Dynamic(Dynamic),
    Generic(Option<Box<dyn SerializeJson>>),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Bytes(b) => f
                .debug_tuple("Bytes")
                .field(&b.as_ref().map(Vec::len))
                .finish(),
            ResponseBody::Envelope(e) => f.debug_tuple("Envelope").field(e).finish(),
            ResponseBody::EnvelopePtr(e) => f.debug_tuple("EnvelopePtr").field(e).finish(),
            ResponseBody::Marshaler(m) => f
                .debug_tuple("Marshaler")
                .field(&m.as_ref().map(|_| ".."))
                .finish(),
            ResponseBody::Dynamic(d) => f.debug_tuple("Dynamic").field(d).finish(),
            ResponseBody::Generic(g) => f
                .debug_tuple("Generic")
                .field(&g.as_ref().map(|_| ".."))
                .finish(),
        }
    }
}

/// Renderer bound to a body slot when the route is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Renderer {
    Bytes,
    Envelope,
    EnvelopePtr,
    Marshaler,
    /// `Dynamic` with no error slot: an `Error` variant goes to the error handler.
    Dynamic,
    /// `Dynamic` next to an error slot: an `Error` variant is ordinary data and is
    /// rendered as its message in a JSON string.
    DynamicAsData,
    Generic,
}

impl Renderer {
    #[must_use]
    pub fn for_kind(kind: RendererKind, has_error_slot: bool) -> Self {
        match kind {
            RendererKind::Envelope => Renderer::Envelope,
            RendererKind::EnvelopePtr => Renderer::EnvelopePtr,
            RendererKind::Bytes => Renderer::Bytes,
            RendererKind::Marshaler => Renderer::Marshaler,
            RendererKind::Dynamic if has_error_slot => Renderer::DynamicAsData,
            RendererKind::Dynamic => Renderer::Dynamic,
            RendererKind::Generic => Renderer::Generic,
        }
    }

    /// Render `body`. `hint` is the handler's status slot, if set.
    ///
    /// Returns `false` when nothing was written.
    pub fn render(
        &self,
        body: ResponseBody,
        hint: Option<u16>,
        w: &ResponseWriter,
        r: &Request,
        errors: &dyn ErrorHandler,
    ) -> bool {
        match body {
            ResponseBody::Bytes(data) => render_bytes(data.unwrap_or_default(), hint, w),
            ResponseBody::Envelope(env) => render_envelope(env, hint, w, r, errors),
            ResponseBody::EnvelopePtr(Some(env)) => render_envelope(*env, hint, w, r, errors),
            ResponseBody::EnvelopePtr(None) => false,
            ResponseBody::Marshaler(Some(m)) => render_marshaler(m.as_ref(), hint, w, r, errors),
            ResponseBody::Marshaler(None) => false,
            ResponseBody::Generic(Some(value)) => {
                render_generic(value.as_ref(), hint, w, r, errors)
            }
            ResponseBody::Generic(None) => false,
            ResponseBody::Dynamic(value) => self.render_dynamic(value, hint, w, r, errors),
        }
    }

    fn render_dynamic(
        &self,
        value: Dynamic,
        hint: Option<u16>,
        w: &ResponseWriter,
        r: &Request,
        errors: &dyn ErrorHandler,
    ) -> bool {
        // R1: Dynamic variant resolved
        debug!(
            request_id = %r.request_id(),
            variant = value.variant(),
            "Dynamic body resolved"
        );
        match value {
            Dynamic::Bytes(data) => render_bytes(data, hint, w),
            Dynamic::Envelope(env) => render_envelope(env, hint, w, r, errors),
            Dynamic::EnvelopePtr(Some(env)) => render_envelope(*env, hint, w, r, errors),
            Dynamic::EnvelopePtr(None) | Dynamic::Nil => false,
            Dynamic::Marshaler(m) => render_marshaler(m.as_ref(), hint, w, r, errors),
            Dynamic::Json(value) => render_generic(value.as_ref(), hint, w, r, errors),
            Dynamic::Error(err) if *self == Renderer::DynamicAsData => {
                render_generic(&err.to_string(), hint, w, r, errors)
            }
            Dynamic::Error(err) => {
                errors.handle_error(w, r, err);
                true
            }
        }
    }
}

/// Keep a status only if it is a valid HTTP code.
#[inline]
pub(crate) fn valid_status(code: i64) -> Option<u16> {
    u16::try_from(code).ok().filter(|c| (100..=999).contains(c))
}

fn apply_headers(w: &ResponseWriter, headers: &[(String, String)]) {
    for (name, value) in headers {
        w.set_header(name, value);
    }
}

fn render_bytes(data: Vec<u8>, hint: Option<u16>, w: &ResponseWriter) -> bool {
    let default = if data.is_empty() { 204 } else { 200 };
    w.write_header(hint.unwrap_or(default));
    if !data.is_empty() {
        w.write(&data);
    }
    true
}

fn render_envelope(
    env: JsonResponse,
    hint: Option<u16>,
    w: &ResponseWriter,
    r: &Request,
    errors: &dyn ErrorHandler,
) -> bool {
    if let Some(err) = env.error {
        errors.handle_error(w, r, err);
        return true;
    }
    apply_headers(w, &env.headers);
    let status = valid_status(i64::from(env.status_code)).or(hint);

    let encoded = match env.body {
        None => None,
        Some(JsonBody::Raw(raw)) if raw.0.is_empty() => None,
        Some(JsonBody::Raw(raw)) => Some(raw.0),
        Some(JsonBody::Value(value)) => match value.to_json_vec() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                errors.handle_error(w, r, ApiError::wrap(500, e).into());
                return true;
            }
        },
    };

    match encoded {
        None => w.write_header(status.unwrap_or(204)),
        Some(bytes) => {
            w.set_header(http::header::CONTENT_TYPE.as_str(), APPLICATION_JSON);
            w.write_header(status.unwrap_or(200));
            w.write(&bytes);
        }
    }
    true
}

fn render_marshaler(
    m: &dyn ResponseMarshaler,
    hint: Option<u16>,
    w: &ResponseWriter,
    r: &Request,
    errors: &dyn ErrorHandler,
) -> bool {
    let out = match m.marshal(r) {
        Ok(out) => out,
        Err(err) => {
            errors.handle_error(w, r, err);
            return true;
        }
    };
    apply_headers(w, &out.headers);
    let default = if out.data.is_empty() { 204 } else { 200 };
    let status = valid_status(i64::from(out.status))
        .or(hint)
        .unwrap_or(default);
    w.write_header(status);
    if !out.data.is_empty() {
        w.write(&out.data);
    }
    true
}

fn render_generic(
    value: &dyn SerializeJson,
    hint: Option<u16>,
    w: &ResponseWriter,
    r: &Request,
    errors: &dyn ErrorHandler,
) -> bool {
    match value.to_json_vec() {
        Ok(bytes) => {
            w.set_header(http::header::CONTENT_TYPE.as_str(), APPLICATION_JSON);
            w.write_header(hint.unwrap_or(200));
            w.write(&bytes);
        }
        Err(e) => errors.handle_error(w, r, ApiError::wrap(500, e).into()),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::DefaultErrorHandler;
    use crate::server::RecordedResponse;

    fn run(renderer: Renderer, body: ResponseBody, hint: Option<u16>) -> (bool, RecordedResponse) {
        let w = ResponseWriter::new();
        let r = Request::builder().build().unwrap();
        let handled = renderer.render(body, hint, &w, &r, &DefaultErrorHandler);
        (handled, w.finish())
    }

    struct Fixed(Marshaled);

    impl ResponseMarshaler for Fixed {
        fn marshal(&self, _request: &Request) -> anyhow::Result<Marshaled> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_bytes_defaults_and_hint() {
        let (_, res) = run(Renderer::Bytes, ResponseBody::Bytes(Some(b"hi".to_vec())), None);
        assert_eq!((res.status, res.body.as_slice()), (200, &b"hi"[..]));
        assert!(res.header("content-type").is_none());

        let (_, res) = run(Renderer::Bytes, ResponseBody::Bytes(None), None);
        assert_eq!(res.status, 204);
        assert!(res.body.is_empty());

        let (_, res) = run(Renderer::Bytes, ResponseBody::Bytes(Some(vec![])), Some(202));
        assert_eq!(res.status, 202);
    }

    #[test]
    fn test_envelope_status_precedence() {
        let env = JsonResponse::ok(serde_json::json!({"a": 1})).status(201);
        let (_, res) = run(Renderer::Envelope, ResponseBody::Envelope(env), Some(202));
        assert_eq!(res.status, 201);
        assert_eq!(res.header("content-type"), Some(APPLICATION_JSON));
        assert_eq!(res.json().unwrap(), serde_json::json!({"a": 1}));

        let env = JsonResponse::ok(serde_json::json!([1])).header("x-env", "yes");
        let (_, res) = run(Renderer::Envelope, ResponseBody::Envelope(env), Some(202));
        assert_eq!(res.status, 202);
        assert_eq!(res.header("x-env"), Some("yes"));
    }

    #[test]
    fn test_envelope_without_body_is_204() {
        let (_, res) = run(
            Renderer::Envelope,
            ResponseBody::Envelope(JsonResponse::default()),
            None,
        );
        assert_eq!(res.status, 204);

        let (_, res) = run(
            Renderer::Envelope,
            ResponseBody::Envelope(JsonResponse::raw(Vec::new())),
            None,
        );
        assert_eq!(res.status, 204);
    }

    #[test]
    fn test_envelope_error_goes_to_error_handler() {
        let env = JsonResponse::failed(ApiError::new(409, "taken"));
        let (_, res) = run(Renderer::Envelope, ResponseBody::Envelope(env), None);
        assert_eq!(res.status, 409);
        assert_eq!(res.body_str(), "taken");
    }

    #[test]
    fn test_nil_pointers_not_handled() {
        assert!(!run(Renderer::EnvelopePtr, ResponseBody::EnvelopePtr(None), None).0);
        assert!(!run(Renderer::Marshaler, ResponseBody::Marshaler(None), None).0);
        assert!(!run(Renderer::Generic, ResponseBody::Generic(None), None).0);
        assert!(!run(Renderer::Dynamic, ResponseBody::Dynamic(Dynamic::Nil), None).0);
    }

    #[test]
    fn test_marshaler_status_precedence() {
        let m = Fixed(Marshaled::new("x").header("x-m", "1"));
        let (_, res) = run(Renderer::Marshaler, ResponseBody::Marshaler(Some(Box::new(m))), Some(202));
        assert_eq!(res.status, 202);
        assert_eq!(res.header("x-m"), Some("1"));

        let m = Fixed(Marshaled::new("x").status(203));
        let (_, res) = run(Renderer::Marshaler, ResponseBody::Marshaler(Some(Box::new(m))), Some(202));
        assert_eq!(res.status, 203);

        let m = Fixed(Marshaled::default());
        let (_, res) = run(Renderer::Marshaler, ResponseBody::Marshaler(Some(Box::new(m))), None);
        assert_eq!(res.status, 204);
    }

    #[test]
    fn test_dynamic_error_routing() {
        let (_, res) = run(
            Renderer::Dynamic,
            ResponseBody::Dynamic(Dynamic::error(ApiError::new(418, "short"))),
            None,
        );
        assert_eq!(res.status, 418);

        let (_, res) = run(
            Renderer::DynamicAsData,
            ResponseBody::Dynamic(Dynamic::error(ApiError::new(418, "short"))),
            None,
        );
        assert_eq!(res.status, 200);
        assert_eq!(res.json().unwrap(), serde_json::json!("short"));
    }

    #[test]
    fn test_dynamic_delegates_by_variant() {
        let (_, res) = run(Renderer::Dynamic, ResponseBody::Dynamic(Dynamic::Bytes(Vec::new())), None);
        assert_eq!(res.status, 204);

        let (_, res) = run(
            Renderer::Dynamic,
            ResponseBody::Dynamic(Dynamic::json(vec![1, 2])),
            Some(201),
        );
        assert_eq!(res.status, 201);
        assert_eq!(res.body_str(), "[1,2]");
    }

    #[test]
    fn test_valid_status() {
        assert_eq!(valid_status(0), None);
        assert_eq!(valid_status(99), None);
        assert_eq!(valid_status(-4), None);
        assert_eq!(valid_status(1000), None);
        assert_eq!(valid_status(201), Some(201));
    }
}

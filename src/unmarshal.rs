//! # Request Body Unmarshaling
//!
//! Body-shaped parameters (types deriving `BodyArg`, `Json<T>`) are filled from the
//! request body by the route's [`Unmarshaler`]. The unmarshaler reads the body and
//! tags it with its format as a [`Payload`]; the parameter's descriptor then decodes
//! the payload into the declared type.
//!
//! - [`JsonUnmarshaler`] (default) treats every body as JSON.
//! - [`MultiFormatUnmarshaler`] picks JSON, YAML or XML from the base media type of
//!   `Content-Type`. Parameters and `+` extensions of the subtype are dropped before
//!   matching, so `application/json+v2` is JSON while `application/merge-patch+json`
//!   is not a known type. A missing `Content-Type` means JSON; anything unrecognized
//!   fails with `415`.
//!
//! Decode failures, including an empty body, are `400` [`ApiError`]s.

use crate::error::ApiError;
use crate::server::Request;
use serde::de::DeserializeOwned;

/// A read request body tagged with its format.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Vec<u8>),
    Yaml(Vec<u8>),
    Xml(Vec<u8>),
    /// Pre-parsed document from a custom unmarshaler.
    Value(serde_json::Value),
}

impl Payload {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        match self {
            Payload::Json(bytes) => serde_json::from_slice(bytes).map_err(ApiError::bad_request),
            Payload::Yaml(bytes) => serde_yaml::from_slice(bytes).map_err(ApiError::bad_request),
            Payload::Xml(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(ApiError::bad_request)?;
                quick_xml::de::from_str(text).map_err(ApiError::bad_request)
            }
            Payload::Value(value) => {
                T::deserialize(value).map_err(ApiError::bad_request)
            }
        }
    }
}

pub trait Unmarshaler: Send + Sync {
    fn unmarshal(&self, request: &Request) -> Result<Payload, ApiError>;
}

/// Reads the body as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonUnmarshaler {
    /// Largest accepted body; larger bodies fail with `413`.
    pub max_body_bytes: Option<usize>,
}

impl Unmarshaler for JsonUnmarshaler {
    fn unmarshal(&self, request: &Request) -> Result<Payload, ApiError> {
        Ok(Payload::Json(request.read_body(self.max_body_bytes)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Xml,
}

/// Dispatches on the `Content-Type` base media type.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiFormatUnmarshaler {
    pub max_body_bytes: Option<usize>,
}

impl MultiFormatUnmarshaler {
    fn format_of(content_type: &str) -> Option<Format> {
        let base = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        let (kind, subtype) = base.split_once('/')?;
        // `application/json+v2` is still `application/json`
        let subtype = subtype.split('+').next().unwrap_or(subtype);
        match (kind, subtype) {
            ("application" | "text", "json") => Some(Format::Json),
            ("application" | "text", "yaml" | "x-yaml") => Some(Format::Yaml),
            ("application" | "text", "xml") => Some(Format::Xml),
            _ => None,
        }
    }
}

impl Unmarshaler for MultiFormatUnmarshaler {
    fn unmarshal(&self, request: &Request) -> Result<Payload, ApiError> {
        let format = match request.header(http::header::CONTENT_TYPE.as_str()) {
            None => Format::Json,
            Some(ct) => Self::format_of(ct).ok_or_else(|| {
                ApiError::new(415, format!("unsupported content type '{ct}'"))
            })?,
        };
        let body = request.read_body(self.max_body_bytes)?;
        Ok(match format {
            Format::Json => Payload::Json(body),
            Format::Yaml => Payload::Yaml(body),
            Format::Xml => Payload::Xml(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pet {
        name: String,
        age: u32,
    }

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut b = Request::builder().body(body);
        if let Some(ct) = content_type {
            b = b.header("content-type", ct);
        }
        b.build().unwrap()
    }

    #[test]
    fn test_format_of_ignores_params_and_suffix() {
        assert_eq!(
            MultiFormatUnmarshaler::format_of("application/json; charset=utf-8"),
            Some(Format::Json)
        );
        assert_eq!(
            MultiFormatUnmarshaler::format_of("application/json+v2"),
            Some(Format::Json)
        );
        assert_eq!(
            MultiFormatUnmarshaler::format_of("Application/X-YAML"),
            Some(Format::Yaml)
        );
        assert_eq!(
            MultiFormatUnmarshaler::format_of("text/xml+legacy; charset=utf-8"),
            Some(Format::Xml)
        );
        assert_eq!(MultiFormatUnmarshaler::format_of("application/merge-patch+json"), None);
        assert_eq!(MultiFormatUnmarshaler::format_of("text/plain"), None);
    }

    #[test]
    fn test_decode_each_format() {
        let u = MultiFormatUnmarshaler::default();
        let json = u.unmarshal(&request(None, r#"{"name":"rex","age":3}"#)).unwrap();
        let yaml = u
            .unmarshal(&request(Some("application/yaml"), "name: rex\nage: 3\n"))
            .unwrap();
        let xml = u
            .unmarshal(&request(
                Some("application/xml"),
                "<pet><name>rex</name><age>3</age></pet>",
            ))
            .unwrap();
        let expected = Pet {
            name: "rex".into(),
            age: 3,
        };
        assert_eq!(json.decode::<Pet>().unwrap(), expected);
        assert_eq!(yaml.decode::<Pet>().unwrap(), expected);
        assert_eq!(xml.decode::<Pet>().unwrap(), expected);
    }

    #[test]
    fn test_suffix_extension_ignored() {
        let u = MultiFormatUnmarshaler::default();
        let versioned = u
            .unmarshal(&request(Some("application/json+v2"), r#"{"name":"rex","age":3}"#))
            .unwrap();
        assert_eq!(versioned.decode::<Pet>().unwrap().name, "rex");

        let err = u
            .unmarshal(&request(Some("application/merge-patch+json"), r#"{"age":4}"#))
            .unwrap_err();
        assert_eq!(err.status(), 415);
    }

    #[test]
    fn test_unknown_content_type_is_415() {
        let err = MultiFormatUnmarshaler::default()
            .unmarshal(&request(Some("text/csv"), "a,b"))
            .unwrap_err();
        assert_eq!(err.status(), 415);
    }

    #[test]
    fn test_bad_or_empty_body_is_400() {
        let payload = JsonUnmarshaler::default()
            .unmarshal(&request(None, "{not json"))
            .unwrap();
        assert_eq!(payload.decode::<Pet>().unwrap_err().status(), 400);

        let empty = JsonUnmarshaler::default()
            .unmarshal(&request(None, ""))
            .unwrap();
        assert_eq!(empty.decode::<Pet>().unwrap_err().status(), 400);
    }

    #[test]
    fn test_body_limit_is_413() {
        let u = JsonUnmarshaler {
            max_body_bytes: Some(4),
        };
        let err = u.unmarshal(&request(None, r#"{"name":"rex"}"#)).unwrap_err();
        assert_eq!(err.status(), 413);
    }
}

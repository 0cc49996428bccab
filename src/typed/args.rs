//! Parameter descriptors and the framework's argument wrapper types.

use crate::error::ApiError;
use crate::router::RouteContext;
use crate::server::{BasicAuth, Cookie, Request, RequestContext, ResponseWriter};
use crate::unmarshal::Payload;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use url::Url;

/// A type-erased argument value produced by a provider.
pub type ArgValue = Box<dyn Any + Send>;

/// Decodes a request body payload into the declared parameter type.
pub type DecodeFn = fn(&Payload) -> Result<ArgValue, ApiError>;

/// Structural kind of a parameter, consulted only when neither a built-in nor a
/// host provider claims the parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// No structural fallback; needs a built-in or host provider.
    Opaque,
    /// `String`: the next unconsumed path parameter.
    PathSegment,
    /// `Vec<String>`: every path parameter from the consumption point on.
    PathRest,
    /// Decoded from the request body.
    Body,
    /// `Variadic<T>`; resolution goes through the element type.
    Variadic,
}

/// Descriptor of one declared handler parameter.
#[derive(Debug, Clone)]
pub struct ArgType {
    id: TypeId,
    name: &'static str,
    shape: ArgShape,
    element: Option<Box<ArgType>>,
    decode: Option<DecodeFn>,
}

fn decode_body<T: DeserializeOwned + Send + 'static>(payload: &Payload) -> Result<ArgValue, ApiError> {
    Ok(Box::new(payload.decode::<T>()?))
}

fn decode_boxed_body<T: DeserializeOwned + Send + 'static>(
    payload: &Payload,
) -> Result<ArgValue, ApiError> {
    Ok(Box::new(Box::new(payload.decode::<T>()?)))
}

impl ArgType {
    fn new<T: Any>(shape: ArgShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            shape,
            element: None,
            decode: None,
        }
    }

    /// A type only a built-in or host provider can supply.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self::new::<T>(ArgShape::Opaque)
    }

    /// A request body decoded into `T`.
    #[must_use]
    pub fn body<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            decode: Some(decode_body::<T>),
            ..Self::new::<T>(ArgShape::Body)
        }
    }

    /// A request body decoded into `T` and handed over as `Box<T>`.
    #[must_use]
    pub fn boxed_body<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            decode: Some(decode_boxed_body::<T>),
            ..Self::new::<Box<T>>(ArgShape::Body)
        }
    }

    /// A request body decoded into `Vec<T>`.
    #[must_use]
    pub fn body_seq<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            decode: Some(decode_body::<Vec<T>>),
            ..Self::new::<Vec<T>>(ArgShape::Body)
        }
    }

    /// A trailing `Variadic<T>` whose values come from `element`, a sequence type.
    #[must_use]
    pub fn variadic<V: Any>(element: ArgType) -> Self {
        Self {
            element: Some(Box::new(element)),
            ..Self::new::<V>(ArgShape::Variadic)
        }
    }

    fn with_shape(mut self, shape: ArgShape) -> Self {
        self.shape = shape;
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> ArgShape {
        self.shape
    }

    /// Element sequence type of a variadic parameter.
    #[must_use]
    pub fn element(&self) -> Option<&ArgType> {
        self.element.as_deref()
    }

    #[must_use]
    pub fn decoder(&self) -> Option<DecodeFn> {
        self.decode
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

/// A type that can appear as a handler parameter.
///
/// The default [`from_arg_value`](Arg::from_arg_value) downcasts the provider's value;
/// providers always produce exactly the declared type.
pub trait Arg: Sized + Send + 'static {
    fn arg_type() -> ArgType;

    fn from_arg_value(value: ArgValue) -> Result<Self, ApiError> {
        value.downcast::<Self>().map(|v| *v).map_err(|_| {
            ApiError::internal(format!(
                "provider produced a value that is not {}",
                std::any::type_name::<Self>()
            ))
        })
    }
}

/// Element types that may be collected into `Vec<T>` or `Variadic<T>` parameters.
pub trait ArgElem: Sized + Send + 'static {
    /// Descriptor of `Vec<Self>`.
    fn seq_arg_type() -> ArgType;
}

impl<T: ArgElem> Arg for Vec<T> {
    fn arg_type() -> ArgType {
        T::seq_arg_type()
    }
}

impl Arg for String {
    fn arg_type() -> ArgType {
        ArgType::of::<String>().with_shape(ArgShape::PathSegment)
    }
}

impl ArgElem for String {
    fn seq_arg_type() -> ArgType {
        ArgType::of::<Vec<String>>().with_shape(ArgShape::PathRest)
    }
}

impl ArgElem for Cookie {
    fn seq_arg_type() -> ArgType {
        ArgType::of::<Vec<Cookie>>()
    }
}

impl ArgElem for u8 {
    fn seq_arg_type() -> ArgType {
        ArgType::of::<Vec<u8>>()
    }
}

macro_rules! opaque_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Arg for $ty {
                fn arg_type() -> ArgType {
                    ArgType::of::<$ty>()
                }
            }
        )*
    };
}

opaque_arg!(
    ResponseWriter,
    Request,
    RequestContext,
    RouteContext,
    Option<RouteContext>,
    HeaderMap,
    Headers,
    Option<Url>,
    PathParams,
    QueryParams,
    RawQuery,
    RawBody,
    RawJson,
    PostForm,
    BasicAuth,
    Option<BasicAuth>,
    bool,
    i32,
    i64,
    u32,
    u64,
    usize,
    f64,
    Option<String>,
);

/// Parsed `Cookie` header.
pub type Cookies = Vec<Cookie>;

/// Trailing parameter that receives a sequence flattened into individual values.
///
/// `Variadic<String>` collects the remaining path parameters; any other element type
/// needs a host provider keyed on `Variadic<T>` or `Vec<T>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variadic<T>(pub Vec<T>);

impl<T> Variadic<T> {
    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Variadic<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> IntoIterator for Variadic<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: ArgElem> Arg for Variadic<T> {
    fn arg_type() -> ArgType {
        ArgType::variadic::<Self>(T::seq_arg_type())
    }

    fn from_arg_value(value: ArgValue) -> Result<Self, ApiError> {
        match value.downcast::<Vec<T>>() {
            Ok(values) => Ok(Variadic(*values)),
            Err(value) => value.downcast::<Self>().map(|v| *v).map_err(|_| {
                ApiError::internal(format!(
                    "provider produced a value that is not {}",
                    std::any::type_name::<Self>()
                ))
            }),
        }
    }
}

/// JSON-typed body parameter and generic JSON return value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> Arg for Json<T> {
    fn arg_type() -> ArgType {
        ArgType::body::<Self>()
    }
}

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name(pub $inner);

        impl Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &$inner {
                &self.0
            }
        }

        impl From<$inner> for $name {
            fn from(inner: $inner) -> Self {
                Self(inner)
            }
        }
    };
}

newtype!(
    /// Request headers.
    Headers(HeaderMap)
);
newtype!(
    /// Path parameters grouped by name, repeated names keep every value in order.
    PathParams(HashMap<String, Vec<String>>)
);
newtype!(
    /// Parsed query string; empty when the request has no URL.
    QueryParams(HashMap<String, Vec<String>>)
);
newtype!(
    /// Raw query string; empty when the request has no URL.
    RawQuery(String)
);
newtype!(
    /// Whole request body.
    RawBody(Vec<u8>)
);
newtype!(
    /// Whole request body, typed as an opaque JSON document.
    RawJson(Vec<u8>)
);
newtype!(
    /// Parsed `application/x-www-form-urlencoded` body of a POST, PUT or PATCH.
    PostForm(HashMap<String, Vec<String>>)
);

macro_rules! first_value {
    ($($name:ident),*) => {
        $(
            impl $name {
                /// First value for `key`.
                #[must_use]
                pub fn first(&self, key: &str) -> Option<&str> {
                    self.0.get(key).and_then(|v| v.first()).map(String::as_str)
                }
            }
        )*
    };
}

first_value!(PathParams, QueryParams, PostForm);

impl RawJson {
    /// Parse into a [`serde_json::Value`].
    pub fn parse(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.0)
    }
}

/// Group `(name, value)` pairs preserving value order per name.
pub(crate) fn group_pairs<K, V, I>(pairs: I) -> HashMap<String, Vec<String>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in pairs {
        grouped.entry(k.into()).or_default().push(v.into());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pet {
        name: String,
    }

    #[test]
    fn test_shapes() {
        assert_eq!(String::arg_type().shape(), ArgShape::PathSegment);
        assert_eq!(<Vec<String>>::arg_type().shape(), ArgShape::PathRest);
        assert_eq!(Request::arg_type().shape(), ArgShape::Opaque);
        assert_eq!(<Json<Pet>>::arg_type().shape(), ArgShape::Body);

        let variadic = <Variadic<String>>::arg_type();
        assert_eq!(variadic.shape(), ArgShape::Variadic);
        assert!(variadic.element().is_some_and(|e| e.is::<Vec<String>>()));
    }

    #[test]
    fn test_body_decoder_produces_declared_type() {
        let payload = Payload::Json(br#"{"name":"rex"}"#.to_vec());
        let arg = ArgType::boxed_body::<Pet>();
        assert!(arg.is::<Box<Pet>>());
        let value = (arg.decoder().unwrap())(&payload).unwrap();
        let pet = value.downcast::<Box<Pet>>().unwrap();
        assert_eq!(pet.name, "rex");
    }

    #[test]
    fn test_variadic_accepts_element_sequence() {
        let value: ArgValue = Box::new(vec!["1".to_string(), "2".to_string()]);
        let v = <Variadic<String>>::from_arg_value(value).unwrap();
        assert_eq!(v.into_inner(), vec!["1", "2"]);
    }

    #[test]
    fn test_wrong_value_type_is_internal_error() {
        let value: ArgValue = Box::new(7_u64);
        let err = String::from_arg_value(value).unwrap_err();
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_group_pairs() {
        let grouped = group_pairs(vec![("a", "1"), ("b", "2"), ("a", "3")]);
        assert_eq!(grouped["a"], vec!["1", "3"]);
        assert_eq!(PathParams(grouped).first("b"), Some("2"));
    }
}

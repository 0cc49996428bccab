//! # Server Types
//!
//! Transport-neutral request and response handles. A transport (or a test) builds a
//! [`Request`] with [`Request::builder`], hands it to a [`Handler`](crate::Handler) or the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) together with a [`ResponseWriter`], and
//! reads the outcome back as a [`RecordedResponse`].

pub mod request;
pub mod response;

pub use request::{
    BasicAuth, BodyReader, Cookie, Request, RequestBuilder, RequestContext,
};
pub use response::{RecordedResponse, ResponseWriter};

//! # brrtbind
//!
//! **brrtbind** turns ordinary Rust functions into HTTP handlers. It looks at a
//! function's parameter and return types once, when the route is built, and decides
//! how every parameter is produced from a request and how every return value becomes
//! a response. Serving a request then only runs the pre-bound plan.
//!
//! ## Overview
//!
//! ```rust
//! use brrtbind::{ApiError, HandlerBuilder, HandlerTarget, JsonReturn, Request};
//! use http::Method;
//! use serde::Serialize;
//!
//! #[derive(Serialize, JsonReturn)]
//! struct Pet {
//!     id: String,
//!     name: String,
//! }
//!
//! fn get_pet(id: String) -> Result<Pet, ApiError> {
//!     if id == "0" {
//!         return Err(ApiError::new(404, "no such pet"));
//!     }
//!     Ok(Pet { id, name: "Rex".into() })
//! }
//!
//! let handler = HandlerBuilder::default()
//!     .build("/pets/{id}", Method::GET, HandlerTarget::func(get_pet))
//!     .unwrap();
//!
//! let found = handler.call(Request::builder().uri("/pets/7").build().unwrap());
//! assert_eq!(found.status, 200);
//! assert_eq!(found.json().unwrap()["name"], "Rex");
//!
//! let missing = handler.call(Request::builder().uri("/pets/0").build().unwrap());
//! assert_eq!(missing.status, 404);
//! ```
//!
//! ## Architecture
//!
//! - **[`typed`]** - descriptor protocol: [`typed::Arg`], [`typed::ReturnSlot`],
//!   [`typed::HandlerFn`] for functions of arity 0..=12
//! - **[`registry`]** - built-in and host-supplied parameter providers
//! - **[`planner`]** - input and return planning, run once per route
//! - **[`render`]** - renderers for bytes, JSON envelopes, marshalers, dynamic and
//!   generic JSON bodies
//! - **[`builder`]** - [`HandlerBuilder`] producing per-route [`Handler`]s
//! - **[`handlers`]** - [`ErrorHandler`] and [`ResponseHandler`] collaborators
//! - **[`unmarshal`]** - request body decoding (JSON, YAML, XML)
//! - **[`dispatcher`]** - route table and coroutine dispatch with middleware
//! - **[`router`]** - path templates and route contexts
//! - **[`server`]** - request and response-writer handles
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Dispatcher
//!     participant Handler
//!     participant Providers as Input Plan
//!     participant Func as Handler Function
//!     participant Returns as Return Plan
//!
//!     Dispatcher->>Handler: serve(writer, request)
//!     Handler->>Providers: produce arguments
//!     alt provider failed
//!         Providers-->>Handler: error
//!         Handler->>Handler: ErrorHandler
//!     else all produced
//!         Handler->>Func: invoke
//!         Func-->>Handler: error / status / body slots
//!         Handler->>Returns: respond
//!         Returns->>Returns: error handler or renderer
//!     end
//! ```
//!
//! ## Configuration
//!
//! Runtime settings come from `BRRTB_*` environment variables or YAML, see
//! [`runtime_config`]. Logging is set up with [`logging::init_logging_with_config`].
//!
//! ## Testing
//!
//! [`Handler::call`] serves a request into an in-memory [`ResponseWriter`] and
//! returns the [`RecordedResponse`], so handlers can be exercised without a server.

extern crate self as brrtbind;

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod planner;
pub mod registry;
pub mod render;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod typed;
pub mod unmarshal;

pub use brrtbind_macros::{BodyArg, JsonReturn, Marshaler};
pub use builder::{EngineConfig, Handler, HandlerBuilder, HandlerTarget, HostApi, RawHandler};
pub use error::{ApiError, ConfigError, JsonError};
pub use handlers::{DefaultErrorHandler, ErrorHandler, Outcome, ResponseHandler};
pub use render::{Dynamic, JsonResponse, Marshaled, ResponseMarshaler};
pub use server::{RecordedResponse, Request, ResponseWriter};
pub use typed::{Json, Variadic};

//! # Dispatcher Module
//!
//! Routes requests to built [`Handler`](crate::Handler)s and runs them on `may`
//! coroutines.
//!
//! ## Overview
//!
//! The dispatcher owns a route table of `(method, path template) -> Handler`
//! entries. For each request it:
//!
//! 1. finds the first entry whose method matches and whose template matches the
//!    decoded path;
//! 2. attaches a [`RouteContext`](crate::router::RouteContext) with the captured
//!    path parameters to the request;
//! 3. runs the middleware `before` hooks;
//! 4. serves the handler on a coroutine with panic recovery;
//! 5. runs the middleware `after` hooks and returns the recorded response.
//!
//! Unmatched requests return `None`; the transport decides what a miss looks like.
//!
//! ## Route Table Updates
//!
//! Routes are planned when added. A route that fails to plan is never installed.
//! The table is an `ArcSwap` snapshot, so adding routes never blocks in-flight
//! dispatches; re-adding the same method and template replaces the old handler.
//!
//! ```rust
//! use brrtbind::dispatcher::Dispatcher;
//! use brrtbind::{HandlerBuilder, HandlerTarget, Request};
//! use http::Method;
//!
//! let dispatcher = Dispatcher::new(HandlerBuilder::default());
//! dispatcher
//!     .add_route("/pets/{id}", Method::GET, HandlerTarget::func(|id: String| id))
//!     .unwrap();
//!
//! let res = dispatcher
//!     .dispatch(Request::builder().uri("/pets/7").build().unwrap())
//!     .unwrap();
//! assert_eq!(res.json().unwrap(), "7");
//! ```
//!
//! ## Coroutine Stack Size
//!
//! Handlers run with the stack size from
//! [`RuntimeConfig`](crate::runtime_config::RuntimeConfig) (`BRRTB_STACK_SIZE`).

mod core;

pub use core::{Dispatcher, RouteEntry};

//! # Router Module
//!
//! Path-template compilation and the route-match context handed to handlers.
//!
//! ## Overview
//!
//! brrtbind is not a full router. It needs two things from routing:
//!
//! - a [`RouteContext`] carrying the matched template and the ordered
//!   `(name, value)` path parameters, attached to the request by whoever routed it
//! - a [`PathTemplate`] that a handler can fall back to when it is invoked directly,
//!   outside of routing, so path parameters still resolve
//!
//! ## Example
//!
//! ```rust
//! use brrtbind::router::PathTemplate;
//!
//! let template = PathTemplate::parse("/foo/{a}/bar/{b}").unwrap();
//! let params = template.match_path("/foo/1/bar/2").unwrap();
//! assert_eq!(params[0].1, "1");
//! assert_eq!(params[1].1, "2");
//! assert!(template.match_path("/foo/1").is_none());
//! ```
//!
//! Templates compile to anchored regexes once, at route build time.

mod core;

pub use core::{ParamVec, PathTemplate, RouteContext, MAX_INLINE_PARAMS};

//! # Typed Descriptor Protocol
//!
//! Handler functions are ordinary Rust functions. brrtbind learns their shape through
//! three traits instead of runtime reflection:
//!
//! - [`Arg`] describes one parameter as an [`ArgType`]: its `TypeId`, its name and a
//!   structural [`ArgShape`] used for fallback resolution.
//! - [`ReturnSlot`] / [`Returns`] describe the output as a list of [`SlotType`]s
//!   (error, status code, or body with a [`RendererKind`]).
//! - [`HandlerFn`] ties them together for every `Fn` of arity 0..=12.
//!
//! The planners read the descriptors once, when a route is built. At request time
//! only pre-bound closures run.
//!
//! ```text
//! fn get_pet(id: String, q: QueryParams) -> Result<Json<Pet>, ApiError>
//!            ^^^^^^^^^^  ^^^^^^^^^^^^^^        ^^^^^^^^^^^^^^^^^^^^^^^^^^^
//!            PathSegment built-in              body(Generic) + error slot
//! ```
//!
//! User types opt in with derives from `brrtbind_macros`: `BodyArg` for request bodies,
//! `JsonReturn` for serializable outputs, `Marshaler` for custom response marshalers.

mod args;
mod callable;
mod returns;

pub use args::{
    Arg, ArgElem, ArgShape, ArgType, ArgValue, Cookies, DecodeFn, Headers, Json, PathParams,
    PostForm, QueryParams, RawBody, RawJson, RawQuery, Variadic,
};
pub(crate) use args::group_pairs;
pub use callable::{BoxedHandlerFn, HandlerFn};
pub use returns::{RendererKind, ReturnSlot, Returns, SlotKind, SlotType, SlotValue};

//! # Planners
//!
//! Route-build-time analysis of a handler's signature.
//!
//! - [`InputPlan`] binds every declared parameter to a source: a built-in, a host
//!   provider, a path parameter position, the rest of the path parameters, or the
//!   decoded body. At most one parameter may read the body, and only the last may
//!   be variadic.
//! - [`ReturnPlan`] locates the error, status and body slots of the output and binds
//!   the body to a [`Renderer`](crate::render::Renderer).
//!
//! Both are computed once per route. Planning the same signature twice yields equal
//! [`PlanSummary`] values.

mod input;
mod output;

pub use input::{InputPlan, ParamPlan, ParamSource};
pub(crate) use input::RouteShape;
pub use output::ReturnPlan;

/// Comparable description of a route's bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    /// `(type name, source, reads body)` per parameter.
    pub params: Vec<(&'static str, ParamSource, bool)>,
    pub returns: ReturnPlan,
}

impl PlanSummary {
    pub(crate) fn new(input: &InputPlan, returns: &ReturnPlan) -> Self {
        Self {
            params: input
                .params()
                .iter()
                .map(|p| (p.arg().name(), p.source().clone(), p.reads_body()))
                .collect(),
            returns: returns.clone(),
        }
    }
}

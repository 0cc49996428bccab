use crate::error::{ApiError, ConfigError};
use crate::registry::{self, CallScope, Registry};
use crate::typed::{ArgShape, ArgType, ArgValue};
use crate::unmarshal::Unmarshaler;
use http::Method;
use std::sync::Arc;
use tracing::{debug, warn};

type ProduceFn = Arc<dyn Fn(&CallScope<'_>) -> anyhow::Result<ArgValue> + Send + Sync>;

fn produce_fn<F>(f: F) -> ProduceFn
where
    F: Fn(&CallScope<'_>) -> anyhow::Result<ArgValue> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Where a parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// Framework type from the built-in table.
    Builtin,
    /// Host provider at this registration index.
    Host(usize),
    /// Path parameter at this position.
    PathSegment(usize),
    /// Path parameters from this position to the end.
    PathRest(usize),
    /// Decoded request body.
    Body,
}

/// Binding of one declared parameter to its provider.
pub struct ParamPlan {
    arg: ArgType,
    source: ParamSource,
    reads_body: bool,
    produce: ProduceFn,
}

impl ParamPlan {
    #[must_use]
    pub fn arg(&self) -> &ArgType {
        &self.arg
    }

    #[must_use]
    pub fn source(&self) -> &ParamSource {
        &self.source
    }

    #[must_use]
    pub fn reads_body(&self) -> bool {
        self.reads_body
    }
}

impl std::fmt::Debug for ParamPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamPlan")
            .field("arg", &self.arg.name())
            .field("source", &self.source)
            .field("reads_body", &self.reads_body)
            .finish()
    }
}

/// Ordered parameter bindings of one route. At most one reads the body.
#[derive(Debug, Default)]
pub struct InputPlan {
    params: Vec<ParamPlan>,
}

/// What the route being planned looks like.
pub(crate) struct RouteShape<'a> {
    pub method: &'a Method,
    pub path: &'a str,
}

impl InputPlan {
    /// Resolve every declared parameter, failing on the first problem.
    pub(crate) fn resolve(
        args: &[ArgType],
        route: &RouteShape<'_>,
        registry: &Registry,
        unmarshaler: &Arc<dyn Unmarshaler>,
    ) -> Result<Self, ConfigError> {
        let mut params: Vec<ParamPlan> = Vec::with_capacity(args.len());
        let mut consumed = 0usize;
        let last = args.len().saturating_sub(1);

        for (index, arg) in args.iter().enumerate() {
            if arg.shape() == ArgShape::Variadic && index != last {
                return Err(ConfigError::VariadicNotLast { index });
            }

            let plan = resolve_one(index, arg, route, registry, unmarshaler, &mut consumed)?;

            if plan.reads_body && params.iter().any(|p| p.reads_body) {
                return Err(ConfigError::MultipleBodyReaders);
            }

            // I1: Parameter resolved
            debug!(
                index = index,
                arg_type = arg.name(),
                source = ?plan.source,
                reads_body = plan.reads_body,
                "Handler parameter resolved"
            );
            params.push(plan);
        }

        Ok(Self { params })
    }

    #[must_use]
    pub fn params(&self) -> &[ParamPlan] {
        &self.params
    }

    /// Produce every argument, stopping at the first provider failure.
    pub(crate) fn produce(&self, scope: &CallScope<'_>) -> anyhow::Result<Vec<ArgValue>> {
        let mut values = Vec::with_capacity(self.params.len());
        for (index, param) in self.params.iter().enumerate() {
            match (param.produce)(scope) {
                Ok(value) => values.push(value),
                Err(err) => {
                    // I2: Provider failed, handler not invoked
                    warn!(
                        request_id = %scope.request.request_id(),
                        index = index,
                        arg_type = param.arg.name(),
                        error = %err,
                        "Handler argument could not be produced"
                    );
                    return Err(err);
                }
            }
        }
        Ok(values)
    }
}

fn resolve_one(
    index: usize,
    arg: &ArgType,
    route: &RouteShape<'_>,
    registry: &Registry,
    unmarshaler: &Arc<dyn Unmarshaler>,
    consumed: &mut usize,
) -> Result<ParamPlan, ConfigError> {
    // A variadic resolves through its element sequence type; host providers may
    // also claim the variadic type itself.
    let element = match arg.shape() {
        ArgShape::Variadic => arg.element(),
        _ => None,
    };
    let target = element.unwrap_or(arg);

    if let Some(builtin) = registry::builtin(target.id()) {
        debug!(index = index, provider = builtin.name, "Built-in provider matched");
        let produce = builtin.produce;
        return Ok(ParamPlan {
            arg: arg.clone(),
            source: ParamSource::Builtin,
            reads_body: (builtin.reads_body)(route.method),
            produce: produce_fn(move |scope| Ok(produce(scope)?)),
        });
    }

    let host = registry
        .find(arg, route.method, route.path)
        .map(|found| (found, arg))
        .or_else(|| {
            element.and_then(|e| {
                registry
                    .find(e, route.method, route.path)
                    .map(|found| (found, e))
            })
        });
    if let Some(((idx, provider, applicability), matched)) = host {
        let matched = matched.clone();
        return Ok(ParamPlan {
            arg: arg.clone(),
            source: ParamSource::Host(idx),
            reads_body: applicability.reads_body,
            produce: produce_fn(move |scope| {
                provider.build_value(&matched, scope.request, scope.path_params)
            }),
        });
    }

    let (source, reads_body, produce): (ParamSource, bool, ProduceFn) = match target.shape() {
        ArgShape::PathSegment => {
            if *consumed == usize::MAX {
                return Err(ConfigError::PathSegmentAfterRest { index });
            }
            let pos = *consumed;
            *consumed = consumed.saturating_add(1);
            (
                ParamSource::PathSegment(pos),
                false,
                produce_fn(move |scope| {
                    let (_, value) = scope.path_params.get(pos).ok_or_else(|| {
                        ApiError::internal(format!("missing path parameter at position {pos}"))
                    })?;
                    Ok(Box::new(value.clone()) as ArgValue)
                }),
            )
        }
        ArgShape::PathRest => {
            let start = *consumed;
            *consumed = usize::MAX;
            (
                ParamSource::PathRest(start),
                false,
                produce_fn(move |scope| {
                    let rest: Vec<String> = scope
                        .path_params
                        .iter()
                        .skip(start)
                        .map(|(_, v)| v.clone())
                        .collect();
                    Ok(Box::new(rest) as ArgValue)
                }),
            )
        }
        ArgShape::Body => {
            let decode = target.decoder().ok_or_else(|| ConfigError::UnresolvableArg {
                index,
                type_name: arg.name().to_string(),
            })?;
            let unmarshaler = Arc::clone(unmarshaler);
            (
                ParamSource::Body,
                true,
                produce_fn(move |scope| {
                    let payload = unmarshaler.unmarshal(scope.request)?;
                    Ok(decode(&payload)?)
                }),
            )
        }
        ArgShape::Opaque | ArgShape::Variadic => {
            return Err(ConfigError::UnresolvableArg {
                index,
                type_name: arg.name().to_string(),
            });
        }
    };

    Ok(ParamPlan {
        arg: arg.clone(),
        source,
        reads_body,
        produce,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ArgExtractor;
    use crate::server::{Request, ResponseWriter};
    use crate::typed::{Arg, Json, RawBody, Variadic};
    use crate::unmarshal::JsonUnmarshaler;
    use crate::router::ParamVec;

    fn json() -> Arc<dyn Unmarshaler> {
        Arc::new(JsonUnmarshaler::default())
    }

    fn plan(args: &[ArgType], registry: &Registry) -> Result<InputPlan, ConfigError> {
        let route = RouteShape {
            method: &Method::POST,
            path: "/foo/{a}/bar/{b}",
        };
        InputPlan::resolve(args, &route, registry, &json())
    }

    #[test]
    fn test_strings_consume_path_params_in_order() {
        let p = plan(
            &[String::arg_type(), Request::arg_type(), String::arg_type()],
            &Registry::default(),
        )
        .unwrap();
        let sources: Vec<_> = p.params().iter().map(|p| p.source().clone()).collect();
        assert_eq!(
            sources,
            vec![
                ParamSource::PathSegment(0),
                ParamSource::Builtin,
                ParamSource::PathSegment(1)
            ]
        );
    }

    #[test]
    fn test_rest_starts_at_consumption_point() {
        let p = plan(
            &[String::arg_type(), <Variadic<String>>::arg_type()],
            &Registry::default(),
        )
        .unwrap();
        assert_eq!(p.params()[1].source(), &ParamSource::PathRest(1));
    }

    #[test]
    fn test_segment_after_rest_rejected() {
        let err = plan(
            &[<Vec<String>>::arg_type(), Request::arg_type(), String::arg_type()],
            &Registry::default(),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::PathSegmentAfterRest { index: 2 });
    }

    #[test]
    fn test_second_body_reader_rejected() {
        let err = plan(
            &[RawBody::arg_type(), <Json<serde_json::Value>>::arg_type()],
            &Registry::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "multiple args could be from request.Body");
    }

    #[test]
    fn test_variadic_must_be_last() {
        let err = plan(
            &[<Variadic<String>>::arg_type(), String::arg_type()],
            &Registry::default(),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::VariadicNotLast { index: 0 });
    }

    #[test]
    fn test_unresolvable_opaque() {
        let err = plan(&[String::arg_type(), u64::arg_type()], &Registry::default()).unwrap_err();
        assert_eq!(err.to_string(), "cannot determine arg 1");
    }

    #[test]
    fn test_host_provider_before_structural_fallback() {
        let registry = Registry::builder()
            .extractor(ArgExtractor::new(|_req| Ok("from-host".to_string())))
            .build()
            .unwrap();
        let p = plan(&[String::arg_type()], &registry).unwrap();
        assert_eq!(p.params()[0].source(), &ParamSource::Host(0));
    }

    #[test]
    fn test_builtin_before_host_provider() {
        let registry = Registry::builder()
            .extractor(ArgExtractor::new(|_req| Ok(RawBody(b"host".to_vec()))))
            .build()
            .unwrap();
        let p = plan(&[RawBody::arg_type()], &registry).unwrap();
        assert_eq!(p.params()[0].source(), &ParamSource::Builtin);
        assert!(p.params()[0].reads_body());
    }

    #[test]
    fn test_produce_short_circuits() {
        let p = plan(&[String::arg_type(), String::arg_type()], &Registry::default()).unwrap();
        let writer = ResponseWriter::new();
        let request = Request::builder().build().unwrap();
        let mut params = ParamVec::new();
        params.push((Arc::from("a"), "1".to_string()));
        let scope = CallScope {
            writer: &writer,
            request: &request,
            path_params: &params,
            body_limit: None,
        };
        let err = p.produce(&scope).unwrap_err();
        assert_eq!(crate::error::status_code_of(&err), Some(500));
    }
}

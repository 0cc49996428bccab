//! # Handler Builder
//!
//! Turns a handler target into a ready-to-serve [`Handler`] for one route.
//!
//! ```rust
//! use brrtbind::{HandlerBuilder, HandlerTarget, Request};
//! use http::Method;
//!
//! fn greet(name: String) -> String {
//!     format!("hello {name}")
//! }
//!
//! let handler = HandlerBuilder::default()
//!     .build("/hello/{name}", Method::GET, HandlerTarget::func(greet))
//!     .unwrap();
//!
//! let response = handler.call(Request::builder().uri("/hello/rex").build().unwrap());
//! assert_eq!(response.status, 200);
//! assert_eq!(response.json().unwrap(), "hello rex");
//! ```
//!
//! Building plans the handler's parameters and returns once. Two signatures skip
//! planning entirely:
//!
//! - no parameters and no returns: the function is invoked and a bare 200 written;
//! - exactly `(ResponseWriter, Request)` and no returns: the function owns the
//!   response.
//!
//! Targets may also be named, in which case the function is looked up in the
//! builder's [`HostApi`], or raw closures over the writer and request.

use crate::error::ConfigError;
use crate::handlers::{DefaultErrorHandler, ErrorHandler, Outcome, ResponseHandler};
use crate::planner::{InputPlan, PlanSummary, ReturnPlan, RouteShape};
use crate::registry::{CallScope, Registry};
use crate::router::{ParamVec, PathTemplate};
use crate::runtime_config::{BodyFormats, RuntimeConfig};
use crate::server::{RecordedResponse, Request, ResponseWriter};
use crate::typed::{ArgValue, BoxedHandlerFn, HandlerFn};
use crate::unmarshal::{JsonUnmarshaler, MultiFormatUnmarshaler, Unmarshaler};
use http::Method;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A closure that writes the response itself.
pub type RawHandler = Arc<dyn Fn(&ResponseWriter, &Request) + Send + Sync>;

/// What a route invokes.
#[derive(Clone)]
pub enum HandlerTarget {
    Func(BoxedHandlerFn),
    /// Method name resolved through the builder's [`HostApi`].
    Named(String),
    Raw(RawHandler),
}

impl HandlerTarget {
    pub fn func<Func, Args>(func: Func) -> Self
    where
        Func: HandlerFn<Args>,
        Args: 'static,
    {
        HandlerTarget::Func(BoxedHandlerFn::new(func))
    }

    pub fn named(name: impl Into<String>) -> Self {
        HandlerTarget::Named(name.into())
    }

    pub fn raw<F>(func: F) -> Self
    where
        F: Fn(&ResponseWriter, &Request) + Send + Sync + 'static,
    {
        HandlerTarget::Raw(Arc::new(func))
    }

    fn label(&self) -> Cow<'_, str> {
        match self {
            HandlerTarget::Func(f) => Cow::Borrowed(f.type_name()),
            HandlerTarget::Named(name) => Cow::Borrowed(name),
            HandlerTarget::Raw(_) => Cow::Borrowed("<raw>"),
        }
    }
}

impl std::fmt::Debug for HandlerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HandlerTarget").field(&self.label()).finish()
    }
}

/// Host application: handler functions by name plus rendering overrides.
#[derive(Clone, Default)]
pub struct HostApi {
    methods: HashMap<String, BoxedHandlerFn>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    response_handler: Option<Arc<dyn ResponseHandler>>,
}

impl HostApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method<Func, Args>(mut self, name: impl Into<String>, func: Func) -> Self
    where
        Func: HandlerFn<Args>,
        Args: 'static,
    {
        self.methods.insert(name.into(), BoxedHandlerFn::new(func));
        self
    }

    /// Replaces the engine's error handler for every route of this host.
    #[must_use]
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Takes over all rendering, success and failure, for every route of this host.
    #[must_use]
    pub fn response_handler(mut self, handler: impl ResponseHandler + 'static) -> Self {
        self.response_handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&BoxedHandlerFn> {
        self.methods.get(name)
    }
}

impl std::fmt::Debug for HostApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("HostApi")
            .field("methods", &names)
            .field("error_handler", &self.error_handler.is_some())
            .field("response_handler", &self.response_handler.is_some())
            .finish()
    }
}

/// Engine-wide collaborators shared by every route.
#[derive(Clone)]
pub struct EngineConfig {
    pub registry: Registry,
    pub unmarshaler: Arc<dyn Unmarshaler>,
    pub error_handler: Arc<dyn ErrorHandler>,
    /// Limit for built-in body readers (`RawBody`, `RawJson`, `PostForm`).
    pub max_body_bytes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            unmarshaler: Arc::new(JsonUnmarshaler::default()),
            error_handler: Arc::new(DefaultErrorHandler),
            max_body_bytes: None,
        }
    }
}

impl EngineConfig {
    /// Body limit and default unmarshaler taken from runtime configuration.
    #[must_use]
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        let unmarshaler: Arc<dyn Unmarshaler> = match runtime.body_formats {
            BodyFormats::Json => Arc::new(JsonUnmarshaler {
                max_body_bytes: runtime.max_body_bytes,
            }),
            BodyFormats::Multi => Arc::new(MultiFormatUnmarshaler {
                max_body_bytes: runtime.max_body_bytes,
            }),
        };
        Self {
            unmarshaler,
            max_body_bytes: runtime.max_body_bytes,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_unmarshaler(mut self, unmarshaler: impl Unmarshaler + 'static) -> Self {
        self.unmarshaler = Arc::new(unmarshaler);
        self
    }

    #[must_use]
    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("registry", &self.registry)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

/// Builds per-route [`Handler`]s.
#[derive(Clone, Default, Debug)]
pub struct HandlerBuilder {
    config: EngineConfig,
    host: Option<Arc<HostApi>>,
}

impl HandlerBuilder {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config, host: None }
    }

    #[must_use]
    pub fn with_host(mut self, host: HostApi) -> Self {
        self.host = Some(Arc::new(host));
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plan `target` for routes matching `path` and `method`.
    ///
    /// Nothing is returned on failure; the route should not be installed.
    pub fn build(
        &self,
        path: &str,
        method: Method,
        target: HandlerTarget,
    ) -> Result<Handler, ConfigError> {
        let label = target.label().into_owned();
        match self.build_inner(path, method.clone(), target) {
            Ok(handler) => {
                info!(
                    handler_name = %label,
                    method = %method,
                    path = %path,
                    kind = handler.inner.kind.name(),
                    "Handler built"
                );
                Ok(handler)
            }
            Err(err) => {
                error!(
                    handler_name = %label,
                    method = %method,
                    path = %path,
                    error = %err,
                    "Handler build failed"
                );
                Err(err)
            }
        }
    }

    fn build_inner(
        &self,
        path: &str,
        method: Method,
        target: HandlerTarget,
    ) -> Result<Handler, ConfigError> {
        let template = PathTemplate::parse(path)?;

        let func = match target {
            HandlerTarget::Raw(raw) => {
                return Ok(self.handler(method, template, HandlerKind::Raw(raw)));
            }
            HandlerTarget::Func(func) => func,
            HandlerTarget::Named(name) => {
                let host = self
                    .host
                    .as_ref()
                    .ok_or_else(|| ConfigError::NoHostApi { name: name.clone() })?;
                host.lookup(&name)
                    .cloned()
                    .ok_or(ConfigError::UnknownHandler { name })?
            }
        };

        let args = func.arg_types();
        let slots = func.slot_types();

        let kind = if slots.is_empty() && args.is_empty() {
            HandlerKind::Trivial(func)
        } else if slots.is_empty()
            && args.len() == 2
            && args[0].is::<ResponseWriter>()
            && args[1].is::<Request>()
        {
            HandlerKind::PassThrough(func)
        } else {
            let route = RouteShape {
                method: &method,
                path: template.as_str(),
            };
            let input = InputPlan::resolve(
                &args,
                &route,
                &self.config.registry,
                &self.config.unmarshaler,
            )?;
            let returns = ReturnPlan::resolve(&slots)?;
            HandlerKind::Planned {
                func,
                input,
                returns,
            }
        };

        Ok(self.handler(method, template, kind))
    }

    fn handler(&self, method: Method, template: PathTemplate, kind: HandlerKind) -> Handler {
        let host = self.host.as_deref();
        let error_handler = host
            .and_then(|h| h.error_handler.clone())
            .unwrap_or_else(|| Arc::clone(&self.config.error_handler));
        Handler {
            inner: Arc::new(HandlerInner {
                method,
                template,
                kind,
                error_handler,
                response_handler: host.and_then(|h| h.response_handler.clone()),
                body_limit: self.config.max_body_bytes,
            }),
        }
    }
}

enum HandlerKind {
    Raw(RawHandler),
    Trivial(BoxedHandlerFn),
    PassThrough(BoxedHandlerFn),
    Planned {
        func: BoxedHandlerFn,
        input: InputPlan,
        returns: ReturnPlan,
    },
}

impl HandlerKind {
    fn name(&self) -> &'static str {
        match self {
            HandlerKind::Raw(_) => "raw",
            HandlerKind::Trivial(_) => "trivial",
            HandlerKind::PassThrough(_) => "pass_through",
            HandlerKind::Planned { .. } => "planned",
        }
    }
}

struct HandlerInner {
    method: Method,
    template: PathTemplate,
    kind: HandlerKind,
    error_handler: Arc<dyn ErrorHandler>,
    response_handler: Option<Arc<dyn ResponseHandler>>,
    body_limit: Option<usize>,
}

/// A built route handler. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("method", &self.inner.method)
            .field("path", &self.inner.template.as_str())
            .field("kind", &self.inner.kind.name())
            .finish()
    }
}

impl Handler {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.inner.template
    }

    /// Bindings of a planned handler; `None` for raw, trivial and pass-through ones.
    #[must_use]
    pub fn plan_summary(&self) -> Option<PlanSummary> {
        match &self.inner.kind {
            HandlerKind::Planned { input, returns, .. } => Some(PlanSummary::new(input, returns)),
            _ => None,
        }
    }

    /// Serve `r`, writing the response to `w`.
    pub fn serve(&self, w: &ResponseWriter, r: &Request) {
        let inner = &*self.inner;
        match &inner.kind {
            HandlerKind::Raw(raw) => (**raw)(w, r),
            HandlerKind::Trivial(func) => {
                if let Err(err) = func.invoke(Vec::new()) {
                    self.fail(w, r, err.into());
                    return;
                }
                w.write_header(200);
            }
            HandlerKind::PassThrough(func) => {
                let args: Vec<ArgValue> = vec![Box::new(w.clone()), Box::new(r.clone())];
                if let Err(err) = func.invoke(args) {
                    self.fail(w, r, err.into());
                }
            }
            HandlerKind::Planned {
                func,
                input,
                returns,
            } => {
                let params = self.path_params(r);
                let scope = CallScope {
                    writer: w,
                    request: r,
                    path_params: &params,
                    body_limit: inner.body_limit,
                };
                let args = match input.produce(&scope) {
                    Ok(args) => args,
                    Err(err) => {
                        self.fail(w, r, err);
                        return;
                    }
                };
                match func.invoke(args) {
                    Ok(values) => returns.respond(
                        values,
                        w,
                        r,
                        inner.error_handler.as_ref(),
                        inner.response_handler.as_deref(),
                    ),
                    Err(err) => self.fail(w, r, err.into()),
                }
            }
        }
    }

    /// Serve `r` into a fresh writer and return what was written.
    #[must_use]
    pub fn call(&self, r: Request) -> RecordedResponse {
        let w = ResponseWriter::new();
        self.serve(&w, &r);
        w.finish()
    }

    fn path_params<'r>(&self, r: &'r Request) -> Cow<'r, ParamVec> {
        if let Some(route) = r.route() {
            return Cow::Borrowed(route.params());
        }
        let template = &self.inner.template;
        if template.param_count() == 0 {
            return Cow::Owned(ParamVec::new());
        }
        match template.match_path(r.path()) {
            Some(params) => Cow::Owned(params),
            None => {
                debug!(
                    request_id = %r.request_id(),
                    path = %r.path(),
                    template = %template.as_str(),
                    "Request path does not match handler template"
                );
                Cow::Owned(ParamVec::new())
            }
        }
    }

    fn fail(&self, w: &ResponseWriter, r: &Request, err: anyhow::Error) {
        match &self.inner.response_handler {
            Some(responder) => responder.handle_response(
                w,
                r,
                Outcome {
                    error: Some(err),
                    ..Outcome::default()
                },
            ),
            None => self.inner.error_handler.handle_error(w, r, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::typed::QueryParams;

    #[test]
    fn test_trivial_handler_writes_200() {
        let handler = HandlerBuilder::default()
            .build("/ping", Method::GET, HandlerTarget::func(|| {}))
            .unwrap();
        assert!(handler.plan_summary().is_none());
        let res = handler.call(Request::builder().uri("/ping").build().unwrap());
        assert_eq!(res.status, 200);
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_pass_through_owns_response() {
        fn raw(w: ResponseWriter, r: Request) {
            w.write_header(207);
            w.write(r.path().as_bytes());
        }
        let handler = HandlerBuilder::default()
            .build("/raw", Method::GET, HandlerTarget::func(raw))
            .unwrap();
        assert!(handler.plan_summary().is_none());
        let res = handler.call(Request::builder().uri("/raw").build().unwrap());
        assert_eq!(res.status, 207);
        assert_eq!(res.body_str(), "/raw");
    }

    #[test]
    fn test_template_fallback_without_route() {
        let handler = HandlerBuilder::default()
            .build(
                "/foo/{a}/bar/{b}",
                Method::GET,
                HandlerTarget::func(|a: String, b: String| -> Vec<u8> {
                    format!("{a}+{b}").into_bytes()
                }),
            )
            .unwrap();
        let res = handler.call(Request::builder().uri("/foo/1/bar/2").build().unwrap());
        assert_eq!(res.body_str(), "1+2");

        let miss = handler.call(Request::builder().uri("/elsewhere").build().unwrap());
        assert_eq!(miss.status, 500);
    }

    #[test]
    fn test_named_target_requires_host() {
        let err = HandlerBuilder::default()
            .build("/", Method::GET, HandlerTarget::named("list"))
            .unwrap_err();
        assert_eq!(err, ConfigError::NoHostApi { name: "list".into() });

        let builder = HandlerBuilder::default()
            .with_host(HostApi::new().method("list", |q: QueryParams| -> String {
                q.first("page").unwrap_or("1").to_string()
            }));
        let err = builder
            .build("/", Method::GET, HandlerTarget::named("missing"))
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownHandler { name: "missing".into() });

        let handler = builder
            .build("/", Method::GET, HandlerTarget::named("list"))
            .unwrap();
        let res = handler.call(Request::builder().uri("/?page=3").build().unwrap());
        assert_eq!(res.json().unwrap(), "3");
    }

    #[test]
    fn test_host_error_handler_override() {
        let builder = HandlerBuilder::default().with_host(HostApi::new().error_handler(
            |w: &ResponseWriter, _r: &Request, _e: anyhow::Error| {
                w.write_header(418);
            },
        ));
        let handler = builder
            .build(
                "/",
                Method::GET,
                HandlerTarget::func(|| -> Result<(), ApiError> { Err(ApiError::from_status(400)) }),
            )
            .unwrap();
        assert_eq!(handler.call(Request::builder().build().unwrap()).status, 418);
    }
}

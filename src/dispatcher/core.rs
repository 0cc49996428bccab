use crate::builder::{Handler, HandlerBuilder, HandlerTarget};
use crate::error::ConfigError;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteContext};
use crate::runtime_config::RuntimeConfig;
use crate::server::{RecordedResponse, Request, ResponseWriter};
use arc_swap::ArcSwap;
use http::Method;
use may::coroutine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// One installed route.
#[derive(Debug)]
pub struct RouteEntry {
    method: Method,
    handler: Handler,
}

impl RouteEntry {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.handler.template().as_str()
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    fn matches(&self, method: &Method, path: &str) -> Option<ParamVec> {
        if self.method != *method {
            return None;
        }
        self.handler.template().match_path(path)
    }
}

/// Route table plus middleware, dispatching on `may` coroutines.
pub struct Dispatcher {
    builder: HandlerBuilder,
    routes: ArcSwap<Vec<Arc<RouteEntry>>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    stack_size: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.load().len())
            .field("middlewares", &self.middlewares.len())
            .field("stack_size", &self.stack_size)
            .finish()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(builder: HandlerBuilder) -> Self {
        Self::with_runtime(builder, &RuntimeConfig::default())
    }

    #[must_use]
    pub fn with_runtime(builder: HandlerBuilder, runtime: &RuntimeConfig) -> Self {
        Dispatcher {
            builder,
            routes: ArcSwap::from_pointee(Vec::new()),
            middlewares: Vec::new(),
            stack_size: runtime.stack_size,
        }
    }

    /// Add middleware to the processing pipeline
    ///
    /// Middleware is executed in the order it's added.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Plan and install a route.
    ///
    /// If a route with the same method and template exists, it is replaced.
    pub fn add_route(
        &self,
        path: &str,
        method: Method,
        target: HandlerTarget,
    ) -> Result<(), ConfigError> {
        let handler = self.builder.build(path, method.clone(), target)?;
        let entry = Arc::new(RouteEntry { method, handler });

        let mut replaced = false;
        self.routes.rcu(|routes| {
            let mut next: Vec<Arc<RouteEntry>> = Vec::with_capacity(routes.len() + 1);
            replaced = false;
            for existing in routes.iter() {
                if existing.method == entry.method && existing.path() == entry.path() {
                    replaced = true;
                    next.push(Arc::clone(&entry));
                } else {
                    next.push(Arc::clone(existing));
                }
            }
            if !replaced {
                next.push(Arc::clone(&entry));
            }
            next
        });

        let total_routes = self.routes.load().len();
        if replaced {
            warn!(
                method = %entry.method,
                path = %entry.path(),
                total_routes = total_routes,
                "Replaced existing route handler"
            );
        } else {
            info!(
                method = %entry.method,
                path = %entry.path(),
                total_routes = total_routes,
                "Route registered successfully"
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.load().len()
    }

    /// Snapshot of the installed routes, in match order.
    #[must_use]
    pub fn routes(&self) -> Arc<Vec<Arc<RouteEntry>>> {
        self.routes.load_full()
    }

    /// Dispatch a request to the first matching route.
    ///
    /// Returns `None` if no route matches.
    #[must_use]
    pub fn dispatch(&self, request: Request) -> Option<RecordedResponse> {
        let request_id = request.request_id();
        let routes = self.routes.load_full();

        // D1: Route lookup
        debug!(
            request_id = %request_id,
            method = %request.method(),
            path = %request.path(),
            available_routes = routes.len(),
            "Route lookup"
        );

        let Some((entry, params)) = routes
            .iter()
            .find_map(|e| e.matches(request.method(), request.path()).map(|p| (e, p)))
        else {
            // D2: No route matched
            warn!(
                request_id = %request_id,
                method = %request.method(),
                path = %request.path(),
                "No route matched"
            );
            return None;
        };

        if !request.set_route(RouteContext::new(entry.path(), params)) {
            debug!(
                request_id = %request_id,
                "Request already carries a route context, keeping it"
            );
        }

        // D4: Middleware before execution
        debug!(
            request_id = %request_id,
            middleware_count = self.middlewares.len(),
            "Middleware before execution"
        );

        let mut early_resp: Option<RecordedResponse> = None;
        for (idx, mw) in self.middlewares.iter().enumerate() {
            let resp = mw.before(&request);
            if early_resp.is_none() && resp.is_some() {
                debug!(
                    request_id = %request_id,
                    middleware_idx = idx,
                    middleware_name = std::any::type_name_of_val(mw.as_ref()),
                    "Middleware returned early response"
                );
                early_resp = resp;
            }
        }

        let (mut resp, latency) = match early_resp {
            Some(r) => (r, Duration::from_millis(0)),
            None => {
                // D3: Request dispatched to handler
                info!(
                    request_id = %request_id,
                    method = %request.method(),
                    path = %entry.path(),
                    "Request dispatched to handler"
                );
                let start = Instant::now();
                let resp = self.serve(entry.handler.clone(), request.clone());
                (resp, start.elapsed())
            }
        };

        // D5: Middleware after execution
        debug!(
            request_id = %request_id,
            middleware_count = self.middlewares.len(),
            response_status = resp.status,
            latency_ms = latency.as_millis() as u64,
            "Middleware after execution"
        );

        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }

        Some(resp)
    }

    fn serve(&self, handler: Handler, request: Request) -> RecordedResponse {
        let request_id = request.request_id();

        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The closure owns everything it touches and the coroutine is joined before
        // this function returns.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .stack_size(self.stack_size)
                .spawn(move || {
                    let w = ResponseWriter::new();
                    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        handler.serve(&w, &request);
                    })) {
                        Ok(()) => Ok(w.finish()),
                        Err(panic) => Err(panic_message(panic.as_ref())),
                    }
                })
        };

        let join = match spawn_result {
            Ok(join) => join,
            Err(e) => {
                // D6: Coroutine spawn failed
                error!(
                    request_id = %request_id,
                    error = %e,
                    stack_size = self.stack_size,
                    "Failed to spawn handler coroutine - CRITICAL"
                );
                return RecordedResponse::text(503, "Service Unavailable");
            }
        };

        match join.join() {
            Ok(Ok(resp)) => resp,
            Ok(Err(panic_message)) => {
                // D7: Handler panic caught
                let backtrace = std::backtrace::Backtrace::capture();
                error!(
                    request_id = %request_id,
                    panic_message = %panic_message,
                    backtrace = %backtrace,
                    "Handler panicked - CRITICAL"
                );
                RecordedResponse::text(500, "Internal Server Error")
            }
            Err(_) => {
                error!(
                    request_id = %request_id,
                    "Handler coroutine terminated abnormally"
                );
                RecordedResponse::text(500, "Internal Server Error")
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

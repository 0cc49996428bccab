use std::time::Duration;

use tracing::{debug, info};

use super::Middleware;
use crate::ids::REQUEST_ID_HEADER;
use crate::server::{RecordedResponse, Request};

/// Logs each request and echoes its id in the `x-request-id` response header.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &Request) -> Option<RecordedResponse> {
        // T1: Request received
        debug!(
            request_id = %req.request_id(),
            method = %req.method(),
            path = %req.path(),
            route = req.route().map(|r| r.pattern()),
            "Request received"
        );
        None
    }

    fn after(&self, req: &Request, res: &mut RecordedResponse, latency: Duration) {
        let request_id = req.request_id().to_string();
        if res.header(REQUEST_ID_HEADER).is_none() {
            res.set_header(REQUEST_ID_HEADER, &request_id);
        }

        // T2: Request complete
        info!(
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
            status = res.status,
            latency_ms = latency.as_millis() as u64,
            "Request complete"
        );
    }
}

use std::time::Duration;

use crate::server::{RecordedResponse, Request};

/// Hooks around dispatch.
///
/// `before` runs for every middleware in order; the first `Some` response
/// short-circuits the handler, but later middlewares still see the request.
/// `after` runs for every middleware on the final response.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &Request) -> Option<RecordedResponse> {
        None
    }
    fn after(&self, _req: &Request, _res: &mut RecordedResponse, _latency: Duration) {}
}

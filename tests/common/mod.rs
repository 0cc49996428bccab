#![allow(dead_code)]

use brrtbind::{Handler, HandlerBuilder, HandlerTarget, RecordedResponse, Request};
use http::Method;

pub fn get(uri: &str) -> Request {
    Request::builder().uri(uri).build().unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .build()
        .unwrap()
}

/// Build with a default builder and panic on configuration errors.
pub fn handler(path: &str, method: Method, target: HandlerTarget) -> Handler {
    HandlerBuilder::default()
        .build(path, method, target)
        .unwrap_or_else(|e| panic!("building {path}: {e}"))
}

pub fn call(path: &str, target: HandlerTarget, request: Request) -> RecordedResponse {
    handler(path, request.method().clone(), target).call(request)
}

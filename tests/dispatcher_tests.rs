//! End-to-end dispatch: route table, middleware and runtime configuration.

mod common;

use brrtbind::dispatcher::Dispatcher;
use brrtbind::middleware::TracingMiddleware;
use brrtbind::runtime_config::{BodyFormats, RuntimeConfig};
use brrtbind::typed::QueryParams;
use brrtbind::{ApiError, EngineConfig, HandlerBuilder, HandlerTarget, Json, JsonResponse};
use common::{get, post_json};
use http::Method;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

fn pet_store(runtime: &RuntimeConfig) -> Dispatcher {
    let builder = HandlerBuilder::new(EngineConfig::from_runtime(runtime));
    let mut d = Dispatcher::with_runtime(builder, runtime);
    d.add_middleware(Arc::new(TracingMiddleware));

    d.add_route(
        "/pets",
        Method::GET,
        HandlerTarget::func(|q: QueryParams| -> Json<Value> {
            let limit = q.first("limit").unwrap_or("10").to_string();
            Json(json!({ "limit": limit, "items": [] }))
        }),
    )
    .unwrap();
    d.add_route(
        "/pets/{id}",
        Method::GET,
        HandlerTarget::func(|id: String| -> Result<JsonResponse, ApiError> {
            if id == "404" {
                return Err(ApiError::from_status(404));
            }
            Ok(JsonResponse::ok(json!({ "id": id })).header("cache-control", "no-store"))
        }),
    )
    .unwrap();
    d.add_route(
        "/pets",
        Method::POST,
        HandlerTarget::func(|body: Json<Value>| (Json(body.0), 201i32)),
    )
    .unwrap();
    d
}

#[test]
fn test_routes_dispatch_by_method_and_path() {
    let d = pet_store(&RuntimeConfig::default());
    assert_eq!(d.route_count(), 3);

    let list = d.dispatch(get("/pets?limit=2")).unwrap();
    assert_eq!(list.json().unwrap()["limit"], "2");

    let one = d.dispatch(get("/pets/7")).unwrap();
    assert_eq!(one.status, 200);
    assert_eq!(one.header("cache-control"), Some("no-store"));
    assert_eq!(one.json().unwrap(), json!({"id": "7"}));

    let missing = d.dispatch(get("/pets/404")).unwrap();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body_str(), "Not Found");

    let created = d
        .dispatch(post_json("/pets", r#"{"name":"rex"}"#))
        .unwrap();
    assert_eq!(created.status, 201);

    assert!(d.dispatch(get("/owners")).is_none());
}

#[test]
fn test_encoded_slash_dispatches_to_single_segment_route() {
    let d = pet_store(&RuntimeConfig::default());
    let res = d.dispatch(get("/pets/a%2Fb")).unwrap();
    assert_eq!(res.json().unwrap(), json!({"id": "a/b"}));
    assert!(d.dispatch(get("/pets/a/b")).is_none());
}

#[test]
fn test_tracing_middleware_sets_request_id() {
    let d = pet_store(&RuntimeConfig::default());
    let req = get("/pets/1");
    let id = req.request_id().to_string();
    let res = d.dispatch(req).unwrap();
    assert_eq!(res.header("x-request-id"), Some(id.as_str()));
}

#[test]
fn test_runtime_config_from_yaml_file_applies() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "stack_size: \"0x8000\"").unwrap();
    writeln!(file, "max_body_bytes: 16").unwrap();
    writeln!(file, "body_formats: multi").unwrap();

    let runtime = RuntimeConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(runtime.stack_size, 0x8000);
    assert_eq!(runtime.body_formats, BodyFormats::Multi);

    let d = pet_store(&runtime);
    let too_big = d
        .dispatch(post_json("/pets", r#"{"name":"a much longer name"}"#))
        .unwrap();
    assert_eq!(too_big.status, 413);

    let yaml = d
        .dispatch(
            brrtbind::Request::builder()
                .method(Method::POST)
                .uri("/pets")
                .header("content-type", "application/yaml")
                .body("name: rex\n")
                .build()
                .unwrap(),
        )
        .unwrap();
    assert_eq!(yaml.status, 201);
    assert_eq!(yaml.json().unwrap(), json!({"name": "rex"}));
}

#[test]
fn test_concurrent_dispatch() {
    let d = Arc::new(pet_store(&RuntimeConfig::default()));
    let workers: Vec<_> = (0..8)
        .map(|i| {
            let d = Arc::clone(&d);
            std::thread::spawn(move || {
                let res = d.dispatch(get(&format!("/pets/{i}"))).unwrap();
                assert_eq!(res.json().unwrap()["id"], i.to_string());
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
}

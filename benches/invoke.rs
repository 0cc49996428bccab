use brrtbind::typed::QueryParams;
use brrtbind::{ApiError, HandlerBuilder, HandlerTarget, Json, Request};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::{json, Value};
use std::hint::black_box;

fn show(org: String, id: String, q: QueryParams) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({
        "org": org,
        "id": id,
        "verbose": q.first("verbose").is_some(),
    })))
}

fn request() -> Request {
    Request::builder()
        .uri("/orgs/acme/pets/42?verbose=1")
        .build()
        .unwrap()
}

fn bench_build(c: &mut Criterion) {
    let builder = HandlerBuilder::default();
    c.bench_function("build_planned_handler", |b| {
        b.iter(|| {
            builder
                .build(
                    black_box("/orgs/{org}/pets/{id}"),
                    Method::GET,
                    HandlerTarget::func(show),
                )
                .unwrap()
        })
    });
}

fn bench_invoke(c: &mut Criterion) {
    let planned = HandlerBuilder::default()
        .build("/orgs/{org}/pets/{id}", Method::GET, HandlerTarget::func(show))
        .unwrap();
    c.bench_function("invoke_planned_handler", |b| {
        b.iter(|| black_box(planned.call(request())))
    });

    let trivial = HandlerBuilder::default()
        .build("/ping", Method::GET, HandlerTarget::func(|| {}))
        .unwrap();
    c.bench_function("invoke_trivial_handler", |b| {
        b.iter(|| black_box(trivial.call(Request::builder().uri("/ping").build().unwrap())))
    });
}

criterion_group!(benches, bench_build, bench_invoke);
criterion_main!(benches);

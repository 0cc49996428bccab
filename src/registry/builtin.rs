//! Built-in providers, matched by exact `TypeId` before anything else.

use crate::error::ApiError;
use crate::router::{ParamVec, RouteContext};
use crate::server::{BasicAuth, Cookie, Request, RequestContext, ResponseWriter};
use crate::typed::{
    group_pairs, ArgValue, Headers, PathParams, PostForm, QueryParams, RawBody, RawJson, RawQuery,
};
use http::{HeaderMap, Method};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

/// Per-invocation inputs available to providers.
pub(crate) struct CallScope<'a> {
    pub writer: &'a ResponseWriter,
    pub request: &'a Request,
    pub path_params: &'a ParamVec,
    pub body_limit: Option<usize>,
}

type Produce = fn(&CallScope<'_>) -> Result<ArgValue, ApiError>;

#[derive(Clone, Copy)]
pub(crate) struct Builtin {
    pub name: &'static str,
    /// Whether the provider consumes the body for requests with this method.
    pub reads_body: fn(&Method) -> bool,
    pub produce: Produce,
}

fn never(_: &Method) -> bool {
    false
}

fn always(_: &Method) -> bool {
    true
}

fn form_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn entry<T: 'static>(reads_body: fn(&Method) -> bool, produce: Produce) -> (TypeId, Builtin) {
    (
        TypeId::of::<T>(),
        Builtin {
            name: std::any::type_name::<T>(),
            reads_body,
            produce,
        },
    )
}

fn query_params(request: &Request) -> QueryParams {
    match request.url() {
        Some(url) => QueryParams(group_pairs(
            url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())),
        )),
        None => QueryParams::default(),
    }
}

fn post_form(scope: &CallScope<'_>) -> Result<PostForm, ApiError> {
    if !form_method(scope.request.method()) {
        return Ok(PostForm::default());
    }
    if !scope.request.has_body() {
        return Err(ApiError::new(400, "missing form body"));
    }
    let body = scope.request.read_body(scope.body_limit)?;
    Ok(PostForm(group_pairs(
        url::form_urlencoded::parse(&body).map(|(k, v)| (k.into_owned(), v.into_owned())),
    )))
}

fn table() -> &'static HashMap<TypeId, Builtin> {
    static TABLE: OnceLock<HashMap<TypeId, Builtin>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            entry::<ResponseWriter>(never, |s| Ok(Box::new(s.writer.clone()))),
            entry::<Request>(never, |s| Ok(Box::new(s.request.clone()))),
            entry::<RequestContext>(never, |s| Ok(Box::new(s.request.context().clone()))),
            entry::<RouteContext>(never, |s| {
                Ok(Box::new(s.request.route().cloned().unwrap_or_default()))
            }),
            entry::<Option<RouteContext>>(never, |s| Ok(Box::new(s.request.route().cloned()))),
            entry::<HeaderMap>(never, |s| Ok(Box::new(s.request.headers().clone()))),
            entry::<Headers>(never, |s| Ok(Box::new(Headers(s.request.headers().clone())))),
            entry::<Vec<Cookie>>(never, |s| Ok(Box::new(s.request.cookies()))),
            entry::<Option<Url>>(never, |s| Ok(Box::new(s.request.url().cloned()))),
            entry::<PathParams>(never, |s| {
                Ok(Box::new(PathParams(group_pairs(
                    s.path_params.iter().map(|(k, v)| (k.to_string(), v.clone())),
                ))))
            }),
            entry::<QueryParams>(never, |s| Ok(Box::new(query_params(s.request)))),
            entry::<RawQuery>(never, |s| {
                Ok(Box::new(RawQuery(s.request.raw_query().to_string())))
            }),
            entry::<RawBody>(always, |s| {
                Ok(Box::new(RawBody(s.request.read_body(s.body_limit)?)))
            }),
            entry::<Vec<u8>>(always, |s| Ok(Box::new(s.request.read_body(s.body_limit)?))),
            entry::<RawJson>(always, |s| {
                Ok(Box::new(RawJson(s.request.read_body(s.body_limit)?)))
            }),
            entry::<PostForm>(form_method, |s| Ok(Box::new(post_form(s)?))),
            entry::<BasicAuth>(never, |s| {
                Ok(Box::new(s.request.basic_auth().unwrap_or_default()))
            }),
            entry::<Option<BasicAuth>>(never, |s| Ok(Box::new(s.request.basic_auth()))),
        ])
    })
}

/// Built-in provider for exactly `id`, if any.
pub(crate) fn lookup(id: TypeId) -> Option<Builtin> {
    table().get(&id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn produce<T: 'static>(request: &Request, params: &ParamVec) -> T {
        let writer = ResponseWriter::new();
        let scope = CallScope {
            writer: &writer,
            request,
            path_params: params,
            body_limit: None,
        };
        let builtin = lookup(TypeId::of::<T>()).unwrap();
        *(builtin.produce)(&scope).unwrap().downcast::<T>().unwrap()
    }

    #[test]
    fn test_path_params_grouped() {
        let req = Request::builder().build().unwrap();
        let mut params = ParamVec::new();
        params.push((Arc::from("id"), "1".to_string()));
        params.push((Arc::from("id"), "2".to_string()));
        let grouped = produce::<PathParams>(&req, &params);
        assert_eq!(grouped.0["id"], vec!["1", "2"]);
    }

    #[test]
    fn test_query_params_empty_without_url() {
        let req = Request::builder().uri("/?a=1").no_url().build().unwrap();
        assert!(produce::<QueryParams>(&req, &ParamVec::new()).0.is_empty());
        assert_eq!(produce::<RawQuery>(&req, &ParamVec::new()).0, "");

        let req = Request::builder().uri("/?a=1&a=2").build().unwrap();
        assert_eq!(produce::<QueryParams>(&req, &ParamVec::new()).0["a"], vec!["1", "2"]);
    }

    #[test]
    fn test_post_form_by_method() {
        let get = Request::builder().body("a=1").build().unwrap();
        assert!(produce::<PostForm>(&get, &ParamVec::new()).0.is_empty());
        assert!(get.has_body(), "GET must not consume the body");

        let post = Request::builder()
            .method(Method::POST)
            .body("a=1&b=two+words")
            .build()
            .unwrap();
        let form = produce::<PostForm>(&post, &ParamVec::new());
        assert_eq!(form.first("b"), Some("two words"));

        let builtin = lookup(TypeId::of::<PostForm>()).unwrap();
        assert!((builtin.reads_body)(&Method::PATCH));
        assert!(!(builtin.reads_body)(&Method::GET));
    }

    #[test]
    fn test_post_form_without_body_fails() {
        let post = Request::builder().method(Method::POST).build().unwrap();
        let writer = ResponseWriter::new();
        let params = ParamVec::new();
        let scope = CallScope {
            writer: &writer,
            request: &post,
            path_params: &params,
            body_limit: None,
        };
        let err = post_form(&scope).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_basic_auth_value_defaults_when_absent() {
        let req = Request::builder().build().unwrap();
        assert_eq!(produce::<BasicAuth>(&req, &ParamVec::new()), BasicAuth::default());
        assert!(produce::<Option<BasicAuth>>(&req, &ParamVec::new()).is_none());
    }

    #[test]
    fn test_route_context_empty_when_unrouted() {
        let req = Request::builder().build().unwrap();
        assert!(produce::<RouteContext>(&req, &ParamVec::new()).is_empty());
        assert!(produce::<Option<RouteContext>>(&req, &ParamVec::new()).is_none());
    }
}

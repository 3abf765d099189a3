use super::{PathParams, Reply, Router};
use crate::error::RouterError;
use crate::server::{Request, Response};
use http::Method;
use std::collections::HashMap;

fn request(method: Method, path: &str) -> Request {
    Request {
        method,
        path: path.to_string(),
        version: "HTTP/1.1".to_string(),
        headers: HashMap::new(),
        query: HashMap::new(),
        body: None,
        remote_addr: "127.0.0.1:1".to_string(),
    }
}

fn body(res: &Response) -> &str {
    std::str::from_utf8(&res.body).unwrap()
}

#[test]
fn test_full_match_anchoring() {
    let mut router = Router::new();
    router
        .register("GET", "/food", |_: &Request, _: &PathParams| "food")
        .unwrap();

    assert_eq!(router.dispatch(&request(Method::GET, "/food")).status, 200);
    assert_eq!(router.dispatch(&request(Method::GET, "/food/more")).status, 404);
    assert_eq!(router.dispatch(&request(Method::GET, "/x/food")).status, 404);
}

#[test]
fn test_alternation_is_anchored_as_a_whole() {
    let mut router = Router::new();
    router
        .register("GET", "/a|/b", |_: &Request, _: &PathParams| "ab")
        .unwrap();
    assert_eq!(router.dispatch(&request(Method::GET, "/b")).status, 200);
    assert_eq!(router.dispatch(&request(Method::GET, "/bc")).status, 404);
}

#[test]
fn test_named_captures_are_passed() {
    let mut router = Router::new();
    router
        .register(
            "GET",
            r"/users/(?P<user>[0-9]+)/posts/(?P<post>[a-z]+)",
            |_: &Request, p: &PathParams| format!("{}:{}", p["user"], p["post"]),
        )
        .unwrap();

    let res = router.dispatch(&request(Method::GET, "/users/7/posts/intro"));
    assert_eq!(body(&res), "7:intro");
}

#[test]
fn test_unmatched_optional_group_is_absent() {
    let mut router = Router::new();
    router
        .register(
            "GET",
            r"/files(/(?P<name>[a-z]+))?",
            |_: &Request, p: &PathParams| p.get("name").cloned().unwrap_or_else(|| "all".into()),
        )
        .unwrap();

    assert_eq!(body(&router.dispatch(&request(Method::GET, "/files"))), "all");
    assert_eq!(body(&router.dispatch(&request(Method::GET, "/files/doc"))), "doc");
}

#[test]
fn test_methods_are_separate_tables() {
    let mut router = Router::new();
    router
        .register("GET", "/thing", |_: &Request, _: &PathParams| "get")
        .unwrap()
        .register("PUT", "/thing", |_: &Request, _: &PathParams| "put")
        .unwrap();

    assert_eq!(body(&router.dispatch(&request(Method::PUT, "/thing"))), "put");
    assert!(router.has_method(&Method::GET));
    assert!(!router.has_method(&Method::DELETE));
    assert_eq!(router.entries(&Method::GET).map(<[_]>::len), Some(1));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let mut router = Router::new();
    let err = router
        .register("GET", "/broken/(", |_: &Request, _: &PathParams| ())
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidPattern { .. }));
    assert!(router.routes().is_empty());
}

#[test]
fn test_invalid_method_is_rejected() {
    let mut router = Router::new();
    let err = router
        .register("GE T", "/", |_: &Request, _: &PathParams| ())
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidMethod { .. }));
}

#[test]
fn test_describe_attaches_to_last_route() {
    let mut router = Router::new();
    router
        .register("GET", "/a", |_: &Request, _: &PathParams| ())
        .unwrap()
        .register("GET", "/b", |_: &Request, _: &PathParams| ())
        .unwrap()
        .describe("second route");

    let routes = router.routes();
    assert_eq!(routes[0].doc, None);
    assert_eq!(routes[1].doc.as_deref(), Some("second route"));
}

#[test]
fn test_reply_conversions() {
    assert_eq!(Reply::from("x"), Reply::Text("x".into()));
    assert_eq!(Reply::from(()), Reply::Empty);
    assert_eq!(Reply::from(None::<String>), Reply::Empty);
    assert_eq!(Reply::from(Some("y")), Reply::Text("y".into()));

    let empty = Reply::Empty.into_response();
    assert_eq!((empty.status, empty.status_message.as_str()), (204, "No Content"));
    assert!(empty.body.is_empty());
}

#[test]
fn test_handler_sees_request() {
    let mut router = Router::new();
    router
        .register("GET", "/echo", |req: &Request, _: &PathParams| {
            req.query_param("q").unwrap_or("none").to_string()
        })
        .unwrap();

    let mut req = request(Method::GET, "/echo");
    req.query.insert("q".into(), vec!["hi".into()]);
    assert_eq!(body(&router.dispatch(&req)), "hi");
}

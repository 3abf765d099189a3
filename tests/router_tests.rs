//! Router behaviour through the public API, without sockets.

use http::Method;
use std::collections::HashMap;
use yahs::server::not_found;
use yahs::{PathParams, Reply, Request, Response, Router};

fn request(method: Method, path: &str) -> Request {
    Request {
        method,
        path: path.to_string(),
        version: "HTTP/1.1".to_string(),
        headers: HashMap::new(),
        query: HashMap::new(),
        body: None,
        remote_addr: "127.0.0.1:9".to_string(),
    }
}

fn item(_req: &Request, params: &PathParams) -> String {
    format!("item:{}", params["id"])
}

fn store(_req: &Request, _params: &PathParams) -> Response {
    Response::with_status(201)
}

fn items_router() -> Router {
    let mut router = Router::new();
    router
        .register("GET", "/items/(?P<id>[0-9]+)", item)
        .unwrap()
        .register("POST", "/orders", store)
        .unwrap();
    router
}

#[test]
fn test_items_scenario() {
    let router = items_router();

    let res = router.dispatch(&request(Method::GET, "/items/42"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body, b"item:42");

    let res = router.dispatch(&request(Method::GET, "/items/abc"));
    assert_eq!(res.status, 404);

    // POST is known to the router, so an unmatched path is 404 rather than 400.
    let res = router.dispatch(&request(Method::POST, "/items/42"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_unknown_method_is_400() {
    let router = items_router();
    let res = router.dispatch(&request(Method::PATCH, "/items/42"));
    assert_eq!(res.status, 400);
    assert_eq!(res.status_message, "Bad Request");

    let res = router.dispatch(&request(Method::from_bytes(b"BREW").unwrap(), "/items/42"));
    assert_eq!(res.status, 400);
}

#[test]
fn test_not_found_has_a_body() {
    let router = items_router();
    let res = router.dispatch(&request(Method::GET, "/nowhere"));
    assert_eq!(res.status, 404);
    assert_eq!(res.status_message, "Not Found");
    assert!(!res.body.is_empty());
    assert_eq!(res, not_found());
}

#[test]
fn test_first_registered_match_wins() {
    let mut router = Router::new();
    router
        .register("GET", "/things/(?P<name>.+)", |_: &Request, _: &PathParams| "general")
        .unwrap()
        .register("GET", "/things/special", |_: &Request, _: &PathParams| "special")
        .unwrap();

    let res = router.dispatch(&request(Method::GET, "/things/special"));
    assert_eq!(res.body, b"general");

    let matched = router.route(&Method::GET, "/things/special").unwrap();
    assert_eq!(matched.entry.pattern, "/things/(?P<name>.+)");
    assert_eq!(matched.path_params["name"], "special");
}

#[test]
fn test_coercion_law() {
    let mut router = Router::new();
    router
        .register("GET", "/text", |_: &Request, _: &PathParams| "some text")
        .unwrap()
        .register("GET", "/unit", |_: &Request, _: &PathParams| ())
        .unwrap()
        .register("GET", "/custom", |_: &Request, _: &PathParams| {
            Response::new()
                .status(202, "Accepted")
                .header("Content-Type", "application/json")
                .body("{}")
        })
        .unwrap()
        .register("GET", "/maybe", |_: &Request, _: &PathParams| -> Option<String> { None })
        .unwrap();

    let text = router.dispatch(&request(Method::GET, "/text"));
    assert_eq!(text.status, 200);
    assert_eq!(text.get_header("Content-Type"), Some("text/html"));
    assert_eq!(text.body, b"some text");

    let unit = router.dispatch(&request(Method::GET, "/unit"));
    assert_eq!(unit.status, 204);
    assert_eq!(unit.status_message, "No Content");
    assert!(unit.body.is_empty());

    let custom = router.dispatch(&request(Method::GET, "/custom"));
    assert_eq!(custom.status, 202);
    assert_eq!(custom.get_header("content-type"), Some("application/json"));

    let maybe = router.dispatch(&request(Method::GET, "/maybe"));
    assert_eq!(maybe.status, 204);
}

#[test]
fn test_reply_from_response_is_unchanged() {
    let response = Response::with_status(204);
    assert_eq!(Reply::from(response.clone()).into_response(), response);
}

#[test]
fn test_route_listing_keeps_registration_order() {
    let mut router = Router::with_builtins().unwrap();
    router.register("GET", "/items/(?P<id>[0-9]+)", item).unwrap();

    let routes = router.routes();
    let last = routes.last().unwrap();
    assert_eq!(last.method, Method::GET);
    assert_eq!(last.pattern, "/items/(?P<id>[0-9]+)");
    assert!(last.handler_name.ends_with("item"));
    assert!(routes.iter().any(|r| r.method == Method::OPTIONS));
}

//! # Router Module
//!
//! Ordered, regex-based request routing.
//!
//! ## Overview
//!
//! The router keeps one list of `(pattern, handler)` entries per HTTP method.
//! For every request it:
//!
//! 1. answers `400 Bad Request` when nothing is registered for the method;
//! 2. otherwise tries that method's patterns **in registration order**, each
//!    anchored at both ends, and calls the first handler that matches with the
//!    request and the pattern's named captures;
//! 3. answers `404 Not Found` when no pattern matches.
//!
//! Ordering is the only disambiguation: if `/items/(?P<id>.+)` is registered
//! before `/items/new`, the first one always wins for `/items/new`.
//!
//! ## Handler results
//!
//! Handlers return anything that converts into a [`Reply`]:
//!
//! | returned value | response |
//! |---|---|
//! | `String` / `&str` | `200 OK`, body is the text |
//! | `()` or `None` | `204 No Content`, empty body |
//! | [`crate::server::Response`] | sent unchanged (Content-Length recomputed) |
//!
//! ## Example
//!
//! ```rust
//! use yahs::router::{PathParams, Router};
//! use yahs::server::{Request, Response};
//!
//! # fn main() -> Result<(), yahs::RouterError> {
//! let mut router = Router::new();
//! router
//!     .register("GET", "/food", |_req: &Request, _p: &PathParams| "Tasty food")?
//!     .register("GET", "/derp", |_req: &Request, _p: &PathParams| ())?
//!     .register("POST", r"/events/(?P<id>[a-z]+)/media/?", |_req: &Request, _p: &PathParams| {
//!         Response::with_status(201)
//!     })?;
//! # Ok(())
//! # }
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use self::core::{
    Handler, PathParams, Reply, RouteCatalog, RouteEntry, RouteMatch, RouteSummary, Router,
};

use crate::error::RouterError;
use crate::server::{bad_request, not_found, Request, Response};
use http::Method;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Named captures of the matched pattern, by group name.
pub type PathParams = HashMap<String, String>;

/// Type-erased request handler as stored in the route table.
pub type Handler = Arc<dyn Fn(&Request, &PathParams) -> Reply + Send + Sync>;

/// What a handler hands back to the router.
///
/// Handlers may return anything convertible into a `Reply`:
/// text becomes `200 OK` with that body, `()` becomes `204 No Content`, and a
/// [`Response`] is sent as built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `200 OK` with this body
    Text(String),
    /// `204 No Content`
    Empty,
    /// A fully formed response, passed through unchanged
    Full(Response),
}

impl Reply {
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Reply::Text(body) => Response::text(body),
            Reply::Empty => Response::no_content(),
            Reply::Full(response) => response,
        }
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Reply::Text(body)
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Reply::Text(body.to_string())
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::Empty
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Full(response)
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Reply::Empty, Into::into)
    }
}

/// One registered (pattern, handler) pair.
#[derive(Clone)]
pub struct RouteEntry {
    /// Pattern as registered
    pub pattern: String,
    /// Pattern compiled with both ends anchored
    regex: Regex,
    /// Rust path of the handler type
    pub handler_name: &'static str,
    handler: Handler,
}

impl RouteEntry {
    /// Full-match `path`, returning the named captures.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;
        let params = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Some(params)
    }

    /// Invoke the handler and coerce its result.
    #[must_use]
    pub fn call(&self, request: &Request, params: &PathParams) -> Response {
        (self.handler)(request, params).into_response()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("handler_name", &self.handler_name)
            .finish_non_exhaustive()
    }
}

/// Route table entry as seen by introspection (index page, `routes` command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummary {
    pub method: Method,
    pub pattern: String,
    pub handler_name: &'static str,
    /// Optional description attached with [`Router::describe`]
    pub doc: Option<String>,
}

/// Shared, registration-ordered view of every route.
pub type RouteCatalog = Arc<RwLock<Vec<RouteSummary>>>;

/// Result of matching a request path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub path_params: PathParams,
}

/// Ordered, per-method route table.
///
/// Entries for a method are tried in registration order and the first full
/// match wins, regardless of how specific later patterns are. The table is
/// only mutable through `&mut self`, so once it is shared behind an `Arc` with
/// the listener it can no longer change.
#[derive(Default, Debug)]
pub struct Router {
    /// Methods in order of first registration, each with its entries
    table: Vec<(Method, Vec<RouteEntry>)>,
    catalog: RouteCatalog,
}

impl Router {
    /// An empty router. Use [`Router::with_builtins`] for the diagnostic routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` requests whose path fully matches `pattern`.
    ///
    /// `pattern` is a regular expression; named groups such as `(?P<id>[0-9]+)`
    /// are handed to the handler. Returns `self` so registrations chain:
    ///
    /// ```rust
    /// use yahs::router::{PathParams, Router};
    /// use yahs::server::Request;
    ///
    /// fn item(_req: &Request, params: &PathParams) -> String {
    ///     format!("item:{}", params["id"])
    /// }
    ///
    /// # fn main() -> Result<(), yahs::RouterError> {
    /// let mut router = Router::new();
    /// router
    ///     .register("GET", r"/items/(?P<id>[0-9]+)", item)?
    ///     .register("GET", r"/things/(?P<id>[0-9]+)", item)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// [`RouterError::InvalidMethod`] when `method` is not an HTTP token and
    /// [`RouterError::InvalidPattern`] when `pattern` does not compile.
    pub fn register<F, R>(
        &mut self,
        method: &str,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, RouterError>
    where
        F: Fn(&Request, &PathParams) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        let handler_name = std::any::type_name::<F>();
        let handler: Handler =
            Arc::new(move |req: &Request, params: &PathParams| -> Reply { handler(req, params).into() });
        self.register_handler(method, pattern, handler_name, handler)
    }

    /// Register an already type-erased handler under an explicit name.
    ///
    /// # Errors
    ///
    /// Same as [`Router::register`].
    pub fn register_handler(
        &mut self,
        method: &str,
        pattern: &str,
        handler_name: &'static str,
        handler: Handler,
    ) -> Result<&mut Self, RouterError> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| {
            RouterError::InvalidMethod {
                method: method.to_string(),
            }
        })?;
        let regex = compile_pattern(pattern)?;

        let entry = RouteEntry {
            pattern: pattern.to_string(),
            regex,
            handler_name,
            handler,
        };

        match self.table.iter_mut().find(|(m, _)| *m == method) {
            Some((_, entries)) => entries.push(entry),
            None => {
                debug!(method = %method, "Creating route list for method");
                self.table.push((method.clone(), vec![entry]));
            }
        }

        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RouteSummary {
                method: method.clone(),
                pattern: pattern.to_string(),
                handler_name,
                doc: None,
            });

        info!(
            method = %method,
            pattern = %pattern,
            handler_name = %handler_name,
            "Route registered"
        );
        Ok(self)
    }

    /// Attach a description to the most recently registered route.
    pub fn describe(&mut self, doc: &str) -> &mut Self {
        if let Some(last) = self
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .last_mut()
        {
            last.doc = Some(doc.to_string());
        }
        self
    }

    /// Whether any route is registered for `method`.
    #[must_use]
    pub fn has_method(&self, method: &Method) -> bool {
        self.entries(method).is_some()
    }

    /// Entries registered for `method`, in registration order.
    #[must_use]
    pub fn entries(&self, method: &Method) -> Option<&[RouteEntry]> {
        self.table
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Find the first entry for `method` whose pattern fully matches `path`.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.entries(method)?.iter().find_map(|entry| {
            entry.matches(path).map(|path_params| RouteMatch {
                entry,
                path_params,
            })
        })
    }

    /// Select a handler for `request`, run it and coerce its result.
    ///
    /// * no route for the method: `400 Bad Request`
    /// * no matching pattern: `404 Not Found`
    ///
    /// Handler panics are not caught here.
    #[must_use]
    pub fn dispatch(&self, request: &Request) -> Response {
        if !self.has_method(&request.method) {
            warn!(
                method = %request.method,
                path = %request.path,
                "No handlers registered for method"
            );
            return bad_request();
        }

        match self.route(&request.method, &request.path) {
            Some(RouteMatch { entry, path_params }) => {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    pattern = %entry.pattern,
                    handler_name = %entry.handler_name,
                    path_params = ?path_params,
                    "Route matched"
                );
                entry.call(request, &path_params)
            }
            None => {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    "No route matched"
                );
                not_found()
            }
        }
    }

    /// Snapshot of every registered route in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteSummary> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Live view of the route list, for handlers that describe the router.
    #[must_use]
    pub fn catalog(&self) -> RouteCatalog {
        Arc::clone(&self.catalog)
    }

    /// Print all registered routes to stdout.
    pub fn dump_routes(&self) {
        let routes = self.routes();
        println!("[routes] count={}", routes.len());
        for route in routes {
            println!(
                "[route] {} {} -> {}",
                route.method, route.pattern, route.handler_name
            );
        }
    }
}

/// Anchor `pattern` at both ends so it must match the whole path.
fn compile_pattern(pattern: &str) -> Result<Regex, RouterError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| RouterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

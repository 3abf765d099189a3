//! Diagnostic routes every server gets from [`Router::with_builtins`].
//!
//! | method | pattern | purpose |
//! |---|---|---|
//! | `GET` | `/` and `/yahs/api/?` | HTML index of the route table |
//! | `GET` | `/yahs/reload/?` | runs the application's reload hook |
//! | `OPTIONS` | `.*` | permissive CORS preflight responder |
//!
//! They are registered before any application route and therefore win over
//! application patterns that match the same paths.

use crate::error::RouterError;
use crate::router::{PathParams, RouteCatalog, RouteSummary, Router};
use crate::server::{Request, Response};
use std::sync::{Arc, PoisonError};
use tracing::{info, warn};

/// Callback run by `GET /yahs/reload`.
pub type ReloadHook = Arc<dyn Fn() + Send + Sync>;

impl Router {
    /// A router pre-populated with the diagnostic routes and no reload hook.
    ///
    /// # Errors
    ///
    /// Only if a built-in pattern fails to compile.
    pub fn with_builtins() -> Result<Self, RouterError> {
        let mut router = Router::new();
        install(&mut router, None)?;
        Ok(router)
    }
}

/// Register the diagnostic routes on `router`.
///
/// # Errors
///
/// Only if a built-in pattern fails to compile.
pub fn install(router: &mut Router, reload: Option<ReloadHook>) -> Result<(), RouterError> {
    let catalog = router.catalog();
    let index = move |_req: &Request, _params: &PathParams| api_index(&catalog);

    router
        .register("GET", "/", index.clone())?
        .describe("Display the API index page for browsing registered handlers.")
        .register("GET", "/yahs/api/?", index)?
        .describe("Display the API index page for browsing registered handlers.")
        .register("GET", "/yahs/reload/?", move |_req: &Request, _params: &PathParams| {
            reload_server(reload.as_ref())
        })?
        .describe("Run the application reload hook.")
        .register("OPTIONS", ".*", handle_cors)?
        .describe("Grant whatever a cross-origin preflight asks for.");
    Ok(())
}

/// Render the route table as HTML, grouped by method in order of first use.
fn api_index(catalog: &RouteCatalog) -> Response {
    let routes = catalog.read().unwrap_or_else(PoisonError::into_inner).clone();

    let mut methods: Vec<&http::Method> = Vec::new();
    for route in &routes {
        if !methods.contains(&&route.method) {
            methods.push(&route.method);
        }
    }

    let mut body = String::from("<h1>Welcome to YaHS! API Index</h1>");
    for method in methods {
        body.push_str(&format!("<h2 style='color: #555;'>{method}</h2><ul>"));
        for route in routes.iter().filter(|r| &r.method == method) {
            render_route(&mut body, route);
        }
        body.push_str("</ul>");
    }

    Response::new().body(body)
}

fn render_route(body: &mut String, route: &RouteSummary) {
    body.push_str(&format!(
        "<li><strong>{}</strong> <pre>{}</pre><em>{}</em></li>",
        escape_html(&route.pattern),
        escape_html(route.handler_name),
        escape_html(route.doc.as_deref().unwrap_or_default()),
    ));
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn reload_server(hook: Option<&ReloadHook>) -> &'static str {
    warn!("Reloading request handlers");
    match hook {
        Some(hook) => hook(),
        None => info!("No reload hook installed"),
    }
    "Server reloaded"
}

/// Echo the preflight's origin, method and headers back as allowed.
fn handle_cors(req: &Request, _params: &PathParams) -> Response {
    let mut response = Response::new();
    let echoes = [
        ("Origin", "Access-Control-Allow-Origin"),
        ("Access-Control-Request-Method", "Access-Control-Allow-Methods"),
        ("Access-Control-Request-Headers", "Access-Control-Allow-Headers"),
    ];
    for (requested, allowed) in echoes {
        if let Some(value) = req.header_ignore_case(requested) {
            response.set_header(allowed, value);
        }
    }
    response
}

//! `yahs` demo server.
//!
//! Serves the built-in diagnostic routes plus a handful of sample handlers:
//!
//! ```bash
//! yahs serve --port 4321
//! curl localhost:4321/food
//! curl -X POST --data-binary @photo.jpg localhost:4321/events/party/media
//! curl localhost:4321/events/party/media > photo.jpg
//! ```

use clap::Parser;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use yahs::builtins;
use yahs::cli::{run_cli, Cli};
use yahs::logging::{init_logging, LogConfig};
use yahs::server::not_found;
use yahs::{PathParams, Request, Response, Router, RouterError};

/// Uploaded media keyed by event id.
type MediaStore = Arc<DashMap<String, Vec<u8>>>;

fn get_food(_req: &Request, _params: &PathParams) -> &'static str {
    "Hello there, here's some food!"
}

fn get_cake(_req: &Request, _params: &PathParams) -> &'static str {
    "lies!"
}

fn get_derp(_req: &Request, _params: &PathParams) {}

fn get_event(_req: &Request, params: &PathParams) -> Response {
    let id = params.get("id").map_or("", String::as_str);
    Response::new().body(format!("hello id: {id}"))
}

fn demo_router(media: &MediaStore) -> Result<Router, RouterError> {
    let mut router = Router::new();
    builtins::install(
        &mut router,
        Some(Arc::new(|| info!("Nothing to reload in the demo server"))),
    )?;

    let store = Arc::clone(media);
    let add_media = move |req: &Request, params: &PathParams| -> Response {
        let id = params.get("id").cloned().unwrap_or_default();
        let body = req.body.clone().unwrap_or_default();
        info!(event = %id, bytes = body.len(), "Got media file");
        store.insert(id, body);
        Response::with_status(201)
    };

    let store = Arc::clone(media);
    let get_media = move |_req: &Request, params: &PathParams| -> Response {
        params
            .get("id")
            .and_then(|id| store.get(id))
            .map_or_else(not_found, |media| {
                Response::new()
                    .header("Content-Type", "application/octet-stream")
                    .body(media.value().clone())
            })
    };

    router
        .register("GET", "^/food$", get_food)?
        .describe("Simple get food request")
        .register("GET", "^/cake$", get_cake)?
        .register("GET", "^/derp$", get_derp)?
        .register("GET", "/events/(?P<id>[0-9]+)", get_event)?
        .describe("Get event by ID")
        .register("POST", "/events/(?P<id>[a-z]+)/media/?", add_media)?
        .describe("Add a file to an event")
        .register("GET", "/events/(?P<id>[a-z]+)/media/?", get_media)?
        .describe("Fetch the file stored for an event");
    Ok(router)
}

/// SIGINT and SIGTERM end the process at once. In-flight connections are
/// dropped.
#[cfg(unix)]
fn exit_on_signals() -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "Received signal, exiting");
                std::process::exit(0);
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
fn exit_on_signals() -> anyhow::Result<()> {
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env())?;
    exit_on_signals()?;

    let media = MediaStore::default();
    let router = demo_router(&media)?;
    run_cli(cli, router)
}

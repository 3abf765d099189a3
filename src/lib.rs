//! # YaHS
//!
//! **YaHS** (yet another HTTP server) is a small HTTP/1.1 server library built on
//! the `may` coroutine runtime. Applications register handlers against an HTTP
//! method and a regular expression over the request path; the server accepts
//! connections, parses one request per connection, dispatches it and writes the
//! response.
//!
//! ## Architecture
//!
//! - **[`server`]** - request parser, response type, connection worker and listeners
//! - **[`router`]** - per-method ordered route tables with regex matching
//! - **[`builtins`]** - API index, reload hook and CORS preflight routes
//! - **[`config`]** - listener configuration (YAML file, environment)
//! - **[`runtime_config`]** - coroutine runtime settings
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - `serve` / `routes` command line for binaries
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Listener as Listener<br/>(accept loop)
//!     participant Worker as Worker<br/>(coroutine)
//!     participant Parser as RequestReader
//!     participant Router
//!     participant Handler
//!
//!     Client->>Listener: TCP connect
//!     Listener->>Worker: spawn with stack_size
//!     Worker->>Parser: read(stream)
//!     Parser-->>Worker: Request
//!     Worker->>Router: dispatch(&Request)
//!     Router->>Handler: call(&Request, &PathParams)
//!     Handler-->>Router: Reply
//!     Router-->>Worker: Response
//!     Worker->>Client: HTTP/1.1 response, then close
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yahs::{PathParams, Request, Router, Server, ServerConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut router = Router::with_builtins()?;
//!     router.register("GET", "/hello/(?P<name>[a-z]+)", |_req: &Request, params: &PathParams| {
//!         format!("hello {}", params["name"])
//!     })?;
//!
//!     let config = ServerConfig {
//!         port: 8080,
//!         ..ServerConfig::default()
//!     };
//!     let handle = Server::new(config, router).start()?;
//!     handle.wait_ready()?;
//!     handle.join().map_err(|_| anyhow::anyhow!("listener panicked"))
//! }
//! ```
//!
//! ## Handlers
//!
//! A handler is any `Fn(&Request, &PathParams) -> R` where `R: Into<Reply>`:
//!
//! | Handler returns | Response |
//! |---|---|
//! | `String` / `&str` | `200 OK`, `text/html`, the text as body |
//! | `()` | `204 No Content`, empty body |
//! | [`Response`] | sent as built |
//! | `Option<T>` | `Some` as above, `None` like `()` |
//!
//! Patterns must match the whole path. Named groups (`(?P<id>...)`) become path
//! parameters. Routes are tried in registration order and the first match wins.
//!
//! ## Configuration
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `YAHS_HOST` | bind hostname | `localhost` |
//! | `YAHS_PORT` | plain HTTP port | `4321` |
//! | `YAHS_SECURE` | also serve HTTPS | `false` |
//! | `YAHS_CERT_FILE` / `YAHS_KEY_FILE` | PEM files | `certificate-chain.crt` / `server.key` |
//! | `YAHS_STACK_SIZE` | worker coroutine stack | `0x10000` |
//! | `YAHS_LOG_LEVEL` / `YAHS_LOG_FORMAT` | logging | `info` / `json` |

pub mod builtins;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use config::{BodyOverflowPolicy, ServerConfig};
pub use error::{ParseError, RouterError};
pub use router::{Handler, PathParams, Reply, Router};
pub use server::{Request, Response, Server, ServerHandle};

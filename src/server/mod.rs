//! # Server Module
//!
//! Socket-facing half of the library: request parsing, response serialization,
//! the per-connection worker and the listeners that feed it.
//!
//! ## Request Lifecycle
//!
//! 1. A listener coroutine accepts a TCP connection (plain or TLS)
//! 2. A worker coroutine is spawned for it with the configured stack size
//! 3. [`RequestReader`] reads exactly one request off the socket
//! 4. The frozen [`crate::router::Router`] picks a handler and builds a [`Response`]
//! 5. The response is written, an audit line is logged and the socket is closed
//!
//! There is no keep-alive: one connection, one request.

mod http_server;
mod request;
mod response;
mod tls;
mod worker;

pub use http_server::{Server, ServerHandle};
pub use request::{parse_query, split_target, QueryParams, Request, RequestReader, READ_CHUNK_SIZE};
pub use response::{
    bad_request, internal_error, not_found, status_reason, HeaderVec, Response, SERVER_ID,
};
pub use tls::{load_tls_config, DEFAULT_CERT_FILE, DEFAULT_KEY_FILE};
pub use worker::{Connection, Worker};

//! Per-connection lifecycle.
//!
//! ```text
//! Parsing ──► Routing ──► Sending ──► Closed
//!    │           │           │
//!    └───────────┴───────────┴──► Error (logged; 400/500 sent when possible)
//! ```
//!
//! Every connection carries exactly one request. After the response is written
//! both directions of the socket are shut down.

use super::request::RequestReader;
use super::response::{bad_request, internal_error, Response};
use crate::router::Router;
use may::net::TcpStream;
use rustls::{ServerConnection, StreamOwned};
use std::any::Any;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// An accepted socket, plain or TLS-wrapped.
pub enum Connection {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl Connection {
    /// Drive the TLS handshake to completion. No-op for plain sockets.
    ///
    /// # Errors
    ///
    /// Handshake failures, including the peer hanging up mid-handshake.
    pub fn handshake(&mut self) -> io::Result<()> {
        if let Connection::Tls(tls) = self {
            while tls.conn.is_handshaking() {
                tls.conn.complete_io(&mut tls.sock)?;
            }
        }
        Ok(())
    }

    /// Orderly close: TLS close_notify when applicable, then shut down both
    /// directions of the socket.
    pub fn close(self) {
        let sock = match self {
            Connection::Plain(sock) => sock,
            Connection::Tls(tls) => {
                let mut tls = *tls;
                tls.conn.send_close_notify();
                if let Err(e) = tls.conn.complete_io(&mut tls.sock) {
                    debug!(error = %e, "TLS close_notify not delivered");
                }
                tls.sock
            }
        };
        if let Err(e) = sock.shutdown(Shutdown::Both) {
            debug!(error = %e, "Socket shutdown failed");
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.read(buf),
            Connection::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.write(buf),
            Connection::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Plain(s) => s.flush(),
            Connection::Tls(s) => s.flush(),
        }
    }
}

/// Everything a connection worker needs; shared read-only by all workers.
pub struct Worker {
    router: Arc<Router>,
    reader: RequestReader,
}

impl Worker {
    #[must_use]
    pub fn new(router: Arc<Router>, reader: RequestReader) -> Self {
        Self { router, reader }
    }

    /// Read one request from `conn`, route it and write the response.
    pub fn serve<S: Read + Write>(&self, conn: &mut S, remote_addr: &str) {
        let start = Instant::now();

        let (method, path, response) = match self.reader.read(conn, remote_addr) {
            Ok(None) => {
                debug!(remote_addr = %remote_addr, "Connection closed before a request arrived");
                return;
            }
            Ok(Some(request)) => {
                let response = self.route_guarded(&request.method, &request.path, || {
                    self.router.dispatch(&request)
                });
                (request.method.to_string(), request.path, response)
            }
            Err(err) if err.is_client_error() => {
                warn!(remote_addr = %remote_addr, error = %err, "Rejecting malformed request");
                ("-".to_string(), "-".to_string(), bad_request())
            }
            Err(err) => {
                warn!(remote_addr = %remote_addr, error = %err, "Abandoning connection");
                return;
            }
        };

        info!(
            method = %method,
            path = %path,
            status = response.status,
            remote_addr = %remote_addr,
            duration_us = start.elapsed().as_micros() as u64,
            "{} {} Response: {}",
            method,
            path,
            response.status
        );

        if let Err(e) = response.write_to(conn) {
            warn!(remote_addr = %remote_addr, error = %e, "Failed to send response");
        }
    }

    /// Run the router, turning a handler panic into `500 Internal Server Error`.
    fn route_guarded(
        &self,
        method: &http::Method,
        path: &str,
        dispatch: impl FnOnce() -> Response,
    ) -> Response {
        match catch_unwind(AssertUnwindSafe(dispatch)) {
            Ok(response) => response,
            Err(panic) => {
                error!(
                    method = %method,
                    path = %path,
                    panic_message = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                internal_error()
            }
        }
    }

    /// Complete the TLS handshake if needed, serve, then close the connection.
    pub fn run(&self, mut conn: Connection, remote_addr: &str) {
        if let Err(e) = conn.handshake() {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                debug!(remote_addr = %remote_addr, "Peer closed connection during TLS handshake");
            } else {
                warn!(remote_addr = %remote_addr, error = %e, "TLS handshake failed");
            }
            return;
        }
        self.serve(&mut conn, remote_addr);
        conn.close();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

use super::request::RequestReader;
use super::tls::{load_tls_config, DEFAULT_CERT_FILE, DEFAULT_KEY_FILE};
use super::worker::{Connection, Worker};
use crate::config::ServerConfig;
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use anyhow::{Context, Result};
use may::coroutine::{self, JoinHandle};
use may::net::TcpListener;
use rustls::{ServerConnection, StreamOwned};
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// HTTP/1.1 server: one accept loop per scheme, one coroutine per connection.
///
/// The router is frozen once it is handed to the server; every worker reads it
/// through a shared `Arc`.
pub struct Server {
    config: ServerConfig,
    runtime: RuntimeConfig,
    router: Arc<Router>,
}

/// Handle to a running server.
///
/// Provides methods for waiting until the server is ready, stopping it, or
/// joining the listener coroutines.
pub struct ServerHandle {
    http_addr: SocketAddr,
    https_addr: Option<SocketAddr>,
    listeners: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address of the plain HTTP listener.
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Address of the HTTPS listener, if it started.
    #[must_use]
    pub fn https_addr(&self) -> Option<SocketAddr> {
        self.https_addr
    }

    /// Wait for the plain listener to accept connections.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server doesn't become ready within ~250ms
    /// (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.http_addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the listener coroutines and wait for them to finish.
    ///
    /// Workers already serving a connection run to completion.
    pub fn stop(self) {
        for handle in self.listeners {
            // SAFETY: `cancel` is unsafe in may because it unwinds the target
            // coroutine at its next yield point. The accept loop holds no locks
            // and owns only its listening socket, which is dropped on unwind.
            unsafe {
                handle.coroutine().cancel();
            }
            if handle.join().is_err() {
                debug!("Listener coroutine ended by cancellation");
            }
        }
    }

    /// Block until every listener coroutine finishes. Listeners run until the
    /// process exits, so in practice this blocks forever.
    ///
    /// # Errors
    ///
    /// Returns the panic payload of a listener that panicked.
    pub fn join(self) -> std::thread::Result<()> {
        for handle in self.listeners {
            handle.join()?;
        }
        Ok(())
    }
}

impl Server {
    /// Freeze `router` and prepare to listen according to `config`.
    #[must_use]
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            runtime: RuntimeConfig::default(),
            router: Arc::new(router),
        }
    }

    /// Override the coroutine runtime settings.
    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Bind the listeners and start accepting.
    ///
    /// The plain listener always starts. The HTTPS listener starts only when
    /// `secure` is set and the certificate and key load; a load failure is
    /// logged and the server carries on without HTTPS.
    ///
    /// # Errors
    ///
    /// Fails when a socket cannot be bound or a listener coroutine cannot be
    /// spawned.
    pub fn start(self) -> Result<ServerHandle> {
        let reader = RequestReader::new(self.config.body_overflow);
        let worker = Arc::new(Worker::new(Arc::clone(&self.router), reader));
        let accept = AcceptConfig {
            stack_size: self.runtime.stack_size,
            read_timeout: self.config.read_timeout(),
        };

        let listener = bind(&self.config.http_addr())?;
        let http_addr = listener.local_addr()?;
        info!(addr = %http_addr, scheme = "http", "Starting listener");
        let mut listeners = vec![spawn_listener(
            "http-listener",
            listener,
            None,
            Arc::clone(&worker),
            accept,
        )?];

        let mut https_addr = None;
        if self.config.secure {
            let cert = self
                .config
                .certificate_file
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_CERT_FILE));
            let key = self
                .config
                .key_file
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_KEY_FILE));

            match load_tls_config(cert, key) {
                Ok(tls) => {
                    let listener = bind(&self.config.https_addr())?;
                    let addr = listener.local_addr()?;
                    info!(addr = %addr, scheme = "https", "Starting listener");
                    listeners.push(spawn_listener(
                        "https-listener",
                        listener,
                        Some(tls),
                        worker,
                        accept,
                    )?);
                    https_addr = Some(addr);
                }
                Err(e) => {
                    warn!(
                        error = %format!("{e:#}"),
                        "Could not load TLS certificate or private key, not starting HTTPS"
                    );
                }
            }
        }

        Ok(ServerHandle {
            http_addr,
            https_addr,
            listeners,
        })
    }
}

/// Pause after a failed `accept` so persistent errors (fd exhaustion) do not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Per-connection socket settings applied by the accept loop.
#[derive(Debug, Clone, Copy)]
struct AcceptConfig {
    stack_size: usize,
    read_timeout: Option<Duration>,
}

/// Bind with address reuse and a bounded backlog (both set by may's `bind`).
fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).with_context(|| format!("binding {addr}"))
}

fn spawn_listener(
    name: &str,
    listener: TcpListener,
    tls: Option<Arc<rustls::ServerConfig>>,
    worker: Arc<Worker>,
    accept: AcceptConfig,
) -> Result<JoinHandle<()>> {
    // SAFETY: may's `Builder::spawn` is unsafe because the coroutine must not
    // hold thread-local state across yields. The accept loop only owns the
    // listener, the shared worker and the TLS config.
    let handle = unsafe {
        coroutine::Builder::new()
            .name(name.to_string())
            .spawn(move || accept_loop(&listener, tls.as_ref(), &worker, accept))
    }
    .with_context(|| format!("spawning {name} coroutine"))?;
    Ok(handle)
}

/// Call `accept` until it succeeds, pausing `backoff` after each failure.
fn accept_retrying<T>(mut accept: impl FnMut() -> io::Result<T>, backoff: Duration) -> T {
    loop {
        match accept() {
            Ok(accepted) => return accepted,
            Err(e) => {
                warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "Accept failed");
                coroutine::sleep(backoff);
            }
        }
    }
}

/// Accept forever, handing each connection to its own worker coroutine.
fn accept_loop(
    listener: &TcpListener,
    tls: Option<&Arc<rustls::ServerConfig>>,
    worker: &Arc<Worker>,
    accept: AcceptConfig,
) {
    debug!("Entering accept loop");
    loop {
        let (stream, peer) = accept_retrying(|| listener.accept(), ACCEPT_BACKOFF);
        debug!(remote_addr = %peer, "Accepted connection");

        if let Some(timeout) = accept.read_timeout {
            if let Err(e) = stream.set_read_timeout(Some(timeout)) {
                warn!(remote_addr = %peer, error = %e, "Could not set read timeout");
            }
        }

        let conn = match tls {
            None => Connection::Plain(stream),
            Some(config) => match ServerConnection::new(Arc::clone(config)) {
                Ok(session) => Connection::Tls(Box::new(StreamOwned::new(session, stream))),
                Err(e) => {
                    warn!(remote_addr = %peer, error = %e, "TLS session setup failed");
                    continue;
                }
            },
        };

        let worker = Arc::clone(worker);
        let remote_addr = peer.to_string();
        // SAFETY: see `spawn_listener`; the worker owns its connection outright.
        let spawned = unsafe {
            coroutine::Builder::new()
                .stack_size(accept.stack_size)
                .spawn(move || worker.run(conn, &remote_addr))
        };
        if let Err(e) = spawned {
            error!(
                remote_addr = %peer,
                error = %e,
                stack_size = accept.stack_size,
                "Failed to spawn connection worker"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn accept_failures_back_off_before_retrying() {
        let mut failures = 3;
        let start = Instant::now();
        let accepted = accept_retrying(
            || {
                if failures > 0 {
                    failures -= 1;
                    Err(io::Error::other("too many open files"))
                } else {
                    Ok(7)
                }
            },
            Duration::from_millis(20),
        );
        assert_eq!(accepted, 7);
        assert_eq!(failures, 0);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}

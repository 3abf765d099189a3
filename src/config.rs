//! # Server Configuration
//!
//! Listening configuration for [`crate::server::Server`]. Values come from, in
//! increasing precedence:
//!
//! 1. built-in defaults (`localhost:4321`, HTTPS disabled)
//! 2. a YAML file loaded with [`ServerConfig::from_file`]
//! 3. `YAHS_*` environment variables applied by [`ServerConfig::apply_env`]
//! 4. command-line flags (see [`crate::cli`])
//!
//! ```yaml
//! hostname: 0.0.0.0
//! port: 8080
//! secure: true
//! tls_port: 8443
//! certificate_file: certs/certificate-chain.crt
//! key_file: certs/server.key
//! body_overflow: reject
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when a client sends more body bytes than its Content-Length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyOverflowPolicy {
    /// Keep the declared number of bytes and drop the rest
    #[default]
    Truncate,
    /// Answer `400 Bad Request`
    Reject,
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub hostname: String,
    /// Plain HTTP port
    pub port: u16,
    /// Start the HTTPS listener as well
    pub secure: bool,
    /// HTTPS port, `port + 1` when unset
    pub tls_port: Option<u16>,
    /// PEM certificate chain
    pub certificate_file: Option<PathBuf>,
    /// PEM private key
    pub key_file: Option<PathBuf>,
    /// Per-read timeout on accepted sockets. Unset means a stalled client holds
    /// its worker indefinitely.
    pub read_timeout_secs: Option<u64>,
    /// Handling of bodies longer than their Content-Length
    pub body_overflow: BodyOverflowPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 4321,
            secure: false,
            tls_port: None,
            certificate_file: None,
            key_file: None,
            read_timeout_secs: None,
            body_overflow: BodyOverflowPolicy::Truncate,
        }
    }
}

impl ServerConfig {
    /// Load a YAML configuration file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid YAML for this type.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Overlay `YAHS_HOST`, `YAHS_PORT`, `YAHS_SECURE`, `YAHS_CERT_FILE` and
    /// `YAHS_KEY_FILE` when set.
    ///
    /// # Errors
    ///
    /// Fails when `YAHS_PORT` or `YAHS_SECURE` cannot be parsed.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(host) = env::var("YAHS_HOST") {
            self.hostname = host;
        }
        if let Ok(port) = env::var("YAHS_PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("YAHS_PORT '{port}' is not a port number"))?;
        }
        if let Ok(secure) = env::var("YAHS_SECURE") {
            self.secure = secure
                .trim()
                .parse()
                .with_context(|| format!("YAHS_SECURE '{secure}' is not true/false"))?;
        }
        if let Ok(cert) = env::var("YAHS_CERT_FILE") {
            self.certificate_file = Some(PathBuf::from(cert));
        }
        if let Ok(key) = env::var("YAHS_KEY_FILE") {
            self.key_file = Some(PathBuf::from(key));
        }
        Ok(self)
    }

    /// `hostname:port` of the plain listener.
    #[must_use]
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// `hostname:tls_port` of the secure listener. Without an explicit
    /// `tls_port` this is the next port up, or ephemeral when `port` is 0.
    #[must_use]
    pub fn https_addr(&self) -> String {
        let port = self.tls_port.unwrap_or(match self.port {
            0 => 0,
            port => port.wrapping_add(1),
        });
        format!("{}:{}", self.hostname, port)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

use crate::config::ServerConfig;
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::server::Server;
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Command-line interface for a YaHS application
#[derive(Parser, Debug)]
#[command(name = "yahs", version)]
#[command(about = "Yet another HTTP server", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve HTTP (and optionally HTTPS) until interrupted
    Serve(ServeArgs),
    /// Print the registered routes and exit
    Routes,
}

/// Flags for `serve`. Anything left unset falls through to the config file,
/// then the environment, then the defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hostname or address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port for plain HTTP
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Also serve HTTPS
    #[arg(long, default_value_t = false)]
    pub secure: bool,

    /// Port for HTTPS (default: port + 1)
    #[arg(long)]
    pub tls_port: Option<u16>,

    /// PEM certificate chain
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long)]
    pub key: Option<PathBuf>,
}

impl ServeArgs {
    /// Resolve the effective server configuration.
    ///
    /// # Errors
    ///
    /// Fails when the config file is unreadable or an environment override is
    /// malformed.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let base = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        let mut config = base.apply_env()?;

        if let Some(host) = &self.host {
            config.hostname.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.secure {
            config.secure = true;
        }
        if self.tls_port.is_some() {
            config.tls_port = self.tls_port;
        }
        if self.cert.is_some() {
            config.certificate_file.clone_from(&self.cert);
        }
        if self.key.is_some() {
            config.key_file.clone_from(&self.key);
        }
        Ok(config)
    }
}

/// Run a parsed command line against `router`.
///
/// `serve` blocks for the lifetime of the process.
///
/// # Errors
///
/// Configuration and bind failures.
pub fn run_cli(cli: Cli, router: Router) -> Result<()> {
    match cli.command {
        Commands::Routes => {
            router.dump_routes();
            Ok(())
        }
        Commands::Serve(args) => {
            let config = args.server_config()?;
            let runtime = RuntimeConfig::from_env();
            info!(
                stack_size = runtime.stack_size,
                route_count = router.routes().len(),
                "Starting server"
            );
            let handle = Server::new(config, router).with_runtime(runtime).start()?;
            handle
                .join()
                .map_err(|_| anyhow!("listener coroutine panicked"))
        }
    }
}

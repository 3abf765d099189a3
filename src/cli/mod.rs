//! # CLI Module
//!
//! Command-line front end for binaries built on this crate.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the server with the application's router:
//!
//! ```bash
//! yahs serve --host 0.0.0.0 --port 8080
//! yahs serve --secure --cert certs/chain.crt --key certs/server.key
//! yahs serve --config yahs.yaml
//! ```
//!
//! Settings resolve in this order, later winning: defaults, `--config` file,
//! `YAHS_*` environment variables, flags.
//!
//! ### `routes`
//!
//! Print the route table and exit:
//!
//! ```bash
//! yahs routes
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use clap::Parser;
//! use yahs::cli::{run_cli, Cli};
//!
//! let router = yahs::Router::with_builtins()?;
//! run_cli(Cli::parse(), router)?;
//! ```

mod commands;


pub use commands::{run_cli, Cli, Commands, ServeArgs};

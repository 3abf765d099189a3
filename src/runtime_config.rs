//! # Runtime Configuration
//!
//! Environment-driven settings for the `may` coroutine runtime that hosts the
//! listeners and connection workers.
//!
//! ## Environment Variables
//!
//! ### `YAHS_STACK_SIZE`
//!
//! Stack size of every connection worker coroutine. Accepts decimal (`65536`)
//! or hexadecimal (`0x10000`). Default: `0x10000` (64 KB).
//!
//! Handlers run on the worker's stack, so deep handler call chains need a
//! larger value. Total virtual memory is roughly
//! `stack_size × concurrent connections`.
//!
//! ```bash
//! export YAHS_STACK_SIZE=0x20000
//! cargo run -- serve
//! ```

use std::env;

/// Default worker coroutine stack size (64 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for worker coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("YAHS_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

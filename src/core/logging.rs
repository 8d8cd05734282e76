//! Logging utilities for the evidence pipeline.
//!
//! Structured logging with consistent formatting for:
//! - Chain state progression
//! - VDF computation and calibration
//! - Verification findings

use colored::*;
use log::{debug, info};
use std::time::Duration;

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub filter: String,
    pub show_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            show_colors: true,
        }
    }
}

/// Initialize the logging system.
///
/// Respects `RUST_LOG` when set; otherwise uses the configured filter.
/// Safe to call more than once.
pub fn init_logger(config: Option<LoggerConfig>) {
    let config = config.unwrap_or_default();

    if !config.show_colors {
        colored::control::set_override(false);
    }

    let env = env_logger::Env::default().default_filter_or(config.filter.clone());
    match env_logger::Builder::from_env(env).try_init() {
        Ok(()) => info!("witnessd evidence logger initialized ({})", config.filter),
        Err(_) => debug!("logger already initialized, skipping"),
    }
}

/// Format a hash for display (truncated hex)
pub fn format_hash(hash: &[u8]) -> ColoredString {
    let hex_str = hex::encode(hash);
    let truncated = if hex_str.len() > 16 {
        format!("{}...", &hex_str[..16])
    } else {
        hex_str
    };
    truncated.bright_cyan()
}

/// Format a duration in human-readable form
pub fn format_duration(d: Duration) -> ColoredString {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis()).bright_yellow()
    } else if secs < 60.0 {
        format!("{:.2}s", secs).bright_yellow()
    } else if secs < 3600.0 {
        format!("{}m{:.0}s", (secs / 60.0) as u64, secs % 60.0).bright_yellow()
    } else {
        format!("{:.1}h", secs / 3600.0).bright_yellow()
    }
}

//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before anything
//! else runs.
//!
//! ## Optional Variables
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `REDIRECT_PERMANENT` - Serve `301` instead of `302` (default: `false`)
//! - `ALLOWED_SCHEMES` - Comma-separated target scheme allow-list
//!   (default: `http,https`)
//! - `PUBLIC_HOST` - Host this service is reachable on; enables the
//!   self-reference check on declared targets
//! - `RECONCILE_WORKERS` - Parallel reconcile workers (default: 2)
//! - `REQUEUE_BACKOFF_BASE` - First requeue delay in seconds (default: 1)
//! - `REQUEUE_BACKOFF_CAP` - Requeue delay ceiling in seconds (default: 300)
//! - `SHUTDOWN_GRACE` - Seconds allowed for draining on shutdown (default: 5)
//! - `LINKS_FILE` - JSON file of `{code, target}` declarations loaded into
//!   the store at startup

use anyhow::Result;
use std::env;
use std::time::Duration;

use crate::application::services::ControllerConfig;

/// Redirect status code policy for resolved lookups.
///
/// Temporary (302) is the default so target changes propagate to clients;
/// permanent (301) lets clients cache the hop but pins old targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    Temporary,
    Permanent,
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// When true, redirects are served as `301 Moved Permanently`.
    pub redirect_permanent: bool,
    /// Schemes a declared target may use, lowercase.
    pub allowed_schemes: Vec<String>,
    /// Host this service is reachable on, used to reject self-referencing
    /// targets. The check is skipped when unset.
    pub public_host: Option<String>,
    pub reconcile_workers: usize,
    /// First requeue delay in seconds after a failed reconcile pass.
    pub backoff_base_secs: u64,
    /// Requeue delay ceiling in seconds.
    pub backoff_cap_secs: u64,
    /// Seconds allowed for in-flight work to drain on shutdown.
    pub shutdown_grace_secs: u64,
    /// Optional JSON file of shortlink declarations loaded at startup.
    pub links_file: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Self {
        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let redirect_permanent = env::var("REDIRECT_PERMANENT")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let allowed_schemes = env::var("ALLOWED_SCHEMES")
            .unwrap_or_else(|_| "http,https".to_string())
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let public_host = env::var("PUBLIC_HOST").ok().filter(|h| !h.is_empty());

        let reconcile_workers = env::var("RECONCILE_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let backoff_base_secs = env::var("REQUEUE_BACKOFF_BASE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        let backoff_cap_secs = env::var("REQUEUE_BACKOFF_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let shutdown_grace_secs = env::var("SHUTDOWN_GRACE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let links_file = env::var("LINKS_FILE").ok().filter(|p| !p.is_empty());

        Self {
            listen_addr,
            log_level,
            log_format,
            redirect_permanent,
            allowed_schemes,
            public_host,
            reconcile_workers,
            backoff_base_secs,
            backoff_cap_secs,
            shutdown_grace_secs,
            links_file,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if self.allowed_schemes.is_empty() {
            anyhow::bail!("ALLOWED_SCHEMES must name at least one scheme");
        }

        if self.reconcile_workers == 0 || self.reconcile_workers > 64 {
            anyhow::bail!(
                "RECONCILE_WORKERS must be between 1 and 64, got {}",
                self.reconcile_workers
            );
        }

        if self.backoff_base_secs == 0 {
            anyhow::bail!("REQUEUE_BACKOFF_BASE must be greater than 0");
        }

        if self.backoff_cap_secs < self.backoff_base_secs {
            anyhow::bail!(
                "REQUEUE_BACKOFF_CAP ({}) must not be below REQUEUE_BACKOFF_BASE ({})",
                self.backoff_cap_secs,
                self.backoff_base_secs
            );
        }

        if self.shutdown_grace_secs == 0 {
            anyhow::bail!("SHUTDOWN_GRACE must be greater than 0");
        }

        Ok(())
    }

    pub fn redirect_policy(&self) -> RedirectPolicy {
        if self.redirect_permanent {
            RedirectPolicy::Permanent
        } else {
            RedirectPolicy::Temporary
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            workers: self.reconcile_workers,
            backoff_base: Duration::from_secs(self.backoff_base_secs),
            backoff_cap: Duration::from_secs(self.backoff_cap_secs),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!(
            "  Redirects: {}",
            if self.redirect_permanent { "301" } else { "302" }
        );
        tracing::info!("  Allowed schemes: {}", self.allowed_schemes.join(","));
        tracing::info!(
            "  Public host: {}",
            self.public_host.as_deref().unwrap_or("(unset)")
        );
        tracing::info!("  Reconcile workers: {}", self.reconcile_workers);
        tracing::info!(
            "  Requeue backoff: {}s..{}s",
            self.backoff_base_secs,
            self.backoff_cap_secs
        );
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
    }
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env();
    config.validate()?;
    Ok(config)
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::DEFAULT_SESSION_TTL;

/// Default location of the external verification API in local development.
pub const LOCAL_API_URL: &str = "http://localhost:5000";

/// AppConfig
///
/// Holds the portal's configuration. Immutable once loaded and pulled into the
/// application state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Base URL of the external verification API (no trailing slash needed).
    pub api_base_url: String,
    // Address the portal's HTTP server binds to.
    pub bind_addr: String,
    // When set, sessions are persisted to this JSON file; otherwise they live in memory.
    pub session_file: Option<PathBuf>,
    // Timeout applied to every outbound API call.
    pub http_timeout: Duration,
    // Idle lifetime of a stored session before it is evicted.
    pub session_ttl: Duration,
}

/// Env
///
/// Runtime context: local development or production deployment.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: LOCAL_API_URL.to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            session_file: None,
            http_timeout: Duration::from_secs(10),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, failing fast.
    ///
    /// # Panics
    /// Panics in production when `PORTAL_API_URL` is not set, so the portal never
    /// starts pointed at a development API.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => env::var("PORTAL_API_URL")
                .expect("FATAL: PORTAL_API_URL must be set in production."),
            Env::Local => {
                env::var("PORTAL_API_URL").unwrap_or_else(|_| LOCAL_API_URL.to_string())
            }
        };

        let bind_addr =
            env::var("PORTAL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let session_file = env::var("PORTAL_SESSION_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let http_timeout = env::var("PORTAL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let session_ttl = env::var("PORTAL_SESSION_TTL_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TTL);

        Self {
            env,
            api_base_url,
            bind_addr,
            session_file,
            http_timeout,
            session_ttl,
        }
    }
}

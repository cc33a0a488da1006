use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4400;
const DEFAULT_AUTH_BASE_URL: &str = "https://auth.marketd.io";
const DEFAULT_LOGIN_PATH: &str = "/login";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── AuthConfig ──────────────────────────────────────────────────────────────

/// Identity provider configuration (`[auth]` in config.toml).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the hosted auth backend. Overridden by MARKETD_AUTH_URL.
    pub base_url: Option<String>,
    /// Static token → user-id map for local development.
    /// When non-empty, tokens are resolved locally and the hosted backend is
    /// never called. Never set this in production.
    pub static_tokens: HashMap<String, String>,
}

// ─── AppConfig ───────────────────────────────────────────────────────────────

/// Runtime configuration for the marketd server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Bind address (default 127.0.0.1; 0.0.0.0 to expose on the network).
    pub bind_address: String,
    /// Data directory for the SQLite database and config.toml.
    pub data_dir: PathBuf,
    /// Log level filter (trace, debug, info, warn, error).
    pub log: String,
    /// Log output format: "pretty" (default) or "json".
    pub log_format: String,
    /// Base URL of the hosted auth backend.
    pub auth_base_url: String,
    /// Path unauthenticated visitors are redirected to.
    pub login_path: String,
    /// Static token → user-id map (dev mode only, see [`AuthConfig`]).
    pub static_tokens: HashMap<String, String>,
}

/// TOML file layer (`{data_dir}/config.toml`). All fields optional — anything
/// absent falls through to the built-in default.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    port: Option<u16>,
    bind_address: Option<String>,
    log: Option<String>,
    log_format: Option<String>,
    login_path: Option<String>,
    auth: Option<AuthConfig>,
}

impl AppConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("MARKETD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("MARKETD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let auth = toml.auth.unwrap_or_default();

        let auth_base_url = std::env::var("MARKETD_AUTH_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(auth.base_url)
            .unwrap_or_else(|| DEFAULT_AUTH_BASE_URL.to_string());

        let login_path = toml
            .login_path
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
            auth_base_url,
            login_path,
            static_tokens: auth.static_tokens,
        }
    }
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/marketd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("marketd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/marketd or ~/.local/share/marketd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("marketd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("marketd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("marketd");
        }
    }
    // Last resort: relative directory next to the binary
    PathBuf::from(".marketd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.log, "info");
        assert_eq!(cfg.login_path, "/login");
        assert!(cfg.static_tokens.is_empty());
    }

    #[test]
    fn cli_overrides_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "port = 9000\nlog = \"debug\"\n\n[auth]\nbase_url = \"http://localhost:9999\"\n",
        )
        .unwrap();
        let cfg = AppConfig::new(Some(4401), Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, 4401); // CLI wins
        assert_eq!(cfg.log, "debug"); // TOML fills the gap
        assert_eq!(cfg.auth_base_url, "http://localhost:9999");
    }

    #[test]
    fn malformed_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "port = \"not a number").unwrap();
        let cfg = AppConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn static_tokens_parse_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[auth.static_tokens]\n\"dev-token\" = \"u1\"\n",
        )
        .unwrap();
        let cfg = AppConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.static_tokens.get("dev-token").map(String::as_str), Some("u1"));
    }
}

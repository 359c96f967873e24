use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Token signing secret. The `JWT_SECRET` environment variable takes
    /// precedence; starting without either is a fatal error.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
    /// Derived key length in bytes.
    #[serde(default = "default_pbkdf2_key_len")]
    pub pbkdf2_key_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            token_ttl_secs: default_token_ttl_secs(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            pbkdf2_key_len: default_pbkdf2_key_len(),
        }
    }
}

fn default_token_ttl_secs() -> i64 {
    86_400
}

fn default_pbkdf2_iterations() -> u32 {
    65_536
}

fn default_pbkdf2_key_len() -> usize {
    32
}

impl AuthConfig {
    /// Resolve the signing secret: environment first, then the config file.
    /// The secret value itself is never logged.
    pub fn resolve_secret(&self) -> anyhow::Result<String> {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                tracing::info!("using token signing secret from JWT_SECRET");
                return Ok(secret);
            }
        }
        self.secret
            .clone()
            .filter(|s| !s.is_empty())
            .context("no token signing secret configured: set JWT_SECRET or [auth].secret")
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/booking.db"
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let resolved_path = exe_dir.join(db_path);
            return Ok(resolved_path);
        }
    }

    // Fallback: use relative to current directory
    Ok(PathBuf::from(db_path_str))
}

// Configuration loading and parsing (server.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::auth::MAX_TOKEN_TTL_HOURS;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(
        "credentials file not found: {path}; copy defaults/credentials.toml.example \
         there and set jwt_secret"
    )]
    MissingCredentials { path: PathBuf },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ws_port: u16,
    /// Resolved database path. Never empty.
    pub db_path: String,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub cors: CorsConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// server.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ServerFile {
    server: ServerConfig,
    websocket: WebSocketSection,
    database: DatabaseSection,
    auth: AuthConfig,
    uploads: UploadConfig,
    #[serde(default)]
    cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct WebSocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    /// Empty means the platform data directory.
    #[serde(default)]
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token_ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_file_size_mb: u64,
    pub max_files_per_product: usize,
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Clone, Deserialize)]
pub struct CredentialsConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub superadmin_email: Option<String>,
    #[serde(default)]
    pub superadmin_password: Option<String>,
    #[serde(default)]
    pub superadmin_name: Option<String>,
}

// Keep secrets out of logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("jwt_secret", &"<redacted>")
            .field("superadmin_email", &self.superadmin_email)
            .field(
                "superadmin_password",
                &self.superadmin_password.as_ref().map(|_| "<redacted>"),
            )
            .field("superadmin_name", &self.superadmin_name)
            .finish()
    }
}

/// Bootstrap account for the first superadmin, if configured.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperadminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl CredentialsConfig {
    /// Both email and password must be present for a seed.
    pub fn superadmin_seed(&self) -> Option<SuperadminSeed> {
        let email = self.superadmin_email.as_deref()?.trim();
        let password = self.superadmin_password.as_deref()?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some(SuperadminSeed {
            email: email.to_string(),
            password: password.to_string(),
            name: self
                .superadmin_name
                .clone()
                .unwrap_or_else(|| "Super Admin".to_string()),
        })
    }
}

pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Secrets published in this repository. Never accepted.
const PUBLISHED_SECRETS: &[&str] = &[
    "replace-with-a-long-random-string-of-32-plus-chars",
    "metavertex-dev-secret-change-me-0123456789",
];

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/server.toml` and
/// `config/credentials.toml`, both relative to `base_dir`.
///
/// Does not copy defaults. Prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- server.toml (required) ---
    let server_path = config_dir.join("server.toml");
    let server_text = read_file(&server_path)?;
    let server_file: ServerFile =
        toml::from_str(&server_text).map_err(|e| ConfigError::ParseError {
            path: server_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (required: holds the token secret) ---
    let credentials_path = config_dir.join("credentials.toml");
    let cred_text = std::fs::read_to_string(&credentials_path).map_err(|_| {
        ConfigError::MissingCredentials {
            path: credentials_path.clone(),
        }
    })?;
    let credentials: CredentialsConfig =
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?;

    let config = Config {
        server: server_file.server,
        ws_port: server_file.websocket.port,
        db_path: resolve_db_path(&server_file.database.path),
        auth: server_file.auth,
        uploads: server_file.uploads,
        cors: server_file.cors,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/server.toml` from `defaults/server.toml` on first run.
///
/// Only the server file is seeded. `credentials.toml` carries the token
/// secret and has to be written by the operator. Returns `true` when a file
/// was copied.
pub fn seed_server_config(base_dir: &Path) -> Result<bool, ConfigError> {
    let target = base_dir.join("config").join("server.toml");
    let source = base_dir.join("defaults").join("server.toml");
    if target.exists() || !source.is_file() {
        return Ok(false);
    }

    let seed_error = |what: &str, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to {what}: {e}"),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| seed_error("create config directory", e))?;
    }
    std::fs::copy(&source, &target)
        .map_err(|e| seed_error(&format!("copy {}", source.display()), e))?;
    Ok(true)
}

/// Loads config relative to the current working directory, seeding
/// `server.toml` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if seed_server_config(&cwd)? {
        tracing::info!("created config/server.toml from defaults");
    }
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// An empty configured path falls back to `<data dir>/metavertex.db`.
fn resolve_db_path(configured: &str) -> String {
    let configured = configured.trim();
    if !configured.is_empty() {
        return configured.to_string();
    }
    directories::ProjectDirs::from("", "", "metavertex")
        .map(|dirs| dirs.data_dir().join("metavertex.db"))
        .unwrap_or_else(|| PathBuf::from("metavertex.db"))
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.host".into(),
            message: "must not be empty".into(),
        });
    }

    let ports: &[(&str, u16)] = &[
        ("server.port", config.server.port),
        ("websocket.port", config.ws_port),
    ];
    for (name, val) in ports {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }
    if config.server.port == config.ws_port {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: format!("must differ from server.port ({})", config.server.port),
        });
    }

    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&config.auth.token_ttl_hours) {
        return Err(ConfigError::ValidationError {
            field: "auth.token_ttl_hours".into(),
            message: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
        });
    }

    if config.uploads.dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "uploads.dir".into(),
            message: "must not be empty".into(),
        });
    }
    if config.uploads.max_file_size_mb == 0 {
        return Err(ConfigError::ValidationError {
            field: "uploads.max_file_size_mb".into(),
            message: "must be > 0".into(),
        });
    }
    if config.uploads.max_files_per_product == 0 {
        return Err(ConfigError::ValidationError {
            field: "uploads.max_files_per_product".into(),
            message: "must be > 0".into(),
        });
    }

    let secret_len = config.credentials.jwt_secret.len();
    if secret_len < MIN_JWT_SECRET_LEN {
        return Err(ConfigError::ValidationError {
            field: "credentials.jwt_secret".into(),
            message: format!(
                "must be at least {MIN_JWT_SECRET_LEN} characters, got {secret_len}"
            ),
        });
    }
    if PUBLISHED_SECRETS.contains(&config.credentials.jwt_secret.trim()) {
        return Err(ConfigError::ValidationError {
            field: "credentials.jwt_secret".into(),
            message: "is the published placeholder; generate a private secret".into(),
        });
    }

    if let Some(password) = config.credentials.superadmin_password.as_deref() {
        if !password.is_empty() && password.len() < crate::auth::MIN_PASSWORD_LEN {
            return Err(ConfigError::ValidationError {
                field: "credentials.superadmin_password".into(),
                message: format!(
                    "must be at least {} characters",
                    crate::auth::MIN_PASSWORD_LEN
                ),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

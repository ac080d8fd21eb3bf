use serde::Deserialize;
use std::net::SocketAddr;

use domain::services::moderation::TOXICITY_THRESHOLD;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub limits: LimitsConfig,
    /// Session token configuration
    pub jwt: JwtAuthConfig,
    /// Toxicity classifier configuration
    #[serde(default)]
    pub moderation: ModerationConfig,
    /// Local media storage for base64 uploads
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Request body limit. Base64 uploads make this larger than a JSON API
    /// would otherwise need.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Write requests per user per minute. 0 disables the limiter.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Send Strict-Transport-Security. Only enable behind TLS termination.
    #[serde(default)]
    pub hsts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_post_length")]
    pub max_post_length: usize,

    #[serde(default = "default_vent_minutes")]
    pub default_vent_minutes: i64,

    #[serde(default = "default_feed_size")]
    pub feed_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Perspective API key. Without one the hook is skipped.
    #[serde(default)]
    pub perspective_api_key: String,

    #[serde(default = "default_perspective_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_toxicity_threshold")]
    pub threshold: f64,

    #[serde(default = "default_moderation_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            perspective_api_key: String::new(),
            endpoint: default_perspective_endpoint(),
            threshold: default_toxicity_threshold(),
            timeout_ms: default_moderation_timeout_ms(),
        }
    }
}

impl ModerationConfig {
    /// The classifier is only called when enabled and a key is present.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.perspective_api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    16 * 1_048_576
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_rate_limit() -> u32 {
    100
}
fn default_max_post_length() -> usize {
    domain::models::post::MAX_POST_LENGTH
}
fn default_vent_minutes() -> i64 {
    domain::models::post::DEFAULT_VENT_MINUTES
}
fn default_feed_size() -> usize {
    domain::models::post::FEED_SIZE
}
fn default_perspective_endpoint() -> String {
    "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze".to_string()
}
fn default_toxicity_threshold() -> f64 {
    TOXICITY_THRESHOLD
}
fn default_moderation_timeout_ms() -> u64 {
    5000
}
fn default_storage_root() -> String {
    "./storage".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1_048_576
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA private key in PEM format for signing tokens
    #[serde(default)]
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    #[serde(default)]
    pub public_key: String,

    /// Shared HS256 secret. Used when no key pair is configured.
    #[serde(default)]
    pub secret: Option<String>,

    /// Access token expiration in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Refresh token expiration in seconds (default: 2592000 = 30 days)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: i64,

    /// Clock skew tolerance in seconds
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

fn default_access_token_expiry() -> i64 {
    3600
}

fn default_refresh_token_expiry() -> i64 {
    2592000
}

fn default_jwt_leeway() -> u64 {
    shared::jwt::DEFAULT_LEEWAY_SECS
}

impl JwtAuthConfig {
    /// Builds the token signer. A PEM key pair wins over a shared secret.
    pub fn signer(&self) -> Result<shared::jwt::JwtConfig, shared::jwt::JwtError> {
        if !self.private_key.trim().is_empty() && !self.public_key.trim().is_empty() {
            return shared::jwt::JwtConfig::from_rsa_pem(
                &normalize_pem_key(&self.private_key),
                &normalize_pem_key(&self.public_key),
                self.access_token_expiry_secs,
                self.refresh_token_expiry_secs,
                self.leeway_secs,
            );
        }
        match self.secret.as_deref() {
            Some(secret) => shared::jwt::JwtConfig::from_secret(
                secret,
                self.access_token_expiry_secs,
                self.refresh_token_expiry_secs,
                self.leeway_secs,
            ),
            None => Err(shared::jwt::JwtError::InvalidKey(
                "Either jwt.private_key/public_key or jwt.secret must be set".to_string(),
            )),
        }
    }
}

/// Env files often carry PEM keys on one line with literal `\n`.
fn normalize_pem_key(key: &str) -> String {
    key.trim_matches('"').trim_matches('\'').replace("\\n", "\n")
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SPILL__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SPILL").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Defaults are embedded so tests do not depend on the working directory.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 16777216

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            rate_limit_per_minute = 100
            hsts_enabled = false

            [limits]
            max_post_length = 1000
            default_vent_minutes = 1440
            feed_size = 100

            [jwt]
            secret = "test-secret-that-is-long-enough-for-hs256"
            access_token_expiry_secs = 3600
            refresh_token_expiry_secs = 2592000
            leeway_secs = 30

            [moderation]
            enabled = false
            perspective_api_key = ""
            threshold = 0.7
            timeout_ms = 2000

            [media]
            storage_root = "./target/test-storage"
            max_upload_bytes = 1048576
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Skip validation to allow partial configs
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SPILL__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.moderation.threshold) {
            return Err(ConfigValidationError::InvalidValue(
                "moderation.threshold must be between 0 and 1".to_string(),
            ));
        }

        let vent_minutes = 1..=domain::models::post::MAX_VENT_MINUTES;
        if !vent_minutes.contains(&self.limits.default_vent_minutes) {
            return Err(ConfigValidationError::InvalidValue(
                "limits.default_vent_minutes must be between 1 and 10080".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub payments: PaymentConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// SQLite connection string, e.g. `sqlite:./data/shoplane.db?mode=rwc`
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Origins allowed to make credentialed cross-origin requests
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite:./data/shoplane.db?mode=rwc".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CookieSameSite {
    Strict,
    Lax,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Lifetime of a session token and its cookie
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure` (set when served over TLS)
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default = "default_cookie_same_site")]
    pub cookie_same_site: CookieSameSite,
    /// Validity window of a one-time code
    #[serde(default = "default_code_ttl_minutes")]
    pub code_ttl_minutes: i64,
    /// Bootstrap admin account created on startup when both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Shared secret the identity broker presents on federated logins
    pub federation_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            session_ttl_hours: default_session_ttl_hours(),
            cookie_secure: false,
            cookie_same_site: default_cookie_same_site(),
            code_ttl_minutes: default_code_ttl_minutes(),
            admin_email: None,
            admin_password: None,
            federation_secret: None,
        }
    }
}

fn default_jwt_secret() -> String {
    // Sessions will not survive a restart with a generated secret
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_cookie_same_site() -> CookieSameSite {
    CookieSameSite::Strict
}

fn default_code_ttl_minutes() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Gateway key id (basic-auth username)
    #[serde(default)]
    pub key_id: String,
    /// Gateway key secret; also the HMAC key for payment signatures
    #[serde(default)]
    pub key_secret: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payments_api_base")]
    pub api_base: String,
    #[serde(default = "default_payments_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            currency: default_currency(),
            api_base: default_payments_api_base(),
            timeout_seconds: default_payments_timeout(),
        }
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_payments_api_base() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_payments_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    #[serde(default = "default_smtp_tls")]
    pub smtp_tls: bool,
    pub from_address: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.from_address.is_some()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            smtp_tls: default_smtp_tls(),
            from_address: None,
            from_name: default_from_name(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_tls() -> bool {
    true
}

fn default_from_name() -> String {
    "ShopLane".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersConfig {
    /// Whether an order may move back down the fulfillment lifecycle
    /// (e.g. Delivered -> Paid). Pending a product decision, allowed by default.
    #[serde(default = "default_allow_backward")]
    pub allow_backward_transitions: bool,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            allow_backward_transitions: default_allow_backward(),
        }
    }
}

fn default_allow_backward() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_requests")]
    pub api_requests_per_window: u32,
    #[serde(default = "default_auth_requests")]
    pub auth_requests_per_window: u32,
    #[serde(default = "default_checkout_requests")]
    pub checkout_requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            api_requests_per_window: default_api_requests(),
            auth_requests_per_window: default_auth_requests(),
            checkout_requests_per_window: default_checkout_requests(),
            window_seconds: default_window_seconds(),
            cleanup_interval: default_cleanup_interval(),
            trust_proxy_headers: false,
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_api_requests() -> u32 {
    300
}

fn default_auth_requests() -> u32 {
    20
}

fn default_checkout_requests() -> u32 {
    30
}

fn default_window_seconds() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    /// Log settings that leave a feature silently disabled
    pub fn warn_on_gaps(&self) {
        if self.payments.key_secret.is_empty() {
            warn!("payments.key_secret is empty; every payment signature will be rejected");
        }
        if !self.email.is_configured() {
            warn!("SMTP is not configured; outgoing e-mail will be skipped");
        }
    }
}

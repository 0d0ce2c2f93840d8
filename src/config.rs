use std::env;
use std::str::FromStr;

const MIN_PEPPER_LEN: usize = 32;

/// Settings the token store and the reaper need. Loaded on its own so the
/// sweep command can run without the server secrets.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub database_url: String,
    pub store_timeout_ms: u64,
    pub token_retention_minutes: u64,
    pub sweep_interval_secs: u64,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://rentalhub.db?mode=rwc".to_string());

        Ok(StoreConfig {
            database_url,
            store_timeout_ms: parse_var("RESET_STORE_TIMEOUT_MS", 5000)?,
            token_retention_minutes: parse_var("RESET_TOKEN_RETENTION_MINUTES", 60)?,
            sweep_interval_secs: parse_var("RESET_SWEEP_INTERVAL_SECS", 300)?,
        })
    }
}

/// SMTP settings; absent when `SMTP_HOST` is not set
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = match env::var("SMTP_HOST") {
            Ok(host) => host,
            Err(_) => return Ok(None),
        };

        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("SMTP_PORT"))?;

        let username =
            env::var("SMTP_USERNAME").map_err(|_| ConfigError::Missing("SMTP_USERNAME"))?;
        let password =
            env::var("SMTP_PASSWORD").map_err(|_| ConfigError::Missing("SMTP_PASSWORD"))?;
        let from_email =
            env::var("SMTP_FROM_EMAIL").map_err(|_| ConfigError::Missing("SMTP_FROM_EMAIL"))?;
        let from_name = env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "RentalHub".to_string());

        Ok(Some(Self {
            host,
            port,
            username,
            password,
            from_email,
            from_name,
        }))
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreConfig,
    pub server_host: String,
    pub server_port: u16,
    pub metrics_port: u16,
    pub token_pepper: String,
    pub token_ttl_minutes: u64,
    pub request_min_duration_ms: u64,
    pub reset_base_url: String,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store = StoreConfig::from_env()?;

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let metrics_port = env::var("METRICS_PORT")
            .unwrap_or_else(|_| "9000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let token_pepper =
            env::var("RESET_TOKEN_PEPPER").map_err(|_| ConfigError::Missing("RESET_TOKEN_PEPPER"))?;
        if token_pepper.len() < MIN_PEPPER_LEN {
            return Err(ConfigError::WeakTokenPepper);
        }

        let token_ttl_minutes = parse_var("RESET_TOKEN_TTL_MINUTES", 15)?;
        if token_ttl_minutes == 0 {
            return Err(ConfigError::InvalidNumber("RESET_TOKEN_TTL_MINUTES"));
        }

        let reset_base_url = env::var("RESET_PASSWORD_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Config {
            store,
            server_host,
            server_port,
            metrics_port,
            token_pepper,
            token_ttl_minutes,
            request_min_duration_ms: parse_var("RESET_REQUEST_MIN_DURATION_MS", 250)?,
            reset_base_url: reset_base_url.trim_end_matches('/').to_string(),
            smtp: SmtpConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber(name)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("RESET_TOKEN_PEPPER must be at least 32 bytes")]
    WeakTokenPepper,

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid value for {0}")]
    InvalidNumber(&'static str),
}

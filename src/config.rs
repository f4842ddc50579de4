//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT key, cron secret, email API key) are injected as environment
//! variables by the deployment and read once at startup.

use std::env;
use std::str::FromStr;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_EMAIL_FROM: &str = "Squad Tracker <reminders@squadtracker.app>";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REMINDER_BATCH_LIMIT: u32 = 100;

/// Where documents are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Base URL used for links in emails
    pub app_url: String,
    pub gcp_project_id: String,
    pub port: u16,
    pub storage: StorageBackend,
    /// Email API endpoint
    pub email_api_url: String,
    /// Sender address for reminder emails
    pub email_from: String,
    /// Most requests examined per reminder run
    pub reminder_batch_limit: u32,

    // Secrets
    /// HS256 key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Bearer token the scheduler presents on `/tasks/*`
    pub cron_secret: String,
    /// Email API key; emails are only logged when absent
    pub email_api_key: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            app_url: DEFAULT_FRONTEND_URL.to_string(),
            gcp_project_id: "test-project".to_string(),
            port: DEFAULT_PORT,
            storage: StorageBackend::Memory,
            email_api_url: DEFAULT_EMAIL_API_URL.to_string(),
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            reminder_batch_limit: DEFAULT_REMINDER_BATCH_LIMIT,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            cron_secret: "test_cron_secret".to_string(),
            email_api_key: None,
        }
    }
}

/// Trimmed value of `name`, treating empty as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid(name, value)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let frontend_url =
            optional("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());

        Ok(Self {
            app_url: optional("APP_URL").unwrap_or_else(|| frontend_url.clone()),
            frontend_url,
            gcp_project_id: optional("GCP_PROJECT_ID").unwrap_or_else(|| "local-dev".to_string()),
            port: parsed("PORT", DEFAULT_PORT)?,
            storage: match optional("STORAGE_BACKEND") {
                Some(value) => value.parse()?,
                None => StorageBackend::Firestore,
            },
            email_api_url: optional("EMAIL_API_URL")
                .unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
            email_from: optional("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            reminder_batch_limit: parsed("REMINDER_BATCH_LIMIT", DEFAULT_REMINDER_BATCH_LIMIT)?,

            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
            cron_secret: required("CRON_SECRET")?,
            email_api_key: optional("EMAIL_API_KEY"),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test that mutates process env.
    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("CRON_SECRET", " cron-secret \n");
        env::set_var("STORAGE_BACKEND", "Memory");
        env::set_var("REMINDER_BATCH_LIMIT", "25");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.cron_secret, "cron-secret");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.reminder_batch_limit, 25);

        env::set_var("REMINDER_BATCH_LIMIT", "lots");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("REMINDER_BATCH_LIMIT", _))
        ));

        env::set_var("CRON_SECRET", "   ");
        env::remove_var("REMINDER_BATCH_LIMIT");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("CRON_SECRET"))
        ));
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("firestore".parse::<StorageBackend>().unwrap(), StorageBackend::Firestore);
        assert_eq!(" MEMORY ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }
}

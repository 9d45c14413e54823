use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use dotenv::dotenv;
use std::{env, fmt, str::FromStr};
use url::Url;
use validator::ValidateEmail;
use zeroize::Zeroizing;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default)]
    pub redis_url: Option<String>,

    /// Comma separated; `*.example.com` entries match any origin ending in `example.com`.
    #[serde(default)]
    pub allowed_origins: String,

    #[serde(default)]
    pub email_recipient: String,

    #[serde(default)]
    pub email_sender: String,

    #[serde(default)]
    pub dedupe_ttl: Option<u64>,

    #[serde(default)]
    pub max_duplicate_count: Option<u32>,

    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window: u64,

    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    #[serde(default)]
    pub mail_api_url: Option<String>,

    #[serde(default)]
    pub mail_api_key: Option<String>,

    #[serde(default)]
    pub trust_x_forwarded_for: bool,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Formgate".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_rate_limit_window() -> u64 {
    3600
}
fn default_rate_limit_max_requests() -> u32 {
    10
}

/// Upper bound for `DEDUPE_TTL` and `RATE_LIMIT_WINDOW`, in seconds (one year).
pub const MAX_POLICY_SECONDS: u64 = 365 * 24 * 60 * 60;

/// The counting policy shared by the duplicate tracker and the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPolicy {
    /// Seconds a fingerprint is remembered after its latest sighting.
    #[serde(rename = "dedupeTTL")]
    pub dedupe_ttl: u64,
    pub max_duplicate_count: u32,
    /// Fixed window length in seconds.
    pub rate_limit_window: u64,
    pub rate_limit_max_requests: u32,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name.to_string().to_lowercase())).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .ignore_empty(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;

        config.validate()?;
        Ok(config)
    }

    /// Checks every required setting and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.email_recipient.trim().is_empty() {
            errors.push("EMAIL_RECIPIENT must be set".to_string());
        } else if !self.email_recipient.validate_email() {
            errors.push("EMAIL_RECIPIENT must be a valid email address".to_string());
        }
        if self.email_sender.trim().is_empty() {
            errors.push("EMAIL_SENDER must be set".to_string());
        } else if !self.email_sender.validate_email() {
            errors.push("EMAIL_SENDER must be a valid email address".to_string());
        }
        if self.allowed_origins().is_empty() {
            errors.push("ALLOWED_ORIGINS must be set".to_string());
        }
        match self.dedupe_ttl {
            None => errors.push("DEDUPE_TTL must be set".to_string()),
            Some(0) => errors.push("DEDUPE_TTL must be greater than zero".to_string()),
            Some(ttl) if ttl > MAX_POLICY_SECONDS => errors.push(format!(
                "DEDUPE_TTL must not exceed {} seconds",
                MAX_POLICY_SECONDS
            )),
            Some(_) => {}
        }
        if self.max_duplicate_count.is_none() {
            errors.push("MAX_DUPLICATE_COUNT must be set".to_string());
        }
        if self.rate_limit_window == 0 {
            errors.push("RATE_LIMIT_WINDOW must be greater than zero".to_string());
        } else if self.rate_limit_window > MAX_POLICY_SECONDS {
            errors.push(format!(
                "RATE_LIMIT_WINDOW must not exceed {} seconds",
                MAX_POLICY_SECONDS
            ));
        }
        if self.rate_limit_max_requests == 0 {
            errors.push("RATE_LIMIT_MAX_REQUESTS must be greater than zero".to_string());
        }
        if let Some(raw) = &self.mail_api_url {
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => errors.push(format!("MAIL_API_URL is not a valid http(s) URL: {}", raw)),
            }
        }
        if self.is_production() && self.allowed_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard origin (*) is not allowed in production".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Only meaningful after [`AppConfig::validate`] succeeded.
    pub fn policy(&self) -> SubmissionPolicy {
        SubmissionPolicy {
            dedupe_ttl: self.dedupe_ttl.unwrap_or_default(),
            max_duplicate_count: self.max_duplicate_count.unwrap_or_default(),
            rate_limit_window: self.rate_limit_window,
            rate_limit_max_requests: self.rate_limit_max_requests,
        }
    }

    pub fn mail_api_key(&self) -> Option<Zeroizing<String>> {
        self.mail_api_key.clone().map(Zeroizing::new)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for Option<String> {
    fn redact(&self) -> &str {
        match self {
            None => "[NOT SET]",
            Some(s) if s.is_empty() => "[MISSING]",
            Some(_) => "[REDACTED]",
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("redis_url", &self.redis_url.redact())
            .field("allowed_origins", &self.allowed_origins())
            .field("email_recipient", &self.email_recipient)
            .field("email_sender", &self.email_sender)
            .field("dedupe_ttl", &self.dedupe_ttl)
            .field("max_duplicate_count", &self.max_duplicate_count)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("mail_api_url", &self.mail_api_url)
            .field("mail_api_key", &self.mail_api_key.redact())
            .field("trust_x_forwarded_for", &self.trust_x_forwarded_for)
            .finish()
    }
}

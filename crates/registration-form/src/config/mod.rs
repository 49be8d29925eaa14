use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use url::Url;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub registration: RegistrationApiConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            registration: RegistrationApiConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_IMAGE_UPLOAD_PATH: &str = "/auth/registerUserImage";
pub const DEFAULT_DOCUMENT_UPLOAD_PATH: &str = "/auth/registerPDF";
pub const DEFAULT_SUBMIT_PATH: &str = "/auth/register";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the registration service lives and how long a single call may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationApiConfig {
    pub base_url: Url,
    pub image_upload_path: String,
    pub document_upload_path: String,
    pub submit_path: String,
    pub timeout_secs: u64,
}

impl RegistrationApiConfig {
    /// Default endpoint layout rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            image_upload_path: DEFAULT_IMAGE_UPLOAD_PATH.to_string(),
            document_upload_path: DEFAULT_DOCUMENT_UPLOAD_PATH.to_string(),
            submit_path: DEFAULT_SUBMIT_PATH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let raw_url =
            env::var("REGISTRATION_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let base_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidApiUrl {
            value: raw_url.clone(),
            source,
        })?;

        let timeout_secs = match env::var("REGISTRATION_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidTimeout),
            },
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            image_upload_path: env::var("REGISTRATION_IMAGE_UPLOAD_PATH")
                .unwrap_or_else(|_| DEFAULT_IMAGE_UPLOAD_PATH.to_string()),
            document_upload_path: env::var("REGISTRATION_DOCUMENT_UPLOAD_PATH")
                .unwrap_or_else(|_| DEFAULT_DOCUMENT_UPLOAD_PATH.to_string()),
            submit_path: env::var("REGISTRATION_SUBMIT_PATH")
                .unwrap_or_else(|_| DEFAULT_SUBMIT_PATH.to_string()),
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn image_upload_url(&self) -> Result<Url, ConfigError> {
        self.join(&self.image_upload_path)
    }

    pub fn document_upload_url(&self) -> Result<Url, ConfigError> {
        self.join(&self.document_upload_path)
    }

    pub fn submit_url(&self) -> Result<Url, ConfigError> {
        self.join(&self.submit_path)
    }

    fn join(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url
            .join(path)
            .map_err(|source| ConfigError::InvalidApiUrl {
                value: path.to_string(),
                source,
            })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidApiUrl {
        value: String,
        source: url::ParseError,
    },
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidApiUrl { value, .. } => {
                write!(f, "'{value}' is not a usable registration API URL")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "REGISTRATION_TIMEOUT_SECS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidTimeout => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidApiUrl { source, .. } => Some(source),
        }
    }
}

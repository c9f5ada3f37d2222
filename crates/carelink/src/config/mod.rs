use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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

/// Top-level configuration for the marketplace service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub sessions: SessionConfig,
    pub jobs: JobConfig,
    /// `None` when the Zoho credentials are not configured.
    pub crm: Option<CrmConfig>,
    /// Admin account created at startup when absent.
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let upload_dir = env::var("APP_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let public_base_url = env::var("APP_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}/uploads"));

        let session_ttl = parse_number("APP_SESSION_TTL_SECS", 86_400)?;
        let queue_capacity = parse_number("APP_JOB_QUEUE_CAPACITY", 256)?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "APP_JOB_QUEUE_CAPACITY",
            });
        }
        let sweep_interval = parse_number("APP_EXPIRY_SWEEP_SECS", 3_600)?;
        if sweep_interval == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "APP_EXPIRY_SWEEP_SECS",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                upload_dir: PathBuf::from(upload_dir),
                public_base_url: public_base_url.trim_end_matches('/').to_string(),
            },
            sessions: SessionConfig {
                ttl: Duration::from_secs(session_ttl),
            },
            jobs: JobConfig {
                queue_capacity: queue_capacity as usize,
                expiry_sweep: Duration::from_secs(sweep_interval),
            },
            crm: CrmConfig::from_env(),
            admin: AdminSeed::from_env(),
        })
    }
}

fn parse_number(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { variable }),
        Err(_) => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where uploaded verification documents land and how they are addressed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub queue_capacity: usize,
    /// Period of the document expiry sweep.
    pub expiry_sweep: Duration,
}

#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl AdminSeed {
    fn from_env() -> Option<Self> {
        Some(Self {
            email: non_empty_var("APP_ADMIN_EMAIL")?,
            password: non_empty_var("APP_ADMIN_PASSWORD")?,
        })
    }
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Zoho CRM credentials for the refresh-token flow.
#[derive(Clone)]
pub struct CrmConfig {
    pub accounts_url: String,
    pub api_base: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl CrmConfig {
    fn from_env() -> Option<Self> {
        let client_id = non_empty_var("ZOHO_CLIENT_ID")?;
        let client_secret = non_empty_var("ZOHO_CLIENT_SECRET")?;
        let refresh_token = non_empty_var("ZOHO_REFRESH_TOKEN")?;

        Some(Self {
            accounts_url: env::var("ZOHO_ACCOUNTS_URL")
                .unwrap_or_else(|_| "https://accounts.zoho.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_base: env::var("ZOHO_API_BASE")
                .unwrap_or_else(|_| "https://www.zohoapis.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            client_id,
            client_secret,
            refresh_token,
        })
    }
}

impl fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmConfig")
            .field("accounts_url", &self.accounts_url)
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Environment configuration
/// Loads and validates environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub upload_timeout: Duration,
    pub report_timeout: Duration,
    pub session_file: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("CASA_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(format!(
                "CASA_API_BASE_URL must be an http(s) URL, got '{}'",
                api_base_url
            ));
        }

        let http_timeout = secs_var("CASA_HTTP_TIMEOUT_SECS", 10)?;
        let upload_timeout = secs_var("CASA_UPLOAD_TIMEOUT_SECS", 15)?;
        let report_timeout = secs_var("CASA_REPORT_TIMEOUT_SECS", 15)?;

        let data_dir = env::var("CASA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let session_file = env::var("CASA_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("session.json"));

        Ok(Self {
            api_base_url,
            http_timeout,
            upload_timeout,
            report_timeout,
            session_file,
            data_dir,
        })
    }

    /// Configuration pointing at an explicit backend, used by tests and embedders
    pub fn for_base_url(base_url: &str, data_dir: PathBuf) -> Self {
        Self {
            api_base_url: base_url.trim_end_matches('/').to_string(),
            http_timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(15),
            report_timeout: Duration::from_secs(15),
            session_file: data_dir.join("session.json"),
            data_dir,
        }
    }
}

fn secs_var(name: &str, default: u64) -> Result<Duration, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("{} must be a whole number of seconds, got '{}'", name, raw)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn default_data_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".casa-del-sol")
}

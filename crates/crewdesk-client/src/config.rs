//! Client configuration.
//!
//! Relative request targets are resolved against `api_url`; the login path
//! is where the navigator is sent when a backend rejects the credentials.

use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the backend HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base address for relative targets. Always ends with `/`.
    pub api_url: Url,
    /// Sign-in surface used for authorization redirects.
    pub login_path: String,
    /// Request timeout handed to the HTTP client.
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Configuration with the given base address and default login path and
    /// timeout.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_base("api_url", api_url)?,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CREWDESK_API_URL` (default: `http://localhost:3000/api/`)
    /// - `CREWDESK_LOGIN_PATH` (default: `/login`)
    /// - `CREWDESK_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let login_path =
            std::env::var("CREWDESK_LOGIN_PATH").unwrap_or_else(|_| DEFAULT_LOGIN_PATH.to_string());
        Ok(Self {
            api_url: env_url("CREWDESK_API_URL", DEFAULT_API_URL)?,
            login_path: checked_login_path(login_path)?,
            timeout_secs: std::env::var("CREWDESK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Configuration pointing at a local stub on `port` (for testing).
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        let mut config = Self::new(&format!("http://127.0.0.1:{port}/api/"))?;
        config.timeout_secs = 5;
        Ok(config)
    }

    /// Replace the login path. It must be an absolute path.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Result<Self, ConfigError> {
        self.login_path = checked_login_path(path.into())?;
        Ok(self)
    }
}

fn checked_login_path(path: String) -> Result<String, ConfigError> {
    if path.starts_with('/') {
        Ok(path)
    } else {
        Err(ConfigError::InvalidLoginPath(path))
    }
}

/// Parse a base URL, forcing a trailing `/` so that joins keep its path.
fn parse_base(name: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            name.to_string(),
            "not usable as a base address".into(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_base(var, &raw)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("login path must be absolute, got {0:?}")]
    InvalidLoginPath(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = ClientConfig::local_mock(9000).unwrap();
        assert_eq!(cfg.api_url.as_str(), "http://127.0.0.1:9000/api/");
        assert_eq!(cfg.login_path, "/login");
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn trailing_slash_is_enforced() {
        let cfg = ClientConfig::new("https://backend.example/v2").unwrap();
        assert_eq!(cfg.api_url.as_str(), "https://backend.example/v2/");
        assert_eq!(cfg.api_url.join("persons").unwrap().path(), "/v2/persons");
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("CREWDESK_NONEXISTENT_VAR_12345", DEFAULT_API_URL).unwrap();
        assert_eq!(url.as_str(), DEFAULT_API_URL);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ConfigError::InvalidUrl(..))
        ));
        assert!(matches!(
            ClientConfig::new("mailto:ops@example.com"),
            Err(ConfigError::InvalidUrl(..))
        ));
        assert!(matches!(
            ClientConfig::local_mock(1).unwrap().with_login_path("login"),
            Err(ConfigError::InvalidLoginPath(_))
        ));
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credentials for HTTP basic auth against the server.
///
/// Held by value inside the client; there is no process-wide auth state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub timeout: Duration,
    /// TLS certificate validation. Enabled unless explicitly opted out.
    pub verify_tls: bool,
    /// Page size for repository queries. Results beyond one page are not
    /// fetched; truncation at this size is silently accepted.
    pub page_size: u32,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4516".to_string(),
            credentials: Credentials::new("admin", "admin"),
            timeout: Duration::from_secs(30),
            verify_tls: true,
            page_size: 1000,
        }
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.credentials.username.is_empty() {
            return Err("Username cannot be empty".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.page_size == 0 {
            return Err("Page size must be greater than 0".to_string());
        }

        Ok(())
    }
}

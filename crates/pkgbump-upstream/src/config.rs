use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Releases API endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl UpstreamConfig {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    /// Build from `PKGBUMP_API_URL` and `PKGBUMP_GITHUB_TOKEN`, both optional.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url = lookup("PKGBUMP_API_URL").filter(|u| !u.trim().is_empty());
        let mut config = Self::new(url.as_deref().unwrap_or(DEFAULT_API_URL));
        if let Some(token) = lookup("PKGBUMP_GITHUB_TOKEN").filter(|t| !t.is_empty()) {
            config = config.with_token(&token);
        }
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

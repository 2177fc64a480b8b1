use anyhow::Result;
use log::debug;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::runtime::Runtime;

/// Environment variable holding the backend bearer token.
pub const TOKEN_ENV: &str = "SAMPLEMIND_TOKEN";

/// Client settings collected from the command line; unset fields keep the
/// [`ClientConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<usize>,
    pub backoff_ms: Option<u64>,
    pub no_cache: bool,
    pub no_retry_on_decode_error: bool,
}

impl Config {
    /// Resolves the final client configuration, reading the token through
    /// the runtime.
    pub fn client_config<R: Runtime>(&self, runtime: &R) -> Result<ClientConfig> {
        let mut config = ClientConfig::default();

        if let Some(url) = &self.api_url {
            config.base_url = url.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(backoff_ms) = self.backoff_ms {
            config.backoff_base = Duration::from_millis(backoff_ms);
        }
        config.cache_enabled = !self.no_cache;
        config.retry_on_decode_error = !self.no_retry_on_decode_error;

        if let Ok(token) = runtime.env_var(TOKEN_ENV) {
            if !token.is_empty() {
                debug!("Using {} for authentication: {}", TOKEN_ENV, mask(&token));
                config.bearer_token = Some(token);
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Keeps the first and last characters of long tokens only.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}

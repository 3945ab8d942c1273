use clap::Parser;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Processor API secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl FromStr for ApiKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid upstream endpoint {url}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream endpoint must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("upstream path must start with '/', got {0}")]
    InvalidPath(String),

    #[error("invalid return url {0}")]
    InvalidReturnUrl(String),
}

/// Static process configuration, read once at startup from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "crypto-checkout-proxy", version, about = "Signing proxy for hosted crypto checkout payments")]
pub struct Config {
    #[arg(long = "port", env = "PORT", default_value_t = 3000)]
    pub server_port: u16,

    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    #[arg(long, env = "CRYPTOMUS_MERCHANT_ID")]
    pub merchant_id: String,

    #[arg(long, env = "CRYPTOMUS_API_KEY", hide_env_values = true)]
    pub api_key: ApiKey,

    #[arg(long, env = "CRYPTOMUS_BASE_URL", default_value = "https://api.cryptomus.com")]
    pub upstream_base_url: String,

    #[arg(long, env = "CRYPTOMUS_PAYMENT_PATH", default_value = "/v1/payment")]
    pub upstream_path: String,

    /// Where the hosted checkout sends the buyer afterwards, when the page does not say.
    #[arg(long, env = "RETURN_URL")]
    pub return_url: Option<String>,

    #[arg(long, env = "PAYMENT_LIFETIME_SECS", default_value_t = 3600)]
    pub lifetime_secs: u64,

    #[arg(long, env = "PAYMENT_TO_CURRENCY", default_value = "BTC")]
    pub to_currency: String,

    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    #[arg(long, env = "UPSTREAM_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    #[arg(long, env = "REQUEST_READ_TIMEOUT_SECS", default_value_t = 15)]
    pub request_read_timeout_secs: u64,

    /// Extra attempts allowed when the TCP/TLS connection could not be established.
    #[arg(long, env = "UPSTREAM_MAX_CONNECT_RETRIES", default_value_t = 0)]
    pub max_connect_retries: u32,
}

impl Config {
    /// Parses flags and environment (exiting on `--help` or bad flags), then validates.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merchant_id.trim().is_empty() {
            return Err(ConfigError::Empty("merchant id"));
        }
        if self.api_key.expose().trim().is_empty() {
            return Err(ConfigError::Empty("api key"));
        }
        if self.to_currency.trim().is_empty() {
            return Err(ConfigError::Empty("settlement currency"));
        }
        if !self.upstream_path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.upstream_path.clone()));
        }
        self.upstream_endpoint()?;

        if let Some(return_url) = &self.return_url {
            match Url::parse(return_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => return Err(ConfigError::InvalidReturnUrl(return_url.clone())),
            }
        }
        Ok(())
    }

    /// Full payment-creation URL: base joined with path, base's trailing slash ignored.
    pub fn upstream_endpoint(&self) -> Result<Url, ConfigError> {
        let raw = format!(
            "{}{}",
            self.upstream_base_url.trim_end_matches('/'),
            self.upstream_path
        );
        let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint {
            url: raw.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(url)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_read_timeout(&self) -> Duration {
        Duration::from_secs(self.request_read_timeout_secs)
    }

    #[cfg(test)]
    pub fn for_tests(upstream_base_url: &str) -> Self {
        Self {
            server_port: 0,
            bind_address: "127.0.0.1".to_string(),
            merchant_id: "merchant-test".to_string(),
            api_key: ApiKey("test-api-key".to_string()),
            upstream_base_url: upstream_base_url.to_string(),
            upstream_path: "/v1/payment".to_string(),
            return_url: Some("https://hosting.example/thankyou.html".to_string()),
            lifetime_secs: 3600,
            to_currency: "BTC".to_string(),
            upstream_timeout_secs: 5,
            connect_timeout_secs: 2,
            request_read_timeout_secs: 5,
            max_connect_retries: 0,
        }
    }
}

//! HTTP client with connection pooling and retry logic

use reqwest::{Client, Response};
use spkg_errors::{Error, FetchError};
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    /// Extra attempts after the first; 0 disables retrying
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large downloads
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            retry_count: 0,
            retry_delay: Duration::from_secs(1),
            user_agent: format!("spkg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&spkg_config::Config> for NetConfig {
    fn from(config: &spkg_config::Config) -> Self {
        Self {
            timeout: config.http_timeout(),
            connect_timeout: config.connect_timeout(),
            retry_count: config.network.retries,
            retry_delay: config.retry_delay(),
            user_agent: config.network.user_agent.clone(),
            ..Self::default()
        }
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Execute a GET request with retries
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts, including
    /// network timeouts, connection failures, or server errors.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.retry_request(url, || self.client.get(url).send())
            .await
    }

    /// Execute a HEAD request with retries
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts.
    pub async fn head(&self, url: &str) -> Result<Response, Error> {
        self.retry_request(url, || self.client.head(url).send())
            .await
    }

    /// Execute a request with retries
    async fn retry_request<F, Fut>(&self, url: &str, mut f: F) -> Result<Response, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }

            match f().await {
                Ok(response) => {
                    let status = response.status();
                    if (status.is_server_error() || status.as_u16() == 429)
                        && attempt < self.config.retry_count
                    {
                        tracing::warn!(url, status = status.as_u16(), attempt, "retrying request");
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt >= self.config.retry_count || !Self::should_retry(&e) {
                        return Err(Self::convert_error(url, &e));
                    }
                    tracing::warn!(url, attempt, error = %e, "retrying request");
                    attempt += 1;
                }
            }
        }
    }

    fn convert_error(url: &str, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
            .into()
        } else if e.is_connect() {
            FetchError::ConnectionRefused(e.to_string()).into()
        } else {
            FetchError::DownloadFailed(e.to_string()).into()
        }
    }

    /// Determine if an error should be retried
    fn should_retry(error: &reqwest::Error) -> bool {
        // Retry on timeout, connection errors, and server errors
        error.is_timeout()
            || error.is_connect()
            || error.status().is_none_or(|s| s.is_server_error())
    }
}

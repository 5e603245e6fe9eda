use std::time::Duration;

use reqwest::Client as HttpClient;
use url::Url;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

/// Fetches a page from the ratings site
///
/// Implementations decide how the request reaches the upstream (same-origin proxy in
/// production, canned HTML in tests).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ScrapeTransport: Send + Sync {
    /// Returns the response body of `target_url` as text
    async fn fetch(&self, target_url: &str) -> AppResult<String>;
}

/// Returns true when `target` is an http(s) URL on the same host and port as `upstream`
pub fn is_allowed_target(target: &Url, upstream: &Url) -> bool {
    matches!(target.scheme(), "http" | "https")
        && target.host_str().is_some()
        && target.host_str() == upstream.host_str()
        && target.port_or_known_default() == upstream.port_or_known_default()
}

/// Routes scrape requests through the same-origin proxy
///
/// Request shape: `GET <proxy_url>?url=<encoded target>`, with the backend credential
/// attached as `apikey` and bearer token when configured.
pub struct ProxyTransport {
    http_client: HttpClient,
    proxy_url: Option<String>,
    api_key: Option<String>,
    upstream: Url,
}

impl ProxyTransport {
    pub fn new(
        proxy_url: Option<String>,
        api_key: Option<String>,
        upstream_base_url: &str,
        timeout: Duration,
    ) -> AppResult<Self> {
        let upstream = Url::parse(upstream_base_url).map_err(|e| {
            AppError::InvalidInput(format!(
                "Invalid upstream base URL {}: {}",
                upstream_base_url, e
            ))
        })?;

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            proxy_url: proxy_url.filter(|url| !url.trim().is_empty()),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            upstream,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.proxy_url.clone(),
            config.proxy_api_key.clone(),
            &config.upstream_base_url,
            config.scrape_timeout(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.proxy_url.is_some()
    }

    fn check_target(&self, target_url: &str) -> AppResult<Url> {
        let target = Url::parse(target_url)
            .map_err(|e| AppError::InvalidInput(format!("Invalid target URL {}: {}", target_url, e)))?;

        if !is_allowed_target(&target, &self.upstream) {
            return Err(AppError::HostNotAllowed(
                target.host_str().unwrap_or_default().to_string(),
            ));
        }

        Ok(target)
    }
}

#[async_trait::async_trait]
impl ScrapeTransport for ProxyTransport {
    async fn fetch(&self, target_url: &str) -> AppResult<String> {
        let proxy_url = self
            .proxy_url
            .as_deref()
            .ok_or_else(|| AppError::NotConfigured("scrape proxy URL is not set".to_string()))?;

        let target = self.check_target(target_url)?;

        let mut request = self
            .http_client
            .get(proxy_url)
            .query(&[("url", target.as_str())]);

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        tracing::debug!(target = %target, "Fetching via proxy");

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = AppError::upstream_rejected(status.as_u16(), &body);
            tracing::warn!(
                target = %target,
                status = %status,
                error = %error,
                "Proxy request failed"
            );
            return Err(error);
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSTREAM: &str = "https://www.rottentomatoes.com";

    fn transport(proxy_url: Option<&str>) -> ProxyTransport {
        ProxyTransport::new(
            proxy_url.map(str::to_string),
            Some("anon-key".to_string()),
            UPSTREAM,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_is_allowed_target() {
        let upstream = Url::parse(UPSTREAM).unwrap();
        let allowed = Url::parse("https://www.rottentomatoes.com/m/inception").unwrap();
        let other_host = Url::parse("https://example.com/m/inception").unwrap();
        let lookalike = Url::parse("https://www.rottentomatoes.com.evil.net/m/x").unwrap();
        let other_port = Url::parse("https://www.rottentomatoes.com:8443/m/x").unwrap();
        let ftp = Url::parse("ftp://www.rottentomatoes.com/m/x").unwrap();

        assert!(is_allowed_target(&allowed, &upstream));
        assert!(!is_allowed_target(&other_host, &upstream));
        assert!(!is_allowed_target(&lookalike, &upstream));
        assert!(!is_allowed_target(&other_port, &upstream));
        assert!(!is_allowed_target(&ftp, &upstream));
    }

    #[test]
    fn test_invalid_upstream_base_url() {
        let result = ProxyTransport::new(None, None, "not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_blank_proxy_url_is_unconfigured() {
        assert!(!transport(Some("  ")).is_configured());
        assert!(transport(Some("https://proxy.local/rt")).is_configured());
    }

    #[tokio::test]
    async fn test_fetch_without_proxy_is_not_configured() {
        let result = transport(None)
            .fetch("https://www.rottentomatoes.com/m/inception")
            .await;
        assert!(matches!(result, Err(AppError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_foreign_host_before_sending() {
        // The proxy URL is unroutable; rejection must happen before any request is made
        let result = transport(Some("http://127.0.0.1:9/rt-proxy"))
            .fetch("https://example.com/m/inception")
            .await;
        assert!(matches!(result, Err(AppError::HostNotAllowed(host)) if host == "example.com"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_unparseable_target() {
        let result = transport(Some("http://127.0.0.1:9/rt-proxy"))
            .fetch("/m/inception")
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}

/// Structured ratings API (OMDb)
///
/// Queried by IMDB ID; the response carries a `Ratings` list of `{Source, Value}` pairs and
/// the `"Rotten Tomatoes"` entry is the critic score. The endpoint may be OMDb itself
/// (`OMDB_API_KEY` set) or a proxy that injects the key (`PROXY_API_KEY` sent as
/// credentials).
use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::OmdbResponse,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingsApi: Send + Sync {
    /// Critic percentage for the title, `None` when the API has no usable rating
    async fn rotten_tomatoes_score(&self, imdb_id: &str) -> AppResult<Option<u8>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

pub struct OmdbClient {
    http_client: HttpClient,
    api_url: String,
    api_key: Option<String>,
    proxy_api_key: Option<String>,
}

impl OmdbClient {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        proxy_api_key: Option<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            http_client: HttpClient::builder().timeout(timeout).build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            proxy_api_key: proxy_api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Builds a client when `OMDB_URL` is configured
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        match config.omdb_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(Some(Self::new(
                url.to_string(),
                config.omdb_api_key.clone(),
                config.proxy_api_key.clone(),
                config.scrape_timeout(),
            )?)),
            _ => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl RatingsApi for OmdbClient {
    async fn rotten_tomatoes_score(&self, imdb_id: &str) -> AppResult<Option<u8>> {
        if imdb_id.trim().is_empty() {
            return Err(AppError::InvalidInput("IMDB ID cannot be empty".to_string()));
        }

        let mut request = self
            .http_client
            .get(&self.api_url)
            .query(&[("i", imdb_id), ("tomatoes", "true")]);

        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }
        if let Some(key) = &self.proxy_api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(imdb_id = %imdb_id, status = %status, "OMDb request failed");
            return Err(AppError::upstream_rejected(status.as_u16(), &body));
        }

        let details: OmdbResponse = response.json().await?;

        if let Some(error) = &details.error {
            tracing::debug!(imdb_id = %imdb_id, error = %error, "OMDb returned no title");
        }

        let score = details.rotten_tomatoes_score();
        tracing::debug!(imdb_id = %imdb_id, score = ?score, provider = "omdb", "OMDb lookup completed");

        Ok(score)
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_from_config_unset_url() {
        let config = Config::default();
        assert!(OmdbClient::from_config(&config).unwrap().is_none());

        let config = Config {
            omdb_url: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(OmdbClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_from_config_trims_url() {
        let config = Config {
            omdb_url: Some("https://proxy.local/functions/v1/omdb-proxy/".to_string()),
            omdb_api_key: Some("".to_string()),
            ..Config::default()
        };
        let client = OmdbClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.api_url, "https://proxy.local/functions/v1/omdb-proxy");
        assert!(client.api_key.is_none());
        assert_eq!(client.name(), "omdb");
    }

    #[tokio::test]
    async fn test_empty_imdb_id_is_rejected() {
        let client = OmdbClient::new(
            "http://127.0.0.1:9".to_string(),
            None,
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        let result = client.rotten_tomatoes_score(" ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_lookup_through_proxy_sends_credentials() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/omdb-proxy")
                    .query_param("i", "tt1375666")
                    .query_param("tomatoes", "true")
                    .header("apikey", "anon-key")
                    .header("authorization", "Bearer anon-key");
                then.status(200).json_body(serde_json::json!({
                    "Title": "Inception",
                    "Ratings": [
                        {"Source": "Internet Movie Database", "Value": "8.8/10"},
                        {"Source": "Rotten Tomatoes", "Value": "87%"}
                    ],
                    "Response": "True"
                }));
            })
            .await;

        let client = OmdbClient::new(
            server.url("/omdb-proxy"),
            None,
            Some("anon-key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let score = assert_ok!(client.rotten_tomatoes_score("tt1375666").await);
        assert_eq!(score, Some(87));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_rejected_by_upstream() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).query_param("apikey", "bad-key");
                then.status(401).body(r#"{"Response":"False","Error":"Invalid API key!"}"#);
            })
            .await;

        let client = OmdbClient::new(
            server.base_url(),
            Some("bad-key".to_string()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let error = assert_err!(client.rotten_tomatoes_score("tt1375666").await);
        assert!(matches!(error, AppError::UpstreamRejected { status: 401, .. }));
    }
}

use std::sync::Arc;

use tracing::instrument;

use crate::{
    cache::ResultCache,
    config::Config,
    error::{AppError, AppResult},
    models::{ScoreResult, ScoreSource, TitleQuery},
    services::{
        mock_scores::mock_score,
        normalize::normalize_title,
        parser::ScoreParser,
        rate_limiter::RateLimiter,
        ratings_api::{OmdbClient, RatingsApi},
        search::SearchResolver,
        transport::{ProxyTransport, ScrapeTransport},
    },
};

/// Rating resolution pipeline
///
/// Order of attempts for a title:
/// 1. Result cache (no network)
/// 2. Structured ratings API, when configured and the title has an IMDB ID
/// 3. Scrape: search page -> detail page -> HTML parser; found scores are cached
///
/// `resolve` never fails: every error on the way degrades to `None`.
#[derive(Clone)]
pub struct RatingResolver {
    cache: ResultCache,
    ratings_api: Option<Arc<dyn RatingsApi>>,
    transport: Arc<dyn ScrapeTransport>,
    limiter: Arc<RateLimiter>,
    search: SearchResolver,
    parser: Arc<ScoreParser>,
    mock_scores: bool,
}

impl RatingResolver {
    pub fn new(
        cache: ResultCache,
        transport: Arc<dyn ScrapeTransport>,
        limiter: Arc<RateLimiter>,
        upstream_base_url: &str,
    ) -> Self {
        let search = SearchResolver::new(transport.clone(), limiter.clone(), upstream_base_url);

        Self {
            cache,
            ratings_api: None,
            transport,
            limiter,
            search,
            parser: Arc::new(ScoreParser::default()),
            mock_scores: false,
        }
    }

    pub fn with_ratings_api(mut self, ratings_api: Arc<dyn RatingsApi>) -> Self {
        self.ratings_api = Some(ratings_api);
        self
    }

    pub fn with_mock_scores(mut self, enabled: bool) -> Self {
        self.mock_scores = enabled;
        self
    }

    /// Wires the production collaborators described by `config`
    pub fn from_config(config: &Config, cache: ResultCache) -> AppResult<Self> {
        let transport = Arc::new(ProxyTransport::from_config(config)?);
        if !transport.is_configured() {
            tracing::warn!("PROXY_URL not set, scrape fallback disabled");
        }

        let limiter = Arc::new(RateLimiter::new(config.scrape_delay()));
        let mut resolver = Self::new(cache, transport, limiter, &config.upstream_base_url)
            .with_mock_scores(config.mock_scores);

        match OmdbClient::from_config(config)? {
            Some(client) => resolver = resolver.with_ratings_api(Arc::new(client)),
            None => tracing::warn!("OMDB_URL not set, structured ratings API disabled"),
        }

        Ok(resolver)
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Resolves the score for a title; `None` means no rating is available
    #[instrument(skip(self, query), fields(title = %query))]
    pub async fn resolve(&self, query: &TitleQuery) -> Option<ScoreResult> {
        if let Some(cached) = self.cache.get(query).await {
            tracing::debug!(source = %cached.source, "Using cached score");
            return Some(cached);
        }

        if let Some(result) = self.try_ratings_api(query).await {
            return Some(result);
        }

        match self.scrape(query).await {
            Ok(Some(result)) => return Some(result),
            Ok(None) => tracing::info!("No score found on ratings site"),
            Err(e) if e.is_soft() => tracing::debug!(error = %e, "Scrape fallback skipped"),
            Err(e) => tracing::warn!(error = %e, "Scrape fallback failed"),
        }

        if self.mock_scores {
            tracing::info!("Serving mock score");
            return Some(mock_score(&query.title));
        }

        None
    }

    /// Resolves many titles concurrently, keeping the input order
    pub async fn resolve_many(&self, queries: Vec<TitleQuery>) -> Vec<Option<ScoreResult>> {
        tracing::info!(title_count = queries.len(), "Resolving scores batch");

        let mut tasks = Vec::new();
        for query in queries {
            let resolver = self.clone();
            tasks.push(tokio::spawn(async move { resolver.resolve(&query).await }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(error = %e, "Task join error");
                    results.push(None);
                }
            }
        }

        let resolved = results.iter().filter(|r| r.is_some()).count();
        tracing::info!(resolved, total = results.len(), "Scores batch resolved");

        results
    }

    async fn try_ratings_api(&self, query: &TitleQuery) -> Option<ScoreResult> {
        let api = self.ratings_api.as_ref()?;
        let imdb_id = query.imdb_id.as_deref().filter(|id| !id.trim().is_empty())?;

        match api.rotten_tomatoes_score(imdb_id).await {
            Ok(Some(score)) => {
                tracing::info!(provider = api.name(), score, "Ratings API score found");
                Some(ScoreResult::new(Some(score), None, None, ScoreSource::Api))
            }
            Ok(None) => {
                tracing::info!(provider = api.name(), "Ratings API has no score, trying scrape");
                None
            }
            Err(e) => {
                tracing::warn!(provider = api.name(), error = %e, "Ratings API failed, trying scrape");
                None
            }
        }
    }

    async fn scrape(&self, query: &TitleQuery) -> AppResult<Option<ScoreResult>> {
        if normalize_title(&query.title).is_empty() {
            return Err(AppError::NotFound(format!("nothing to search for in {:?}", query.title)));
        }

        let Some(url) = self.search.locate(query).await? else {
            return Ok(None);
        };

        self.limiter.acquire().await;
        let html = self.transport.fetch(&url).await?;

        let parsed = self.parser.parse(&html, &query.title);
        if !parsed.found {
            return Ok(None);
        }

        let result = parsed.into_result(ScoreSource::Scraped, Some(url));
        self.cache.put(query, result.clone()).await;

        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ratings_api::MockRatingsApi;
    use crate::services::transport::MockScrapeTransport;
    use std::time::Duration;

    const BASE: &str = "https://www.rottentomatoes.com";

    fn resolver(transport: MockScrapeTransport) -> RatingResolver {
        RatingResolver::new(
            ResultCache::default(),
            Arc::new(transport),
            Arc::new(RateLimiter::new(Duration::from_millis(1000))),
            BASE,
        )
    }

    fn inception_transport() -> MockScrapeTransport {
        let mut transport = MockScrapeTransport::new();
        transport
            .expect_fetch()
            .withf(|url| url.contains("/search?"))
            .times(1)
            .returning(|_| Ok(r#"<a href="/m/inception">Inception</a>"#.to_string()));
        transport
            .expect_fetch()
            .withf(|url| url.ends_with("/m/inception"))
            .times(1)
            .returning(|_| {
                Ok(r#"<score-board tomatometerscore="87" audiencescore="91"></score-board>"#
                    .to_string())
            });
        transport
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrape_path_resolves_and_caches() {
        let resolver = resolver(inception_transport());
        let query = TitleQuery::new("Inception", Some(2010));

        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(result.tomatometer, Some(87));
        assert_eq!(result.audience_score, Some(91));
        assert_eq!(result.source, ScoreSource::Scraped);
        assert_eq!(result.source_url.as_deref(), Some("https://www.rottentomatoes.com/m/inception"));
        assert!(result.found);

        // Served from cache: the transport expectations allow exactly one call each
        let cached = resolver.resolve(&query).await.unwrap();
        assert_eq!(cached, result);
        assert_eq!(resolver.cache().get(&query).await, Some(result));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_score_skips_scraping() {
        let mut transport = MockScrapeTransport::new();
        transport.expect_fetch().never();

        let mut api = MockRatingsApi::new();
        api.expect_rotten_tomatoes_score()
            .withf(|imdb_id| imdb_id.to_string() == "tt1375666")
            .times(1)
            .returning(|_| Ok(Some(87)));
        api.expect_name().return_const("omdb");

        let resolver = resolver(transport).with_ratings_api(Arc::new(api));
        let query = TitleQuery::new("Inception", Some(2010)).with_imdb_id("tt1375666");

        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(result.tomatometer, Some(87));
        assert_eq!(result.audience_score, None);
        assert_eq!(result.source, ScoreSource::Api);
        // API results are not cached at this layer
        assert!(resolver.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_error_falls_back_to_scrape() {
        let mut api = MockRatingsApi::new();
        api.expect_rotten_tomatoes_score()
            .times(1)
            .returning(|_| Err(AppError::upstream_rejected(401, "Invalid API key!")));
        api.expect_name().return_const("omdb");

        let resolver = resolver(inception_transport()).with_ratings_api(Arc::new(api));
        let query = TitleQuery::new("Inception", Some(2010)).with_imdb_id("tt1375666");

        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(result.source, ScoreSource::Scraped);
        assert_eq!(result.tomatometer, Some(87));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_without_rating_falls_back_to_scrape() {
        let mut api = MockRatingsApi::new();
        api.expect_rotten_tomatoes_score().times(1).returning(|_| Ok(None));
        api.expect_name().return_const("omdb");

        let resolver = resolver(inception_transport()).with_ratings_api(Arc::new(api));
        let query = TitleQuery::new("Inception", Some(2010)).with_imdb_id("tt1375666");

        assert_eq!(resolver.resolve(&query).await.unwrap().source, ScoreSource::Scraped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_not_called_without_imdb_id() {
        let mut api = MockRatingsApi::new();
        api.expect_rotten_tomatoes_score().never();

        let resolver = resolver(inception_transport()).with_ratings_api(Arc::new(api));
        let result = resolver.resolve(&TitleQuery::new("Inception", Some(2010))).await;
        assert_eq!(result.unwrap().source, ScoreSource::Scraped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_isolated() {
        let mut transport = MockScrapeTransport::new();
        transport
            .expect_fetch()
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));

        let resolver = resolver(transport);
        let query = TitleQuery::new("Inception", Some(2010));

        assert!(resolver.resolve(&query).await.is_none());
        assert!(resolver.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_page_error_is_isolated() {
        let mut transport = MockScrapeTransport::new();
        transport
            .expect_fetch()
            .withf(|url| url.contains("/search?"))
            .returning(|_| Ok(r#"<a href="/m/inception">Inception</a>"#.to_string()));
        transport
            .expect_fetch()
            .withf(|url| url.ends_with("/m/inception"))
            .returning(|_| Err(AppError::upstream_rejected(500, "Proxy error")));

        let resolver = resolver(transport);
        assert!(resolver
            .resolve(&TitleQuery::new("Inception", Some(2010)))
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_cached() {
        let mut transport = MockScrapeTransport::new();
        transport
            .expect_fetch()
            .withf(|url| url.contains("/search?"))
            .times(1)
            .returning(|_| Ok("<html>No results</html>".to_string()));
        transport
            .expect_fetch()
            .withf(|url| url.ends_with("/m/xyz_nonexistent_movie_9999"))
            .times(1)
            .returning(|_| Err(AppError::upstream_rejected(404, "Not Found")));

        let resolver = resolver(transport);
        let query = TitleQuery::new("XYZ Nonexistent Movie 9999", None);

        assert!(resolver.resolve(&query).await.is_none());
        assert!(resolver.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_page_is_not_cached() {
        let mut transport = MockScrapeTransport::new();
        transport
            .expect_fetch()
            .withf(|url| url.contains("/search?"))
            .returning(|_| Ok(r#"<a href="/m/inception">Inception</a>"#.to_string()));
        transport
            .expect_fetch()
            .withf(|url| url.ends_with("/m/inception"))
            .returning(|_| Ok("<html><body>Redesigned page</body></html>".to_string()));

        let resolver = resolver(transport);
        let query = TitleQuery::new("Inception", Some(2010));

        assert!(resolver.resolve(&query).await.is_none());
        assert!(resolver.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_scores_when_nothing_resolves() {
        let mut transport = MockScrapeTransport::new();
        transport
            .expect_fetch()
            .returning(|_| Err(AppError::NotConfigured("scrape proxy URL is not set".to_string())));

        let resolver = resolver(transport).with_mock_scores(true);
        let query = TitleQuery::new("Interstellar", Some(2014));

        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(result.source, ScoreSource::Mock);
        assert_eq!(result.tomatometer, Some(72));
        assert!(resolver.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_title_skips_network() {
        let mut transport = MockScrapeTransport::new();
        transport.expect_fetch().never();

        let resolver = resolver(transport);
        assert!(resolver.resolve(&TitleQuery::new("?!", None)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_many_keeps_order() {
        let mut transport = MockScrapeTransport::new();
        transport
            .expect_fetch()
            .withf(|url| url.contains("search=inception"))
            .returning(|_| Ok(r#"<a href="/m/inception">Inception</a>"#.to_string()));
        transport
            .expect_fetch()
            .withf(|url| url.ends_with("/m/inception"))
            .returning(|_| {
                Ok(r#"<score-board tomatometerscore="87" audiencescore="91"></score-board>"#
                    .to_string())
            });
        transport
            .expect_fetch()
            .withf(|url| url.contains("search=unknown"))
            .returning(|_| Err(AppError::upstream_rejected(503, "busy")));

        let resolver = resolver(transport);
        let results = resolver
            .resolve_many(vec![
                TitleQuery::new("Unknown Title", None),
                TitleQuery::new("Inception", Some(2010)),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_none());
        assert_eq!(results[1].as_ref().unwrap().tomatometer, Some(87));
    }
}

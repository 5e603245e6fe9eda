use std::sync::{Arc, LazyLock};

use regex::Regex;
use url::Url;

use crate::{
    error::{AppError, AppResult},
    models::TitleQuery,
    services::{
        normalize::{normalize_title, title_slug},
        rate_limiter::RateLimiter,
        transport::ScrapeTransport,
    },
};

/// Substrings that mark a page as a real detail page with scores on it
const SCORE_MARKERS: &[&str] = &["score-board", "tomatometer", "audiencescore"];

static MOVIE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(/m/[^"/?#]+)"#).unwrap());

static TV_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(/tv/[^"/?#]+)"#).unwrap());

/// Finds the detail-page URL for a title on the ratings site
#[derive(Clone)]
pub struct SearchResolver {
    transport: Arc<dyn ScrapeTransport>,
    limiter: Arc<RateLimiter>,
    base_url: String,
}

impl SearchResolver {
    pub fn new(
        transport: Arc<dyn ScrapeTransport>,
        limiter: Arc<RateLimiter>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            limiter,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Search page URL for a query: normalized title, plus the year when known
    pub fn search_url(&self, query: &TitleQuery) -> AppResult<String> {
        let mut search = normalize_title(&query.title);
        if let Some(year) = query.year {
            search.push(' ');
            search.push_str(&year.to_string());
        }

        let url = Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("search", search.as_str())],
        )
        .map_err(|e| AppError::Internal(format!("Failed to build search URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Guessed detail-page URL built straight from the title
    pub fn direct_url(&self, query: &TitleQuery) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            query.kind.path_prefix(),
            title_slug(&query.title)
        )
    }

    /// Locates the detail page for `query`
    ///
    /// Returns `Ok(None)` only when the search page has no detail links and the direct
    /// URL guess does not look like a score page. A failed search fetch is an error.
    pub async fn locate(&self, query: &TitleQuery) -> AppResult<Option<String>> {
        let search_url = self.search_url(query)?;
        tracing::debug!(search_url = %search_url, "Searching ratings site");

        self.limiter.acquire().await;
        let html = self.transport.fetch(&search_url).await?;

        let links = extract_links(&html);
        let normalized = normalize_title(&query.title);

        if links.is_empty() {
            return Ok(self.probe_direct_url(query).await);
        }

        if let Some(path) = best_match(&links, &normalized) {
            let url = format!("{}{}", self.base_url, path);
            tracing::info!(title = %query.title, url = %url, "Found detail page");
            return Ok(Some(url));
        }

        let url = format!("{}{}", self.base_url, links[0]);
        tracing::info!(
            title = %query.title,
            url = %url,
            candidates = links.len(),
            "No slug matched title, using first search result"
        );
        Ok(Some(url))
    }

    async fn probe_direct_url(&self, query: &TitleQuery) -> Option<String> {
        let url = self.direct_url(query);
        tracing::debug!(url = %url, "No search results, probing direct URL");

        self.limiter.acquire().await;
        match self.transport.fetch(&url).await {
            Ok(html) if has_score_markers(&html) => {
                tracing::info!(title = %query.title, url = %url, "Direct URL guess succeeded");
                Some(url)
            }
            Ok(_) => {
                tracing::debug!(url = %url, "Direct URL page has no score markers");
                None
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Direct URL probe failed");
                None
            }
        }
    }
}

/// Detail-page paths (`/m/<slug>` first, then `/tv/<slug>`), de-duplicated in page order
pub fn extract_links(html: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    for pattern in [&*MOVIE_LINK, &*TV_LINK] {
        for caps in pattern.captures_iter(html) {
            let path = &caps[1];
            if !links.iter().any(|existing| existing == path) {
                links.push(path.to_string());
            }
        }
    }

    links
}

/// Slug of a detail path as comparable text: `/m/the_dark_knight` -> `the dark knight`
fn slug_text(path: &str) -> String {
    let slug = path.rsplit('/').next().unwrap_or_default();
    normalize_title(&slug.replace(['_', '-'], " "))
}

/// First link whose slug contains the title or is contained by it
fn best_match<'a>(links: &'a [String], normalized_title: &str) -> Option<&'a String> {
    if normalized_title.is_empty() {
        return None;
    }

    links.iter().find(|path| {
        let slug = slug_text(path);
        !slug.is_empty() && (slug.contains(normalized_title) || normalized_title.contains(&slug))
    })
}

fn has_score_markers(html: &str) -> bool {
    let lowered = html.to_lowercase();
    SCORE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Whether a title is a movie or a TV series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Movie,
    Tv,
}

impl MediaKind {
    /// Path prefix the ratings site uses for detail pages of this kind
    pub fn path_prefix(&self) -> &'static str {
        match self {
            MediaKind::Movie => "m",
            MediaKind::Tv => "tv",
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            other => Err(format!("unknown media kind {:?}", other)),
        }
    }
}

/// Input to rating resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleQuery {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// IMDB ID (e.g., "tt1375666"), required for the structured ratings API
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub kind: MediaKind,
}

impl TitleQuery {
    pub fn new(title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            title: title.into(),
            year,
            imdb_id: None,
            kind: MediaKind::Movie,
        }
    }

    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }
}

impl Display for TitleQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => write!(f, "{}", self.title),
        }
    }
}

/// Where a score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Structured ratings API (OMDb)
    Api,
    /// Parsed out of the ratings site's HTML
    Scraped,
    /// Canned development data
    Mock,
}

impl Display for ScoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreSource::Api => write!(f, "api"),
            ScoreSource::Scraped => write!(f, "scraped"),
            ScoreSource::Mock => write!(f, "mock"),
        }
    }
}

/// Normalized rating handed back to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Critic score, 0-100
    pub tomatometer: Option<u8>,
    /// Audience score, 0-100
    pub audience_score: Option<u8>,
    pub source_url: Option<String>,
    pub source: ScoreSource,
    pub found: bool,
    pub fetched_at: DateTime<Utc>,
}

impl ScoreResult {
    pub fn new(
        tomatometer: Option<u8>,
        audience_score: Option<u8>,
        source_url: Option<String>,
        source: ScoreSource,
    ) -> Self {
        Self {
            tomatometer,
            audience_score,
            source_url,
            source,
            found: tomatometer.is_some() || audience_score.is_some(),
            fetched_at: Utc::now(),
        }
    }
}

// ============================================================================
// OMDb API Types
// ============================================================================

/// Source label OMDb uses for the critic score
pub const ROTTEN_TOMATOES_SOURCE: &str = "Rotten Tomatoes";

/// Raw response from OMDb `?i=<imdb id>`
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbResponse {
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Ratings", default)]
    pub ratings: Vec<OmdbRating>,
    /// "True" or "False"
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbRating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl OmdbResponse {
    /// Extracts the Rotten Tomatoes percentage, if present and well formed ("NN%")
    pub fn rotten_tomatoes_score(&self) -> Option<u8> {
        if self.response.as_deref() == Some("False") {
            return None;
        }

        let value = self
            .ratings
            .iter()
            .find(|r| r.source == ROTTEN_TOMATOES_SOURCE)?
            .value
            .trim();

        let digits = value.strip_suffix('%')?;
        if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        digits.parse::<u8>().ok().filter(|score| *score <= 100)
    }
}

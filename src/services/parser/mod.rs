//! HTML score parser
//!
//! Detail pages on the ratings site change layout often, so extraction is a fixed,
//! prioritized list of independent strategies. Each strategy reports whatever critic and
//! audience values it can find; the parser keeps the first value seen for each score and
//! stops as soon as both are known.

use crate::models::{ScoreResult, ScoreSource};

pub mod strategies;

pub use strategies::{EmbeddedJson, LoosePatterns, ScoreBoardAttributes};

/// Values a single strategy pulled out of a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extraction {
    pub tomatometer: Option<u8>,
    pub audience_score: Option<u8>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.tomatometer.is_some() && self.audience_score.is_some()
    }
}

/// A named way of pulling scores out of a detail page
pub trait ScoreStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_extract(&self, html: &str) -> Extraction;
}

/// Final parse outcome; `found` is true when at least one score was extracted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParsedScores {
    pub tomatometer: Option<u8>,
    pub audience_score: Option<u8>,
    pub found: bool,
}

impl ParsedScores {
    pub fn into_result(self, source: ScoreSource, source_url: Option<String>) -> ScoreResult {
        ScoreResult::new(self.tomatometer, self.audience_score, source_url, source)
    }
}

pub struct ScoreParser {
    strategies: Vec<Box<dyn ScoreStrategy>>,
}

impl Default for ScoreParser {
    fn default() -> Self {
        Self::with_strategies(vec![
            Box::new(ScoreBoardAttributes),
            Box::new(EmbeddedJson),
            Box::new(LoosePatterns),
        ])
    }
}

impl ScoreParser {
    pub fn with_strategies(strategies: Vec<Box<dyn ScoreStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extracts critic and audience scores; never fails, an empty result is valid
    pub fn parse(&self, html: &str, title: &str) -> ParsedScores {
        let mut merged = Extraction::default();

        for strategy in &self.strategies {
            let extraction = strategy.try_extract(html);
            tracing::trace!(
                strategy = strategy.name(),
                tomatometer = ?extraction.tomatometer,
                audience_score = ?extraction.audience_score,
                "Strategy result"
            );

            merged.tomatometer = merged.tomatometer.or(extraction.tomatometer);
            merged.audience_score = merged.audience_score.or(extraction.audience_score);

            if merged.is_complete() {
                break;
            }
        }

        let found = merged.tomatometer.is_some() || merged.audience_score.is_some();

        if found {
            tracing::info!(
                title = %title,
                tomatometer = ?merged.tomatometer,
                audience_score = ?merged.audience_score,
                "Parsed scores"
            );
        } else {
            tracing::debug!(title = %title, "No scores found in page");
        }

        ParsedScores {
            tomatometer: merged.tomatometer,
            audience_score: merged.audience_score,
            found,
        }
    }
}

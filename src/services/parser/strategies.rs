use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::{Extraction, ScoreStrategy};

/// Values the site is known to show in promotional chrome rather than as real scores
const JSON_DECOY_VALUES: &[u32] = &[99];
const SINGLE_MATCH_DECOY_VALUES: &[u32] = &[99, 100];

fn percentage(value: u32) -> Option<u8> {
    u8::try_from(value).ok().filter(|v| *v <= 100)
}

fn parse_percentage(raw: &str) -> Option<u8> {
    raw.trim().parse::<u32>().ok().and_then(percentage)
}

static SCORE_BOARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("score-board").unwrap());

/// Reads `tomatometerscore` / `audiencescore` attributes off the `<score-board>` element
///
/// Authoritative when present: if both attributes are valid nothing else is consulted.
pub struct ScoreBoardAttributes;

impl ScoreStrategy for ScoreBoardAttributes {
    fn name(&self) -> &'static str {
        "score_board_attributes"
    }

    fn try_extract(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);
        let Some(board) = document.select(&SCORE_BOARD).next() else {
            return Extraction::default();
        };

        let element = board.value();
        Extraction {
            tomatometer: element.attr("tomatometerscore").and_then(parse_percentage),
            audience_score: element.attr("audiencescore").and_then(parse_percentage),
        }
    }
}

static JSON_TOMATOMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"tomatometer"\s*:\s*"?(\d+)"#).unwrap());

static JSON_AUDIENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"audienceScore"\s*:\s*"?(\d+)"#).unwrap());

/// Pulls `"tomatometer": NN` / `"audienceScore": NN` out of inline script data
pub struct EmbeddedJson;

impl EmbeddedJson {
    fn extract(pattern: &Regex, html: &str, field: &str) -> Option<u8> {
        let raw: u32 = pattern.captures(html)?.get(1)?.as_str().parse().ok()?;

        if JSON_DECOY_VALUES.contains(&raw) {
            tracing::warn!(field, value = raw, "Discarding suspicious embedded JSON score");
            return None;
        }

        percentage(raw)
    }
}

impl ScoreStrategy for EmbeddedJson {
    fn name(&self) -> &'static str {
        "embedded_json"
    }

    fn try_extract(&self, html: &str) -> Extraction {
        Extraction {
            tomatometer: Self::extract(&JSON_TOMATOMETER, html, "tomatometer"),
            audience_score: Self::extract(&JSON_AUDIENCE, html, "audienceScore"),
        }
    }
}

static CRITIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)score-board__tomatometer[^>]*>[\s\S]*?(\d+)%",
        r"(?i)tomatometer[^>]*>[\s\S]*?(\d+)%",
        r"(?i)critics-score[^>]*>[\s\S]*?(\d+)%",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static AUDIENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)score-board__audience[^>]*>[\s\S]*?(\d+)%",
        r"(?i)audience[^>]*>[\s\S]*?(\d+)%",
        r"(?i)popcorn[^>]*>[\s\S]*?(\d+)%",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Class-name based percentage patterns, tried in priority order per score
///
/// With two or more matches the second is used, the first being promotional chrome.
/// A lone match of 99 or 100 is treated as promotional and skipped.
pub struct LoosePatterns;

impl LoosePatterns {
    fn extract(patterns: &[Regex], html: &str, field: &str) -> Option<u8> {
        patterns
            .iter()
            .find_map(|pattern| Self::from_pattern(pattern, html, field))
    }

    fn from_pattern(pattern: &Regex, html: &str, field: &str) -> Option<u8> {
        let values: Vec<u32> = pattern
            .captures_iter(html)
            .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
            .take(2)
            .collect();

        match values.as_slice() {
            [] => None,
            [only] if SINGLE_MATCH_DECOY_VALUES.contains(only) => {
                tracing::warn!(field, value = *only, "Discarding lone promotional-looking score");
                None
            }
            [only] => percentage(*only),
            [_, second, ..] => percentage(*second),
        }
    }
}

impl ScoreStrategy for LoosePatterns {
    fn name(&self) -> &'static str {
        "loose_patterns"
    }

    fn try_extract(&self, html: &str) -> Extraction {
        Extraction {
            tomatometer: Self::extract(&CRITIC_PATTERNS, html, "tomatometer"),
            audience_score: Self::extract(&AUDIENCE_PATTERNS, html, "audienceScore"),
        }
    }
}

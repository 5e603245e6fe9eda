use crate::models::{ScoreResult, ScoreSource};
use crate::services::normalize::normalize_title;

/// Canned (tomatometer, audience) pairs served in local development
const MOCK_SCORES: &[(&str, u8, u8)] = &[
    ("inception", 87, 91),
    ("avatar", 82, 83),
    ("the matrix", 88, 85),
    ("interstellar", 72, 86),
    ("avengers", 91, 91),
];

const DEFAULT_MOCK_SCORE: (u8, u8) = (75, 80);

/// Deterministic stand-in score for a title, matched by containment on the normalized title
pub fn mock_score(title: &str) -> ScoreResult {
    let normalized = normalize_title(title);

    let (tomatometer, audience_score) = MOCK_SCORES
        .iter()
        .find(|(key, _, _)| {
            !normalized.is_empty() && (normalized.contains(key) || key.contains(normalized.as_str()))
        })
        .map(|(_, tomatometer, audience)| (*tomatometer, *audience))
        .unwrap_or(DEFAULT_MOCK_SCORE);

    ScoreResult::new(Some(tomatometer), Some(audience_score), None, ScoreSource::Mock)
}

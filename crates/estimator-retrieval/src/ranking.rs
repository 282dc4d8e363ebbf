//! Composite relevance scoring.
//!
//! Each candidate gets three sub-scores which are blended with fixed weights:
//!
//! ```text
//! final = 0.6 * similarity + 0.3 * confidence + 0.1 * effort_proximity
//! ```
//!
//! - `similarity` is the store value written into `metadata.score`, used as
//!   is (missing → 0).
//! - `confidence` is `metadata.confidence` (missing → 0.5).
//! - `effort_proximity` is `1 - min(|u - c| / max(u, c), 1)` for a user hint
//!   `u` and candidate `effort_hours` `c`, or 0 when either is absent.
//!
//! Ranking is a pure function of its inputs.

use estimator_core::{
    CandidateRecord, QueryContext, ScoredRecord, KEY_CONFIDENCE, KEY_EFFORT_HOURS, KEY_SCORE,
};

pub const SIMILARITY_WEIGHT: f64 = 0.6;
pub const CONFIDENCE_WEIGHT: f64 = 0.3;
pub const EFFORT_WEIGHT: f64 = 0.1;

/// Confidence assumed for records that carry none.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// The three normalized inputs to the composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub similarity: f64,
    pub confidence: f64,
    pub effort_proximity: f64,
}

impl SubScores {
    /// Computes the sub-scores of one candidate for an optional effort hint.
    pub fn of(candidate: &CandidateRecord, user_effort_hours: Option<f64>) -> Self {
        Self {
            similarity: candidate.metadata_number(KEY_SCORE).unwrap_or(0.0),
            confidence: candidate
                .metadata_number(KEY_CONFIDENCE)
                .unwrap_or(NEUTRAL_CONFIDENCE),
            effort_proximity: effort_proximity(
                user_effort_hours,
                candidate.metadata_number(KEY_EFFORT_HOURS),
            ),
        }
    }

    pub fn composite(&self) -> f64 {
        SIMILARITY_WEIGHT * self.similarity
            + CONFIDENCE_WEIGHT * self.confidence
            + EFFORT_WEIGHT * self.effort_proximity
    }
}

/// Symmetric relative closeness of two effort figures, bounded to `[0, 1]`.
///
/// Returns 0 unless both figures are present, finite and positive.
pub fn effort_proximity(user_hours: Option<f64>, candidate_hours: Option<f64>) -> f64 {
    match (user_hours, candidate_hours) {
        (Some(u), Some(c)) if u.is_finite() && c.is_finite() && u > 0.0 && c > 0.0 => {
            let relative_gap = (u - c).abs() / u.max(c);
            1.0 - relative_gap.min(1.0)
        }
        _ => 0.0,
    }
}

/// Scores every candidate, sorts by final score descending and keeps the
/// first `context.top_k`.
///
/// The sort is stable: equal scores keep their retrieval order.
pub fn rank(candidates: Vec<CandidateRecord>, context: &QueryContext) -> Vec<ScoredRecord> {
    let mut scored: Vec<ScoredRecord> = candidates
        .into_iter()
        .map(|record| {
            let final_score = SubScores::of(&record, context.user_effort_hours).composite();
            ScoredRecord {
                record,
                final_score,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    scored.truncate(context.top_k);
    scored
}

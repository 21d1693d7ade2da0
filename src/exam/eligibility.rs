// src/exam/eligibility.rs

use serde::Serialize;

use crate::models::category::ExamCategory;
use crate::store::SettingsStore;

/// Result of comparing a score with the category threshold.
/// Callers always get the raw score and total alongside the verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamOutcome {
    pub score: usize,
    pub total: usize,
    /// `100 * score / total`, or 0 when there were no questions.
    pub percentage: f64,
    pub threshold: u8,
    pub passed: bool,
}

impl ExamOutcome {
    /// The boundary is inclusive. An empty exam is never a pass.
    pub fn evaluate(score: usize, total: usize, threshold: u8) -> Self {
        let threshold = threshold.min(100);

        if total == 0 {
            return Self {
                score: 0,
                total: 0,
                percentage: 0.0,
                threshold,
                passed: false,
            };
        }

        let percentage = score as f64 * 100.0 / total as f64;
        // Integer cross-multiplication avoids float rounding at the boundary.
        let passed = score * 100 >= usize::from(threshold) * total;

        Self {
            score,
            total,
            percentage,
            threshold,
            passed,
        }
    }
}

/// Looks up the pass percentage for `category`.
///
/// A missing setting or a failed lookup falls back to `fallback`; the exam
/// goes on either way.
pub async fn resolve_threshold<S>(settings: &S, category: ExamCategory, fallback: u8) -> u8
where
    S: SettingsStore + ?Sized,
{
    match settings.fetch_threshold(category).await {
        Ok(Some(value)) => value.min(100),
        Ok(None) => fallback,
        Err(e) => {
            tracing::warn!(%category, "Threshold lookup failed, using default {}: {}", fallback, e);
            fallback
        }
    }
}

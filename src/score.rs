use crate::models::{CandidateOrigin, EmailCandidate, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signal weights for candidate ranking. Tunable via config; the defaults
/// keep any directly-observed address above any generated one, and let
/// generated candidates decay with pattern conventionality.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringWeights {
    pub observed_weight: f64,
    pub pattern_base: f64,
    pub pattern_step: f64,
    pub role_weight: f64,
    pub recruiter_weight: f64,
    /// Added on a verified-valid verdict; sized to dwarf every other signal.
    pub verified_boost: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            observed_weight: 15.0,
            pattern_base: 6.0,
            pattern_step: 0.5,
            role_weight: 2.0,
            recruiter_weight: 4.0,
            verified_boost: 100.0,
        }
    }
}

/// Score and order candidates, best first. Total order with a lexical
/// tie-break on the address, so identical input always produces identical
/// output and re-ranking a ranked sequence is a no-op. Candidates with a
/// verified-invalid verdict are removed entirely.
pub fn rank(
    candidates: Vec<EmailCandidate>,
    weights: &ScoringWeights,
    verdicts: &HashMap<String, Verdict>,
) -> Vec<EmailCandidate> {
    let mut scored: Vec<EmailCandidate> = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            let verdict = verdicts
                .get(&candidate.address)
                .copied()
                .unwrap_or(Verdict::Unknown);
            if verdict == Verdict::Invalid {
                return None;
            }

            let mut score = match &candidate.origin {
                CandidateOrigin::Observed { .. } => weights.observed_weight,
                CandidateOrigin::Generated { pattern_index } => {
                    (weights.pattern_base - *pattern_index as f64 * weights.pattern_step).max(0.0)
                }
            };
            if let Some(contact) = &candidate.contact {
                if contact.title.is_some() {
                    score += if contact.is_recruiting_role() {
                        weights.recruiter_weight
                    } else {
                        weights.role_weight
                    };
                }
            }
            if verdict == Verdict::Valid {
                score += weights.verified_boost;
            }

            candidate.score = score;
            Some(candidate)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.address.cmp(&b.address))
    });
    scored
}

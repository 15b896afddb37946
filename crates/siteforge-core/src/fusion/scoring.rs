//! Section and overall confidence scores

use super::conf::{round2, Conf};
use super::profile::BusinessProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything that contains [`Conf`] leaves
pub trait ConfidenceLeaves {
    /// Push the confidence of every leaf, depth first
    fn collect_confidences(&self, out: &mut Vec<f64>);
}

impl<T> ConfidenceLeaves for Conf<T> {
    fn collect_confidences(&self, out: &mut Vec<f64>) {
        out.push(self.confidence);
    }
}

impl<T: ConfidenceLeaves> ConfidenceLeaves for Vec<T> {
    fn collect_confidences(&self, out: &mut Vec<f64>) {
        for item in self {
            item.collect_confidences(out);
        }
    }
}

/// Per-section means and their overall mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    /// Mean leaf confidence per section
    pub sections: BTreeMap<String, f64>,
    /// Mean of the section scores
    pub overall: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Mean leaf confidence of one section; 0 when it has no leaves
#[must_use]
pub fn section_score(section: &dyn ConfidenceLeaves) -> f64 {
    let mut leaves = Vec::new();
    section.collect_confidences(&mut leaves);
    round2(mean(&leaves))
}

/// Score every section and the profile overall
#[must_use]
pub fn summarize(profile: &BusinessProfile) -> ConfidenceSummary {
    let sections: BTreeMap<String, f64> = profile
        .sections()
        .into_iter()
        .map(|(name, section)| (name.to_string(), section_score(section)))
        .collect();
    let scores: Vec<f64> = sections.values().copied().collect();
    ConfidenceSummary {
        overall: round2(mean(&scores)),
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::conf::{SourceKind, SourceRef};
    use chrono::Utc;

    fn leaf(confidence: f64) -> Conf<String> {
        let mut c = Conf::from_source("x".to_string(), SourceRef::new(SourceKind::LlmInference, Utc::now()));
        c.confidence = confidence;
        c
    }

    #[test]
    fn test_section_score_is_mean_of_leaves() {
        let leaves = vec![leaf(0.9), leaf(0.5), leaf(0.4)];
        assert!((section_score(&leaves) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_section_scores_zero() {
        let leaves: Vec<Conf<String>> = Vec::new();
        assert_eq!(section_score(&leaves), 0.0);
    }
}

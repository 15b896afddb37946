//! Display policy derived from confidence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How prominently a value may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// Below 0.50: hide or show a placeholder
    Hide,
    /// 0.50 to 0.69
    Deemphasize,
    /// 0.70 to 0.84
    Standard,
    /// 0.85 and above
    Prominent,
}

impl ConfidenceBand {
    /// Lower bound of the band
    #[must_use]
    pub fn min_confidence(self) -> f64 {
        match self {
            Self::Prominent => 0.85,
            Self::Standard => 0.70,
            Self::Deemphasize => 0.50,
            Self::Hide => 0.0,
        }
    }

    /// Band of a confidence value
    #[must_use]
    pub fn classify(confidence: f64) -> Self {
        [Self::Prominent, Self::Standard, Self::Deemphasize]
            .into_iter()
            .find(|band| confidence >= band.min_confidence())
            .unwrap_or(Self::Hide)
    }
}

/// Minimum confidence per UI element, plus the band thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPolicy {
    /// UI element name to minimum confidence
    pub elements: BTreeMap<String, f64>,
    /// Band name to lower bound
    pub bands: BTreeMap<String, f64>,
}

const ELEMENT_MINIMUMS: &[(&str, f64)] = &[
    ("hero_headline", 0.50),
    ("business_name", 0.70),
    ("phone_cta", 0.70),
    ("email_link", 0.70),
    ("address_map", 0.85),
    ("opening_hours", 0.70),
    ("booking_button", 0.85),
    ("rating_badge", 0.85),
    ("reviews", 0.70),
    ("services", 0.50),
    ("faq", 0.50),
    ("payment_methods", 0.50),
    ("amenities", 0.50),
    ("social_links", 0.70),
    ("photo_gallery", 0.50),
];

impl Default for UiPolicy {
    fn default() -> Self {
        Self {
            elements: ELEMENT_MINIMUMS
                .iter()
                .map(|(name, min)| (name.to_string(), *min))
                .collect(),
            bands: [
                ConfidenceBand::Prominent,
                ConfidenceBand::Standard,
                ConfidenceBand::Deemphasize,
                ConfidenceBand::Hide,
            ]
            .into_iter()
            .map(|b| {
                let name = match b {
                    ConfidenceBand::Prominent => "prominent",
                    ConfidenceBand::Standard => "standard",
                    ConfidenceBand::Deemphasize => "deemphasize",
                    ConfidenceBand::Hide => "hide",
                };
                (name.to_string(), b.min_confidence())
            })
            .collect(),
        }
    }
}

impl UiPolicy {
    /// Whether `element` may be shown at `confidence`; unknown elements need the de-emphasize minimum (0.50)
    #[must_use]
    pub fn allows(&self, element: &str, confidence: f64) -> bool {
        let min = self
            .elements
            .get(element)
            .copied()
            .unwrap_or(ConfidenceBand::Deemphasize.min_confidence());
        confidence >= min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        assert_eq!(ConfidenceBand::classify(0.98), ConfidenceBand::Prominent);
        assert_eq!(ConfidenceBand::classify(0.85), ConfidenceBand::Prominent);
        assert_eq!(ConfidenceBand::classify(0.84), ConfidenceBand::Standard);
        assert_eq!(ConfidenceBand::classify(0.70), ConfidenceBand::Standard);
        assert_eq!(ConfidenceBand::classify(0.69), ConfidenceBand::Deemphasize);
        assert_eq!(ConfidenceBand::classify(0.50), ConfidenceBand::Deemphasize);
        assert_eq!(ConfidenceBand::classify(0.49), ConfidenceBand::Hide);
        assert_eq!(ConfidenceBand::classify(0.0), ConfidenceBand::Hide);
    }

    #[test]
    fn test_policy_table() {
        let policy = UiPolicy::default();
        assert!(policy.allows("address_map", 0.92));
        assert!(!policy.allows("address_map", 0.80));
        assert!(policy.allows("phone_cta", 0.70));
        assert!(!policy.allows("unknown_widget", 0.40));
        assert_eq!(policy.bands["standard"], 0.70);
    }

    #[test]
    fn test_unknown_element_uses_deemphasize_minimum() {
        let policy = UiPolicy::default();
        assert!(policy.allows("unknown_widget", 0.50));
        assert!(policy.allows("unknown_widget", 0.60));
        assert!(!policy.allows("unknown_widget", 0.49));
    }
}

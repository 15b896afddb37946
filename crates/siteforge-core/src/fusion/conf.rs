//! Confidence-annotated values
//!
//! Every leaf of a fused profile is a [`Conf`]: a value, a confidence in
//! `[0, 1]`, the sources backing it and a placeholder flag. Confidence is
//! derived from the source kind and adjusted for missing or placeholder
//! values; merging two `Conf`s applies the corroboration boost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence ceiling after corroboration
pub const MAX_CONFIDENCE: f64 = 0.98;
/// Deduction for a missing or empty value
pub const MISSING_PENALTY: f64 = 0.15;
/// Deduction for an explicit placeholder
pub const PLACEHOLDER_PENALTY: f64 = 0.10;
/// Deduction for fields only a model can claim and nobody corroborates
pub const LLM_ONLY_PENALTY: f64 = 0.15;

/// Where a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Typed in by the site owner
    UserProvided,
    /// Places / business directory lookup
    DirectoryLookup,
    /// Language-model research
    LlmInference,
    /// Derived by this system from other fields
    InternalInference,
    /// Stand-in content awaiting a real asset
    StockPlaceholder,
}

impl SourceKind {
    /// Starting confidence for values from this kind of source
    #[must_use]
    pub fn base_confidence(self) -> f64 {
        match self {
            Self::UserProvided => 0.90,
            Self::DirectoryLookup => 0.92,
            Self::LlmInference => 0.50,
            Self::InternalInference => 0.45,
            Self::StockPlaceholder => 0.30,
        }
    }

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserProvided => "user_provided",
            Self::DirectoryLookup => "directory_lookup",
            Self::LlmInference => "llm_inference",
            Self::InternalInference => "internal_inference",
            Self::StockPlaceholder => "stock_placeholder",
        }
    }
}

/// One source backing a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source kind
    pub kind: SourceKind,
    /// Source-specific id (place id, prompt key, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Source URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// When the source was read
    pub retrieved_at: DateTime<Utc>,
    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SourceRef {
    /// Source of `kind` read at `retrieved_at`
    #[must_use]
    pub fn new(kind: SourceKind, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            id: None,
            url: None,
            retrieved_at,
            notes: None,
        }
    }

    /// Set the id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the note
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// De-duplication identity: kind plus id, else url
    fn identity(&self) -> (SourceKind, Option<&str>) {
        (self.kind, self.id.as_deref().or(self.url.as_deref()))
    }
}

/// Whether a value counts as present
pub trait Presence {
    /// `false` for empty or missing values
    fn is_present(&self) -> bool;
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

/// Round to two decimals
#[must_use]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Boost for the number of distinct source kinds backing a value
#[must_use]
pub fn corroboration_boost(distinct_kinds: usize) -> f64 {
    match distinct_kinds {
        0 | 1 => 0.0,
        2 => 0.08,
        3 => 0.15,
        _ => 0.20,
    }
}

/// A value annotated with confidence and provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conf<T> {
    /// The value
    pub value: T,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Sources backing the value
    pub sources: Vec<SourceRef>,
    /// Why the confidence is what it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Latest retrieval time among the sources
    pub last_verified_at: DateTime<Utc>,
    /// Stand-in value awaiting real content
    #[serde(default)]
    pub is_placeholder: bool,
}

impl<T: Presence> Conf<T> {
    /// Value read from a single source
    #[must_use]
    pub fn from_source(value: T, source: SourceRef) -> Self {
        Self::build(value, source, false)
    }

    /// Explicit stand-in value
    #[must_use]
    pub fn placeholder(value: T, source: SourceRef) -> Self {
        Self::build(value, source, true)
    }

    fn build(value: T, source: SourceRef, is_placeholder: bool) -> Self {
        let mut confidence = source.kind.base_confidence();
        let mut rationale = None;
        if !value.is_present() {
            confidence -= MISSING_PENALTY;
            rationale = Some("no value found".to_string());
        }
        if is_placeholder {
            confidence -= PLACEHOLDER_PENALTY;
            rationale = Some("placeholder awaiting real content".to_string());
        }
        Self {
            value,
            confidence: round2(confidence.clamp(0.0, 1.0)),
            last_verified_at: source.retrieved_at,
            sources: vec![source],
            rationale,
            is_placeholder,
        }
    }

    /// Whether the value is present
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.value.is_present()
    }

    /// Deduct `amount`, recording `reason`
    #[must_use]
    pub fn with_penalty(mut self, amount: f64, reason: &str) -> Self {
        self.confidence = round2((self.confidence - amount).max(0.0));
        self.rationale = Some(reason.to_string());
        self
    }

    /// Number of distinct source kinds backing the value
    #[must_use]
    pub fn distinct_kinds(&self) -> usize {
        let mut kinds: Vec<SourceKind> = self.sources.iter().map(|s| s.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds.len()
    }

    /// Merge another observation of the same field
    ///
    /// The higher-confidence side supplies the value (ties keep `self`).
    /// A missing side never wins over a present one and adds no sources.
    /// When both are present, sources are unioned and the corroboration
    /// boost for the resulting number of distinct kinds is applied.
    #[must_use]
    pub fn merge(self, other: Conf<T>) -> Conf<T> {
        match (self.is_present(), other.is_present()) {
            (true, false) | (false, false) => self,
            (false, true) => other,
            (true, true) => {
                let (mut primary, secondary) = if other.confidence > self.confidence {
                    (other, self)
                } else {
                    (self, other)
                };
                for source in secondary.sources {
                    if !primary
                        .sources
                        .iter()
                        .any(|s| s.identity() == source.identity())
                    {
                        primary.sources.push(source);
                    }
                }
                primary.last_verified_at = primary.last_verified_at.max(secondary.last_verified_at);

                let kinds = primary.distinct_kinds();
                let boost = corroboration_boost(kinds);
                if boost > 0.0 {
                    primary.confidence =
                        round2((primary.confidence + boost).min(MAX_CONFIDENCE).max(primary.confidence));
                    primary.rationale = Some(format!("corroborated by {kinds} source kinds"));
                }
                primary
            }
        }
    }
}

/// Merge every candidate into the first, in order
pub fn merge_all<T: Presence>(first: Conf<T>, rest: impl IntoIterator<Item = Conf<T>>) -> Conf<T> {
    rest.into_iter().fold(first, Conf::merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn conf(value: &str, kind: SourceKind) -> Conf<String> {
        Conf::from_source(value.to_string(), SourceRef::new(kind, at()))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_base_confidence_and_penalties() {
        assert!(approx(conf("555-0100", SourceKind::LlmInference).confidence, 0.50));
        assert!(approx(conf("", SourceKind::LlmInference).confidence, 0.35));
        assert!(approx(conf("  ", SourceKind::DirectoryLookup).confidence, 0.77));

        let placeholder = Conf::placeholder(
            "generated".to_string(),
            SourceRef::new(SourceKind::StockPlaceholder, at()),
        );
        assert!(placeholder.is_placeholder);
        assert!(approx(placeholder.confidence, 0.20));
    }

    #[test]
    fn test_empty_value_is_penalized_for_every_kind() {
        for kind in [
            SourceKind::UserProvided,
            SourceKind::DirectoryLookup,
            SourceKind::LlmInference,
            SourceKind::InternalInference,
            SourceKind::StockPlaceholder,
        ] {
            let c = conf("", kind);
            assert!(c.confidence <= kind.base_confidence() - MISSING_PENALTY + 1e-9);
        }
    }

    #[test]
    fn test_merge_prefers_higher_confidence() {
        let merged = conf("555-0100", SourceKind::LlmInference)
            .merge(conf("555-0199", SourceKind::DirectoryLookup));
        assert_eq!(merged.value, "555-0199");
        assert!(approx(merged.confidence, MAX_CONFIDENCE));
        assert_eq!(merged.sources.len(), 2);
    }

    #[test]
    fn test_merge_tie_keeps_receiver() {
        let merged = conf("a", SourceKind::LlmInference).merge(conf("b", SourceKind::LlmInference));
        assert_eq!(merged.value, "a");
        // same kind, no corroboration
        assert!(approx(merged.confidence, 0.50));
    }

    #[test]
    fn test_missing_side_never_wins() {
        let present = conf("555-0100", SourceKind::LlmInference);
        let merged = present.clone().merge(conf("", SourceKind::DirectoryLookup));
        assert_eq!(merged, present);

        let merged = conf("", SourceKind::UserProvided).merge(present.clone());
        assert_eq!(merged, present);
    }

    #[test]
    fn test_boost_is_monotone_and_capped() {
        let kinds = [
            SourceKind::InternalInference,
            SourceKind::LlmInference,
            SourceKind::DirectoryLookup,
            SourceKind::UserProvided,
        ];
        let mut merged = conf("Acme", kinds[0]);
        let mut last = merged.confidence;
        for kind in &kinds[1..] {
            merged = merged.merge(conf("Acme", *kind));
            assert!(merged.confidence >= last);
            assert!(merged.confidence <= MAX_CONFIDENCE);
            last = merged.confidence;
        }
        assert_eq!(merged.distinct_kinds(), 4);
        assert!(approx(merged.confidence, MAX_CONFIDENCE));
    }

    #[test]
    fn test_sources_deduplicated_by_identity() {
        let source = SourceRef::new(SourceKind::DirectoryLookup, at()).with_id("place-1");
        let a = Conf::from_source("x".to_string(), source.clone());
        let b = Conf::from_source("x".to_string(), source);
        let merged = a.merge(b);
        assert_eq!(merged.sources.len(), 1);
        assert!(approx(merged.confidence, 0.92));
    }

    #[test]
    fn test_corroboration_schedule() {
        assert!(approx(corroboration_boost(1), 0.0));
        assert!(approx(corroboration_boost(2), 0.08));
        assert!(approx(corroboration_boost(3), 0.15));
        assert!(approx(corroboration_boost(4), 0.20));
        assert!(approx(corroboration_boost(9), 0.20));
    }

    #[test]
    fn test_llm_only_penalty() {
        let c = conf("cash, card", SourceKind::LlmInference).with_penalty(LLM_ONLY_PENALTY, "model only");
        assert!(approx(c.confidence, 0.35));
    }
}

//! Confidence Fusion
//!
//! Merges independently researched, possibly conflicting sources into one
//! provenance-annotated [`BusinessProfile`]:
//! - conf: `Conf<T>`, source kinds, the merge and boost rules
//! - research / inputs: typed fusion inputs
//! - images: business type detection and photo policy
//! - scoring / policy: section confidence and display bands
//! - engine: the fusion pass itself

pub mod conf;
pub mod engine;
pub mod images;
pub mod inputs;
pub mod policy;
pub mod profile;
pub mod research;
pub mod scoring;

pub use conf::{corroboration_boost, Conf, Presence, SourceKind, SourceRef};
pub use engine::{FusionEngine, FusionInput, FusionOutput, Provenance, ResearchBundle};
pub use images::BusinessType;
pub use inputs::{GeoPoint, PlacePhoto, PlacesResult, Review, UserInputs};
pub use policy::{ConfidenceBand, UiPolicy};
pub use profile::{BusinessProfile, MediaKind, GENERATED_PLACEHOLDER};
pub use research::{
    parse_research, BrandResearch, ImageResearch, ProfileResearch, ResearchDocument,
    SellingPointsResearch, SocialResearch,
};
pub use scoring::ConfidenceSummary;

//! Confidence Fusion Engine
//!
//! Turns five research documents, an optional directory lookup and the
//! owner's own inputs into one [`BusinessProfile`]. Field precedence:
//! - identity contact fields merge user input, directory and model research
//! - hours, geo, rating and reviews merge directory and model research
//! - descriptive fields come from model research only

use super::conf::{merge_all, Conf, Presence, SourceKind, SourceRef, LLM_ONLY_PENALTY};
use super::images::{is_relevant, is_stock_photo, BusinessType};
use super::inputs::{non_blank, PlacesResult, UserInputs};
use super::policy::UiPolicy;
use super::profile::*;
use super::research::{
    BrandResearch, ImageResearch, ProfileResearch, ResearchDocument, SellingPointsResearch,
    SocialResearch,
};
use super::scoring::{summarize, ConfidenceSummary};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// The five research documents of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchBundle {
    /// Core business facts
    pub profile: ProfileResearch,
    /// Social presence
    pub social: SocialResearch,
    /// Brand identity
    pub brand: BrandResearch,
    /// Marketing copy
    pub selling_points: SellingPointsResearch,
    /// Image concepts
    pub images: ImageResearch,
}

impl ResearchBundle {
    /// Validate every document
    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        self.social.validate()?;
        self.brand.validate()?;
        self.selling_points.validate()?;
        self.images.validate()
    }
}

/// Everything fusion consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionInput {
    /// Model research
    pub research: ResearchBundle,
    /// Directory lookup, when one succeeded
    pub places: Option<PlacesResult>,
    /// Owner-supplied facts
    pub user: UserInputs,
}

/// Where the profile came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// When fusion ran
    pub generated_at: DateTime<Utc>,
    /// Input documents supplied
    pub documents: Vec<String>,
    /// Source kinds that contributed a value
    pub source_kinds: BTreeSet<SourceKind>,
    /// Directory place id, when looked up
    pub place_id: Option<String>,
    /// Detected coarse business type
    pub business_type: BusinessType,
    /// Prompt id to the exact key used (filled by the pipeline)
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
}

/// Result of fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionOutput {
    /// The unified profile
    pub profile: BusinessProfile,
    /// Provenance
    pub provenance: Provenance,
    /// Section and overall confidence
    pub confidence: ConfidenceSummary,
    /// Human-readable gaps, never errors
    pub warnings: Vec<String>,
    /// Display thresholds for downstream rendering
    pub ui_policy: UiPolicy,
}

/// Merges research sources into a confidence-annotated profile
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    policy: UiPolicy,
}

impl FusionEngine {
    /// Engine with the default UI policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom UI policy
    #[must_use]
    pub fn with_policy(mut self, policy: UiPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fuse `input`, stamping sources with the current time
    pub fn fuse(&self, input: &FusionInput) -> Result<FusionOutput> {
        self.fuse_at(input, Utc::now())
    }

    /// Fuse `input`, stamping sources with `now`
    pub fn fuse_at(&self, input: &FusionInput, now: DateTime<Utc>) -> Result<FusionOutput> {
        input.research.validate()?;

        let research = &input.research;
        let business_type = BusinessType::detect(&research.profile.business_type);
        let mut fuser = Fuser::new(now, input.places.as_ref());

        let identity = fuser.identity(&research.profile, &input.user);
        let profile = BusinessProfile {
            operations: fuser.operations(&research.profile),
            offerings: fuser.offerings(&research.profile),
            trust: fuser.trust(&research.profile, &research.social),
            brand: fuser.brand(&research.brand),
            marketing: fuser.marketing(&research.selling_points),
            media: fuser.media(&research.images, &identity.name.value, business_type),
            seo: fuser.seo(&research.selling_points, &identity),
            identity,
        };

        let warnings = collect_warnings(&profile);
        let confidence = summarize(&profile);

        let mut documents: Vec<String> = ["profile", "social", "brand", "selling_points", "images"]
            .iter()
            .map(|d| d.to_string())
            .collect();
        if input.places.is_some() {
            documents.push("places".to_string());
        }

        info!(
            business_type = %business_type,
            overall = confidence.overall,
            warnings = warnings.len(),
            "Fused business profile"
        );

        Ok(FusionOutput {
            provenance: Provenance {
                generated_at: now,
                documents,
                source_kinds: fuser.used,
                place_id: input.places.as_ref().map(|p| p.place_id.clone()),
                business_type,
                prompts: BTreeMap::new(),
            },
            profile,
            confidence,
            warnings,
            ui_policy: self.policy.clone(),
        })
    }
}

/// Per-run fusion state: source stamps and the kinds that contributed
struct Fuser<'a> {
    now: DateTime<Utc>,
    places: Option<&'a PlacesResult>,
    used: BTreeSet<SourceKind>,
}

impl<'a> Fuser<'a> {
    fn new(now: DateTime<Utc>, places: Option<&'a PlacesResult>) -> Self {
        Self {
            now,
            places,
            used: BTreeSet::new(),
        }
    }

    fn note<T: Presence>(&mut self, conf: Conf<T>) -> Conf<T> {
        if conf.is_present() {
            self.used.extend(conf.sources.iter().map(|s| s.kind));
        }
        conf
    }

    fn llm<T: Presence>(&mut self, value: T, document: &str) -> Conf<T> {
        let source = SourceRef::new(SourceKind::LlmInference, self.now).with_id(format!("research:{document}"));
        self.note(Conf::from_source(value, source))
    }

    fn llm_text(&mut self, value: &str, document: &str) -> Conf<String> {
        self.llm(value.trim().to_string(), document)
    }

    /// Model-only fields that nothing can corroborate
    fn llm_only(&mut self, value: &[String], document: &str) -> Conf<Vec<String>> {
        self.llm(clean_list(value), document)
            .with_penalty(LLM_ONLY_PENALTY, "model inference only, uncorroborated")
    }

    fn directory<T: Presence>(&mut self, pick: impl FnOnce(&PlacesResult) -> T) -> Option<Conf<T>> {
        let places = self.places?;
        let source = SourceRef::new(SourceKind::DirectoryLookup, self.now).with_id(places.place_id.clone());
        let conf = Conf::from_source(pick(places), source);
        conf.is_present().then(|| self.note(conf))
    }

    fn user(&mut self, value: &Option<String>) -> Option<Conf<String>> {
        let value = non_blank(value)?;
        let source = SourceRef::new(SourceKind::UserProvided, self.now);
        Some(self.note(Conf::from_source(value.to_string(), source)))
    }

    fn contact(
        &mut self,
        research: &str,
        directory: impl FnOnce(&PlacesResult) -> String,
        user: &Option<String>,
    ) -> Conf<String> {
        let llm = self.llm_text(research, "profile");
        let dir = self.directory(directory);
        let user = self.user(user);
        merge_all(llm, dir.into_iter().chain(user))
    }

    fn identity(&mut self, p: &ProfileResearch, user: &UserInputs) -> IdentitySection {
        let geo = self.directory(|pl| pl.geo).unwrap_or_else(|| {
            let source = SourceRef::new(
                if self.places.is_some() { SourceKind::DirectoryLookup } else { SourceKind::LlmInference },
                self.now,
            );
            Conf::from_source(None, source)
        });
        IdentitySection {
            name: self.contact(&p.business_name, |pl| pl.name.clone(), &user.business_name),
            business_type: self.llm_text(&p.business_type, "profile"),
            tagline: self.llm_text(&p.tagline, "profile"),
            description: self.llm_text(&p.description, "profile"),
            phone: self.contact(&p.phone, |pl| pl.phone.clone().unwrap_or_default(), &user.phone),
            email: self.contact(&p.email, |_| String::new(), &user.email),
            website: self.contact(&p.website, |pl| pl.website.clone().unwrap_or_default(), &user.website),
            address: self.contact(&p.address, |pl| pl.address.clone().unwrap_or_default(), &user.address),
            geo,
        }
    }

    fn operations(&mut self, p: &ProfileResearch) -> OperationsSection {
        let hours = self.llm(clean_list(&p.hours), "profile");
        let dir_hours = self.directory(|pl| clean_list(&pl.hours));
        OperationsSection {
            hours: merge_all(hours, dir_hours),
            payment_methods: self.llm_only(&p.payment_methods, "profile"),
            accessibility: self.llm_only(&p.accessibility, "profile"),
            amenities: self.llm_only(&p.amenities, "profile"),
            languages: self.llm_only(&p.languages, "profile"),
            service_area: self.llm_text(&p.service_area, "profile"),
            booking_url: self.llm_text(&p.booking_url, "profile"),
        }
    }

    fn offerings(&mut self, p: &ProfileResearch) -> OfferingsSection {
        OfferingsSection {
            services: p
                .services
                .iter()
                .map(|s| ServiceEntry {
                    name: self.llm_text(&s.name, "profile"),
                    description: self.llm_text(&s.description, "profile"),
                    price: self.llm_text(&s.price, "profile"),
                })
                .collect(),
        }
    }

    fn trust(&mut self, p: &ProfileResearch, social: &SocialResearch) -> TrustSection {
        let rating = self.llm(social.rating, "social");
        let dir_rating = self.directory(|pl| pl.rating);
        let review_count = self.llm(social.review_count, "social");
        let dir_count = self.directory(|pl| pl.review_count);

        let mut reviews = Vec::new();
        let mut seen = BTreeSet::new();
        if let Some(places) = self.places {
            let now = self.now;
            let source = || SourceRef::new(SourceKind::DirectoryLookup, now).with_id(places.place_id.clone());
            for review in &places.reviews {
                if review.text.trim().is_empty() || !seen.insert(review.text.trim().to_lowercase()) {
                    continue;
                }
                reviews.push(ReviewEntry {
                    author: Conf::from_source(review.author.trim().to_string(), source()),
                    rating: Conf::from_source(review.rating, source()),
                    text: self.note(Conf::from_source(review.text.trim().to_string(), source())),
                });
            }
        }
        for review in &social.reviews {
            if review.text.trim().is_empty() || !seen.insert(review.text.trim().to_lowercase()) {
                continue;
            }
            reviews.push(ReviewEntry {
                author: self.llm_text(&review.author, "social"),
                rating: self.llm(review.rating, "social"),
                text: self.llm_text(&review.text, "social"),
            });
        }

        TrustSection {
            rating: merge_all(rating, dir_rating),
            review_count: merge_all(review_count, dir_count),
            reviews,
            faq: p
                .faq
                .iter()
                .map(|f| FaqEntry {
                    question: self.llm_text(&f.question, "profile"),
                    answer: self.llm_text(&f.answer, "profile"),
                })
                .collect(),
            social_profiles: social
                .profiles
                .iter()
                .map(|s| SocialLink {
                    platform: self.llm_text(&s.platform, "social"),
                    url: self.llm_text(&s.url, "social"),
                })
                .collect(),
        }
    }

    fn brand(&mut self, b: &BrandResearch) -> BrandSection {
        BrandSection {
            primary_color: self.llm_text(&b.primary_color, "brand"),
            secondary_color: self.llm_text(&b.secondary_color, "brand"),
            accent_color: self.llm_text(&b.accent_color, "brand"),
            heading_font: self.llm_text(&b.heading_font, "brand"),
            body_font: self.llm_text(&b.body_font, "brand"),
            tone: self.llm_text(&b.tone, "brand"),
            voice: self.llm(clean_list(&b.voice), "brand"),
        }
    }

    fn marketing(&mut self, s: &SellingPointsResearch) -> MarketingSection {
        MarketingSection {
            headline: self.llm_text(&s.headline, "selling_points"),
            selling_points: s
                .selling_points
                .iter()
                .map(|p| SellingPointEntry {
                    title: self.llm_text(&p.title, "selling_points"),
                    description: self.llm_text(&p.description, "selling_points"),
                })
                .collect(),
            target_audience: self.llm_text(&s.target_audience, "selling_points"),
            call_to_action: self.llm_text(&s.call_to_action, "selling_points"),
        }
    }

    fn placeholder(&mut self, alt: Conf<String>, prompt: String) -> MediaItem {
        let source = SourceRef::new(SourceKind::StockPlaceholder, self.now);
        MediaItem {
            kind: MediaKind::GeneratedPlaceholder,
            url: self.note(Conf::placeholder(GENERATED_PLACEHOLDER.to_string(), source)),
            alt,
            generation_prompt: Some(prompt),
        }
    }

    fn media(&mut self, images: &ImageResearch, name: &str, business_type: BusinessType) -> MediaSection {
        let mut items = Vec::new();

        if let Some(places) = self.places {
            for photo in &places.photos {
                if photo.url.trim().is_empty() || !is_relevant(&photo.caption, name, business_type) {
                    continue;
                }
                let source = SourceRef::new(SourceKind::DirectoryLookup, self.now).with_id(places.place_id.clone());
                let alt = Conf::from_source(photo.caption.trim().to_string(), source.clone());
                if is_stock_photo(&photo.url) {
                    debug!(url = %photo.url, "Replacing stock photo with placeholder");
                    let prompt = describe(&photo.caption, name, business_type);
                    items.push(self.placeholder(alt, prompt));
                    continue;
                }
                items.push(MediaItem {
                    kind: MediaKind::Photo,
                    url: self.note(Conf::from_source(photo.url.trim().to_string(), source.with_url(photo.url.trim()))),
                    alt,
                    generation_prompt: None,
                });
            }
        }

        for concept in &images.images {
            if !is_relevant(&concept.caption, name, business_type) {
                debug!(caption = %concept.caption, "Dropping irrelevant image concept");
                continue;
            }
            let alt_text = if concept.alt.trim().is_empty() { &concept.caption } else { &concept.alt };
            let alt = self.llm_text(alt_text, "images");
            let prompt = if concept.prompt.trim().is_empty() {
                describe(&concept.caption, name, business_type)
            } else {
                concept.prompt.trim().to_string()
            };
            items.push(self.placeholder(alt, prompt));
        }

        MediaSection { images: items }
    }

    fn seo(&mut self, s: &SellingPointsResearch, identity: &IdentitySection) -> SeoSection {
        let mut title = self.llm_text(&s.seo_title, "selling_points");
        if !title.is_present() && identity.name.is_present() {
            let derived = if identity.tagline.is_present() {
                format!("{} | {}", identity.name.value, identity.tagline.value)
            } else {
                identity.name.value.clone()
            };
            let source = SourceRef::new(SourceKind::InternalInference, self.now).with_notes("derived from identity");
            title = self.note(Conf::from_source(derived, source));
        }
        SeoSection {
            title,
            meta_description: self.llm_text(&s.meta_description, "selling_points"),
            keywords: self.llm(clean_list(&s.keywords), "selling_points"),
        }
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn describe(caption: &str, name: &str, business_type: BusinessType) -> String {
    let caption = caption.trim();
    if caption.is_empty() {
        format!("Photo of {name}, a {business_type} business")
    } else {
        format!("{caption} at {name}, a {business_type} business")
    }
}

/// Gaps worth surfacing to the site owner
fn collect_warnings(profile: &BusinessProfile) -> Vec<String> {
    let identity = &profile.identity;
    let mut warnings = Vec::new();
    let mut missing = |present: bool, what: &str| {
        if !present {
            warnings.push(format!("Missing: {what}"));
        }
    };
    missing(identity.phone.is_present(), "phone number");
    missing(identity.email.is_present(), "email address");
    missing(identity.geo.is_present(), "geo coordinates");
    missing(!profile.trust.reviews.is_empty(), "customer reviews");
    missing(profile.operations.booking_url.is_present(), "booking URL");

    for (what, conf) in [("business name", &identity.name), ("address", &identity.address)] {
        if conf.is_present() && conf.confidence < 0.5 {
            warnings.push(format!("Low confidence: {what}"));
        }
    }
    warnings
}

#[cfg(test)]
mod tests;

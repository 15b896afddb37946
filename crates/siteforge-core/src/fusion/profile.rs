//! The fused business profile
//!
//! Eight sections. Every leaf is a [`Conf`]; composite entries and lists
//! are plain structures of `Conf` leaves.

use super::conf::Conf;
use super::inputs::GeoPoint;
use super::scoring::ConfidenceLeaves;
use serde::{Deserialize, Serialize};

/// Value of the URL leaf for images that still need to be generated
pub const GENERATED_PLACEHOLDER: &str = "generated-placeholder";

/// Who the business is and how to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySection {
    /// Business name
    pub name: Conf<String>,
    /// Coarse business type
    pub business_type: Conf<String>,
    /// Tagline
    pub tagline: Conf<String>,
    /// Description
    pub description: Conf<String>,
    /// Phone
    pub phone: Conf<String>,
    /// Email
    pub email: Conf<String>,
    /// Website
    pub website: Conf<String>,
    /// Address
    pub address: Conf<String>,
    /// Coordinates
    pub geo: Conf<Option<GeoPoint>>,
}

/// How the business operates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsSection {
    /// Opening hours
    pub hours: Conf<Vec<String>>,
    /// Payment methods
    pub payment_methods: Conf<Vec<String>>,
    /// Accessibility features
    pub accessibility: Conf<Vec<String>>,
    /// Amenities
    pub amenities: Conf<Vec<String>>,
    /// Languages spoken
    pub languages: Conf<Vec<String>>,
    /// Area served
    pub service_area: Conf<String>,
    /// Online booking link
    pub booking_url: Conf<String>,
}

/// One offered service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Name
    pub name: Conf<String>,
    /// Description
    pub description: Conf<String>,
    /// Price text
    pub price: Conf<String>,
}

/// What the business sells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferingsSection {
    /// Services
    pub services: Vec<ServiceEntry>,
}

/// One review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// Reviewer
    pub author: Conf<String>,
    /// Stars
    pub rating: Conf<Option<f64>>,
    /// Text
    pub text: Conf<String>,
}

/// One FAQ entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Question
    pub question: Conf<String>,
    /// Answer
    pub answer: Conf<String>,
}

/// One social profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    /// Network name
    pub platform: Conf<String>,
    /// Profile URL
    pub url: Conf<String>,
}

/// Evidence that the business is real and liked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustSection {
    /// Average rating
    pub rating: Conf<Option<f64>>,
    /// Number of ratings
    pub review_count: Conf<Option<u32>>,
    /// Reviews
    pub reviews: Vec<ReviewEntry>,
    /// FAQ
    pub faq: Vec<FaqEntry>,
    /// Social profiles
    pub social_profiles: Vec<SocialLink>,
}

/// Visual identity and voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandSection {
    /// Primary color
    pub primary_color: Conf<String>,
    /// Secondary color
    pub secondary_color: Conf<String>,
    /// Accent color
    pub accent_color: Conf<String>,
    /// Heading font
    pub heading_font: Conf<String>,
    /// Body font
    pub body_font: Conf<String>,
    /// Tone of voice
    pub tone: Conf<String>,
    /// Voice keywords
    pub voice: Conf<Vec<String>>,
}

/// One selling point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellingPointEntry {
    /// Title
    pub title: Conf<String>,
    /// Description
    pub description: Conf<String>,
}

/// Marketing copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingSection {
    /// Hero headline
    pub headline: Conf<String>,
    /// Selling points
    pub selling_points: Vec<SellingPointEntry>,
    /// Target audience
    pub target_audience: Conf<String>,
    /// Call to action
    pub call_to_action: Conf<String>,
}

/// Kind of media entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A verified photo from the directory
    Photo,
    /// An image still to be generated
    GeneratedPlaceholder,
}

/// One image slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Photo or placeholder
    pub kind: MediaKind,
    /// Photo URL, or [`GENERATED_PLACEHOLDER`]
    pub url: Conf<String>,
    /// Alt text
    pub alt: Conf<String>,
    /// Prompt for generating the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_prompt: Option<String>,
}

/// Images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSection {
    /// Image slots in display order
    pub images: Vec<MediaItem>,
}

/// Search metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoSection {
    /// Page title
    pub title: Conf<String>,
    /// Meta description
    pub meta_description: Conf<String>,
    /// Keywords
    pub keywords: Conf<Vec<String>>,
}

/// The unified, confidence-annotated business profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    /// Identity and contact
    pub identity: IdentitySection,
    /// Operations
    pub operations: OperationsSection,
    /// Services
    pub offerings: OfferingsSection,
    /// Reviews, FAQ and social proof
    pub trust: TrustSection,
    /// Brand
    pub brand: BrandSection,
    /// Marketing copy
    pub marketing: MarketingSection,
    /// Images
    pub media: MediaSection,
    /// SEO
    pub seo: SeoSection,
}

impl BusinessProfile {
    /// Section names paired with their sections, in display order
    #[must_use]
    pub fn sections(&self) -> [(&'static str, &dyn ConfidenceLeaves); 8] {
        [
            ("identity", &self.identity),
            ("operations", &self.operations),
            ("offerings", &self.offerings),
            ("trust", &self.trust),
            ("brand", &self.brand),
            ("marketing", &self.marketing),
            ("media", &self.media),
            ("seo", &self.seo),
        ]
    }
}

macro_rules! leaves {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl ConfidenceLeaves for $ty {
            fn collect_confidences(&self, out: &mut Vec<f64>) {
                $(self.$field.collect_confidences(out);)+
            }
        }
    };
}

leaves!(IdentitySection { name, business_type, tagline, description, phone, email, website, address, geo });
leaves!(OperationsSection { hours, payment_methods, accessibility, amenities, languages, service_area, booking_url });
leaves!(ServiceEntry { name, description, price });
leaves!(OfferingsSection { services });
leaves!(ReviewEntry { author, rating, text });
leaves!(FaqEntry { question, answer });
leaves!(SocialLink { platform, url });
leaves!(TrustSection { rating, review_count, reviews, faq, social_profiles });
leaves!(BrandSection { primary_color, secondary_color, accent_color, heading_font, body_font, tone, voice });
leaves!(SellingPointEntry { title, description });
leaves!(MarketingSection { headline, selling_points, target_audience, call_to_action });
leaves!(MediaItem { url, alt });
leaves!(MediaSection { images });
leaves!(SeoSection { title, meta_description, keywords });

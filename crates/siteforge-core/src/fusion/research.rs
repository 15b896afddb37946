//! Typed research documents
//!
//! Each model research reply is parsed into a struct whose missing or
//! unknown fields default instead of erroring, then checked against the
//! few constraints the rest of the pipeline relies on.

use super::inputs::Review;
use crate::error::{Error, Result};
use crate::utils::extract_json_object;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on services in a profile
pub const MAX_SERVICES: usize = 8;

/// A service the business offers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDoc {
    /// Service name
    pub name: String,
    /// Short description
    pub description: String,
    /// Price text, as quoted
    pub price: String,
}

/// A question and its answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqDoc {
    /// Question
    pub question: String,
    /// Answer
    pub answer: String,
}

/// Core business facts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileResearch {
    /// Business name
    pub business_name: String,
    /// Free-text business type ("hair salon", "dentist", ...)
    pub business_type: String,
    /// Short tagline
    pub tagline: String,
    /// Longer description
    pub description: String,
    /// Phone
    pub phone: String,
    /// Email
    pub email: String,
    /// Website
    pub website: String,
    /// Address
    pub address: String,
    /// Opening hours, one line per day
    pub hours: Vec<String>,
    /// Services (1 to 8)
    pub services: Vec<ServiceDoc>,
    /// FAQ entries
    pub faq: Vec<FaqDoc>,
    /// Accepted payment methods
    pub payment_methods: Vec<String>,
    /// Accessibility features
    pub accessibility: Vec<String>,
    /// Amenities
    pub amenities: Vec<String>,
    /// Languages spoken
    pub languages: Vec<String>,
    /// Online booking link
    pub booking_url: String,
    /// Area served
    pub service_area: String,
}

/// A social network profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialProfileDoc {
    /// Network name
    pub platform: String,
    /// Profile URL
    pub url: String,
}

/// Social presence and reviews
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialResearch {
    /// Social profiles
    pub profiles: Vec<SocialProfileDoc>,
    /// Average rating
    pub rating: Option<f64>,
    /// Number of ratings
    pub review_count: Option<u32>,
    /// Review excerpts
    pub reviews: Vec<Review>,
}

/// Brand identity proposal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandResearch {
    /// Primary color, `#RRGGBB`
    pub primary_color: String,
    /// Secondary color, `#RRGGBB`
    pub secondary_color: String,
    /// Accent color, `#RRGGBB`
    pub accent_color: String,
    /// Heading font family
    pub heading_font: String,
    /// Body font family
    pub body_font: String,
    /// Tone of voice
    pub tone: String,
    /// Voice keywords
    pub voice: Vec<String>,
}

/// A selling point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellingPointDoc {
    /// Short title
    pub title: String,
    /// Supporting sentence
    pub description: String,
}

/// Marketing and SEO copy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellingPointsResearch {
    /// Hero headline
    pub headline: String,
    /// Selling points
    pub selling_points: Vec<SellingPointDoc>,
    /// Who the business serves
    pub target_audience: String,
    /// Primary call to action
    pub call_to_action: String,
    /// Page title
    pub seo_title: String,
    /// Meta description
    pub meta_description: String,
    /// SEO keywords
    pub keywords: Vec<String>,
}

/// An image the model proposes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConceptDoc {
    /// URL, if the model offered one (never used as-is)
    pub url: String,
    /// Caption
    pub caption: String,
    /// Alt text
    pub alt: String,
    /// Generation prompt
    pub prompt: String,
}

/// Image concepts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageResearch {
    /// Proposed images
    pub images: Vec<ImageConceptDoc>,
}

/// Schema checks for a research document
pub trait ResearchDocument: DeserializeOwned {
    /// Document name used in errors
    const DOCUMENT: &'static str;

    /// Check hard constraints, returning the first violation
    fn check(&self) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Run [`check`](Self::check), mapping violations to [`Error::InvalidResearch`]
    fn validate(&self) -> Result<()> {
        self.check().map_err(|reason| Error::InvalidResearch {
            document: Self::DOCUMENT.to_string(),
            reason,
        })
    }
}

impl ResearchDocument for ProfileResearch {
    const DOCUMENT: &'static str = "profile";

    fn check(&self) -> std::result::Result<(), String> {
        if self.business_name.trim().is_empty() {
            return Err("business_name is empty".into());
        }
        if self.services.is_empty() || self.services.len() > MAX_SERVICES {
            return Err(format!(
                "expected 1 to {MAX_SERVICES} services, got {}",
                self.services.len()
            ));
        }
        if let Some(i) = self.services.iter().position(|s| s.name.trim().is_empty()) {
            return Err(format!("service {i} has no name"));
        }
        if let Some(i) = self
            .faq
            .iter()
            .position(|f| f.question.trim().is_empty() || f.answer.trim().is_empty())
        {
            return Err(format!("faq entry {i} needs both question and answer"));
        }
        Ok(())
    }
}

impl ResearchDocument for SocialResearch {
    const DOCUMENT: &'static str = "social";

    fn check(&self) -> std::result::Result<(), String> {
        if let Some(i) = self.profiles.iter().position(|p| p.url.trim().is_empty()) {
            return Err(format!("social profile {i} has no url"));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(format!("rating {rating} outside 0-5"));
            }
        }
        Ok(())
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl ResearchDocument for BrandResearch {
    const DOCUMENT: &'static str = "brand";

    fn check(&self) -> std::result::Result<(), String> {
        for (field, value) in [
            ("primary_color", &self.primary_color),
            ("secondary_color", &self.secondary_color),
            ("accent_color", &self.accent_color),
        ] {
            if !value.is_empty() && !is_hex_color(value) {
                return Err(format!("{field} '{value}' is not #RRGGBB"));
            }
        }
        Ok(())
    }
}

impl ResearchDocument for SellingPointsResearch {
    const DOCUMENT: &'static str = "selling_points";

    fn check(&self) -> std::result::Result<(), String> {
        if let Some(i) = self
            .selling_points
            .iter()
            .position(|p| p.title.trim().is_empty())
        {
            return Err(format!("selling point {i} has no title"));
        }
        Ok(())
    }
}

impl ResearchDocument for ImageResearch {
    const DOCUMENT: &'static str = "images";
}

/// Parse and validate a model reply as document `T`
pub fn parse_research<T: ResearchDocument>(raw: &str) -> Result<T> {
    let json = extract_json_object(raw).ok_or_else(|| Error::InvalidResearch {
        document: T::DOCUMENT.to_string(),
        reason: "reply contains no JSON object".into(),
    })?;
    let doc: T = serde_json::from_str(json).map_err(|e| Error::InvalidResearch {
        document: T::DOCUMENT.to_string(),
        reason: e.to_string(),
    })?;
    doc.validate()?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_missing_fields() {
        let doc: ProfileResearch = parse_research(
            r#"```json
{"business_name": "Acme Bakery", "services": [{"name": "Bread"}], "unknown_field": 1}
```"#,
        )
        .unwrap();
        assert_eq!(doc.business_name, "Acme Bakery");
        assert!(doc.phone.is_empty());
        assert_eq!(doc.services[0].price, "");
    }

    #[test]
    fn test_profile_constraints() {
        let err = parse_research::<ProfileResearch>(r#"{"business_name": " ", "services": [{"name": "x"}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResearch { ref document, .. } if document == "profile"));

        let nine: Vec<ServiceDoc> = (0..9)
            .map(|i| ServiceDoc {
                name: format!("s{i}"),
                ..Default::default()
            })
            .collect();
        let doc = ProfileResearch {
            business_name: "Acme".into(),
            services: nine,
            ..Default::default()
        };
        assert!(doc.validate().is_err());

        let doc = ProfileResearch {
            business_name: "Acme".into(),
            services: vec![ServiceDoc {
                name: "Bread".into(),
                ..Default::default()
            }],
            faq: vec![FaqDoc {
                question: "Open Sunday?".into(),
                answer: String::new(),
            }],
            ..Default::default()
        };
        assert!(doc.validate().unwrap_err().to_string().contains("faq entry 0"));
    }

    #[test]
    fn test_brand_color_format() {
        assert!(parse_research::<BrandResearch>(r##"{"primary_color": "#1a2B3c"}"##).is_ok());
        assert!(parse_research::<BrandResearch>(r#"{"primary_color": "blue"}"#).is_err());
    }

    #[test]
    fn test_reply_without_json() {
        let err = parse_research::<ImageResearch>("I could not find anything").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
    }
}

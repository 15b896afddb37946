//! Business type detection and image policy
//!
//! Only directory photos count as real photos. Everything a model proposes,
//! and anything hosted on a stock-photo site, becomes a generated
//! placeholder carrying a prompt instead of a third-party URL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse business category used for image filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    /// Restaurants, cafes, bakeries, bars
    Restaurant,
    /// Hair, nails, beauty, spa
    Salon,
    /// Dental and medical practices
    Health,
    /// Gyms, studios, trainers
    Fitness,
    /// Auto repair and detailing
    Automotive,
    /// Shops
    Retail,
    /// Plumbers, electricians, cleaners, builders
    HomeServices,
    /// Anything else
    Other,
}

const TYPE_HINTS: &[(BusinessType, &[&str])] = &[
    (
        BusinessType::Restaurant,
        &["restaurant", "cafe", "café", "coffee", "bakery", "bar ", "pizza", "bistro", "diner", "food"],
    ),
    (
        BusinessType::Salon,
        &["salon", "barber", "hair", "nail", "beauty", "spa", "lash"],
    ),
    (
        BusinessType::Health,
        &["dentist", "dental", "clinic", "doctor", "medical", "physio", "chiropract", "therapy"],
    ),
    (
        BusinessType::Fitness,
        &["gym", "fitness", "yoga", "pilates", "crossfit", "trainer", "martial"],
    ),
    (
        BusinessType::Automotive,
        &["auto", "car ", "mechanic", "garage", "tire", "tyre", "detailing"],
    ),
    (
        BusinessType::HomeServices,
        &["plumb", "electric", "clean", "roof", "landscap", "contractor", "handyman", "hvac"],
    ),
    (
        BusinessType::Retail,
        &["shop", "store", "boutique", "retail", "florist", "gift"],
    ),
];

impl BusinessType {
    /// Classify a free-text business type
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let text = format!("{} ", text.to_lowercase());
        TYPE_HINTS
            .iter()
            .find(|(_, hints)| hints.iter().any(|h| text.contains(h)))
            .map_or(Self::Other, |(ty, _)| *ty)
    }

    /// Caption keywords relevant to this type; empty means no filtering
    #[must_use]
    pub fn image_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Restaurant => &["food", "dish", "meal", "menu", "table", "dining", "kitchen", "chef", "coffee", "drink", "bread", "pastry"],
            Self::Salon => &[
                "hair", "salon", "chair", "stylist", "nail", "beauty", "treatment", "mirror", "barber", "fade",
                "beard", "shave", "trim", "clipper",
            ],
            Self::Health => &["clinic", "office", "patient", "dental", "treatment", "waiting room", "staff"],
            Self::Fitness => &["gym", "workout", "class", "equipment", "training", "studio", "weights"],
            Self::Automotive => &["car", "garage", "workshop", "vehicle", "tire", "engine", "bay"],
            Self::Retail => &["shop", "store", "product", "shelf", "display", "counter"],
            Self::HomeServices => &["team", "van", "tools", "job", "project", "work", "before", "after"],
            Self::Other => &[],
        }
    }

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Salon => "salon",
            Self::Health => "health",
            Self::Fitness => "fitness",
            Self::Automotive => "automotive",
            Self::Retail => "retail",
            Self::HomeServices => "home_services",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hosts whose images are never emitted
pub const STOCK_PHOTO_HOSTS: &[&str] = &[
    "unsplash.com",
    "images.unsplash.com",
    "pexels.com",
    "images.pexels.com",
    "pixabay.com",
    "shutterstock.com",
    "istockphoto.com",
    "gettyimages.com",
    "stock.adobe.com",
    "depositphotos.com",
    "dreamstime.com",
    "123rf.com",
];

const GENERIC_CAPTIONS: &[&str] = &["image", "photo", "picture", "img", "untitled"];

const STOREFRONT_TERMS: &[&str] = &[
    "storefront",
    "store front",
    "shopfront",
    "exterior",
    "interior",
    "entrance",
    "signage",
    "sign",
    "building",
    "front door",
    "logo",
];

fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Whether `url` points at a known stock-photo host
#[must_use]
pub fn is_stock_photo(url: &str) -> bool {
    url_host(url).is_some_and(|host| {
        let host = host.to_lowercase();
        STOCK_PHOTO_HOSTS
            .iter()
            .any(|stock| host == *stock || host.ends_with(&format!(".{stock}")))
    })
}

/// Whether an image with `caption` belongs on the site of `business_name`
#[must_use]
pub fn is_relevant(caption: &str, business_name: &str, business_type: BusinessType) -> bool {
    let keywords = business_type.image_keywords();
    if keywords.is_empty() {
        return true;
    }
    let caption = caption.trim().to_lowercase();
    if caption.is_empty() || GENERIC_CAPTIONS.contains(&caption.as_str()) {
        return true;
    }
    let name = business_name.trim().to_lowercase();
    if !name.is_empty() && caption.contains(&name) {
        return true;
    }
    STOREFRONT_TERMS.iter().any(|t| mentions(&caption, t))
        || keywords.iter().any(|k| mentions(&caption, k))
}

/// Whether `term` starts at a word boundary in `caption` ("sign" matches "signs", not "design")
fn mentions(caption: &str, term: &str) -> bool {
    let words: Vec<&str> = caption
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let parts: Vec<&str> = term.split_whitespace().collect();
    let Some((last, head)) = parts.split_last() else {
        return false;
    };
    words
        .windows(parts.len())
        .any(|w| w[..head.len()] == *head && w[head.len()].starts_with(last))
}

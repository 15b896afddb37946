//! Secondary fusion inputs: directory lookup results and user overrides

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// A customer review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    /// Reviewer display name
    pub author: String,
    /// Star rating, when given
    pub rating: Option<f64>,
    /// Review text
    pub text: String,
}

/// A photo returned by the directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacePhoto {
    /// Photo URL
    pub url: String,
    /// Caption or attribution text
    pub caption: String,
}

/// Result of a places / business directory lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesResult {
    /// Directory place id
    pub place_id: String,
    /// Listed name
    pub name: String,
    /// Listed phone
    pub phone: Option<String>,
    /// Formatted address
    pub address: Option<String>,
    /// Listed website
    pub website: Option<String>,
    /// Coordinates
    pub geo: Option<GeoPoint>,
    /// Opening hours, one line per day
    pub hours: Vec<String>,
    /// Average rating
    pub rating: Option<f64>,
    /// Number of ratings
    pub review_count: Option<u32>,
    /// Review excerpts
    pub reviews: Vec<Review>,
    /// Photos
    pub photos: Vec<PlacePhoto>,
}

/// Facts typed in by the site owner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInputs {
    /// Business name
    pub business_name: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Existing website
    pub website: Option<String>,
}

impl UserInputs {
    /// Inputs with just a business name
    #[must_use]
    pub fn named(business_name: impl Into<String>) -> Self {
        Self {
            business_name: Some(business_name.into()),
            ..Self::default()
        }
    }
}

/// Blank strings count as absent
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

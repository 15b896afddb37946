use super::*;
use crate::fusion::inputs::{GeoPoint, PlacePhoto, Review};
use crate::fusion::research::{FaqDoc, ImageConceptDoc, ServiceDoc};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn research(phone: &str) -> ResearchBundle {
    ResearchBundle {
        profile: ProfileResearch {
            business_name: "Acme Bakery".into(),
            business_type: "Artisan bakery".into(),
            tagline: "Bread worth waking up for".into(),
            phone: phone.into(),
            address: "1 Main St, Springfield".into(),
            services: vec![ServiceDoc {
                name: "Sourdough".into(),
                description: "Baked daily".into(),
                price: "$8".into(),
            }],
            faq: vec![FaqDoc {
                question: "Gluten free?".into(),
                answer: "Some items".into(),
            }],
            payment_methods: vec!["Cash".into(), "Card".into()],
            ..Default::default()
        },
        images: ImageResearch {
            images: vec![
                ImageConceptDoc {
                    url: "https://images.unsplash.com/photo-1".into(),
                    caption: "Fresh bread on the counter".into(),
                    alt: "Loaves of bread".into(),
                    prompt: String::new(),
                },
                ImageConceptDoc {
                    caption: "Person typing on a laptop".into(),
                    ..Default::default()
                },
            ],
        },
        ..Default::default()
    }
}

fn places() -> PlacesResult {
    PlacesResult {
        place_id: "place-123".into(),
        name: "Acme Bakery".into(),
        phone: Some("+1 555 0100".into()),
        address: Some("1 Main Street, Springfield".into()),
        geo: Some(GeoPoint { lat: 39.78, lng: -89.65 }),
        hours: vec!["Mon-Fri 7-18".into()],
        rating: Some(4.7),
        review_count: Some(212),
        reviews: vec![Review {
            author: "Sam".into(),
            rating: Some(5.0),
            text: "Best croissants in town".into(),
        }],
        photos: vec![
            PlacePhoto {
                url: "https://maps.example.com/photo/1".into(),
                caption: "Storefront".into(),
            },
            PlacePhoto {
                url: "https://www.pexels.com/photo/2".into(),
                caption: "Pastry display".into(),
            },
        ],
        ..Default::default()
    }
}

fn fuse(input: &FusionInput) -> FusionOutput {
    FusionEngine::new().fuse_at(input, now()).unwrap()
}

#[test]
fn test_phone_from_model_only() {
    let output = fuse(&FusionInput {
        research: research("555-0100"),
        ..Default::default()
    });
    let phone = &output.profile.identity.phone;
    assert_eq!(phone.value, "555-0100");
    assert!(approx(phone.confidence, 0.50));
    assert!(!output.warnings.iter().any(|w| w == "Missing: phone number"));
}

#[test]
fn test_phone_missing_everywhere() {
    let output = fuse(&FusionInput {
        research: research(""),
        ..Default::default()
    });
    assert!(output.warnings.iter().any(|w| w == "Missing: phone number"));
    assert!(output.profile.identity.phone.confidence <= 0.35 + 1e-9);
}

#[test]
fn test_directory_corroborates_contact_fields() {
    let output = fuse(&FusionInput {
        research: research("555-0100"),
        places: Some(places()),
        user: UserInputs {
            phone: Some("+1 555 0100".into()),
            ..UserInputs::named("Acme Bakery")
        },
    });
    let identity = &output.profile.identity;

    // directory (0.92) wins; three distinct kinds add 0.15, capped at 0.98
    assert_eq!(identity.phone.value, "+1 555 0100");
    assert!(approx(identity.phone.confidence, 0.98));
    assert_eq!(identity.phone.distinct_kinds(), 3);

    assert_eq!(identity.address.value, "1 Main Street, Springfield");
    assert!(identity.geo.value.is_some());
    assert!(!output.warnings.iter().any(|w| w == "Missing: geo coordinates"));
    assert!(!output.warnings.iter().any(|w| w == "Missing: customer reviews"));
    assert_eq!(output.provenance.place_id.as_deref(), Some("place-123"));
    assert!(output.provenance.source_kinds.contains(&SourceKind::UserProvided));
    assert!(output.provenance.documents.contains(&"places".to_string()));
}

#[test]
fn test_llm_only_fields_are_penalized() {
    let output = fuse(&FusionInput {
        research: research("555-0100"),
        ..Default::default()
    });
    let payments = &output.profile.operations.payment_methods;
    assert_eq!(payments.value, vec!["Cash".to_string(), "Card".to_string()]);
    assert!(approx(payments.confidence, 0.35));
    // empty and model-only: 0.50 - 0.15 - 0.15
    assert!(approx(output.profile.operations.languages.confidence, 0.20));
}

#[test]
fn test_photo_policy() {
    let output = fuse(&FusionInput {
        research: research("555-0100"),
        places: Some(places()),
        ..Default::default()
    });
    let images = &output.profile.media.images;

    // storefront photo, stock-hosted directory photo, relevant model concept;
    // the laptop concept is filtered out
    assert_eq!(images.len(), 3);
    assert_eq!(images[0].kind, MediaKind::Photo);
    assert_eq!(images[0].url.value, "https://maps.example.com/photo/1");
    assert!(approx(images[0].url.confidence, 0.92));

    for item in &images[1..] {
        assert_eq!(item.kind, MediaKind::GeneratedPlaceholder);
        assert_eq!(item.url.value, GENERATED_PLACEHOLDER);
        assert!(item.url.is_placeholder);
        assert_eq!(item.url.sources[0].kind, SourceKind::StockPlaceholder);
        assert!(approx(item.url.confidence, 0.20));
        assert!(item.generation_prompt.is_some());
    }

    let json = serde_json::to_string(&output).unwrap();
    assert!(!json.contains("unsplash.com"));
    assert!(!json.contains("pexels.com"));
}

#[test]
fn test_warnings_and_scores() {
    let output = fuse(&FusionInput {
        research: research("555-0100"),
        ..Default::default()
    });
    for expected in [
        "Missing: email address",
        "Missing: geo coordinates",
        "Missing: customer reviews",
        "Missing: booking URL",
    ] {
        assert!(output.warnings.iter().any(|w| w == expected), "{expected}");
    }
    assert!(!output.warnings.iter().any(|w| w.starts_with("Low confidence")));

    assert_eq!(output.confidence.sections.len(), 8);
    let mean: f64 = output.confidence.sections.values().sum::<f64>() / 8.0;
    assert!((output.confidence.overall - mean).abs() < 0.01);
    assert!(output.confidence.overall > 0.0 && output.confidence.overall < 1.0);
}

#[test]
fn test_seo_title_derived_when_missing() {
    let output = fuse(&FusionInput {
        research: research("555-0100"),
        ..Default::default()
    });
    let title = &output.profile.seo.title;
    assert_eq!(title.value, "Acme Bakery | Bread worth waking up for");
    assert_eq!(title.sources[0].kind, SourceKind::InternalInference);
    assert!(approx(title.confidence, 0.45));
}

#[test]
fn test_invalid_research_is_rejected() {
    let mut bundle = research("555-0100");
    bundle.profile.services.clear();
    let err = FusionEngine::new()
        .fuse(&FusionInput {
            research: bundle,
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, crate::Error::InvalidResearch { .. }));
}

#[test]
fn test_duplicate_reviews_collapse() {
    let mut bundle = research("555-0100");
    bundle.social.reviews = vec![Review {
        author: "Sam".into(),
        rating: Some(5.0),
        text: "best croissants in town".into(),
    }];
    let output = fuse(&FusionInput {
        research: bundle,
        places: Some(places()),
        ..Default::default()
    });
    assert_eq!(output.profile.trust.reviews.len(), 1);
    assert_eq!(
        output.profile.trust.reviews[0].text.sources[0].kind,
        SourceKind::DirectoryLookup
    );
}

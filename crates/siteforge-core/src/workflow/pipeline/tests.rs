use super::*;
use crate::prompts::catalog::register_builtin;
use crate::workflow::collaborators::MockPlacesLookup;
use crate::workflow::journal::MockStepJournal;
use siteforge_llm::{CompletionResponse, MockProvider};

const PROFILE: &str = r#"{"business_name":"Bella Cuts","business_type":"hair salon",
    "description":"Neighborhood salon","phone":"(555) 010-2000",
    "website":"https://bellacuts.example","address":"12 Main St",
    "services":[{"name":"Haircut","description":"Wash and cut","price":"$40"}]}"#;
const HTML: &str = "<!DOCTYPE html><html><body>Bella Cuts</body></html>";

/// Answer each built-in prompt with a canned reply, overriding by prompt opening
fn reply_for(request: &CompletionRequest, overrides: &[(&str, &str)]) -> siteforge_llm::Result<CompletionResponse> {
    let user = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == siteforge_llm::MessageRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    if let Some((_, reply)) = overrides.iter().find(|(prefix, _)| user.starts_with(prefix)) {
        return Ok(CompletionResponse::text("mock-model", *reply));
    }

    let reply = if user.starts_with("Research the business") {
        PROFILE
    } else if user.starts_with("Find the public social presence") {
        r#"{"profiles":[],"rating":4.7,"review_count":120}"#
    } else if user.starts_with("Propose a brand identity") {
        r##"{"primary_color":"#112233","tone":"friendly"}"##
    } else if user.starts_with("Write marketing copy") {
        r#"{"headline":"Great hair, close to home","selling_points":[{"title":"Walk-ins welcome"}]}"#
    } else if user.starts_with("Suggest website images") {
        r#"{"images":[]}"#
    } else if user.starts_with("Build a single-page website") {
        HTML
    } else if user.starts_with("Draft a privacy policy") {
        r##"{"privacy_policy":"# Privacy","terms_of_service":"# Terms"}"##
    } else if user.starts_with("Review this website") {
        r#"{"score":88,"issues":["Add opening hours"]}"#
    } else {
        return Err(siteforge_llm::Error::InvalidResponse(format!("unexpected prompt: {user}")));
    };
    Ok(CompletionResponse::text("mock-model", reply))
}

fn provider(overrides: &'static [(&'static str, &'static str)]) -> Arc<MockProvider> {
    Arc::new(MockProvider::with_handler(move |req| reply_for(req, overrides)))
}

fn registry() -> Arc<PromptRegistry> {
    let registry = PromptRegistry::new();
    register_builtin(&registry).unwrap();
    Arc::new(registry)
}

fn config() -> PipelineConfig {
    PipelineConfig::default().with_retry(RetryConfig::immediate(3))
}

struct Harness {
    llm: Arc<MockProvider>,
    journal: Arc<MemoryJournal>,
    records: Arc<MemorySiteRecords>,
    artifacts: Arc<MemoryArtifactStore>,
    pipeline: SitePipeline,
}

fn harness(overrides: &'static [(&'static str, &'static str)]) -> Harness {
    let llm = provider(overrides);
    let journal = Arc::new(MemoryJournal::new());
    let records = Arc::new(MemorySiteRecords::new());
    let artifacts = Arc::new(MemoryArtifactStore::new());
    let pipeline = SitePipeline::new(llm.clone(), registry(), config())
        .with_journal(journal.clone())
        .with_records(records.clone())
        .with_artifacts(artifacts.clone());
    Harness {
        llm,
        journal,
        records,
        artifacts,
        pipeline,
    }
}

#[tokio::test]
async fn test_full_run_publishes() {
    let h = harness(&[]);
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    let outcome = h.pipeline.run(&req).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Published);
    assert_eq!(outcome.quality.score, 88);
    assert_eq!(outcome.artifacts.len(), 6);
    assert_eq!(h.llm.call_count(), 8);
    assert_eq!(
        h.records.history("bella-cuts").await,
        vec![
            RunStatus::Collecting,
            RunStatus::Generating,
            RunStatus::Uploading,
            RunStatus::Published
        ]
    );

    let index = h
        .artifacts
        .get(&ArtifactKey::new("bella-cuts", 1, "index.html"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(index.body, HTML.as_bytes());
    assert!(index.content_type.starts_with("text/html"));

    let research = h
        .artifacts
        .get(&ArtifactKey::new("bella-cuts", 1, "research.json"))
        .await
        .unwrap()
        .unwrap();
    let snapshot: FusionInput = serde_json::from_slice(&research.body).unwrap();
    assert_eq!(snapshot.research.profile.business_type, "hair salon");
    assert_eq!(snapshot.research.social.review_count, Some(120));
    assert!(snapshot.places.is_none());

    let profile = &outcome.fusion.profile;
    assert_eq!(profile.identity.phone.value, "(555) 010-2000");
    assert_eq!(outcome.fusion.provenance.prompts.len(), 8);
    assert!(outcome.fusion.provenance.prompts.contains_key("website_html"));
}

#[tokio::test]
async fn test_rerun_replays_without_model_calls() {
    let h = harness(&[]);
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    let first = h.pipeline.run(&req).await.unwrap();
    let calls = h.llm.call_count();
    let second = h.pipeline.run(&req).await.unwrap();

    assert_eq!(h.llm.call_count(), calls);
    assert_eq!(first.artifacts, second.artifacts);
    assert_eq!(first.quality, second.quality);

    let steps = h.journal.completed_steps(req.run_id).await;
    for step in [
        "research_profile",
        "research_social",
        "fuse_profile",
        "generate_website",
        "score_quality",
        "upload_artifacts",
    ] {
        assert!(steps.iter().any(|s| s == step), "{step} not journaled");
    }
}

#[tokio::test]
async fn test_invalid_research_fails_run_before_generation() {
    // a rating above 5 never passes validation, so retries do not help
    let h = harness(&[("Find the public social presence", r#"{"rating":9.5}"#)]);
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    let err = h.pipeline.run(&req).await.unwrap_err();

    match err {
        Error::StepFailed { step, attempts, .. } => {
            assert_eq!(step, "research_social");
            assert_eq!(attempts, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.records.status("bella-cuts").await, Some(RunStatus::Error));
    assert!(!h
        .llm
        .requests()
        .iter()
        .any(|r| r.messages.iter().any(|m| m.content.starts_with("Build a single-page website"))));

    let failures = h.journal.failures(req.run_id).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].step, "research_social");
    assert!(h.artifacts.keys().await.is_empty());
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let h = harness(&[]);
    h.llm
        .push_response(Err(siteforge_llm::Error::Network("connection reset".into())));
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    let outcome = h.pipeline.run(&req).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Published);
    assert_eq!(h.llm.call_count(), 9);
}

#[tokio::test]
async fn test_bad_html_is_permanent() {
    let h = harness(&[("Build a single-page website", "Sorry, I cannot help with that.")]);
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    let err = h.pipeline.run(&req).await.unwrap_err();

    assert!(matches!(err, Error::StepFailed { ref step, .. } if step == "generate_website"));
    assert_eq!(
        h.records.history("bella-cuts").await.last(),
        Some(&RunStatus::Error)
    );
}

#[tokio::test]
async fn test_places_outage_degrades_to_research_only() {
    let mut places = MockPlacesLookup::new();
    places
        .expect_lookup()
        .times(3)
        .returning(|_| Err(Error::Storage("directory unavailable".into())));

    let h = harness(&[]);
    let pipeline = h.pipeline.with_places(Arc::new(places));
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts").with_place_id("place-1");

    let outcome = pipeline.run(&req).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Published);
    assert!(outcome.fusion.provenance.place_id.is_none());
}

#[tokio::test]
async fn test_places_result_feeds_fusion() {
    let place = PlacesResult {
        place_id: "place-1".into(),
        name: "Bella Cuts".into(),
        phone: Some("(555) 010-2000".into()),
        ..Default::default()
    };
    let h = harness(&[]);
    let pipeline = h
        .pipeline
        .with_places(Arc::new(StaticPlacesLookup::new().with_place(place)));
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts").with_place_id("place-1");

    let outcome = pipeline.run(&req).await.unwrap();

    assert_eq!(outcome.fusion.provenance.place_id.as_deref(), Some("place-1"));
    assert!(outcome.fusion.profile.identity.phone.sources.len() >= 2);

    let research = h
        .artifacts
        .get(&ArtifactKey::new("bella-cuts", 1, "research.json"))
        .await
        .unwrap()
        .unwrap();
    let snapshot: FusionInput = serde_json::from_slice(&research.body).unwrap();
    assert_eq!(snapshot.places.map(|p| p.place_id).as_deref(), Some("place-1"));
}

#[tokio::test]
async fn test_journal_outage_fails_first_step() {
    let mut journal = MockStepJournal::new();
    journal
        .expect_load()
        .returning(|_, _| Err(Error::Storage("journal down".into())));
    journal.expect_record_failure().times(1).returning(|_, _| Ok(()));

    let h = harness(&[]);
    let pipeline = h.pipeline.with_journal(Arc::new(journal));
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    let err = pipeline.run(&req).await.unwrap_err();

    assert!(matches!(err, Error::StepFailed { ref step, .. } if step == "research_profile"));
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_pinned_prompt_version_missing() {
    let h = harness(&[]);
    let pipeline = SitePipeline::new(
        h.llm.clone(),
        registry(),
        config().with_prompt_version("business_profile", 7),
    );
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    let err = pipeline.run(&req).await.unwrap_err();

    match err {
        Error::StepFailed { step, message, .. } => {
            assert_eq!(step, "research_profile");
            assert!(message.contains("business_profile"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_events_follow_run() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let h = harness(&[]);
    let pipeline = h.pipeline.with_event_bus(bus);
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    pipeline.run(&req).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(PipelineEvent::RunStarted { .. })));
    assert!(matches!(events.last(), Some(PipelineEvent::RunCompleted { .. })));
    let completed = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::StepCompleted { .. }))
        .count();
    assert_eq!(completed, 10);
}

#[tokio::test]
async fn test_requests_carry_model_and_json_mode() {
    let h = harness(&[]);
    let pipeline = SitePipeline::new(
        h.llm.clone(),
        registry(),
        config().with_default_model("house-model"),
    );
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    pipeline.run(&req).await.unwrap();

    let requests = h.llm.requests();
    let profile = requests
        .iter()
        .find(|r| r.messages.iter().any(|m| m.content.starts_with("Research the business")))
        .unwrap();
    assert!(profile.json_mode);
    assert_eq!(profile.messages[0].role, siteforge_llm::MessageRole::System);
    assert!(profile.messages[1].content.contains("<<<USER_INPUT>>>"));

    let website = requests
        .iter()
        .find(|r| r.messages.iter().any(|m| m.content.starts_with("Build a single-page website")))
        .unwrap();
    assert!(!website.json_mode);
}

#[tokio::test]
async fn test_absent_optional_inputs_are_not_sent_as_placeholders() {
    let h = harness(&[]);
    // no address, email, website or style from the owner
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    h.pipeline.run(&req).await.unwrap();

    for request in h.llm.requests() {
        for message in &request.messages {
            assert!(!message.content.contains("{{"), "unresolved placeholder in: {}", message.content);
        }
    }
}

#[tokio::test]
async fn test_unresolved_placeholders_kept_when_stripping_disabled() {
    let h = harness(&[]);
    let mut config = config();
    config.strip_unresolved = false;
    let pipeline = SitePipeline::new(h.llm.clone(), registry(), config);
    let req = SiteBuildRequest::new("bella-cuts", "Bella Cuts");

    pipeline.run(&req).await.unwrap();

    assert!(h
        .llm
        .requests()
        .iter()
        .any(|r| r.messages.iter().any(|m| m.content.contains("{{"))));
}

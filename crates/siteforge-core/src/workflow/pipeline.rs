//! Site Pipeline
//!
//! The durable research and generation workflow:
//! 1. `research_profile`
//! 2. in parallel: `research_social`, `research_brand`,
//!    `research_selling_points`, `research_images`, `lookup_places`
//! 3. `fuse_profile`
//! 4. `generate_website`
//! 5. in parallel: `generate_legal_pages`, `score_quality`
//! 6. `upload_artifacts`
//!
//! Every step goes through [`SitePipeline::run_step`]: journaled steps are
//! replayed, transient failures are retried with backoff, and a permanent
//! failure marks the site `error` and aborts the run.

use super::collaborators::{
    ArtifactKey, ArtifactStore, MemoryArtifactStore, MemorySiteRecords, PlacesLookup,
    SiteRecords, StaticPlacesLookup,
};
use super::journal::{MemoryJournal, StepFailure, StepJournal};
use super::output::{parse_legal_pages, parse_quality_report, validate_html, LegalPages, QualityReport};
use super::status::RunStatus;
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, PipelineEvent};
use crate::fusion::research::{parse_research, ResearchDocument};
use crate::fusion::{
    BrandResearch, FusionEngine, FusionInput, FusionOutput, ImageResearch, PlacesResult,
    ProfileResearch, ResearchBundle, SellingPointsResearch, SocialResearch, UserInputs,
};
use crate::observability::CallObserver;
use crate::prompts::catalog;
use crate::prompts::{render_prompt, InputValues, OutputFormat, PromptKey, PromptRegistry, RenderOptions};
use crate::utils::{retry_with_backoff, RetryConfig, RetryError};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use siteforge_llm::{CompletionRequest, LlmProvider, Message};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Business type used in prompts when research could not name one
const FALLBACK_BUSINESS_TYPE: &str = "local business";

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Retry policy applied to every step
    pub retry: RetryConfig,
    /// Model used when a prompt names none (empty means provider default)
    pub default_model: String,
    /// Prompt versions to use instead of the latest, by prompt id
    pub prompt_versions: BTreeMap<String, u32>,
    /// Wrap untrusted template values in delimiters
    pub safe_delimit: bool,
    /// Delete placeholders of absent optional inputs instead of sending them verbatim
    pub strip_unresolved: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            default_model: String::new(),
            prompt_versions: BTreeMap::new(),
            safe_delimit: true,
            strip_unresolved: true,
        }
    }
}

impl PipelineConfig {
    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Pin `prompt_id` to `version`
    #[must_use]
    pub fn with_prompt_version(mut self, prompt_id: impl Into<String>, version: u32) -> Self {
        self.prompt_versions.insert(prompt_id.into(), version);
        self
    }
}

/// One site build
#[derive(Debug, Clone)]
pub struct SiteBuildRequest {
    /// Run id; re-using it resumes or replays the run
    pub run_id: Uuid,
    /// Site slug
    pub slug: String,
    /// Build version, part of every artifact key
    pub build_version: u32,
    /// Business name to research
    pub business_name: String,
    /// Owner-supplied facts
    pub user: UserInputs,
    /// Directory place id, when known
    pub place_id: Option<String>,
    /// Seed for variant selection (defaults to the slug)
    pub variant_seed: Option<String>,
    /// Style hint for the website prompt
    pub style: Option<String>,
}

impl SiteBuildRequest {
    /// New build with a fresh run id
    #[must_use]
    pub fn new(slug: impl Into<String>, business_name: impl Into<String>) -> Self {
        let business_name = business_name.into();
        Self {
            run_id: Uuid::new_v4(),
            slug: slug.into(),
            build_version: 1,
            user: UserInputs::named(business_name.clone()),
            business_name,
            place_id: None,
            variant_seed: None,
            style: None,
        }
    }

    /// Use a specific run id
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Set the build version
    #[must_use]
    pub fn with_build_version(mut self, build_version: u32) -> Self {
        self.build_version = build_version;
        self
    }

    /// Set the owner-supplied facts
    #[must_use]
    pub fn with_user_inputs(mut self, user: UserInputs) -> Self {
        self.user = user;
        self
    }

    /// Set the directory place id
    #[must_use]
    pub fn with_place_id(mut self, place_id: impl Into<String>) -> Self {
        self.place_id = Some(place_id.into());
        self
    }

    /// Set the variant seed
    #[must_use]
    pub fn with_variant_seed(mut self, seed: impl Into<String>) -> Self {
        self.variant_seed = Some(seed.into());
        self
    }

    /// Set the style hint
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    fn seed(&self) -> &str {
        self.variant_seed.as_deref().unwrap_or(&self.slug)
    }
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Run id
    pub run_id: Uuid,
    /// Site slug
    pub slug: String,
    /// Final status
    pub status: RunStatus,
    /// Artifacts written
    pub artifacts: Vec<ArtifactKey>,
    /// Fused profile, provenance and warnings
    pub fusion: FusionOutput,
    /// Quality review
    pub quality: QualityReport,
}

/// Model output together with the prompt that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Generated<T> {
    prompt: PromptKey,
    value: T,
}

/// The research and generation pipeline
pub struct SitePipeline {
    llm: Arc<dyn LlmProvider>,
    registry: Arc<PromptRegistry>,
    places: Arc<dyn PlacesLookup>,
    artifacts: Arc<dyn ArtifactStore>,
    records: Arc<dyn SiteRecords>,
    journal: Arc<dyn StepJournal>,
    observer: CallObserver,
    events: Option<Arc<EventBus>>,
    fusion: FusionEngine,
    config: PipelineConfig,
}

impl SitePipeline {
    /// Pipeline with in-memory collaborators and an empty directory
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, registry: Arc<PromptRegistry>, config: PipelineConfig) -> Self {
        Self {
            llm,
            registry,
            places: Arc::new(StaticPlacesLookup::new()),
            artifacts: Arc::new(MemoryArtifactStore::new()),
            records: Arc::new(MemorySiteRecords::new()),
            journal: Arc::new(MemoryJournal::new()),
            observer: CallObserver::new(),
            events: None,
            fusion: FusionEngine::new(),
            config,
        }
    }

    /// Set the places directory
    #[must_use]
    pub fn with_places(mut self, places: Arc<dyn PlacesLookup>) -> Self {
        self.places = places;
        self
    }

    /// Set the artifact store
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Set the status records
    #[must_use]
    pub fn with_records(mut self, records: Arc<dyn SiteRecords>) -> Self {
        self.records = records;
        self
    }

    /// Set the step journal
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<dyn StepJournal>) -> Self {
        self.journal = journal;
        self
    }

    /// Set the call observer
    #[must_use]
    pub fn with_observer(mut self, observer: CallObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Publish progress on `bus`
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Set the fusion engine
    #[must_use]
    pub fn with_fusion(mut self, fusion: FusionEngine) -> Self {
        self.fusion = fusion;
        self
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    async fn set_status(&self, req: &SiteBuildRequest, status: RunStatus) -> Result<()> {
        self.records.set_status(&req.slug, status).await?;
        info!(run_id = %req.run_id, slug = %req.slug, status = %status, "Site status changed");
        self.publish(PipelineEvent::StatusChanged {
            run_id: req.run_id,
            status,
        });
        Ok(())
    }

    /// Run a build end to end
    pub async fn run(&self, req: &SiteBuildRequest) -> Result<BuildOutcome> {
        info!(run_id = %req.run_id, slug = %req.slug, "Starting site build");
        self.publish(PipelineEvent::RunStarted {
            run_id: req.run_id,
            slug: req.slug.clone(),
        });

        match self.execute(req).await {
            Ok(outcome) => {
                info!(run_id = %req.run_id, artifacts = outcome.artifacts.len(), "Site published");
                self.publish(PipelineEvent::RunCompleted { run_id: req.run_id });
                Ok(outcome)
            }
            Err(e) => {
                if !matches!(e, Error::StepFailed { .. }) {
                    // failures outside a step still end the run
                    if let Err(status_err) = self.records.set_status(&req.slug, RunStatus::Error).await {
                        warn!(error = %status_err, "Failed to record error status");
                    }
                }
                self.publish(PipelineEvent::RunFailed {
                    run_id: req.run_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(&self, req: &SiteBuildRequest) -> Result<BuildOutcome> {
        self.set_status(req, RunStatus::Collecting).await?;

        let profile: Generated<ProfileResearch> = self
            .run_step(req, "research_profile", move || {
                self.research(req, catalog::BUSINESS_PROFILE, profile_inputs(req))
            })
            .await?;
        let profile_doc = &profile.value;

        let business_type = if profile_doc.business_type.trim().is_empty() {
            FALLBACK_BUSINESS_TYPE
        } else {
            profile_doc.business_type.trim()
        };
        let base = json!({
            "business_name": req.business_name,
            "business_type": business_type,
        });
        let with = |extra: Value| -> InputValues {
            let mut inputs = to_inputs(&base);
            inputs.extend(to_inputs(&extra));
            inputs
        };

        let social_inputs = with(json!({ "website": non_empty(&profile_doc.website) }));
        let brand_inputs = with(json!({ "description": non_empty(&profile_doc.description) }));
        let services = profile_doc
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let selling_inputs = with(json!({ "services": services }));
        let image_inputs = with(json!({}));

        let (social, brand, selling, images, places) = tokio::try_join!(
            self.run_step(req, "research_social", move || {
                self.research::<SocialResearch>(req, catalog::SOCIAL_PRESENCE, social_inputs.clone())
            }),
            self.run_step(req, "research_brand", move || {
                self.research::<BrandResearch>(req, catalog::BRAND_IDENTITY, brand_inputs.clone())
            }),
            self.run_step(req, "research_selling_points", move || {
                self.research::<SellingPointsResearch>(req, catalog::SELLING_POINTS, selling_inputs.clone())
            }),
            self.run_step(req, "research_images", move || {
                self.research::<ImageResearch>(req, catalog::IMAGE_CONCEPTS, image_inputs.clone())
            }),
            self.lookup_places(req),
        )?;

        let prompts: BTreeMap<String, String> = [
            &profile.prompt,
            &social.prompt,
            &brand.prompt,
            &selling.prompt,
            &images.prompt,
        ]
        .into_iter()
        .map(|key| (key.id.clone(), key.to_string()))
        .collect();

        let input = FusionInput {
            research: ResearchBundle {
                profile: profile.value,
                social: social.value,
                brand: brand.value,
                selling_points: selling.value,
                images: images.value,
            },
            places,
            user: req.user.clone(),
        };
        let mut fused: FusionOutput = self
            .run_step(req, "fuse_profile", || {
                let result = self.fusion.fuse(&input).map(|mut output| {
                    output.provenance.prompts = prompts.clone();
                    output
                });
                std::future::ready(result)
            })
            .await?;
        for warning in &fused.warnings {
            warn!(run_id = %req.run_id, warning = %warning, "Profile gap");
        }

        self.set_status(req, RunStatus::Generating).await?;

        let profile_json = serde_json::to_string_pretty(&fused.profile)?;
        let mut website_inputs = to_inputs(&json!({ "profile": profile_json }));
        if let Some(style) = &req.style {
            website_inputs.insert("style".to_string(), Value::String(style.clone()));
        }
        let website: Generated<String> = self
            .run_step(req, "generate_website", move || {
                let inputs = website_inputs.clone();
                async move {
                    let (prompt, raw) = self.generate(req, catalog::WEBSITE_HTML, inputs).await?;
                    Ok::<_, Error>(Generated {
                        value: validate_html(&prompt.id, &raw)?,
                        prompt,
                    })
                }
            })
            .await?;
        fused
            .provenance
            .prompts
            .insert(website.prompt.id.clone(), website.prompt.to_string());

        let identity = &fused.profile.identity;
        let legal_inputs = to_inputs(&json!({
            "business_name": req.business_name,
            "email": non_empty(&identity.email.value),
            "address": non_empty(&identity.address.value),
            "website": non_empty(&identity.website.value),
        }));
        let quality_inputs = to_inputs(&json!({
            "business_name": req.business_name,
            "html": website.value,
        }));

        let (legal, quality) = tokio::try_join!(
            self.run_step(req, "generate_legal_pages", move || {
                let inputs = legal_inputs.clone();
                async move {
                    let (prompt, raw) = self.generate(req, catalog::LEGAL_PAGES, inputs).await?;
                    Ok::<_, Error>(Generated {
                        value: parse_legal_pages(&prompt.id, &raw)?,
                        prompt,
                    })
                }
            }),
            self.run_step(req, "score_quality", move || {
                let inputs = quality_inputs.clone();
                async move {
                    let (prompt, raw) = self.generate(req, catalog::QUALITY_SCORE, inputs).await?;
                    Ok::<_, Error>(Generated {
                        value: parse_quality_report(&prompt.id, &raw)?,
                        prompt,
                    })
                }
            }),
        )?;
        for generated in [&legal.prompt, &quality.prompt] {
            fused
                .provenance
                .prompts
                .insert(generated.id.clone(), generated.to_string());
        }

        self.set_status(req, RunStatus::Uploading).await?;
        let artifacts: Vec<ArtifactKey> = self
            .run_step(req, "upload_artifacts", || {
                self.upload(req, &website.value, &legal.value, &quality.value, &fused, &input)
            })
            .await?;

        self.set_status(req, RunStatus::Published).await?;

        Ok(BuildOutcome {
            run_id: req.run_id,
            slug: req.slug.clone(),
            status: RunStatus::Published,
            artifacts,
            fusion: fused,
            quality: quality.value,
        })
    }

    /// Run one journaled, retried step
    ///
    /// A journaled output is returned without running `operation`. On
    /// permanent failure the failure is journaled, the site is marked
    /// `error` and [`Error::StepFailed`] is returned.
    pub async fn run_step<T, F, Fut>(&self, req: &SiteBuildRequest, step: &str, operation: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.attempt_step(req, step, operation).await {
            Ok(value) => Ok(value),
            Err(RetryError { last_error, attempts }) => Err(self.fail_step(req, step, attempts, last_error).await),
        }
    }

    async fn attempt_step<T, F, Fut>(
        &self,
        req: &SiteBuildRequest,
        step: &str,
        mut operation: F,
    ) -> std::result::Result<T, RetryError<Error>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let once = |e: Error| RetryError {
            last_error: e,
            attempts: 1,
        };

        if let Some(saved) = self.journal.load(req.run_id, step).await.map_err(once)? {
            let value = serde_json::from_value(saved)
                .map_err(|e| once(Error::Internal(format!("journal entry for {step} is corrupt: {e}"))))?;
            info!(run_id = %req.run_id, step, "Replaying journaled step");
            self.publish(PipelineEvent::StepReplayed {
                run_id: req.run_id,
                step: step.to_string(),
            });
            return Ok(value);
        }

        self.publish(PipelineEvent::StepStarted {
            run_id: req.run_id,
            step: step.to_string(),
        });
        let start = Instant::now();
        let mut attempts = 0u32;
        let counted = || {
            attempts += 1;
            operation()
        };
        let value = retry_with_backoff(step, &self.config.retry, counted, Error::is_transient).await?;

        let saved = serde_json::to_value(&value).map_err(|e| RetryError {
            last_error: Error::from(e),
            attempts,
        })?;
        self.journal
            .save(req.run_id, step, &saved)
            .await
            .map_err(|e| RetryError { last_error: e, attempts })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %req.run_id, step, attempts, duration_ms, "Step completed");
        self.publish(PipelineEvent::StepCompleted {
            run_id: req.run_id,
            step: step.to_string(),
            attempts,
            duration_ms,
        });
        Ok(value)
    }

    async fn fail_step(&self, req: &SiteBuildRequest, step: &str, attempts: u32, cause: Error) -> Error {
        let message = cause.to_string();
        error!(run_id = %req.run_id, slug = %req.slug, step, attempts, error = %message, "Step failed");

        let failure = StepFailure {
            step: step.to_string(),
            error: message.clone(),
            attempts,
            failed_at: Utc::now(),
        };
        if let Err(e) = self.journal.record_failure(req.run_id, failure).await {
            warn!(run_id = %req.run_id, step, error = %e, "Failed to journal step failure");
        }
        self.publish(PipelineEvent::StepFailed {
            run_id: req.run_id,
            step: step.to_string(),
            error: message.clone(),
        });
        if let Err(e) = self.set_status(req, RunStatus::Error).await {
            warn!(run_id = %req.run_id, error = %e, "Failed to record error status");
        }

        Error::StepFailed {
            step: step.to_string(),
            attempts,
            message,
        }
    }

    /// Directory lookup; exhausting retries degrades to no corroboration
    async fn lookup_places(&self, req: &SiteBuildRequest) -> Result<Option<PlacesResult>> {
        let Some(place_id) = req.place_id.as_deref() else {
            return Ok(None);
        };
        let result = self
            .attempt_step(req, "lookup_places", || self.places.lookup(place_id))
            .await;
        match result {
            Ok(found) => {
                if found.is_none() {
                    warn!(run_id = %req.run_id, place_id, "Place not found in directory");
                }
                Ok(found)
            }
            Err(RetryError { last_error, attempts }) => {
                warn!(
                    run_id = %req.run_id,
                    place_id,
                    attempts,
                    error = %last_error,
                    "Places lookup failed, continuing without directory data"
                );
                Ok(None)
            }
        }
    }

    fn resolve_spec(&self, req: &SiteBuildRequest, prompt_id: &str) -> Result<Arc<crate::prompts::PromptSpec>> {
        let version = match self.config.prompt_versions.get(prompt_id) {
            Some(v) => *v,
            None => self
                .registry
                .resolve_latest(prompt_id)
                .map(|spec| spec.version)
                .ok_or_else(|| Error::PromptNotFound {
                    id: prompt_id.to_string(),
                    version: 0,
                })?,
        };
        self.registry
            .resolve_variant(prompt_id, version, req.seed())
            .ok_or_else(|| Error::PromptNotFound {
                id: prompt_id.to_string(),
                version,
            })
    }

    /// Render and invoke one prompt, returning the key used and the raw reply
    async fn generate(
        &self,
        req: &SiteBuildRequest,
        prompt_id: &str,
        inputs: InputValues,
    ) -> Result<(PromptKey, String)> {
        let spec = self.resolve_spec(req, prompt_id)?;
        let opts = RenderOptions::default()
            .with_safe_delimit(self.config.safe_delimit)
            .with_strip_unresolved(self.config.strip_unresolved);
        let rendered = render_prompt(&spec, &inputs, &opts)?;

        let model = spec
            .preferred_model()
            .unwrap_or(&self.config.default_model)
            .to_string();
        let mut request = CompletionRequest::new(model)
            .with_max_tokens(spec.params.max_tokens)
            .with_temperature(spec.params.temperature)
            .with_json_mode(spec.output.format == OutputFormat::Json);
        if !rendered.system.trim().is_empty() {
            request = request.with_message(Message::system(rendered.system));
        }
        request = request.with_message(Message::user(rendered.user));

        let response = self.observer.call(self.llm.as_ref(), &rendered.key, request).await?;
        Ok((rendered.key, response.content))
    }

    async fn research<T: ResearchDocument>(
        &self,
        req: &SiteBuildRequest,
        prompt_id: &str,
        inputs: InputValues,
    ) -> Result<Generated<T>> {
        let (prompt, raw) = self.generate(req, prompt_id, inputs).await?;
        Ok(Generated {
            value: parse_research(&raw)?,
            prompt,
        })
    }

    async fn upload(
        &self,
        req: &SiteBuildRequest,
        html: &str,
        legal: &LegalPages,
        quality: &QualityReport,
        fused: &FusionOutput,
        research: &FusionInput,
    ) -> Result<Vec<ArtifactKey>> {
        let files: [(&str, &str, Vec<u8>); 6] = [
            ("index.html", "text/html; charset=utf-8", html.as_bytes().to_vec()),
            ("privacy-policy.md", "text/markdown; charset=utf-8", legal.privacy_policy.as_bytes().to_vec()),
            ("terms-of-service.md", "text/markdown; charset=utf-8", legal.terms_of_service.as_bytes().to_vec()),
            ("profile.json", "application/json", serde_json::to_vec_pretty(fused)?),
            ("quality.json", "application/json", serde_json::to_vec_pretty(quality)?),
            ("research.json", "application/json", serde_json::to_vec_pretty(research)?),
        ];

        let mut keys = Vec::with_capacity(files.len());
        for (name, content_type, body) in files {
            let key = ArtifactKey::new(&req.slug, req.build_version, name);
            self.artifacts.put(&key, content_type, body).await?;
            keys.push(key);
        }
        Ok(keys)
    }
}

fn profile_inputs(req: &SiteBuildRequest) -> InputValues {
    let user = &req.user;
    to_inputs(&json!({
        "business_name": req.business_name,
        "address": user.address,
        "phone": user.phone,
        "website": user.website,
    }))
}

fn non_empty(value: &str) -> Value {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_string())
    }
}

fn to_inputs(value: &Value) -> InputValues {
    value
        .as_object()
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests;

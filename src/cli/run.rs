//! `siteforge run`

use crate::app::init::init_pipeline;
use crate::app::AppConfig;
use clap::Args;
use siteforge_core::{format_error_for_cli, EventBus, PipelineEvent, SiteBuildRequest, UserInputs};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Site slug (artifact directory name)
    pub slug: String,
    /// Business name to research
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    /// Directory place id to corroborate research with
    #[arg(long)]
    pub place_id: Option<String>,
    /// JSON array of directory entries
    #[arg(long)]
    pub places_file: Option<PathBuf>,
    /// Resume or replay an earlier run
    #[arg(long)]
    pub run_id: Option<Uuid>,
    #[arg(long, default_value_t = 1)]
    pub build_version: u32,
    /// Style hint for the website prompt
    #[arg(long)]
    pub style: Option<String>,
    /// Seed for prompt variant selection (defaults to the slug)
    #[arg(long)]
    pub variant_seed: Option<String>,
}

impl RunArgs {
    pub fn to_request(&self) -> SiteBuildRequest {
        let user = UserInputs {
            business_name: Some(self.name.clone()),
            address: self.address.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            website: self.website.clone(),
        };
        let mut req = SiteBuildRequest::new(&self.slug, &self.name)
            .with_build_version(self.build_version)
            .with_user_inputs(user);
        if let Some(run_id) = self.run_id {
            req = req.with_run_id(run_id);
        }
        if let Some(place_id) = &self.place_id {
            req = req.with_place_id(place_id);
        }
        if let Some(style) = &self.style {
            req = req.with_style(style);
        }
        if let Some(seed) = &self.variant_seed {
            req = req.with_variant_seed(seed);
        }
        req
    }
}

fn describe(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::StepCompleted {
            step,
            attempts,
            duration_ms,
            ..
        } => Some(format!("  ✅ {step} ({duration_ms} ms, {attempts} attempt(s))")),
        PipelineEvent::StepReplayed { step, .. } => Some(format!("  ↩️  {step} (journaled)")),
        PipelineEvent::StepFailed { step, error, .. } => Some(format!("  ❌ {step}: {error}")),
        PipelineEvent::StatusChanged { status, .. } => Some(format!("📌 {status}")),
        _ => None,
    }
}

pub async fn run(args: RunArgs, config: &AppConfig) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let pipeline = init_pipeline(config, args.places_file.as_deref())
        .await?
        .with_event_bus(bus);
    let req = args.to_request();

    println!("🏗️  Building {} (run {})\n", req.slug, req.run_id);
    let progress = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PipelineEvent::RunCompleted { .. } | PipelineEvent::RunFailed { .. }) => break,
                Ok(event) => {
                    if let Some(line) = describe(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = pipeline.run(&req).await;
    drop(pipeline);
    let _ = progress.await;

    match result {
        Ok(outcome) => {
            println!("\n🚀 Published {} (quality {}/100)", outcome.slug, outcome.quality.score);
            for key in &outcome.artifacts {
                println!("  {}", config.storage.artifacts_dir().join(key.to_string()).display());
            }
            for warning in &outcome.fusion.warnings {
                println!("  ⚠️  {warning}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("\n{}", format_error_for_cli(&e));
            if config.pipeline.journal.is_durable() {
                eprintln!("Re-run with --run-id {} to resume.", req.run_id);
            } else {
                eprintln!("The memory journal does not survive restarts; set pipeline.journal = \"file\" to resume failed runs.");
            }
            Err(e.into())
        }
    }
}

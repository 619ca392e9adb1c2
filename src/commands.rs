//! CLI command runners.
//!
//! Each `run_*` function backs one `leadq` subcommand, goes through the same
//! [`operations`](crate::operations) as the transports, and prints the result
//! as pretty JSON on stdout. Domain failures become a non-zero exit.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::operations::{run, OperationKind};
use crate::pipeline::Pipeline;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// Connect to the configured database, ensure the schema, and build a pipeline.
pub async fn open_pipeline(config: &Config) -> Result<Pipeline> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    Ok(Pipeline::new(Arc::new(SqliteStore::new(pool)), config))
}

async fn run_and_print(pipeline: &Pipeline, kind: OperationKind, args: Value) -> Result<()> {
    match run(pipeline, kind, &args).await? {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => bail!("{}: {}", kind.name(), e),
    }
}

pub async fn run_ingest(config: &Config, file: &Path, source_hint: Option<String>) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read webhook file: {}", file.display()))?;
    let payload: Value = serde_json::from_str(&content)
        .with_context(|| format!("Webhook file is not valid JSON: {}", file.display()))?;

    let pipeline = open_pipeline(config).await?;
    run_and_print(
        &pipeline,
        OperationKind::IngestWebhook,
        json!({"webhook_payload": payload, "source_hint": source_hint}),
    )
    .await
}

pub async fn run_analyze(
    config: &Config,
    file: &Path,
    duration: Option<i64>,
    context: Option<String>,
) -> Result<()> {
    let transcription = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read transcript file: {}", file.display()))?;

    // Classification needs no storage.
    let pipeline = Pipeline::new(
        Arc::new(lead_intake_core::store::memory::MemoryStore::new()),
        config,
    );
    run_and_print(
        &pipeline,
        OperationKind::AnalyzeTranscriptionContent,
        json!({
            "transcription": transcription,
            "call_metadata": {"duration": duration},
            "business_context": context,
        }),
    )
    .await
}

pub async fn run_history(config: &Config, lead_id: i64) -> Result<()> {
    let pipeline = open_pipeline(config).await?;
    run_and_print(&pipeline, OperationKind::GetLeadHistory, json!({"lead_id": lead_id})).await
}

pub async fn run_report(
    config: &Config,
    range: &str,
    source: Option<String>,
    threshold: i64,
) -> Result<()> {
    let pipeline = open_pipeline(config).await?;
    run_and_print(
        &pipeline,
        OperationKind::GenerateLeadReport,
        json!({"date_range": range, "source_filter": source, "score_threshold": threshold}),
    )
    .await
}

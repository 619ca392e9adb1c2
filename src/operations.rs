//! The closed set of operations Lead Intake exposes.
//!
//! Both transports (stdio JSON-RPC and HTTP) and the CLI go through
//! [`OperationKind`] for discovery and [`run`] for execution. Argument
//! problems and domain failures come back as [`IntakeError`] inside `Ok`;
//! only storage and other internal failures are `Err`.

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use lead_intake_core::canonical::{normalize_webhook, parse_integer};
use lead_intake_core::classifier::classify_transcript;
use lead_intake_core::dedup::{resolve_duplicate, DedupQuery};
use lead_intake_core::error::IntakeError;
use lead_intake_core::models::InteractionType;
use lead_intake_core::report::{build_report, parse_date_range, DateWindow, DEFAULT_DATE_RANGE};
use lead_intake_core::scoring::{score_lead, ScoringSignals};
use lead_intake_core::tracker::{track_interaction, TrackRequest};

use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    NormalizeWebhookData,
    ScoreLeadQuality,
    DeduplicateContact,
    TrackInteraction,
    AnalyzeTranscriptionContent,
    GenerateLeadReport,
    IngestWebhook,
    GetLeadHistory,
}

/// Tool descriptor returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        Self::NormalizeWebhookData,
        Self::ScoreLeadQuality,
        Self::DeduplicateContact,
        Self::TrackInteraction,
        Self::AnalyzeTranscriptionContent,
        Self::GenerateLeadReport,
        Self::IngestWebhook,
        Self::GetLeadHistory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::NormalizeWebhookData => "normalize_webhook_data",
            Self::ScoreLeadQuality => "score_lead_quality",
            Self::DeduplicateContact => "deduplicate_contact",
            Self::TrackInteraction => "track_interaction",
            Self::AnalyzeTranscriptionContent => "analyze_transcription_content",
            Self::GenerateLeadReport => "generate_lead_report",
            Self::IngestWebhook => "ingest_webhook",
            Self::GetLeadHistory => "get_lead_history",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NormalizeWebhookData => {
                "Normalize a CallRail or ActiveCampaign webhook into the canonical lead shape"
            }
            Self::ScoreLeadQuality => {
                "Score a lead from its canonical data and interaction details"
            }
            Self::DeduplicateContact => {
                "Check for an existing contact by phone or email and suggest a merge strategy"
            }
            Self::TrackInteraction => {
                "Record an interaction against a contact and update its score with an audit entry"
            }
            Self::AnalyzeTranscriptionContent => {
                "Classify a call transcript's intent and apply business-risk penalties"
            }
            Self::GenerateLeadReport => {
                "Summarize leads by source and status over a date range"
            }
            Self::IngestWebhook => {
                "Normalize, deduplicate, score, classify, and track a webhook in one step"
            }
            Self::GetLeadHistory => {
                "Return a contact with its interactions and scoring history"
            }
        }
    }

    pub fn input_schema(&self) -> Value {
        match self {
            Self::NormalizeWebhookData | Self::IngestWebhook => json!({
                "type": "object",
                "properties": {
                    "webhook_payload": {"type": "object", "description": "Raw webhook body"},
                    "source_hint": {"type": "string", "description": "Source label when the payload does not identify one"}
                },
                "required": ["webhook_payload"]
            }),
            Self::ScoreLeadQuality => json!({
                "type": "object",
                "properties": {
                    "lead_data": {"type": "object", "description": "Canonical lead data"},
                    "interaction_data": {
                        "type": "object",
                        "properties": {
                            "call_answered": {"type": "boolean"},
                            "interaction_type": {"type": "string"},
                            "call_duration": {"type": "integer"}
                        }
                    }
                },
                "required": ["lead_data"]
            }),
            Self::DeduplicateContact => json!({
                "type": "object",
                "properties": {
                    "phone": {"type": "string"},
                    "email": {"type": "string"},
                    "source_id": {"type": "string"}
                }
            }),
            Self::TrackInteraction => json!({
                "type": "object",
                "properties": {
                    "lead_id": {"type": "integer"},
                    "interaction_type": {"type": "string", "enum": ["Call", "WebForm", "Email"]},
                    "interaction_data": {"type": "object"}
                },
                "required": ["lead_id", "interaction_type"]
            }),
            Self::AnalyzeTranscriptionContent => json!({
                "type": "object",
                "properties": {
                    "transcription": {"type": "string"},
                    "call_metadata": {"type": "object"},
                    "business_context": {"type": "string"}
                },
                "required": ["transcription"]
            }),
            Self::GenerateLeadReport => json!({
                "type": "object",
                "properties": {
                    "date_range": {"type": "string", "default": DEFAULT_DATE_RANGE},
                    "source_filter": {"type": "string"},
                    "score_threshold": {"type": "integer", "default": 0}
                }
            }),
            Self::GetLeadHistory => json!({
                "type": "object",
                "properties": {
                    "lead_id": {"type": "integer"}
                },
                "required": ["lead_id"]
            }),
        }
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

/// A fully parsed operation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    NormalizeWebhookData {
        webhook_payload: Value,
        source_hint: Option<String>,
    },
    ScoreLeadQuality {
        lead_data: Value,
        interaction_data: Value,
    },
    DeduplicateContact {
        phone: Option<String>,
        email: Option<String>,
        source_id: Option<String>,
    },
    TrackInteraction {
        lead_id: i64,
        interaction_type: InteractionType,
        interaction_data: Value,
    },
    AnalyzeTranscriptionContent {
        transcription: String,
        call_metadata: Value,
        business_context: Option<String>,
    },
    GenerateLeadReport {
        date_range: String,
        source_filter: Option<String>,
        score_threshold: i64,
    },
    IngestWebhook {
        webhook_payload: Value,
        source_hint: Option<String>,
    },
    GetLeadHistory {
        lead_id: i64,
    },
}

fn opt_string(args: &Value, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn object_or_empty(args: &Value, key: &str) -> Value {
    match args.get(key) {
        Some(v @ Value::Object(_)) => v.clone(),
        _ => json!({}),
    }
}

fn required_payload(args: &Value, key: &'static str) -> Result<Value, IntakeError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(IntakeError::MissingArgument(key)),
        Some(v @ (Value::Object(_) | Value::Array(_))) => Ok(v.clone()),
        Some(other) => Err(IntakeError::invalid(key, format!("expected an object, got {other}"))),
    }
}

fn required_id(args: &Value, key: &'static str) -> Result<i64, IntakeError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(IntakeError::MissingArgument(key)),
        Some(v) => parse_integer(Some(v))
            .ok_or_else(|| IntakeError::invalid(key, format!("expected an integer, got {v}"))),
    }
}

impl Operation {
    /// Parse an argument object for `kind`.
    pub fn parse(kind: OperationKind, args: &Value) -> Result<Self, IntakeError> {
        let op = match kind {
            OperationKind::NormalizeWebhookData => Self::NormalizeWebhookData {
                webhook_payload: required_payload(args, "webhook_payload")?,
                source_hint: opt_string(args, "source_hint"),
            },
            OperationKind::IngestWebhook => Self::IngestWebhook {
                webhook_payload: required_payload(args, "webhook_payload")?,
                source_hint: opt_string(args, "source_hint"),
            },
            OperationKind::ScoreLeadQuality => Self::ScoreLeadQuality {
                lead_data: object_or_empty(args, "lead_data"),
                interaction_data: object_or_empty(args, "interaction_data"),
            },
            OperationKind::DeduplicateContact => Self::DeduplicateContact {
                phone: opt_string(args, "phone"),
                email: opt_string(args, "email"),
                source_id: opt_string(args, "source_id"),
            },
            OperationKind::TrackInteraction => Self::TrackInteraction {
                lead_id: required_id(args, "lead_id")?,
                interaction_type: InteractionType::parse_lenient(
                    &opt_string(args, "interaction_type")
                        .ok_or(IntakeError::MissingArgument("interaction_type"))?,
                ),
                interaction_data: object_or_empty(args, "interaction_data"),
            },
            OperationKind::AnalyzeTranscriptionContent => Self::AnalyzeTranscriptionContent {
                transcription: opt_string(args, "transcription")
                    .ok_or(IntakeError::MissingArgument("transcription"))?,
                call_metadata: object_or_empty(args, "call_metadata"),
                business_context: opt_string(args, "business_context"),
            },
            OperationKind::GenerateLeadReport => Self::GenerateLeadReport {
                date_range: opt_string(args, "date_range")
                    .unwrap_or_else(|| DEFAULT_DATE_RANGE.to_string()),
                source_filter: opt_string(args, "source_filter"),
                score_threshold: match args.get("score_threshold") {
                    None | Some(Value::Null) => 0,
                    Some(v) => parse_integer(Some(v)).ok_or_else(|| {
                        IntakeError::invalid("score_threshold", format!("expected an integer, got {v}"))
                    })?,
                },
            },
            OperationKind::GetLeadHistory => Self::GetLeadHistory {
                lead_id: required_id(args, "lead_id")?,
            },
        };
        Ok(op)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::NormalizeWebhookData { .. } => OperationKind::NormalizeWebhookData,
            Self::ScoreLeadQuality { .. } => OperationKind::ScoreLeadQuality,
            Self::DeduplicateContact { .. } => OperationKind::DeduplicateContact,
            Self::TrackInteraction { .. } => OperationKind::TrackInteraction,
            Self::AnalyzeTranscriptionContent { .. } => OperationKind::AnalyzeTranscriptionContent,
            Self::GenerateLeadReport { .. } => OperationKind::GenerateLeadReport,
            Self::IngestWebhook { .. } => OperationKind::IngestWebhook,
            Self::GetLeadHistory { .. } => OperationKind::GetLeadHistory,
        }
    }

    /// Execute against `pipeline`.
    pub async fn execute(self, pipeline: &Pipeline) -> Result<Result<Value, IntakeError>> {
        let value = match self {
            Self::NormalizeWebhookData {
                webhook_payload,
                source_hint,
            } => {
                let canonical = normalize_webhook(
                    &webhook_payload,
                    source_hint.as_deref(),
                    pipeline.clock.now_utc(),
                );
                serde_json::to_value(canonical)?
            }
            Self::ScoreLeadQuality {
                lead_data,
                interaction_data,
            } => {
                let signals = match ScoringSignals::from_json(&lead_data, &interaction_data) {
                    Ok(s) => s,
                    Err(e) => return Ok(Err(e)),
                };
                serde_json::to_value(score_lead(&pipeline.scoring, &signals, pipeline.clock.as_ref()))?
            }
            Self::DeduplicateContact {
                phone,
                email,
                source_id,
            } => {
                let query = DedupQuery::new(phone.as_deref(), email.as_deref(), source_id.as_deref());
                serde_json::to_value(resolve_duplicate(pipeline.store.as_ref(), &query).await?)?
            }
            Self::TrackInteraction {
                lead_id,
                interaction_type,
                interaction_data,
            } => {
                let request = TrackRequest {
                    lead_id,
                    interaction_type,
                    detail: interaction_data,
                    qualification_status: None,
                };
                match track_interaction(
                    pipeline.store.as_ref(),
                    &pipeline.tracking,
                    request,
                    pipeline.clock.now_utc(),
                )
                .await?
                {
                    Ok(tracked) => json!({
                        "interaction_id": tracked.interaction_id,
                        "score_contribution": tracked.score_contribution,
                        "new_total_score": tracked.new_total_score,
                        "interaction_tracked": tracked.interaction_tracked,
                    }),
                    Err(e) => return Ok(Err(e)),
                }
            }
            Self::AnalyzeTranscriptionContent {
                transcription,
                call_metadata,
                business_context,
            } => serde_json::to_value(classify_transcript(
                &pipeline.classifier,
                &transcription,
                &call_metadata,
                business_context.as_deref(),
            ))?,
            Self::GenerateLeadReport {
                date_range,
                source_filter,
                score_threshold,
            } => {
                let days = match parse_date_range(&date_range) {
                    Ok(d) => d,
                    Err(e) => return Ok(Err(e)),
                };
                let window = DateWindow::last_days(days, pipeline.clock.now_utc());
                let rows = pipeline
                    .store
                    .report_rows(window.start, source_filter.as_deref(), score_threshold)
                    .await?;
                serde_json::to_value(build_report(
                    &rows,
                    days,
                    window,
                    source_filter.as_deref(),
                    score_threshold,
                ))?
            }
            Self::IngestWebhook {
                webhook_payload,
                source_hint,
            } => match pipeline
                .ingest_webhook(&webhook_payload, source_hint.as_deref())
                .await?
            {
                Ok(outcome) => serde_json::to_value(outcome)?,
                Err(e) => return Ok(Err(e)),
            },
            Self::GetLeadHistory { lead_id } => match pipeline.lead_history(lead_id).await? {
                Ok(history) => serde_json::to_value(history)?,
                Err(e) => return Ok(Err(e)),
            },
        };
        Ok(Ok(value))
    }
}

/// Parse and execute `kind` with `args`.
pub async fn run(
    pipeline: &Pipeline,
    kind: OperationKind,
    args: &Value,
) -> Result<Result<Value, IntakeError>> {
    debug!(operation = kind.name(), "dispatch");
    match Operation::parse(kind, args) {
        Ok(op) => op.execute(pipeline).await,
        Err(e) => Ok(Err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use lead_intake_core::clock::FixedClock;
    use lead_intake_core::store::memory::MemoryStore;
    use std::sync::Arc;

    fn pipeline() -> Pipeline {
        let config: Config = toml::from_str("[db]\npath = \"unused.sqlite\"\n").unwrap();
        Pipeline::new(Arc::new(MemoryStore::new()), &config)
            .with_clock(Arc::new(FixedClock::at_hour(10)))
    }

    #[test]
    fn test_names_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.input_schema()["type"], "object");
        }
        assert_eq!(OperationKind::from_name("enrich_contact_data"), None);
    }

    #[test]
    fn test_parse_argument_errors() {
        assert_eq!(
            Operation::parse(OperationKind::GetLeadHistory, &json!({})),
            Err(IntakeError::MissingArgument("lead_id"))
        );
        assert!(matches!(
            Operation::parse(OperationKind::TrackInteraction, &json!({"lead_id": "abc", "interaction_type": "Call"})),
            Err(IntakeError::InvalidArgument { name: "lead_id", .. })
        ));
        assert_eq!(
            Operation::parse(OperationKind::AnalyzeTranscriptionContent, &json!({"transcription": "  "})),
            Err(IntakeError::MissingArgument("transcription"))
        );
        assert_eq!(
            Operation::parse(OperationKind::GenerateLeadReport, &json!({})),
            Ok(Operation::GenerateLeadReport {
                date_range: "30d".into(),
                source_filter: None,
                score_threshold: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_score_operation() {
        let p = pipeline();
        let value = run(
            &p,
            OperationKind::ScoreLeadQuality,
            &json!({
                "lead_data": {},
                "interaction_data": {"call_answered": true, "call_duration": 150}
            }),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(value["lead_score"], 66);
        assert_eq!(value["qualification_status"], "Warm Lead");
    }

    #[tokio::test]
    async fn test_track_missing_lead_is_rejected() {
        let p = pipeline();
        let result = run(
            &p,
            OperationKind::TrackInteraction,
            &json!({"lead_id": 99, "interaction_type": "Call"}),
        )
        .await
        .unwrap();
        assert_eq!(result, Err(IntakeError::LeadNotFound(99)));
    }

    #[tokio::test]
    async fn test_bad_date_range_is_rejected() {
        let p = pipeline();
        let result = run(&p, OperationKind::GenerateLeadReport, &json!({"date_range": "soon"}))
            .await
            .unwrap();
        assert!(matches!(result, Err(IntakeError::InvalidArgument { name: "date_range", .. })));
    }

    #[tokio::test]
    async fn test_ingest_then_report() {
        let p = pipeline();
        let form = json!({
            "contact": {
                "id": "77",
                "email": "Pat@Example.com",
                "first_name": "pat",
                "last_name": "lee",
                "fields": {"utmsource": "google"}
            }
        });
        let ingested = run(&p, OperationKind::IngestWebhook, &json!({"webhook_payload": form}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ingested["created"], true);

        let report = run(&p, OperationKind::GenerateLeadReport, &json!({"date_range": "7d"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report["summary"]["total_leads"], 1);
        assert_eq!(report["report_period"], "Last 7 days");
    }
}

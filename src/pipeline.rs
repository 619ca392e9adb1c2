//! End-to-end intake pipeline.
//!
//! [`Pipeline`] bundles the store, the rule tables from [`Config`], and a
//! [`Clock`], and runs the full intake sequence for one webhook:
//!
//! ```text
//! webhook ─▶ normalize ─▶ dedup ─┬─ insufficient_data ─▶ rejected
//!                                ├─ create_new_contact ─▶ insert
//!                                └─ duplicate ─▶ fill empty fields
//!        ─▶ score ─▶ classify transcript (if any) ─▶ track interaction
//! ```

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use lead_intake_core::canonical::normalize_webhook;
use lead_intake_core::classifier::{classify_transcript, ClassificationResult, ClassifierRules};
use lead_intake_core::clock::{Clock, SystemClock};
use lead_intake_core::dedup::{resolve_duplicate, DedupQuery, DedupResult};
use lead_intake_core::error::IntakeError;
use lead_intake_core::models::{LeadHistory, NewLead, TrackedInteraction};
use lead_intake_core::scoring::{score_lead, LeadScore, ScoringSignals, ScoringWeights};
use lead_intake_core::store::LeadStore;
use lead_intake_core::tracker::{track_interaction, ContributionTable, TrackRequest};

use crate::config::Config;

/// Everything the pipeline produced for one webhook.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub lead_id: i64,
    pub created: bool,
    pub dedup: DedupResult,
    pub score: LeadScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
    pub tracking: TrackedInteraction,
}

/// Shared handle used by the CLI and both transports.
#[derive(Clone)]
pub struct Pipeline {
    pub store: Arc<dyn LeadStore>,
    pub scoring: ScoringWeights,
    pub classifier: ClassifierRules,
    pub tracking: ContributionTable,
    pub clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn LeadStore>, config: &Config) -> Self {
        Self {
            store,
            scoring: config.scoring.clone(),
            classifier: config.classifier.clone(),
            tracking: config.tracking.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the full intake sequence for one webhook.
    pub async fn ingest_webhook(
        &self,
        payload: &Value,
        source_hint: Option<&str>,
    ) -> Result<Result<IngestOutcome, IntakeError>> {
        let canonical = normalize_webhook(payload, source_hint, self.clock.now_utc());

        let query = DedupQuery::new(
            Some(&canonical.contact.phone.normalized),
            Some(&canonical.contact.email),
            Some(canonical.additional_data.source_unique_id()),
        );
        let dedup = resolve_duplicate(self.store.as_ref(), &query).await?;
        if dedup.is_insufficient() {
            return Ok(Err(IntakeError::InsufficientContactData));
        }

        let new_lead = NewLead::from_payload(&canonical);
        let (lead_id, created) = match dedup.existing_contact_id {
            Some(id) => {
                self.store.fill_empty_fields(id, &new_lead).await?;
                (id, false)
            }
            None => (self.store.create_lead(&new_lead).await?, true),
        };

        let score = score_lead(
            &self.scoring,
            &ScoringSignals::from_payload(&canonical),
            self.clock.as_ref(),
        );

        let classification = canonical.additional_data.call_transcription().map(|text| {
            let metadata = json!({ "duration": canonical.additional_data.call_duration() });
            classify_transcript(&self.classifier, text, &metadata, None)
        });

        let status = classification
            .as_ref()
            .map(|c| c.recommended_status.clone())
            .unwrap_or_else(|| score.qualification_status.clone());

        let snapshot = json!({
            "canonical": canonical,
            "score": score,
            "classification": classification,
        });
        let request = TrackRequest {
            lead_id,
            interaction_type: canonical.interaction_type,
            detail: snapshot,
            qualification_status: Some(status),
        };
        let tracking = match track_interaction(
            self.store.as_ref(),
            &self.tracking,
            request,
            self.clock.now_utc(),
        )
        .await?
        {
            Ok(t) => t,
            Err(e) => return Ok(Err(e)),
        };

        info!(
            lead_id,
            created,
            source = %canonical.source_system,
            score = score.lead_score,
            "webhook ingested"
        );

        Ok(Ok(IngestOutcome {
            lead_id,
            created,
            dedup,
            score,
            classification,
            tracking,
        }))
    }

    /// A contact with its interactions and score audit trail.
    pub async fn lead_history(&self, lead_id: i64) -> Result<Result<LeadHistory, IntakeError>> {
        let Some(lead) = self.store.get_lead(lead_id).await? else {
            return Ok(Err(IntakeError::LeadNotFound(lead_id)));
        };
        Ok(Ok(LeadHistory {
            lead,
            interactions: self.store.interactions(lead_id).await?,
            scoring_history: self.store.scoring_history(lead_id).await?,
        }))
    }
}

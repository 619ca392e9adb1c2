//! Interaction tracking with an append-only score audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::IntakeError;
use crate::models::{InteractionRecord, InteractionType, TrackedInteraction};
use crate::store::LeadStore;

/// Score contribution per interaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributionTable {
    pub call: i64,
    pub web_form: i64,
    pub email: i64,
    pub other: i64,
}

impl Default for ContributionTable {
    fn default() -> Self {
        Self {
            call: 25,
            web_form: 15,
            email: 10,
            other: 0,
        }
    }
}

impl ContributionTable {
    pub fn contribution(&self, kind: InteractionType) -> i64 {
        match kind {
            InteractionType::Call => self.call,
            InteractionType::WebForm => self.web_form,
            InteractionType::Email => self.email,
            InteractionType::Unknown => self.other,
        }
    }
}

/// What to record for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequest {
    pub lead_id: i64,
    pub interaction_type: InteractionType,
    pub detail: Value,
    /// New qualification status to set in the same write.
    pub qualification_status: Option<String>,
}

/// Record an interaction against a contact.
///
/// The outer `Result` carries storage failures; the inner one carries
/// [`IntakeError::LeadNotFound`] when the contact does not exist, in which
/// case nothing was written.
pub async fn track_interaction(
    store: &dyn LeadStore,
    table: &ContributionTable,
    request: TrackRequest,
    now: DateTime<Utc>,
) -> anyhow::Result<Result<TrackedInteraction, IntakeError>> {
    let contribution = table.contribution(request.interaction_type);
    let record = InteractionRecord {
        lead_id: request.lead_id,
        interaction_type: request.interaction_type,
        payload: request.detail,
        score_contribution: contribution,
        reason: format!("{} interaction", request.interaction_type),
        qualification_status: request.qualification_status,
        recorded_at: now,
    };

    match store.record_interaction(&record).await? {
        Some(tracked) => {
            info!(
                lead_id = record.lead_id,
                interaction = %record.interaction_type,
                contribution,
                new_score = tracked.new_total_score,
                "interaction tracked"
            );
            Ok(Ok(tracked))
        }
        None => Ok(Err(IntakeError::LeadNotFound(record.lead_id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewLead;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn request(lead_id: i64, kind: InteractionType) -> TrackRequest {
        TrackRequest {
            lead_id,
            interaction_type: kind,
            detail: json!({"note": "test"}),
            qualification_status: None,
        }
    }

    #[tokio::test]
    async fn test_history_matches_stored_score() {
        let store = MemoryStore::new();
        let table = ContributionTable::default();
        let id = store.create_lead(&NewLead::default()).await.unwrap();

        let kinds = [
            InteractionType::Call,
            InteractionType::WebForm,
            InteractionType::Email,
            InteractionType::Unknown,
            InteractionType::Call,
        ];
        for kind in kinds {
            track_interaction(&store, &table, request(id, kind), Utc::now())
                .await
                .unwrap()
                .unwrap();
        }

        let history = store.scoring_history(id).await.unwrap();
        let lead = store.get_lead(id).await.unwrap().unwrap();
        assert_eq!(history.len(), kinds.len());
        assert_eq!(history.last().unwrap().new_score, lead.lead_score);
        assert_eq!(lead.lead_score, 25 + 15 + 10 + 25);
        for pair in history.windows(2) {
            assert_eq!(pair[0].new_score, pair[1].old_score);
        }
        assert_eq!(history[0].reason, "Call interaction");
        assert_eq!(history[1].reason, "WebForm interaction");
        assert_eq!(store.interactions(id).await.unwrap().len(), kinds.len());
    }

    #[tokio::test]
    async fn test_missing_lead_is_domain_error() {
        let store = MemoryStore::new();
        let result = track_interaction(
            &store,
            &ContributionTable::default(),
            request(42, InteractionType::Call),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(result, Err(IntakeError::LeadNotFound(42)));
        assert!(store.scoring_history(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_applies_with_score() {
        let store = MemoryStore::new();
        let id = store.create_lead(&NewLead::default()).await.unwrap();
        let mut req = request(id, InteractionType::WebForm);
        req.qualification_status = Some("Cold Lead".into());
        let tracked = track_interaction(&store, &ContributionTable::default(), req, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tracked.score_contribution, 15);
        assert_eq!(tracked.new_total_score, 15);
        assert!(tracked.interaction_tracked);
        let lead = store.get_lead(id).await.unwrap().unwrap();
        assert_eq!(lead.qualification_status, "Cold Lead");
    }
}

//! In-memory [`LeadStore`] implementation for tests and embedding.
//!
//! All tables live in one [`MemoryState`] behind a single `RwLock`, so
//! [`record_interaction`](LeadStore::record_interaction) applies its three
//! writes under one guard.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Interaction, InteractionRecord, Lead, NewLead, ReportRow, ScoringHistoryEntry,
    TrackedInteraction, NEW_LEAD_STATUS,
};

use super::LeadStore;

#[derive(Default)]
struct MemoryState {
    leads: Vec<Lead>,
    interactions: Vec<Interaction>,
    history: Vec<ScoringHistoryEntry>,
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

fn fill(slot: &mut String, value: &str) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value.to_string();
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn find_contacts(&self, phone: Option<&str>, email: Option<&str>) -> Result<Vec<i64>> {
        let state = self.read()?;
        Ok(state
            .leads
            .iter()
            .filter(|l| {
                phone.is_some_and(|p| l.phone.normalized == p)
                    || email.is_some_and(|e| l.email == e)
            })
            .map(|l| l.id)
            .collect())
    }

    async fn create_lead(&self, lead: &NewLead) -> Result<i64> {
        let mut state = self.write()?;
        let id = state.leads.len() as i64 + 1;
        state.leads.push(Lead {
            id,
            source_system: lead.source_system.clone(),
            source_unique_id: lead.source_unique_id.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            name: lead.name.clone(),
            lead_score: 0,
            qualification_status: NEW_LEAD_STATUS.to_string(),
            utm: lead.utm.clone(),
            device_type: lead.device_type.clone(),
            created_at: lead.created_at,
            updated_at: lead.created_at,
        });
        Ok(id)
    }

    async fn fill_empty_fields(&self, id: i64, lead: &NewLead) -> Result<()> {
        let mut state = self.write()?;
        let Some(stored) = state.leads.iter_mut().find(|l| l.id == id) else {
            return Ok(());
        };
        if stored.phone.normalized.is_empty() {
            stored.phone = lead.phone.clone();
        }
        if stored.name.full.is_empty() {
            stored.name = lead.name.clone();
        }
        fill(&mut stored.email, &lead.email);
        fill(&mut stored.source_unique_id, &lead.source_unique_id);
        fill(&mut stored.utm.source, &lead.utm.source);
        fill(&mut stored.utm.medium, &lead.utm.medium);
        fill(&mut stored.utm.campaign, &lead.utm.campaign);
        fill(&mut stored.utm.content, &lead.utm.content);
        fill(&mut stored.utm.term, &lead.utm.term);
        fill(&mut stored.device_type, &lead.device_type);
        stored.updated_at = lead.created_at;
        Ok(())
    }

    async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
        let state = self.read()?;
        Ok(state.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn record_interaction(
        &self,
        record: &InteractionRecord,
    ) -> Result<Option<TrackedInteraction>> {
        let mut state = self.write()?;
        let Some(lead) = state.leads.iter_mut().find(|l| l.id == record.lead_id) else {
            return Ok(None);
        };

        let previous_score = lead.lead_score;
        let new_score = previous_score + record.score_contribution;
        lead.lead_score = new_score;
        lead.updated_at = record.recorded_at;
        if let Some(status) = &record.qualification_status {
            lead.qualification_status = status.clone();
        }

        let interaction_id = state.interactions.len() as i64 + 1;
        state.interactions.push(Interaction {
            id: interaction_id,
            lead_id: record.lead_id,
            interaction_type: record.interaction_type,
            payload: record.payload.clone(),
            score_contribution: record.score_contribution,
            created_at: record.recorded_at,
        });

        let history_id = state.history.len() as i64 + 1;
        state.history.push(ScoringHistoryEntry {
            id: history_id,
            lead_id: record.lead_id,
            old_score: previous_score,
            new_score,
            reason: record.reason.clone(),
            created_at: record.recorded_at,
        });

        Ok(Some(TrackedInteraction {
            interaction_id,
            score_contribution: record.score_contribution,
            previous_score,
            new_total_score: new_score,
            interaction_tracked: true,
        }))
    }

    async fn interactions(&self, lead_id: i64) -> Result<Vec<Interaction>> {
        let state = self.read()?;
        Ok(state
            .interactions
            .iter()
            .filter(|i| i.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn scoring_history(&self, lead_id: i64) -> Result<Vec<ScoringHistoryEntry>> {
        let state = self.read()?;
        Ok(state
            .history
            .iter()
            .filter(|h| h.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn report_rows(
        &self,
        since: DateTime<Utc>,
        source_filter: Option<&str>,
        score_threshold: i64,
    ) -> Result<Vec<ReportRow>> {
        let state = self.read()?;
        let mut groups: BTreeMap<(String, String), (i64, i64, i64)> = BTreeMap::new();
        for lead in state.leads.iter().filter(|l| {
            l.created_at >= since && source_filter.map_or(true, |s| l.source_system == s)
        }) {
            let entry = groups
                .entry((lead.source_system.clone(), lead.qualification_status.clone()))
                .or_default();
            entry.0 += 1;
            entry.1 += lead.lead_score;
            if lead.lead_score >= score_threshold {
                entry.2 += 1;
            }
        }

        Ok(groups
            .into_iter()
            .map(|((source_system, qualification_status), (total, sum, qualified))| ReportRow {
                source_system,
                qualification_status,
                total_leads: total,
                avg_score: sum as f64 / total as f64,
                qualified_leads: qualified,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InteractionType, PhoneNumber};

    fn new_lead(phone: &str, email: &str) -> NewLead {
        NewLead {
            source_system: "CallRail".into(),
            phone: PhoneNumber {
                normalized: phone.into(),
                ..Default::default()
            },
            email: email.into(),
            created_at: Utc::now(),
            ..Default::default()
        }
    }

    fn record(lead_id: i64, contribution: i64) -> InteractionRecord {
        InteractionRecord {
            lead_id,
            interaction_type: InteractionType::Call,
            payload: serde_json::json!({}),
            score_contribution: contribution,
            reason: "Call interaction".into(),
            qualification_status: None,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_contacts_phone_or_email() {
        let store = MemoryStore::new();
        let a = store.create_lead(&new_lead("5551234567", "")).await.unwrap();
        let b = store.create_lead(&new_lead("", "b@example.com")).await.unwrap();

        assert_eq!(
            store.find_contacts(Some("5551234567"), None).await.unwrap(),
            vec![a]
        );
        assert_eq!(
            store
                .find_contacts(Some("5551234567"), Some("b@example.com"))
                .await
                .unwrap(),
            vec![a, b]
        );
        assert!(store.find_contacts(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_interaction_missing_lead_writes_nothing() {
        let store = MemoryStore::new();
        assert!(store.record_interaction(&record(9, 25)).await.unwrap().is_none());
        assert!(store.interactions(9).await.unwrap().is_empty());
        assert!(store.scoring_history(9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fill_empty_fields_keeps_existing() {
        let store = MemoryStore::new();
        let id = store.create_lead(&new_lead("5551234567", "")).await.unwrap();
        store
            .fill_empty_fields(id, &new_lead("5559999999", "new@example.com"))
            .await
            .unwrap();
        let lead = store.get_lead(id).await.unwrap().unwrap();
        assert_eq!(lead.phone.normalized, "5551234567");
        assert_eq!(lead.email, "new@example.com");
    }
}

//! Storage abstraction for Lead Intake.
//!
//! The [`LeadStore`] trait defines every persistence operation the pipeline
//! needs, so the resolver, tracker, and report can run against SQLite in the
//! app crate or against [`memory::MemoryStore`] in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Interaction, InteractionRecord, Lead, NewLead, ReportRow, ScoringHistoryEntry,
    TrackedInteraction,
};

/// Abstract storage backend for contacts, interactions, and the score audit
/// trail.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_contacts`](LeadStore::find_contacts) | Contacts matching a phone OR an email |
/// | [`create_lead`](LeadStore::create_lead) | Insert a new contact |
/// | [`fill_empty_fields`](LeadStore::fill_empty_fields) | Back-fill blank contact fields |
/// | [`get_lead`](LeadStore::get_lead) | Fetch one contact |
/// | [`record_interaction`](LeadStore::record_interaction) | Atomic interaction + score + audit write |
/// | [`interactions`](LeadStore::interactions) | A contact's interactions, oldest first |
/// | [`scoring_history`](LeadStore::scoring_history) | A contact's audit rows, oldest first |
/// | [`report_rows`](LeadStore::report_rows) | Grouped rollup for reporting |
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Ids of contacts whose normalized phone equals `phone` or whose email
    /// equals `email`, lowest id first. `None` arguments are not matched.
    async fn find_contacts(&self, phone: Option<&str>, email: Option<&str>) -> Result<Vec<i64>>;

    /// Insert a contact with score 0 and status `new`. Returns its id.
    async fn create_lead(&self, lead: &NewLead) -> Result<i64>;

    /// Copy fields from `lead` into the stored contact wherever the stored
    /// value is empty. Non-empty stored values are never overwritten.
    async fn fill_empty_fields(&self, id: i64, lead: &NewLead) -> Result<()>;

    async fn get_lead(&self, id: i64) -> Result<Option<Lead>>;

    /// Write the interaction, add its contribution to the contact's score,
    /// and append the audit row, all or nothing.
    ///
    /// Returns `None` (and writes nothing) when the contact does not exist.
    async fn record_interaction(
        &self,
        record: &InteractionRecord,
    ) -> Result<Option<TrackedInteraction>>;

    async fn interactions(&self, lead_id: i64) -> Result<Vec<Interaction>>;

    async fn scoring_history(&self, lead_id: i64) -> Result<Vec<ScoringHistoryEntry>>;

    /// Contacts created at or after `since`, grouped by (source, status).
    async fn report_rows(
        &self,
        since: DateTime<Utc>,
        source_filter: Option<&str>,
        score_threshold: i64,
    ) -> Result<Vec<ReportRow>>;
}

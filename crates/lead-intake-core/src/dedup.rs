//! Duplicate contact resolution.
//!
//! Looks up existing contacts by normalized phone OR lower-cased email and
//! tells the caller whether to create a new contact or merge into an old one.
//! When several contacts match, the oldest (lowest id) wins and
//! `candidate_count` reports how many matched.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::store::LeadStore;

pub const ACTION_CREATE: &str = "create_new_contact";
pub const ACTION_INSUFFICIENT: &str = "insufficient_data";
pub const MERGE_UPDATE_EMPTY: &str = "update_empty_fields";

/// Lookup keys for duplicate resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupQuery {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source_id: Option<String>,
}

impl DedupQuery {
    /// Build a query, normalizing phone to digits and email to lower case.
    /// Values that are empty after normalization count as absent.
    pub fn new(phone: Option<&str>, email: Option<&str>, source_id: Option<&str>) -> Self {
        let phone = phone
            .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|p| !p.is_empty());
        let email = email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        let source_id = source_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            phone,
            email,
            source_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupResult {
    pub duplicate_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_contact_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<&'static str>,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl DedupResult {
    pub fn is_insufficient(&self) -> bool {
        self.action == Some(ACTION_INSUFFICIENT)
    }
}

pub async fn resolve_duplicate(store: &dyn LeadStore, query: &DedupQuery) -> Result<DedupResult> {
    if query.phone.is_none() && query.email.is_none() {
        return Ok(DedupResult {
            duplicate_found: false,
            action: Some(ACTION_INSUFFICIENT),
            existing_contact_id: None,
            merge_strategy: None,
            confidence: Confidence::Low,
            candidate_count: None,
            source_id: query.source_id.clone(),
        });
    }

    let matches = store
        .find_contacts(query.phone.as_deref(), query.email.as_deref())
        .await?;
    debug!(candidates = matches.len(), "dedup lookup");

    let result = match matches.iter().min() {
        Some(&oldest) => DedupResult {
            duplicate_found: true,
            action: None,
            existing_contact_id: Some(oldest),
            merge_strategy: Some(MERGE_UPDATE_EMPTY),
            confidence: if query.phone.is_some() && query.email.is_some() {
                Confidence::High
            } else {
                Confidence::Medium
            },
            candidate_count: Some(matches.len()),
            source_id: query.source_id.clone(),
        },
        None => DedupResult {
            duplicate_found: false,
            action: Some(ACTION_CREATE),
            existing_contact_id: None,
            merge_strategy: None,
            confidence: Confidence::High,
            candidate_count: None,
            source_id: query.source_id.clone(),
        },
    };
    Ok(result)
}

//! Core data models used throughout Lead Intake.
//!
//! [`CanonicalPayload`] is the transient, source-agnostic shape every inbound
//! event is reduced to. [`Lead`], [`Interaction`], and [`ScoringHistoryEntry`]
//! mirror the three persisted tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source label for call-tracking events.
pub const CALL_TRACKING_SOURCE: &str = "CallRail";
/// Source label for form-automation events.
pub const FORM_AUTOMATION_SOURCE: &str = "ActiveCampaign";
/// Source label when nothing identifies the sender.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Kind of inbound interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InteractionType {
    Call,
    WebForm,
    Email,
    #[default]
    Unknown,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::WebForm => "WebForm",
            Self::Email => "Email",
            Self::Unknown => "Unknown",
        }
    }

    /// Lenient parse used for caller-supplied labels (`call`, `form`, `WebForm`, ...).
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "call" | "phone" => Self::Call,
            "webform" | "web_form" | "web form" | "form" => Self::WebForm,
            "email" => Self::Email,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phone number in the four forms downstream systems ask for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub raw: String,
    pub normalized: String,
    pub national: String,
    pub international: String,
}

/// A parsed personal name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub full: String,
    pub first: String,
    pub middle: String,
    pub last: String,
    pub suffix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: PhoneNumber,
    pub email: String,
    pub name: PersonName,
}

/// UTM attribution fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utm {
    pub source: String,
    pub medium: String,
    pub campaign: String,
    pub content: String,
    pub term: String,
}

/// Source-specific details of a call-tracking event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
    pub call_duration: Option<i64>,
    pub call_answered: Option<bool>,
    pub call_recording: String,
    pub call_transcription: String,
    pub source_unique_id: String,
    pub device_type: String,
}

/// Source-specific details of a form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDetails {
    pub form_type: String,
    pub form_name: String,
    pub message: String,
    pub source_unique_id: String,
    pub device_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalData {
    Call(CallDetails),
    Form(FormDetails),
}

impl Default for AdditionalData {
    fn default() -> Self {
        Self::Form(FormDetails::default())
    }
}

impl AdditionalData {
    pub fn source_unique_id(&self) -> &str {
        match self {
            Self::Call(c) => &c.source_unique_id,
            Self::Form(f) => &f.source_unique_id,
        }
    }

    pub fn device_type(&self) -> &str {
        match self {
            Self::Call(c) => &c.device_type,
            Self::Form(f) => &f.device_type,
        }
    }

    pub fn call_answered(&self) -> bool {
        matches!(self, Self::Call(c) if c.call_answered == Some(true))
    }

    pub fn call_duration(&self) -> Option<i64> {
        match self {
            Self::Call(c) => c.call_duration,
            Self::Form(_) => None,
        }
    }

    /// Non-empty call transcription, if any.
    pub fn call_transcription(&self) -> Option<&str> {
        match self {
            Self::Call(c) if !c.call_transcription.trim().is_empty() => {
                Some(&c.call_transcription)
            }
            _ => None,
        }
    }
}

/// The normalized, source-agnostic representation of one inbound event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPayload {
    pub source_system: String,
    pub interaction_type: InteractionType,
    pub contact: ContactInfo,
    pub utm: Utm,
    pub device: String,
    pub additional_data: AdditionalData,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw_payload: serde_json::Value,
}

/// A stored contact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lead {
    pub id: i64,
    pub source_system: String,
    pub source_unique_id: String,
    pub phone: PhoneNumber,
    pub email: String,
    pub name: PersonName,
    pub lead_score: i64,
    pub qualification_status: String,
    pub utm: Utm,
    pub device_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating (or back-filling) a contact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewLead {
    pub source_system: String,
    pub source_unique_id: String,
    pub phone: PhoneNumber,
    pub email: String,
    pub name: PersonName,
    pub utm: Utm,
    pub device_type: String,
    pub created_at: DateTime<Utc>,
}

impl NewLead {
    pub fn from_payload(payload: &CanonicalPayload) -> Self {
        Self {
            source_system: payload.source_system.clone(),
            source_unique_id: payload.additional_data.source_unique_id().to_string(),
            phone: payload.contact.phone.clone(),
            email: payload.contact.email.clone(),
            name: payload.contact.name.clone(),
            utm: payload.utm.clone(),
            device_type: payload.device.clone(),
            created_at: payload.timestamp,
        }
    }
}

/// Status assigned to freshly created contacts.
pub const NEW_LEAD_STATUS: &str = "new";

/// A stored interaction. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub id: i64,
    pub lead_id: i64,
    pub interaction_type: InteractionType,
    pub payload: serde_json::Value,
    pub score_contribution: i64,
    pub created_at: DateTime<Utc>,
}

/// One append-only audit row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringHistoryEntry {
    pub id: i64,
    pub lead_id: i64,
    pub old_score: i64,
    pub new_score: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the store writes for one tracked interaction, atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub lead_id: i64,
    pub interaction_type: InteractionType,
    pub payload: serde_json::Value,
    pub score_contribution: i64,
    pub reason: String,
    /// Replaces the contact's qualification status in the same write.
    pub qualification_status: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Result of a tracked interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedInteraction {
    pub interaction_id: i64,
    pub score_contribution: i64,
    pub previous_score: i64,
    pub new_total_score: i64,
    pub interaction_tracked: bool,
}

/// A contact with its full interaction and score history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadHistory {
    pub lead: Lead,
    pub interactions: Vec<Interaction>,
    pub scoring_history: Vec<ScoringHistoryEntry>,
}

/// One (source, status) group of the lead rollup.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub source_system: String,
    pub qualification_status: String,
    pub total_leads: i64,
    pub avg_score: f64,
    pub qualified_leads: i64,
}

//! Rule-based lead scoring.
//!
//! A lead accumulates points for each signal it carries (answered call, form
//! submission, contact details, traffic source, device, long calls). Contacts
//! that arrive during business hours get a percentage boost, truncated toward
//! zero. The total maps to a qualification band via [`ScoringWeights::status_bands`].
//!
//! All weights come from an immutable [`ScoringWeights`] value loaded from the
//! `[scoring]` config table; tests pass alternates directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{parse_bool, parse_integer};
use crate::clock::Clock;
use crate::error::IntakeError;
use crate::models::{CanonicalPayload, InteractionType};

/// One qualification band: scores at or above `min` get `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBand {
    pub min: i64,
    pub status: String,
}

/// Scoring weights and thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub call_answered: i64,
    pub form_submission: i64,
    pub email_provided: i64,
    pub phone_provided: i64,
    pub organic_sources: Vec<String>,
    pub organic_bonus: i64,
    pub social_sources: Vec<String>,
    pub social_bonus: i64,
    pub mobile_bonus: i64,
    /// Calls strictly longer than this many seconds earn `long_call_bonus`.
    pub long_call_seconds: i64,
    pub long_call_bonus: i64,
    /// Inclusive local-hour window.
    pub business_hours_start: u32,
    pub business_hours_end: u32,
    /// Multiplier in percent (120 = x1.2).
    pub business_hours_percent: i64,
    /// Highest band first.
    pub status_bands: Vec<StatusBand>,
    pub fallback_status: String,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        let band = |min: i64, status: &str| StatusBand {
            min,
            status: status.to_string(),
        };
        Self {
            call_answered: 25,
            form_submission: 15,
            email_provided: 10,
            phone_provided: 15,
            organic_sources: vec!["google".into(), "bing".into(), "search".into()],
            organic_bonus: 20,
            social_sources: vec!["facebook".into(), "linkedin".into()],
            social_bonus: 10,
            mobile_bonus: 5,
            long_call_seconds: 120,
            long_call_bonus: 30,
            business_hours_start: 9,
            business_hours_end: 17,
            business_hours_percent: 120,
            status_bands: vec![
                band(80, "Hot Lead"),
                band(60, "Warm Lead"),
                band(40, "Qualified Lead"),
                band(20, "Cold Lead"),
            ],
            fallback_status: "Unqualified".into(),
        }
    }
}

impl ScoringWeights {
    /// Map a score to its qualification band.
    pub fn qualification_status(&self, score: i64) -> &str {
        self.status_bands
            .iter()
            .find(|b| score >= b.min)
            .map(|b| b.status.as_str())
            .unwrap_or(self.fallback_status.as_str())
    }

    fn in_business_hours(&self, hour: u32) -> bool {
        (self.business_hours_start..=self.business_hours_end).contains(&hour)
    }

    fn multiplier_label(&self) -> String {
        format!("x{}", self.business_hours_percent as f64 / 100.0)
    }
}

/// The signals scoring looks at, independent of where they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringSignals {
    pub call_answered: bool,
    pub interaction_type: InteractionType,
    pub has_email: bool,
    pub has_phone: bool,
    pub utm_source: String,
    pub device: String,
    pub call_duration: Option<i64>,
}

impl ScoringSignals {
    pub fn from_payload(payload: &CanonicalPayload) -> Self {
        Self {
            call_answered: payload.additional_data.call_answered(),
            interaction_type: payload.interaction_type,
            has_email: !payload.contact.email.is_empty(),
            has_phone: !payload.contact.phone.normalized.is_empty(),
            utm_source: payload.utm.source.clone(),
            device: payload.device.clone(),
            call_duration: payload.additional_data.call_duration(),
        }
    }

    /// Read signals from caller-supplied `lead_data` (canonical payload shape)
    /// and `interaction_data` objects.
    pub fn from_json(lead: &Value, interaction: &Value) -> Result<Self, IntakeError> {
        let duration = interaction.get("call_duration");
        let call_duration = match duration {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(parse_integer(Some(v)).ok_or_else(|| {
                IntakeError::invalid("call_duration", format!("not an integer: {v}"))
            })?),
        };

        let contact = &lead["contact"];
        Ok(Self {
            call_answered: parse_bool(interaction.get("call_answered")).unwrap_or(false),
            interaction_type: interaction
                .get("interaction_type")
                .and_then(Value::as_str)
                .map(InteractionType::parse_lenient)
                .unwrap_or_default(),
            has_email: non_empty(&contact["email"]),
            has_phone: non_empty(&contact["phone"]["normalized"]),
            utm_source: lead["utm"]["source"].as_str().unwrap_or_default().to_string(),
            device: lead["device"].as_str().unwrap_or_default().to_string(),
            call_duration,
        })
    }
}

fn non_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Null => false,
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub factor_count: usize,
    pub business_hours_applied: bool,
    pub scored_at: DateTime<Utc>,
}

/// Output of [`score_lead`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadScore {
    pub lead_score: i64,
    pub scoring_factors: Vec<String>,
    pub qualification_status: String,
    pub score_breakdown: ScoreBreakdown,
}

pub fn score_lead(weights: &ScoringWeights, signals: &ScoringSignals, clock: &dyn Clock) -> LeadScore {
    let mut score = 0;
    let mut factors = Vec::new();
    let mut add = |points: i64, label: String| {
        score += points;
        factors.push(label);
    };

    if signals.call_answered {
        add(weights.call_answered, format!("Call answered (+{})", weights.call_answered));
    }
    if signals.interaction_type == InteractionType::WebForm {
        add(
            weights.form_submission,
            format!("Form submission (+{})", weights.form_submission),
        );
    }
    if signals.has_email {
        add(weights.email_provided, format!("Email provided (+{})", weights.email_provided));
    }
    if signals.has_phone {
        add(weights.phone_provided, format!("Phone provided (+{})", weights.phone_provided));
    }

    let source = signals.utm_source.trim().to_lowercase();
    if weights.organic_sources.iter().any(|s| s.eq_ignore_ascii_case(&source)) {
        add(
            weights.organic_bonus,
            format!("Organic search traffic (+{})", weights.organic_bonus),
        );
    } else if weights.social_sources.iter().any(|s| s.eq_ignore_ascii_case(&source)) {
        add(
            weights.social_bonus,
            format!("Social media traffic (+{})", weights.social_bonus),
        );
    }

    if signals.device.trim().eq_ignore_ascii_case("mobile") {
        add(weights.mobile_bonus, format!("Mobile user (+{})", weights.mobile_bonus));
    }

    if let Some(duration) = signals.call_duration.filter(|d| *d > weights.long_call_seconds) {
        add(
            weights.long_call_bonus,
            format!("Long call duration {duration}s (+{})", weights.long_call_bonus),
        );
    }

    let business_hours = weights.in_business_hours(clock.local_hour());
    if business_hours {
        score = score * weights.business_hours_percent / 100;
        factors.push(format!("Business hours contact ({})", weights.multiplier_label()));
    }

    LeadScore {
        lead_score: score,
        qualification_status: weights.qualification_status(score).to_string(),
        score_breakdown: ScoreBreakdown {
            factor_count: factors.len(),
            business_hours_applied: business_hours,
            scored_at: clock.now_utc(),
        },
        scoring_factors: factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use serde_json::json;

    fn answered_long_call() -> ScoringSignals {
        ScoringSignals {
            call_answered: true,
            interaction_type: InteractionType::Call,
            has_phone: true,
            call_duration: Some(150),
            ..Default::default()
        }
    }

    #[test]
    fn test_answered_long_call_in_business_hours_is_hot() {
        let weights = ScoringWeights::default();
        let result = score_lead(&weights, &answered_long_call(), &FixedClock::at_hour(10));
        assert_eq!(result.lead_score, 84);
        assert_eq!(result.qualification_status, "Hot Lead");
        assert_eq!(
            result.scoring_factors,
            vec![
                "Call answered (+25)",
                "Phone provided (+15)",
                "Long call duration 150s (+30)",
                "Business hours contact (x1.2)",
            ]
        );
        assert!(result.score_breakdown.business_hours_applied);
        assert_eq!(result.score_breakdown.factor_count, 4);
    }

    #[test]
    fn test_outside_business_hours_no_multiplier() {
        let weights = ScoringWeights::default();
        let result = score_lead(&weights, &answered_long_call(), &FixedClock::at_hour(20));
        assert_eq!(result.lead_score, 70);
        assert_eq!(result.qualification_status, "Warm Lead");
        assert!(!result.score_breakdown.business_hours_applied);
    }

    #[test]
    fn test_business_hours_window_is_inclusive() {
        let weights = ScoringWeights::default();
        let signals = answered_long_call();
        assert!(score_lead(&weights, &signals, &FixedClock::at_hour(9)).score_breakdown.business_hours_applied);
        assert!(score_lead(&weights, &signals, &FixedClock::at_hour(17)).score_breakdown.business_hours_applied);
        assert!(!score_lead(&weights, &signals, &FixedClock::at_hour(8)).score_breakdown.business_hours_applied);
        assert!(!score_lead(&weights, &signals, &FixedClock::at_hour(18)).score_breakdown.business_hours_applied);
    }

    #[test]
    fn test_status_band_boundaries() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.qualification_status(80), "Hot Lead");
        assert_eq!(weights.qualification_status(79), "Warm Lead");
        assert_eq!(weights.qualification_status(60), "Warm Lead");
        assert_eq!(weights.qualification_status(40), "Qualified Lead");
        assert_eq!(weights.qualification_status(20), "Cold Lead");
        assert_eq!(weights.qualification_status(19), "Unqualified");
        assert_eq!(weights.qualification_status(-45), "Unqualified");
    }

    #[test]
    fn test_adding_signals_never_lowers_score() {
        let weights = ScoringWeights::default();
        let clock = FixedClock::at_hour(11);
        let base = ScoringSignals {
            has_phone: true,
            ..Default::default()
        };
        let richer = ScoringSignals {
            has_email: true,
            utm_source: "Facebook".into(),
            device: "Mobile".into(),
            ..base.clone()
        };
        let richest = ScoringSignals {
            call_answered: true,
            call_duration: Some(300),
            ..richer.clone()
        };
        let a = score_lead(&weights, &base, &clock).lead_score;
        let b = score_lead(&weights, &richer, &clock).lead_score;
        let c = score_lead(&weights, &richest, &clock).lead_score;
        assert!(a <= b && b <= c, "{a} <= {b} <= {c}");
    }

    #[test]
    fn test_organic_beats_social() {
        let weights = ScoringWeights::default();
        let clock = FixedClock::at_hour(22);
        let google = ScoringSignals {
            utm_source: "GOOGLE".into(),
            ..Default::default()
        };
        let result = score_lead(&weights, &google, &clock);
        assert_eq!(result.lead_score, 20);
        assert_eq!(result.scoring_factors, vec!["Organic search traffic (+20)"]);
    }

    #[test]
    fn test_signals_from_json() {
        let lead = json!({
            "contact": {"email": "a@b.com", "phone": {"normalized": "5551234567"}},
            "utm": {"source": "bing"},
            "device": "Mobile"
        });
        let interaction = json!({"call_answered": "yes", "interaction_type": "WebForm", "call_duration": "200"});
        let signals = ScoringSignals::from_json(&lead, &interaction).unwrap();
        assert!(signals.call_answered);
        assert!(signals.has_email && signals.has_phone);
        assert_eq!(signals.interaction_type, InteractionType::WebForm);
        assert_eq!(signals.call_duration, Some(200));

        let empty = ScoringSignals::from_json(&json!({}), &json!({})).unwrap();
        assert_eq!(empty, ScoringSignals::default());
    }

    #[test]
    fn test_non_integer_duration_is_invalid() {
        let err = ScoringSignals::from_json(&json!({}), &json!({"call_duration": "long"})).unwrap_err();
        assert!(matches!(err, IntakeError::InvalidArgument { name: "call_duration", .. }));
    }
}

//! Transcript intent classification.
//!
//! A call transcript is lower-cased and matched against five keyword
//! taxonomies by substring. The per-taxonomy match counts drive:
//!
//! 1. **Intent**: the first [`IntentRule`] whose conditions hold decides the
//!    intent, base score, confidence, and recommended status.
//! 2. **Penalty**: each [`PenaltyRule`] whose patterns appear adds its weight.
//!    A total above `compound_threshold` is scaled by `compound_percent`.
//! 3. **Final score**: base minus penalty, capped at `score_cap` whenever any
//!    penalty applied.
//!
//! Everything is data in [`ClassifierRules`], loaded from the `[classifier]`
//! config table. The defaults are tuned for a tax-resolution practice.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::parse_integer;

/// The keyword taxonomies a transcript is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    BusinessNegative,
    Solicitation,
    HighValue,
    Standard,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomies {
    pub business_negative: Vec<String>,
    pub solicitation: Vec<String>,
    pub high_value: Vec<String>,
    pub standard: Vec<String>,
    pub declined: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Taxonomies {
    fn default() -> Self {
        Self {
            business_negative: words(&[
                "free advice",
                "free consultation",
                "just want some advice",
                "taxpayer advocate",
                "taxpayers advocate",
                "ta office",
                "shopping around",
                "checking prices",
                "compare rates",
                "general information",
                "quick question",
                "just wondering",
            ]),
            solicitation: words(&[
                "restaurant",
                "catering",
                "menu",
                "food service",
                "delivery",
                "insurance",
                "marketing",
                "advertising",
                "promotion",
                "sale",
                "credit card",
                "loan",
                "mortgage",
                "investment",
                "solar",
                "energy",
                "home improvement",
                "warranty",
                "vehicle",
            ]),
            high_value: words(&[
                "irs notice",
                "audit",
                "lien",
                "levy",
                "garnishment",
                "seizure",
                "collection",
                "enforcement",
                "deadline",
                "penalty",
                "interest",
                "business tax",
                "payroll tax",
                "trust fund",
                "criminal investigation",
            ]),
            standard: words(&[
                "irs",
                "tax",
                "debt",
                "owe",
                "payment plan",
                "installment",
                "bankruptcy",
                "settlement",
                "attorney",
                "legal",
                "help",
                "problem",
                "resolution",
                "representation",
            ]),
            declined: words(&[
                "we're good",
                "not interested",
                "no thank you",
                "we don't need",
                "small office",
                "appreciate your call but",
                "all set",
            ]),
        }
    }
}

impl Taxonomies {
    pub fn get(&self, taxonomy: Taxonomy) -> &[String] {
        match taxonomy {
            Taxonomy::BusinessNegative => &self.business_negative,
            Taxonomy::Solicitation => &self.solicitation,
            Taxonomy::HighValue => &self.high_value,
            Taxonomy::Standard => &self.standard,
            Taxonomy::Declined => &self.declined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "Solicitation")]
    Solicitation,
    #[serde(rename = "High-Value Inquiry")]
    HighValueInquiry,
    #[serde(rename = "Standard Inquiry")]
    StandardInquiry,
    #[serde(rename = "Declined Service")]
    DeclinedService,
    #[serde(rename = "Information Request")]
    InformationRequest,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Solicitation => "Solicitation",
            Self::HighValueInquiry => "High-Value Inquiry",
            Self::StandardInquiry => "Standard Inquiry",
            Self::DeclinedService => "Declined Service",
            Self::InformationRequest => "Information Request",
        }
    }
}

/// Match-count condition on one taxonomy. Holds when
/// `min <= count` and, if set, `count <= max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

impl Condition {
    fn at_least(taxonomy: Taxonomy, min: usize) -> Self {
        Self {
            taxonomy,
            min,
            max: None,
        }
    }

    fn none_of(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy,
            min: 0,
            max: Some(0),
        }
    }

    fn holds(&self, counts: &MatchCounts) -> bool {
        let n = counts.get(self.taxonomy);
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }
}

/// One row of the intent decision table. Rules are tried in order; a rule
/// with no conditions always matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRule {
    pub intent: Intent,
    #[serde(default)]
    pub when: Vec<Condition>,
    /// Taxonomy whose match count scales `per_match` and `confidence_per_match`.
    #[serde(default)]
    pub scale_by: Option<Taxonomy>,
    pub base: i64,
    #[serde(default)]
    pub per_match: i64,
    pub confidence: i64,
    #[serde(default)]
    pub confidence_per_match: i64,
    pub confidence_cap: i64,
    pub status: String,
}

impl IntentRule {
    fn scaled(&self, counts: &MatchCounts) -> (i64, i64) {
        let n = self.scale_by.map_or(0, |t| counts.get(t)) as i64;
        let base = self.base + self.per_match * n;
        let confidence = (self.confidence + self.confidence_per_match * n).min(self.confidence_cap);
        (base, confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessFlag {
    FreeAdviceSeeking,
    TaxpayerAdvocateReference,
    PriceShopping,
    InformationOnly,
}

impl BusinessFlag {
    pub fn title(&self) -> &'static str {
        match self {
            Self::FreeAdviceSeeking => "Free Advice Seeking",
            Self::TaxpayerAdvocateReference => "Taxpayer Advocate Reference",
            Self::PriceShopping => "Price Shopping",
            Self::InformationOnly => "Information Only",
        }
    }
}

/// A negative business indicator and what it costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRule {
    pub flag: BusinessFlag,
    pub patterns: Vec<String>,
    pub weight: i64,
    /// Label appended to the recommended status when this flag fires.
    #[serde(default)]
    pub warning: Option<String>,
}

/// The full, immutable rule set for [`classify_transcript`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    pub taxonomies: Taxonomies,
    pub intents: Vec<IntentRule>,
    pub penalties: Vec<PenaltyRule>,
    pub compound_threshold: i64,
    pub compound_percent: i64,
    /// Ceiling on the final score whenever a penalty applied.
    pub score_cap: i64,
    /// Penalties above this recommend skipping the lead.
    pub skip_penalty: i64,
    /// Final scores above this recommend a review.
    pub review_score: i64,
    pub high_priority_score: i64,
    pub low_conversion_status: String,
    pub default_business_context: String,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        use Taxonomy::*;
        let penalty = |flag, patterns: &[&str], weight, warning: Option<&str>| PenaltyRule {
            flag,
            patterns: words(patterns),
            weight,
            warning: warning.map(str::to_string),
        };
        Self {
            taxonomies: Taxonomies::default(),
            intents: vec![
                IntentRule {
                    intent: Intent::Solicitation,
                    when: vec![Condition::at_least(Solicitation, 1), Condition::none_of(Standard)],
                    scale_by: Some(Solicitation),
                    base: -45,
                    per_match: 0,
                    confidence: 60,
                    confidence_per_match: 10,
                    confidence_cap: 90,
                    status: "Unqualified - Solicitation".into(),
                },
                IntentRule {
                    intent: Intent::HighValueInquiry,
                    when: vec![Condition::at_least(HighValue, 1)],
                    scale_by: Some(HighValue),
                    base: 70,
                    per_match: 15,
                    confidence: 80,
                    confidence_per_match: 5,
                    confidence_cap: 95,
                    status: "High-Value Prospect".into(),
                },
                IntentRule {
                    intent: Intent::StandardInquiry,
                    when: vec![Condition::at_least(Standard, 3)],
                    scale_by: Some(Standard),
                    base: 50,
                    per_match: 10,
                    confidence: 70,
                    confidence_per_match: 5,
                    confidence_cap: 90,
                    status: "Qualified Lead".into(),
                },
                IntentRule {
                    intent: Intent::DeclinedService,
                    when: vec![Condition::at_least(Declined, 1)],
                    scale_by: None,
                    base: -20,
                    per_match: 0,
                    confidence: 80,
                    confidence_per_match: 0,
                    confidence_cap: 80,
                    status: "Unqualified - Declined".into(),
                },
                IntentRule {
                    intent: Intent::InformationRequest,
                    when: Vec::new(),
                    scale_by: None,
                    base: 10,
                    per_match: 0,
                    confidence: 60,
                    confidence_per_match: 0,
                    confidence_cap: 60,
                    status: "Standard Lead".into(),
                },
            ],
            penalties: vec![
                penalty(
                    BusinessFlag::FreeAdviceSeeking,
                    &["free advice"],
                    40,
                    Some("FREE ADVICE SEEKING"),
                ),
                penalty(
                    BusinessFlag::TaxpayerAdvocateReference,
                    &["taxpayer advocate", "taxpayers advocate"],
                    25,
                    Some("TAXPAYER ADVOCATE REFERENCE"),
                ),
                penalty(
                    BusinessFlag::PriceShopping,
                    &["shopping around", "checking prices", "compare rates"],
                    15,
                    None,
                ),
                penalty(
                    BusinessFlag::InformationOnly,
                    &["general information", "quick question", "just wondering"],
                    10,
                    None,
                ),
            ],
            compound_threshold: 40,
            compound_percent: 120,
            score_cap: 40,
            skip_penalty: 30,
            review_score: 40,
            high_priority_score: 60,
            low_conversion_status: "Low Conversion Probability".into(),
            default_business_context: "tax law office specializing in IRS issues and tax relief"
                .into(),
        }
    }
}

/// Patterns found per taxonomy, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordMatches {
    pub business_negative: Vec<String>,
    pub solicitation: Vec<String>,
    pub high_value: Vec<String>,
    pub standard: Vec<String>,
    pub declined: Vec<String>,
}

struct MatchCounts<'a>(&'a KeywordMatches);

impl MatchCounts<'_> {
    fn get(&self, taxonomy: Taxonomy) -> usize {
        let m = self.0;
        match taxonomy {
            Taxonomy::BusinessNegative => m.business_negative.len(),
            Taxonomy::Solicitation => m.solicitation.len(),
            Taxonomy::HighValue => m.high_value.len(),
            Taxonomy::Standard => m.standard.len(),
            Taxonomy::Declined => m.declined.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusinessFlags {
    pub free_advice_seeking: bool,
    pub taxpayer_advocate_reference: bool,
    pub price_shopping: bool,
    pub information_only: bool,
}

impl BusinessFlags {
    fn set(&mut self, flag: BusinessFlag) {
        match flag {
            BusinessFlag::FreeAdviceSeeking => self.free_advice_seeking = true,
            BusinessFlag::TaxpayerAdvocateReference => self.taxpayer_advocate_reference = true,
            BusinessFlag::PriceShopping => self.price_shopping = true,
            BusinessFlag::InformationOnly => self.information_only = true,
        }
    }

    pub fn count(&self) -> usize {
        [
            self.free_advice_seeking,
            self.taxpayer_advocate_reference,
            self.price_shopping,
            self.information_only,
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    Skip,
    Review,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Likelihood {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallQualityMetrics {
    pub transcript_length: usize,
    pub call_duration: i64,
    pub engagement_indicators: i64,
    pub business_relevance: Likelihood,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub primary_intent: Intent,
    pub confidence: i64,
    pub reasoning: String,
    pub keyword_matches: KeywordMatches,
    pub business_flags: BusinessFlags,
    pub negative_indicators_detected: bool,
    pub base_score: i64,
    pub applied_penalty: i64,
    pub final_score: i64,
    pub recommended_status: String,
    pub score_reasoning: String,
    pub recommendation: Recommendation,
    pub conversion_probability: Likelihood,
    pub warning_flags: Vec<String>,
    pub action_item: String,
    pub domain_relevance_score: i64,
    pub engagement_quality_score: i64,
    pub solicitation_detected: bool,
    pub call_quality: CallQualityMetrics,
    pub business_context: String,
}

fn find_all(patterns: &[String], text: &str) -> Vec<String> {
    patterns
        .iter()
        .filter(|p| text.contains(p.to_lowercase().as_str()))
        .cloned()
        .collect()
}

/// Classify a call transcript.
///
/// `call_metadata` may carry a `duration` in seconds; `business_context`
/// falls back to the rule set's default when absent.
pub fn classify_transcript(
    rules: &ClassifierRules,
    transcript: &str,
    call_metadata: &Value,
    business_context: Option<&str>,
) -> ClassificationResult {
    let text = transcript.to_lowercase();
    let tax = &rules.taxonomies;
    let matches = KeywordMatches {
        business_negative: find_all(&tax.business_negative, &text),
        solicitation: find_all(&tax.solicitation, &text),
        high_value: find_all(&tax.high_value, &text),
        standard: find_all(&tax.standard, &text),
        declined: find_all(&tax.declined, &text),
    };
    let counts = MatchCounts(&matches);

    let mut flags = BusinessFlags::default();
    let mut warning_flags = Vec::new();
    let mut warnings = Vec::new();
    let mut penalty = 0;
    for rule in &rules.penalties {
        if rule.patterns.iter().any(|p| text.contains(p.to_lowercase().as_str())) {
            flags.set(rule.flag);
            warning_flags.push(rule.flag.title().to_string());
            penalty += rule.weight;
            if let Some(w) = &rule.warning {
                warnings.push(w.as_str());
            }
        }
    }
    if penalty > rules.compound_threshold {
        penalty = penalty * rules.compound_percent / 100;
    }

    let (intent, base, confidence, mut status) =
        match rules.intents.iter().find(|r| r.when.iter().all(|c| c.holds(&counts))) {
            Some(rule) => {
                let (base, confidence) = rule.scaled(&counts);
                (rule.intent, base, confidence, rule.status.clone())
            }
            None => (Intent::InformationRequest, 0, 0, String::new()),
        };

    let mut final_score = base - penalty;
    if penalty > 0 {
        final_score = final_score.min(rules.score_cap);
        if final_score <= rules.score_cap {
            status = rules.low_conversion_status.clone();
        }
        if !warnings.is_empty() {
            status = format!("{status} - {}", warnings.join(", "));
        }
    }

    let hv = counts.get(Taxonomy::HighValue) as i64;
    let std = counts.get(Taxonomy::Standard) as i64;
    let declined = counts.get(Taxonomy::Declined) as i64;
    let solicitation_detected = counts.get(Taxonomy::Solicitation) > 0;

    let recommendation = if penalty > rules.skip_penalty {
        Recommendation::Skip
    } else if final_score > rules.review_score {
        Recommendation::Review
    } else {
        Recommendation::Standard
    };

    let conversion_probability = if penalty > 0 {
        Likelihood::Low
    } else if final_score > rules.high_priority_score {
        Likelihood::High
    } else {
        Likelihood::Medium
    };

    let action_item = if penalty > 0 {
        "WARNING: LOW CONVERSION PROBABILITY - Review business flags before follow-up"
    } else if final_score > rules.high_priority_score {
        "HIGH PRIORITY: Genuine prospect - follow up promptly"
    } else if final_score > 0 {
        "STANDARD: Standard follow-up"
    } else {
        "SOLICITATION: Mark as solicitation - no follow-up needed"
    };

    let business_relevance = if hv > 0 {
        Likelihood::High
    } else if solicitation_detected || penalty > 0 {
        Likelihood::Low
    } else {
        Likelihood::Medium
    };

    ClassificationResult {
        primary_intent: intent,
        confidence,
        reasoning: format!(
            "Base intent: {}. Business flags detected: {}",
            intent.label(),
            flags.count()
        ),
        negative_indicators_detected: penalty > 0,
        business_flags: flags,
        base_score: base,
        applied_penalty: penalty,
        final_score,
        recommended_status: status,
        score_reasoning: format!("Base: {base}, Penalties: -{penalty}, Final: {final_score}"),
        recommendation,
        conversion_probability,
        warning_flags,
        action_item: action_item.to_string(),
        domain_relevance_score: (25 * hv + 10 * std).max(0),
        engagement_quality_score: (70 - 20 * declined).max(0),
        solicitation_detected,
        call_quality: CallQualityMetrics {
            transcript_length: transcript.chars().count(),
            call_duration: parse_integer(call_metadata.get("duration")).unwrap_or(0),
            engagement_indicators: 2 * hv + std + (3 - declined).max(0),
            business_relevance,
        },
        business_context: business_context
            .unwrap_or(&rules.default_business_context)
            .to_string(),
        keyword_matches: matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(text: &str) -> ClassificationResult {
        classify_transcript(&ClassifierRules::default(), text, &json!({}), None)
    }

    #[test]
    fn test_solicitation_without_domain_terms() {
        let r = classify("Hi, I'm calling about our catering menu and a special promotion.");
        assert_eq!(r.primary_intent, Intent::Solicitation);
        assert_eq!(r.base_score, -45);
        assert_eq!(r.confidence, 90);
        assert_eq!(r.recommended_status, "Unqualified - Solicitation");
        assert!(r.solicitation_detected);
        assert_eq!(r.call_quality.business_relevance, Likelihood::Low);
        assert_eq!(
            r.action_item,
            "SOLICITATION: Mark as solicitation - no follow-up needed"
        );
    }

    #[test]
    fn test_high_value_inquiry() {
        let r = classify("I got an IRS notice about a levy on my account.");
        assert_eq!(r.primary_intent, Intent::HighValueInquiry);
        // "irs notice" and "levy"
        assert_eq!(r.keyword_matches.high_value, vec!["irs notice", "levy"]);
        assert_eq!(r.base_score, 100);
        assert_eq!(r.confidence, 90);
        assert_eq!(r.applied_penalty, 0);
        assert_eq!(r.final_score, 100);
        assert_eq!(r.recommended_status, "High-Value Prospect");
        assert_eq!(r.recommendation, Recommendation::Review);
        assert_eq!(r.conversion_probability, Likelihood::High);
        assert_eq!(r.domain_relevance_score, 25 * 2 + 10);
    }

    #[test]
    fn test_free_advice_caps_final_score() {
        let r = classify("I got an IRS notice about a levy, can I get some free advice?");
        assert_eq!(r.base_score, 100);
        assert_eq!(r.applied_penalty, 40);
        assert_eq!(r.final_score, 40);
        assert!(r.recommended_status.contains("Low Conversion Probability"));
        assert_eq!(
            r.recommended_status,
            "Low Conversion Probability - FREE ADVICE SEEKING"
        );
        assert!(r.business_flags.free_advice_seeking);
        assert_eq!(r.warning_flags, vec!["Free Advice Seeking"]);
        assert_eq!(r.recommendation, Recommendation::Skip);
        assert_eq!(r.conversion_probability, Likelihood::Low);
    }

    #[test]
    fn test_custom_base_with_free_advice_stays_under_cap() {
        let mut rules = ClassifierRules::default();
        rules.intents[1].base = 95;
        rules.intents[1].per_match = 0;
        let r = classify_transcript(&rules, "audit and free advice", &json!({}), None);
        assert_eq!(r.base_score, 95);
        assert!(r.final_score <= 40);
        assert!(r.recommended_status.contains("Low Conversion Probability"));
    }

    #[test]
    fn test_compound_penalty_scales() {
        let r = classify("free advice please, and the taxpayer advocate said to call");
        // 40 + 25 = 65, over the threshold -> 65 * 120 / 100
        assert_eq!(r.applied_penalty, 78);
        assert_eq!(
            r.recommended_status,
            "Low Conversion Probability - FREE ADVICE SEEKING, TAXPAYER ADVOCATE REFERENCE"
        );
        assert_eq!(r.business_flags.count(), 2);
    }

    #[test]
    fn test_flags_without_warning_label() {
        let r = classify("Just wondering, I'm shopping around for a tax attorney to help.");
        assert!(r.business_flags.price_shopping && r.business_flags.information_only);
        assert_eq!(r.applied_penalty, 25);
        assert_eq!(r.recommended_status, "Low Conversion Probability");
    }

    #[test]
    fn test_standard_and_declined_and_fallback() {
        let r = classify("I owe tax debt and need help");
        assert_eq!(r.primary_intent, Intent::StandardInquiry);
        assert_eq!(r.base_score, 50 + 10 * r.keyword_matches.standard.len() as i64);

        let r = classify("No thank you, we're good.");
        assert_eq!(r.primary_intent, Intent::DeclinedService);
        assert_eq!(r.base_score, -20);
        assert_eq!(r.engagement_quality_score, 30);

        let r = classify("Hello?");
        assert_eq!(r.primary_intent, Intent::InformationRequest);
        assert_eq!(r.base_score, 10);
        assert_eq!(r.recommendation, Recommendation::Standard);
        assert_eq!(r.conversion_probability, Likelihood::Medium);
    }

    #[test]
    fn test_metadata_and_context_echo() {
        let r = classify_transcript(
            &ClassifierRules::default(),
            "Hello?",
            &json!({"duration": "95"}),
            Some("bookkeeping firm"),
        );
        assert_eq!(r.call_quality.call_duration, 95);
        assert_eq!(r.call_quality.transcript_length, 6);
        assert_eq!(r.business_context, "bookkeeping firm");
    }

    #[test]
    fn test_rules_roundtrip_through_serde() {
        let rules = ClassifierRules::default();
        let value = serde_json::to_value(&rules).unwrap();
        let back: ClassifierRules = serde_json::from_value(value).unwrap();
        assert_eq!(back, rules);
    }
}

//! Webhook normalization.
//!
//! Reduces an inbound event of unknown shape to a [`CanonicalPayload`].
//! Normalization never fails: fields that cannot be found or interpreted
//! come back as empty strings or `None`.
//!
//! # Source detection
//!
//! 1. `call_type` on the event (or on the relay's `query` object) marks a
//!    call-tracking event.
//! 2. `contact.id` (nested) or `contact[id]` (flattened) marks a
//!    form-automation event.
//! 3. Anything else takes the caller's hint, or `Unknown`.
//!
//! Webhook relays may wrap the event in a `body` array or object; the first
//! element (or the object) is used as the event.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{
    AdditionalData, CallDetails, CanonicalPayload, ContactInfo, FormDetails, InteractionType,
    PersonName, PhoneNumber, Utm, CALL_TRACKING_SOURCE, FORM_AUTOMATION_SOURCE, UNKNOWN_SOURCE,
};

const NAME_SUFFIXES: &[&str] = &[
    "jr", "jr.", "sr", "sr.", "ii", "iii", "iv", "v", "esq", "esq.",
];
const ROMAN_SUFFIXES: &[&str] = &["ii", "iii", "iv", "v"];

const FLAT_FIELD_PREFIX: &str = "contact[fields][";

static NULL: Value = Value::Null;

/// Normalize a raw webhook payload.
///
/// `received_at` becomes the payload timestamp; the raw payload is kept in
/// `raw_payload` for the interaction snapshot.
pub fn normalize_webhook(
    payload: &Value,
    source_hint: Option<&str>,
    received_at: DateTime<Utc>,
) -> CanonicalPayload {
    let event = unwrap_envelope(payload);
    let query = payload.get("query").unwrap_or(&NULL);

    let (source_system, interaction_type) =
        if truthy(event.get("call_type")) || truthy(query.get("call_type")) {
            (CALL_TRACKING_SOURCE.to_string(), InteractionType::Call)
        } else if truthy(event.get("contact").and_then(|c| c.get("id")))
            || truthy(event.get("contact[id]"))
        {
            (FORM_AUTOMATION_SOURCE.to_string(), InteractionType::WebForm)
        } else {
            let source = source_hint
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .unwrap_or(UNKNOWN_SOURCE);
            (source.to_string(), InteractionType::Unknown)
        };

    let (contact, utm, additional_data) = if interaction_type == InteractionType::Call {
        extract_call(event, query)
    } else {
        extract_form(event)
    };

    CanonicalPayload {
        source_system,
        interaction_type,
        contact,
        utm,
        device: normalize_device(additional_data.device_type()),
        additional_data,
        timestamp: received_at,
        raw_payload: payload.clone(),
    }
}

fn unwrap_envelope(payload: &Value) -> &Value {
    match payload.get("body") {
        Some(Value::Array(items)) => items.first().unwrap_or(&NULL),
        Some(body @ Value::Object(_)) => body,
        _ => payload,
    }
}

fn extract_call(event: &Value, query: &Value) -> (ContactInfo, Utm, AdditionalData) {
    let phone = normalize_phone(&first_text(&[
        event.get("formatted_customer_phone_number"),
        event.get("customer_phone_number"),
        query.get("callernum"),
    ]));
    let name = parse_name(&first_text(&[
        event.get("formatted_customer_name"),
        event.get("customer_name"),
        query.get("callername"),
    ]));
    let email = normalize_email(&first_text(&[
        event.get("customer_email"),
        query.get("customer_email"),
    ]));

    let utm = Utm {
        source: text(event.get("utm_source")),
        medium: text(event.get("utm_medium")),
        campaign: text(event.get("utm_campaign")),
        content: text(event.get("utm_content")),
        term: text(event.get("utm_term")),
    };

    let details = CallDetails {
        call_duration: parse_integer(event.get("duration")),
        call_answered: parse_bool(event.get("answered")),
        call_recording: text(event.get("recording")),
        call_transcription: text(event.get("transcription")),
        source_unique_id: text(event.get("person_resource_id")),
        device_type: text(event.get("device_type")),
    };

    (
        ContactInfo { phone, email, name },
        utm,
        AdditionalData::Call(details),
    )
}

fn extract_form(event: &Value) -> (ContactInfo, Utm, AdditionalData) {
    let (contact, fields) = if truthy(event.get("contact[id]")) {
        flattened_contact(event)
    } else {
        let contact = event.get("contact").cloned().unwrap_or(Value::Null);
        let fields = contact.get("fields").cloned().unwrap_or(Value::Null);
        (contact, fields)
    };

    let phone = normalize_phone(&text(contact.get("phone")));
    let full_name = format!(
        "{} {}",
        text(contact.get("first_name")),
        text(contact.get("last_name"))
    );
    let name = parse_name(&full_name);
    let email = normalize_email(&text(contact.get("email")));

    let utm = Utm {
        source: text(fields.get("utmsource")),
        medium: text(fields.get("utmmedium")),
        campaign: text(fields.get("utmcampaign")),
        content: text(fields.get("utmcontent")),
        term: text(fields.get("utmterm")),
    };

    let details = FormDetails {
        form_type: text(fields.get("form_type")),
        form_name: text(fields.get("form_name")),
        message: text(fields.get("hiddencomments")),
        source_unique_id: text(contact.get("id")),
        device_type: text(fields.get("device")),
    };

    (
        ContactInfo { phone, email, name },
        utm,
        AdditionalData::Form(details),
    )
}

/// Rebuild the nested contact shape from bracket keys (`contact[email]`,
/// `contact[fields][utmsource]`, ...).
fn flattened_contact(event: &Value) -> (Value, Value) {
    let mut contact = Map::new();
    for key in ["id", "email", "first_name", "last_name", "phone"] {
        if let Some(v) = event.get(format!("contact[{}]", key).as_str()) {
            contact.insert(key.to_string(), v.clone());
        }
    }

    let mut fields = Map::new();
    if let Some(map) = event.as_object() {
        for (key, value) in map {
            if let Some(rest) = key.strip_prefix(FLAT_FIELD_PREFIX) {
                let name = rest.strip_suffix(']').unwrap_or(rest);
                fields.insert(name.to_string(), value.clone());
            }
        }
    }

    (Value::Object(contact), Value::Object(fields))
}

/// Normalize a phone number into raw, digits-only, national, and
/// international forms. Input with no digits yields all-empty fields.
pub fn normalize_phone(input: &str) -> PhoneNumber {
    let raw = input.trim();
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return PhoneNumber::default();
    }

    let (national, international) = if digits.len() >= 10 {
        (
            format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
            format!("+1{}", digits),
        )
    } else {
        (digits.clone(), format!("+{}", digits))
    };

    PhoneNumber {
        raw: raw.to_string(),
        normalized: digits,
        national,
        international,
    }
}

/// Title-case a name and split it into first/middle/last/suffix.
pub fn parse_name(input: &str) -> PersonName {
    let words: Vec<String> = input.split_whitespace().map(title_case).collect();
    if words.is_empty() {
        return PersonName::default();
    }
    let full = words.join(" ");

    let mut parts = words;
    let mut suffix = String::new();
    if parts.len() > 1 {
        let last_lower = parts[parts.len() - 1].to_lowercase();
        if NAME_SUFFIXES.contains(&last_lower.as_str()) {
            let token = parts.pop().unwrap_or_default();
            suffix = if ROMAN_SUFFIXES.contains(&last_lower.as_str()) {
                token.to_uppercase()
            } else {
                token
            };
        }
    }

    let first = parts.first().cloned().unwrap_or_default();
    let middle = if parts.len() > 2 {
        parts[1..parts.len() - 1].join(" ")
    } else {
        String::new()
    };
    let last = if parts.len() > 1 {
        parts[parts.len() - 1].clone()
    } else {
        String::new()
    };

    PersonName {
        full,
        first,
        middle,
        last,
        suffix,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Map short device codes to display labels; unknown values pass through.
pub fn normalize_device(device: &str) -> String {
    match device.trim().to_lowercase().as_str() {
        "m" | "mobile" => "Mobile".to_string(),
        "d" | "desktop" => "Desktop".to_string(),
        "t" | "tablet" => "Tablet".to_string(),
        _ => device.to_string(),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// JSON truthiness: null, false, "", 0, [] and {} are falsy.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Render a scalar as text; null and containers become "".
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Text of the first truthy candidate.
fn first_text(candidates: &[Option<&Value>]) -> String {
    candidates
        .iter()
        .copied()
        .find(|v| truthy(*v))
        .map(text)
        .unwrap_or_default()
}

/// Parse an integer from a number or numeric string (fractions truncate).
pub fn parse_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

/// Parse a boolean from a bool, a 0/1 number, or a yes/no style string.
pub fn parse_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_phone_ten_digits() {
        let p = normalize_phone("(555) 123-4567");
        assert_eq!(p.raw, "(555) 123-4567");
        assert_eq!(p.normalized, "5551234567");
        assert_eq!(p.national, "(555) 123-4567");
        assert_eq!(p.international, "+15551234567");
    }

    #[test]
    fn test_phone_empty_and_no_digits() {
        assert_eq!(normalize_phone(""), PhoneNumber::default());
        assert_eq!(normalize_phone("  n/a "), PhoneNumber::default());
    }

    #[test]
    fn test_phone_short_number() {
        let p = normalize_phone("123-4567");
        assert_eq!(p.normalized, "1234567");
        assert_eq!(p.national, "1234567");
        assert_eq!(p.international, "+1234567");
    }

    #[test]
    fn test_phone_eleven_digits_keeps_remainder() {
        let p = normalize_phone("1-555-123-4567");
        assert_eq!(p.normalized, "15551234567");
        assert_eq!(p.national, "(155) 512-34567");
        assert_eq!(p.international, "+115551234567");
    }

    #[test]
    fn test_name_with_middle_and_suffix() {
        let n = parse_name("john q. smith jr");
        assert_eq!(n.first, "John");
        assert_eq!(n.middle, "Q.");
        assert_eq!(n.last, "Smith");
        assert_eq!(n.suffix, "Jr");
        assert_eq!(n.full, "John Q. Smith Jr");
    }

    #[test]
    fn test_name_suffix_with_trailing_period() {
        let n = parse_name("ann lee jr.");
        assert_eq!(n.first, "Ann");
        assert_eq!(n.last, "Lee");
        assert_eq!(n.suffix, "Jr.");
    }

    #[test]
    fn test_name_roman_suffix_upper() {
        let n = parse_name("henry FORD iii");
        assert_eq!(n.first, "Henry");
        assert_eq!(n.last, "Ford");
        assert_eq!(n.suffix, "III");
    }

    #[test]
    fn test_name_single_token_is_not_suffix() {
        let n = parse_name("jr");
        assert_eq!(n.first, "Jr");
        assert_eq!(n.last, "");
        assert_eq!(n.suffix, "");
    }

    #[test]
    fn test_name_empty() {
        assert_eq!(parse_name("   "), PersonName::default());
    }

    #[test]
    fn test_name_two_tokens() {
        let n = parse_name("MARY   jones");
        assert_eq!(n.first, "Mary");
        assert_eq!(n.middle, "");
        assert_eq!(n.last, "Jones");
    }

    #[test]
    fn test_device_codes() {
        assert_eq!(normalize_device("m"), "Mobile");
        assert_eq!(normalize_device("DESKTOP"), "Desktop");
        assert_eq!(normalize_device("T"), "Tablet");
        assert_eq!(normalize_device("watch"), "watch");
        assert_eq!(normalize_device(""), "");
    }

    #[test]
    fn test_call_tracking_event() {
        let payload = json!({
            "call_type": "inbound",
            "customer_phone_number": "+1 (555) 123-4567",
            "customer_name": "jane doe",
            "customer_email": "  Jane@Example.COM ",
            "utm_source": "google",
            "duration": "150",
            "answered": true,
            "transcription": "I got an IRS notice",
            "person_resource_id": "PER123",
            "device_type": "m"
        });
        let c = normalize_webhook(&payload, None, now());
        assert_eq!(c.source_system, CALL_TRACKING_SOURCE);
        assert_eq!(c.interaction_type, InteractionType::Call);
        assert_eq!(c.contact.phone.normalized, "15551234567");
        assert_eq!(c.contact.email, "jane@example.com");
        assert_eq!(c.contact.name.first, "Jane");
        assert_eq!(c.utm.source, "google");
        assert_eq!(c.device, "Mobile");
        assert!(c.additional_data.call_answered());
        assert_eq!(c.additional_data.call_duration(), Some(150));
        assert_eq!(c.additional_data.source_unique_id(), "PER123");
        assert_eq!(
            c.additional_data.call_transcription(),
            Some("I got an IRS notice")
        );
    }

    #[test]
    fn test_call_tracking_query_fallback() {
        let payload = json!({
            "body": {},
            "query": {
                "call_type": "abandoned",
                "callernum": "5551234567",
                "callername": "bob builder"
            }
        });
        let c = normalize_webhook(&payload, None, now());
        assert_eq!(c.interaction_type, InteractionType::Call);
        assert_eq!(c.contact.phone.normalized, "5551234567");
        assert_eq!(c.contact.name.last, "Builder");
        assert!(!c.additional_data.call_answered());
    }

    #[test]
    fn test_form_nested_contact() {
        let payload = json!({
            "contact": {
                "id": 991,
                "email": "Lead@Example.com",
                "first_name": "ana",
                "last_name": "lopez",
                "phone": "555.222.3333",
                "fields": {
                    "utmsource": "facebook",
                    "utmcampaign": "spring",
                    "form_name": "Contact Us",
                    "hiddencomments": "call me",
                    "device": "d"
                }
            }
        });
        let c = normalize_webhook(&payload, Some("ignored"), now());
        assert_eq!(c.source_system, FORM_AUTOMATION_SOURCE);
        assert_eq!(c.interaction_type, InteractionType::WebForm);
        assert_eq!(c.contact.email, "lead@example.com");
        assert_eq!(c.contact.name.full, "Ana Lopez");
        assert_eq!(c.contact.phone.national, "(555) 222-3333");
        assert_eq!(c.utm.source, "facebook");
        assert_eq!(c.utm.campaign, "spring");
        assert_eq!(c.device, "Desktop");
        match &c.additional_data {
            AdditionalData::Form(f) => {
                assert_eq!(f.form_name, "Contact Us");
                assert_eq!(f.message, "call me");
                assert_eq!(f.source_unique_id, "991");
            }
            other => panic!("expected form details, got {:?}", other),
        }
    }

    #[test]
    fn test_form_flattened_matches_nested() {
        let nested = json!({
            "contact": {
                "id": "77",
                "email": "x@y.com",
                "first_name": "kim",
                "last_name": "park",
                "phone": "5550001111",
                "fields": { "utmsource": "bing", "device": "t" }
            }
        });
        let flat = json!({
            "contact[id]": "77",
            "contact[email]": "x@y.com",
            "contact[first_name]": "kim",
            "contact[last_name]": "park",
            "contact[phone]": "5550001111",
            "contact[fields][utmsource]": "bing",
            "contact[fields][device]": "t"
        });
        let at = now();
        let a = normalize_webhook(&nested, None, at);
        let b = normalize_webhook(&flat, None, at);
        assert_eq!(a.source_system, b.source_system);
        assert_eq!(a.contact, b.contact);
        assert_eq!(a.utm, b.utm);
        assert_eq!(a.device, "Tablet");
        assert_eq!(a.additional_data, b.additional_data);
    }

    #[test]
    fn test_unknown_source_uses_hint() {
        let payload = json!({ "foo": "bar" });
        let c = normalize_webhook(&payload, Some("Zapier"), now());
        assert_eq!(c.source_system, "Zapier");
        assert_eq!(c.interaction_type, InteractionType::Unknown);

        let c = normalize_webhook(&payload, Some("  "), now());
        assert_eq!(c.source_system, UNKNOWN_SOURCE);
    }

    #[test]
    fn test_body_array_envelope() {
        let payload = json!({ "body": [ { "call_type": "inbound", "customer_phone_number": "5551234567" } ] });
        let c = normalize_webhook(&payload, None, now());
        assert_eq!(c.interaction_type, InteractionType::Call);
        assert_eq!(c.contact.phone.normalized, "5551234567");

        let empty = json!({ "body": [] });
        let c = normalize_webhook(&empty, None, now());
        assert_eq!(c.source_system, UNKNOWN_SOURCE);
    }

    #[test]
    fn test_garbage_payload_never_fails() {
        for payload in [json!(null), json!("text"), json!(42), json!([1, 2])] {
            let c = normalize_webhook(&payload, None, now());
            assert_eq!(c.source_system, UNKNOWN_SOURCE);
            assert_eq!(c.contact, ContactInfo::default());
        }
    }

    #[test]
    fn test_numeric_phone_value() {
        let payload = json!({ "call_type": "x", "customer_phone_number": 5551234567u64 });
        let c = normalize_webhook(&payload, None, now());
        assert_eq!(c.contact.phone.normalized, "5551234567");
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_integer(Some(&json!("  90 "))), Some(90));
        assert_eq!(parse_integer(Some(&json!(12.9))), Some(12));
        assert_eq!(parse_integer(Some(&json!("abc"))), None);
        assert_eq!(parse_bool(Some(&json!("TRUE"))), Some(true));
        assert_eq!(parse_bool(Some(&json!(0))), Some(false));
        assert_eq!(parse_bool(Some(&json!("maybe"))), None);
    }
}

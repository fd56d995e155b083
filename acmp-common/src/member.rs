//! Member data model
//!
//! The member set is owned by the remote registry service; this module defines
//! the read-only record shape, the cleaning applied to raw records at load
//! time, and the normalization that maps heterogeneous registration-number
//! spellings onto the canonical `"ACM" + digits` form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical registration-number prefix
pub const REGISTRATION_PREFIX: &str = "ACM";

/// Default first name applied when a raw record omits one
pub const DEFAULT_FIRST_NAME: &str = "Prénom";

/// Default value for missing last-name/contact fields
pub const DEFAULT_FIELD: &str = "Non spécifié";

/// Member occupation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupation {
    Student,
    Employee,
    Entrepreneur,
    Unemployed,
    Other,
}

impl Occupation {
    /// Lenient parse used during record cleaning; unknown values map to Other
    /// so one malformed record never fails a registry load.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "student" => Occupation::Student,
            "employee" => Occupation::Employee,
            "entrepreneur" => Occupation::Entrepreneur,
            "unemployed" => Occupation::Unemployed,
            _ => Occupation::Other,
        }
    }
}

impl std::fmt::Display for Occupation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Occupation::Student => write!(f, "student"),
            Occupation::Employee => write!(f, "employee"),
            Occupation::Entrepreneur => write!(f, "entrepreneur"),
            Occupation::Unemployed => write!(f, "unemployed"),
            Occupation::Other => write!(f, "other"),
        }
    }
}

/// A cleaned member record, keyed by normalized registration number.
///
/// Immutable from the kiosk's point of view. `is_temporary` marks records
/// synthesized locally in demo mode, as opposed to verified registry entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub registration_number: String,
    pub first_name: String,
    pub last_name: String,
    pub occupation: Occupation,
    pub phone_number: String,
    pub study_or_work_place: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub join_date: DateTime<Utc>,
    #[serde(default)]
    pub is_temporary: bool,
}

impl Member {
    /// Display name as shown on check-in confirmations
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A member record as delivered by the remote registry, before cleaning.
///
/// Every field is optional on the wire; `clean()` fills the documented
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMember {
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub study_or_work_place: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub join_date: Option<DateTime<Utc>>,
}

impl RawMember {
    /// Clean a raw record into a usable Member.
    ///
    /// Optional fields take their documented defaults and the registration
    /// number is rewritten to carry the `ACM` prefix. Records without any
    /// registration number are unresolvable and are dropped (None).
    pub fn clean(self) -> Option<Member> {
        let registration = self.registration_number?;
        let registration = registration.trim();
        if registration.is_empty() {
            return None;
        }

        Some(Member {
            registration_number: ensure_registration_prefix(registration),
            first_name: non_empty_or(self.first_name, DEFAULT_FIRST_NAME),
            last_name: non_empty_or(self.last_name, DEFAULT_FIELD),
            occupation: self
                .occupation
                .as_deref()
                .map(Occupation::parse)
                .unwrap_or(Occupation::Other),
            phone_number: non_empty_or(self.phone_number, DEFAULT_FIELD),
            study_or_work_place: non_empty_or(self.study_or_work_place, DEFAULT_FIELD),
            profile_image: self.profile_image.filter(|s| !s.trim().is_empty()),
            join_date: self.join_date.unwrap_or_else(Utc::now),
            is_temporary: false,
        })
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => default.to_string(),
    }
}

/// Prefix a stored registration number with `ACM` unless it already starts
/// with it (case preserved as uppercase).
pub fn ensure_registration_prefix(registration: &str) -> String {
    let upper = registration.trim().to_uppercase();
    if upper.starts_with(REGISTRATION_PREFIX) {
        upper
    } else {
        format!("{REGISTRATION_PREFIX}{upper}")
    }
}

/// Normalize a scanned or typed identifier to canonical form.
///
/// Uppercases, strips everything non-alphanumeric, then maps bare digit
/// sequences (`"07"`) and legacy `M`-prefixed numbers (`"M07"`) onto
/// `"ACM" + digits`. Idempotent: applying it to its own output is a no-op.
pub fn normalize_registration(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();

    if !cleaned.is_empty() && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{REGISTRATION_PREFIX}{cleaned}");
    }

    if let Some(digits) = cleaned.strip_prefix('M') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return format!("{REGISTRATION_PREFIX}{digits}");
        }
    }

    cleaned
}

/// Decoded QR badge payload.
///
/// Badges carry a JSON object with at minimum the registration number; text
/// that fails JSON parsing is treated as a bare identifier string instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    pub registration_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_or_work_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ScanPayload {
    /// Parse decoded text as a badge payload, or None when it is not JSON.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Extract the registration identifier from decoded text: JSON payload
    /// when possible, otherwise the raw text itself.
    pub fn identifier(text: &str) -> String {
        match Self::parse(text) {
            Some(payload) => payload.registration_number,
            None => text.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize_registration("acm-07"), "ACM07");
        assert_eq!(normalize_registration("ACM07"), "ACM07");
        assert_eq!(normalize_registration("07"), "ACM07");
        assert_eq!(normalize_registration("m07"), "ACM07");
        assert_eq!(normalize_registration("M-12"), "ACM12");
        assert_eq!(normalize_registration(" acm 42 "), "ACM42");
        assert_eq!(normalize_registration("acm.0042"), "ACM0042");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["acm-07", "07", "m07", "ACM07", "a c m 7", "M99"] {
            let once = normalize_registration(input);
            assert_eq!(normalize_registration(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn test_normalize_non_member_text_passes_through() {
        // Not digits, not M+digits: cleaned but otherwise untouched
        assert_eq!(normalize_registration("hello world"), "HELLOWORLD");
        assert_eq!(normalize_registration(""), "");
        assert_eq!(normalize_registration("M1X"), "M1X");
    }

    #[test]
    fn test_clean_applies_defaults() {
        let raw = RawMember {
            registration_number: Some("12".to_string()),
            first_name: None,
            last_name: Some("  ".to_string()),
            occupation: Some("astronaut".to_string()),
            phone_number: None,
            study_or_work_place: None,
            profile_image: Some(String::new()),
            join_date: None,
        };

        let member = raw.clean().unwrap();
        assert_eq!(member.registration_number, "ACM12");
        assert_eq!(member.first_name, DEFAULT_FIRST_NAME);
        assert_eq!(member.last_name, DEFAULT_FIELD);
        assert_eq!(member.occupation, Occupation::Other);
        assert_eq!(member.phone_number, DEFAULT_FIELD);
        assert!(member.profile_image.is_none());
        assert!(!member.is_temporary);
    }

    #[test]
    fn test_cleaned_registration_always_prefixed() {
        for reg in ["7", "ACM7", "acm7", "X-99", "M07"] {
            let member = RawMember {
                registration_number: Some(reg.to_string()),
                first_name: None,
                last_name: None,
                occupation: None,
                phone_number: None,
                study_or_work_place: None,
                profile_image: None,
                join_date: None,
            }
            .clean()
            .unwrap();
            assert!(
                member.registration_number.starts_with(REGISTRATION_PREFIX),
                "cleaned {reg:?} -> {}",
                member.registration_number
            );
        }
    }

    #[test]
    fn test_clean_drops_missing_registration() {
        let raw = RawMember {
            registration_number: None,
            first_name: Some("Awa".to_string()),
            last_name: None,
            occupation: None,
            phone_number: None,
            study_or_work_place: None,
            profile_image: None,
            join_date: None,
        };
        assert!(raw.clean().is_none());
    }

    #[test]
    fn test_payload_parse_json() {
        let text = r#"{"registrationNumber":"acm-07","firstName":"Awa"}"#;
        let payload = ScanPayload::parse(text).unwrap();
        assert_eq!(payload.registration_number, "acm-07");
        assert_eq!(payload.first_name.as_deref(), Some("Awa"));
        assert_eq!(ScanPayload::identifier(text), "acm-07");
    }

    #[test]
    fn test_payload_falls_back_to_bare_identifier() {
        assert_eq!(ScanPayload::identifier("ACM07"), "ACM07");
        assert_eq!(ScanPayload::identifier("  m-12  "), "m-12");
        // Malformed JSON is a bare identifier, not an error
        assert_eq!(ScanPayload::identifier("{not json"), "{not json");
    }

    #[test]
    fn test_occupation_parse() {
        assert_eq!(Occupation::parse("Student"), Occupation::Student);
        assert_eq!(Occupation::parse("EMPLOYEE"), Occupation::Employee);
        assert_eq!(Occupation::parse("freelance"), Occupation::Other);
    }
}

// ==========================================
// CRM ETL - field validators
// ==========================================
// Pure functions, one per semantic field class. Each takes a raw value and
// returns either the normalized value or a ValidationFailure; malformed
// input is an expected outcome and never panics or propagates as EtlError.
// Casing policy is a parameter: entities bind it per column, validators
// stay generic.
// ==========================================

use crate::domain::types::TextCase;
use crate::etl::country::resolve_iso2;
use crate::etl::error::ValidationFailure;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$").expect("domain regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9]([a-z0-9.-]*[a-z0-9])?\.[a-z]{2,}$").expect("email regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[0-9][0-9 .()\-]*$").expect("phone regex"));

// ==========================================
// Free text
// ==========================================

/// Strip and case-fold a required text field; empty after strip fails.
pub fn required_text(field: &str, raw: &str, case: TextCase) -> Result<String, ValidationFailure> {
    let stripped = raw.trim();
    if stripped.is_empty() {
        return Err(ValidationFailure::missing(field));
    }
    Ok(case.apply(stripped))
}

/// Strip and case-fold an optional text field; blank collapses to None.
pub fn optional_text(raw: Option<&str>, case: TextCase) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| case.apply(v))
}

// ==========================================
// Domain / email / phone
// ==========================================

/// Strip + lowercase; must look like `label(.label)+` with an alphabetic
/// TLD-like final segment.
pub fn domain(field: &str, raw: &str) -> Result<String, ValidationFailure> {
    let normalized = raw.trim().to_lowercase();
    if DOMAIN_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationFailure::invalid(field, raw.trim(), "not a valid domain"))
    }
}

/// Strip + lowercase; must have a `local@domain` shape.
pub fn email(field: &str, raw: &str) -> Result<String, ValidationFailure> {
    let normalized = raw.trim().to_lowercase();
    if EMAIL_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationFailure::invalid(field, raw.trim(), "not a valid email address"))
    }
}

/// Optional; when present must be international format: leading `+`,
/// 7-15 digits, separators (space, dash, dot, parentheses) allowed.
pub fn phone(field: &str, raw: Option<&str>) -> Result<Option<String>, ValidationFailure> {
    let stripped = match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => return Ok(None),
    };

    let digits = stripped.chars().filter(char::is_ascii_digit).count();
    if PHONE_RE.is_match(stripped) && (7..=15).contains(&digits) {
        Ok(Some(stripped.to_string()))
    } else {
        Err(ValidationFailure::invalid(
            field,
            stripped,
            "not a valid phone number in international format",
        ))
    }
}

// ==========================================
// Country
// ==========================================

/// Strip + uppercase, then resolve through the fixed alias table to ISO2.
pub fn country(field: &str, raw: &str) -> Result<String, ValidationFailure> {
    let normalized = raw.trim().to_uppercase();
    match resolve_iso2(&normalized) {
        Some(code) => Ok(code.to_string()),
        None => Err(ValidationFailure::invalid(field, raw.trim(), "not a recognized country")),
    }
}

// ==========================================
// Company size
// ==========================================

/// One of: `N` (single integer), `low-high` (low <= high), `N+`.
pub fn company_size(field: &str, raw: &str) -> Result<String, ValidationFailure> {
    let stripped = raw.trim();
    let fail = || ValidationFailure::invalid(field, stripped, "not a valid size");

    if stripped.is_empty() {
        return Err(ValidationFailure::missing(field));
    }

    if let Some(prefix) = stripped.strip_suffix('+') {
        // open-ended: digits then a trailing '+'
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
            return Ok(stripped.to_string());
        }
        return Err(fail());
    }

    let parts: Vec<&str> = stripped.split('-').collect();
    match parts.as_slice() {
        [single] => {
            if !single.is_empty() && single.chars().all(|c| c.is_ascii_digit()) {
                Ok(stripped.to_string())
            } else {
                Err(fail())
            }
        }
        [low, high] => {
            let low: u64 = low.parse().map_err(|_| fail())?;
            let high: u64 = high.parse().map_err(|_| fail())?;
            if low <= high {
                Ok(stripped.to_string())
            } else {
                Err(fail())
            }
        }
        _ => Err(fail()),
    }
}

// ==========================================
// Date / time
// ==========================================

/// Parse an ISO 8601 date or datetime; naive values are assumed UTC.
pub fn datetime(field: &str, raw: &str) -> Result<DateTime<Utc>, ValidationFailure> {
    let stripped = raw.trim();
    let fail = || {
        ValidationFailure::invalid(field, stripped, "not a valid ISO 8601 date/time")
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(stripped) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(stripped, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(fail())
}

/// Reject values after `now` (created_date, activity timestamp).
pub fn require_not_future(
    field: &str,
    value: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationFailure> {
    if value > now {
        Err(ValidationFailure::invalid(
            field,
            &value.to_rfc3339(),
            "cannot be in the future",
        ))
    } else {
        Ok(())
    }
}

/// Cross-date rule: `value` must not precede `floor` (last_modified vs
/// created_date).
pub fn require_not_before(
    field: &str,
    value: DateTime<Utc>,
    floor: DateTime<Utc>,
    floor_field: &str,
) -> Result<(), ValidationFailure> {
    if value < floor {
        Err(ValidationFailure::invalid(
            field,
            &value.to_rfc3339(),
            &format!("cannot be before {floor_field}"),
        ))
    } else {
        Ok(())
    }
}

// ==========================================
// Numerics
// ==========================================

/// Must parse as a number and be >= 0.
pub fn non_negative_f64(field: &str, raw: &str) -> Result<f64, ValidationFailure> {
    let stripped = raw.trim();
    let value: f64 = stripped
        .parse()
        .map_err(|_| ValidationFailure::invalid(field, stripped, "not a valid number"))?;
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationFailure::invalid(field, stripped, "cannot be negative"));
    }
    Ok(value)
}

/// Must parse as a number and be strictly positive.
pub fn positive_f64(field: &str, raw: &str) -> Result<f64, ValidationFailure> {
    let stripped = raw.trim();
    let value: f64 = stripped
        .parse()
        .map_err(|_| ValidationFailure::invalid(field, stripped, "not a valid number"))?;
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationFailure::invalid(field, stripped, "must be positive"));
    }
    Ok(value)
}

/// Integer in [0, 100].
pub fn probability(field: &str, raw: &str) -> Result<i32, ValidationFailure> {
    let stripped = raw.trim();
    let value: i32 = stripped
        .parse()
        .map_err(|_| ValidationFailure::invalid(field, stripped, "not a valid integer"))?;
    if !(0..=100).contains(&value) {
        return Err(ValidationFailure::invalid(field, stripped, "must be between 0 and 100"));
    }
    Ok(value)
}

/// Non-negative integer (duration_minutes).
pub fn non_negative_i32(field: &str, raw: &str) -> Result<i32, ValidationFailure> {
    let stripped = raw.trim();
    let value: i32 = stripped
        .parse()
        .map_err(|_| ValidationFailure::invalid(field, stripped, "not a valid integer"))?;
    if value < 0 {
        return Err(ValidationFailure::invalid(field, stripped, "cannot be negative"));
    }
    Ok(value)
}

/// Boolean: true/false/1/0, case-insensitive.
pub fn boolean(field: &str, raw: &str) -> Result<bool, ValidationFailure> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ValidationFailure::invalid(field, other, "not a valid boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_required_text() {
        assert_eq!(
            required_text("name", "  Acme Corp  ", TextCase::Upper).unwrap(),
            "ACME CORP"
        );
        assert_eq!(
            required_text("first_name", "jANE", TextCase::Title).unwrap(),
            "Jane"
        );
        assert!(required_text("name", "   ", TextCase::Upper).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  note "), TextCase::Preserve), Some("note".to_string()));
        assert_eq!(optional_text(Some("   "), TextCase::Preserve), None);
        assert_eq!(optional_text(None, TextCase::Preserve), None);
    }

    #[test]
    fn test_domain() {
        assert_eq!(domain("domain", " Acme.COM ").unwrap(), "acme.com");
        assert_eq!(domain("domain", "sub.acme.co.uk").unwrap(), "sub.acme.co.uk");
        assert!(domain("domain", "acme").is_err());
        assert!(domain("domain", "acme.").is_err());
        assert!(domain("domain", ".com").is_err());
        assert!(domain("domain", "acme.c0m").is_err());
        assert!(domain("domain", "-acme.com").is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(email("email", " Jane.Doe@Acme.COM ").unwrap(), "jane.doe@acme.com");
        assert!(email("email", "invalid_email").is_err());
        assert!(email("email", "a@b").is_err());
        assert!(email("email", "@acme.com").is_err());
    }

    #[test]
    fn test_phone() {
        assert_eq!(
            phone("phone", Some("+1-555-123-4567")).unwrap(),
            Some("+1-555-123-4567".to_string())
        );
        assert_eq!(phone("phone", Some("+44 20 7946 0958")).unwrap(), Some("+44 20 7946 0958".to_string()));
        assert_eq!(phone("phone", None).unwrap(), None);
        assert_eq!(phone("phone", Some("  ")).unwrap(), None);
        assert!(phone("phone", Some("11231231234")).is_err(), "missing leading +");
        assert!(phone("phone", Some("+1-555")).is_err(), "too few digits");
        assert!(phone("phone", Some("+1234567890123456")).is_err(), "too many digits");
    }

    #[test]
    fn test_country() {
        assert_eq!(country("country", "United States").unwrap(), "US");
        assert_eq!(country("country", " usa ").unwrap(), "US");
        assert_eq!(country("country", "UK").unwrap(), "GB");
        assert!(country("country", "XYZ").is_err());
    }

    #[test]
    fn test_company_size_boundaries() {
        assert_eq!(company_size("size", "1000-5000").unwrap(), "1000-5000");
        assert_eq!(company_size("size", "1000+").unwrap(), "1000+");
        assert_eq!(company_size("size", "1000").unwrap(), "1000");
        assert!(company_size("size", "5000-1000").is_err(), "inverted range");
        assert!(company_size("size", "abc").is_err());
        assert!(company_size("size", "1000+100").is_err(), "misplaced +");
        assert!(company_size("size", "10-20-30").is_err(), "too many separators");
    }

    #[test]
    fn test_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 15, 8, 45, 0).unwrap();
        assert_eq!(datetime("created_date", "2024-06-15T08:45:00Z").unwrap(), expected);
        assert_eq!(datetime("created_date", "2024-06-15T08:45:00").unwrap(), expected);
        assert_eq!(datetime("created_date", "2024-06-15 08:45:00").unwrap(), expected);
        assert_eq!(
            datetime("created_date", "2024-06-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
        );
        assert!(datetime("created_date", "9999978999999").is_err());
        assert!(datetime("created_date", "InvalidDate").is_err());
    }

    #[test]
    fn test_future_and_cross_date_rules() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let future = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        assert!(require_not_future("created_date", past, now).is_ok());
        assert!(require_not_future("created_date", now, now).is_ok());
        assert!(require_not_future("created_date", future, now).is_err());

        assert!(require_not_before("last_modified", now, past, "created_date").is_ok());
        assert!(require_not_before("last_modified", past, now, "created_date").is_err());
    }

    #[test]
    fn test_probability_boundaries() {
        assert_eq!(probability("probability", "0").unwrap(), 0);
        assert_eq!(probability("probability", "100").unwrap(), 100);
        assert!(probability("probability", "-1").is_err());
        assert!(probability("probability", "101").is_err());
        assert!(probability("probability", "abc").is_err());
    }

    #[test]
    fn test_numeric_rules() {
        assert_eq!(non_negative_f64("amount", "0").unwrap(), 0.0);
        assert_eq!(non_negative_f64("amount", "25000").unwrap(), 25_000.0);
        assert!(non_negative_f64("amount", "-1").is_err());
        assert!(positive_f64("annual_revenue", "500000").is_ok());
        assert!(positive_f64("annual_revenue", "0").is_err());
        assert!(non_negative_i32("duration_minutes", "30").is_ok());
        assert!(non_negative_i32("duration_minutes", "-5").is_err());
    }

    #[test]
    fn test_boolean() {
        assert_eq!(boolean("is_customer", "True").unwrap(), true);
        assert_eq!(boolean("is_customer", "false").unwrap(), false);
        assert_eq!(boolean("is_customer", "1").unwrap(), true);
        assert!(boolean("is_customer", "yes").is_err());
    }
}

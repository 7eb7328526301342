//! Field-level validation of transaction records.
//!
//! The validator gates every write before it reaches a store. It operates on
//! raw JSON so that a malformed field (wrong type, loose date format) is
//! reported per field instead of failing wholesale at deserialization.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Error, models::Timestamp};

/// The strict required-field set, checked on every complete record.
pub const REQUIRED_FIELDS: &[&str] = &[
    "type",
    "amount",
    "category",
    "date",
    "userId",
    "id",
    "timestamp",
];

/// The required fields of a client-supplied draft, before the store backfills
/// `id` and `timestamp` and tags the owner.
pub const DRAFT_REQUIRED_FIELDS: &[&str] = &["type", "amount", "category", "date"];

/// The outcome of validating one record: empty means valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// One message per failing field, keyed by the wire field name.
    pub errors: BTreeMap<&'static str, String>,
}

impl ValidationReport {
    /// Whether the record passed every check.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert a failing report into the error carried back to the caller.
    pub fn into_error(self) -> Error {
        Error::Validation {
            errors: self.errors,
        }
    }
}

/// Validate a transaction-shaped JSON value.
///
/// Fields listed in `required` must be present and non-empty; all other
/// checks apply only to fields that are present. The validator performs no
/// mutation and has no side effects.
pub fn validate_transaction(record: &Value, required: &[&'static str]) -> ValidationReport {
    let mut errors = BTreeMap::new();

    for &field in required {
        if is_missing(record.get(field)) {
            errors.insert(field, format!("{field} is required"));
        }
    }

    if let Some(amount) = usable(record, "amount") {
        if !is_positive_number(amount) {
            errors.insert("amount", "Amount must be a positive number".to_owned());
        }
    }

    if let Some(kind) = usable(record, "type") {
        if !matches!(kind.as_str(), Some("income") | Some("expense")) {
            errors.insert("type", "Invalid transaction type".to_owned());
        }
    }

    if let Some(category) = usable(record, "category") {
        if !is_non_empty_string(category) {
            errors.insert("category", "Category must be a non-empty string".to_owned());
        }
    }

    if let Some(date) = usable(record, "date") {
        if !is_strict_instant(date) {
            errors.insert(
                "date",
                "Invalid date format. Must be in ISO format (YYYY-MM-DDTHH:mm:ss.sssZ)".to_owned(),
            );
        }
    }

    if let Some(timestamp) = usable(record, "timestamp") {
        if !is_strict_instant(timestamp) {
            errors.insert(
                "timestamp",
                "Invalid timestamp format. Must be in ISO format (YYYY-MM-DDTHH:mm:ss.sssZ)"
                    .to_owned(),
            );
        }
    }

    if let Some(user_id) = usable(record, "userId") {
        if !is_non_empty_string(user_id) {
            errors.insert("userId", "User ID must be a non-empty string".to_owned());
        }
    }

    if let Some(id) = usable(record, "id") {
        if !is_non_empty_string(id) {
            errors.insert("id", "ID must be a non-empty string".to_owned());
        }
    }

    ValidationReport { errors }
}

/// The field's value, or `None` when the field is absent so that the
/// per-field format checks are skipped for missing fields.
fn usable<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    let value = record.get(field)?;

    if is_missing(Some(value)) {
        None
    } else {
        Some(value)
    }
}

/// Missing, null, empty-string, zero and false values all count as absent,
/// and fail the required-field check rather than the per-field format checks.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Bool(b)) => !b,
        Some(_) => false,
    }
}

fn is_positive_number(value: &Value) -> bool {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    matches!(amount, Some(amount) if amount.is_finite() && amount > 0.0)
}

fn is_non_empty_string(value: &Value) -> bool {
    matches!(value.as_str(), Some(s) if !s.trim().is_empty())
}

fn is_strict_instant(value: &Value) -> bool {
    matches!(value.as_str(), Some(s) if s.parse::<Timestamp>().is_ok())
}

#[cfg(test)]
mod validation_tests {
    use serde_json::{Value, json};

    use super::{DRAFT_REQUIRED_FIELDS, REQUIRED_FIELDS, validate_transaction};

    fn complete_record() -> Value {
        json!({
            "id": "abc123",
            "type": "expense",
            "amount": 10000,
            "category": "Food",
            "description": "",
            "date": "2024-01-05T10:00:00.000Z",
            "timestamp": "2024-01-05T10:00:01.000Z",
            "userId": "user-1",
        })
    }

    #[test]
    fn complete_record_is_valid() {
        let report = validate_transaction(&complete_record(), REQUIRED_FIELDS);

        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn missing_required_fields_are_reported_per_field() {
        let report = validate_transaction(&json!({}), REQUIRED_FIELDS);

        for &field in REQUIRED_FIELDS {
            assert_eq!(
                report.errors.get(field).map(String::as_str),
                Some(format!("{field} is required").as_str())
            );
        }
    }

    #[test]
    fn non_positive_amounts_always_fail_with_an_amount_error() {
        for amount in [json!(-1), json!(-0.01), json!(0), json!("not a number")] {
            let mut record = complete_record();
            record["amount"] = amount.clone();

            let report = validate_transaction(&record, REQUIRED_FIELDS);

            assert!(
                report.errors.contains_key("amount"),
                "expected an amount error for {amount:?}"
            );
        }
    }

    #[test]
    fn numeric_strings_are_accepted_as_amounts() {
        let mut record = complete_record();
        record["amount"] = json!("12.50");

        let report = validate_transaction(&record, REQUIRED_FIELDS);

        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn type_must_be_income_or_expense() {
        for kind in [json!("Expense"), json!("transfer"), json!(1)] {
            let mut record = complete_record();
            record["type"] = kind.clone();

            let report = validate_transaction(&record, REQUIRED_FIELDS);

            assert_eq!(
                report.errors.get("type").map(String::as_str),
                Some("Invalid transaction type"),
                "for {kind:?}"
            );
        }
    }

    #[test]
    fn category_must_not_be_blank() {
        let mut record = complete_record();
        record["category"] = json!("   ");

        let report = validate_transaction(&record, REQUIRED_FIELDS);

        assert_eq!(
            report.errors.get("category").map(String::as_str),
            Some("Category must be a non-empty string")
        );
    }

    #[test]
    fn loose_date_formats_are_rejected() {
        for date in [
            "2024-01-05T10:00:00Z",
            "2024-01-05T10:00:00.000+00:00",
            "2024-01-05",
        ] {
            let mut record = complete_record();
            record["date"] = json!(date);

            let report = validate_transaction(&record, REQUIRED_FIELDS);

            assert!(
                report.errors.contains_key("date"),
                "expected a date error for {date:?}"
            );
        }
    }

    #[test]
    fn draft_set_does_not_require_generated_fields() {
        let record = json!({
            "type": "income",
            "amount": 5,
            "category": "Salary",
            "date": "2024-01-05T10:00:00.000Z",
        });

        let report = validate_transaction(&record, DRAFT_REQUIRED_FIELDS);

        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn present_optional_fields_are_still_checked() {
        let record = json!({
            "type": "income",
            "amount": 5,
            "category": "Salary",
            "date": "2024-01-05T10:00:00.000Z",
            "timestamp": "yesterday",
        });

        let report = validate_transaction(&record, DRAFT_REQUIRED_FIELDS);

        assert!(report.errors.contains_key("timestamp"));
    }
}

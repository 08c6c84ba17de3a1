use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// One failed check on a request field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub msg: String,
}

/// Ordered list of field failures; reported to clients as `errors: [{field, msg}]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, msg: &str) -> Self {
        let mut errors = Self::new();
        errors.push(field, msg);
        errors
    }

    pub fn push(&mut self, field: &str, msg: &str) {
        self.0.push(FieldError {
            field: field.to_string(),
            msg: msg.to_string(),
        });
    }

    /// Record `msg` against `field` unless `value` has non-whitespace content.
    pub fn require(&mut self, field: &str, value: Option<&str>, msg: &str) {
        if is_blank(value) {
            self.push(field, msg);
        }
    }

    pub fn check(&mut self, ok: bool, field: &str, msg: &str) {
        if !ok {
            self.push(field, msg);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.msg.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// The trimmed value, or `None` when absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Basic shape check: one `@` with a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part is kept).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

use crate::errors::{ApiError, FieldIssue};

/// Collects every problem with a request body before any handler logic runs.
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<FieldIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trimmed value, or records the field as missing and returns
    /// an empty string that callers never see because `finish` fails.
    pub fn required(&mut self, field: &str, value: Option<&str>) -> String {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                self.issues.push(FieldIssue::new(
                    field,
                    "required",
                    format!("{} is required", field),
                ));
                String::new()
            }
        }
    }

    pub fn optional(&mut self, value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> String {
        let email = self.required(field, value);
        if !email.is_empty() && !looks_like_email(&email) {
            self.issues.push(FieldIssue::new(
                field,
                "invalid",
                format!("{} is not a valid email address", field),
            ));
        }
        email.to_lowercase()
    }

    pub fn require_present<T>(&mut self, field: &str, value: &Option<T>) {
        if value.is_none() {
            self.issues.push(FieldIssue::new(
                field,
                "required",
                format!("{} file is required", field),
            ));
        }
    }

    pub fn check(&mut self, ok: bool, field: &str, code: &str, message: &str) {
        if !ok {
            self.issues.push(FieldIssue::new(field, code, message));
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.issues))
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

//! Required-field checks run before every submit.

use super::form::{FormField, ListingForm, StatField};

/// Fields the validator inspects, in the order they are checked.
pub const CHECKED_FIELDS: [FormField; 3] = [
    FormField::Uid,
    FormField::Title,
    FormField::Stat(StatField::Level),
];

/// Outcome of one validation pass. Recomputed from scratch every time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    invalid: Vec<FormField>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn is_invalid(&self, field: FormField) -> bool {
        self.invalid.contains(&field)
    }

    pub fn invalid_fields(&self) -> &[FormField] {
        &self.invalid
    }
}

/// Check the form.
///
/// - `uid` must be non-empty after trimming
/// - `title` must be non-empty after trimming
/// - `level`, when non-empty, must be a number
pub fn validate(form: &ListingForm) -> ValidationReport {
    let mut invalid = Vec::new();

    if form.uid.trim().is_empty() {
        invalid.push(FormField::Uid);
    }
    if form.title.trim().is_empty() {
        invalid.push(FormField::Title);
    }
    let level = form.stat(StatField::Level).trim();
    if !level.is_empty() && !is_number(level) {
        invalid.push(FormField::Stat(StatField::Level));
    }

    ValidationReport { invalid }
}

fn is_number(raw: &str) -> bool {
    raw.parse::<f64>().is_ok_and(|n| n.is_finite())
}

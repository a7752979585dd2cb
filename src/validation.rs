// Copyright 2023 Remi Bernotavicius

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Weights, costs and conversion factors all share this floor.
pub const MIN_POSITIVE: f64 = 0.1;

pub const MAX_UNIT_NAME_LEN: usize = 20;
pub const MAX_INGREDIENT_TITLE_LEN: usize = 255;
pub const MAX_RECIPE_TITLE_LEN: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field-level problem found in one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, e) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Implemented by the input forms. Reports all problems at once rather than stopping at the first.
pub trait Validate {
    fn validate(&self) -> ValidationErrors;
}

fn title_regex() -> &'static Regex {
    static TITLE_REGEX: OnceLock<Regex> = OnceLock::new();
    TITLE_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-zА-Яа-яёЁ\s]+$").expect("title pattern is a valid regex")
    })
}

/// Titles are made of Latin or Cyrillic letters and whitespace, and must contain at least one
/// letter.
pub(crate) fn check_title(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    max_len: usize,
) {
    if value.trim().is_empty() {
        errors.add(field, "must not be empty");
    } else if !title_regex().is_match(value) {
        errors.add(field, "must contain only letters and spaces");
    } else if value.chars().count() > max_len {
        errors.add(field, format!("must be at most {max_len} characters"));
    }
}

pub(crate) fn check_name(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    max_len: usize,
) {
    if value.trim().is_empty() {
        errors.add(field, "must not be empty");
    } else if value.chars().count() > max_len {
        errors.add(field, format!("must be at most {max_len} characters"));
    }
}

/// NaN and infinities fail this check as well.
pub(crate) fn check_min(errors: &mut ValidationErrors, field: &'static str, value: f64) {
    if !(value.is_finite() && value >= MIN_POSITIVE) {
        errors.add(field, format!("must be a finite number of at least {MIN_POSITIVE}"));
    }
}

/// For gram weights produced by a unit conversion, which may legitimately drop below the input
/// floor but must stay finite.
pub(crate) fn check_positive(errors: &mut ValidationErrors, field: &'static str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.add(field, "must be a positive finite number");
    }
}

#[test]
fn titles() {
    let check = |value: &str| {
        let mut errors = ValidationErrors::new();
        check_title(&mut errors, "title", value, 12);
        errors
    };

    assert!(check("Sugar").is_empty());
    assert!(check("Мука").is_empty());
    assert!(check("Ёжик в тумане").has_field("title"));
    assert!(check("Ёжик").is_empty());
    assert!(check("Brown sugar").is_empty());

    assert!(check("").has_field("title"));
    assert!(check("   ").has_field("title"));
    assert!(check("Sugar 2").has_field("title"));
    assert!(check("Sugar!").has_field("title"));
    assert!(check("Much too long").has_field("title"));
}

#[test]
fn minimum_values() {
    let mut errors = ValidationErrors::new();
    check_min(&mut errors, "a", 0.1);
    check_min(&mut errors, "b", 200.0);
    assert!(errors.is_empty());

    check_min(&mut errors, "c", 0.05);
    check_min(&mut errors, "d", 0.0);
    check_min(&mut errors, "e", -3.0);
    check_min(&mut errors, "f", f64::NAN);
    check_min(&mut errors, "g", f64::INFINITY);
    let fields: Vec<_> = errors.errors().iter().map(|e| e.field).collect();
    assert_eq!(fields, ["c", "d", "e", "f", "g"]);
}

#[test]
fn positive_values() {
    let mut errors = ValidationErrors::new();
    check_positive(&mut errors, "a", 0.01);
    assert!(errors.is_empty());

    check_positive(&mut errors, "b", 0.0);
    check_positive(&mut errors, "c", f64::INFINITY);
    check_positive(&mut errors, "d", f64::NAN);
    let fields: Vec<_> = errors.errors().iter().map(|e| e.field).collect();
    assert_eq!(fields, ["b", "c", "d"]);
}

#[test]
fn display_lists_every_field() {
    let mut errors = ValidationErrors::new();
    errors.add("title", "must not be empty");
    errors.add("cost", "must be at least 0.1");
    assert_eq!(
        errors.to_string(),
        "validation failed: title: must not be empty; cost: must be at least 0.1"
    );
    assert!(errors.into_result().is_err());
}

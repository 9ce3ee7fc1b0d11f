//! Field rules for request bodies. Every rule appends to a `FieldErrors`
//! collector so a client sees all failures in one response.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MAX_DISPLAY_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 150;
pub const MAX_SHORT_TEXT_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_COVER_LETTER_LEN: usize = 5_000;
pub const MAX_SKILLS: usize = 50;
pub const MAX_SKILL_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when no rule failed, otherwise `AppError::InvalidFields`.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.0))
        }
    }

    // ── rules ──────────────────────────────────────────────────────────────

    pub fn required_text(&mut self, field: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        } else if value.chars().count() > max_len {
            self.push(field, format!("must be at most {max_len} characters"));
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(v) = value {
            if v.chars().count() > max_len {
                self.push(field, format!("must be at most {max_len} characters"));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !EMAIL_RE.is_match(value.trim()) {
            self.push(field, "must be a valid email address");
        }
    }

    pub fn password(&mut self, field: &str, value: &str) {
        if value.chars().count() < MIN_PASSWORD_LEN {
            self.push(
                field,
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            );
        } else if !value.chars().any(|c| c.is_alphabetic())
            || !value.chars().any(|c| c.is_ascii_digit())
        {
            self.push(field, "must contain at least one letter and one digit");
        }
    }

    pub fn url(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            let v = v.trim();
            let rest = v
                .strip_prefix("https://")
                .or_else(|| v.strip_prefix("http://"));
            match rest {
                Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => {}
                _ => self.push(field, "must be an http(s) URL"),
            }
        }
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) {
        let Some(v) = value else { return };
        let allowed = v
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));
        let digits = v.chars().filter(|c| c.is_ascii_digit()).count();
        if !allowed || !(7..=20).contains(&digits) {
            self.push(field, "must be a phone number with 7 to 20 digits");
        }
    }

    pub fn salary_range(&mut self, min: Option<i32>, max: Option<i32>) {
        if min.is_some_and(|m| m < 0) {
            self.push("salary_min", "must not be negative");
        }
        if max.is_some_and(|m| m < 0) {
            self.push("salary_max", "must not be negative");
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                self.push("salary_max", "must be greater than or equal to salary_min");
            }
        }
    }

    pub fn skills(&mut self, field: &str, values: &[String]) {
        if values.len() > MAX_SKILLS {
            self.push(field, format!("must contain at most {MAX_SKILLS} entries"));
            return;
        }
        if values.iter().any(|s| {
            let len = s.trim().chars().count();
            len == 0 || len > MAX_SKILL_LEN
        }) {
            self.push(
                field,
                format!("entries must be between 1 and {MAX_SKILL_LEN} characters"),
            );
        }
    }

    /// Parses a snake_case enum value, recording an error naming every
    /// variant in `allowed` on failure.
    pub fn parse_enum<T: FromStr + fmt::Display>(
        &mut self,
        field: &str,
        value: &str,
        allowed: &[T],
    ) -> Option<T> {
        match value.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                let names: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                self.push(field, format!("must be one of: {}", names.join(", ")));
                None
            }
        }
    }
}

/// Trims entries and drops case-insensitive duplicates, keeping first-seen order.
pub fn clean_skill_list(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

/// Blank optional strings are stored as NULL.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

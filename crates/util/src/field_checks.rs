//! Field-level predicates for list documents.
//!
//! These mirror the provider-list schema's string constraints so document
//! preconditions and post-patch validation agree on what a valid field is.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Maximum length, in characters, of a list or provider name.
pub const MAX_NAME_LENGTH: usize = 40;

static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ A-Za-z0-9_.'+\-%/À-ÖØ-öø-ÿ:&\[\]\(\)]+$").expect("name regex should compile"));

/// Why a name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameProblem {
    Empty,
    TooLong,
    InvalidCharacters,
}

impl NameProblem {
    pub fn describe(self) -> String {
        match self {
            NameProblem::Empty => "name must not be empty".to_string(),
            NameProblem::TooLong => format!("name must be at most {MAX_NAME_LENGTH} characters"),
            NameProblem::InvalidCharacters => "name contains characters outside the allowed set".to_string(),
        }
    }
}

/// Checks a list or provider name against the length and character rules.
pub fn check_name(name: &str) -> Result<(), NameProblem> {
    if name.is_empty() {
        return Err(NameProblem::Empty);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(NameProblem::TooLong);
    }
    if !NAME_REGEX.is_match(name) {
        return Err(NameProblem::InvalidCharacters);
    }
    Ok(())
}

/// Returns true for absolute URIs (a scheme is required).
pub fn is_absolute_uri(candidate: &str) -> bool {
    Url::parse(candidate).is_ok()
}

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static GCA_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GC[AF]_[0-9]{9}(\.\d)?$").expect("valid GCA code pattern"));

pub const DEFAULT_COUNTRY: &str = "-1";

/// NCBI assembly accession, e.g. `GCA_000000001.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcaCode(String);

impl GcaCode {
    pub fn parse(raw: &str) -> Result<Self, SubmissionFormError> {
        let trimmed = raw.trim();
        if GCA_CODE_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(SubmissionFormError::InvalidGcaCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GcaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Submission-time metadata persisted as `formData.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionForm {
    #[serde(default)]
    pub email: String,
    #[serde(rename = "gcaCode", default)]
    pub gca_code: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl SubmissionForm {
    /// Builds the record stored on disk. When no accession was typed the
    /// uploaded filename takes its place.
    pub fn new(
        email: Option<&str>,
        gca_code: Option<&GcaCode>,
        uploaded_filename: Option<&str>,
        location: Option<&str>,
        country: Option<&str>,
    ) -> Self {
        let gca_value = match (gca_code, uploaded_filename) {
            (Some(code), _) => code.as_str().to_string(),
            (None, Some(name)) => name.to_string(),
            (None, None) => String::new(),
        };
        Self {
            email: email.unwrap_or_default().to_string(),
            gca_code: gca_value,
            location: location.unwrap_or_default().to_string(),
            country: country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(DEFAULT_COUNTRY)
                .to_string(),
        }
    }
}

/// Loose structural check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(raw: &str) -> Result<(), SubmissionFormError> {
    let invalid = || SubmissionFormError::InvalidEmail(raw.to_string());
    let trimmed = raw.trim();
    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
        || trimmed.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionFormError {
    #[error("Invalid GCA Code format: {0}")]
    InvalidGcaCode(String),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

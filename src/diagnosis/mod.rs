//! Skill-gap Diagnosis
//!
//! Glue between retrieval and the language model: builds the query and the
//! prompt, parses the model's JSON answer and assembles the run report.

pub mod profile;
pub mod prompt;
pub mod report;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use profile::CompanyProfile;
pub use prompt::{diagnosis_prompt, diagnosis_query, format_context, DIAGNOSIS_QUERY};
pub use report::DiagnosisReport;

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid company profile JSON: {0}")]
    InvalidProfile(String),
    #[error("LLM did not return valid JSON ({reason})")]
    InvalidJson { reason: String, raw: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Serialize for DiagnosisError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

// Models drift on casing ("high", "HIGH"), so match case-insensitively
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(serde::de::Error::unknown_variant(
                &raw,
                &["Critical", "High", "Medium", "Low"],
            )),
        }
    }
}

/// Accept a list of strings, a single string, or null for a list field
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) if s.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(items)) => items,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill: String,
    #[serde(default)]
    pub current_level_0_100: f32,
    #[serde(default)]
    pub target_level_0_100: f32,
    pub priority: Priority,
    #[serde(default)]
    pub role_impact: String,
}

/// Structured diagnosis returned by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnosis {
    pub company_summary: String,
    pub mission: String,
    pub vision: String,
    #[serde(deserialize_with = "string_or_list")]
    pub strategy: Vec<String>,
    pub skill_gaps: Vec<SkillGap>,
    #[serde(deserialize_with = "string_or_list")]
    pub training_needs: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub assumptions: Vec<String>,
}

/// Strip a surrounding markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // Drop the info string ("json") on the opening fence line
    match body.find('\n') {
        Some(newline) if !body[..newline].contains('{') => body[newline + 1..].trim(),
        _ => body.trim(),
    }
}

/// Parse the model's answer into a `Diagnosis`.
///
/// The raw text is kept in the error so the caller can show what the model
/// actually said.
pub fn parse_diagnosis(text: &str) -> Result<Diagnosis, DiagnosisError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| DiagnosisError::InvalidJson {
        reason: e.to_string(),
        raw: text.to_string(),
    })
}

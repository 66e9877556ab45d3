//! Optional company profile supplied alongside the documents

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::DiagnosisError;

/// Known profile fields; anything else is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Headcount; must be an integer when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_focus: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CompanyProfile {
    /// Parse a profile from JSON text. The root must be an object.
    pub fn parse(text: &str) -> Result<Self, DiagnosisError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DiagnosisError::InvalidProfile(e.to_string()))?;
        if !value.is_object() {
            return Err(DiagnosisError::InvalidProfile("Profile must be a JSON object.".to_string()));
        }
        serde_json::from_value(value).map_err(|e| DiagnosisError::InvalidProfile(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, DiagnosisError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Compact JSON rendering used inside the retrieval query
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

//! Diagnosis run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use ulid::Ulid;

use super::{Diagnosis, DiagnosisError};
use crate::documents::DocumentMeta;

/// Everything one diagnosis run produced, ready to be written as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub run_id: String,
    pub company_id: String,
    pub created_at: DateTime<Utc>,
    pub rag_top_k: usize,
    pub documents: Vec<DocumentMeta>,
    /// Retrieved passages, best first, as sent to the model
    pub context: Vec<String>,
    pub diagnosis: Diagnosis,
}

impl DiagnosisReport {
    pub fn new(
        company_id: impl Into<String>,
        rag_top_k: usize,
        documents: Vec<DocumentMeta>,
        context: Vec<String>,
        diagnosis: Diagnosis,
    ) -> Self {
        Self {
            run_id: Ulid::new().to_string(),
            company_id: company_id.into(),
            created_at: Utc::now(),
            rag_top_k,
            documents,
            context,
            diagnosis,
        }
    }

    /// Write pretty-printed JSON, creating parent directories as needed.
    /// Goes through a temp file so a crash never leaves a half-written report.
    pub fn save(&self, path: &Path) -> Result<(), DiagnosisError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

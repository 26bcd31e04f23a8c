//! Data records for the matching pipeline.
//!
//! Plain serde records with no behavior: candidate commits, the advisory
//! they are matched against, and the features extracted for each pairing.

use crate::core::error::AssayerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A candidate commit under analysis. Reference lists (`cve_refs`,
/// `ghissue_refs`, `jira_refs`) and hunk data are filled by whatever
/// preprocessing produced the record; all fields default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commit {
    pub repository: String,
    pub commit_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default)]
    pub cve_refs: Vec<String>,
    #[serde(default)]
    pub ghissue_refs: Vec<String>,
    #[serde(default)]
    pub jira_refs: Vec<String>,
    /// Hunk boundaries as `(start, end)` line pairs.
    #[serde(default)]
    pub hunks: Vec<(i64, i64)>,
    #[serde(default)]
    pub hunk_count: usize,
}

/// The advisory record candidates are matched against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    pub vulnerability_id: String,
    #[serde(default)]
    pub published_timestamp: i64,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Boolean/numeric features extracted for one commit/advisory pairing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitFeatures {
    pub commit: Commit,
    #[serde(default)]
    pub references_vuln_id: bool,
    #[serde(default)]
    pub changes_relevant_path: bool,
    #[serde(default)]
    pub time_between_commit_and_advisory_record: i64,
    #[serde(default)]
    pub falls_in_advisory_interval: bool,
    #[serde(default)]
    pub avg_hunk_size: f64,
    #[serde(default)]
    pub n_hunks: usize,
    #[serde(default)]
    pub references_ghissue: bool,
    #[serde(default)]
    pub n_changed_files: usize,
    #[serde(default)]
    pub contains_jira_reference: bool,
}

pub fn load_commits(path: &Path) -> Result<Vec<Commit>, AssayerError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn load_advisory(path: &Path) -> Result<AdvisoryRecord, AssayerError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

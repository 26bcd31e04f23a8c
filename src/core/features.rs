//! Commit/advisory feature extraction.
//!
//! Simple field comparisons over the data records, a parallel batch form
//! for whole candidate sets, and the bridge that records extracted
//! features into a run's statistics store.

use crate::core::error::AssayerError;
use crate::core::model::{AdvisoryRecord, Commit, CommitFeatures};
use crate::core::stats::StatStore;
use rayon::prelude::*;
use regex::Regex;
use std::sync::LazyLock;

const SECONDS_PER_DAY: i64 = 86_400;

/// Days around the advisory publication date considered a plausible fix
/// window.
const ADVISORY_INTERVAL_DAYS: i64 = 30;

static CVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CVE-\d{4}-\d{4,}").unwrap());

pub fn extract_features(commit: &Commit, advisory: &AdvisoryRecord) -> CommitFeatures {
    CommitFeatures {
        references_vuln_id: extract_references_vuln_id(commit, advisory),
        changes_relevant_path: extract_changes_relevant_path(commit, advisory),
        time_between_commit_and_advisory_record: extract_time_between_commit_and_advisory_record(
            commit, advisory,
        ),
        falls_in_advisory_interval: extract_falls_in_advisory_interval(commit, advisory),
        avg_hunk_size: extract_avg_hunk_size(commit),
        n_hunks: extract_n_hunks(commit),
        references_ghissue: extract_references_ghissue(commit),
        n_changed_files: extract_n_changed_files(commit),
        contains_jira_reference: extract_contains_jira_reference(commit),
        commit: commit.clone(),
    }
}

/// Extract features for every candidate in parallel, preserving input
/// order. Each pairing is independent, so the map is embarrassingly
/// parallel; the store is only populated afterwards.
pub fn extract_features_batch(
    commits: &[Commit],
    advisory: &AdvisoryRecord,
) -> Vec<CommitFeatures> {
    commits
        .par_iter()
        .map(|commit| extract_features(commit, advisory))
        .collect()
}

/// Whether the commit references the advisory's vulnerability id, either
/// in its preprocessed reference list or verbatim in its message.
pub fn extract_references_vuln_id(commit: &Commit, advisory: &AdvisoryRecord) -> bool {
    commit
        .cve_refs
        .iter()
        .any(|r| r == &advisory.vulnerability_id)
        || find_cve_references(&commit.message)
            .iter()
            .any(|r| r == &advisory.vulnerability_id)
}

/// Whether any changed file is one of the advisory's relevant paths.
pub fn extract_changes_relevant_path(commit: &Commit, advisory: &AdvisoryRecord) -> bool {
    commit
        .changed_files
        .iter()
        .any(|path| advisory.paths.contains(path))
}

/// Absolute seconds between the commit and the advisory publication.
pub fn extract_time_between_commit_and_advisory_record(
    commit: &Commit,
    advisory: &AdvisoryRecord,
) -> i64 {
    (commit.timestamp - advisory.published_timestamp).abs()
}

/// Whether `commit_ts` falls within `days` of `anchor_ts`. Positive days
/// look forward from the anchor, negative days look backward.
pub fn is_commit_in_given_interval(anchor_ts: i64, commit_ts: i64, days: i64) -> bool {
    let bound = anchor_ts + days * SECONDS_PER_DAY;
    if days >= 0 {
        commit_ts >= anchor_ts && commit_ts <= bound
    } else {
        commit_ts <= anchor_ts && commit_ts >= bound
    }
}

pub fn extract_is_close_to_advisory_date(
    commit: &Commit,
    advisory: &AdvisoryRecord,
    days_before: i64,
    days_after: i64,
) -> bool {
    is_commit_in_given_interval(advisory.published_timestamp, commit.timestamp, -days_before)
        || is_commit_in_given_interval(advisory.published_timestamp, commit.timestamp, days_after)
}

pub fn extract_falls_in_advisory_interval(commit: &Commit, advisory: &AdvisoryRecord) -> bool {
    extract_is_close_to_advisory_date(
        commit,
        advisory,
        ADVISORY_INTERVAL_DAYS,
        ADVISORY_INTERVAL_DAYS,
    )
}

/// Mean hunk size over the commit's `(start, end)` hunk boundaries.
pub fn extract_avg_hunk_size(commit: &Commit) -> f64 {
    if commit.hunks.is_empty() {
        return 0.0;
    }
    let total: i64 = commit.hunks.iter().map(|(start, end)| end - start).sum();
    total as f64 / commit.hunks.len() as f64
}

pub fn extract_n_hunks(commit: &Commit) -> usize {
    commit.hunk_count
}

pub fn extract_references_ghissue(commit: &Commit) -> bool {
    !commit.ghissue_refs.is_empty()
}

pub fn extract_n_changed_files(commit: &Commit) -> usize {
    commit.changed_files.len()
}

pub fn extract_contains_jira_reference(commit: &Commit) -> bool {
    !commit.jira_refs.is_empty()
}

/// Scan free text for CVE identifiers.
pub fn find_cve_references(text: &str) -> Vec<String> {
    CVE_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Record one candidate's features into the run store under the
/// `commit_features` group: counters for the boolean features, grouped
/// lists for the numeric ones, a deduplicated set of repositories.
pub fn record_features(
    store: &mut StatStore,
    features: &CommitFeatures,
) -> Result<(), AssayerError> {
    store.sub_store(&["commit_features"], None)?;
    for (name, hit) in [
        ("references_vuln_id", features.references_vuln_id),
        ("changes_relevant_path", features.changes_relevant_path),
        (
            "falls_in_advisory_interval",
            features.falls_in_advisory_interval,
        ),
        ("references_ghissue", features.references_ghissue),
        ("contains_jira_reference", features.contains_jira_reference),
    ] {
        let path = ["commit_features", name];
        if !store.contains(&path)? {
            store.record(&path, 0_i64, false)?;
        }
        if hit {
            store.increment(&path, 1_i64)?;
        }
    }
    store.collect(
        &["commit_features", "time_between_commit_and_advisory_record"],
        features.time_between_commit_and_advisory_record,
    )?;
    store.collect(
        &["commit_features", "avg_hunk_size"],
        features.avg_hunk_size,
    )?;
    store.collect_unique(
        &["commit_features", "repositories"],
        features.commit.repository.as_str(),
        false,
    )?;
    Ok(())
}

/// Order candidates most-plausible first: reference hits, then relevant
/// path hits, then publication-window hits, then smallest time distance.
pub fn rank_candidates(mut features: Vec<CommitFeatures>) -> Vec<CommitFeatures> {
    features.sort_by(|a, b| {
        b.references_vuln_id
            .cmp(&a.references_vuln_id)
            .then(b.changes_relevant_path.cmp(&a.changes_relevant_path))
            .then(b.falls_in_advisory_interval.cmp(&a.falls_in_advisory_interval))
            .then(
                a.time_between_commit_and_advisory_record
                    .cmp(&b.time_between_commit_and_advisory_record),
            )
    });
    features
}

/// Full scoring pass for one advisory: extract features for every
/// candidate, populate a fresh run store, rank the candidates.
pub fn score_candidates(
    commits: &[Commit],
    advisory: &AdvisoryRecord,
) -> Result<(StatStore, Vec<CommitFeatures>), AssayerError> {
    let extracted = extract_features_batch(commits, advisory);

    let mut store = StatStore::new();
    store.record(
        &["advisory", "vulnerability_id"],
        advisory.vulnerability_id.as_str(),
        false,
    )?;
    store.record(&["candidates"], commits.len() as i64, false)?;
    for features in &extracted {
        record_features(&mut store, features)?;
    }

    Ok((store, rank_candidates(extracted)))
}

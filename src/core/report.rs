//! Read-only reporting over a finished statistics store.
//!
//! The store's write-protection logic is irrelevant here: reporting only
//! enumerates entries, descends into sub-stores, and renders leaves.

use crate::core::model::CommitFeatures;
use crate::core::stats::{LEVEL_DELIMITER, StatEntry, StatStore};
use colored::Colorize;
use serde_json::{Value as JsonValue, json};
use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_run_id() -> String {
    Ulid::new().to_string()
}

/// Flatten a store depth-first into `(key, leaf)` pairs, joining nested
/// segment names with the reserved delimiter. Empty sub-stores contribute
/// nothing.
pub fn flatten(store: &StatStore) -> Vec<(String, &StatEntry)> {
    let mut out = Vec::new();
    flatten_into(store, None, &mut out);
    out
}

fn flatten_into<'a>(
    store: &'a StatStore,
    prefix: Option<&str>,
    out: &mut Vec<(String, &'a StatEntry)>,
) {
    for (name, entry) in store.entries() {
        let key = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, LEVEL_DELIMITER, name),
            None => name.to_string(),
        };
        match entry {
            StatEntry::Nested(sub) => flatten_into(sub, Some(&key), out),
            leaf => out.push((key, leaf)),
        }
    }
}

/// JSON envelope handed to whatever consumes a finished run.
pub fn render_envelope(
    advisory_id: &str,
    store: &StatStore,
    ranked: &[CommitFeatures],
) -> JsonValue {
    json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "run_id": new_run_id(),
        "cmd": "score",
        "advisory": advisory_id,
        "stats": store,
        "ranked": ranked,
    })
}

/// Colored flat listing for terminals.
pub fn print_text(advisory_id: &str, store: &StatStore, ranked: &[CommitFeatures]) {
    println!(
        "{} {}",
        "Advisory".bright_white().bold(),
        advisory_id.bright_cyan()
    );
    println!();
    for (key, entry) in flatten(store) {
        println!(
            "  {} {}",
            format!("{}:", key).bright_white(),
            leaf_json(entry).bright_green()
        );
    }
    println!();
    println!("{}", "Ranked candidates".bright_white().bold());
    for (idx, features) in ranked.iter().enumerate() {
        let marker = if features.references_vuln_id {
            "●".bright_green()
        } else {
            "○".bright_black()
        };
        println!(
            "  {} {} {} {}",
            marker,
            format!("{}.", idx + 1).bright_black(),
            features.commit.commit_id.bright_cyan(),
            format!(
                "({}s from advisory)",
                features.time_between_commit_and_advisory_record
            )
            .bright_black()
        );
    }
}

fn leaf_json(entry: &StatEntry) -> String {
    serde_json::to_string(entry).unwrap_or_else(|_| "<unrenderable>".to_string())
}

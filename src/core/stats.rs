//! Hierarchical statistics store for analysis-time measurements.
//!
//! Feature extraction records counters, grouped lists, deduplicated sets,
//! and nested sub-groups into a [`StatStore`], addressed by multi-segment
//! paths. Writes are duplicate-protected unless the caller asks to
//! overwrite; intermediate sub-stores are created on demand. At the end of
//! an analysis scope the tree is handed to the reporting layer, which only
//! needs [`StatStore::entries`] and [`StatEntry::kind`] to walk it.

use crate::core::error::AssayerError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Reserved delimiter, historically used to denote hierarchy in flat
/// displays. Segment names must not contain it; hierarchy is expressed
/// with multi-segment paths instead.
pub const LEVEL_DELIMITER: char = '.';

/// A single measured value: the leaf payload of scalars, lists, and sets.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Datum {
    /// Convert a loosely typed JSON value. Objects, arrays, and null have
    /// no datum representation and yield `None`.
    pub fn from_json(value: &JsonValue) -> Option<Datum> {
        match value {
            JsonValue::Bool(b) => Some(Datum::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(Datum::Int(i)),
                None => n.as_f64().map(Datum::Float),
            },
            JsonValue::String(s) => Some(Datum::Text(s.clone())),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Datum::Int(_) | Datum::Float(_))
    }

    /// Numeric addition. Two ints stay an int; any float operand promotes
    /// the result to a float. Non-numeric operands yield `None`.
    fn add(&self, by: &Datum) -> Option<Datum> {
        match (self, by) {
            (Datum::Int(a), Datum::Int(b)) => Some(Datum::Int(a + b)),
            (Datum::Int(a), Datum::Float(b)) => Some(Datum::Float(*a as f64 + b)),
            (Datum::Float(a), Datum::Int(b)) => Some(Datum::Float(a + *b as f64)),
            (Datum::Float(a), Datum::Float(b)) => Some(Datum::Float(a + b)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Datum::Bool(_) => 0,
            Datum::Int(_) => 1,
            Datum::Float(_) => 2,
            Datum::Text(_) => 3,
        }
    }
}

// Manual total order so sets of data (floats included) are well defined.
// Values of different kinds order by kind; floats use `total_cmp`.
impl Ord for Datum {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
            (Datum::Float(a), Datum::Float(b)) => a.total_cmp(b),
            (Datum::Text(a), Datum::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Datum {}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Int(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Text(value)
    }
}

/// Entry kind discriminant, exposed so the reporting layer can dispatch
/// without matching on [`StatEntry`] itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Scalar,
    List,
    Set,
    Nested,
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatKind::Scalar => "scalar",
            StatKind::List => "list",
            StatKind::Set => "set",
            StatKind::Nested => "sub-store",
        })
    }
}

/// A stored statistic: a scalar, an append-only list, a deduplicated set,
/// or a nested sub-store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatEntry {
    Scalar(Datum),
    List(Vec<Datum>),
    Set(BTreeSet<Datum>),
    Nested(StatStore),
}

impl StatEntry {
    pub fn kind(&self) -> StatKind {
        match self {
            StatEntry::Scalar(_) => StatKind::Scalar,
            StatEntry::List(_) => StatKind::List,
            StatEntry::Set(_) => StatKind::Set,
            StatEntry::Nested(_) => StatKind::Nested,
        }
    }

    pub fn as_scalar(&self) -> Option<&Datum> {
        match self {
            StatEntry::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Datum]> {
        match self {
            StatEntry::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<Datum>> {
        match self {
            StatEntry::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&StatStore> {
        match self {
            StatEntry::Nested(store) => Some(store),
            _ => None,
        }
    }
}

// Entries serialize transparently: scalars as the bare value, lists and
// sets as arrays (sets in sorted order), sub-stores as objects.
impl Serialize for StatEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatEntry::Scalar(value) => value.serialize(serializer),
            StatEntry::List(items) => items.serialize(serializer),
            StatEntry::Set(items) => items.serialize(serializer),
            StatEntry::Nested(store) => store.serialize(serializer),
        }
    }
}

impl From<Datum> for StatEntry {
    fn from(value: Datum) -> Self {
        StatEntry::Scalar(value)
    }
}

impl From<bool> for StatEntry {
    fn from(value: bool) -> Self {
        StatEntry::Scalar(Datum::Bool(value))
    }
}

impl From<i64> for StatEntry {
    fn from(value: i64) -> Self {
        StatEntry::Scalar(Datum::Int(value))
    }
}

impl From<f64> for StatEntry {
    fn from(value: f64) -> Self {
        StatEntry::Scalar(Datum::Float(value))
    }
}

impl From<&str> for StatEntry {
    fn from(value: &str) -> Self {
        StatEntry::Scalar(Datum::Text(value.to_string()))
    }
}

impl From<String> for StatEntry {
    fn from(value: String) -> Self {
        StatEntry::Scalar(Datum::Text(value))
    }
}

impl From<Vec<Datum>> for StatEntry {
    fn from(items: Vec<Datum>) -> Self {
        StatEntry::List(items)
    }
}

impl From<BTreeSet<Datum>> for StatEntry {
    fn from(items: BTreeSet<Datum>) -> Self {
        StatEntry::Set(items)
    }
}

impl From<StatStore> for StatEntry {
    fn from(store: StatStore) -> Self {
        StatEntry::Nested(store)
    }
}

/// Ordered tree of named statistic values. Each node holds leaf entries
/// and/or nested sub-stores; sub-stores are exclusively owned by their
/// parent, so the structure is always a strict tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatStore {
    entries: BTreeMap<String, StatEntry>,
}

impl StatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct entries of this node in lexicographic key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &StatEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Write `value` at `path`. A write to an occupied path fails with
    /// `DuplicateKey` unless `overwrite` is set. Intermediate sub-stores
    /// are created on demand; an intermediate segment that holds a
    /// non-sub-store entry fails with `TypeMismatch`.
    pub fn record(
        &mut self,
        path: &[&str],
        value: impl Into<StatEntry>,
        overwrite: bool,
    ) -> Result<(), AssayerError> {
        self.record_entry(path, value.into(), overwrite)
    }

    fn record_entry(
        &mut self,
        path: &[&str],
        value: StatEntry,
        overwrite: bool,
    ) -> Result<(), AssayerError> {
        match path {
            [] => Err(AssayerError::EmptyPath),
            [name] => {
                validate_segment(name)?;
                if !overwrite && self.entries.contains_key(*name) {
                    return Err(AssayerError::DuplicateKey((*name).to_string()));
                }
                self.entries.insert((*name).to_string(), value);
                Ok(())
            }
            [head, rest @ ..] => {
                validate_segment(head)?;
                let entry = self
                    .entries
                    .entry((*head).to_string())
                    .or_insert_with(|| StatEntry::Nested(StatStore::new()));
                match entry {
                    StatEntry::Nested(sub) => sub.record_entry(rest, value, overwrite),
                    other => Err(AssayerError::TypeMismatch(format!(
                        "'{}' holds a {}, not a sub-store",
                        head,
                        other.kind()
                    ))),
                }
            }
        }
    }

    /// Loosely typed entry point for externally supplied measurements. The
    /// path may be a JSON string (single segment) or an array of strings
    /// (multi-segment); anything else fails with `InvalidPathType`.
    pub fn record_json(
        &mut self,
        path: &JsonValue,
        value: &JsonValue,
        overwrite: bool,
    ) -> Result<(), AssayerError> {
        let segments = parse_path(path)?;
        let value = Datum::from_json(value).ok_or_else(|| {
            AssayerError::TypeMismatch(
                "only booleans, numbers, and strings can be recorded from JSON".to_string(),
            )
        })?;
        let borrowed: Vec<&str> = segments.iter().map(String::as_str).collect();
        self.record(&borrowed, value, overwrite)
    }

    /// Ensure a sub-store exists at `path`, installing `initial` (or an
    /// empty store) only if the path is absent. Never overwrites; an
    /// occupant of any other kind fails with `TypeMismatch`.
    pub fn sub_store(
        &mut self,
        path: &[&str],
        initial: Option<StatStore>,
    ) -> Result<(), AssayerError> {
        match self.get(path) {
            Ok(StatEntry::Nested(_)) => Ok(()),
            Ok(entry) => Err(AssayerError::TypeMismatch(format!(
                "'{}' is a {}, not a sub-store",
                join_path(path),
                entry.kind()
            ))),
            Err(AssayerError::KeyNotFound(_)) => {
                self.record_entry(path, StatEntry::Nested(initial.unwrap_or_default()), false)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get(&self, path: &[&str]) -> Result<&StatEntry, AssayerError> {
        match path {
            [] => Err(AssayerError::EmptyPath),
            [name] => self
                .entries
                .get(*name)
                .ok_or_else(|| AssayerError::KeyNotFound((*name).to_string())),
            [head, rest @ ..] => match self.entries.get(*head) {
                None => Err(AssayerError::KeyNotFound((*head).to_string())),
                Some(StatEntry::Nested(sub)) => sub.get(rest),
                Some(entry) => Err(AssayerError::TypeMismatch(format!(
                    "'{}' is a {}, not a sub-store",
                    head,
                    entry.kind()
                ))),
            },
        }
    }

    /// Whether `path` is present. A missing segment yields `Ok(false)`; an
    /// intermediate segment of the wrong shape is still an error, so
    /// "absent" and "wrong shape" stay distinguishable.
    pub fn contains(&self, path: &[&str]) -> Result<bool, AssayerError> {
        match path {
            [] => Err(AssayerError::EmptyPath),
            [name] => Ok(self.entries.contains_key(*name)),
            [head, rest @ ..] => match self.entries.get(*head) {
                None => Ok(false),
                Some(StatEntry::Nested(sub)) => sub.contains(rest),
                Some(entry) => Err(AssayerError::TypeMismatch(format!(
                    "'{}' is a {}, not a sub-store",
                    head,
                    entry.kind()
                ))),
            },
        }
    }

    /// Append `value` to the list at `path`, creating an empty list first
    /// if the path is absent.
    pub fn collect(
        &mut self,
        path: &[&str],
        value: impl Into<Datum>,
    ) -> Result<(), AssayerError> {
        if !self.contains(path)? {
            self.record_entry(path, StatEntry::List(Vec::new()), false)?;
        }
        match self.get_mut(path)? {
            StatEntry::List(items) => {
                items.push(value.into());
                Ok(())
            }
            entry => Err(AssayerError::TypeMismatch(format!(
                "cannot collect into '{}': it is a {}, not a list",
                join_path(path),
                entry.kind()
            ))),
        }
    }

    /// Insert `value` into the set at `path`, creating an empty set first
    /// if the path is absent. The set already enforces uniqueness, so the
    /// `ensure_uniqueness` flag changes nothing observable; it is kept for
    /// interface compatibility.
    pub fn collect_unique(
        &mut self,
        path: &[&str],
        value: impl Into<Datum>,
        ensure_uniqueness: bool,
    ) -> Result<(), AssayerError> {
        if !self.contains(path)? {
            self.record_entry(path, StatEntry::Set(BTreeSet::new()), false)?;
        }
        match self.get_mut(path)? {
            StatEntry::Set(items) => {
                let value = value.into();
                if !ensure_uniqueness || !items.contains(&value) {
                    items.insert(value);
                }
                Ok(())
            }
            entry => Err(AssayerError::TypeMismatch(format!(
                "cannot collect into '{}': it is a {}, not a set",
                join_path(path),
                entry.kind()
            ))),
        }
    }

    /// Add `by` to the value at `path`, which must already exist. A scalar
    /// is replaced by its sum with `by` (the one sanctioned exception to
    /// duplicate-write protection); a list whose last element is numeric
    /// has that element incremented in place. Anything else fails with
    /// `TypeMismatch`.
    pub fn increment(
        &mut self,
        path: &[&str],
        by: impl Into<Datum>,
    ) -> Result<(), AssayerError> {
        let by = by.into();
        let display = join_path(path);
        match self.get_mut(path)? {
            StatEntry::Scalar(current) => {
                let next = current.add(&by).ok_or_else(|| {
                    AssayerError::TypeMismatch(format!(
                        "cannot increment '{}': operands are not numeric",
                        display
                    ))
                })?;
                *current = next;
                Ok(())
            }
            StatEntry::List(items) => match items.last_mut() {
                Some(last) if last.is_numeric() => {
                    let next = last.add(&by).ok_or_else(|| {
                        AssayerError::TypeMismatch(format!(
                            "cannot increment '{}': operands are not numeric",
                            display
                        ))
                    })?;
                    *last = next;
                    Ok(())
                }
                _ => Err(AssayerError::TypeMismatch(format!(
                    "cannot increment '{}': the list does not end in a number",
                    display
                ))),
            },
            entry => Err(AssayerError::TypeMismatch(format!(
                "cannot increment '{}': it is a {}",
                display,
                entry.kind()
            ))),
        }
    }

    fn get_mut(&mut self, path: &[&str]) -> Result<&mut StatEntry, AssayerError> {
        match path {
            [] => Err(AssayerError::EmptyPath),
            [name] => self
                .entries
                .get_mut(*name)
                .ok_or_else(|| AssayerError::KeyNotFound((*name).to_string())),
            [head, rest @ ..] => match self.entries.get_mut(*head) {
                None => Err(AssayerError::KeyNotFound((*head).to_string())),
                Some(StatEntry::Nested(sub)) => sub.get_mut(rest),
                Some(entry) => Err(AssayerError::TypeMismatch(format!(
                    "'{}' is a {}, not a sub-store",
                    head,
                    entry.kind()
                ))),
            },
        }
    }
}

impl Serialize for StatStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

/// Parse a loosely typed JSON path into owned segments. A string is a
/// single segment; an array of strings is a multi-segment path.
pub fn parse_path(value: &JsonValue) -> Result<Vec<String>, AssayerError> {
    match value {
        JsonValue::String(s) => Ok(vec![s.clone()]),
        JsonValue::Array(items) => {
            let mut segments = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    JsonValue::String(s) => segments.push(s.clone()),
                    other => {
                        return Err(AssayerError::InvalidPathType(format!(
                            "path segments must be strings, got {}",
                            other
                        )));
                    }
                }
            }
            Ok(segments)
        }
        other => Err(AssayerError::InvalidPathType(format!(
            "paths must be a string or an array of strings, got {}",
            other
        ))),
    }
}

fn validate_segment(name: &str) -> Result<(), AssayerError> {
    if name.contains(LEVEL_DELIMITER) {
        return Err(AssayerError::InvalidSegmentName(format!(
            "'{}' contains the reserved delimiter '{}'; hierarchy is expressed with multi-segment paths",
            name, LEVEL_DELIMITER
        )));
    }
    Ok(())
}

fn join_path(path: &[&str]) -> String {
    path.join(".")
}

//! Keyed record store.
//!
//! [`RecordStore`] is the storage contract the tracker is written against:
//! point lookups, predicate scans and named sequences. [`InMemoryStore`] is
//! the bundled implementation; it keeps ordered tables in memory and, when
//! given a path, snapshots them to a JSONL file on every flush.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::jsonl;
use crate::model::{Comment, Issue, IssueEvent, Label, RepoKey, Repository};

/// Record families held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Repository,
    Issue,
    Comment,
    Label,
    Event,
}

/// Primary key of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Repository(RepoKey),
    Issue(RepoKey, u64),
    Comment(u64),
    Label(RepoKey, String),
    Event(u64),
}

impl RecordKey {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Repository(_) => RecordKind::Repository,
            Self::Issue(..) => RecordKind::Issue,
            Self::Comment(_) => RecordKind::Comment,
            Self::Label(..) => RecordKind::Label,
            Self::Event(_) => RecordKind::Event,
        }
    }
}

/// A stored entity. Serialized with a `kind` tag, one per JSONL line.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Repository(Repository),
    Issue(Issue),
    Comment(Comment),
    Label(Label),
    Event(IssueEvent),
}

impl Record {
    #[must_use]
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Repository(r) => RecordKey::Repository(r.key()),
            Self::Issue(i) => RecordKey::Issue(i.repo_key(), i.number),
            Self::Comment(c) => RecordKey::Comment(c.id),
            Self::Label(l) => RecordKey::Label(RepoKey::new(&l.owner, &l.repo), l.name.clone()),
            Self::Event(e) => RecordKey::Event(e.id),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Repository(_) => RecordKind::Repository,
            Self::Issue(_) => RecordKind::Issue,
            Self::Comment(_) => RecordKind::Comment,
            Self::Label(_) => RecordKind::Label,
            Self::Event(_) => RecordKind::Event,
        }
    }

    #[must_use]
    pub const fn as_repository(&self) -> Option<&Repository> {
        match self {
            Self::Repository(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_issue(&self) -> Option<&Issue> {
        match self {
            Self::Issue(i) => Some(i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_comment(&self) -> Option<&Comment> {
        match self {
            Self::Comment(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_label(&self) -> Option<&Label> {
        match self {
            Self::Label(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_event(&self) -> Option<&IssueEvent> {
        match self {
            Self::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Largest global id carried by this record, if it has one.
    const fn global_id(&self) -> Option<u64> {
        match self {
            Self::Repository(_) => None,
            Self::Issue(i) => Some(i.id),
            Self::Comment(c) => Some(c.id),
            Self::Label(l) => Some(l.id),
            Self::Event(e) => Some(e.id),
        }
    }
}

/// Storage contract used by the tracker.
///
/// Every operation is atomic with respect to a single record. Grouping
/// several writes into one logical change is the caller's job.
pub trait RecordStore: Send + Sync {
    /// Insert or replace a record under its own key.
    fn put(&mut self, record: Record);

    /// Point lookup. `None` means not found.
    fn get(&self, key: &RecordKey) -> Option<&Record>;

    /// Remove a record, returning it if it existed.
    fn remove(&mut self, key: &RecordKey) -> Option<Record>;

    /// Lazily iterate the records of one kind that satisfy `predicate`, in key order.
    fn scan<'a, P>(&'a self, kind: RecordKind, predicate: P) -> Box<dyn Iterator<Item = &'a Record> + 'a>
    where
        P: Fn(&Record) -> bool + 'a;

    /// Allocate the next value of a named sequence, starting at 1.
    fn next_id(&mut self, sequence: &str) -> u64;

    /// Make all writes so far durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn flush(&mut self) -> Result<()>;
}

/// Sequence high-water marks implied by the records of a loaded snapshot.
fn implied_sequences(records: &[Record]) -> BTreeMap<String, u64> {
    let mut marks: BTreeMap<String, u64> = BTreeMap::new();
    let mut bump = |name: String, value: u64| {
        let entry = marks.entry(name).or_insert(0);
        *entry = (*entry).max(value);
    };
    for record in records {
        let sequence = match record {
            Record::Repository(_) => continue,
            Record::Issue(issue) => {
                bump(issue.repo_key().number_sequence(), issue.number);
                "issues"
            }
            Record::Comment(_) => "comments",
            Record::Label(_) => "labels",
            Record::Event(_) => "events",
        };
        if let Some(id) = record.global_id() {
            bump(sequence.to_string(), id);
        }
    }
    marks
}

/// In-memory record store with optional JSONL persistence.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: BTreeMap<RecordKind, BTreeMap<RecordKey, Record>>,
    sequences: BTreeMap<String, u64>,
    path: Option<PathBuf>,
}

impl InMemoryStore {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a JSONL-backed store. A missing file yields an empty store that
    /// will be created on the first flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut store = Self::new();
        store.path = Some(path.to_path_buf());

        if !path.exists() {
            debug!(path = %path.display(), "no snapshot yet, starting empty");
            return Ok(store);
        }

        let loaded = jsonl::load(path)?;
        let implied = implied_sequences(&loaded.records);
        for record in loaded.records {
            store.put(record);
        }

        // A sequence never falls below an id already handed out.
        store.sequences = loaded.sequences;
        for (name, mark) in implied {
            let entry = store.sequences.entry(name).or_insert(0);
            *entry = (*entry).max(mark);
        }

        debug!(
            path = %path.display(),
            records = store.len(),
            "loaded snapshot"
        );
        Ok(store)
    }

    /// Path this store persists to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Save to a specific file path.
    ///
    /// # Errors
    ///
    /// Returns `Io` on write failure.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let records: Vec<&Record> = self.tables.values().flat_map(BTreeMap::values).collect();
        jsonl::save(path.as_ref(), &records, &self.sequences)
    }

    /// Current value of a sequence (0 if never allocated).
    #[must_use]
    pub fn sequence_value(&self, sequence: &str) -> u64 {
        self.sequences.get(sequence).copied().unwrap_or(0)
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryStore {
    fn put(&mut self, record: Record) {
        self.tables
            .entry(record.kind())
            .or_default()
            .insert(record.key(), record);
    }

    fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.tables.get(&key.kind()).and_then(|table| table.get(key))
    }

    fn remove(&mut self, key: &RecordKey) -> Option<Record> {
        self.tables
            .get_mut(&key.kind())
            .and_then(|table| table.remove(key))
    }

    fn scan<'a, P>(&'a self, kind: RecordKind, predicate: P) -> Box<dyn Iterator<Item = &'a Record> + 'a>
    where
        P: Fn(&Record) -> bool + 'a,
    {
        match self.tables.get(&kind) {
            Some(table) => Box::new(table.values().filter(move |record| predicate(record))),
            None => Box::new(std::iter::empty()),
        }
    }

    fn next_id(&mut self, sequence: &str) -> u64 {
        let value = self.sequences.entry(sequence.to_string()).or_insert(0);
        *value += 1;
        *value
    }

    fn flush(&mut self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }
}

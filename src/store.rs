use crate::ast::Node;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use slab::Slab;
use std::{
    fmt::{Display, Formatter},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Identifier handed out by [`RuleStore::put`]. Identifiers start at 1 and are never reused.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(u64);

impl RuleId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    #[inline]
    fn from_key(key: usize) -> Self {
        Self(key as u64 + 1)
    }

    #[inline]
    fn key(self) -> Option<usize> {
        self.0
            .checked_sub(1)
            .and_then(|key| usize::try_from(key).ok())
    }
}

impl From<u64> for RuleId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for RuleId {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A stored rule: the text it was written as and its tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub rule_string: String,
    #[serde(rename = "AST")]
    pub tree: Node,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("rule {0} not found")]
    NotFound(RuleId),
    #[error("failed to access the rule snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read or write the rule snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("corrupt rule snapshot => expected rule {expected}, found rule {found}")]
    CorruptSnapshot { expected: RuleId, found: RuleId },
}

#[derive(Deserialize)]
struct Snapshot {
    rules: Vec<RuleRecord>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    rules: Vec<&'a RuleRecord>,
}

/// Thread-safe store of rules.
///
/// Identifier allocation and insertion happen under a single write lock so two concurrent
/// [`RuleStore::put`] never share an identifier and a [`RuleStore::get`] never sees half a record.
/// Cloning the store is cheap and every clone shares the same records.
#[derive(Clone, Debug, Default)]
pub struct RuleStore {
    rules: Arc<RwLock<Slab<RuleRecord>>>,
    snapshot: Option<Arc<PathBuf>>,
}

impl RuleStore {
    /// Create an in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store mirrored to a JSON snapshot file.
    ///
    /// The snapshot is loaded if it exists. Each [`RuleStore::put`] rewrites it before the new
    /// record becomes visible.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let rules = match fs::read_to_string(&path) {
            Ok(content) => restore(serde_json::from_str(&content)?)?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Slab::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        info!(rules = rules.len(), "rule store opened");

        Ok(Self {
            rules: Arc::new(RwLock::new(rules)),
            snapshot: Some(Arc::new(path)),
        })
    }

    /// Record a rule under a fresh identifier.
    #[instrument(skip_all)]
    pub fn put(&self, rule_string: impl Into<String>, tree: Node) -> Result<RuleId, StoreError> {
        let mut rules = self.rules.write();
        let record = RuleRecord {
            id: RuleId::from_key(rules.vacant_key()),
            rule_string: rule_string.into(),
            tree,
        };

        if let Some(path) = &self.snapshot {
            let records = rules
                .iter()
                .map(|(_, record)| record)
                .chain(std::iter::once(&record))
                .collect();
            write_snapshot(path, &SnapshotRef { rules: records })?;
        }

        let id = record.id;
        let key = rules.insert(record);
        debug_assert_eq!(RuleId::from_key(key), id);
        info!(rule_id = %id, "rule stored");
        Ok(id)
    }

    pub fn get(&self, id: RuleId) -> Result<RuleRecord, StoreError> {
        let rules = self.rules.read();
        id.key()
            .and_then(|key| rules.get(key))
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Every stored rule, by increasing identifier.
    pub fn list(&self) -> Vec<RuleRecord> {
        self.rules
            .read()
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

fn restore(snapshot: Snapshot) -> Result<Slab<RuleRecord>, StoreError> {
    let mut records = snapshot.rules;
    records.sort_by_key(|record| record.id);

    let mut rules = Slab::with_capacity(records.len());
    for record in records {
        let expected = RuleId::from_key(rules.len());
        if record.id != expected {
            return Err(StoreError::CorruptSnapshot {
                expected,
                found: record.id,
            });
        }
        rules.insert(record);
    }
    Ok(rules)
}

/// Replace the snapshot through a uniquely named file in the same directory, so a reader never
/// sees a partial snapshot and concurrent writers never share a temporary file.
fn write_snapshot(path: &Path, snapshot: &SnapshotRef) -> Result<(), StoreError> {
    let content = serde_json::to_vec_pretty(snapshot)?;
    let io_error = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temporary = NamedTempFile::new_in(directory).map_err(io_error)?;
    temporary.write_all(&content).map_err(io_error)?;
    temporary
        .persist(path)
        .map_err(|error| io_error(error.error))?;
    debug!(rules = snapshot.rules.len(), "rule snapshot written");
    Ok(())
}

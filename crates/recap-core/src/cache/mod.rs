//! Process-wide metadata cache shared by every capture session.
//!
//! Two maps: case id -> `CaseRecord` and document id -> `DocumentRecord`.
//! Each map sits behind its own `RwLock`; writers (merges, the cache owner's
//! `set_*`) hold the write lock for the whole operation, so readers observe a
//! record either before or after a merge, never half-written. Entries are
//! created lazily and never removed here.

mod merge;
mod persist;

pub use merge::MergeSummary;
pub use persist::CacheSnapshot;

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Case fields known to the extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(
        rename = "officialcasenum",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub official_case_num: Option<String>,
    #[serde(rename = "casename", default, skip_serializing_if = "Option::is_none")]
    pub case_name: Option<String>,
}

/// Arbitrary field/value pairs the archive supplied for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRecord(BTreeMap<String, Value>);

impl DocumentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field as a string, when it is one.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MetadataCache {
    cases: RwLock<HashMap<String, CaseRecord>>,
    documents: RwLock<HashMap<String, DocumentRecord>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case(&self, case_id: &str) -> Option<CaseRecord> {
        read(&self.cases).get(case_id).cloned()
    }

    /// Replace a case record. For the cache owner; sessions go through `merge`.
    pub fn set_case(&self, case_id: impl Into<String>, record: CaseRecord) {
        write(&self.cases).insert(case_id.into(), record);
    }

    pub fn document(&self, doc_id: &str) -> Option<DocumentRecord> {
        read(&self.documents).get(doc_id).cloned()
    }

    /// Replace a document record. For the cache owner; sessions go through `merge`.
    pub fn set_document(&self, doc_id: impl Into<String>, record: DocumentRecord) {
        write(&self.documents).insert(doc_id.into(), record);
    }

    pub fn case_count(&self) -> usize {
        read(&self.cases).len()
    }

    pub fn document_count(&self) -> usize {
        read(&self.documents).len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_count() == 0 && self.document_count() == 0
    }
}

// Poisoned locks are reused: every write is a whole-field insert.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

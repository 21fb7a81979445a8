use std::collections::HashMap;

use parking_lot::RwLock;

use super::model::Consultation;
use crate::core::{ApiError, ApiResult};

#[derive(Default)]
struct Inner {
    records: Vec<Consultation>,
    index: HashMap<String, usize>,
}

/// Authoritative in-memory list of consultations.
///
/// Records are kept in insertion order. Writers take the lock exclusively, so
/// an append and an in-place update never interleave; readers get a
/// consistent snapshot.
#[derive(Default)]
pub struct RecordStore {
    inner: RwLock<Inner>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Ids are unique for the lifetime of the store.
    pub fn append(&self, record: Consultation) -> ApiResult<()> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&record.id) {
            return Err(ApiError::Internal(format!(
                "duplicate consultation id {}",
                record.id
            )));
        }
        let pos = inner.records.len();
        inner.index.insert(record.id.clone(), pos);
        inner.records.push(record);
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> ApiResult<Consultation> {
        let inner = self.inner.read();
        inner
            .index
            .get(id)
            .map(|&pos| inner.records[pos].clone())
            .ok_or_else(not_found)
    }

    /// Snapshot of every record in insertion order.
    pub fn all(&self) -> Vec<Consultation> {
        self.inner.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies `f` to the record under the write lock.
    ///
    /// `f` validates and mutates a scratch copy; the stored record is only
    /// replaced when `f` succeeds, so a failed update leaves the store as it was.
    pub fn update<F>(&self, id: &str, f: F) -> ApiResult<Consultation>
    where
        F: FnOnce(&mut Consultation) -> ApiResult<()>,
    {
        let mut inner = self.inner.write();
        let pos = *inner.index.get(id).ok_or_else(not_found)?;
        let mut scratch = inner.records[pos].clone();
        f(&mut scratch)?;
        inner.records[pos] = scratch.clone();
        Ok(scratch)
    }

    /// Reads every record under the read lock without cloning.
    pub fn with_records<R>(&self, f: impl FnOnce(&[Consultation]) -> R) -> R {
        f(&self.inner.read().records)
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Consultation not found".to_string())
}

//! In-memory job record store.
//!
//! Owns every [`JobMetadata`] for the lifetime of the process, keyed by job
//! id and kept in insertion order. Records are never evicted. A background
//! failure is attached to the record so lookups can report it.
//!
//! Uses an `IndexMap` behind `std::sync::RwLock`; handlers and job workers
//! run on a multi-threaded runtime and share one `Arc<JobStore>`.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::models::JobMetadata;

#[derive(Debug, Clone)]
struct JobRecord {
    meta: JobMetadata,
    failure: Option<String>,
}

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<IndexMap<String, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Ids are freshly minted UUIDs, so an existing entry
    /// is only replaced if a caller deliberately reuses an id.
    pub fn insert(&self, meta: JobMetadata) {
        self.write().insert(
            meta.id.clone(),
            JobRecord {
                meta,
                failure: None,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<JobMetadata> {
        self.read().get(id).map(|r| r.meta.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// All jobs in submission order.
    pub fn list(&self) -> Vec<JobMetadata> {
        self.read().values().map(|r| r.meta.clone()).collect()
    }

    /// Record a terminal failure. Returns `false` for unknown ids.
    pub fn mark_failed(&self, id: &str, error: impl Into<String>) -> bool {
        match self.write().get_mut(id) {
            Some(record) => {
                record.failure = Some(error.into());
                true
            }
            None => false,
        }
    }

    pub fn failure(&self, id: &str) -> Option<String> {
        self.read().get(id).and_then(|r| r.failure.clone())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, JobRecord>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, JobRecord>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

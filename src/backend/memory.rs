// In-process collaborator backed by a Vec, with failure injection

use super::{Collaborator, Patch, apply_patch};
use crate::record::Record;
use eyre::{Result, eyre};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use tracing::debug;

/// Records held in memory. Single-threaded, like the views that use it.
#[derive(Debug)]
pub struct MemoryCollaborator<R: Record> {
    records: RefCell<Vec<R>>,
    failing_ids: RefCell<HashSet<String>>,
    fail_loads: Cell<bool>,
    calls: Cell<usize>,
}

impl<R: Record> MemoryCollaborator<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records: RefCell::new(records),
            failing_ids: RefCell::new(HashSet::new()),
            fail_loads: Cell::new(false),
            calls: Cell::new(0),
        }
    }

    /// Make every mutate/remove of `id` fail
    pub fn fail_on(&self, id: &str) {
        self.failing_ids.borrow_mut().insert(id.to_string());
    }

    /// Make `load` fail (or succeed again)
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.set(fail);
    }

    /// Replace the backing records, as another admin session would
    pub fn set_records(&self, records: Vec<R>) {
        *self.records.borrow_mut() = records;
    }

    pub fn records(&self) -> Vec<R> {
        self.records.borrow().clone()
    }

    /// Number of collaborator calls served so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn check(&self, id: &str) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.failing_ids.borrow().contains(id) {
            return Err(eyre!("Backend rejected record {}", id));
        }
        Ok(())
    }
}

impl<R: Record> Collaborator<R> for MemoryCollaborator<R> {
    fn load(&self) -> Result<Vec<R>> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_loads.get() {
            return Err(eyre!("Backend unavailable"));
        }
        let records = self.records.borrow().clone();
        debug!(collection = R::collection_name(), count = records.len(), "Loaded records from memory");
        Ok(records)
    }

    fn mutate(&self, id: &str, patch: &Patch) -> Result<R> {
        self.check(id)?;
        let mut records = self.records.borrow_mut();
        let slot = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| eyre!("Record {} not found", id))?;
        let updated = apply_patch(slot, patch)?;
        *slot = updated.clone();
        Ok(updated)
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.check(id)?;
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Err(eyre!("Record {} not found", id));
        }
        Ok(())
    }
}

// In-memory record store: the raw collection behind a view

use crate::record::Record;
use std::collections::HashSet;
use tracing::debug;

/// Holds the raw collection exactly as last loaded
///
/// The store is replaced wholesale on every load. Each change bumps the
/// generation, which views use to decide whether a cached result is stale.
#[derive(Debug, Clone)]
pub struct RecordStore<R: Record> {
    records: Vec<R>,
    generation: u64,
}

impl<R: Record> Default for RecordStore<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            generation: 0,
        }
    }
}

impl<R: Record> RecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection
    pub fn replace(&mut self, records: Vec<R>) {
        let before = self.records.len();
        self.records = records;
        self.generation += 1;
        debug!(
            collection = R::collection_name(),
            before,
            after = self.records.len(),
            generation = self.generation,
            "Replaced record store"
        );
    }

    /// Insert or replace a single record, keeping its position if present
    pub fn upsert(&mut self, record: R) {
        let pos = self.records.iter().position(|r| r.id() == record.id());
        match pos {
            Some(i) => self.records[i] = record,
            None => self.records.push(record),
        }
        self.generation += 1;
    }

    /// Remove a record by id
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let pos = self.records.iter().position(|r| r.id() == id)?;
        self.generation += 1;
        Some(self.records.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.id()).collect()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

use std::collections::HashSet;

use crate::api::models::ContactRecord;

/// Contact records in display order, newest live arrival first.
/// No two records share an id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactCache {
    records: Vec<ContactRecord>,
}

impl ContactCache {
    /// Build from a server list, keeping the first occurrence of each id.
    pub fn from_records(records: Vec<ContactRecord>) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        let records = records
            .into_iter()
            .filter(|r| {
                let fresh = seen.insert(r.id.clone());
                if !fresh {
                    log::debug!("dropping duplicate record {} from server list", r.id);
                }
                fresh
            })
            .collect();
        Self { records }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Prepend unless the id is already present. Returns whether it was inserted.
    pub fn insert_front(&mut self, record: ContactRecord) -> bool {
        if self.contains(&record.id) {
            return false;
        }
        self.records.insert(0, record);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub fn ids(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContactRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[ContactRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

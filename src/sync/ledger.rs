use std::collections::HashSet;

/// Ids the local user has acknowledged. Only ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadLedger {
    ids: HashSet<String>,
}

impl ReadLedger {
    pub fn from_ids<I: IntoIterator<Item = String>>(ids: I) -> Self {
        Self { ids: ids.into_iter().collect() }
    }

    pub fn replace(&mut self, ids: HashSet<String>) {
        self.ids = ids;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Sorted for stable persistence.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

use std::collections::HashSet;

use crate::api::client::FormSource;
use crate::api::models::ContactRecord;
use crate::error::ApiError;
use crate::sync::cache::ContactCache;
use crate::sync::filter::Filter;
use crate::sync::ledger::ReadLedger;

/// Sole owner of the contact cache and the read ledger. The unread count
/// is derived, never stored.
#[derive(Debug, Default)]
pub struct NotificationSync {
    cache: ContactCache,
    ledger: ReadLedger,
}

impl NotificationSync {
    pub fn new(ledger: ReadLedger) -> Self {
        Self { cache: ContactCache::default(), ledger }
    }

    /// Fetch the full list and make it the read baseline. On failure nothing changes.
    pub async fn initialize<S: FormSource>(&mut self, source: &S) -> Result<&ContactCache, ApiError> {
        let records = source.fetch_forms().await?;
        self.cache = ContactCache::from_records(records);
        self.mark_all_read();
        log::info!("loaded {} contact records", self.cache.len());
        Ok(&self.cache)
    }

    pub fn apply_insert(&mut self, record: ContactRecord) -> bool {
        let id = record.id.clone();
        let inserted = self.cache.insert_front(record);
        if inserted {
            log::info!("new contact {id}");
        } else {
            log::debug!("duplicate contact {id} ignored");
        }
        inserted
    }

    /// Idempotent: removing an unknown id is a no-op.
    pub fn apply_removal(&mut self, id: &str) {
        if self.cache.remove(id) {
            log::info!("contact {id} removed");
        } else {
            log::debug!("removal of unknown contact {id} ignored");
        }
    }

    /// Replace the cache with `server_list`, returning the ids that were
    /// not cached before, in server order. Records missing from the server
    /// list disappear with the replacement.
    pub fn reconcile(&mut self, server_list: Vec<ContactRecord>) -> Vec<String> {
        let incoming = ContactCache::from_records(server_list);
        let known = self.cache.ids();
        let inserted: Vec<String> = incoming
            .iter()
            .filter(|r| !known.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        let dropped = known.iter().filter(|id| !incoming.contains(id)).count();
        if !inserted.is_empty() || dropped > 0 {
            log::info!("reconciled: {} new, {} gone", inserted.len(), dropped);
        }
        self.cache = incoming;
        inserted
    }

    pub fn unread_count(&self) -> usize {
        self.cache.iter().filter(|r| !self.ledger.contains(&r.id)).count()
    }

    pub fn mark_all_read(&mut self) {
        self.ledger.replace(self.cache.ids());
    }

    pub fn filter<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a ContactRecord> + 'a {
        self.cache.iter().filter(move |r| filter.matches(r))
    }

    pub fn cache(&self) -> &ContactCache {
        &self.cache
    }

    pub fn ledger(&self) -> &ReadLedger {
        &self.ledger
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.cache.contains(id) && !self.ledger.contains(id)
    }

    pub fn records_by_id(&self, ids: &[String]) -> Vec<&ContactRecord> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.cache.iter().filter(|r| wanted.contains(r.id.as_str())).collect()
    }
}

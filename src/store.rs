use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::entry::{EntryId, RaceEntry, RaceRecord, RaceSummary};
use crate::error::StoreError;

/// Durable keyed storage for race entries (allows swapping the engine and
/// mocking in tests).
#[async_trait]
pub trait RaceStore: Send + Sync {
    /// Store a new entry, assigning its id and stamping both timestamps.
    async fn insert(&self, record: RaceRecord) -> Result<EntryId, StoreError>;

    /// Replace an entry's fields, keeping `created_at` and stamping `updated_at`.
    async fn update(&self, id: EntryId, record: RaceRecord) -> Result<(), StoreError>;

    async fn get(&self, id: EntryId) -> Result<RaceEntry, StoreError>;

    async fn delete(&self, id: EntryId) -> Result<(), StoreError>;

    /// Summaries ordered by race date, newest first; same-day entries newest id first.
    async fn list_by_date_desc(&self) -> Result<Vec<RaceSummary>, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    last_id: u64,
    entries: BTreeMap<EntryId, RaceEntry>,
}

/// In-process store with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RaceStore for MemoryStore {
    async fn insert(&self, record: RaceRecord) -> Result<EntryId, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = EntryId(inner.last_id);
        let now = Utc::now();
        inner.entries.insert(
            id,
            RaceEntry {
                id,
                record,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update(&self, id: EntryId, record: RaceRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner.entries.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry.record = record;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, id: EntryId) -> Result<RaceEntry, StoreError> {
        self.inner
            .read()
            .await
            .entries
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: EntryId) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .entries
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_by_date_desc(&self) -> Result<Vec<RaceSummary>, StoreError> {
        let inner = self.inner.read().await;
        let mut summaries: Vec<RaceSummary> =
            inner.entries.values().map(RaceEntry::summary).collect();
        summaries.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::entry::RaceResults;

    fn record(name: &str, date: (i32, u32, u32)) -> RaceRecord {
        RaceRecord {
            race_name: name.to_string(),
            race_type: "Half Marathon".to_string(),
            location: "Boulder".to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            bib_photo: None,
            finisher_photo: None,
            medal_photo: None,
            route: None,
            route_file_name: None,
            results: RaceResults::default(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert(record("A", (2024, 1, 1))).await.unwrap();
        let b = store.insert(record("B", (2024, 1, 2))).await.unwrap();
        assert_eq!(a, EntryId(1));
        assert_eq!(b, EntryId(2));

        let entry = store.get(b).await.unwrap();
        assert_eq!(entry.record.race_name, "B");
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let a = store.insert(record("A", (2024, 1, 1))).await.unwrap();
        store.delete(a).await.unwrap();
        let b = store.insert(record("B", (2024, 1, 1))).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let store = MemoryStore::new();
        let id = store.insert(record("Old", (2024, 1, 1))).await.unwrap();
        let before = store.get(id).await.unwrap();

        store.update(id, record("New", (2024, 1, 1))).await.unwrap();
        let after = store.get(id).await.unwrap();
        assert_eq!(after.record.race_name, "New");
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let store = MemoryStore::new();
        let missing = EntryId(42);
        assert!(matches!(store.get(missing).await, Err(StoreError::NotFound(id)) if id == missing));
        assert!(matches!(
            store.update(missing, record("X", (2024, 1, 1))).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete(missing).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_newest_date_first() {
        let store = MemoryStore::new();
        store.insert(record("Mid", (2023, 6, 1))).await.unwrap();
        store.insert(record("Newest", (2024, 9, 1))).await.unwrap();
        store.insert(record("Oldest", (2022, 3, 1))).await.unwrap();
        store.insert(record("Newest again", (2024, 9, 1))).await.unwrap();

        let names: Vec<String> = store
            .list_by_date_desc()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.race_name)
            .collect();
        assert_eq!(names, vec!["Newest again", "Newest", "Mid", "Oldest"]);
        assert_eq!(store.len().await, 4);
    }
}

use tracing::{error, info};

use crate::entry::{EntryId, RaceDraft, RaceEntry, RaceSummary};
use crate::error::StoreError;
use crate::ingest::{EntryProcessor, FieldWarning};
use crate::store::RaceStore;

/// Outcome of saving a new entry.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: EntryId,
    pub warnings: Vec<FieldWarning>,
}

/// Race scrapbook: ingests drafts and keeps the resulting entries in a store.
pub struct Scrapbook<S> {
    store: S,
    processor: EntryProcessor,
}

impl<S: RaceStore> Scrapbook<S> {
    pub fn new(store: S, processor: EntryProcessor) -> Self {
        Self { store, processor }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process a draft and store it as a new entry.
    pub async fn add_entry(&self, draft: RaceDraft) -> Result<Submission, StoreError> {
        let processed = self.processor.process(draft).await;
        let id = self
            .store
            .insert(processed.record)
            .await
            .inspect_err(|e| error!(error = %e, "failed to add entry"))?;

        info!(%id, warnings = processed.warnings.len(), "race entry added");
        Ok(Submission {
            id,
            warnings: processed.warnings,
        })
    }

    /// Process a draft and replace the fields of an existing entry with it.
    pub async fn update_entry(
        &self,
        id: EntryId,
        draft: RaceDraft,
    ) -> Result<Vec<FieldWarning>, StoreError> {
        let processed = self.processor.process(draft).await;
        self.store
            .update(id, processed.record)
            .await
            .inspect_err(|e| error!(%id, error = %e, "failed to update entry"))?;

        info!(%id, warnings = processed.warnings.len(), "race entry updated");
        Ok(processed.warnings)
    }

    pub async fn delete_entry(&self, id: EntryId) -> Result<(), StoreError> {
        self.store
            .delete(id)
            .await
            .inspect_err(|e| error!(%id, error = %e, "failed to delete entry"))?;
        info!(%id, "race entry deleted");
        Ok(())
    }

    pub async fn get_entry(&self, id: EntryId) -> Result<RaceEntry, StoreError> {
        self.store.get(id).await
    }

    /// All entries, newest race first.
    pub async fn list_entries(&self) -> Result<Vec<RaceSummary>, StoreError> {
        self.store
            .list_by_date_desc()
            .await
            .inspect_err(|e| error!(error = %e, "failed to load entries"))
    }
}

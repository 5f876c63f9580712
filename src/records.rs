use uuid::Uuid;

use crate::{
    database::RecordStore,
    models::{CustomerRecord, RecordFilter, RecordOrder, RecordPatch},
    BranchDeskError, StoreError, ValidationError,
};

#[tracing::instrument(skip(store), fields(service = "records"))]
pub async fn list_records(
    store: &dyn RecordStore,
    filter: &RecordFilter,
    order: RecordOrder,
) -> Result<Vec<CustomerRecord>, StoreError> {
    store.list(filter, order).await
}

#[tracing::instrument(skip(store), fields(service = "records"))]
pub async fn find_record(store: &dyn RecordStore, id: Uuid) -> Result<CustomerRecord, StoreError> {
    store.find_by_id(id).await
}

/// Applies an edit and returns the record as it now stands
#[tracing::instrument(skip(store, patch), fields(service = "records"))]
pub async fn update_record(
    store: &dyn RecordStore,
    id: Uuid,
    patch: RecordPatch,
) -> Result<CustomerRecord, BranchDeskError> {
    let patch = patch.validate()?;
    if patch.is_empty() {
        return Err(ValidationError::Malformed {
            field: "patch",
            reason: "no fields to update".to_owned(),
        }
        .into());
    }
    store.update(id, &patch).await?;
    Ok(store.find_by_id(id).await?)
}

/// A delete that hasn't been confirmed yet. The store can only be reached
/// through `confirm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeletion {
    id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedDeletion {
    id: Uuid,
}

impl PendingDeletion {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn confirm(self) -> ConfirmedDeletion {
        ConfirmedDeletion { id: self.id }
    }

    /// `None` when the caller didn't confirm
    pub fn confirm_if(self, confirmed: bool) -> Option<ConfirmedDeletion> {
        confirmed.then(|| self.confirm())
    }
}

impl ConfirmedDeletion {
    #[tracing::instrument(skip(store), fields(service = "records"))]
    pub async fn execute(self, store: &dyn RecordStore) -> Result<Uuid, StoreError> {
        store.delete(self.id).await?;
        tracing::info!(id = %self.id, "customer record deleted");
        Ok(self.id)
    }
}

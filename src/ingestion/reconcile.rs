use async_graphql::SimpleObject;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::{
    database::RecordStore,
    documents::{DocumentInventory, StoredDocument},
    models::{RecordFilter, RecordOrder},
    BranchDeskError,
};

/// Stored documents that no record references and that are older than
/// `grace`. Younger files may belong to a submission that is still in
/// flight and are never reported.
#[tracing::instrument(skip(inventory, records), fields(service = "reconcile"))]
pub async fn find_orphaned_documents(
    inventory: &dyn DocumentInventory,
    records: &dyn RecordStore,
    grace: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<StoredDocument>, BranchDeskError> {
    // Read storage before the records, a document uploaded in between then
    // shows up as referenced rather than orphaned
    let stored = inventory.stored_documents().await.map_err(|e| {
        BranchDeskError::ServerError(format!("could not list stored documents: {}", e))
    })?;
    let all_records = records
        .list(&RecordFilter::default(), RecordOrder::default())
        .await?;
    let referenced: HashSet<&str> = all_records
        .iter()
        .flat_map(|record| record.document_refs())
        .collect();

    let cutoff = now - grace;
    Ok(stored
        .into_iter()
        .filter(|document| !referenced.contains(document.path.as_str()))
        .filter(|document| document.modified < cutoff)
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, SimpleObject)]
pub struct ReclaimReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Deletes the orphans `find_orphaned_documents` reports. A failure to
/// remove one document doesn't stop the others.
#[tracing::instrument(skip(inventory, records), fields(service = "reconcile"))]
pub async fn reclaim_orphaned_documents(
    inventory: &dyn DocumentInventory,
    records: &dyn RecordStore,
    grace: Duration,
    now: DateTime<Utc>,
) -> Result<ReclaimReport, BranchDeskError> {
    let orphans = find_orphaned_documents(inventory, records, grace, now).await?;

    let mut report = ReclaimReport::default();
    for orphan in orphans {
        match inventory.remove(&orphan.path).await {
            Ok(()) => report.removed.push(orphan.path),
            Err(e) => {
                warn!(err = ?e, path = %orphan.path, "could not remove orphaned document");
                report.failed.push(orphan.path);
            }
        }
    }
    info!(
        removed = report.removed.len(),
        failed = report.failed.len(),
        "orphaned documents reclaimed"
    );
    Ok(report)
}

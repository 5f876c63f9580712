use futures::future::join_all;
use std::{collections::HashSet, sync::Arc};
use strum::IntoEnumIterator;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    database::RecordStore,
    documents::{DocumentUploadService, UploadConstraints},
    models::{
        Attachment, DocumentRefs, DocumentType, NewCustomerRecord, RecordFields, UploadResult,
        ValidatedFields,
    },
    IngestionError, ValidationError,
};

/// Everything a record-entry surface hands over for one new record
#[derive(Debug, Clone, Default)]
pub struct RecordSubmission {
    pub fields: RecordFields,
    pub documents: Vec<Attachment>,
    /// Generated by the client once per form submission, reused on retry
    pub idempotency_key: Option<Uuid>,
}

/// Turns a submission into a persisted record.
///
/// A record only ever exists with all of its documents durably stored. If an
/// upload fails no record is written and documents that did make it into
/// storage are left behind as orphans. They're logged here and reclaimed
/// later by `reclaim_orphaned_documents`.
pub struct IngestionPipeline {
    uploads: Arc<dyn DocumentUploadService>,
    records: Arc<dyn RecordStore>,
    constraints: UploadConstraints,
}

impl IngestionPipeline {
    pub fn new(
        uploads: Arc<dyn DocumentUploadService>,
        records: Arc<dyn RecordStore>,
        constraints: UploadConstraints,
    ) -> Self {
        Self {
            uploads,
            records,
            constraints,
        }
    }

    #[tracing::instrument(
        name = "Submit customer record",
        skip(self, submission),
        fields(
            service = "ingestion",
            documents = submission.documents.len(),
            idempotency_key = ?submission.idempotency_key
        )
    )]
    pub async fn submit(&self, submission: RecordSubmission) -> Result<Uuid, IngestionError> {
        let RecordSubmission {
            fields,
            documents,
            idempotency_key,
        } = submission;

        let document_types: Vec<DocumentType> =
            documents.iter().map(|attachment| attachment.document_type).collect();
        let fields = validate_submission(&fields, &document_types)?;

        if let Some(key) = idempotency_key {
            if let Some(id) = self.records.find_by_idempotency_key(key).await? {
                info!(%id, "submission was already recorded");
                return Ok(id);
            }
        }

        for attachment in &documents {
            self.constraints
                .check(attachment)
                .map_err(|source| IngestionError::UploadFailed {
                    document_type: attachment.document_type,
                    source,
                })?;
        }

        let results = self.upload_all(&documents).await;

        let mut refs = DocumentRefs::default();
        let mut failures = Vec::new();
        for UploadResult {
            document_type,
            outcome,
        } in results
        {
            match outcome {
                Ok(path) => refs.set(document_type, path),
                Err(source) => failures.push((document_type, source)),
            }
        }

        let mut failures = failures.into_iter();
        if let Some((document_type, source)) = failures.next() {
            for (other_type, other) in failures {
                warn!(document_type = %other_type, err = ?other, "additional upload failure");
            }
            log_orphans(&refs, "an upload failed");
            return Err(IngestionError::UploadFailed {
                document_type,
                source,
            });
        }

        let record = NewCustomerRecord::new(fields, refs.clone(), idempotency_key);
        let new_id = record.id;
        match self.records.insert(record).await {
            Ok(id) if id == new_id => {
                info!(%id, "customer record created");
                Ok(id)
            }
            Ok(id) => {
                // A concurrent retry with the same key won the insert
                log_orphans(&refs, "the submission was recorded concurrently");
                Ok(id)
            }
            Err(e) => {
                log_orphans(&refs, "the record could not be saved");
                Err(e.into())
            }
        }
    }

    /// Starts every upload before awaiting any of them and waits for all of
    /// them to settle, so a failure never leaves an upload running unobserved.
    /// Results come back in submission order.
    async fn upload_all(&self, documents: &[Attachment]) -> Vec<UploadResult> {
        join_all(documents.iter().map(|attachment| async move {
            UploadResult {
                document_type: attachment.document_type,
                outcome: self.uploads.upload(attachment).await,
            }
        }))
        .await
    }
}

/// The checks a submission has to pass before any of its documents are
/// read or uploaded: every required field present, at most one document of
/// each type
pub fn validate_submission(
    fields: &RecordFields,
    document_types: &[DocumentType],
) -> Result<ValidatedFields, ValidationError> {
    let fields = fields.clone().validate()?;
    let mut seen = HashSet::new();
    for document_type in document_types {
        if !seen.insert(*document_type) {
            return Err(ValidationError::DuplicateDocument(*document_type));
        }
    }
    Ok(fields)
}

fn log_orphans(refs: &DocumentRefs, reason: &str) {
    for document_type in DocumentType::iter() {
        if let Some(path) = refs.get(document_type) {
            warn!(%document_type, path, reason, "orphaned document left in storage");
        }
    }
}

mod pipeline;
mod reconcile;

pub use pipeline::{validate_submission, IngestionPipeline, RecordSubmission};
pub use reconcile::{find_orphaned_documents, reclaim_orphaned_documents, ReclaimReport};

use async_graphql::SimpleObject;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use strum::IntoEnumIterator;
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;
use uuid::Uuid;

use crate::{
    documents::{extension_for, UploadConstraints},
    models::{Attachment, DocumentType},
    UploadError,
};

const PARTIAL_SUFFIX: &str = ".part";

/// Stores document files and hands back the reference a record keeps.
///
/// `upload` only returns `Ok` once the complete file is durable under the
/// returned reference. An existing file is never overwritten.
#[async_trait]
pub trait DocumentUploadService: Send + Sync {
    async fn upload(&self, attachment: &Attachment) -> Result<String, UploadError>;
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct StoredDocument {
    pub path: String,
    pub modified: DateTime<Utc>,
}

/// Enumerates what is actually in document storage, independent of which
/// records point at it
#[async_trait]
pub trait DocumentInventory: Send + Sync {
    async fn stored_documents(&self) -> Result<Vec<StoredDocument>, UploadError>;
    async fn read(&self, path: &str) -> Result<Vec<u8>, UploadError>;
    async fn remove(&self, path: &str) -> Result<(), UploadError>;
}

/// Documents kept on local disk as `{root}/{documentType}/{uuid}.{ext}`
#[derive(Debug, Clone)]
pub struct FileSystemDocumentStore {
    root: PathBuf,
    constraints: UploadConstraints,
}

impl FileSystemDocumentStore {
    pub fn new(root: impl Into<PathBuf>, constraints: UploadConstraints) -> Self {
        Self {
            root: root.into(),
            constraints,
        }
    }

    /// Maps a stored reference back onto disk, refusing anything that could
    /// escape the document root
    fn resolve(&self, path: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(path);
        let components: Vec<Component<'_>> = relative.components().collect();
        let valid = match components.as_slice() {
            [Component::Normal(dir), Component::Normal(file)] => {
                let is_document_dir = dir
                    .to_str()
                    .map(|dir| DocumentType::iter().any(|t| t.to_string() == dir))
                    .unwrap_or(false);
                is_document_dir && !file.to_string_lossy().starts_with('.')
            }
            _ => false,
        };
        if !valid {
            return Err(UploadError::RejectedFormat(format!(
                "{} is not a document reference",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn transport(e: std::io::Error) -> UploadError {
    UploadError::TransportFailure(e.to_string())
}

async fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn sync_dir(path: &Path) -> std::io::Result<()> {
    fs::File::open(path).await?.sync_all().await
}

#[async_trait]
impl DocumentUploadService for FileSystemDocumentStore {
    #[tracing::instrument(skip(self, attachment), fields(document_type = %attachment.document_type, size = attachment.size()))]
    async fn upload(&self, attachment: &Attachment) -> Result<String, UploadError> {
        self.constraints.check(attachment)?;

        let directory = attachment.document_type.to_string();
        let file_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            extension_for(attachment.content_type.as_deref())
        );
        let dir_path = self.root.join(&directory);
        fs::create_dir_all(&dir_path).await.map_err(transport)?;

        let final_path = dir_path.join(&file_name);
        let partial_path = dir_path.join(format!("{}{}", file_name, PARTIAL_SUFFIX));

        if let Err(e) = write_and_sync(&partial_path, &attachment.bytes).await {
            let _ = fs::remove_file(&partial_path).await;
            return Err(transport(e));
        }

        // Linking fails if the target exists, unlike rename
        let linked = fs::hard_link(&partial_path, &final_path).await;
        if let Err(e) = fs::remove_file(&partial_path).await {
            warn!(err = ?e, path = %partial_path.display(), "could not remove partial upload");
        }
        linked.map_err(transport)?;
        sync_dir(&dir_path).await.map_err(transport)?;

        Ok(format!("{}/{}", directory, file_name))
    }
}

#[async_trait]
impl DocumentInventory for FileSystemDocumentStore {
    #[tracing::instrument(skip(self))]
    async fn stored_documents(&self) -> Result<Vec<StoredDocument>, UploadError> {
        let mut documents = Vec::new();
        for document_type in DocumentType::iter() {
            let directory = document_type.to_string();
            let mut entries = match fs::read_dir(self.root.join(&directory)).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(transport(e)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(transport)? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') || name.ends_with(PARTIAL_SUFFIX) {
                    continue;
                }
                let metadata = entry.metadata().await.map_err(transport)?;
                if !metadata.is_file() {
                    continue;
                }
                let modified = metadata.modified().map_err(transport)?;
                documents.push(StoredDocument {
                    path: format!("{}/{}", directory, name),
                    modified: modified.into(),
                });
            }
        }
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }

    #[tracing::instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<Vec<u8>, UploadError> {
        fs::read(self.resolve(path)?).await.map_err(transport)
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, path: &str) -> Result<(), UploadError> {
        fs::remove_file(self.resolve(path)?)
            .await
            .map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_matches, assert_ok};
    use tempfile::TempDir;

    fn store(root: &TempDir) -> FileSystemDocumentStore {
        FileSystemDocumentStore::new(
            root.path(),
            UploadConstraints::new(1024, vec!["image/png".to_owned()]),
        )
    }

    #[tokio::test]
    async fn uploads_are_complete_once_acknowledged() {
        let root = tempfile::tempdir().unwrap();
        let store = store(&root);
        let attachment = Attachment::new(DocumentType::Pan, "image/png", vec![42; 300]);

        let path = assert_ok!(store.upload(&attachment).await);
        assert!(path.starts_with("pan/"));
        assert!(path.ends_with(".png"));
        assert_eq!(std::fs::read(root.path().join(&path)).unwrap(), vec![42; 300]);

        let leftovers: Vec<_> = std::fs::read_dir(root.path().join("pan"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn repeated_uploads_never_share_a_reference() {
        let root = tempfile::tempdir().unwrap();
        let store = store(&root);
        let attachment = Attachment::new(DocumentType::Aadhaar, "image/png", vec![1; 8]);

        let first = store.upload(&attachment).await.unwrap();
        let second = store.upload(&attachment).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.stored_documents().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_files_are_never_written() {
        let root = tempfile::tempdir().unwrap();
        let store = store(&root);
        let attachment = Attachment::new(DocumentType::Pan, "application/zip", vec![1; 8]);

        assert_matches!(
            store.upload(&attachment).await,
            Err(UploadError::RejectedFormat(_))
        );
        assert!(store.stored_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inventory_lists_reads_and_removes_documents() {
        let root = tempfile::tempdir().unwrap();
        let store = store(&root);
        let path = store
            .upload(&Attachment::new(DocumentType::DebitCard, "image/png", vec![9; 4]))
            .await
            .unwrap();

        let stored = store.stored_documents().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].path, path);
        assert_eq!(store.read(&path).await.unwrap(), vec![9; 4]);

        assert_ok!(store.remove(&path).await);
        assert!(store.stored_documents().await.unwrap().is_empty());
        assert_err!(store.read(&path).await);
    }

    #[tokio::test]
    async fn references_outside_the_document_root_are_refused() {
        let root = tempfile::tempdir().unwrap();
        let store = store(&root);
        for path in ["../secret.png", "pan/../../x", "/etc/passwd", "other/a.png", "pan/.hidden"] {
            assert_matches!(store.read(path).await, Err(UploadError::RejectedFormat(_)));
        }
    }
}

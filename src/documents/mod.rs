mod constraints;
mod store;

pub use constraints::{content_type_for, extension_for, UploadConstraints};
pub use store::{
    DocumentInventory, DocumentUploadService, FileSystemDocumentStore, StoredDocument,
};

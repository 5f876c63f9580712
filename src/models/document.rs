use async_graphql::Enum;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

use crate::UploadError;

/// Which identity document a given file represents
#[derive(
    Debug, Enum, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DocumentType {
    Pan,
    Aadhaar,
    DebitCard,
}

/// A file attached to a record submission, already read into memory.
#[derive(Clone)]
pub struct Attachment {
    pub document_type: DocumentType,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(document_type: DocumentType, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            document_type,
            file_name: None,
            content_type: Some(content_type.to_owned()),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("document_type", &self.document_type)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The settled outcome of a single upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub document_type: DocumentType,
    pub outcome: Result<String, UploadError>,
}

/// Storage references for the documents that made it into a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRefs {
    pub pan: Option<String>,
    pub aadhaar: Option<String>,
    pub debit_card: Option<String>,
}

impl DocumentRefs {
    pub fn set(&mut self, document_type: DocumentType, path: String) {
        let slot = match document_type {
            DocumentType::Pan => &mut self.pan,
            DocumentType::Aadhaar => &mut self.aadhaar,
            DocumentType::DebitCard => &mut self.debit_card,
        };
        *slot = Some(path);
    }

    pub fn get(&self, document_type: DocumentType) -> Option<&str> {
        match document_type {
            DocumentType::Pan => self.pan.as_deref(),
            DocumentType::Aadhaar => self.aadhaar.as_deref(),
            DocumentType::DebitCard => self.debit_card.as_deref(),
        }
    }
}

use crate::{configuration::UploadSettings, models::Attachment, UploadError};

/// Size and type limits applied to every attachment before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConstraints {
    max_size_bytes: u64,
    allowed_mime_types: Vec<String>,
}

impl UploadConstraints {
    pub fn new(max_size_bytes: u64, allowed_mime_types: Vec<String>) -> Self {
        Self {
            max_size_bytes,
            allowed_mime_types: allowed_mime_types
                .iter()
                .map(|mime| essence(mime))
                .collect(),
        }
    }

    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self::new(settings.max_size_bytes, settings.allowed_mime_types.clone())
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn check(&self, attachment: &Attachment) -> Result<(), UploadError> {
        if attachment.bytes.is_empty() {
            return Err(UploadError::RejectedFormat(format!(
                "the {} document is empty",
                attachment.document_type
            )));
        }
        self.check_size(attachment.size() as u64)?;

        let content_type = attachment
            .content_type
            .as_deref()
            .map(essence)
            .ok_or_else(|| {
                UploadError::RejectedFormat(format!(
                    "the {} document has no content type",
                    attachment.document_type
                ))
            })?;
        if !self.allowed_mime_types.contains(&content_type) {
            return Err(UploadError::RejectedFormat(format!(
                "{} files are not accepted",
                content_type
            )));
        }
        Ok(())
    }

    /// Lets callers refuse an oversized file before reading it into memory
    pub fn check_size(&self, size: u64) -> Result<(), UploadError> {
        if size > self.max_size_bytes {
            return Err(UploadError::RejectedFormat(format!(
                "{} bytes exceeds the {} byte limit",
                size, self.max_size_bytes
            )));
        }
        Ok(())
    }
}

/// `Image/PNG; charset=binary` -> `image/png`
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// File extension used for the stored blob
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.map(essence).as_deref() {
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        Some("application/pdf") => "pdf",
        _ => "bin",
    }
}

/// Inverse of `extension_for`, used when serving a stored blob back
pub fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

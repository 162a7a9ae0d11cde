//! Resume and certificate files written to local disk and served back
//! under `/uploads`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::Multipart;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::AppError;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Resume,
    Certificate,
}

impl UploadKind {
    /// Multipart field the file is expected under.
    pub fn field(&self) -> &'static str {
        match self {
            UploadKind::Resume => "resume",
            UploadKind::Certificate => "certificate",
        }
    }

    fn subdir(&self) -> &'static str {
        match self {
            UploadKind::Resume => "resumes",
            UploadKind::Certificate => "certificates",
        }
    }

    /// (extension, content type) pairs accepted for this kind.
    fn accepted(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            UploadKind::Resume => &[(".pdf", "application/pdf")],
            UploadKind::Certificate => &[
                (".pdf", "application/pdf"),
                (".jpg", "image/jpeg"),
                (".jpeg", "image/jpeg"),
                (".png", "image/png"),
            ],
        }
    }

    fn rejection(&self) -> &'static str {
        match self {
            UploadKind::Resume => "Only PDF files are allowed for resumes",
            UploadKind::Certificate => "Only PDF, JPEG or PNG files are allowed for certificates",
        }
    }

    /// Extension to store the file under. Both the file name and the declared
    /// content type (when present) must agree with an accepted pair.
    pub fn extension_for(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<&'static str, AppError> {
        let name = file_name.unwrap_or("").to_ascii_lowercase();

        self.accepted()
            .iter()
            .find(|(ext, mime)| {
                name.ends_with(ext) && content_type.is_none_or(|ct| ct.eq_ignore_ascii_case(mime))
            })
            .map(|(ext, _)| *ext)
            .ok_or_else(|| AppError::validation(self.rejection()))
    }
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    /// Public path saved on the student record.
    pub url: String,
}

/// Pull the single file for `kind` out of the form.
pub async fn read_upload(
    multipart: &mut Multipart,
    kind: UploadKind,
) -> Result<(&'static str, Vec<u8>), AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(kind.field()) {
            continue;
        }

        let ext = kind.extension_for(field.file_name(), field.content_type())?;
        let bytes = field.bytes().await?;

        if bytes.is_empty() {
            break;
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::validation("File too large (max 5 MB)"));
        }
        return Ok((ext, bytes.to_vec()));
    }

    Err(AppError::validation("No file uploaded"))
}

pub async fn store(
    upload_dir: &Path,
    kind: UploadKind,
    ext: &str,
    bytes: &[u8],
) -> anyhow::Result<StoredFile> {
    let dir = upload_dir.join(kind.subdir());
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let name = unique_name(ext);
    let path = dir.join(&name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!(path = %path.display(), size = bytes.len(), "stored upload");
    Ok(StoredFile {
        path,
        url: format!("/uploads/{}/{}", kind.subdir(), name),
    })
}

/// Remove a stored file whose record update failed.
pub async fn discard(file: &StoredFile) {
    if let Err(e) = tokio::fs::remove_file(&file.path).await {
        warn!(error = %e, path = %file.path.display(), "failed to remove orphaned upload");
    }
}

fn unique_name(ext: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{millis}-{suffix}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_accepts_pdf_only() {
        let kind = UploadKind::Resume;
        assert_eq!(kind.extension_for(Some("cv.PDF"), Some("application/pdf")).unwrap(), ".pdf");
        assert_eq!(kind.extension_for(Some("cv.pdf"), None).unwrap(), ".pdf");
        assert!(kind.extension_for(Some("cv.png"), Some("image/png")).is_err());
        assert!(kind.extension_for(Some("cv.pdf"), Some("image/png")).is_err());
        assert!(kind.extension_for(None, Some("application/pdf")).is_err());
    }

    #[test]
    fn test_certificate_accepts_images() {
        let kind = UploadKind::Certificate;
        assert_eq!(kind.extension_for(Some("c.jpg"), Some("image/jpeg")).unwrap(), ".jpg");
        assert_eq!(kind.extension_for(Some("c.jpeg"), Some("image/jpeg")).unwrap(), ".jpeg");
        assert_eq!(kind.extension_for(Some("c.png"), Some("image/png")).unwrap(), ".png");
        assert!(kind.extension_for(Some("c.gif"), Some("image/gif")).is_err());
    }

    #[test]
    fn test_unique_name_shape() {
        let name = unique_name(".pdf");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert!(rest.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_store_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store(dir.path(), UploadKind::Certificate, ".png", b"png-bytes")
            .await
            .unwrap();

        assert!(stored.url.starts_with("/uploads/certificates/"));
        assert!(stored.url.ends_with(".png"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"png-bytes");

        discard(&stored).await;
        assert!(!stored.path.exists());
    }
}

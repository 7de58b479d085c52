//! Upload flow: extract text, then write one complete record.

use chrono::Utc;

use crate::error::{Result, StudyVaultError};
use crate::extract::{self, Extraction};
use crate::vault::{Category, StoredFile, Vault};

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub chapter_id: String,
    pub category: Category,
    pub file_name: String,
    /// Mime type as reported by the caller.
    pub file_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file: StoredFile,
    /// Whether searchable text was lost to a parse failure.
    pub extraction_failed: bool,
}

/// Extraction runs to completion before the record is saved, so a record is
/// never visible half-extracted.
pub async fn upload(vault: &Vault, request: UploadRequest) -> Result<UploadOutcome> {
    if request.chapter_id.trim().is_empty() {
        return Err(StudyVaultError::InvalidInput {
            reason: "upload requires a chapter id".into(),
        });
    }

    let UploadRequest {
        chapter_id,
        category,
        file_name,
        file_type,
        bytes,
    } = request;
    let size_bytes = bytes.len() as u64;

    let mime = file_type.clone();
    let extraction: Extraction =
        tokio::task::spawn_blocking(move || extract::extract(&bytes, &mime)).await?;
    let extraction_failed = extraction.is_failed();

    let file = StoredFile {
        id: uuid::Uuid::new_v4().to_string(),
        chapter_id,
        category,
        file_name,
        file_type,
        upload_date: Utc::now().to_rfc3339(),
        extracted_text: extraction.into_stored_text(),
        size_bytes,
    };
    vault.save(file.clone()).await?;

    tracing::info!(
        target: "studyvault::upload",
        id = %file.id,
        chapter = %file.chapter_id,
        category = %file.category,
        size = file.size_bytes,
        extraction_failed,
        "upload stored"
    );
    Ok(UploadOutcome {
        file,
        extraction_failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{EXTRACTION_FAILED_TEXT, PDF_MIME};

    fn request(bytes: &[u8], mime: &str) -> UploadRequest {
        UploadRequest {
            chapter_id: "BIO_11_03".to_string(),
            category: Category::Notes,
            file_name: "algae.bin".to_string(),
            file_type: mime.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn text_upload_is_searchable() {
        let vault = Vault::open_in_memory().unwrap();
        let outcome = upload(&vault, request(b"Thallophyta lack vascular tissue", "text/plain"))
            .await
            .unwrap();
        assert!(!outcome.extraction_failed);
        assert_eq!(outcome.file.size_bytes, 32);

        let stored = vault.get_by_chapter("BIO_11_03").await.unwrap();
        assert_eq!(stored, vec![outcome.file]);
        assert_eq!(stored[0].extracted_text, "Thallophyta lack vascular tissue");
    }

    #[tokio::test]
    async fn corrupt_pdf_still_uploads() {
        let vault = Vault::open_in_memory().unwrap();
        let outcome = upload(&vault, request(b"%PDF-broken", PDF_MIME)).await.unwrap();
        assert!(outcome.extraction_failed);
        let stored = vault.get(&outcome.file.id).await.unwrap().unwrap();
        assert_eq!(stored.extracted_text, EXTRACTION_FAILED_TEXT);
    }

    #[tokio::test]
    async fn image_upload_has_empty_text() {
        let vault = Vault::open_in_memory().unwrap();
        let outcome = upload(&vault, request(&[0xFF, 0xD8, 0xFF], "image/jpeg"))
            .await
            .unwrap();
        assert_eq!(outcome.file.extracted_text, "");
        assert!(!outcome.extraction_failed);
    }

    #[tokio::test]
    async fn missing_chapter_is_rejected() {
        let vault = Vault::open_in_memory().unwrap();
        let mut req = request(b"x", "text/plain");
        req.chapter_id = " ".to_string();
        let err = upload(&vault, req).await.unwrap_err();
        assert!(matches!(err, StudyVaultError::InvalidInput { .. }));
        assert_eq!(vault.count().await.unwrap(), 0);
    }
}

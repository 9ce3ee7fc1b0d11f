//! Resume storage: PDF checks, S3 upload, text extraction and presigned reads.

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
/// Lifetime of a presigned resume download URL.
pub const RESUME_URL_TTL_SECS: u64 = 15 * 60;
/// Cap on extracted text kept for matching.
const MAX_RESUME_TEXT_CHARS: usize = 50_000;

/// Rejects empty, oversized and non-PDF uploads.
pub fn check_pdf(file_name: Option<&str>, data: &[u8]) -> Result<(), AppError> {
    if data.is_empty() {
        return Err(AppError::Validation("Resume file is empty".to_string()));
    }
    if data.len() > MAX_RESUME_BYTES {
        return Err(AppError::Validation(format!(
            "Resume must be at most {} MiB",
            MAX_RESUME_BYTES / (1024 * 1024)
        )));
    }
    let named_pdf = file_name.map_or(true, |n| n.to_ascii_lowercase().ends_with(".pdf"));
    if !named_pdf || !data.starts_with(b"%PDF-") {
        return Err(AppError::Validation("Only PDF files are allowed".to_string()));
    }
    Ok(())
}

pub fn resume_key(user_id: Uuid) -> String {
    format!("resumes/{}/{}.pdf", user_id, Uuid::new_v4())
}

pub async fn upload_resume(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    data: Bytes,
) -> Result<(), AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(data))
        .content_type("application/pdf")
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

    info!("Uploaded resume to s3://{bucket}/{key}");
    Ok(())
}

/// Plain text of the PDF, or `None` when nothing usable could be extracted.
/// Extraction is CPU-bound and runs on the blocking pool.
pub async fn extract_resume_text(data: Bytes) -> Option<String> {
    let result =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data)).await;

    match result {
        Ok(Ok(text)) => tidy_text(&text),
        Ok(Err(e)) => {
            warn!("Resume text extraction failed: {e}");
            None
        }
        Err(e) => {
            warn!("Resume extraction task failed: {e}");
            None
        }
    }
}

fn tidy_text(raw: &str) -> Option<String> {
    let text: String = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_RESUME_TEXT_CHARS)
        .collect();
    (!text.is_empty()).then_some(text)
}

pub async fn presign_resume(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
) -> Result<String, AppError> {
    let presigning = PresigningConfig::expires_in(Duration::from_secs(RESUME_URL_TTL_SECS))
        .map_err(|e| AppError::S3(format!("invalid presigning config: {e}")))?;

    let request = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(presigning)
        .await
        .map_err(|e| AppError::S3(format!("presigning {key} failed: {e}")))?;

    Ok(request.uri().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pdf_accepts_pdf() {
        assert!(check_pdf(Some("Resume.PDF"), b"%PDF-1.7 ...").is_ok());
        assert!(check_pdf(None, b"%PDF-1.4").is_ok());
    }

    #[test]
    fn test_check_pdf_rejects_other_files() {
        assert!(check_pdf(Some("resume.docx"), b"%PDF-1.7").is_err());
        assert!(check_pdf(Some("resume.pdf"), b"PK\x03\x04").is_err());
        assert!(check_pdf(Some("resume.pdf"), b"").is_err());
    }

    #[test]
    fn test_check_pdf_rejects_oversized() {
        let mut data = b"%PDF-1.7".to_vec();
        data.resize(MAX_RESUME_BYTES + 1, b' ');
        assert!(matches!(
            check_pdf(Some("big.pdf"), &data),
            Err(AppError::Validation(msg)) if msg.contains("5 MiB")
        ));
    }

    #[test]
    fn test_resume_key_layout() {
        let user = Uuid::new_v4();
        let key = resume_key(user);
        assert!(key.starts_with(&format!("resumes/{user}/")));
        assert!(key.ends_with(".pdf"));
        assert_ne!(key, resume_key(user));
    }

    #[test]
    fn test_tidy_text() {
        assert_eq!(
            tidy_text("  Jane   Doe\n\nRust\tengineer "),
            Some("Jane Doe Rust engineer".to_string())
        );
        assert_eq!(tidy_text(" \n\t "), None);
    }
}

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use meetnotes_shared::{MeetNotesError, Result};

use super::{Extraction, PdfExtractor};

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; scanned pages come back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Extract from an in-memory PDF (also used for PDFs served over HTTP).
    pub async fn extract_bytes(bytes: Vec<u8>) -> Result<Extraction> {
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| MeetNotesError::Ingestion(format!("PDF extraction task failed: {e}")))?
        .map_err(|e| MeetNotesError::Ingestion(format!("PDF could not be parsed: {e}")))?;

        assemble_pages(pages)
    }
}

#[async_trait]
impl PdfExtractor for PdfTextExtractor {
    #[instrument(skip_all, fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<Extraction> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            MeetNotesError::Ingestion(format!("cannot read {}: {e}", path.display()))
        })?;

        debug!(bytes = bytes.len(), "read PDF");
        Self::extract_bytes(bytes).await
    }
}

/// Join per-page text. Pages without text make the extraction lossy; a
/// document with no text at all is an error.
pub fn assemble_pages(pages: Vec<String>) -> Result<Extraction> {
    let total = pages.len();
    let texts: Vec<String> = pages
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if texts.is_empty() {
        return Err(MeetNotesError::Ingestion(
            "PDF has no extractable text (scanned or image-only?)".into(),
        ));
    }

    let empty = total - texts.len();
    let text = texts.join("\n\n");

    if empty > 0 {
        Ok(Extraction::lossy(
            text,
            format!("{empty} of {total} pages had no extractable text"),
        ))
    } else {
        Ok(Extraction::complete(text))
    }
}

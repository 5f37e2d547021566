//! Source adapters: one capability trait per input kind.
//!
//! Adapters only recover text. Deciding whether a source is `ok`, `degraded`
//! or `failed` belongs to the normalizer, which turns every adapter error
//! into a failed record.

mod pdf;
mod web;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use meetnotes_shared::Result;

use crate::speech::Transcriber;

pub use pdf::{PdfTextExtractor, assemble_pages};
pub use web::HttpFetcher;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Text recovered by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    /// Set when only part of the source could be read; describes what was lost.
    pub lossy: Option<String>,
}

impl Extraction {
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lossy: None,
        }
    }

    pub fn lossy(text: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lossy: Some(note.into()),
        }
    }
}

/// Fetches one exact URL and returns its readable text.
#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Extraction>;
}

/// Extracts the text layer of a local PDF.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<Extraction>;
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// The adapters available to one normalizer run.
///
/// Cheap to clone; each concurrent ingestion task holds its own copy.
#[derive(Clone)]
pub struct Adapters {
    pub web: Arc<dyn WebFetcher>,
    pub pdf: Arc<dyn PdfExtractor>,
    /// `None` when no speech service is configured; audio sources then fail.
    pub transcriber: Option<Arc<dyn Transcriber>>,
}

impl Adapters {
    pub fn new(web: Arc<dyn WebFetcher>, pdf: Arc<dyn PdfExtractor>) -> Self {
        Self {
            web,
            pdf,
            transcriber: None,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }
}

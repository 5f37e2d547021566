//! Source normalizer: raw inputs in, [`SourceRecord`]s out.
//!
//! Normalization never fails as a whole. Whatever goes wrong with one input
//! is recorded on that input's record as a `failed` status with a reason.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use meetnotes_markdown::sanitize;
use meetnotes_shared::{Provenance, SourceRecord};

use crate::adapters::{Adapters, Extraction};

/// Failure reason recorded when speech yields no text.
pub const EMPTY_TRANSCRIPT: &str = "empty transcript";

// ---------------------------------------------------------------------------
// SourceInput
// ---------------------------------------------------------------------------

/// One raw input as supplied by a user or caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    /// Pasted text. `label` names it in the manifest (`text #1`, `message`).
    Text { label: String, body: String },
    /// An exact URL to fetch.
    Url(String),
    /// A local PDF file.
    Pdf(PathBuf),
    /// A recorded audio file, transcribed before use.
    Audio(PathBuf),
    /// Text already transcribed from speech.
    Transcript { label: String, body: String },
}

impl SourceInput {
    pub fn text(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Text {
            label: label.into(),
            body: body.into(),
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Self::Text { .. } => Provenance::Text,
            Self::Url(_) => Provenance::Url,
            Self::Pdf(_) => Provenance::Pdf,
            Self::Audio(_) | Self::Transcript { .. } => Provenance::Transcript,
        }
    }

    /// Label recorded as the record's origin.
    pub fn origin(&self) -> String {
        match self {
            Self::Text { label, .. } | Self::Transcript { label, .. } => label.clone(),
            Self::Url(url) => url.clone(),
            Self::Pdf(path) | Self::Audio(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for SourceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.provenance(), self.origin())
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one input into a record. Never returns an error.
///
/// Empty or whitespace-only text fails without touching any adapter.
#[instrument(skip_all, fields(source = %input))]
pub async fn normalize(input: SourceInput, adapters: &Adapters) -> SourceRecord {
    let provenance = input.provenance();
    let origin = input.origin();

    let record = match input {
        SourceInput::Text { body, .. } => from_text(provenance, origin, &body, "empty or whitespace-only text"),
        SourceInput::Transcript { body, .. } => from_text(provenance, origin, &body, EMPTY_TRANSCRIPT),
        SourceInput::Url(url) => {
            let result = adapters.web.fetch(&url).await;
            from_extraction(provenance, origin, result)
        }
        SourceInput::Pdf(path) => {
            let result = adapters.pdf.extract(&path).await;
            from_extraction(provenance, origin, result)
        }
        SourceInput::Audio(path) => match &adapters.transcriber {
            None => SourceRecord::failed(provenance, origin, "no speech-to-text service configured"),
            Some(stt) => match stt.transcribe(&path).await {
                Ok(text) => from_text(provenance, origin, &text, EMPTY_TRANSCRIPT),
                Err(e) => SourceRecord::failed(provenance, origin, e.to_string()),
            },
        },
    };

    match record.status() {
        meetnotes_shared::IngestionStatus::Failed => warn!(
            reason = record.reason().unwrap_or_default(),
            "source failed"
        ),
        status => debug!(%status, chars = record.content().len(), "source normalized"),
    }

    record
}

/// Normalize all inputs concurrently. Output order always matches input order,
/// however long each adapter takes.
#[instrument(skip_all, fields(count = inputs.len()))]
pub async fn normalize_all(inputs: Vec<SourceInput>, adapters: &Adapters) -> Vec<SourceRecord> {
    let mut handles = Vec::with_capacity(inputs.len());

    for input in inputs {
        let provenance = input.provenance();
        let origin = input.origin();
        let adapters = adapters.clone();
        let handle = tokio::spawn(async move { normalize(input, &adapters).await });
        handles.push((provenance, origin, handle));
    }

    // Await in spawn order so records keep arrival order.
    let mut records = Vec::with_capacity(handles.len());
    for (provenance, origin, handle) in handles {
        let record = match handle.await {
            Ok(record) => record,
            Err(e) => SourceRecord::failed(provenance, origin, format!("ingestion task failed: {e}")),
        };
        records.push(record);
    }

    let failed = records.iter().filter(|r| !r.qualifies()).count();
    info!(total = records.len(), failed, "sources normalized");

    records
}

fn from_text(provenance: Provenance, origin: String, raw: &str, empty_reason: &str) -> SourceRecord {
    let content = sanitize(raw);
    if content.is_empty() {
        SourceRecord::failed(provenance, origin, empty_reason)
    } else {
        SourceRecord::ok(provenance, origin, content)
    }
}

fn from_extraction(
    provenance: Provenance,
    origin: String,
    result: meetnotes_shared::Result<Extraction>,
) -> SourceRecord {
    match result {
        Err(e) => SourceRecord::failed(provenance, origin, e.to_string()),
        Ok(extraction) => {
            let content = sanitize(&extraction.text);
            match (content.is_empty(), extraction.lossy) {
                (true, _) => SourceRecord::failed(provenance, origin, "no readable text recovered"),
                (false, Some(note)) => SourceRecord::degraded(provenance, origin, content, note),
                (false, None) => SourceRecord::ok(provenance, origin, content),
            }
        }
    }
}

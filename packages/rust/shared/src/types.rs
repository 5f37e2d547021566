//! Core domain types for source ingestion and aggregation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MeetNotesError, Result};

// ---------------------------------------------------------------------------
// Provenance / status
// ---------------------------------------------------------------------------

/// Where a source's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Text,
    Url,
    Pdf,
    Transcript,
    History,
}

impl Provenance {
    /// Stable lowercase tag used in corpus demarcation and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
            Self::Pdf => "pdf",
            Self::Transcript => "transcript",
            Self::History => "history",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of ingesting one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    /// Content recovered in full.
    Ok,
    /// Some content recovered, but the adapter reported a lossy extraction.
    Degraded,
    /// Nothing usable was recovered.
    Failed,
}

impl IngestionStatus {
    /// `ok` and `degraded` sources count toward a mode's minimum; `failed` never does.
    pub fn qualifies(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesis mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Exactly one qualifying source.
    #[default]
    Single,
    /// Two or more qualifying sources rolled up into one summary.
    Weekly,
}

impl Mode {
    /// Minimum number of qualifying sources.
    pub fn min_sources(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Weekly => 2,
        }
    }

    /// Upper bound on qualifying sources, if any.
    pub fn max_sources(&self) -> Option<usize> {
        match self {
            Self::Single => Some(1),
            Self::Weekly => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Weekly => f.write_str("weekly"),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceRecord
// ---------------------------------------------------------------------------

/// One normalized input.
///
/// Immutable once built. The constructors enforce that a `failed` record
/// carries no content, so it can never leak text into a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    provenance: Provenance,
    origin: String,
    content: String,
    status: IngestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    ingested_at: DateTime<Utc>,
}

impl SourceRecord {
    /// A fully ingested source.
    pub fn ok(provenance: Provenance, origin: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            provenance,
            origin: origin.into(),
            content: content.into(),
            status: IngestionStatus::Ok,
            reason: None,
            ingested_at: Utc::now(),
        }
    }

    /// A partially ingested source: usable content plus the adapter's loss note.
    pub fn degraded(
        provenance: Provenance,
        origin: impl Into<String>,
        content: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            provenance,
            origin: origin.into(),
            content: content.into(),
            status: IngestionStatus::Degraded,
            reason: Some(reason.into()),
            ingested_at: Utc::now(),
        }
    }

    /// A source that produced nothing usable.
    pub fn failed(provenance: Provenance, origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provenance,
            origin: origin.into(),
            content: String::new(),
            status: IngestionStatus::Failed,
            reason: Some(reason.into()),
            ingested_at: Utc::now(),
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Human-readable label of the input (URL, file path, `text #2`, ...).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> IngestionStatus {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    pub fn qualifies(&self) -> bool {
        self.status.qualifies()
    }
}

/// Why a source was left out of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub provenance: Provenance,
    pub origin: String,
    pub reason: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.provenance, self.origin, self.reason)
    }
}

// ---------------------------------------------------------------------------
// IngestionManifest
// ---------------------------------------------------------------------------

/// One line of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Zero-based arrival position.
    pub index: usize,
    pub provenance: Provenance,
    pub origin: String,
    pub status: IngestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Status of every input of a request, in arrival order, including failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionManifest {
    entries: Vec<ManifestEntry>,
}

impl IngestionManifest {
    /// Build a manifest from records in arrival order.
    pub fn from_records(records: &[SourceRecord]) -> Self {
        let entries = records
            .iter()
            .enumerate()
            .map(|(index, r)| ManifestEntry {
                index,
                provenance: r.provenance(),
                origin: r.origin().to_string(),
                status: r.status(),
                reason: r.reason().map(String::from),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `ok` + `degraded` entries.
    pub fn qualifying_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status.qualifies()).count()
    }

    pub fn count(&self, status: IngestionStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Failed entries as rejections, in arrival order.
    pub fn rejections(&self) -> Vec<Rejection> {
        self.entries
            .iter()
            .filter(|e| !e.status.qualifies())
            .map(|e| Rejection {
                provenance: e.provenance,
                origin: e.origin.clone(),
                reason: e
                    .reason
                    .clone()
                    .unwrap_or_else(|| "no usable content".to_string()),
            })
            .collect()
    }
}

impl fmt::Display for IngestionManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(
                f,
                "[{}] {:<10} {:<8} {}",
                entry.index + 1,
                entry.provenance.as_str(),
                entry.status.as_str(),
                entry.origin
            )?;
            if let Some(reason) = &entry.reason {
                write!(f, " ({reason})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// Ordered, immutable sequence of usable sources for one synthesis request.
///
/// Position is priority: records are never reordered after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corpus {
    records: Vec<SourceRecord>,
}

impl Corpus {
    /// Build a corpus. Rejects an empty sequence and any `failed` record.
    pub fn new(records: Vec<SourceRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(MeetNotesError::validation("corpus must contain at least one source"));
        }
        if let Some(bad) = records.iter().find(|r| !r.qualifies()) {
            return Err(MeetNotesError::validation(format!(
                "failed source {} {} cannot enter the corpus",
                bad.provenance(),
                bad.origin()
            )));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records from the current turn (everything not tagged `history`).
    pub fn current_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.provenance() != Provenance::History)
            .count()
    }

    pub fn history_count(&self) -> usize {
        self.len() - self.current_count()
    }

    /// Concatenate all records, each demarcated by its position and provenance tag.
    pub fn render(&self) -> String {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "--- SOURCE {} [{}: {}] ---\n{}",
                    i + 1,
                    r.provenance(),
                    r.origin(),
                    r.content()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Consume the corpus, returning its records in order.
    pub fn into_records(self) -> Vec<SourceRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_record_carries_no_content() {
        let r = SourceRecord::failed(Provenance::Pdf, "notes.pdf", "file not found");
        assert_eq!(r.content(), "");
        assert_eq!(r.status(), IngestionStatus::Failed);
        assert!(!r.qualifies());
        assert_eq!(r.reason(), Some("file not found"));
    }

    #[test]
    fn degraded_qualifies() {
        let r = SourceRecord::degraded(Provenance::Pdf, "notes.pdf", "page one", "1 of 2 pages empty");
        assert!(r.qualifies());
    }

    #[test]
    fn corpus_rejects_empty_and_failed() {
        assert!(Corpus::new(vec![]).is_err());
        let err = Corpus::new(vec![
            SourceRecord::ok(Provenance::Text, "text #1", "hello"),
            SourceRecord::failed(Provenance::Url, "https://x.test", "HTTP 500"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("https://x.test"));
    }

    #[test]
    fn corpus_render_demarcates_in_order() {
        let corpus = Corpus::new(vec![
            SourceRecord::ok(Provenance::Text, "text #1", "alpha"),
            SourceRecord::ok(Provenance::Url, "https://b.test", "beta"),
        ])
        .unwrap();
        let rendered = corpus.render();
        let a = rendered.find("--- SOURCE 1 [text: text #1] ---\nalpha").unwrap();
        let b = rendered.find("--- SOURCE 2 [url: https://b.test] ---\nbeta").unwrap();
        assert!(a < b);
    }

    #[test]
    fn manifest_counts_and_rejections() {
        let records = vec![
            SourceRecord::ok(Provenance::Text, "text #1", "a"),
            SourceRecord::degraded(Provenance::Pdf, "b.pdf", "b", "lossy"),
            SourceRecord::failed(Provenance::Url, "https://c.test", "timeout"),
        ];
        let manifest = IngestionManifest::from_records(&records);
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.qualifying_count(), 2);
        assert_eq!(manifest.count(IngestionStatus::Degraded), 1);

        let rejected = manifest.rejections();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].origin, "https://c.test");
        assert_eq!(rejected[0].reason, "timeout");

        let shown = manifest.to_string();
        assert!(shown.contains("degraded"));
        assert!(shown.contains("(timeout)"));
    }

    #[test]
    fn provenance_serializes_snake_case() {
        let json = serde_json::to_string(&Provenance::Transcript).unwrap();
        assert_eq!(json, r#""transcript""#);
    }

    #[test]
    fn mode_bounds() {
        assert_eq!(Mode::Single.min_sources(), 1);
        assert_eq!(Mode::Single.max_sources(), Some(1));
        assert_eq!(Mode::Weekly.min_sources(), 2);
        assert_eq!(Mode::Weekly.max_sources(), None);
    }
}

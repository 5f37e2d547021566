//! Conversation context carrier: earlier turns folded into the corpus as
//! background sources.

use serde::Deserialize;
use tracing::debug;

use meetnotes_markdown::sanitize;
use meetnotes_shared::{Corpus, Provenance, Result, SourceRecord};

/// Prior turns as callers send them: a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HistoryInput {
    One(String),
    Many(Vec<String>),
}

impl HistoryInput {
    /// Oldest turn first.
    pub fn into_turns(self) -> Vec<String> {
        match self {
            Self::One(turn) => vec![turn],
            Self::Many(turns) => turns,
        }
    }
}

/// Convert prior turns into `history` records. Blank turns are skipped.
pub fn history_records(turns: &[String]) -> Vec<SourceRecord> {
    turns
        .iter()
        .map(|t| sanitize(t))
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(i, text)| SourceRecord::ok(Provenance::History, format!("previous turn {}", i + 1), text))
        .collect()
}

/// Prepend history records to an already-validated corpus.
///
/// History goes first so current-turn sources are the last thing the model
/// reads; the prompt marks history as background. Folding happens after
/// aggregation, so history never counts toward a mode's minimum.
pub fn fold(turns: &[String], current: Corpus) -> Result<Corpus> {
    let history = history_records(turns);
    if history.is_empty() {
        return Ok(current);
    }

    debug!(turns = history.len(), "folding conversation history");
    let mut records = history;
    records.extend(current.into_records());
    Corpus::new(records)
}

//! Source ingestion: adapters for each input kind and the normalizer that
//! turns raw inputs into [`SourceRecord`](meetnotes_shared::SourceRecord)s.
//!
//! This crate provides:
//! - [`adapters`]: URL fetching and PDF text extraction
//! - [`speech`]: speech-to-text and text-to-speech clients
//! - [`normalize`]: per-input normalization, concurrent and order-preserving
//! - [`search`]: background web lookup for code review
//! - [`audio`]: recording and playback via external commands

pub mod adapters;
pub mod audio;
pub mod normalize;
pub mod search;
pub mod speech;

pub use adapters::{Adapters, Extraction, HttpFetcher, PdfExtractor, PdfTextExtractor, WebFetcher};
pub use audio::{CommandPlayer, CommandRecorder};
pub use normalize::{EMPTY_TRANSCRIPT, SourceInput, normalize, normalize_all};
pub use search::{DuckDuckGoSearch, SearchDigest, WebSearch};
pub use speech::{OpenAiSynthesizer, OpenAiTranscriber, Synthesizer, Transcriber};

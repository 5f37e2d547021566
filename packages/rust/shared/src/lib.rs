//! Shared types, error model, and configuration for meetnotes.
//!
//! This crate is the foundation depended on by all other meetnotes crates.
//! It provides:
//! - [`MeetNotesError`]: the unified error type
//! - Source types ([`SourceRecord`], [`Corpus`], [`IngestionManifest`])
//! - Summary types ([`SectionSet`], [`Field`], [`RiskSet`], [`NextStep`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod sections;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AudioConfig, CompletionConfig, FetchConfig, ServerConfig, SpeechConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_api_key,
};
pub use error::{MeetNotesError, Result};
pub use sections::{Field, MISSING_MARKER, NextStep, RiskCategory, RiskSet, Section, SectionSet};
pub use types::{
    Corpus, IngestionManifest, IngestionStatus, ManifestEntry, Mode, Provenance, Rejection,
    SourceRecord,
};

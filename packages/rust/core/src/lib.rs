//! Core synthesis logic for meetnotes.
//!
//! This crate ties the ingestion adapters to the completion service:
//! - [`aggregate`]: mode rules and corpus assembly
//! - [`context`]: prior turns folded in as background
//! - [`extract`]: one completion call, parsed tolerantly into sections
//! - [`format`]: the fixed four-section layout
//! - [`pipeline`]: the end-to-end request flow
//! - [`review`]: code-review mode

pub mod aggregate;
pub mod completion;
pub mod context;
pub mod extract;
pub mod format;
pub mod intro;
pub mod pipeline;
pub mod prompts;
pub mod review;

pub use aggregate::aggregate;
pub use completion::{OpenRouterCompletion, Prompt, TextCompletionService, complete_bounded};
pub use context::{HistoryInput, fold, history_records};
pub use extract::{Extracted, ShapeRepair, extract, parse_sections};
pub use format::{blank_template, format};
pub use intro::introduce;
pub use pipeline::{Pipeline, ProgressReporter, SilentProgress, SynthesisRequest, SynthesisResult};
pub use review::{CodeReport, Language, Review, review, scan};

//! End-to-end synthesis pipeline: inputs → normalize → aggregate → fold
//! history → extract → format.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use meetnotes_ingest::{Adapters, SourceInput, normalize_all};
use meetnotes_shared::{IngestionManifest, MeetNotesError, Mode, Result, SectionSet, SourceRecord};

use crate::aggregate::aggregate;
use crate::completion::TextCompletionService;
use crate::context::fold;
use crate::extract::{ShapeRepair, extract};
use crate::format::format;
use crate::intro;

/// One synthesis request.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Raw inputs in arrival order.
    pub inputs: Vec<SourceInput>,
    pub mode: Mode,
    /// Prior conversation turns, oldest first.
    pub history: Vec<String>,
}

impl SynthesisRequest {
    pub fn new(inputs: Vec<SourceInput>, mode: Mode) -> Self {
        Self {
            inputs,
            mode,
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }
}

/// Result of a successful synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// The rendered four-section text.
    pub text: String,
    pub sections: SectionSet,
    pub manifest: IngestionManifest,
    pub repairs: Vec<ShapeRepair>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per normalized input, in arrival order.
    fn source_ready(&self, record: &SourceRecord, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &SynthesisResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_ready(&self, _record: &SourceRecord, _current: usize, _total: usize) {}
    fn done(&self, _result: &SynthesisResult) {}
}

/// Service handles shared by every request. Holds no per-request state.
#[derive(Clone)]
pub struct Pipeline {
    adapters: Adapters,
    completion: Arc<dyn TextCompletionService>,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(adapters: Adapters, completion: Arc<dyn TextCompletionService>, timeout: Duration) -> Self {
        Self {
            adapters,
            completion,
            timeout,
        }
    }

    pub fn adapters(&self) -> &Adapters {
        &self.adapters
    }

    pub fn completion(&self) -> &dyn TextCompletionService {
        self.completion.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one request end to end.
    ///
    /// Per-source failures only show up in the manifest. The request fails
    /// with `InsufficientSources`, `CompletionUnavailable` or `Cancelled`,
    /// and in every failure case no rendered text exists.
    #[instrument(skip_all, fields(mode = %request.mode, inputs = request.inputs.len()))]
    pub async fn synthesize(
        &self,
        request: SynthesisRequest,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult> {
        let start = Instant::now();
        if cancel.is_cancelled() {
            return Err(MeetNotesError::Cancelled);
        }

        // Phase 1: normalize
        progress.phase("Reading sources");
        let records = normalize_all(request.inputs, &self.adapters).await;
        let total = records.len();
        for (i, record) in records.iter().enumerate() {
            progress.source_ready(record, i + 1, total);
        }

        // Phase 2: aggregate, then fold history behind the mode check
        let (corpus, manifest) = aggregate(records, request.mode)?;
        let corpus = fold(&request.history, corpus)?;

        // Phase 3: extract
        progress.phase("Extracting sections");
        let extracted = extract(
            &corpus,
            request.mode,
            self.completion.as_ref(),
            self.timeout,
            cancel,
        )
        .await?;

        // Phase 4: render
        let text = format(&extracted.sections);
        let result = SynthesisResult {
            text,
            sections: extracted.sections,
            manifest,
            repairs: extracted.repairs,
            elapsed: start.elapsed(),
        };

        info!(
            sources = result.manifest.qualifying_count(),
            history = corpus.history_count(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "synthesis complete"
        );
        progress.done(&result);

        Ok(result)
    }

    /// Three-sentence first-person introduction.
    pub async fn introduce(&self, cancel: &CancellationToken) -> Result<String> {
        intro::introduce(self.completion.as_ref(), self.timeout, cancel).await
    }
}

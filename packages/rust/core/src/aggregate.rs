//! Corpus aggregation: enforce the mode's source-count rule and build the
//! ordered corpus from the records that qualify.

use tracing::{info, instrument, warn};

use meetnotes_shared::{Corpus, IngestionManifest, MeetNotesError, Mode, Result, SourceRecord};

/// Validate `records` against `mode` and merge the qualifying ones.
///
/// The manifest always covers every record, failed ones included. Records
/// keep their arrival order; nothing is sorted or deduplicated.
#[instrument(skip_all, fields(%mode, total = records.len()))]
pub fn aggregate(records: Vec<SourceRecord>, mode: Mode) -> Result<(Corpus, IngestionManifest)> {
    let manifest = IngestionManifest::from_records(&records);
    let qualified = manifest.qualifying_count();

    let too_few = qualified < mode.min_sources();
    let too_many = mode.max_sources().is_some_and(|max| qualified > max);

    if too_few || too_many {
        warn!(qualified, required = mode.min_sources(), "source count rejected");
        return Err(MeetNotesError::InsufficientSources {
            mode,
            required: mode.min_sources(),
            qualified,
            rejected: manifest.rejections(),
        });
    }

    let corpus = Corpus::new(records.into_iter().filter(SourceRecord::qualifies).collect())?;

    info!(
        qualifying = qualified,
        rejected = manifest.len() - qualified,
        "corpus assembled"
    );

    Ok((corpus, manifest))
}

//! Batch orchestration: for each catalog candidate, fetch its review listing,
//! split it into fragments and extract reviews, isolating failures per
//! candidate and per fragment.

pub mod extract;
pub mod harvester;
pub mod progress;
pub mod report;

pub use extract::{extract_listing, ListingExtraction};
pub use harvester::{HarvestOptions, Harvester};
pub use progress::{NoProgress, ProgressSink};
pub use report::{CandidateOutcome, CandidateReport, FragmentFailure, HarvestReport, HarvestSummary};

use metallum_acquire::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("network unreachable: all {attempts} listing fetches failed")]
    Unreachable {
        attempts: usize,
        #[source]
        last: TransportError,
    },
}

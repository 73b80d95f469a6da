use metallum_model::Review;
use metallum_parse::ExtractionError;
use std::fmt;

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// The listing was fetched; `skipped` fragments failed extraction.
    Reviews { parsed: usize, skipped: usize },
    /// The work has no review listing.
    NoListing,
    /// The listing could not be fetched or came back unusable.
    Failed { reason: String },
    /// The run was cancelled before this candidate started.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReport {
    pub work_id: String,
    /// Human-readable name of the work.
    pub work: String,
    pub outcome: CandidateOutcome,
}

/// A review fragment that was skipped, with enough context to find it again.
#[derive(Debug)]
pub struct FragmentFailure {
    pub work_id: String,
    pub listing_url: String,
    /// Position of the fragment within its listing.
    pub index: usize,
    pub error: ExtractionError,
}

impl fmt::Display for FragmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "work {} fragment #{} ({}): {}",
            self.work_id, self.index, self.listing_url, self.error
        )
    }
}

/// Result of a harvest run.
///
/// `reviews` follows candidate input order, and document order within each
/// candidate. `candidates` has one entry per input candidate, same order.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub reviews: Vec<Review>,
    pub candidates: Vec<CandidateReport>,
    pub fragment_failures: Vec<FragmentFailure>,
}

/// Counts for the end-of-run message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub candidates: usize,
    pub reviews: usize,
    pub no_listing: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub skipped_fragments: usize,
}

impl HarvestReport {
    pub fn summary(&self) -> HarvestSummary {
        let count = |pred: fn(&CandidateOutcome) -> bool| {
            self.candidates.iter().filter(|c| pred(&c.outcome)).count()
        };
        HarvestSummary {
            candidates: self.candidates.len(),
            reviews: self.reviews.len(),
            no_listing: count(|o| matches!(o, CandidateOutcome::NoListing)),
            failed: count(|o| matches!(o, CandidateOutcome::Failed { .. })),
            cancelled: count(|o| matches!(o, CandidateOutcome::Cancelled)),
            skipped_fragments: self.fragment_failures.len(),
        }
    }
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reviews from {} candidates ({} without reviews, {} failed, {} cancelled, {} fragments skipped)",
            self.reviews,
            self.candidates,
            self.no_listing,
            self.failed,
            self.cancelled,
            self.skipped_fragments
        )
    }
}

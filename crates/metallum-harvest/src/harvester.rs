use crate::extract::extract_listing;
use crate::progress::{NoProgress, ProgressSink};
use crate::report::{CandidateOutcome, CandidateReport, FragmentFailure, HarvestReport};
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use metallum_acquire::{Fetch, TransportError};
use metallum_model::{Review, WorkRef};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Knobs for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Candidates fetched at the same time. Output order never depends on it.
    pub concurrency: usize,
    /// Fail the run when every attempted fetch failed at the network level.
    pub fail_if_unreachable: bool,
    /// GET each synthesized review URL afterwards and log the status.
    pub verify_links: bool,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            fail_if_unreachable: true,
            verify_links: false,
        }
    }
}

/// Everything one candidate produced.
struct CandidateResult {
    report: CandidateReport,
    reviews: Vec<Review>,
    failures: Vec<FragmentFailure>,
    fetch: FetchAttempt,
}

enum FetchAttempt {
    None,
    Reached,
    Unreachable(TransportError),
}

/// Drives fetch + extraction across all candidates of a search.
pub struct Harvester {
    fetcher: Arc<dyn Fetch>,
    progress: Arc<dyn ProgressSink>,
    options: HarvestOptions,
    cancel: CancellationToken,
}

impl Harvester {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            progress: Arc::new(NoProgress),
            options: HarvestOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_options(mut self, options: HarvestOptions) -> Self {
        self.options = options;
        self
    }

    /// Candidates not yet started when `cancel` fires are skipped.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Harvest reviews for every candidate, in order.
    ///
    /// One candidate's failure never stops the others; see [`HarvestOptions`]
    /// for the one case that fails the whole run.
    pub async fn run(&self, candidates: &[WorkRef]) -> Result<HarvestReport, HarvestError> {
        self.progress.start(candidates.len() as u64);

        if candidates.is_empty() {
            tracing::warn!("No results found");
            self.progress.finish();
            return Ok(HarvestReport::default());
        }

        tracing::info!(
            candidates = candidates.len(),
            concurrency = self.options.concurrency,
            "Searching for reviews"
        );

        let results: Vec<CandidateResult> = stream::iter(candidates)
            .map(|work| async move {
                let result = self.harvest_one(work).await;
                self.progress.advance(1);
                result
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        self.progress.finish();

        let mut attempted = 0;
        let mut last_network_error = None;
        let mut reached = false;
        let mut report = HarvestReport::default();

        for result in results {
            match result.fetch {
                FetchAttempt::None => {}
                FetchAttempt::Reached => {
                    attempted += 1;
                    reached = true;
                }
                FetchAttempt::Unreachable(e) => {
                    attempted += 1;
                    last_network_error = Some(e);
                }
            }
            report.reviews.extend(result.reviews);
            report.fragment_failures.extend(result.failures);
            report.candidates.push(result.report);
        }

        if self.options.fail_if_unreachable && !reached {
            if let Some(last) = last_network_error {
                tracing::error!(attempts = attempted, "Network unreachable for every candidate");
                return Err(HarvestError::Unreachable {
                    attempts: attempted,
                    last,
                });
            }
        }

        if self.cancel.is_cancelled() {
            tracing::warn!("Harvest cancelled before all candidates were processed");
        }
        tracing::info!(summary = %report.summary(), "Harvest finished");

        Ok(report)
    }

    async fn harvest_one(&self, work: &WorkRef) -> CandidateResult {
        let mut result = CandidateResult {
            report: CandidateReport {
                work_id: work.id.clone(),
                work: work.to_string(),
                outcome: CandidateOutcome::Cancelled,
            },
            reviews: Vec::new(),
            failures: Vec::new(),
            fetch: FetchAttempt::None,
        };

        if self.cancel.is_cancelled() {
            tracing::debug!(work = %work, "Skipping candidate, run cancelled");
            return result;
        }

        let Some(listing) = work.reviews_listing() else {
            tracing::info!(work = %work, "No reviews available");
            result.report.outcome = CandidateOutcome::NoListing;
            return result;
        };

        tracing::debug!(work = %work, url = %listing.url, expected = ?listing.count, "Fetching review listing");
        let page = match self.fetcher.fetch(&listing.url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(work = %work, url = %listing.url, error = %e, "Failed to fetch review listing");
                result.report.outcome = CandidateOutcome::Failed {
                    reason: e.to_string(),
                };
                result.fetch = if e.is_network() {
                    FetchAttempt::Unreachable(e)
                } else {
                    FetchAttempt::Reached
                };
                return result;
            }
        };
        result.fetch = FetchAttempt::Reached;

        let extraction = extract_listing(&listing.url, work, &page.body);
        if !page.is_success() && extraction.is_empty() {
            result.report.outcome = CandidateOutcome::Failed {
                reason: format!("HTTP {}", page.status),
            };
            return result;
        }
        result.reviews = extraction.reviews;
        result.failures = extraction.failures;

        tracing::info!(
            work = %work,
            reviews = result.reviews.len(),
            skipped = result.failures.len(),
            cached = page.from_cache,
            "Extracted reviews"
        );
        result.report.outcome = CandidateOutcome::Reviews {
            parsed: result.reviews.len(),
            skipped: result.failures.len(),
        };

        if self.options.verify_links {
            self.verify_links(&result.reviews).await;
        }

        result
    }

    async fn verify_links(&self, reviews: &[Review]) {
        for review in reviews {
            match self.fetcher.fetch(review.url().as_str()).await {
                Ok(page) if page.is_success() => {
                    tracing::debug!(url = %review.url(), status = page.status, "Review link resolves");
                }
                Ok(page) => {
                    tracing::warn!(url = %review.url(), status = page.status, "Review link does not resolve");
                }
                Err(e) => {
                    tracing::warn!(url = %review.url(), error = %e, "Review link check failed");
                }
            }
        }
    }
}

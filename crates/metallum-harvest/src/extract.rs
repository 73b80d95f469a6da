use crate::report::FragmentFailure;
use metallum_model::{Review, WorkRef};
use metallum_parse::{parse_listing, parse_review};

/// Everything one listing document yielded.
#[derive(Debug, Default)]
pub struct ListingExtraction {
    /// Reviews in document order.
    pub reviews: Vec<Review>,
    pub failures: Vec<FragmentFailure>,
}

impl ListingExtraction {
    /// No review fragments were found at all.
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty() && self.failures.is_empty()
    }
}

/// Extract every review on a listing page of `work` fetched from `listing_url`.
///
/// A malformed fragment is logged and recorded, and the rest still come through.
pub fn extract_listing(listing_url: &str, work: &WorkRef, html: &str) -> ListingExtraction {
    let mut extraction = ListingExtraction::default();

    for raw in parse_listing(html) {
        match parse_review(listing_url, work, &raw) {
            Ok(review) => {
                tracing::info!(work = %work.id, %review, "Review");
                extraction.reviews.push(review);
            }
            Err(error) => {
                tracing::warn!(work = %work.id, fragment = raw.index, error = %error, "Skipping malformed review");
                extraction.failures.push(FragmentFailure {
                    work_id: work.id.clone(),
                    listing_url: listing_url.to_string(),
                    index: raw.index,
                    error,
                });
            }
        }
    }

    extraction
}

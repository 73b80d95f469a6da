use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog item (an album) as returned by the catalog search.
///
/// The harvester never builds these itself; it only reads the identity
/// fields for reporting and `reviews_listing()` to decide what to fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkRef {
    /// Catalog identifier (the numeric album id on the site).
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Release type as the catalog reports it (e.g., "Full-length", "EP").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Album page URL.
    pub url: String,
    /// Where the reviews for this album live, if it has any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<ReviewsListing>,
}

/// Locator and summary metadata for a work's review listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewsListing {
    pub url: String,
    /// Number of reviews advertised next to the link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Average rating advertised next to the link, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<u8>,
}

impl WorkRef {
    /// The review listing for this work, or `None` when it has no reviews.
    pub fn reviews_listing(&self) -> Option<&ReviewsListing> {
        self.listing.as_ref()
    }
}

impl fmt::Display for WorkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {} [{}]", self.title, self.artist, self.id)
    }
}

//! Review extraction from Encyclopaedia Metallum listing pages.
//!
//! [`parse_listing`] cuts a listing document into [`RawFragment`]s and
//! [`parse_review`] turns each fragment into a validated [`Review`].
//!
//! [`Review`]: metallum_model::Review

use metallum_model::ValidationError;
use thiserror::Error;

pub mod date;
pub mod fragment;
pub mod listing;
pub mod normalize;
pub mod review;

pub use fragment::{HtmlFragment, ProfileRef, ReviewFragment};
pub use listing::{parse_listing, RawFragment};
pub use review::{extract_review, parse_review};

/// A review fragment did not have the structure the field rules expect.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("fragment has no {0} element")]
    MissingElement(&'static str),

    #[error("title line '{0}' has no ' - ' rating separator")]
    MissingRatingSeparator(String),

    #[error("rating '{0}' does not end with '%'")]
    MissingPercent(String),

    #[error("rating '{0}' is not an integer percentage")]
    InvalidRating(String),

    #[error("byline '{0}' has no date after the author")]
    MissingDateSegment(String),

    #[error("date '{raw}' does not match 'Month Day, Year'")]
    InvalidDate {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid URL '{value}'")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

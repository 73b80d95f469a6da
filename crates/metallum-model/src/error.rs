use thiserror::Error;

/// A model invariant was violated while constructing a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("rating {0} is outside 0..=100")]
    RatingOutOfRange(i64),

    #[error("field '{field}' is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

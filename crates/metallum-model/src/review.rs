use crate::error::ValidationError;
use crate::work::WorkRef;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A site user who wrote a review.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UserFields")]
pub struct User {
    name: String,
    profile_url: Url,
}

#[derive(Deserialize)]
struct UserFields {
    name: String,
    profile_url: Url,
}

impl User {
    /// Build a user; the name must not be blank.
    pub fn new(name: impl Into<String>, profile_url: Url) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("author"));
        }
        Ok(Self { name, profile_url })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profile_url(&self) -> &Url {
        &self.profile_url
    }
}

impl TryFrom<UserFields> for User {
    type Error = ValidationError;

    fn try_from(fields: UserFields) -> Result<Self, Self::Error> {
        User::new(fields.name, fields.profile_url)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.profile_url)
    }
}

/// A review score in percent, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 100;

    /// Validate a raw score. Out-of-range values are rejected, never clamped.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// The unvalidated parts of a review, as pulled out of a page.
///
/// Turned into a [`Review`] with [`Review::new`], which checks every
/// invariant at once.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub title: String,
    pub rating: i64,
    pub author: User,
    pub date: NaiveDate,
    pub content: String,
    pub work: WorkRef,
    pub url: Url,
}

/// A single validated review of a work.
///
/// Immutable once built: there are accessors but no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NewReview")]
pub struct Review {
    title: String,
    rating: Rating,
    author: User,
    date: NaiveDate,
    content: String,
    work: WorkRef,
    url: Url,
}

impl Review {
    /// Validate all fields and build the record, or fail without building anything.
    pub fn new(parts: NewReview) -> Result<Self, ValidationError> {
        let title = parts.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        let content = parts.content.trim().to_string();
        if content.is_empty() {
            return Err(ValidationError::EmptyField("content"));
        }
        let rating = Rating::new(parts.rating)?;

        Ok(Self {
            title,
            rating,
            author: parts.author,
            date: parts.date,
            content,
            work: parts.work,
            url: parts.url,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn author(&self) -> &User {
        &self.author
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn work(&self) -> &WorkRef {
        &self.work
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Multi-line rendering with every field, content last.
    pub fn full_info(&self) -> String {
        format!(
            "Title: {}\n\
             Rating: {}\n\
             Author: {}\n\
             Date: {}\n\
             Album: {}\n\
             URL: {}\n\
             Content: {}\n",
            self.title, self.rating, self.author, self.date, self.work, self.url, self.content,
        )
    }
}

impl TryFrom<NewReview> for Review {
    type Error = ValidationError;

    fn try_from(parts: NewReview) -> Result<Self, Self::Error> {
        Review::new(parts)
    }
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({}) by {} on {} ({})",
            self.title, self.rating, self.author, self.date, self.url
        )
    }
}

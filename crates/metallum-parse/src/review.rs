// Field rules that turn one review fragment into a validated `Review`.
//
// Each rule is a single failure point with its own error variant, so
// markup drift on the site shows up as a specific extraction error.

use crate::date::date_from_byline;
use crate::fragment::{HtmlFragment, ReviewFragment};
use crate::listing::RawFragment;
use crate::ExtractionError;
use metallum_model::{NewReview, Review, User, WorkRef};
use url::Url;

/// Separator between the review title and its rating in the heading.
const RATING_SEPARATOR: &str = " - ";

/// Parse one raw fragment from the listing at `base_url` into a review of `work`.
pub fn parse_review(
    base_url: &str,
    work: &WorkRef,
    raw: &RawFragment,
) -> Result<Review, ExtractionError> {
    let fragment = HtmlFragment::parse(raw);
    extract_review(base_url, work, &fragment)
}

/// Apply the field rules to any fragment implementation.
pub fn extract_review<F: ReviewFragment + ?Sized>(
    base_url: &str,
    work: &WorkRef,
    fragment: &F,
) -> Result<Review, ExtractionError> {
    let title_line = fragment
        .title_line()
        .ok_or(ExtractionError::MissingElement("title"))?;
    let (title, rating) = split_title_rating(&title_line)?;

    let profile = fragment
        .profile_ref()
        .ok_or(ExtractionError::MissingElement("profile"))?;
    let base = parse_url(base_url)?;
    let profile_url = base
        .join(&profile.href)
        .map_err(|source| ExtractionError::InvalidUrl {
            value: profile.href.clone(),
            source,
        })?;

    let byline = fragment
        .byline()
        .ok_or(ExtractionError::MissingElement("date"))?;
    let date = date_from_byline(&byline)?;

    let content = fragment
        .content_block()
        .ok_or(ExtractionError::MissingElement("content"))?;

    let url = review_url(base_url, &profile.name)?;
    let author = User::new(profile.name, profile_url)?;

    Ok(Review::new(NewReview {
        title,
        rating,
        author,
        date,
        content,
        work: work.clone(),
        url,
    })?)
}

/// Split `"Crushing - 95%"` into `("Crushing", 95)`.
///
/// Splits on the last separator so titles may contain `" - "` themselves.
/// The rating must carry its `%`; the range is checked later by the model.
pub fn split_title_rating(title_line: &str) -> Result<(String, i64), ExtractionError> {
    let (title, tail) = title_line
        .rsplit_once(RATING_SEPARATOR)
        .ok_or_else(|| ExtractionError::MissingRatingSeparator(title_line.to_string()))?;

    let digits = tail
        .trim()
        .strip_suffix('%')
        .ok_or_else(|| ExtractionError::MissingPercent(tail.trim().to_string()))?
        .trim();
    let rating = digits
        .parse::<i64>()
        .map_err(|_| ExtractionError::InvalidRating(tail.trim().to_string()))?;

    Ok((title.trim().to_string(), rating))
}

/// Best-effort deep link to a review: the listing URL plus the author name
/// with spaces turned into underscores. Not guaranteed to resolve.
///
/// The result is a parsed `Url`, so non-ASCII names come back
/// percent-encoded (`Björn Ö` becomes `Bj%C3%B6rn_%C3%96`) rather than as
/// the literal concatenation.
pub fn review_url(base_url: &str, author: &str) -> Result<Url, ExtractionError> {
    parse_url(&format!("{base_url}{}", author.replace(' ', "_")))
}

fn parse_url(value: &str) -> Result<Url, ExtractionError> {
    Url::parse(value).map_err(|source| ExtractionError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}

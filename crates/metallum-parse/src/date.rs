// Review dates as the site prints them: "January 1st, 2020".

use crate::normalize::collapse_whitespace;
use crate::ExtractionError;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// `Month Day, Year`, once ordinal suffixes are gone.
pub const DATE_FORMAT: &str = "%B %d, %Y";

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(st|nd|rd|th)").expect("valid regex"));

/// Remove ordinal suffixes from day numbers ("1st" -> "1", "23rd" -> "23").
///
/// Numbers without a suffix are left alone, and running it twice changes
/// nothing.
pub fn strip_ordinals(input: &str) -> String {
    ORDINAL.replace_all(input, "$1").into_owned()
}

/// Parse the text that follows a reviewer's profile link.
///
/// The byline reads `", January 1st, 2020"`: everything up to the first
/// comma belongs to the author portion and is dropped.
pub fn date_from_byline(byline: &str) -> Result<NaiveDate, ExtractionError> {
    let (_, date) = byline
        .split_once(',')
        .ok_or_else(|| ExtractionError::MissingDateSegment(byline.trim().to_string()))?;
    parse_date(date)
}

/// Parse a `Month Day, Year` date, tolerating ordinal suffixes and stray whitespace.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ExtractionError> {
    let cleaned = strip_ordinals(&collapse_whitespace(raw));
    NaiveDate::parse_from_str(&cleaned, DATE_FORMAT).map_err(|source| {
        ExtractionError::InvalidDate {
            raw: raw.trim().to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ordinals() {
        let input = "1st, 2nd, 3rd, 4th, 11th, 21st, 22nd, 23rd";
        assert_eq!(strip_ordinals(input), "1, 2, 3, 4, 11, 21, 22, 23");
    }

    #[test]
    fn test_strip_ordinals_idempotent() {
        let once = strip_ordinals("March 12th, 2001");
        assert_eq!(once, "March 12, 2001");
        assert_eq!(strip_ordinals(&once), once);
    }

    #[test]
    fn test_strip_ordinals_leaves_plain_numbers() {
        assert_eq!(strip_ordinals("August 2020, 42 reviews"), "August 2020, 42 reviews");
        assert_eq!(strip_ordinals("First, Last"), "First, Last");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("January 1st, 2020").unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert_eq!(
            parse_date("February 22nd, 2011").unwrap(),
            NaiveDate::from_ymd_opt(2011, 2, 22).unwrap()
        );
        assert_eq!(
            parse_date(" November\n 3rd, 2008 ").unwrap(),
            NaiveDate::from_ymd_opt(2008, 11, 3).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        assert!(matches!(parse_date("2020-01-01"), Err(ExtractionError::InvalidDate { .. })));
        assert!(matches!(parse_date("February 30th, 2020"), Err(ExtractionError::InvalidDate { .. })));
        assert!(matches!(parse_date(""), Err(ExtractionError::InvalidDate { .. })));
    }

    #[test]
    fn test_date_from_byline() {
        assert_eq!(
            date_from_byline(", April 21st, 2015").unwrap(),
            NaiveDate::from_ymd_opt(2015, 4, 21).unwrap()
        );
        assert!(matches!(
            date_from_byline("yesterday"),
            Err(ExtractionError::MissingDateSegment(_))
        ));
    }
}

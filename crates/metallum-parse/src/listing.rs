use scraper::{Html, Selector};
use serde::Serialize;

/// CSS selector for one review entry on a listing page.
pub const REVIEW_BOX: &str = "div.reviewBox";

/// One review entry cut out of a listing page, before field extraction.
///
/// Owns its markup so it can outlive the parsed document (which is not `Send`).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RawFragment {
    /// Position of the entry within the listing, in document order.
    pub index: usize,
    pub html: String,
}

/// Locate every review entry in a listing document, in document order.
///
/// A page with no entries (or a page that is not HTML at all, such as an
/// error body) yields an empty vector: "no reviews" is a valid answer.
pub fn parse_listing(document: &str) -> Vec<RawFragment> {
    let document = Html::parse_document(document);
    let box_sel = Selector::parse(REVIEW_BOX).expect("valid selector");

    let fragments: Vec<RawFragment> = document
        .select(&box_sel)
        .enumerate()
        .map(|(index, element)| RawFragment {
            index,
            html: element.html(),
        })
        .collect();

    tracing::debug!(fragments = fragments.len(), "Located review fragments");
    fragments
}

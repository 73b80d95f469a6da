use crate::transport::Fetch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use metallum_model::{ReviewsListing, WorkRef};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use url::Url;

const SEARCH_URL: &str = "https://www.metal-archives.com/search/ajax-advanced/searching/albums/";

/// Produces candidate works for a title/artist query.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, title: &str, artist: &str) -> Result<Vec<WorkRef>>;
}

/// Album search against Encyclopaedia Metallum.
///
/// Runs the advanced album search, then loads each album page to find its
/// review listing link (albums without reviews have none).
pub struct MetallumCatalog {
    fetcher: Arc<dyn Fetch>,
}

impl MetallumCatalog {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl CatalogSearch for MetallumCatalog {
    async fn search(&self, title: &str, artist: &str) -> Result<Vec<WorkRef>> {
        let url = search_url(title, artist)?;
        tracing::info!(album = %title, band = %artist, "Searching catalog");

        let page = self.fetcher.fetch(url.as_str()).await?;
        anyhow::ensure!(page.is_success(), "HTTP {} for album search", page.status);
        let rows = parse_search_results(&page.body)?;
        tracing::info!(results = rows.len(), "Catalog search finished");

        let mut works = Vec::with_capacity(rows.len());
        for row in rows {
            let listing = match self.fetcher.fetch(&row.url).await {
                Ok(album_page) if album_page.is_success() => parse_reviews_link(&album_page.body),
                Ok(album_page) => {
                    tracing::warn!(url = %row.url, status = album_page.status, "Album page unavailable");
                    None
                }
                Err(e) => {
                    tracing::warn!(url = %row.url, error = %e, "Album page unavailable");
                    None
                }
            };
            works.push(WorkRef { listing, ..row });
        }

        Ok(works)
    }
}

fn search_url(title: &str, artist: &str) -> Result<Url> {
    Url::parse_with_params(SEARCH_URL, &[("bandName", artist), ("releaseTitle", title)])
        .context("Failed to build search URL")
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "aaData", default)]
    rows: Vec<Vec<String>>,
}

/// Turn the search endpoint's JSON into works without listings.
///
/// Each row is `[band link, album link, release type, release date]`, the
/// first two as HTML anchors.
fn parse_search_results(json: &str) -> Result<Vec<WorkRef>> {
    let response: SearchResponse =
        serde_json::from_str(json).context("Album search did not return JSON")?;

    let mut works = Vec::new();
    for (index, row) in response.rows.iter().enumerate() {
        let (Some(band_cell), Some(album_cell)) = (row.first(), row.get(1)) else {
            tracing::debug!(row = index, cols = row.len(), "Skipping short search row");
            continue;
        };
        let Some((album_url, album_title)) = first_link(album_cell) else {
            tracing::debug!(row = index, "Skipping search row without album link");
            continue;
        };
        let artist = first_link(band_cell)
            .map(|(_, name)| name)
            .unwrap_or_else(|| cell_text(band_cell));
        let id = album_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        works.push(WorkRef {
            id,
            title: album_title,
            artist,
            kind: row.get(2).map(|c| cell_text(c)).filter(|s| !s.is_empty()),
            release_date: row.get(3).map(|c| cell_text(c)).filter(|s| !s.is_empty()),
            url: album_url,
            listing: None,
        });
    }

    Ok(works)
}

fn first_link(cell: &str) -> Option<(String, String)> {
    let fragment = Html::parse_fragment(cell);
    let a_sel = Selector::parse("a[href]").expect("valid selector");
    let anchor = fragment.select(&a_sel).next()?;
    let href = anchor.value().attr("href")?.trim().to_string();
    let text = anchor.text().collect::<String>().trim().to_string();
    Some((href, text))
}

/// Visible text of an HTML snippet; comments (like the sortable date) are dropped.
fn cell_text(cell: &str) -> String {
    let fragment = Html::parse_fragment(cell);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

static LISTING_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s+reviews?(?:\s*\(avg\.?\s*(\d+)%\))?").expect("valid regex")
});

/// Find the review listing link on an album page.
fn parse_reviews_link(html: &str) -> Option<ReviewsListing> {
    let document = Html::parse_document(html);
    let link_sel = Selector::parse(r#"dd a[href*="/reviews/"]"#).expect("valid selector");
    let link = document.select(&link_sel).next()?;
    let url = link.value().attr("href")?.trim().to_string();

    let summary = link.text().collect::<String>();
    let caps = LISTING_SUMMARY.captures(&summary);
    let count = caps
        .as_ref()
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let average = caps
        .as_ref()
        .and_then(|c| c.get(2))
        .and_then(|m| m.as_str().parse().ok());

    Some(ReviewsListing {
        url,
        count,
        average,
    })
}

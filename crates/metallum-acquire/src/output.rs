use anyhow::{Context, Result};
use metallum_model::Review;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What was searched for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    pub album: String,
    pub band: String,
}

/// The JSON document written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewExport {
    pub query: SearchQuery,
    pub fetched_at: String,
    pub count: usize,
    pub reviews: Vec<Review>,
}

impl ReviewExport {
    pub fn new(query: SearchQuery, reviews: Vec<Review>) -> Self {
        Self {
            query,
            fetched_at: chrono::Utc::now().to_rfc3339(),
            count: reviews.len(),
            reviews,
        }
    }
}

/// Write the export as pretty JSON, creating parent directories as needed.
pub fn write_reviews(export: &ReviewExport, output_path: &str) -> Result<()> {
    let path = Path::new(output_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(export)?;
    fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), reviews = export.count, "Wrote reviews JSON");

    Ok(())
}

/// Read a previously written export back, re-validating every review.
pub fn read_reviews(input_path: &str) -> Result<ReviewExport> {
    let text = fs::read_to_string(input_path)
        .with_context(|| format!("Failed to read {input_path}"))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {input_path}"))
}

/// Keep a raw listing page next to the output so it can be re-extracted
/// without fetching it again.
pub fn cache_html(output_dir: &str, filename: &str, html: &str) -> Result<()> {
    let dir = Path::new(output_dir);
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    fs::write(&path, html)?;
    tracing::info!(path = %path.display(), bytes = html.len(), "Saved raw HTML");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use metallum_model::{NewReview, User, WorkRef};
    use url::Url;

    fn review() -> Review {
        Review::new(NewReview {
            title: "Crushing".into(),
            rating: 95,
            author: User::new(
                "Some Reviewer",
                Url::parse("https://www.metal-archives.com/users/Some%20Reviewer").unwrap(),
            )
            .unwrap(),
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            content: "Great.".into(),
            work: WorkRef {
                id: "920".into(),
                title: "Blackwater Park".into(),
                artist: "Opeth".into(),
                kind: None,
                release_date: None,
                url: "https://www.metal-archives.com/albums/Opeth/Blackwater_Park/920".into(),
                listing: None,
            },
            url: Url::parse("https://www.metal-archives.com/reviews/Opeth/Blackwater_Park/920/Some_Reviewer")
                .unwrap(),
        })
        .unwrap()
    }

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("metallum-output-test-{:016x}", fastrand::u64(..)))
    }

    #[test]
    fn test_write_and_read_reviews() {
        let dir = temp_dir();
        let path = dir.join("nested").join("reviews.json");
        let path = path.to_str().unwrap();

        let export = ReviewExport::new(
            SearchQuery {
                album: "Blackwater Park".into(),
                band: "Opeth".into(),
            },
            vec![review()],
        );
        write_reviews(&export, path).unwrap();

        let back = read_reviews(path).unwrap();
        assert_eq!(back.count, 1);
        assert_eq!(back.query.band, "Opeth");
        assert_eq!(back.reviews[0], review());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cache_html() {
        let dir = temp_dir();
        cache_html(dir.to_str().unwrap(), "listing_920.html", "<html></html>").unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("listing_920.html")).unwrap(),
            "<html></html>"
        );
        fs::remove_dir_all(&dir).unwrap();
    }
}

use async_trait::async_trait;
use metallum_acquire::{output, Fetch, Page, TransportError};
use std::sync::Arc;

/// Fetcher that keeps a copy of every review listing it downloads, so
/// `metallum extract` can re-run extraction offline.
pub struct SavingFetch {
    inner: Arc<dyn Fetch>,
    dir: String,
}

impl SavingFetch {
    pub fn new(inner: Arc<dyn Fetch>, dir: impl Into<String>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }
}

/// `listing_920.html` for `.../reviews/Opeth/Blackwater_Park/920/`.
pub fn listing_filename(url: &str) -> Option<String> {
    if !url.contains("/reviews/") {
        return None;
    }
    // Listings end in the numeric album id; review deep links end in a user name.
    let id = url.trim_end_matches('/').rsplit('/').next()?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .then(|| format!("listing_{id}.html"))
}

#[async_trait]
impl Fetch for SavingFetch {
    async fn fetch(&self, url: &str) -> Result<Page, TransportError> {
        let page = self.inner.fetch(url).await?;
        if page.is_success() {
            if let Some(filename) = listing_filename(url) {
                if let Err(e) = output::cache_html(&self.dir, &filename, &page.body) {
                    tracing::warn!(url = %url, error = %e, "Could not save listing HTML");
                }
            }
        }
        Ok(page)
    }
}

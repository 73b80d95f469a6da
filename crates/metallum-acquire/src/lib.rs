use std::error::Error as StdError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod cache;
pub mod catalog;
pub mod identity;
pub mod output;
pub mod rate_limit;
pub mod transport;

pub use cache::{CacheStore, DiskCache, MemoryCache};
pub use catalog::{CatalogSearch, MetallumCatalog};
pub use identity::{FixedIdentity, IdentityProvider, RandomIdentity};
pub use rate_limit::{Clock, RateLimiter, TokioClock};
pub use transport::{CacheMode, Fetch, HttpBackend, Page, ReqwestBackend, Transport, TransportConfig};

/// A request could not produce a usable response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("cache directory {} is unusable", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("still rate limited on {url} after waiting {waited:?}")]
    RateLimited { url: String, waited: Duration },

    #[error("HTTP {status} for {url} on retry")]
    Status { url: String, status: u16 },
}

impl TransportError {
    pub fn network(url: &str, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Network {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// The server was never reached.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

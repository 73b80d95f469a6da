use crate::cache::{cache_key, CacheStore, CachedPage, DiskCache, MemoryCache};
use crate::identity::{FixedIdentity, IdentityProvider, RandomIdentity};
use crate::rate_limit::RateLimiter;
use crate::TransportError;
use async_trait::async_trait;
use reqwest::header::{RETRY_AFTER, USER_AGENT};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const TOO_MANY_REQUESTS: u16 = 429;

/// A raw HTTP response, before caching and rate-limit handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if the server sent one.
    pub retry_after: Option<String>,
    pub body: String,
}

/// Issues a single GET. No caching, no retries.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError>;
}

/// [`HttpBackend`] over a `reqwest` client with per-request timeouts.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| TransportError::network(url, e))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(url, e))?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Served from the response cache without touching the network.
    pub from_cache: bool,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can turn a URL into a [`Page`].
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, TransportError>;
}

/// Where responses are cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    Disabled,
    Memory,
    Disk {
        dir: PathBuf,
        expire_after: Option<Duration>,
    },
}

/// Settings for [`Transport::from_config`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Wait used after a 429 without a usable `Retry-After`.
    pub default_backoff: Duration,
    /// Upper bound on any single rate-limit wait.
    pub max_backoff: Duration,
    /// Send this identity on every request instead of rotating.
    pub user_agent: Option<String>,
    pub cache: CacheMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            default_backoff: RateLimiter::DEFAULT_BACKOFF,
            max_backoff: RateLimiter::DEFAULT_MAX_BACKOFF,
            user_agent: None,
            cache: CacheMode::Memory,
        }
    }
}

/// HTTP access with identity rotation, a response cache, and one
/// wait-and-retry on rate limiting.
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    identity: Arc<dyn IdentityProvider>,
    limiter: RateLimiter,
    cache: Option<Arc<dyn CacheStore>>,
}

impl Transport {
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        identity: Arc<dyn IdentityProvider>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            backend,
            identity,
            limiter,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build a transport over `reqwest` from configuration.
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let backend = Arc::new(ReqwestBackend::new(config)?);
        let identity: Arc<dyn IdentityProvider> = match &config.user_agent {
            Some(ua) => Arc::new(FixedIdentity(ua.clone())),
            None => Arc::new(RandomIdentity::default()),
        };
        let limiter = RateLimiter::new(config.default_backoff, config.max_backoff);
        let transport = Self::new(backend, identity, limiter);

        Ok(match &config.cache {
            CacheMode::Disabled => transport,
            CacheMode::Memory => transport.with_cache(Arc::new(MemoryCache::new())),
            CacheMode::Disk { dir, expire_after } => {
                let mut disk = DiskCache::new(dir).map_err(|source| TransportError::Cache {
                    path: dir.clone(),
                    source,
                })?;
                if let Some(expiry) = expire_after {
                    disk = disk.with_expiry(*expiry);
                }
                tracing::debug!(dir = %disk.dir().display(), "Using on-disk response cache");
                transport.with_cache(Arc::new(disk))
            }
        })
    }

    async fn send(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let user_agent = self.identity.user_agent();
        tracing::debug!(url = %url, user_agent = %user_agent, "GET");
        self.backend.get(url, &user_agent).await
    }

    fn cached(&self, key: &str, url: &str) -> Option<Page> {
        let cache = self.cache.as_ref()?;
        match cache.get(key) {
            Ok(Some(hit)) => {
                tracing::debug!(url = %url, stored_at = %hit.stored_at, "Cache hit");
                Some(Page {
                    url: url.to_string(),
                    status: hit.status,
                    body: hit.body,
                    from_cache: true,
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Cache read failed, fetching instead");
                None
            }
        }
    }

    fn store(&self, key: &str, page: &Page) {
        let Some(cache) = &self.cache else {
            return;
        };
        let entry = CachedPage {
            url: page.url.clone(),
            status: page.status,
            body: page.body.clone(),
            stored_at: chrono::Utc::now(),
        };
        if let Err(e) = cache.put(key, &entry) {
            tracing::warn!(url = %page.url, error = %e, "Cache write failed");
        }
    }
}

#[async_trait]
impl Fetch for Transport {
    /// GET `url`.
    ///
    /// Cached responses are returned without a request. A 429 is retried
    /// exactly once after the rate limiter's wait; if the retry fails in any
    /// way the failure is returned as an error. Any other non-2xx on the
    /// first attempt is logged and the page is returned as received.
    async fn fetch(&self, url: &str) -> Result<Page, TransportError> {
        let key = cache_key("GET", url);
        if let Some(page) = self.cached(&key, url) {
            return Ok(page);
        }

        let first = self.send(url).await?;
        let response = if first.status == TOO_MANY_REQUESTS {
            let wait = self.limiter.backoff_for(first.retry_after.as_deref());
            tracing::warn!(url = %url, wait_secs = wait.as_secs_f64(), "Rate limited, retrying once");
            self.limiter.wait(wait).await;

            let retry = self.send(url).await?;
            if retry.status == TOO_MANY_REQUESTS {
                tracing::error!(url = %url, "Still rate limited after backoff");
                return Err(TransportError::RateLimited {
                    url: url.to_string(),
                    waited: wait,
                });
            }
            if !(200..300).contains(&retry.status) {
                tracing::error!(url = %url, status = retry.status, "Retry failed");
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: retry.status,
                });
            }
            retry
        } else {
            if !(200..300).contains(&first.status) {
                tracing::error!(url = %url, status = first.status, "Request failed");
            }
            first
        };

        let page = Page {
            url: url.to_string(),
            status: response.status,
            body: response.body,
            from_cache: false,
        };
        tracing::debug!(url = %url, status = page.status, bytes = page.body.len(), "Received");

        if page.is_success() {
            self.store(&key, &page);
        }
        Ok(page)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rate_limit::Clock;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that replays canned responses and records every call.
    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        pub(crate) calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(self, status: u16, retry_after: Option<&str>, body: &str) -> Self {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                retry_after: retry_after.map(str::to_string),
                body: body.to_string(),
            }));
            self
        }

        pub(crate) fn fail(self, url: &str) -> Self {
            self.responses.lock().unwrap().push_back(Err(TransportError::network(
                url,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )));
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpBackend for ScriptedBackend {
        async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), user_agent.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }
    }

    /// Clock that records requested sleeps instead of sleeping.
    #[derive(Default)]
    pub(crate) struct RecordingClock {
        pub(crate) sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Clock for RecordingClock {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn transport(backend: &Arc<ScriptedBackend>, clock: &Arc<RecordingClock>) -> Transport {
        Transport::new(
            backend.clone(),
            Arc::new(FixedIdentity("metallum-test".into())),
            RateLimiter::default().with_clock(clock.clone()),
        )
    }

    const URL: &str = "https://www.metal-archives.com/reviews/Opeth/Blackwater_Park/920/";

    #[tokio::test]
    async fn test_success_passes_identity() {
        let backend = Arc::new(ScriptedBackend::new().respond(200, None, "<html>ok</html>"));
        let clock = Arc::new(RecordingClock::default());

        let page = transport(&backend, &clock).fetch(URL).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<html>ok</html>");
        assert!(!page.from_cache);
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(URL.to_string(), "metallum-test".to_string())]);
        assert!(clock.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_429_then_200_waits_once_for_retry_after() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .respond(429, Some("7"), "slow down")
                .respond(200, None, "<html>reviews</html>"),
        );
        let clock = Arc::new(RecordingClock::default());

        let page = transport(&backend, &clock).fetch(URL).await.unwrap();

        assert_eq!(page.body, "<html>reviews</html>");
        assert_eq!(backend.call_count(), 2);
        assert_eq!(clock.sleeps.lock().unwrap().as_slice(), &[Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn test_429_without_header_uses_default_backoff() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .respond(429, None, "")
                .respond(200, None, "ok"),
        );
        let clock = Arc::new(RecordingClock::default());

        transport(&backend, &clock).fetch(URL).await.unwrap();

        assert_eq!(clock.sleeps.lock().unwrap().as_slice(), &[Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_second_429_is_an_error_without_further_retry() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .respond(429, Some("2"), "")
                .respond(429, Some("2"), ""),
        );
        let clock = Arc::new(RecordingClock::default());

        let err = transport(&backend, &clock).fetch(URL).await.unwrap_err();

        assert!(matches!(err, TransportError::RateLimited { waited, .. } if waited == Duration::from_secs(2)));
        assert_eq!(backend.call_count(), 2);
        assert_eq!(clock.sleeps.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_with_other_failure_is_an_error() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .respond(429, Some("1"), "")
                .respond(503, None, "down"),
        );
        let clock = Arc::new(RecordingClock::default());

        let err = transport(&backend, &clock).fetch(URL).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_non_success_is_passed_through() {
        let backend = Arc::new(ScriptedBackend::new().respond(404, None, "not found"));
        let clock = Arc::new(RecordingClock::default());

        let page = transport(&backend, &clock).fetch(URL).await.unwrap();

        assert_eq!(page.status, 404);
        assert!(!page.is_success());
        assert_eq!(page.body, "not found");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_network_error() {
        let backend = Arc::new(ScriptedBackend::new().fail(URL));
        let clock = Arc::new(RecordingClock::default());

        let err = transport(&backend, &clock).fetch(URL).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let backend = Arc::new(ScriptedBackend::new().respond(200, None, "<html>first</html>"));
        let clock = Arc::new(RecordingClock::default());
        let cache = Arc::new(MemoryCache::new());
        let transport = transport(&backend, &clock).with_cache(cache.clone());

        let first = transport.fetch(URL).await.unwrap();
        let second = transport.fetch(URL).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.body, "<html>first</html>");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .respond(500, None, "oops")
                .respond(200, None, "fine"),
        );
        let clock = Arc::new(RecordingClock::default());
        let cache = Arc::new(MemoryCache::new());
        let transport = transport(&backend, &clock).with_cache(cache.clone());

        assert_eq!(transport.fetch(URL).await.unwrap().status, 500);
        assert!(cache.is_empty());
        assert_eq!(transport.fetch(URL).await.unwrap().body, "fine");
        assert_eq!(backend.call_count(), 2);
    }

    #[test]
    fn test_from_config_creates_disk_cache_dir() {
        let dir = std::env::temp_dir().join(format!("metallum-transport-test-{:016x}", fastrand::u64(..)));
        let config = TransportConfig {
            cache: CacheMode::Disk {
                dir: dir.clone(),
                expire_after: Some(Duration::from_secs(3600)),
            },
            ..TransportConfig::default()
        };

        Transport::from_config(&config).unwrap();

        assert!(dir.is_dir());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

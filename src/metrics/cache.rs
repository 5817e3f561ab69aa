use super::transport::MetricsTransport;
use super::types::{LoadGroup, LoadGroupKey, MetricsError, MetricsResult, TimeSeries};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::Mutex;

type SharedFetch = Shared<BoxFuture<'static, MetricsResult<Arc<TimeSeries>>>>;

struct CacheEntry {
    fetch: SharedFetch,
    started: Instant,
}

impl CacheEntry {
    /// A finished fetch older than `ttl`. In-flight fetches never expire.
    fn is_stale(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.fetch.peek().is_some() && self.started.elapsed() >= ttl,
            None => false,
        }
    }
}

/// Coalesces load-group fetches.
///
/// Concurrent requests for the same load group share one transport call.
/// Successful results stay cached until invalidated, or until they are
/// older than the optional TTL; failed fetches are evicted so the next
/// request retries. Fetches run on their own task on the current tokio
/// runtime and complete even when every requester has gone away.
pub struct LoadGroupCache {
    transport: Arc<dyn MetricsTransport>,
    entries: Mutex<HashMap<LoadGroupKey, CacheEntry>>,
    ttl: Option<Duration>,
    transport_calls: AtomicU64,
}

impl LoadGroupCache {
    pub fn new(transport: Arc<dyn MetricsTransport>) -> Self {
        Self {
            transport,
            entries: Mutex::new(HashMap::new()),
            ttl: None,
            transport_calls: AtomicU64::new(0),
        }
    }

    /// Cache whose successful results are refetched once they are `ttl` old,
    /// counted from the start of the fetch.
    pub fn with_ttl(transport: Arc<dyn MetricsTransport>, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new(transport)
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub async fn fetch(&self, group: &LoadGroup) -> MetricsResult<Arc<TimeSeries>> {
        let key = group.key();
        let shared = {
            let mut entries = self.entries.lock().await;
            match entries.get(&key) {
                Some(existing) if !existing.is_stale(self.ttl) => {
                    debug!("Joining fetch for load group {}", key);
                    existing.fetch.clone()
                }
                _ => {
                    let fetch = self.start_fetch(group.clone())?;
                    entries.insert(
                        key.clone(),
                        CacheEntry {
                            fetch: fetch.clone(),
                            started: Instant::now(),
                        },
                    );
                    fetch
                }
            }
        };

        let result = shared.clone().await;
        if let Err(error) = &result {
            warn!("Load group {} failed: {}", key, error);
            let mut entries = self.entries.lock().await;
            if entries.get(&key).map(|e| e.fetch.ptr_eq(&shared)).unwrap_or(false) {
                entries.remove(&key);
            }
        }
        result
    }

    fn start_fetch(&self, group: LoadGroup) -> MetricsResult<SharedFetch> {
        let handle = Handle::try_current()
            .map_err(|e| MetricsError::Transport(format!("no tokio runtime for fetch: {}", e)))?;
        self.transport_calls.fetch_add(1, Ordering::SeqCst);
        let transport = Arc::clone(&self.transport);
        let task = handle.spawn(async move { transport.fetch(&group).await.map(Arc::new) });
        Ok(async move {
            task.await
                .unwrap_or_else(|e| Err(MetricsError::Transport(format!("fetch task failed: {}", e))))
        }
        .boxed()
        .shared())
    }

    /// Drop a cached or in-flight entry so the next fetch goes to the transport.
    pub async fn invalidate(&self, group: &LoadGroup) -> bool {
        self.entries.lock().await.remove(&group.key()).is_some()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of fetches handed to the transport so far.
    pub fn transport_calls(&self) -> u64 {
        self.transport_calls.load(Ordering::SeqCst)
    }
}

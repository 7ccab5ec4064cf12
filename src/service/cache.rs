use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::future::Cache;
use tracing::{debug, warn};

use crate::model::{apperror::ApplicationError, config::CacheConfig, models::{QueryKey, RecordDetailType}};

/**
 * Upper bound for the delay between retries.
 */
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct CachedList {
    records: Arc<Vec<RecordDetailType>>,
    fetched_at: Instant,
}

/**
 * Cache of record lists keyed by `QueryKey`.
 *
 * A list is served from the cache while it is fresh. A stale list is refetched and only served when the refetch
 * fails. Lists that are not read for the retention window are dropped. Writers call `invalidate` so the next read
 * of an affected key goes to the database.
 */
pub struct ListCache {
    entries: Cache<QueryKey, CachedList>,
    fresh_for: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    /**
     * Bumped on every invalidation. A fetch that started before an invalidation must not populate the cache.
     */
    generation: AtomicU64,
}

impl ListCache {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder().max_capacity(config.max_capacity).time_to_idle(Duration::from_secs(config.retention_secs)).build();
        ListCache {
            entries,
            fresh_for: Duration::from_secs(config.fresh_secs),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            generation: AtomicU64::new(0),
        }
    }

    /**
     * Returns the list for `key`, fetching it when missing or stale.
     *
     * # Arguments
     * `key`: The list to read.
     * `fetch`: Loads the list from the database. Called again for each retry.
     */
    pub async fn get_or_fetch<F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<Arc<Vec<RecordDetailType>>, ApplicationError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<RecordDetailType>, ApplicationError>>,
    {
        let cached = self.entries.get(key).await;
        if let Some(cached) = &cached {
            if cached.fetched_at.elapsed() < self.fresh_for {
                debug!(?key, "Serving fresh list from cache");
                return Ok(cached.records.clone());
            }
        }
        let generation = self.generation.load(Ordering::Acquire);
        match self.fetch_with_retry(key, fetch).await {
            Ok(records) => {
                let records = Arc::new(records);
                self.store(key, records.clone(), generation).await;
                Ok(records)
            }
            Err(err) if err.is_authentication_failure() => Err(err),
            Err(err) => match cached {
                Some(stale) => {
                    warn!(?key, "Refetch failed, serving stale list: {err}");
                    Ok(stale.records)
                }
                None => Err(err),
            },
        }
    }

    /**
     * Drops the given lists so the next read refetches them.
     */
    pub async fn invalidate(&self, keys: &[QueryKey]) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        for key in keys {
            self.entries.invalidate(key).await;
        }
        debug!(?keys, "Invalidated cached lists");
    }

    /**
     * Caches a fetched list unless an invalidation happened since `generation` was read.
     * The generation is checked again after the insert because an invalidation may land in between.
     */
    async fn store(&self, key: &QueryKey, records: Arc<Vec<RecordDetailType>>, generation: u64) {
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        self.entries.insert(key.clone(), CachedList { records, fetched_at: Instant::now() }).await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(?key, "Invalidated while storing, dropping list");
            self.entries.invalidate(key).await;
        }
    }

    async fn fetch_with_retry<F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<Vec<RecordDetailType>, ApplicationError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<RecordDetailType>, ApplicationError>>,
    {
        let mut failure_count: u32 = 0;
        loop {
            match fetch().await {
                Ok(records) => return Ok(records),
                Err(err) => {
                    if !should_retry(failure_count, &err, self.max_retries) {
                        return Err(err);
                    }
                    let delay = retry_delay(self.retry_base_delay, failure_count);
                    failure_count += 1;
                    warn!(?key, attempt = failure_count, "Failed to fetch list, retrying in {}ms: {err}", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/**
 * Whether a failed read is tried again. Authentication failures never are.
 *
 * # Arguments
 * `failure_count`: Failures seen before this one.
 * `error`: The latest failure.
 * `max_retries`: Retry budget.
 */
pub fn should_retry(failure_count: u32, error: &ApplicationError, max_retries: u32) -> bool {
    !error.is_authentication_failure() && failure_count < max_retries
}

fn retry_delay(base: Duration, failure_count: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(failure_count)).min(MAX_RETRY_DELAY)
}

//! Concurrent provider fan-out with caching and standardization.
//!
//! Each configured provider runs as its own task:
//!
//! ```text
//! CacheCheck ─ hit ──────────────────────────────────▶ Done(cached)
//!      └─ miss ─▶ Fetching ─▶ Standardizing ─▶ Store ─▶ Done(fresh)
//!                     └──────────┴── failure ────────▶ Done(error)
//! ```
//!
//! Tasks are spawned, so abandoning a request does not undo cache writes
//! that already happened or are in flight. Results are reassembled in
//! configuration order once every task has settled.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cache::{normalize_address_key, ResponseCache};
use crate::errors::{FetchError, ProviderError};
use crate::models::{AggregateResponse, CanonicalPropertyRecord, ProviderResult};
use crate::provider::PropertyProvider;
use crate::standardizer::normalize;

/// Tuning for per-provider tasks.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorOptions {
    /// Extra attempts for retryable provider errors.
    pub retries: usize,
    /// Delay before retry `n` is `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Hard deadline for one provider call, on top of the client's own timeout.
    pub deadline: Duration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_backoff: Duration::from_millis(250),
            deadline: Duration::from_secs(15),
        }
    }
}

/// Message used when a provider task dies without producing an outcome.
const INTERRUPTED_MESSAGE: &str = "Provider lookup was interrupted";

pub struct Aggregator {
    providers: Vec<Arc<dyn PropertyProvider>>,
    cache: Arc<ResponseCache>,
    options: AggregatorOptions,
}

impl Aggregator {
    /// Providers are queried, and reported, in the order given.
    pub fn new(
        providers: Vec<Arc<dyn PropertyProvider>>,
        cache: Arc<ResponseCache>,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            providers,
            cache,
            options,
        }
    }

    /// Query every provider for `address` and merge the outcomes.
    ///
    /// Never fails: each provider's failure becomes an error entry.
    pub async fn handle_request(&self, address: &str) -> AggregateResponse {
        let started = Instant::now();
        info!(
            "Looking up \"{}\" across {} providers",
            address,
            self.providers.len()
        );

        let tasks: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                tokio::spawn(resolve(
                    Arc::clone(provider),
                    Arc::clone(&self.cache),
                    self.options,
                    address.to_string(),
                ))
            })
            .collect();

        let outcomes = join_all(tasks).await;

        let mut response = AggregateResponse::default();
        for (provider, outcome) in self.providers.iter().zip(outcomes) {
            let result = outcome.unwrap_or_else(|e| {
                warn!("{} task ended abnormally: {}", provider.name(), e);
                ProviderResult::error(INTERRUPTED_MESSAGE)
            });
            response.providers.insert(provider.name().to_string(), result);
        }

        response.normalized_address = response
            .providers
            .values()
            .filter_map(ProviderResult::record)
            .find_map(|record| record.address.clone());

        info!(
            "Lookup finished in {:.2}s ({} of {} providers failed)",
            started.elapsed().as_secs_f64(),
            response.failed_count(),
            response.len()
        );

        response
    }
}

/// Run one provider's task to completion.
async fn resolve(
    provider: Arc<dyn PropertyProvider>,
    cache: Arc<ResponseCache>,
    options: AggregatorOptions,
    address: String,
) -> ProviderResult {
    if let Some(record) = cache.get(provider.id(), &address).await {
        debug!("{}: cache hit", provider.name());
        return ProviderResult::cached(record);
    }
    debug!("{}: cache miss, fetching", provider.name());

    match fetch_with_retry(provider.as_ref(), &address, &options).await {
        Ok(record) => {
            store(&cache, provider.id(), &address, &record).await;
            ProviderResult::fresh(record)
        }
        Err(e) => {
            warn!("{} failed: {}", provider.name(), e);
            ProviderResult::error(e.user_message())
        }
    }
}

async fn fetch_with_retry(
    provider: &dyn PropertyProvider,
    address: &str,
    options: &AggregatorOptions,
) -> Result<CanonicalPropertyRecord, FetchError> {
    let mut attempt = 0;
    loop {
        match fetch_and_standardize(provider, address, options.deadline).await {
            Ok(record) => return Ok(record),
            Err(e) if e.is_retryable() && attempt < options.retries => {
                attempt += 1;
                warn!(
                    "{} attempt {} failed ({}), retrying",
                    provider.name(),
                    attempt,
                    e
                );
                tokio::time::sleep(options.retry_backoff * attempt as u32).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_and_standardize(
    provider: &dyn PropertyProvider,
    address: &str,
    deadline: Duration,
) -> Result<CanonicalPropertyRecord, FetchError> {
    let raw = tokio::time::timeout(deadline, provider.fetch_details(address))
        .await
        .map_err(|_| ProviderError::Timeout {
            provider: provider.name().to_string(),
        })??;

    Ok(normalize(&raw, provider.schema())?)
}

/// Cache under the requested address and, when it differs, under the
/// address the provider normalized it to.
async fn store(
    cache: &ResponseCache,
    provider_id: &str,
    address: &str,
    record: &CanonicalPropertyRecord,
) {
    let ttl = cache.default_ttl();
    cache.set(provider_id, address, record.clone(), ttl).await;

    if let Some(ref canonical) = record.address {
        if normalize_address_key(canonical) != normalize_address_key(address) {
            cache.set(provider_id, canonical, record.clone(), ttl).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawProviderRecord;
    use crate::provider::provider_one;
    use crate::standardizer::ProviderSchema;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        id: String,
        name: String,
        delay: Duration,
        outcome: Result<Value, ProviderError>,
        fail_first: usize,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn ok(name: &str, body: Value) -> Self {
            Self {
                id: name.to_lowercase().replace(' ', "_"),
                name: name.to_string(),
                delay: Duration::ZERO,
                outcome: Ok(body),
                fail_first: 0,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(name: &str, error: ProviderError) -> Self {
            Self {
                outcome: Err(error),
                ..Self::ok(name, Value::Null)
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn flaky(mut self, fail_first: usize) -> Self {
            self.fail_first = fail_first;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PropertyProvider for MockProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn schema(&self) -> &'static ProviderSchema {
            &provider_one::SCHEMA
        }

        async fn fetch_details(&self, _address: &str) -> Result<RawProviderRecord, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;

            if call < self.fail_first {
                return Err(ProviderError::NetworkFailure {
                    provider: self.name.clone(),
                    detail: "connection reset".to_string(),
                });
            }
            self.outcome.clone().map(RawProviderRecord::new)
        }
    }

    fn body(address: Option<&str>, square_footage: i64) -> Value {
        json!({
            "data": {
                "formattedAddress": address,
                "squareFootage": square_footage,
                "lotSizeSqFt": 87120,
                "bedrooms": 3
            }
        })
    }

    fn aggregator(providers: &[Arc<MockProvider>], cache: Arc<ResponseCache>) -> Aggregator {
        let providers = providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn PropertyProvider>)
            .collect();
        let options = AggregatorOptions {
            retry_backoff: Duration::from_millis(10),
            deadline: Duration::from_millis(300),
            ..Default::default()
        };
        Aggregator::new(providers, cache, options)
    }

    fn timeout_error(name: &str) -> ProviderError {
        ProviderError::Timeout {
            provider: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_one_entry_per_provider_in_config_order() {
        let providers = vec![
            Arc::new(MockProvider::failing("Gamma", timeout_error("Gamma"))),
            Arc::new(MockProvider::ok("Alpha", body(Some("1 Elm St"), 1200))),
            Arc::new(MockProvider::failing(
                "Beta",
                ProviderError::AuthFailure {
                    provider: "Beta".to_string(),
                },
            )),
        ];
        let agg = aggregator(&providers, Arc::new(ResponseCache::default()));

        let response = agg.handle_request("1 Elm St").await;

        assert_eq!(response.len(), 3);
        assert_eq!(response.failed_count(), 2);
        let names: Vec<&String> = response.providers.keys().collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
        assert_eq!(
            response.get("Beta").and_then(|r| r.error_message()),
            Some("Provider rejected the request")
        );
    }

    #[tokio::test]
    async fn test_all_providers_failing_still_reports_each() {
        let providers = vec![
            Arc::new(MockProvider::failing("A", timeout_error("A"))),
            Arc::new(MockProvider::failing("B", timeout_error("B"))),
        ];
        let agg = aggregator(&providers, Arc::new(ResponseCache::default()));

        let response = agg.handle_request("1 Elm St").await;
        assert_eq!(response.len(), 2);
        assert_eq!(response.failed_count(), 2);
        assert_eq!(response.normalized_address, None);
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let provider = Arc::new(MockProvider::ok("Provider 1", body(Some("123 Main St"), 1850)));
        let agg = aggregator(&[Arc::clone(&provider)], Arc::new(ResponseCache::default()));

        let first = agg.handle_request("123 Main St").await;
        let second = agg.handle_request("123  main st").await;

        let first = first.get("Provider 1").unwrap();
        let second = second.get("Provider 1").unwrap();
        assert!(!first.is_cached());
        assert!(second.is_cached());
        assert_eq!(first.record(), second.record());
        assert_eq!(first.record().unwrap().lot_size_acres, Some(2.0));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_one_fresh_fetch() {
        let provider = Arc::new(MockProvider::ok("Provider 1", body(Some("123 Main St"), 1850)));
        let cache = Arc::new(ResponseCache::new(Duration::from_millis(50)));
        let agg = aggregator(&[Arc::clone(&provider)], cache);

        agg.handle_request("123 Main St").await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let response = agg.handle_request("123 Main St").await;

        assert!(!response.get("Provider 1").unwrap().is_cached());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_does_not_hold_back_other_providers() {
        let slow = Arc::new(
            MockProvider::ok("A", body(Some("1 Elm St"), 1000)).delayed(Duration::from_secs(10)),
        );
        let fast = Arc::new(MockProvider::ok("B", body(Some("1 Elm Street"), 1100)));
        let agg = aggregator(&[slow, fast], Arc::new(ResponseCache::default()));

        let started = Instant::now();
        let response = agg.handle_request("1 Elm St").await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            response.get("A").and_then(|r| r.error_message()),
            Some("Provider did not respond in time")
        );
        let b = response.get("B").and_then(|r| r.record()).unwrap();
        assert_eq!(b.square_footage, Some(1100));
        assert_eq!(response.normalized_address.as_deref(), Some("1 Elm Street"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_are_queried_concurrently() {
        let delay = Duration::from_secs(1);
        let providers: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|name| {
                Arc::new(MockProvider::ok(name, body(Some("1 Elm St"), 900)).delayed(delay))
            })
            .collect();
        let options = AggregatorOptions {
            deadline: Duration::from_secs(10),
            ..Default::default()
        };
        let agg = Aggregator::new(
            providers
                .iter()
                .map(|p| Arc::clone(p) as Arc<dyn PropertyProvider>)
                .collect(),
            Arc::new(ResponseCache::default()),
            options,
        );

        let started = tokio::time::Instant::now();
        let response = agg.handle_request("1 Elm St").await;
        let elapsed = started.elapsed();

        assert_eq!(response.failed_count(), 0);
        assert!(providers.iter().all(|p| p.calls() == 1));
        // Sequential fetching would take three delays.
        assert!(elapsed >= delay);
        assert!(elapsed < delay * 2, "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_normalized_address_follows_config_order() {
        // A has no address; B does.
        let a = Arc::new(MockProvider::ok("A", body(None, 1000)));
        let b = Arc::new(MockProvider::ok("B", body(Some("9 Oak Ave"), 1000)));
        let agg = aggregator(&[a, b], Arc::new(ResponseCache::default()));
        let response = agg.handle_request("9 oak ave").await;
        assert_eq!(response.normalized_address.as_deref(), Some("9 Oak Ave"));

        // Both have one; the first configured wins even if it finishes last.
        let a = Arc::new(
            MockProvider::ok("A", body(Some("9 Oak Avenue"), 1000))
                .delayed(Duration::from_millis(100)),
        );
        let b = Arc::new(MockProvider::ok("B", body(Some("9 OAK AVE"), 1000)));
        let agg = aggregator(&[a, b], Arc::new(ResponseCache::default()));
        let response = agg.handle_request("9 oak ave").await;
        assert_eq!(response.normalized_address.as_deref(), Some("9 Oak Avenue"));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let provider = Arc::new(MockProvider::failing(
            "Provider 1",
            ProviderError::NetworkFailure {
                provider: "Provider 1".to_string(),
                detail: "connection refused".to_string(),
            },
        ));
        let cache = Arc::new(ResponseCache::default());
        let agg = aggregator(&[Arc::clone(&provider)], Arc::clone(&cache));

        agg.handle_request("123 Main St").await;
        agg.handle_request("123 Main St").await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_standardization_error_is_provider_scoped() {
        let corrupt = Arc::new(MockProvider::ok("A", json!({ "data": "corrupt" })));
        let good = Arc::new(MockProvider::ok("B", body(Some("1 Elm St"), 900)));
        let cache = Arc::new(ResponseCache::default());
        let mut agg = aggregator(&[Arc::clone(&corrupt), good], Arc::clone(&cache));
        agg.options.retries = 3;

        let response = agg.handle_request("1 Elm St").await;

        assert_eq!(
            response.get("A").and_then(|r| r.error_message()),
            Some("Provider returned data in an unexpected format")
        );
        assert!(response.get("B").and_then(|r| r.record()).is_some());
        // Never retried.
        assert_eq!(corrupt.calls(), 1);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried() {
        let provider = Arc::new(MockProvider::ok("A", body(Some("1 Elm St"), 900)).flaky(1));
        let mut agg = aggregator(&[Arc::clone(&provider)], Arc::new(ResponseCache::default()));
        agg.options.retries = 1;

        let response = agg.handle_request("1 Elm St").await;

        assert!(response.get("A").and_then(|r| r.record()).is_some());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_canonical_address_shares_cache_entry() {
        let provider = Arc::new(MockProvider::ok(
            "A",
            body(Some("123 Main Street, Boston, MA 02101"), 1850),
        ));
        let agg = aggregator(&[Arc::clone(&provider)], Arc::new(ResponseCache::default()));

        agg.handle_request("123 main st boston").await;
        let response = agg
            .handle_request("123 MAIN STREET,  BOSTON, MA 02101")
            .await;

        assert!(response.get("A").unwrap().is_cached());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_request_keeps_cache_writes() {
        let fast = Arc::new(MockProvider::ok("Fast", body(Some("1 Elm St"), 900)));
        let slow = Arc::new(
            MockProvider::ok("Slow", body(Some("1 Elm St"), 950))
                .delayed(Duration::from_millis(150)),
        );
        let cache = Arc::new(ResponseCache::default());
        let agg = aggregator(&[Arc::clone(&fast), Arc::clone(&slow)], Arc::clone(&cache));

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), agg.handle_request("1 Elm St")).await;
        assert!(abandoned.is_err());

        assert!(cache.get(fast.id(), "1 Elm St").await.is_some());

        // The slow task was not cancelled and still commits.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(cache.get(slow.id(), "1 Elm St").await.is_some());
    }
}

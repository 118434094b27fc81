// crashlog-sleuth - core/cache.rs
//
// Fingerprint-keyed memoization of analyzer results. At most one
// concurrent computation runs per key; a second requester for the same key
// awaits the first rather than recomputing. Failed results are never
// cached, so a later (non-concurrent) call retries.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tokio::sync::Notify;

use super::model::AnalysisResult;
use crate::util::constants::DEFAULT_CACHE_MAX_ENTRIES;
use crate::util::error::AnalyzerError;

/// Content fingerprint used as the first component of a cache key.
pub fn fingerprint(content: &str) -> String {
    let normalized = content.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{digest:x}")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub log_fingerprint: String,
    pub analyzer_name: String,
    pub analyzer_input_version: u32,
}

enum Slot {
    Pending(Arc<Notify>),
    Ready(AnalysisResult),
}

struct CacheState {
    map: HashMap<CacheKey, Slot>,
    order: VecDeque<CacheKey>,
}

impl CacheState {
    fn touch(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }
}

/// Bounded LRU cache of successful `AnalysisResult`s, keyed by
/// `(log_fingerprint, analyzer_name, analyzer_input_version)`.
pub struct ResultCache {
    state: Mutex<CacheState>,
    max_entries: usize,
}

impl ResultCache {
    pub fn new(max_entries: usize) -> Self {
        ResultCache {
            state: Mutex::new(CacheState {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Return the cached result for `key`, computing it via `compute` if
    /// absent. Concurrent callers for the same key share the in-flight
    /// computation.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<AnalysisResult, AnalyzerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisResult, AnalyzerError>>,
    {
        let mut compute = Some(compute);
        loop {
            let notify_to_await = {
                let mut state = self.state.lock().unwrap();
                match state.map.get(&key) {
                    Some(Slot::Ready(result)) => {
                        let result = result.clone();
                        state.touch(&key);
                        return Ok(result);
                    }
                    Some(Slot::Pending(notify)) => Some(Arc::clone(notify)),
                    None => {
                        let notify = Arc::new(Notify::new());
                        state.map.insert(key.clone(), Slot::Pending(notify));
                        None
                    }
                }
            };

            match notify_to_await {
                Some(notify) => {
                    notify.notified().await;
                    continue;
                }
                None => {
                    let compute = compute.take().expect("computed exactly once per slot claim");
                    return self.compute_and_store(key, compute).await;
                }
            }
        }
    }

    async fn compute_and_store<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<AnalysisResult, AnalyzerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisResult, AnalyzerError>>,
    {
        let result = compute().await;

        let mut state = self.state.lock().unwrap();
        let notify = match state.map.remove(&key) {
            Some(Slot::Pending(notify)) => notify,
            _ => Arc::new(Notify::new()),
        };

        match &result {
            Ok(value) if value.success() => {
                state.map.insert(key.clone(), Slot::Ready(value.clone()));
                state.order.push_back(key.clone());
                if state.order.len() > self.max_entries {
                    if let Some(evicted) = state.order.pop_front() {
                        state.map.remove(&evicted);
                    }
                }
            }
            _ => {
                // Not cached: a later caller retries from scratch.
            }
        }
        drop(state);
        notify.notify_waiters();
        result
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        ResultCache::new(DEFAULT_CACHE_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn success_result(name: &str) -> AnalysisResult {
        AnalysisResult::Generic {
            analyzer_name: name.to_string(),
            success: true,
            has_findings: false,
            report_lines: Vec::new(),
            data: StdHashMap::new(),
            errors: Vec::new(),
        }
    }

    fn key(name: &str) -> CacheKey {
        CacheKey {
            log_fingerprint: fingerprint("some crash log content"),
            analyzer_name: name.to_string(),
            analyzer_input_version: 1,
        }
    }

    #[test]
    fn fingerprint_is_case_and_whitespace_insensitive() {
        assert_eq!(fingerprint("  Hello World  "), fingerprint("hello world"));
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }

    #[tokio::test]
    async fn caches_successful_results() {
        let cache = ResultCache::new(16);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            cache
                .get_or_compute(key("version"), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(success_result("version"))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_cache_failed_results() {
        let cache = ResultCache::new(16);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let _ = cache
                .get_or_compute(key("suspect"), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(AnalyzerError::Failed {
                        analyzer_name: "suspect".to_string(),
                        message: "boom".to_string(),
                    })
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_compute_at_most_once() {
        let cache = Arc::new(ResultCache::new(16));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key("plugin"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok(success_result("plugin"))
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_used_entry_past_capacity() {
        let cache = ResultCache::new(2);
        for name in ["a", "b", "c"] {
            cache
                .get_or_compute(key(name), || async move { Ok(success_result(name)) })
                .await
                .unwrap();
        }
        let state = cache.state.lock().unwrap();
        assert_eq!(state.map.len(), 2);
        assert!(!state.map.contains_key(&key("a")));
    }
}

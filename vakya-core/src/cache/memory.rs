//! In-process LRU tier

use super::CacheTier;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use vakya_common::{AnalysisResult, CacheTierId, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
}

struct Inner {
    map: HashMap<String, AnalysisResult>,
    /// Recency order, least recent at the front
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Inner {
    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }
}

pub struct MemoryTier {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl MemoryTier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    pub async fn stats(&self) -> MemoryStats {
        let inner = self.inner.lock().await;
        MemoryStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            len: inner.map.len(),
        }
    }
}

#[async_trait]
impl CacheTier for MemoryTier {
    fn id(&self) -> CacheTierId {
        CacheTierId::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<AnalysisResult>> {
        let mut inner = self.inner.lock().await;
        match inner.map.get(key).cloned() {
            Some(result) => {
                inner.hits += 1;
                inner.touch(key);
                Ok(Some(result))
            }
            None => {
                inner.misses += 1;
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, result: &AnalysisResult) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.map.contains_key(key) && inner.map.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
                inner.evictions += 1;
            }
        }
        inner.map.insert(key.to_string(), result.clone());
        inner.touch(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_result;
    use super::*;

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let tier = MemoryTier::new(2);
        tier.put("a", &sample_result("a")).await.unwrap();
        tier.put("b", &sample_result("b")).await.unwrap();
        // Refresh "a" so "b" becomes the eviction victim
        assert!(tier.get("a").await.unwrap().is_some());
        tier.put("c", &sample_result("c")).await.unwrap();

        assert!(tier.get("a").await.unwrap().is_some());
        assert!(tier.get("b").await.unwrap().is_none());
        assert!(tier.get("c").await.unwrap().is_some());

        let stats = tier.stats().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.len, 2);
    }

    #[tokio::test]
    async fn overwrite_does_not_evict() {
        let tier = MemoryTier::new(2);
        tier.put("a", &sample_result("a")).await.unwrap();
        tier.put("b", &sample_result("b")).await.unwrap();
        tier.put("a", &sample_result("a2")).await.unwrap();
        assert_eq!(tier.stats().await.evictions, 0);
        let hit = tier.get("a").await.unwrap().unwrap();
        assert_eq!(hit.normalized_slp1, "a2");
    }

    #[tokio::test]
    async fn counts_hits_and_misses() {
        let tier = MemoryTier::new(4);
        tier.put("a", &sample_result("a")).await.unwrap();
        tier.get("a").await.unwrap();
        tier.get("nope").await.unwrap();
        let stats = tier.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}

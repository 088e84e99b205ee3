//! Shared TTL tier
//!
//! Stands between the per-process LRU and the durable corpus: entries live
//! for a fixed TTL and expire lazily. The tier presents the same interface a
//! networked cache would, so swapping in an external store only touches this
//! file.

use super::CacheTier;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use vakya_common::{AnalysisResult, CacheTierId, Result};

pub struct SharedTier {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, AnalysisResult)>>,
}

impl SharedTier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheTier for SharedTier {
    fn id(&self) -> CacheTierId {
        CacheTierId::Shared
    }

    async fn get(&self, key: &str) -> Result<Option<AnalysisResult>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((stored, result)) if stored.elapsed() < self.ttl => Ok(Some(result.clone())),
            _ => Ok(None),
        }
    }

    async fn put(&self, key: &str, result: &AnalysisResult) -> Result<()> {
        let mut entries = self.entries.write().await;
        // Expired entries are dropped whenever we hold the write lock anyway
        let ttl = self.ttl;
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        entries.insert(key.to_string(), (Instant::now(), result.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_result;
    use super::*;

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let tier = SharedTier::new(Duration::from_millis(30));
        tier.put("k", &sample_result("x")).await.unwrap();
        assert!(tier.get("k").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tier.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_swept_on_write() {
        let tier = SharedTier::new(Duration::from_millis(10));
        tier.put("old", &sample_result("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        tier.put("new", &sample_result("b")).await.unwrap();
        assert_eq!(tier.len().await, 1);
    }
}

//! Tiered result cache
//!
//! Three tiers, fastest first: an in-process LRU, a TTL-bounded shared
//! tier, and the durable corpus database. Lookups stop at the first hit and
//! asynchronously promote the entry into the faster tiers; writes go through
//! every tier. Tier failures degrade the cache, never the analysis.

mod corpus;
mod memory;
mod shared;

pub use corpus::{CorpusStats, CorpusTier, SearchHit};
pub use memory::{MemoryStats, MemoryTier};
pub use shared::SharedTier;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use vakya_common::{AnalysisResult, CacheTierId, Result};

/// One cache tier. Implementations must be cheap to clone behind an `Arc`
/// and safe to call concurrently.
#[async_trait]
pub trait CacheTier: Send + Sync {
    fn id(&self) -> CacheTierId;

    async fn get(&self, key: &str) -> Result<Option<AnalysisResult>>;

    async fn put(&self, key: &str, result: &AnalysisResult) -> Result<()>;
}

/// The tier chain. Also holds a typed handle to the corpus tier for the
/// operations that only make sense against durable storage (search, stats,
/// lookup by sentence id, recording human resolutions).
pub struct TieredCache {
    tiers: Vec<Arc<dyn CacheTier>>,
    corpus: Option<Arc<CorpusTier>>,
}

impl TieredCache {
    /// `tiers` is ordered fastest first and should include `corpus` (as its
    /// last element) when one is configured.
    pub fn new(tiers: Vec<Arc<dyn CacheTier>>, corpus: Option<Arc<CorpusTier>>) -> Self {
        Self { tiers, corpus }
    }

    pub fn corpus(&self) -> Option<&Arc<CorpusTier>> {
        self.corpus.as_ref()
    }

    /// Look `key` up, fastest tier first. On a hit in a slower tier the
    /// entry is promoted into every faster tier in the background; the hit
    /// itself is returned immediately. A failing tier is skipped.
    pub async fn get(&self, key: &str) -> Option<(AnalysisResult, CacheTierId)> {
        for (depth, tier) in self.tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(Some(mut result)) => {
                    let id = tier.id();
                    debug!(key, tier = id.as_str(), "cache hit");
                    if depth > 0 {
                        self.promote(key, &result, depth);
                    }
                    result.cache_tier = id;
                    return Some((result, id));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(key, tier = tier.id().as_str(), error = %e, "cache tier lookup failed");
                }
            }
        }
        debug!(key, "cache miss");
        None
    }

    /// Write-through to every tier. Failures are logged and swallowed; a
    /// result that cannot be cached is still a valid result.
    pub async fn put(&self, key: &str, result: &AnalysisResult) {
        for tier in &self.tiers {
            if let Err(e) = tier.put(key, result).await {
                warn!(key, tier = tier.id().as_str(), error = %e, "cache tier write failed");
            }
        }
    }

    /// Fire-and-forget promotion into the tiers above `depth`.
    fn promote(&self, key: &str, result: &AnalysisResult, depth: usize) {
        let faster: Vec<Arc<dyn CacheTier>> = self.tiers[..depth].to_vec();
        let key = key.to_string();
        let result = result.clone();
        tokio::spawn(async move {
            for tier in faster {
                if let Err(e) = tier.put(&key, &result).await {
                    warn!(key, tier = tier.id().as_str(), error = %e, "cache promotion failed");
                }
            }
        });
    }
}

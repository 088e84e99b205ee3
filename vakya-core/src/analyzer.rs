//! Analysis orchestrator
//!
//! Ties the layers together: normalization, cache lookup, ensemble
//! combination, disambiguation, and write-through caching. This is the only
//! type binaries need to touch.

use crate::cache::{CorpusStats, CorpusTier, MemoryTier, SearchHit, SharedTier, TieredCache};
use crate::cache::CacheTier;
use crate::config::Config;
use crate::disambiguate::DisambiguationPipeline;
use crate::ensemble::{band_for, EnsembleCombiner};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use vakya_common::{
    cache_key, normalize_slp1, AnalysisRequest, AnalysisResult, CacheTierId, CandidateParse,
    ConfidenceMetrics, Error, Resolution, Result, ScriptForm,
};

pub struct Analyzer {
    config: Config,
    combiner: EnsembleCombiner,
    pipeline: DisambiguationPipeline,
    cache: TieredCache,
}

impl Analyzer {
    /// Build a full analyzer from configuration: HTTP engine adapters, the
    /// default rule set and model arbiter, and the configured cache tiers.
    pub async fn new(config: Config) -> Result<Self> {
        let combiner = EnsembleCombiner::from_config(&config)?;
        let pipeline = DisambiguationPipeline::from_config(&config.disambiguation)?;
        let cache = build_cache(&config).await?;
        Ok(Self { config, combiner, pipeline, cache })
    }

    /// Assemble an analyzer from pre-built parts.
    pub fn with_parts(
        config: Config,
        combiner: EnsembleCombiner,
        pipeline: DisambiguationPipeline,
        cache: TieredCache,
    ) -> Self {
        Self { config, combiner, pipeline, cache }
    }

    /// Analyze one sentence: normalize, consult the cache, run the ensemble
    /// and the disambiguation pipeline, store and return the result.
    #[instrument(skip(self, request), fields(mode = request.mode.as_str()))]
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("empty input text".to_string()));
        }
        let normalized = normalize_slp1(text);
        if normalized.is_empty() {
            return Err(Error::InvalidInput(format!(
                "no analyzable Sanskrit content in {text:?}"
            )));
        }

        let key = cache_key(&normalized, request.mode);
        if !request.bypass_cache {
            if let Some((result, tier)) = self.cache.get(&key).await {
                info!(key, tier = tier.as_str(), "served from cache");
                return Ok(result);
            }
        }

        let outcome = self
            .combiner
            .analyze(&normalized, request.engines.as_deref())
            .await?;
        let n_resp = outcome.responders.len();

        let mut forest = outcome.forest;
        forest.truncate(self.config.max_candidates(request.mode));

        let pipe = self
            .pipeline
            .run(forest, outcome.band, &normalized, request.context.as_deref())
            .await;

        let (forest, selected, resolution) =
            self.trim_for_mode(pipe.forest, pipe.selected, pipe.resolution, request.mode);

        // Confidence metrics describe the parse this result stands behind
        let reference: Option<&CandidateParse> = match selected {
            Some(i) => forest.get(i),
            None => forest.first(),
        };
        let (overall, backers) = reference
            .map(|c| (c.confidence, c.engine_votes.len().max(1)))
            .unwrap_or((0.0, 0));
        let confidence = ConfidenceMetrics {
            overall,
            engine_agreement: if n_resp == 0 { 0.0 } else { backers as f64 / n_resp as f64 },
            band: band_for(backers, n_resp),
        };

        let result = AnalysisResult {
            sentence_id: uuid::Uuid::new_v4().to_string(),
            original_text: text.to_string(),
            normalized_slp1: normalized,
            scripts: ScriptForm::from_text(text),
            mode: request.mode,
            forest,
            selected,
            confidence,
            resolution,
            needs_human_review: pipe.needs_human_review,
            review_reason: pipe.review_reason,
            cache_tier: CacheTierId::None,
            version: 1,
        };

        self.cache.put(&key, &result).await;
        info!(
            sentence_id = %result.sentence_id,
            candidates = result.forest.len(),
            confidence = result.confidence.overall,
            review = result.needs_human_review,
            "analysis complete"
        );
        Ok(result)
    }

    /// Apply a human reviewer's selection to a stored analysis, producing
    /// and persisting a new version.
    pub async fn resolve(&self, sentence_id: &str, index: usize) -> Result<AnalysisResult> {
        let corpus = self.require_corpus()?;
        let (key, stored) = corpus
            .find_by_sentence(sentence_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("sentence {sentence_id}")))?;
        let resolved = stored.with_human_selection(index)?;
        corpus.record_resolution(&key, &resolved).await?;
        // Refresh the faster tiers so subsequent lookups see the resolution
        self.cache.put(&key, &resolved).await;
        info!(sentence_id, index, version = resolved.version, "human resolution recorded");
        Ok(resolved)
    }

    /// Full-text search over the corpus.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        self.require_corpus()?.search(query, limit).await
    }

    pub async fn corpus_stats(&self) -> Result<CorpusStats> {
        self.require_corpus()?.stats().await
    }

    /// Probe each engine with a trivial sentence.
    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        let mut status = BTreeMap::new();
        for engine in self.combiner.engines() {
            let healthy = engine.analyze("om").await.is_ok();
            status.insert(engine.name().to_string(), healthy);
        }
        status
    }

    fn require_corpus(&self) -> Result<&Arc<CorpusTier>> {
        self.cache
            .corpus()
            .ok_or_else(|| Error::Config("corpus tier is disabled".to_string()))
    }

    /// Production mode returns only the winning parse; the study modes keep
    /// the forest for inspection.
    fn trim_for_mode(
        &self,
        forest: Vec<CandidateParse>,
        selected: Option<usize>,
        resolution: Resolution,
        mode: vakya_common::AnalysisMode,
    ) -> (Vec<CandidateParse>, Option<usize>, Resolution) {
        if self.config.returns_all_candidates(mode) {
            return (forest, selected, resolution);
        }
        match selected {
            Some(i) if i < forest.len() => {
                let score = resolution.rule_scores.get(i).copied();
                let mut forest = forest;
                let chosen = forest.swap_remove(i);
                let mut resolution = resolution;
                resolution.rule_scores = score.into_iter().collect();
                (vec![chosen], Some(0), resolution)
            }
            // Unresolved results keep their candidates so a reviewer can pick
            _ => (forest, selected, resolution),
        }
    }
}

async fn build_cache(config: &Config) -> Result<TieredCache> {
    let mut tiers: Vec<Arc<dyn CacheTier>> = Vec::new();
    tiers.push(Arc::new(MemoryTier::new(config.cache.memory_capacity)));
    if config.cache.shared_enabled {
        tiers.push(Arc::new(SharedTier::new(Duration::from_secs(
            config.cache.shared_ttl_secs,
        ))));
    }
    let corpus = if config.cache.corpus_enabled {
        let tier = Arc::new(CorpusTier::open(&config.corpus_path()).await?);
        tiers.push(tier.clone());
        Some(tier)
    } else {
        None
    };
    Ok(TieredCache::new(tiers, corpus))
}

//! Shared test fixtures: stub engines and analyzer assembly.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use vakya_common::{
    AgreementBand, AnalysisMode, AnalysisResult, BaseWord, CacheTierId, CandidateParse,
    ConfidenceMetrics, Resolution, SandhiGroup, ScriptForm,
};
use vakya_core::cache::{CacheTier, CorpusTier, MemoryTier, TieredCache};
use vakya_core::config::Config;
use vakya_core::disambiguate::{default_rules, DisambiguationPipeline};
use vakya_core::engines::{Engine, EngineFailure, FailureReason};
use vakya_core::{Analyzer, EngineSlot, EnsembleCombiner};

/// Engine stub returning a fixed answer.
pub struct StubEngine {
    pub name: &'static str,
    pub output: Result<Vec<CandidateParse>, FailureReason>,
}

#[async_trait]
impl Engine for StubEngine {
    fn name(&self) -> &str {
        self.name
    }

    async fn analyze(&self, _slp1: &str) -> Result<Vec<CandidateParse>, EngineFailure> {
        self.output
            .clone()
            .map_err(|reason| EngineFailure::new(self.name, reason))
    }
}

pub fn parse_of(lemmas: &[&str], confidence: f64) -> CandidateParse {
    let groups = lemmas
        .iter()
        .map(|l| SandhiGroup::new(l, vec![BaseWord::new(l, l, 0.9)]))
        .collect();
    CandidateParse::new(groups, confidence)
}

pub fn slot(
    name: &'static str,
    weight: f64,
    output: Result<Vec<CandidateParse>, FailureReason>,
) -> EngineSlot {
    EngineSlot {
        engine: Arc::new(StubEngine { name, output }),
        weight,
        timeout: Duration::from_secs(1),
    }
}

/// Three engines unanimously proposing the same parse.
pub fn unanimous_slots(lemmas: &[&str]) -> Vec<EngineSlot> {
    vec![
        slot("grammar", 0.35, Ok(vec![parse_of(lemmas, 0.9)])),
        slot("morphology", 0.40, Ok(vec![parse_of(lemmas, 0.92)])),
        slot("lexicon", 0.25, Ok(vec![parse_of(lemmas, 0.85)])),
    ]
}

/// Analyzer over stub engines, without the model arbiter.
pub async fn test_analyzer(slots: Vec<EngineSlot>, db_path: Option<&Path>) -> Analyzer {
    let mut config = Config::default();
    config.cache.shared_enabled = false;
    config.cache.corpus_enabled = db_path.is_some();

    let mut tiers: Vec<Arc<dyn CacheTier>> = vec![Arc::new(MemoryTier::new(64))];
    let corpus = match db_path {
        Some(path) => {
            let tier = Arc::new(CorpusTier::open(path).await.expect("open corpus"));
            tiers.push(tier.clone());
            Some(tier)
        }
        None => None,
    };
    let cache = TieredCache::new(tiers, corpus);
    let pipeline =
        DisambiguationPipeline::new(default_rules(), None, config.disambiguation.clone());
    Analyzer::with_parts(config, EnsembleCombiner::new(slots), pipeline, cache)
}

/// Scratch directory for corpus databases, removed on drop.
pub fn test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp dir")
}

/// Minimal stored result for cache-level tests.
pub fn sample_result(slp1: &str, forest: Vec<CandidateParse>) -> AnalysisResult {
    AnalysisResult {
        sentence_id: uuid::Uuid::new_v4().to_string(),
        original_text: slp1.to_string(),
        normalized_slp1: slp1.to_string(),
        scripts: ScriptForm::from_slp1(slp1),
        mode: AnalysisMode::Production,
        forest,
        selected: None,
        confidence: ConfidenceMetrics {
            overall: 0.8,
            engine_agreement: 1.0,
            band: AgreementBand::High,
        },
        resolution: Resolution::none(),
        needs_human_review: false,
        review_reason: None,
        cache_tier: CacheTierId::None,
        version: 1,
    }
}

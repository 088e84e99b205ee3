//! Ensemble combination
//!
//! Queries all enabled engines concurrently, merges structurally equivalent
//! candidates across engines, and produces a confidence-ordered parse forest.
//!
//! Weighting: each engine carries a configured weight. When an engine fails
//! or times out, the remaining weights are renormalized over the responders
//! so that a 2-of-3 response still distributes a full 1.0 of weight. A
//! merged candidate's confidence is the weighted average of its
//! contributors' confidences (contributor weights renormalized again within
//! the group), then clamped into an agreement band:
//!
//! * all responders agree  -> High,   confidence floored at 0.95
//! * strict majority agrees -> Medium, confidence clamped to [0.70, 0.90]
//! * single backer among several responders -> Low, capped below 0.70

use crate::config::Config;
use crate::engines::{
    Engine, EngineFailure, FailureReason, GrammarEngine, LexiconEngine, MorphologyEngine,
};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use vakya_common::{AgreementBand, CandidateParse, Error, Result};

/// An engine registered with the combiner.
pub struct EngineSlot {
    pub engine: Arc<dyn Engine>,
    pub weight: f64,
    pub timeout: Duration,
}

/// What the ensemble produced for one sentence.
#[derive(Debug, Clone)]
pub struct EnsembleOutcome {
    /// Merged candidates, ordered by descending confidence with
    /// deterministic tie-breaks
    pub forest: Vec<CandidateParse>,
    /// Engines that responded, in registration order
    pub responders: Vec<String>,
    pub failures: Vec<EngineFailure>,
    /// Weights after renormalization over responders
    pub effective_weights: BTreeMap<String, f64>,
    /// Agreement band of the top candidate
    pub band: AgreementBand,
    /// Fraction of responders backing the top candidate
    pub engine_agreement: f64,
}

pub struct EnsembleCombiner {
    slots: Vec<EngineSlot>,
}

impl EnsembleCombiner {
    pub fn new(slots: Vec<EngineSlot>) -> Self {
        Self { slots }
    }

    /// Build the standard three-engine ensemble from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut slots = Vec::new();
        for (name, engine_config) in config.engines.enabled() {
            let engine: Arc<dyn Engine> = match name {
                "grammar" => Arc::new(GrammarEngine::new(engine_config)?),
                "morphology" => Arc::new(MorphologyEngine::new(engine_config)?),
                "lexicon" => Arc::new(LexiconEngine::new(engine_config)?),
                other => {
                    return Err(Error::Config(format!("unknown engine: {other}")));
                }
            };
            slots.push(EngineSlot {
                engine,
                weight: engine_config.weight,
                timeout: Duration::from_millis(engine_config.timeout_ms),
            });
        }
        Ok(Self::new(slots))
    }

    pub fn engines(&self) -> impl Iterator<Item = &Arc<dyn Engine>> {
        self.slots.iter().map(|s| &s.engine)
    }

    /// Run the ensemble over normalized SLP1 text.
    ///
    /// `subset` restricts which registered engines are consulted. Individual
    /// engine failures are absorbed into the outcome; only a total failure
    /// (zero responders) is an error.
    pub async fn analyze(
        &self,
        slp1: &str,
        subset: Option<&[String]>,
    ) -> Result<EnsembleOutcome> {
        let selected: Vec<&EngineSlot> = self
            .slots
            .iter()
            .filter(|s| match subset {
                Some(names) => names.iter().any(|n| n == s.engine.name()),
                None => true,
            })
            .collect();
        if selected.is_empty() {
            return Err(Error::InvalidInput(
                "requested engine subset matches no registered engine".to_string(),
            ));
        }

        let tasks = selected.iter().map(|slot| {
            let engine = Arc::clone(&slot.engine);
            let text = slp1.to_string();
            let timeout = slot.timeout;
            tokio::spawn(async move {
                let name = engine.name().to_string();
                match tokio::time::timeout(timeout, engine.analyze(&text)).await {
                    Ok(result) => (name, result),
                    Err(_) => {
                        let failure = EngineFailure::new(&name, FailureReason::Timeout);
                        (name, Err(failure))
                    }
                }
            })
        });

        let mut responders: Vec<(String, f64, Vec<CandidateParse>)> = Vec::new();
        let mut failures: Vec<EngineFailure> = Vec::new();
        for (slot, joined) in selected.iter().zip(join_all(tasks).await) {
            match joined {
                Ok((name, Ok(candidates))) => {
                    debug!(engine = %name, candidates = candidates.len(), "engine responded");
                    responders.push((name, slot.weight, candidates));
                }
                Ok((name, Err(failure))) => {
                    warn!(engine = %name, reason = %failure.reason, "engine failed");
                    failures.push(failure);
                }
                Err(join_err) => {
                    let name = slot.engine.name().to_string();
                    warn!(engine = %name, "engine task panicked: {join_err}");
                    failures.push(EngineFailure::new(
                        &name,
                        FailureReason::Unreachable(join_err.to_string()),
                    ));
                }
            }
        }

        if responders.is_empty() {
            return Err(Error::AllEnginesFailed(
                failures.iter().map(|f| f.to_string()).collect(),
            ));
        }

        let total_weight: f64 = responders.iter().map(|(_, w, _)| w).sum();
        let effective_weights: BTreeMap<String, f64> = responders
            .iter()
            .map(|(name, w, _)| (name.clone(), w / total_weight))
            .collect();

        let forest = merge(&responders, &effective_weights);
        let responder_names: Vec<String> = responders.iter().map(|(n, _, _)| n.clone()).collect();
        let n_resp = responder_names.len();

        let (band, agreement) = match forest.first() {
            Some(top) => {
                let backers = top.engine_votes.len();
                (band_for(backers, n_resp), backers as f64 / n_resp as f64)
            }
            None => (AgreementBand::Low, 0.0),
        };

        Ok(EnsembleOutcome {
            forest,
            responders: responder_names,
            failures,
            effective_weights,
            band,
            engine_agreement: agreement,
        })
    }
}

struct Group {
    /// (engine name, that engine's candidate with its own confidence)
    contributions: Vec<(String, CandidateParse)>,
}

/// Merge per-engine candidate lists by structural equivalence.
fn merge(
    responders: &[(String, f64, Vec<CandidateParse>)],
    effective_weights: &BTreeMap<String, f64>,
) -> Vec<CandidateParse> {
    let n_resp = responders.len();
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for (name, _, candidates) in responders {
        for candidate in candidates {
            let key = candidate.structural_key();
            let group = groups
                .entry(key)
                .or_insert_with(|| Group { contributions: Vec::new() });
            match group.contributions.iter_mut().find(|(n, _)| n == name) {
                // Same engine proposed the same structure twice: keep the
                // stronger instance
                Some((_, existing)) => {
                    if candidate.confidence > existing.confidence {
                        *existing = candidate.clone();
                    }
                }
                None => group.contributions.push((name.clone(), candidate.clone())),
            }
        }
    }

    let mut forest: Vec<CandidateParse> = groups
        .into_values()
        .map(|group| merge_group(group, effective_weights, n_resp))
        .collect();

    forest.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.engine_votes.len().cmp(&a.engine_votes.len()))
            .then_with(|| a.surface_text().cmp(&b.surface_text()))
    });
    forest
}

fn merge_group(
    group: Group,
    effective_weights: &BTreeMap<String, f64>,
    n_resp: usize,
) -> CandidateParse {
    let contributor_weight: f64 = group
        .contributions
        .iter()
        .map(|(name, _)| effective_weights.get(name).copied().unwrap_or(0.0))
        .sum();

    let mut weighted = 0.0;
    for (name, candidate) in &group.contributions {
        let w = effective_weights.get(name).copied().unwrap_or(0.0);
        weighted += (w / contributor_weight) * candidate.confidence;
    }

    let backers = group.contributions.len();
    let confidence = clamp_to_band(weighted, backers, n_resp);

    // Representative: the most confident contributor's structure, enriched
    // with morphology, roots, and senses the others supplied
    let representative = group
        .contributions
        .iter()
        .max_by(|(_, a), (_, b)| a.confidence.total_cmp(&b.confidence))
        .map(|(_, c)| c.clone())
        .unwrap_or_else(|| CandidateParse::new(Vec::new(), 0.0));

    let mut merged = enrich(representative, &group.contributions);
    merged.parse_id = uuid::Uuid::new_v4().to_string();
    merged.confidence = confidence;
    merged.engine_votes = group
        .contributions
        .iter()
        .map(|(name, c)| (name.clone(), c.confidence))
        .collect();
    merged
}

/// Agreement band for a candidate backed by `backers` of `n_resp` responders.
pub(crate) fn band_for(backers: usize, n_resp: usize) -> AgreementBand {
    if n_resp < 2 {
        // A lone responder cannot corroborate anything
        AgreementBand::Low
    } else if backers == n_resp {
        AgreementBand::High
    } else if backers * 2 > n_resp {
        AgreementBand::Medium
    } else {
        AgreementBand::Low
    }
}

fn clamp_to_band(confidence: f64, backers: usize, n_resp: usize) -> f64 {
    if n_resp < 2 {
        // Keep the engine's own confidence; the band alone signals the
        // missing quorum
        return confidence.clamp(0.0, 1.0);
    }
    match band_for(backers, n_resp) {
        AgreementBand::High => confidence.max(0.95).min(1.0),
        AgreementBand::Medium => confidence.clamp(0.70, 0.90),
        AgreementBand::Low => confidence.min(0.69).max(0.0),
    }
}

/// Fill gaps in the representative parse from other contributors: missing
/// morphology, dhatu data, and dictionary senses. Words align by flattened
/// position; lemma mismatch at a position skips enrichment for that word.
fn enrich(mut representative: CandidateParse, contributions: &[(String, CandidateParse)]) -> CandidateParse {
    for (_, other) in contributions {
        let other_words: Vec<_> = other.all_words().cloned().collect();
        let mut index = 0usize;
        for group in representative.groups.iter_mut() {
            for word in group.words.iter_mut() {
                if let Some(donor) = other_words.get(index) {
                    if donor.lemma == word.lemma {
                        if word.morph.is_none() && donor.morph.is_some() {
                            word.morph = donor.morph.clone();
                        }
                        if word.dhatu.is_none() && donor.dhatu.is_some() {
                            word.dhatu = donor.dhatu.clone();
                        }
                        for sense in &donor.meanings {
                            if !word.meanings.contains(sense) {
                                word.meanings.push(sense.clone());
                            }
                        }
                    }
                }
                index += 1;
            }
        }
    }
    representative
}

//! Staged disambiguation state machine
//!
//! Stage 1 (rules): a fast path accepts a clearly dominant candidate
//! outright; otherwise the deterministic rules score the candidates pairwise
//! and the forest is re-ranked by `confidence * (1 + rule_score)`. If the
//! adjusted winner clears the skip threshold with a margin, it is selected.
//!
//! Stage 2 (arbiter): the model arbiter ranks the top candidates. A valid
//! verdict selects; any abstention escalates.
//!
//! Stage 3 (human): the result is returned unresolved, flagged for review.
//! Human review never blocks analysis.

use super::arbiter::{Arbitration, ArbiterUnavailable, ModelArbiter};
use super::rules::{default_rules, DisambiguationRule, Preference, RuleContext};
use crate::config::DisambiguationConfig;
use async_trait::async_trait;
use tracing::{debug, info};
use vakya_common::{
    AgreementBand, CandidateParse, Resolution, ResolutionStage, Result, ReviewReason,
};

/// Arbiter seam, satisfied by [`ModelArbiter`] in production.
#[async_trait]
pub trait Arbiter: Send + Sync {
    fn max_candidates(&self) -> usize;

    async fn arbitrate(
        &self,
        slp1: &str,
        candidates: &[CandidateParse],
        context: Option<&str>,
    ) -> std::result::Result<Arbitration, ArbiterUnavailable>;
}

#[async_trait]
impl Arbiter for ModelArbiter {
    fn max_candidates(&self) -> usize {
        ModelArbiter::max_candidates(self)
    }

    async fn arbitrate(
        &self,
        slp1: &str,
        candidates: &[CandidateParse],
        context: Option<&str>,
    ) -> std::result::Result<Arbitration, ArbiterUnavailable> {
        ModelArbiter::arbitrate(self, slp1, candidates, context).await
    }
}

/// Where the pipeline landed for one forest.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Forest, possibly re-ranked by the rules stage
    pub forest: Vec<CandidateParse>,
    pub selected: Option<usize>,
    pub resolution: Resolution,
    pub needs_human_review: bool,
    pub review_reason: Option<ReviewReason>,
}

pub struct DisambiguationPipeline {
    rules: Vec<Box<dyn DisambiguationRule>>,
    arbiter: Option<Box<dyn Arbiter>>,
    config: DisambiguationConfig,
}

impl DisambiguationPipeline {
    pub fn new(
        rules: Vec<Box<dyn DisambiguationRule>>,
        arbiter: Option<Box<dyn Arbiter>>,
        config: DisambiguationConfig,
    ) -> Self {
        Self { rules, arbiter, config }
    }

    pub fn from_config(config: &DisambiguationConfig) -> Result<Self> {
        let arbiter: Option<Box<dyn Arbiter>> = if config.arbiter.enabled {
            Some(Box::new(ModelArbiter::new(&config.arbiter)?))
        } else {
            None
        };
        Ok(Self::new(default_rules(), arbiter, config.clone()))
    }

    /// Run the stages over an ensemble forest. The forest arrives ordered by
    /// descending confidence.
    pub async fn run(
        &self,
        forest: Vec<CandidateParse>,
        band: AgreementBand,
        slp1: &str,
        context: Option<&str>,
    ) -> PipelineOutcome {
        if forest.is_empty() {
            return PipelineOutcome {
                forest,
                selected: None,
                resolution: Resolution::none(),
                needs_human_review: true,
                review_reason: Some(ReviewReason::NoQuorum),
            };
        }

        // A singleton forest needs no disambiguation, only a confidence check
        if forest.len() == 1 {
            let weak = forest[0].confidence < self.config.review_threshold;
            return PipelineOutcome {
                forest,
                selected: Some(0),
                resolution: Resolution {
                    stage: ResolutionStage::Rules,
                    rule_scores: Vec::new(),
                    justification: None,
                },
                needs_human_review: weak,
                review_reason: weak.then_some(ReviewReason::LowConfidence),
            };
        }

        // Fast path: dominant top candidate with corroboration
        let top = forest[0].confidence;
        let runner_up = forest[1].confidence;
        if band != AgreementBand::Low
            && top >= self.config.skip_threshold
            && top - runner_up > self.config.epsilon
        {
            debug!(top, runner_up, "fast path selection");
            return PipelineOutcome {
                forest,
                selected: Some(0),
                resolution: Resolution {
                    stage: ResolutionStage::Rules,
                    rule_scores: Vec::new(),
                    justification: None,
                },
                needs_human_review: false,
                review_reason: None,
            };
        }

        // Stage 1: pairwise rule scoring and re-rank
        let (forest, scores) = self.apply_rules(forest, context);
        let adjusted: Vec<f64> = forest
            .iter()
            .zip(&scores)
            .map(|(c, s)| c.confidence * (1.0 + s))
            .collect();
        let winner = adjusted[0];
        let second = adjusted.get(1).copied().unwrap_or(0.0);
        if winner >= self.config.skip_threshold && winner - second >= self.config.rule_margin {
            info!(winner, second, "rules stage selected");
            return PipelineOutcome {
                forest,
                selected: Some(0),
                resolution: Resolution {
                    stage: ResolutionStage::Rules,
                    rule_scores: scores,
                    justification: None,
                },
                needs_human_review: false,
                review_reason: None,
            };
        }

        // Stage 2: model arbitration over the top candidates
        if let Some(arbiter) = &self.arbiter {
            let k = arbiter.max_candidates().min(forest.len());
            match arbiter.arbitrate(slp1, &forest[..k], context).await {
                Ok(Arbitration { choice, justification }) => {
                    info!(choice, "arbiter selected");
                    return PipelineOutcome {
                        forest,
                        selected: Some(choice),
                        resolution: Resolution {
                            stage: ResolutionStage::Arbiter,
                            rule_scores: scores,
                            justification: Some(justification),
                        },
                        needs_human_review: false,
                        review_reason: None,
                    };
                }
                Err(ArbiterUnavailable(reason)) => {
                    info!(%reason, "arbiter abstained, escalating to human review");
                    return PipelineOutcome {
                        forest,
                        selected: None,
                        resolution: Resolution {
                            stage: ResolutionStage::None,
                            rule_scores: scores,
                            justification: None,
                        },
                        needs_human_review: true,
                        review_reason: Some(ReviewReason::ArbiterAbstained),
                    };
                }
            }
        }

        // Stage 3: hand off to human review without blocking
        let reason = if band == AgreementBand::Low {
            ReviewReason::NoQuorum
        } else {
            ReviewReason::LowConfidence
        };
        PipelineOutcome {
            forest,
            selected: None,
            resolution: Resolution {
                stage: ResolutionStage::None,
                rule_scores: scores,
                justification: None,
            },
            needs_human_review: true,
            review_reason: Some(reason),
        }
    }

    /// Score every candidate pair under every rule, then reorder the forest
    /// by adjusted score, descending. Returns the reordered forest and the
    /// raw rule scores aligned to it.
    fn apply_rules(
        &self,
        forest: Vec<CandidateParse>,
        context: Option<&str>,
    ) -> (Vec<CandidateParse>, Vec<f64>) {
        let ctx = RuleContext { context };
        let n = forest.len();
        let mut scores = vec![0.0f64; n];
        for i in 0..n {
            for j in (i + 1)..n {
                for rule in &self.rules {
                    match rule.prefer(&forest[i], &forest[j], &ctx) {
                        Some(Preference::First) => scores[i] += rule.weight(),
                        Some(Preference::Second) => scores[j] += rule.weight(),
                        None => {}
                    }
                }
            }
        }

        // Stable sort keeps the incoming confidence order on ties
        let mut combined: Vec<(CandidateParse, f64)> = forest.into_iter().zip(scores).collect();
        combined.sort_by(|(a, sa), (b, sb)| {
            let adj_a = a.confidence * (1.0 + sa);
            let adj_b = b.confidence * (1.0 + sb);
            adj_b.total_cmp(&adj_a)
        });
        combined.into_iter().unzip()
    }
}

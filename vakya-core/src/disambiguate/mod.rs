//! Disambiguation pipeline
//!
//! Resolves a multi-candidate parse forest to a single selection through
//! staged escalation: deterministic linguistic rules first, then a local
//! language model as arbiter, and finally a non-blocking hand-off to human
//! review when neither stage is decisive.

mod arbiter;
mod pipeline;
mod rules;

pub use arbiter::{Arbitration, ArbiterUnavailable, ModelArbiter};
pub use pipeline::{Arbiter, DisambiguationPipeline, PipelineOutcome};
pub use rules::{
    default_rules, AgreementRule, DisambiguationRule, FrequencyRule, Preference, RuleContext,
    SandhiPreferenceRule,
};

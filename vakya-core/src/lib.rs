//! # Vakya Core
//!
//! Sanskrit sentence analysis engine:
//! - Engine adapters over external grammar, morphology, and lexicon services
//! - Weighted ensemble combination with structural candidate merging
//! - Staged disambiguation (rules, model arbiter, human review)
//! - Tiered result caching backed by a durable searchable corpus

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod disambiguate;
pub mod engines;
pub mod ensemble;

pub use analyzer::Analyzer;
pub use config::Config;
pub use ensemble::{EnsembleCombiner, EnsembleOutcome, EngineSlot};

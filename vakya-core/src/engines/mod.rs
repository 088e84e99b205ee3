//! Analysis engine adapters
//!
//! Each adapter wraps an external analysis service behind the [`Engine`]
//! trait, translating that service's response shape into the common
//! candidate-parse model. Adapters never panic on bad upstream data; every
//! failure mode maps to an [`EngineFailure`] the ensemble can account for.

use async_trait::async_trait;
use vakya_common::CandidateParse;

mod grammar;
mod lexicon;
mod morphology;

pub use grammar::GrammarEngine;
pub use lexicon::LexiconEngine;
pub use morphology::MorphologyEngine;

/// Why an engine produced no candidates for a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("timed out")]
    Timeout,
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A single engine's failure, tagged with the engine name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine {engine} {reason}")]
pub struct EngineFailure {
    pub engine: String,
    pub reason: FailureReason,
}

impl EngineFailure {
    pub fn new(engine: &str, reason: FailureReason) -> Self {
        Self { engine: engine.to_string(), reason }
    }
}

/// A Sanskrit analysis engine.
///
/// `analyze` receives normalized SLP1 text and returns zero or more
/// candidate parses with the engine's own confidence values. Returning an
/// empty vector is a valid response (the engine found no analysis); an
/// `EngineFailure` means the engine could not be consulted at all.
#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, slp1: &str) -> Result<Vec<CandidateParse>, EngineFailure>;
}

/// Map a reqwest error to the failure taxonomy.
pub(crate) fn transport_failure(engine: &str, err: reqwest::Error) -> EngineFailure {
    let reason = if err.is_timeout() {
        FailureReason::Timeout
    } else if err.is_decode() {
        FailureReason::Malformed(err.to_string())
    } else {
        FailureReason::Unreachable(err.to_string())
    };
    EngineFailure::new(engine, reason)
}

/// Shared HTTP client construction for adapters.
pub(crate) fn build_client(timeout_ms: u64) -> Result<reqwest::Client, vakya_common::Error> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| vakya_common::Error::Internal(format!("http client: {e}")))
}

//! Analysis request/result types shared across the workspace

use crate::parse::CandidateParse;
use crate::scripts::ScriptForm;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Analysis mode requested by the caller.
///
/// Modes differ in how many candidates are kept and returned, not in the
/// analysis itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Production,
    Educational,
    Academic,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Production => "production",
            AnalysisMode::Educational => "educational",
            AnalysisMode::Academic => "academic",
        }
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(AnalysisMode::Production),
            "educational" => Ok(AnalysisMode::Educational),
            "academic" => Ok(AnalysisMode::Academic),
            other => Err(format!("unknown analysis mode: {other}")),
        }
    }
}

/// An analysis request. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    #[serde(default)]
    pub mode: AnalysisMode,
    /// Optional surrounding context for disambiguation (previous sentence,
    /// topic, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Restrict the ensemble to this engine subset (None = all enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engines: Option<Vec<String>>,
    /// Skip cache lookup (the result is still stored)
    #[serde(default)]
    pub bypass_cache: bool,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: AnalysisMode::default(),
            context: None,
            engines: None,
            bypass_cache: false,
        }
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_engines(mut self, engines: Vec<String>) -> Self {
        self.engines = Some(engines);
        self
    }

    pub fn bypassing_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

/// How strongly the engines agreed on the top candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementBand {
    /// All responding engines proposed the same structure
    High,
    /// A strict majority agreed, at least one dissented
    Medium,
    /// No quorum: candidates each backed by a single engine
    Low,
}

/// Confidence metrics attached to a completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    pub overall: f64,
    /// Fraction of responding engines that backed the top candidate
    pub engine_agreement: f64,
    pub band: AgreementBand,
}

/// Stage at which a selection was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStage {
    /// No selection was possible
    None,
    Rules,
    Arbiter,
    Human,
}

/// Disambiguation provenance carried on every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub stage: ResolutionStage,
    /// Rule scores per candidate index, when the rules stage ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_scores: Vec<f64>,
    /// Arbiter's natural-language justification, when it decided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

impl Resolution {
    pub fn none() -> Self {
        Self { stage: ResolutionStage::None, rule_scores: Vec::new(), justification: None }
    }
}

/// Why a result was flagged for human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    LowConfidence,
    NoQuorum,
    ArbiterAbstained,
}

/// Cache tier a result was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTierId {
    Memory,
    Shared,
    Corpus,
    /// Freshly computed, not served from any tier
    None,
}

impl CacheTierId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTierId::Memory => "memory",
            CacheTierId::Shared => "shared",
            CacheTierId::Corpus => "corpus",
            CacheTierId::None => "none",
        }
    }
}

/// A complete analysis result.
///
/// Immutable after construction: a human override via `resolve` produces a
/// new value with `version + 1` rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sentence_id: String,
    pub original_text: String,
    pub normalized_slp1: String,
    pub scripts: ScriptForm,
    pub mode: AnalysisMode,
    /// Candidate parses, descending by confidence
    pub forest: Vec<CandidateParse>,
    /// Index of the selected parse after disambiguation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<usize>,
    pub confidence: ConfidenceMetrics,
    pub resolution: Resolution,
    pub needs_human_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<ReviewReason>,
    pub cache_tier: CacheTierId,
    pub version: u32,
}

impl AnalysisResult {
    /// The selected parse, falling back to the highest-confidence one.
    pub fn best_parse(&self) -> Option<&CandidateParse> {
        match self.selected {
            Some(i) => self.forest.get(i),
            None => self.forest.first(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.forest.len() > 1 && self.selected.is_none()
    }

    /// New result version recording a human selection.
    pub fn with_human_selection(&self, index: usize) -> crate::Result<AnalysisResult> {
        if index >= self.forest.len() {
            return Err(crate::Error::InvalidInput(format!(
                "parse index {index} out of range 0..{}",
                self.forest.len()
            )));
        }
        let mut next = self.clone();
        next.selected = Some(index);
        next.resolution = Resolution {
            stage: ResolutionStage::Human,
            rule_scores: Vec::new(),
            justification: None,
        };
        next.needs_human_review = false;
        next.review_reason = None;
        next.version = self.version + 1;
        Ok(next)
    }
}

/// Cache key: SHA-256 over `"{mode}:{normalized_slp1}"`, truncated to 32 hex
/// chars. Inputs differing only by script or whitespace hash identically
/// because normalization happens before keying.
pub fn cache_key(normalized_slp1: &str, mode: AnalysisMode) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mode.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(normalized_slp1.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..32].to_string()
}

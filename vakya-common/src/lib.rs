//! # Vakya Common Library
//!
//! Shared code for the vakya Sanskrit analysis workspace:
//! - Error types
//! - Multi-script text model and transliteration (SLP1 canonical)
//! - Candidate parse / parse forest / analysis result data model
//! - Cache key derivation

pub mod error;
pub mod parse;
pub mod result;
pub mod scripts;

pub use error::{Error, Result};
pub use parse::{BaseWord, CandidateParse, DhatuInfo, MorphTag, SandhiGroup, SandhiKind};
pub use result::{
    cache_key, AgreementBand, AnalysisMode, AnalysisRequest, AnalysisResult, CacheTierId,
    ConfidenceMetrics, Resolution, ResolutionStage, ReviewReason,
};
pub use scripts::{detect_script, normalize_slp1, to_slp1, Script, ScriptForm};

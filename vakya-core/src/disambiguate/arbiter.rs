//! Model arbiter
//!
//! Second disambiguation stage: a locally hosted language model ranks the
//! top candidates. The arbiter is strictly advisory; any transport error,
//! malformed reply, or out-of-range ranking is treated as an abstention and
//! escalates to human review instead of failing the analysis.

use crate::config::ArbiterConfig;
use serde::Deserialize;
use std::fmt::Write as _;
use tracing::{debug, warn};
use vakya_common::{CandidateParse, Result};

/// The arbiter's verdict over the candidate slice it was shown.
#[derive(Debug, Clone)]
pub struct Arbitration {
    /// Index into the candidate slice passed to `arbitrate`
    pub choice: usize,
    pub justification: String,
}

/// Abstention: why the arbiter produced no usable verdict.
#[derive(Debug, Clone, thiserror::Error)]
#[error("arbiter abstained: {0}")]
pub struct ArbiterUnavailable(pub String);

pub struct ModelArbiter {
    client: reqwest::Client,
    config: ArbiterConfig,
}

const SYSTEM_PROMPT: &str = "You are an expert in Sanskrit grammar and philology. \
You will be shown several candidate analyses of a Sanskrit sentence in SLP1 \
transliteration. Choose the most plausible analysis considering sandhi, \
morphological agreement, and semantic coherence. Respond with ONLY a JSON object \
of the form {\"ranking\": [best_index, ...], \"explanation\": \"one sentence\"}.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    ranking: Vec<usize>,
    #[serde(default)]
    explanation: String,
}

impl ModelArbiter {
    pub fn new(config: &ArbiterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| vakya_common::Error::Internal(format!("http client: {e}")))?;
        Ok(Self { client, config: config.clone() })
    }

    pub fn max_candidates(&self) -> usize {
        self.config.max_candidates
    }

    /// Ask the model to rank `candidates`. Never returns an index outside
    /// the slice.
    pub async fn arbitrate(
        &self,
        slp1: &str,
        candidates: &[CandidateParse],
        context: Option<&str>,
    ) -> std::result::Result<Arbitration, ArbiterUnavailable> {
        if candidates.len() < 2 {
            return Err(ArbiterUnavailable("nothing to arbitrate".to_string()));
        }

        let prompt = build_prompt(slp1, candidates, context);
        let url = format!("{}/api/generate", self.config.url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "system": SYSTEM_PROMPT,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": 500,
            },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ArbiterUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ArbiterUnavailable(format!("HTTP {}", response.status())));
        }
        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ArbiterUnavailable(e.to_string()))?;

        let verdict = parse_verdict(&generated.response)
            .ok_or_else(|| ArbiterUnavailable("unparseable verdict".to_string()))?;
        let choice = *verdict
            .ranking
            .first()
            .ok_or_else(|| ArbiterUnavailable("empty ranking".to_string()))?;
        if choice >= candidates.len() {
            warn!(choice, candidates = candidates.len(), "arbiter ranked out of range");
            return Err(ArbiterUnavailable(format!("index {choice} out of range")));
        }

        debug!(choice, "arbiter decided");
        Ok(Arbitration { choice, justification: verdict.explanation })
    }
}

fn build_prompt(slp1: &str, candidates: &[CandidateParse], context: Option<&str>) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Sentence (SLP1): {slp1}");
    if let Some(ctx) = context {
        let _ = writeln!(prompt, "Context: {ctx}");
    }
    let _ = writeln!(prompt, "\nCandidate analyses:");
    for (i, candidate) in candidates.iter().enumerate() {
        let _ = writeln!(prompt, "\n[{i}] confidence {:.2}", candidate.confidence);
        for group in &candidate.groups {
            for word in &group.words {
                let pos = word
                    .morph
                    .as_ref()
                    .and_then(|m| m.pos.as_deref())
                    .unwrap_or("?");
                let _ = write!(prompt, "  {} -> {} ({pos})", word.surface, word.lemma);
                if let Some(morph) = &word.morph {
                    let features: Vec<&str> = [&morph.case, &morph.number, &morph.gender, &morph.tense, &morph.person]
                        .into_iter()
                        .filter_map(|f| f.as_deref())
                        .collect();
                    if !features.is_empty() {
                        let _ = write!(prompt, " [{}]", features.join("."));
                    }
                }
                if let Some(first_sense) = word.meanings.first() {
                    let _ = write!(prompt, " \"{first_sense}\"");
                }
                let _ = writeln!(prompt);
            }
        }
    }
    let _ = writeln!(prompt, "\nWhich analysis is correct?");
    prompt
}

/// Extract the first JSON object embedded in free-form model output.
fn parse_verdict(text: &str) -> Option<Verdict> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vakya_common::{BaseWord, SandhiGroup};

    fn candidate(lemma: &str) -> CandidateParse {
        CandidateParse::new(
            vec![SandhiGroup::new(lemma, vec![BaseWord::new(lemma, lemma, 0.8)])],
            0.6,
        )
    }

    #[test]
    fn verdict_parses_from_surrounding_prose() {
        let text = "Sure! Here is my answer:\n{\"ranking\": [1, 0], \"explanation\": \"better sandhi\"} hope that helps";
        let verdict = parse_verdict(text).unwrap();
        assert_eq!(verdict.ranking, vec![1, 0]);
        assert_eq!(verdict.explanation, "better sandhi");
    }

    #[test]
    fn verdict_rejects_garbage() {
        assert!(parse_verdict("no json here").is_none());
        assert!(parse_verdict("{not valid json}").is_none());
        assert!(parse_verdict("}{").is_none());
    }

    #[test]
    fn prompt_lists_all_candidates() {
        let prompt = build_prompt(
            "rAmo gacCati",
            &[candidate("rAma"), candidate("rAmaka")],
            Some("epic narrative"),
        );
        assert!(prompt.contains("[0]"));
        assert!(prompt.contains("[1]"));
        assert!(prompt.contains("rAmaka"));
        assert!(prompt.contains("epic narrative"));
    }
}

//! Lexicon-backed segmentation engine adapter
//!
//! Wraps a dictionary-driven segmenter whose answers arrive as flat solution
//! lists: each solution is a sequence of entries carrying a stem, an
//! inflection note, and dictionary senses. Morphology is sparse compared to
//! the other engines, so the ensemble enrichment step fills it in when the
//! structures agree.

use super::{build_client, transport_failure, Engine, EngineFailure, FailureReason};
use crate::config::EngineConfig;
use async_trait::async_trait;
use serde::Deserialize;
use vakya_common::{BaseWord, CandidateParse, Result, SandhiGroup};

pub struct LexiconEngine {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct LexiconResponse {
    #[serde(default)]
    solutions: Vec<LexiconSolution>,
}

#[derive(Debug, Deserialize)]
struct LexiconSolution {
    #[serde(default = "default_solution_score")]
    score: f64,
    #[serde(default)]
    entries: Vec<LexiconEntry>,
}

fn default_solution_score() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
struct LexiconEntry {
    word: String,
    stem: String,
    #[serde(default)]
    senses: Vec<String>,
}

impl LexiconEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint: config.endpoint.clone(),
        })
    }

    fn convert(&self, response: LexiconResponse) -> Vec<CandidateParse> {
        response
            .solutions
            .into_iter()
            .filter(|s| !s.entries.is_empty())
            .map(|s| {
                let groups = s
                    .entries
                    .into_iter()
                    .map(|e| {
                        let mut word = BaseWord::new(&e.stem, &e.word, 1.0);
                        word.meanings = e.senses;
                        SandhiGroup::new(&e.word, vec![word])
                    })
                    .collect();
                CandidateParse::new(groups, s.score)
            })
            .collect()
    }
}

#[async_trait]
impl Engine for LexiconEngine {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn analyze(&self, slp1: &str) -> std::result::Result<Vec<CandidateParse>, EngineFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "sentence": slp1, "encoding": "SLP1" }))
            .send()
            .await
            .map_err(|e| transport_failure(self.name(), e))?;

        if !response.status().is_success() {
            return Err(EngineFailure::new(
                self.name(),
                FailureReason::Unreachable(format!("HTTP {}", response.status())),
            ));
        }

        let parsed: LexiconResponse = response
            .json()
            .await
            .map_err(|e| EngineFailure::new(self.name(), FailureReason::Malformed(e.to_string())))?;

        Ok(self.convert(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_solution_list() {
        let raw = serde_json::json!({
            "solutions": [{
                "score": 0.7,
                "entries": [
                    { "word": "rAmaH", "stem": "rAma", "senses": ["Rama", "pleasing"] },
                    { "word": "gacCati", "stem": "gam" }
                ]
            }]
        });
        let response: LexiconResponse = serde_json::from_value(raw).unwrap();
        let engine = LexiconEngine::new(&EngineConfig {
            endpoint: "http://localhost:1/x".into(),
            ..Default::default()
        })
        .unwrap();
        let parses = engine.convert(response);
        assert_eq!(parses.len(), 1);
        assert_eq!(parses[0].confidence, 0.7);
        assert_eq!(parses[0].lemmas(), vec!["rAma", "gam"]);
        assert_eq!(parses[0].groups[0].words[0].meanings.len(), 2);
    }

    #[test]
    fn missing_score_defaults() {
        let raw = serde_json::json!({
            "solutions": [{ "entries": [{ "word": "gOH", "stem": "go" }] }]
        });
        let response: LexiconResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.solutions[0].score, 0.5);
    }
}

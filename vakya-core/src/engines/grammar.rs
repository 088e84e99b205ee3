//! Rule-based grammar engine adapter
//!
//! Wraps a Paninian derivation service. The upstream response groups words
//! into sandhi chunks and carries structured morphology plus dhatu data, so
//! this adapter does the least translation work of the three.

use super::{build_client, transport_failure, Engine, EngineFailure, FailureReason};
use crate::config::EngineConfig;
use async_trait::async_trait;
use serde::Deserialize;
use vakya_common::{BaseWord, CandidateParse, DhatuInfo, MorphTag, Result, SandhiGroup, SandhiKind};

pub struct GrammarEngine {
    client: reqwest::Client,
    endpoint: String,
}

// Upstream response shape.

#[derive(Debug, Deserialize)]
struct GrammarResponse {
    #[serde(default)]
    parses: Vec<GrammarParse>,
}

#[derive(Debug, Deserialize)]
struct GrammarParse {
    score: f64,
    #[serde(default)]
    chunks: Vec<GrammarChunk>,
}

#[derive(Debug, Deserialize)]
struct GrammarChunk {
    surface: String,
    #[serde(default)]
    sandhi: Option<String>,
    #[serde(default)]
    sutra: Option<String>,
    #[serde(default)]
    words: Vec<GrammarWord>,
}

#[derive(Debug, Deserialize)]
struct GrammarWord {
    lemma: String,
    surface: String,
    #[serde(default)]
    tags: Option<GrammarTags>,
    #[serde(default)]
    root: Option<GrammarRoot>,
    #[serde(default)]
    glosses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GrammarTags {
    #[serde(default)]
    pos: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    case: Option<String>,
    #[serde(default)]
    person: Option<String>,
    #[serde(default)]
    tense: Option<String>,
    #[serde(default)]
    voice: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GrammarRoot {
    dhatu: String,
    #[serde(default)]
    gana: Option<u8>,
    #[serde(default)]
    pada: Option<String>,
    #[serde(default)]
    meaning: Option<String>,
}

impl GrammarEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint: config.endpoint.clone(),
        })
    }

    fn convert(&self, response: GrammarResponse) -> Vec<CandidateParse> {
        response
            .parses
            .into_iter()
            .filter(|p| !p.chunks.is_empty())
            .map(|p| {
                let groups = p.chunks.into_iter().map(convert_chunk).collect();
                CandidateParse::new(groups, p.score)
            })
            .collect()
    }
}

fn convert_chunk(chunk: GrammarChunk) -> SandhiGroup {
    let words = chunk
        .words
        .into_iter()
        .map(|w| {
            let mut word = BaseWord::new(&w.lemma, &w.surface, 1.0);
            word.morph = w.tags.map(|t| MorphTag {
                pos: t.pos,
                gender: t.gender,
                number: t.number,
                case: t.case,
                person: t.person,
                tense: t.tense,
                voice: t.voice,
                raw: None,
            });
            word.dhatu = w.root.map(|r| DhatuInfo {
                dhatu: r.dhatu,
                gana: r.gana,
                pada: r.pada,
                meaning: r.meaning,
            });
            word.meanings = w.glosses;
            word
        })
        .collect();
    let mut group = SandhiGroup::new(&chunk.surface, words);
    group.sandhi = chunk.sandhi.as_deref().map(sandhi_kind);
    group.sandhi_rule = chunk.sutra;
    group
}

fn sandhi_kind(label: &str) -> SandhiKind {
    match label {
        "vowel" | "ac" => SandhiKind::Vowel,
        "visarga" => SandhiKind::Visarga,
        "consonant" | "hal" => SandhiKind::Consonant,
        _ => SandhiKind::None,
    }
}

#[async_trait]
impl Engine for GrammarEngine {
    fn name(&self) -> &str {
        "grammar"
    }

    async fn analyze(&self, slp1: &str) -> std::result::Result<Vec<CandidateParse>, EngineFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": slp1, "encoding": "slp1" }))
            .send()
            .await
            .map_err(|e| transport_failure(self.name(), e))?;

        if !response.status().is_success() {
            return Err(EngineFailure::new(
                self.name(),
                FailureReason::Unreachable(format!("HTTP {}", response.status())),
            ));
        }

        let parsed: GrammarResponse = response
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
    fn converts_chunked_response() {
        let raw = serde_json::json!({
            "parses": [{
                "score": 0.92,
                "chunks": [
                    {
                        "surface": "rAmaH",
                        "words": [{
                            "lemma": "rAma",
                            "surface": "rAmaH",
                            "tags": { "pos": "noun", "gender": "m", "number": "sg", "case": "nom" }
                        }]
                    },
                    {
                        "surface": "gacCati",
                        "sandhi": "visarga",
                        "words": [{
                            "lemma": "gam",
                            "surface": "gacCati",
                            "root": { "dhatu": "gam", "gana": 1, "pada": "parasmaipada" }
                        }]
                    }
                ]
            }]
        });
        let response: GrammarResponse = serde_json::from_value(raw).unwrap();
        let engine = GrammarEngine::new(&EngineConfig {
            endpoint: "http://localhost:1/x".into(),
            ..Default::default()
        })
        .unwrap();
        let parses = engine.convert(response);
        assert_eq!(parses.len(), 1);
        assert_eq!(parses[0].confidence, 0.92);
        assert_eq!(parses[0].lemmas(), vec!["rAma", "gam"]);
        assert_eq!(parses[0].groups[1].sandhi, Some(SandhiKind::Visarga));
        let word = &parses[0].groups[1].words[0];
        assert_eq!(word.dhatu.as_ref().unwrap().dhatu, "gam");
    }

    #[test]
    fn empty_parse_lists_survive() {
        let response: GrammarResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response.parses.is_empty());
    }
}

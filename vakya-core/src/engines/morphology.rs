//! Neural morphology engine adapter
//!
//! Wraps a sequence-tagging service that emits one token stream per analysis
//! with compact tag strings ("Nom.Sg.Masc", "Pres.Act.3.Sg"). Tokens arrive
//! pre-segmented, so every token becomes its own single-word sandhi group;
//! the tag string is decomposed into the structured morphology model here.

use super::{build_client, transport_failure, Engine, EngineFailure, FailureReason};
use crate::config::EngineConfig;
use async_trait::async_trait;
use serde::Deserialize;
use vakya_common::{BaseWord, CandidateParse, MorphTag, Result, SandhiGroup};

pub struct MorphologyEngine {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct MorphologyResponse {
    #[serde(default)]
    analyses: Vec<MorphologyAnalysis>,
}

#[derive(Debug, Deserialize)]
struct MorphologyAnalysis {
    confidence: f64,
    #[serde(default)]
    tokens: Vec<MorphologyToken>,
}

#[derive(Debug, Deserialize)]
struct MorphologyToken {
    form: String,
    lemma: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    gloss: Vec<String>,
}

impl MorphologyEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint: config.endpoint.clone(),
        })
    }

    fn convert(&self, response: MorphologyResponse) -> Vec<CandidateParse> {
        response
            .analyses
            .into_iter()
            .filter(|a| !a.tokens.is_empty())
            .map(|a| {
                let groups = a
                    .tokens
                    .into_iter()
                    .map(|t| {
                        let mut word = BaseWord::new(&t.lemma, &t.form, 1.0);
                        word.morph = t.tag.as_deref().map(parse_tag);
                        word.meanings = t.gloss;
                        SandhiGroup::new(&t.form, vec![word])
                    })
                    .collect();
                CandidateParse::new(groups, a.confidence)
            })
            .collect()
    }
}

/// Decompose a dotted tag string into structured features. Unknown segments
/// are preserved only through `raw`.
fn parse_tag(tag: &str) -> MorphTag {
    let mut morph = MorphTag { raw: Some(tag.to_string()), ..Default::default() };
    for part in tag.split('.') {
        match part {
            "Nom" => morph.case = Some("nom".into()),
            "Acc" => morph.case = Some("acc".into()),
            "Ins" => morph.case = Some("ins".into()),
            "Dat" => morph.case = Some("dat".into()),
            "Abl" => morph.case = Some("abl".into()),
            "Gen" => morph.case = Some("gen".into()),
            "Loc" => morph.case = Some("loc".into()),
            "Voc" => morph.case = Some("voc".into()),
            "Sg" => morph.number = Some("sg".into()),
            "Du" => morph.number = Some("du".into()),
            "Pl" => morph.number = Some("pl".into()),
            "Masc" => morph.gender = Some("m".into()),
            "Fem" => morph.gender = Some("f".into()),
            "Neut" => morph.gender = Some("n".into()),
            "1" => morph.person = Some("1".into()),
            "2" => morph.person = Some("2".into()),
            "3" => morph.person = Some("3".into()),
            "Pres" => morph.tense = Some("present".into()),
            "Impf" => morph.tense = Some("imperfect".into()),
            "Fut" => morph.tense = Some("future".into()),
            "Perf" => morph.tense = Some("perfect".into()),
            "Aor" => morph.tense = Some("aorist".into()),
            "Opt" => morph.tense = Some("optative".into()),
            "Impv" => morph.tense = Some("imperative".into()),
            "Act" => morph.voice = Some("active".into()),
            "Mid" => morph.voice = Some("middle".into()),
            "Pass" => morph.voice = Some("passive".into()),
            "Noun" => morph.pos = Some("noun".into()),
            "Verb" => morph.pos = Some("verb".into()),
            "Adj" => morph.pos = Some("adjective".into()),
            "Ind" => morph.pos = Some("indeclinable".into()),
            _ => {}
        }
    }
    // Infer part of speech from the features when the tag omits it
    if morph.pos.is_none() {
        if morph.person.is_some() || morph.tense.is_some() {
            morph.pos = Some("verb".into());
        } else if morph.case.is_some() {
            morph.pos = Some("noun".into());
        }
    }
    morph
}

#[async_trait]
impl Engine for MorphologyEngine {
    fn name(&self) -> &str {
        "morphology"
    }

    async fn analyze(&self, slp1: &str) -> std::result::Result<Vec<CandidateParse>, EngineFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "input": slp1, "input_encoding": "slp1" }))
            .send()
            .await
            .map_err(|e| transport_failure(self.name(), e))?;

        if !response.status().is_success() {
            return Err(EngineFailure::new(
                self.name(),
                FailureReason::Unreachable(format!("HTTP {}", response.status())),
            ));
        }

        let parsed: MorphologyResponse = response
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
    fn tag_string_decomposes() {
        let noun = parse_tag("Nom.Sg.Masc");
        assert_eq!(noun.case.as_deref(), Some("nom"));
        assert_eq!(noun.number.as_deref(), Some("sg"));
        assert_eq!(noun.gender.as_deref(), Some("m"));
        assert_eq!(noun.pos.as_deref(), Some("noun"));

        let verb = parse_tag("Pres.Act.3.Sg");
        assert_eq!(verb.tense.as_deref(), Some("present"));
        assert_eq!(verb.person.as_deref(), Some("3"));
        assert_eq!(verb.pos.as_deref(), Some("verb"));
        assert_eq!(verb.raw.as_deref(), Some("Pres.Act.3.Sg"));
    }

    #[test]
    fn converts_token_stream() {
        let raw = serde_json::json!({
            "analyses": [{
                "confidence": 0.88,
                "tokens": [
                    { "form": "rAmaH", "lemma": "rAma", "tag": "Nom.Sg.Masc", "gloss": ["Rama"] },
                    { "form": "gacCati", "lemma": "gam", "tag": "Pres.Act.3.Sg" }
                ]
            }]
        });
        let response: MorphologyResponse = serde_json::from_value(raw).unwrap();
        let engine = MorphologyEngine::new(&EngineConfig {
            endpoint: "http://localhost:1/x".into(),
            ..Default::default()
        })
        .unwrap();
        let parses = engine.convert(response);
        assert_eq!(parses.len(), 1);
        assert_eq!(parses[0].groups.len(), 2);
        assert_eq!(parses[0].lemmas(), vec!["rAma", "gam"]);
        assert_eq!(parses[0].groups[0].words[0].meanings, vec!["Rama"]);
    }
}

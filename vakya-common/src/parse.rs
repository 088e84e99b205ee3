//! Candidate parse data model
//!
//! The hierarchy mirrors how a Sanskrit sentence decomposes:
//! a candidate parse is an ordered sequence of sandhi groups, each holding
//! the base words that the group splits into, each optionally carrying the
//! verbal root it derives from.

use crate::scripts::ScriptForm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Grammatical analysis of a single word form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tense: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Engine's original tag string, kept for provenance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl MorphTag {
    /// True when both tags specify a feature and the values disagree.
    /// Missing features never count as disagreement.
    pub fn conflicts_with(&self, other: &MorphTag) -> bool {
        fn differs(a: &Option<String>, b: &Option<String>) -> bool {
            matches!((a, b), (Some(x), Some(y)) if x != y)
        }
        differs(&self.gender, &other.gender)
            || differs(&self.number, &other.number)
            || differs(&self.case, &other.case)
    }
}

/// Verbal root information for verb-derived words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhatuInfo {
    /// The root in SLP1 (e.g. "gam")
    pub dhatu: String,
    /// Verb class (gana), 1-10
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gana: Option<u8>,
    /// Voice disposition: parasmaipada / atmanepada / ubhayapada
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pada: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
}

/// A single word after sandhi splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseWord {
    /// Dictionary form in SLP1
    pub lemma: String,
    /// Form as it appears in context, SLP1
    pub surface: String,
    pub scripts: ScriptForm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morph: Option<MorphTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhatu: Option<DhatuInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meanings: Vec<String>,
    pub confidence: f64,
}

impl BaseWord {
    pub fn new(lemma: &str, surface: &str, confidence: f64) -> Self {
        Self {
            lemma: lemma.to_string(),
            surface: surface.to_string(),
            scripts: ScriptForm::from_slp1(surface),
            morph: None,
            dhatu: None,
            meanings: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Kind of sandhi joining applied at a group boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandhiKind {
    Vowel,
    Visarga,
    Consonant,
    None,
}

/// A sandhi-joined unit: one or more words fused in the surface text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandhiGroup {
    /// Surface form in SLP1
    pub surface: String,
    pub scripts: ScriptForm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandhi: Option<SandhiKind>,
    /// Ashtadhyayi sutra reference when an engine supplies one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandhi_rule: Option<String>,
    pub words: Vec<BaseWord>,
}

impl SandhiGroup {
    pub fn new(surface: &str, words: Vec<BaseWord>) -> Self {
        Self {
            surface: surface.to_string(),
            scripts: ScriptForm::from_slp1(surface),
            sandhi: None,
            sandhi_rule: None,
            words,
        }
    }
}

/// One proposed decomposition of a sentence, from a single engine or merged
/// by the ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateParse {
    pub parse_id: String,
    pub groups: Vec<SandhiGroup>,
    /// Confidence in [0,1]: the producing engine's own value, or the
    /// ensemble aggregate after merging
    pub confidence: f64,
    /// Per-engine vote breakdown (engine name -> that engine's confidence).
    /// Empty for raw single-engine candidates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub engine_votes: BTreeMap<String, f64>,
}

impl CandidateParse {
    pub fn new(groups: Vec<SandhiGroup>, confidence: f64) -> Self {
        Self {
            parse_id: uuid::Uuid::new_v4().to_string(),
            groups,
            confidence: confidence.clamp(0.0, 1.0),
            engine_votes: BTreeMap::new(),
        }
    }

    /// Structural-equivalence key for cross-engine merging: the ordered
    /// sandhi split points (group surfaces, already SLP1-normalized) plus
    /// the flattened lemma sequence. Engines that format surface text
    /// differently but propose the same split and lemmas merge together;
    /// differing split points or lemmas never do.
    pub fn structural_key(&self) -> String {
        let surfaces: Vec<&str> = self.groups.iter().map(|g| g.surface.as_str()).collect();
        let lemmas: Vec<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.words.iter().map(|w| w.lemma.as_str()))
            .collect();
        format!("{}\u{1}{}", surfaces.join("|"), lemmas.join(","))
    }

    /// Full surface text of this parse (SLP1, space-joined groups).
    pub fn surface_text(&self) -> String {
        self.groups
            .iter()
            .map(|g| g.surface.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Flattened view over all base words.
    pub fn all_words(&self) -> impl Iterator<Item = &BaseWord> {
        self.groups.iter().flat_map(|g| g.words.iter())
    }

    pub fn lemmas(&self) -> Vec<&str> {
        self.all_words().map(|w| w.lemma.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_of(groups: &[(&str, &[&str])]) -> CandidateParse {
        let groups = groups
            .iter()
            .map(|(surface, lemmas)| {
                SandhiGroup::new(
                    surface,
                    lemmas.iter().map(|l| BaseWord::new(l, l, 0.9)).collect(),
                )
            })
            .collect();
        CandidateParse::new(groups, 0.9)
    }

    #[test]
    fn structural_key_ignores_confidence_and_ids() {
        let a = parse_of(&[("rAmaH", &["rAma"]), ("gacCati", &["gam"])]);
        let mut b = parse_of(&[("rAmaH", &["rAma"]), ("gacCati", &["gam"])]);
        b.confidence = 0.2;
        assert_eq!(a.structural_key(), b.structural_key());
    }

    #[test]
    fn structural_key_differs_on_split_points() {
        let a = parse_of(&[("rAmogacCati", &["rAma", "gam"])]);
        let b = parse_of(&[("rAmaH", &["rAma"]), ("gacCati", &["gam"])]);
        assert_ne!(a.structural_key(), b.structural_key());
    }

    #[test]
    fn structural_key_differs_on_lemmas() {
        let a = parse_of(&[("gacCati", &["gam"])]);
        let b = parse_of(&[("gacCati", &["gaC"])]);
        assert_ne!(a.structural_key(), b.structural_key());
    }

    #[test]
    fn morph_conflict_detection() {
        let masc = MorphTag { gender: Some("m".into()), ..Default::default() };
        let fem = MorphTag { gender: Some("f".into()), ..Default::default() };
        let unknown = MorphTag::default();
        assert!(masc.conflicts_with(&fem));
        assert!(!masc.conflicts_with(&unknown));
        assert!(!masc.conflicts_with(&masc));
    }

    #[test]
    fn confidence_is_clamped() {
        let p = CandidateParse::new(vec![], 1.7);
        assert_eq!(p.confidence, 1.0);
        let w = BaseWord::new("rAma", "rAmaH", -0.2);
        assert_eq!(w.confidence, 0.0);
    }
}

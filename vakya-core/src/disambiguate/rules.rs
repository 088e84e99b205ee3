//! Deterministic disambiguation rules
//!
//! Each rule compares two candidates pairwise and optionally expresses a
//! weighted preference. Rules are pure functions over the candidate
//! structures; they never consult the network.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use vakya_common::{CandidateParse, SandhiKind};

/// Pairwise verdict of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    First,
    Second,
}

/// Context available to rules beyond the candidates themselves.
#[derive(Debug, Default)]
pub struct RuleContext<'a> {
    /// Surrounding discourse supplied by the caller, if any
    pub context: Option<&'a str>,
}

pub trait DisambiguationRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Score contribution when this rule prefers a candidate.
    fn weight(&self) -> f64;

    /// `None` means the rule has no opinion on this pair.
    fn prefer(
        &self,
        first: &CandidateParse,
        second: &CandidateParse,
        ctx: &RuleContext,
    ) -> Option<Preference>;
}

/// The standard rule set, strongest first.
pub fn default_rules() -> Vec<Box<dyn DisambiguationRule>> {
    vec![
        Box::new(AgreementRule),
        Box::new(FrequencyRule),
        Box::new(SandhiPreferenceRule),
    ]
}

/// Prefers the candidate with fewer adjective-noun agreement violations.
///
/// Adjacent word pairs where one is tagged as an adjective must agree with
/// their neighbor in gender, number, and case; each disagreement on a
/// feature both words specify counts as one violation.
pub struct AgreementRule;

fn agreement_violations(parse: &CandidateParse) -> usize {
    let words: Vec<_> = parse.all_words().collect();
    let mut violations = 0;
    for pair in words.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let adjectival = |w: &vakya_common::BaseWord| {
            w.morph
                .as_ref()
                .and_then(|m| m.pos.as_deref())
                .is_some_and(|p| p == "adjective")
        };
        if !adjectival(a) && !adjectival(b) {
            continue;
        }
        if let (Some(ma), Some(mb)) = (&a.morph, &b.morph) {
            if ma.conflicts_with(mb) {
                violations += 1;
            }
        }
    }
    violations
}

impl DisambiguationRule for AgreementRule {
    fn name(&self) -> &'static str {
        "agreement"
    }

    fn weight(&self) -> f64 {
        1.0
    }

    fn prefer(
        &self,
        first: &CandidateParse,
        second: &CandidateParse,
        _ctx: &RuleContext,
    ) -> Option<Preference> {
        let a = agreement_violations(first);
        let b = agreement_violations(second);
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Preference::First),
            std::cmp::Ordering::Greater => Some(Preference::Second),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// High-frequency roots and stems (SLP1). Parses built from attested common
/// vocabulary beat parses requiring rare lemmas.
static COMMON_DHATUS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "gam", "kf", "BU", "as", "vac", "dA", "dfS", "vid", "Sru", "pat", "sTA", "han", "jan",
        "car", "nI", "yuj", "buD", "man", "vft", "laB",
    ]
    .into_iter()
    .collect()
});

static COMMON_LEMMAS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "rAma", "sItA", "deva", "nara", "vana", "gfha", "putra", "pitf", "mAtf", "rAjan",
        "brahman", "Atman", "karman", "Darma", "arTa", "kAma", "mokza", "loka", "jYAna", "yoga",
    ]
    .into_iter()
    .collect()
});

pub struct FrequencyRule;

fn frequency_score(parse: &CandidateParse) -> f64 {
    let mut hits = 0usize;
    let mut total = 0usize;
    for word in parse.all_words() {
        total += 1;
        let lemma = word.lemma.as_str();
        let root_hit = word
            .dhatu
            .as_ref()
            .is_some_and(|d| COMMON_DHATUS.contains(d.dhatu.as_str()));
        if root_hit || COMMON_DHATUS.contains(lemma) || COMMON_LEMMAS.contains(lemma) {
            hits += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

impl DisambiguationRule for FrequencyRule {
    fn name(&self) -> &'static str {
        "frequency"
    }

    fn weight(&self) -> f64 {
        0.5
    }

    fn prefer(
        &self,
        first: &CandidateParse,
        second: &CandidateParse,
        _ctx: &RuleContext,
    ) -> Option<Preference> {
        let a = frequency_score(first);
        let b = frequency_score(second);
        if (a - b).abs() < 1e-9 {
            None
        } else if a > b {
            Some(Preference::First)
        } else {
            Some(Preference::Second)
        }
    }
}

/// Prefers splits explained by the common external sandhi classes (vowel and
/// visarga) over ones requiring consonant sandhi or unexplained joins.
pub struct SandhiPreferenceRule;

fn sandhi_score(parse: &CandidateParse) -> f64 {
    if parse.groups.is_empty() {
        return 0.0;
    }
    let favored = parse
        .groups
        .iter()
        .filter(|g| matches!(g.sandhi, Some(SandhiKind::Vowel) | Some(SandhiKind::Visarga) | None))
        .count();
    favored as f64 / parse.groups.len() as f64
}

impl DisambiguationRule for SandhiPreferenceRule {
    fn name(&self) -> &'static str {
        "sandhi_preference"
    }

    fn weight(&self) -> f64 {
        0.3
    }

    fn prefer(
        &self,
        first: &CandidateParse,
        second: &CandidateParse,
        _ctx: &RuleContext,
    ) -> Option<Preference> {
        let a = sandhi_score(first);
        let b = sandhi_score(second);
        if (a - b).abs() < 1e-9 {
            None
        } else if a > b {
            Some(Preference::First)
        } else {
            Some(Preference::Second)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vakya_common::{BaseWord, MorphTag, SandhiGroup};

    fn word_with(lemma: &str, pos: &str, gender: &str) -> BaseWord {
        let mut w = BaseWord::new(lemma, lemma, 0.9);
        w.morph = Some(MorphTag {
            pos: Some(pos.into()),
            gender: Some(gender.into()),
            ..Default::default()
        });
        w
    }

    fn parse_from_words(words: Vec<BaseWord>) -> CandidateParse {
        let groups = words
            .into_iter()
            .map(|w| SandhiGroup::new(&w.surface.clone(), vec![w]))
            .collect();
        CandidateParse::new(groups, 0.5)
    }

    #[test]
    fn agreement_rule_penalizes_gender_clash() {
        let agreeing = parse_from_words(vec![
            word_with("suMdara", "adjective", "m"),
            word_with("nara", "noun", "m"),
        ]);
        let clashing = parse_from_words(vec![
            word_with("suMdara", "adjective", "f"),
            word_with("nara", "noun", "m"),
        ]);
        let verdict = AgreementRule.prefer(&agreeing, &clashing, &RuleContext::default());
        assert_eq!(verdict, Some(Preference::First));
    }

    #[test]
    fn agreement_rule_ignores_noun_noun_pairs() {
        let a = parse_from_words(vec![word_with("rAma", "noun", "m"), word_with("sItA", "noun", "f")]);
        let b = parse_from_words(vec![word_with("rAma", "noun", "m"), word_with("nara", "noun", "m")]);
        assert_eq!(AgreementRule.prefer(&a, &b, &RuleContext::default()), None);
    }

    #[test]
    fn frequency_rule_prefers_common_vocabulary() {
        let common = parse_from_words(vec![BaseWord::new("rAma", "rAmaH", 0.9)]);
        let rare = parse_from_words(vec![BaseWord::new("rAmaka", "rAmaH", 0.9)]);
        let verdict = FrequencyRule.prefer(&common, &rare, &RuleContext::default());
        assert_eq!(verdict, Some(Preference::First));
    }

    #[test]
    fn frequency_rule_counts_dhatu_hits() {
        let mut verb = BaseWord::new("gacCati", "gacCati", 0.9);
        verb.dhatu = Some(vakya_common::DhatuInfo {
            dhatu: "gam".into(),
            gana: Some(1),
            pada: None,
            meaning: None,
        });
        let with_root = parse_from_words(vec![verb]);
        let without = parse_from_words(vec![BaseWord::new("gacCati", "gacCati", 0.9)]);
        let verdict = FrequencyRule.prefer(&with_root, &without, &RuleContext::default());
        assert_eq!(verdict, Some(Preference::First));
    }

    #[test]
    fn sandhi_rule_prefers_common_junctions() {
        let mut favored = parse_from_words(vec![BaseWord::new("rAma", "rAmo", 0.9)]);
        favored.groups[0].sandhi = Some(SandhiKind::Visarga);
        let mut disfavored = parse_from_words(vec![BaseWord::new("rAma", "rAmo", 0.9)]);
        disfavored.groups[0].sandhi = Some(SandhiKind::Consonant);
        let verdict =
            SandhiPreferenceRule.prefer(&favored, &disfavored, &RuleContext::default());
        assert_eq!(verdict, Some(Preference::First));
    }

    #[test]
    fn default_rule_set_is_ordered_by_weight() {
        let rules = default_rules();
        let weights: Vec<f64> = rules.iter().map(|r| r.weight()).collect();
        assert!(weights.windows(2).all(|w| w[0] >= w[1]));
    }
}

//! Multi-script representation of Sanskrit text
//!
//! SLP1 is the canonical internal encoding; Devanagari and IAST forms are
//! always derived from it, never maintained independently. Transliteration
//! covers the three scripts the analysis core works with — anything more
//! exotic is the engines' problem.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported input scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Devanagari,
    Iast,
    Slp1,
}

/// The same text rendered in all three primary scripts.
///
/// Invariant: `devanagari` and `iast` are derived from `slp1` at
/// construction time and the struct is never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptForm {
    pub devanagari: String,
    pub iast: String,
    pub slp1: String,
}

impl ScriptForm {
    /// Build all three renderings from canonical SLP1 text.
    pub fn from_slp1(slp1: &str) -> Self {
        Self {
            devanagari: slp1_to_devanagari(slp1),
            iast: slp1_to_iast(slp1),
            slp1: slp1.to_string(),
        }
    }

    /// Build from text in any supported script (auto-detected).
    pub fn from_text(text: &str) -> Self {
        Self::from_slp1(&to_slp1(text, None))
    }

    pub fn get(&self, script: Script) -> &str {
        match script {
            Script::Devanagari => &self.devanagari,
            Script::Iast => &self.iast,
            Script::Slp1 => &self.slp1,
        }
    }
}

impl std::fmt::Display for ScriptForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.devanagari)
    }
}

// SLP1 consonants (one ASCII char per phoneme)
const SLP1_CONSONANTS: &str = "kKgGNcCjJYwWqQRtTdDnpPbBmyrlvSzsh";

fn is_slp1_consonant(c: char) -> bool {
    SLP1_CONSONANTS.contains(c)
}

fn is_slp1_vowel(c: char) -> bool {
    "aAiIuUfFxXeEoO".contains(c)
}

/// SLP1 char -> IAST string
static SLP1_TO_IAST: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    [
        ('a', "a"), ('A', "ā"), ('i', "i"), ('I', "ī"), ('u', "u"), ('U', "ū"),
        ('f', "ṛ"), ('F', "ṝ"), ('x', "ḷ"), ('X', "ḹ"), ('e', "e"), ('E', "ai"),
        ('o', "o"), ('O', "au"), ('M', "ṃ"), ('H', "ḥ"),
        ('k', "k"), ('K', "kh"), ('g', "g"), ('G', "gh"), ('N', "ṅ"),
        ('c', "c"), ('C', "ch"), ('j', "j"), ('J', "jh"), ('Y', "ñ"),
        ('w', "ṭ"), ('W', "ṭh"), ('q', "ḍ"), ('Q', "ḍh"), ('R', "ṇ"),
        ('t', "t"), ('T', "th"), ('d', "d"), ('D', "dh"), ('n', "n"),
        ('p', "p"), ('P', "ph"), ('b', "b"), ('B', "bh"), ('m', "m"),
        ('y', "y"), ('r', "r"), ('l', "l"), ('v', "v"),
        ('S', "ś"), ('z', "ṣ"), ('s', "s"), ('h', "h"), ('\'', "'"),
    ]
    .into_iter()
    .collect()
});

/// IAST pattern -> SLP1 char, longest patterns first for greedy matching
static IAST_TO_SLP1: Lazy<Vec<(&'static str, char)>> = Lazy::new(|| {
    let mut pairs = vec![
        ("kh", 'K'), ("gh", 'G'), ("ch", 'C'), ("jh", 'J'), ("ṭh", 'W'),
        ("ḍh", 'Q'), ("th", 'T'), ("dh", 'D'), ("ph", 'P'), ("bh", 'B'),
        ("ai", 'E'), ("au", 'O'),
        ("ā", 'A'), ("ī", 'I'), ("ū", 'U'), ("ṛ", 'f'), ("ṝ", 'F'),
        ("ḷ", 'x'), ("ḹ", 'X'), ("ṃ", 'M'), ("ḥ", 'H'), ("ṅ", 'N'),
        ("ñ", 'Y'), ("ṭ", 'w'), ("ḍ", 'q'), ("ṇ", 'R'), ("ś", 'S'), ("ṣ", 'z'),
        ("a", 'a'), ("i", 'i'), ("u", 'u'), ("e", 'e'), ("o", 'o'),
        ("k", 'k'), ("g", 'g'), ("c", 'c'), ("j", 'j'), ("t", 't'), ("d", 'd'),
        ("n", 'n'), ("p", 'p'), ("b", 'b'), ("m", 'm'), ("y", 'y'), ("r", 'r'),
        ("l", 'l'), ("v", 'v'), ("s", 's'), ("h", 'h'), ("'", '\''),
    ];
    pairs.sort_by_key(|(p, _)| std::cmp::Reverse(p.chars().count()));
    pairs
});

/// Devanagari consonant -> SLP1 char
static DEV_CONSONANTS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [
        ('क', 'k'), ('ख', 'K'), ('ग', 'g'), ('घ', 'G'), ('ङ', 'N'),
        ('च', 'c'), ('छ', 'C'), ('ज', 'j'), ('झ', 'J'), ('ञ', 'Y'),
        ('ट', 'w'), ('ठ', 'W'), ('ड', 'q'), ('ढ', 'Q'), ('ण', 'R'),
        ('त', 't'), ('थ', 'T'), ('द', 'd'), ('ध', 'D'), ('न', 'n'),
        ('प', 'p'), ('फ', 'P'), ('ब', 'b'), ('भ', 'B'), ('म', 'm'),
        ('य', 'y'), ('र', 'r'), ('ल', 'l'), ('व', 'v'),
        ('श', 'S'), ('ष', 'z'), ('स', 's'), ('ह', 'h'),
    ]
    .into_iter()
    .collect()
});

/// Devanagari independent vowel -> SLP1 char
static DEV_VOWELS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [
        ('अ', 'a'), ('आ', 'A'), ('इ', 'i'), ('ई', 'I'), ('उ', 'u'), ('ऊ', 'U'),
        ('ऋ', 'f'), ('ॠ', 'F'), ('ऌ', 'x'), ('ॡ', 'X'),
        ('ए', 'e'), ('ऐ', 'E'), ('ओ', 'o'), ('औ', 'O'),
    ]
    .into_iter()
    .collect()
});

/// Devanagari dependent vowel sign (matra) -> SLP1 char
static DEV_MATRAS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [
        ('\u{093E}', 'A'), ('\u{093F}', 'i'), ('\u{0940}', 'I'),
        ('\u{0941}', 'u'), ('\u{0942}', 'U'), ('\u{0943}', 'f'),
        ('\u{0944}', 'F'), ('\u{0962}', 'x'), ('\u{0963}', 'X'),
        ('\u{0947}', 'e'), ('\u{0948}', 'E'), ('\u{094B}', 'o'), ('\u{094C}', 'O'),
    ]
    .into_iter()
    .collect()
});

/// Reverse lookups for SLP1 -> Devanagari, built from the forward tables.
static SLP1_TO_DEV_CONS: Lazy<HashMap<char, char>> =
    Lazy::new(|| DEV_CONSONANTS.iter().map(|(d, s)| (*s, *d)).collect());
static SLP1_TO_DEV_VOWEL: Lazy<HashMap<char, char>> =
    Lazy::new(|| DEV_VOWELS.iter().map(|(d, s)| (*s, *d)).collect());
static SLP1_TO_DEV_MATRA: Lazy<HashMap<char, char>> =
    Lazy::new(|| DEV_MATRAS.iter().map(|(d, s)| (*s, *d)).collect());

const VIRAMA: char = '\u{094D}';
const ANUSVARA: char = '\u{0902}';
const VISARGA: char = '\u{0903}';
const AVAGRAHA: char = '\u{093D}';

/// Detect the script of Sanskrit text.
///
/// Devanagari wins if any character is in its Unicode block; IAST wins on
/// diacritics; otherwise SLP1-specific markers decide, defaulting to IAST
/// for plain ASCII.
pub fn detect_script(text: &str) -> Script {
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        return Script::Devanagari;
    }
    if text
        .chars()
        .any(|c| "āīūṛṝḷḹṃḥñṅṇṭḍśṣĀĪŪṚṜḶḸṂḤÑṄṆṬḌŚṢ".contains(c))
    {
        return Script::Iast;
    }
    // SLP1 markers: retroflex/palatal letters or capitalized long vowels
    if text.chars().any(|c| "wWqQzSNAIUFXEOMH".contains(c)) {
        return Script::Slp1;
    }
    Script::Iast
}

/// Normalize text in any supported script to SLP1.
pub fn to_slp1(text: &str, source: Option<Script>) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    match source.unwrap_or_else(|| detect_script(text)) {
        Script::Slp1 => text.to_string(),
        Script::Iast => iast_to_slp1(text),
        Script::Devanagari => devanagari_to_slp1(text),
    }
}

/// Canonical normalization for cache keys and engine input: strip dandas,
/// digits and punctuation, collapse whitespace, transliterate to SLP1.
pub fn normalize_slp1(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '।' | '॥' => ' ',
            c if c.is_ascii_digit() || ('\u{0966}'..='\u{096F}').contains(&c) => ' ',
            ',' | '.' | ';' | ':' | '!' | '?' | '"' | '(' | ')' | '[' | ']' => ' ',
            c => c,
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    to_slp1(&collapsed, None)
}

fn iast_to_slp1(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let chars: Vec<char> = lower.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let mut matched = false;
        for (pat, slp) in IAST_TO_SLP1.iter() {
            let plen = pat.chars().count();
            if i + plen <= chars.len() && chars[i..i + plen].iter().collect::<String>() == *pat {
                out.push(*slp);
                i += plen;
                matched = true;
                break;
            }
        }
        if !matched {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn devanagari_to_slp1(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // A consonant carries an inherent 'a' unless followed by a matra or virama
    let mut pending_a = false;
    for c in text.chars() {
        if let Some(&s) = DEV_CONSONANTS.get(&c) {
            if pending_a {
                out.push('a');
            }
            out.push(s);
            pending_a = true;
        } else if let Some(&s) = DEV_MATRAS.get(&c) {
            out.push(s);
            pending_a = false;
        } else if let Some(&s) = DEV_VOWELS.get(&c) {
            if pending_a {
                out.push('a');
            }
            out.push(s);
            pending_a = false;
        } else if c == VIRAMA {
            pending_a = false;
        } else {
            if pending_a {
                out.push('a');
                pending_a = false;
            }
            match c {
                ANUSVARA => out.push('M'),
                VISARGA => out.push('H'),
                AVAGRAHA => out.push('\''),
                c => out.push(c),
            }
        }
    }
    if pending_a {
        out.push('a');
    }
    out
}

fn slp1_to_iast(text: &str) -> String {
    text.chars()
        .map(|c| SLP1_TO_IAST.get(&c).copied().map(String::from).unwrap_or_else(|| c.to_string()))
        .collect()
}

fn slp1_to_devanagari(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    let mut prev_consonant = false;
    for c in text.chars() {
        if is_slp1_consonant(c) {
            if prev_consonant {
                out.push(VIRAMA);
            }
            if let Some(&d) = SLP1_TO_DEV_CONS.get(&c) {
                out.push(d);
            }
            prev_consonant = true;
        } else if is_slp1_vowel(c) {
            if prev_consonant {
                // Inherent 'a' needs no sign; other vowels take their matra
                if c != 'a' {
                    if let Some(&m) = SLP1_TO_DEV_MATRA.get(&c) {
                        out.push(m);
                    }
                }
            } else if let Some(&v) = SLP1_TO_DEV_VOWEL.get(&c) {
                out.push(v);
            }
            prev_consonant = false;
        } else {
            if prev_consonant {
                out.push(VIRAMA);
                prev_consonant = false;
            }
            match c {
                'M' => out.push(ANUSVARA),
                'H' => out.push(VISARGA),
                '\'' => out.push(AVAGRAHA),
                c => out.push(c),
            }
        }
    }
    if prev_consonant {
        out.push(VIRAMA);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_devanagari() {
        assert_eq!(detect_script("रामः गच्छति"), Script::Devanagari);
    }

    #[test]
    fn detects_iast() {
        assert_eq!(detect_script("rāmaḥ gacchati"), Script::Iast);
    }

    #[test]
    fn detects_slp1() {
        assert_eq!(detect_script("rAmaH gacCati"), Script::Slp1);
    }

    #[test]
    fn plain_ascii_defaults_to_iast() {
        assert_eq!(detect_script("rama gacchati"), Script::Iast);
    }

    #[test]
    fn devanagari_to_slp1_round() {
        assert_eq!(to_slp1("रामः गच्छति", None), "rAmaH gacCati");
        assert_eq!(to_slp1("राम", None), "rAma");
        assert_eq!(to_slp1("गम्", None), "gam");
    }

    #[test]
    fn iast_to_slp1_round() {
        assert_eq!(to_slp1("rāmaḥ gacchati", None), "rAmaH gacCati");
        assert_eq!(to_slp1("dharmakṣetre", None), "Darmakzetre");
        assert_eq!(to_slp1("gauḥ", None), "gOH");
    }

    #[test]
    fn slp1_to_devanagari_round() {
        assert_eq!(slp1_to_devanagari("rAmaH"), "रामः");
        assert_eq!(slp1_to_devanagari("gacCati"), "गच्छति");
        assert_eq!(slp1_to_devanagari("gam"), "गम्");
    }

    #[test]
    fn slp1_to_iast_round() {
        assert_eq!(slp1_to_iast("rAmaH gacCati"), "rāmaḥ gacchati");
        assert_eq!(slp1_to_iast("kfzRa"), "kṛṣṇa");
    }

    #[test]
    fn script_form_derives_all_three() {
        let form = ScriptForm::from_text("रामः");
        assert_eq!(form.slp1, "rAmaH");
        assert_eq!(form.iast, "rāmaḥ");
        assert_eq!(form.devanagari, "रामः");
    }

    #[test]
    fn normalize_strips_dandas_and_collapses_whitespace() {
        assert_eq!(normalize_slp1("रामः  गच्छति ।"), "rAmaH gacCati");
        // Transliteration-equivalent inputs normalize identically
        assert_eq!(normalize_slp1("rāmaḥ gacchati"), normalize_slp1("रामः गच्छति"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(to_slp1("  ", None), "");
        assert_eq!(normalize_slp1(""), "");
    }
}

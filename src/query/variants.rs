//! Per-word variant expansion: irregular-inflection tables, suffix
//! rewrites, pronoun generalization, and recombination of the per-position
//! variant lists back into whole phrases.

use crate::query::combinator::combinations;
use ahash::AHashMap;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}

/// Irregular inflection tables, inflected form to base form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inflections {
    #[serde(default)]
    pub nouns: AHashMap<String, String>,
    #[serde(default)]
    pub verbs: AHashMap<String, String>,
}

impl Inflections {
    /// Load replacement tables from a user-supplied JSON file holding
    /// optional `nouns` and `verbs` maps.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse inflection tables {}", path.display()))
    }

    /// The tables shipped with the crate.
    pub fn builtin() -> &'static Inflections {
        static TABLES: OnceLock<Inflections> = OnceLock::new();
        TABLES.get_or_init(|| Inflections {
            nouns: serde_json::from_str(include_str!("../../data/nouns.json"))
                .expect("embedded nouns.json is valid"),
            verbs: serde_json::from_str(include_str!("../../data/verbs.json"))
                .expect("embedded verbs.json is valid"),
        })
    }
}

/// Ordered (suffix, replacement) rewrite table. Of the suffixes matching a
/// word, only those of the longest matching length apply.
const SUFFIX_REWRITES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("es", ""),
    ("s", ""),
    ("'s", ""),
    ("ves", "fe"),
    ("zzes", "z"),
    ("men", "man"),
    ("ing", ""),
    ("ing", "e"),
    ("ying", "ie"),
    ("bbing", "b"),
    ("dding", "d"),
    ("gging", "g"),
    ("lling", "l"),
    ("mming", "m"),
    ("nning", "n"),
    ("pping", "p"),
    ("rring", "r"),
    ("tting", "t"),
    ("zzing", "z"),
    ("ed", ""),
    ("ed", "e"),
    ("ied", "y"),
    ("bbed", "b"),
    ("dded", "d"),
    ("gged", "g"),
    ("nned", "n"),
    ("lled", "l"),
    ("mmed", "m"),
    ("pped", "p"),
    ("rred", "r"),
    ("tted", "t"),
    ("zzed", "z"),
    ("er", ""),
    ("er", "e"),
    ("ier", "y"),
    ("est", ""),
    ("est", "e"),
    ("iest", "y"),
    ("dder", "d"),
    ("ddest", "d"),
    ("gger", "g"),
    ("ggest", "g"),
    ("nner", "n"),
    ("nnest", "n"),
    ("ppier", "ppy"),
    ("ppiest", "ppy"),
    ("tter", "t"),
    ("ttest", "t"),
];

/// Candidate base forms of one word: the word itself, table hits, and the
/// longest-suffix rewrites. First-produced order is preserved.
pub fn base_forms(word: &str, tables: &Inflections) -> Vec<String> {
    let mut out = vec![word.to_string()];
    if let Some(base) = tables.nouns.get(word) {
        push_unique(&mut out, base.clone());
    }
    if let Some(base) = tables.verbs.get(word) {
        push_unique(&mut out, base.clone());
    }
    let best = SUFFIX_REWRITES
        .iter()
        .filter(|(old, _)| word.len() > old.len() && word.ends_with(old))
        .map(|(old, _)| old.len())
        .max()
        .unwrap_or(0);
    if best > 0 {
        for (old, new) in SUFFIX_REWRITES {
            if old.len() == best && word.len() > old.len() && word.ends_with(old) {
                let stem = &word[..word.len() - old.len()];
                push_unique(&mut out, format!("{stem}{new}"));
            }
        }
    }
    out
}

/// (pronoun, replacement-set index). The same surface form can belong to
/// more than one grammatical slot ("her", "his", "its").
const PRONOUNS: &[(&str, usize)] = &[
    ("my", 0),
    ("me", 1),
    ("mine", 2),
    ("myself", 3),
    ("your", 0),
    ("you", 1),
    ("yours", 2),
    ("yourself", 3),
    ("his", 0),
    ("him", 1),
    ("his", 2),
    ("himself", 3),
    ("her", 0),
    ("her", 1),
    ("hers", 2),
    ("herself", 3),
    ("our", 0),
    ("us", 1),
    ("ours", 2),
    ("ourselves", 3),
    ("their", 0),
    ("them", 1),
    ("theirs", 2),
    ("themselves", 3),
    ("its", 0),
    ("it", 1),
    ("its", 2),
    ("itself", 3),
];

const PRONOUN_REPLACEMENTS: [&[&str]; 4] = [
    &["one's", "someone's"],
    &["oneself"],
    &["one's", "someone's", "one's own", "someone's own"],
    &["oneself"],
];

/// Generalize personal pronouns and possessive `'s` forms, keeping the
/// word itself first.
pub fn pronoun_forms(word: &str) -> Vec<String> {
    let mut out = vec![word.to_string()];
    for &(pronoun, set) in PRONOUNS {
        if word == pronoun {
            for &replacement in PRONOUN_REPLACEMENTS[set] {
                push_unique(&mut out, replacement.to_string());
            }
        }
    }
    if word.len() > 2 && word.ends_with("'s") {
        push_unique(&mut out, "one's".to_string());
        push_unique(&mut out, "someone's".to_string());
        push_unique(&mut out, word[..word.len() - 2].to_string());
    }
    out
}

/// Full variant list of one word: every base form expanded through the
/// pronoun generalizations, deduplicated in production order.
pub fn word_variants(word: &str, tables: &Inflections) -> Vec<String> {
    let mut out = Vec::new();
    for base in base_forms(word, tables) {
        for form in pronoun_forms(&base) {
            push_unique(&mut out, form);
        }
    }
    out
}

/// Split a phrase into words and the separator characters between them.
fn split_tracking(text: &str) -> (Vec<&str>, Vec<char>) {
    let mut words = Vec::new();
    let mut separators = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, ' ' | '-' | '_') {
            words.push(&text[start..i]);
            separators.push(c);
            start = i + c.len_utf8();
        }
    }
    words.push(&text[start..]);
    (words, separators)
}

/// Expand every word position of the phrase through [`word_variants`] and
/// recombine all picks, rejoining with the original separators.
pub fn recombine(text: &str, tables: &Inflections) -> Vec<String> {
    let (words, separators) = split_tracking(text);
    let variants: Vec<Vec<String>> = words
        .iter()
        .map(|word| word_variants(word, tables))
        .collect();
    let maxima: Vec<usize> = variants.iter().map(|list| list.len() - 1).collect();
    let mut out = Vec::new();
    for picks in combinations(&maxima) {
        let mut phrase = String::with_capacity(text.len());
        for (i, &pick) in picks.iter().enumerate() {
            if i > 0 {
                phrase.push(separators[i - 1]);
            }
            phrase.push_str(&variants[i][pick]);
        }
        push_unique(&mut out, phrase);
    }
    out
}

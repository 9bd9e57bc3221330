//! Pipeline composition, bucket dispatch, and result assembly.
//!
//! Result order is bucket-then-candidate traversal order and must be stable
//! for identical input, so every expansion below preserves first-produced
//! order while deduplicating.

use crate::query::normalize::{
    cleanup, concat_forms, extract_forms, paraphrase_forms, repeat_forms, separator_forms,
    split_forms,
};
use crate::query::reference;
use crate::query::variants::{Inflections, recombine};
use crate::store::reader::Lookup;
use crate::store::types::PrefixKey;
use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use log::debug;
use rayon::prelude::*;

/// One matched headword with its meanings, in result order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub word: String,
    pub meanings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub items: Vec<ResultItem>,
    pub suggestions: Vec<String>,
}

fn push_new(list: &mut Vec<String>, seen: &mut AHashSet<String>, value: String) {
    if seen.insert(value.clone()) {
        list.push(value);
    }
}

/// Expand one free-form phrase into the deduplicated candidate set, in the
/// deterministic production order the passes define.
pub fn candidates(input: &str, tables: &Inflections) -> Vec<String> {
    let cleaned = cleanup(input);
    if cleaned.is_empty() {
        return Vec::new();
    }
    let lowered = cleaned.to_lowercase();

    let mut preprocessed = Vec::new();
    let mut seen = AHashSet::new();
    for collapsed in repeat_forms(&lowered) {
        for form in separator_forms(&collapsed, &cleaned) {
            push_new(&mut preprocessed, &mut seen, form);
        }
    }

    let mut variations = Vec::new();
    let mut seen = AHashSet::new();
    for phrase in &preprocessed {
        for form in concat_forms(phrase) {
            push_new(&mut variations, &mut seen, form);
        }
    }
    for phrase in &preprocessed {
        for sub in extract_forms(phrase) {
            let paraphrased = paraphrase_forms(&sub);
            push_new(&mut variations, &mut seen, sub);
            for form in paraphrased {
                push_new(&mut variations, &mut seen, form);
            }
        }
    }
    for phrase in &preprocessed {
        for piece in split_forms(phrase) {
            let paraphrased = paraphrase_forms(&piece);
            push_new(&mut variations, &mut seen, piece);
            for form in paraphrased {
                push_new(&mut variations, &mut seen, form);
            }
        }
    }

    // per-variation expansion is pure; the ordered collect keeps the
    // deterministic candidate order
    let expanded: Vec<Vec<String>> = variations
        .par_iter()
        .map(|variation| recombine(variation, tables))
        .collect();

    let mut out = Vec::new();
    let mut seen = AHashSet::new();
    for list in expanded {
        for candidate in list {
            push_new(&mut out, &mut seen, candidate);
        }
    }
    out
}

/// Run the full pipeline against the store: expand, group by bucket, look
/// up every candidate, then follow see-also references.
pub fn search(lookup: &mut Lookup, input: &str, tables: &Inflections) -> Result<SearchResults> {
    let cleaned = cleanup(input);
    let lowered = cleaned.to_lowercase();
    let candidates = candidates(input, tables);
    if candidates.is_empty() {
        return Ok(SearchResults::default());
    }
    debug!("{} candidates for {input:?}", candidates.len());

    let mut order: Vec<PrefixKey> = Vec::new();
    let mut groups: AHashMap<PrefixKey, Vec<String>> = AHashMap::new();
    for candidate in &candidates {
        let key = PrefixKey::of(candidate);
        let group = groups.entry(key).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(candidate.clone());
    }

    let wants_suggestions = cleaned.chars().count() > 2;
    let origin_key = PrefixKey::of(&lowered);

    let mut items = Vec::new();
    let mut suggestions = Vec::new();
    for key in order {
        let prefix = (wants_suggestions && key == origin_key).then_some(lowered.as_str());
        let (bucket, found) = lookup.get(key, prefix)?;
        if let Some(found) = found {
            suggestions = found;
        }
        for candidate in &groups[&key] {
            if let Some(entries) = bucket.get(candidate.as_str()) {
                for entry in entries {
                    items.push(ResultItem {
                        word: entry.word.clone(),
                        meanings: entry.meanings.clone(),
                    });
                }
            }
        }
    }

    let searched: AHashSet<String> = candidates.into_iter().collect();
    let referenced = reference::resolve(lookup, &items, &searched)?;
    items.extend(referenced);

    Ok(SearchResults { items, suggestions })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_tables() -> Inflections {
        let mut tables = Inflections::default();
        tables.verbs.insert("running".into(), "run".into());
        tables
    }

    #[test]
    fn test_candidates_include_base_forms() {
        let tables = stub_tables();
        assert!(candidates("running", &tables).contains(&"run".to_string()));
        assert!(candidates("looked up", &tables).contains(&"look up".to_string()));
    }

    #[test]
    fn test_candidates_start_with_input() {
        let tables = Inflections::default();
        let out = candidates("  Look  Up ", &tables);
        assert_eq!(out[0], "look up");
    }

    #[test]
    fn test_candidates_extract_subphrases() {
        let tables = Inflections::default();
        let out = candidates("turn the light off", &tables);
        assert!(out.contains(&"turn the light off".to_string()));
        assert!(out.contains(&"the light".to_string()));
        // extract + paraphrase composition
        assert!(out.contains(&"turn ~ off ~".to_string()));
    }

    #[test]
    fn test_candidates_deterministic() {
        let tables = Inflections::default();
        let a = candidates("put it away", &tables);
        let b = candidates("put it away", &tables);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input() {
        let tables = Inflections::default();
        assert!(candidates("   ", &tables).is_empty());
    }
}

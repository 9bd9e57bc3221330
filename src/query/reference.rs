//! See-also reference resolution over returned meanings.

use crate::query::executor::ResultItem;
use crate::store::reader::Lookup;
use crate::store::types::PrefixKey;
use ahash::AHashSet;
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

/// `<→see also>` style markers embedded in meaning text.
fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"<→[A-Za-z\-~.!? ]+?>").expect("reference marker pattern is valid")
    })
}

/// Scan every meaning of the primary results for reference markers and look
/// each referenced text up once, exactly, with no further normalization.
/// Only entries whose original-cased word equals the text are returned.
pub fn resolve(
    lookup: &mut Lookup,
    items: &[ResultItem],
    searched: &AHashSet<String>,
) -> Result<Vec<ResultItem>> {
    let mut extra = Vec::new();
    let mut followed: AHashSet<String> = AHashSet::new();
    for item in items {
        for meaning in &item.meanings {
            for found in marker_regex().find_iter(meaning) {
                let marker = found.as_str();
                if marker.chars().count() <= 3 {
                    continue;
                }
                let text = marker
                    .strip_prefix("<→")
                    .and_then(|t| t.strip_suffix('>'))
                    .unwrap_or(marker);
                if searched.contains(&text.to_lowercase()) || !followed.insert(text.to_string()) {
                    continue;
                }
                let (bucket, _) = lookup.get(PrefixKey::of(text), None)?;
                if let Some(entries) = bucket.get(&text.to_lowercase()) {
                    for entry in entries {
                        if entry.word == text {
                            extra.push(ResultItem {
                                word: entry.word.clone(),
                                meanings: entry.meanings.clone(),
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(extra)
}

use crate::store::types::{
    IDX_KEY_END, IDX_KEY_SEP, IDX_NULL, IDX_OFFSET_SEP, IDX_SPAN_SEP, KEYSPACE_SIZE, PrefixKey,
    Span, enumerate_keys,
};
use log::warn;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Total mapping from every bucket key to the spans holding its records.
/// `None` marks a bucket with no entries; the map always covers the whole
/// fixed keyspace, never a partial one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionIndex {
    buckets: BTreeMap<PrefixKey, Option<Vec<Span>>>,
}

impl PositionIndex {
    /// Build a total index from the populated buckets, filling every other
    /// key of the fixed keyspace with `None`.
    pub fn from_populated(populated: BTreeMap<PrefixKey, Vec<Span>>) -> Self {
        let mut populated = populated;
        let buckets = enumerate_keys()
            .map(|key| {
                let spans = populated.remove(&key);
                (key, spans)
            })
            .collect();
        Self { buckets }
    }

    /// An index with every bucket empty.
    pub fn empty() -> Self {
        Self::from_populated(BTreeMap::new())
    }

    /// Spans for one bucket, if it has any entries.
    pub fn spans(&self, key: PrefixKey) -> Option<&[Span]> {
        self.buckets.get(&key).and_then(|v| v.as_deref())
    }

    /// Number of buckets that hold at least one span.
    pub fn populated_count(&self) -> usize {
        self.buckets.values().filter(|v| v.is_some()).count()
    }

    /// Total number of spans across all buckets.
    pub fn span_count(&self) -> usize {
        self.buckets
            .values()
            .filter_map(|v| v.as_ref())
            .map(|v| v.len())
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PrefixKey, Option<&[Span]>)> {
        self.buckets.iter().map(|(k, v)| (*k, v.as_deref()))
    }

    /// Serialize to the index file text: `key:spec` groups joined by `,`,
    /// where `spec` is `\x00` for an empty bucket or `offset-length` spans
    /// joined by `|`.
    pub fn serialize(&self) -> String {
        // ~8 bytes per empty key group dominates the size
        let mut out = String::with_capacity(KEYSPACE_SIZE * 8);
        for (i, (key, spans)) in self.buckets.iter().enumerate() {
            if i != 0 {
                out.push(IDX_KEY_SEP);
            }
            let _ = write!(out, "{key}");
            out.push(IDX_KEY_END);
            match spans {
                None => out.push(IDX_NULL),
                Some(spans) => {
                    for (j, span) in spans.iter().enumerate() {
                        if j != 0 {
                            out.push(IDX_SPAN_SEP);
                        }
                        let _ = write!(out, "{}{}{}", span.offset, IDX_OFFSET_SEP, span.length);
                    }
                }
            }
        }
        out
    }

    /// Parse the index file text. A malformed key group is skipped (that
    /// bucket reads as empty); the rest of the index stays usable.
    pub fn parse(text: &str) -> Self {
        let mut populated = BTreeMap::new();
        for group in text.trim().split(IDX_KEY_SEP) {
            match parse_group(group) {
                Some((key, Some(spans))) => {
                    populated.insert(key, spans);
                }
                Some((_, None)) => {}
                None => {
                    if !group.is_empty() {
                        warn!("skipping malformed index record: {group:?}");
                    }
                }
            }
        }
        Self::from_populated(populated)
    }
}

fn parse_group(group: &str) -> Option<(PrefixKey, Option<Vec<Span>>)> {
    let (key, spec) = group.split_once(IDX_KEY_END)?;
    let key = PrefixKey::parse(key)?;
    if spec.starts_with(IDX_NULL) {
        return Some((key, None));
    }
    let mut spans = Vec::new();
    for piece in spec.split(IDX_SPAN_SEP) {
        let (offset, length) = piece.split_once(IDX_OFFSET_SEP)?;
        let span = Span::new(offset.parse().ok()?, length.parse().ok()?);
        spans.push(span);
    }
    if spans.is_empty() {
        return None;
    }
    Some((key, Some(spans)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PositionIndex {
        let mut populated = BTreeMap::new();
        populated.insert(PrefixKey::of("cat"), vec![Span::new(12, 34), Span::new(56, 78)]);
        populated.insert(PrefixKey::of("dog"), vec![Span::new(90, 7)]);
        populated.insert(PrefixKey::of("-"), vec![Span::new(0, 12)]);
        PositionIndex::from_populated(populated)
    }

    #[test]
    fn test_total_keyspace() {
        let index = sample();
        assert_eq!(index.iter().count(), KEYSPACE_SIZE);
        assert_eq!(index.populated_count(), 3);
        assert_eq!(index.span_count(), 4);
        assert_eq!(index.spans(PrefixKey::of("zebra")), None);
    }

    #[test]
    fn test_serialize_parse_roundtrip() {
        let index = sample();
        let text = index.serialize();
        assert_eq!(PositionIndex::parse(&text), index);

        let empty = PositionIndex::empty();
        assert_eq!(PositionIndex::parse(&empty.serialize()), empty);
    }

    #[test]
    fn test_serialized_shape() {
        let index = sample();
        let text = index.serialize();
        assert!(text.contains("cat:12-34|56-78"));
        assert!(text.contains("dog:90-7"));
        assert!(text.contains("#:0-12"));
        assert!(text.contains("zeb:\u{0}"));
    }

    #[test]
    fn test_malformed_group_skipped() {
        let good = "cat:12-34";
        let bad = "dog:12_34";
        let worse = "catfish:1-2";
        let text = format!("{good},{bad},{worse}");
        let index = PositionIndex::parse(&text);
        assert_eq!(
            index.spans(PrefixKey::of("cat")),
            Some(&[Span::new(12, 34)][..])
        );
        assert_eq!(index.spans(PrefixKey::of("dog")), None);
    }
}

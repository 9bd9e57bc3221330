use std::cmp::Ordering;
use std::fmt;

/// Record separators inside the store file. All payload is UTF-8; these
/// control bytes never occur in dictionary text.
pub const SEP_NAME: u8 = 0x1C; // \x1C{dictionary name}\x1C header
pub const SEP_WORD: u8 = 0x1E; // between records
pub const SEP_HEADWORD: u8 = 0x1F; // between headword and meanings
pub const SEP_MEANING: u8 = 0x1D; // between meanings of one record

/// Index file punctuation. e.g. `ab:12-34|56-78,ac:\x00,...`
pub const IDX_NULL: char = '\u{0}';
pub const IDX_KEY_SEP: char = ',';
pub const IDX_KEY_END: char = ':';
pub const IDX_SPAN_SEP: char = '|';
pub const IDX_OFFSET_SEP: char = '-';

/// Sentinel standing in for any non-letter character in a bucket key.
pub const KEY_SENTINEL: char = '#';

/// A byte range into the store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: u64,
    pub length: u64,
}

impl Span {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// The same range shifted forward by `base` bytes.
    pub fn rebased(self, base: u64) -> Self {
        Self::new(self.offset + base, self.length)
    }
}

/// Bucket key derived from a word's leading letters: up to three lowercase
/// letters, with `#` standing in for any non-letter. Unused trailing slots
/// are zero. This derivation is the single source of truth for bucket
/// assignment; the write and read paths both go through [`PrefixKey::of`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrefixKey {
    chars: [u8; 3],
}

impl PrefixKey {
    fn from_slots(c1: u8, c2: u8, c3: u8) -> Self {
        Self { chars: [c1, c2, c3] }
    }

    /// Derive the bucket key for a word. Empty input maps to the sentinel
    /// bucket, like any other non-letter start.
    pub fn of(word: &str) -> Self {
        let mut chars = word.chars().map(slot);
        let c1 = match chars.next() {
            Some(c) if c != SENTINEL_SLOT => c,
            _ => return Self::from_slots(SENTINEL_SLOT, 0, 0),
        };
        let c2 = match chars.next() {
            None => return Self::from_slots(c1, 0, 0),
            Some(SENTINEL_SLOT) => return Self::from_slots(c1, SENTINEL_SLOT, 0),
            Some(c) => c,
        };
        match chars.next() {
            None => Self::from_slots(c1, c2, 0),
            Some(SENTINEL_SLOT) => Self::from_slots(c1, c2, SENTINEL_SLOT),
            Some(c) => Self::from_slots(c1, c2, c),
        }
    }

    /// Parse a key as written in the index file (1..=3 of `a`-`z` / `#`).
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.is_empty() || bytes.len() > 3 {
            return None;
        }
        let mut chars = [0u8; 3];
        for (i, &b) in bytes.iter().enumerate() {
            if !(b.is_ascii_lowercase() || b == KEY_SENTINEL as u8) {
                return None;
            }
            chars[i] = b;
        }
        Some(Self { chars })
    }

    fn rank(&self, i: usize) -> u8 {
        // unused < 'a'..'z' < '#', so key order tracks the word comparator
        // (letters before non-letters at every position).
        match self.chars[i] {
            0 => 0,
            b if b.is_ascii_lowercase() => b - b'a' + 1,
            _ => 27,
        }
    }
}

const SENTINEL_SLOT: u8 = KEY_SENTINEL as u8;

/// Map a character onto its key slot: lowercase letters pass through,
/// anything else collapses to the sentinel.
fn slot(c: char) -> u8 {
    match c {
        'a'..='z' => c as u8,
        'A'..='Z' => c.to_ascii_lowercase() as u8,
        _ => SENTINEL_SLOT,
    }
}

impl Ord for PrefixKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in 0..3 {
            match self.rank(i).cmp(&other.rank(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for PrefixKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.chars.iter().take_while(|&&b| b != 0) {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrefixKey({self})")
    }
}

/// Enumerate the entire fixed keyspace in ascending [`PrefixKey`] order:
/// for each first letter the bare key, then each second-letter group (the
/// pair, the 26 triples, the `cc#` key), then the `c#` key; the bare `#`
/// key comes last, matching its rank. 18,981 keys.
pub fn enumerate_keys() -> impl Iterator<Item = PrefixKey> {
    (b'a'..=b'z')
        .flat_map(|c1| {
            std::iter::once(PrefixKey::from_slots(c1, 0, 0))
                .chain((b'a'..=b'z').flat_map(move |c2| {
                    std::iter::once(PrefixKey::from_slots(c1, c2, 0))
                        .chain((b'a'..=b'z').map(move |c3| PrefixKey::from_slots(c1, c2, c3)))
                        .chain(std::iter::once(PrefixKey::from_slots(c1, c2, SENTINEL_SLOT)))
                }))
                .chain(std::iter::once(PrefixKey::from_slots(c1, SENTINEL_SLOT, 0)))
        })
        .chain(std::iter::once(PrefixKey::from_slots(SENTINEL_SLOT, 0, 0)))
}

/// Total number of keys in the fixed keyspace.
pub const KEYSPACE_SIZE: usize = 1 + 26 * (2 + 26 * (2 + 26));

/// Order two words the way the store lays records out: compare lowercased
/// characters position by position with letters sorting before non-letters,
/// fall back to ordinal comparison of the raw strings on a tie.
pub fn word_cmp(x: &str, y: &str) -> Ordering {
    let mut xs = x.chars().flat_map(char::to_lowercase);
    let mut ys = y.chars().flat_map(char::to_lowercase);
    loop {
        match (xs.next(), ys.next()) {
            (Some(a), Some(b)) => {
                match (a.is_ascii_lowercase(), b.is_ascii_lowercase()) {
                    (true, false) => return Ordering::Less,
                    (false, true) => return Ordering::Greater,
                    _ => {}
                }
                match a.cmp(&b) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            _ => return x.cmp(y),
        }
    }
}

/// Newtype giving `BTreeMap` the store's word ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey(pub String);

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        word_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One parsed store record: the original-cased headword and its meanings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub word: String,
    pub meanings: Vec<String>,
}

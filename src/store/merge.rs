//! Incremental build of the store/index pair from raw word-list sources.
//!
//! Both merge modes write to temporary siblings of the live files and only
//! rename them into place after every byte has been written, so a failure
//! anywhere leaves the previous consistent pair untouched.

use crate::store::Store;
use crate::store::index::PositionIndex;
use crate::store::types::{
    PrefixKey, SEP_HEADWORD, SEP_MEANING, SEP_NAME, SEP_WORD, SortKey, Span,
};
use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Built-in raw source line templates: a literal prefix, a literal
/// headword/meaning separator, and a literal suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `■{word} : {meaning}`
    Bullet,
    /// `{word}\t{meaning}`
    Tab,
}

impl SourceFormat {
    fn template(self) -> (&'static str, &'static str, &'static str) {
        match self {
            SourceFormat::Bullet => ("■", " : ", ""),
            SourceFormat::Tab => ("", "\t", ""),
        }
    }
}

/// How a raw source file is folded into the store.
#[derive(Clone)]
pub struct ImportOptions {
    pub format: SourceFormat,
    /// Text encoding of the raw source file. Offsets recorded during parsing
    /// are byte offsets in this encoding; the store itself is always UTF-8.
    pub encoding: &'static Encoding,
    /// `true`: combine meanings of words already present into their record.
    /// `false`: append the new entries as a self-contained segment.
    pub merge_into_existing: bool,
    /// `true`: new meanings/segments come before existing ones, which is
    /// also the order results are shown in.
    pub insert_at_head: bool,
    /// Dictionary name written into the segment header (mode B only).
    pub name: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            format: SourceFormat::Bullet,
            encoding: UTF_8,
            merge_into_existing: false,
            insert_at_head: false,
            name: None,
        }
    }
}

/// Terminal outcome of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Succeeded,
    SourceFileNotFound,
    /// The store file exists but its index does not. Merging blind would
    /// orphan the existing records, so the caller must reset manually.
    IndexMissingWhileStorePresent,
    NoParseableEntries,
    UnknownFailure,
}

/// Import a raw source file, folding any error into
/// [`ImportOutcome::UnknownFailure`] after cleaning up temporaries.
pub fn import(store: &Store, source: &Path, options: &ImportOptions) -> ImportOutcome {
    match try_import(store, source, options) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("import of {} failed: {err:#}", source.display());
            let _ = fs::remove_file(store.store_temp_path());
            let _ = fs::remove_file(store.index_temp_path());
            ImportOutcome::UnknownFailure
        }
    }
}

pub(crate) fn try_import(
    store: &Store,
    source: &Path,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    if !source.exists() {
        return Ok(ImportOutcome::SourceFileNotFound);
    }
    if store.store_path().exists() && !store.index_path().exists() {
        return Ok(ImportOutcome::IndexMissingWhileStorePresent);
    }

    let raw = fs::read(source)
        .with_context(|| format!("failed to read source {}", source.display()))?;
    let items = parse_source(&raw, options.format, options.encoding);
    if items.is_empty() {
        return Ok(ImportOutcome::NoParseableEntries);
    }
    info!(
        "parsed {} headwords from {}",
        items.len(),
        source.display()
    );

    let index = if options.merge_into_existing {
        merge_into_existing(store, &raw, items, options)?
    } else {
        append_segment(store, &raw, items, options)?
    };

    fs::write(store.index_temp_path(), index.serialize())
        .context("failed to write index temp file")?;
    fs::rename(store.store_temp_path(), store.store_path())
        .context("failed to promote store file")?;
    fs::rename(store.index_temp_path(), store.index_path())
        .context("failed to promote index file")?;
    store.install(index);
    info!("promoted new store at {}", store.dir().display());
    Ok(ImportOutcome::Succeeded)
}

/// Byte length of `text` in the source encoding.
fn encoded_len(encoding: &'static Encoding, text: &str) -> u64 {
    if encoding == UTF_8 {
        text.len() as u64
    } else if encoding == UTF_16LE || encoding == UTF_16BE {
        (text.encode_utf16().count() * 2) as u64
    } else {
        let (bytes, _, _) = encoding.encode(text);
        bytes.len() as u64
    }
}

/// Bracket characters that open a headword annotation. Parentheses are
/// handled separately (stripped variants share the meaning span).
const LEFT_BRACKETS: &[char] = &[
    '<', '[', '{', '＜', '［', '｛', '｟', '｢', '〈', '《', '「', '『', '【', '〔', '〖', '〘',
    '〚', '⟦', '⟨', '⟪', '⟬', '⟮', '⦃', '⦅', '⦇', '⦉', '⦋', '⦍', '⦏', '⦑', '⦗', '⧼', '❨',
    '❪', '❬', '❮', '❰', '❲', '❴', '⁽', '₍',
];

/// Parse the raw source into word -> meaning spans (byte ranges into the raw
/// file, in its own encoding), ordered by the store's word comparator.
fn parse_source(
    raw: &[u8],
    format: SourceFormat,
    encoding: &'static Encoding,
) -> BTreeMap<SortKey, Vec<Span>> {
    let (decoded, _, _) = encoding.decode(raw);
    let text = decoded.as_ref();

    // Line-break byte length is detected once, from just after the first
    // line, and assumed uniform for the rest of the file.
    let first_break = text.find(['\r', '\n']);
    let line_break = match first_break {
        Some(i) if text[i..].starts_with("\r\n") => "\r\n",
        Some(i) if text[i..].starts_with('\r') => "\r",
        Some(_) => "\n",
        None => "",
    };
    let break_len = encoded_len(encoding, line_break);

    let mut items: BTreeMap<SortKey, Vec<Span>> = BTreeMap::new();
    let mut position = 0u64;
    let lines: Vec<&str> = if line_break.is_empty() {
        vec![text]
    } else {
        text.split(line_break).collect()
    };
    for line in lines {
        // A replacement char means this line did not survive decoding; its
        // byte bookkeeping would be wrong, so only that line is dropped.
        if !line.contains('\u{FFFD}') {
            for (word, offset, length) in parse_line(line, format, encoding) {
                items
                    .entry(SortKey(word))
                    .or_default()
                    .push(Span::new(position + offset, length));
            }
        }
        position += encoded_len(encoding, line) + break_len;
    }
    items
}

/// Parse one source line into (headword, meaning offset, meaning length)
/// triples. Offsets are relative to the start of the line, in the source
/// encoding. Lines not matching the template are skipped, not an error.
fn parse_line(
    line: &str,
    format: SourceFormat,
    encoding: &'static Encoding,
) -> Vec<(String, u64, u64)> {
    let (prefix, separator, suffix) = format.template();
    if line.trim().is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = line.split(separator).collect();
    let &[head, tail] = parts.as_slice() else {
        return Vec::new();
    };
    if !head.starts_with(prefix) || !tail.ends_with(suffix) {
        return Vec::new();
    }

    let word_part = &head[prefix.len()..];
    let meaning = tail[..tail.len() - suffix.len()].trim();
    if meaning.is_empty() {
        return Vec::new();
    }
    // First occurrence locates the span; the meaning is a substring of the
    // line, so this always succeeds.
    let meaning_at = match line.find(meaning) {
        Some(i) => i,
        None => return Vec::new(),
    };
    let offset = encoded_len(encoding, &line[..meaning_at]);
    let length = encoded_len(encoding, meaning);

    let stripped = word_part.replace(['(', ')'], "");
    let mut variants = vec![word_part.to_string()];
    if stripped.len() != word_part.len() {
        variants.push(stripped);
    }

    let mut out = Vec::new();
    for variant in variants {
        let headword = match variant.find(LEFT_BRACKETS) {
            Some(i) => variant[..i].trim(),
            None => variant.trim(),
        };
        if !headword.is_empty() {
            out.push((headword.to_string(), offset, length));
        }
    }
    out
}

/// Where the bytes of a merged meaning span live.
enum SpanSource {
    /// Byte range into the raw source file (its own encoding).
    Raw(Span),
    /// Byte range into the previous store file (UTF-8).
    Store(Span),
}

/// Transcode a raw-file span to UTF-8. `None` drops only that record range.
fn decode_span(raw: &[u8], span: Span, encoding: &'static Encoding) -> Option<Vec<u8>> {
    let start = span.offset as usize;
    let bytes = raw.get(start..start + span.length as usize)?;
    if encoding == UTF_8 {
        std::str::from_utf8(bytes).ok()?;
        return Some(bytes.to_vec());
    }
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return None;
    }
    Some(text.into_owned().into_bytes())
}

/// Mode A: rewrite the whole store with the new meanings folded into each
/// word's record.
fn merge_into_existing(
    store: &Store,
    raw: &[u8],
    items: BTreeMap<SortKey, Vec<Span>>,
    options: &ImportOptions,
) -> Result<PositionIndex> {
    let store_path = store.store_path();
    let (previous, prev_file) = if store_path.exists() {
        let scanned = scan_previous(&store_path)?;
        debug!("previous store holds {} headwords", scanned.len());
        let file = File::open(&store_path)
            .with_context(|| format!("failed to open {}", store_path.display()))?;
        (scanned, Some(file))
    } else {
        (BTreeMap::new(), None)
    };

    let merged = merge_words(previous, items, options.insert_at_head);

    let temp = store.store_temp_path();
    let mut out = BufWriter::new(
        File::create(&temp).with_context(|| format!("failed to create {}", temp.display()))?,
    );
    let mut positions: BTreeMap<PrefixKey, Vec<Span>> = BTreeMap::new();
    let mut offset = 0u64;
    let mut bucket: Option<(PrefixKey, u64)> = None;

    let total = merged.len();
    for (i, (word, sources)) in merged.into_iter().enumerate() {
        let record_start = offset;
        let key = PrefixKey::of(&word);
        match bucket {
            Some((open, start)) if open != key => {
                // close the finished bucket at the boundary before this record
                positions.insert(open, vec![Span::new(start, record_start - start)]);
                bucket = Some((key, record_start));
            }
            None => bucket = Some((key, record_start)),
            Some(_) => {}
        }

        let mut chunks: Vec<Vec<u8>> = Vec::with_capacity(sources.len());
        for source in sources {
            match source {
                SpanSource::Raw(span) => match decode_span(raw, span, options.encoding) {
                    Some(bytes) => chunks.push(bytes),
                    None => warn!("dropping undecodable meaning range for {word:?}"),
                },
                SpanSource::Store(span) => {
                    let file = prev_file
                        .as_ref()
                        .context("store span produced without a previous store")?;
                    chunks.push(read_span(file, span)?);
                }
            }
        }

        out.write_all(word.as_bytes())?;
        out.write_all(&[SEP_HEADWORD])?;
        offset += word.len() as u64 + 1;
        for (j, chunk) in chunks.iter().enumerate() {
            if j != 0 {
                out.write_all(&[SEP_MEANING])?;
                offset += 1;
            }
            out.write_all(chunk)?;
            offset += chunk.len() as u64;
        }
        if i != total - 1 {
            out.write_all(&[SEP_WORD])?;
            offset += 1;
        }
    }
    if let Some((open, start)) = bucket {
        positions.insert(open, vec![Span::new(start, offset - start)]);
    }
    out.flush()?;
    Ok(PositionIndex::from_populated(positions))
}

/// Sequentially scan a store file into word -> whole-meaning-blob span.
fn scan_previous(path: &Path) -> Result<BTreeMap<SortKey, Span>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut map = BTreeMap::new();
    let mut buf = [0u8; 8192];
    let mut pos = 0u64;
    let mut in_name = false;
    let mut word_buf: Vec<u8> = Vec::new();
    let mut current: Option<(String, u64)> = None;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for (i, &byte) in buf[..n].iter().enumerate() {
            let at = pos + i as u64;
            if in_name {
                if byte == SEP_NAME {
                    in_name = false;
                }
                continue;
            }
            match byte {
                SEP_NAME => {
                    // a mid-file segment header also terminates the open record
                    if let Some((word, start)) = current.take() {
                        map.insert(SortKey(word), Span::new(start, at - start));
                    }
                    in_name = true;
                    word_buf.clear();
                }
                SEP_HEADWORD => {
                    let word = String::from_utf8_lossy(&word_buf).into_owned();
                    word_buf.clear();
                    current = Some((word, at + 1));
                }
                SEP_WORD => {
                    if let Some((word, start)) = current.take() {
                        map.insert(SortKey(word), Span::new(start, at - start));
                    }
                    word_buf.clear();
                }
                _ => {
                    if current.is_none() {
                        word_buf.push(byte);
                    }
                }
            }
        }
        pos += n as u64;
    }
    if let Some((word, start)) = current {
        map.insert(SortKey(word), Span::new(start, pos - start));
    }
    Ok(map)
}

/// Two-pointer merge of the previous store's words and the newly parsed
/// words, both already in comparator order. For a word present on both
/// sides, `insert_at_head` decides whether the new spans come first.
fn merge_words(
    previous: BTreeMap<SortKey, Span>,
    added: BTreeMap<SortKey, Vec<Span>>,
    insert_at_head: bool,
) -> Vec<(String, Vec<SpanSource>)> {
    use std::cmp::Ordering;

    let mut out = Vec::with_capacity(previous.len() + added.len());
    let mut prev = previous.into_iter().peekable();
    let mut add = added.into_iter().peekable();

    loop {
        let ordering = match (prev.peek(), add.peek()) {
            (Some((pk, _)), Some((ak, _))) => pk.cmp(ak),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match ordering {
            Ordering::Less => {
                if let Some((key, span)) = prev.next() {
                    out.push((key.0, vec![SpanSource::Store(span)]));
                }
            }
            Ordering::Greater => {
                if let Some((key, spans)) = add.next() {
                    out.push((key.0, spans.into_iter().map(SpanSource::Raw).collect()));
                }
            }
            Ordering::Equal => {
                if let (Some((key, span)), Some((_, spans))) = (prev.next(), add.next()) {
                    let mut sources: Vec<SpanSource> =
                        spans.into_iter().map(SpanSource::Raw).collect();
                    if insert_at_head {
                        sources.push(SpanSource::Store(span));
                    } else {
                        sources.insert(0, SpanSource::Store(span));
                    }
                    out.push((key.0, sources));
                }
            }
        }
    }
    out
}

fn read_span(mut file: &File, span: Span) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; span.length as usize];
    file.seek(SeekFrom::Start(span.offset))?;
    file.read_exact(&mut bytes)
        .context("previous store span out of range")?;
    Ok(bytes)
}

/// Mode B: keep the previous store's bytes intact and place the new entries
/// as a self-contained segment before or after them.
fn append_segment(
    store: &Store,
    raw: &[u8],
    items: BTreeMap<SortKey, Vec<Span>>,
    options: &ImportOptions,
) -> Result<PositionIndex> {
    let prev_path = store.store_path();
    let prev_exists = prev_path.exists();
    let temp = store.store_temp_path();
    let mut out = BufWriter::new(
        File::create(&temp).with_context(|| format!("failed to create {}", temp.display()))?,
    );
    let mut offset = 0u64;

    if !prev_exists {
        let segment = write_segment(&mut out, &mut offset, raw, &items, options)?;
        out.flush()?;
        let populated = segment.into_iter().map(|(k, s)| (k, vec![s])).collect();
        return Ok(PositionIndex::from_populated(populated));
    }

    let prev_index_text = fs::read_to_string(store.index_path())
        .with_context(|| format!("failed to read {}", store.index_path().display()))?;
    let prev_index = PositionIndex::parse(&prev_index_text);

    let (segment, prev_base) = if options.insert_at_head {
        let segment = write_segment(&mut out, &mut offset, raw, &items, options)?;
        let base = copy_previous(&mut out, &mut offset, &prev_path)?;
        (segment, base)
    } else {
        let base = copy_previous(&mut out, &mut offset, &prev_path)?;
        let segment = write_segment(&mut out, &mut offset, raw, &items, options)?;
        (segment, base)
    };
    out.flush()?;

    let mut populated: BTreeMap<PrefixKey, Vec<Span>> = BTreeMap::new();
    for (key, spans) in prev_index.iter() {
        if let Some(spans) = spans {
            populated.insert(key, spans.iter().map(|s| s.rebased(prev_base)).collect());
        }
    }
    for (key, span) in segment {
        let bucket = populated.entry(key).or_default();
        if options.insert_at_head {
            bucket.insert(0, span);
        } else {
            bucket.push(span);
        }
    }
    Ok(PositionIndex::from_populated(populated))
}

/// Copy the previous store file, injecting an empty name header in front of
/// a legacy headerless store. Returns the absolute offset its first byte
/// landed at.
fn copy_previous<W: Write>(out: &mut W, offset: &mut u64, path: &Path) -> Result<u64> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut first = [0u8; 1];
    let has_header = match file.read(&mut first)? {
        0 => true, // nothing to prefix on an empty store
        _ => first[0] == SEP_NAME,
    };
    if !has_header {
        out.write_all(&[SEP_NAME, SEP_NAME])?;
        *offset += 2;
    }
    let base = *offset;
    file.seek(SeekFrom::Start(0))?;
    let copied = std::io::copy(&mut file, out)?;
    *offset += copied;
    Ok(base)
}

/// Write the new entries as one segment (`\x1C{name}\x1C` header followed by
/// the records) and derive its bucket spans: per key, the offset of its
/// first record up to the next key's first record, the last bucket ending at
/// the segment's end.
fn write_segment<W: Write>(
    out: &mut W,
    offset: &mut u64,
    raw: &[u8],
    items: &BTreeMap<SortKey, Vec<Span>>,
    options: &ImportOptions,
) -> Result<BTreeMap<PrefixKey, Span>> {
    let name = options.name.as_deref().unwrap_or("");
    out.write_all(&[SEP_NAME])?;
    out.write_all(name.as_bytes())?;
    out.write_all(&[SEP_NAME])?;
    *offset += name.len() as u64 + 2;

    let mut starts: BTreeMap<PrefixKey, u64> = BTreeMap::new();
    let total = items.len();
    for (i, (word, spans)) in items.iter().enumerate() {
        let key = PrefixKey::of(&word.0);
        starts.entry(key).or_insert(*offset);

        let mut chunks: Vec<Vec<u8>> = Vec::with_capacity(spans.len());
        for &span in spans {
            match decode_span(raw, span, options.encoding) {
                Some(bytes) => chunks.push(bytes),
                None => warn!("dropping undecodable meaning range for {:?}", word.0),
            }
        }

        out.write_all(word.0.as_bytes())?;
        out.write_all(&[SEP_HEADWORD])?;
        *offset += word.0.len() as u64 + 1;
        for (j, chunk) in chunks.iter().enumerate() {
            if j != 0 {
                out.write_all(&[SEP_MEANING])?;
                *offset += 1;
            }
            out.write_all(chunk)?;
            *offset += chunk.len() as u64;
        }
        if i != total - 1 {
            out.write_all(&[SEP_WORD])?;
            *offset += 1;
        }
    }
    let end = *offset;

    // word order and key order are monotone together, so consecutive bucket
    // starts delimit each other
    let mut result = BTreeMap::new();
    let ordered: Vec<(PrefixKey, u64)> = starts.into_iter().collect();
    for (i, &(key, start)) in ordered.iter().enumerate() {
        let until = ordered.get(i + 1).map(|&(_, next)| next).unwrap_or(end);
        result.insert(key, Span::new(start, until - start));
    }
    Ok(result)
}

//! Cached bucket reads against the store file.

use crate::store::Store;
use crate::store::types::{Entry, PrefixKey, SEP_HEADWORD, SEP_MEANING, SEP_WORD, Span, word_cmp};
use ahash::AHashMap;
use anyhow::{Context, Result};
use log::debug;
use lru::LruCache;
use memchr::{memchr, memchr_iter};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One parsed bucket: lowercased headword to its entries, ordered
/// head-most span first.
pub type Bucket = AHashMap<String, Vec<Entry>>;

const CACHE_CAPACITY: usize = 20;
const CACHE_IDLE_LIMIT: Duration = Duration::from_secs(60);
const HANDLE_IDLE_LIMIT: Duration = Duration::from_secs(20);

/// Stateful reader over a [`Store`]: a bounded bucket cache plus a lazily
/// opened store file handle.
///
/// Cache reads go through `peek`, so recency is only ever advanced by
/// insertion and the eviction order degenerates to least-recently-added.
/// Expiry is lazy: the idle windows are checked on access, not by a timer.
pub struct Lookup<'a> {
    store: &'a Store,
    cache: LruCache<PrefixKey, Arc<Bucket>>,
    last_write: Instant,
    handle: Option<(File, Instant)>,
    generation: u64,
}

impl<'a> Lookup<'a> {
    pub fn new(store: &'a Store) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            cache: LruCache::new(capacity),
            last_write: Instant::now(),
            handle: None,
            generation: store.generation(),
        }
    }

    /// Fetch one bucket, reading and parsing it from the store file on a
    /// cache miss. With a `suggestion_prefix`, also collects the bucket's
    /// lowercased headwords starting with that prefix.
    ///
    /// A key with no spans yields an empty bucket that is never cached.
    pub fn get(
        &mut self,
        key: PrefixKey,
        suggestion_prefix: Option<&str>,
    ) -> Result<(Arc<Bucket>, Option<Vec<String>>)> {
        self.expire();
        let cached = self.cache.peek(&key).cloned();
        let bucket = match cached {
            Some(bucket) => bucket,
            None => {
                let bucket = Arc::new(self.read_bucket(key)?);
                if self.store.snapshot().spans(key).is_some() {
                    self.cache.push(key, bucket.clone());
                    self.last_write = Instant::now();
                }
                bucket
            }
        };
        let suggestions = suggestion_prefix.map(|prefix| {
            let mut words: Vec<String> = bucket
                .keys()
                .filter(|word| word.starts_with(prefix))
                .cloned()
                .collect();
            words.sort_by(|a, b| word_cmp(a, b));
            words
        });
        Ok((bucket, suggestions))
    }

    /// Drop the store file handle. The next read reopens it.
    pub fn close(&mut self) {
        self.handle = None;
    }

    /// Number of buckets currently cached.
    pub fn cached_buckets(&self) -> usize {
        self.cache.len()
    }

    fn expire(&mut self) {
        let generation = self.store.generation();
        if generation != self.generation {
            debug!("index snapshot changed, dropping bucket cache");
            self.cache.clear();
            // the held handle still points at the replaced store file
            self.handle = None;
            self.generation = generation;
        } else if !self.cache.is_empty() && self.last_write.elapsed() > CACHE_IDLE_LIMIT {
            debug!("bucket cache idle past limit, dropping it");
            self.cache.clear();
        }
        let handle_stale = self
            .handle
            .as_ref()
            .is_some_and(|(_, used)| used.elapsed() > HANDLE_IDLE_LIMIT);
        if handle_stale {
            self.handle = None;
        }
    }

    fn read_bucket(&mut self, key: PrefixKey) -> Result<Bucket> {
        let snapshot = self.store.snapshot();
        let mut bucket = Bucket::default();
        let Some(spans) = snapshot.spans(key) else {
            return Ok(bucket);
        };
        for &span in spans {
            let bytes = self.read_span(span)?;
            parse_records(&bytes, &mut bucket);
        }
        Ok(bucket)
    }

    fn read_span(&mut self, span: Span) -> Result<Vec<u8>> {
        let pair = match self.handle.take() {
            Some(pair) => pair,
            None => {
                let path = self.store.store_path();
                let file = File::open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                (file, Instant::now())
            }
        };
        let (file, used) = self.handle.insert(pair);
        *used = Instant::now();
        file.seek(SeekFrom::Start(span.offset))?;
        let mut bytes = vec![0u8; span.length as usize];
        file.read_exact(&mut bytes)
            .context("bucket span out of range")?;
        Ok(bytes)
    }

    #[cfg(test)]
    fn backdate_cache(&mut self, by: Duration) {
        self.last_write -= by;
    }
}

/// Parse the records inside one span's bytes into the bucket map. Malformed
/// records (no headword separator, invalid UTF-8, header leftovers) are
/// skipped, never an error.
fn parse_records(bytes: &[u8], bucket: &mut Bucket) {
    let mut start = 0usize;
    for end in memchr_iter(SEP_WORD, bytes).chain(std::iter::once(bytes.len())) {
        let record = &bytes[start..end.max(start)];
        start = end + 1;
        let Some(sep) = memchr(SEP_HEADWORD, record) else {
            continue;
        };
        let Ok(word) = std::str::from_utf8(&record[..sep]) else {
            continue;
        };
        if word.is_empty() || word.bytes().any(|b| b < 0x20) {
            continue;
        }
        let Ok(blob) = std::str::from_utf8(&record[sep + 1..]) else {
            continue;
        };
        let meanings: Vec<String> = blob
            .split(SEP_MEANING as char)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        bucket.entry(word.to_lowercase()).or_default().push(Entry {
            word: word.to_string(),
            meanings,
        });
    }
}

//! End-to-end tests over the public API: importing raw sources, merge
//! ordering, failure atomicity, and the search pipeline.

use lexi::query::{Inflections, search};
use lexi::store::{
    ImportOptions, ImportOutcome, Lookup, PrefixKey, SourceFormat, Store, import,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn options(merge: bool, head: bool) -> ImportOptions {
    ImportOptions {
        format: SourceFormat::Tab,
        merge_into_existing: merge,
        insert_at_head: head,
        ..ImportOptions::default()
    }
}

fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_import_then_lookup() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let source = write_source(dir.path(), "a.txt", "Cat\tthe animal\n");

    assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let (bucket, _) = lookup.get(PrefixKey::of("cat"), None).unwrap();
    let entries = &bucket["cat"];
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].word, "Cat");
    assert_eq!(entries[0].meanings, ["the animal"]);
}

#[test]
fn test_bullet_format() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let source = write_source(dir.path(), "a.txt", "■dog : loyal friend\nnot a record\n");
    let bullet = ImportOptions::default();

    assert_eq!(import(&store, &source, &bullet), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let (bucket, _) = lookup.get(PrefixKey::of("dog"), None).unwrap();
    assert_eq!(bucket["dog"][0].meanings, ["loyal friend"]);
}

#[test]
fn test_merge_head_places_new_meanings_first() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let first = write_source(dir.path(), "a.txt", "cat\tfirst\n");
    let second = write_source(dir.path(), "b.txt", "cat\tsecond\n");

    assert_eq!(import(&store, &first, &options(false, false)), ImportOutcome::Succeeded);
    assert_eq!(import(&store, &second, &options(true, true)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let (bucket, _) = lookup.get(PrefixKey::of("cat"), None).unwrap();
    assert_eq!(bucket["cat"][0].meanings, ["second", "first"]);
}

#[test]
fn test_merge_tail_places_new_meanings_last() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let first = write_source(dir.path(), "a.txt", "cat\tfirst\n");
    let second = write_source(dir.path(), "b.txt", "cat\tsecond\n");

    assert_eq!(import(&store, &first, &options(false, false)), ImportOutcome::Succeeded);
    assert_eq!(import(&store, &second, &options(true, false)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let (bucket, _) = lookup.get(PrefixKey::of("cat"), None).unwrap();
    assert_eq!(bucket["cat"][0].meanings, ["first", "second"]);
}

#[test]
fn test_segment_append_rebases_offsets() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let first = write_source(dir.path(), "a.txt", "cat\told meaning\ndog\tcanine\n");
    let second = write_source(dir.path(), "b.txt", "ant\tinsect\ncat\tnewer meaning\n");

    assert_eq!(import(&store, &first, &options(false, false)), ImportOutcome::Succeeded);
    // append a new segment in front of the previous store
    assert_eq!(import(&store, &second, &options(false, true)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let (bucket, _) = lookup.get(PrefixKey::of("cat"), None).unwrap();
    let cats = &bucket["cat"];
    assert_eq!(cats.len(), 2);
    assert_eq!(cats[0].meanings, ["newer meaning"]);
    assert_eq!(cats[1].meanings, ["old meaning"]);

    // entries of both segments still resolve after the rebase
    let (bucket, _) = lookup.get(PrefixKey::of("dog"), None).unwrap();
    assert_eq!(bucket["dog"][0].meanings, ["canine"]);
    let (bucket, _) = lookup.get(PrefixKey::of("ant"), None).unwrap();
    assert_eq!(bucket["ant"][0].meanings, ["insect"]);
}

#[test]
fn test_combining_merge_over_appended_segments() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let first = write_source(dir.path(), "a.txt", "cat\tfeline\n");
    let second = write_source(dir.path(), "b.txt", "ant\tinsect\n");
    let third = write_source(dir.path(), "c.txt", "dog\tcanine\n");

    // two segment appends leave a header in the middle of the store
    assert_eq!(import(&store, &first, &options(false, false)), ImportOutcome::Succeeded);
    assert_eq!(import(&store, &second, &options(false, true)), ImportOutcome::Succeeded);
    // the combining merge must keep the records on both sides of it
    assert_eq!(import(&store, &third, &options(true, false)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let (bucket, _) = lookup.get(PrefixKey::of("ant"), None).unwrap();
    assert_eq!(bucket["ant"][0].meanings, ["insect"]);
    let (bucket, _) = lookup.get(PrefixKey::of("cat"), None).unwrap();
    assert_eq!(bucket["cat"][0].meanings, ["feline"]);
    let (bucket, _) = lookup.get(PrefixKey::of("dog"), None).unwrap();
    assert_eq!(bucket["dog"][0].meanings, ["canine"]);
}

#[test]
fn test_failed_import_leaves_files_untouched() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let first = write_source(dir.path(), "a.txt", "cat\tfirst\n");
    assert_eq!(import(&store, &first, &options(false, false)), ImportOutcome::Succeeded);

    let store_bytes = fs::read(store.store_path()).unwrap();
    let index_bytes = fs::read(store.index_path()).unwrap();

    // a directory squatting on the temp path makes the write fail mid-merge
    let temp = store.store_path().with_file_name("dictionary.lexdata.tmp");
    fs::create_dir(&temp).unwrap();

    let second = write_source(dir.path(), "b.txt", "cat\tsecond\n");
    assert_eq!(import(&store, &second, &options(true, true)), ImportOutcome::UnknownFailure);

    assert_eq!(fs::read(store.store_path()).unwrap(), store_bytes);
    assert_eq!(fs::read(store.index_path()).unwrap(), index_bytes);
}

#[test]
fn test_missing_source_outcome() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let outcome = import(&store, &dir.path().join("absent.txt"), &options(false, false));
    assert_eq!(outcome, ImportOutcome::SourceFileNotFound);
}

#[test]
fn test_no_parseable_entries_outcome() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let source = write_source(dir.path(), "a.txt", "no separators here\n\n   \n");
    assert_eq!(
        import(&store, &source, &options(false, false)),
        ImportOutcome::NoParseableEntries
    );
    assert!(!store.store_path().exists());
}

#[test]
fn test_index_missing_refusal() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let source = write_source(dir.path(), "a.txt", "cat\tfeline\n");
    assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);

    fs::remove_file(store.index_path()).unwrap();
    assert_eq!(
        import(&store, &source, &options(true, false)),
        ImportOutcome::IndexMissingWhileStorePresent
    );

    // reset is the manual resolution
    store.reset().unwrap();
    assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);
}

#[test]
fn test_search_finds_base_form() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let source = write_source(dir.path(), "a.txt", "look up\tto research\nrun\tto move fast\n");
    assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let results = search(&mut lookup, "looked up", Inflections::builtin()).unwrap();
    assert!(results.items.iter().any(|item| item.word == "look up"));

    let results = search(&mut lookup, "running", Inflections::builtin()).unwrap();
    assert!(results.items.iter().any(|item| item.word == "run"));
}

#[test]
fn test_reference_markers_followed() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let source = write_source(
        dir.path(),
        "a.txt",
        "glossary\ta related term <→see also>\nsee also\tcross reference\nSEE ALSO\twrong case\n",
    );
    assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let results = search(&mut lookup, "glossary", Inflections::builtin()).unwrap();
    let words: Vec<&str> = results.items.iter().map(|i| i.word.as_str()).collect();
    assert!(words.contains(&"glossary"));
    // only the case-sensitive match is appended
    assert!(words.contains(&"see also"));
    assert!(!words.contains(&"SEE ALSO"));
}

#[test]
fn test_suggestions_for_prefix() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let source = write_source(
        dir.path(),
        "a.txt",
        "cat\tfeline\ncatalog\ta list\ncatch\tto grab\n",
    );
    assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);

    let mut lookup = Lookup::new(&store);
    let results = search(&mut lookup, "cat", Inflections::builtin()).unwrap();
    assert_eq!(results.suggestions, ["cat", "catalog", "catch"]);
}

#[test]
fn test_store_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        let source = write_source(dir.path(), "a.txt", "cat\tfeline\n");
        assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);
    }
    let store = Store::open(dir.path()).unwrap();
    let mut lookup = Lookup::new(&store);
    let (bucket, _) = lookup.get(PrefixKey::of("cat"), None).unwrap();
    assert_eq!(bucket["cat"][0].meanings, ["feline"]);
}

#[test]
fn test_fingerprint_tracks_imports() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    assert!(store.fingerprint().unwrap().is_none());

    let source = write_source(dir.path(), "a.txt", "cat\tfeline\n");
    assert_eq!(import(&store, &source, &options(false, false)), ImportOutcome::Succeeded);
    let first = store.fingerprint().unwrap().unwrap();

    let second_source = write_source(dir.path(), "b.txt", "dog\tcanine\n");
    assert_eq!(import(&store, &second_source, &options(false, false)), ImportOutcome::Succeeded);
    let second = store.fingerprint().unwrap().unwrap();
    assert_ne!(first, second);
}

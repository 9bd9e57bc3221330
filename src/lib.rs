//! # Lexi - Local Dictionary Lookup Engine
//!
//! Lexi builds a compact binary store plus a prefix-bucketed position index
//! from raw word-list files, and at query time expands a free-form phrase
//! into morphological and orthographic variants to find matching headwords
//! fast.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`store`] - On-disk store/index formats, incremental merge, cached reads
//! - [`query`] - Phrase normalization, variant expansion, result assembly
//! - [`translate`] - External machine-translation collaborator seam
//! - [`utils`] - Data directory resolution, file fingerprinting
//!
//! ## Quick Start
//!
//! ```ignore
//! use lexi::query::{search, Inflections};
//! use lexi::store::{import, ImportOptions, Lookup, Store};
//! use std::path::Path;
//!
//! let store = Store::open(Path::new("/path/to/dictionary")).unwrap();
//! import(&store, Path::new("wordlist.txt"), &ImportOptions::default());
//!
//! let mut lookup = Lookup::new(&store);
//! let results = search(&mut lookup, "looked up", Inflections::builtin()).unwrap();
//! for item in results.items {
//!     println!("{}: {}", item.word, item.meanings.join("; "));
//! }
//! ```
//!
//! ## Consistency
//!
//! Imports always write to temporary siblings of the live files and promote
//! them by rename only after full success, and the in-memory index snapshot
//! is swapped wholesale. Concurrent readers observe either the fully old or
//! the fully new dictionary, never a partial one.

pub mod query;
pub mod store;
pub mod translate;
pub mod utils;

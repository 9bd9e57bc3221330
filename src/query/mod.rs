//! Query-time phrase expansion and dictionary dispatch.

pub mod combinator;
pub mod executor;
pub mod normalize;
pub mod reference;
pub mod variants;

pub use combinator::combinations;
pub use executor::{ResultItem, SearchResults, candidates, search};
pub use variants::Inflections;

//! Shared utilities.
//!
//! - [`app_data`] - Application data directory management (XDG-compliant)
//! - [`hash`] - File content fingerprints for external edit detection

pub mod app_data;
pub mod hash;

pub use app_data::get_dictionary_dir;
pub use hash::file_digest;

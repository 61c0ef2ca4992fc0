//! ZIP archive building and extraction.
//!
//! `.nupkg` files are plain ZIP containers, so the same extractor serves
//! both downloaded packages and archives produced by this tool.

mod builder;
mod extract;

pub use builder::{build_archive, list_entries, BuiltArchive};
pub use extract::extract_archive;

//! Path and name model.
//!
//! Immutable, structurally shared names for directories and files. Every
//! table in the crate keys on these and orders them with one comparer.

pub mod comparer;
pub mod names;

pub use comparer::PathComparer;
pub use names::{DirectoryName, FileName, NAME_COMPARER};

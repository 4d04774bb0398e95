//! File contents held in memory and the pieces they are searched in.

pub mod file_contents;
pub mod kind;
pub mod loader;
pub mod piece;

pub use file_contents::{CharacterWidth, FileContents};
pub use kind::{FileKind, sniff};
pub use loader::{LoadOptions, last_modified, load_file_contents};
pub use piece::{FileContentsPiece, split_into_pieces};

//! Immutable snapshots of the project file trees and the machinery that
//! keeps them current.
//!
//! A [`FileSystemTreeSnapshot`] is never modified once published. Updates
//! produce a new snapshot that shares every unchanged subtree with the
//! previous one.

pub mod builder;
pub mod changes;
pub mod classifier;
pub mod manager;
pub mod types;

pub use builder::DirectorySnapshotBuilder;
pub use changes::{FullPathChanges, PathChangeEntry, PathChangeKind, ProjectPathChanges};
pub use classifier::{ChangeClassification, classify_changes};
pub use manager::{FileSystemSnapshotManager, SnapshotEvent, SnapshotListener};
pub use types::{DirectorySnapshot, FileSystemTreeSnapshot, ProjectRootSnapshot};

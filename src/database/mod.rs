//! The file database: every file of the current snapshot with its loaded
//! contents, split into balanced partitions for parallel search.

pub mod builder;
pub mod manager;
pub mod partition;
pub mod snapshot;

pub use builder::{BuildOptions, FileDatabaseBuilder};
pub use manager::{DatabaseEvent, DatabaseListener, FileDatabaseManager};
pub use partition::partition_pieces;
pub use snapshot::{FileDatabaseSnapshot, FileWithContents};

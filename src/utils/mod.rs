//! Shared plumbing: the serial task queue, progress indicators and logging.

pub mod logging;
pub mod progress;
pub mod task_queue;

pub use logging::init_logging;
pub use task_queue::TaskQueue;

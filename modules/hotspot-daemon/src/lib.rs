pub mod runner;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use runner::Runner;
pub use traits::{CheckpointStore, ClusterSink, MessageSource};

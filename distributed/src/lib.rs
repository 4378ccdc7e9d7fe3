mod cluster;
mod queue;
pub mod shuffle;

pub use cluster::{ClusterConfig, LocalCluster};
pub use queue::Queue;

pub mod engine;
pub mod extract;
pub mod graph;
pub mod grid;
pub mod message;
pub mod optics;
pub mod plot;
pub mod similarity;
pub mod store;
pub mod summary;

pub use engine::{CycleOutcome, CycleReport, Engine};
pub use extract::{Cluster, ClusterExtractor};
pub use graph::NeighborGraph;
pub use grid::{BoundingBox, CellCoord, SpatialGrid};
pub use message::{Message, MessageId, Messages, Neighbor};
pub use optics::OpticsIndex;
pub use plot::{PlotBuilder, PlotEntry, ReachabilityPlot};
pub use store::MessageStore;

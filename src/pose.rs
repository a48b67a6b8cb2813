//! Spatial and hierarchical poses, the operations over them and the per
//! instance pose buffers

mod group;
pub mod hierarchy_pose;
pub mod spatial;
mod state;

pub use group::HierarchyPoseGroup;
pub use hierarchy_pose::HierarchyPose;
pub use spatial::SpatialPose;
pub use state::HierarchyState;

use super::HierarchyPose;
use crate::{
    anim_error::AnimError,
    hierarchy::Hierarchy,
    types::{Channels, EulerOrder, RotationRepr},
};
use log::info;
use std::sync::Arc;

/// Table of sampled poses for one hierarchy
///
/// Pose 0 is the base (bind) pose, the rest are the key poses referenced by
/// keyframes. The group also holds the per-node channel masks and the Euler
/// order that apply when any of its poses is converted to matrices. A loader
/// fills it through the `_mut` accessors, then shares it read-only.
#[derive(Clone, Debug)]
pub struct HierarchyPoseGroup {
    hierarchy: Arc<Hierarchy>,
    order: EulerOrder,
    channels: Vec<Channels>,
    poses: Vec<HierarchyPose>,
}

impl HierarchyPoseGroup {
    /// Creates `count` identity poses including the base pose
    ///
    /// # Errors
    /// Returns `AnimError::Allocation` if `count` is zero or the table
    /// cannot be allocated
    pub fn new(
        hierarchy: &Arc<Hierarchy>,
        count: usize,
        repr: RotationRepr,
        order: EulerOrder,
    ) -> Result<Self, AnimError> {
        if count == 0 {
            return Err(AnimError::Allocation);
        }
        let mut poses = Vec::new();
        poses
            .try_reserve_exact(count)
            .map_err(|_| AnimError::Allocation)?;
        poses.resize_with(count, || HierarchyPose::new(hierarchy, repr));
        info!(
            "Pose group created with {} poses of {} nodes",
            count,
            hierarchy.len()
        );
        Ok(Self {
            hierarchy: Arc::clone(hierarchy),
            order,
            channels: vec![Channels::all(); hierarchy.len()],
            poses,
        })
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    #[must_use]
    pub const fn order(&self) -> EulerOrder {
        self.order
    }

    /// Rotation representation shared by every pose in the group
    #[must_use]
    pub fn repr(&self) -> RotationRepr {
        self.base_pose().repr()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Per-node channel masks
    #[must_use]
    pub fn channels(&self) -> &[Channels] {
        &self.channels
    }

    /// Sets the channel mask of one node
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `node` is outside the hierarchy
    pub fn set_channels(
        &mut self,
        node: usize,
        channels: Channels,
    ) -> Result<(), AnimError> {
        let bound = self.channels.len();
        let slot = self
            .channels
            .get_mut(node)
            .ok_or(AnimError::range("node", node, bound))?;
        *slot = channels;
        Ok(())
    }

    /// The bind pose every animated pose is concatenated onto
    #[must_use]
    pub fn base_pose(&self) -> &HierarchyPose {
        &self.poses[0]
    }

    /// Gets a sample pose by index
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside the table
    pub fn pose(&self, index: usize) -> Result<&HierarchyPose, AnimError> {
        self.poses
            .get(index)
            .ok_or(AnimError::range("sample pose", index, self.poses.len()))
    }

    /// Gets a sample pose for editing while the group is being loaded
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside the table
    pub fn pose_mut(
        &mut self,
        index: usize,
    ) -> Result<&mut HierarchyPose, AnimError> {
        let bound = self.poses.len();
        self.poses
            .get_mut(index)
            .ok_or(AnimError::range("sample pose", index, bound))
    }
}

use super::{hierarchy_pose, HierarchyPose, HierarchyPoseGroup};
use crate::{
    anim_error::AnimError, hierarchy::Hierarchy, kinematics, types::RootMotion,
    types::RotationRepr, util,
};
use itertools::izip;
use std::sync::Arc;

/// All pose buffers of one animated instance
///
/// The buffers form a pipeline: `anim_pose` holds sampled and blended
/// channels, `local_space` is that pose on top of the base pose converted to
/// matrices, `object_space` is the forward kinematics result. The inverse
/// buffers and `object_space_bind_to_current` are derived from those and only
/// their matrices are meaningful.
#[derive(Clone, Debug)]
pub struct HierarchyState {
    pub anim_pose: HierarchyPose,
    pub local_space: HierarchyPose,
    pub object_space: HierarchyPose,
    pub local_space_inv: HierarchyPose,
    pub object_space_inv: HierarchyPose,
    pub object_space_bind_to_current: HierarchyPose,
}

impl HierarchyState {
    /// Creates a state with every buffer at identity
    #[must_use]
    pub fn new(hierarchy: &Arc<Hierarchy>, repr: RotationRepr) -> Self {
        let pose = HierarchyPose::new(hierarchy, repr);
        Self {
            anim_pose: pose.clone(),
            local_space: pose.clone(),
            object_space: pose.clone(),
            local_space_inv: pose.clone(),
            object_space_inv: pose.clone(),
            object_space_bind_to_current: pose,
        }
    }

    /// Builds the rest state from the base pose of a group: local matrices,
    /// object matrices and both inverses. Bind-to-current is identity.
    ///
    /// # Errors
    /// Returns `AnimError::SingularTransform` if a base transform cannot be
    /// inverted
    pub fn from_base(group: &HierarchyPoseGroup) -> Result<Self, AnimError> {
        let mut state = Self::new(group.hierarchy(), group.repr());
        let n = state.len();
        hierarchy_pose::copy(&mut state.local_space, group.base_pose(), n)?;
        hierarchy_pose::convert(
            &mut state.local_space,
            n,
            group.channels(),
            group.order(),
            RootMotion::all(),
        );
        kinematics::solve_forward(&mut state)?;
        state.update_local_inverse()?;
        state.update_object_inverse()?;
        Ok(state)
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &Arc<Hierarchy> {
        self.anim_pose.hierarchy()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anim_pose.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anim_pose.is_empty()
    }

    /// Checks that another state belongs to the same hierarchy
    ///
    /// # Errors
    /// Returns a mismatch error if the hierarchy or representation differ
    pub fn check_compatible(&self, other: &Self) -> Result<(), AnimError> {
        self.anim_pose.check_compatible(&other.anim_pose)
    }

    /// Copies every buffer of `other` into this state
    ///
    /// # Errors
    /// Returns a mismatch error if the states are not compatible
    pub fn copy_from(&mut self, other: &Self) -> Result<(), AnimError> {
        self.check_compatible(other)?;
        self.clone_from(other);
        Ok(())
    }

    /// Recomputes `local_space_inv` from `local_space`
    ///
    /// # Errors
    /// Returns `AnimError::SingularTransform` naming the first node whose
    /// local matrix is not invertible
    pub fn update_local_inverse(&mut self) -> Result<(), AnimError> {
        invert_matrices(&mut self.local_space_inv, &self.local_space)
    }

    /// Recomputes `object_space_inv` from `object_space`
    ///
    /// # Errors
    /// Returns `AnimError::SingularTransform` naming the first node whose
    /// object matrix is not invertible
    pub fn update_object_inverse(&mut self) -> Result<(), AnimError> {
        invert_matrices(&mut self.object_space_inv, &self.object_space)
    }

    /// Recomputes the skinning delta `object_space * base.object_space_inv`
    ///
    /// # Errors
    /// Returns a mismatch error if `base` belongs to another hierarchy
    pub fn update_bind_to_current(&mut self, base: &Self) -> Result<(), AnimError> {
        self.check_compatible(base)?;
        for (out, current, bind_inv) in izip!(
            self.object_space_bind_to_current.poses_mut(),
            self.object_space.poses(),
            base.object_space_inv.poses()
        ) {
            out.transform = current.transform * bind_inv.transform;
        }
        Ok(())
    }
}

fn invert_matrices(
    out: &mut HierarchyPose,
    src: &HierarchyPose,
) -> Result<(), AnimError> {
    for (i, (o, s)) in out.poses_mut().iter_mut().zip(src.poses()).enumerate() {
        o.transform = util::try_inverse(&s.transform, i)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EulerOrder;
    use nalgebra_glm as glm;

    const EPS: f32 = 0.0001;

    fn group() -> HierarchyPoseGroup {
        let h = Arc::new(Hierarchy::new(&[("root", None), ("arm", Some(0))]).unwrap());
        let mut g =
            HierarchyPoseGroup::new(&h, 1, RotationRepr::Euler, EulerOrder::Xyz).unwrap();
        let base = g.pose_mut(0).unwrap();
        base[0].translate = glm::vec3(0.0, 1.0, 0.0);
        base[1].translate = glm::vec3(2.0, 0.0, 0.0);
        base[1].rotate = glm::vec4(0.0, 0.0, 90.0, 1.0);
        g
    }

    #[test]
    fn base_state_is_consistent() {
        let state = HierarchyState::from_base(&group()).unwrap();
        let arm = util::translation(&state.object_space[1].transform);
        assert!(glm::length(&(arm - glm::vec3(2.0, 1.0, 0.0))) < EPS);
        for (m, inv) in state.object_space.transforms().zip(state.object_space_inv.transforms()) {
            let id = m * inv;
            assert!((id - glm::Mat4::identity()).norm() < EPS);
        }
        for m in state.object_space_bind_to_current.transforms() {
            assert_eq!(*m, glm::Mat4::identity());
        }
    }

    #[test]
    fn bind_to_current_moves_with_pose() {
        let g = group();
        let base = HierarchyState::from_base(&g).unwrap();
        let mut state = base.clone();
        state.object_space[1].transform =
            glm::translate(&state.object_space[1].transform, &glm::vec3(1.0, 0.0, 0.0));
        state.update_bind_to_current(&base).unwrap();
        let bind_pos = util::translation(&base.object_space[1].transform);
        let moved = util::transform(&bind_pos, &state.object_space_bind_to_current[1].transform);
        let expected = util::translation(&state.object_space[1].transform);
        assert!(glm::length(&(moved - expected)) < EPS);
    }

    #[test]
    fn singular_local_matrix_is_reported() {
        let mut state = HierarchyState::from_base(&group()).unwrap();
        state.local_space[1].transform = glm::Mat4::zeros();
        assert!(matches!(
            state.update_local_inverse(),
            Err(AnimError::SingularTransform(1))
        ));
    }

    #[test]
    fn copy_checks_hierarchy() {
        let a = HierarchyState::from_base(&group()).unwrap();
        let mut b = HierarchyState::from_base(&group()).unwrap();
        assert!(matches!(b.copy_from(&a), Err(AnimError::HierarchyMismatch)));
        let mut c = a.clone();
        c.copy_from(&a).unwrap();
    }
}

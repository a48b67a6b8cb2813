use super::ClipController;
use crate::{
    anim_error::AnimError,
    pose::{hierarchy_pose, HierarchyPose, HierarchyPoseGroup},
};

/// Helper to calculate an interpolation parameter clamped to `[0, 1]`
#[must_use]
pub fn weight(start: f32, end: f32, current: f32) -> f32 {
    const EPSILON: f32 = 0.0005;
    ((current - start) / (end - start).max(EPSILON)).clamp(0.0f32, 1.0f32)
}

/// Samples the controller's current keyframe into `out` by interpolating
/// between the keyframe's two sample poses
///
/// # Errors
/// Returns `AnimError::Range` if the keyframe references a sample pose
/// outside `group`, or a mismatch error if `out` was built for another
/// hierarchy or representation
pub fn sample(
    out: &mut HierarchyPose,
    controller: &ClipController,
    group: &HierarchyPoseGroup,
) -> Result<(), AnimError> {
    let keyframe = controller.keyframe();
    let p0 = group.pose(keyframe.sample_index0)?;
    let p1 = group.pose(keyframe.sample_index1)?;
    let n = out.len();
    hierarchy_pose::lerp(out, p0, p1, controller.keyframe_parameter(), n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anim::{ClipPool, KeyframePool},
        hierarchy::Hierarchy,
        types::{EulerOrder, RotationRepr},
    };
    use nalgebra_glm as glm;
    use std::sync::Arc;

    const EPSILON: f32 = 0.0005;

    /// This does NOT do interpolation, just checks the weight function
    #[test]
    fn interpolation_weight() {
        let x = super::weight(0.0, 10.0, 7.0);
        assert!((x - 0.7f32).abs() < EPSILON);
        let x = super::weight(0.0, 10.0, 12.0);
        assert!((x - 1.0f32).abs() < EPSILON);
        let x = super::weight(0.0, 10.0, -2.0);
        assert!((x - 0.0f32).abs() < EPSILON);
        let x = super::weight(-2.0, 8.0, 3.0);
        assert!((x - 0.5f32).abs() < EPSILON);
        let x = super::weight(1.0, 1.0, 1.0);
        assert!(x >= 0.0f32 && x <= 1.0f32);
    }

    #[test]
    fn sample_interpolates_keyframe_poses() {
        let h = Arc::new(Hierarchy::new(&[("root", None), ("tip", Some(0))]).unwrap());
        let mut group =
            HierarchyPoseGroup::new(&h, 3, RotationRepr::Euler, EulerOrder::Xyz).unwrap();
        group.pose_mut(1).unwrap()[1].translate = glm::vec3(0.0, 0.0, 0.0);
        group.pose_mut(2).unwrap()[1].translate = glm::vec3(4.0, 0.0, 0.0);

        let mut keys = KeyframePool::create(1).unwrap();
        let k = keys.keyframe_mut(0).unwrap();
        k.set_duration(2.0);
        k.sample_index0 = 1;
        k.sample_index1 = 2;
        let keys = Arc::new(keys);
        let mut clips = ClipPool::create(1).unwrap();
        clips.init_clip(0, "slide", &keys, 0, 0).unwrap();
        let mut controller = ClipController::new(&Arc::new(clips), 0).unwrap();
        controller.update(0.5);

        let mut out = HierarchyPose::new(&h, RotationRepr::Euler);
        sample(&mut out, &controller, &group).unwrap();
        assert!((out[1].translate.x - 1.0).abs() < EPSILON);

        let other = Arc::new(Hierarchy::new(&[("root", None), ("tip", Some(0))]).unwrap());
        let mut wrong = HierarchyPose::new(&other, RotationRepr::Euler);
        assert!(matches!(
            sample(&mut wrong, &controller, &group),
            Err(AnimError::HierarchyMismatch)
        ));
    }
}

use super::spatial::{self, SpatialPose};
use crate::{
    anim_error::AnimError,
    hierarchy::Hierarchy,
    types::{Channels, EulerOrder, RootMotion, RotationRepr},
};
use itertools::izip;
use log::trace;
use nalgebra_glm as glm;
use std::{
    ops::{Index, IndexMut},
    sync::Arc,
};

/// One spatial pose per hierarchy node, index aligned with the hierarchy
///
/// Every pose remembers the hierarchy it was built against and the rotation
/// representation of its channels. Operations taking more than one pose
/// check both and refuse to mix.
#[derive(Clone, Debug)]
pub struct HierarchyPose {
    hierarchy: Arc<Hierarchy>,
    repr: RotationRepr,
    poses: Vec<SpatialPose>,
}

impl HierarchyPose {
    /// Creates an identity pose for every node of `hierarchy`
    #[must_use]
    pub fn new(hierarchy: &Arc<Hierarchy>, repr: RotationRepr) -> Self {
        Self {
            hierarchy: Arc::clone(hierarchy),
            repr,
            poses: vec![SpatialPose::default(); hierarchy.len()],
        }
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    #[must_use]
    pub const fn repr(&self) -> RotationRepr {
        self.repr
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    #[must_use]
    pub fn poses(&self) -> &[SpatialPose] {
        &self.poses
    }

    pub fn poses_mut(&mut self) -> &mut [SpatialPose] {
        &mut self.poses
    }

    /// Iterates over the pose matrices
    pub fn transforms(&self) -> impl Iterator<Item = &glm::Mat4> + '_ {
        self.poses.iter().map(|p| &p.transform)
    }

    /// Resets every node to identity
    pub fn reset(&mut self) {
        self.poses.iter_mut().for_each(SpatialPose::reset);
    }

    /// True if both poses were built against the same hierarchy object
    #[must_use]
    pub fn same_hierarchy(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hierarchy, &other.hierarchy)
    }

    /// Checks that `other` can be combined with this pose
    ///
    /// # Errors
    /// `AnimError::HierarchyMismatch` if the hierarchies differ by identity,
    /// `AnimError::RepresentationMismatch` if the rotation representations
    /// differ
    pub fn check_compatible(&self, other: &Self) -> Result<(), AnimError> {
        if !self.same_hierarchy(other) {
            return Err(AnimError::HierarchyMismatch);
        }
        if self.repr != other.repr {
            return Err(AnimError::RepresentationMismatch);
        }
        Ok(())
    }
}

impl Index<usize> for HierarchyPose {
    type Output = SpatialPose;

    fn index(&self, index: usize) -> &SpatialPose {
        &self.poses[index]
    }
}

impl IndexMut<usize> for HierarchyPose {
    fn index_mut(&mut self, index: usize) -> &mut SpatialPose {
        &mut self.poses[index]
    }
}

fn check_count(n: usize, poses: &[&HierarchyPose]) {
    for p in poses {
        assert!(n <= p.len(), "node count {n} exceeds pose length {}", p.len());
    }
}

/// Node-wise interpolation of the first `n` nodes. See `spatial::lerp`.
///
/// # Errors
/// Returns a mismatch error if the three poses are not compatible
///
/// # Panics
/// If `n` is larger than any of the poses
pub fn lerp(
    out: &mut HierarchyPose,
    a: &HierarchyPose,
    b: &HierarchyPose,
    t: f32,
    n: usize,
) -> Result<(), AnimError> {
    out.check_compatible(a)?;
    out.check_compatible(b)?;
    check_count(n, &[out, a, b]);
    let repr = out.repr;
    for (o, a, b) in izip!(&mut out.poses, &a.poses, &b.poses).take(n) {
        *o = spatial::lerp(a, b, t, repr);
    }
    Ok(())
}

/// Node-wise composition of `delta` on top of `base`
///
/// # Errors
/// Returns a mismatch error if the three poses are not compatible
///
/// # Panics
/// If `n` is larger than any of the poses
pub fn concat(
    out: &mut HierarchyPose,
    base: &HierarchyPose,
    delta: &HierarchyPose,
    n: usize,
) -> Result<(), AnimError> {
    out.check_compatible(base)?;
    out.check_compatible(delta)?;
    check_count(n, &[out, base, delta]);
    let repr = out.repr;
    for (o, b, d) in izip!(&mut out.poses, &base.poses, &delta.poses).take(n) {
        *o = spatial::concat(b, d, repr);
    }
    Ok(())
}

/// Node-wise removal of `base` from `pose`, the inverse of `concat`
///
/// # Errors
/// Returns a mismatch error if the three poses are not compatible
///
/// # Panics
/// If `n` is larger than any of the poses
pub fn deconcat(
    out: &mut HierarchyPose,
    pose: &HierarchyPose,
    base: &HierarchyPose,
    n: usize,
) -> Result<(), AnimError> {
    out.check_compatible(pose)?;
    out.check_compatible(base)?;
    check_count(n, &[out, pose, base]);
    let repr = out.repr;
    for (o, p, b) in izip!(&mut out.poses, &pose.poses, &base.poses).take(n) {
        *o = spatial::deconcat(p, b, repr);
    }
    Ok(())
}

/// Node-wise scaling of the pose's distance from identity
///
/// # Errors
/// Returns a mismatch error if the poses are not compatible
///
/// # Panics
/// If `n` is larger than either pose
pub fn scale(
    out: &mut HierarchyPose,
    pose: &HierarchyPose,
    s: f32,
    n: usize,
) -> Result<(), AnimError> {
    out.check_compatible(pose)?;
    check_count(n, &[out, pose]);
    let repr = out.repr;
    for (o, p) in izip!(&mut out.poses, &pose.poses).take(n) {
        *o = spatial::scale(p, s, repr);
    }
    Ok(())
}

/// Node-wise channel inverse
///
/// # Errors
/// Returns a mismatch error if the poses are not compatible
///
/// # Panics
/// If `n` is larger than either pose
pub fn invert(
    out: &mut HierarchyPose,
    pose: &HierarchyPose,
    n: usize,
) -> Result<(), AnimError> {
    out.check_compatible(pose)?;
    check_count(n, &[out, pose]);
    let repr = out.repr;
    for (o, p) in izip!(&mut out.poses, &pose.poses).take(n) {
        *o = spatial::invert(p, repr);
    }
    Ok(())
}

/// Exact copy of the first `n` nodes including matrices
///
/// # Errors
/// Returns a mismatch error if the poses are not compatible
///
/// # Panics
/// If `n` is larger than either pose
pub fn copy(
    dst: &mut HierarchyPose,
    src: &HierarchyPose,
    n: usize,
) -> Result<(), AnimError> {
    dst.check_compatible(src)?;
    check_count(n, &[dst, src]);
    dst.poses[..n].copy_from_slice(&src.poses[..n]);
    Ok(())
}

/// Builds the matrices of the first `n` nodes from their channels
///
/// `channels` holds one mask per node. Root nodes have the channels not kept
/// by `root_motion` zeroed first, which plays a clip in place.
///
/// # Panics
/// If `n` is larger than the pose or the channel list
pub fn convert(
    pose: &mut HierarchyPose,
    n: usize,
    channels: &[Channels],
    order: EulerOrder,
    root_motion: RootMotion,
) {
    check_count(n, &[pose]);
    assert!(n <= channels.len(), "node count {n} exceeds channel list");
    let repr = pose.repr;
    let hierarchy = Arc::clone(&pose.hierarchy);
    for (node, p, mask) in izip!(hierarchy.nodes(), &mut pose.poses, channels).take(n) {
        if node.parent.is_none() {
            if !root_motion.contains(RootMotion::TRANSLATE) {
                p.translate = glm::Vec3::zeros();
            }
            if !root_motion.contains(RootMotion::ROTATE) {
                p.rotate = SpatialPose::default().rotate;
            }
        }
        spatial::convert(p, *mask, order, repr);
    }
}

/// Recovers the channels of the first `n` nodes from their matrices
///
/// # Panics
/// If `n` is larger than the pose
pub fn revert(pose: &mut HierarchyPose, n: usize, order: EulerOrder) {
    check_count(n, &[pose]);
    let repr = pose.repr;
    for p in pose.poses.iter_mut().take(n) {
        spatial::revert(p, order, repr);
    }
}

/// Spreads an Euler rotation (degrees) evenly over the joints from `first`
/// down to `last`, adding to their existing rotation channels. A quaternion
/// pose composes each share as a rotation built in `order`.
///
/// # Errors
/// Returns `AnimError::Range` if either index is outside the pose and
/// `AnimError::NotFound` if `first` is not an ancestor of `last`
pub fn rotate_range(
    pose: &mut HierarchyPose,
    first: usize,
    last: usize,
    degrees: &glm::Vec3,
    order: EulerOrder,
) -> Result<(), AnimError> {
    if first >= pose.len() || last >= pose.len() {
        return Err(AnimError::range("node", first.max(last), pose.len()));
    }
    let chain = pose.hierarchy.chain(first, last)?;
    #[allow(clippy::cast_precision_loss)]
    let share = degrees / chain.len() as f32;
    trace!("rotate_range {first}..={last} by {share:?} per joint");
    let repr = pose.repr;
    let delta = SpatialPose::from_euler(
        glm::Vec3::zeros(),
        share,
        glm::vec3(1.0, 1.0, 1.0),
    );
    let delta = match repr {
        RotationRepr::Euler => delta,
        RotationRepr::Quaternion => {
            let m = spatial::euler_to_mat4(&share, order);
            SpatialPose::from_quat(
                glm::Vec3::zeros(),
                &glm::to_quat(&m),
                glm::vec3(1.0, 1.0, 1.0),
            )
        }
    };
    for i in chain {
        let p = &mut pose.poses[i];
        let rotated = spatial::concat(p, &delta, repr);
        p.rotate = rotated.rotate;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.0001;

    fn chain() -> Arc<Hierarchy> {
        Arc::new(
            Hierarchy::new(&[("root", None), ("child", Some(0)), ("grandchild", Some(1))])
                .unwrap(),
        )
    }

    #[test]
    fn mismatched_hierarchies_are_rejected() {
        let h1 = chain();
        let h2 = chain();
        let mut out = HierarchyPose::new(&h1, RotationRepr::Euler);
        let a = HierarchyPose::new(&h1, RotationRepr::Euler);
        let b = HierarchyPose::new(&h2, RotationRepr::Euler);
        assert!(matches!(
            lerp(&mut out, &a, &b, 0.5, 3),
            Err(AnimError::HierarchyMismatch)
        ));
        let q = HierarchyPose::new(&h1, RotationRepr::Quaternion);
        assert!(matches!(
            concat(&mut out, &a, &q, 3),
            Err(AnimError::RepresentationMismatch)
        ));
    }

    #[test]
    fn lerp_only_touches_n_nodes() {
        let h = chain();
        let mut out = HierarchyPose::new(&h, RotationRepr::Euler);
        out[2].translate = glm::vec3(9.0, 9.0, 9.0);
        let a = HierarchyPose::new(&h, RotationRepr::Euler);
        let mut b = HierarchyPose::new(&h, RotationRepr::Euler);
        for p in b.poses_mut() {
            p.translate = glm::vec3(2.0, 0.0, 0.0);
        }
        lerp(&mut out, &a, &b, 0.25, 2).unwrap();
        assert!((out[0].translate.x - 0.5).abs() < EPS);
        assert!((out[1].translate.x - 0.5).abs() < EPS);
        assert!((out[2].translate.x - 9.0).abs() < EPS);
    }

    #[test]
    #[should_panic(expected = "exceeds pose length")]
    fn count_beyond_pose_is_fatal() {
        let h = chain();
        let mut out = HierarchyPose::new(&h, RotationRepr::Euler);
        let a = out.clone();
        let _ = copy(&mut out, &a, 4);
    }

    #[test]
    fn convert_strips_root_motion() {
        let h = chain();
        let mut pose = HierarchyPose::new(&h, RotationRepr::Euler);
        for p in pose.poses_mut() {
            p.translate = glm::vec3(1.0, 0.0, 0.0);
        }
        let channels = vec![Channels::all(); 3];
        convert(
            &mut pose,
            3,
            &channels,
            EulerOrder::Xyz,
            RootMotion::ROTATE,
        );
        assert!(pose[0].transform[(0, 3)].abs() < EPS);
        assert!((pose[1].transform[(0, 3)] - 1.0).abs() < EPS);
    }

    #[test]
    fn rotate_range_splits_evenly() {
        let h = chain();
        let mut pose = HierarchyPose::new(&h, RotationRepr::Euler);
        let pitch = glm::vec3(30.0, 0.0, 0.0);
        rotate_range(&mut pose, 1, 2, &pitch, EulerOrder::Xyz).unwrap();
        assert!(pose[0].rotate.x.abs() < EPS);
        assert!((pose[1].rotate.x - 15.0).abs() < EPS);
        assert!((pose[2].rotate.x - 15.0).abs() < EPS);
        let zero = glm::Vec3::zeros();
        assert!(rotate_range(&mut pose, 2, 1, &zero, EulerOrder::Xyz).is_err());
        assert!(matches!(
            rotate_range(&mut pose, 0, 5, &zero, EulerOrder::Xyz),
            Err(AnimError::Range { .. })
        ));
    }

    #[test]
    fn rotate_range_quaternion_uses_order() {
        let h = chain();
        let turn = glm::vec3(80.0, 60.0, 0.0);
        let share = turn / 2.0;
        for order in [EulerOrder::Xyz, EulerOrder::Zyx] {
            let mut pose = HierarchyPose::new(&h, RotationRepr::Quaternion);
            rotate_range(&mut pose, 1, 2, &turn, order).unwrap();
            let expected = glm::to_quat(&spatial::euler_to_mat4(&share, order));
            assert!(pose[0].quat().dot(&glm::Quat::identity()) > 1.0 - EPS);
            assert!(pose[1].quat().dot(&expected).abs() > 1.0 - EPS);
            assert!(pose[2].quat().dot(&expected).abs() > 1.0 - EPS);
        }
        // The two orders give different rotations for this input
        let xyz = glm::to_quat(&spatial::euler_to_mat4(&share, EulerOrder::Xyz));
        let zyx = glm::to_quat(&spatial::euler_to_mat4(&share, EulerOrder::Zyx));
        assert!(xyz.dot(&zyx).abs() < 0.999);
    }

    #[test]
    fn copy_and_revert() {
        let h = chain();
        let mut src = HierarchyPose::new(&h, RotationRepr::Quaternion);
        src[1].translate = glm::vec3(0.0, 3.0, 0.0);
        src[1].rotate = glm::quat_angle_axis(0.5, &glm::Vec3::x()).coords;
        convert(&mut src, 3, &[Channels::all(); 3], EulerOrder::Xyz, RootMotion::all());
        let mut dst = HierarchyPose::new(&h, RotationRepr::Quaternion);
        copy(&mut dst, &src, 3).unwrap();
        assert_eq!(dst.poses(), src.poses());
        dst.reset();
        dst[1].transform = src[1].transform;
        revert(&mut dst, 3, EulerOrder::Xyz);
        assert!((dst[1].translate.y - 3.0).abs() < EPS);
        assert!(dst[1].quat().dot(&src[1].quat()).abs() > 0.9999);
    }
}

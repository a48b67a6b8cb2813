use super::{column_scale, place};
use crate::{
    anim_error::{AnimError, Degeneracy},
    kinematics,
    pose::HierarchyState,
    util,
};
use log::debug;
use nalgebra_glm as glm;

/// Orthonormal basis with +Z toward `target` and +Y as close to `world_up`
/// as possible, returned as `(x, y, z)`
///
/// # Errors
/// Returns `AnimError::DegenerateGeometry` with `TargetAtBase` when the
/// target coincides with `position`. A target straight up or down still
/// gets a basis, reported through the second value.
pub fn basis(
    position: &glm::Vec3,
    target: &glm::Vec3,
    world_up: &glm::Vec3,
) -> Result<([glm::Vec3; 3], Option<Degeneracy>), AnimError> {
    let forward = util::try_normalize(&(target - position))
        .map_err(|_| AnimError::from(Degeneracy::TargetAtBase))?;
    let (right, degeneracy) = util::try_normalize(&glm::cross(world_up, &forward))
        .map_or_else(
            |_| {
                (
                    util::perpendicular(&forward, world_up),
                    Some(Degeneracy::ColinearConstraint),
                )
            },
            |r| (r, None),
        );
    let up = glm::cross(&forward, &right);
    Ok(([right, up, forward], degeneracy))
}

/// Turns `joint` to face `target` in object space, keeping its position
/// and scale, then updates its local matrix and its descendants
///
/// A target at the joint leaves the joint as it is. Returns the degeneracy
/// that was worked around, if any.
///
/// # Errors
/// Returns `AnimError::Range` if `joint` is outside the hierarchy and
/// `AnimError::SingularTransform` if its parent cannot be inverted
pub fn solve(
    state: &mut HierarchyState,
    joint: usize,
    target: &glm::Vec3,
    world_up: &glm::Vec3,
) -> Result<Option<Degeneracy>, AnimError> {
    if joint >= state.len() {
        return Err(AnimError::range("look at joint", joint, state.len()));
    }
    let current = state.object_space[joint].transform;
    let position = util::translation(&current);
    let ([x, y, z], degeneracy) = match basis(&position, target, world_up) {
        Ok(b) => b,
        Err(AnimError::DegenerateGeometry(kind)) => {
            debug!("look at on joint {} skipped: {}", joint, kind);
            return Ok(Some(kind));
        }
        Err(e) => return Err(e),
    };
    state.object_space[joint].transform =
        place(&x, &y, &z, &position, &column_scale(&current));
    kinematics::solve_inverse_single(state, joint)?;
    kinematics::solve_forward_descendants(state, joint)?;
    Ok(degeneracy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hierarchy::Hierarchy,
        pose::HierarchyPoseGroup,
        types::{EulerOrder, RotationRepr},
    };
    use std::sync::Arc;

    const EPS: f32 = 0.001;

    #[test]
    fn basis_faces_target() {
        let p = glm::vec3(0.0, 1.0, 0.0);
        let t = glm::vec3(3.0, 1.0, 4.0);
        let ([x, y, z], d) = basis(&p, &t, &glm::Vec3::y()).unwrap();
        assert!(d.is_none());
        assert!(glm::distance(&z, &glm::vec3(0.6, 0.0, 0.8)) < EPS);
        assert!(glm::distance(&y, &glm::Vec3::y()) < EPS);
        assert!(glm::distance(&glm::cross(&x, &y), &z) < EPS);
    }

    #[test]
    fn basis_degeneracies() {
        let p = glm::Vec3::zeros();
        assert!(matches!(
            basis(&p, &p, &glm::Vec3::y()),
            Err(AnimError::DegenerateGeometry(Degeneracy::TargetAtBase))
        ));
        let ([x, y, z], d) = basis(&p, &glm::vec3(0.0, 5.0, 0.0), &glm::Vec3::y()).unwrap();
        assert_eq!(d, Some(Degeneracy::ColinearConstraint));
        assert!(glm::distance(&z, &glm::Vec3::y()) < EPS);
        assert!(glm::dot(&x, &y).abs() < EPS && glm::dot(&x, &z).abs() < EPS);
    }

    #[test]
    fn neck_turns_and_head_follows() {
        let h = Arc::new(
            Hierarchy::new(&[("hips", None), ("neck", Some(0)), ("head", Some(1))]).unwrap(),
        );
        let mut g =
            HierarchyPoseGroup::new(&h, 1, RotationRepr::Euler, EulerOrder::Xyz).unwrap();
        let base = g.pose_mut(0).unwrap();
        base[1].translate = glm::vec3(0.0, 1.5, 0.0);
        base[2].translate = glm::vec3(0.0, 0.0, 0.2);
        let mut state = HierarchyState::from_base(&g).unwrap();

        let target = glm::vec3(10.0, 1.5, 0.0);
        assert!(solve(&mut state, 1, &target, &glm::Vec3::y()).unwrap().is_none());
        let head = util::translation(&state.object_space[2].transform);
        assert!(glm::distance(&head, &glm::vec3(0.2, 1.5, 0.0)) < EPS);

        let before = state.object_space[1].transform;
        let skipped = solve(&mut state, 1, &glm::vec3(0.0, 1.5, 0.0), &glm::Vec3::y()).unwrap();
        assert_eq!(skipped, Some(Degeneracy::TargetAtBase));
        assert_eq!(state.object_space[1].transform, before);
        assert!(solve(&mut state, 3, &target, &glm::Vec3::y()).is_err());
    }
}

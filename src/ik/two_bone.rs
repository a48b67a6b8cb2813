use super::{column_scale, place};
use crate::{
    anim_error::{AnimError, Degeneracy},
    hierarchy::Hierarchy,
    kinematics,
    pose::HierarchyState,
    types::EPSILON,
    util,
};
use log::debug;
use nalgebra_glm as glm;

/// Three joints of a limb, each an ancestor of the next
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TwoBoneChain {
    pub base: usize,
    pub mid: usize,
    pub end: usize,
}

impl TwoBoneChain {
    /// Looks the joints up by name
    ///
    /// # Errors
    /// Returns `AnimError::NotFound` if a name is missing or the joints do
    /// not form a chain
    pub fn from_names(
        hierarchy: &Hierarchy,
        base: &str,
        mid: &str,
        end: &str,
    ) -> Result<Self, AnimError> {
        let chain = Self {
            base: hierarchy.find(base)?,
            mid: hierarchy.find(mid)?,
            end: hierarchy.find(end)?,
        };
        let linked = chain.base != chain.mid
            && chain.mid != chain.end
            && hierarchy.is_ancestor(chain.base, chain.mid)
            && hierarchy.is_ancestor(chain.mid, chain.end);
        if !linked {
            return Err(AnimError::NotFound(format!(
                "joint chain {base} -> {mid} -> {end}"
            )));
        }
        Ok(chain)
    }
}

/// Joint positions produced by the solver
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoBoneSolution {
    pub mid: glm::Vec3,
    pub end: glm::Vec3,
    /// Unit normal of the bend plane
    pub normal: glm::Vec3,
    /// False when the target was out of reach and the chain was straightened
    pub reached: bool,
    /// Degenerate input that was worked around, if any
    pub degeneracy: Option<Degeneracy>,
}

/// Solves the triangle base, mid, end for bone lengths `l1` and `l2`
///
/// The mid joint bends toward `constraint`. When the constraint is in line
/// with the target the plane normal falls back to one perpendicular to
/// `world_up`, which is only reported when the chain has to bend. `fallback_dir` is used as the chain direction when the target
/// coincides with the base. Degenerate input never fails, it is reported in
/// the result.
#[must_use]
pub fn solve_positions(
    base: &glm::Vec3,
    target: &glm::Vec3,
    constraint: &glm::Vec3,
    (l1, l2): (f32, f32),
    fallback_dir: &glm::Vec3,
    world_up: &glm::Vec3,
) -> TwoBoneSolution {
    let mut degeneracy = None;
    let to_target = target - base;
    let distance = glm::length(&to_target);
    let dir = util::try_normalize(&to_target).unwrap_or_else(|_| {
        degeneracy = Some(Degeneracy::TargetAtBase);
        util::try_normalize(fallback_dir).unwrap_or_else(|_| *world_up)
    });
    // Only the triangle needs the constraint side, a straight chain just
    // needs some plane to orient in
    let bend_normal = util::try_normalize(&glm::cross(&dir, &(constraint - base))).ok();
    let normal = bend_normal.unwrap_or_else(|| util::perpendicular(&dir, world_up));
    let reach = l1 + l2;

    if l1 < EPSILON || l2 < EPSILON {
        // No triangle to solve: lay the chain along the target direction
        let end_distance = distance.min(reach);
        return TwoBoneSolution {
            mid: base + dir * l1,
            end: base + dir * end_distance,
            normal,
            reached: distance <= reach,
            degeneracy: Some(Degeneracy::ZeroLengthBone),
        };
    }

    if distance >= reach {
        return TwoBoneSolution {
            mid: base + dir * l1,
            end: base + dir * reach,
            normal,
            reached: false,
            degeneracy,
        };
    }

    if bend_normal.is_none() {
        degeneracy = degeneracy.or(Some(Degeneracy::ColinearConstraint));
    }

    // A target closer than |l1 - l2| cannot be met either. Solve for the
    // nearest reachable distance along the same direction.
    let d = distance.max((l1 - l2).abs()).max(EPSILON);
    let s = (l1 + l2 + d) * 0.5;
    let area = (s * (s - l1) * (s - l2) * (s - d)).max(0.0).sqrt();
    let height = (2.0 * area / d).min(l1);
    let along = (l1 * l1 + d * d - l2 * l2) / (2.0 * d);
    // In plane perpendicular pointing toward the constraint side
    let bend = glm::cross(&normal, &dir);
    TwoBoneSolution {
        mid: base + dir * along + bend * height,
        end: base + dir * d,
        normal,
        reached: d <= distance + EPSILON,
        degeneracy,
    }
}

/// Solves a limb in object space and writes the result back into `state`
///
/// Bone lengths are measured in `rest`, the undeformed state. The base and
/// mid joints are oriented with +X along the bone and +Z along the bend
/// normal. The end joint keeps its orientation and moves to the solved
/// position. Local matrices of the chain are recovered and descendants are
/// re-propagated so the state stays consistent.
///
/// # Errors
/// Returns a mismatch error if `rest` belongs to another hierarchy,
/// `AnimError::Range` if a chain index is outside the hierarchy and
/// `AnimError::SingularTransform` if a parent matrix cannot be inverted
pub fn solve(
    state: &mut HierarchyState,
    rest: &HierarchyState,
    chain: &TwoBoneChain,
    target: &glm::Vec3,
    constraint: &glm::Vec3,
    world_up: &glm::Vec3,
) -> Result<TwoBoneSolution, AnimError> {
    state.check_compatible(rest)?;
    let n = state.len();
    for i in [chain.base, chain.mid, chain.end] {
        if i >= n {
            return Err(AnimError::range("chain joint", i, n));
        }
    }
    let rest_pos = |i: usize| util::translation(&rest.object_space[i].transform);
    let l1 = glm::distance(&rest_pos(chain.base), &rest_pos(chain.mid));
    let l2 = glm::distance(&rest_pos(chain.mid), &rest_pos(chain.end));

    let base_m = state.object_space[chain.base].transform;
    let mid_m = state.object_space[chain.mid].transform;
    let end_m = state.object_space[chain.end].transform;
    let base = util::translation(&base_m);
    let current_end = util::translation(&end_m);

    let solution = solve_positions(
        &base,
        target,
        constraint,
        (l1, l2),
        &(current_end - base),
        world_up,
    );
    if let Some(kind) = solution.degeneracy {
        debug!(
            "two bone solve {}-{}-{} recovered from {}",
            chain.base, chain.mid, chain.end, kind
        );
    }

    let orient = |from: &glm::Vec3, to: &glm::Vec3, m: &glm::Mat4| {
        let scale = column_scale(m);
        if solution.degeneracy == Some(Degeneracy::ZeroLengthBone) {
            return place(
                &glm::Vec3::x(),
                &glm::Vec3::y(),
                &glm::Vec3::z(),
                from,
                &scale,
            );
        }
        let tangent = util::try_normalize(&(to - from))
            .unwrap_or_else(|_| util::perpendicular(&solution.normal, world_up));
        let bitangent = glm::cross(&solution.normal, &tangent);
        place(&tangent, &bitangent, &solution.normal, from, &scale)
    };

    state.object_space[chain.base].transform = orient(&base, &solution.mid, &base_m);
    kinematics::solve_inverse_single(state, chain.base)?;
    kinematics::solve_forward_descendants(state, chain.base)?;

    state.object_space[chain.mid].transform =
        orient(&solution.mid, &solution.end, &mid_m);
    kinematics::solve_inverse_single(state, chain.mid)?;
    kinematics::solve_forward_descendants(state, chain.mid)?;

    let mut end = end_m;
    util::set_translation(&mut end, &solution.end);
    state.object_space[chain.end].transform = end;
    kinematics::solve_inverse_single(state, chain.end)?;
    kinematics::solve_forward_descendants(state, chain.end)?;

    Ok(solution)
}

//! Effector solvers that rewrite object space joints of a `HierarchyState`

pub mod look_at;
pub mod two_bone;

pub use two_bone::{TwoBoneChain, TwoBoneSolution};

use crate::util;
use nalgebra_glm as glm;

/// Lengths of the basis columns of an affine matrix
fn column_scale(m: &glm::Mat4) -> glm::Vec3 {
    let basis = glm::mat4_to_mat3(m);
    glm::vec3(
        glm::length(&basis.column(0).into_owned()),
        glm::length(&basis.column(1).into_owned()),
        glm::length(&basis.column(2).into_owned()),
    )
}

/// Affine matrix from a unit basis, a position and per axis scale
fn place(
    x: &glm::Vec3,
    y: &glm::Vec3,
    z: &glm::Vec3,
    position: &glm::Vec3,
    scale: &glm::Vec3,
) -> glm::Mat4 {
    util::from_basis(&(x * scale.x), &(y * scale.y), &(z * scale.z), position)
}

/// A module of utility functions
use crate::{
    anim_error::{AnimError, Degeneracy},
    types::EPSILON,
};
use nalgebra_glm as glm;

/// Smallest absolute determinant accepted by `try_inverse`
pub const MIN_DETERMINANT: f32 = 1.0e-8;

/// Transforms a 3D position using a 4x4 matrix and return as a `glm::Vec3`
#[must_use]
pub fn transform(position: &glm::Vec3, matrix: &glm::Mat4) -> glm::Vec3 {
    let ws = glm::vec4(position.x, position.y, position.z, 1.0f32);
    let vs = matrix * ws;
    glm::vec3(vs.x, vs.y, vs.z)
}

/// Returns the translation column of an affine matrix
#[must_use]
pub fn translation(matrix: &glm::Mat4) -> glm::Vec3 {
    glm::vec3(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
}

/// Overwrites the translation column of an affine matrix
pub fn set_translation(matrix: &mut glm::Mat4, position: &glm::Vec3) {
    matrix[(0, 3)] = position.x;
    matrix[(1, 3)] = position.y;
    matrix[(2, 3)] = position.z;
}

/// Builds an affine matrix from three basis vectors and a position
#[must_use]
pub fn from_basis(
    x: &glm::Vec3,
    y: &glm::Vec3,
    z: &glm::Vec3,
    position: &glm::Vec3,
) -> glm::Mat4 {
    glm::mat4(
        x.x, y.x, z.x, position.x, //
        x.y, y.y, z.y, position.y, //
        x.z, y.z, z.z, position.z, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Inverts a 4x4 matrix, refusing near singular input instead of returning
/// NaN or infinite values
///
/// # Errors
/// Returns `AnimError::SingularTransform` tagged with `node` if the
/// determinant is too small or the inversion fails
pub fn try_inverse(
    matrix: &glm::Mat4,
    node: usize,
) -> Result<glm::Mat4, AnimError> {
    let det = matrix.determinant();
    if !det.is_finite() || det.abs() < MIN_DETERMINANT {
        return Err(AnimError::SingularTransform(node));
    }
    matrix
        .try_inverse()
        .ok_or(AnimError::SingularTransform(node))
}

/// Normalizes a vector that may be zero length
///
/// # Errors
/// Returns `AnimError::DegenerateGeometry` if the vector is too short to
/// have a direction. Callers are expected to recover with a fallback.
pub fn try_normalize(v: &glm::Vec3) -> Result<glm::Vec3, AnimError> {
    let len = glm::length(v);
    if len > EPSILON && len.is_finite() {
        Ok(v / len)
    } else {
        Err(Degeneracy::ZeroLengthVector.into())
    }
}

/// Returns a unit vector perpendicular to `v`, preferring the cross product
/// with `up` and falling back to the world axes when `v` is parallel to it.
/// `v` is expected to be unit length.
#[must_use]
pub fn perpendicular(v: &glm::Vec3, up: &glm::Vec3) -> glm::Vec3 {
    [*up, glm::Vec3::y(), glm::Vec3::z(), glm::Vec3::x()]
        .iter()
        .find_map(|axis| try_normalize(&glm::cross(v, axis)).ok())
        .unwrap_or_else(glm::Vec3::z)
}

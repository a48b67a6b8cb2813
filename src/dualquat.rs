use nalgebra_glm as glm;

/// Dual quaternion
/// GLM has support in the `GLM_GTX_dual_quaternion` extension but this does not
/// seem to be available in the `nalgebra_glm` implementation. So the
/// functionality needed for skinning is implemented here using `glm::Quat`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualQuat {
    pub real: glm::Quat,
    pub dual: glm::Quat,
}

impl Default for DualQuat {
    fn default() -> Self {
        Self {
            // Real part contains the rotation
            real: glm::quat(0.0, 0.0, 0.0, 1.0),
            // Dual part contains the translation but is also affected by
            // the rotation
            dual: glm::quat(0.0, 0.0, 0.0, 0.0),
        }
    }
}

impl DualQuat {
    /// Creates a unit dual quaternion from a rotation and a translation,
    /// applied rotation first: `d = 1/2 * t * r`
    #[must_use]
    pub fn new(rotation: &glm::Quat, translation: &glm::Vec3) -> Self {
        let pure = glm::quat(translation.x, translation.y, translation.z, 0.0);
        Self {
            real: *rotation,
            dual: pure * *rotation * 0.5f32,
        }
    }
}

/// Conversion to GLSL shader ready mat2x4
impl From<DualQuat> for [[f32; 4]; 2] {
    fn from(dq: DualQuat) -> [[f32; 4]; 2] {
        [
            [
                dq.real.coords.x,
                dq.real.coords.y,
                dq.real.coords.z,
                dq.real.coords.w,
            ],
            [
                dq.dual.coords.x,
                dq.dual.coords.y,
                dq.dual.coords.z,
                dq.dual.coords.w,
            ],
        ]
    }
}

/// Conversion from a column major 4x4 array holding a rigid transform
impl From<[[f32; 4]; 4]> for DualQuat {
    fn from(arr: [[f32; 4]; 4]) -> Self {
        let m: glm::Mat4 = arr.into();
        from_mat4(&m)
    }
}

#[must_use]
pub fn add(q1: &DualQuat, q2: &DualQuat) -> DualQuat {
    DualQuat {
        real: q1.real + q2.real,
        dual: q1.dual + q2.dual,
    }
}

#[must_use]
pub fn mul(q1: &DualQuat, q2: &DualQuat) -> DualQuat {
    DualQuat {
        real: q1.real * q2.real,
        dual: q1.real * q2.dual + q1.dual * q2.real,
    }
}

#[must_use]
pub fn scale(q: &DualQuat, s: f32) -> DualQuat {
    DualQuat {
        real: q.real * s,
        dual: q.dual * s,
    }
}

#[must_use]
pub fn conjugate(q: &DualQuat) -> DualQuat {
    DualQuat {
        real: q.real.conjugate(),
        dual: q.dual.conjugate(),
    }
}

/// Normalizes so that the real part is unit length and the dual part is
/// orthogonal to it. A zero real part gives the identity.
#[must_use]
pub fn normalize(q: &DualQuat) -> DualQuat {
    let len = glm::quat_length(&q.real);
    if len <= f32::EPSILON {
        return DualQuat::default();
    }
    let real = q.real / len;
    let dual = q.dual / len;
    let dual = dual - real * real.dot(&dual);
    DualQuat { real, dual }
}

/// Splits a unit dual quaternion into its rotation and translation
#[must_use]
pub fn decompose(q: &DualQuat) -> (glm::Quat, glm::Vec3) {
    let t = q.dual * q.real.conjugate() * 2.0f32;
    (q.real, glm::vec3(t.coords.x, t.coords.y, t.coords.z))
}

/// Converts a unit dual quaternion to a rigid transform matrix
#[must_use]
pub fn to_mat4(q: &DualQuat) -> glm::Mat4 {
    let (rotation, translation) = decompose(q);
    let mut m = glm::quat_to_mat4(&rotation);
    m[(0, 3)] = translation.x;
    m[(1, 3)] = translation.y;
    m[(2, 3)] = translation.z;
    m
}

/// Converts the rigid part of a matrix to a unit dual quaternion. Any scale
/// in the upper 3x3 is removed by normalizing the basis columns before the
/// rotation is extracted. A degenerate basis falls back to no rotation.
#[must_use]
pub fn from_mat4(m: &glm::Mat4) -> DualQuat {
    let mut basis = glm::mat4_to_mat3(m);
    let mut valid = true;
    for c in 0..3 {
        let column: glm::Vec3 = basis.column(c).into_owned();
        let len = glm::length(&column);
        if len > f32::EPSILON {
            basis.set_column(c, &(column / len));
        } else {
            valid = false;
        }
    }
    let rotation = if valid {
        glm::quat_normalize(&glm::mat3_to_quat(&basis))
    } else {
        glm::Quat::identity()
    };
    let translation = glm::vec3(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    DualQuat::new(&rotation, &translation)
}

/// Dual quaternion linear blending. The second input is negated if needed
/// so the blend takes the shortest path, then the result is normalized.
#[must_use]
pub fn dlb(q1: &DualQuat, q2: &DualQuat, t: f32) -> DualQuat {
    let sign = if q1.real.dot(&q2.real) < 0.0 {
        -1.0f32
    } else {
        1.0f32
    };
    let blended = add(&scale(q1, 1.0 - t), &scale(q2, t * sign));
    normalize(&blended)
}

/// Separate interpolation: slerp for the rotation and lerp for the
/// translation, rebuilt into a dual quaternion
#[must_use]
pub fn sep(q1: &DualQuat, q2: &DualQuat, t: f32) -> DualQuat {
    let (r1, t1) = decompose(q1);
    let (r2, t2) = decompose(q2);
    let r2 = if r1.dot(&r2) < 0.0 { -r2 } else { r2 };
    let rotation = glm::quat_slerp(&r1, &r2, t);
    let translation = glm::mix(&t1, &t2, t);
    DualQuat::new(&rotation, &translation)
}

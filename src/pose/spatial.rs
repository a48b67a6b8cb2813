use crate::{
    types::{Channels, EulerOrder, RotationRepr, EPSILON},
    util,
};
use nalgebra::{Unit, UnitQuaternion};
use nalgebra_glm as glm;

/// Transform of one joint relative to its parent, kept both as separate
/// channels and as a matrix
///
/// `rotate` holds Euler degrees in `xyz` or a quaternion in `(i, j, k, w)`
/// depending on the `RotationRepr` of the owning `HierarchyPose`. The identity
/// value `(0, 0, 0, 1)` is valid for both.
///
/// `transform` is only meaningful after `convert` has consumed the channels.
/// Channel edits do not touch it, so the two can disagree until the next
/// conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialPose {
    pub transform: glm::Mat4,
    pub rotate: glm::Vec4,
    pub scale: glm::Vec3,
    pub translate: glm::Vec3,
}

impl Default for SpatialPose {
    fn default() -> Self {
        Self {
            transform: glm::Mat4::identity(),
            rotate: glm::vec4(0.0, 0.0, 0.0, 1.0),
            scale: glm::vec3(1.0, 1.0, 1.0),
            translate: glm::Vec3::zeros(),
        }
    }
}

impl SpatialPose {
    /// Pose with Euler rotation channels given in degrees
    #[must_use]
    pub fn from_euler(
        translate: glm::Vec3,
        euler_degrees: glm::Vec3,
        scale: glm::Vec3,
    ) -> Self {
        Self {
            rotate: euler_channel(&euler_degrees),
            scale,
            translate,
            ..Default::default()
        }
    }

    /// Pose with a quaternion rotation channel
    #[must_use]
    pub fn from_quat(
        translate: glm::Vec3,
        rotation: &glm::Quat,
        scale: glm::Vec3,
    ) -> Self {
        Self {
            rotate: rotation.coords,
            scale,
            translate,
            ..Default::default()
        }
    }

    /// Pose with translation only
    #[must_use]
    pub fn from_translation(translate: glm::Vec3) -> Self {
        Self {
            translate,
            ..Default::default()
        }
    }

    /// Rotation channel read as Euler degrees
    #[must_use]
    pub fn euler(&self) -> glm::Vec3 {
        self.rotate.xyz()
    }

    /// Rotation channel read as a quaternion
    #[must_use]
    pub fn quat(&self) -> glm::Quat {
        glm::Quat::from(self.rotate)
    }

    /// Resets channels and matrix to identity
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn euler_channel(v: &glm::Vec3) -> glm::Vec4 {
    glm::vec4(v.x, v.y, v.z, 1.0)
}

/// Shortest path slerp. Nearly equal inputs fall back to a normalized lerp,
/// which avoids dividing by a vanishing sine.
#[must_use]
pub fn quat_slerp(a: &glm::Quat, b: &glm::Quat, t: f32) -> glm::Quat {
    let b = if a.dot(b) < 0.0 { -*b } else { *b };
    let nlerp = || glm::quat_normalize(&glm::Quat::from(glm::mix(&a.coords, &b.coords, t)));
    if a.dot(&b) > 0.9995 {
        return nlerp();
    }
    match (
        UnitQuaternion::try_new(*a, EPSILON),
        UnitQuaternion::try_new(b, EPSILON),
    ) {
        (Some(ua), Some(ub)) => ua
            .try_slerp(&ub, t, EPSILON)
            .map_or_else(nlerp, Unit::into_inner),
        _ => nlerp(),
    }
}

/// Interpolates channels: translation and scale componentwise, rotation by
/// representation (componentwise for Euler, slerp for quaternions). `t` is
/// trusted and not clamped.
#[must_use]
pub fn lerp(
    a: &SpatialPose,
    b: &SpatialPose,
    t: f32,
    repr: RotationRepr,
) -> SpatialPose {
    let rotate = match repr {
        RotationRepr::Euler => euler_channel(&glm::mix(&a.euler(), &b.euler(), t)),
        RotationRepr::Quaternion => quat_slerp(&a.quat(), &b.quat(), t).coords,
    };
    SpatialPose {
        rotate,
        scale: glm::mix(&a.scale, &b.scale, t),
        translate: glm::mix(&a.translate, &b.translate, t),
        ..Default::default()
    }
}

/// Applies `delta` on top of `base`. Both translations are expressed in the
/// parent frame so they add, rotations compose and scales multiply.
#[must_use]
pub fn concat(
    base: &SpatialPose,
    delta: &SpatialPose,
    repr: RotationRepr,
) -> SpatialPose {
    let rotate = match repr {
        RotationRepr::Euler => euler_channel(&(base.euler() + delta.euler())),
        RotationRepr::Quaternion => {
            glm::quat_normalize(&(base.quat() * delta.quat())).coords
        }
    };
    SpatialPose {
        rotate,
        scale: base.scale.component_mul(&delta.scale),
        translate: base.translate + delta.translate,
        ..Default::default()
    }
}

/// Inverse of `concat`: returns `d` such that `concat(base, d) == pose`
#[must_use]
pub fn deconcat(
    pose: &SpatialPose,
    base: &SpatialPose,
    repr: RotationRepr,
) -> SpatialPose {
    let rotate = match repr {
        RotationRepr::Euler => euler_channel(&(pose.euler() - base.euler())),
        RotationRepr::Quaternion => {
            glm::quat_normalize(&(base.quat().conjugate() * pose.quat())).coords
        }
    };
    SpatialPose {
        rotate,
        scale: pose.scale.zip_map(&base.scale, safe_div),
        translate: pose.translate - base.translate,
        ..Default::default()
    }
}

/// Scales the pose's distance from identity by `s`. 0 gives identity and 1
/// gives the pose unchanged.
#[must_use]
pub fn scale(pose: &SpatialPose, s: f32, repr: RotationRepr) -> SpatialPose {
    lerp(&SpatialPose::default(), pose, s, repr)
}

/// Channel inverse: `concat(pose, invert(pose))` is the identity
#[must_use]
pub fn invert(pose: &SpatialPose, repr: RotationRepr) -> SpatialPose {
    let rotate = match repr {
        RotationRepr::Euler => euler_channel(&-pose.euler()),
        RotationRepr::Quaternion => pose.quat().conjugate().coords,
    };
    SpatialPose {
        rotate,
        scale: pose.scale.map(|c| safe_div(1.0, c)),
        translate: -pose.translate,
        ..Default::default()
    }
}

fn safe_div(a: f32, b: f32) -> f32 {
    if b.abs() > EPSILON {
        a / b
    } else {
        0.0
    }
}

/// Rotation matrix for Euler angles in degrees
#[must_use]
pub fn euler_to_mat4(degrees: &glm::Vec3, order: EulerOrder) -> glm::Mat4 {
    let rx = glm::rotation(degrees.x.to_radians(), &glm::Vec3::x());
    let ry = glm::rotation(degrees.y.to_radians(), &glm::Vec3::y());
    let rz = glm::rotation(degrees.z.to_radians(), &glm::Vec3::z());
    match order {
        EulerOrder::Xyz => rz * ry * rx,
        EulerOrder::Zyx => rx * ry * rz,
    }
}

/// Extracts Euler angles in degrees from an orthonormal rotation matrix.
/// At gimbal lock the last applied angle is set to zero.
#[must_use]
pub fn mat3_to_euler(m: &glm::Mat3, order: EulerOrder) -> glm::Vec3 {
    const LOCK: f32 = 0.99999;
    let (a, b, c) = match order {
        EulerOrder::Xyz => {
            let sb = (-m[(2, 0)]).clamp(-1.0, 1.0);
            if sb.abs() < LOCK {
                (
                    m[(2, 1)].atan2(m[(2, 2)]),
                    sb.asin(),
                    m[(1, 0)].atan2(m[(0, 0)]),
                )
            } else {
                ((-m[(1, 2)]).atan2(m[(1, 1)]), sb.asin(), 0.0)
            }
        }
        EulerOrder::Zyx => {
            let sb = m[(0, 2)].clamp(-1.0, 1.0);
            if sb.abs() < LOCK {
                (
                    (-m[(1, 2)]).atan2(m[(2, 2)]),
                    sb.asin(),
                    (-m[(0, 1)]).atan2(m[(0, 0)]),
                )
            } else {
                (m[(2, 1)].atan2(m[(1, 1)]), sb.asin(), 0.0)
            }
        }
    };
    glm::vec3(a.to_degrees(), b.to_degrees(), c.to_degrees())
}

/// Builds the pose matrix from its channels as `T * R * S`. Channels
/// missing from `channels` contribute identity.
pub fn convert(
    pose: &mut SpatialPose,
    channels: Channels,
    order: EulerOrder,
    repr: RotationRepr,
) {
    let pick = |flag: Channels, value: f32, identity: f32| {
        if channels.contains(flag) {
            value
        } else {
            identity
        }
    };
    let t = glm::vec3(
        pick(Channels::TRANSLATE_X, pose.translate.x, 0.0),
        pick(Channels::TRANSLATE_Y, pose.translate.y, 0.0),
        pick(Channels::TRANSLATE_Z, pose.translate.z, 0.0),
    );
    let s = glm::vec3(
        pick(Channels::SCALE_X, pose.scale.x, 1.0),
        pick(Channels::SCALE_Y, pose.scale.y, 1.0),
        pick(Channels::SCALE_Z, pose.scale.z, 1.0),
    );
    let r = match repr {
        RotationRepr::Euler => {
            let e = glm::vec3(
                pick(Channels::ORIENT_X, pose.rotate.x, 0.0),
                pick(Channels::ORIENT_Y, pose.rotate.y, 0.0),
                pick(Channels::ORIENT_Z, pose.rotate.z, 0.0),
            );
            euler_to_mat4(&e, order)
        }
        // A quaternion cannot be masked per axis
        RotationRepr::Quaternion if channels.intersects(Channels::ORIENT_XYZ) => {
            glm::quat_to_mat4(&glm::quat_normalize(&pose.quat()))
        }
        RotationRepr::Quaternion => glm::Mat4::identity(),
    };
    let m = glm::translate(&glm::Mat4::identity(), &t) * r;
    pose.transform = glm::scale(&m, &s);
}

/// Recovers channels from the pose matrix, the reverse of `convert`.
/// Negative determinants are attributed to the X scale.
pub fn revert(pose: &mut SpatialPose, order: EulerOrder, repr: RotationRepr) {
    let m = &pose.transform;
    let translate = util::translation(m);
    let mut basis = glm::mat4_to_mat3(m);
    let mut scale = glm::Vec3::zeros();
    for c in 0..3 {
        let column: glm::Vec3 = basis.column(c).into_owned();
        scale[c] = glm::length(&column);
        if scale[c] > EPSILON {
            basis.set_column(c, &(column / scale[c]));
        }
    }
    if basis.determinant() < 0.0 {
        scale.x = -scale.x;
        let column: glm::Vec3 = -basis.column(0).into_owned();
        basis.set_column(0, &column);
    }
    pose.rotate = match repr {
        RotationRepr::Euler => euler_channel(&mat3_to_euler(&basis, order)),
        RotationRepr::Quaternion => {
            glm::quat_normalize(&glm::mat3_to_quat(&basis)).coords
        }
    };
    pose.scale = scale;
    pose.translate = translate;
}

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Shortest duration a keyframe or clip may have, in seconds. Guards the
/// cached reciprocal against division by zero.
pub const MIN_DURATION: f32 = 0.0001;

/// Maximum length of a clip name in bytes. Longer names are truncated.
pub const NAME_LEN_MAX: usize = 32;

/// Name given to a clip that was initialized with an empty name, and to every
/// clip slot that has not been initialized yet
pub const DEFAULT_CLIP_NAME: &str = "unnamed clip";

/// Small value for float comparisons in the geometric code
pub const EPSILON: f32 = 0.00001;

/// How the rotation channel of a `SpatialPose` is interpreted. One
/// representation is chosen per `HierarchyPose` and operations refuse to mix
/// them.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
pub enum RotationRepr {
    /// XYZ angles in degrees. Interpolated componentwise and composed by
    /// addition. The `w` component is unused.
    #[default]
    Euler,
    /// Unit quaternion stored as (i, j, k, w). Interpolated with shortest
    /// path slerp and composed by multiplication.
    Quaternion,
}

/// Order in which Euler rotations are applied
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
pub enum EulerOrder {
    /// X applied first, then Y, then Z: `R = Rz * Ry * Rx`
    #[default]
    Xyz,
    /// Z applied first, then Y, then X: `R = Rx * Ry * Rz`
    Zyx,
}

bitflags! {
    /// Channels of a spatial pose that contribute to its matrix. Disabled
    /// channels are treated as identity by the convert operation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Channels: u16 {
        const ORIENT_X = 0x0001;
        const ORIENT_Y = 0x0002;
        const ORIENT_Z = 0x0004;
        const ORIENT_XYZ = Self::ORIENT_X.bits()
            | Self::ORIENT_Y.bits()
            | Self::ORIENT_Z.bits();
        const SCALE_X = 0x0010;
        const SCALE_Y = 0x0020;
        const SCALE_Z = 0x0040;
        const SCALE_XYZ = Self::SCALE_X.bits()
            | Self::SCALE_Y.bits()
            | Self::SCALE_Z.bits();
        const TRANSLATE_X = 0x0100;
        const TRANSLATE_Y = 0x0200;
        const TRANSLATE_Z = 0x0400;
        const TRANSLATE_XYZ = Self::TRANSLATE_X.bits()
            | Self::TRANSLATE_Y.bits()
            | Self::TRANSLATE_Z.bits();
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::all()
    }
}

bitflags! {
    /// Root motion kept when converting a clip's pose to matrices. A channel
    /// not in the set is zeroed on the root node, which plays the clip in
    /// place.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RootMotion: u8 {
        const TRANSLATE = 0x01;
        const ROTATE = 0x02;
    }
}

impl Default for RootMotion {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_groups() {
        assert!(Channels::all().contains(Channels::ORIENT_XYZ));
        assert_eq!(
            Channels::ORIENT_XYZ,
            Channels::ORIENT_X | Channels::ORIENT_Y | Channels::ORIENT_Z
        );
        assert!(!Channels::TRANSLATE_XYZ.intersects(Channels::SCALE_XYZ));
        assert_eq!(Channels::default(), Channels::all());
    }

    #[test]
    fn root_motion_default_keeps_everything() {
        let flags = RootMotion::default();
        assert!(flags.contains(RootMotion::TRANSLATE));
        assert!(flags.contains(RootMotion::ROTATE));
    }
}

//! Skeletal animation evaluation
//!
//! Keyframed clips are sampled by clip controllers, combined by a blend
//! tree into a hierarchical pose, propagated to object space by forward
//! kinematics and adjusted by effector solvers. The `rig` module runs that
//! pipeline for one animated instance and publishes the result together
//! with skinning data for a renderer.

pub mod anim;
pub mod anim_error;
pub mod blend;
pub mod config;
pub mod dualquat;
pub mod hierarchy;
pub mod ik;
pub mod kinematics;
pub mod pose;
pub mod rig;
pub mod skin;
pub mod types;
pub mod util;

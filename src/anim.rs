//! Keyframes, clips and the clip playback controller

pub mod controller;
pub mod types;
pub mod util;

pub use controller::ClipController;
pub use types::{Clip, ClipPool, Keyframe, KeyframePool};

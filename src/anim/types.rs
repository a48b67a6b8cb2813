use crate::{
    anim_error::AnimError,
    types::{RootMotion, DEFAULT_CLIP_NAME, MIN_DURATION, NAME_LEN_MAX},
};
use log::{info, warn};
use std::sync::Arc;

/// A timed reference to a pair of sample poses in a `HierarchyPoseGroup`.
/// Playback interpolates from sample 0 to sample 1 over the duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    duration: f32,
    duration_inverse: f32,
    pub sample_index0: usize,
    pub sample_index1: usize,
}

impl Default for Keyframe {
    fn default() -> Self {
        Self {
            duration: 1.0,
            duration_inverse: 1.0,
            sample_index0: 0,
            sample_index1: 0,
        }
    }
}

impl Keyframe {
    #[must_use]
    pub fn new(duration: f32, sample_index0: usize, sample_index1: usize) -> Self {
        let mut keyframe = Self {
            sample_index0,
            sample_index1,
            ..Default::default()
        };
        keyframe.set_duration(duration);
        keyframe
    }

    /// Sets the duration, clamped to `MIN_DURATION`, and its reciprocal
    pub fn set_duration(&mut self, duration: f32) {
        // f32::max also replaces NaN
        self.duration = duration.max(MIN_DURATION);
        self.duration_inverse = 1.0 / self.duration;
    }

    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub const fn duration_inverse(&self) -> f32 {
        self.duration_inverse
    }
}

/// Fixed size array of keyframes shared by the clips built over it
#[derive(Clone, Debug)]
pub struct KeyframePool {
    keyframes: Vec<Keyframe>,
}

impl KeyframePool {
    /// Creates `count` default keyframes
    ///
    /// # Errors
    /// Returns `AnimError::Allocation` if `count` is zero or the memory
    /// cannot be obtained
    pub fn create(count: usize) -> Result<Self, AnimError> {
        if count == 0 {
            return Err(AnimError::Allocation);
        }
        let mut keyframes = Vec::new();
        keyframes
            .try_reserve_exact(count)
            .map_err(|_| AnimError::Allocation)?;
        keyframes.resize(count, Keyframe::default());
        info!("Keyframe pool created with {} keyframes", count);
        Ok(Self { keyframes })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Gets a keyframe by index
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside the pool
    pub fn keyframe(&self, index: usize) -> Result<&Keyframe, AnimError> {
        self.keyframes
            .get(index)
            .ok_or(AnimError::range("keyframe", index, self.keyframes.len()))
    }

    /// Gets a keyframe for editing while the pool is being loaded
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside the pool
    pub fn keyframe_mut(&mut self, index: usize) -> Result<&mut Keyframe, AnimError> {
        let bound = self.keyframes.len();
        self.keyframes
            .get_mut(index)
            .ok_or(AnimError::range("keyframe", index, bound))
    }
}

/// Named, inclusive range of keyframes in a shared `KeyframePool`
///
/// A clip that has not been initialized carries the default name, no
/// keyframe pool and an empty range. Controllers refuse to play it.
#[derive(Clone, Debug)]
pub struct Clip {
    name: String,
    keyframes: Option<Arc<KeyframePool>>,
    first_keyframe: usize,
    last_keyframe: usize,
    keyframe_count: usize,
    duration: f32,
    duration_inverse: f32,
    pub root_motion: RootMotion,
}

impl Default for Clip {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLIP_NAME.to_string(),
            keyframes: None,
            first_keyframe: 0,
            last_keyframe: 0,
            keyframe_count: 0,
            duration: MIN_DURATION,
            duration_inverse: 1.0 / MIN_DURATION,
            root_motion: RootMotion::all(),
        }
    }
}

impl Clip {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.keyframes.is_some()
    }

    #[must_use]
    pub const fn keyframe_pool(&self) -> Option<&Arc<KeyframePool>> {
        self.keyframes.as_ref()
    }

    #[must_use]
    pub const fn first_keyframe(&self) -> usize {
        self.first_keyframe
    }

    #[must_use]
    pub const fn last_keyframe(&self) -> usize {
        self.last_keyframe
    }

    #[must_use]
    pub const fn keyframe_count(&self) -> usize {
        self.keyframe_count
    }

    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub const fn duration_inverse(&self) -> f32 {
        self.duration_inverse
    }
}

/// Truncates to at most `NAME_LEN_MAX` bytes without splitting a character
fn clip_name(name: &str) -> String {
    if name.is_empty() {
        return DEFAULT_CLIP_NAME.to_string();
    }
    let mut end = name.len().min(NAME_LEN_MAX);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    if end < name.len() {
        warn!("clip name \"{}\" truncated to {} bytes", name, end);
    }
    name[..end].to_string()
}

/// Fixed size array of clips
#[derive(Clone, Debug)]
pub struct ClipPool {
    clips: Vec<Clip>,
}

impl ClipPool {
    /// Creates `count` uninitialized clips
    ///
    /// # Errors
    /// Returns `AnimError::Allocation` if `count` is zero or the memory
    /// cannot be obtained
    pub fn create(count: usize) -> Result<Self, AnimError> {
        if count == 0 {
            return Err(AnimError::Allocation);
        }
        let mut clips = Vec::new();
        clips
            .try_reserve_exact(count)
            .map_err(|_| AnimError::Allocation)?;
        clips.resize_with(count, Clip::default);
        info!("Clip pool created with {} clips", count);
        Ok(Self { clips })
    }

    /// Initializes the clip at `index` over keyframes `first..=last` of
    /// `keyframes`. On error the slot is left as it was.
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside this pool or the
    /// keyframe range is inverted or outside `keyframes`, and
    /// `AnimError::DuplicateName` if another initialized clip has the name
    pub fn init_clip(
        &mut self,
        index: usize,
        name: &str,
        keyframes: &Arc<KeyframePool>,
        first: usize,
        last: usize,
    ) -> Result<(), AnimError> {
        if index >= self.clips.len() {
            return Err(AnimError::range("clip", index, self.clips.len()));
        }
        if first > last {
            return Err(AnimError::range("first keyframe", first, last + 1));
        }
        if last >= keyframes.len() {
            return Err(AnimError::range("last keyframe", last, keyframes.len()));
        }
        let name = clip_name(name);
        let taken = self
            .clips
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && c.is_initialized() && c.name == name);
        if taken {
            return Err(AnimError::DuplicateName(name));
        }
        let duration = keyframes.keyframes()[first..=last]
            .iter()
            .map(Keyframe::duration)
            .sum::<f32>()
            .max(MIN_DURATION);
        info!(
            "Clip \"{}\" uses keyframes {}..={} over {:.3}s",
            name, first, last, duration
        );
        self.clips[index] = Clip {
            name,
            keyframes: Some(Arc::clone(keyframes)),
            first_keyframe: first,
            last_keyframe: last,
            keyframe_count: last - first + 1,
            duration,
            duration_inverse: 1.0 / duration,
            root_motion: RootMotion::all(),
        };
        Ok(())
    }

    /// Sets which root motion channels the clip keeps
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside the pool
    pub fn set_root_motion(
        &mut self,
        index: usize,
        root_motion: RootMotion,
    ) -> Result<(), AnimError> {
        let bound = self.clips.len();
        self.clips
            .get_mut(index)
            .ok_or(AnimError::range("clip", index, bound))?
            .root_motion = root_motion;
        Ok(())
    }

    /// Finds an initialized clip by exact, case sensitive name
    ///
    /// # Errors
    /// Returns `AnimError::NotFound` if no initialized clip has that name
    pub fn find_clip_index(&self, name: &str) -> Result<usize, AnimError> {
        self.clips
            .iter()
            .position(|c| c.is_initialized() && c.name == name)
            .ok_or_else(|| AnimError::NotFound(name.to_string()))
    }

    /// Gets a clip by index
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside the pool
    pub fn clip(&self, index: usize) -> Result<&Clip, AnimError> {
        self.clips
            .get(index)
            .ok_or(AnimError::range("clip", index, self.clips.len()))
    }

    #[must_use]
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

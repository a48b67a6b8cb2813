use super::types::{Clip, ClipPool, Keyframe, KeyframePool};
use crate::anim_error::AnimError;
use log::{debug, trace};
use std::sync::Arc;

/// Playback cursor over one clip of a shared `ClipPool`
///
/// Time always stays inside `[0, duration)` of the current clip, so a clip
/// loops in either direction. `keyframe_index` is an absolute index into the
/// clip's keyframe pool and always lies in the clip's range.
#[derive(Clone, Debug)]
pub struct ClipController {
    clips: Arc<ClipPool>,
    keyframes: Arc<KeyframePool>,
    clip_index: usize,
    clip_time: f32,
    clip_parameter: f32,
    keyframe_index: usize,
    keyframe_time: f32,
    keyframe_parameter: f32,
    // Clip time at which the current keyframe starts
    keyframe_start: f32,
    playback_rate: f32,
}

impl ClipController {
    /// Creates a controller at the start of clip `clip_index`, playing
    /// forward at normal speed
    ///
    /// # Errors
    /// Returns `AnimError::Range` if the index is outside the pool and
    /// `AnimError::NotFound` if the clip has not been initialized
    pub fn new(clips: &Arc<ClipPool>, clip_index: usize) -> Result<Self, AnimError> {
        let keyframes = playable(clips, clip_index)?;
        let first = clips.clip(clip_index)?.first_keyframe();
        Ok(Self {
            clips: Arc::clone(clips),
            keyframes,
            clip_index,
            clip_time: 0.0,
            clip_parameter: 0.0,
            keyframe_index: first,
            keyframe_time: 0.0,
            keyframe_parameter: 0.0,
            keyframe_start: 0.0,
            playback_rate: 1.0,
        })
    }

    /// Creates a controller on the clip with the given name
    ///
    /// # Errors
    /// Returns `AnimError::NotFound` if there is no such clip
    pub fn with_clip_name(clips: &Arc<ClipPool>, name: &str) -> Result<Self, AnimError> {
        Self::new(clips, clips.find_clip_index(name)?)
    }

    /// Switches to another clip of the same pool and restarts it. The
    /// playback rate is kept.
    ///
    /// # Errors
    /// As for `new`. The controller is unchanged on error.
    pub fn set_clip(&mut self, clip_index: usize) -> Result<(), AnimError> {
        self.keyframes = playable(&self.clips, clip_index)?;
        self.clip_index = clip_index;
        self.jump_to_start();
        Ok(())
    }

    /// Switches clip by name
    ///
    /// # Errors
    /// Returns `AnimError::NotFound` if there is no such clip
    pub fn set_clip_by_name(&mut self, name: &str) -> Result<(), AnimError> {
        let index = self.clips.find_clip_index(name)?;
        self.set_clip(index)
    }

    /// Resets to the first keyframe with all times and parameters at zero
    pub fn jump_to_start(&mut self) {
        self.keyframe_index = self.clip().first_keyframe();
        self.clip_time = 0.0;
        self.clip_parameter = 0.0;
        self.keyframe_time = 0.0;
        self.keyframe_parameter = 0.0;
        self.keyframe_start = 0.0;
    }

    /// Signed rate; negative plays backward and zero freezes time
    pub fn set_playback_rate(&mut self, rate: f32) {
        self.playback_rate = rate;
    }

    /// Advances the cursor by `dt` seconds scaled by the playback rate
    pub fn update(&mut self, dt: f32) {
        let step = dt * self.playback_rate;
        if step == 0.0 || !step.is_finite() {
            return;
        }
        let clip = self.clip();
        let (duration, duration_inverse) = (clip.duration(), clip.duration_inverse());
        let (first, last) = (clip.first_keyframe(), clip.last_keyframe());

        let raw = self.clip_time + step;
        let mut time = raw.rem_euclid(duration);
        // rem_euclid can round up to the divisor for tiny negative input
        if time >= duration {
            time = 0.0;
        }
        if raw >= duration {
            // Wrapped past the end so walk from the first keyframe
            self.keyframe_index = first;
            self.keyframe_start = 0.0;
        } else if raw < 0.0 {
            // Wrapped past the start so walk from the last keyframe
            self.keyframe_index = last;
            self.keyframe_start = duration - self.key(last).duration();
        }
        self.clip_time = time;
        self.clip_parameter = time * duration_inverse;

        while time < self.keyframe_start && self.keyframe_index > first {
            self.keyframe_index -= 1;
            self.keyframe_start -= self.key(self.keyframe_index).duration();
        }
        if self.keyframe_index == first {
            self.keyframe_start = 0.0;
        }
        while self.keyframe_index < last
            && time >= self.keyframe_start + self.key(self.keyframe_index).duration()
        {
            self.keyframe_start += self.key(self.keyframe_index).duration();
            self.keyframe_index += 1;
        }

        let key = *self.key(self.keyframe_index);
        self.keyframe_time = (time - self.keyframe_start).max(0.0);
        self.keyframe_parameter = (self.keyframe_time * key.duration_inverse()).min(1.0);
        trace!(
            "clip {} t={:.4} keyframe {} u={:.4}",
            self.clip_index,
            self.clip_time,
            self.keyframe_index,
            self.keyframe_parameter
        );
    }

    fn key(&self, index: usize) -> &Keyframe {
        &self.keyframes.keyframes()[index]
    }

    /// The clip being played
    #[must_use]
    pub fn clip(&self) -> &Clip {
        &self.clips.clips()[self.clip_index]
    }

    #[must_use]
    pub const fn clip_pool(&self) -> &Arc<ClipPool> {
        &self.clips
    }

    /// The current keyframe
    #[must_use]
    pub fn keyframe(&self) -> &Keyframe {
        self.key(self.keyframe_index)
    }

    /// Index of the keyframe that follows the current one, wrapping to the
    /// first keyframe of the clip
    #[must_use]
    pub fn next_keyframe_index(&self) -> usize {
        let clip = self.clip();
        if self.keyframe_index >= clip.last_keyframe() {
            clip.first_keyframe()
        } else {
            self.keyframe_index + 1
        }
    }

    #[must_use]
    pub const fn clip_index(&self) -> usize {
        self.clip_index
    }

    #[must_use]
    pub const fn clip_time(&self) -> f32 {
        self.clip_time
    }

    #[must_use]
    pub const fn clip_parameter(&self) -> f32 {
        self.clip_parameter
    }

    #[must_use]
    pub const fn keyframe_index(&self) -> usize {
        self.keyframe_index
    }

    #[must_use]
    pub const fn keyframe_time(&self) -> f32 {
        self.keyframe_time
    }

    #[must_use]
    pub const fn keyframe_parameter(&self) -> f32 {
        self.keyframe_parameter
    }

    #[must_use]
    pub const fn playback_rate(&self) -> f32 {
        self.playback_rate
    }
}

/// Returns the keyframe pool of a clip that can be played
fn playable(clips: &ClipPool, index: usize) -> Result<Arc<KeyframePool>, AnimError> {
    let clip = clips.clip(index)?;
    clip.keyframe_pool().cloned().ok_or_else(|| {
        debug!("clip {} is not initialized", index);
        AnimError::NotFound(format!("clip {index}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.0001;

    /// Pool with keyframes of the given durations, one clip over all of them
    /// in slot 0 named "clip" and an uninitialized slot 1
    fn setup(durations: &[f32]) -> Arc<ClipPool> {
        let mut keys = KeyframePool::create(durations.len() + 1).unwrap();
        for (i, d) in durations.iter().enumerate() {
            keys.keyframe_mut(i + 1).unwrap().set_duration(*d);
        }
        let keys = Arc::new(keys);
        let mut clips = ClipPool::create(2).unwrap();
        clips
            .init_clip(0, "clip", &keys, 1, durations.len())
            .unwrap();
        Arc::new(clips)
    }

    #[test]
    fn keyframe_lookup() {
        let clips = setup(&[1.0, 1.0]);
        let mut c = ClipController::new(&clips, 0).unwrap();
        c.update(0.5);
        assert_eq!(c.keyframe_index(), 1);
        assert!((c.keyframe_parameter() - 0.5).abs() < EPS);
        c.update(1.0);
        assert!((c.clip_time() - 1.5).abs() < EPS);
        assert_eq!(c.keyframe_index(), 2);
        assert!((c.keyframe_parameter() - 0.5).abs() < EPS);
        assert!((c.clip_parameter() - 0.75).abs() < EPS);
    }

    #[test]
    fn full_duration_loops_back() {
        let clips = setup(&[0.3, 0.5, 0.2]);
        let mut c = ClipController::new(&clips, 0).unwrap();
        c.update(0.4);
        let (time, index) = (c.clip_time(), c.keyframe_index());
        c.update(1.0);
        assert!((c.clip_time() - time).abs() < EPS);
        assert_eq!(c.keyframe_index(), index);
    }

    #[test]
    fn negative_rate_wraps_backward() {
        let clips = setup(&[1.0, 1.0]);
        let mut c = ClipController::new(&clips, 0).unwrap();
        c.set_playback_rate(-1.0);
        c.update(0.5);
        assert!((c.clip_time() - 1.5).abs() < EPS);
        assert_eq!(c.keyframe_index(), 2);
        assert!((c.keyframe_parameter() - 0.5).abs() < EPS);
        c.update(1.0);
        assert!((c.clip_time() - 0.5).abs() < EPS);
        assert_eq!(c.keyframe_index(), 1);
        c.update(2.0);
        assert!((c.clip_time() - 0.5).abs() < EPS);
    }

    #[test]
    fn zero_step_is_noop() {
        let clips = setup(&[1.0, 1.0]);
        let mut c = ClipController::new(&clips, 0).unwrap();
        c.update(0.7);
        let before = (c.clip_time(), c.keyframe_index(), c.keyframe_parameter());
        c.update(0.0);
        c.set_playback_rate(0.0);
        c.update(5.0);
        assert_eq!(before, (c.clip_time(), c.keyframe_index(), c.keyframe_parameter()));
    }

    #[test]
    fn single_keyframe_clip_never_advances_index() {
        let clips = setup(&[0.4]);
        let mut c = ClipController::new(&clips, 0).unwrap();
        for _ in 0..10 {
            c.update(0.13);
            assert_eq!(c.keyframe_index(), 1);
            assert!(c.clip_time() < 0.4);
        }
        assert_eq!(c.next_keyframe_index(), 1);
    }

    #[test]
    fn jump_and_switch() {
        let clips = setup(&[1.0, 1.0]);
        let mut c = ClipController::with_clip_name(&clips, "clip").unwrap();
        c.update(1.25);
        assert_eq!(c.next_keyframe_index(), 1);
        c.jump_to_start();
        assert_eq!(c.keyframe_index(), 1);
        assert!(c.clip_time().abs() < EPS && c.keyframe_parameter().abs() < EPS);
        assert!(matches!(c.set_clip(1), Err(AnimError::NotFound(_))));
        assert!(matches!(c.set_clip(5), Err(AnimError::Range { .. })));
        assert_eq!(c.clip_index(), 0);
        assert!(ClipController::with_clip_name(&clips, "nope").is_err());
    }
}

use crate::animation::values::Interpolatable;
use crate::errors::{Error, Result};

/// A timestamped value. `time` is in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame<T> {
    pub time: f32,
    pub value: T,
}

impl<T> KeyFrame<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// A time-ordered keyframe sequence for one animated property.
///
/// Invariant: keyframe times are finite, non-negative and strictly
/// increasing. An empty track means "not animated"; a single keyframe is
/// a static pose.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T: Interpolatable> {
    keyframes: Vec<KeyFrame<T>>,
}

impl<T: Interpolatable> Default for KeyframeTrack<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            keyframes: Vec::new(),
        }
    }

    /// Builds a track, validating the ordering invariant.
    pub fn new(keyframes: Vec<KeyFrame<T>>) -> Result<Self> {
        for (i, kf) in keyframes.iter().enumerate() {
            if !kf.time.is_finite() || kf.time < 0.0 {
                return Err(Error::malformed(format!(
                    "keyframe {i} has invalid time {}",
                    kf.time
                )));
            }
        }
        if let Some(i) = keyframes.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(Error::malformed(format!(
                "keyframe times must be strictly increasing ({} then {})",
                keyframes[i].time,
                keyframes[i + 1].time
            )));
        }
        Ok(Self { keyframes })
    }

    /// Zips parallel time and value arrays into a track.
    pub fn from_parts(times: &[f32], values: Vec<T>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(Error::malformed(format!(
                "track has {} timestamps but {} values",
                times.len(),
                values.len()
            )));
        }
        let keyframes = times
            .iter()
            .zip(values)
            .map(|(&time, value)| KeyFrame { time, value })
            .collect();
        Self::new(keyframes)
    }

    #[inline]
    #[must_use]
    pub fn keyframes(&self) -> &[KeyFrame<T>] {
        &self.keyframes
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe in seconds (0 for empty tracks).
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |kf| kf.time)
    }

    /// Samples the track `elapsed_ms` milliseconds into playback.
    ///
    /// Playback always loops with the period of the last keyframe time.
    /// Returns `None` for an empty track.
    #[must_use]
    pub fn sample(&self, elapsed_ms: f32) -> Option<T> {
        let (first, last) = match self.keyframes.as_slice() {
            [] => return None,
            [only] => return Some(only.value),
            [first, .., last] => (first, last),
        };

        let t = (elapsed_ms / 1000.0) % last.time;
        if t < first.time {
            return Some(first.value);
        }

        let mut previous = first;
        let mut next = first;
        for kf in &self.keyframes[1..] {
            next = kf;
            if kf.time > t {
                break;
            }
            previous = kf;
        }

        if next.time <= previous.time {
            return Some(previous.value);
        }

        let progression = (t - previous.time) / (next.time - previous.time);
        Some(T::interpolate_linear(previous.value, next.value, progression))
    }
}

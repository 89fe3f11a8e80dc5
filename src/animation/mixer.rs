use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::animation::action::ActiveAnimation;
use crate::animation::clip::AnimationClip;
use crate::animation::values::slerp_shortest;
use crate::errors::{Error, Result};
use crate::scene::{DecomposedTransform, LocalComposition, Node};

/// Blended parent-relative transform of one animated node.
pub type LocalTransform = DecomposedTransform;

/// Observable playback state of a mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerState {
    Idle,
    SingleClip,
    Blending,
}

/// Per-entity playback stack with a fixed-window crossfade.
///
/// Holds at most two clips: the current one (top) and the one it is
/// fading out of. While both are present the previous clip contributes
/// [`blend_weight`](Self::blend_weight) of the pose.
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    stack: SmallVec<[ActiveAnimation; 2]>,
    blend_window_ms: f32,
}

impl AnimationMixer {
    #[must_use]
    pub fn new(blend_window_ms: f32) -> Self {
        Self {
            stack: SmallVec::new(),
            blend_window_ms: blend_window_ms.max(0.0),
        }
    }

    #[must_use]
    pub fn blend_window_ms(&self) -> f32 {
        self.blend_window_ms
    }

    #[must_use]
    pub fn current(&self) -> Option<&ActiveAnimation> {
        self.stack.last()
    }

    #[must_use]
    pub fn previous(&self) -> Option<&ActiveAnimation> {
        if self.stack.len() == 2 {
            self.stack.first()
        } else {
            None
        }
    }

    #[must_use]
    pub fn state(&self) -> MixerState {
        match self.stack.len() {
            0 => MixerState::Idle,
            1 => MixerState::SingleClip,
            _ => MixerState::Blending,
        }
    }

    /// Starts playing `clip_key` from time zero.
    ///
    /// The previous top becomes the fade-out source; anything older is
    /// dropped. Pushing the clip that is already on top is a no-op.
    /// Returns whether the stack changed.
    pub fn push_animation(&mut self, clip_key: impl Into<String>) -> bool {
        let clip_key = clip_key.into();
        if self.current().is_some_and(|a| a.clip_key == clip_key) {
            return false;
        }

        log::debug!("Mixer: push '{clip_key}'");
        self.stack.push(ActiveAnimation::new(clip_key));
        while self.stack.len() > 2 {
            let dropped = self.stack.remove(0);
            log::debug!("Mixer: drop '{}'", dropped.clip_key);
        }
        if self.blend_window_ms <= 0.0 {
            self.retire_previous();
        }
        true
    }

    /// Advances every active clip and retires the previous clip once the
    /// crossfade completes.
    pub fn advance(&mut self, delta_ms: f32) {
        for animation in &mut self.stack {
            animation.advance(delta_ms);
        }
        if self.stack.len() == 2 && self.blend_weight() <= 0.0 {
            self.retire_previous();
        }
    }

    fn retire_previous(&mut self) {
        if self.stack.len() == 2 {
            let retired = self.stack.remove(0);
            log::debug!("Mixer: crossfade from '{}' finished", retired.clip_key);
        }
    }

    /// Share of the pose still taken from the previous clip.
    ///
    /// `clamp(1 - current_elapsed / window, 0, 1)`: 1 right after a push,
    /// 0 once the window has elapsed. Always 0 when nothing is fading out.
    #[must_use]
    pub fn blend_weight(&self) -> f32 {
        match (self.previous(), self.current()) {
            (Some(_), Some(current)) if self.blend_window_ms > 0.0 => {
                (1.0 - current.elapsed_ms / self.blend_window_ms).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Samples and blends the active clips into per-node local transforms.
    ///
    /// Covers every node animated by the current or the previous clip.
    /// Components a clip does not animate fall back to identity
    /// ([`LocalComposition::BindThenAnimated`]) or to the node's bind
    /// component ([`LocalComposition::AnimatedReplacesBind`]).
    pub fn sample_local_transforms(
        &self,
        clips: &BTreeMap<String, AnimationClip>,
        nodes: &[Node],
        composition: LocalComposition,
    ) -> Result<FxHashMap<usize, LocalTransform>> {
        let mut out = FxHashMap::default();
        let Some(current) = self.current() else {
            return Ok(out);
        };
        let current_clip = lookup(clips, &current.clip_key)?;

        let weight = self.blend_weight();
        let previous = match self.previous() {
            Some(active) if weight > 0.0 => Some((lookup(clips, &active.clip_key)?, active)),
            _ => None,
        };

        let mut animated: Vec<usize> = current_clip.channels.keys().copied().collect();
        if let Some((clip, _)) = previous {
            animated.extend(clip.channels.keys().copied());
        }
        animated.sort_unstable();
        animated.dedup();

        for node in animated {
            let base = match composition {
                LocalComposition::BindThenAnimated => DecomposedTransform::default(),
                LocalComposition::AnimatedReplacesBind => nodes
                    .get(node)
                    .ok_or_else(|| Error::out_of_bounds("animated node", node))?
                    .transform
                    .decomposed(),
            };
            let sample = |clip: &AnimationClip, elapsed_ms: f32| {
                clip.tracks_for(node)
                    .map_or(base, |tracks| tracks.sample_over(base, elapsed_ms))
            };

            let mut local = sample(current_clip, current.elapsed_ms);
            if let Some((clip, active)) = previous {
                let from = sample(clip, active.elapsed_ms);
                local = DecomposedTransform {
                    translation: local.translation.lerp(from.translation, weight),
                    rotation: slerp_shortest(local.rotation, from.rotation, weight),
                    scale: local.scale.lerp(from.scale, weight),
                };
            }
            out.insert(node, local);
        }

        Ok(out)
    }
}

fn lookup<'a>(
    clips: &'a BTreeMap<String, AnimationClip>,
    key: &str,
) -> Result<&'a AnimationClip> {
    clips
        .get(key)
        .ok_or_else(|| Error::ClipNotFound(key.to_string()))
}

use glam::Mat4;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::animation::mixer::AnimationMixer;
use crate::assets::ParsedModel;
use crate::errors::{Error, Result};
use crate::scene::{DecomposedTransform, LocalComposition, compose_pose};

new_key_type! {
    /// Handle of one animated entity inside an [`Animator`].
    pub struct EntityHandle;
}

/// Default crossfade window in milliseconds.
pub const DEFAULT_BLEND_WINDOW_MS: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatorConfig {
    /// Duration of the crossfade after a clip change; 0 switches instantly
    pub blend_window_ms: f32,
    pub composition: LocalComposition,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            blend_window_ms: DEFAULT_BLEND_WINDOW_MS,
            composition: LocalComposition::default(),
        }
    }
}

/// Animation system.
///
/// Owns one [`AnimationMixer`] per animated entity. The host calls
/// [`advance_all`](Self::advance_all) once per frame, then
/// [`compute_joint_matrices`](Self::compute_joint_matrices) per entity and
/// uploads the result.
#[derive(Debug, Default)]
pub struct Animator {
    config: AnimatorConfig,
    mixers: SlotMap<EntityHandle, AnimationMixer>,
}

impl Animator {
    #[must_use]
    pub fn new(config: AnimatorConfig) -> Self {
        Self {
            config,
            mixers: SlotMap::with_key(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    /// Registers a new idle entity.
    pub fn spawn(&mut self) -> EntityHandle {
        self.mixers
            .insert(AnimationMixer::new(self.config.blend_window_ms))
    }

    /// Removes an entity. Returns whether it existed.
    pub fn despawn(&mut self, entity: EntityHandle) -> bool {
        self.mixers.remove(entity).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mixers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mixers.is_empty()
    }

    #[must_use]
    pub fn mixer(&self, entity: EntityHandle) -> Option<&AnimationMixer> {
        self.mixers.get(entity)
    }

    fn mixer_mut(&mut self, entity: EntityHandle) -> Result<&mut AnimationMixer> {
        self.mixers.get_mut(entity).ok_or(Error::EntityNotFound)
    }

    /// Switches `entity` to `clip_key`, crossfading from its current clip.
    ///
    /// The key is not checked against any model here; an unknown key
    /// surfaces as [`Error::ClipNotFound`] when the pose is computed.
    pub fn push_animation(&mut self, entity: EntityHandle, clip_key: &str) -> Result<()> {
        self.mixer_mut(entity)?.push_animation(clip_key);
        Ok(())
    }

    pub fn advance(&mut self, entity: EntityHandle, delta_ms: f32) -> Result<()> {
        self.mixer_mut(entity)?.advance(delta_ms);
        Ok(())
    }

    /// Advances every entity by the same frame delta.
    pub fn advance_all(&mut self, delta_ms: f32) {
        for (_handle, mixer) in &mut self.mixers {
            mixer.advance(delta_ms);
        }
    }

    /// Share of the pose still taken from the clip being faded out.
    pub fn blend_weight(&self, entity: EntityHandle) -> Result<f32> {
        self.mixers
            .get(entity)
            .map(AnimationMixer::blend_weight)
            .ok_or(Error::EntityNotFound)
    }

    /// Blended per-node local transforms for `entity`.
    pub fn local_transforms(
        &self,
        model: &ParsedModel,
        entity: EntityHandle,
    ) -> Result<FxHashMap<usize, DecomposedTransform>> {
        self.mixers
            .get(entity)
            .ok_or(Error::EntityNotFound)?
            .sample_local_transforms(&model.animations, &model.nodes, self.config.composition)
    }

    /// Joint matrices of every skin of `model`, posed by `entity`'s clips.
    ///
    /// An idle entity yields the bind pose.
    pub fn compute_joint_matrices(
        &self,
        model: &ParsedModel,
        entity: EntityHandle,
    ) -> Result<Vec<Vec<Mat4>>> {
        let animated = self.local_transforms(model, entity)?;
        compose_pose(
            &model.nodes,
            &model.skins,
            &model.root_nodes,
            &animated,
            self.config.composition,
        )
    }
}

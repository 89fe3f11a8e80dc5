use std::collections::BTreeMap;
use std::str::FromStr;

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::binding::TargetPath;
use crate::animation::tracks::KeyframeTrack;
use crate::assets::accessor::read_accessor;
use crate::assets::schema::{Manifest, SamplerInterpolation};
use crate::errors::{Error, Result};
use crate::scene::DecomposedTransform;

/// The three property tracks that can animate one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTracks {
    pub translation: KeyframeTrack<Vec3>,
    pub rotation: KeyframeTrack<Quat>,
    pub scale: KeyframeTrack<Vec3>,
}

impl NodeTracks {
    /// Longest track duration in seconds.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.translation
            .duration()
            .max(self.rotation.duration())
            .max(self.scale.duration())
    }

    /// Samples every track; components without keyframes keep `base`.
    #[must_use]
    pub fn sample_over(&self, base: DecomposedTransform, elapsed_ms: f32) -> DecomposedTransform {
        DecomposedTransform {
            translation: self.translation.sample(elapsed_ms).unwrap_or(base.translation),
            rotation: self.rotation.sample(elapsed_ms).unwrap_or(base.rotation),
            scale: self.scale.sample(elapsed_ms).unwrap_or(base.scale),
        }
    }

    fn is_set(&self, path: TargetPath) -> bool {
        match path {
            TargetPath::Translation => !self.translation.is_empty(),
            TargetPath::Rotation => !self.rotation.is_empty(),
            TargetPath::Scale => !self.scale.is_empty(),
        }
    }
}

/// A named animation: per-node tracks keyed by node id.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds; the maximum keyframe time over all tracks
    pub duration: f32,
    pub channels: FxHashMap<usize, NodeTracks>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>, channels: FxHashMap<usize, NodeTracks>) -> Self {
        let duration = channels
            .values()
            .map(NodeTracks::duration)
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }

    #[inline]
    #[must_use]
    pub fn tracks_for(&self, node: usize) -> Option<&NodeTracks> {
        self.channels.get(&node)
    }
}

fn chunk_values<const N: usize>(
    flat: &[f32],
    stride: usize,
    offset: usize,
) -> impl Iterator<Item = [f32; N]> + '_ {
    flat.chunks_exact(stride).map(move |chunk| {
        let mut out = [0.0; N];
        out.copy_from_slice(&chunk[offset..offset + N]);
        out
    })
}

/// Animation Clip Loader: decodes every animation of `manifest`.
///
/// Unnamed animations are keyed `animation_<index>`. A later clip with a
/// duplicate name replaces the earlier one.
pub fn load_clips(
    manifest: &Manifest,
    buffers: &[Vec<u8>],
) -> Result<BTreeMap<String, AnimationClip>> {
    let mut clips = BTreeMap::new();

    for (anim_index, def) in manifest.animations.iter().enumerate() {
        let name = def
            .name
            .clone()
            .unwrap_or_else(|| format!("animation_{anim_index}"));
        let mut channels: FxHashMap<usize, NodeTracks> = FxHashMap::default();

        for (channel_index, channel) in def.channels.iter().enumerate() {
            let path = TargetPath::from_str(&channel.target.path)?;
            let Some(node) = channel.target.node else {
                log::debug!("Clip '{name}': channel {channel_index} has no target node, skipped");
                continue;
            };
            if node >= manifest.nodes.len() {
                return Err(Error::out_of_bounds(
                    format!("target node of clip '{name}' channel {channel_index}"),
                    node,
                ));
            }
            let sampler = def.samplers.get(channel.sampler).ok_or_else(|| {
                Error::out_of_bounds(format!("sampler of clip '{name}'"), channel.sampler)
            })?;

            let times = read_accessor(manifest, buffers, sampler.input)?.to_f32();
            let values = read_accessor(manifest, buffers, sampler.output)?.to_f32();

            let arity = path.arity();
            let (stride, offset) = match sampler.interpolation {
                SamplerInterpolation::Linear => (arity, 0),
                SamplerInterpolation::Step => {
                    log::warn!("Clip '{name}': step sampler on node {node} evaluated linearly");
                    (arity, 0)
                }
                SamplerInterpolation::CubicSpline => {
                    log::warn!(
                        "Clip '{name}': cubic spline sampler on node {node} evaluated linearly"
                    );
                    (arity * 3, arity)
                }
            };

            if values.len() != times.len() * stride {
                return Err(Error::malformed(format!(
                    "clip '{name}' channel {channel_index}: {} output floats for {} keyframes of {}",
                    values.len(),
                    times.len(),
                    path.as_str()
                )));
            }

            let tracks = channels.entry(node).or_default();
            if tracks.is_set(path) {
                return Err(Error::malformed(format!(
                    "clip '{name}' animates {} of node {node} twice",
                    path.as_str()
                )));
            }

            match path {
                TargetPath::Translation => {
                    let v = chunk_values::<3>(&values, stride, offset)
                        .map(Vec3::from_array)
                        .collect();
                    tracks.translation = KeyframeTrack::from_parts(&times, v)?;
                }
                TargetPath::Rotation => {
                    let v = chunk_values::<4>(&values, stride, offset)
                        .map(Quat::from_array)
                        .collect();
                    tracks.rotation = KeyframeTrack::from_parts(&times, v)?;
                }
                TargetPath::Scale => {
                    let v = chunk_values::<3>(&values, stride, offset)
                        .map(Vec3::from_array)
                        .collect();
                    tracks.scale = KeyframeTrack::from_parts(&times, v)?;
                }
            }
        }

        let clip = AnimationClip::new(name.clone(), channels);
        log::debug!(
            "Loaded clip '{name}': {} nodes, {:.3}s",
            clip.channels.len(),
            clip.duration
        );
        if clips.insert(name.clone(), clip).is_some() {
            log::warn!("Duplicate clip name '{name}', the later clip wins");
        }
    }

    Ok(clips)
}

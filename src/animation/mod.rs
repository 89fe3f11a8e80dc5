mod values;
pub mod action;
pub mod binding;
pub mod clip;
pub mod mixer;
pub mod system;
pub mod tracks;

pub use action::ActiveAnimation;
pub use binding::TargetPath;
pub use clip::{AnimationClip, NodeTracks, load_clips};
pub use mixer::{AnimationMixer, LocalTransform, MixerState};
pub use crate::scene::LocalComposition;
pub use system::{Animator, AnimatorConfig, DEFAULT_BLEND_WINDOW_MS, EntityHandle};
pub use tracks::{KeyFrame, KeyframeTrack};
pub use values::{Interpolatable, slerp_shortest};

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod assets;
pub mod errors;
pub mod scene;

pub use animation::{AnimationClip, AnimationMixer, Animator, AnimatorConfig, EntityHandle};
pub use assets::{LoaderOptions, ParsedModel, load_model, load_model_with};
pub use errors::{Error, ErrorKind, Result};
pub use scene::{LocalComposition, Node, Skin};

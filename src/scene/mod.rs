//! Scene graph module
//!
//! - Node: flat-array hierarchy entries with bind transforms
//! - Skin: joint lists and inverse bind matrices
//! - Pose: hierarchy walk producing joint matrices

pub mod node;
pub mod pose;
pub mod skin;

pub use node::{DecomposedTransform, Node, NodeTransform, build_nodes, parentless_nodes};
pub use pose::{LocalComposition, compose_pose, compute_world_transforms, joint_matrices};
pub use skin::{Skin, resolve_skins, split_inverse_bind_matrices};

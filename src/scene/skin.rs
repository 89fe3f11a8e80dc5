use glam::Mat4;

use crate::assets::accessor::read_accessor;
use crate::assets::schema::Manifest;
use crate::errors::{Error, Result};

/// A set of joints plus their inverse bind matrices.
///
/// `joints[i]` and `inverse_bind_matrices[i]` describe the joint that the
/// skinning shader addresses as slot `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub name: String,
    /// Node ids, ordered by shader slot
    pub joints: Vec<usize>,
    /// Transforms mesh space into each joint's local space at bind time
    pub inverse_bind_matrices: Vec<Mat4>,
    /// Optional common root of the joint hierarchy
    pub skeleton: Option<usize>,
}

impl Skin {
    /// Builds a skin from already-resolved data.
    pub fn new(
        name: impl Into<String>,
        joints: Vec<usize>,
        inverse_bind_matrices: Vec<Mat4>,
    ) -> Result<Self> {
        if joints.len() != inverse_bind_matrices.len() {
            return Err(Error::malformed(format!(
                "skin has {} joints but {} inverse bind matrices",
                joints.len(),
                inverse_bind_matrices.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            joints,
            inverse_bind_matrices,
            skeleton: None,
        })
    }

    /// Shader slot of `node`, if it is one of this skin's joints.
    #[inline]
    #[must_use]
    pub fn joint_slot(&self, node: usize) -> Option<usize> {
        self.joints.iter().position(|&j| j == node)
    }

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }
}

/// Slices a flat float array into one column-major matrix per joint.
///
/// The array must hold exactly `16 * joint_count` floats.
pub fn split_inverse_bind_matrices(flat: &[f32], joint_count: usize) -> Result<Vec<Mat4>> {
    if flat.len() != joint_count * 16 {
        return Err(Error::malformed(format!(
            "inverse bind accessor holds {} floats, expected {} for {joint_count} joints",
            flat.len(),
            joint_count * 16
        )));
    }
    Ok(flat
        .chunks_exact(16)
        .map(|chunk| {
            let mut cols = [0.0; 16];
            cols.copy_from_slice(chunk);
            Mat4::from_cols_array(&cols)
        })
        .collect())
}

/// Skin Resolver: builds every skin of `manifest`.
pub fn resolve_skins(manifest: &Manifest, buffers: &[Vec<u8>]) -> Result<Vec<Skin>> {
    let node_count = manifest.nodes.len();
    manifest
        .skins
        .iter()
        .enumerate()
        .map(|(index, def)| {
            if let Some(&bad) = def.joints.iter().find(|&&j| j >= node_count) {
                return Err(Error::out_of_bounds(format!("joint of skin {index}"), bad));
            }
            if let Some(root) = def.skeleton.filter(|&r| r >= node_count) {
                return Err(Error::out_of_bounds(format!("skeleton of skin {index}"), root));
            }

            let inverse_bind_matrices = match def.inverse_bind_matrices {
                Some(accessor) => {
                    let view = read_accessor(manifest, buffers, accessor)?;
                    split_inverse_bind_matrices(&view.to_f32(), def.joints.len())?
                }
                None => vec![Mat4::IDENTITY; def.joints.len()],
            };

            let mut skin = Skin::new(
                def.name.clone().unwrap_or_else(|| format!("Skin_{index}")),
                def.joints.clone(),
                inverse_bind_matrices,
            )?;
            skin.skeleton = def.skeleton;
            Ok(skin)
        })
        .collect()
}

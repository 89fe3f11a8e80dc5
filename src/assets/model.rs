use std::collections::BTreeMap;

use glam::{Mat4, Vec3, Vec4};
use uuid::Uuid;

use crate::animation::AnimationClip;
use crate::scene::{Node, Skin};

/// Decoded vertex streams of one primitive.
///
/// Every attribute except `positions` is optional. Integer attributes
/// (`joints`) are widened to `u32`; normalized integer attributes
/// (`weights`, `tex_coords`) are converted to floats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tangents: Option<Vec<[f32; 4]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub joints: Option<Vec<[u32; 4]>>,
    pub weights: Option<Vec<[f32; 4]>>,
    pub indices: Option<Vec<u32>>,
    /// Number of elements to draw: index count, else vertex count
    pub element_count: usize,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Stable across loads of the same URI
    pub id: Uuid,
    pub name: String,
    pub primitives: Vec<Primitive>,
}

/// RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub id: Uuid,
    pub name: String,
    /// `None` when image decoding is disabled or the texture has no source
    pub image: Option<DecodedImage>,
}

/// A material's reference to one of the model's textures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRef {
    pub texture: usize,
    pub tex_coord: u32,
}

/// PBR metallic-roughness material with glTF defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<TextureRef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub emissive_factor: Vec3,
    pub emissive_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            emissive_factor: Vec3::ZERO,
            emissive_texture: None,
            normal_texture: None,
            normal_scale: 1.0,
            occlusion_texture: None,
            occlusion_strength: 1.0,
        }
    }
}

impl Material {
    /// Every texture slot that is set, in a fixed order.
    pub fn texture_refs(&self) -> impl Iterator<Item = TextureRef> + '_ {
        [
            self.base_color_texture,
            self.metallic_roughness_texture,
            self.emissive_texture,
            self.normal_texture,
            self.occlusion_texture,
        ]
        .into_iter()
        .flatten()
    }
}

/// Receives the GPU-side resources of a model being disposed.
pub trait ResourceReleaser {
    fn release_mesh(&mut self, mesh: &Mesh);
    fn release_texture(&mut self, texture: &Texture);
}

/// Immutable result of loading one asset.
///
/// Share it behind an `Arc` between the renderer and the
/// [`Animator`](crate::animation::Animator).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModel {
    /// Last path segment of the source URI
    pub name: String,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub skins: Vec<Skin>,
    pub animations: BTreeMap<String, AnimationClip>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    /// Roots of the default scene
    pub root_nodes: Vec<usize>,
    pub root_node: Option<usize>,
}

impl ParsedModel {
    #[must_use]
    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.animations.get(name)
    }

    /// Clip names in sorted order.
    pub fn clip_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }

    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// World matrices of the bind pose. Unreachable nodes are `None`.
    pub fn bind_pose_world(&self) -> crate::errors::Result<Vec<Option<Mat4>>> {
        let locals: Vec<Mat4> = self.nodes.iter().map(|n| n.local_bind_transform).collect();
        crate::scene::compute_world_transforms(&self.nodes, &self.root_nodes, &locals)
    }

    /// Hands every mesh and every material texture to `releaser`, once
    /// each, and drops the model.
    pub fn dispose(self, releaser: &mut impl ResourceReleaser) {
        for mesh in &self.meshes {
            releaser.release_mesh(mesh);
        }

        let mut released = vec![false; self.textures.len()];
        for material in &self.materials {
            for texture_ref in material.texture_refs() {
                if let Some(done) = released.get_mut(texture_ref.texture)
                    && !*done
                {
                    *done = true;
                    releaser.release_texture(&self.textures[texture_ref.texture]);
                }
            }
        }
        log::debug!("Disposed model '{}'", self.name);
    }
}

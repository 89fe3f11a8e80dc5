//! Serde mirror of the glTF 2.0 JSON manifest.
//!
//! Only the members the asset-to-pose pipeline consumes are modelled;
//! everything else is ignored by serde. Arrays default to empty so that
//! a missing top-level member and an empty one look the same to the loader.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub asset: Option<AssetInfo>,
    pub scene: Option<usize>,
    pub scenes: Vec<SceneDef>,
    pub nodes: Vec<NodeDef>,
    pub meshes: Vec<MeshDef>,
    pub skins: Vec<SkinDef>,
    pub animations: Vec<AnimationDef>,
    pub materials: Vec<MaterialDef>,
    pub textures: Vec<TextureDef>,
    pub images: Vec<ImageDef>,
    pub accessors: Vec<AccessorDef>,
    pub buffer_views: Vec<BufferViewDef>,
    pub buffers: Vec<BufferDef>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetInfo {
    pub version: String,
    pub generator: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneDef {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeDef {
    pub name: Option<String>,
    pub children: Vec<usize>,
    pub matrix: Option<[f32; 16]>,
    pub translation: Option<[f32; 3]>,
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeshDef {
    pub name: Option<String>,
    pub primitives: Vec<PrimitiveDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrimitiveDef {
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkinDef {
    pub name: Option<String>,
    pub inverse_bind_matrices: Option<usize>,
    pub joints: Vec<usize>,
    pub skeleton: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationDef {
    pub name: Option<String>,
    pub channels: Vec<ChannelDef>,
    pub samplers: Vec<SamplerDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDef {
    pub sampler: usize,
    pub target: ChannelTargetDef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTargetDef {
    pub node: Option<usize>,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SamplerInterpolation {
    #[default]
    #[serde(rename = "LINEAR")]
    Linear,
    #[serde(rename = "STEP")]
    Step,
    #[serde(rename = "CUBICSPLINE")]
    CubicSpline,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerDef {
    pub input: usize,
    pub output: usize,
    #[serde(default)]
    pub interpolation: SamplerInterpolation,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialDef {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughnessDef>,
    pub normal_texture: Option<NormalTextureInfoDef>,
    pub occlusion_texture: Option<OcclusionTextureInfoDef>,
    pub emissive_texture: Option<TextureInfoDef>,
    pub emissive_factor: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PbrMetallicRoughnessDef {
    pub base_color_factor: Option<[f32; 4]>,
    pub base_color_texture: Option<TextureInfoDef>,
    pub metallic_factor: Option<f32>,
    pub roughness_factor: Option<f32>,
    pub metallic_roughness_texture: Option<TextureInfoDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfoDef {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureInfoDef {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    pub scale: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureInfoDef {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    pub strength: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextureDef {
    pub name: Option<String>,
    pub source: Option<usize>,
    pub sampler: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageDef {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
}

/// Element shape of an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AccessorType {
    #[serde(rename = "SCALAR")]
    Scalar,
    #[serde(rename = "VEC2")]
    Vec2,
    #[serde(rename = "VEC3")]
    Vec3,
    #[serde(rename = "VEC4")]
    Vec4,
    #[serde(rename = "MAT2")]
    Mat2,
    #[serde(rename = "MAT3")]
    Mat3,
    #[serde(rename = "MAT4")]
    Mat4,
}

impl AccessorType {
    /// Number of components per element.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorDef {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: AccessorType,
    /// Sparse substitution block, kept only to reject it
    pub sparse: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferViewDef {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferDef {
    pub uri: Option<String>,
    pub byte_length: usize,
}

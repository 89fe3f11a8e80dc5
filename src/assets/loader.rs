use futures::future::try_join_all;
use uuid::Uuid;

use crate::animation::load_clips;
use crate::assets::accessor::{buffer_view_bytes, read_accessor};
use crate::assets::glb::{Glb, is_glb};
use crate::assets::io::{AssetReaderVariant, resolve_relative};
use crate::assets::model::{
    DecodedImage, Material, Mesh, ParsedModel, Primitive, Texture, TextureRef,
};
use crate::assets::schema::{BufferDef, ImageDef, Manifest, PrimitiveDef, TextureInfoDef};
use crate::assets::scheme::Scheme;
use crate::errors::{Error, Result};
use crate::scene::{build_nodes, parentless_nodes, resolve_skins};

const MODE_TRIANGLES: u32 = 4;

/// Knobs for [`ModelLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Fetch and decode images to RGBA8. When off, textures carry no pixels.
    pub decode_images: bool,
    /// Reject any buffer larger than this many bytes
    pub max_buffer_bytes: Option<usize>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            decode_images: true,
            max_buffer_bytes: None,
        }
    }
}

/// Loads a model from a path or `http(s)://` URL with default options.
pub async fn load_model(uri: &str) -> Result<ParsedModel> {
    let reader = AssetReaderVariant::from_source(uri)?;
    let file = AssetReaderVariant::source_filename(uri);
    ModelLoader::new(reader, LoaderOptions::default())
        .load(file)
        .await
}

/// Loads `uri` through a caller-supplied reader.
pub async fn load_model_with(
    reader: impl Into<AssetReaderVariant>,
    uri: &str,
    options: LoaderOptions,
) -> Result<ParsedModel> {
    ModelLoader::new(reader.into(), options).load(uri).await
}

/// Async glTF 2.0 loader.
///
/// I/O (manifest, buffers, images) happens up front and concurrently;
/// everything after that is a synchronous transform of the fetched bytes.
/// Any failure aborts the whole load.
pub struct ModelLoader {
    reader: AssetReaderVariant,
    options: LoaderOptions,
}

impl ModelLoader {
    #[must_use]
    pub fn new(reader: AssetReaderVariant, options: LoaderOptions) -> Self {
        Self { reader, options }
    }

    /// Entry point.
    pub async fn load(&self, uri: &str) -> Result<ParsedModel> {
        // 1. Manifest (JSON or GLB container)
        let bytes = self.reader.read_bytes(uri).await?;
        let (manifest, bin) = if is_glb(&bytes) {
            let glb = Glb::parse(&bytes)?;
            let manifest: Manifest = serde_json::from_slice(glb.json)?;
            (manifest, glb.bin.map(<[u8]>::to_vec))
        } else {
            (serde_json::from_slice::<Manifest>(&bytes)?, None)
        };
        Self::validate_manifest(&manifest)?;
        let source = self.reader.resolved_uri(uri);

        // 2. Buffers, concurrently
        let buffers = try_join_all(
            manifest
                .buffers
                .iter()
                .enumerate()
                .map(|(i, def)| self.load_buffer(uri, i, def, bin.as_deref())),
        )
        .await?;

        // 3. Images, concurrently (decode on the blocking pool)
        let images: Vec<Option<DecodedImage>> = if self.options.decode_images {
            try_join_all(
                manifest
                    .images
                    .iter()
                    .enumerate()
                    .map(|(i, def)| self.load_image(uri, i, def, &manifest, &buffers)),
            )
            .await?
            .into_iter()
            .map(Some)
            .collect()
        } else {
            vec![None; manifest.images.len()]
        };

        // 4. Everything else is derived from the fetched bytes
        let model = build_model(uri, &source, &manifest, &buffers, &images)?;
        log::info!(
            "Loaded '{}': {} nodes, {} meshes, {} skins, {} clips",
            model.name,
            model.nodes.len(),
            model.meshes.len(),
            model.skins.len(),
            model.animations.len()
        );
        Ok(model)
    }

    fn validate_manifest(manifest: &Manifest) -> Result<()> {
        if let Some(asset) = &manifest.asset
            && !asset.version.is_empty()
            && !asset.version.starts_with('2')
        {
            return Err(Error::malformed(format!(
                "unsupported glTF version {}",
                asset.version
            )));
        }
        if manifest.accessors.is_empty() {
            return Err(Error::malformed("manifest declares no accessors"));
        }
        if !manifest.extensions_required.is_empty() {
            log::warn!(
                "Asset requires unsupported extensions: {:?}",
                manifest.extensions_required
            );
        }
        if !manifest.extensions_used.is_empty() {
            log::warn!(
                "Asset uses extensions {:?}, which are ignored",
                manifest.extensions_used
            );
        }
        Ok(())
    }

    async fn fetch_relative(&self, manifest_uri: &str, uri: &str) -> Result<Vec<u8>> {
        let resolved = resolve_relative(manifest_uri, uri)?;
        self.reader.read_bytes(&resolved).await
    }

    fn check_cap(&self, label: &str, len: usize) -> Result<()> {
        match self.options.max_buffer_bytes {
            Some(cap) if len > cap => Err(Error::malformed(format!(
                "{label} is {len} bytes, limit is {cap}"
            ))),
            _ => Ok(()),
        }
    }

    async fn load_buffer(
        &self,
        manifest_uri: &str,
        index: usize,
        def: &BufferDef,
        bin: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let label = format!("buffer {index}");
        self.check_cap(&label, def.byte_length)?;

        let data = match def.uri.as_deref() {
            None => bin
                .map(<[u8]>::to_vec)
                .ok_or_else(|| Error::malformed(format!("{label} has no URI and no GLB chunk")))?,
            Some(uri) => match Scheme::try_from(uri)? {
                Scheme::Data(_, data) => data,
                Scheme::External(path) => self.fetch_relative(manifest_uri, path).await?,
            },
        };

        if data.len() < def.byte_length {
            return Err(Error::malformed(format!(
                "{label} declares {} bytes but holds {}",
                def.byte_length,
                data.len()
            )));
        }
        self.check_cap(&label, data.len())?;
        log::debug!("Loaded {label}: {} bytes", data.len());
        Ok(data)
    }

    async fn load_image(
        &self,
        manifest_uri: &str,
        index: usize,
        def: &ImageDef,
        manifest: &Manifest,
        buffers: &[Vec<u8>],
    ) -> Result<DecodedImage> {
        let label = def
            .uri
            .as_deref()
            .filter(|uri| !uri.starts_with("data:"))
            .map_or_else(|| format!("image {index}"), str::to_string);

        let bytes = match (def.uri.as_deref(), def.buffer_view) {
            (Some(uri), _) => match Scheme::try_from(uri)? {
                Scheme::Data(_, data) => data,
                Scheme::External(path) => self.fetch_relative(manifest_uri, path).await?,
            },
            (None, Some(view)) => buffer_view_bytes(manifest, buffers, view)?.to_vec(),
            (None, None) => {
                return Err(Error::malformed(format!(
                    "image {index} has neither URI nor buffer view"
                )));
            }
        };

        let rgba = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes).map(|img| img.to_rgba8())
        })
        .await?
        .map_err(|e| Error::fetch(label, e))?;

        Ok(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }
}

fn resource_id(uri: &str, kind: &str, index: usize) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{uri}#{kind}/{index}").as_bytes())
}

fn model_name(uri: &str) -> String {
    uri.rsplit(['/', '\\']).next().unwrap_or(uri).to_string()
}

/// Synchronous half of loading: every piece of the model from bytes.
///
/// `source` is the reader-resolved model URI that resource ids derive from.
fn build_model(
    uri: &str,
    source: &str,
    manifest: &Manifest,
    buffers: &[Vec<u8>],
    images: &[Option<DecodedImage>],
) -> Result<ParsedModel> {
    let nodes = build_nodes(&manifest.nodes)?;
    for node in &nodes {
        if let Some(mesh) = node.mesh.filter(|&m| m >= manifest.meshes.len()) {
            return Err(Error::out_of_bounds(format!("mesh of node {}", node.id), mesh));
        }
        if let Some(skin) = node.skin.filter(|&s| s >= manifest.skins.len()) {
            return Err(Error::out_of_bounds(format!("skin of node {}", node.id), skin));
        }
    }

    let skins = resolve_skins(manifest, buffers)?;
    let animations = load_clips(manifest, buffers)?;
    let textures = load_textures(source, manifest, images)?;
    let materials = load_materials(manifest)?;
    let meshes = load_meshes(source, manifest, buffers)?;

    let root_nodes = match manifest.scene.or((!manifest.scenes.is_empty()).then_some(0)) {
        Some(index) => {
            let scene = manifest
                .scenes
                .get(index)
                .ok_or_else(|| Error::out_of_bounds("default scene", index))?;
            if let Some(&bad) = scene.nodes.iter().find(|&&n| n >= nodes.len()) {
                return Err(Error::out_of_bounds(format!("root of scene {index}"), bad));
            }
            scene.nodes.clone()
        }
        None => parentless_nodes(&nodes),
    };

    Ok(ParsedModel {
        name: model_name(uri),
        root_node: root_nodes.first().copied(),
        root_nodes,
        nodes,
        meshes,
        skins,
        animations,
        materials,
        textures,
    })
}

fn load_textures(
    source: &str,
    manifest: &Manifest,
    images: &[Option<DecodedImage>],
) -> Result<Vec<Texture>> {
    manifest
        .textures
        .iter()
        .enumerate()
        .map(|(index, def)| {
            let image = match def.source {
                Some(source) => images
                    .get(source)
                    .ok_or_else(|| Error::out_of_bounds(format!("source of texture {index}"), source))?
                    .clone(),
                None => None,
            };
            Ok(Texture {
                id: resource_id(source, "texture", index),
                name: def.name.clone().unwrap_or_else(|| format!("Texture_{index}")),
                image,
            })
        })
        .collect()
}

fn texture_ref(manifest: &Manifest, info: Option<&TextureInfoDef>) -> Result<Option<TextureRef>> {
    info.map(|info| {
        if info.index >= manifest.textures.len() {
            return Err(Error::out_of_bounds("material texture", info.index));
        }
        Ok(TextureRef {
            texture: info.index,
            tex_coord: info.tex_coord,
        })
    })
    .transpose()
}

fn load_materials(manifest: &Manifest) -> Result<Vec<Material>> {
    manifest
        .materials
        .iter()
        .enumerate()
        .map(|(index, def)| {
            let defaults = Material::default();
            let pbr = def.pbr_metallic_roughness.clone().unwrap_or_default();
            let normal = def.normal_texture.as_ref();
            let occlusion = def.occlusion_texture.as_ref();

            Ok(Material {
                name: def.name.clone().unwrap_or_else(|| format!("Material_{index}")),
                base_color_factor: pbr
                    .base_color_factor
                    .map_or(defaults.base_color_factor, Into::into),
                base_color_texture: texture_ref(manifest, pbr.base_color_texture.as_ref())?,
                metallic_factor: pbr.metallic_factor.unwrap_or(defaults.metallic_factor),
                roughness_factor: pbr.roughness_factor.unwrap_or(defaults.roughness_factor),
                metallic_roughness_texture: texture_ref(
                    manifest,
                    pbr.metallic_roughness_texture.as_ref(),
                )?,
                emissive_factor: def.emissive_factor.map_or(defaults.emissive_factor, Into::into),
                emissive_texture: texture_ref(manifest, def.emissive_texture.as_ref())?,
                normal_texture: texture_ref(
                    manifest,
                    normal
                        .map(|n| TextureInfoDef {
                            index: n.index,
                            tex_coord: n.tex_coord,
                        })
                        .as_ref(),
                )?,
                normal_scale: normal.and_then(|n| n.scale).unwrap_or(defaults.normal_scale),
                occlusion_texture: texture_ref(
                    manifest,
                    occlusion
                        .map(|o| TextureInfoDef {
                            index: o.index,
                            tex_coord: o.tex_coord,
                        })
                        .as_ref(),
                )?,
                occlusion_strength: occlusion
                    .and_then(|o| o.strength)
                    .unwrap_or(defaults.occlusion_strength),
            })
        })
        .collect()
}

fn optional_attribute<const N: usize>(
    manifest: &Manifest,
    buffers: &[Vec<u8>],
    def: &PrimitiveDef,
    name: &str,
) -> Result<Option<Vec<[f32; N]>>> {
    def.attributes
        .get(name)
        .map(|&index| read_accessor(manifest, buffers, index)?.to_f32_chunks::<N>())
        .transpose()
}

fn load_primitive(
    manifest: &Manifest,
    buffers: &[Vec<u8>],
    mesh_index: usize,
    def: &PrimitiveDef,
) -> Result<Primitive> {
    let position = def.attributes.get("POSITION").ok_or_else(|| {
        Error::malformed(format!("primitive of mesh {mesh_index} has no POSITION"))
    })?;
    let positions = read_accessor(manifest, buffers, *position)?.to_f32_chunks::<3>()?;

    let joints = match def.attributes.get("JOINTS_0") {
        Some(&index) => {
            let view = read_accessor(manifest, buffers, index)?;
            if view.arity != 4 {
                return Err(Error::malformed(format!(
                    "JOINTS_0 of mesh {mesh_index} must be VEC4"
                )));
            }
            Some(
                view.to_u32()?
                    .chunks_exact(4)
                    .map(|c| [c[0], c[1], c[2], c[3]])
                    .collect(),
            )
        }
        None => None,
    };

    let indices = def
        .indices
        .map(|index| read_accessor(manifest, buffers, index)?.to_u32())
        .transpose()?;

    if let Some(material) = def.material.filter(|&m| m >= manifest.materials.len()) {
        return Err(Error::out_of_bounds(
            format!("material of mesh {mesh_index}"),
            material,
        ));
    }
    if let Some(mode) = def.mode.filter(|&m| m != MODE_TRIANGLES) {
        log::warn!("Mesh {mesh_index}: primitive mode {mode} is not triangles");
    }

    let element_count = indices.as_ref().map_or(positions.len(), Vec::len);
    Ok(Primitive {
        normals: optional_attribute::<3>(manifest, buffers, def, "NORMAL")?,
        tangents: optional_attribute::<4>(manifest, buffers, def, "TANGENT")?,
        tex_coords: optional_attribute::<2>(manifest, buffers, def, "TEXCOORD_0")?,
        weights: optional_attribute::<4>(manifest, buffers, def, "WEIGHTS_0")?,
        positions,
        joints,
        indices,
        element_count,
        material: def.material,
    })
}

fn load_meshes(source: &str, manifest: &Manifest, buffers: &[Vec<u8>]) -> Result<Vec<Mesh>> {
    manifest
        .meshes
        .iter()
        .enumerate()
        .map(|(index, def)| {
            let primitives = def
                .primitives
                .iter()
                .map(|p| load_primitive(manifest, buffers, index, p))
                .collect::<Result<Vec<_>>>()?;
            Ok(Mesh {
                id: resource_id(source, "mesh", index),
                name: def.name.clone().unwrap_or_else(|| format!("Mesh_{index}")),
                primitives,
            })
        })
        .collect()
}

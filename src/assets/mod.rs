//! Asset loading
//!
//! - `io`: async byte readers (file, HTTP, memory)
//! - `schema`: serde mirror of the glTF manifest
//! - `accessor`: typed views over binary buffers
//! - `loader`: manifest + buffers + images into a [`ParsedModel`]

pub mod accessor;
pub mod glb;
pub mod io;
pub mod loader;
pub mod model;
pub mod schema;
mod scheme;

#[cfg(feature = "http")]
pub use io::HttpAssetReader;
pub use io::{AssetReader, AssetReaderVariant, FileAssetReader, MemoryAssetReader};
pub use loader::{LoaderOptions, ModelLoader, load_model, load_model_with};
pub use model::{
    DecodedImage, Material, Mesh, ParsedModel, Primitive, ResourceReleaser, Texture, TextureRef,
};

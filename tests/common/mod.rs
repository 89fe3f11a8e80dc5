//! Shared fixtures: a tiny three-joint rig built in memory.
//!
//! Node layout (all translations along +Y):
//!
//! ```text
//! 0 "hips" (0,0,0) ─ 1 "spine" (0,1,0) ─ 2 "head" (0,1,0)
//! ```
//!
//! Skin 0 binds all three with inverse bind matrices equal to the inverse
//! bind-pose world matrices, so the bind pose yields identity joints.
//!
//! Clips:
//! - `walk`: hips translation `0s → (0,0,0)`, `1s → (1,0,0)`
//! - `idle`: hips translation fixed at `(0,2,0)` over 1s; spine rotation
//!   from identity to 90° about Z over 2s

#![allow(dead_code)]

use std::f32::consts::FRAC_1_SQRT_2;

use serde_json::{Value, json};
use skinpose::assets::{LoaderOptions, MemoryAssetReader, ParsedModel, load_model_with};

pub const MANIFEST: &str = "rig.gltf";
pub const BIN: &str = "rig.bin";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Packs typed arrays into one binary buffer and records accessors.
#[derive(Default)]
pub struct BufferBuilder {
    pub bin: Vec<u8>,
    pub accessors: Vec<Value>,
    pub views: Vec<Value>,
}

impl BufferBuilder {
    fn push_bytes(&mut self, bytes: &[u8], component_type: u32, count: usize, ty: &str) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
        }));
        self.accessors.push(json!({
            "bufferView": self.views.len() - 1,
            "componentType": component_type,
            "count": count,
            "type": ty,
        }));
        self.accessors.len() - 1
    }

    pub fn f32s(&mut self, values: &[f32], ty: &str) -> usize {
        let count = values.len() / arity(ty);
        self.push_bytes(bytemuck::cast_slice(values), 5126, count, ty)
    }

    pub fn u16s(&mut self, values: &[u16], ty: &str) -> usize {
        let count = values.len() / arity(ty);
        self.push_bytes(bytemuck::cast_slice(values), 5123, count, ty)
    }

    pub fn u8s(&mut self, values: &[u8], ty: &str) -> usize {
        let count = values.len() / arity(ty);
        self.push_bytes(values, 5121, count, ty)
    }

    /// Completes `doc` with accessor, view and buffer tables.
    pub fn finish(self, mut doc: Value) -> (Value, Vec<u8>) {
        doc["accessors"] = Value::Array(self.accessors);
        doc["bufferViews"] = Value::Array(self.views);
        doc["buffers"] = json!([{ "uri": BIN, "byteLength": self.bin.len() }]);
        (doc, self.bin)
    }
}

pub fn arity(ty: &str) -> usize {
    match ty {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" | "MAT2" => 4,
        "MAT3" => 9,
        "MAT4" => 16,
        other => panic!("unknown accessor type {other}"),
    }
}

#[rustfmt::skip]
pub fn translation_matrix(x: f32, y: f32, z: f32) -> [f32; 16] {
    [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        x,   y,   z,   1.0,
    ]
}

/// Raw manifest + buffer of the three-joint rig.
pub fn rig() -> (Value, Vec<u8>) {
    let mut b = BufferBuilder::default();

    let mut ibm = Vec::new();
    ibm.extend(translation_matrix(0.0, 0.0, 0.0));
    ibm.extend(translation_matrix(0.0, -1.0, 0.0));
    ibm.extend(translation_matrix(0.0, -2.0, 0.0));
    let ibm = b.f32s(&ibm, "MAT4");

    let walk_times = b.f32s(&[0.0, 1.0], "SCALAR");
    let walk_values = b.f32s(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0], "VEC3");

    let idle_t_times = b.f32s(&[0.0, 1.0], "SCALAR");
    let idle_t_values = b.f32s(&[0.0, 2.0, 0.0, 0.0, 2.0, 0.0], "VEC3");
    let idle_r_times = b.f32s(&[0.0, 2.0], "SCALAR");
    let idle_r_values = b.f32s(
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2],
        "VEC4",
    );

    let positions = b.f32s(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], "VEC3");
    let joints = b.u8s(&[0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0], "VEC4");
    let weights = b.f32s(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], "VEC4");
    let indices = b.u16s(&[0, 1, 2], "SCALAR");

    let doc = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 3] }],
        "nodes": [
            { "name": "hips", "children": [1] },
            { "name": "spine", "translation": [0.0, 1.0, 0.0], "children": [2] },
            { "name": "head", "translation": [0.0, 1.0, 0.0] },
            { "name": "body", "mesh": 0, "skin": 0 },
        ],
        "meshes": [{
            "name": "body",
            "primitives": [{
                "attributes": {
                    "POSITION": positions,
                    "JOINTS_0": joints,
                    "WEIGHTS_0": weights,
                },
                "indices": indices,
                "material": 0,
            }],
        }],
        "materials": [{ "name": "skin" }],
        "skins": [{ "joints": [0, 1, 2], "inverseBindMatrices": ibm, "skeleton": 0 }],
        "animations": [
            {
                "name": "walk",
                "samplers": [{ "input": walk_times, "output": walk_values }],
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
            },
            {
                "name": "idle",
                "samplers": [
                    { "input": idle_t_times, "output": idle_t_values },
                    { "input": idle_r_times, "output": idle_r_values, "interpolation": "LINEAR" },
                ],
                "channels": [
                    { "sampler": 0, "target": { "node": 0, "path": "translation" } },
                    { "sampler": 1, "target": { "node": 1, "path": "rotation" } },
                ],
            },
        ],
    });

    b.finish(doc)
}

pub fn reader_for(doc: &Value, bin: Vec<u8>) -> MemoryAssetReader {
    MemoryAssetReader::new()
        .with_file(MANIFEST, serde_json::to_vec(doc).unwrap())
        .with_file(BIN, bin)
}

pub async fn load(doc: &Value, bin: Vec<u8>) -> skinpose::Result<ParsedModel> {
    load_model_with(reader_for(doc, bin), MANIFEST, LoaderOptions::default()).await
}

pub async fn load_rig() -> ParsedModel {
    init_logger();
    let (doc, bin) = rig();
    load(&doc, bin).await.expect("rig fixture loads")
}

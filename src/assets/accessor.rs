//! Accessor Reader
//!
//! Reinterprets a byte range of a binary buffer as typed numeric elements.
//! [`read_elements`] is the pure core: it only sees a byte slice and an
//! [`AccessorLayout`]. [`read_accessor`] resolves the manifest indirection
//! (accessor → buffer view → buffer) before delegating to it.

use bytemuck::Pod;

use crate::assets::schema::Manifest;
use crate::errors::{Error, Result};

/// Component storage type, keyed by the GL enum used in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_gl(code: u32) -> Result<Self> {
        Ok(match code {
            5120 => Self::I8,
            5121 => Self::U8,
            5122 => Self::I16,
            5123 => Self::U16,
            5125 => Self::U32,
            5126 => Self::F32,
            other => {
                return Err(Error::malformed(format!(
                    "unsupported accessor component type {other}"
                )));
            }
        })
    }

    /// Size of one component in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

/// Everything needed to slice elements out of a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorLayout {
    /// Offset of the first element, relative to the start of the slice
    pub byte_offset: usize,
    /// Distance between consecutive elements; `None` means tightly packed
    pub byte_stride: Option<usize>,
    pub count: usize,
    pub component_type: ComponentType,
    /// Components per element (1, 2, 3, 4, 9 or 16)
    pub arity: usize,
    pub normalized: bool,
}

impl AccessorLayout {
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.arity
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.byte_stride.unwrap_or_else(|| self.element_size())
    }
}

/// Decoded components, flattened element after element.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl AccessorData {
    /// Number of components (not elements).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A typed view over an accessor plus its arity.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorView {
    pub data: AccessorData,
    pub arity: usize,
    pub count: usize,
    pub normalized: bool,
}

impl AccessorView {
    /// Converts every component to `f32`.
    ///
    /// Normalized integer accessors are mapped to `[0, 1]` (unsigned) or
    /// `[-1, 1]` (signed) as the glTF 2.0 specification prescribes.
    #[must_use]
    pub fn to_f32(&self) -> Vec<f32> {
        let norm = self.normalized;
        match &self.data {
            AccessorData::F32(v) => v.clone(),
            AccessorData::I8(v) => v
                .iter()
                .map(|&x| if norm { (f32::from(x) / 127.0).max(-1.0) } else { f32::from(x) })
                .collect(),
            AccessorData::U8(v) => v
                .iter()
                .map(|&x| if norm { f32::from(x) / 255.0 } else { f32::from(x) })
                .collect(),
            AccessorData::I16(v) => v
                .iter()
                .map(|&x| if norm { (f32::from(x) / 32767.0).max(-1.0) } else { f32::from(x) })
                .collect(),
            AccessorData::U16(v) => v
                .iter()
                .map(|&x| if norm { f32::from(x) / 65535.0 } else { f32::from(x) })
                .collect(),
            AccessorData::U32(v) => v.iter().map(|&x| x as f32).collect(),
        }
    }

    /// Converts integer components to `u32` (indices, joint ids).
    pub fn to_u32(&self) -> Result<Vec<u32>> {
        match &self.data {
            AccessorData::U8(v) => Ok(v.iter().map(|&x| u32::from(x)).collect()),
            AccessorData::U16(v) => Ok(v.iter().map(|&x| u32::from(x)).collect()),
            AccessorData::U32(v) => Ok(v.clone()),
            AccessorData::I16(v) => v
                .iter()
                .map(|&x| {
                    u32::try_from(x)
                        .map_err(|_| Error::malformed(format!("negative index value {x}")))
                })
                .collect(),
            AccessorData::I8(_) | AccessorData::F32(_) => Err(Error::malformed(
                "index data must use an unsigned integer component type",
            )),
        }
    }

    /// Groups components into fixed-size elements.
    pub fn to_f32_chunks<const N: usize>(&self) -> Result<Vec<[f32; N]>> {
        if self.arity != N {
            return Err(Error::malformed(format!(
                "expected accessor arity {N}, found {}",
                self.arity
            )));
        }
        Ok(self
            .to_f32()
            .chunks_exact(N)
            .map(|c| {
                let mut out = [0.0; N];
                out.copy_from_slice(c);
                out
            })
            .collect())
    }
}

fn collect_components<T: Pod>(bytes: &[u8], layout: &AccessorLayout) -> Vec<T> {
    let size = std::mem::size_of::<T>();
    let stride = layout.stride();
    let mut out = Vec::with_capacity(layout.count * layout.arity);
    for element in 0..layout.count {
        let base = layout.byte_offset + element * stride;
        for component in 0..layout.arity {
            let start = base + component * size;
            out.push(bytemuck::pod_read_unaligned::<T>(&bytes[start..start + size]));
        }
    }
    out
}

/// Reads `layout.count` elements out of `bytes`.
///
/// Fails with [`Error::MalformedAsset`] when the stride is smaller than an
/// element or the last element would end past the slice.
pub fn read_elements(bytes: &[u8], layout: &AccessorLayout) -> Result<AccessorView> {
    let element_size = layout.element_size();
    let stride = layout.stride();
    if stride < element_size {
        return Err(Error::malformed(format!(
            "byte stride {stride} is smaller than element size {element_size}"
        )));
    }

    if layout.count > 0 {
        let end = (layout.count - 1)
            .checked_mul(stride)
            .and_then(|v| v.checked_add(layout.byte_offset))
            .and_then(|v| v.checked_add(element_size))
            .ok_or_else(|| Error::malformed("accessor extent overflows"))?;
        if end > bytes.len() {
            return Err(Error::malformed(format!(
                "accessor needs {end} bytes but only {} are available",
                bytes.len()
            )));
        }
    }

    let data = match layout.component_type {
        ComponentType::I8 => AccessorData::I8(collect_components(bytes, layout)),
        ComponentType::U8 => AccessorData::U8(collect_components(bytes, layout)),
        ComponentType::I16 => AccessorData::I16(collect_components(bytes, layout)),
        ComponentType::U16 => AccessorData::U16(collect_components(bytes, layout)),
        ComponentType::U32 => AccessorData::U32(collect_components(bytes, layout)),
        ComponentType::F32 => AccessorData::F32(collect_components(bytes, layout)),
    };

    Ok(AccessorView {
        data,
        arity: layout.arity,
        count: layout.count,
        normalized: layout.normalized,
    })
}

/// Bytes covered by buffer view `view_index`.
pub fn buffer_view_bytes<'a>(
    manifest: &Manifest,
    buffers: &'a [Vec<u8>],
    view_index: usize,
) -> Result<&'a [u8]> {
    let view = manifest
        .buffer_views
        .get(view_index)
        .ok_or_else(|| Error::out_of_bounds("buffer view", view_index))?;
    let buffer = buffers
        .get(view.buffer)
        .ok_or_else(|| Error::out_of_bounds("buffer", view.buffer))?;

    view.byte_offset
        .checked_add(view.byte_length)
        .and_then(|end| buffer.get(view.byte_offset..end))
        .ok_or_else(|| {
            Error::malformed(format!(
                "buffer view {view_index} exceeds buffer {} ({} bytes)",
                view.buffer,
                buffer.len()
            ))
        })
}

/// Resolves accessor `index` of `manifest` against the loaded `buffers`.
///
/// An accessor without a buffer view reads as all zeros. Sparse accessors
/// are rejected.
pub fn read_accessor(manifest: &Manifest, buffers: &[Vec<u8>], index: usize) -> Result<AccessorView> {
    let accessor = manifest
        .accessors
        .get(index)
        .ok_or_else(|| Error::out_of_bounds("accessor", index))?;
    if accessor.sparse.is_some() {
        return Err(Error::malformed(format!(
            "accessor {index} is sparse, which is not supported"
        )));
    }

    let mut layout = AccessorLayout {
        byte_offset: accessor.byte_offset,
        byte_stride: None,
        count: accessor.count,
        component_type: ComponentType::from_gl(accessor.component_type)?,
        arity: accessor.accessor_type.arity(),
        normalized: accessor.normalized,
    };

    match accessor.buffer_view {
        Some(view_index) => {
            let bytes = buffer_view_bytes(manifest, buffers, view_index)?;
            layout.byte_stride = manifest.buffer_views[view_index].byte_stride;
            read_elements(bytes, &layout)
        }
        None => {
            let len = layout
                .count
                .checked_mul(layout.element_size())
                .ok_or_else(|| Error::malformed("accessor extent overflows"))?;
            layout.byte_offset = 0;
            read_elements(&vec![0u8; len], &layout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn strided_vec3_skips_padding() {
        // Two VEC3 elements interleaved with one float of padding each.
        let bytes = f32_bytes(&[1.0, 2.0, 3.0, 99.0, 4.0, 5.0, 6.0, 99.0]);
        let layout = AccessorLayout {
            byte_offset: 0,
            byte_stride: Some(16),
            count: 2,
            component_type: ComponentType::F32,
            arity: 3,
            normalized: false,
        };
        let view = read_elements(&bytes, &layout).unwrap();
        assert_eq!(view.data, AccessorData::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn count_past_end_is_malformed() {
        let bytes = f32_bytes(&[1.0, 2.0, 3.0]);
        let layout = AccessorLayout {
            byte_offset: 0,
            byte_stride: None,
            count: 2,
            component_type: ComponentType::F32,
            arity: 3,
            normalized: false,
        };
        let err = read_elements(&bytes, &layout).unwrap_err();
        assert!(matches!(err, Error::MalformedAsset(_)));
    }

    #[test]
    fn normalized_u8_maps_to_unit_range() {
        let layout = AccessorLayout {
            byte_offset: 0,
            byte_stride: None,
            count: 1,
            component_type: ComponentType::U8,
            arity: 2,
            normalized: true,
        };
        let view = read_elements(&[0, 255], &layout).unwrap();
        assert_eq!(view.to_f32(), vec![0.0, 1.0]);
    }
}

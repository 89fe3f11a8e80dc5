//! Binary glTF container.
//!
//! Layout: a 12-byte header (`magic`, `version`, `length`) followed by a
//! JSON chunk and an optional BIN chunk, each prefixed with
//! `chunk_length` and `chunk_type`. All integers are little-endian.

use crate::errors::{Error, Result};

const MAGIC: u32 = 0x4654_6C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Borrowed chunks of a `.glb` file.
#[derive(Debug)]
pub struct Glb<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::malformed("truncated GLB container"))
}

#[must_use]
pub fn is_glb(bytes: &[u8]) -> bool {
    read_u32(bytes, 0).is_ok_and(|magic| magic == MAGIC)
}

impl<'a> Glb<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if !is_glb(bytes) {
            return Err(Error::malformed("missing GLB magic"));
        }
        let version = read_u32(bytes, 4)?;
        if version != 2 {
            return Err(Error::malformed(format!("unsupported GLB version {version}")));
        }
        let length = read_u32(bytes, 8)? as usize;
        if length > bytes.len() {
            return Err(Error::malformed(format!(
                "GLB header claims {length} bytes, file has {}",
                bytes.len()
            )));
        }
        let bytes = &bytes[..length];

        let mut json = None;
        let mut bin = None;
        let mut cursor = HEADER_LEN;
        while cursor + CHUNK_HEADER_LEN <= bytes.len() {
            let chunk_len = read_u32(bytes, cursor)? as usize;
            let chunk_type = read_u32(bytes, cursor + 4)?;
            let start = cursor + CHUNK_HEADER_LEN;
            let data = start
                .checked_add(chunk_len)
                .and_then(|end| bytes.get(start..end))
                .ok_or_else(|| Error::malformed("GLB chunk exceeds container"))?;

            match chunk_type {
                CHUNK_JSON if json.is_none() => json = Some(data),
                CHUNK_BIN if bin.is_none() => bin = Some(data),
                other => log::debug!("Skipping GLB chunk type {other:#010x}"),
            }
            cursor = start + chunk_len;
        }

        let json = json.ok_or_else(|| Error::malformed("GLB has no JSON chunk"))?;
        Ok(Self { json, bin })
    }
}

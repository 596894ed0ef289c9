//! The schema files compiled into the binary.
//!
//! `build.rs` serializes `schemas/` as a JSON object of file name to base64
//! content, raw-deflates it and base64-encodes the result. Decoding reverses
//! those stages and never touches the filesystem.

use std::collections::BTreeMap;
use std::io::Read;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::read::DeflateDecoder;
use tracing::debug;

use crate::error::{DecodeError, DecodeResult};

/// Embedded payload produced by `build.rs`.
pub const SCHEMA_DATA: &str = include_str!(concat!(env!("OUT_DIR"), "/schema_data.b64"));

/// File name to raw file bytes.
pub type FileMapping = BTreeMap<String, Vec<u8>>;

/// Source of the schema files a session materializes.
pub trait AssetSource: Send + Sync {
    fn files(&self) -> DecodeResult<FileMapping>;
}

/// The payload embedded at build time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl AssetSource for EmbeddedAssets {
    fn files(&self) -> DecodeResult<FileMapping> {
        decode(SCHEMA_DATA)
    }
}

/// Decode a payload into its file mapping.
pub fn decode(payload: &str) -> DecodeResult<FileMapping> {
    let compressed = STANDARD.decode(payload.trim())?;

    let mut json = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(DecodeError::Inflate)?;

    let encoded: BTreeMap<String, String> = serde_json::from_slice(&json)?;
    let files = encoded
        .into_iter()
        .map(|(name, content)| match STANDARD.decode(content.as_bytes()) {
            Ok(bytes) => Ok((name, bytes)),
            Err(source) => Err(DecodeError::Entry { name, source }),
        })
        .collect::<DecodeResult<FileMapping>>()?;

    debug!(files = files.len(), "decoded schema payload");
    Ok(files)
}

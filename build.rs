//! Packs `schemas/` into the payload embedded by `src/assets.rs`.
//!
//! Layout: base64(raw deflate(JSON object of file name -> base64 file bytes)).

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::DeflateEncoder;

fn main() -> Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let schema_dir = manifest_dir.join("schemas");
    println!("cargo:rerun-if-changed={}", schema_dir.display());

    let mut files = BTreeMap::new();
    for entry in fs::read_dir(&schema_dir)
        .with_context(|| format!("reading {}", schema_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        println!("cargo:rerun-if-changed={}", path.display());

        let name = entry
            .file_name()
            .into_string()
            .map_err(|raw| anyhow::anyhow!("non UTF-8 schema file name: {raw:?}"))?;
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        files.insert(name, STANDARD.encode(bytes));
    }
    anyhow::ensure!(!files.is_empty(), "no files in {}", schema_dir.display());

    let json = serde_json::to_vec(&files)?;
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    let out = PathBuf::from(env::var("OUT_DIR")?).join("schema_data.b64");
    fs::write(&out, STANDARD.encode(compressed))
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

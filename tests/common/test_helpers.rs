use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use saml_xsd::{SchemaSession, SessionConfig};
use tempfile::TempDir;

use super::mocks::{CountingAssets, CountingEngine};

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.fixtures_dir.join(name))
            .unwrap_or_else(|e| panic!("missing fixture {name}: {e}"))
    }

    pub fn metadata(&self) -> Vec<u8> {
        self.read("metadata.xml")
    }

    pub fn authn_request(&self) -> Vec<u8> {
        self.read("authn_request.xml")
    }

    pub fn xhtml(&self) -> Vec<u8> {
        self.read("xhtml.xml")
    }
}

/// The `schemas/` directory the payload is built from.
pub fn schema_source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schemas")
}

/// Number of `.xsd` files bundled into the payload.
pub fn bundled_xsd_count() -> usize {
    fs::read_dir(schema_source_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "xsd"))
        .count()
}

/// Remove every self-closing `<tag .../>` element from a document.
pub fn strip_empty_elements(xml: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        let end = rest[start..]
            .find("/>")
            .unwrap_or_else(|| panic!("{tag} is not self-closing"));
        rest = &rest[start + end + 2..];
    }
    out.push_str(rest);
    out
}

pub fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

/// Serializes tests that read or write `XML_CATALOG_FILES`.
pub fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A session with counting doubles and a private temp root.
pub struct InstrumentedSession {
    pub session: Arc<SchemaSession>,
    pub assets: CountingAssets,
    pub engine: CountingEngine,
    pub temp_root: TempDir,
}

impl InstrumentedSession {
    pub fn new() -> Self {
        Self::with_assets(CountingAssets::new())
    }

    pub fn with_assets(assets: CountingAssets) -> Self {
        let temp_root = TempDir::new().unwrap();
        let engine = CountingEngine::new();
        let session = SchemaSession::with_parts(
            SessionConfig::default().with_temp_root(temp_root.path()),
            Box::new(assets.clone()),
            Arc::new(engine.clone()),
        );

        Self {
            session: Arc::new(session),
            assets,
            engine,
            temp_root,
        }
    }
}

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use saml_xsd::catalog::CATALOG_ENV;
use saml_xsd::error::{DecodeResult, LibXml2Result};
use saml_xsd::libxml2::XmlDocPtr;
use saml_xsd::{
    AssetSource, EmbeddedAssets, FileMapping, LibXml2Wrapper, SchemaEngine, ValidationResult,
    XmlSchemaPtr,
};

/// Asset source that counts how often the payload is decoded.
///
/// Serves the embedded payload plus any extra files added with [`with_file`].
///
/// [`with_file`]: CountingAssets::with_file
#[derive(Clone, Default)]
pub struct CountingAssets {
    extra: Vec<(String, Vec<u8>)>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl CountingAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, content: &[u8]) -> Self {
        self.extra.push((name.to_string(), content.to_vec()));
        self
    }

    /// Sleep for `delay` on every decode, keeping a load in flight longer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssetSource for CountingAssets {
    fn files(&self) -> DecodeResult<FileMapping> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let mut files = EmbeddedAssets.files()?;
        files.extend(self.extra.iter().cloned());
        Ok(files)
    }
}

/// A schema parse observed by [`CountingEngine`].
#[derive(Clone, Debug)]
pub struct ParseRecord {
    pub path: PathBuf,
    pub catalog_env: Option<OsString>,
}

/// libxml2 engine that logs schema parses and catalog reloads.
#[derive(Clone)]
pub struct CountingEngine {
    inner: Arc<LibXml2Wrapper>,
    parse_log: Arc<Mutex<Vec<ParseRecord>>>,
    reloads: Arc<AtomicUsize>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LibXml2Wrapper::new()),
            parse_log: Arc::new(Mutex::new(Vec::new())),
            reloads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn parse_log(&self) -> Vec<ParseRecord> {
        self.parse_log.lock().unwrap().clone()
    }

    pub fn parse_count(&self) -> usize {
        self.parse_log.lock().unwrap().len()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl Default for CountingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaEngine for CountingEngine {
    fn parse_schema_file(&self, path: &Path) -> LibXml2Result<XmlSchemaPtr> {
        self.parse_log.lock().unwrap().push(ParseRecord {
            path: path.to_path_buf(),
            catalog_env: std::env::var_os(CATALOG_ENV),
        });
        self.inner.parse_schema_file(path)
    }

    fn parse_document(&self, xml: &[u8]) -> LibXml2Result<XmlDocPtr> {
        self.inner.parse_document(xml)
    }

    fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        doc: &XmlDocPtr,
    ) -> LibXml2Result<ValidationResult> {
        self.inner.validate_document(schema, doc)
    }

    fn reload_catalogs(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.inner.reload_catalogs();
    }
}

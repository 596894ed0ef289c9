//! Lazily loaded, process-lifetime cache of the bundled schemas.
//!
//! The first call to [`SchemaSession::schemas`] decodes the embedded files,
//! writes them to a scratch directory, points `XML_CATALOG_FILES` at the
//! bundled catalog, parses every `.xsd` file, then restores the environment
//! and removes the directory. Later calls return the cached set.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, OnceLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::assets::{AssetSource, EmbeddedAssets};
use crate::catalog::{CatalogLock, CatalogOverride};
use crate::config::SessionConfig;
use crate::error::{Result, ValidationError};
use crate::libxml2::{LibXml2Wrapper, SchemaEngine, XmlSchemaPtr};
use crate::materialize::{MaterializedDir, Materializer};
use crate::schema::{CATALOG_FILE, SCHEMA_EXTENSION, Schema};

/// Parsed schemas keyed by bundled file name.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: HashMap<String, XmlSchemaPtr>,
}

impl SchemaSet {
    pub fn get(&self, file_name: &str) -> Option<&XmlSchemaPtr> {
        self.schemas.get(file_name)
    }

    /// The handle for `schema`, or `SchemaNotFound` if it was not loaded.
    pub fn schema(&self, schema: Schema) -> Result<&XmlSchemaPtr> {
        self.get(schema.file_name())
            .ok_or_else(|| ValidationError::SchemaNotFound {
                name: schema.file_name().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Loaded file names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Owns the schema cache and everything needed to build it.
pub struct SchemaSession {
    assets: Box<dyn AssetSource>,
    engine: Arc<dyn SchemaEngine>,
    config: SessionConfig,
    materializer: Materializer,
    ready: OnceLock<Arc<SchemaSet>>,
    /// Completed load attempts; bumped while holding the catalog lock.
    attempts: AtomicU64,
    /// Message of the most recent failed attempt.
    last_failure: Mutex<Option<String>>,
}

static GLOBAL_SESSION: LazyLock<Arc<SchemaSession>> = LazyLock::new(|| {
    let config = SessionConfig::from_env().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring invalid schema session environment");
        SessionConfig::default()
    });
    Arc::new(SchemaSession::new(config))
});

impl SchemaSession {
    /// A session over the embedded schemas and libxml2.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_parts(
            config,
            Box::new(EmbeddedAssets),
            Arc::new(LibXml2Wrapper::new()),
        )
    }

    pub fn with_parts(
        config: SessionConfig,
        assets: Box<dyn AssetSource>,
        engine: Arc<dyn SchemaEngine>,
    ) -> Self {
        Self {
            assets,
            engine,
            materializer: Materializer::new(&config),
            config,
            ready: OnceLock::new(),
            attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        }
    }

    /// The session shared by [`crate::validate`] and [`crate::Validator::global`].
    pub fn global() -> &'static Arc<SchemaSession> {
        &GLOBAL_SESSION
    }

    pub fn engine(&self) -> &dyn SchemaEngine {
        self.engine.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    /// The loaded schema set, loading it on first use.
    ///
    /// Concurrent first callers block until one of them finishes loading and
    /// all observe its outcome. The caller that ran a failed load gets the
    /// original error; callers that were waiting on it get
    /// [`ValidationError::InitializationFailed`] with the same message. A call
    /// made after the failure tries again.
    pub fn schemas(&self) -> Result<Arc<SchemaSet>> {
        if let Some(set) = self.ready.get() {
            return Ok(Arc::clone(set));
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let lock = CatalogLock::acquire();
        if let Some(set) = self.ready.get() {
            return Ok(Arc::clone(set));
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(details) = self.last_failure() {
                return Err(ValidationError::InitializationFailed { details });
            }
        }

        let outcome = self.load(&lock);
        self.record_attempt(outcome.as_ref().err());
        let set = Arc::new(outcome?);
        Ok(Arc::clone(self.ready.get_or_init(|| set)))
    }

    fn last_failure(&self) -> Option<String> {
        self.last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Must be called with the catalog lock held.
    fn record_attempt(&self, failure: Option<&ValidationError>) {
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = failure.map(ToString::to_string);
        self.attempts.fetch_add(1, Ordering::Release);
    }

    fn load(&self, lock: &CatalogLock) -> Result<SchemaSet> {
        let started = Instant::now();

        self.config.validate()?;
        let files = self.assets.files()?;
        let dir = self.materializer.materialize(&files)?;

        let parsed = CatalogOverride::install(lock, &dir.join(CATALOG_FILE), self.engine())
            .map_err(ValidationError::from)
            .and_then(|_catalog| self.parse_all(&dir));
        dir.cleanup();

        let set = parsed?;
        info!(
            schemas = set.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "schema session ready"
        );
        Ok(set)
    }

    /// Parse every schema file in `dir` in name order; stop at the first failure.
    fn parse_all(&self, dir: &MaterializedDir) -> Result<SchemaSet> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.path())? {
            let path = entry?.path();
            if is_schema_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut schemas = HashMap::with_capacity(paths.len());
        for path in paths {
            let file = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let schema = self
                .engine
                .parse_schema_file(&path)
                .map_err(|err| ValidationError::SchemaLoad {
                    file: file.clone(),
                    details: err.to_string(),
                })?;
            debug!(file = %file, "loaded schema");
            schemas.insert(file, schema);
        }

        Ok(SchemaSet { schemas })
    }
}

fn is_schema_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == SCHEMA_EXTENSION)
}

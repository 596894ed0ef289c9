//! Process-wide XML catalog redirection.
//!
//! libxml2 resolves schema imports through the catalogs listed in
//! `XML_CATALOG_FILES`, which is global process state. Every mutation of that
//! variable, and every schema parse that depends on it, happens while holding
//! the [`CatalogLock`].

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;
use url::Url;

use crate::libxml2::SchemaEngine;

/// Environment variable libxml2 reads its catalog list from.
pub const CATALOG_ENV: &str = "XML_CATALOG_FILES";

static CATALOG_MUTEX: Mutex<()> = Mutex::new(());

/// Exclusive access to the catalog environment and to schema parsing.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct CatalogLock {
    _guard: MutexGuard<'static, ()>,
}

impl CatalogLock {
    /// Block until the lock is free.
    ///
    /// A panic while the lock was held leaves no state behind that the next
    /// holder depends on (overrides restore in `Drop`), so poisoning is ignored.
    pub fn acquire() -> Self {
        let guard = CATALOG_MUTEX
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        CatalogLock { _guard: guard }
    }
}

/// Points `XML_CATALOG_FILES` at a catalog until dropped.
///
/// Dropping restores the previous value, or removes the variable if it was
/// unset, and makes the engine forget the catalogs it loaded meanwhile.
pub struct CatalogOverride<'a> {
    previous: Option<OsString>,
    catalog: PathBuf,
    engine: &'a dyn SchemaEngine,
    _lock: &'a CatalogLock,
}

/// The `file://` URI libxml2 should load `catalog` from.
///
/// `XML_CATALOG_FILES` is split on whitespace, so the path is percent-encoded
/// rather than passed through as-is.
pub fn catalog_uri(catalog: &Path) -> io::Result<String> {
    let absolute = std::path::absolute(catalog)?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot express {} as a file URI", absolute.display()),
            )
        })
}

impl<'a> CatalogOverride<'a> {
    pub fn install(
        lock: &'a CatalogLock,
        catalog: &Path,
        engine: &'a dyn SchemaEngine,
    ) -> io::Result<Self> {
        let uri = catalog_uri(catalog)?;
        let previous = std::env::var_os(CATALOG_ENV);
        // SAFETY: environment mutation only happens while the catalog lock is held.
        unsafe { std::env::set_var(CATALOG_ENV, &uri) };
        engine.reload_catalogs();
        debug!(catalog = %uri, "installed catalog override");

        Ok(CatalogOverride {
            previous,
            catalog: catalog.to_path_buf(),
            engine,
            _lock: lock,
        })
    }

    pub fn catalog(&self) -> &Path {
        &self.catalog
    }
}

impl Drop for CatalogOverride<'_> {
    fn drop(&mut self) {
        match self.previous.take() {
            // SAFETY: environment mutation only happens while the catalog lock is held.
            Some(value) => unsafe { std::env::set_var(CATALOG_ENV, value) },
            None => unsafe { std::env::remove_var(CATALOG_ENV) },
        }
        self.engine.reload_catalogs();
        debug!(catalog = %self.catalog.display(), "restored catalog environment");
    }
}

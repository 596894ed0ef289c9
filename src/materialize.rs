//! Writes a [`FileMapping`] to a private temporary directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::assets::FileMapping;
use crate::config::SessionConfig;

/// Creates uniquely named scratch directories holding the bundled files.
#[derive(Debug, Clone)]
pub struct Materializer {
    root: Option<PathBuf>,
    prefix: String,
}

impl Materializer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            root: config.temp_root.clone(),
            prefix: config.temp_prefix.clone(),
        }
    }

    /// Write every entry of `files` into a fresh directory.
    ///
    /// On error the partially written directory is removed before returning.
    pub fn materialize(&self, files: &FileMapping) -> io::Result<MaterializedDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);
        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        for (name, content) in files {
            check_file_name(name)?;
            let path = dir.path().join(name);
            fs::write(&path, content)?;
            set_permissions(&path)?;
        }

        debug!(path = %dir.path().display(), files = files.len(), "materialized schema files");
        Ok(MaterializedDir { dir })
    }
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

fn check_file_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to materialize file named {name:?}"),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn set_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// A directory created by [`Materializer::materialize`].
///
/// Removed by [`cleanup`](MaterializedDir::cleanup) or, failing that, on drop.
#[derive(Debug)]
pub struct MaterializedDir {
    dir: TempDir,
}

impl MaterializedDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the directory tree. Failures are logged, never returned.
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "removed materialized directory"),
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                "failed to remove materialized directory"
            ),
        }
    }
}

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::info;

///////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
enum ScopeDir {
    Temp(TempDir),
    Persistent(PathBuf),
}

/// Per-test directory that captures container output.
///
/// Under a configured root the directory always survives. Otherwise it is a
/// temporary directory that is removed on a clean [`LogScope::close`] and kept
/// for inspection when the test failed.
#[derive(Debug)]
pub struct LogScope {
    test_name: String,
    dir: ScopeDir,
}

impl LogScope {
    pub fn new(test_name: &str, root: Option<&Path>) -> std::io::Result<Self> {
        let dir = match root {
            Some(root) => {
                let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
                let path = root.join(format!("{test_name}-{stamp}"));
                std::fs::create_dir_all(&path)?;
                ScopeDir::Persistent(path)
            }
            None => ScopeDir::Temp(
                tempfile::Builder::new()
                    .prefix(&format!("{test_name}-"))
                    .tempdir()?,
            ),
        };

        let scope = Self {
            test_name: test_name.to_owned(),
            dir,
        };
        info!(test = %scope.test_name, log_dir = %scope.path().display(), "Logging to");
        Ok(scope)
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            ScopeDir::Temp(dir) => dir.path(),
            ScopeDir::Persistent(path) => path,
        }
    }

    pub fn log_path(&self, case: &str, stream: &str) -> PathBuf {
        self.path().join(format!("{case}.{stream}.log"))
    }

    /// Returns the directory if it outlives the scope.
    pub fn close(self, failed: bool) -> Option<PathBuf> {
        match self.dir {
            ScopeDir::Persistent(path) => {
                info!(test = %self.test_name, log_dir = %path.display(), failed, "Logs kept");
                Some(path)
            }
            ScopeDir::Temp(dir) if failed => {
                let path = dir.keep();
                info!(test = %self.test_name, log_dir = %path.display(), "Test failed, logs kept");
                Some(path)
            }
            // Dropping the TempDir removes it
            ScopeDir::Temp(_) => None,
        }
    }
}

///////////////////////////////////////////////////////////////////////////////

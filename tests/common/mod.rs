#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Standard sample survey used across the integration tests: one grouped
/// number, one link column, and two plain categorical columns.
pub const SURVEY_CSV: &str = "city,population,homepage,notes\n\
Lima,\"100,364\",www.lima.gob.pe,first\n\
Cusco,3945,www.cusco.gob.pe,second\n\
Iquitos,146,www.munimaynas.gob.pe,third\n";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes the standard sample survey and returns its path.
    pub fn survey(&self) -> PathBuf {
        self.write("survey.csv", SURVEY_CSV)
    }

    /// Conventional session file path for tests that drive the binary.
    pub fn session(&self) -> PathBuf {
        self.path().join("survey.session")
    }
}

//! Scratch workspace
//!
//! A directory owned by one pipeline instance. It is wiped and recreated on
//! construction and intentionally left behind afterwards so that downloaded
//! specs and converter logs can be inspected after the build.
//!
//! Single writer only: two pipelines pointed at the same project root would
//! race on the reset and on file names.

use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name created under the project root
pub const SCRATCH_DIR_NAME: &str = ".swaggercache";

/// Log file receiving the converter's output streams
pub const CONVERTER_LOG_NAME: &str = "widdershins.log";

/// Inline converter environment, serialized as YAML
pub const ENVIRONMENT_FILE_NAME: &str = "env.yaml";

#[derive(Debug)]
pub struct ScratchWorkspace {
    root: PathBuf,
    counter: usize,
}

impl ScratchWorkspace {
    /// Create the workspace under `project_root`, removing any previous one
    pub fn create(project_root: &Path) -> Result<Self> {
        Self::create_at(project_root.join(SCRATCH_DIR_NAME))
    }

    /// Create the workspace at an explicit location, removing any previous one
    pub fn create_at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            debug!(path = %root.display(), "removing previous scratch workspace");
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;

        Ok(Self { root, counter: 0 })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a new invocation, reserving file names for it
    pub fn begin_invocation(&mut self) -> Invocation {
        let invocation = Invocation {
            index: self.counter,
            root: self.root.clone(),
        };
        self.counter += 1;
        invocation
    }

    /// Number of invocations started so far
    pub fn invocations(&self) -> usize {
        self.counter
    }

    /// Remove the workspace directory
    pub fn dispose(self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

/// File names reserved for one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub index: usize,
    root: PathBuf,
}

impl Invocation {
    /// Where a downloaded spec is staged
    pub fn spec_download_path(&self) -> PathBuf {
        self.root.join(format!("swagger_spec{}", self.index))
    }

    /// Where the converter writes its Markdown
    pub fn converter_output_path(&self) -> PathBuf {
        self.root.join(format!("swagger{}.md", self.index))
    }

    pub fn converter_log_path(&self) -> PathBuf {
        self.root.join(CONVERTER_LOG_NAME)
    }

    pub fn environment_path(&self) -> PathBuf {
        self.root.join(ENVIRONMENT_FILE_NAME)
    }

    pub fn scratch_root(&self) -> &Path {
        &self.root
    }
}

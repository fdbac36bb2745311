//! CI detection

use std::path::{Path, PathBuf};

use crate::config::HarnessConfig;

/// Subdirectory of the artifacts root that receives pod logs
pub const POD_LOGS_DIR: &str = "pod-logs";

/// Whether the run is under CI and where artifacts go
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CiEnvironment {
    is_ci: bool,
    artifacts_dir: PathBuf,
}

impl CiEnvironment {
    pub fn new(is_ci: bool, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            is_ci,
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.is_ci, config.artifacts_dir.clone())
    }

    pub fn is_ci(&self) -> bool {
        self.is_ci
    }

    pub fn local_artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// `<artifacts>/pod-logs`
    pub fn pod_logs_dir(&self) -> PathBuf {
        self.artifacts_dir.join(POD_LOGS_DIR)
    }
}

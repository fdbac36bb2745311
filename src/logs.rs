//! Pod log export
//!
//! Writes `<dir>/<namespace>/<pod>-<container>.log` for every container of
//! every pod in a namespace.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cluster::ClusterApi;
use crate::error::{Error, Result};

/// Copies pod logs out of the cluster
pub struct LogExporter<'a> {
    api: &'a dyn ClusterApi,
}

impl<'a> LogExporter<'a> {
    pub fn new(api: &'a dyn ClusterApi) -> Self {
        Self { api }
    }

    /// Export the logs of every container in `namespace` under `dir`
    ///
    /// Keeps going past containers whose logs cannot be fetched or written and
    /// reports them together at the end. Returns the files written.
    pub async fn export(&self, namespace: &str, dir: &Path) -> Result<Vec<PathBuf>> {
        let target = dir.join(namespace);
        tokio::fs::create_dir_all(&target).await?;

        let pods = self.api.list_pods(namespace).await?;
        let mut written = Vec::new();
        let mut failures = Vec::new();

        for pod in pods {
            let Some(pod_name) = pod.metadata.name.clone() else {
                continue;
            };
            let containers = pod
                .spec
                .map(|spec| {
                    spec.init_containers
                        .unwrap_or_default()
                        .into_iter()
                        .chain(spec.containers)
                        .map(|c| c.name)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            for container in containers {
                let path = target.join(format!("{}-{}.log", pod_name, container));
                let result = match self.api.pod_logs(namespace, &pod_name, &container).await {
                    Ok(logs) => tokio::fs::write(&path, logs).await.map_err(Error::from),
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => {
                        debug!(path = %path.display(), "Exported container logs");
                        written.push(path);
                    }
                    Err(e) => {
                        warn!(pod = %pod_name, container = %container, error = %e, "Failed to export logs");
                        failures.push(format!("{}/{}: {}", pod_name, container, e));
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(Error::CleanupError(failures))
        }
    }
}

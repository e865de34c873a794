//! Dataset repositories and manifest lookup.
//!
//! A repository is a directory whose child directories are datasets:
//!
//! ```text
//! <repo>/<dataset>/manifest.yaml
//! <repo>/<dataset>/ddl/<table>.sql
//! <repo>/<dataset>/data/<table>/data-<tag>.csv[.gz]
//! ```

mod manifest;

pub use manifest::{DatasetManifest, Sources, MANIFEST_FILE};

use crate::config::RepoConfig;
use crate::error::{DatasetError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Searches a fixed set of repositories for datasets.
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    repos: Vec<RepoConfig>,
}

impl DatasetCatalog {
    pub fn new(repos: Vec<RepoConfig>) -> Self {
        Self { repos }
    }

    /// Configured repositories.
    pub fn repos(&self) -> &[RepoConfig] {
        &self.repos
    }

    /// Datasets matching `name` (all datasets when `None`).
    ///
    /// With `repo_path`, only that directory is searched and it must exist.
    /// Otherwise every configured repository is searched; missing ones are
    /// skipped.
    pub fn search(&self, name: Option<&str>, repo_path: Option<&Path>) -> Result<Vec<DatasetManifest>> {
        let mut datasets = Vec::new();

        match repo_path {
            Some(path) => scan_repo(path, name, &mut datasets)?,
            None => {
                for repo in &self.repos {
                    if !repo.path.is_dir() {
                        warn!(
                            "Repository {} not found at {}",
                            repo.name,
                            repo.path.display()
                        );
                        continue;
                    }
                    scan_repo(&repo.path, name, &mut datasets)?;
                }
            }
        }

        Ok(datasets)
    }

    /// The single dataset called `name`.
    pub fn resolve(&self, name: &str, repo_path: Option<&Path>) -> Result<DatasetManifest> {
        let mut matches = self.search(Some(name), repo_path)?;
        match matches.len() {
            0 => Err(DatasetError::DatasetNotFound(name.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(DatasetError::DatasetAmbiguous {
                name: name.to_string(),
                repos: matches.into_iter().map(|m| m.repo).collect(),
            }),
        }
    }
}

fn scan_repo(dir: &Path, name: Option<&str>, out: &mut Vec<DatasetManifest>) -> Result<()> {
    let repo_name = repo_label(dir);
    let mut children = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()?;
    children.sort();

    for child in children {
        if !child.is_dir() {
            continue;
        }
        let child_name = child
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(wanted) = name {
            if wanted != child_name {
                continue;
            }
        }
        debug!("Found dataset {} in {}", child_name, dir.display());
        out.push(DatasetManifest::load(&child, &repo_name)?);
    }
    Ok(())
}

/// Basename of a repository directory, resolving `.` and `..`.
fn repo_label(dir: &Path) -> String {
    let resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

//! Dataset manifest (`manifest.yaml`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of a dataset manifest.
pub const MANIFEST_FILE: &str = "manifest.yaml";

/// Descriptive metadata of a dataset plus location fields filled in when the
/// dataset is discovered. Location fields are never written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// Directory name of the dataset.
    #[serde(skip)]
    pub name: String,

    /// Name of the repository directory holding the dataset.
    #[serde(skip)]
    pub repo: String,

    /// Dataset directory.
    #[serde(skip)]
    pub path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Human-readable size, e.g. "150 rows".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Sources>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Source references: a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sources {
    One(String),
    Many(Vec<String>),
}

impl fmt::Display for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sources::One(s) => write!(f, "{}", s),
            Sources::Many(list) => write!(f, "{}", list.join(", ")),
        }
    }
}

impl DatasetManifest {
    /// Load the manifest of a dataset directory; a missing file yields empty
    /// metadata. Location fields are filled from `dataset_dir`.
    pub fn load(dataset_dir: &Path, repo: &str) -> crate::error::Result<Self> {
        let manifest_path = dataset_dir.join(MANIFEST_FILE);
        let mut manifest = if manifest_path.is_file() {
            let content = std::fs::read_to_string(&manifest_path)?;
            if content.trim().is_empty() {
                DatasetManifest::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            DatasetManifest::default()
        };

        manifest.name = dataset_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        manifest.repo = repo.to_string();
        manifest.path = dataset_dir.to_path_buf();
        Ok(manifest)
    }

    /// Write the descriptive fields to `<dir>/manifest.yaml`.
    pub fn write(&self, dataset_dir: &Path) -> crate::error::Result<PathBuf> {
        let path = dataset_dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_yaml::to_string(self)?)?;
        Ok(path)
    }

    /// Value of a display column by name, as printed by the CLI.
    pub fn field(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            "repo" => Some(self.repo.clone()),
            "path" => Some(self.path.display().to_string()),
            "title" => self.title.clone(),
            "description" => self.description.clone(),
            "size" => self.size.clone(),
            "sources" => self.sources.as_ref().map(ToString::to_string),
            "notes" => self.notes.clone(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_skips_location_fields() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = DatasetManifest {
            name: "iris".into(),
            repo: "local".into(),
            path: dir.path().to_path_buf(),
            title: Some("iris Data Set".into()),
            description: Some("Data set dumped from host localhost, database iris".into()),
            size: Some("150 rows".into()),
            sources: Some(Sources::One("(Add source URL here)".into())),
            notes: None,
        };
        let path = manifest.write(dir.path()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();

        assert!(text.contains("size: 150 rows"));
        assert!(!text.contains("repo"));
        assert!(!text.contains("notes"));

        let loaded = DatasetManifest::load(dir.path(), "local").unwrap();
        assert_eq!(loaded.size.as_deref(), Some("150 rows"));
        assert_eq!(loaded.repo, "local");
    }

    #[test]
    fn test_sources_list() {
        let manifest: DatasetManifest =
            serde_yaml::from_str("title: x\nsources:\n  - https://a\n  - https://b\n").unwrap();
        assert_eq!(manifest.field("sources").as_deref(), Some("https://a, https://b"));
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ds = dir.path().join("nyc_taxi");
        std::fs::create_dir(&ds).unwrap();
        let manifest = DatasetManifest::load(&ds, "repo").unwrap();
        assert_eq!(manifest.name, "nyc_taxi");
        assert!(manifest.title.is_none());
    }
}

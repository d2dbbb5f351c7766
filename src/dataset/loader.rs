//! Reading datasets from disk.
//!
//! A dataset path is either a directory of network/architecture files or a
//! single bundle file. Directory entries are visited in file-name order so
//! load results never depend on the filesystem.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::dataset::{ArchFile, Bundle, DataFile, NetworkFile};
use crate::error::{ArchFlowError, Result};
use crate::graph::model::{Architecture, Network};

/// File extensions recognised as dataset files.
const DATA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Everything read from a dataset path, before depth assignment.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Networks in load order. Names are unique; the first file wins.
    pub networks: Vec<Network>,
    pub architectures: Vec<Architecture>,
    /// Files that contributed to this dataset.
    pub sources: Vec<PathBuf>,
}

impl Dataset {
    pub fn from_bundle(bundle: Bundle) -> Self {
        let mut dataset = Self::default();
        dataset.add_bundle(bundle);
        dataset
    }

    fn add_bundle(&mut self, bundle: Bundle) {
        self.architectures.extend(bundle.architectures);
        for entry in bundle.networks {
            let name = entry.data.name_or(&entry.id).to_string();
            self.add_network(entry.data.to_network(&name));
        }
    }

    fn add_arch(&mut self, file: ArchFile) {
        if let Some(declared) = file.num_arch {
            if declared as usize != file.architectures.len() {
                tracing::warn!(
                    declared,
                    found = file.architectures.len(),
                    "architecture count does not match num_arch"
                );
            }
        }
        self.architectures.extend(file.architectures);
    }

    fn add_network(&mut self, network: Network) {
        if self.networks.iter().any(|n| n.name == network.name) {
            tracing::warn!(network = %network.name, "duplicate network ignored");
            return;
        }
        self.networks.push(network);
    }

    fn add_file(&mut self, path: &Path, file: DataFile) {
        match file {
            DataFile::Bundle(bundle) => self.add_bundle(bundle),
            DataFile::Arch(arch) => self.add_arch(arch),
            DataFile::Network(network) => {
                let stem = file_stem(path);
                let name = network.name_or(&stem).to_string();
                self.add_network(network.to_network(&name));
            }
        }
        self.sources.push(path.to_path_buf());
    }
}

/// Load a dataset directory or a single dataset file.
pub fn load_path(path: &Path) -> Result<Dataset> {
    let mut dataset = Dataset::default();
    if path.is_dir() {
        for file in data_files(path) {
            let parsed = read_data_file(&file)?;
            dataset.add_file(&file, parsed);
        }
    } else if path.is_file() {
        let parsed = read_data_file(path)?;
        dataset.add_file(path, parsed);
    } else {
        return Err(ArchFlowError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("dataset path not found: {}", path.display()),
        )));
    }

    tracing::info!(
        path = %path.display(),
        files = dataset.sources.len(),
        networks = dataset.networks.len(),
        architectures = dataset.architectures.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Dataset files directly inside `dir`, sorted by file name.
fn data_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable dataset entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_data_extension(path))
        .collect()
}

/// Parse one file as JSON or YAML depending on its extension.
pub fn read_data_file(path: &Path) -> Result<DataFile> {
    let contents = std::fs::read_to_string(path)?;
    let parsed = if is_yaml(path) {
        serde_yaml::from_str(&contents).map_err(ArchFlowError::from)
    } else {
        serde_json::from_str(&contents).map_err(ArchFlowError::from)
    };
    parsed.inspect_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "failed to parse dataset file");
    })
}

fn has_data_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DATA_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

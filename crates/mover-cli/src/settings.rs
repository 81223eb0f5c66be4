use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Startup configuration, read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoverSettings {
    /// Script files to load, in pool order.
    pub scripts: Vec<PathBuf>,
    /// Pool index for every position slot. Slots are assigned at random when missing.
    pub assignments: Option<Vec<u8>>,
    /// Seed for the initial positions and the random assignment.
    pub seed: Option<u64>,
}

impl Default for MoverSettings {
    fn default() -> Self {
        Self {
            scripts: vec![
                PathBuf::from("scripts/double.rhai"),
                PathBuf::from("scripts/half.rhai"),
            ],
            assignments: None,
            seed: None,
        }
    }
}

impl MoverSettings {
    /// Load the settings from a file, falling back to the defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings file {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read settings file {}", path.display())),
        }
    }
}

use std::path::{Path, PathBuf};

use floorscan_floorplan::FloorplanOptions;
use floorscan_process::{colmap::ColmapConfig, nerfstudio::NerfstudioBins};
use serde::{Deserialize, Serialize};

/// Error types for loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`Config`].
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// NeRF training and mesh export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Where `ns-train` writes its runs; the floor plan lands in `floorplan/` below it.
    pub output_dir: PathBuf,
    /// `--max-num-iterations` of `ns-train`.
    pub max_iterations: u32,
    /// `--num-points` of `ns-export poisson`.
    pub export_points: u32,
    /// `--remove-outliers` of `ns-export poisson`.
    pub remove_outliers: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output/room_1"),
            max_iterations: 10_000,
            export_points: 1_000_000,
            remove_outliers: true,
        }
    }
}

/// Everything the workflows need. Missing keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scene layout and COLMAP options.
    pub colmap: ColmapConfig,
    /// nerfstudio executables.
    pub nerfstudio: NerfstudioBins,
    /// Training and export.
    pub train: TrainConfig,
    /// Slicing and rendering.
    pub floorplan: FloorplanOptions,
}

impl Config {
    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The file at `path` if given, the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                log::info!("loading config from {}", path.display());
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{colmap::ColmapConfig, command::ToolCommand};

/// Executables of the nerfstudio command line tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NerfstudioBins {
    /// `ns-process-data`
    pub process_data: String,
    /// `ns-train`
    pub train: String,
    /// `ns-export`
    pub export: String,
}

impl Default for NerfstudioBins {
    fn default() -> Self {
        Self {
            process_data: "ns-process-data".to_string(),
            train: "ns-train".to_string(),
            export: "ns-export".to_string(),
        }
    }
}

/// Converts an existing COLMAP model into nerfstudio's `transforms.json`.
///
/// COLMAP and image processing are skipped; the model path is given relative to the
/// scene directory, which is also the output directory.
pub fn process_data(bins: &NerfstudioBins, cfg: &ColmapConfig) -> ToolCommand {
    ToolCommand::new(&bins.process_data)
        .arg("images")
        .path_opt("--data", &cfg.image_dir)
        .path_opt("--output-dir", &cfg.data_dir)
        .arg("--skip-colmap")
        .arg("--skip-image-processing")
        .path_opt("--colmap-model-path", cfg.model_dir_in_scene())
}

/// `ns-train nerfacto` on a scene with a COLMAP model.
///
/// Options before the `colmap` token belong to the method, options after it to the
/// dataparser.
pub fn train_nerfacto(
    bins: &NerfstudioBins,
    data_dir: &Path,
    colmap_path: &Path,
    output_dir: &Path,
    max_iterations: u32,
) -> ToolCommand {
    ToolCommand::new(&bins.train)
        .arg("nerfacto")
        .path_opt("--output-dir", output_dir)
        .opt("--max-num-iterations", max_iterations.to_string())
        .arg("colmap")
        .path_opt("--data", data_dir)
        .path_opt("--colmap-path", colmap_path)
}

/// `ns-export poisson` of a trained model into a mesh.
pub fn export_poisson(
    bins: &NerfstudioBins,
    config_path: &Path,
    output_dir: &Path,
    num_points: u32,
    remove_outliers: bool,
) -> ToolCommand {
    let remove_outliers = if remove_outliers { "True" } else { "False" };
    ToolCommand::new(&bins.export)
        .arg("poisson")
        .path_opt("--load-config", config_path)
        .path_opt("--output-dir", output_dir)
        .opt("--num-points", num_points.to_string())
        .opt("--remove-outliers", remove_outliers)
}

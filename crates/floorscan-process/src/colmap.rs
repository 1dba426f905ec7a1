use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    command::ToolCommand,
    nerfstudio::{self, NerfstudioBins},
    pipeline::{Pipeline, Step},
};

/// The COLMAP feature matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// Match every image pair.
    #[default]
    Exhaustive,
    /// Match consecutive frames, suited for video captures.
    Sequential,
}

impl Matcher {
    /// The COLMAP subcommand for this matcher.
    pub fn subcommand(&self) -> &'static str {
        match self {
            Matcher::Exhaustive => "exhaustive_matcher",
            Matcher::Sequential => "sequential_matcher",
        }
    }
}

impl std::str::FromStr for Matcher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exhaustive" => Ok(Matcher::Exhaustive),
            "sequential" => Ok(Matcher::Sequential),
            _ => Err(format!("unknown matcher: {s}")),
        }
    }
}

/// Paths and options of a sparse reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColmapConfig {
    /// The COLMAP executable.
    pub colmap_bin: String,
    /// Scene root; the nerfstudio conversion writes here.
    pub data_dir: PathBuf,
    /// Directory with the input images.
    pub image_dir: PathBuf,
    /// COLMAP feature database.
    pub database_path: PathBuf,
    /// Mapper output directory, models are written to numbered subdirectories.
    pub sparse_dir: PathBuf,
    /// COLMAP camera model, e.g. `OPENCV`. COLMAP's default when unset.
    pub camera_model: Option<String>,
    /// Share one camera between all images.
    pub single_camera: bool,
    /// Feature matching strategy.
    pub matcher: Matcher,
    /// Run SIFT extraction and matching on the GPU.
    pub use_gpu: bool,
}

impl Default for ColmapConfig {
    fn default() -> Self {
        Self::for_scene("./data/room_1")
    }
}

impl ColmapConfig {
    /// The standard layout below a scene directory:
    /// `images/`, `colmap/database.db` and `colmap/sparse/`.
    pub fn for_scene(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            colmap_bin: "colmap".to_string(),
            image_dir: data_dir.join("images"),
            database_path: data_dir.join("colmap").join("database.db"),
            sparse_dir: data_dir.join("colmap").join("sparse"),
            data_dir,
            camera_model: None,
            single_camera: false,
            matcher: Matcher::default(),
            use_gpu: true,
        }
    }

    /// Move the scene paths to the standard layout below `data_dir`, keeping the
    /// executable and matching options.
    pub fn with_scene(self, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            colmap_bin: self.colmap_bin,
            camera_model: self.camera_model,
            single_camera: self.single_camera,
            matcher: self.matcher,
            use_gpu: self.use_gpu,
            ..Self::for_scene(data_dir)
        }
    }

    /// The first model written by the mapper.
    pub fn model_dir(&self) -> PathBuf {
        self.sparse_dir.join("0")
    }

    /// The model directory relative to `data_dir` when it lies below it.
    pub fn model_dir_in_scene(&self) -> PathBuf {
        let model = self.model_dir();
        match model.strip_prefix(&self.data_dir) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => model,
        }
    }
}

fn gpu_flag(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

/// `colmap feature_extractor`
pub fn feature_extractor(cfg: &ColmapConfig) -> ToolCommand {
    let mut cmd = ToolCommand::new(&cfg.colmap_bin)
        .arg("feature_extractor")
        .path_opt("--database_path", &cfg.database_path)
        .path_opt("--image_path", &cfg.image_dir);
    if let Some(model) = &cfg.camera_model {
        cmd = cmd.opt("--ImageReader.camera_model", model);
    }
    if cfg.single_camera {
        cmd = cmd.opt("--ImageReader.single_camera", "1");
    }
    cmd.opt("--SiftExtraction.use_gpu", gpu_flag(cfg.use_gpu))
}

/// `colmap exhaustive_matcher` or `colmap sequential_matcher`
pub fn feature_matcher(cfg: &ColmapConfig) -> ToolCommand {
    ToolCommand::new(&cfg.colmap_bin)
        .arg(cfg.matcher.subcommand())
        .path_opt("--database_path", &cfg.database_path)
        .opt("--SiftMatching.use_gpu", gpu_flag(cfg.use_gpu))
}

/// `colmap mapper`
pub fn mapper(cfg: &ColmapConfig) -> ToolCommand {
    ToolCommand::new(&cfg.colmap_bin)
        .arg("mapper")
        .path_opt("--database_path", &cfg.database_path)
        .path_opt("--image_path", &cfg.image_dir)
        .path_opt("--output_path", &cfg.sparse_dir)
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// The sparse reconstruction sequence.
///
/// Feature extraction, matching and mapping abort the run on failure. The final
/// conversion to the nerfstudio format only warns, so a usable COLMAP model is kept
/// even when the conversion tool is missing or fails.
pub fn reconstruction_pipeline(cfg: &ColmapConfig, ns: &NerfstudioBins) -> Pipeline {
    let mut extract = Step::new("feature extraction", feature_extractor(cfg));
    if let Some(parent) = parent_dir(&cfg.database_path) {
        extract = extract.prepare_dir(parent);
    }

    Pipeline::new("reconstruct")
        .step(extract)
        .step(Step::new("feature matching", feature_matcher(cfg)))
        .step(Step::new("sparse reconstruction", mapper(cfg)).prepare_dir(&cfg.sparse_dir))
        .step(
            Step::new(
                "nerfstudio conversion",
                nerfstudio::process_data(ns, cfg),
            )
            .warn_on_failure(),
        )
}

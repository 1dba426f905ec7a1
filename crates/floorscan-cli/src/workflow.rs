use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use floorscan_3d::io::colmap::SparseModel;
use floorscan_floorplan::{FloorplanError, FloorplanOutputs};
use floorscan_process::{
    colmap, nerfstudio, CommandRunner, Pipeline, PipelineError, PipelineReport, Step,
};

use crate::config::Config;

/// Error types for the workflows.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// An external step failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A required input does not exist.
    #[error("{what} not found: {}", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    /// An expected tool output was not produced.
    #[error("no {what} found in {}", dir.display())]
    MissingOutput { what: &'static str, dir: PathBuf },

    /// Floor plan generation failed.
    #[error(transparent)]
    Floorplan(#[from] FloorplanError),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("failed to search directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// The most recently modified file below `dir` accepted by `filter`.
///
/// `max_depth` 1 only looks at the direct children. Ties on the modification time
/// are broken by path so the result is deterministic.
pub fn find_latest_file(
    dir: &Path,
    max_depth: usize,
    filter: impl Fn(&Path) -> bool,
) -> Result<Option<PathBuf>, WorkflowError> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;

    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(max_depth) {
        let entry = entry?;
        if !entry.file_type().is_file() || !filter(entry.path()) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let candidate = (modified, entry.into_path());
        if latest.as_ref().map_or(true, |best| candidate > *best) {
            latest = Some(candidate);
        }
    }

    Ok(latest.map(|(_, path)| path))
}

fn log_sparse_model(dir: &Path) {
    match SparseModel::open(dir).and_then(|model| Ok((model.format(), model.summary()?))) {
        Ok((format, summary)) => log::info!(
            "sparse model ({:?}): {} cameras, {} images, {} points",
            format,
            summary.cameras,
            summary.images,
            summary.points
        ),
        Err(err) => log::warn!("could not inspect sparse model: {err}"),
    }
}

/// Feature extraction, matching, mapping and conversion to the nerfstudio format.
///
/// Fails on the first failing COLMAP step. A failed conversion is only reported as a
/// warning in the returned report.
pub fn reconstruct<R: CommandRunner + ?Sized>(
    cfg: &Config,
    runner: &mut R,
) -> Result<PipelineReport, WorkflowError> {
    log::info!("images: {}", cfg.colmap.image_dir.display());
    log::info!("database: {}", cfg.colmap.database_path.display());
    log::info!("sparse output: {}", cfg.colmap.sparse_dir.display());

    let pipeline = colmap::reconstruction_pipeline(&cfg.colmap, &cfg.nerfstudio);
    let report = pipeline.run(runner)?;
    log_sparse_model(&cfg.colmap.model_dir());
    Ok(report)
}

/// Train a NeRF on a reconstructed scene, export a Poisson mesh and slice it into a
/// floor plan written to `<output_dir>/floorplan`.
pub fn train_and_export_floorplan<R: CommandRunner + ?Sized>(
    cfg: &Config,
    runner: &mut R,
) -> Result<FloorplanOutputs, WorkflowError> {
    let data_dir = &cfg.colmap.data_dir;
    let model_dir = cfg.colmap.model_dir();
    let output_dir = &cfg.train.output_dir;

    if !data_dir.exists() {
        return Err(WorkflowError::MissingInput {
            what: "data directory",
            path: data_dir.clone(),
        });
    }
    if !model_dir.exists() {
        return Err(WorkflowError::MissingInput {
            what: "COLMAP model",
            path: model_dir,
        });
    }
    std::fs::create_dir_all(output_dir)?;

    log::info!("data: {}", data_dir.display());
    log::info!("output: {}", output_dir.display());
    log::info!("iterations: {}", cfg.train.max_iterations);

    let train = nerfstudio::train_nerfacto(
        &cfg.nerfstudio,
        data_dir,
        &cfg.colmap.model_dir_in_scene(),
        output_dir,
        cfg.train.max_iterations,
    );
    Pipeline::new("floorplan")
        .step(Step::new("nerf training", train))
        .run(runner)?;

    let config_path = find_latest_file(output_dir, usize::MAX, |p| {
        p.file_name().map_or(false, |name| name == "config.yml")
    })?
    .ok_or_else(|| WorkflowError::MissingOutput {
        what: "config.yml",
        dir: output_dir.clone(),
    })?;
    log::info!("using config: {}", config_path.display());

    let export_dir = config_path
        .parent()
        .unwrap_or(output_dir)
        .join("exports")
        .join("mesh");
    let export = nerfstudio::export_poisson(
        &cfg.nerfstudio,
        &config_path,
        &export_dir,
        cfg.train.export_points,
        cfg.train.remove_outliers,
    );
    Pipeline::new("floorplan")
        .step(Step::new("mesh export", export).prepare_dir(&export_dir))
        .run(runner)?;

    let mesh_path = find_latest_file(&export_dir, 1, |p| {
        p.extension().map_or(false, |ext| ext == "ply")
    })?
    .ok_or_else(|| WorkflowError::MissingOutput {
        what: "mesh file",
        dir: export_dir.clone(),
    })?;
    log::info!("mesh: {}", mesh_path.display());

    let outputs = floorscan_floorplan::generate_floorplan(
        &mesh_path,
        output_dir.join("floorplan"),
        &cfg.floorplan,
    )?;
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use floorscan_process::{ProcessError, ToolCommand, ToolExit};
    use std::{fs::File, time::Duration};

    const WALLS_PLY: &str = "ply
format ascii 1.0
element vertex 8
property float x
property float y
property float z
element face 4
property list uchar int vertex_indices
end_header
0 0 0
4 0 0
4 3 0
0 3 0
0 0 2.5
4 0 2.5
4 3 2.5
0 3 2.5
4 0 1 5 4
4 1 2 6 5
4 2 3 7 6
4 3 0 4 7
";

    /// Stands in for nerfstudio: `ns-train` writes a run config, `ns-export` a mesh.
    struct FakeNerfstudio {
        calls: Vec<String>,
        fail: Option<&'static str>,
        write_mesh: bool,
    }

    impl FakeNerfstudio {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                fail: None,
                write_mesh: true,
            }
        }
    }

    fn option_value(cmd: &ToolCommand, flag: &str) -> PathBuf {
        let i = cmd.args.iter().position(|a| a == flag).expect("flag present");
        PathBuf::from(&cmd.args[i + 1])
    }

    impl CommandRunner for FakeNerfstudio {
        fn run(&mut self, cmd: &ToolCommand) -> Result<ToolExit, ProcessError> {
            let program = cmd.program_name();
            self.calls.push(program.clone());
            if self.fail == Some(program.as_str()) {
                return Ok(ToolExit::from_code(1));
            }

            match program.as_str() {
                "ns-train" => {
                    let run_dir = option_value(cmd, "--output-dir").join("room/nerfacto/run1");
                    std::fs::create_dir_all(&run_dir).unwrap();
                    std::fs::write(run_dir.join("config.yml"), "method: nerfacto\n").unwrap();
                }
                "ns-export" if self.write_mesh => {
                    let out = option_value(cmd, "--output-dir");
                    std::fs::write(out.join("poisson_mesh.ply"), WALLS_PLY).unwrap();
                }
                _ => {}
            }
            Ok(ToolExit::SUCCESS)
        }
    }

    fn scene(tmp: &Path) -> Config {
        let mut cfg = Config::default();
        cfg.colmap = cfg.colmap.with_scene(tmp.join("data"));
        cfg.train.output_dir = tmp.join("output");
        cfg.floorplan.render.image_size = 128;
        std::fs::create_dir_all(cfg.colmap.model_dir()).unwrap();
        cfg
    }

    #[test]
    fn test_find_latest_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested)?;

        let old = tmp.path().join("old.ply");
        let new = nested.join("new.ply");
        std::fs::write(&old, "")?;
        std::fs::write(&new, "")?;
        std::fs::write(tmp.path().join("notes.txt"), "")?;

        let epoch = SystemTime::UNIX_EPOCH;
        File::options()
            .write(true)
            .open(&old)?
            .set_modified(epoch + Duration::from_secs(2_000_000))?;
        File::options()
            .write(true)
            .open(&new)?
            .set_modified(epoch + Duration::from_secs(1_000_000))?;

        let is_ply = |p: &Path| p.extension().map_or(false, |e| e == "ply");
        assert_eq!(find_latest_file(tmp.path(), usize::MAX, is_ply)?, Some(old.clone()));

        File::options()
            .write(true)
            .open(&new)?
            .set_modified(epoch + Duration::from_secs(3_000_000))?;
        assert_eq!(find_latest_file(tmp.path(), usize::MAX, is_ply)?, Some(new));
        // direct children only
        assert_eq!(find_latest_file(tmp.path(), 1, is_ply)?, Some(old));
        assert_eq!(
            find_latest_file(tmp.path(), 1, |p| p.ends_with("none"))?,
            None
        );
        Ok(())
    }

    #[test]
    fn test_train_and_export_floorplan() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let cfg = scene(tmp.path());
        let mut runner = FakeNerfstudio::new();

        let outputs = train_and_export_floorplan(&cfg, &mut runner)?;
        assert_eq!(runner.calls, vec!["ns-train", "ns-export"]);
        assert_eq!(outputs.png, tmp.path().join("output/floorplan/floorplan.png"));
        assert!(outputs.png.is_file());
        assert!(outputs.svg.is_file());
        assert!(tmp
            .path()
            .join("output/room/nerfacto/run1/exports/mesh/poisson_mesh.ply")
            .is_file());
        Ok(())
    }

    #[test]
    fn test_missing_inputs() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let mut cfg = Config::default();
        cfg.colmap = cfg.colmap.with_scene(tmp.path().join("nowhere"));
        let mut runner = FakeNerfstudio::new();

        let err = train_and_export_floorplan(&cfg, &mut runner).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingInput { what: "data directory", .. }));

        std::fs::create_dir_all(tmp.path().join("nowhere"))?;
        let err = train_and_export_floorplan(&cfg, &mut runner).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingInput { what: "COLMAP model", .. }));
        assert!(runner.calls.is_empty());
        Ok(())
    }

    #[test]
    fn test_training_failure_stops() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let cfg = scene(tmp.path());
        let mut runner = FakeNerfstudio::new();
        runner.fail = Some("ns-train");

        let err = train_and_export_floorplan(&cfg, &mut runner).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Pipeline(PipelineError::StepFailed { .. })
        ));
        assert_eq!(runner.calls, vec!["ns-train"]);
        Ok(())
    }

    #[test]
    fn test_export_without_mesh() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let cfg = scene(tmp.path());
        let mut runner = FakeNerfstudio::new();
        runner.write_mesh = false;

        let err = train_and_export_floorplan(&cfg, &mut runner).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingOutput { what: "mesh file", .. }));
        Ok(())
    }

    #[test]
    fn test_reconstruct_order_and_warning() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let cfg = scene(tmp.path());
        let mut runner = FakeNerfstudio::new();
        runner.fail = Some("ns-process-data");

        let report = reconstruct(&cfg, &mut runner)?;
        assert_eq!(
            runner.calls,
            vec!["colmap", "colmap", "colmap", "ns-process-data"]
        );
        assert_eq!(report.warnings.len(), 1);
        Ok(())
    }
}

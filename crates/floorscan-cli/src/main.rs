use argh::FromArgs;
use std::path::PathBuf;

use floorscan_process::{
    colmap::Matcher, probe::Environment, CommandRunner, DryRunRunner, SystemRunner,
};

mod config;
mod workflow;

use config::Config;

#[derive(FromArgs)]
/// Turn a folder of room photos into a floor plan with COLMAP and nerfstudio
struct Args {
    /// log debug messages
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Reconstruct(ReconstructArgs),
    Floorplan(FloorplanArgs),
    Slice(SliceArgs),
    Probe(ProbeArgs),
}

#[derive(FromArgs)]
/// Extract features, match, map and convert the scene for nerfstudio
#[argh(subcommand, name = "reconstruct")]
struct ReconstructArgs {
    /// json configuration file
    #[argh(option)]
    config: Option<PathBuf>,

    /// scene directory containing images/
    #[argh(option)]
    data: Option<PathBuf>,

    /// feature matcher: exhaustive or sequential
    #[argh(option)]
    matcher: Option<Matcher>,

    /// colmap camera model, e.g. OPENCV
    #[argh(option)]
    camera_model: Option<String>,

    /// share one camera between all images
    #[argh(switch)]
    single_camera: bool,

    /// run sift on the cpu
    #[argh(switch)]
    no_gpu: bool,

    /// print the commands without running them
    #[argh(switch)]
    dry_run: bool,
}

#[derive(FromArgs)]
/// Train nerfacto, export a mesh and draw its floor plan
#[argh(subcommand, name = "floorplan")]
struct FloorplanArgs {
    /// json configuration file
    #[argh(option)]
    config: Option<PathBuf>,

    /// reconstructed scene directory
    #[argh(option)]
    data: Option<PathBuf>,

    /// training output directory
    #[argh(option)]
    output: Option<PathBuf>,

    /// maximum number of training iterations
    #[argh(option)]
    iterations: Option<u32>,
}

#[derive(FromArgs)]
/// Draw the floor plan of an existing PLY mesh
#[argh(subcommand, name = "slice")]
struct SliceArgs {
    /// the mesh to slice
    #[argh(positional)]
    mesh: PathBuf,

    /// json configuration file
    #[argh(option)]
    config: Option<PathBuf>,

    /// output directory
    #[argh(option, default = "PathBuf::from(\".\")")]
    output: PathBuf,

    /// slice height above the lowest mesh point
    #[argh(option)]
    offset: Option<f64>,

    /// side of the png in pixels
    #[argh(option)]
    size: Option<u32>,
}

#[derive(FromArgs)]
/// Report docker and gpu availability
#[argh(subcommand, name = "probe")]
struct ProbeArgs {}

fn reconstruct(args: ReconstructArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(data) = args.data {
        cfg.colmap = cfg.colmap.with_scene(data);
    }
    if let Some(matcher) = args.matcher {
        cfg.colmap.matcher = matcher;
    }
    if args.camera_model.is_some() {
        cfg.colmap.camera_model = args.camera_model;
    }
    cfg.colmap.single_camera |= args.single_camera;
    cfg.colmap.use_gpu &= !args.no_gpu;

    let mut runner: Box<dyn CommandRunner> = if args.dry_run {
        Box::new(DryRunRunner::default())
    } else {
        Box::new(SystemRunner)
    };

    let report = workflow::reconstruct(&cfg, runner.as_mut())?;
    if report.is_clean() {
        log::info!("reconstruction finished");
    } else {
        for warning in &report.warnings {
            log::warn!("{warning}");
        }
        log::warn!("reconstruction finished with warnings");
    }
    Ok(())
}

fn floorplan(args: FloorplanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(data) = args.data {
        cfg.colmap = cfg.colmap.with_scene(data);
    }
    if let Some(output) = args.output {
        cfg.train.output_dir = output;
    }
    if let Some(iterations) = args.iterations {
        cfg.train.max_iterations = iterations;
    }

    let mut runner = SystemRunner;
    Environment::detect(&mut runner).log();

    let outputs = workflow::train_and_export_floorplan(&cfg, &mut runner)?;
    log::info!("floor plan: {}", outputs.png.display());
    Ok(())
}

fn slice(args: SliceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = Config::load(args.config.as_deref())?.floorplan;
    if let Some(offset) = args.offset {
        options.slice_offset = offset;
    }
    if let Some(size) = args.size {
        options.render.image_size = size;
    }

    let outputs = floorscan_floorplan::generate_floorplan(&args.mesh, &args.output, &options)?;
    log::info!("floor plan: {}", outputs.png.display());
    Ok(())
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Reconstruct(args) => reconstruct(args),
        Command::Floorplan(args) => floorplan(args),
        Command::Slice(args) => slice(args),
        Command::Probe(_) => {
            Environment::detect(&mut SystemRunner).log();
            Ok(())
        }
    }
}

fn main() {
    let args: Args = argh::from_env();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(args.command) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommand_errors_are_returned() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let args = Args::from_args(
            &["floorscan"],
            &["slice", "missing.ply", "--output", &tmp.path().display().to_string()],
        )
        .map_err(|e| e.output)?;

        let err = run(args.command).unwrap_err();
        assert!(err.to_string().contains("mesh"));
        assert!(std::fs::read_dir(tmp.path())?.next().is_none());
        Ok(())
    }

    #[test]
    fn test_unknown_matcher_is_rejected() {
        let res = Args::from_args(&["floorscan"], &["reconstruct", "--matcher", "vocab_tree"]);
        assert!(res.is_err());
    }
}

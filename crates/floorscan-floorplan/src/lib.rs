#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

use std::path::{Path, PathBuf};

use floorscan_3d::{io::ply, section, TriangleMesh};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Plan geometry and pixel mapping.
pub mod plan;

/// Thick line drawing and PNG encoding.
pub mod raster;

/// SVG output.
pub mod svg;

pub use plan::{FloorPlan, PlanTransform};

/// An error type for the floorplan module.
#[derive(thiserror::Error, Debug)]
pub enum FloorplanError {
    /// Error to read or write a file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to read the mesh.
    #[error("Failed to read the mesh. {0}")]
    MeshError(#[from] ply::PlyError),

    /// Error to slice the mesh.
    #[error("Failed to slice the mesh. {0}")]
    SectionError(#[from] section::SectionError),

    /// Error to encode the PNG image.
    #[error("Failed to encode the png image. {0}")]
    ImageError(#[from] image::ImageError),
}

/// Raster output settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Side of the square PNG in pixels.
    pub image_size: u32,
    /// Blank border in pixels.
    pub padding: u32,
    /// Line width in pixels.
    pub line_width: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            image_size: 2000,
            padding: 50,
            line_width: 5,
        }
    }
}

/// Floor plan extraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorplanOptions {
    /// Slice height above the lowest mesh point, in mesh units.
    pub slice_offset: f64,
    /// Raster output settings.
    pub render: RenderOptions,
}

impl Default for FloorplanOptions {
    fn default() -> Self {
        Self {
            slice_offset: 0.1,
            render: RenderOptions::default(),
        }
    }
}

/// Files written by [`generate_floorplan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorplanOutputs {
    /// The vector plan.
    pub svg: PathBuf,
    /// The raster plan.
    pub png: PathBuf,
}

/// Rasterize the plan onto a white square canvas.
pub fn render_png(plan: &FloorPlan, options: &RenderOptions) -> RgbImage {
    let size = options.image_size;
    let mut img = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));

    let Some(bounds) = plan.bounds() else {
        return img;
    };
    let transform = PlanTransform::fit(
        bounds,
        options.image_size,
        options.image_size,
        options.padding,
    );

    for line in plan.polylines() {
        let pixels = line
            .iter()
            .map(|&p| {
                let [x, y] = transform.apply(p);
                (x.round() as i32, y.round() as i32)
            })
            .collect::<Vec<_>>();
        for pair in pixels.windows(2) {
            raster::draw_thick_line(
                &mut img,
                pair[0],
                pair[1],
                Rgb([0, 0, 0]),
                options.line_width,
            );
        }
    }
    img
}

/// Slice a mesh just above its lowest point and project the cut to a plan.
pub fn extract_floorplan(
    mesh: &TriangleMesh,
    slice_offset: f64,
) -> Result<FloorPlan, FloorplanError> {
    let (lo, hi) = mesh.bounds().ok_or(section::SectionError::EmptyMesh)?;
    log::info!("mesh: {} vertices, bounds {:?} .. {:?}", mesh.vertices().len(), lo, hi);

    let height = lo[2] + slice_offset;
    log::info!("slicing at height {height}");
    let section = section::section_at_height(mesh, height)?;
    log::info!(
        "slice created: {} segments in {} polylines",
        section.num_segments(),
        section.polylines().len()
    );

    Ok(FloorPlan::from_section(&section))
}

/// Write `floorplan.svg` and `floorplan.png` for a plan into `output_dir`.
pub fn write_floorplan(
    plan: &FloorPlan,
    output_dir: impl AsRef<Path>,
    options: &RenderOptions,
) -> Result<FloorplanOutputs, FloorplanError> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let svg_path = output_dir.join("floorplan.svg");
    std::fs::write(&svg_path, svg::render_svg(plan, options.line_width as f64))?;
    log::info!("svg saved: {}", svg_path.display());

    let png_path = output_dir.join("floorplan.png");
    raster::write_image_png_rgb8(&png_path, &render_png(plan, options))?;
    log::info!("png saved: {}", png_path.display());

    Ok(FloorplanOutputs {
        svg: svg_path,
        png: png_path,
    })
}

/// Generate the floor plan of a room mesh.
///
/// # Arguments
///
/// * `mesh_path` - A PLY triangle mesh.
/// * `output_dir` - Directory receiving `floorplan.svg` and `floorplan.png`.
/// * `options` - Slice and render settings.
///
/// # Returns
///
/// The paths of the written files.
pub fn generate_floorplan(
    mesh_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    options: &FloorplanOptions,
) -> Result<FloorplanOutputs, FloorplanError> {
    let mesh_path = mesh_path.as_ref();
    log::info!("loading mesh from {}", mesh_path.display());
    let mesh = ply::read_ply_mesh(mesh_path)?;

    let plan = extract_floorplan(&mesh, options.slice_offset)?;
    write_floorplan(&plan, output_dir, &options.render)
}

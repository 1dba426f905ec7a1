use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use super::{CameraModel, ColmapCamera, ColmapError, ColmapImage, ColmapPoint3d};

/// Lines of a COLMAP text file without `#` comments.
fn data_lines(path: &Path) -> Result<Vec<String>, ColmapError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with('#') {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Read the cameras.txt file and return a vector of ColmapCamera structs.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
///
/// # Returns
///
/// A vector of ColmapCamera structs.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    data_lines(path.as_ref())?
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_camera_line(line))
        .collect()
}

/// Read the images.txt file and return a vector of ColmapImage structs.
///
/// Every image takes two lines: the pose and the list of 2D points, which is empty
/// for images without keypoints.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let mut lines = data_lines(path.as_ref())?;
    // a trailing blank line would otherwise be taken as an unpaired pose line
    while lines.len() % 2 == 1 && lines.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        lines.pop();
    }

    lines
        .chunks(2)
        .map(|chunk| match chunk {
            [pose, points] => parse_image_lines(pose, points),
            _ => Err(ColmapError::ParseError(
                "Invalid number of lines".to_string(),
            )),
        })
        .collect()
}

/// Read the points3D.txt file and return a vector of ColmapPoint3d structs.
pub fn read_points3d_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    data_lines(path.as_ref())?
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_point3d_line(line))
        .collect()
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

fn parse_array<T: std::str::FromStr, const N: usize>(parts: &[&str]) -> Result<[T; N], ColmapError>
where
    T::Err: std::fmt::Display,
{
    parts
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ColmapError::ParseError(format!("expected {N} values")))
}

fn parse_camera_model(model: &str) -> Result<CameraModel, ColmapError> {
    match model {
        "SIMPLE_PINHOLE" => Ok(CameraModel::SimplePinhole),
        "PINHOLE" => Ok(CameraModel::Pinhole),
        "SIMPLE_RADIAL" => Ok(CameraModel::SimpleRadial),
        "RADIAL" => Ok(CameraModel::Radial),
        "OPENCV" => Ok(CameraModel::OpenCV),
        "OPENCV_FISHEYE" => Ok(CameraModel::OpenCVFisheye),
        "FULL_OPENCV" => Ok(CameraModel::FullOpenCV),
        "FOV" => Ok(CameraModel::Fov),
        "SIMPLE_RADIAL_FISHEYE" => Ok(CameraModel::SimpleRadialFisheye),
        "RADIAL_FISHEYE" => Ok(CameraModel::RadialFisheye),
        "THIN_PRISM_FISHEYE" => Ok(CameraModel::ThinPrismFisheye),
        _ => Err(ColmapError::ParseError(format!(
            "Invalid camera model: {}",
            model
        ))),
    }
}

/// CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]
fn parse_camera_line(line: &str) -> Result<ColmapCamera, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 5 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    let model = parse_camera_model(parts[1])?;
    let params = parts[4..]
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<f64>, _>>()?;
    if params.len() != model.num_params() {
        return Err(ColmapError::InvalidNumCameraParams(params.len()));
    }

    Ok(ColmapCamera {
        camera_id: parse_part(parts[0])?,
        model,
        width: parse_part(parts[2])?,
        height: parse_part(parts[3])?,
        params,
    })
}

/// IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_lines(pose: &str, points: &str) -> Result<ColmapImage, ColmapError> {
    let parts = pose.split_whitespace().collect::<Vec<_>>();
    if parts.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    let num_values = points.split_whitespace().count();
    if num_values % 3 != 0 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of point2d values: {num_values}"
        )));
    }

    Ok(ColmapImage {
        image_id: parse_part(parts[0])?,
        rotation: parse_array(&parts[1..5])?,
        translation: parse_array(&parts[5..8])?,
        camera_id: parse_part(parts[8])?,
        // names may contain spaces
        name: parts[9..].join(" "),
        num_points2d: num_values / 3,
    })
}

/// POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)
fn parse_point3d_line(line: &str) -> Result<ColmapPoint3d, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 8 || (parts.len() - 8) % 2 != 0 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    Ok(ColmapPoint3d {
        point3d_id: parse_part(parts[0])?,
        xyz: parse_array(&parts[1..4])?,
        rgb: parse_array(&parts[4..7])?,
        error: parse_part(parts[7])?,
        track_len: (parts.len() - 8) / 2,
    })
}

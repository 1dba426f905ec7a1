/// Represents a Colmap camera model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModel {
    /// f, cx, cy
    SimplePinhole,
    /// fx, fy, cx, cy
    Pinhole,
    /// f, cx, cy, k
    SimpleRadial,
    /// f, cx, cy, k1, k2
    Radial,
    /// fx, fy, cx, cy, k1, k2, p1, p2
    OpenCV,
    /// fx, fy, cx, cy, k1, k2, k3, k4
    OpenCVFisheye,
    /// fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, k5, k6
    FullOpenCV,
    /// fx, fy, cx, cy, omega
    Fov,
    /// f, cx, cy, k
    SimpleRadialFisheye,
    /// f, cx, cy, k1, k2
    RadialFisheye,
    /// fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, sx1, sy1
    ThinPrismFisheye,
}

impl CameraModel {
    /// Number of intrinsic parameters of the model.
    pub fn num_params(&self) -> usize {
        match self {
            CameraModel::SimplePinhole => 3,
            CameraModel::Pinhole | CameraModel::SimpleRadial | CameraModel::SimpleRadialFisheye => 4,
            CameraModel::Radial | CameraModel::RadialFisheye | CameraModel::Fov => 5,
            CameraModel::OpenCV | CameraModel::OpenCVFisheye => 8,
            CameraModel::FullOpenCV | CameraModel::ThinPrismFisheye => 12,
        }
    }
}

/// Represents a camera in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera id
    pub camera_id: u32,
    /// Camera model
    pub model: CameraModel,
    /// Image width
    pub width: usize,
    /// Image height
    pub height: usize,
    /// Camera parameters
    pub params: Vec<f64>,
}

/// Represents a registered image in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image id
    pub image_id: u32,
    /// Rotation
    pub rotation: [f64; 4], // qw, qx, qy, qz
    /// Translation
    pub translation: [f64; 3], // x, y, z
    /// Camera id
    pub camera_id: u32,
    /// Image name
    pub name: String,
    /// Number of keypoints in the image
    pub num_points2d: usize,
}

/// Represents a 3D point in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapPoint3d {
    /// Point3d id
    pub point3d_id: u64,
    /// x, y, z coordinates
    pub xyz: [f64; 3],
    /// rgb color
    pub rgb: [u8; 3],
    /// reprojection error
    pub error: f64,
    /// Number of observations
    pub track_len: usize,
}

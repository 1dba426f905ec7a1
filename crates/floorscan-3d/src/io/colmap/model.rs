use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use super::{read_cameras_txt, read_images_txt, read_points3d_txt, ColmapError};

/// Storage format of a sparse model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// `cameras.bin`, `images.bin`, `points3D.bin`
    Binary,
    /// `cameras.txt`, `images.txt`, `points3D.txt`
    Text,
}

impl ModelFormat {
    fn extension(&self) -> &'static str {
        match self {
            ModelFormat::Binary => "bin",
            ModelFormat::Text => "txt",
        }
    }
}

/// Number of entities stored in a sparse model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSummary {
    /// Number of cameras.
    pub cameras: u64,
    /// Number of registered images.
    pub images: u64,
    /// Number of 3D points.
    pub points: u64,
}

/// A sparse model directory written by the COLMAP mapper, e.g. `sparse/0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseModel {
    dir: PathBuf,
    format: ModelFormat,
}

impl SparseModel {
    /// Open a model directory, preferring the binary files when both sets exist.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ColmapError> {
        let dir = dir.as_ref();
        for format in [ModelFormat::Binary, ModelFormat::Text] {
            let model = Self {
                dir: dir.to_path_buf(),
                format,
            };
            if model.files().iter().all(|f| f.is_file()) {
                return Ok(model);
            }
        }
        Err(ColmapError::IncompleteModel(dir.to_path_buf()))
    }

    /// The model directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The storage format.
    pub fn format(&self) -> ModelFormat {
        self.format
    }

    /// Paths of the cameras, images and points files.
    pub fn files(&self) -> [PathBuf; 3] {
        let ext = self.format.extension();
        [
            self.dir.join(format!("cameras.{ext}")),
            self.dir.join(format!("images.{ext}")),
            self.dir.join(format!("points3D.{ext}")),
        ]
    }

    /// Count the model entities.
    ///
    /// Binary files start with a little endian `u64` entity count, so only eight bytes
    /// per file are read. Text files are parsed in full.
    pub fn summary(&self) -> Result<ModelSummary, ColmapError> {
        let [cameras, images, points] = self.files();
        match self.format {
            ModelFormat::Binary => Ok(ModelSummary {
                cameras: read_binary_count(&cameras)?,
                images: read_binary_count(&images)?,
                points: read_binary_count(&points)?,
            }),
            ModelFormat::Text => Ok(ModelSummary {
                cameras: read_cameras_txt(&cameras)?.len() as u64,
                images: read_images_txt(&images)?.len() as u64,
                points: read_points3d_txt(&points)?.len() as u64,
            }),
        }
    }
}

fn read_binary_count(path: &Path) -> Result<u64, ColmapError> {
    let mut buf = [0u8; 8];
    File::open(path)?.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_binary_model() -> Result<(), ColmapError> {
        let tmp = tempfile::tempdir()?;
        for (name, count) in [("cameras", 1u64), ("images", 12), ("points3D", 3456)] {
            let mut data = count.to_le_bytes().to_vec();
            data.extend_from_slice(&[0u8; 16]);
            std::fs::write(tmp.path().join(format!("{name}.bin")), data)?;
        }

        let model = SparseModel::open(tmp.path())?;
        assert_eq!(model.format(), ModelFormat::Binary);
        assert_eq!(
            model.summary()?,
            ModelSummary {
                cameras: 1,
                images: 12,
                points: 3456
            }
        );
        Ok(())
    }

    #[test]
    fn test_open_text_model() -> Result<(), ColmapError> {
        let tmp = tempfile::tempdir()?;
        std::fs::write(
            tmp.path().join("cameras.txt"),
            "# header\n1 SIMPLE_PINHOLE 100 100 80 50 50\n",
        )?;
        std::fs::write(
            tmp.path().join("images.txt"),
            "1 1 0 0 0 0 0 0 1 a.jpg\n1.0 2.0 1\n",
        )?;
        std::fs::write(
            tmp.path().join("points3D.txt"),
            "1 0 0 0 0 0 0 0.5 1 0\n2 1 1 1 0 0 0 0.5 1 1\n",
        )?;

        let model = SparseModel::open(tmp.path())?;
        assert_eq!(model.format(), ModelFormat::Text);
        let summary = model.summary()?;
        assert_eq!(summary.images, 1);
        assert_eq!(summary.points, 2);
        Ok(())
    }

    #[test]
    fn test_incomplete_model() -> Result<(), ColmapError> {
        let tmp = tempfile::tempdir()?;
        std::fs::write(tmp.path().join("cameras.bin"), [0u8; 8])?;
        assert!(matches!(
            SparseModel::open(tmp.path()),
            Err(ColmapError::IncompleteModel(_))
        ));
        Ok(())
    }
}

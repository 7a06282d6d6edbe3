use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use log::info;
use nalgebra::Matrix4;
use ndarray::{Array2, Ix2, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter};
use tempfile::NamedTempFile;

use crate::error::{McError, Result};
use crate::pointcloud::PointCloud;

const POINTS: &str = "points";
const COLORS: &str = "colors";
const TRANSFORMATION_MATRIX: &str = "transformation_matrix";

/// Contents of a capture archive.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Shape is (Nx3).
    pub points: Array2<f64>,
    /// Shape is (Nx3), values in [0, 1].
    pub colors: Array2<f64>,
    pub transformation_matrix: Matrix4<f64>,
}

/// `point_cloud_<serial>_<YYYYMMDD_HHMMSS>.npz`
pub fn archive_file_name(serial: &str, timestamp: &NaiveDateTime) -> String {
    format!(
        "point_cloud_{serial}_{}.npz",
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

fn archive_error<E: std::fmt::Display>(path: &Path) -> impl Fn(E) -> McError + '_ {
    move |err| McError::Archive(format!("{}: {err}", path.display()))
}

/// Writes a compressed archive with the `points`, `colors` and
/// `transformation_matrix` arrays.
///
/// The file is written next to `path` and renamed into place, so a failed
/// write never leaves a partial archive behind.
pub fn write_archive(path: &Path, cloud: &PointCloud, matrix: &Matrix4<f64>) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;

    let transformation = Array2::from_shape_fn((4, 4), |(r, c)| matrix[(r, c)]);
    {
        let mut npz = NpzWriter::new_compressed(tmp.as_file_mut());
        npz.add_array(POINTS, &cloud.points)
            .map_err(archive_error(path))?;
        npz.add_array(COLORS, &cloud.colors)
            .map_err(archive_error(path))?;
        npz.add_array(TRANSFORMATION_MATRIX, &transformation)
            .map_err(archive_error(path))?;
        npz.finish().map_err(archive_error(path))?;
    }

    tmp.persist(path).map_err(|err| McError::Io(err.error))?;
    info!("Wrote {} points to {}", cloud.len(), path.display());
    Ok(())
}

fn read_array(npz: &mut NpzReader<File>, name: &str, path: &Path) -> Result<Array2<f64>> {
    if let Ok(array) = npz.by_name::<OwnedRepr<f64>, Ix2>(&format!("{name}.npy")) {
        return Ok(array);
    }
    npz.by_name(name).map_err(archive_error(path))
}

/// Reads an archive written by [`write_archive`].
pub fn read_archive(path: &Path) -> Result<Archive> {
    let mut npz = NpzReader::new(File::open(path)?).map_err(archive_error(path))?;

    let points = read_array(&mut npz, POINTS, path)?;
    let colors = read_array(&mut npz, COLORS, path)?;
    let transformation = read_array(&mut npz, TRANSFORMATION_MATRIX, path)?;
    if transformation.dim() != (4, 4) {
        return Err(McError::Archive(format!(
            "{}: transformation_matrix has shape {:?}",
            path.display(),
            transformation.dim()
        )));
    }

    Ok(Archive {
        points,
        colors,
        transformation_matrix: Matrix4::from_fn(|r, c| transformation[(r, c)]),
    })
}

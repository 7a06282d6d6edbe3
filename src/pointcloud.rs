use itertools::izip;
use log::debug;
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use serde_derive::Deserialize;

use crate::error::{McError, Result};
use crate::genicam::buffer::Component;
use crate::transform::Transform;

/// How gray values are mapped to [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureNormalization {
    /// Divide by the largest value of the pixel format.
    #[default]
    FullScale,
    /// Stretch the observed minimum and maximum to 0 and 1.
    MinMax,
}

/// Options of [`PointCloud::from_components`].
#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions {
    pub texture: TextureNormalization,
    /// Drop pixels without reconstruction, (0, 0, 0), together with their color.
    pub skip_invalid_points: bool,
}

/// Colored points, one row per point.
#[derive(Debug, Clone)]
pub struct PointCloud {
    /// The 3D points. Shape is (Nx3).
    pub points: Array2<f64>,
    /// RGB colors in [0, 1], aligned with `points`. Shape is (Nx3).
    pub colors: Array2<f64>,
}

/// Flattens a (height, width, 3) coordinate grid into rows, in row-major pixel order.
pub fn create_3d_vector(range: &ArrayView3<f32>) -> Array2<f64> {
    let (height, width, _) = range.dim();
    Array2::from_shape_fn((height * width, 3), |(i, c)| {
        range[(i / width, i % width, c)] as f64
    })
}

/// Gray texture as RGB rows in [0, 1], in row-major pixel order.
pub fn map_texture(intensity: &Component, normalization: TextureNormalization) -> Result<Array2<f64>> {
    let gray = intensity.as_mono()?;
    let (offset, scale) = match normalization {
        TextureNormalization::FullScale => {
            let max = intensity.pixel_format.max_value().ok_or_else(|| {
                McError::invalid_parameter(format!(
                    "{} has no gray range",
                    intensity.pixel_format.name()
                ))
            })?;
            (0.0, 1.0 / max)
        }
        TextureNormalization::MinMax => {
            let (min, max) = min_max(&gray);
            if max > min {
                (min, 1.0 / (max - min))
            } else {
                (min, 0.0)
            }
        }
    };

    let width = gray.ncols();
    Ok(Array2::from_shape_fn((gray.len(), 3), |(i, _)| {
        let value = gray[(i / width, i % width)] as f64;
        ((value - offset) * scale).clamp(0.0, 1.0)
    }))
}

fn min_max(gray: &ArrayView2<u16>) -> (f64, f64) {
    gray.iter().fold((f64::MAX, f64::MIN), |(min, max), value| {
        let value = *value as f64;
        (min.min(value), max.max(value))
    })
}

impl PointCloud {
    pub fn new(points: Array2<f64>, colors: Array2<f64>) -> Result<Self> {
        if points.ncols() != 3 || colors.ncols() != 3 {
            return Err(McError::invalid_parameter(
                "points and colors must have 3 columns",
            ));
        }
        if points.nrows() != colors.nrows() {
            return Err(McError::invalid_parameter(format!(
                "{} points but {} colors",
                points.nrows(),
                colors.nrows()
            )));
        }
        Ok(Self { points, colors })
    }

    /// Builds the cloud of a range component textured by an intensity component.
    ///
    /// # Arguments
    ///
    /// * `range` - Calibrated coordinate grid.
    /// * `intensity` - Gray image on the same grid.
    /// * `options` - Texture mapping and invalid point handling.
    pub fn from_components(
        range: &Component,
        intensity: &Component,
        options: &AssemblyOptions,
    ) -> Result<Self> {
        if range.shape() != intensity.shape() {
            return Err(McError::ShapeMismatch {
                range: range.shape(),
                intensity: intensity.shape(),
            });
        }

        let points = create_3d_vector(&range.as_coord3d()?);
        let colors = map_texture(intensity, options.texture)?;
        let cloud = Self::new(points, colors)?;

        if options.skip_invalid_points {
            let valid = cloud.retain_valid();
            debug!("Kept {} of {} points", valid.len(), cloud.len());
            Ok(valid)
        } else {
            Ok(cloud)
        }
    }

    pub fn len(&self) -> usize {
        self.points.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy without the points at the origin, which mark missing reconstruction.
    pub fn retain_valid(&self) -> Self {
        let keep: Vec<usize> = self
            .points
            .outer_iter()
            .enumerate()
            .filter(|(_, point)| point.iter().any(|v| *v != 0.0))
            .map(|(i, _)| i)
            .collect();

        Self {
            points: self.points.select(Axis(0), &keep),
            colors: self.colors.select(Axis(0), &keep),
        }
    }

    /// Applies `transform` to every point. Colors are untouched.
    pub fn transform(&mut self, transform: &Transform) -> &mut Self {
        let points = std::mem::take(&mut self.points);
        self.points = transform.transform(points);
        self
    }

    /// Iterates over (point, color) pairs.
    pub fn iter(&self) -> impl Iterator<Item = ([f64; 3], [f64; 3])> + '_ {
        izip!(self.points.outer_iter(), self.colors.outer_iter())
            .map(|(p, c)| ([p[0], p[1], p[2]], [c[0], c[1], c[2]]))
    }
}

impl std::ops::Mul<&PointCloud> for &Transform {
    type Output = PointCloud;
    fn mul(self, rhs: &PointCloud) -> PointCloud {
        PointCloud {
            points: self * &rhs.points,
            colors: rhs.colors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array3};
    use rstest::*;

    use super::*;
    use crate::genicam::buffer::PixelFormat;

    #[fixture]
    fn range() -> Component {
        let mut grid = Array3::<f32>::zeros((2, 3, 3));
        for row in 0..2 {
            for col in 0..3 {
                if (row, col) != (0, 0) {
                    grid[(row, col, 0)] = col as f32;
                    grid[(row, col, 1)] = row as f32;
                    grid[(row, col, 2)] = 10.0;
                }
            }
        }
        Component::coord3d(grid)
    }

    #[fixture]
    fn intensity() -> Component {
        Component::mono(
            PixelFormat::Mono8,
            array![[0u16, 51, 102], [153, 204, 255]],
        )
    }

    #[rstest]
    fn should_flatten_row_major(range: Component) {
        let points = create_3d_vector(&range.as_coord3d().unwrap());
        assert_eq!(points.dim(), (6, 3));
        assert_eq!(points.row(4).to_vec(), vec![1.0, 1.0, 10.0]);
    }

    #[rstest]
    fn should_normalize_full_scale(intensity: Component) {
        let colors = map_texture(&intensity, TextureNormalization::FullScale).unwrap();
        assert_abs_diff_eq!(colors.column(0).to_owned(), array![0.0, 0.2, 0.4, 0.6, 0.8, 1.0], epsilon = 1e-12);
        assert_eq!(colors.column(0), colors.column(2));
    }

    #[test]
    fn should_stretch_min_max() {
        let intensity = Component::mono(PixelFormat::Mono12, array![[100u16, 200], [300, 500]]);
        let colors = map_texture(&intensity, TextureNormalization::MinMax).unwrap();
        assert_abs_diff_eq!(colors.column(1).to_owned(), array![0.0, 0.25, 0.5, 1.0], epsilon = 1e-12);

        let flat = Component::mono(PixelFormat::Mono12, array![[7u16, 7]]);
        let colors = map_texture(&flat, TextureNormalization::MinMax).unwrap();
        assert!(colors.iter().all(|v| *v == 0.0));
    }

    #[rstest]
    fn should_pass_invalid_points_through(range: Component, intensity: Component) {
        let cloud =
            PointCloud::from_components(&range, &intensity, &AssemblyOptions::default()).unwrap();
        assert_eq!(cloud.len(), 6);
        assert_eq!(cloud.points.row(0).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[rstest]
    fn should_skip_invalid_points_with_colors(range: Component, intensity: Component) {
        let options = AssemblyOptions {
            skip_invalid_points: true,
            ..Default::default()
        };
        let cloud = PointCloud::from_components(&range, &intensity, &options).unwrap();
        assert_eq!(cloud.len(), 5);
        assert_abs_diff_eq!(cloud.colors[(0, 0)], 0.2, epsilon = 1e-12);
        assert_eq!(cloud.points.row(0).to_vec(), vec![1.0, 0.0, 10.0]);
    }

    #[rstest]
    fn should_reject_mismatched_grids(range: Component) {
        let intensity = Component::mono(PixelFormat::Mono8, Array2::zeros((3, 2)));
        assert!(matches!(
            PointCloud::from_components(&range, &intensity, &AssemblyOptions::default()),
            Err(McError::ShapeMismatch { .. })
        ));
    }

    #[rstest]
    fn should_transform_points_only(range: Component, intensity: Component) {
        let mut cloud =
            PointCloud::from_components(&range, &intensity, &AssemblyOptions::default()).unwrap();
        let colors = cloud.colors.clone();
        let mut matrix = nalgebra::Matrix4::identity();
        matrix[(0, 3)] = 5.0;
        cloud.transform(&Transform::from_matrix4(&matrix));

        assert_eq!(cloud.points.row(5).to_vec(), vec![7.0, 1.0, 10.0]);
        assert_eq!(cloud.colors, colors);
    }

    #[test]
    fn should_reject_unaligned_colors() {
        assert!(PointCloud::new(Array2::zeros((3, 3)), Array2::zeros((2, 3))).is_err());
    }
}

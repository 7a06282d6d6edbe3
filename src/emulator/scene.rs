use ndarray::{Array2, Array3};

use crate::genicam::buffer::PixelFormat;

/// Grid pitch of the synthetic scene at the working distance, in millimeters.
const PITCH_MM: f32 = 2.0;
const WORKING_DISTANCE_MM: f32 = 900.0;
const CHECKER_SIZE: usize = 4;

/// A tilted plane with a checkered marker in its middle, as seen by the
/// scanner. Pixels on the outer ring have no reconstruction and are zero.
pub struct SyntheticScene {
    pub width: usize,
    pub height: usize,
    pub intensity_format: PixelFormat,
}

impl SyntheticScene {
    /// Calibrated X, Y, Z per pixel with shape (height, width, 3).
    pub fn range(&self) -> Array3<f32> {
        let (cx, cy) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        let mut points = Array3::<f32>::zeros((self.height, self.width, 3));
        for row in 0..self.height {
            for col in 0..self.width {
                if self.is_shadowed(row, col) {
                    continue;
                }
                let x = (col as f32 - cx) * PITCH_MM;
                let y = (row as f32 - cy) * PITCH_MM;
                points[(row, col, 0)] = x;
                points[(row, col, 1)] = y;
                points[(row, col, 2)] = WORKING_DISTANCE_MM + 0.15 * y;
            }
        }
        points
    }

    /// Gray values with shape (height, width) in the range of `intensity_format`.
    pub fn intensity(&self) -> Array2<u16> {
        let max = self.intensity_format.max_value().unwrap_or(255.0);
        Array2::from_shape_fn((self.height, self.width), |(row, col)| {
            let level = if self.is_marker(row, col) {
                if (row / CHECKER_SIZE + col / CHECKER_SIZE) % 2 == 0 {
                    0.95
                } else {
                    0.05
                }
            } else {
                0.3 + 0.4 * col as f64 / self.width.max(1) as f64
            };
            (level * max).round() as u16
        })
    }

    fn is_shadowed(&self, row: usize, col: usize) -> bool {
        row == 0 || col == 0 || row + 1 >= self.height || col + 1 >= self.width
    }

    fn is_marker(&self, row: usize, col: usize) -> bool {
        let (top, left) = (self.height / 4, self.width / 4);
        row >= top && row < self.height - top && col >= left && col < self.width - left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SyntheticScene {
        SyntheticScene {
            width: 16,
            height: 12,
            intensity_format: PixelFormat::Mono12,
        }
    }

    #[test]
    fn should_share_grid_between_components() {
        let scene = scene();
        assert_eq!(scene.range().shape(), &[12, 16, 3]);
        assert_eq!(scene.intensity().dim(), (12, 16));
    }

    #[test]
    fn should_zero_the_outer_ring() {
        let range = scene().range();
        assert_eq!(range[(0, 5, 2)], 0.0);
        assert_eq!(range[(11, 5, 2)], 0.0);
        assert!(range[(5, 5, 2)] > 800.0);
    }

    #[test]
    fn should_stay_in_format_range() {
        let intensity = scene().intensity();
        assert!(intensity.iter().all(|v| *v <= 4095));
    }
}

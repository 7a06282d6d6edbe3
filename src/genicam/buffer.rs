use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use crate::error::{McError, Result};

/// Pixel formats of the payload parts delivered by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Mono8,
    Mono10,
    Mono12,
    Mono16,
    /// Three 32-bit floats per pixel, calibrated X, Y and Z.
    Coord3dAbc32f,
}

impl PixelFormat {
    /// Largest value a gray pixel can take, `None` for coordinate formats.
    pub fn max_value(&self) -> Option<f64> {
        match self {
            PixelFormat::Mono8 => Some(255.0),
            PixelFormat::Mono10 => Some(1023.0),
            PixelFormat::Mono12 => Some(4095.0),
            PixelFormat::Mono16 => Some(65535.0),
            PixelFormat::Coord3dAbc32f => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Mono8 => "Mono8",
            PixelFormat::Mono10 => "Mono10",
            PixelFormat::Mono12 => "Mono12",
            PixelFormat::Mono16 => "Mono16",
            PixelFormat::Coord3dAbc32f => "Coord3D_ABC32f",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ComponentData {
    /// Shape is (height, width, 3).
    Coord3d(Array3<f32>),
    /// Shape is (height, width).
    Mono(Array2<u16>),
}

/// One part of a multi-part payload.
#[derive(Debug, Clone)]
pub struct Component {
    pub pixel_format: PixelFormat,
    pub data: ComponentData,
}

impl Component {
    pub fn coord3d(data: Array3<f32>) -> Self {
        Self {
            pixel_format: PixelFormat::Coord3dAbc32f,
            data: ComponentData::Coord3d(data),
        }
    }

    pub fn mono(pixel_format: PixelFormat, data: Array2<u16>) -> Self {
        Self {
            pixel_format,
            data: ComponentData::Mono(data),
        }
    }

    /// Grid shape as (height, width).
    pub fn shape(&self) -> (usize, usize) {
        match &self.data {
            ComponentData::Coord3d(data) => (data.shape()[0], data.shape()[1]),
            ComponentData::Mono(data) => data.dim(),
        }
    }

    pub fn width(&self) -> usize {
        self.shape().1
    }

    pub fn height(&self) -> usize {
        self.shape().0
    }

    pub fn as_coord3d(&self) -> Result<ArrayView3<f32>> {
        match &self.data {
            ComponentData::Coord3d(data) => Ok(data.view()),
            ComponentData::Mono(_) => Err(McError::invalid_parameter(format!(
                "expected a coordinate component, got {}",
                self.pixel_format.name()
            ))),
        }
    }

    pub fn as_mono(&self) -> Result<ArrayView2<u16>> {
        match &self.data {
            ComponentData::Mono(data) => Ok(data.view()),
            ComponentData::Coord3d(_) => Err(McError::invalid_parameter(format!(
                "expected a gray component, got {}",
                self.pixel_format.name()
            ))),
        }
    }
}

/// Payload of one acquired frame. Parts are in the order the device sends them.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub frame_id: u64,
    pub components: Vec<Component>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_grid_shape() {
        let range = Component::coord3d(Array3::zeros((4, 6, 3)));
        let intensity = Component::mono(PixelFormat::Mono12, Array2::zeros((4, 6)));

        assert_eq!(range.shape(), (4, 6));
        assert_eq!(intensity.width(), 6);
        assert_eq!(intensity.height(), 4);
    }

    #[test]
    fn should_refuse_wrong_view() {
        let range = Component::coord3d(Array3::zeros((2, 2, 3)));
        assert!(range.as_mono().is_err());
        assert!(range.as_coord3d().is_ok());
        assert_eq!(range.pixel_format.max_value(), None);
    }
}

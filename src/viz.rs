//! Presentation of captured clouds.

use log::info;

use crate::error::Result;
use crate::pointcloud::PointCloud;

/// Shows one or more clouds to the user.
pub trait Viewer {
    fn render(&mut self, clouds: &[&PointCloud]) -> Result<()>;
}

/// Viewer that only logs what it would show.
#[derive(Debug, Default)]
pub struct NullViewer;

impl Viewer for NullViewer {
    fn render(&mut self, clouds: &[&PointCloud]) -> Result<()> {
        let points: usize = clouds.iter().map(|cloud| cloud.len()).sum();
        info!("Rendering skipped for {} cloud(s), {points} points", clouds.len());
        Ok(())
    }
}

#[cfg(feature = "viz")]
pub use self::rerun_viewer::RerunViewer;

#[cfg(feature = "viz")]
mod rerun_viewer {
    use super::Viewer;
    use crate::error::{McError, Result};
    use crate::pointcloud::PointCloud;

    /// Streams clouds to a spawned Rerun viewer.
    pub struct RerunViewer {
        rec: rerun::RecordingStream,
    }

    impl RerunViewer {
        pub fn spawn(application_id: &str) -> Result<Self> {
            let rec = rerun::RecordingStreamBuilder::new(application_id)
                .spawn()
                .map_err(|err| McError::Viewer(err.to_string()))?;
            Ok(Self { rec })
        }
    }

    fn to_u8(value: f64) -> u8 {
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    impl Viewer for RerunViewer {
        fn render(&mut self, clouds: &[&PointCloud]) -> Result<()> {
            for (i, cloud) in clouds.iter().enumerate() {
                let (points, colors): (Vec<_>, Vec<_>) = cloud
                    .iter()
                    .map(|(p, c)| {
                        (
                            rerun::Position3D::new(p[0] as f32, p[1] as f32, p[2] as f32),
                            rerun::Color::from_rgb(to_u8(c[0]), to_u8(c[1]), to_u8(c[2])),
                        )
                    })
                    .unzip();

                self.rec
                    .log(
                        format!("pointcloud/{i}"),
                        &rerun::Points3D::new(points).with_colors(colors),
                    )
                    .map_err(|err| McError::Viewer(err.to_string()))?;
            }
            Ok(())
        }
    }
}

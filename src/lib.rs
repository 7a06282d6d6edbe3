pub mod config;
pub mod emulator;
pub mod error;
pub mod genicam;
pub mod io;
pub mod pipeline;
pub mod pointcloud;
pub mod transform;
pub mod viz;

pub use config::CaptureConfig;
pub use error::{McError, Result};
pub use pipeline::{acquire, capture_marker_space_cloud, publish, Capture};
pub use pointcloud::PointCloud;

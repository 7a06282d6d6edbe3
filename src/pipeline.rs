//! The single shot capture: session, configuration, trigger, extraction,
//! assembly and output.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::info;
use nalgebra::Matrix4;

use crate::config::CaptureConfig;
use crate::error::Result;
use crate::genicam::chunks::{parse_chunk_selector, transformation_matrix_from_chunk};
use crate::genicam::components::{enabled_components, ComponentMap};
use crate::genicam::configure::{apply_configuration, marker_space_configuration};
use crate::genicam::features::CHUNK_CAMERA_TO_COORDINATE_SPACE;
use crate::genicam::transport::{Harvester, Producer};
use crate::io::{archive_file_name, write_archive};
use crate::pointcloud::PointCloud;
use crate::transform::Transform;
use crate::viz::Viewer;

/// Source of the timestamp in archive names.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Result of one capture, detached from the device.
#[derive(Debug, Clone)]
pub struct Capture {
    pub serial_number: String,
    /// Camera to marker space transformation read from the chunk data.
    pub transformation_matrix: Matrix4<f64>,
    /// The cloud, already expressed in marker space.
    pub cloud: PointCloud,
}

/// Acquires one frame from the device `serial_number` and assembles its
/// marker space point cloud.
///
/// The harvester must have its producer loaded. The session, the
/// acquisition and the fetched buffer are released before this returns,
/// whether it succeeds or not.
pub fn capture_marker_space_cloud<P: Producer>(
    harvester: &mut Harvester<P>,
    serial_number: &str,
    config: &CaptureConfig,
) -> Result<Capture> {
    harvester.update()?;
    let mut acquirer = harvester.create(serial_number)?;

    let plan = marker_space_configuration(acquirer.features().schema(), &config.components)?;
    apply_configuration(&mut acquirer.features(), &plan)?;

    acquirer.start()?;
    acquirer.features().execute("TriggerSoftware")?;

    // Without a recognized marker the device never delivers the frame, so
    // this is where a missing marker shows up, as a timeout.
    let mut buffer = acquirer.fetch(config.fetch_timeout()?)?;

    let (names, chunk) = {
        let mut features = buffer.features();
        let names = enabled_components(&mut features)?;
        let chunk = parse_chunk_selector(&mut features, CHUNK_CAMERA_TO_COORDINATE_SPACE)?;
        (names, chunk)
    };
    let transformation_matrix = transformation_matrix_from_chunk(&chunk)?;

    let components = ComponentMap::new(&names, &buffer.payload().components);
    let intensity = components.get("Intensity")?;
    let range = components.get("Range")?;

    let mut cloud = PointCloud::from_components(range, intensity, &config.assembly_options())?;
    cloud.transform(&Transform::from_matrix4(&transformation_matrix));
    info!("Assembled {} points in marker space", cloud.len());

    Ok(Capture {
        serial_number: serial_number.to_string(),
        transformation_matrix,
        cloud,
    })
}

/// Writes `capture` into `output_dir` under its timestamped name.
pub fn save_capture(capture: &Capture, output_dir: &Path, clock: &dyn Clock) -> Result<PathBuf> {
    let path = output_dir.join(archive_file_name(&capture.serial_number, &clock.now()));
    write_archive(&path, &capture.cloud, &capture.transformation_matrix)?;
    Ok(path)
}

/// Loads the producer configured in `config`, captures one frame from
/// `serial_number` and releases the producer again.
pub fn acquire<P: Producer>(
    producer: P,
    serial_number: &str,
    config: &CaptureConfig,
) -> Result<Capture> {
    let mut harvester = Harvester::new(producer);
    harvester.add_file(config.producer_path()?, true, true)?;
    capture_marker_space_cloud(&mut harvester, serial_number, config)
}

/// Shows `capture` when rendering is enabled, then saves it into the
/// configured output directory and returns the archive path.
pub fn publish(
    capture: &Capture,
    config: &CaptureConfig,
    viewer: &mut dyn Viewer,
    clock: &dyn Clock,
) -> Result<PathBuf> {
    if config.render {
        viewer.render(&[&capture.cloud])?;
    }
    save_capture(capture, &config.output_dir, clock)
}

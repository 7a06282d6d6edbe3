use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use marker_cloud::{
    config::CaptureConfig,
    emulator::VirtualProducer,
    pipeline::{acquire, publish, LocalClock},
    viz::Viewer,
    Result,
};

#[derive(Parser)]
#[command(version, about = "Captures one point cloud in marker space and saves it as .npz")]
struct Args {
    /// Serial number of the device
    device_serial: Option<String>,
    /// JSON capture configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// GenTL producer file, overrides $PHOXI_CONTROL_PATH
    #[arg(long)]
    producer: Option<PathBuf>,
    /// Directory receiving the archive
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Fetch timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,
    /// Skips the viewer
    #[arg(long, action)]
    no_render: bool,
    /// Drops pixels without reconstruction
    #[arg(long, action)]
    skip_invalid: bool,
}

impl Args {
    fn capture_config(&self) -> Result<CaptureConfig> {
        let mut config = match &self.config {
            Some(path) => CaptureConfig::from_json_file(path)?,
            None => CaptureConfig::default(),
        };
        if let Some(producer) = &self.producer {
            config.producer_path = Some(producer.clone());
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(timeout) = self.timeout {
            config.fetch_timeout_secs = timeout;
        }
        if self.no_render {
            config.render = false;
        }
        if self.skip_invalid {
            config.skip_invalid_points = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "viz")]
fn viewer(config: &CaptureConfig) -> Result<Box<dyn Viewer>> {
    if config.render {
        Ok(Box::new(marker_cloud::viz::RerunViewer::spawn(
            "pointcloud_with_marker_space",
        )?))
    } else {
        Ok(Box::new(marker_cloud::viz::NullViewer))
    }
}

#[cfg(not(feature = "viz"))]
fn viewer(config: &CaptureConfig) -> Result<Box<dyn Viewer>> {
    if config.render {
        log::warn!(
            "Rendering requested but this build has no viewer, rebuild with --features viz or pass --no-render"
        );
    }
    Ok(Box::new(marker_cloud::viz::NullViewer))
}

fn capture(args: &Args, serial: &str) -> Result<PathBuf> {
    let config = args.capture_config()?;
    let mut viewer = viewer(&config)?;
    let capture = acquire(
        VirtualProducer::new(config.virtual_devices.clone()),
        serial,
        &config,
    )?;

    println!("Transformation Matrix:");
    println!("{}", capture.transformation_matrix);

    let path = publish(&capture, &config, viewer.as_mut(), &LocalClock)?;
    println!("All data saved to {}", path.display());
    Ok(path)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let Some(serial) = args.device_serial.as_deref() else {
        println!("Error: no device given, please run it with the device serial number as argument:");
        println!("    pointcloud_with_marker_space <device serial>");
        return ExitCode::from(1);
    };

    match capture(&args, serial) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            println!("An error occurred: {err}");
            ExitCode::from(1)
        }
    }
}

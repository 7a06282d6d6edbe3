use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_derive::Deserialize;

use crate::emulator::VirtualDeviceSpec;
use crate::error::{McError, Result};
use crate::genicam::producer::default_producer_path;
use crate::pointcloud::{AssemblyOptions, TextureNormalization};

/// Settings of one capture. Every field has a default, so an empty JSON
/// object is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// GenTL producer file. Resolved from `PHOXI_CONTROL_PATH` when unset.
    pub producer_path: Option<PathBuf>,
    pub fetch_timeout_secs: f64,
    /// Components to enable. The capture needs `Intensity` and `Range`.
    pub components: Vec<String>,
    pub output_dir: PathBuf,
    pub skip_invalid_points: bool,
    pub texture: TextureNormalization,
    pub render: bool,
    pub virtual_devices: Vec<VirtualDeviceSpec>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            producer_path: None,
            fetch_timeout_secs: 10.0,
            components: vec!["Intensity".to_string(), "Range".to_string()],
            output_dir: PathBuf::from("."),
            skip_invalid_points: false,
            texture: TextureNormalization::FullScale,
            render: true,
            virtual_devices: vec![VirtualDeviceSpec::default()],
        }
    }
}

impl CaptureConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| McError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        let config: Self = serde_json::from_reader(reader)
            .map_err(|err| McError::Config(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.fetch_timeout()?;
        if self.components.is_empty() {
            return Err(McError::Config("components must not be empty".to_string()));
        }
        Ok(())
    }

    /// The fetch timeout. Fails unless `fetch_timeout_secs` is a positive
    /// number of seconds that fits a [`Duration`].
    pub fn fetch_timeout(&self) -> Result<Duration> {
        let invalid = || {
            McError::Config(format!(
                "fetch_timeout_secs must be a positive duration, got {}",
                self.fetch_timeout_secs
            ))
        };
        let timeout = Duration::try_from_secs_f64(self.fetch_timeout_secs).map_err(|_| invalid())?;
        if timeout.is_zero() {
            return Err(invalid());
        }
        Ok(timeout)
    }

    pub fn producer_path(&self) -> Result<PathBuf> {
        match &self.producer_path {
            Some(path) => Ok(path.clone()),
            None => default_producer_path(),
        }
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            texture: self.texture,
            skip_invalid_points: self.skip_invalid_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_ten_second_timeout() {
        let config = CaptureConfig::from_json_str("{}").unwrap();
        assert_eq!(config.fetch_timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(config.components, vec!["Intensity", "Range"]);
        assert_eq!(config.virtual_devices.len(), 1);
        assert!(config.render);
    }

    #[test]
    fn should_read_overrides() {
        let config = CaptureConfig::from_json_str(
            r#"{
                "fetch_timeout_secs": 0.5,
                "texture": "min_max",
                "skip_invalid_points": true,
                "virtual_devices": [{"serial_number": "1711004", "marker_visible": false}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.fetch_timeout().unwrap(), Duration::from_millis(500));
        assert_eq!(config.texture, TextureNormalization::MinMax);
        assert!(config.assembly_options().skip_invalid_points);
        assert_eq!(config.virtual_devices[0].serial_number, "1711004");
        assert!(!config.virtual_devices[0].marker_visible);
        assert_eq!(config.virtual_devices[0].width, 64);
    }

    #[test]
    fn should_reject_bad_values() {
        assert!(matches!(
            CaptureConfig::from_json_str(r#"{"fetch_timeout_secs": 0}"#),
            Err(McError::Config(_))
        ));
        assert!(CaptureConfig::from_json_str(r#"{"fetch_timeout_secs": -1.5}"#).is_err());
        assert!(CaptureConfig::from_json_str(r#"{"components": []}"#).is_err());
        assert!(CaptureConfig::from_json_str(r#"{"timeout": 3}"#).is_err());
    }

    #[test]
    fn should_reject_timeout_beyond_duration_range() {
        assert!(matches!(
            CaptureConfig::from_json_str(r#"{"fetch_timeout_secs": 1e20}"#),
            Err(McError::Config(_))
        ));

        let config = CaptureConfig {
            fetch_timeout_secs: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(config.fetch_timeout().is_err());
    }

    #[test]
    fn should_prefer_explicit_producer() {
        let config = CaptureConfig {
            producer_path: Some(PathBuf::from("/opt/producer.cti")),
            ..Default::default()
        };
        assert_eq!(
            config.producer_path().unwrap(),
            PathBuf::from("/opt/producer.cti")
        );
    }
}

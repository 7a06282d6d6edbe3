use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use super::buffer::Buffer;
use super::features::FeatureSchema;
use super::node_map::{Features, NodeMap};
use super::producer::validate_producer_file;
use crate::error::{McError, Result};

/// Identification of a discovered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub vendor: String,
    pub model: String,
    pub serial_number: String,
}

/// A GenTL consumer backend: loads producer files and opens devices.
pub trait Producer {
    type Device: RemoteDevice;

    fn load(&mut self, path: &Path) -> Result<()>;
    fn discover(&mut self) -> Result<Vec<DeviceInfo>>;
    fn open(&mut self, info: &DeviceInfo) -> Result<Self::Device>;
    /// Unloads every producer file.
    fn release(&mut self) -> Result<()>;
}

/// An opened device with its data stream.
pub trait RemoteDevice {
    fn info(&self) -> &DeviceInfo;
    fn schema(&self) -> &'static FeatureSchema;
    fn node_map(&mut self) -> &mut dyn NodeMap;
    fn start_acquisition(&mut self) -> Result<()>;
    fn stop_acquisition(&mut self) -> Result<()>;
    /// Waits at most `timeout` for the next buffer.
    fn fetch(&mut self, timeout: Duration) -> Result<Buffer>;
    /// Gives a fetched buffer back to the stream.
    fn queue(&mut self, frame_id: u64) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Entry point of the transport layer: holds the loaded producers and the
/// list of discovered devices. Producers are released on drop.
pub struct Harvester<P: Producer> {
    producer: P,
    files: Vec<PathBuf>,
    devices: Vec<DeviceInfo>,
}

impl<P: Producer> Harvester<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            files: Vec::new(),
            devices: Vec::new(),
        }
    }

    /// Adds a producer file, see [`validate_producer_file`].
    pub fn add_file<F: AsRef<Path>>(
        &mut self,
        path: F,
        check_existence: bool,
        check_validity: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        validate_producer_file(path, check_existence, check_validity)?;
        self.producer.load(path)?;
        info!("Loaded GenTL producer {}", path.display());
        self.files.push(path.to_path_buf());
        Ok(())
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Refreshes the list of available devices.
    pub fn update(&mut self) -> Result<()> {
        if self.files.is_empty() {
            return Err(McError::Connection("no GenTL producer loaded".to_string()));
        }
        self.devices = self.producer.discover()?;
        debug!("Discovered {} device(s)", self.devices.len());
        Ok(())
    }

    pub fn device_info_list(&self) -> &[DeviceInfo] {
        &self.devices
    }

    /// Opens a session on the device with the given serial number.
    ///
    /// The session borrows the harvester, so it is always closed before the
    /// producers are released.
    pub fn create(&mut self, serial_number: &str) -> Result<ImageAcquirer<'_, P::Device>> {
        let info = self
            .devices
            .iter()
            .find(|info| info.serial_number == serial_number)
            .cloned()
            .ok_or_else(|| McError::DeviceNotFound(serial_number.to_string()))?;
        let device = self.producer.open(&info)?;
        info!("Opened {} {} ({})", info.vendor, info.model, info.serial_number);
        Ok(ImageAcquirer {
            device,
            acquiring: false,
            _harvester: PhantomData,
        })
    }
}

impl<P: Producer> Drop for Harvester<P> {
    fn drop(&mut self) {
        if let Err(err) = self.producer.release() {
            warn!("Failed to release GenTL producer: {err}");
        }
    }
}

/// A device session. Acquisition is stopped and the device closed on drop.
pub struct ImageAcquirer<'h, D: RemoteDevice> {
    device: D,
    acquiring: bool,
    _harvester: PhantomData<&'h mut ()>,
}

impl<'h, D: RemoteDevice> ImageAcquirer<'h, D> {
    pub fn device_info(&self) -> &DeviceInfo {
        self.device.info()
    }

    /// The remote device feature map.
    pub fn features(&mut self) -> Features<'_> {
        let schema = self.device.schema();
        Features::new(self.device.node_map(), schema)
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    pub fn start(&mut self) -> Result<()> {
        if !self.acquiring {
            self.device.start_acquisition()?;
            self.acquiring = true;
            debug!("Acquisition started");
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.acquiring {
            self.acquiring = false;
            self.device.stop_acquisition()?;
            debug!("Acquisition stopped");
        }
        Ok(())
    }

    /// Blocks for at most `timeout` waiting for one buffer.
    pub fn fetch(&mut self, timeout: Duration) -> Result<FetchedBuffer<'_, D>> {
        if !self.acquiring {
            return Err(McError::invalid_parameter(
                "fetch requires a started acquisition",
            ));
        }
        let buffer = self.device.fetch(timeout)?;
        debug!(
            "Fetched frame {} with {} component(s)",
            buffer.frame_id,
            buffer.components.len()
        );
        Ok(FetchedBuffer {
            device: &mut self.device,
            buffer,
        })
    }
}

impl<'h, D: RemoteDevice> Drop for ImageAcquirer<'h, D> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!("Failed to stop acquisition: {err}");
        }
        if let Err(err) = self.device.close() {
            warn!("Failed to close device: {err}");
        }
    }
}

/// A buffer on loan from the stream. It goes back to the stream on drop.
pub struct FetchedBuffer<'a, D: RemoteDevice> {
    device: &'a mut D,
    buffer: Buffer,
}

impl<'a, D: RemoteDevice> FetchedBuffer<'a, D> {
    pub fn payload(&self) -> &Buffer {
        &self.buffer
    }

    /// Feature map of the device, with the chunk data of this buffer attached.
    pub fn features(&mut self) -> Features<'_> {
        let schema = self.device.schema();
        Features::new(self.device.node_map(), schema)
    }
}

impl<'a, D: RemoteDevice> Drop for FetchedBuffer<'a, D> {
    fn drop(&mut self) {
        if let Err(err) = self.device.queue(self.buffer.frame_id) {
            warn!("Failed to queue buffer {}: {err}", self.buffer.frame_id);
        }
    }
}

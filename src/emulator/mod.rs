//! A virtual structured-light scanner behind the GenTL consumer traits.
//!
//! The virtual device follows the firmware rules the capture depends on:
//! software trigger gating, per-component enablement, chunk attachment and
//! marker recognition. When marker recognition is requested in marker space
//! and no marker is visible, the frame is never delivered and the fetch runs
//! into its timeout.

mod registry;
pub use registry::SchemaNodeMap;

mod scene;
pub use scene::SyntheticScene;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use log::debug;
use nalgebra::Matrix4;
use ndarray::{Array2, Array3, Axis};
use serde_derive::Deserialize;

use crate::error::{McError, Result};
use crate::genicam::buffer::{Buffer, Component, PixelFormat};
use crate::genicam::chunks::encode_transformation;
use crate::genicam::features::{
    chunk_feature_name, FeatureSchema, FeatureValue, CHUNK_CAMERA_TO_COORDINATE_SPACE,
    PHOXI_SCHEMA,
};
use crate::genicam::node_map::NodeMap;
use crate::genicam::transport::{DeviceInfo, Producer, RemoteDevice};

/// Features the firmware refuses to change while acquisition runs.
const LOCKED_WHILE_ACQUIRING: &[&str] = &[
    "UserSetLoad",
    "ComponentEnable",
    "Scan3dOutputMode",
    "RecognizeMarkers",
    "CoordinateSpace",
    "ChunkModeActive",
    "ChunkEnable",
];

/// Components enabled by the factory user set.
const FACTORY_COMPONENTS: &[&str] = &["Intensity", "Range", "Normal"];

/// Description of one virtual device.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirtualDeviceSpec {
    pub serial_number: String,
    pub model: String,
    pub width: usize,
    pub height: usize,
    /// Bit depth of the intensity component: 8, 10, 12 or 16.
    pub intensity_bits: u8,
    /// Whether a marker is in the field of view.
    pub marker_visible: bool,
    /// Camera to marker space transformation, row-major.
    pub marker_pose: [[f64; 4]; 4],
    /// Time between trigger and buffer delivery.
    pub latency_ms: u64,
}

impl Default for VirtualDeviceSpec {
    fn default() -> Self {
        Self {
            serial_number: "PHOXI-VIRTUAL-0001".to_string(),
            model: "PhoXi 3D Scanner M (virtual)".to_string(),
            width: 64,
            height: 48,
            intensity_bits: 12,
            marker_visible: true,
            marker_pose: [
                [0.866_025_403_784_438_6, -0.5, 0.0, -35.0],
                [0.5, 0.866_025_403_784_438_6, 0.0, 12.5],
                [0.0, 0.0, 1.0, -900.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            latency_ms: 0,
        }
    }
}

impl VirtualDeviceSpec {
    pub fn with_serial<S: Into<String>>(serial_number: S) -> Self {
        Self {
            serial_number: serial_number.into(),
            ..Default::default()
        }
    }

    pub fn marker_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|row, col| self.marker_pose[row][col])
    }

    pub fn intensity_format(&self) -> Result<PixelFormat> {
        match self.intensity_bits {
            8 => Ok(PixelFormat::Mono8),
            10 => Ok(PixelFormat::Mono10),
            12 => Ok(PixelFormat::Mono12),
            16 => Ok(PixelFormat::Mono16),
            bits => Err(McError::invalid_parameter(format!(
                "unsupported intensity bit depth {bits}"
            ))),
        }
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            id: format!("virtual:{}", self.serial_number),
            vendor: "Photoneo".to_string(),
            model: self.model.clone(),
            serial_number: self.serial_number.clone(),
        }
    }
}

/// What happened on the virtual transport, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Loaded(PathBuf),
    Opened(String),
    AcquisitionStarted,
    TriggerExecuted(u64),
    AcquisitionStopped,
    BufferQueued(u64),
    Closed(String),
    Released,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// GenTL consumer that serves [`VirtualDevice`]s.
pub struct VirtualProducer {
    devices: Vec<VirtualDeviceSpec>,
    loaded: Vec<PathBuf>,
    events: EventLog,
}

impl VirtualProducer {
    pub fn new(devices: Vec<VirtualDeviceSpec>) -> Self {
        Self {
            devices,
            loaded: Vec::new(),
            events: EventLog::default(),
        }
    }

    /// Shared handle on the transport events.
    pub fn event_log(&self) -> EventLog {
        self.events.clone()
    }
}

impl Producer for VirtualProducer {
    type Device = VirtualDevice;

    fn load(&mut self, path: &Path) -> Result<()> {
        self.loaded.push(path.to_path_buf());
        self.events.borrow_mut().push(Event::Loaded(path.to_path_buf()));
        Ok(())
    }

    fn discover(&mut self) -> Result<Vec<DeviceInfo>> {
        if self.loaded.is_empty() {
            return Err(McError::Connection("no producer loaded".to_string()));
        }
        Ok(self.devices.iter().map(VirtualDeviceSpec::info).collect())
    }

    fn open(&mut self, info: &DeviceInfo) -> Result<VirtualDevice> {
        let spec = self
            .devices
            .iter()
            .find(|spec| spec.serial_number == info.serial_number)
            .cloned()
            .ok_or_else(|| McError::DeviceNotFound(info.serial_number.clone()))?;
        let device = VirtualDevice::new(spec, self.events.clone())?;
        self.events
            .borrow_mut()
            .push(Event::Opened(info.serial_number.clone()));
        Ok(device)
    }

    fn release(&mut self) -> Result<()> {
        self.loaded.clear();
        self.events.borrow_mut().push(Event::Released);
        Ok(())
    }
}

pub struct VirtualDevice {
    info: DeviceInfo,
    spec: VirtualDeviceSpec,
    scene: SyntheticScene,
    registry: SchemaNodeMap,
    events: EventLog,
    acquiring: bool,
    triggers: VecDeque<u64>,
    next_frame_id: u64,
    outstanding: Option<u64>,
    closed: bool,
}

impl VirtualDevice {
    pub fn new(spec: VirtualDeviceSpec, events: EventLog) -> Result<Self> {
        let scene = SyntheticScene {
            width: spec.width,
            height: spec.height,
            intensity_format: spec.intensity_format()?,
        };
        let mut device = Self {
            info: spec.info(),
            spec,
            scene,
            registry: SchemaNodeMap::new(&PHOXI_SCHEMA),
            events,
            acquiring: false,
            triggers: VecDeque::new(),
            next_frame_id: 0,
            outstanding: None,
            closed: false,
        };
        device.load_user_set()?;
        Ok(device)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(McError::Connection(format!(
                "device {} is closed",
                self.info.serial_number
            )));
        }
        Ok(())
    }

    fn ensure_unlocked(&self, name: &str) -> Result<()> {
        if self.acquiring && LOCKED_WHILE_ACQUIRING.iter().any(|locked| *locked == name) {
            return Err(McError::rejected(name, "locked while acquisition is running"));
        }
        Ok(())
    }

    fn enum_value(&self, name: &str) -> Result<String> {
        self.registry.read(name)?.as_enum().map(str::to_string).ok_or_else(|| {
            McError::rejected(name, "not an enumeration")
        })
    }

    fn load_user_set(&mut self) -> Result<()> {
        let user_set = self.enum_value("UserSetSelector")?;
        self.registry.clear();
        self.registry.write("UserSetSelector", user_set.clone().into())?;
        for component in FACTORY_COMPONENTS {
            self.registry
                .write_selected("ComponentEnable", component, true.into())?;
        }
        debug!("{}: loaded user set {user_set}", self.info.serial_number);
        Ok(())
    }

    fn trigger(&mut self) -> Result<()> {
        if !self.acquiring {
            return Err(McError::rejected("TriggerSoftware", "acquisition is not started"));
        }
        let selector = self.enum_value("TriggerSelector")?;
        let mode = self.registry.read_selected("TriggerMode", &selector)?;
        let source = self.registry.read_selected("TriggerSource", &selector)?;
        if mode.as_enum() != Some("On") || source.as_enum() != Some("Software") {
            return Err(McError::rejected(
                "TriggerSoftware",
                "software trigger is not enabled",
            ));
        }
        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        self.triggers.push_back(frame_id);
        self.events
            .borrow_mut()
            .push(Event::TriggerExecuted(frame_id));
        Ok(())
    }

    fn enabled_components(&self) -> Result<Vec<&'static str>> {
        let mut enabled = Vec::new();
        for component in self.registry.schema().symbolics("ComponentSelector")? {
            if is_set(self.registry.read_selected("ComponentEnable", component)?) {
                enabled.push(*component);
            }
        }
        Ok(enabled)
    }

    /// A frame is withheld when it would need a marker that is not there.
    fn waits_for_marker(&self) -> Result<bool> {
        let recognize = is_set(self.registry.read("RecognizeMarkers")?);
        let space = self.enum_value("CoordinateSpace")?;
        Ok(recognize && space == "MarkerSpace" && !self.spec.marker_visible)
    }

    fn attach_chunks(&mut self) -> Result<()> {
        let active = is_set(self.registry.read("ChunkModeActive")?);
        let enabled = is_set(
            self.registry
                .read_selected("ChunkEnable", CHUNK_CAMERA_TO_COORDINATE_SPACE)?,
        );
        let bytes = if active && enabled {
            let transformation = if self.enum_value("CoordinateSpace")? == "MarkerSpace" {
                self.spec.marker_matrix()
            } else {
                Matrix4::identity()
            };
            encode_transformation(&transformation)
        } else {
            Vec::new()
        };
        self.registry.write(
            &chunk_feature_name(CHUNK_CAMERA_TO_COORDINATE_SPACE),
            FeatureValue::Register(bytes),
        )
    }

    fn component(&self, name: &str) -> Result<Component> {
        let grid = (self.spec.height, self.spec.width);
        Ok(match name {
            "Intensity" => Component::mono(self.scene.intensity_format, self.scene.intensity()),
            "Range" => {
                let range = self.scene.range();
                if self.enum_value("Scan3dOutputMode")? == "CalibratedABC_Grid" {
                    Component::coord3d(range)
                } else {
                    let depth = range.index_axis(Axis(2), 2).mapv(|z| z.round() as u16);
                    Component::mono(PixelFormat::Mono16, depth)
                }
            }
            "Normal" => {
                let mut normals = Array3::<f32>::zeros((grid.0, grid.1, 3));
                normals.index_axis_mut(Axis(2), 2).fill(-1.0);
                Component::coord3d(normals)
            }
            _ => Component::mono(PixelFormat::Mono8, Array2::zeros(grid)),
        })
    }

    fn withhold(&self, timeout: Duration) -> Result<Buffer> {
        thread::sleep(timeout);
        Err(McError::Timeout(timeout))
    }
}

fn is_set(value: FeatureValue) -> bool {
    value.as_bool().unwrap_or(false)
}

impl NodeMap for VirtualDevice {
    fn read(&self, name: &str) -> Result<FeatureValue> {
        self.ensure_open()?;
        self.registry.read(name)
    }

    fn write(&mut self, name: &str, value: FeatureValue) -> Result<()> {
        self.ensure_open()?;
        self.ensure_unlocked(name)?;
        self.registry.write(name, value)
    }

    fn execute(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        self.ensure_unlocked(name)?;
        self.registry.schema().validate_execute(name)?;
        match name {
            "UserSetLoad" => self.load_user_set(),
            "TriggerSoftware" => self.trigger(),
            other => Err(McError::rejected(other, "command not supported")),
        }
    }
}

impl RemoteDevice for VirtualDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn schema(&self) -> &'static FeatureSchema {
        self.registry.schema()
    }

    fn node_map(&mut self) -> &mut dyn NodeMap {
        self
    }

    fn start_acquisition(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.enabled_components()?.is_empty() {
            return Err(McError::rejected("ComponentEnable", "no component enabled"));
        }
        self.acquiring = true;
        self.events.borrow_mut().push(Event::AcquisitionStarted);
        Ok(())
    }

    fn stop_acquisition(&mut self) -> Result<()> {
        self.acquiring = false;
        self.triggers.clear();
        self.events.borrow_mut().push(Event::AcquisitionStopped);
        Ok(())
    }

    fn fetch(&mut self, timeout: Duration) -> Result<Buffer> {
        self.ensure_open()?;
        let frame_id = match self.triggers.pop_front() {
            Some(frame_id) => frame_id,
            None => return self.withhold(timeout),
        };
        if self.waits_for_marker()? {
            debug!("{}: no marker recognized", self.info.serial_number);
            return self.withhold(timeout);
        }
        let latency = Duration::from_millis(self.spec.latency_ms);
        if latency > timeout {
            return self.withhold(timeout);
        }
        thread::sleep(latency);

        self.attach_chunks()?;
        let components = self
            .enabled_components()?
            .into_iter()
            .map(|name| self.component(name))
            .collect::<Result<Vec<_>>>()?;
        self.outstanding = Some(frame_id);
        Ok(Buffer {
            frame_id,
            components,
        })
    }

    fn queue(&mut self, frame_id: u64) -> Result<()> {
        if self.outstanding != Some(frame_id) {
            return Err(McError::invalid_parameter(format!(
                "buffer {frame_id} is not outstanding"
            )));
        }
        self.outstanding = None;
        self.events.borrow_mut().push(Event::BufferQueued(frame_id));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.acquiring = false;
        self.closed = true;
        self.events
            .borrow_mut()
            .push(Event::Closed(self.info.serial_number.clone()));
        Ok(())
    }
}

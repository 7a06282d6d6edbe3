use std::fmt;

use crate::error::{McError, Result};

/// Chunk carrying the camera to coordinate space transformation.
pub const CHUNK_CAMERA_TO_COORDINATE_SPACE: &str = "CurrentCameraToCoordinateSpaceTransformation";

/// Value of a device feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Symbolic entry of an enumeration.
    Enum(String),
    /// Raw register bytes, used by chunk data.
    Register(Vec<u8>),
}

impl FeatureValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            FeatureValue::Enum(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_register(&self) -> Option<&[u8]> {
        match self {
            FeatureValue::Register(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Int(value)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Float(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Enum(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Enum(value)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeatureValue::Bool(value) => write!(f, "{value}"),
            FeatureValue::Int(value) => write!(f, "{value}"),
            FeatureValue::Float(value) => write!(f, "{value}"),
            FeatureValue::Enum(value) => write!(f, "{value}"),
            FeatureValue::Register(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Boolean,
    Integer,
    Float,
    /// Enumeration with its symbolic entries, in device order.
    Enumeration(&'static [&'static str]),
    Command,
    Register,
}

impl FeatureKind {
    /// Value a feature holds before anything is written to it.
    pub fn initial_value(&self) -> Option<FeatureValue> {
        match self {
            FeatureKind::Boolean => Some(FeatureValue::Bool(false)),
            FeatureKind::Integer => Some(FeatureValue::Int(0)),
            FeatureKind::Float => Some(FeatureValue::Float(0.0)),
            FeatureKind::Enumeration(entries) => {
                entries.first().map(|entry| FeatureValue::Enum(entry.to_string()))
            }
            FeatureKind::Command => None,
            FeatureKind::Register => Some(FeatureValue::Register(Vec::new())),
        }
    }

    fn accepts(&self, value: &FeatureValue) -> bool {
        matches!(
            (self, value),
            (FeatureKind::Boolean, FeatureValue::Bool(_))
                | (FeatureKind::Integer, FeatureValue::Int(_))
                | (FeatureKind::Float, FeatureValue::Float(_))
                | (FeatureKind::Enumeration(_), FeatureValue::Enum(_))
                | (FeatureKind::Register, FeatureValue::Register(_))
        )
    }

    fn name(&self) -> &'static str {
        match self {
            FeatureKind::Boolean => "boolean",
            FeatureKind::Integer => "integer",
            FeatureKind::Float => "float",
            FeatureKind::Enumeration(_) => "enumeration",
            FeatureKind::Command => "command",
            FeatureKind::Register => "register",
        }
    }
}

/// A named entry of the device feature map.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDef {
    pub name: &'static str,
    pub kind: FeatureKind,
    /// Enumeration that selects which instance of this feature is addressed,
    /// e.g. `ComponentEnable` is selected by `ComponentSelector`.
    pub selector: Option<&'static str>,
}

const fn feature(name: &'static str, kind: FeatureKind) -> FeatureDef {
    FeatureDef {
        name,
        kind,
        selector: None,
    }
}

const fn selected(name: &'static str, kind: FeatureKind, selector: &'static str) -> FeatureDef {
    FeatureDef {
        name,
        kind,
        selector: Some(selector),
    }
}

/// The set of feature names a device exposes.
#[derive(Debug)]
pub struct FeatureSchema {
    defs: &'static [FeatureDef],
}

/// Features of the PhoXi structured-light scanner family used by the capture.
pub static PHOXI_SCHEMA: FeatureSchema = FeatureSchema {
    defs: &[
        feature(
            "UserSetSelector",
            FeatureKind::Enumeration(&["Default", "UserSet1", "UserSet2"]),
        ),
        feature("UserSetLoad", FeatureKind::Command),
        feature("TriggerSelector", FeatureKind::Enumeration(&["FrameStart"])),
        selected(
            "TriggerMode",
            FeatureKind::Enumeration(&["Off", "On"]),
            "TriggerSelector",
        ),
        selected(
            "TriggerSource",
            FeatureKind::Enumeration(&["Software", "Line0"]),
            "TriggerSelector",
        ),
        feature("TriggerSoftware", FeatureKind::Command),
        feature(
            "ComponentSelector",
            FeatureKind::Enumeration(&["Intensity", "Range", "Normal", "Event", "ColorCamera"]),
        ),
        selected("ComponentEnable", FeatureKind::Boolean, "ComponentSelector"),
        feature(
            "Scan3dOutputMode",
            FeatureKind::Enumeration(&["CalibratedABC_Grid", "ProjectedC", "UncalibratedC"]),
        ),
        feature("RecognizeMarkers", FeatureKind::Boolean),
        feature(
            "CoordinateSpace",
            FeatureKind::Enumeration(&["CameraSpace", "MarkerSpace", "RobotSpace", "CustomSpace"]),
        ),
        feature("ChunkModeActive", FeatureKind::Boolean),
        feature(
            "ChunkSelector",
            FeatureKind::Enumeration(&[CHUNK_CAMERA_TO_COORDINATE_SPACE]),
        ),
        selected("ChunkEnable", FeatureKind::Boolean, "ChunkSelector"),
        feature(
            "ChunkCurrentCameraToCoordinateSpaceTransformation",
            FeatureKind::Register,
        ),
    ],
};

/// Name of the register feature holding the data of a chunk.
pub fn chunk_feature_name(chunk_name: &str) -> String {
    format!("Chunk{chunk_name}")
}

impl FeatureSchema {
    pub fn new(defs: &'static [FeatureDef]) -> Self {
        Self { defs }
    }

    pub fn defs(&self) -> &'static [FeatureDef] {
        self.defs
    }

    /// Finds a feature by name.
    ///
    /// # Returns
    ///
    /// * The feature definition or `UnknownFeature`.
    pub fn lookup(&self, name: &str) -> Result<&'static FeatureDef> {
        self.defs
            .iter()
            .find(|def| def.name == name)
            .ok_or_else(|| McError::UnknownFeature(name.to_string()))
    }

    /// Symbolic entries of an enumeration feature, in device order.
    pub fn symbolics(&self, name: &str) -> Result<&'static [&'static str]> {
        match self.lookup(name)?.kind {
            FeatureKind::Enumeration(entries) => Ok(entries),
            other => Err(McError::rejected(
                name,
                format!("is a {} and has no symbolic entries", other.name()),
            )),
        }
    }

    /// Checks that `name` is known and that `value` has the feature's type.
    pub fn validate_write(&self, name: &str, value: &FeatureValue) -> Result<&'static FeatureDef> {
        let def = self.lookup(name)?;
        if !def.kind.accepts(value) {
            return Err(McError::rejected(
                name,
                format!("expects a {} value, got {value:?}", def.kind.name()),
            ));
        }
        Ok(def)
    }

    /// Checks that `name` is a known command.
    pub fn validate_execute(&self, name: &str) -> Result<&'static FeatureDef> {
        let def = self.lookup(name)?;
        if def.kind != FeatureKind::Command {
            return Err(McError::rejected(
                name,
                format!("is a {}, not a command", def.kind.name()),
            ));
        }
        Ok(def)
    }
}

use super::components::component_enablement;
use super::features::{FeatureSchema, FeatureValue, CHUNK_CAMERA_TO_COORDINATE_SPACE};
use super::node_map::Features;
use crate::error::Result;

/// One step of a device configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureWrite {
    Set {
        name: &'static str,
        value: FeatureValue,
    },
    Execute {
        name: &'static str,
    },
}

impl FeatureWrite {
    pub fn set<V: Into<FeatureValue>>(name: &'static str, value: V) -> Self {
        FeatureWrite::Set {
            name,
            value: value.into(),
        }
    }

    pub fn execute(name: &'static str) -> Self {
        FeatureWrite::Execute { name }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureWrite::Set { name, .. } | FeatureWrite::Execute { name } => *name,
        }
    }

    pub fn apply(&self, features: &mut Features) -> Result<()> {
        match self {
            FeatureWrite::Set { name, value } => features.set(name, value.clone()),
            FeatureWrite::Execute { name } => features.execute(name),
        }
    }
}

/// Restores the factory settings.
pub fn default_user_set() -> Vec<FeatureWrite> {
    vec![
        FeatureWrite::set("UserSetSelector", "Default"),
        FeatureWrite::execute("UserSetLoad"),
    ]
}

/// Frames start on `TriggerSoftware` only.
pub fn software_trigger() -> Vec<FeatureWrite> {
    vec![
        FeatureWrite::set("TriggerSelector", "FrameStart"),
        FeatureWrite::set("TriggerMode", "On"),
        FeatureWrite::set("TriggerSource", "Software"),
    ]
}

/// Calibrated grid output, expressed in the space of a recognized marker,
/// with the camera to marker transformation attached as chunk data.
pub fn marker_space_output() -> Vec<FeatureWrite> {
    vec![
        FeatureWrite::set("Scan3dOutputMode", "CalibratedABC_Grid"),
        FeatureWrite::set("RecognizeMarkers", true),
        FeatureWrite::set("CoordinateSpace", "MarkerSpace"),
        FeatureWrite::set("ChunkModeActive", true),
        FeatureWrite::set("ChunkSelector", CHUNK_CAMERA_TO_COORDINATE_SPACE),
        FeatureWrite::set("ChunkEnable", true),
    ]
}

/// The full configuration of a marker space capture, in the order it must
/// reach the device. Everything here precedes acquisition start.
pub fn marker_space_configuration<S: AsRef<str>>(
    schema: &FeatureSchema,
    components: &[S],
) -> Result<Vec<FeatureWrite>> {
    let mut plan = default_user_set();
    plan.extend(software_trigger());
    plan.extend(component_enablement(schema, components)?);
    plan.extend(marker_space_output());
    Ok(plan)
}

/// Applies `plan` in order, stopping at the first rejected write.
pub fn apply_configuration(features: &mut Features, plan: &[FeatureWrite]) -> Result<()> {
    plan.iter().try_for_each(|write| write.apply(features))
}

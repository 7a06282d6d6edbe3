use log::debug;

use super::features::{FeatureSchema, FeatureValue};
use crate::error::{McError, Result};

/// Feature registry of a remote device, as exposed by its transport backend.
///
/// Backends enforce the device side of the contract: symbolic ranges,
/// access modes and features locked during acquisition.
pub trait NodeMap {
    fn read(&self, name: &str) -> Result<FeatureValue>;
    fn write(&mut self, name: &str, value: FeatureValue) -> Result<()>;
    fn execute(&mut self, name: &str) -> Result<()>;
}

/// Schema-checked access to a [`NodeMap`].
///
/// Names that are not in the schema fail with `UnknownFeature` before
/// anything reaches the device.
pub struct Features<'a> {
    map: &'a mut dyn NodeMap,
    schema: &'static FeatureSchema,
}

impl<'a> Features<'a> {
    pub fn new(map: &'a mut dyn NodeMap, schema: &'static FeatureSchema) -> Self {
        Self { map, schema }
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    pub fn get(&self, name: &str) -> Result<FeatureValue> {
        self.schema.lookup(name)?;
        self.map.read(name)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| McError::rejected(name, format!("{value:?} is not a boolean")))
    }

    pub fn get_enum(&self, name: &str) -> Result<String> {
        let value = self.get(name)?;
        value
            .as_enum()
            .map(str::to_string)
            .ok_or_else(|| McError::rejected(name, format!("{value:?} is not an enumeration")))
    }

    pub fn set<V: Into<FeatureValue>>(&mut self, name: &str, value: V) -> Result<()> {
        let value = value.into();
        self.schema.validate_write(name, &value)?;
        debug!("{name} = {value}");
        self.map.write(name, value)
    }

    pub fn execute(&mut self, name: &str) -> Result<()> {
        self.schema.validate_execute(name)?;
        debug!("{name}.execute()");
        self.map.execute(name)
    }

    /// Symbolic entries of an enumeration, see [`FeatureSchema::symbolics`].
    pub fn symbolics(&self, name: &str) -> Result<&'static [&'static str]> {
        self.schema.symbolics(name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::genicam::features::PHOXI_SCHEMA;

    #[derive(Default)]
    struct RecordingMap {
        values: HashMap<String, FeatureValue>,
        executed: Vec<String>,
    }

    impl NodeMap for RecordingMap {
        fn read(&self, name: &str) -> Result<FeatureValue> {
            self.values
                .get(name)
                .cloned()
                .ok_or_else(|| McError::rejected(name, "not set"))
        }

        fn write(&mut self, name: &str, value: FeatureValue) -> Result<()> {
            self.values.insert(name.to_string(), value);
            Ok(())
        }

        fn execute(&mut self, name: &str) -> Result<()> {
            self.executed.push(name.to_string());
            Ok(())
        }
    }

    #[test]
    fn should_not_forward_unknown_features() {
        let mut map = RecordingMap::default();
        {
            let mut features = Features::new(&mut map, &PHOXI_SCHEMA);
            assert!(matches!(
                features.set("Scan3dOutputModee", "CalibratedABC_Grid"),
                Err(McError::UnknownFeature(_))
            ));
            assert!(matches!(
                features.execute("TriggerSoftwar"),
                Err(McError::UnknownFeature(_))
            ));
        }
        assert!(map.values.is_empty());
        assert!(map.executed.is_empty());
    }

    #[test]
    fn should_forward_valid_writes() {
        let mut map = RecordingMap::default();
        {
            let mut features = Features::new(&mut map, &PHOXI_SCHEMA);
            features.set("CoordinateSpace", "MarkerSpace").unwrap();
            features.set("RecognizeMarkers", true).unwrap();
            features.execute("TriggerSoftware").unwrap();

            assert_eq!(features.get_enum("CoordinateSpace").unwrap(), "MarkerSpace");
            assert!(features.get_bool("RecognizeMarkers").unwrap());
            assert!(features.get_bool("CoordinateSpace").is_err());
        }
        assert_eq!(map.executed, vec!["TriggerSoftware".to_string()]);
    }
}

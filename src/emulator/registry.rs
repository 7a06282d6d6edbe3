use std::collections::HashMap;

use crate::error::{McError, Result};
use crate::genicam::features::{FeatureDef, FeatureKind, FeatureSchema, FeatureValue};

/// In-memory feature store that behaves like device firmware: values are
/// checked against their symbolic range and selected features keep one value
/// per selector entry.
pub struct SchemaNodeMap {
    schema: &'static FeatureSchema,
    values: HashMap<(&'static str, Option<String>), FeatureValue>,
}

impl SchemaNodeMap {
    pub fn new(schema: &'static FeatureSchema) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    /// Forgets every written value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    fn key(&self, def: &'static FeatureDef) -> Result<(&'static str, Option<String>)> {
        let selected = match def.selector {
            Some(selector) => Some(
                self.read(selector)?
                    .as_enum()
                    .map(str::to_string)
                    .ok_or_else(|| McError::rejected(selector, "selector is not an enumeration"))?,
            ),
            None => None,
        };
        Ok((def.name, selected))
    }

    pub fn read(&self, name: &str) -> Result<FeatureValue> {
        let def = self.schema.lookup(name)?;
        let key = self.key(def)?;
        match self.values.get(&key) {
            Some(value) => Ok(value.clone()),
            None => def
                .kind
                .initial_value()
                .ok_or_else(|| McError::rejected(name, "commands cannot be read")),
        }
    }

    /// Stores a value after checking its type and symbolic range.
    pub fn write(&mut self, name: &str, value: FeatureValue) -> Result<()> {
        let def = self.schema.validate_write(name, &value)?;
        if let (FeatureKind::Enumeration(entries), FeatureValue::Enum(entry)) = (def.kind, &value) {
            if !entries.iter().any(|known| *known == entry.as_str()) {
                return Err(McError::rejected(
                    name,
                    format!("{entry} is not one of {entries:?}"),
                ));
            }
        }
        let key = self.key(def)?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Writes the instance of a selected feature for `entry`, leaving the
    /// selector untouched.
    pub fn write_selected(&mut self, name: &str, entry: &str, value: FeatureValue) -> Result<()> {
        let def = self.schema.validate_write(name, &value)?;
        if def.selector.is_none() {
            return Err(McError::rejected(name, "feature has no selector"));
        }
        self.values.insert((def.name, Some(entry.to_string())), value);
        Ok(())
    }

    /// Reads the instance of a selected feature for `entry`.
    pub fn read_selected(&self, name: &str, entry: &str) -> Result<FeatureValue> {
        let def = self.schema.lookup(name)?;
        match self.values.get(&(def.name, Some(entry.to_string()))) {
            Some(value) => Ok(value.clone()),
            None => def
                .kind
                .initial_value()
                .ok_or_else(|| McError::rejected(name, "commands cannot be read")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genicam::features::PHOXI_SCHEMA;

    #[test]
    fn should_start_with_initial_values() {
        let map = SchemaNodeMap::new(&PHOXI_SCHEMA);
        assert_eq!(map.read("TriggerMode").unwrap(), FeatureValue::from("Off"));
        assert_eq!(map.read("RecognizeMarkers").unwrap(), FeatureValue::Bool(false));
        assert!(map.read("TriggerSoftware").is_err());
    }

    #[test]
    fn should_reject_out_of_range_symbolic() {
        let mut map = SchemaNodeMap::new(&PHOXI_SCHEMA);
        let err = map.write("CoordinateSpace", "WorldSpace".into()).unwrap_err();
        assert!(matches!(err, McError::FeatureRejected { .. }));
    }

    #[test]
    fn should_keep_one_value_per_selector_entry() {
        let mut map = SchemaNodeMap::new(&PHOXI_SCHEMA);
        map.write("ComponentSelector", "Range".into()).unwrap();
        map.write("ComponentEnable", true.into()).unwrap();
        map.write("ComponentSelector", "Intensity".into()).unwrap();

        assert_eq!(map.read("ComponentEnable").unwrap(), FeatureValue::Bool(false));
        assert_eq!(
            map.read_selected("ComponentEnable", "Range").unwrap(),
            FeatureValue::Bool(true)
        );

        map.write_selected("ComponentEnable", "Intensity", true.into())
            .unwrap();
        assert_eq!(map.read("ComponentEnable").unwrap(), FeatureValue::Bool(true));
        assert!(map.write_selected("RecognizeMarkers", "Range", true.into()).is_err());
    }
}

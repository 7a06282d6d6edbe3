use std::collections::HashMap;

use log::warn;

use super::buffer::Component;
use super::configure::FeatureWrite;
use super::features::FeatureSchema;
use super::node_map::Features;
use crate::error::{McError, Result};

/// Writes that enable exactly the components in `names`.
///
/// Every component the device offers is visited in selector order and its
/// `ComponentEnable` set to whether it is requested.
pub fn component_enablement<S: AsRef<str>>(
    schema: &FeatureSchema,
    names: &[S],
) -> Result<Vec<FeatureWrite>> {
    let available = schema.symbolics("ComponentSelector")?;
    if let Some(unknown) = names
        .iter()
        .map(|name| name.as_ref())
        .find(|name| !available.iter().any(|entry| entry == name))
    {
        return Err(McError::rejected(
            "ComponentSelector",
            format!("device has no component named {unknown}"),
        ));
    }

    Ok(available
        .iter()
        .flat_map(|component| {
            let wanted = names.iter().any(|name| name.as_ref() == *component);
            [
                FeatureWrite::set("ComponentSelector", *component),
                FeatureWrite::set("ComponentEnable", wanted),
            ]
        })
        .collect())
}

pub fn enable_components<S: AsRef<str>>(features: &mut Features, names: &[S]) -> Result<()> {
    for write in component_enablement(features.schema(), names)? {
        write.apply(features)?;
    }
    Ok(())
}

/// Names of the enabled components, in selector order. This is the order of
/// the parts in an acquired payload.
pub fn enabled_components(features: &mut Features) -> Result<Vec<String>> {
    let mut enabled = Vec::new();
    for component in features.symbolics("ComponentSelector")? {
        features.set("ComponentSelector", *component)?;
        if features.get_bool("ComponentEnable")? {
            enabled.push(component.to_string());
        }
    }
    Ok(enabled)
}

/// Payload parts addressed by component name.
pub struct ComponentMap<'b> {
    parts: HashMap<String, &'b Component>,
}

impl<'b> ComponentMap<'b> {
    /// Pairs `names` with `components` position by position.
    pub fn new(names: &[String], components: &'b [Component]) -> Self {
        if names.len() != components.len() {
            warn!(
                "{} component name(s) for {} payload part(s)",
                names.len(),
                components.len()
            );
        }
        Self {
            parts: names.iter().cloned().zip(components.iter()).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&'b Component> {
        self.parts
            .get(name)
            .copied()
            .ok_or_else(|| McError::MissingComponent(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3};

    use super::*;
    use crate::genicam::buffer::PixelFormat;
    use crate::genicam::features::PHOXI_SCHEMA;

    #[test]
    fn should_visit_every_component() {
        let writes = component_enablement(&PHOXI_SCHEMA, &["Range", "Intensity"]).unwrap();
        let components = PHOXI_SCHEMA.symbolics("ComponentSelector").unwrap();
        assert_eq!(writes.len(), components.len() * 2);

        assert_eq!(writes[0], FeatureWrite::set("ComponentSelector", "Intensity"));
        assert_eq!(writes[1], FeatureWrite::set("ComponentEnable", true));
        assert_eq!(writes[5], FeatureWrite::set("ComponentEnable", false));
    }

    #[test]
    fn should_reject_unknown_component() {
        let err = component_enablement(&PHOXI_SCHEMA, &["Texture"]).unwrap_err();
        assert!(matches!(err, McError::FeatureRejected { .. }));
    }

    #[test]
    fn should_map_parts_by_position() {
        let parts = vec![
            Component::mono(PixelFormat::Mono12, Array2::zeros((2, 3))),
            Component::coord3d(Array3::zeros((2, 3, 3))),
        ];
        let names = vec!["Intensity".to_string(), "Range".to_string()];
        let map = ComponentMap::new(&names, &parts);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Intensity").unwrap().pixel_format, PixelFormat::Mono12);
        assert_eq!(
            map.get("Range").unwrap().pixel_format,
            PixelFormat::Coord3dAbc32f
        );
        assert!(matches!(
            map.get("Normal"),
            Err(McError::MissingComponent(name)) if name == "Normal"
        ));
    }

    #[test]
    fn should_drop_unpaired_names() {
        let parts = vec![Component::mono(PixelFormat::Mono8, Array2::zeros((1, 1)))];
        let names = vec!["Intensity".to_string(), "Range".to_string()];
        let map = ComponentMap::new(&names, &parts);
        assert!(map.get("Range").is_err());
    }
}

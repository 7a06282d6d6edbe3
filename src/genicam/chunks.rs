use std::collections::BTreeMap;

use nalgebra::{Matrix3, Matrix4, Vector3};

use super::features::{chunk_feature_name, CHUNK_CAMERA_TO_COORDINATE_SPACE};
use super::node_map::Features;
use crate::error::{McError, Result};
use crate::transform::Transform;

/// Number of `f64` values in a transformation chunk: 3x3 rotation then translation.
const TRANSFORMATION_LEN: usize = 12;

/// Named numeric fields decoded from a chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkFields(BTreeMap<String, Vec<f64>>);

impl ChunkFields {
    pub fn insert<S: Into<String>>(&mut self, name: S, values: Vec<f64>) {
        self.0.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn field<const N: usize>(&self, name: &str) -> Result<[f64; N]> {
        let values = self
            .get(name)
            .ok_or_else(|| McError::Chunk(format!("missing field {name}")))?;
        values.try_into().map_err(|_| {
            McError::Chunk(format!(
                "field {name} has {} values, expected {N}",
                values.len()
            ))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Selects `chunk_name` and decodes the chunk data attached to the last
/// fetched buffer.
pub fn parse_chunk_selector(features: &mut Features, chunk_name: &str) -> Result<ChunkFields> {
    if !features.get_bool("ChunkModeActive")? {
        return Err(McError::Chunk("chunk mode is not active".to_string()));
    }
    features.set("ChunkSelector", chunk_name)?;
    if !features.get_bool("ChunkEnable")? {
        return Err(McError::Chunk(format!("chunk {chunk_name} is not enabled")));
    }

    let value = features.get(&chunk_feature_name(chunk_name))?;
    let bytes = value
        .as_register()
        .ok_or_else(|| McError::Chunk(format!("chunk {chunk_name} is not a register")))?;
    if bytes.is_empty() {
        return Err(McError::Chunk(format!(
            "buffer carries no {chunk_name} chunk"
        )));
    }

    match chunk_name {
        CHUNK_CAMERA_TO_COORDINATE_SPACE => decode_transformation(bytes),
        other => Err(McError::Chunk(format!("no decoder for chunk {other}"))),
    }
}

/// Decodes 12 little-endian doubles: row-major rotation followed by translation.
pub fn decode_transformation(bytes: &[u8]) -> Result<ChunkFields> {
    const SIZE: usize = std::mem::size_of::<f64>();
    if bytes.len() != TRANSFORMATION_LEN * SIZE {
        return Err(McError::Chunk(format!(
            "transformation chunk has {} bytes, expected {}",
            bytes.len(),
            TRANSFORMATION_LEN * SIZE
        )));
    }

    let values: Vec<f64> = bytes
        .chunks_exact(SIZE)
        .map(|raw| {
            let mut word = [0u8; SIZE];
            word.copy_from_slice(raw);
            f64::from_le_bytes(word)
        })
        .collect();

    let mut fields = ChunkFields::default();
    fields.insert("Rotation", values[..9].to_vec());
    fields.insert("Translation", values[9..].to_vec());
    Ok(fields)
}

/// Inverse of [`decode_transformation`] for a rigid homogeneous matrix.
pub fn encode_transformation(matrix: &Matrix4<f64>) -> Vec<u8> {
    let rotation = (0..3).flat_map(|row| (0..3).map(move |col| matrix[(row, col)]));
    let translation = (0..3).map(|row| matrix[(row, 3)]);
    rotation
        .chain(translation)
        .flat_map(f64::to_le_bytes)
        .collect()
}

/// Builds `[[R, t], [0, 0, 0, 1]]` from the `Rotation` and `Translation` fields.
pub fn transformation_matrix_from_chunk(fields: &ChunkFields) -> Result<Matrix4<f64>> {
    let rotation = Matrix3::from_row_slice(&fields.field::<9>("Rotation")?);
    let translation = Vector3::from(fields.field::<3>("Translation")?);

    Ok(Transform::from_rotation_translation(&rotation, &translation).into())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};

    use super::*;

    fn sample_matrix() -> Matrix4<f64> {
        Isometry3::from_parts(
            Translation3::new(120.0, -45.5, 830.25),
            UnitQuaternion::from_euler_angles(0.1, -0.4, 1.2),
        )
        .to_homogeneous()
    }

    #[test]
    fn should_decode_rotation_and_translation() {
        let fields = decode_transformation(&encode_transformation(&sample_matrix())).unwrap();
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["Rotation", "Translation"]);
        assert_eq!(fields.get("Translation").unwrap(), &[120.0, -45.5, 830.25]);
    }

    #[test]
    fn should_build_homogeneous_matrix() {
        let matrix = sample_matrix();
        let fields = decode_transformation(&encode_transformation(&matrix)).unwrap();
        let decoded = transformation_matrix_from_chunk(&fields).unwrap();

        assert_relative_eq!(decoded, matrix, epsilon = 1e-12);
        assert_eq!(decoded.row(3).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn should_reject_truncated_chunk() {
        let bytes = encode_transformation(&sample_matrix());
        assert!(matches!(
            decode_transformation(&bytes[..88]),
            Err(McError::Chunk(_))
        ));
    }

    #[test]
    fn should_reject_missing_fields() {
        let mut fields = ChunkFields::default();
        fields.insert("Rotation", vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(transformation_matrix_from_chunk(&fields).is_err());

        fields.insert("Translation", vec![1.0, 2.0]);
        assert!(transformation_matrix_from_chunk(&fields).is_err());
    }
}

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use ndarray::{Array2, Axis};

use std::ops;

/// Homogeneous 4x4 transformation.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform(Matrix4<f64>);

impl Transform {
    pub fn eye() -> Self {
        Self(Matrix4::identity())
    }

    pub fn from_matrix4(matrix: &Matrix4<f64>) -> Self {
        Self(*matrix)
    }

    pub fn from_rotation_translation(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_slice_mut::<3, 3>(0, 0).copy_from(rotation);
        matrix.fixed_slice_mut::<3, 1>(0, 3).copy_from(translation);
        Self(matrix)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Applies the transformation to `[x, y, z, 1]` and divides by the
    /// resulting `w`.
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let h = self.0 * Vector4::new(point[0], point[1], point[2], 1.0);
        Vector3::new(h[0] / h[3], h[1] / h[3], h[2] / h[3])
    }

    /// Transforms every row of a (N x 3) array in place.
    pub fn transform(&self, mut rhs: Array2<f64>) -> Array2<f64> {
        for mut point in rhs.axis_iter_mut(Axis(0)) {
            let v = self.transform_point(&Vector3::new(point[0], point[1], point[2]));
            point[0] = v[0];
            point[1] = v[1];
            point[2] = v[2];
        }

        rhs
    }
}

impl ops::Mul<&Array2<f64>> for &Transform {
    type Output = Array2<f64>;

    fn mul(self, rhs: &Array2<f64>) -> Self::Output {
        self.transform(rhs.clone())
    }
}

impl ops::Mul<&Vector3<f64>> for &Transform {
    type Output = Vector3<f64>;

    fn mul(self, rhs: &Vector3<f64>) -> Self::Output {
        self.transform_point(rhs)
    }
}

impl ops::Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Self::Output {
        Transform(self.0 * rhs.0)
    }
}

impl From<Transform> for Matrix4<f64> {
    fn from(transform: Transform) -> Self {
        transform.0
    }
}

impl From<Matrix4<f64>> for Transform {
    fn from(matrix: Matrix4<f64>) -> Self {
        Transform(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector3};
    use ndarray::array;

    fn half_turn_around_y() -> Transform {
        Transform::from_matrix4(
            &Isometry3::from_parts(
                Translation3::<f64>::new(0., 0., 3.),
                UnitQuaternion::<f64>::from_scaled_axis(Vector3::y() * std::f64::consts::PI),
            )
            .to_homogeneous(),
        )
    }

    #[test]
    fn test_mul_op() {
        let transform = Transform::eye();
        let points = array![[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]];
        let mult_result = &transform * &points;

        assert_eq!(mult_result, points);

        assert_abs_diff_eq!(
            &half_turn_around_y() * &array![[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]],
            array![[-1.0, 2.0, 0.0], [-1.0, 2.0, 0.0]],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_transform() {
        let mut points = array![[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]];
        points = half_turn_around_y().transform(points);

        assert_abs_diff_eq!(
            points,
            array![[-1.0, 2.0, 0.0], [-1.0, 2.0, 0.0]],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_homogeneous_divide() {
        let mut matrix = Matrix4::identity();
        matrix[(3, 3)] = 2.0;
        let point = &Transform::from_matrix4(&matrix) * &Vector3::new(2.0, 4.0, 6.0);
        assert_abs_diff_eq!(point, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_compose() {
        let transform = half_turn_around_y();
        let twice = &transform * &transform;
        let point = &twice * &Vector3::new(1.0, 2.0, 3.0);
        assert_abs_diff_eq!(point, Vector3::new(1.0, 2.0, 3.0), epsilon = 1e-9);
    }
}

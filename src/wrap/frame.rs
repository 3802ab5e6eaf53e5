use super::BaryCoords;
use crate::common::math::coordinate_system;

/// Origin, surface normal, and up vector of the local frame anchored to
/// a triangle. Origin and normal are barycentric blends of the
/// triangle's points and normals; the up vector points from the origin
/// at the triangle vertex carrying the lowest barycentric weight. Ties
/// pick the first occurrence in index order, which keeps the frame
/// deterministic for queries near a triangle centroid.
pub fn basis_components(
    coords: &BaryCoords,
    triangle: &[u32; 3],
    points: &[na::Point3<f32>],
    normals: &[na::Vector3<f32>],
) -> (na::Point3<f32>, na::Vector3<f32>, na::Vector3<f32>) {
    let mut origin = na::Point3::origin();
    let mut normal = na::Vector3::zeros();
    for i in 0..3 {
        origin += points[triangle[i] as usize].coords * coords[i];
        normal += normals[triangle[i] as usize] * coords[i];
    }

    let mut lowest_weight = coords[0];
    let mut lowest_vertex = triangle[0] as usize;
    for i in 1..3 {
        if coords[i] < lowest_weight {
            lowest_weight = coords[i];
            lowest_vertex = triangle[i] as usize;
        }
    }

    // blended vertex normals can cancel out; the face normal still
    // orients the frame then
    let normal = normal
        .try_normalize(1.0e-12)
        .unwrap_or_else(|| face_normal(triangle, points));
    let up = (points[lowest_vertex] - origin)
        .try_normalize(1.0e-12)
        .unwrap_or_else(|| coordinate_system(&normal).0);

    (origin, normal, up)
}

fn face_normal(triangle: &[u32; 3], points: &[na::Point3<f32>]) -> na::Vector3<f32> {
    let a = points[triangle[0] as usize];
    let b = points[triangle[1] as usize];
    let c = points[triangle[2] as usize];

    (b - a)
        .cross(&(c - a))
        .try_normalize(1.0e-12)
        .unwrap_or_else(na::Vector3::z)
}

/// Assembles the frame transform: orthonormal basis columns
/// x = normal × up, y = normal, z = normal × x, with `origin` as the
/// translation. `up` only seeds the x axis and need not be orthogonal
/// to `normal`; when the two are parallel the cross product vanishes
/// and an arbitrary axis perpendicular to `normal` takes over.
pub fn frame_matrix(
    origin: &na::Point3<f32>,
    normal: &na::Vector3<f32>,
    up: &na::Vector3<f32>,
) -> na::Matrix4<f32> {
    let x = normal
        .cross(up)
        .try_normalize(1.0e-12)
        .unwrap_or_else(|| coordinate_system(normal).0);
    let z = normal
        .cross(&x)
        .try_normalize(1.0e-12)
        .unwrap_or_else(|| coordinate_system(normal).1);
    let y = *normal;

    let mut matrix = na::Matrix4::identity();
    matrix.fixed_view_mut::<3, 1>(0, 0).copy_from(&x);
    matrix.fixed_view_mut::<3, 1>(0, 1).copy_from(&y);
    matrix.fixed_view_mut::<3, 1>(0, 2).copy_from(&z);
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin.coords);

    matrix
}

/// Exact inverse of a frame matrix. The basis block inverts by
/// transposition and the translation by -Rᵀt, which stays valid for the
/// left-handed basis `frame_matrix` produces (a general matrix inverse
/// would too, but this one cannot fail or drift).
pub fn invert_frame(frame: &na::Matrix4<f32>) -> na::Matrix4<f32> {
    let rot_t = frame.fixed_view::<3, 3>(0, 0).transpose();
    let t = frame.fixed_view::<3, 1>(0, 3).clone_owned();

    let mut inverse = na::Matrix4::identity();
    inverse.fixed_view_mut::<3, 3>(0, 0).copy_from(&rot_t);
    inverse.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-(rot_t * t)));

    inverse
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(m: &na::Matrix4<f32>) {
        let x = m.fixed_view::<3, 1>(0, 0).clone_owned();
        let y = m.fixed_view::<3, 1>(0, 1).clone_owned();
        let z = m.fixed_view::<3, 1>(0, 2).clone_owned();

        approx::assert_relative_eq!(x.norm(), 1.0, epsilon = 0.000_01);
        approx::assert_relative_eq!(y.norm(), 1.0, epsilon = 0.000_01);
        approx::assert_relative_eq!(z.norm(), 1.0, epsilon = 0.000_01);
        approx::assert_relative_eq!(x.dot(&y), 0.0, epsilon = 0.000_01);
        approx::assert_relative_eq!(x.dot(&z), 0.0, epsilon = 0.000_01);
        approx::assert_relative_eq!(y.dot(&z), 0.0, epsilon = 0.000_01);
    }

    #[test]
    fn test_frame_orthonormality() {
        let origin = na::Point3::new(1.0, 2.0, 3.0);
        let normal = glm::vec3(0.0, 0.0, 1.0);
        // deliberately far from orthogonal to the normal
        let up = glm::vec3(0.3, 0.1, 0.9).normalize();

        assert_orthonormal(&frame_matrix(&origin, &normal, &up));
    }

    #[test]
    fn test_degenerate_up_falls_back() {
        let origin = na::Point3::origin();
        let normal = glm::vec3(0.0, 1.0, 0.0);

        let m = frame_matrix(&origin, &normal, &normal);
        assert_orthonormal(&m);
        for value in m.iter() {
            assert!(value.is_finite());
        }
    }

    #[test]
    fn test_invert_frame_is_exact() {
        let origin = na::Point3::new(-2.0, 0.5, 4.0);
        let normal = glm::vec3(0.0, 0.0, 1.0);
        let up = glm::vec3(0.0, 1.0, 0.2).normalize();

        let frame = frame_matrix(&origin, &normal, &up);
        let product = frame * invert_frame(&frame);

        approx::assert_relative_eq!(product, na::Matrix4::identity(), epsilon = 0.000_01);
    }

    #[test]
    fn test_lowest_weight_vertex_seeds_up() {
        let points = vec![
            na::Point3::origin(),
            na::Point3::new(1.0, 0.0, 0.0),
            na::Point3::new(0.0, 1.0, 0.0),
        ];
        let normals = vec![glm::vec3(0.0, 0.0, 1.0); 3];
        let triangle = [0u32, 1, 2];

        // vertex 1 carries the lowest weight
        let (origin, _, up) = basis_components(&[0.5, 0.1, 0.4], &triangle, &points, &normals);
        let expected = (points[1] - origin).normalize();
        approx::assert_relative_eq!(up, expected, epsilon = 0.000_01);

        // a tie between vertices 1 and 2 resolves to the first in
        // index order
        let (origin, _, up) = basis_components(&[0.4, 0.3, 0.3], &triangle, &points, &normals);
        let expected = (points[1] - origin).normalize();
        approx::assert_relative_eq!(up, expected, epsilon = 0.000_01);
    }
}

/// Builds two axes that complete `v1` into an orthonormal set. `v1` must
/// be unit length. The first returned axis is chosen in the coordinate
/// plane that avoids cancellation against the dominant component of `v1`.
pub fn coordinate_system(v1: &na::Vector3<f32>) -> (na::Vector3<f32>, na::Vector3<f32>) {
    let v2 = if v1.x.abs() > v1.y.abs() {
        na::Vector3::new(-v1.z, 0.0, v1.x) / (v1.x * v1.x + v1.z * v1.z).sqrt()
    } else {
        na::Vector3::new(0.0, v1.z, -v1.y) / (v1.y * v1.y + v1.z * v1.z).sqrt()
    };

    (v2, v1.cross(&v2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_system() {
        for v1 in &[
            glm::vec3(0.0, 1.0, 0.0),
            glm::vec3(1.0, 0.0, 0.0),
            glm::vec3(0.0, 0.0, -1.0),
            glm::vec3(0.577_350_3, 0.577_350_3, 0.577_350_3),
        ] {
            let (v2, v3) = coordinate_system(v1);

            approx::assert_relative_eq!(v2.norm(), 1.0, epsilon = 0.000_01);
            approx::assert_relative_eq!(v3.norm(), 1.0, epsilon = 0.000_01);
            approx::assert_relative_eq!(v1.dot(&v2), 0.0, epsilon = 0.000_01);
            approx::assert_relative_eq!(v1.dot(&v3), 0.0, epsilon = 0.000_01);
            approx::assert_relative_eq!(v2.dot(&v3), 0.0, epsilon = 0.000_01);
        }
    }
}

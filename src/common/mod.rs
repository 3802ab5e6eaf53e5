pub mod bounds;
pub mod importer;
pub mod math;

/// Triangle mesh geometry buffers. `indices` is a flat triangle list,
/// three entries per triangle, each indexing into `pos`. A vertex may be
/// shared by any number of triangles. `normal` is per-vertex, indexed
/// like `pos`; it may be left empty and recomputed from the triangles.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub indices: Vec<u32>,
    pub pos: Vec<na::Point3<f32>>,
    pub normal: Vec<na::Vector3<f32>>,
}

impl Mesh {
    pub fn new(
        indices: Vec<u32>,
        pos: Vec<na::Point3<f32>>,
        normal: Vec<na::Vector3<f32>>,
    ) -> Self {
        Mesh {
            indices,
            pos,
            normal,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, i: usize) -> [u32; 3] {
        [
            self.indices[3 * i],
            self.indices[3 * i + 1],
            self.indices[3 * i + 2],
        ]
    }

    pub fn triangle_points(&self, triangle: &[u32; 3]) -> [na::Point3<f32>; 3] {
        [
            self.pos[triangle[0] as usize],
            self.pos[triangle[1] as usize],
            self.pos[triangle[2] as usize],
        ]
    }

    /// Recomputes per-vertex normals by accumulating area-weighted face
    /// normals from each adjacent triangle. Zero-area triangles
    /// contribute nothing; isolated vertices end up with a zero normal.
    pub fn recompute_normals(&mut self) {
        self.normal.clear();
        self.normal.resize(self.pos.len(), na::Vector3::zeros());

        for t in 0..self.triangle_count() {
            let tri = self.triangle(t);
            let [a, b, c] = self.triangle_points(&tri);
            // magnitude is twice the triangle area
            let face = (b - a).cross(&(c - a));
            for &v in tri.iter() {
                self.normal[v as usize] += face;
            }
        }

        for n in self.normal.iter_mut() {
            *n = n.try_normalize(1.0e-12).unwrap_or_else(na::Vector3::zeros);
        }
    }

    /// Returns the mesh with positions mapped through `m` and normals
    /// through the inverse transpose of its linear part.
    pub fn transformed(&self, m: &na::Matrix4<f32>) -> Mesh {
        let linear = m.fixed_view::<3, 3>(0, 0).clone_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or(linear);

        Mesh {
            indices: self.indices.clone(),
            pos: self.pos.iter().map(|p| m.transform_point(p)).collect(),
            normal: self
                .normal
                .iter()
                .map(|n| {
                    (normal_matrix * n)
                        .try_normalize(1.0e-12)
                        .unwrap_or_else(na::Vector3::zeros)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        let mut mesh = Mesh::new(
            vec![0, 1, 2],
            vec![
                na::Point3::origin(),
                na::Point3::new(1.0, 0.0, 0.0),
                na::Point3::new(0.0, 1.0, 0.0),
            ],
            vec![],
        );
        mesh.recompute_normals();
        mesh
    }

    #[test]
    fn test_triangle_accessors() {
        let mesh = unit_triangle();

        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangle(0), [0, 1, 2]);

        let [a, b, c] = mesh.triangle_points(&mesh.triangle(0));
        assert_eq!(a, na::Point3::origin());
        assert_eq!(b, na::Point3::new(1.0, 0.0, 0.0));
        assert_eq!(c, na::Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_recompute_normals() {
        let mesh = unit_triangle();

        assert_eq!(mesh.normal.len(), 3);
        for n in &mesh.normal {
            approx::assert_relative_eq!(*n, glm::vec3(0.0, 0.0, 1.0), epsilon = 0.000_001);
        }
    }

    #[test]
    fn test_transformed_carries_normals() {
        let mesh = unit_triangle();
        let m = glm::translation(&glm::vec3(5.0, 0.0, 0.0))
            * glm::rotation(std::f32::consts::FRAC_PI_2, &glm::vec3(1.0, 0.0, 0.0));
        let moved = mesh.transformed(&m);

        approx::assert_relative_eq!(
            moved.pos[0],
            na::Point3::new(5.0, 0.0, 0.0),
            epsilon = 0.000_001
        );
        // the +z normal rotates onto +y
        approx::assert_relative_eq!(
            moved.normal[0],
            glm::vec3(0.0, -1.0, 0.0),
            epsilon = 0.000_001
        );
    }
}

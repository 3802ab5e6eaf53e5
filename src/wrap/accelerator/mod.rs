use super::WrapError;
use crate::common::bounds::Bounds3;
use crate::common::Mesh;
use std::time::Instant;

const MAX_TRIS_IN_NODE: usize = 4;

/// Result of a closest-point query: the point on the driver surface,
/// the triangle it lies on (as driver vertex indices), and the squared
/// distance from the query point.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint {
    pub point: na::Point3<f32>,
    pub triangle: [u32; 3],
    pub distance_squared: f32,
}

struct TriangleInfo {
    tri_num: usize,
    centroid: na::Point3<f32>,
    bounds: Bounds3,
}

impl TriangleInfo {
    fn new(tri_num: usize, bounds: Bounds3) -> Self {
        TriangleInfo {
            tri_num,
            centroid: bounds.p_min + 0.5 * (bounds.p_max - bounds.p_min),
            bounds,
        }
    }
}

struct BuildNode {
    bounds: Bounds3,
    children: [Option<Box<BuildNode>>; 2],
    first_tri_offset: usize,
    num_tris: usize,
}

impl BuildNode {
    fn new_leaf(first: usize, n: usize, b: Bounds3) -> Self {
        BuildNode {
            bounds: b,
            children: [None, None],
            first_tri_offset: first,
            num_tris: n,
        }
    }

    fn new_interior(c0: Box<BuildNode>, c1: Box<BuildNode>) -> Self {
        BuildNode {
            bounds: Bounds3::union(&c0.bounds, &c1.bounds),
            children: [Some(c0), Some(c1)],
            first_tri_offset: 0,
            num_tris: 0,
        }
    }
}

#[derive(Copy, Clone)]
struct BucketInfo {
    count: usize,
    bounds: Bounds3,
}

impl BucketInfo {
    fn new() -> Self {
        BucketInfo {
            count: 0,
            bounds: Bounds3::empty(),
        }
    }
}

struct LinearNode {
    bounds: Bounds3,
    /// first-triangle offset for leaves, second-child offset for
    /// interior nodes (the first child always follows its parent)
    offset: u32,
    num_tris: u16,
}

/// Spatial index over the driver triangles answering closest-point-on-
/// surface queries. Built once per bind pass from the driver's bind-time
/// geometry; immutable afterwards, so any number of threads may query it
/// concurrently. A driver topology or rest-position change invalidates
/// the index and requires a rebuild (which a full re-bind performs
/// anyway); evaluation never queries it.
pub struct Bvh {
    positions: Vec<na::Point3<f32>>,
    triangles: Vec<[u32; 3]>,
    nodes: Box<[LinearNode]>,
}

impl Bvh {
    pub fn new(log: &slog::Logger, mesh: &Mesh) -> Result<Self, WrapError> {
        if mesh.triangle_count() == 0 {
            return Err(WrapError::NoDriverGeometry);
        }
        if let Some(&index) = mesh
            .indices
            .iter()
            .find(|&&index| index as usize >= mesh.pos.len())
        {
            return Err(WrapError::IndexOutOfRange {
                index,
                count: mesh.pos.len(),
            });
        }

        let start = Instant::now();

        let mut triangle_info = Vec::<TriangleInfo>::with_capacity(mesh.triangle_count());
        for t in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle_points(&mesh.triangle(t));
            let bounds = Bounds3::union_p(&Bounds3::new(a, b), &c);
            triangle_info.push(TriangleInfo::new(t, bounds));
        }

        let mut total_nodes = 0usize;
        let mut ordered_tris = Vec::<[u32; 3]>::with_capacity(mesh.triangle_count());

        let root = Bvh::recursive_build(
            &mut triangle_info,
            0,
            mesh.triangle_count(),
            &mut total_nodes,
            &mut ordered_tris,
            mesh,
        );

        let mut nodes = Vec::with_capacity(total_nodes);
        Bvh::flatten_tree(&root, &mut nodes);

        let duration = start.elapsed();
        debug!(
            log,
            "closest-point bvh over {} triangles took {:?} to construct",
            mesh.triangle_count(),
            duration
        );

        Ok(Bvh {
            positions: mesh.pos.clone(),
            triangles: ordered_tris,
            nodes: nodes.into_boxed_slice(),
        })
    }

    fn recursive_build(
        triangle_info: &mut Vec<TriangleInfo>,
        start: usize,
        end: usize,
        total_size: &mut usize,
        ordered_tris: &mut Vec<[u32; 3]>,
        mesh: &Mesh,
    ) -> Box<BuildNode> {
        *total_size += 1;

        let mut bounds = Bounds3::empty();
        for i in start..end {
            bounds = Bounds3::union(&bounds, &triangle_info[i].bounds);
        }
        let num_tris = end - start;

        if num_tris == 1 {
            let first_tri_offset = ordered_tris.len();
            for i in start..end {
                ordered_tris.push(mesh.triangle(triangle_info[i].tri_num));
            }

            return Box::new(BuildNode::new_leaf(first_tri_offset, num_tris, bounds));
        }

        let mut centroid_bounds = Bounds3::empty();
        for i in start..end {
            centroid_bounds = Bounds3::union_p(&centroid_bounds, &triangle_info[i].centroid);
        }

        let dim = centroid_bounds.maximum_extent();
        let mut mid = (start + end) / 2;
        if centroid_bounds.p_max[dim] == centroid_bounds.p_min[dim] {
            // coincident centroids cannot be split
            let first_tri_offset = ordered_tris.len();
            for i in start..end {
                ordered_tris.push(mesh.triangle(triangle_info[i].tri_num));
            }

            return Box::new(BuildNode::new_leaf(first_tri_offset, num_tris, bounds));
        }

        if num_tris <= 2 {
            triangle_info[start..end].select_nth_unstable_by(mid - start, |a, b| {
                a.centroid[dim].partial_cmp(&b.centroid[dim]).unwrap()
            });
        } else {
            const N_BUCKETS: usize = 12;
            let mut buckets = [BucketInfo::new(); N_BUCKETS];

            let bucket_of = |info: &TriangleInfo| -> usize {
                let b = (N_BUCKETS as f32 * centroid_bounds.offset(&info.centroid)[dim]) as usize;
                b.min(N_BUCKETS - 1)
            };

            for i in start..end {
                let b = bucket_of(&triangle_info[i]);
                buckets[b].count += 1;
                buckets[b].bounds = Bounds3::union(&buckets[b].bounds, &triangle_info[i].bounds);
            }

            let mut cost = [0.0; N_BUCKETS - 1];
            for i in 0..(N_BUCKETS - 1) {
                let mut b0 = Bounds3::empty();
                let mut b1 = Bounds3::empty();
                let mut count0 = 0;
                let mut count1 = 0;

                for j in 0..=i {
                    b0 = Bounds3::union(&b0, &buckets[j].bounds);
                    count0 += buckets[j].count;
                }
                for j in (i + 1)..N_BUCKETS {
                    b1 = Bounds3::union(&b1, &buckets[j].bounds);
                    count1 += buckets[j].count;
                }
                cost[i] = 1.0
                    + (count0 as f32 * b0.surface_area() + count1 as f32 * b1.surface_area())
                        / bounds.surface_area();
            }

            let mut min_cost = cost[0];
            let mut min_cost_split_bucket = 0usize;
            for i in 1..(N_BUCKETS - 1) {
                if cost[i] < min_cost {
                    min_cost = cost[i];
                    min_cost_split_bucket = i;
                }
            }

            let leaf_cost = num_tris as f32;
            if num_tris > MAX_TRIS_IN_NODE || min_cost < leaf_cost {
                let p_mid = itertools::partition(&mut triangle_info[start..end], |info| {
                    bucket_of(info) <= min_cost_split_bucket
                });
                mid = start + p_mid;
            } else {
                let first_tri_offset = ordered_tris.len();
                for i in start..end {
                    ordered_tris.push(mesh.triangle(triangle_info[i].tri_num));
                }

                return Box::new(BuildNode::new_leaf(first_tri_offset, num_tris, bounds));
            }
        }

        Box::new(BuildNode::new_interior(
            Bvh::recursive_build(triangle_info, start, mid, total_size, ordered_tris, mesh),
            Bvh::recursive_build(triangle_info, mid, end, total_size, ordered_tris, mesh),
        ))
    }

    fn flatten_tree(node: &BuildNode, linear_nodes: &mut Vec<LinearNode>) -> usize {
        let my_offset = linear_nodes.len();
        linear_nodes.push(LinearNode {
            bounds: node.bounds,
            offset: node.first_tri_offset as u32,
            num_tris: node.num_tris as u16,
        });

        if node.num_tris == 0 {
            Bvh::flatten_tree(node.children[0].as_ref().unwrap(), linear_nodes);
            let second_offset = Bvh::flatten_tree(node.children[1].as_ref().unwrap(), linear_nodes);
            linear_nodes[my_offset].offset = second_offset as u32;
        }

        my_offset
    }

    /// Closest point on the indexed surface, with the triangle that
    /// contains it. Returns `None` only for an empty index, which a
    /// successful build never produces.
    pub fn closest_point(&self, p: &na::Point3<f32>) -> Option<SurfacePoint> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<SurfacePoint> = None;
        let mut best_dist = f32::INFINITY;

        let mut to_visit_offset = 0;
        let mut curr_node_idx = 0;
        let mut nodes_to_visit = [0usize; 128];
        loop {
            let node = &self.nodes[curr_node_idx];

            if node.bounds.distance_squared(p) < best_dist {
                if node.num_tris > 0 {
                    for i in 0..node.num_tris as usize {
                        let triangle = self.triangles[node.offset as usize + i];
                        let candidate = closest_point_on_triangle(
                            p,
                            &self.positions[triangle[0] as usize],
                            &self.positions[triangle[1] as usize],
                            &self.positions[triangle[2] as usize],
                        );
                        let dist = (p - candidate).norm_squared();
                        if dist < best_dist {
                            best_dist = dist;
                            best = Some(SurfacePoint {
                                point: candidate,
                                triangle,
                                distance_squared: dist,
                            });
                        }
                    }

                    if to_visit_offset == 0 {
                        break;
                    }
                    to_visit_offset -= 1;
                    curr_node_idx = nodes_to_visit[to_visit_offset];
                } else {
                    // descend the nearer child first so the far subtree
                    // prunes against a tighter best distance
                    let first_child = curr_node_idx + 1;
                    let second_child = node.offset as usize;
                    let d_first = self.nodes[first_child].bounds.distance_squared(p);
                    let d_second = self.nodes[second_child].bounds.distance_squared(p);
                    let (near, far) = if d_first <= d_second {
                        (first_child, second_child)
                    } else {
                        (second_child, first_child)
                    };

                    nodes_to_visit[to_visit_offset] = far;
                    to_visit_offset += 1;
                    curr_node_idx = near;
                }
            } else {
                if to_visit_offset == 0 {
                    break;
                }
                to_visit_offset -= 1;
                curr_node_idx = nodes_to_visit[to_visit_offset];
            }
        }

        best
    }
}

/// Closest point to `p` on triangle (a, b, c), walking the Voronoi
/// regions of the triangle's vertices, edges, and face. Triangles with
/// (near-)coincident vertices collapse to their nearest vertex.
pub fn closest_point_on_triangle(
    p: &na::Point3<f32>,
    a: &na::Point3<f32>,
    b: &na::Point3<f32>,
    c: &na::Point3<f32>,
) -> na::Point3<f32> {
    let ab = b - a;
    let ac = c - a;

    if ab.cross(&ac).norm_squared() <= 1.0e-12 {
        let mut nearest = *a;
        let mut nearest_dist = (p - a).norm_squared();
        for q in &[b, c] {
            let dist = (p - *q).norm_squared();
            if dist < nearest_dist {
                nearest_dist = dist;
                nearest = **q;
            }
        }
        return nearest;
    }

    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + v * ab;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + w * ac;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + w * (c - b);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_log() -> slog::Logger {
        slog::Logger::root(slog::Discard, o!())
    }

    fn grid_mesh(n: usize) -> Mesh {
        let mut mesh = Mesh::default();
        for iy in 0..n {
            for ix in 0..n {
                mesh.pos.push(na::Point3::new(
                    ix as f32 / (n - 1) as f32,
                    iy as f32 / (n - 1) as f32,
                    ((ix * 7 + iy * 13) % 5) as f32 * 0.01,
                ));
            }
        }
        for iy in 0..(n - 1) {
            for ix in 0..(n - 1) {
                let v = (iy * n + ix) as u32;
                mesh.indices
                    .extend_from_slice(&[v, v + 1, v + n as u32 + 1]);
                mesh.indices
                    .extend_from_slice(&[v, v + n as u32 + 1, v + n as u32]);
            }
        }
        mesh.recompute_normals();
        mesh
    }

    #[test]
    fn test_closest_point_regions() {
        let a = na::Point3::origin();
        let b = na::Point3::new(1.0, 0.0, 0.0);
        let c = na::Point3::new(0.0, 1.0, 0.0);

        // interior projection
        approx::assert_relative_eq!(
            closest_point_on_triangle(&na::Point3::new(0.25, 0.25, 1.0), &a, &b, &c),
            na::Point3::new(0.25, 0.25, 0.0),
            epsilon = 0.000_001
        );
        // edge ab
        approx::assert_relative_eq!(
            closest_point_on_triangle(&na::Point3::new(0.5, -1.0, 0.0), &a, &b, &c),
            na::Point3::new(0.5, 0.0, 0.0),
            epsilon = 0.000_001
        );
        // vertex b
        approx::assert_relative_eq!(
            closest_point_on_triangle(&na::Point3::new(2.0, -1.0, 0.0), &a, &b, &c),
            b,
            epsilon = 0.000_001
        );
        // hypotenuse edge bc
        approx::assert_relative_eq!(
            closest_point_on_triangle(&na::Point3::new(1.0, 1.0, 0.0), &a, &b, &c),
            na::Point3::new(0.5, 0.5, 0.0),
            epsilon = 0.000_001
        );
    }

    #[test]
    fn test_closest_point_degenerate_triangle() {
        let a = na::Point3::new(1.0, 2.0, 3.0);
        let nearest = closest_point_on_triangle(&na::Point3::origin(), &a, &a, &a);

        assert_eq!(nearest, a);
    }

    #[test]
    fn test_empty_driver_is_rejected() {
        let mesh = Mesh::default();
        assert!(matches!(
            Bvh::new(&test_log(), &mesh),
            Err(WrapError::NoDriverGeometry)
        ));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mesh = Mesh::new(
            vec![0, 1, 7],
            vec![
                na::Point3::origin(),
                na::Point3::new(1.0, 0.0, 0.0),
                na::Point3::new(0.0, 1.0, 0.0),
            ],
            vec![],
        );
        assert!(matches!(
            Bvh::new(&test_log(), &mesh),
            Err(WrapError::IndexOutOfRange { index: 7, count: 3 })
        ));
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mesh = grid_mesh(9);
        let bvh = Bvh::new(&test_log(), &mesh).unwrap();

        let queries = [
            na::Point3::new(0.5, 0.5, 0.5),
            na::Point3::new(-0.3, 0.2, 0.1),
            na::Point3::new(1.2, 1.3, -0.4),
            na::Point3::new(0.13, 0.87, 0.02),
            na::Point3::new(0.0, 0.0, 0.0),
        ];
        for q in &queries {
            let hit = bvh.closest_point(q).unwrap();

            let mut brute_dist = f32::INFINITY;
            for t in 0..mesh.triangle_count() {
                let [a, b, c] = mesh.triangle_points(&mesh.triangle(t));
                let candidate = closest_point_on_triangle(q, &a, &b, &c);
                brute_dist = brute_dist.min((q - candidate).norm_squared());
            }

            approx::assert_relative_eq!(
                hit.distance_squared,
                brute_dist,
                epsilon = 0.000_01,
                max_relative = 0.000_1
            );
            approx::assert_relative_eq!(
                (q - hit.point).norm_squared(),
                hit.distance_squared,
                epsilon = 0.000_01
            );
        }
    }
}

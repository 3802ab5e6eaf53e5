use super::accelerator::Bvh;
use super::frame::{basis_components, frame_matrix, invert_frame};
use super::store::{BindRecord, BindStore};
use super::{BaryCoords, WrapError, WrapTransforms};
use crate::common::Mesh;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

/// Area-ratio barycentric weights of `p` within triangle (a, b, c).
/// The weights always sum to one and go negative for points outside
/// the triangle. A degenerate triangle resolves to (1, 0, 0) rather
/// than erroring.
pub fn barycentric_coords(
    p: &na::Point3<f32>,
    a: &na::Point3<f32>,
    b: &na::Point3<f32>,
    c: &na::Point3<f32>,
) -> BaryCoords {
    let n = (b - a).cross(&(c - a));
    // n̂ · n, the doubled signed area of the full triangle
    let denom = n.norm();
    if denom <= 1.0e-12 {
        return [1.0, 0.0, 0.0];
    }
    let n_hat = n / denom;

    let w0 = n_hat.dot(&(b - p).cross(&(c - p))) / denom;
    let w1 = n_hat.dot(&(c - p).cross(&(a - p))) / denom;

    [w0, w1, 1.0 - w0 - w1]
}

/// Binds every driven point to the closest point on the driver surface,
/// producing the store evaluation reads from. Each vertex records its
/// containing triangle, barycentric weights, and the inverse of the
/// local frame at bind time. `logical_indices`, when given, maps each
/// driven point to the host's (possibly sparse) vertex index; otherwise
/// points are indexed densely from zero.
///
/// Vertices whose query fails are left unbound rather than aborting the
/// pass; a bind that produces no bound vertices at all is reported as a
/// warning, not an error. Only a driver without any triangles fails the
/// whole pass.
pub fn bind(
    log: &slog::Logger,
    driver: &Mesh,
    driven_points: &[na::Point3<f32>],
    logical_indices: Option<&[usize]>,
    transforms: &WrapTransforms,
) -> Result<BindStore, WrapError> {
    let log = log.new(o!("module" => "binder"));

    if driver.normal.len() != driver.pos.len() {
        return Err(WrapError::MissingNormals {
            normals: driver.normal.len(),
            points: driver.pos.len(),
        });
    }

    let driver_common;
    let driver = if transforms.driver_is_identity() {
        driver
    } else {
        driver_common = driver.transformed(&transforms.driver_to_common);
        &driver_common
    };

    let bvh = Bvh::new(&log, driver)?;

    let records: Vec<Option<(usize, BindRecord)>> = driven_points
        .par_iter()
        .enumerate()
        .progress_count(driven_points.len() as u64)
        .map(|(i, p)| {
            let logical = match logical_indices {
                Some(indices) => *indices.get(i)?,
                None => i,
            };
            let p = transforms.driven_to_common.transform_point(p);
            let hit = bvh.closest_point(&p)?;

            let [a, b, c] = driver.triangle_points(&hit.triangle);
            let coords = barycentric_coords(&hit.point, &a, &b, &c);

            let (origin, normal, up) =
                basis_components(&coords, &hit.triangle, &driver.pos, &driver.normal);
            let bind_matrix = invert_frame(&frame_matrix(&origin, &normal, &up));

            Some((
                logical,
                BindRecord {
                    triangle_verts: hit.triangle,
                    bary: coords,
                    bind_matrix,
                },
            ))
        })
        .collect();

    let bound = records.iter().filter(|r| r.is_some()).count();
    let store: BindStore = records.into_iter().flatten().collect();

    if store.is_empty() {
        warn!(log, "binding produced no bound vertices");
    } else {
        info!(
            log,
            "bound {} of {} driven vertices",
            bound,
            driven_points.len()
        );
    }

    Ok(store)
}

use super::frame::{basis_components, frame_matrix};
use super::store::BindStore;
use super::{WrapError, WrapTransforms};
use crate::common::Mesh;
use rayon::prelude::*;

/// Deformation fidelity selection. `Frame` re-derives the local frame
/// from the current driver geometry and composes it with the stored
/// bind-time inverse, carrying the driven vertex's offset and
/// orientation relative to the driver surface. `Linear` blends current
/// driver positions by the stored barycentric weights only; cheaper,
/// but the driven surface collapses onto the driver (acceptable when
/// the driver deforms near-rigidly and the offset does not matter).
/// Both modes read the same records; `Linear` ignores the frame fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Frame,
    Linear,
}

/// Produces the deformed position of every driven vertex from the
/// current driver geometry and the bind store. Slot `i` of `rest_points`
/// and `out` corresponds to logical vertex index `i`; unbound vertices
/// pass through unchanged. A driver without triangles (or an empty
/// store) makes the whole pass a pass-through rather than an error.
///
/// Records must refer to the driver topology they were bound against;
/// topology edits require a re-bind. When the driver is in exactly its
/// bind pose, every bound vertex evaluates back to its rest position.
pub fn evaluate(
    log: &slog::Logger,
    driver: &Mesh,
    store: &BindStore,
    rest_points: &[na::Point3<f32>],
    transforms: &WrapTransforms,
    mode: WrapMode,
    out: &mut [na::Point3<f32>],
) -> Result<(), WrapError> {
    if out.len() != rest_points.len() {
        return Err(WrapError::MismatchedBuffers {
            expected: rest_points.len(),
            actual: out.len(),
        });
    }

    if driver.triangle_count() == 0 || store.is_empty() {
        trace!(log, "no driver geometry bound, passing positions through");
        out.copy_from_slice(rest_points);
        return Ok(());
    }

    if mode == WrapMode::Frame && driver.normal.len() != driver.pos.len() {
        return Err(WrapError::MissingNormals {
            normals: driver.normal.len(),
            points: driver.pos.len(),
        });
    }

    let driven_to_common = transforms.driven_to_common;
    let driven_from_common = driven_to_common
        .try_inverse()
        .ok_or(WrapError::NonInvertibleTransform)?;

    let driver_common;
    let driver = if transforms.driver_is_identity() {
        driver
    } else {
        driver_common = driver.transformed(&transforms.driver_to_common);
        &driver_common
    };

    out.par_iter_mut().enumerate().for_each(|(i, out_p)| {
        let rest = rest_points[i];
        *out_p = match store.get(i) {
            Some(record) => {
                let deformed = match mode {
                    WrapMode::Frame => {
                        let (origin, normal, up) = basis_components(
                            &record.bary,
                            &record.triangle_verts,
                            &driver.pos,
                            &driver.normal,
                        );
                        let delta = frame_matrix(&origin, &normal, &up) * record.bind_matrix;
                        delta.transform_point(&driven_to_common.transform_point(&rest))
                    }
                    WrapMode::Linear => {
                        let mut blended = na::Point3::origin();
                        for k in 0..3 {
                            blended += driver.pos[record.triangle_verts[k] as usize].coords
                                * record.bary[k];
                        }
                        blended
                    }
                };
                driven_from_common.transform_point(&deformed)
            }
            None => rest,
        };
    });

    Ok(())
}

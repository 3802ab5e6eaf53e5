pub mod accelerator;
pub mod binder;
pub mod evaluator;
pub mod frame;
pub mod store;

pub use binder::{barycentric_coords, bind};
pub use evaluator::{evaluate, WrapMode};
pub use store::{BindRecord, BindStore};

use thiserror::Error;

/// Barycentric weights for an ordered triangle-vertex triple. The
/// weights sum to one; components go negative for points outside the
/// triangle.
pub type BaryCoords = [f32; 3];

#[derive(Debug, Error)]
pub enum WrapError {
    #[error("driver mesh is absent or has no triangles")]
    NoDriverGeometry,

    #[error("triangle index {index} is out of range ({count} driver points)")]
    IndexOutOfRange { index: u32, count: usize },

    #[error("driver normals missing or mismatched ({normals} normals for {points} points)")]
    MissingNormals { normals: usize, points: usize },

    #[error("output buffer holds {actual} points, expected {expected}")]
    MismatchedBuffers { expected: usize, actual: usize },

    #[error("driven-to-common transform is not invertible")]
    NonInvertibleTransform,
}

/// Transforms bringing driver and driven geometry into one shared
/// evaluation space. Defaults to identities for hosts that already
/// express both meshes in the same space.
#[derive(Debug, Clone, Copy)]
pub struct WrapTransforms {
    pub driver_to_common: na::Matrix4<f32>,
    pub driven_to_common: na::Matrix4<f32>,
}

impl Default for WrapTransforms {
    fn default() -> Self {
        WrapTransforms {
            driver_to_common: na::Matrix4::identity(),
            driven_to_common: na::Matrix4::identity(),
        }
    }
}

impl WrapTransforms {
    pub fn driver_is_identity(&self) -> bool {
        self.driver_to_common == na::Matrix4::identity()
    }

    pub fn driven_is_identity(&self) -> bool {
        self.driven_to_common == na::Matrix4::identity()
    }
}

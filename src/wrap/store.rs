use super::BaryCoords;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything recorded for one driven vertex at bind time. Immutable
/// once created; a re-bind replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindRecord {
    /// Driver vertex indices of the triangle the vertex is bound to.
    pub triangle_verts: [u32; 3],
    /// Barycentric weights of the bound surface point in that triangle.
    pub bary: BaryCoords,
    /// Inverse of the local frame captured at bind time. Composing it
    /// with the frame rebuilt from the same driver geometry yields the
    /// identity, which makes evaluation a no-op at the bind pose.
    pub bind_matrix: na::Matrix4<f32>,
}

/// Per-vertex bind records keyed by the host's logical vertex indices,
/// which need not be contiguous. Written once by the bind pass and only
/// read afterwards; a re-bind swaps in a whole new store rather than
/// mutating in place, so concurrent readers always observe a consistent
/// binding. Vertices without a record are unbound and pass through
/// evaluation unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindStore {
    records: BTreeMap<usize, BindRecord>,
}

impl BindStore {
    pub fn new() -> Self {
        BindStore::default()
    }

    pub fn insert(&mut self, index: usize, record: BindRecord) {
        self.records.insert(index, record);
    }

    pub fn get(&self, index: usize) -> Option<&BindRecord> {
        self.records.get(&index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bound records in ascending logical-index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BindRecord)> {
        self.records.iter().map(|(&index, record)| (index, record))
    }

    /// Logical indices that received a record.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.records.keys().copied()
    }
}

impl FromIterator<(usize, BindRecord)> for BindStore {
    fn from_iter<I: IntoIterator<Item = (usize, BindRecord)>>(iter: I) -> Self {
        BindStore {
            records: iter.into_iter().collect(),
        }
    }
}

//! Voxel data type

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;

/// Hermite sample for the positive edge leaving a voxel along one axis:
/// the normalized crossing position between this voxel and its +1 neighbor
/// plus the surface normal at that crossing. A zero normal means the edge
/// carries no crossing.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct HermiteEdge {
    /// Crossing position in [0, 1] along the edge
    pub offset: f32,
    /// Surface normal at the crossing, pointing out of the solid
    pub normal: Vec3,
}

impl HermiteEdge {
    pub fn new(offset: f32, normal: Vec3) -> Self {
        Self { offset, normal }
    }

    /// Whether this edge carries a surface crossing
    pub fn has_crossing(&self) -> bool {
        self.normal != Vec3::ZERO
    }
}

/// A single voxel: material id plus Hermite data for the three positive
/// edges (X = 0, Y = 1, Z = 2). Material 0 is empty space; any other value
/// is an opaque material identifier.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Voxel {
    pub material: i32,
    pub edges: [HermiteEdge; 3],
}

impl Voxel {
    /// Empty-space voxel
    pub const EMPTY: Voxel = Voxel {
        material: 0,
        edges: [HermiteEdge {
            offset: 0.0,
            normal: Vec3::ZERO,
        }; 3],
    };

    /// Check if this voxel is empty space
    pub fn is_empty(&self) -> bool {
        self.material == 0
    }

    /// Copy of this voxel with a different material
    pub fn with_material(self, material: i32) -> Self {
        Self { material, ..self }
    }

    /// Copy of this voxel with one edge sample replaced
    pub fn with_edge(self, axis: usize, edge: HermiteEdge) -> Self {
        let mut edges = self.edges;
        edges[axis] = edge;
        Self { edges, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(Voxel::EMPTY.is_empty());
        assert!(!Voxel::EMPTY.with_material(1).is_empty());
    }

    #[test]
    fn test_with_edge() {
        let edge = HermiteEdge::new(0.5, Vec3::X);
        let voxel = Voxel::EMPTY.with_material(2).with_edge(1, edge);

        assert_eq!(voxel.material, 2);
        assert_eq!(voxel.edges[1], edge);
        assert!(!voxel.edges[0].has_crossing());
        assert!(voxel.edges[1].has_crossing());
    }

    #[test]
    fn test_pod_layout() {
        // Snapshots cast voxel grids to raw bytes; the layout must be dense
        assert_eq!(std::mem::size_of::<Voxel>(), 52);
        assert_eq!(std::mem::size_of::<HermiteEdge>(), 16);
    }
}

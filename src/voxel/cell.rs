//! Per-cell extraction contract.
//!
//! The external polygonizer consumes one cubical cell at a time: the 8
//! corner materials plus the 12 edge Hermite samples, in the fixed index
//! order below. Corners wind counterclockwise around the bottom face
//! (y+0) then the top face (y+1); edges 0-7 alternate X- and Z-aligned
//! edges of those two rings, edges 8-11 are the vertical Y edges.

use crate::core::types::Vec3;
use crate::voxel::voxel::Voxel;

/// One cell's worth of extraction input
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellData {
    pub materials: [i32; 8],
    pub intersections: [f32; 12],
    pub normals: [Vec3; 12],
}

impl CellData {
    /// Assemble a cell from its 8 corner voxels. `corner(dx, dy, dz)`
    /// returns the voxel at the given unit offset from the cell origin.
    pub fn from_corners(corner: impl Fn(usize, usize, usize) -> Voxel) -> Self {
        let c000 = corner(0, 0, 0);
        let c100 = corner(1, 0, 0);
        let c101 = corner(1, 0, 1);
        let c001 = corner(0, 0, 1);
        let c010 = corner(0, 1, 0);
        let c110 = corner(1, 1, 0);
        let c111 = corner(1, 1, 1);
        let c011 = corner(0, 1, 1);

        let materials = [
            c000.material,
            c100.material,
            c101.material,
            c001.material,
            c010.material,
            c110.material,
            c111.material,
            c011.material,
        ];

        let samples = [
            c000.edges[0], // 0: bottom ring, X edge at z+0
            c100.edges[2], // 1: bottom ring, Z edge at x+1
            c001.edges[0], // 2: bottom ring, X edge at z+1
            c000.edges[2], // 3: bottom ring, Z edge at x+0
            c010.edges[0], // 4: top ring, X edge at z+0
            c110.edges[2], // 5: top ring, Z edge at x+1
            c011.edges[0], // 6: top ring, X edge at z+1
            c010.edges[2], // 7: top ring, Z edge at x+0
            c000.edges[1], // 8: Y edge at (x+0, z+0)
            c100.edges[1], // 9: Y edge at (x+1, z+0)
            c101.edges[1], // 10: Y edge at (x+1, z+1)
            c001.edges[1], // 11: Y edge at (x+0, z+1)
        ];

        let mut intersections = [0.0; 12];
        let mut normals = [Vec3::ZERO; 12];
        for (i, sample) in samples.iter().enumerate() {
            intersections[i] = sample.offset;
            normals[i] = sample.normal;
        }

        Self {
            materials,
            intersections,
            normals,
        }
    }

    /// Whether the cell straddles the surface at all
    pub fn is_mixed(&self) -> bool {
        let first_empty = self.materials[0] == 0;
        self.materials.iter().any(|&m| (m == 0) != first_empty)
    }
}

#[cfg(test)]
mod tests {
    use crate::voxel::voxel::HermiteEdge;
    use super::*;

    #[test]
    fn test_corner_material_order() {
        let cell = CellData::from_corners(|x, y, z| {
            Voxel::EMPTY.with_material((x + y * 4 + z * 2) as i32 + 1)
        });
        // (x, y, z) -> x + 4y + 2z + 1, in contract corner order
        assert_eq!(cell.materials, [1, 2, 4, 3, 5, 6, 8, 7]);
    }

    #[test]
    fn test_edge_sample_placement() {
        // A single crossing on the cell origin's +Y edge must land at
        // contract index 8 and nowhere else.
        let edge = HermiteEdge::new(0.25, Vec3::Y);
        let cell = CellData::from_corners(|x, y, z| {
            if (x, y, z) == (0, 0, 0) {
                Voxel::EMPTY.with_material(1).with_edge(1, edge)
            } else {
                Voxel::EMPTY
            }
        });

        assert_eq!(cell.intersections[8], 0.25);
        assert_eq!(cell.normals[8], Vec3::Y);
        for i in (0..12).filter(|&i| i != 8) {
            assert_eq!(cell.normals[i], Vec3::ZERO, "unexpected normal at {i}");
        }
    }

    #[test]
    fn test_is_mixed() {
        let solid = CellData::from_corners(|_, _, _| Voxel::EMPTY.with_material(1));
        assert!(!solid.is_mixed());

        let mixed = CellData::from_corners(|x, _, _| {
            if x == 0 { Voxel::EMPTY.with_material(1) } else { Voxel::EMPTY }
        });
        assert!(mixed.is_mixed());
    }
}

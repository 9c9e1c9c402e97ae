//! Ray/triangle intersection

use crate::core::types::Vec3;

const EPSILON: f32 = 1e-5;

/// Möller-Trumbore ray/triangle intersection, two-sided.
/// Returns the parametric distance along `dir` plus the barycentric
/// coordinates u and v.
pub fn intersect_triangle(
    orig: Vec3,
    dir: Vec3,
    vert0: Vec3,
    vert1: Vec3,
    vert2: Vec3,
) -> Option<(f32, f32, f32)> {
    let edge1 = vert1 - vert0;
    let edge2 = vert2 - vert0;

    let pvec = dir.cross(edge2);
    let det = edge1.dot(pvec);

    let tvec = orig - vert0;
    let inv_det = 1.0 / det;
    let qvec = tvec.cross(edge1);

    let mut u;
    let mut v;
    if det > EPSILON {
        u = tvec.dot(pvec);
        if u < 0.0 || u > det {
            return None;
        }
        v = dir.dot(qvec);
        if v < 0.0 || u + v > det {
            return None;
        }
    } else if det < -EPSILON {
        u = tvec.dot(pvec);
        if u > 0.0 || u < det {
            return None;
        }
        v = dir.dot(qvec);
        if v > 0.0 || u + v < det {
            return None;
        }
    } else {
        // Ray parallel to the triangle plane
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    u *= inv_det;
    v *= inv_det;

    Some((t, u, v))
}

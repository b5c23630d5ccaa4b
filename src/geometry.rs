//! Closest-point queries and numeric helpers shared by the force kernels.

use crate::float::Float;
use crate::vec::Vec2;

/// Squared-distance tolerance below which geometry counts as degenerate.
fn eps<F: Float>() -> F {
    F::from_f32(1e-9)
}

/// Clamp a parameter to the unit interval.
pub fn clamp01<F: Float>(v: F) -> F {
    v.clamp(F::zero(), F::one())
}

/// Exponential with the argument clamped to [-50, 50].
///
/// Overlapping geometry can otherwise drive the exponent far enough to
/// overflow to infinity and poison the force buffer.
pub fn safe_exp<F: Float>(x: F) -> F {
    x.clamp(F::from_f32(-50.0), F::from_f32(50.0)).exp()
}

/// Wrap an angle into (-pi, pi].
pub fn wrap_to_pi<F: Float>(a: F) -> F {
    let two_pi = F::two() * F::pi();
    let shifted = a + F::pi();
    let wrapped = shifted - (shifted / two_pi).floor() * two_pi;
    wrapped - F::pi()
}

/// Result of projecting a point onto a segment.
#[derive(Copy, Clone, Debug)]
pub struct PointOnSegment<F: Float> {
    /// Parameter along the segment, in [0, 1].
    pub t: F,
    /// The closest point on the segment.
    pub closest: Vec2<F>,
    /// Vector from the closest point to the query point.
    pub delta: Vec2<F>,
    /// Squared distance from the query point to the segment.
    pub dist_sq: F,
}

/// Closest point on the segment `a..b` to the query point `p`.
///
/// A zero-length segment collapses to `a` (t = 0). The returned point always
/// lies on the segment; `delta` may be zero when `p` is on it.
pub fn closest_point_on_segment<F: Float>(p: Vec2<F>, a: Vec2<F>, b: Vec2<F>) -> PointOnSegment<F> {
    let ab = b - a;
    let len_sq = ab.length_sq();
    let t = if len_sq <= eps() {
        F::zero()
    } else {
        clamp01((p - a).dot(ab) / len_sq)
    };
    let closest = a + ab.scale(t);
    let delta = p - closest;
    PointOnSegment { t, closest, delta, dist_sq: delta.length_sq() }
}

/// Result of the closest-point query between two segments.
#[derive(Copy, Clone, Debug)]
pub struct SegmentPair<F: Float> {
    /// Parameter on the first segment, in [0, 1].
    pub s: F,
    /// Parameter on the second segment, in [0, 1].
    pub t: F,
    /// Closest point on the first segment.
    pub c1: Vec2<F>,
    /// Closest point on the second segment.
    pub c2: Vec2<F>,
    /// Squared distance between the closest points.
    pub dist_sq: F,
}

/// Closest points between segments `p1..q1` and `p2..q2`.
///
/// Handles both segments degenerating to points, one of them degenerating,
/// and the parallel case (where the first parameter is pinned to 0).
pub fn closest_points_on_segments<F: Float>(
    p1: Vec2<F>,
    q1: Vec2<F>,
    p2: Vec2<F>,
    q2: Vec2<F>,
) -> SegmentPair<F> {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_sq();
    let e = d2.length_sq();
    let f = d2.dot(r);

    let (s, t);
    if a <= eps() && e <= eps() {
        // Both segments are points.
        s = F::zero();
        t = F::zero();
    } else if a <= eps() {
        // First segment is a point; clamp onto the second.
        s = F::zero();
        t = clamp01(f / e);
    } else {
        let c = d1.dot(r);
        if e <= eps() {
            // Second segment is a point; clamp onto the first.
            t = F::zero();
            s = clamp01(-c / a);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let s0 = if denom.abs() > eps() {
                clamp01((b * f - c * e) / denom)
            } else {
                // Parallel segments.
                F::zero()
            };
            let tnom = b * s0 + f;
            if tnom < F::zero() {
                t = F::zero();
                s = clamp01(-c / a);
            } else if tnom > e {
                t = F::one();
                s = clamp01((b - c) / a);
            } else {
                t = tnom / e;
                s = s0;
            }
        }
    }

    let c1 = p1 + d1.scale(s);
    let c2 = p2 + d2.scale(t);
    SegmentPair { s, t, c1, c2, dist_sq: (c1 - c2).length_sq() }
}

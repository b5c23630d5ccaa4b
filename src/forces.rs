//! Force assembly kernels.
//!
//! Every kernel accumulates into the shared per-point force buffer. Pair
//! kernels split each contribution across segment endpoints by the closest
//! point parameter, so action and reaction stay balanced. A contribution
//! that comes out non-finite is dropped and assembly continues.

use alloc::vec::Vec;

use crate::float::Float;
use crate::geometry::{closest_point_on_segment, closest_points_on_segments, safe_exp, wrap_to_pi};
use crate::grid::SegmentGrid;
use crate::problem::{Bounds, InteractionParams};
use crate::state::CachedState;
use crate::vec::Vec2;

fn eps<F: Float>() -> F {
    F::from_f32(1e-9)
}

/// Repulsion magnitude for a signed gap (actual minus required distance).
///
/// Overlap amplifies twice: through the multiplier and through the exponent
/// turning positive.
pub(crate) fn repulsion_magnitude<F: Float>(gap: F, params: &InteractionParams<F>) -> F {
    let overlap = if gap < F::zero() {
        params.overlap_multiplier
    } else {
        F::one()
    };
    let decay = if params.exponential_decay == F::zero() {
        F::one()
    } else {
        safe_exp(-params.exponential_decay * gap)
    };
    params.strength * overlap * decay
}

/// Deterministic push direction for a segment pair.
///
/// Separated pairs push along the line between closest points. Touching
/// pairs fall back to the midpoint difference, then to the left
/// perpendicular of the first segment, then to +x.
fn pair_direction<F: Float>(
    c1: Vec2<F>,
    c2: Vec2<F>,
    dist_sq: F,
    p1: Vec2<F>,
    q1: Vec2<F>,
    p2: Vec2<F>,
    q2: Vec2<F>,
) -> Vec2<F> {
    if dist_sq > eps() {
        return (c1 - c2).scale(F::one() / dist_sq.sqrt());
    }
    let mid = (p1 + q1).scale(F::half()) - (p2 + q2).scale(F::half());
    if mid.length_sq() > eps() {
        return mid.normalize();
    }
    let perp = (q1 - p1).perp();
    if perp.length_sq() > eps() {
        return perp.normalize();
    }
    Vec2::new(F::one(), F::zero())
}

/// Segment vs segment repulsion over broadphase candidate pairs.
pub(crate) fn segment_segment<F: Float>(
    state: &mut CachedState<F>,
    grid: &mut SegmentGrid<F>,
    params: &InteractionParams<F>,
    scratch: &mut Vec<u32>,
) {
    if params.strength == F::zero() {
        return;
    }
    for i in 0..state.segment_count() {
        let Some((a1, b1)) = state.endpoints[i] else {
            continue;
        };
        grid.candidates_above(i, scratch);
        for &cand in scratch.iter() {
            let j = cand as usize;
            let Some((a2, b2)) = state.endpoints[j] else {
                continue;
            };
            if state.seg_layer[i] != state.seg_layer[j] {
                continue;
            }
            if a1 == a2 || a1 == b2 || b1 == a2 || b1 == b2 {
                continue;
            }
            if !state.movable[a1] && !state.movable[b1] && !state.movable[a2] && !state.movable[b2]
            {
                continue;
            }

            let p1 = state.position(a1);
            let q1 = state.position(b1);
            let p2 = state.position(a2);
            let q2 = state.position(b2);
            let pair = closest_points_on_segments(p1, q1, p2, q2);

            let required = state.half_width[i] + state.half_width[j] + params.min_separation;
            let gap = pair.dist_sq.sqrt() - required;
            let mag = repulsion_magnitude(gap, params);
            if !mag.is_finite() {
                continue;
            }

            let dir = pair_direction(pair.c1, pair.c2, pair.dist_sq, p1, q1, p2, q2);
            let push = dir.scale(mag);
            let s = pair.s;
            let t = pair.t;
            state.fx[a1] = state.fx[a1] + push.x * (F::one() - s);
            state.fy[a1] = state.fy[a1] + push.y * (F::one() - s);
            state.fx[b1] = state.fx[b1] + push.x * s;
            state.fy[b1] = state.fy[b1] + push.y * s;
            state.fx[a2] = state.fx[a2] - push.x * (F::one() - t);
            state.fy[a2] = state.fy[a2] - push.y * (F::one() - t);
            state.fx[b2] = state.fx[b2] - push.x * t;
            state.fy[b2] = state.fy[b2] - push.y * t;
        }
    }
}

/// Point vs segment repulsion over the 3x3 neighborhood of each point.
pub(crate) fn point_segment<F: Float>(
    state: &mut CachedState<F>,
    grid: &mut SegmentGrid<F>,
    params: &InteractionParams<F>,
    scratch: &mut Vec<u32>,
) {
    if params.strength == F::zero() {
        return;
    }
    for p in 0..state.point_count() {
        grid.segments_near(state.px[p], state.py[p], scratch);
        for &cand in scratch.iter() {
            let s = cand as usize;
            let Some((a, b)) = state.endpoints[s] else {
                continue;
            };
            if a == p || b == p {
                continue;
            }
            if !state.point_layers[p].contains(state.seg_layer[s]) {
                continue;
            }
            if !state.movable[p] && !state.movable[a] && !state.movable[b] {
                continue;
            }

            let pos = state.position(p);
            let pa = state.position(a);
            let pb = state.position(b);
            let hit = closest_point_on_segment(pos, pa, pb);

            let required = state.radius[p] + state.half_width[s] + params.min_separation;
            let gap = hit.dist_sq.sqrt() - required;
            let mag = repulsion_magnitude(gap, params);
            if !mag.is_finite() {
                continue;
            }

            // Off the carrier line, push straight away from it; on the line,
            // push out along the left perpendicular, +x as a last resort.
            let dir = if hit.dist_sq > eps() {
                hit.delta.scale(F::one() / hit.dist_sq.sqrt())
            } else {
                let perp = (pb - pa).perp();
                if perp.length_sq() > eps() {
                    perp.normalize()
                } else {
                    Vec2::new(F::one(), F::zero())
                }
            };
            let push = dir.scale(mag);
            let t = hit.t;
            state.fx[p] = state.fx[p] + push.x;
            state.fy[p] = state.fy[p] + push.y;
            state.fx[a] = state.fx[a] - push.x * (F::one() - t);
            state.fy[a] = state.fy[a] - push.y * (F::one() - t);
            state.fx[b] = state.fx[b] - push.x * t;
            state.fy[b] = state.fy[b] - push.y * t;
        }
    }
}

/// Axis-aligned keep-in force toward the effective bounds rectangle.
///
/// Applied to every point. Non-movable points never integrate, so the
/// accumulation on their slots is inert.
pub(crate) fn boundary<F: Float>(
    state: &mut CachedState<F>,
    bounds: &Bounds<F>,
    params: &InteractionParams<F>,
) {
    if params.strength == F::zero() {
        return;
    }
    let pad = bounds.boundary_padding;
    for i in 0..state.point_count() {
        let r = state.radius[i];
        let lo_x = bounds.min_x + pad + r;
        let hi_x = bounds.max_x - pad - r;
        let lo_y = bounds.min_y + pad + r;
        let hi_y = bounds.max_y - pad - r;

        let edges = [
            (state.px[i] - lo_x, F::one(), F::zero()),
            (hi_x - state.px[i], -F::one(), F::zero()),
            (state.py[i] - lo_y, F::zero(), F::one()),
            (hi_y - state.py[i], F::zero(), -F::one()),
        ];
        for (gap, dx, dy) in edges {
            let mag = repulsion_magnitude(gap, params);
            if !mag.is_finite() {
                continue;
            }
            state.fx[i] = state.fx[i] + dx * mag;
            state.fy[i] = state.fy[i] + dy * mag;
        }
    }
}

/// Restoring force pulling fixed-length segments back to their rest length.
pub(crate) fn fixed_length<F: Float>(state: &mut CachedState<F>, params: &InteractionParams<F>) {
    if params.strength == F::zero() {
        return;
    }
    for s in 0..state.segment_count() {
        if !state.fixed_length[s] {
            continue;
        }
        let Some((a, b)) = state.endpoints[s] else {
            continue;
        };
        if !state.movable[a] && !state.movable[b] {
            continue;
        }
        let d = state.position(b) - state.position(a);
        let len = d.length();
        if len <= eps() {
            continue;
        }
        let err = len - state.rest_length[s];
        let gain = if params.exponential_decay == F::zero() {
            F::one()
        } else {
            safe_exp(params.exponential_decay * err.abs())
        };
        let mag = params.strength * err * gain;
        if !mag.is_finite() {
            continue;
        }
        let axis = d.scale(F::one() / len);
        state.fx[a] = state.fx[a] + axis.x * mag;
        state.fy[a] = state.fy[a] + axis.y * mag;
        state.fx[b] = state.fx[b] - axis.x * mag;
        state.fy[b] = state.fy[b] - axis.y * mag;
    }
}

/// Restoring couple rotating fixed-orientation segments back to their rest
/// angle. Length-scaled so long and short segments turn at the same rate.
pub(crate) fn fixed_orientation<F: Float>(
    state: &mut CachedState<F>,
    params: &InteractionParams<F>,
) {
    if params.strength == F::zero() {
        return;
    }
    for s in 0..state.segment_count() {
        if !state.fixed_orientation[s] {
            continue;
        }
        let Some((a, b)) = state.endpoints[s] else {
            continue;
        };
        if !state.movable[a] && !state.movable[b] {
            continue;
        }
        let d = state.position(b) - state.position(a);
        let len = d.length();
        if len <= eps() {
            continue;
        }
        let angle = F::atan2(d.y, d.x);
        let err = wrap_to_pi(angle - state.rest_angle[s]);
        let gain = if params.exponential_decay == F::zero() {
            F::one()
        } else {
            safe_exp(params.exponential_decay * err.abs())
        };
        let mag = params.strength * err * len * gain;
        if !mag.is_finite() {
            continue;
        }
        let normal = d.scale(F::one() / len).perp();
        state.fx[a] = state.fx[a] + normal.x * mag;
        state.fy[a] = state.fy[a] + normal.y * mag;
        state.fx[b] = state.fx[b] - normal.x * mag;
        state.fy[b] = state.fy[b] - normal.y * mag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{PointDef, Problem, SegmentDef};

    fn setup(problem: &Problem<f64>) -> (CachedState<f64>, SegmentGrid<f64>) {
        let state = CachedState::build(problem);
        let mut grid = SegmentGrid::new(
            problem.bounds.min_x,
            problem.bounds.min_y,
            state.cell_size,
            state.global_influence,
        );
        grid.rebuild(&state);
        (state, grid)
    }

    fn force_sum(state: &CachedState<f64>) -> (f64, f64) {
        (state.fx.iter().sum(), state.fy.iter().sum())
    }

    #[test]
    fn magnitude_plateau_without_decay() {
        let params = InteractionParams::new(2.0).with_overlap_multiplier(5.0);
        assert_eq!(repulsion_magnitude(3.0, &params), 2.0);
        assert_eq!(repulsion_magnitude(-0.1, &params), 10.0);
    }

    #[test]
    fn magnitude_decays_with_gap() {
        let params = InteractionParams::new(1.0).with_decay(2.0);
        let near = repulsion_magnitude(0.5, &params);
        let far = repulsion_magnitude(2.0, &params);
        assert!(near > far);
        assert!((near - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn segment_pair_forces_balance() {
        let p = Problem::new(crate::problem::Bounds::new(0.0, 0.0, 100.0, 100.0))
            .with_point(PointDef::new("a", 10.0, 10.0).on_layer("0"))
            .with_point(PointDef::new("b", 20.0, 10.0).on_layer("0"))
            .with_point(PointDef::new("c", 12.0, 12.0).on_layer("0"))
            .with_point(PointDef::new("d", 22.0, 12.0).on_layer("0"))
            .with_segment(SegmentDef::new("s0", "a", "b").with_width(1.0).on_layer("0"))
            .with_segment(SegmentDef::new("s1", "c", "d").with_width(1.0).on_layer("0"))
            .with_seg_seg(InteractionParams::new(3.0).with_decay(0.25).with_min_separation(1.0));
        let (mut state, mut grid) = setup(&p);
        let mut scratch = Vec::new();

        segment_segment(&mut state, &mut grid, &p.seg_seg, &mut scratch);
        let (sx, sy) = force_sum(&state);
        assert!(sx.abs() < 1e-12, "net x force {sx}");
        assert!(sy.abs() < 1e-12, "net y force {sy}");
        // The lower pair is pushed down, the upper pair up.
        assert!(state.fy[0] < 0.0 && state.fy[2] > 0.0);
    }

    #[test]
    fn shared_endpoint_pairs_skip() {
        let p = Problem::new(crate::problem::Bounds::new(0.0, 0.0, 100.0, 100.0))
            .with_point(PointDef::new("a", 10.0, 10.0).on_layer("0"))
            .with_point(PointDef::new("b", 20.0, 10.0).on_layer("0"))
            .with_point(PointDef::new("c", 20.0, 20.0).on_layer("0"))
            .with_segment(SegmentDef::new("s0", "a", "b").on_layer("0"))
            .with_segment(SegmentDef::new("s1", "b", "c").on_layer("0"))
            .with_seg_seg(InteractionParams::new(10.0));
        let (mut state, mut grid) = setup(&p);
        let mut scratch = Vec::new();

        segment_segment(&mut state, &mut grid, &p.seg_seg, &mut scratch);
        assert_eq!(force_sum(&state), (0.0, 0.0));
        assert!(state.fx.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn point_segment_forces_balance() {
        let p = Problem::new(crate::problem::Bounds::new(0.0, 0.0, 100.0, 100.0))
            .with_point(PointDef::new("a", 0.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("b", 10.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("p", 4.0, 2.0).with_radius(1.0).on_layer("0"))
            .with_segment(SegmentDef::new("s", "a", "b").with_width(2.0).on_layer("0"))
            .with_point_seg(InteractionParams::new(2.0).with_decay(1.0).with_min_separation(0.5));
        let (mut state, mut grid) = setup(&p);
        let mut scratch = Vec::new();

        point_segment(&mut state, &mut grid, &p.point_seg, &mut scratch);
        let (sx, sy) = force_sum(&state);
        assert!(sx.abs() < 1e-12 && sy.abs() < 1e-12);
        // Point pushed away from the segment, endpoints pulled the other way.
        assert!(state.fy[2] > 0.0);
        assert!(state.fy[0] < 0.0 && state.fy[1] < 0.0);
        // Split follows the projection parameter (t = 0.4).
        assert!(state.fy[0].abs() > state.fy[1].abs());
    }

    #[test]
    fn endpoint_point_is_excluded() {
        let p = Problem::new(crate::problem::Bounds::new(0.0, 0.0, 100.0, 100.0))
            .with_point(PointDef::new("a", 0.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("b", 10.0, 0.0).on_layer("0"))
            .with_segment(SegmentDef::new("s", "a", "b").with_width(2.0).on_layer("0"))
            .with_point_seg(InteractionParams::new(5.0).with_min_separation(4.0));
        let (mut state, mut grid) = setup(&p);
        let mut scratch = Vec::new();

        point_segment(&mut state, &mut grid, &p.point_seg, &mut scratch);
        assert!(state.fx.iter().chain(state.fy.iter()).all(|&f| f == 0.0));
    }

    #[test]
    fn overlapping_parallel_segments_use_midpoint_direction() {
        let p = Problem::new(crate::problem::Bounds::new(-50.0, -50.0, 50.0, 50.0))
            .with_point(PointDef::new("a", 0.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("b", 10.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("c", 2.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("d", 12.0, 0.0).on_layer("0"))
            .with_segment(SegmentDef::new("s0", "a", "b").on_layer("0"))
            .with_segment(SegmentDef::new("s1", "c", "d").on_layer("0"))
            .with_seg_seg(InteractionParams::new(1.0));
        let (mut state, mut grid) = setup(&p);
        let mut scratch = Vec::new();

        segment_segment(&mut state, &mut grid, &p.seg_seg, &mut scratch);
        // Midpoints differ along -x, so the first segment is pushed -x and
        // the second +x.
        assert!(state.fx[0] < 0.0 && state.fx[2] > 0.0);
        assert!(force_sum(&state).0.abs() < 1e-12);
    }

    #[test]
    fn boundary_pushes_inward_from_all_sides() {
        let p = Problem::new(crate::problem::Bounds::new(0.0, 0.0, 10.0, 10.0))
            .with_point(PointDef::new("low", -1.0, 5.0).on_layer("0"))
            .with_point(PointDef::new("high", 5.0, 14.0).on_layer("0"))
            .with_boundary(InteractionParams::new(2.0).with_decay(1.0).with_overlap_multiplier(3.0));
        let (mut state, _grid) = setup(&p);

        boundary(&mut state, &p.bounds, &p.boundary);
        // Outside the left edge: the inward push dominates the far edge pull.
        assert!(state.fx[0] > 0.0);
        // Above the top edge: pushed back down.
        assert!(state.fy[1] < 0.0);
    }

    #[test]
    fn fixed_length_pulls_stretched_segment_together() {
        let p = Problem::new(crate::problem::Bounds::new(0.0, 0.0, 100.0, 100.0))
            .with_point(PointDef::new("a", 0.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("b", 10.0, 0.0).on_layer("0"))
            .with_segment(SegmentDef::new("s", "a", "b").on_layer("0").fixed_length())
            .with_fixed_length(InteractionParams::new(1.0));
        let (mut state, _grid) = setup(&p);
        // Stretch past rest length.
        state.px[1] = 16.0;

        fixed_length(&mut state, &p.fixed_length);
        assert!(state.fx[0] > 0.0, "start pulled toward end");
        assert!(state.fx[1] < 0.0, "end pulled toward start");
        assert!((state.fx[0] + state.fx[1]).abs() < 1e-12);
    }

    #[test]
    fn fixed_orientation_applies_couple() {
        let p = Problem::new(crate::problem::Bounds::new(0.0, 0.0, 100.0, 100.0))
            .with_point(PointDef::new("a", 0.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("b", 10.0, 0.0).on_layer("0"))
            .with_segment(SegmentDef::new("s", "a", "b").on_layer("0").fixed_orientation())
            .with_fixed_orientation(InteractionParams::new(1.0));
        let (mut state, _grid) = setup(&p);
        // Rotate the far end up; rest angle is 0.
        state.px[1] = 0.0;
        state.py[1] = 10.0;

        fixed_orientation(&mut state, &p.fixed_orientation);
        // Couple turns the segment back toward angle zero.
        assert!(state.fx[1] > 0.0);
        assert!(state.fx[0] < 0.0);
        assert!((state.fx[0] + state.fx[1]).abs() < 1e-9);
        assert!((state.fy[0] + state.fy[1]).abs() < 1e-9);
    }
}

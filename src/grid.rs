//! Uniform spatial hash over segment bounding boxes.
//!
//! Rebuilt from scratch every step: each live segment's AABB, expanded by the
//! global influence distance, is registered in every cell it covers. Queries
//! walk cell lists and deduplicate candidates with a per-segment visited mark
//! so a segment spanning several cells is reported once per query.

use alloc::vec::Vec;
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::float::Float;
use crate::state::CachedState;

/// Cell coordinates must stay within [-2^25, 2^25 - 1] for the key encoding
/// to be collision-free.
const CELL_BIAS: i64 = 1 << 25;
const CELL_STRIDE: i64 = 1 << 26;

/// Inclusive cell range covered by one segment. `max < min` marks a segment
/// that is not in the grid this step.
#[derive(Copy, Clone, Debug)]
struct CellRange {
    min_cx: i64,
    min_cy: i64,
    max_cx: i64,
    max_cy: i64,
}

const EMPTY_RANGE: CellRange = CellRange { min_cx: 0, min_cy: 0, max_cx: -1, max_cy: -1 };

pub(crate) struct SegmentGrid<F: Float> {
    origin_x: F,
    origin_y: F,
    cell_size: F,
    influence: F,
    cells: HashMap<i64, Vec<u32>, FxBuildHasher>,
    ranges: Vec<CellRange>,
    visited: Vec<u32>,
    query_id: u32,
}

impl<F: Float> SegmentGrid<F> {
    /// The origin is pinned to the bounds corner so cell coordinates stay
    /// stable while geometry moves.
    pub fn new(origin_x: F, origin_y: F, cell_size: F, influence: F) -> Self {
        SegmentGrid {
            origin_x,
            origin_y,
            cell_size,
            influence,
            cells: HashMap::with_hasher(FxBuildHasher::default()),
            ranges: Vec::new(),
            visited: Vec::new(),
            query_id: 0,
        }
    }

    fn cell_x(&self, x: F) -> i64 {
        ((x - self.origin_x) / self.cell_size).floor().to_i64()
    }

    fn cell_y(&self, y: F) -> i64 {
        ((y - self.origin_y) / self.cell_size).floor().to_i64()
    }

    fn key(cx: i64, cy: i64) -> i64 {
        (cx + CELL_BIAS) * CELL_STRIDE + (cy + CELL_BIAS)
    }

    /// Register every live segment in the cells its expanded AABB covers.
    pub fn rebuild(&mut self, state: &CachedState<F>) {
        let n = state.segment_count();
        self.cells.clear();
        self.ranges.clear();
        self.ranges.resize(n, EMPTY_RANGE);
        self.visited.clear();
        self.visited.resize(n, 0);
        self.query_id = 0;

        for i in 0..n {
            let Some((a, b)) = state.endpoints[i] else {
                continue;
            };
            let (ax, ay) = (state.px[a], state.py[a]);
            let (bx, by) = (state.px[b], state.py[b]);
            let range = CellRange {
                min_cx: self.cell_x(ax.min(bx) - self.influence),
                min_cy: self.cell_y(ay.min(by) - self.influence),
                max_cx: self.cell_x(ax.max(bx) + self.influence),
                max_cy: self.cell_y(ay.max(by) + self.influence),
            };
            self.ranges[i] = range;
            for cx in range.min_cx..=range.max_cx {
                for cy in range.min_cy..=range.max_cy {
                    self.cells
                        .entry(Self::key(cx, cy))
                        .or_default()
                        .push(i as u32);
                }
            }
        }
    }

    fn begin_query(&mut self) -> u32 {
        self.query_id = self.query_id.wrapping_add(1);
        if self.query_id == 0 {
            for mark in self.visited.iter_mut() {
                *mark = 0;
            }
            self.query_id = 1;
        }
        self.query_id
    }

    /// Collect candidate partners `j > seg` sharing a cell with `seg`.
    ///
    /// Candidates come out in deterministic order: cells in row-major range
    /// order, segment indices ascending within a cell.
    pub fn candidates_above(&mut self, seg: usize, out: &mut Vec<u32>) {
        out.clear();
        let range = self.ranges[seg];
        let qid = self.begin_query();
        for cx in range.min_cx..=range.max_cx {
            for cy in range.min_cy..=range.max_cy {
                let Some(list) = self.cells.get(&Self::key(cx, cy)) else {
                    continue;
                };
                for &j in list {
                    if j as usize > seg && self.visited[j as usize] != qid {
                        self.visited[j as usize] = qid;
                        out.push(j);
                    }
                }
            }
        }
    }

    /// Collect segments registered in the 3x3 cell neighborhood of a point.
    pub fn segments_near(&mut self, x: F, y: F, out: &mut Vec<u32>) {
        out.clear();
        let cx0 = self.cell_x(x);
        let cy0 = self.cell_y(y);
        let qid = self.begin_query();
        for cx in (cx0 - 1)..=(cx0 + 1) {
            for cy in (cy0 - 1)..=(cy0 + 1) {
                let Some(list) = self.cells.get(&Self::key(cx, cy)) else {
                    continue;
                };
                for &j in list {
                    if self.visited[j as usize] != qid {
                        self.visited[j as usize] = qid;
                        out.push(j);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Bounds, PointDef, Problem, SegmentDef};

    fn grid_and_state(problem: &Problem<f64>) -> (SegmentGrid<f64>, CachedState<f64>) {
        let state = CachedState::build(problem);
        let mut grid = SegmentGrid::new(
            problem.bounds.min_x,
            problem.bounds.min_y,
            state.cell_size,
            state.global_influence,
        );
        grid.rebuild(&state);
        (grid, state)
    }

    #[test]
    fn key_is_collision_free_near_extremes() {
        let coords = [
            (-(1i64 << 25), -(1i64 << 25)),
            ((1 << 25) - 1, (1 << 25) - 1),
            (0, 0),
            (-1, 0),
            (0, -1),
            (17, -17),
        ];
        for (i, &(ax, ay)) in coords.iter().enumerate() {
            for &(bx, by) in coords.iter().skip(i + 1) {
                assert_ne!(SegmentGrid::<f64>::key(ax, ay), SegmentGrid::<f64>::key(bx, by));
            }
        }
    }

    #[test]
    fn neighbors_share_a_cell() {
        let p = Problem::new(Bounds::new(0.0, 0.0, 1000.0, 1000.0))
            .with_point(PointDef::new("a", 10.0, 10.0).on_layer("0"))
            .with_point(PointDef::new("b", 60.0, 10.0).on_layer("0"))
            .with_point(PointDef::new("c", 12.0, 14.0).on_layer("0"))
            .with_point(PointDef::new("d", 70.0, 14.0).on_layer("0"))
            .with_segment(SegmentDef::new("s0", "a", "b").on_layer("0"))
            .with_segment(SegmentDef::new("s1", "c", "d").on_layer("0"))
            .with_seg_seg(
                crate::problem::InteractionParams::new(1.0)
                    .with_decay(1.0)
                    .with_min_separation(2.0),
            );
        let (mut grid, _state) = grid_and_state(&p);

        let mut out = Vec::new();
        grid.candidates_above(0, &mut out);
        assert_eq!(out, alloc::vec![1]);
    }

    #[test]
    fn candidates_are_deduplicated() {
        // Long parallel segments cover many common cells but must be
        // reported exactly once.
        let p = Problem::new(Bounds::new(0.0, 0.0, 1000.0, 1000.0))
            .with_point(PointDef::new("a", 0.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("b", 900.0, 0.0).on_layer("0"))
            .with_point(PointDef::new("c", 0.0, 1.0).on_layer("0"))
            .with_point(PointDef::new("d", 900.0, 1.0).on_layer("0"))
            .with_segment(SegmentDef::new("s0", "a", "b").on_layer("0"))
            .with_segment(SegmentDef::new("s1", "c", "d").on_layer("0"));
        let (mut grid, _state) = grid_and_state(&p);

        let mut out = Vec::new();
        grid.candidates_above(0, &mut out);
        assert_eq!(out, alloc::vec![1]);
    }

    #[test]
    fn unresolved_segments_are_absent() {
        let p = Problem::new(Bounds::new(0.0, 0.0, 100.0, 100.0))
            .with_point(PointDef::new("a", 5.0, 5.0).on_layer("0"))
            .with_segment(SegmentDef::new("ghost", "a", "missing").on_layer("0"))
            .with_segment(SegmentDef::new("live", "a", "a").on_layer("0"));
        let (mut grid, _state) = grid_and_state(&p);

        let mut out = Vec::new();
        grid.segments_near(5.0, 5.0, &mut out);
        assert_eq!(out, alloc::vec![1]);
    }

    #[test]
    fn point_query_sees_nearby_segment() {
        let p = Problem::new(Bounds::new(0.0, 0.0, 1000.0, 1000.0))
            .with_point(PointDef::new("a", 100.0, 100.0).on_layer("0"))
            .with_point(PointDef::new("b", 200.0, 100.0).on_layer("0"))
            .with_segment(SegmentDef::new("s", "a", "b").on_layer("0"));
        let (mut grid, _state) = grid_and_state(&p);

        let mut out = Vec::new();
        grid.segments_near(150.0, 101.0, &mut out);
        assert_eq!(out, alloc::vec![0]);

        grid.segments_near(990.0, 990.0, &mut out);
        assert!(out.is_empty());
    }
}

//! Flat solver state derived from the problem description.
//!
//! Points and segments live in typed parallel arrays indexed by their
//! position in the problem record; segments reference endpoints by index,
//! never by pointer, so the force kernels can write into one shared buffer.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::float::Float;
use crate::layer::{LayerSet, LayerTable};
use crate::problem::Problem;
use crate::vec::Vec2;

/// ln(1000): the gap at which an exponential tail has decayed a thousandfold.
const DECAY_CUTOFF_LN: f64 = 6.907755278982137;

pub(crate) struct CachedState<F: Float> {
    // Points.
    pub px: Vec<F>,
    pub py: Vec<F>,
    pub fx: Vec<F>,
    pub fy: Vec<F>,
    pub vx: Vec<F>,
    pub vy: Vec<F>,
    pub radius: Vec<F>,
    pub movable: Vec<bool>,
    pub point_layers: Vec<LayerSet>,
    pub point_index: HashMap<String, usize, FxBuildHasher>,

    // Segments. `endpoints` is None when a reference fails to resolve;
    // such segments are inert everywhere.
    pub endpoints: Vec<Option<(usize, usize)>>,
    pub half_width: Vec<F>,
    pub seg_layer: Vec<u32>,
    pub fixed_length: Vec<bool>,
    pub fixed_orientation: Vec<bool>,
    pub rest_length: Vec<F>,
    pub rest_angle: Vec<F>,

    /// Largest distance at which any pair can exchange a nontrivial force.
    pub global_influence: F,
    /// Broadphase cell edge; `global_influence` floored away from zero.
    pub cell_size: F,
}

impl<F: Float> CachedState<F> {
    pub fn build(problem: &Problem<F>) -> Self {
        let n_points = problem.points.len();
        let n_segments = problem.segments.len();

        let mut point_index =
            HashMap::with_capacity_and_hasher(n_points, FxBuildHasher::default());
        for (i, p) in problem.points.iter().enumerate() {
            point_index.entry(p.id.clone()).or_insert(i);
        }

        let layer_table =
            LayerTable::from_segment_layers(problem.segments.iter().map(|s| s.layer.as_str()));

        let mut px = Vec::with_capacity(n_points);
        let mut py = Vec::with_capacity(n_points);
        let mut radius = Vec::with_capacity(n_points);
        let mut movable = Vec::with_capacity(n_points);
        let mut point_layers = Vec::with_capacity(n_points);
        for p in &problem.points {
            px.push(p.x);
            py.push(p.y);
            radius.push(p.radius);
            movable.push(p.movable);
            point_layers.push(LayerSet::build(&layer_table, &p.layers));
        }

        let mut endpoints = Vec::with_capacity(n_segments);
        let mut half_width = Vec::with_capacity(n_segments);
        let mut seg_layer = Vec::with_capacity(n_segments);
        let mut fixed_length = Vec::with_capacity(n_segments);
        let mut fixed_orientation = Vec::with_capacity(n_segments);
        let mut rest_length = Vec::with_capacity(n_segments);
        let mut rest_angle = Vec::with_capacity(n_segments);
        for s in &problem.segments {
            let resolved = match (point_index.get(&s.from), point_index.get(&s.to)) {
                (Some(&a), Some(&b)) => Some((a, b)),
                _ => None,
            };
            endpoints.push(resolved);
            half_width.push(s.width * F::half());
            // Every segment layer is interned, so the lookup always hits.
            seg_layer.push(layer_table.get(&s.layer).unwrap_or(0));
            fixed_length.push(s.fixed_length);
            fixed_orientation.push(s.fixed_orientation);
            let (len, angle) = match resolved {
                Some((a, b)) => {
                    let d = Vec2::new(px[b] - px[a], py[b] - py[a]);
                    (d.length(), F::atan2(d.y, d.x))
                }
                None => (F::zero(), F::zero()),
            };
            rest_length.push(len);
            rest_angle.push(angle);
        }

        let global_influence = derive_influence(problem);
        let cell_size = global_influence.max(F::from_f32(1e-3));

        CachedState {
            px,
            py,
            fx: alloc::vec![F::zero(); n_points],
            fy: alloc::vec![F::zero(); n_points],
            vx: alloc::vec![F::zero(); n_points],
            vy: alloc::vec![F::zero(); n_points],
            radius,
            movable,
            point_layers,
            point_index,
            endpoints,
            half_width,
            seg_layer,
            fixed_length,
            fixed_orientation,
            rest_length,
            rest_angle,
            global_influence,
            cell_size,
        }
    }

    pub fn point_count(&self) -> usize {
        self.px.len()
    }

    pub fn segment_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn position(&self, i: usize) -> Vec2<F> {
        Vec2::new(self.px[i], self.py[i])
    }

    pub fn clear_forces(&mut self) {
        for f in self.fx.iter_mut() {
            *f = F::zero();
        }
        for f in self.fy.iter_mut() {
            *f = F::zero();
        }
    }
}

/// Worst-case interaction reach, from the geometry and the repulsion tuning.
///
/// The base separation covers the largest required clearance between any
/// pair; the cutoff extends it by the distance an exponential tail needs to
/// decay to a thousandth. With no decaying repulsion configured, the reach
/// collapses to a flat multiple of the base separation.
fn derive_influence<F: Float>(problem: &Problem<F>) -> F {
    let mut max_point_radius = F::zero();
    for p in &problem.points {
        max_point_radius = max_point_radius.max(p.radius);
    }
    let mut max_half_width = F::zero();
    for s in &problem.segments {
        max_half_width = max_half_width.max(s.width * F::half());
    }

    let max_min_sep = problem
        .seg_seg
        .min_separation
        .max(problem.point_seg.min_separation);
    let base_sep = (max_point_radius + max_half_width)
        .max(F::two() * max_half_width)
        + max_min_sep;

    let mut min_positive_decay: Option<F> = None;
    for decay in [
        problem.seg_seg.exponential_decay,
        problem.point_seg.exponential_decay,
    ] {
        if decay > F::zero() {
            min_positive_decay = Some(match min_positive_decay {
                Some(d) => d.min(decay),
                None => decay,
            });
        }
    }
    let cutoff_gap = match min_positive_decay {
        Some(decay) => F::from_f64(DECAY_CUTOFF_LN) / decay,
        None => F::from_f32(10.0) * base_sep + F::one(),
    };

    base_sep + cutoff_gap
}

//! Scene descriptions for rendering collaborators.
//!
//! The solver reports geometry; drawing it is someone else's job. Shapes
//! carry entity ids so a renderer can correlate frames.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::float::Float;
use crate::problem::Problem;
use crate::vec::Vec2;

/// Axis-aligned rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect<F: Float> {
    pub min_x: F,
    pub min_y: F,
    pub max_x: F,
    pub max_y: F,
}

/// A segment with its clearance envelope.
#[derive(Clone, Debug)]
pub struct SegmentShape<F: Float> {
    pub id: String,
    pub from: Vec2<F>,
    pub to: Vec2<F>,
    pub half_width: F,
    /// Clearance halo radius; present only in the initial scene.
    pub halo: Option<F>,
}

/// A point with its clearance rings.
#[derive(Clone, Debug)]
pub struct PointShape<F: Float> {
    pub id: String,
    pub center: Vec2<F>,
    pub radius: F,
    /// Separation halo radius; present only in the initial scene.
    pub halo: Option<F>,
}

/// Snapshot of everything a renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct Scene<F: Float> {
    pub bounds: Rect<F>,
    /// Bounds inset by the boundary padding.
    pub effective_bounds: Rect<F>,
    pub segments: Vec<SegmentShape<F>>,
    pub points: Vec<PointShape<F>>,
}

/// Build a scene from the (position-synchronized) problem record.
///
/// The initial scene decorates entities with their separation halos so a
/// renderer can show the clearances the solver is about to enforce;
/// afterwards only the bare geometry and radius rings remain. Segments with
/// unresolved endpoints have no geometry and are omitted.
pub(crate) fn scene<F: Float>(problem: &Problem<F>, initial: bool) -> Scene<F> {
    let b = problem.bounds;
    let pad = b.boundary_padding;
    let min_sep = problem.point_seg.min_separation;

    let mut by_id: HashMap<&str, Vec2<F>, FxBuildHasher> =
        HashMap::with_capacity_and_hasher(problem.points.len(), FxBuildHasher::default());
    for p in &problem.points {
        by_id.entry(p.id.as_str()).or_insert(Vec2::new(p.x, p.y));
    }

    let mut segments = Vec::with_capacity(problem.segments.len());
    for s in &problem.segments {
        let (Some(&from), Some(&to)) = (by_id.get(s.from.as_str()), by_id.get(s.to.as_str()))
        else {
            continue;
        };
        let half_width = s.width * F::half();
        segments.push(SegmentShape {
            id: s.id.clone(),
            from,
            to,
            half_width,
            halo: initial.then(|| half_width + min_sep),
        });
    }

    let points = problem
        .points
        .iter()
        .map(|p| PointShape {
            id: p.id.clone(),
            center: Vec2::new(p.x, p.y),
            radius: p.radius,
            halo: initial.then(|| p.radius + min_sep),
        })
        .collect();

    Scene {
        bounds: Rect { min_x: b.min_x, min_y: b.min_y, max_x: b.max_x, max_y: b.max_y },
        effective_bounds: Rect {
            min_x: b.min_x + pad,
            min_y: b.min_y + pad,
            max_x: b.max_x - pad,
            max_y: b.max_y - pad,
        },
        segments,
        points,
    }
}

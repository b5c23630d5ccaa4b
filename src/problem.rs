//! Declarative problem description: geometry, interaction parameters, and
//! the solve schedule.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;

use crate::error::ProblemError;
use crate::float::Float;

/// A point in the layout. Points are the only degrees of freedom.
#[derive(Clone, Debug)]
pub struct PointDef<F: Float> {
    pub id: String,
    pub x: F,
    pub y: F,
    /// Non-movable points contribute forces but never move.
    pub movable: bool,
    /// Clearance radius kept free around the point.
    pub radius: F,
    /// Layer identifiers this point participates on.
    pub layers: Vec<String>,
}

impl<F: Float> PointDef<F> {
    pub fn new(id: impl Into<String>, x: F, y: F) -> Self {
        PointDef {
            id: id.into(),
            x,
            y,
            movable: true,
            radius: F::zero(),
            layers: Vec::new(),
        }
    }

    /// Pin the point in place.
    pub fn fixed(mut self) -> Self {
        self.movable = false;
        self
    }

    pub fn with_radius(mut self, radius: F) -> Self {
        self.radius = radius;
        self
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layers.push(layer.into());
        self
    }
}

/// A segment between two points, referenced by id.
///
/// Segments carry no position of their own; their geometry is always derived
/// from their endpoints. A segment whose endpoint reference does not resolve
/// is inert: it contributes no forces and consumes no work.
#[derive(Clone, Debug)]
pub struct SegmentDef<F: Float> {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Full width; half of it counts toward clearance.
    pub width: F,
    pub layer: String,
    /// Hold the segment at its initial length.
    pub fixed_length: bool,
    /// Hold the segment at its initial orientation.
    pub fixed_orientation: bool,
}

impl<F: Float> SegmentDef<F> {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        SegmentDef {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            width: F::zero(),
            layer: String::new(),
            fixed_length: false,
            fixed_orientation: false,
        }
    }

    pub fn with_width(mut self, width: F) -> Self {
        self.width = width;
        self
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn fixed_length(mut self) -> Self {
        self.fixed_length = true;
        self
    }

    pub fn fixed_orientation(mut self) -> Self {
        self.fixed_orientation = true;
        self
    }
}

/// Axis-aligned keep-in rectangle.
///
/// The effective region for a point of radius `r` is inset by
/// `boundary_padding + r` on every side.
#[derive(Copy, Clone, Debug)]
pub struct Bounds<F: Float> {
    pub min_x: F,
    pub min_y: F,
    pub max_x: F,
    pub max_y: F,
    pub boundary_padding: F,
}

impl<F: Float> Bounds<F> {
    pub fn new(min_x: F, min_y: F, max_x: F, max_y: F) -> Self {
        Bounds { min_x, min_y, max_x, max_y, boundary_padding: F::zero() }
    }

    pub fn with_padding(mut self, padding: F) -> Self {
        self.boundary_padding = padding;
        self
    }
}

/// Tuning for one interaction family.
///
/// A `strength` of zero disables the family. `exponential_decay` of zero
/// turns the magnitude into a flat plateau; positive values decay it with
/// the signed gap. `overlap_multiplier` only applies while the gap is
/// negative. `min_separation` is extra clearance demanded on top of the
/// geometric requirement; only the repulsion families read it.
#[derive(Copy, Clone, Debug)]
pub struct InteractionParams<F: Float> {
    pub strength: F,
    pub exponential_decay: F,
    pub overlap_multiplier: F,
    pub min_separation: F,
}

impl<F: Float> InteractionParams<F> {
    pub fn new(strength: F) -> Self {
        InteractionParams {
            strength,
            exponential_decay: F::zero(),
            overlap_multiplier: F::one(),
            min_separation: F::zero(),
        }
    }

    /// Disabled family (zero strength).
    pub fn disabled() -> Self {
        Self::new(F::zero())
    }

    pub fn with_decay(mut self, decay: F) -> Self {
        self.exponential_decay = decay;
        self
    }

    pub fn with_overlap_multiplier(mut self, multiplier: F) -> Self {
        self.overlap_multiplier = multiplier;
        self
    }

    pub fn with_min_separation(mut self, separation: F) -> Self {
        self.min_separation = separation;
        self
    }
}

impl<F: Float> Default for InteractionParams<F> {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Schedule for the relaxation loop.
///
/// # Builder Pattern
/// ```
/// use relaxy::SolveConfig;
///
/// let config: SolveConfig<f64> = SolveConfig::new()
///     .with_max_steps(300)
///     .with_step_size(0.1)
///     .with_epsilon_move(0.01)
///     .with_relaxation_steps(50);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct SolveConfig<F: Float> {
    /// Iteration ceiling for `solve`. Default: 100.
    pub max_steps: usize,
    /// Scale from accumulated force to displacement. Default: 0.1.
    pub step_size: F,
    /// Convergence threshold on the largest per-step move. Default: 1e-3.
    pub epsilon_move: F,
    /// Optional hard cap on per-step displacement. Default: none.
    pub max_move_per_step: Option<F>,
    /// Velocity friction in [0, 1]; 1.0 keeps no momentum. Default: 1.0.
    pub friction: F,
    /// Number of trailing steps over which forces fade out. Default: 0.
    pub relaxation_steps: usize,
}

impl<F: Float> SolveConfig<F> {
    pub fn new() -> Self {
        SolveConfig {
            max_steps: 100,
            step_size: F::from_f32(0.1),
            epsilon_move: F::from_f32(1e-3),
            max_move_per_step: None,
            friction: F::one(),
            relaxation_steps: 0,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_step_size(mut self, step_size: F) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_epsilon_move(mut self, epsilon_move: F) -> Self {
        self.epsilon_move = epsilon_move;
        self
    }

    pub fn with_max_move_per_step(mut self, cap: F) -> Self {
        self.max_move_per_step = Some(cap);
        self
    }

    pub fn with_friction(mut self, friction: F) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_relaxation_steps(mut self, steps: usize) -> Self {
        self.relaxation_steps = steps;
        self
    }
}

impl<F: Float> Default for SolveConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete problem description handed to the solver at construction.
#[derive(Clone, Debug)]
pub struct Problem<F: Float> {
    pub points: Vec<PointDef<F>>,
    pub segments: Vec<SegmentDef<F>>,
    pub bounds: Bounds<F>,
    /// Segment vs segment repulsion.
    pub seg_seg: InteractionParams<F>,
    /// Point vs segment repulsion.
    pub point_seg: InteractionParams<F>,
    /// Keep-in force toward the effective bounds.
    pub boundary: InteractionParams<F>,
    /// Restoring force for `fixed_length` segments.
    pub fixed_length: InteractionParams<F>,
    /// Restoring couple for `fixed_orientation` segments.
    pub fixed_orientation: InteractionParams<F>,
    pub solve: SolveConfig<F>,
}

impl<F: Float> Problem<F> {
    pub fn new(bounds: Bounds<F>) -> Self {
        Problem {
            points: Vec::new(),
            segments: Vec::new(),
            bounds,
            seg_seg: InteractionParams::disabled(),
            point_seg: InteractionParams::disabled(),
            boundary: InteractionParams::disabled(),
            fixed_length: InteractionParams::disabled(),
            fixed_orientation: InteractionParams::disabled(),
            solve: SolveConfig::new(),
        }
    }

    pub fn with_point(mut self, point: PointDef<F>) -> Self {
        self.points.push(point);
        self
    }

    pub fn with_segment(mut self, segment: SegmentDef<F>) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_seg_seg(mut self, params: InteractionParams<F>) -> Self {
        self.seg_seg = params;
        self
    }

    pub fn with_point_seg(mut self, params: InteractionParams<F>) -> Self {
        self.point_seg = params;
        self
    }

    pub fn with_boundary(mut self, params: InteractionParams<F>) -> Self {
        self.boundary = params;
        self
    }

    pub fn with_fixed_length(mut self, params: InteractionParams<F>) -> Self {
        self.fixed_length = params;
        self
    }

    pub fn with_fixed_orientation(mut self, params: InteractionParams<F>) -> Self {
        self.fixed_orientation = params;
        self
    }

    pub fn with_solve(mut self, solve: SolveConfig<F>) -> Self {
        self.solve = solve;
        self
    }

    /// Check the description for mistakes the solver would otherwise paper
    /// over. Unresolved endpoint references are deliberately not an error;
    /// such segments run inert.
    pub fn validate(&self) -> Result<(), ProblemError> {
        let mut point_ids: HashSet<&str, FxBuildHasher> =
            HashSet::with_hasher(FxBuildHasher::default());
        for p in &self.points {
            if !point_ids.insert(p.id.as_str()) {
                return Err(ProblemError::DuplicatePointId { id: p.id.clone() });
            }
            if p.layers.is_empty() {
                return Err(ProblemError::EmptyLayerSet { point: p.id.clone() });
            }
            if p.radius < F::zero() {
                return Err(ProblemError::NegativeRadius { point: p.id.clone() });
            }
        }

        let mut segment_ids: HashSet<&str, FxBuildHasher> =
            HashSet::with_hasher(FxBuildHasher::default());
        for s in &self.segments {
            if !segment_ids.insert(s.id.as_str()) {
                return Err(ProblemError::DuplicateSegmentId { id: s.id.clone() });
            }
            if s.width < F::zero() {
                return Err(ProblemError::NegativeWidth { segment: s.id.clone() });
            }
        }

        if self.bounds.min_x > self.bounds.max_x || self.bounds.min_y > self.bounds.max_y {
            return Err(ProblemError::InvalidBounds);
        }
        if self.solve.friction < F::zero() || self.solve.friction > F::one() {
            return Err(ProblemError::InvalidFriction);
        }
        Ok(())
    }
}

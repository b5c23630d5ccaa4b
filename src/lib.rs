//! Force-directed relaxation for 2D point/segment layouts.
//!
//! `relaxy` nudges a set of movable points until segments stop crowding each
//! other, points keep clear of segments, everything stays inside a bounding
//! rectangle, and flagged segments hold their initial length or orientation.
//! Points are the only degrees of freedom; segments always derive their
//! geometry from their endpoints.
//!
//! # Features
//!
//! - **Declarative problems**: points, segments, bounds, and per-family
//!   interaction tuning in one record
//! - **Layer filtering**: segments repel only within a layer; points only
//!   feel segments on their own layers
//! - **Spatial hash broadphase**: pairwise queries scale past small scenes
//! - **Deterministic**: fixed kernel order and explicit degenerate
//!   tie-breaks make runs reproducible
//! - **Relaxation schedule**: forces fade and friction ramps over the final
//!   steps for a quiet finish
//! - **Observable**: monitor steps via the `StepObserver` trait
//! - **`no_std` compatible**: works in embedded and WASM environments
//!
//! # Example
//!
//! ```
//! use relaxy::{
//!     Bounds, InteractionParams, PointDef, Problem, RelaxationSolver, SegmentDef, SolveConfig,
//! };
//!
//! let problem: Problem<f64> = Problem::new(Bounds::new(0.0, 0.0, 100.0, 100.0))
//!     .with_point(PointDef::new("a", 10.0, 10.0).fixed().on_layer("signal"))
//!     .with_point(PointDef::new("b", 30.0, 10.0).on_layer("signal"))
//!     .with_segment(
//!         SegmentDef::new("ab", "a", "b")
//!             .with_width(2.0)
//!             .on_layer("signal")
//!             .fixed_length(),
//!     )
//!     .with_fixed_length(InteractionParams::new(1.0))
//!     .with_solve(SolveConfig::new().with_max_steps(200));
//!
//! let mut solver = RelaxationSolver::new(problem);
//! solver.solve();
//! assert!(solver.solved());
//! ```

#![no_std]

extern crate alloc;

pub mod float;
pub mod vec;
pub mod geometry;
mod layer;
pub mod problem;
mod state;
mod grid;
mod forces;
pub mod solver;
pub mod observer;
pub mod error;
pub mod visualize;

// Re-export primary API
pub use float::Float;
pub use vec::Vec2;
pub use problem::{Bounds, InteractionParams, PointDef, Problem, SegmentDef, SolveConfig};
pub use solver::RelaxationSolver;
pub use observer::{NoOpStepObserver, StepObserver};
pub use error::ProblemError;
pub use visualize::{PointShape, Rect, Scene, SegmentShape};

//! The relaxation engine: lazy setup, per-step force assembly, integration,
//! and convergence bookkeeping.

use alloc::string::String;
use alloc::vec::Vec;

use crate::float::Float;
use crate::forces;
use crate::grid::SegmentGrid;
use crate::observer::{NoOpStepObserver, StepObserver};
use crate::problem::Problem;
use crate::state::CachedState;
use crate::vec::Vec2;
use crate::visualize::{self, Scene};

/// Everything a step needs besides the problem record. Built on the first
/// step so constructing a solver stays free.
struct Workspace<F: Float> {
    state: CachedState<F>,
    grid: SegmentGrid<F>,
    scratch: Vec<u32>,
}

impl<F: Float> Workspace<F> {
    fn build(problem: &Problem<F>) -> Self {
        let state = CachedState::build(problem);
        let grid = SegmentGrid::new(
            problem.bounds.min_x,
            problem.bounds.min_y,
            state.cell_size,
            state.global_influence,
        );
        Workspace { state, grid, scratch: Vec::new() }
    }
}

/// Iterative force-directed solver over a point/segment layout problem.
///
/// Each `step` assembles repulsion, keep-in, and constraint forces into a
/// shared buffer, then moves every movable point along its accumulated
/// force. The run converges when the largest per-step move drops to
/// `epsilon_move`; the iteration ceiling is the caller's concern (`solve`
/// applies it).
pub struct RelaxationSolver<F: Float> {
    problem: Problem<F>,
    workspace: Option<Workspace<F>>,
    solved: bool,
    iterations: usize,
    progress: F,
    max_move: F,
    /// Free slot for driver code to surface a failure alongside solver
    /// state. Never written by the engine.
    pub error: Option<String>,
}

impl<F: Float> RelaxationSolver<F> {
    /// Wrap a problem description. Does no heavy work; state is built on the
    /// first step.
    pub fn new(problem: Problem<F>) -> Self {
        RelaxationSolver {
            problem,
            workspace: None,
            solved: false,
            iterations: 0,
            progress: F::zero(),
            max_move: F::zero(),
            error: None,
        }
    }

    /// True once a step moved nothing farther than `epsilon_move`.
    pub fn solved(&self) -> bool {
        self.solved
    }

    /// Number of completed steps.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Convergence indicator in (0, 1]; 1 means the last step was within
    /// the movement threshold.
    pub fn progress(&self) -> F {
        self.progress
    }

    /// Largest single-point displacement of the last step.
    pub fn max_move(&self) -> F {
        self.max_move
    }

    /// The problem record, with point coordinates synchronized to the
    /// current solver state.
    pub fn problem(&self) -> &Problem<F> {
        &self.problem
    }

    /// Current position of a point by id.
    pub fn point_position(&self, id: &str) -> Option<Vec2<F>> {
        let p = self.problem.points.iter().find(|p| p.id == id)?;
        Some(Vec2::new(p.x, p.y))
    }

    /// Current positions in problem order.
    pub fn positions(&self) -> Vec<Vec2<F>> {
        self.problem.points.iter().map(|p| Vec2::new(p.x, p.y)).collect()
    }

    /// Move a point, keeping rest lengths and angles intact.
    ///
    /// Initializes the cached state first if needed, so rest snapshots
    /// always reflect the problem as posed. Clears the solved flag, since
    /// moved geometry may reopen work. Returns false for an unknown id.
    pub fn set_point_position(&mut self, id: &str, x: F, y: F) -> bool {
        let problem = &mut self.problem;
        let ws = self
            .workspace
            .get_or_insert_with(|| Workspace::build(&*problem));
        let Some(&i) = ws.state.point_index.get(id) else {
            return false;
        };
        ws.state.px[i] = x;
        ws.state.py[i] = y;
        ws.state.vx[i] = F::zero();
        ws.state.vy[i] = F::zero();
        problem.points[i].x = x;
        problem.points[i].y = y;
        self.solved = false;
        true
    }

    /// Scene description for rendering. Before the first step this shows the
    /// problem as posed, with clearance halos; afterwards the current state.
    pub fn visualize(&self) -> Scene<F> {
        visualize::scene(&self.problem, self.iterations == 0)
    }

    /// Advance one iteration. A no-op once solved.
    pub fn step(&mut self) {
        self.step_with(&mut NoOpStepObserver);
    }

    /// Advance one iteration, reporting phases to an observer.
    pub fn step_with<O: StepObserver>(&mut self, observer: &mut O) {
        if self.solved {
            return;
        }
        let problem = &mut self.problem;
        let ws = self
            .workspace
            .get_or_insert_with(|| Workspace::build(&*problem));

        // Assemble forces.
        ws.state.clear_forces();
        ws.grid.rebuild(&ws.state);
        forces::segment_segment(&mut ws.state, &mut ws.grid, &problem.seg_seg, &mut ws.scratch);
        forces::point_segment(&mut ws.state, &mut ws.grid, &problem.point_seg, &mut ws.scratch);
        forces::boundary(&mut ws.state, &problem.bounds, &problem.boundary);
        forces::fixed_length(&mut ws.state, &problem.fixed_length);
        forces::fixed_orientation(&mut ws.state, &problem.fixed_orientation);

        // Fade forces over the trailing relaxation window.
        let cfg = problem.solve;
        let sigma = if cfg.relaxation_steps > 0 {
            let remaining = cfg.max_steps.saturating_sub(self.iterations);
            if remaining <= cfg.relaxation_steps {
                F::from_f32(remaining as f32) / F::from_f32(cfg.relaxation_steps as f32)
            } else {
                F::one()
            }
        } else {
            F::one()
        };
        if sigma < F::one() {
            for f in ws.state.fx.iter_mut() {
                *f = *f * sigma;
            }
            for f in ws.state.fy.iter_mut() {
                *f = *f * sigma;
            }
        }
        observer.on_forces_assembled();

        // Integrate. The relaxation window also ramps friction toward 1 so
        // momentum dies out together with the forces.
        let friction = if sigma < F::one() {
            F::one() - (F::one() - cfg.friction) * sigma
        } else {
            cfg.friction
        };
        let momentum = F::one() - friction;
        let mut max_move = F::zero();
        for i in 0..ws.state.point_count() {
            if !ws.state.movable[i] {
                continue;
            }
            let mut v = Vec2::new(
                ws.state.vx[i] * momentum + ws.state.fx[i] * cfg.step_size,
                ws.state.vy[i] * momentum + ws.state.fy[i] * cfg.step_size,
            );
            if v.length_sq() <= F::from_f32(1e-18) {
                ws.state.vx[i] = F::zero();
                ws.state.vy[i] = F::zero();
                continue;
            }
            if let Some(cap) = cfg.max_move_per_step {
                let len = v.length();
                if len > cap {
                    v = v.scale(cap / len);
                }
            }
            ws.state.vx[i] = v.x;
            ws.state.vy[i] = v.y;
            ws.state.px[i] = ws.state.px[i] + v.x;
            ws.state.py[i] = ws.state.py[i] + v.y;
            problem.points[i].x = ws.state.px[i];
            problem.points[i].y = ws.state.py[i];
            max_move = max_move.max(v.length());
        }
        observer.on_integrate();

        self.max_move = max_move;
        self.progress = F::one().min(cfg.epsilon_move / cfg.epsilon_move.max(max_move));
        if max_move <= cfg.epsilon_move {
            self.solved = true;
        }
        self.iterations += 1;
        observer.on_step_complete();
    }

    /// Step until solved or the configured iteration ceiling.
    pub fn solve(&mut self) {
        self.solve_with(&mut NoOpStepObserver);
    }

    /// As `solve`, reporting phases to an observer.
    pub fn solve_with<O: StepObserver>(&mut self, observer: &mut O) {
        while !self.solved && self.iterations < self.problem.solve.max_steps {
            self.step_with(observer);
        }
    }
}

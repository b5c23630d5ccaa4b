use relaxy::{
    Bounds, InteractionParams, PointDef, Problem, RelaxationSolver, SegmentDef, SolveConfig,
};

fn pushy_problem() -> Problem<f64> {
    // One fixed hub segment crowding two movable satellites.
    Problem::new(Bounds::new(-50.0, -50.0, 50.0, 50.0))
        .with_point(PointDef::new("hub_a", -2.0, 0.0).fixed().on_layer("0"))
        .with_point(PointDef::new("hub_b", 2.0, 0.0).fixed().on_layer("0"))
        .with_point(PointDef::new("m1", 0.5, 0.4).on_layer("0"))
        .with_point(PointDef::new("m2", -0.5, -0.3).on_layer("0"))
        .with_segment(SegmentDef::new("hub", "hub_a", "hub_b").with_width(1.0).on_layer("0"))
        .with_point_seg(
            InteractionParams::new(2.0)
                .with_decay(0.8)
                .with_overlap_multiplier(6.0)
                .with_min_separation(2.0),
        )
        .with_boundary(InteractionParams::new(1.0).with_decay(1.0))
        .with_solve(
            SolveConfig::new()
                .with_step_size(0.05)
                .with_max_steps(200)
                .with_epsilon_move(0.01),
        )
}

#[test]
fn fixed_points_never_move() {
    let mut solver = RelaxationSolver::new(pushy_problem());
    let before: Vec<(u64, u64)> = ["hub_a", "hub_b"]
        .iter()
        .map(|id| {
            let p = solver.point_position(id).unwrap();
            (p.x.to_bits(), p.y.to_bits())
        })
        .collect();

    solver.solve();

    for (id, bits) in ["hub_a", "hub_b"].iter().zip(before) {
        let p = solver.point_position(id).unwrap();
        assert_eq!((p.x.to_bits(), p.y.to_bits()), bits, "{id} drifted");
    }
}

#[test]
fn move_cap_bounds_every_step() {
    let cap = 0.08;
    let problem = pushy_problem()
        .with_solve(
            SolveConfig::new()
                .with_step_size(0.05)
                .with_max_steps(100)
                .with_epsilon_move(1e-4)
                .with_max_move_per_step(cap),
        );
    let mut solver = RelaxationSolver::new(problem);

    let mut previous = solver.positions();
    for _ in 0..100 {
        if solver.solved() {
            break;
        }
        solver.step();
        let current = solver.positions();
        for (before, after) in previous.iter().zip(current.iter()) {
            let moved = after.distance(*before);
            assert!(moved <= cap + 1e-12, "step moved {moved}, cap is {cap}");
        }
        assert!(solver.max_move() <= cap + 1e-12);
        previous = current;
    }
}

#[test]
fn zero_strengths_leave_positions_alone() {
    let problem: Problem<f64> = Problem::new(Bounds::new(0.0, 0.0, 10.0, 10.0))
        .with_point(PointDef::new("a", 1.0, 1.0).on_layer("0"))
        .with_point(PointDef::new("b", 9.0, 9.0).on_layer("0"))
        .with_segment(SegmentDef::new("s", "a", "b").with_width(3.0).on_layer("0"))
        .with_solve(SolveConfig::new().with_max_steps(25));

    let mut solver = RelaxationSolver::new(problem);
    let before = solver.positions();
    solver.solve();

    assert_eq!(solver.positions(), before);
    assert!(solver.solved());
    assert_eq!(solver.iterations(), 1, "first step already converges");
}

#[test]
fn stepping_after_solved_changes_nothing() {
    let mut solver = RelaxationSolver::new(pushy_problem());
    solver.solve();
    assert!(solver.solved());

    let settled = solver.positions();
    let iterations = solver.iterations();
    for _ in 0..5 {
        solver.step();
    }

    assert!(solver.solved());
    assert_eq!(solver.iterations(), iterations, "no-op steps are not counted");
    assert_eq!(solver.positions(), settled);
}

#[test]
fn escaped_point_approaches_interior_monotonically() {
    let problem: Problem<f64> = Problem::new(Bounds::new(0.0, 0.0, 100.0, 100.0))
        .with_point(PointDef::new("p", -5.0, 50.0).on_layer("0"))
        .with_boundary(InteractionParams::new(2.0).with_decay(1.0).with_overlap_multiplier(10.0))
        .with_solve(
            SolveConfig::new()
                .with_step_size(0.001)
                .with_max_steps(400)
                .with_epsilon_move(1e-3),
        );

    let mut solver = RelaxationSolver::new(problem);
    let mut x = solver.point_position("p").unwrap().x;
    for _ in 0..400 {
        if solver.solved() {
            break;
        }
        solver.step();
        let next = solver.point_position("p").unwrap().x;
        assert!(next >= x, "keep-in must not push the point further out");
        x = next;
    }
    assert!(x >= 0.0, "point should end inside, got {x}");
}

#[test]
fn progress_reflects_convergence() {
    let mut solver = RelaxationSolver::new(pushy_problem());
    solver.step();
    let early = solver.progress();
    solver.solve();

    assert!(solver.solved());
    assert_eq!(solver.progress(), 1.0);
    assert!(early <= solver.progress());
    assert!(solver.error.is_none(), "engine never writes the error slot");
}

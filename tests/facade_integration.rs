//! End-to-end facade behavior: input checking, replanning decisions,
//! world↔grid conversion of solutions, and the two reference backends.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use marga_plan::{
    Environment, GridCoord, GridPose, GridSearchConfig, GridState, MotionDirection, MotionPlanner,
    PlanError, PlanningBackend, PlanningState, Pose2D, SamplingConfig, StateKind, TravGrid,
};

/// Call counters shared between a test and its scripted backend.
#[derive(Default)]
struct Counts {
    initialize: usize,
    set_start_goal: usize,
    solve: usize,
    fail_solves: bool,
}

/// Backend that replays a scripted grid path and counts contract calls.
struct ScriptedBackend {
    counts: Rc<RefCell<Counts>>,
    path: Vec<GridState>,
    solved: bool,
}

impl ScriptedBackend {
    fn new(counts: Rc<RefCell<Counts>>, path: Vec<GridState>) -> Self {
        Self {
            counts,
            path,
            solved: false,
        }
    }
}

impl PlanningBackend for ScriptedBackend {
    fn initialize(
        &mut self,
        _width: usize,
        _height: usize,
        _scale_x: f32,
        _scale_y: f32,
        _data: &[u8],
    ) -> Result<(), PlanError> {
        self.counts.borrow_mut().initialize += 1;
        self.solved = false;
        Ok(())
    }

    fn set_start_goal(&mut self, _start: &GridState, _goal: &GridState) -> Result<(), PlanError> {
        self.counts.borrow_mut().set_start_goal += 1;
        self.solved = false;
        Ok(())
    }

    fn solve(&mut self, _budget: Duration) -> Result<(), PlanError> {
        let mut counts = self.counts.borrow_mut();
        counts.solve += 1;
        if counts.fail_solves {
            return Err(PlanError::PlanningFailed);
        }
        self.solved = true;
        Ok(())
    }

    fn fill_path(&self, out: &mut Vec<GridState>) {
        out.clear();
        if self.solved {
            out.extend(self.path.iter().cloned());
        }
    }

    fn supports(&self, kind: StateKind) -> bool {
        kind.has_pose()
    }
}

fn diagonal_path() -> Vec<GridState> {
    (0..10)
        .map(|i| GridState::from_pose(GridPose::new(GridCoord::new(i, i), 0.0)))
        .collect()
}

fn scripted_planner(pose: Pose2D) -> (MotionPlanner, Rc<RefCell<Counts>>, Environment) {
    let counts = Rc::new(RefCell::new(Counts::default()));
    let backend = ScriptedBackend::new(Rc::clone(&counts), diagonal_path());
    let planner = MotionPlanner::new(Box::new(backend));

    let mut env = Environment::new();
    env.insert("trav", TravGrid::new(10, 10, 1.0, 1.0, pose));
    (planner, counts, env)
}

fn set_problem(planner: &mut MotionPlanner, env: &Environment) {
    planner.set_trav_grid(env, "trav").unwrap();
    planner
        .set_start_state(PlanningState::from_pose(Pose2D::new(0.0, 0.0, 0.0)))
        .unwrap();
    planner
        .set_goal_state(PlanningState::from_pose(Pose2D::new(9.0, 9.0, 0.0)))
        .unwrap();
}

#[test]
fn scenario_10x10_diagonal() {
    let (mut planner, _counts, env) = scripted_planner(Pose2D::identity());
    set_problem(&mut planner, &env);
    planner.plan(1.0).unwrap();

    let path = planner.path_in_world();
    assert_eq!(path.len(), 10);

    // Endpoints land on the world positions of cells (0,0) and (9,9).
    assert!((path[0].position.x - 0.0).abs() < 1e-4);
    assert!((path[0].position.y - 0.0).abs() < 1e-4);
    assert!((path[9].position.x - 9.0).abs() < 1e-4);
    assert!((path[9].position.y - 9.0).abs() < 1e-4);

    // Consecutive waypoints stay within one cell diagonal.
    let diagonal = (2.0f32).sqrt() + 1e-4;
    for pair in path.windows(2) {
        assert!(pair[0].distance_to(&pair[1]) <= diagonal);
    }
}

#[test]
fn scenario_respects_map_pose_offset() {
    let (mut planner, _counts, env) = scripted_planner(Pose2D::new(2.0, 3.0, 0.0));
    planner.set_trav_grid(&env, "trav").unwrap();
    planner
        .set_start_state(PlanningState::from_pose(Pose2D::new(2.0, 3.0, 0.0)))
        .unwrap();
    planner
        .set_goal_state(PlanningState::from_pose(Pose2D::new(11.0, 12.0, 0.0)))
        .unwrap();
    planner.plan(1.0).unwrap();

    let path = planner.path_in_world();
    assert!((path[0].position.x - 2.0).abs() < 1e-4);
    assert!((path[0].position.y - 3.0).abs() < 1e-4);
    assert!((path[9].position.x - 11.0).abs() < 1e-4);
    assert!((path[9].position.y - 12.0).abs() < 1e-4);
}

#[test]
fn small_start_change_continues_optimizing() {
    let (mut planner, counts, env) = scripted_planner(Pose2D::identity());
    set_problem(&mut planner, &env);
    planner.plan(1.0).unwrap();
    assert_eq!(counts.borrow().initialize, 1);
    assert_eq!(counts.borrow().set_start_goal, 1);

    // Nudge the start below both replanning thresholds.
    planner
        .set_start_state(PlanningState::from_pose(Pose2D::new(0.03, 0.0, 0.01)))
        .unwrap();
    planner.plan(1.0).unwrap();

    let counts = counts.borrow();
    assert_eq!(counts.initialize, 1, "no reinitialization expected");
    assert_eq!(counts.set_start_goal, 1, "problem must not be re-bound");
    assert_eq!(counts.solve, 2, "backend keeps optimizing");
}

#[test]
fn large_start_change_rebinds_problem() {
    let (mut planner, counts, env) = scripted_planner(Pose2D::identity());
    set_problem(&mut planner, &env);
    planner.plan(1.0).unwrap();

    planner
        .set_start_state(PlanningState::from_pose(Pose2D::new(1.0, 0.0, 0.0)))
        .unwrap();
    planner.plan(1.0).unwrap();

    let counts = counts.borrow();
    assert_eq!(counts.initialize, 1, "map unchanged, no reinitialization");
    assert_eq!(counts.set_start_goal, 2, "moved start re-binds the problem");
}

#[test]
fn unchanged_problem_continues_optimizing() {
    let (mut planner, counts, env) = scripted_planner(Pose2D::identity());
    set_problem(&mut planner, &env);
    planner.plan(1.0).unwrap();
    planner.plan(1.0).unwrap();
    planner.plan(1.0).unwrap();

    let counts = counts.borrow();
    assert_eq!(counts.initialize, 1);
    assert_eq!(counts.set_start_goal, 1);
    assert_eq!(counts.solve, 3);
}

#[test]
fn new_map_always_reinitializes() {
    let (mut planner, counts, env) = scripted_planner(Pose2D::identity());
    set_problem(&mut planner, &env);
    planner.plan(1.0).unwrap();

    // Same grid handed over again still counts as a new map.
    planner.set_trav_grid(&env, "trav").unwrap();
    planner.plan(1.0).unwrap();

    let counts = counts.borrow();
    assert_eq!(counts.initialize, 2, "a received map forces reinitialization");
    assert_eq!(counts.set_start_goal, 2, "reinitialization re-binds the problem");
}

#[test]
fn failed_plan_keeps_previous_solution() {
    let (mut planner, counts, env) = scripted_planner(Pose2D::identity());
    set_problem(&mut planner, &env);
    planner.plan(1.0).unwrap();
    let before = planner.path_in_world();
    assert!(!before.is_empty());

    counts.borrow_mut().fail_solves = true;
    assert_eq!(planner.plan(1.0).unwrap_err(), PlanError::PlanningFailed);
    assert_eq!(planner.last_error(), Some(PlanError::PlanningFailed));

    // The previous solution is untouched.
    assert_eq!(planner.path_in_world(), before);
}

#[test]
fn trajectory_from_scripted_path() {
    let (mut planner, _counts, env) = scripted_planner(Pose2D::identity());
    set_problem(&mut planner, &env);
    planner.plan(1.0).unwrap();

    let trajectory = planner.trajectory_in_world(0.5);
    assert_eq!(trajectory.segments.len(), 1);
    assert_eq!(trajectory.segments[0].direction, MotionDirection::Forward);
    assert!((trajectory.total_length - 9.0 * (2.0f32).sqrt()).abs() < 1e-3);
    assert!((trajectory.total_duration - trajectory.total_length / 0.5).abs() < 1e-3);
}

#[test]
fn grid_search_end_to_end_with_wall() {
    let mut grid = TravGrid::new(20, 20, 0.5, 0.5, Pose2D::identity());
    for y in 0..16 {
        grid.set_cost(GridCoord::new(10, y), TravGrid::MAX_COST);
    }
    let mut env = Environment::new();
    env.insert("trav", grid);

    let mut planner = MotionPlanner::grid_search(GridSearchConfig::default());
    planner.set_trav_grid(&env, "trav").unwrap();
    planner
        .set_start_state(PlanningState::from_pose(Pose2D::new(1.0, 1.0, 0.0)))
        .unwrap();
    planner
        .set_goal_state(PlanningState::from_pose(Pose2D::new(8.0, 1.0, 0.0)))
        .unwrap();

    planner.plan(0.5).unwrap();
    let path = planner.path_in_world();
    assert!(!path.is_empty());
    assert!((path.first().unwrap().position.x - 1.0).abs() < 1e-4);
    assert!((path.last().unwrap().position.x - 8.0).abs() < 1e-4);
    // The wall at x = 5 m spans y < 8 m; the path must rise above it.
    assert!(path.iter().any(|w| w.position.y > 7.5));
}

#[test]
fn sampling_end_to_end() {
    let mut env = Environment::new();
    env.insert("trav", TravGrid::new(20, 20, 0.25, 0.25, Pose2D::identity()));

    let mut planner = MotionPlanner::sampling(SamplingConfig::default());
    planner.set_trav_grid(&env, "trav").unwrap();
    planner
        .set_start_state(PlanningState::from_pose(Pose2D::new(0.25, 0.25, 0.0)))
        .unwrap();
    planner
        .set_goal_state(PlanningState::from_pose(Pose2D::new(4.5, 4.5, 0.0)))
        .unwrap();

    planner.plan(0.5).unwrap();
    let path = planner.path_in_world();
    assert!(path.len() >= 2);
    assert!((path.first().unwrap().position.x - 0.25).abs() < 1e-4);
    assert!((path.last().unwrap().position.x - 4.5).abs() < 1e-4);
}

#[test]
fn sampling_joint_space_through_facade() {
    let mut env = Environment::new();
    env.insert("trav", TravGrid::new(4, 4, 0.5, 0.5, Pose2D::identity()));

    let mut planner = MotionPlanner::sampling(SamplingConfig::default());
    planner.set_trav_grid(&env, "trav").unwrap();
    planner
        .set_start_state(PlanningState::from_joints(vec![0.0, 0.0]))
        .unwrap();
    planner
        .set_goal_state(PlanningState::from_joints(vec![0.7, -0.5]))
        .unwrap();

    planner.plan(0.5).unwrap();

    let states = planner.states_in_world();
    assert!(states.len() >= 2);
    assert_eq!(states[0].joints().unwrap(), &[0.0, 0.0]);
    assert_eq!(states.last().unwrap().joints().unwrap(), &[0.7, -0.5]);

    // Joint solutions have no spatial footprint.
    assert!(planner.path_in_world().is_empty());
    assert!(planner.trajectory_in_world(0.5).is_empty());
}

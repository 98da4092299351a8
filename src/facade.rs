//! The planning facade: one interface over interchangeable backends.
//!
//! [`MotionPlanner`] owns the problem definition (map, start, goal),
//! converts poses between the world frame and the backend's grid frame,
//! decides how much work a `plan()` call needs (reuse, re-bind, or full
//! reinitialization), and converts the backend's grid-frame solution back
//! into world-frame paths and trajectories.
//!
//! All mutating operations report failures from the closed [`PlanError`]
//! set and additionally record the kind for [`MotionPlanner::last_error`].
//! A failed call never disturbs previously stored valid state: the last
//! known-good map, start, goal, and solution survive it.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::backend::{
    GridSearchConfig, GridSearchPlanner, PlanningBackend, SamplingConfig, SamplingPlanner,
};
use crate::config::{BackendKind, PlannerConfig};
use crate::core::{GridPose, GridState, PlanningState, StateKind};
use crate::error::PlanError;
use crate::grid::{Environment, TravGrid};
use crate::replan::{self, ReplanDecision};
use crate::trajectory::{Trajectory, Waypoint};
use crate::transform;

/// Unified motion planner for grid navigation and joint-space motion.
///
/// Construct it with one of the two reference backends (or any
/// [`PlanningBackend`] implementation), feed it a traversability grid and
/// world-frame start/goal states, and call [`plan`](Self::plan). Repeated
/// `plan` calls with an unchanged problem let the backend keep improving
/// its solution (anytime planning).
pub struct MotionPlanner {
    backend: Box<dyn PlanningBackend>,

    grid: Option<Arc<TravGrid>>,
    start_world: Option<PlanningState>,
    goal_world: Option<PlanningState>,
    start_grid: Option<GridState>,
    goal_grid: Option<GridState>,

    /// Start/goal of the last successful plan, for the replanning policy.
    solved_start: Option<PlanningState>,
    solved_goal: Option<PlanningState>,

    new_grid: bool,
    new_start: bool,
    new_goal: bool,
    initialized: bool,

    path_world: Vec<PlanningState>,
    last_error: Option<PlanError>,
}

impl MotionPlanner {
    /// Create a planner around an arbitrary backend.
    pub fn new(backend: Box<dyn PlanningBackend>) -> Self {
        Self {
            backend,
            grid: None,
            start_world: None,
            goal_world: None,
            start_grid: None,
            goal_grid: None,
            solved_start: None,
            solved_goal: None,
            new_grid: false,
            new_start: false,
            new_goal: false,
            initialized: false,
            path_world: Vec::new(),
            last_error: None,
        }
    }

    /// Planner with the sampling backend (continuous/joint-space).
    pub fn sampling(config: SamplingConfig) -> Self {
        Self::new(Box::new(SamplingPlanner::new(config)))
    }

    /// Planner with the grid-search backend (fast grid navigation).
    pub fn grid_search(config: GridSearchConfig) -> Self {
        Self::new(Box::new(GridSearchPlanner::new(config)))
    }

    /// Planner with the backend selected by a [`PlannerConfig`].
    pub fn from_config(config: &PlannerConfig) -> Self {
        match config.backend {
            BackendKind::Sampling => Self::sampling(config.sampling.clone()),
            BackendKind::GridSearch => Self::grid_search(config.search.clone()),
        }
    }

    /// Record the outcome of a mutating operation for [`last_error`].
    ///
    /// [`last_error`]: Self::last_error
    fn record(&mut self, result: Result<(), PlanError>) -> Result<(), PlanError> {
        match &result {
            Ok(()) => self.last_error = None,
            Err(err) => {
                warn!("planner operation failed: {err}");
                self.last_error = Some(*err);
            }
        }
        result
    }

    /// Select the traversability grid to plan on.
    ///
    /// Looks `id` up in the environment, falling back to the first grid
    /// the provider inserted when the id is empty or unknown. Fails with
    /// [`PlanError::MissingTravGrid`] if the environment holds no grid.
    pub fn set_trav_grid(&mut self, env: &Environment, id: &str) -> Result<(), PlanError> {
        let result = match env.find(id) {
            Some(grid) => {
                debug!(
                    "received grid: {}x{} cells at {:.3}x{:.3} m/cell",
                    grid.width(),
                    grid.height(),
                    grid.scale_x(),
                    grid.scale_y()
                );
                self.grid = Some(grid);
                self.new_grid = true;
                Ok(())
            }
            None => Err(PlanError::MissingTravGrid),
        };
        self.record(result)
    }

    /// Set the start state (world frame).
    ///
    /// Pose-carrying states are transformed into the grid frame right
    /// away; the call fails if the pose falls outside the grid or the
    /// state kind is not one the backend can plan for. The previously
    /// stored start survives any failure.
    pub fn set_start_state(&mut self, state: PlanningState) -> Result<(), PlanError> {
        let result = self.accept_state(state, true);
        self.record(result)
    }

    /// Set the goal state (world frame). Same contract as
    /// [`set_start_state`](Self::set_start_state).
    pub fn set_goal_state(&mut self, state: PlanningState) -> Result<(), PlanError> {
        let result = self.accept_state(state, false);
        self.record(result)
    }

    fn accept_state(&mut self, state: PlanningState, is_start: bool) -> Result<(), PlanError> {
        let kind = state.kind();
        if kind == StateKind::Empty || !self.backend.supports(kind) {
            return Err(PlanError::WrongStateKind);
        }

        let grid_state = if kind.has_pose() {
            let grid = self.grid.as_ref().ok_or(PlanError::MissingTravGrid)?;
            derive_grid_state(grid, &state)?
        } else {
            // Joint-only states carry no spatial component to transform.
            derive_joint_state(&state)?
        };

        if is_start {
            self.start_world = Some(state);
            self.start_grid = Some(grid_state);
            self.new_start = true;
        } else {
            self.goal_world = Some(state);
            self.goal_grid = Some(grid_state);
            self.new_goal = true;
        }
        Ok(())
    }

    /// Solve (or keep optimizing) the current problem within a wall-clock
    /// budget in seconds.
    ///
    /// Preconditions are checked in order: grid, start, goal. A new grid
    /// reinitializes the backend; a start/goal change beyond the
    /// replanning thresholds re-binds the problem; otherwise the backend
    /// continues optimizing its existing search. On success the solution
    /// is stored in world frame; on failure the previous solution stands.
    pub fn plan(&mut self, max_time_s: f32) -> Result<(), PlanError> {
        let result = self.try_plan(max_time_s);
        self.record(result)
    }

    fn try_plan(&mut self, max_time_s: f32) -> Result<(), PlanError> {
        let grid = self.grid.clone().ok_or(PlanError::MissingTravGrid)?;
        let start_world = self
            .start_world
            .clone()
            .ok_or(PlanError::MissingStartState)?;
        let goal_world = self.goal_world.clone().ok_or(PlanError::MissingGoalState)?;

        let decision = if self.new_grid || !self.initialized {
            ReplanDecision::Reinitialize
        } else if !self.new_start && !self.new_goal && self.solved_start.is_some() {
            ReplanDecision::ContinueOptimizing
        } else {
            replan::decide(
                self.solved_start.as_ref(),
                self.solved_goal.as_ref(),
                &start_world,
                &goal_world,
                false,
            )
        };
        debug!("replanning decision: {decision:?}");

        match decision {
            ReplanDecision::Reinitialize => {
                self.backend.initialize(
                    grid.width(),
                    grid.height(),
                    grid.scale_x(),
                    grid.scale_y(),
                    grid.cells(),
                )?;
                self.initialized = true;

                // The grid may have changed since the setters ran; derive
                // fresh grid-frame copies against it.
                let start_grid = derive_grid_state(&grid, &start_world)?;
                let goal_grid = derive_grid_state(&grid, &goal_world)?;
                self.backend.set_start_goal(&start_grid, &goal_grid)?;
                self.start_grid = Some(start_grid);
                self.goal_grid = Some(goal_grid);
            }
            ReplanDecision::SetNewStartGoal => {
                let start_grid = match &self.start_grid {
                    Some(state) => state.clone(),
                    None => derive_grid_state(&grid, &start_world)?,
                };
                let goal_grid = match &self.goal_grid {
                    Some(state) => state.clone(),
                    None => derive_grid_state(&grid, &goal_world)?,
                };
                self.backend.set_start_goal(&start_grid, &goal_grid)?;
                self.start_grid = Some(start_grid);
                self.goal_grid = Some(goal_grid);
            }
            ReplanDecision::ContinueOptimizing => {}
        }

        self.backend
            .solve(Duration::from_secs_f32(max_time_s.max(0.0)))?;

        let mut grid_path = Vec::new();
        self.backend.fill_path(&mut grid_path);

        let mut world_path = Vec::with_capacity(grid_path.len());
        for state in &grid_path {
            world_path.push(grid_state_to_world(&grid, state)?);
        }

        info!(
            "plan succeeded: {} states, decision {:?}",
            world_path.len(),
            decision
        );
        self.path_world = world_path;
        self.new_grid = false;
        self.new_start = false;
        self.new_goal = false;
        self.solved_start = Some(start_world);
        self.solved_goal = Some(goal_world);
        Ok(())
    }

    /// States of the current solution in world frame; empty before the
    /// first successful plan.
    pub fn states_in_world(&self) -> &[PlanningState] {
        &self.path_world
    }

    /// The current solution as world-frame waypoints.
    ///
    /// Joint-only solution states carry no pose and contribute no
    /// waypoint. Never triggers planning; empty before the first success.
    pub fn path_in_world(&self) -> Vec<Waypoint> {
        self.path_world
            .iter()
            .filter_map(|state| {
                state
                    .pose()
                    .map(|pose| Waypoint::new(pose.position(), pose.theta))
            })
            .collect()
    }

    /// The current solution as a timed trajectory at a constant speed,
    /// split into forward and backward motion segments.
    ///
    /// Never triggers planning; empty before the first success.
    pub fn trajectory_in_world(&self, speed: f32) -> Trajectory {
        Trajectory::from_waypoints(&self.path_in_world(), speed)
    }

    /// The start pose in the grid frame, once derived.
    pub fn start_pose_in_grid(&self) -> Option<GridPose> {
        self.start_grid.as_ref().and_then(|s| s.pose().copied())
    }

    /// The goal pose in the grid frame, once derived.
    pub fn goal_pose_in_grid(&self) -> Option<GridPose> {
        self.goal_grid.as_ref().and_then(|s| s.pose().copied())
    }

    /// The error recorded by the most recent mutating operation, or
    /// `None` if it succeeded.
    pub fn last_error(&self) -> Option<PlanError> {
        self.last_error
    }
}

/// Derive the grid-frame copy of a world-frame state.
fn derive_grid_state(grid: &TravGrid, state: &PlanningState) -> Result<GridState, PlanError> {
    match (state.pose(), state.joints()) {
        (Some(pose), joints) => {
            let grid_pose = transform::world_to_grid(grid, pose).ok_or(PlanError::SetStates)?;
            Ok(match joints {
                Some(joints) => GridState::from_pose_and_joints(grid_pose, joints.to_vec()),
                None => GridState::from_pose(grid_pose),
            })
        }
        (None, Some(_)) => derive_joint_state(state),
        (None, None) => Err(PlanError::SetStates),
    }
}

/// Grid-frame copy of a joint-only state: the joints pass through.
fn derive_joint_state(state: &PlanningState) -> Result<GridState, PlanError> {
    state
        .joints()
        .map(|joints| GridState::from_joints(joints.to_vec()))
        .ok_or(PlanError::SetStates)
}

/// Convert a backend solution state back into the world frame.
fn grid_state_to_world(grid: &TravGrid, state: &GridState) -> Result<PlanningState, PlanError> {
    match (state.pose(), state.joints()) {
        (Some(grid_pose), joints) => {
            let pose = transform::grid_to_world(grid, grid_pose).ok_or(PlanError::Internal)?;
            Ok(match joints {
                Some(joints) => PlanningState::from_pose_and_joints(pose, joints.to_vec()),
                None => PlanningState::from_pose(pose),
            })
        }
        (None, Some(joints)) => Ok(PlanningState::from_joints(joints.to_vec())),
        (None, None) => Err(PlanError::Internal),
    }
}

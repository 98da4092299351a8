//! # marga-plan
//!
//! Unified motion-planning facade for mobile-robot navigation and
//! joint-space manipulator motion.
//!
//! ## Overview
//!
//! Two families of planners hide behind one interface:
//!
//! - **Sampling-based** ([`SamplingPlanner`]): grows a tree in continuous
//!   space, trading path length against obstacle clearance; handles
//!   omnidirectional and joint-space problems
//! - **Search-based** ([`GridSearchPlanner`]): anytime weighted-A* over a
//!   configurable primitive motion set, for fast grid navigation
//!
//! The [`MotionPlanner`] facade owns the problem definition, converts
//! poses between the world frame and the planner's grid frame, decides
//! when a full re-solve is needed versus letting the backend keep
//! optimizing (anytime planning), and converts solutions back into
//! world-frame waypoints and timed trajectories.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marga_plan::{
//!     Environment, GridSearchConfig, MotionPlanner, PlanningState, Pose2D, TravGrid,
//! };
//!
//! let mut env = Environment::new();
//! env.insert("trav", TravGrid::new(100, 100, 0.05, 0.05, Pose2D::identity()));
//!
//! let mut planner = MotionPlanner::grid_search(GridSearchConfig::default());
//! planner.set_trav_grid(&env, "trav")?;
//! planner.set_start_state(PlanningState::from_pose(Pose2D::new(0.2, 0.2, 0.0)))?;
//! planner.set_goal_state(PlanningState::from_pose(Pose2D::new(4.0, 3.5, 0.0)))?;
//!
//! planner.plan(1.0)?;
//! let trajectory = planner.trajectory_in_world(0.3);
//! ```
//!
//! ## Coordinate System
//!
//! Uses the ROS REP-103 convention: X forward, Y left, theta CCW from +X
//! in radians, normalized to (-π, π]. The grid frame is cell-indexed and
//! local to the traversability grid; conversions apply the grid's own
//! world pose and per-axis cell scale (see [`transform`]).

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod facade;
pub mod grid;
pub mod replan;
pub mod trajectory;
pub mod transform;

pub use backend::{
    blended_cost, GridSearchConfig, GridSearchPlanner, MotionPrimitive, PlanningBackend,
    SamplingConfig, SamplingPlanner,
};
pub use config::{BackendKind, ConfigError, PlannerConfig};
pub use crate::core::{GridCoord, GridPose, GridState, PlanningState, Pose2D, StateKind, WorldPoint};
pub use error::PlanError;
pub use facade::MotionPlanner;
pub use grid::{Environment, TravGrid};
pub use replan::{
    ReplanDecision, REPLANNING_DIST_THRESHOLD, REPLANNING_JOINT_ANGLE_THRESHOLD,
    REPLANNING_TURN_THRESHOLD,
};
pub use trajectory::{
    MotionDirection, TimedWaypoint, Trajectory, TrajectorySegment, Waypoint,
};
pub use transform::{grid_local_to_world, grid_to_world, world_to_grid, world_to_grid_local};

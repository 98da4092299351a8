//! Core value types shared by the facade and every backend.
//!
//! - [`GridCoord`] / [`WorldPoint`]: discrete and continuous coordinates
//! - [`Pose2D`]: position plus heading, ROS REP-103 convention
//! - [`PlanningState`] / [`GridState`]: world- and grid-frame planning states
//! - [`math`]: angle normalization helpers

pub mod math;
mod point;
mod pose;
mod state;

pub use point::{GridCoord, WorldPoint};
pub use pose::Pose2D;
pub use state::{GridPose, GridState, PlanningState, StateKind};

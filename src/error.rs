//! Error kinds for the planning facade.
//!
//! Planning failures form a closed set of kinds. Every public mutating
//! operation on the facade returns `Result<_, PlanError>` and additionally
//! records the kind so callers polling [`MotionPlanner::last_error`] between
//! cycles see the most recent failure.
//!
//! [`MotionPlanner::last_error`]: crate::facade::MotionPlanner::last_error

use thiserror::Error;

/// Reason a facade operation failed.
///
/// All conditions are recoverable: a failed call leaves previously stored
/// state (map, start, goal, last solution) untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// Unexpected internal condition, e.g. a backend invoked out of order.
    #[error("internal planner error")]
    Internal,

    /// `plan()` was called before a start state was set.
    #[error("start state has not been set")]
    MissingStartState,

    /// `plan()` was called before a goal state was set.
    #[error("goal state has not been set")]
    MissingGoalState,

    /// No traversability grid is available.
    #[error("traversability grid has not been set")]
    MissingTravGrid,

    /// The backend could not find (or further optimize) a solution.
    #[error("planning failed to produce a solution")]
    PlanningFailed,

    /// The state representation does not match what the backend supports,
    /// e.g. a joint-space state handed to a grid navigation planner.
    #[error("state kind does not match the configured backend")]
    WrongStateKind,

    /// The backend rejected the grid during (re-)initialization.
    #[error("backend grid initialization failed")]
    MapInitialization,

    /// A start or goal state could not be established, either because its
    /// pose falls outside the grid or the backend rejected the cell.
    #[error("failed to set start or goal state")]
    SetStates,
}

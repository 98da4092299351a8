//! The backend contract every concrete planner satisfies.
//!
//! Backends operate purely in the grid frame and own their search
//! structures; the facade reaches them only through the four contract
//! operations. Two reference variants ship with the crate:
//!
//! - [`SamplingPlanner`]: continuous-space anytime tree growth with a
//!   length-vs-clearance objective, for omnidirectional and joint-space
//!   planning
//! - [`GridSearchPlanner`]: anytime weighted-A* over a configurable
//!   primitive motion set, for fast grid navigation

mod sampling;
mod search;

pub use sampling::{SamplingConfig, SamplingPlanner};
pub use search::{GridSearchConfig, GridSearchPlanner, MotionPrimitive};

use std::time::Duration;

use crate::core::{GridState, StateKind};
use crate::error::PlanError;

/// A pluggable planning backend.
///
/// Implementations must be substitutable: identical contract and failure
/// semantics regardless of what `solve` does internally.
pub trait PlanningBackend {
    /// (Re)build all internal structures from the grid.
    ///
    /// Idempotent: calling again on a map change discards every piece of
    /// previous search state. `data` is the row-major traversal cost array
    /// (`width * height` cells, 255 = impassable).
    fn initialize(
        &mut self,
        width: usize,
        height: usize,
        scale_x: f32,
        scale_y: f32,
        data: &[u8],
    ) -> Result<(), PlanError>;

    /// Bind a new problem instance, discarding any previous solution and
    /// search progress.
    ///
    /// Fails with [`PlanError::SetStates`] if either state is outside the
    /// grid, on an impassable cell, or of a shape the backend cannot plan
    /// for.
    fn set_start_goal(&mut self, start: &GridState, goal: &GridState) -> Result<(), PlanError>;

    /// Search for, or further optimize, a solution within the wall-clock
    /// budget.
    ///
    /// Repeated calls after a first success refine the existing solution
    /// rather than restarting. Fails with [`PlanError::PlanningFailed`]
    /// when no solution is known after the budget runs out.
    fn solve(&mut self, budget: Duration) -> Result<(), PlanError>;

    /// Write the best known solution as an ordered sequence of grid-frame
    /// states into `out`, replacing its contents.
    ///
    /// Leaves `out` empty if `solve` has not yet succeeded.
    fn fill_path(&self, out: &mut Vec<GridState>);

    /// Whether this backend can plan for states of the given kind.
    fn supports(&self, kind: StateKind) -> bool;
}

/// Blend path length and obstacle clearance into one objective value.
///
/// Lower is better: long paths and paths that shave close to obstacles
/// both score worse. `clearance` is the minimum obstacle distance along
/// the path in meters; `clearance_weight` trades meters of detour against
/// meters of clearance.
pub fn blended_cost(length: f32, clearance: f32, clearance_weight: f32) -> f32 {
    length + clearance_weight / (clearance + 1e-3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blended_cost_prefers_short() {
        let wide = blended_cost(5.0, 1.0, 1.0);
        let long = blended_cost(9.0, 1.0, 1.0);
        assert!(wide < long);
    }

    #[test]
    fn test_blended_cost_prefers_clearance() {
        let tight = blended_cost(5.0, 0.05, 1.0);
        let wide = blended_cost(5.5, 1.0, 1.0);
        assert!(wide < tight);
    }

    #[test]
    fn test_blended_cost_zero_weight_is_length() {
        let cost = blended_cost(5.0, 0.0, 0.0);
        assert!((cost - 5.0).abs() < 1e-6);
    }
}

//! Replanning decision policy.
//!
//! Between two `plan()` calls the facade has to decide how much backend
//! work the new request actually needs. A changed map always invalidates
//! the backend's grid-indexed structures; start or goal movement beyond
//! fixed thresholds re-binds the problem; anything smaller lets the backend
//! keep optimizing its existing search (anytime behavior).

use crate::core::math::angle_diff;
use crate::core::PlanningState;

/// Start/goal translation below this distance does not re-bind the
/// problem (meters).
pub const REPLANNING_DIST_THRESHOLD: f32 = 0.05;

/// Start/goal rotation below this angle does not re-bind the problem
/// (radians, ~1°).
pub const REPLANNING_TURN_THRESHOLD: f32 = 0.017;

/// Per-joint angle change below this does not re-bind the problem
/// (radians, ~1°).
pub const REPLANNING_JOINT_ANGLE_THRESHOLD: f32 = 0.017;

/// What the next `plan()` call has to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplanDecision {
    /// Nothing changed since the last successful plan: let the backend
    /// keep optimizing within the new time budget.
    ContinueOptimizing,
    /// Start or goal moved beyond threshold: re-bind the problem with a
    /// fresh `set_start_goal`, keeping the initialized grid.
    SetNewStartGoal,
    /// The map changed (or was received for the first time): rebuild the
    /// backend's grid structures from scratch.
    Reinitialize,
}

/// Decide what the next solve needs, comparing the previously solved
/// start/goal against the new ones.
///
/// `prev_start`/`prev_goal` are the states of the last *successful* plan;
/// `None` means there is none yet and the problem must be (re-)bound.
pub fn decide(
    prev_start: Option<&PlanningState>,
    prev_goal: Option<&PlanningState>,
    new_start: &PlanningState,
    new_goal: &PlanningState,
    map_changed: bool,
) -> ReplanDecision {
    if map_changed {
        return ReplanDecision::Reinitialize;
    }
    let start_moved = match prev_start {
        Some(prev) => exceeds_thresholds(prev, new_start),
        None => true,
    };
    let goal_moved = match prev_goal {
        Some(prev) => exceeds_thresholds(prev, new_goal),
        None => true,
    };
    if start_moved || goal_moved {
        ReplanDecision::SetNewStartGoal
    } else {
        ReplanDecision::ContinueOptimizing
    }
}

/// Whether two states differ enough to count as a new problem.
fn exceeds_thresholds(prev: &PlanningState, new: &PlanningState) -> bool {
    if prev.kind() != new.kind() {
        return true;
    }

    if let (Some(prev_pose), Some(new_pose)) = (prev.pose(), new.pose()) {
        if prev_pose.distance(new_pose) >= REPLANNING_DIST_THRESHOLD {
            return true;
        }
        if angle_diff(prev_pose.theta, new_pose.theta).abs() >= REPLANNING_TURN_THRESHOLD {
            return true;
        }
    }

    if let (Some(prev_joints), Some(new_joints)) = (prev.joints(), new.joints()) {
        if prev_joints.len() != new_joints.len() {
            return true;
        }
        if prev_joints
            .iter()
            .zip(new_joints)
            .any(|(a, b)| angle_diff(*a, *b).abs() >= REPLANNING_JOINT_ANGLE_THRESHOLD)
        {
            return true;
        }
    }

    false
}

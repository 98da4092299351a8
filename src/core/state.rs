//! Planning states in world and grid frames.
//!
//! A [`PlanningState`] is what callers hand to the facade: a world-frame
//! pose for navigation, a joint vector for manipulation, or both. The facade
//! derives a [`GridState`] counterpart for the backend; backends never see
//! world coordinates, callers never see grid coordinates.

use serde::{Deserialize, Serialize};

use super::point::GridCoord;
use super::pose::Pose2D;

/// Which representation a state carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    /// Neither pose nor joints populated.
    Empty,
    /// Pose only (mobile-base navigation).
    Pose,
    /// Joint vector only (manipulator motion).
    Joints,
    /// Pose and joint vector together.
    PoseAndJoints,
}

impl StateKind {
    /// Whether states of this kind carry a pose.
    #[inline]
    pub fn has_pose(&self) -> bool {
        matches!(self, StateKind::Pose | StateKind::PoseAndJoints)
    }

    /// Whether states of this kind carry joint values.
    #[inline]
    pub fn has_joints(&self) -> bool {
        matches!(self, StateKind::Joints | StateKind::PoseAndJoints)
    }
}

/// A start, goal, or solution state in the world frame.
///
/// Replaced wholesale on every update; never mutated in place.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanningState {
    pose: Option<Pose2D>,
    joints: Option<Vec<f32>>,
}

impl PlanningState {
    /// State carrying a world-frame pose.
    pub fn from_pose(pose: Pose2D) -> Self {
        Self {
            pose: Some(pose),
            joints: None,
        }
    }

    /// State carrying joint angles in radians.
    pub fn from_joints(joints: Vec<f32>) -> Self {
        Self {
            pose: None,
            joints: Some(joints),
        }
    }

    /// State carrying both a pose and joint angles.
    pub fn from_pose_and_joints(pose: Pose2D, joints: Vec<f32>) -> Self {
        Self {
            pose: Some(pose),
            joints: Some(joints),
        }
    }

    /// Which representation is populated.
    pub fn kind(&self) -> StateKind {
        match (&self.pose, &self.joints) {
            (None, None) => StateKind::Empty,
            (Some(_), None) => StateKind::Pose,
            (None, Some(_)) => StateKind::Joints,
            (Some(_), Some(_)) => StateKind::PoseAndJoints,
        }
    }

    /// The pose, if populated.
    pub fn pose(&self) -> Option<&Pose2D> {
        self.pose.as_ref()
    }

    /// The joint vector, if populated.
    pub fn joints(&self) -> Option<&[f32]> {
        self.joints.as_deref()
    }
}

/// A pose in the grid frame: discrete cell indices plus a continuous
/// heading relative to the grid's orientation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridPose {
    /// Cell indices.
    pub cell: GridCoord,
    /// Heading in radians relative to the grid frame, (-π, π].
    pub heading: f32,
}

impl GridPose {
    /// Create a new grid pose.
    #[inline]
    pub fn new(cell: GridCoord, heading: f32) -> Self {
        Self { cell, heading }
    }
}

/// The grid-frame counterpart of a [`PlanningState`].
///
/// Joint values pass through untransformed; no spatial mapping applies to
/// them.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct GridState {
    pose: Option<GridPose>,
    joints: Option<Vec<f32>>,
}

impl GridState {
    /// State carrying a grid pose.
    pub fn from_pose(pose: GridPose) -> Self {
        Self {
            pose: Some(pose),
            joints: None,
        }
    }

    /// State carrying joint angles.
    pub fn from_joints(joints: Vec<f32>) -> Self {
        Self {
            pose: None,
            joints: Some(joints),
        }
    }

    /// State carrying both.
    pub fn from_pose_and_joints(pose: GridPose, joints: Vec<f32>) -> Self {
        Self {
            pose: Some(pose),
            joints: Some(joints),
        }
    }

    /// Which representation is populated.
    pub fn kind(&self) -> StateKind {
        match (&self.pose, &self.joints) {
            (None, None) => StateKind::Empty,
            (Some(_), None) => StateKind::Pose,
            (None, Some(_)) => StateKind::Joints,
            (Some(_), Some(_)) => StateKind::PoseAndJoints,
        }
    }

    /// The grid pose, if populated.
    pub fn pose(&self) -> Option<&GridPose> {
        self.pose.as_ref()
    }

    /// The joint vector, if populated.
    pub fn joints(&self) -> Option<&[f32]> {
        self.joints.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_kinds() {
        assert_eq!(PlanningState::default().kind(), StateKind::Empty);
        assert_eq!(
            PlanningState::from_pose(Pose2D::identity()).kind(),
            StateKind::Pose
        );
        assert_eq!(
            PlanningState::from_joints(vec![0.1, 0.2]).kind(),
            StateKind::Joints
        );
        assert_eq!(
            PlanningState::from_pose_and_joints(Pose2D::identity(), vec![0.0]).kind(),
            StateKind::PoseAndJoints
        );
    }

    #[test]
    fn test_kind_predicates() {
        assert!(StateKind::Pose.has_pose());
        assert!(!StateKind::Pose.has_joints());
        assert!(StateKind::Joints.has_joints());
        assert!(!StateKind::Joints.has_pose());
        assert!(StateKind::PoseAndJoints.has_pose());
        assert!(StateKind::PoseAndJoints.has_joints());
    }

    #[test]
    fn test_grid_state_accessors() {
        let gp = GridPose::new(GridCoord::new(3, 4), 0.5);
        let state = GridState::from_pose_and_joints(gp, vec![1.0, 2.0]);
        assert_eq!(state.pose().unwrap().cell, GridCoord::new(3, 4));
        assert_eq!(state.joints().unwrap(), &[1.0, 2.0]);
    }
}

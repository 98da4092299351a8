//! Pose conversion between the world, grid, and grid-local frames.
//!
//! Three frames are involved:
//!
//! - **World**: the global frame callers express poses in (meters, radians).
//! - **Grid-local**: continuous frame attached to the grid, meters and
//!   radians, origin at the center of cell (0, 0).
//! - **Grid**: discrete cell indices plus a heading relative to the grid's
//!   orientation.
//!
//! Conversions apply the grid's own world pose and its per-axis cell scale.
//! World→grid rounds to the nearest cell index; grid→world reconstructs the
//! cell center. All functions are pure and return `None` when the input pose
//! falls outside the grid, leaving no state behind.

use crate::core::math::normalize_angle;
use crate::core::{GridCoord, GridPose, Pose2D};
use crate::grid::TravGrid;

/// Convert a world-frame pose to discrete grid coordinates.
///
/// Returns `None` if the pose lies outside the grid bounds.
pub fn world_to_grid(grid: &TravGrid, world: &Pose2D) -> Option<GridPose> {
    let local = grid.pose().inverse().compose(world);
    let cell = GridCoord::new(
        (local.x / grid.scale_x()).round() as i32,
        (local.y / grid.scale_y()).round() as i32,
    );
    if !grid.in_bounds(cell) {
        return None;
    }
    Some(GridPose::new(cell, normalize_angle(local.theta)))
}

/// Convert discrete grid coordinates back to a world-frame pose at the
/// cell center.
///
/// Returns `None` if the cell lies outside the grid bounds.
pub fn grid_to_world(grid: &TravGrid, pose: &GridPose) -> Option<Pose2D> {
    if !grid.in_bounds(pose.cell) {
        return None;
    }
    let local = Pose2D::new(
        pose.cell.x as f32 * grid.scale_x(),
        pose.cell.y as f32 * grid.scale_y(),
        pose.heading,
    );
    Some(grid.pose().compose(&local))
}

/// Convert a world-frame pose to the continuous grid-local frame.
///
/// Exact inverse of [`grid_local_to_world`]; no quantization. Returns
/// `None` if the pose lies outside the grid extent.
pub fn world_to_grid_local(grid: &TravGrid, world: &Pose2D) -> Option<Pose2D> {
    let local = grid.pose().inverse().compose(world);
    if !local_in_bounds(grid, &local) {
        return None;
    }
    Some(local)
}

/// Convert a continuous grid-local pose to the world frame.
///
/// Returns `None` if the pose lies outside the grid extent.
pub fn grid_local_to_world(grid: &TravGrid, local: &Pose2D) -> Option<Pose2D> {
    if !local_in_bounds(grid, local) {
        return None;
    }
    Some(grid.pose().compose(local))
}

/// A grid-local position is in bounds when its nearest cell is.
fn local_in_bounds(grid: &TravGrid, local: &Pose2D) -> bool {
    let cell = GridCoord::new(
        (local.x / grid.scale_x()).round() as i32,
        (local.y / grid.scale_y()).round() as i32,
    );
    grid.in_bounds(cell)
}

//! Waypoint and timed-trajectory representations of a solution path.
//!
//! A planned path comes back from the facade as world-frame waypoints.
//! [`Trajectory::from_waypoints`] turns them into a timed curve: the path
//! is first split into maximal forward- and backward-motion segments (a
//! waypoint whose heading points against the local direction of travel
//! marks a reversal), then each segment gets cumulative timestamps at a
//! constant speed.

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::core::math::angle_diff;
use crate::core::WorldPoint;

/// A world-frame waypoint along a planned path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position in meters.
    pub position: WorldPoint,
    /// Heading in radians, (-π, π].
    pub heading: f32,
}

impl Waypoint {
    /// Create a new waypoint.
    #[inline]
    pub fn new(position: WorldPoint, heading: f32) -> Self {
        Self { position, heading }
    }

    /// Distance to another waypoint in meters.
    #[inline]
    pub fn distance_to(&self, other: &Waypoint) -> f32 {
        self.position.distance(&other.position)
    }
}

/// Direction of travel relative to the robot's heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionDirection {
    /// Heading agrees with the direction of travel.
    Forward,
    /// Heading points against the direction of travel.
    Backward,
}

/// A waypoint stamped with its time along the trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedWaypoint {
    /// The waypoint.
    pub waypoint: Waypoint,
    /// Seconds since the start of the trajectory.
    pub time_s: f32,
}

/// A maximal run of same-direction motion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySegment {
    /// Whether this run is driven forward or backward.
    pub direction: MotionDirection,
    /// Timed waypoints; the first repeats the previous segment's last
    /// position at the reversal point.
    pub points: Vec<TimedWaypoint>,
    /// Segment length in meters.
    pub length: f32,
    /// Segment duration in seconds.
    pub duration: f32,
}

/// A timed curve over a planned path.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    /// Forward/backward segments in travel order.
    pub segments: Vec<TrajectorySegment>,
    /// Constant speed the timestamps assume, m/s.
    pub speed: f32,
    /// Total length in meters.
    pub total_length: f32,
    /// Total duration in seconds.
    pub total_duration: f32,
}

impl Trajectory {
    /// Build a timed trajectory from waypoints at a constant speed.
    ///
    /// Returns an empty trajectory for fewer than two waypoints or a
    /// non-positive speed.
    pub fn from_waypoints(waypoints: &[Waypoint], speed: f32) -> Self {
        if waypoints.len() < 2 || speed <= 0.0 {
            return Self {
                speed,
                ..Self::default()
            };
        }

        // Direction of each step; zero-length steps inherit the previous
        // direction so they never split a segment.
        let mut directions = Vec::with_capacity(waypoints.len() - 1);
        let mut previous = MotionDirection::Forward;
        for pair in waypoints.windows(2) {
            let step = pair[0].distance_to(&pair[1]);
            let direction = if step <= f32::EPSILON {
                previous
            } else {
                let travel = pair[0].position.angle_to(&pair[1].position);
                if angle_diff(pair[0].heading, travel).abs() > FRAC_PI_2 {
                    MotionDirection::Backward
                } else {
                    MotionDirection::Forward
                }
            };
            directions.push(direction);
            previous = direction;
        }

        let mut segments: Vec<TrajectorySegment> = Vec::new();
        let mut time = 0.0f32;
        let mut total_length = 0.0f32;

        let mut segment_start = 0;
        while segment_start < directions.len() {
            let direction = directions[segment_start];
            let mut segment_end = segment_start;
            while segment_end + 1 < directions.len() && directions[segment_end + 1] == direction {
                segment_end += 1;
            }

            let mut points = Vec::with_capacity(segment_end - segment_start + 2);
            points.push(TimedWaypoint {
                waypoint: waypoints[segment_start],
                time_s: time,
            });
            let mut length = 0.0f32;
            for i in segment_start..=segment_end {
                let step = waypoints[i].distance_to(&waypoints[i + 1]);
                length += step;
                time += step / speed;
                points.push(TimedWaypoint {
                    waypoint: waypoints[i + 1],
                    time_s: time,
                });
            }

            total_length += length;
            segments.push(TrajectorySegment {
                direction,
                points,
                length,
                duration: length / speed,
            });
            segment_start = segment_end + 1;
        }

        Self {
            segments,
            speed,
            total_length,
            total_duration: time,
        }
    }

    /// Whether the trajectory holds no motion.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

//! Anytime sampling-based planner for continuous and joint-space problems.
//!
//! Grows an RRT*-style tree in the grid-local frame (meters) for pose
//! problems, or inside a joint box for manipulator problems. The tree is
//! kept across `solve` calls: each call keeps sampling within its budget
//! and the best goal connection found so far only ever improves.
//!
//! Pose problems are scored with the blended length-vs-clearance objective
//! ([`super::blended_cost`]); clearance comes from a brushfire distance
//! field built once per grid. Joint problems score by path length alone.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use kiddo::{KdTree, SquaredEuclidean};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::core::{GridCoord, GridPose, GridState, StateKind, WorldPoint};
use crate::error::PlanError;
use crate::grid::TravGrid;

use super::{blended_cost, PlanningBackend};

/// Configuration for [`SamplingPlanner`].
#[derive(Clone, Debug, Deserialize)]
pub struct SamplingConfig {
    /// Maximum spatial extension per tree step (meters).
    #[serde(default = "default_max_step")]
    pub max_step: f32,

    /// Probability of sampling the goal instead of uniformly.
    #[serde(default = "default_goal_bias")]
    pub goal_bias: f32,

    /// Radius for choose-parent and rewiring (meters).
    #[serde(default = "default_neighbor_radius")]
    pub neighbor_radius: f32,

    /// A node this close to the goal (meters) may connect to it.
    #[serde(default = "default_goal_tolerance")]
    pub goal_tolerance: f32,

    /// Joint-space goal tolerance per joint (radians).
    #[serde(default = "default_joint_tolerance")]
    pub joint_tolerance: f32,

    /// Maximum joint-space extension per tree step (radians).
    #[serde(default = "default_max_joint_step")]
    pub max_joint_step: f32,

    /// Per-joint sampling limits `(min, max)` in radians. Empty means
    /// (-π, π] for every joint of the bound problem.
    #[serde(default)]
    pub joint_limits: Vec<(f32, f32)>,

    /// Weight of obstacle clearance in the path objective.
    #[serde(default = "default_clearance_weight")]
    pub clearance_weight: f32,

    /// Tree size cap; sampling stops when reached.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// RNG seed; fixed for reproducible trees.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_max_step() -> f32 {
    0.25
}

fn default_goal_bias() -> f32 {
    0.1
}

fn default_neighbor_radius() -> f32 {
    0.75
}

fn default_goal_tolerance() -> f32 {
    0.25
}

fn default_joint_tolerance() -> f32 {
    0.05
}

fn default_max_joint_step() -> f32 {
    0.2
}

fn default_clearance_weight() -> f32 {
    0.5
}

fn default_max_nodes() -> usize {
    50_000
}

fn default_seed() -> u64 {
    42
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_step: default_max_step(),
            goal_bias: default_goal_bias(),
            neighbor_radius: default_neighbor_radius(),
            goal_tolerance: default_goal_tolerance(),
            joint_tolerance: default_joint_tolerance(),
            max_joint_step: default_max_joint_step(),
            joint_limits: Vec::new(),
            clearance_weight: default_clearance_weight(),
            max_nodes: default_max_nodes(),
            seed: default_seed(),
        }
    }
}

/// Grid snapshot plus the derived obstacle distance field.
struct SampleGrid {
    width: usize,
    height: usize,
    scale_x: f32,
    scale_y: f32,
    cells: Vec<u8>,
    /// Distance to the nearest impassable cell, in cells.
    distance_field: Vec<f32>,
}

impl SampleGrid {
    fn build(width: usize, height: usize, scale_x: f32, scale_y: f32, data: &[u8]) -> Self {
        let mut grid = Self {
            width,
            height,
            scale_x,
            scale_y,
            cells: data.to_vec(),
            distance_field: vec![f32::MAX; width * height],
        };
        grid.compute_distance_field();
        grid
    }

    /// Brushfire (BFS) distance propagation seeded at impassable cells.
    fn compute_distance_field(&mut self) {
        let sqrt2 = std::f32::consts::SQRT_2;
        let neighbors: [(i32, i32, f32); 8] = [
            (-1, 0, 1.0),
            (1, 0, 1.0),
            (0, -1, 1.0),
            (0, 1, 1.0),
            (-1, -1, sqrt2),
            (1, -1, sqrt2),
            (-1, 1, sqrt2),
            (1, 1, sqrt2),
        ];

        let mut queue = VecDeque::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                if self.cells[idx] == TravGrid::MAX_COST {
                    self.distance_field[idx] = 0.0;
                    queue.push_back((x as i32, y as i32));
                }
            }
        }

        while let Some((x, y)) = queue.pop_front() {
            let current = self.distance_field[y as usize * self.width + x as usize];
            for &(dx, dy, step) in &neighbors {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= self.width as i32 || ny >= self.height as i32 {
                    continue;
                }
                let nidx = ny as usize * self.width + nx as usize;
                let candidate = current + step;
                if candidate < self.distance_field[nidx] {
                    self.distance_field[nidx] = candidate;
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    #[inline]
    fn in_bounds(&self, c: GridCoord) -> bool {
        c.x >= 0 && c.y >= 0 && (c.x as usize) < self.width && (c.y as usize) < self.height
    }

    #[inline]
    fn is_traversable(&self, c: GridCoord) -> bool {
        self.in_bounds(c) && self.cells[c.y as usize * self.width + c.x as usize] < TravGrid::MAX_COST
    }

    /// Nearest cell of a grid-local position.
    #[inline]
    fn cell_of(&self, p: WorldPoint) -> GridCoord {
        GridCoord::new(
            (p.x / self.scale_x).round() as i32,
            (p.y / self.scale_y).round() as i32,
        )
    }

    /// Obstacle clearance at a grid-local position, in meters.
    #[inline]
    fn clearance(&self, p: WorldPoint) -> f32 {
        let c = self.cell_of(p);
        if !self.in_bounds(c) {
            return 0.0;
        }
        let cells = self.distance_field[c.y as usize * self.width + c.x as usize];
        cells * self.scale_x.min(self.scale_y)
    }

    /// Whether the straight segment between two grid-local positions stays
    /// on traversable cells.
    fn segment_free(&self, from: WorldPoint, to: WorldPoint) -> bool {
        let length = from.distance(&to);
        let step = 0.5 * self.scale_x.min(self.scale_y);
        let samples = (length / step).ceil().max(1.0) as usize;
        for i in 0..=samples {
            let t = i as f32 / samples as f32;
            let p = WorldPoint::new(from.x + t * (to.x - from.x), from.y + t * (to.y - from.y));
            if !self.is_traversable(self.cell_of(p)) {
                return false;
            }
        }
        true
    }
}

/// Tree node in the grid-local plane.
struct SpatialNode {
    pos: WorldPoint,
    parent: Option<usize>,
    /// Path length from the start, meters.
    cost: f32,
    /// Obstacle clearance at this node, meters.
    clearance: f32,
}

/// Pose-space tree state.
struct SpatialProblem {
    start: GridPose,
    goal: GridPose,
    goal_local: WorldPoint,
    nodes: Vec<SpatialNode>,
    index: KdTree<f32, 2>,
    /// Node the goal currently connects through, with the blended
    /// objective of that path.
    best_parent: Option<usize>,
    best_objective: f32,
}

/// Tree node in joint space.
struct JointNode {
    q: Vec<f32>,
    parent: Option<usize>,
    cost: f32,
}

/// Joint-space tree state.
struct JointProblem {
    start: Vec<f32>,
    goal: Vec<f32>,
    limits: Vec<(f32, f32)>,
    nodes: Vec<JointNode>,
    best_parent: Option<usize>,
    best_cost: f32,
}

enum Problem {
    Spatial(SpatialProblem),
    Joint(JointProblem),
}

/// Anytime RRT*-flavored sampling planner.
pub struct SamplingPlanner {
    config: SamplingConfig,
    grid: Option<SampleGrid>,
    problem: Option<Problem>,
    rng: StdRng,
}

impl SamplingPlanner {
    /// Create a planner with the given configuration.
    pub fn new(config: SamplingConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            grid: None,
            problem: None,
            rng,
        }
    }

    /// Create a planner with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SamplingConfig::default())
    }

    /// Cell center in grid-local meters.
    fn local_of(grid: &SampleGrid, cell: GridCoord) -> WorldPoint {
        WorldPoint::new(cell.x as f32 * grid.scale_x, cell.y as f32 * grid.scale_y)
    }

    /// Minimum clearance along a node's chain back to the root.
    fn chain_clearance(nodes: &[SpatialNode], mut idx: usize) -> f32 {
        let mut min = nodes[idx].clearance;
        while let Some(parent) = nodes[idx].parent {
            idx = parent;
            min = min.min(nodes[idx].clearance);
        }
        min
    }

    /// Push updated costs down to all descendants of `root`.
    fn propagate_cost(nodes: &mut Vec<SpatialNode>, root: usize) {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let base = nodes[current].cost;
            let pos = nodes[current].pos;
            for i in 0..nodes.len() {
                if nodes[i].parent == Some(current) {
                    nodes[i].cost = base + pos.distance(&nodes[i].pos);
                    stack.push(i);
                }
            }
        }
    }

    /// One spatial sampling round; returns whether the best connection
    /// improved.
    fn grow_spatial(&mut self) -> bool {
        let grid = match self.grid.as_ref() {
            Some(grid) => grid,
            None => return false,
        };
        let problem = match self.problem.as_mut() {
            Some(Problem::Spatial(p)) => p,
            _ => return false,
        };
        if problem.nodes.len() >= self.config.max_nodes {
            return false;
        }

        // Sample: the goal with bias, uniform over the grid extent else.
        let sample = if self.rng.gen::<f32>() < self.config.goal_bias {
            problem.goal_local
        } else {
            let max_x = (grid.width as f32 - 0.5) * grid.scale_x;
            let max_y = (grid.height as f32 - 0.5) * grid.scale_y;
            WorldPoint::new(
                self.rng.gen_range(-0.5 * grid.scale_x..max_x),
                self.rng.gen_range(-0.5 * grid.scale_y..max_y),
            )
        };

        // Steer from the nearest node toward the sample.
        let nearest_idx = problem
            .index
            .nearest_one::<SquaredEuclidean>(&[sample.x, sample.y])
            .item as usize;
        let nearest_pos = problem.nodes[nearest_idx].pos;
        let dist = nearest_pos.distance(&sample);
        let new_pos = if dist <= self.config.max_step {
            sample
        } else {
            let t = self.config.max_step / dist;
            WorldPoint::new(
                nearest_pos.x + t * (sample.x - nearest_pos.x),
                nearest_pos.y + t * (sample.y - nearest_pos.y),
            )
        };

        if !grid.is_traversable(grid.cell_of(new_pos)) {
            return false;
        }

        // Choose the cheapest collision-free parent among the neighbors.
        let radius_sq = self.config.neighbor_radius * self.config.neighbor_radius;
        let near = problem
            .index
            .within_unsorted::<SquaredEuclidean>(&[new_pos.x, new_pos.y], radius_sq);

        let mut parent = None;
        let mut parent_cost = f32::INFINITY;
        for hit in &near {
            let idx = hit.item as usize;
            let candidate = problem.nodes[idx].cost + problem.nodes[idx].pos.distance(&new_pos);
            if candidate < parent_cost && grid.segment_free(problem.nodes[idx].pos, new_pos) {
                parent = Some(idx);
                parent_cost = candidate;
            }
        }
        if parent.is_none() && grid.segment_free(nearest_pos, new_pos) {
            parent = Some(nearest_idx);
            parent_cost = problem.nodes[nearest_idx].cost + dist.min(self.config.max_step);
        }
        let parent = match parent {
            Some(p) => p,
            None => return false,
        };

        let new_idx = problem.nodes.len();
        problem.nodes.push(SpatialNode {
            pos: new_pos,
            parent: Some(parent),
            cost: parent_cost,
            clearance: grid.clearance(new_pos),
        });
        problem.index.add(&[new_pos.x, new_pos.y], new_idx as u64);

        // Rewire neighbors through the new node where that is cheaper.
        for hit in &near {
            let idx = hit.item as usize;
            let through_new = parent_cost + new_pos.distance(&problem.nodes[idx].pos);
            if through_new < problem.nodes[idx].cost
                && grid.segment_free(new_pos, problem.nodes[idx].pos)
            {
                problem.nodes[idx].parent = Some(new_idx);
                problem.nodes[idx].cost = through_new;
                Self::propagate_cost(&mut problem.nodes, idx);
            }
        }

        // Try to connect the goal through the new node.
        let goal_dist = new_pos.distance(&problem.goal_local);
        if goal_dist <= self.config.goal_tolerance
            && grid.segment_free(new_pos, problem.goal_local)
        {
            let length = problem.nodes[new_idx].cost + goal_dist;
            let clearance = Self::chain_clearance(&problem.nodes, new_idx)
                .min(grid.clearance(problem.goal_local));
            let objective = blended_cost(length, clearance, self.config.clearance_weight);
            if objective < problem.best_objective {
                problem.best_parent = Some(new_idx);
                problem.best_objective = objective;
                return true;
            }
        }
        false
    }

    /// One joint-space sampling round.
    fn grow_joint(&mut self) -> bool {
        let problem = match self.problem.as_mut() {
            Some(Problem::Joint(p)) => p,
            _ => return false,
        };
        if problem.nodes.len() >= self.config.max_nodes {
            return false;
        }
        let dims = problem.start.len();

        let sample: Vec<f32> = if self.rng.gen::<f32>() < self.config.goal_bias {
            problem.goal.clone()
        } else {
            (0..dims)
                .map(|d| {
                    let (lo, hi) = problem.limits[d];
                    self.rng.gen_range(lo..=hi)
                })
                .collect()
        };

        // Nearest node by Euclidean joint distance (linear scan).
        let (nearest_idx, nearest_dist) = match problem
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i, joint_distance(&n.q, &sample)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        {
            Some(nearest) => nearest,
            None => return false,
        };

        // Steer toward the sample, clamped to the per-step limit.
        let new_q: Vec<f32> = if nearest_dist <= self.config.max_joint_step {
            sample
        } else {
            let t = self.config.max_joint_step / nearest_dist;
            problem.nodes[nearest_idx]
                .q
                .iter()
                .zip(&sample)
                .map(|(a, b)| a + t * (b - a))
                .collect()
        };

        let step = joint_distance(&problem.nodes[nearest_idx].q, &new_q);
        let cost = problem.nodes[nearest_idx].cost + step;
        problem.nodes.push(JointNode {
            q: new_q.clone(),
            parent: Some(nearest_idx),
            cost,
        });
        let new_idx = problem.nodes.len() - 1;

        // Goal reached when every joint is within tolerance.
        let reaches_goal = new_q
            .iter()
            .zip(&problem.goal)
            .all(|(a, b)| (a - b).abs() <= self.config.joint_tolerance);
        if reaches_goal {
            let total = cost + joint_distance(&new_q, &problem.goal);
            if total < problem.best_cost {
                problem.best_parent = Some(new_idx);
                problem.best_cost = total;
                return true;
            }
        }
        false
    }
}

/// Euclidean distance between two joint vectors.
fn joint_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

impl PlanningBackend for SamplingPlanner {
    fn initialize(
        &mut self,
        width: usize,
        height: usize,
        scale_x: f32,
        scale_y: f32,
        data: &[u8],
    ) -> Result<(), PlanError> {
        if width == 0 || height == 0 || scale_x <= 0.0 || scale_y <= 0.0 {
            return Err(PlanError::MapInitialization);
        }
        if data.len() != width * height {
            return Err(PlanError::MapInitialization);
        }

        self.grid = Some(SampleGrid::build(width, height, scale_x, scale_y, data));
        self.problem = None;
        self.rng = StdRng::seed_from_u64(self.config.seed);
        Ok(())
    }

    fn set_start_goal(&mut self, start: &GridState, goal: &GridState) -> Result<(), PlanError> {
        let grid = self.grid.as_ref().ok_or(PlanError::Internal)?;

        // Pose problems take precedence when both representations are set.
        if let (Some(start_pose), Some(goal_pose)) = (start.pose(), goal.pose()) {
            if !grid.is_traversable(start_pose.cell) || !grid.is_traversable(goal_pose.cell) {
                warn!(
                    "rejecting start {:?} / goal {:?}: out of bounds or blocked",
                    start_pose.cell, goal_pose.cell
                );
                return Err(PlanError::SetStates);
            }

            let start_local = Self::local_of(grid, start_pose.cell);
            let mut index: KdTree<f32, 2> = KdTree::new();
            index.add(&[start_local.x, start_local.y], 0);
            let root = SpatialNode {
                pos: start_local,
                parent: None,
                cost: 0.0,
                clearance: grid.clearance(start_local),
            };

            self.problem = Some(Problem::Spatial(SpatialProblem {
                start: *start_pose,
                goal: *goal_pose,
                goal_local: Self::local_of(grid, goal_pose.cell),
                nodes: vec![root],
                index,
                best_parent: None,
                best_objective: f32::INFINITY,
            }));
            self.rng = StdRng::seed_from_u64(self.config.seed);
            return Ok(());
        }

        if let (Some(start_q), Some(goal_q)) = (start.joints(), goal.joints()) {
            if start_q.is_empty() || start_q.len() != goal_q.len() {
                return Err(PlanError::SetStates);
            }
            let limits: Vec<(f32, f32)> = if self.config.joint_limits.is_empty() {
                vec![(-std::f32::consts::PI, std::f32::consts::PI); start_q.len()]
            } else {
                if self.config.joint_limits.len() != start_q.len() {
                    return Err(PlanError::SetStates);
                }
                self.config.joint_limits.clone()
            };
            let within = |q: &[f32]| {
                q.iter()
                    .zip(&limits)
                    .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
            };
            if !within(start_q) || !within(goal_q) {
                return Err(PlanError::SetStates);
            }

            self.problem = Some(Problem::Joint(JointProblem {
                start: start_q.to_vec(),
                goal: goal_q.to_vec(),
                limits,
                nodes: vec![JointNode {
                    q: start_q.to_vec(),
                    parent: None,
                    cost: 0.0,
                }],
                best_parent: None,
                best_cost: f32::INFINITY,
            }));
            self.rng = StdRng::seed_from_u64(self.config.seed);
            return Ok(());
        }

        Err(PlanError::SetStates)
    }

    fn solve(&mut self, budget: Duration) -> Result<(), PlanError> {
        if self.grid.is_none() || self.problem.is_none() {
            return Err(PlanError::Internal);
        }

        let deadline = Instant::now() + budget;
        let spatial = matches!(self.problem, Some(Problem::Spatial(_)));
        let mut rounds: u64 = 0;
        let mut improvements = 0;

        loop {
            if rounds & 0x3F == 0 && Instant::now() >= deadline {
                break;
            }
            rounds += 1;

            let improved = if spatial {
                self.grow_spatial()
            } else {
                self.grow_joint()
            };
            if improved {
                improvements += 1;
            }
        }
        debug!(
            "sampling round finished: {} samples, {} improvements",
            rounds, improvements
        );

        let solved = match self.problem.as_ref() {
            Some(Problem::Spatial(p)) => p.best_parent.is_some(),
            Some(Problem::Joint(p)) => p.best_parent.is_some(),
            None => false,
        };
        if solved {
            Ok(())
        } else {
            Err(PlanError::PlanningFailed)
        }
    }

    fn fill_path(&self, out: &mut Vec<GridState>) {
        out.clear();
        let grid = match self.grid.as_ref() {
            Some(grid) => grid,
            None => return,
        };

        match self.problem.as_ref() {
            Some(Problem::Spatial(problem)) => {
                let mut tail = match problem.best_parent {
                    Some(idx) => idx,
                    None => return,
                };

                // Walk the chain root-ward, then emit start → goal.
                let mut chain = vec![tail];
                while let Some(parent) = problem.nodes[tail].parent {
                    chain.push(parent);
                    tail = parent;
                }
                chain.reverse();

                let mut cells: Vec<GridCoord> = Vec::with_capacity(chain.len() + 1);
                for &idx in &chain {
                    let cell = grid.cell_of(problem.nodes[idx].pos);
                    if cells.last() != Some(&cell) {
                        cells.push(cell);
                    }
                }
                if cells.last() != Some(&problem.goal.cell) {
                    cells.push(problem.goal.cell);
                }

                for (i, &cell) in cells.iter().enumerate() {
                    let heading = if i == 0 {
                        problem.start.heading
                    } else if i == cells.len() - 1 {
                        problem.goal.heading
                    } else {
                        let next = cells[i + 1];
                        let dx = (next.x - cell.x) as f32 * grid.scale_x;
                        let dy = (next.y - cell.y) as f32 * grid.scale_y;
                        dy.atan2(dx)
                    };
                    out.push(GridState::from_pose(GridPose::new(cell, heading)));
                }
            }
            Some(Problem::Joint(problem)) => {
                let mut tail = match problem.best_parent {
                    Some(idx) => idx,
                    None => return,
                };
                let mut chain = vec![tail];
                while let Some(parent) = problem.nodes[tail].parent {
                    chain.push(parent);
                    tail = parent;
                }
                chain.reverse();

                for &idx in &chain {
                    out.push(GridState::from_joints(problem.nodes[idx].q.clone()));
                }
                out.push(GridState::from_joints(problem.goal.clone()));
            }
            None => {}
        }
    }

    fn supports(&self, kind: StateKind) -> bool {
        kind != StateKind::Empty
    }
}

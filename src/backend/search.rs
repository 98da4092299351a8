//! Anytime weighted-A* planner over the traversability grid.
//!
//! Expands cells through a configurable primitive motion set (8-connected
//! by default). The first `solve` runs with an inflated, inadmissible
//! heuristic weight for a fast first answer; every further `solve` on the
//! same problem decays the weight toward 1.0 and re-searches, keeping the
//! best solution found so far.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Deserialize;

use crate::core::{GridCoord, GridPose, GridState, StateKind};
use crate::error::PlanError;
use crate::grid::TravGrid;

use super::PlanningBackend;

/// One allowed grid move: a cell offset plus a cost multiplier.
///
/// The metric length of the move already follows from the offset and the
/// grid scales; `cost_factor` scales it on top (e.g. to penalize diagonal
/// or lateral motion for a particular platform).
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct MotionPrimitive {
    /// Cell offset along X.
    pub dx: i32,
    /// Cell offset along Y.
    pub dy: i32,
    /// Multiplier on the metric step length.
    pub cost_factor: f32,
}

impl MotionPrimitive {
    /// Create a new primitive.
    pub fn new(dx: i32, dy: i32, cost_factor: f32) -> Self {
        Self {
            dx,
            dy,
            cost_factor,
        }
    }
}

/// The 8-connected default motion set.
fn default_primitives() -> Vec<MotionPrimitive> {
    vec![
        MotionPrimitive::new(1, 0, 1.0),
        MotionPrimitive::new(-1, 0, 1.0),
        MotionPrimitive::new(0, 1, 1.0),
        MotionPrimitive::new(0, -1, 1.0),
        MotionPrimitive::new(1, 1, 1.0),
        MotionPrimitive::new(1, -1, 1.0),
        MotionPrimitive::new(-1, 1, 1.0),
        MotionPrimitive::new(-1, -1, 1.0),
    ]
}

/// Configuration for [`GridSearchPlanner`].
#[derive(Clone, Debug, Deserialize)]
pub struct GridSearchConfig {
    /// Allowed moves per expansion.
    #[serde(default = "default_primitives")]
    pub primitives: Vec<MotionPrimitive>,

    /// Heuristic weight of the first search. Values above 1.0 are
    /// inadmissible and trade optimality for speed.
    #[serde(default = "default_initial_weight")]
    pub initial_heuristic_weight: f32,

    /// Multiplicative decay applied to the weight after each successful
    /// search, clamped at 1.0 (admissible).
    #[serde(default = "default_weight_decay")]
    pub heuristic_weight_decay: f32,

    /// Expansion cap per search.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// How strongly per-cell traversal cost stretches edge lengths.
    #[serde(default = "default_cell_cost_weight")]
    pub cell_cost_weight: f32,
}

fn default_initial_weight() -> f32 {
    3.0
}

fn default_weight_decay() -> f32 {
    0.6
}

fn default_max_iterations() -> usize {
    200_000
}

fn default_cell_cost_weight() -> f32 {
    2.0
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            primitives: default_primitives(),
            initial_heuristic_weight: default_initial_weight(),
            heuristic_weight_decay: default_weight_decay(),
            max_iterations: default_max_iterations(),
            cell_cost_weight: default_cell_cost_weight(),
        }
    }
}

/// Grid snapshot the planner searches on.
struct SearchGrid {
    width: usize,
    height: usize,
    scale_x: f32,
    scale_y: f32,
    cells: Vec<u8>,
}

impl SearchGrid {
    #[inline]
    fn in_bounds(&self, c: GridCoord) -> bool {
        c.x >= 0 && c.y >= 0 && (c.x as usize) < self.width && (c.y as usize) < self.height
    }

    #[inline]
    fn cost(&self, c: GridCoord) -> u8 {
        if !self.in_bounds(c) {
            return TravGrid::MAX_COST;
        }
        self.cells[c.y as usize * self.width + c.x as usize]
    }

    #[inline]
    fn is_traversable(&self, c: GridCoord) -> bool {
        self.cost(c) < TravGrid::MAX_COST
    }
}

/// Open-list entry ordered for a min-heap on f-score.
struct SearchNode {
    coord: GridCoord,
    f_score: f32,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Anytime weighted-A* grid planner.
pub struct GridSearchPlanner {
    config: GridSearchConfig,
    grid: Option<SearchGrid>,
    start: Option<GridPose>,
    goal: Option<GridPose>,
    heuristic_weight: f32,
    best_path: Vec<GridState>,
    best_cost: f32,
}

impl GridSearchPlanner {
    /// Create a planner with the given configuration.
    pub fn new(config: GridSearchConfig) -> Self {
        let weight = config.initial_heuristic_weight;
        Self {
            config,
            grid: None,
            start: None,
            goal: None,
            heuristic_weight: weight,
            best_path: Vec::new(),
            best_cost: f32::INFINITY,
        }
    }

    /// Create a planner with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(GridSearchConfig::default())
    }

    /// Euclidean distance between cell centers in meters.
    #[inline]
    fn metric_distance(grid: &SearchGrid, a: GridCoord, b: GridCoord) -> f32 {
        let dx = (b.x - a.x) as f32 * grid.scale_x;
        let dy = (b.y - a.y) as f32 * grid.scale_y;
        (dx * dx + dy * dy).sqrt()
    }

    /// One weighted-A* search with the current heuristic weight.
    ///
    /// Returns the cell path and its metric cost, or `None` if the search
    /// is exhausted or runs out of budget.
    fn search(&self, deadline: Instant) -> Option<(Vec<GridCoord>, f32)> {
        let grid = self.grid.as_ref()?;
        let start = self.start?.cell;
        let goal = self.goal?.cell;

        let mut open = BinaryHeap::new();
        let mut g_score: HashMap<GridCoord, f32> = HashMap::new();
        let mut parent: HashMap<GridCoord, GridCoord> = HashMap::new();
        let mut closed: HashSet<GridCoord> = HashSet::new();

        g_score.insert(start, 0.0);
        open.push(SearchNode {
            coord: start,
            f_score: self.heuristic_weight * Self::metric_distance(grid, start, goal),
        });

        let mut iterations: usize = 0;

        while let Some(node) = open.pop() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                warn!("grid search exceeded {} expansions", self.config.max_iterations);
                return None;
            }
            if iterations & 0xFF == 0 && Instant::now() >= deadline {
                debug!("grid search ran out of budget after {} expansions", iterations);
                return None;
            }

            let current = node.coord;
            if current == goal {
                let cost = g_score.get(&current).copied().unwrap_or(f32::INFINITY);
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&p) = parent.get(&cursor) {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return Some((path, cost));
            }

            if !closed.insert(current) {
                continue;
            }
            let current_g = g_score.get(&current).copied().unwrap_or(f32::INFINITY);

            for prim in &self.config.primitives {
                let neighbor = GridCoord::new(current.x + prim.dx, current.y + prim.dy);
                if !grid.is_traversable(neighbor) || closed.contains(&neighbor) {
                    continue;
                }

                let step = Self::metric_distance(grid, current, neighbor) * prim.cost_factor;
                let cell_penalty = grid.cost(neighbor) as f32 / TravGrid::MAX_COST as f32;
                let tentative_g =
                    current_g + step * (1.0 + self.config.cell_cost_weight * cell_penalty);

                let known = g_score.get(&neighbor).copied().unwrap_or(f32::INFINITY);
                if tentative_g < known {
                    g_score.insert(neighbor, tentative_g);
                    parent.insert(neighbor, current);
                    let h = Self::metric_distance(grid, neighbor, goal);
                    open.push(SearchNode {
                        coord: neighbor,
                        f_score: tentative_g + self.heuristic_weight * h,
                    });
                }
            }
        }

        None
    }

    /// Convert a cell path into grid states with headings along the
    /// direction of travel; start and goal keep their bound headings.
    fn path_to_states(&self, path: &[GridCoord]) -> Vec<GridState> {
        let grid = match self.grid.as_ref() {
            Some(grid) => grid,
            None => return Vec::new(),
        };
        let (start, goal) = match (self.start, self.goal) {
            (Some(s), Some(g)) => (s, g),
            _ => return Vec::new(),
        };

        let mut states = Vec::with_capacity(path.len());
        for (i, &cell) in path.iter().enumerate() {
            let heading = if i == 0 {
                start.heading
            } else if i == path.len() - 1 {
                goal.heading
            } else {
                let next = path[i + 1];
                let dx = (next.x - cell.x) as f32 * grid.scale_x;
                let dy = (next.y - cell.y) as f32 * grid.scale_y;
                dy.atan2(dx)
            };
            states.push(GridState::from_pose(GridPose::new(cell, heading)));
        }
        states
    }
}

impl PlanningBackend for GridSearchPlanner {
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

        self.grid = Some(SearchGrid {
            width,
            height,
            scale_x,
            scale_y,
            cells: data.to_vec(),
        });
        self.start = None;
        self.goal = None;
        self.heuristic_weight = self.config.initial_heuristic_weight;
        self.best_path.clear();
        self.best_cost = f32::INFINITY;
        Ok(())
    }

    fn set_start_goal(&mut self, start: &GridState, goal: &GridState) -> Result<(), PlanError> {
        let grid = self.grid.as_ref().ok_or(PlanError::Internal)?;

        let start_pose = start.pose().ok_or(PlanError::SetStates)?;
        let goal_pose = goal.pose().ok_or(PlanError::SetStates)?;

        if !grid.is_traversable(start_pose.cell) || !grid.is_traversable(goal_pose.cell) {
            warn!(
                "rejecting start {:?} / goal {:?}: out of bounds or blocked",
                start_pose.cell, goal_pose.cell
            );
            return Err(PlanError::SetStates);
        }

        self.start = Some(*start_pose);
        self.goal = Some(*goal_pose);
        self.heuristic_weight = self.config.initial_heuristic_weight;
        self.best_path.clear();
        self.best_cost = f32::INFINITY;
        Ok(())
    }

    fn solve(&mut self, budget: Duration) -> Result<(), PlanError> {
        if self.grid.is_none() || self.start.is_none() || self.goal.is_none() {
            return Err(PlanError::Internal);
        }
        let deadline = Instant::now() + budget;

        if let Some((path, cost)) = self.search(deadline) {
            if cost < self.best_cost {
                debug!(
                    "grid search improved solution: cost {:.3} (weight {:.2})",
                    cost, self.heuristic_weight
                );
                self.best_path = self.path_to_states(&path);
                self.best_cost = cost;
            }
            // Tighten the bound for the next anytime round.
            self.heuristic_weight =
                (self.heuristic_weight * self.config.heuristic_weight_decay).max(1.0);
            return Ok(());
        }

        if self.best_path.is_empty() {
            Err(PlanError::PlanningFailed)
        } else {
            // Budget ran out mid-search; the previous solution stands.
            Ok(())
        }
    }

    fn fill_path(&self, out: &mut Vec<GridState>) {
        out.clear();
        out.extend(self.best_path.iter().cloned());
    }

    fn supports(&self, kind: StateKind) -> bool {
        kind.has_pose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(width: usize, height: usize) -> Vec<u8> {
        vec![0; width * height]
    }

    fn pose_state(x: i32, y: i32, heading: f32) -> GridState {
        GridState::from_pose(GridPose::new(GridCoord::new(x, y), heading))
    }

    fn budget() -> Duration {
        Duration::from_millis(500)
    }

    #[test]
    fn test_straight_path() {
        let mut planner = GridSearchPlanner::with_defaults();
        planner.initialize(10, 10, 1.0, 1.0, &open_grid(10, 10)).unwrap();
        planner
            .set_start_goal(&pose_state(0, 0, 0.0), &pose_state(9, 9, 0.0))
            .unwrap();
        planner.solve(budget()).unwrap();

        let mut path = Vec::new();
        planner.fill_path(&mut path);
        assert!(!path.is_empty());
        assert_eq!(path[0].pose().unwrap().cell, GridCoord::new(0, 0));
        assert_eq!(path.last().unwrap().pose().unwrap().cell, GridCoord::new(9, 9));

        // Every step stays within one cell of the previous (8-connected).
        for pair in path.windows(2) {
            let a = pair[0].pose().unwrap().cell;
            let b = pair[1].pose().unwrap().cell;
            assert!(a.chebyshev_distance(&b) <= 1);
        }
    }

    #[test]
    fn test_detour_around_wall() {
        let mut cells = open_grid(11, 11);
        // Vertical wall with a gap at the top.
        for y in 0..10 {
            cells[y * 11 + 5] = TravGrid::MAX_COST;
        }

        let mut planner = GridSearchPlanner::with_defaults();
        planner.initialize(11, 11, 1.0, 1.0, &cells).unwrap();
        planner
            .set_start_goal(&pose_state(0, 0, 0.0), &pose_state(10, 0, 0.0))
            .unwrap();
        planner.solve(budget()).unwrap();

        let mut path = Vec::new();
        planner.fill_path(&mut path);
        // Must detour through the gap at y = 10.
        assert!(path
            .iter()
            .any(|s| s.pose().unwrap().cell.y >= 9));
    }

    #[test]
    fn test_blocked_goal_rejected() {
        let mut cells = open_grid(5, 5);
        cells[4 * 5 + 4] = TravGrid::MAX_COST;

        let mut planner = GridSearchPlanner::with_defaults();
        planner.initialize(5, 5, 1.0, 1.0, &cells).unwrap();
        let err = planner
            .set_start_goal(&pose_state(0, 0, 0.0), &pose_state(4, 4, 0.0))
            .unwrap_err();
        assert_eq!(err, PlanError::SetStates);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut planner = GridSearchPlanner::with_defaults();
        planner.initialize(5, 5, 1.0, 1.0, &open_grid(5, 5)).unwrap();
        let err = planner
            .set_start_goal(&pose_state(0, 0, 0.0), &pose_state(7, 2, 0.0))
            .unwrap_err();
        assert_eq!(err, PlanError::SetStates);
    }

    #[test]
    fn test_unreachable_goal_fails() {
        let mut cells = open_grid(9, 9);
        // Fully enclosing wall around the goal.
        for x in 3..=7 {
            cells[3 * 9 + x] = TravGrid::MAX_COST;
            cells[7 * 9 + x] = TravGrid::MAX_COST;
        }
        for y in 3..=7 {
            cells[y * 9 + 3] = TravGrid::MAX_COST;
            cells[y * 9 + 7] = TravGrid::MAX_COST;
        }

        let mut planner = GridSearchPlanner::with_defaults();
        planner.initialize(9, 9, 1.0, 1.0, &cells).unwrap();
        planner
            .set_start_goal(&pose_state(0, 0, 0.0), &pose_state(5, 5, 0.0))
            .unwrap();
        assert_eq!(planner.solve(budget()).unwrap_err(), PlanError::PlanningFailed);

        let mut path = Vec::new();
        planner.fill_path(&mut path);
        assert!(path.is_empty());
    }

    #[test]
    fn test_anytime_never_worsens() {
        let mut cells = open_grid(20, 20);
        for y in 2..18 {
            cells[y * 20 + 10] = TravGrid::MAX_COST;
        }

        let mut planner = GridSearchPlanner::with_defaults();
        planner.initialize(20, 20, 0.5, 0.5, &cells).unwrap();
        planner
            .set_start_goal(&pose_state(2, 10, 0.0), &pose_state(18, 10, 0.0))
            .unwrap();

        planner.solve(budget()).unwrap();
        let first_cost = planner.best_cost;

        planner.solve(budget()).unwrap();
        assert!(planner.best_cost <= first_cost);

        planner.solve(budget()).unwrap();
        assert!(planner.best_cost <= first_cost);
    }

    #[test]
    fn test_initialize_validates_data() {
        let mut planner = GridSearchPlanner::with_defaults();
        assert_eq!(
            planner.initialize(5, 5, 1.0, 1.0, &[0; 7]).unwrap_err(),
            PlanError::MapInitialization
        );
        assert_eq!(
            planner.initialize(0, 5, 1.0, 1.0, &[]).unwrap_err(),
            PlanError::MapInitialization
        );
    }

    #[test]
    fn test_four_connected_primitives() {
        let primitives = vec![
            MotionPrimitive::new(1, 0, 1.0),
            MotionPrimitive::new(-1, 0, 1.0),
            MotionPrimitive::new(0, 1, 1.0),
            MotionPrimitive::new(0, -1, 1.0),
        ];
        let config = GridSearchConfig {
            primitives,
            ..GridSearchConfig::default()
        };

        let mut planner = GridSearchPlanner::new(config);
        planner.initialize(6, 6, 1.0, 1.0, &open_grid(6, 6)).unwrap();
        planner
            .set_start_goal(&pose_state(0, 0, 0.0), &pose_state(5, 5, 0.0))
            .unwrap();
        planner.solve(budget()).unwrap();

        let mut path = Vec::new();
        planner.fill_path(&mut path);
        // No diagonal steps without diagonal primitives.
        for pair in path.windows(2) {
            let a = pair[0].pose().unwrap().cell;
            let b = pair[1].pose().unwrap().cell;
            assert_eq!((b.x - a.x).abs() + (b.y - a.y).abs(), 1);
        }
    }

    #[test]
    fn test_joint_states_unsupported() {
        let planner = GridSearchPlanner::with_defaults();
        assert!(!planner.supports(StateKind::Joints));
        assert!(planner.supports(StateKind::Pose));
        assert!(planner.supports(StateKind::PoseAndJoints));
    }
}

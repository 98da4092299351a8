//! Map-provider container holding named traversability grids.

use std::sync::Arc;

use super::trav_grid::TravGrid;

/// A container of named [`TravGrid`]s, as supplied by a map provider.
///
/// The facade looks grids up by id; when the id is empty or unknown it
/// falls back to the first grid that was inserted.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    grids: Vec<(String, Arc<TravGrid>)>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a grid under an id, returning the shared handle.
    ///
    /// Insertion order decides the fallback grid.
    pub fn insert(&mut self, id: impl Into<String>, grid: TravGrid) -> Arc<TravGrid> {
        let handle = Arc::new(grid);
        self.grids.push((id.into(), Arc::clone(&handle)));
        handle
    }

    /// Number of grids in the container.
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// Whether the container holds no grids.
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Grid with exactly this id.
    pub fn get(&self, id: &str) -> Option<Arc<TravGrid>> {
        self.grids
            .iter()
            .find(|(grid_id, _)| grid_id == id)
            .map(|(_, grid)| Arc::clone(grid))
    }

    /// Lookup used by the facade: the grid with this id, or the first
    /// available grid if the id is empty or absent. `None` only when the
    /// container is empty.
    pub fn find(&self, id: &str) -> Option<Arc<TravGrid>> {
        if !id.is_empty() {
            if let Some(grid) = self.get(id) {
                return Some(grid);
            }
        }
        self.grids.first().map(|(_, grid)| Arc::clone(grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pose2D;

    fn grid(width: usize) -> TravGrid {
        TravGrid::new(width, 1, 1.0, 1.0, Pose2D::identity())
    }

    #[test]
    fn test_lookup_by_id() {
        let mut env = Environment::new();
        env.insert("a", grid(2));
        env.insert("b", grid(3));

        assert_eq!(env.find("b").unwrap().width(), 3);
        assert_eq!(env.find("a").unwrap().width(), 2);
    }

    #[test]
    fn test_fallback_to_first() {
        let mut env = Environment::new();
        env.insert("a", grid(2));
        env.insert("b", grid(3));

        // Unknown and empty ids fall back to the first inserted grid.
        assert_eq!(env.find("missing").unwrap().width(), 2);
        assert_eq!(env.find("").unwrap().width(), 2);
    }

    #[test]
    fn test_empty_container() {
        let env = Environment::new();
        assert!(env.find("anything").is_none());
        assert!(env.is_empty());
    }
}

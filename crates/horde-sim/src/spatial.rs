//! Neighbour lookups.
//!
//! The world builds a [`SpatialGrid`] from the start-of-tick position
//! snapshot and only reads it for the rest of the tick.

use ahash::AHashMap;
use horde_common::{AgentId, Vec2};

/// Nearby-agent query used by separation and area attacks.
///
/// Implementations return every agent whose position lies within `radius`
/// of `center` (inclusive), sorted by id so callers iterate deterministically.
pub trait SpatialQuery {
    /// Agents within `radius` of `center`.
    fn resolve_nearby(&self, center: Vec2, radius: f32) -> Vec<AgentId>;
}

/// Uniform bucket grid over agent positions.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<(AgentId, Vec2)>>,
    len: usize,
}

impl SpatialGrid {
    /// Creates an empty grid. Non-positive cell sizes fall back to 1.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            cells: AHashMap::new(),
            len: 0,
        }
    }

    /// Builds a grid from `(id, position)` pairs.
    pub fn from_positions<I>(cell_size: f32, positions: I) -> Self
    where
        I: IntoIterator<Item = (AgentId, Vec2)>,
    {
        let mut grid = Self::new(cell_size);
        for (id, position) in positions {
            grid.insert(id, position);
        }
        grid
    }

    /// Adds an agent.
    pub fn insert(&mut self, id: AgentId, position: Vec2) {
        let cell = self.cell_of(position);
        self.cells
            .entry(cell)
            .or_default()
            .push((id, position));
        self.len += 1;
    }

    /// Number of agents in the grid.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the grid is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn cell_of(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }
}

impl SpatialQuery for SpatialGrid {
    fn resolve_nearby(&self, center: Vec2, radius: f32) -> Vec<AgentId> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        let (min_x, min_y) = self.cell_of(center - Vec2::splat(radius));
        let (max_x, max_y) = self.cell_of(center + Vec2::splat(radius));
        let span = (i64::from(max_x) - i64::from(min_x) + 1)
            * (i64::from(max_y) - i64::from(min_y) + 1);

        let mut found = Vec::new();
        let mut scan = |bucket: &Vec<(AgentId, Vec2)>| {
            found.extend(
                bucket
                    .iter()
                    .filter(|(_, p)| p.distance_squared(center) <= radius_sq)
                    .map(|(id, _)| *id),
            );
        };

        // Large radii cover more cells than are occupied
        if span > self.cells.len() as i64 {
            self.cells.values().for_each(&mut scan);
        } else {
            for x in min_x..=max_x {
                for y in min_y..=max_y {
                    if let Some(bucket) = self.cells.get(&(x, y)) {
                        scan(bucket);
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }
}

/// Linear-scan query over a flat list.
#[derive(Debug, Clone, Default)]
pub struct BruteForceQuery {
    entries: Vec<(AgentId, Vec2)>,
}

impl BruteForceQuery {
    /// Creates a query over the given entries.
    #[must_use]
    pub fn new(entries: Vec<(AgentId, Vec2)>) -> Self {
        Self { entries }
    }
}

impl SpatialQuery for BruteForceQuery {
    fn resolve_nearby(&self, center: Vec2, radius: f32) -> Vec<AgentId> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        let mut found: Vec<AgentId> = self
            .entries
            .iter()
            .filter(|(_, p)| p.distance_squared(center) <= radius_sq)
            .map(|(id, _)| *id)
            .collect();
        found.sort_unstable();
        found
    }
}

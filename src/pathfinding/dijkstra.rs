use std::collections::HashSet;

use super::{best_first, unit_successors, SearchOutcome};
use crate::types::Cell;
use crate::world::GameMap;

pub fn dijkstra(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> Option<Vec<Cell>> {
    dijkstra_with_visited(map, start, goal, forbidden).path
}

/// Uniform-cost baseline: A* with a zero heuristic.
pub fn dijkstra_with_visited(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> SearchOutcome {
    best_first(map, start, goal, forbidden, |_, _| 0, unit_successors)
}

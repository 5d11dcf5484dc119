use std::collections::HashSet;

use super::{best_first, manhattan_cells, unit_successors, SearchOutcome};
use crate::types::Cell;
use crate::world::GameMap;

pub fn a_star(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> Option<Vec<Cell>> {
    a_star_with_visited(map, start, goal, forbidden).path
}

pub fn a_star_with_visited(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> SearchOutcome {
    best_first(map, start, goal, forbidden, manhattan_cells, unit_successors)
}

//! Jump-point style pruning for a 4-connected grid.
//!
//! Instead of single-cell edges, each expansion slides along a cardinal
//! direction and only lands where something interesting happens: the goal,
//! the last free cell before an obstacle, or a cell with an open side
//! passage. Any shortest path on this grid is a chain of straight runs
//! between such cells, so the result matches A* in length while expanding
//! far fewer nodes in corridors.

use std::collections::HashSet;

use super::{best_first, manhattan_cells, passable, step, SearchOutcome};
use crate::types::{Cell, Direction};
use crate::world::GameMap;

pub fn jump_search(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> Option<Vec<Cell>> {
    jump_search_with_visited(map, start, goal, forbidden).path
}

pub fn jump_search_with_visited(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> SearchOutcome {
    best_first(map, start, goal, forbidden, manhattan_cells, jump_successors)
}

fn jump_successors(
    map: &GameMap,
    forbidden: &HashSet<Cell>,
    current: Cell,
    goal: Cell,
    out: &mut Vec<(Cell, i32)>,
) {
    for dir in Direction::CARDINALS {
        if let Some((landing, distance)) = jump(map, forbidden, current, dir, goal) {
            out.push((landing, distance));
        }
    }
}

fn jump(
    map: &GameMap,
    forbidden: &HashSet<Cell>,
    from: Cell,
    dir: Direction,
    goal: Cell,
) -> Option<(Cell, i32)> {
    let mut cursor = from;
    let mut distance = 0;
    loop {
        let next = step(cursor, dir);
        if !passable(map, forbidden, next) {
            break;
        }
        cursor = next;
        distance += 1;
        if cursor == goal || has_side_opening(map, forbidden, cursor, dir) {
            break;
        }
    }
    (distance > 0).then_some((cursor, distance))
}

fn has_side_opening(map: &GameMap, forbidden: &HashSet<Cell>, cell: Cell, dir: Direction) -> bool {
    let sides = match dir {
        Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
    };
    sides
        .iter()
        .any(|&side| passable(map, forbidden, step(cell, side)))
}

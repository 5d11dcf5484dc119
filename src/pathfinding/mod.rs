//! Shortest-path search over the 4-connected walkable cells of a [`GameMap`].
//!
//! All three algorithms share one best-first core and differ only in the
//! heuristic and in how successors are generated. Paths exclude the start
//! cell and end on the goal; `Some(vec![])` means start and goal coincide,
//! `None` means the goal is unreachable.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::{AlgorithmRunView, Cell, Direction, PathComparisonView};
use crate::world::GameMap;

mod astar;
mod dijkstra;
mod jump;

pub use self::astar::{a_star, a_star_with_visited};
pub use self::dijkstra::{dijkstra, dijkstra_with_visited};
pub use self::jump::{jump_search, jump_search_with_visited};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    AStar,
    Dijkstra,
    Jump,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::AStar, Algorithm::Dijkstra, Algorithm::Jump];

    pub fn label(self) -> &'static str {
        match self {
            Algorithm::AStar => "a*",
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::Jump => "jps",
        }
    }

    pub fn search(
        self,
        map: &GameMap,
        start: Cell,
        goal: Cell,
        forbidden: &HashSet<Cell>,
    ) -> SearchOutcome {
        match self {
            Algorithm::AStar => a_star_with_visited(map, start, goal, forbidden),
            Algorithm::Dijkstra => dijkstra_with_visited(map, start, goal, forbidden),
            Algorithm::Jump => jump_search_with_visited(map, start, goal, forbidden),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SearchOutcome {
    pub path: Option<Vec<Cell>>,
    /// Every node popped from the open set and expanded.
    pub visited: HashSet<Cell>,
}

#[derive(Clone, Debug)]
pub struct AlgorithmRun {
    pub algorithm: Algorithm,
    pub path: Option<Vec<Cell>>,
    pub visited: HashSet<Cell>,
    pub nodes_explored: usize,
    pub elapsed: Duration,
}

impl AlgorithmRun {
    pub fn path_len(&self) -> Option<usize> {
        self.path.as_ref().map(Vec::len)
    }

    pub fn view(&self) -> AlgorithmRunView {
        let mut visited: Vec<Cell> = self.visited.iter().copied().collect();
        visited.sort_unstable_by_key(|&(x, y)| (y, x));
        AlgorithmRunView {
            algorithm: self.algorithm.label().to_string(),
            path: self.path.clone(),
            visited,
            nodes_explored: self.nodes_explored,
            duration_us: self.elapsed.as_micros() as u64,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PathComparison {
    pub start: Cell,
    pub goal: Cell,
    pub runs: Vec<AlgorithmRun>,
}

impl PathComparison {
    /// True when every algorithm found the same path length, or all found none.
    pub fn lengths_agree(&self) -> bool {
        let mut lengths = self.runs.iter().map(AlgorithmRun::path_len);
        match lengths.next() {
            Some(first) => lengths.all(|len| len == first),
            None => true,
        }
    }

    pub fn view(&self) -> PathComparisonView {
        PathComparisonView {
            start: self.start,
            goal: self.goal,
            runs: self.runs.iter().map(AlgorithmRun::view).collect(),
        }
    }
}

pub fn run_and_record(
    algorithm: Algorithm,
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> AlgorithmRun {
    let started = Instant::now();
    let outcome = algorithm.search(map, start, goal, forbidden);
    let elapsed = started.elapsed();
    AlgorithmRun {
        algorithm,
        nodes_explored: outcome.visited.len(),
        path: outcome.path,
        visited: outcome.visited,
        elapsed,
    }
}

pub fn compare_all(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
) -> PathComparison {
    PathComparison {
        start,
        goal,
        runs: Algorithm::ALL
            .iter()
            .map(|&algorithm| run_and_record(algorithm, map, start, goal, forbidden))
            .collect(),
    }
}

pub(crate) fn manhattan_cells(a: Cell, b: Cell) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

pub(crate) fn step(cell: Cell, dir: Direction) -> Cell {
    let (dx, dy) = dir.delta();
    (cell.0 + dx, cell.1 + dy)
}

pub(crate) fn passable(map: &GameMap, forbidden: &HashSet<Cell>, cell: Cell) -> bool {
    map.is_walkable(cell.0, cell.1) && !forbidden.contains(&cell)
}

/// Unit-cost successors: the walkable 4-neighbours of `current`.
pub(crate) fn unit_successors(
    map: &GameMap,
    forbidden: &HashSet<Cell>,
    current: Cell,
    _goal: Cell,
    out: &mut Vec<(Cell, i32)>,
) {
    for dir in Direction::CARDINALS {
        let next = step(current, dir);
        if passable(map, forbidden, next) {
            out.push((next, 1));
        }
    }
}

/// Best-first search keyed by `g + heuristic`. Ties pop in insertion order and
/// closed nodes are never reopened.
pub(crate) fn best_first<H, S>(
    map: &GameMap,
    start: Cell,
    goal: Cell,
    forbidden: &HashSet<Cell>,
    heuristic: H,
    mut successors: S,
) -> SearchOutcome
where
    H: Fn(Cell, Cell) -> i32,
    S: FnMut(&GameMap, &HashSet<Cell>, Cell, Cell, &mut Vec<(Cell, i32)>),
{
    if start == goal {
        return SearchOutcome {
            path: Some(Vec::new()),
            visited: HashSet::new(),
        };
    }

    let mut open = BinaryHeap::new();
    let mut sequence: u64 = 0;
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, i32> = HashMap::from([(start, 0)]);
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut visited: HashSet<Cell> = HashSet::new();
    let mut buffer = Vec::with_capacity(4);

    open.push(Reverse((heuristic(start, goal), sequence, start)));

    while let Some(Reverse((_, _, current))) = open.pop() {
        if closed.contains(&current) {
            continue;
        }
        visited.insert(current);
        if current == goal {
            return SearchOutcome {
                path: Some(rebuild_path(&came_from, start, goal)),
                visited,
            };
        }
        closed.insert(current);
        let g = g_score.get(&current).copied().unwrap_or(0);

        buffer.clear();
        successors(map, forbidden, current, goal, &mut buffer);
        for &(next, cost) in &buffer {
            if closed.contains(&next) {
                continue;
            }
            let tentative = g + cost;
            let improves = g_score
                .get(&next)
                .map(|&known| tentative < known)
                .unwrap_or(true);
            if !improves {
                continue;
            }
            g_score.insert(next, tentative);
            came_from.insert(next, current);
            sequence += 1;
            open.push(Reverse((tentative + heuristic(next, goal), sequence, next)));
        }
    }

    SearchOutcome {
        path: None,
        visited,
    }
}

/// Walks parent links back from the goal and expands every straight hop into
/// single-cell steps.
fn rebuild_path(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut waypoints = vec![goal];
    let mut cursor = goal;
    while cursor != start {
        let Some(&parent) = came_from.get(&cursor) else {
            break;
        };
        waypoints.push(parent);
        cursor = parent;
    }
    waypoints.reverse();

    let mut path = Vec::new();
    for pair in waypoints.windows(2) {
        let (mut x, mut y) = pair[0];
        let (tx, ty) = pair[1];
        let (dx, dy) = ((tx - x).signum(), (ty - y).signum());
        while (x, y) != (tx, ty) {
            x += dx;
            y += dy;
            path.push((x, y));
        }
    }
    path
}

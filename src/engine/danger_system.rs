use super::*;
use crate::constants::SAFE_TILE_SEARCH_CAP;
use crate::world::BlastStep;

impl GameEngine {
    /// Cells that a bomb due within `threshold_ms` would hit, using the same
    /// arm rule as detonation.
    pub fn predict_danger(&self, threshold_ms: u64) -> HashSet<Cell> {
        let now_ms = self.elapsed_ms;
        let mut danger = HashSet::new();
        for bomb in &self.bombs {
            if bomb.explode_at.saturating_sub(now_ms) > threshold_ms {
                continue;
            }
            danger.insert((bomb.x, bomb.y));
            for dir in Direction::CARDINALS {
                let (mut x, mut y) = (bomb.x, bomb.y);
                for _ in 0..bomb.power {
                    (x, y) = offset(x, y, dir);
                    match self.map.blast_step(x, y) {
                        BlastStep::Blocked => break,
                        BlastStep::Absorbed => {
                            danger.insert((x, y));
                            break;
                        }
                        BlastStep::Open => {
                            danger.insert((x, y));
                        }
                    }
                }
            }
        }
        danger
    }

    /// Breadth-first flood from the combatant's cell. Danger cells are crossed
    /// but never returned. Expansion stops after a fixed number of dequeues.
    pub fn find_safe_tiles(&self, idx: usize, danger: &HashSet<Cell>) -> Vec<Cell> {
        let Some(start) = self.cell_of(idx) else {
            return Vec::new();
        };
        let mut queue = VecDeque::from([start]);
        let mut seen = HashSet::from([start]);
        let mut safe = Vec::new();
        let mut expanded = 0;

        while expanded < SAFE_TILE_SEARCH_CAP {
            let Some(cell) = queue.pop_front() else {
                break;
            };
            expanded += 1;
            if !danger.contains(&cell) && self.map.is_walkable(cell.0, cell.1) {
                safe.push(cell);
            }
            for dir in Direction::CARDINALS {
                let next = offset(cell.0, cell.1, dir);
                if self.map.is_walkable(next.0, next.1) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        safe
    }
}

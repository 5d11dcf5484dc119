use crate::constants::SOFT_WALL_CHANCE;
use crate::rng::Rng;
use crate::types::{Cell, TileKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    /// Id of the live bomb sitting on this tile, if any.
    pub bomb: Option<u32>,
    pub in_blast: bool,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            kind: TileKind::Empty,
            bomb: None,
            in_blast: false,
        }
    }
}

/// How a blast arm treats the cell it is about to enter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlastStep {
    /// Out of bounds or a hard wall: the arm stops before this cell.
    Blocked,
    /// Empty floor: the cell is hit and the arm keeps going.
    Open,
    /// A soft wall: the cell is hit and the arm stops on it.
    Absorbed,
}

#[derive(Clone, Debug)]
pub struct GameMap {
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
}

impl GameMap {
    pub fn generate(width: i32, height: i32, seed: u32) -> Self {
        Self::generate_with_density(width, height, seed, SOFT_WALL_CHANCE)
    }

    pub fn generate_with_density(width: i32, height: i32, seed: u32, soft_chance: f64) -> Self {
        let mut rng = Rng::new(seed);
        let mut map = Self::open(width, height);

        for y in 2..height - 2 {
            for x in 2..width - 2 {
                if x % 2 == 0 && y % 2 == 0 {
                    map.set_kind(x, y, TileKind::Hard);
                }
            }
        }

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                if map.kind(x, y) != Some(TileKind::Empty) {
                    continue;
                }
                let top_left = x <= 2 && y <= 2;
                let bottom_right = x >= width - 3 && y >= height - 3;
                if top_left || bottom_right {
                    continue;
                }
                if rng.bool(soft_chance) {
                    map.set_kind(x, y, TileKind::Soft);
                }
            }
        }
        map
    }

    /// Arena with a hard border and an empty interior.
    pub fn open(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut map = Self {
            width,
            height,
            tiles: vec![Tile::default(); width as usize * height as usize],
        };
        for x in 0..width {
            map.set_kind(x, 0, TileKind::Hard);
            map.set_kind(x, height - 1, TileKind::Hard);
        }
        for y in 0..height {
            map.set_kind(0, y, TileKind::Hard);
            map.set_kind(width - 1, y, TileKind::Hard);
        }
        map
    }

    /// Parses `#` (hard), `+` (soft) and anything else as empty floor.
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let height = rows.len() as i32;
        let width = rows.first()?.chars().count() as i32;
        if width == 0 || rows.iter().any(|row| row.chars().count() as i32 != width) {
            return None;
        }
        let tiles = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|c| Tile {
                kind: match c {
                    '#' => TileKind::Hard,
                    '+' => TileKind::Soft,
                    _ => TileKind::Empty,
                },
                ..Tile::default()
            })
            .collect();
        Some(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.index(x, y).and_then(|idx| self.tiles.get(idx))
    }

    fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        self.index(x, y).and_then(|idx| self.tiles.get_mut(idx))
    }

    pub fn kind(&self, x: i32, y: i32) -> Option<TileKind> {
        self.tile(x, y).map(|tile| tile.kind)
    }

    pub fn set_kind(&mut self, x: i32, y: i32, kind: TileKind) {
        if let Some(tile) = self.tile_mut(x, y) {
            tile.kind = kind;
        }
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.tile(x, y)
            .map(|tile| tile.kind == TileKind::Empty && tile.bomb.is_none())
            .unwrap_or(false)
    }

    pub fn bomb_at(&self, x: i32, y: i32) -> Option<u32> {
        self.tile(x, y).and_then(|tile| tile.bomb)
    }

    pub fn set_bomb(&mut self, x: i32, y: i32, bomb: Option<u32>) {
        if let Some(tile) = self.tile_mut(x, y) {
            tile.bomb = bomb;
        }
    }

    /// Turns a soft wall into floor. Returns whether anything changed.
    pub fn destroy_soft(&mut self, x: i32, y: i32) -> bool {
        match self.tile_mut(x, y) {
            Some(tile) if tile.kind == TileKind::Soft => {
                tile.kind = TileKind::Empty;
                true
            }
            _ => false,
        }
    }

    /// Blast rule shared by detonation and danger prediction.
    pub fn blast_step(&self, x: i32, y: i32) -> BlastStep {
        match self.kind(x, y) {
            None | Some(TileKind::Hard) => BlastStep::Blocked,
            Some(TileKind::Soft) => BlastStep::Absorbed,
            Some(TileKind::Empty) => BlastStep::Open,
        }
    }

    pub fn soft_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                (self.kind(x, y) == Some(TileKind::Soft)).then_some((x, y))
            })
        })
    }

    pub fn clear_blast_flags(&mut self) {
        for tile in &mut self.tiles {
            tile.in_blast = false;
        }
    }

    pub fn mark_blast(&mut self, x: i32, y: i32) {
        if let Some(tile) = self.tile_mut(x, y) {
            tile.in_blast = true;
        }
    }

    pub fn blast_cells(&self) -> Vec<Cell> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.tile(x, y).map(|t| t.in_blast).unwrap_or(false))
            .collect()
    }

    pub fn rows(&self) -> Vec<String> {
        self.tiles
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|tile| tile.kind.glyph()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_generates_same_map() {
        for seed in 1..=200u32 {
            let a = GameMap::generate(31, 17, seed);
            let b = GameMap::generate(31, 17, seed);
            assert_eq!(a.rows(), b.rows());
        }
    }

    #[test]
    fn generated_border_is_hard_and_start_corners_are_clear() {
        let map = GameMap::generate(31, 17, 0xBEEF);
        for x in 0..31 {
            assert_eq!(map.kind(x, 0), Some(TileKind::Hard));
            assert_eq!(map.kind(x, 16), Some(TileKind::Hard));
        }
        for y in 0..17 {
            assert_eq!(map.kind(0, y), Some(TileKind::Hard));
            assert_eq!(map.kind(30, y), Some(TileKind::Hard));
        }
        for (x, y) in [(1, 1), (2, 1), (1, 2), (28, 15), (29, 15), (29, 14)] {
            assert_eq!(map.kind(x, y), Some(TileKind::Empty), "({x},{y})");
        }
    }

    #[test]
    fn pillars_sit_on_even_cells_inside_margin() {
        let map = GameMap::generate(31, 17, 3);
        for y in 2..15 {
            for x in 2..29 {
                if x % 2 == 0 && y % 2 == 0 {
                    assert_eq!(map.kind(x, y), Some(TileKind::Hard));
                }
            }
        }
        assert_ne!(map.kind(1, 1), Some(TileKind::Hard));
    }

    #[test]
    fn bomb_blocks_walking_on_empty_tile() {
        let mut map = GameMap::open(7, 7);
        assert!(map.is_walkable(3, 3));
        map.set_bomb(3, 3, Some(1));
        assert!(!map.is_walkable(3, 3));
        map.set_bomb(3, 3, None);
        assert!(map.is_walkable(3, 3));
        assert!(!map.is_walkable(0, 0));
        assert!(!map.is_walkable(-1, 3));
        assert!(!map.is_walkable(7, 3));
    }

    #[test]
    fn destroy_soft_only_converts_soft_walls() {
        let mut map = GameMap::open(7, 7);
        map.set_kind(2, 2, TileKind::Soft);
        assert!(map.destroy_soft(2, 2));
        assert_eq!(map.kind(2, 2), Some(TileKind::Empty));
        assert!(!map.destroy_soft(2, 2));
        assert!(!map.destroy_soft(0, 0));
        assert_eq!(map.kind(0, 0), Some(TileKind::Hard));
        assert!(!map.destroy_soft(40, 40));
    }

    #[test]
    fn from_rows_round_trips_through_rows() {
        let rows = ["#####", "#.+.#", "#####"];
        let map = GameMap::from_rows(&rows).expect("valid rows");
        assert_eq!(map.width, 5);
        assert_eq!(map.height, 3);
        assert_eq!(map.rows(), rows.iter().map(|r| r.to_string()).collect::<Vec<_>>());
        assert!(GameMap::from_rows(&["###", "##"]).is_none());
    }

    #[test]
    fn blast_step_classifies_tiles() {
        let map = GameMap::from_rows(&["#####", "#.+.#", "#####"]).expect("valid rows");
        assert_eq!(map.blast_step(0, 1), BlastStep::Blocked);
        assert_eq!(map.blast_step(1, 1), BlastStep::Open);
        assert_eq!(map.blast_step(2, 1), BlastStep::Absorbed);
        assert_eq!(map.blast_step(9, 9), BlastStep::Blocked);
    }
}

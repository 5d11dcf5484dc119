use crate::types::{Cell, Direction};

pub(super) fn manhattan(ax: i32, ay: i32, bx: i32, by: i32) -> i32 {
    (ax - bx).abs() + (ay - by).abs()
}

pub(super) fn offset(x: i32, y: i32, dir: Direction) -> Cell {
    let (dx, dy) = dir.delta();
    (x + dx, y + dy)
}

/// Index of the first minimum, so ties keep scan order.
pub(super) fn first_min_by_key<T, K, F>(items: &[T], mut key: F) -> Option<&T>
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    let mut best: Option<(&T, K)> = None;
    for item in items {
        let k = key(item);
        match &best {
            Some((_, best_key)) if *best_key <= k => {}
            _ => best = Some((item, k)),
        }
    }
    best.map(|(item, _)| item)
}

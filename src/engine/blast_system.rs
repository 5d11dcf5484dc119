use super::*;
use crate::error::PlaceBombError;
use crate::types::PowerUpKind;
use crate::world::BlastStep;

impl GameEngine {
    pub fn try_place_bomb(&mut self, idx: usize) -> Result<u32, PlaceBombError> {
        let Some(owner) = self.combatants.get(idx) else {
            return Err(PlaceBombError::UnknownOwner(idx));
        };
        if !owner.alive {
            return Err(PlaceBombError::OwnerDown);
        }
        if !owner.can_place() {
            return Err(PlaceBombError::BombLimitReached {
                max: owner.max_bombs,
            });
        }
        let (x, y, power, owner_id) = (owner.x, owner.y, owner.bomb_power, owner.id);
        if self.map.bomb_at(x, y).is_some() {
            return Err(PlaceBombError::CellOccupied((x, y)));
        }

        let id = self.make_id();
        let bomb = BombInternal {
            id,
            x,
            y,
            owner: idx,
            explode_at: self.elapsed_ms.saturating_add(self.config.bomb_fuse_ms),
            power,
        };
        self.log_bomb(&bomb, "placed");
        self.bombs.push(bomb);
        self.map.set_bomb(x, y, Some(id));
        self.combatants[idx].bombs_active += 1;
        self.push_message(format!("Bomb placed by {owner_id} at {x},{y}"));
        Ok(id)
    }

    /// Rejections are silent; see [`GameEngine::try_place_bomb`] for the reason.
    pub fn place_bomb(&mut self, idx: usize) -> bool {
        self.try_place_bomb(idx).is_ok()
    }

    /// Detonates every bomb whose fuse has run out, in placement order.
    pub(super) fn detonate_due_bombs(&mut self, now_ms: u64) {
        let due: Vec<u32> = self
            .bombs
            .iter()
            .filter(|bomb| bomb.explode_at <= now_ms)
            .map(|bomb| bomb.id)
            .collect();
        for id in due {
            self.explode_bomb(id);
        }
    }

    /// Detonates one bomb. A bomb is in the active list until its detonation
    /// starts, so a bomb reached twice by a chain is only processed once.
    pub fn explode_bomb(&mut self, bomb_id: u32) {
        let Some(pos) = self.bombs.iter().position(|bomb| bomb.id == bomb_id) else {
            return;
        };
        let bomb = self.bombs.remove(pos);
        self.log_bomb(&bomb, "detonated");
        self.map.set_bomb(bomb.x, bomb.y, None);
        if let Some(owner) = self.combatants.get_mut(bomb.owner) {
            owner.bombs_active = (owner.bombs_active - 1).max(0);
        }
        self.stats.bombs_detonated += 1;

        let mut cells = BTreeSet::from([(bomb.x, bomb.y)]);
        for dir in Direction::CARDINALS {
            let (mut x, mut y) = (bomb.x, bomb.y);
            for _ in 0..bomb.power {
                (x, y) = offset(x, y, dir);
                match self.map.blast_step(x, y) {
                    BlastStep::Blocked => break,
                    BlastStep::Absorbed => {
                        cells.insert((x, y));
                        break;
                    }
                    BlastStep::Open => {
                        cells.insert((x, y));
                        // The arm resumes against whatever the chain left behind.
                        if let Some(chained) = self.map.bomb_at(x, y) {
                            self.explode_bomb(chained);
                        }
                    }
                }
            }
        }

        self.destroy_soft_walls(&cells);
        self.apply_blast_damage(&bomb, &cells);

        for &(x, y) in &cells {
            self.map.mark_blast(x, y);
        }
        self.explosions.push(ExplosionInternal {
            cells,
            end_at: self.elapsed_ms.saturating_add(self.config.explosion_ms),
        });
    }

    fn destroy_soft_walls(&mut self, cells: &BTreeSet<Cell>) {
        let destroyed: Vec<Cell> = cells
            .iter()
            .copied()
            .filter(|&(x, y)| self.map.destroy_soft(x, y))
            .collect();
        if destroyed.is_empty() {
            return;
        }
        self.stats.soft_walls_destroyed += destroyed.len() as u32;
        self.push_message(format!("{} soft wall(s) destroyed", destroyed.len()));

        for (x, y) in destroyed {
            if !self.rng.bool(self.config.powerup_spawn_chance) {
                continue;
            }
            let Some(&kind) = self.rng.pick(&self.config.powerup_kinds) else {
                continue;
            };
            self.power_ups.push(PowerUpView { x, y, kind });
            self.raise_flash(kind);
            self.push_message(format!("Power-up '{}' spawned at {x},{y}", kind.label()));
        }
    }

    fn apply_blast_damage(&mut self, bomb: &BombInternal, cells: &BTreeSet<Cell>) {
        let hit = |c: &Combatant| c.alive && cells.contains(&(c.x, c.y));

        let players: Vec<usize> = (0..self.combatants.len())
            .filter(|&idx| self.combatants[idx].is_player() && hit(&self.combatants[idx]))
            .collect();
        for idx in players {
            let player = &mut self.combatants[idx];
            player.health -= 1;
            let health = player.health;
            let died = health <= 0;
            if died {
                player.alive = false;
            }
            self.push_message(format!("Player hit! HP {health}"));
            if died {
                self.push_message("Player died!".to_string());
            }
        }

        let agents: Vec<usize> = (0..self.combatants.len())
            .filter(|&idx| !self.combatants[idx].is_player() && hit(&self.combatants[idx]))
            .collect();
        for idx in agents {
            let agent = &mut self.combatants[idx];
            agent.health -= 1;
            if agent.health > 0 {
                continue;
            }
            agent.alive = false;
            let agent_id = agent.id;
            let bonus = self.config.agent_kill_bonus;
            if let Some(owner) = self
                .combatants
                .get_mut(bomb.owner)
                .filter(|owner| owner.is_player())
            {
                owner.score += bonus;
            }
            self.push_message(format!("Agent {agent_id} killed by bomb"));
        }
    }

    /// Drops expired explosions and rebuilds the per-tile blast flags from the rest.
    pub(super) fn prune_explosions(&mut self, now_ms: u64) {
        self.explosions.retain(|explosion| explosion.end_at > now_ms);
        self.map.clear_blast_flags();
        for explosion in &self.explosions {
            for &(x, y) in &explosion.cells {
                self.map.mark_blast(x, y);
            }
        }
    }

    pub fn apply_powerup(&mut self, idx: usize, kind: PowerUpKind) {
        let Some(combatant) = self.combatants.get_mut(idx) else {
            return;
        };
        match kind {
            PowerUpKind::ExtraBomb => combatant.max_bombs += 1,
            PowerUpKind::BombPower => combatant.bomb_power += 1,
            PowerUpKind::Health => {
                combatant.health = (combatant.health + 1).min(combatant.max_health)
            }
        }
        self.stats.power_ups_collected += 1;
        self.raise_flash(kind);
        self.push_message(format!("Picked up {}!", kind.label()));
    }

    /// Removes and returns every power-up lying on the cell.
    pub fn collect_powerups_at(&mut self, x: i32, y: i32) -> Vec<PowerUpView> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.power_ups)
            .into_iter()
            .partition(|power_up| power_up.x == x && power_up.y == y);
        self.power_ups = kept;
        taken
    }

    fn raise_flash(&mut self, kind: PowerUpKind) {
        self.power_up_flash = Some(PowerUpFlash {
            kind,
            until_ms: self.elapsed_ms.saturating_add(self.config.powerup_flash_ms),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;

    fn engine_on(rows: &[&str]) -> GameEngine {
        let config = ArenaConfig {
            agent_count: 0,
            powerup_spawn_chance: 0.0,
            ..ArenaConfig::default()
        };
        let map = GameMap::from_rows(rows).expect("valid rows");
        GameEngine::with_map(config, map).expect("valid config")
    }

    fn open_engine(width: i32, height: i32) -> GameEngine {
        let config = ArenaConfig {
            agent_count: 0,
            powerup_spawn_chance: 0.0,
            ..ArenaConfig::default()
        };
        GameEngine::with_map(config, GameMap::open(width, height)).expect("valid config")
    }

    fn bomb_at(engine: &mut GameEngine, idx: usize, x: i32, y: i32) -> u32 {
        assert!(engine.set_position(idx, x, y));
        engine.try_place_bomb(idx).expect("placement allowed")
    }

    #[test]
    fn unbounded_timers_saturate_instead_of_wrapping() {
        let mut engine = open_engine(9, 9);
        engine.config.bomb_fuse_ms = u64::MAX;
        engine.config.powerup_flash_ms = u64::MAX;
        engine.step(TICK_MS);
        bomb_at(&mut engine, 0, 2, 2);
        assert_eq!(engine.bombs[0].explode_at, u64::MAX);

        engine.step(TICK_MS);
        assert_eq!(engine.bombs.len(), 1);
        engine.apply_powerup(0, PowerUpKind::Health);
        assert_eq!(engine.power_up_flash.map(|flash| flash.until_ms), Some(u64::MAX));
    }

    #[test]
    fn bomb_limit_rejects_without_state_change() {
        let mut engine = open_engine(9, 9);
        bomb_at(&mut engine, 0, 2, 2);
        assert!(engine.set_position(0, 4, 2));
        assert_eq!(
            engine.try_place_bomb(0),
            Err(PlaceBombError::BombLimitReached { max: 1 })
        );
        assert_eq!(engine.bombs.len(), 1);
        assert_eq!(engine.combatants[0].bombs_active, 1);
    }

    #[test]
    fn occupied_cell_rejects_second_bomb() {
        let mut engine = open_engine(9, 9);
        engine.combatants[0].max_bombs = 2;
        bomb_at(&mut engine, 0, 2, 2);
        assert_eq!(
            engine.try_place_bomb(0),
            Err(PlaceBombError::CellOccupied((2, 2)))
        );
        assert!(!engine.place_bomb(0));
        assert_eq!(engine.combatants[0].bombs_active, 1);
    }

    #[test]
    fn dead_owner_cannot_place() {
        let mut engine = open_engine(9, 9);
        engine.combatants[0].alive = false;
        assert_eq!(engine.try_place_bomb(0), Err(PlaceBombError::OwnerDown));
        assert_eq!(engine.try_place_bomb(7), Err(PlaceBombError::UnknownOwner(7)));
    }

    #[test]
    fn detonation_decrements_owner_exactly_once() {
        let mut engine = open_engine(9, 9);
        let id = bomb_at(&mut engine, 0, 2, 2);
        engine.explode_bomb(id);
        assert_eq!(engine.combatants[0].bombs_active, 0);
        engine.explode_bomb(id);
        assert_eq!(engine.combatants[0].bombs_active, 0);
        assert!(engine.map.bomb_at(2, 2).is_none());
        assert_eq!(engine.stats.bombs_detonated, 1);
    }

    #[test]
    fn chain_reaction_detonates_in_same_tick() {
        let mut engine = open_engine(11, 7);
        engine.combatants[0].max_bombs = 2;
        bomb_at(&mut engine, 0, 2, 3);
        engine.bombs[0].explode_at = TICK_MS;
        bomb_at(&mut engine, 0, 4, 3);
        engine.set_position(0, 1, 5);

        engine.step(TICK_MS);
        assert!(engine.bombs.is_empty());
        assert_eq!(engine.combatants[0].bombs_active, 0);
        assert_eq!(engine.stats.bombs_detonated, 2);
        let blast = engine.map.blast_cells();
        assert!(blast.contains(&(7, 3)), "chained arm reaches power 3 from (4,3)");
        assert!(engine.combatants[0].alive);
    }

    #[test]
    fn outer_arm_passes_walls_cleared_by_its_chain() {
        // A at (1,1) power 3 reaches B at (2,1); B clears the soft wall at (3,1)
        // before A's arm resumes, so A's arm continues to (4,1).
        let mut engine = engine_on(&[
            "#######", //
            "#..+..#", //
            "#.....#", //
            "#.....#", //
            "#######",
        ]);
        engine.combatants[0].max_bombs = 2;
        let a = bomb_at(&mut engine, 0, 1, 1);
        engine.combatants[0].bomb_power = 1;
        bomb_at(&mut engine, 0, 2, 1);
        engine.set_position(0, 5, 2);

        engine.explode_bomb(a);
        assert_eq!(engine.map.kind(3, 1), Some(TileKind::Empty));
        let outer = engine.explosions.last().expect("outer explosion recorded");
        assert!(outer.cells.contains(&(4, 1)));
        assert!(!outer.cells.contains(&(5, 1)));
        assert_eq!(engine.stats.soft_walls_destroyed, 1);
    }

    #[test]
    fn blast_stops_at_hard_and_soft_walls() {
        let mut engine = engine_on(&[
            "#########", //
            "#.......#", //
            "#.#.+...#", //
            "#.......#", //
            "#########",
        ]);
        engine.combatants[0].bomb_power = 4;
        let id = bomb_at(&mut engine, 0, 3, 2);
        engine.set_position(0, 7, 1);
        engine.explode_bomb(id);

        let cells = &engine.explosions[0].cells;
        assert!(!cells.contains(&(2, 2)), "hard wall is not hit");
        assert!(!cells.contains(&(1, 2)));
        assert!(cells.contains(&(4, 2)), "soft wall is hit");
        assert!(!cells.contains(&(5, 2)), "nothing beyond the soft wall");
        assert_eq!(engine.map.kind(2, 2), Some(TileKind::Hard));
        assert_eq!(engine.map.kind(4, 2), Some(TileKind::Empty));
    }

    #[test]
    fn forced_power_up_spawns_on_destroyed_wall() {
        let mut engine = open_engine(9, 9);
        engine.config.powerup_spawn_chance = 1.0;
        engine.config.powerup_kinds = vec![PowerUpKind::ExtraBomb];
        engine.map.set_kind(4, 4, TileKind::Soft);
        let id = bomb_at(&mut engine, 0, 4, 3);
        engine.set_position(0, 1, 1);
        engine.explode_bomb(id);

        assert_eq!(
            engine.power_ups(),
            &[PowerUpView {
                x: 4,
                y: 4,
                kind: PowerUpKind::ExtraBomb
            }]
        );
        assert!(engine.power_up_flash.is_some());
    }

    #[test]
    fn health_power_up_is_capped() {
        let mut engine = open_engine(9, 9);
        engine.apply_powerup(0, PowerUpKind::Health);
        assert_eq!(engine.combatants[0].health, engine.config.player_health);
        engine.combatants[0].health = 1;
        engine.apply_powerup(0, PowerUpKind::Health);
        assert_eq!(engine.combatants[0].health, 2);
        assert_eq!(engine.messages().last(), Some("Picked up Health!"));
    }

    #[test]
    fn collect_takes_every_power_up_on_cell() {
        let mut engine = open_engine(9, 9);
        for kind in [PowerUpKind::Health, PowerUpKind::BombPower] {
            engine.power_ups.push(PowerUpView { x: 3, y: 3, kind });
        }
        engine.power_ups.push(PowerUpView {
            x: 5,
            y: 5,
            kind: PowerUpKind::Health,
        });
        assert_eq!(engine.collect_powerups_at(3, 3).len(), 2);
        assert_eq!(engine.power_ups().len(), 1);
        assert!(engine.collect_powerups_at(3, 3).is_empty());
    }

    #[test]
    fn player_kill_of_agent_scores_bonus() {
        let mut engine = open_engine(9, 9);
        let agent = engine.spawn_agent_at(4, 2);
        let id = bomb_at(&mut engine, 0, 2, 2);
        engine.set_position(0, 6, 6);
        engine.explode_bomb(id);
        assert!(!engine.combatants[agent].alive);
        assert_eq!(engine.combatants[0].score, engine.config.agent_kill_bonus);
    }

    #[test]
    fn agent_kill_of_agent_scores_nothing() {
        let mut engine = open_engine(9, 9);
        let bomber = engine.spawn_agent_at(2, 2);
        let victim = engine.spawn_agent_at(4, 2);
        let id = engine.try_place_bomb(bomber).expect("placement allowed");
        engine.set_position(bomber, 6, 6);
        engine.explode_bomb(id);
        assert!(!engine.combatants[victim].alive);
        assert_eq!(engine.combatants[bomber].score, 0);
        assert_eq!(engine.combatants[0].score, 0);
    }

    #[test]
    fn expired_explosions_clear_blast_flags() {
        let mut engine = open_engine(9, 9);
        let id = bomb_at(&mut engine, 0, 2, 2);
        engine.set_position(0, 6, 6);
        engine.explode_bomb(id);
        assert!(!engine.map.blast_cells().is_empty());
        engine.prune_explosions(engine.config.explosion_ms - 1);
        assert!(!engine.map.blast_cells().is_empty());
        engine.prune_explosions(engine.config.explosion_ms);
        assert!(engine.explosions.is_empty());
        assert!(engine.map.blast_cells().is_empty());
    }
}

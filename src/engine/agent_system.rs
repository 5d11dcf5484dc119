use super::*;
use crate::pathfinding::a_star;

impl GameEngine {
    pub(super) fn update_agents(&mut self, now_ms: u64) {
        let danger = self.predict_danger(self.config.danger_lookahead_ms);
        for idx in 0..self.combatants.len() {
            let combatant = &self.combatants[idx];
            if !combatant.alive {
                continue;
            }
            let Some(brain) = combatant.brain() else {
                continue;
            };
            let due = match brain.last_plan_at {
                None => true,
                Some(at) => now_ms.saturating_sub(at) >= brain.replan_ms,
            };
            if due {
                self.replan_agent(idx, now_ms, &danger);
            } else {
                self.follow_path_step(idx);
            }
        }
    }

    fn replan_agent(&mut self, idx: usize, now_ms: u64, danger: &HashSet<Cell>) {
        let player_cell = self
            .player_index()
            .map(|p| &self.combatants[p])
            .filter(|p| p.alive)
            .map(|p| (p.x, p.y));
        let combatant = &mut self.combatants[idx];
        let (x, y, id) = (combatant.x, combatant.y, combatant.id);
        let Some(brain) = combatant.brain_mut() else {
            return;
        };

        let in_sight = player_cell.filter(|&(px, py)| manhattan(x, y, px, py) <= brain.vision);
        let state = if danger.contains(&(x, y)) {
            AgentState::Evade
        } else if in_sight.is_some() {
            AgentState::Chase
        } else {
            AgentState::Search
        };
        brain.state = state;
        brain.target = in_sight.filter(|_| state == AgentState::Chase);
        brain.last_plan_at = Some(now_ms);
        brain.replans += 1;
        debug!(agent = id, x, y, ?state, "agent replanned");

        match (state, in_sight) {
            (AgentState::Evade, _) => self.plan_evade(idx, danger),
            (AgentState::Chase, Some(target)) => self.plan_chase(idx, target),
            _ => self.plan_search(idx),
        }
    }

    fn plan_evade(&mut self, idx: usize, danger: &HashSet<Cell>) {
        let Some((x, y)) = self.cell_of(idx) else {
            return;
        };
        let safe = self.find_safe_tiles(idx, danger);
        let path = first_min_by_key(&safe, |&(sx, sy)| manhattan(x, y, sx, sy))
            .and_then(|&dest| a_star(&self.map, (x, y), dest, &HashSet::new()))
            .filter(|path| !path.is_empty());
        match path {
            Some(path) => {
                self.set_path(idx, path);
                self.follow_path_step(idx);
            }
            None => self.random_step(idx),
        }
    }

    fn plan_chase(&mut self, idx: usize, target: Cell) {
        let Some((x, y)) = self.cell_of(idx) else {
            return;
        };
        let Some(path) =
            a_star(&self.map, (x, y), target, &HashSet::new()).filter(|path| !path.is_empty())
        else {
            self.random_step(idx);
            return;
        };
        self.set_path(idx, path);
        let close = manhattan(x, y, target.0, target.1) <= 2;
        if close
            && self.combatants[idx].can_place()
            && self.rng.bool(self.config.chase_bomb_chance)
        {
            self.place_bomb(idx);
        }
        self.follow_path_step(idx);
    }

    /// Heads for the nearest soft wall. Soft walls are never walkable, so the
    /// path ends on the wall's closest reachable neighbour.
    fn plan_search(&mut self, idx: usize) {
        let Some((x, y)) = self.cell_of(idx) else {
            return;
        };
        let Some(wall) = self.nearest_soft_wall(idx) else {
            self.random_step(idx);
            return;
        };
        if let Some(brain) = self.combatants[idx].brain_mut() {
            brain.target = Some(wall);
        }

        if manhattan(x, y, wall.0, wall.1) <= 1 {
            self.set_path(idx, Vec::new());
            if self.combatants[idx].can_place() && self.rng.bool(self.config.search_bomb_chance)
            {
                self.place_bomb(idx);
            }
            return;
        }

        let mut best: Option<Vec<Cell>> = None;
        for dir in Direction::CARDINALS {
            let (nx, ny) = offset(wall.0, wall.1, dir);
            if !self.map.is_walkable(nx, ny) {
                continue;
            }
            let Some(path) = a_star(&self.map, (x, y), (nx, ny), &HashSet::new()) else {
                continue;
            };
            if best.as_ref().map_or(true, |known| path.len() < known.len()) {
                best = Some(path);
            }
        }
        match best.filter(|path| !path.is_empty()) {
            Some(path) => {
                self.set_path(idx, path);
                self.follow_path_step(idx);
            }
            None => self.random_step(idx),
        }
    }

    /// Nearest soft wall by grid distance; ties keep scan order.
    fn nearest_soft_wall(&self, idx: usize) -> Option<Cell> {
        let (x, y) = self.cell_of(idx)?;
        let walls: Vec<Cell> = self.map.soft_cells().collect();
        first_min_by_key(&walls, |&(wx, wy)| manhattan(x, y, wx, wy)).copied()
    }

    fn set_path(&mut self, idx: usize, path: Vec<Cell>) {
        if let Some(brain) = self.combatants[idx].brain_mut() {
            brain.path = path.into();
        }
    }

    /// Takes the next planned step, or drops the plan if the step is blocked.
    pub(super) fn follow_path_step(&mut self, idx: usize) {
        let Some(brain) = self.combatants[idx].brain_mut() else {
            return;
        };
        let Some(&(nx, ny)) = brain.path.front() else {
            return;
        };
        if self.map.is_walkable(nx, ny) {
            brain.path.pop_front();
            self.enter_cell(idx, nx, ny);
        } else {
            brain.path.clear();
        }
    }

    fn random_step(&mut self, idx: usize) {
        self.set_path(idx, Vec::new());
        let Some((x, y)) = self.cell_of(idx) else {
            return;
        };
        let mut dirs = Direction::CARDINALS;
        self.rng.shuffle(&mut dirs);
        let next = dirs
            .iter()
            .map(|&dir| offset(x, y, dir))
            .find(|&(nx, ny)| self.map.is_walkable(nx, ny));
        if let Some((nx, ny)) = next {
            self.enter_cell(idx, nx, ny);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;
    use crate::types::PowerUpKind;

    fn engine_with(config: ArenaConfig, width: i32, height: i32) -> GameEngine {
        GameEngine::with_map(config, GameMap::open(width, height)).expect("valid config")
    }

    fn quiet_config() -> ArenaConfig {
        ArenaConfig {
            agent_count: 0,
            powerup_spawn_chance: 0.0,
            ..ArenaConfig::default()
        }
    }

    fn state_of(engine: &GameEngine, idx: usize) -> Option<AgentState> {
        engine.combatant(idx).and_then(|view| view.state)
    }

    #[test]
    fn replans_once_per_interval_and_follows_path_between() {
        let config = ArenaConfig {
            agent_vision: 0,
            ..quiet_config()
        };
        let mut engine = engine_with(config, 15, 9);
        engine.map.set_kind(10, 4, TileKind::Soft);
        let agent = engine.spawn_agent_at(2, 4);

        engine.step(TICK_MS);
        assert_eq!(engine.agent_replans(agent), Some(1));
        assert_eq!(engine.cell_of(agent), Some((3, 4)));
        for _ in 0..4 {
            let brain = engine.combatants[agent].brain().expect("agent brain");
            let planned = brain.path.front().copied().expect("path left to follow");
            let remaining = brain.path.len();
            engine.step(TICK_MS);
            assert_eq!(engine.cell_of(agent), Some(planned));
            let brain = engine.combatants[agent].brain().expect("agent brain");
            assert_eq!(brain.path.len(), remaining - 1);
            assert_eq!(engine.agent_replans(agent), Some(1));
        }
        engine.step(TICK_MS);
        assert_eq!(engine.agent_replans(agent), Some(2));
    }

    #[test]
    fn agent_in_blast_line_evades() {
        let mut engine = engine_with(quiet_config(), 9, 9);
        engine.set_position(0, 4, 4);
        engine.try_place_bomb(0).expect("placement allowed");
        engine.bombs[0].explode_at = 1_000;
        engine.set_position(0, 1, 1);
        let agent = engine.spawn_agent_at(4, 3);

        engine.step(TICK_MS);
        assert_eq!(state_of(&engine, agent), Some(AgentState::Evade));
        assert_eq!(engine.cell_of(agent), Some((5, 3)));
        let danger = engine.predict_danger(engine.config.danger_lookahead_ms);
        assert!(!danger.contains(&(5, 3)));
    }

    #[test]
    fn visible_player_is_chased() {
        let config = ArenaConfig {
            chase_bomb_chance: 0.0,
            ..quiet_config()
        };
        let mut engine = engine_with(config, 9, 9);
        let agent = engine.spawn_agent_at(5, 1);

        engine.step(TICK_MS);
        assert_eq!(state_of(&engine, agent), Some(AgentState::Chase));
        assert_eq!(engine.cell_of(agent), Some((4, 1)));
        let brain = engine.combatants[agent].brain().expect("agent brain");
        assert_eq!(brain.target, Some((1, 1)));
    }

    #[test]
    fn close_chase_can_drop_a_bomb() {
        let config = ArenaConfig {
            chase_bomb_chance: 1.0,
            ..quiet_config()
        };
        let mut engine = engine_with(config, 9, 9);
        let agent = engine.spawn_agent_at(3, 1);

        engine.step(TICK_MS);
        assert!(engine.map.bomb_at(3, 1).is_some());
        assert_eq!(engine.cell_of(agent), Some((2, 1)));
        assert_eq!(engine.combatants[agent].bombs_active, 1);
    }

    #[test]
    fn out_of_sight_agent_heads_for_soft_wall() {
        let config = ArenaConfig {
            agent_vision: 0,
            ..quiet_config()
        };
        let mut engine = engine_with(config, 9, 9);
        engine.map.set_kind(6, 5, TileKind::Soft);
        let agent = engine.spawn_agent_at(2, 5);

        engine.step(TICK_MS);
        assert_eq!(state_of(&engine, agent), Some(AgentState::Search));
        assert_eq!(engine.cell_of(agent), Some((3, 5)));
        let brain = engine.combatants[agent].brain().expect("agent brain");
        assert_eq!(brain.target, Some((6, 5)));
        assert_eq!(brain.path.back(), Some(&(5, 5)));
    }

    #[test]
    fn agent_next_to_soft_wall_bombs_it() {
        let config = ArenaConfig {
            agent_vision: 0,
            search_bomb_chance: 1.0,
            ..quiet_config()
        };
        let mut engine = engine_with(config, 9, 9);
        engine.map.set_kind(6, 5, TileKind::Soft);
        let agent = engine.spawn_agent_at(5, 5);

        engine.step(TICK_MS);
        assert!(engine.map.bomb_at(5, 5).is_some());
        assert_eq!(engine.cell_of(agent), Some((5, 5)));
    }

    #[test]
    fn unreachable_player_makes_chase_take_a_random_step() {
        let mut engine = engine_with(quiet_config(), 9, 9);
        engine.map.set_kind(2, 1, TileKind::Hard);
        engine.map.set_kind(1, 2, TileKind::Hard);
        let agent = engine.spawn_agent_at(4, 4);

        engine.step(TICK_MS);
        assert_eq!(state_of(&engine, agent), Some(AgentState::Chase));
        let (x, y) = engine.cell_of(agent).expect("agent exists");
        assert_eq!(manhattan(x, y, 4, 4), 1);
        let brain = engine.combatants[agent].brain().expect("agent brain");
        assert!(brain.path.is_empty());
        assert_eq!(engine.combatant(agent).and_then(|view| view.target), Some((1, 1)));
    }

    #[test]
    fn sealed_danger_pocket_makes_evade_take_a_random_step() {
        let mut engine = engine_with(quiet_config(), 9, 9);
        for cell in [(2, 4), (6, 4), (3, 3), (4, 3), (5, 3), (3, 5), (4, 5), (5, 5)] {
            engine.map.set_kind(cell.0, cell.1, TileKind::Hard);
        }
        engine.set_position(0, 3, 4);
        engine.try_place_bomb(0).expect("placement allowed");
        engine.bombs[0].explode_at = 1_000;
        engine.set_position(0, 1, 1);
        let agent = engine.spawn_agent_at(5, 4);

        engine.step(TICK_MS);
        assert_eq!(state_of(&engine, agent), Some(AgentState::Evade));
        assert_eq!(engine.cell_of(agent), Some((4, 4)));
        let brain = engine.combatants[agent].brain().expect("agent brain");
        assert!(brain.path.is_empty());
    }

    #[test]
    fn wandering_agent_collects_power_up() {
        let config = ArenaConfig {
            agent_vision: 0,
            ..quiet_config()
        };
        let mut engine = engine_with(config, 9, 9);
        for cell in [(3, 5), (5, 5), (4, 6)] {
            engine.map.set_kind(cell.0, cell.1, TileKind::Hard);
        }
        engine.power_ups.push(PowerUpView {
            x: 4,
            y: 4,
            kind: PowerUpKind::ExtraBomb,
        });
        let agent = engine.spawn_agent_at(4, 5);

        engine.step(TICK_MS);
        assert_eq!(engine.cell_of(agent), Some((4, 4)));
        assert!(engine.power_ups.is_empty());
        assert_eq!(
            engine.combatants[agent].max_bombs,
            engine.config.agent_max_bombs + 1
        );
        assert_eq!(engine.combatants[0].max_bombs, engine.config.player_max_bombs);
    }

    #[test]
    fn path_step_onto_power_up_collects_it() {
        let mut engine = engine_with(quiet_config(), 9, 9);
        engine.power_ups.push(PowerUpView {
            x: 5,
            y: 4,
            kind: PowerUpKind::BombPower,
        });
        let agent = engine.spawn_agent_at(4, 4);
        engine.set_path(agent, vec![(5, 4), (6, 4)]);

        engine.follow_path_step(agent);
        assert_eq!(engine.cell_of(agent), Some((5, 4)));
        assert!(engine.power_ups.is_empty());
        assert_eq!(engine.combatants[agent].bomb_power, engine.config.bomb_power + 1);
        assert_eq!(engine.build_summary().power_ups_collected, 1);
    }

    #[test]
    fn nearest_soft_wall_ties_keep_scan_order() {
        let mut engine = engine_with(quiet_config(), 9, 9);
        engine.map.set_kind(4, 2, TileKind::Soft);
        engine.map.set_kind(2, 4, TileKind::Soft);
        let agent = engine.spawn_agent_at(4, 4);
        assert_eq!(engine.nearest_soft_wall(agent), Some((4, 2)));
    }

    #[test]
    fn without_targets_agent_wanders_one_step() {
        let config = ArenaConfig {
            agent_vision: 0,
            ..quiet_config()
        };
        let mut engine = engine_with(config, 9, 9);
        let agent = engine.spawn_agent_at(4, 4);
        engine.step(TICK_MS);
        let (x, y) = engine.cell_of(agent).expect("agent exists");
        assert_eq!(manhattan(x, y, 4, 4), 1);
    }

    #[test]
    fn blocked_path_is_discarded() {
        let mut engine = engine_with(quiet_config(), 9, 9);
        let agent = engine.spawn_agent_at(4, 4);
        engine.set_path(agent, vec![(5, 4), (6, 4)]);
        engine.map.set_bomb(5, 4, Some(99));
        engine.follow_path_step(agent);
        assert_eq!(engine.cell_of(agent), Some((4, 4)));
        let brain = engine.combatants[agent].brain().expect("agent brain");
        assert!(brain.path.is_empty());
    }

    #[test]
    fn dead_agents_stay_put() {
        let mut engine = engine_with(quiet_config(), 9, 9);
        let agent = engine.spawn_agent_at(4, 4);
        engine.combatants[agent].alive = false;
        engine.step(TICK_MS);
        assert_eq!(engine.cell_of(agent), Some((4, 4)));
        assert_eq!(engine.agent_replans(agent), Some(0));
    }
}

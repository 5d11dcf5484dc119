use tracing::warn;

use super::*;
use crate::error::DiagnosticError;
use crate::pathfinding::{compare_all, AlgorithmRun};

impl GameEngine {
    /// Flips the comparison overlay. Failures only leave a status message.
    pub(super) fn toggle_path_comparison(&mut self) {
        if self.path_comparison.take().is_some() {
            self.push_message("Path comparison cleared".to_string());
            return;
        }
        match self.run_path_comparison() {
            Ok(comparison) => {
                for run in &comparison.runs {
                    self.push_message(format_run(run));
                }
                self.path_comparison = Some(comparison);
            }
            Err(error) => {
                warn!(%error, "path comparison failed");
                self.push_message(format!("Path comparison failed: {error}"));
            }
        }
    }

    /// Runs every algorithm from the player to the nearest living agent.
    pub fn run_path_comparison(&self) -> Result<PathComparison, DiagnosticError> {
        let player = self
            .player_index()
            .map(|idx| &self.combatants[idx])
            .ok_or(DiagnosticError::NoPlayer)?;
        let start = (player.x, player.y);
        let agents: Vec<Cell> = self
            .combatants
            .iter()
            .filter(|c| !c.is_player() && c.alive)
            .map(|c| (c.x, c.y))
            .collect();
        let goal = *first_min_by_key(&agents, |&(x, y)| manhattan(start.0, start.1, x, y))
            .ok_or(DiagnosticError::NoLivingAgent)?;

        let comparison = compare_all(&self.map, start, goal, &HashSet::new());
        if !comparison.lengths_agree() {
            let lengths: Vec<String> = comparison
                .runs
                .iter()
                .map(|run| match run.path_len() {
                    Some(len) => format!("{}={len}", run.algorithm.label()),
                    None => format!("{}=none", run.algorithm.label()),
                })
                .collect();
            return Err(DiagnosticError::Divergence(lengths.join(" ")));
        }
        Ok(comparison)
    }
}

fn format_run(run: &AlgorithmRun) -> String {
    format!(
        "{}: nodes={} time={:.2}ms",
        run.algorithm.label(),
        run.nodes_explored,
        run.elapsed.as_secs_f64() * 1_000.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;

    fn engine() -> GameEngine {
        let config = ArenaConfig {
            agent_count: 0,
            ..ArenaConfig::default()
        };
        GameEngine::with_map(config, GameMap::open(11, 7)).expect("valid config")
    }

    fn compare_intent() -> Intent {
        Intent {
            compare_paths: true,
            ..Intent::default()
        }
    }

    #[test]
    fn comparison_targets_nearest_living_agent() {
        let mut engine = engine();
        engine.spawn_agent_at(9, 5);
        engine.spawn_agent_at(4, 1);

        let comparison = engine.run_path_comparison().expect("comparison runs");
        assert_eq!(comparison.start, (1, 1));
        assert_eq!(comparison.goal, (4, 1));
        assert_eq!(comparison.runs.len(), 3);
        assert!(comparison.runs.iter().all(|run| run.path_len() == Some(3)));
    }

    #[test]
    fn toggle_shows_then_clears_overlay() {
        let mut engine = engine();
        engine.spawn_agent_at(9, 5);
        engine.queue_intent(compare_intent());
        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot();
        let overlay = snapshot.path_comparison.expect("overlay shown");
        assert_eq!(overlay.runs[0].algorithm, "a*");
        assert!(snapshot.messages.iter().any(|m| m.starts_with("jps: nodes=")));

        engine.queue_intent(compare_intent());
        engine.step(TICK_MS);
        assert!(engine.build_snapshot().path_comparison.is_none());
        assert_eq!(engine.messages().last(), Some("Path comparison cleared"));
    }

    #[test]
    fn repeated_requests_in_one_tick_show_the_overlay() {
        let mut engine = engine();
        engine.spawn_agent_at(9, 5);
        engine.queue_intent(compare_intent());
        engine.queue_intent(compare_intent());
        engine.step(TICK_MS);
        assert!(engine.build_snapshot().path_comparison.is_some());
    }

    #[test]
    fn failure_is_reported_and_the_tick_continues() {
        let mut engine = engine();
        assert_eq!(
            engine.run_path_comparison().map(|c| c.goal),
            Err(DiagnosticError::NoLivingAgent)
        );
        engine.queue_intent(compare_intent());
        engine.step(TICK_MS);
        assert_eq!(engine.tick(), 1);
        assert!(engine.build_snapshot().path_comparison.is_none());
        assert_eq!(
            engine.messages().last(),
            Some("Path comparison failed: no living agent to compare to")
        );
    }
}

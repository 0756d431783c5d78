use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use anyhow::Result;

use crate::bracket::{BracketRunner, BracketShape, BracketState, Match, Phase, is_upset};
use crate::config::AppConfig;
use crate::montecarlo::{TournamentOdds, simulate_odds, with_sim_pool};
use crate::predict::{self, HeuristicPredictor, PredictionResult};
use crate::teams::{Team, TeamRegistry};

const MAX_LOGS: usize = 200;

pub type LiveBracket<'r> = BracketRunner<HeuristicPredictor<'r, StdRng>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Overview,
    Predictor,
    Bracket,
    Simulation,
    About,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Overview,
        Screen::Predictor,
        Screen::Bracket,
        Screen::Simulation,
        Screen::About,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Screen::Overview => "Overview",
            Screen::Predictor => "Match Predictor",
            Screen::Bracket => "Bracket",
            Screen::Simulation => "Simulation",
            Screen::About => "About",
        }
    }

    /// Screen bound to a number key ('1'..='5').
    pub fn from_digit(c: char) -> Option<Screen> {
        let idx = c.to_digit(10)?.checked_sub(1)? as usize;
        Screen::ALL.get(idx).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

pub struct AppState<'r> {
    pub screen: Screen,
    pub selected: usize,
    pub help_overlay: bool,
    pub slot_a: Option<String>,
    pub slot_b: Option<String>,
    pub prediction: Option<PredictionResult>,
    pub bracket: Option<LiveBracket<'r>>,
    pub odds: Option<TournamentOdds>,
    pub logs: VecDeque<String>,
    registry: &'r TeamRegistry,
    shape: BracketShape,
    config: AppConfig,
    rng: StdRng,
}

impl<'r> AppState<'r> {
    pub fn new(registry: &'r TeamRegistry, config: AppConfig) -> Result<Self> {
        let shape = BracketShape::builtin(registry)?;
        let rng = match config.sim_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            screen: Screen::Overview,
            selected: 0,
            help_overlay: false,
            slot_a: None,
            slot_b: None,
            prediction: None,
            bracket: None,
            odds: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            registry,
            shape,
            config,
            rng,
        })
    }

    pub fn registry(&self) -> &'r TeamRegistry {
        self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn team_name(&self, id: &str) -> String {
        self.registry
            .get_team_by_id(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// All teams by title odds; the order every list screen uses.
    pub fn ranked_teams(&self) -> Vec<&'r Team> {
        self.registry.top_teams(self.registry.len())
    }

    pub fn contenders(&self) -> Vec<&'r Team> {
        self.registry.top_teams(self.config.top_contenders)
    }

    pub fn selected_team(&self) -> Option<&'r Team> {
        self.ranked_teams().get(self.selected).copied()
    }

    fn list_len(&self) -> usize {
        match self.screen {
            Screen::Simulation => self.odds.as_ref().map_or(0, |o| o.rows.len()),
            Screen::Bracket => self.bracket_state().map_or(0, |s| s.matches().count()),
            Screen::About => 0,
            Screen::Overview | Screen::Predictor => self.registry.len(),
        }
    }

    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.clamp_selection();
    }

    pub fn select_next(&mut self) {
        let len = self.list_len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1).min(len - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn clamp_selection(&mut self) {
        let len = self.list_len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Click on a team in the picker: fills A, then B, and a second click on a
    /// picked team clears its slot. Both full: nothing changes.
    pub fn toggle_team(&mut self, team_id: &str) {
        if self.slot_a.as_deref() == Some(team_id) {
            self.slot_a = None;
        } else if self.slot_b.as_deref() == Some(team_id) {
            self.slot_b = None;
        } else if self.slot_a.is_none() {
            self.slot_a = Some(team_id.to_string());
        } else if self.slot_b.is_none() {
            self.slot_b = Some(team_id.to_string());
        }
        self.prediction = None;
    }

    /// Put a team straight into one slot; it leaves the other slot if it was there.
    pub fn assign_slot(&mut self, slot: Slot, team_id: &str) {
        let (target, other) = match slot {
            Slot::A => (&mut self.slot_a, &mut self.slot_b),
            Slot::B => (&mut self.slot_b, &mut self.slot_a),
        };
        if other.as_deref() == Some(team_id) {
            *other = None;
        }
        *target = Some(team_id.to_string());
        self.prediction = None;
    }

    pub fn toggle_selected_team(&mut self) {
        if let Some(team) = self.selected_team() {
            self.toggle_team(&team.id);
        }
    }

    pub fn assign_selected(&mut self, slot: Slot) {
        if let Some(team) = self.selected_team() {
            self.assign_slot(slot, &team.id);
        }
    }

    pub fn clear_slots(&mut self) {
        self.slot_a = None;
        self.slot_b = None;
        self.prediction = None;
    }

    pub fn run_prediction(&mut self) -> Option<&PredictionResult> {
        let (Some(a), Some(b)) = (self.slot_a.clone(), self.slot_b.clone()) else {
            self.push_log("[WARN] Pick two teams before predicting");
            return None;
        };
        let result = predict::predict(self.registry, &a, &b, &mut self.rng);
        let verdict = if result.winner.is_draw() {
            "draw".to_string()
        } else {
            format!("{} win", self.team_name(result.winner.as_str()))
        };
        self.push_log(format!(
            "[INFO] {} {:.1}% / draw {:.1}% / {} {:.1}% -> {verdict}",
            self.team_name(&a),
            result.team1_win_prob,
            result.draw_prob,
            self.team_name(&b),
            result.team2_win_prob,
        ));
        self.prediction = Some(result);
        self.prediction.as_ref()
    }

    pub fn bracket_state(&self) -> Option<&BracketState> {
        self.bracket.as_ref().map(|r| r.state())
    }

    pub fn bracket_revealing(&self) -> bool {
        self.bracket
            .as_ref()
            .is_some_and(|r| r.phase() != Phase::Complete)
    }

    /// Start a fresh bracket. Any run in progress is dropped whole.
    pub fn start_bracket(&mut self) {
        let restarted = self.bracket_revealing();
        let rng = StdRng::seed_from_u64(self.rng.r#gen());
        let predictor = HeuristicPredictor::new(self.registry, rng);
        self.bracket = Some(BracketRunner::new(self.shape.clone(), predictor));
        self.push_log(if restarted {
            "[INFO] Bracket run restarted"
        } else {
            "[INFO] Bracket run started"
        });
    }

    /// Reveal one more match. Returns false once there is nothing left to reveal.
    pub fn advance_reveal(&mut self) -> bool {
        let Some(runner) = self.bracket.as_mut() else {
            return false;
        };
        let Some(resolved) = runner.step_match() else {
            return false;
        };
        let champion = runner.state().champion.clone();
        self.log_result(&resolved);
        if let Some(id) = champion {
            self.push_log(format!("[INFO] Champion: {}", self.team_name(&id)));
        }
        true
    }

    pub fn reveal_all(&mut self) {
        while self.advance_reveal() {}
    }

    pub fn clear_bracket(&mut self) {
        self.bracket = None;
        self.clamp_selection();
    }

    fn log_result(&mut self, m: &Match) {
        let Some(winner) = m.winner.as_deref() else {
            return;
        };
        let loser = m.loser().unwrap_or_default();
        let tag = if is_upset(m, self.registry) { " (upset)" } else { "" };
        self.push_log(format!(
            "[INFO] {} #{}: {} beat {}{tag}",
            m.stage.badge(),
            m.id,
            self.team_name(winner),
            self.team_name(loser),
        ));
    }

    pub fn run_simulation(&mut self) {
        let runs = self.config.sim_runs;
        let seed = self.config.sim_seed.unwrap_or_else(|| self.rng.r#gen());
        let registry = self.registry;
        let shape = &self.shape;
        match with_sim_pool(self.config.sim_threads, || {
            simulate_odds(registry, shape, runs, seed)
        }) {
            Ok(odds) => {
                let headline = odds
                    .favourite()
                    .map(|r| format!("{} {:.1}%", r.name, r.champion_pct))
                    .unwrap_or_default();
                self.push_log(format!(
                    "[INFO] Simulated {runs} tournaments (seed {seed}): {headline}"
                ));
                self.odds = Some(odds);
                self.clamp_selection();
            }
            Err(err) => self.push_log(format!("[WARN] Simulation failed: {err}")),
        }
    }

    /// `x` clears whatever the current screen owns.
    pub fn reset_screen(&mut self) {
        match self.screen {
            Screen::Predictor => {
                self.clear_slots();
                self.push_log("[INFO] Predictor cleared");
            }
            Screen::Bracket => {
                self.clear_bracket();
                self.push_log("[INFO] Bracket cleared");
            }
            Screen::Simulation => {
                self.odds = None;
                self.clamp_selection();
                self.push_log("[INFO] Simulation cleared");
            }
            Screen::Overview | Screen::About => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState<'static> {
        let cfg = AppConfig {
            sim_seed: Some(11),
            sim_runs: 50,
            ..AppConfig::default()
        };
        AppState::new(TeamRegistry::builtin().unwrap(), cfg).unwrap()
    }

    #[test]
    fn digit_keys_map_to_screens() {
        assert_eq!(Screen::from_digit('1'), Some(Screen::Overview));
        assert_eq!(Screen::from_digit('5'), Some(Screen::About));
        assert_eq!(Screen::from_digit('0'), None);
        assert_eq!(Screen::from_digit('6'), None);
    }

    #[test]
    fn log_is_bounded() {
        let mut s = state();
        for i in 0..250 {
            s.push_log(format!("[INFO] {i}"));
        }
        assert_eq!(s.logs.len(), MAX_LOGS);
        assert_eq!(s.logs.front().map(String::as_str), Some("[INFO] 50"));
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut s = state();
        s.set_screen(Screen::Predictor);
        for _ in 0..40 {
            s.select_next();
        }
        assert_eq!(s.selected, 15);
        s.set_screen(Screen::Simulation);
        assert_eq!(s.selected, 0);
    }
}

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::teams::{Team, TeamRegistry};

const BASE_STRENGTH: f64 = 0.5;
const RANK_DIVISOR: f64 = 200.0;
const PROB_DIVISOR: f64 = 100.0;
const MIN_STRENGTH: f64 = 0.2;
const MAX_STRENGTH: f64 = 0.8;
const DRAW_BASE: f64 = 15.0;
const DRAW_CLOSENESS: f64 = 15.0;

/// Wire form of a drawn result.
pub const DRAW: &str = "draw";

/// Who a single prediction picked: one of the two team ids, or a draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Winner {
    Team(String),
    Draw,
}

impl Winner {
    pub fn as_str(&self) -> &str {
        match self {
            Winner::Team(id) => id,
            Winner::Draw => DRAW,
        }
    }

    pub fn team_id(&self) -> Option<&str> {
        match self {
            Winner::Team(id) => Some(id),
            Winner::Draw => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, Winner::Draw)
    }
}

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Winner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == DRAW {
            Winner::Draw
        } else {
            Winner::Team(raw)
        })
    }
}

/// Which band of the 0..100 line a roll landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Team1,
    Draw,
    Team2,
}

/// Deterministic half of a prediction: the three-way split before any roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    /// Clamped team1 strength in [0.2, 0.8].
    pub team1_base: f64,
    pub team1_win: f64,
    /// Unrounded draw share; the roll is compared against this.
    pub draw: f64,
    pub team2_win: f64,
}

impl Distribution {
    pub fn outcome_for_roll(&self, roll: f64) -> Outcome {
        if roll < self.team1_win {
            Outcome::Team1
        } else if roll < self.team1_win + self.draw {
            Outcome::Draw
        } else {
            Outcome::Team2
        }
    }

    pub fn confidence(&self) -> f64 {
        (self.team1_win - self.team2_win).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub winner: Winner,
    pub team1_win_prob: f64,
    pub draw_prob: f64,
    pub team2_win_prob: f64,
    pub confidence: f64,
}

impl PredictionResult {
    /// Returned when either team cannot be resolved.
    pub fn neutral() -> Self {
        Self {
            winner: Winner::Draw,
            team1_win_prob: 33.0,
            draw_prob: 34.0,
            team2_win_prob: 33.0,
            confidence: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.team1_win_prob + self.draw_prob + self.team2_win_prob
    }
}

/// Seam between the bracket and whatever decides a single match.
pub trait MatchPredictor {
    fn predict(&mut self, team1_id: &str, team2_id: &str) -> PredictionResult;
}

/// The closed-form heuristic over a registry, drawing from an injected random source.
pub struct HeuristicPredictor<'a, R> {
    registry: &'a TeamRegistry,
    rng: R,
}

impl<'a, R: Rng> HeuristicPredictor<'a, R> {
    pub fn new(registry: &'a TeamRegistry, rng: R) -> Self {
        Self { registry, rng }
    }
}

impl<R: Rng> MatchPredictor for HeuristicPredictor<'_, R> {
    fn predict(&mut self, team1_id: &str, team2_id: &str) -> PredictionResult {
        predict(self.registry, team1_id, team2_id, &mut self.rng)
    }
}

pub fn outcome_distribution(team1: &Team, team2: &Team) -> Distribution {
    // Lower rank number is better, so a positive gap favours team1.
    let rank_delta = team2.fifa_rank as f64 - team1.fifa_rank as f64;
    let prob_delta = team1.champion_prob - team2.champion_prob;

    let team1_base = (BASE_STRENGTH + rank_delta / RANK_DIVISOR + prob_delta / PROB_DIVISOR)
        .clamp(MIN_STRENGTH, MAX_STRENGTH);

    let closeness = 1.0 - (team1_base - BASE_STRENGTH).abs();
    let draw = DRAW_BASE + closeness * DRAW_CLOSENESS;

    let remaining = 100.0 - draw;
    let team1_win = round1(team1_base * remaining);
    // Rounding residue lands on team2 so the three shares stay at 100.
    let team2_win = round1(remaining - team1_win);

    Distribution {
        team1_base,
        team1_win,
        draw,
        team2_win,
    }
}

pub fn predict(
    registry: &TeamRegistry,
    team1_id: &str,
    team2_id: &str,
    rng: &mut impl Rng,
) -> PredictionResult {
    let (Some(team1), Some(team2)) = (
        registry.get_team_by_id(team1_id),
        registry.get_team_by_id(team2_id),
    ) else {
        return PredictionResult::neutral();
    };

    let dist = outcome_distribution(team1, team2);
    let roll: f64 = rng.gen_range(0.0..100.0);
    let winner = match dist.outcome_for_roll(roll) {
        Outcome::Team1 => Winner::Team(team1.id.clone()),
        Outcome::Draw => Winner::Draw,
        Outcome::Team2 => Winner::Team(team2.id.clone()),
    };

    PredictionResult {
        winner,
        team1_win_prob: dist.team1_win,
        draw_prob: round1(dist.draw),
        team2_win_prob: dist.team2_win,
        confidence: dist.confidence(),
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::rngs::mock::StepRng;

    fn registry() -> &'static TeamRegistry {
        TeamRegistry::builtin().unwrap()
    }

    #[test]
    fn even_teams_get_widest_draw_band() {
        let reg = registry();
        let algeria = reg.get_team_by_id("algeria").unwrap();
        let dist = outcome_distribution(algeria, algeria);
        assert!((dist.team1_base - 0.5).abs() < 1e-12);
        assert!((dist.draw - 30.0).abs() < 1e-9);
        assert!((dist.team1_win - 35.0).abs() < 1e-9);
        assert!((dist.team2_win - 35.0).abs() < 1e-9);
        assert_eq!(dist.confidence(), 0.0);
    }

    #[test]
    fn clamp_floor_mirrors_ceiling() {
        let reg = registry();
        let sudan = reg.get_team_by_id("sudan").unwrap();
        let morocco = reg.get_team_by_id("morocco").unwrap();
        let dist = outcome_distribution(sudan, morocco);
        assert!((dist.team1_base - 0.2).abs() < 1e-12);
        assert!((dist.team1_win - 14.9).abs() < 1e-9);
        assert!((dist.team2_win - 59.6).abs() < 1e-9);
    }

    #[test]
    fn zero_roll_picks_team1_and_top_roll_picks_team2() {
        let reg = registry();
        let low = predict(reg, "senegal", "sudan", &mut StepRng::new(0, 0));
        assert_eq!(low.winner, Winner::Team("senegal".to_string()));
        let high = predict(reg, "senegal", "sudan", &mut StepRng::new(u64::MAX, 0));
        assert_eq!(high.winner, Winner::Team("sudan".to_string()));
    }

    #[test]
    fn roll_bands_follow_distribution() {
        let dist = Distribution {
            team1_base: 0.5,
            team1_win: 40.0,
            draw: 25.0,
            team2_win: 35.0,
        };
        assert_eq!(dist.outcome_for_roll(0.0), Outcome::Team1);
        assert_eq!(dist.outcome_for_roll(39.99), Outcome::Team1);
        assert_eq!(dist.outcome_for_roll(40.0), Outcome::Draw);
        assert_eq!(dist.outcome_for_roll(64.99), Outcome::Draw);
        assert_eq!(dist.outcome_for_roll(65.0), Outcome::Team2);
        assert_eq!(dist.outcome_for_roll(99.99), Outcome::Team2);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let reg = registry();
        let a = predict(reg, "egypt", "nigeria", &mut StdRng::seed_from_u64(7));
        let b = predict(reg, "egypt", "nigeria", &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn winner_serializes_as_id_or_draw() {
        let json = serde_json::to_string(&Winner::Draw).unwrap();
        assert_eq!(json, "\"draw\"");
        let back: Winner = serde_json::from_str("\"mali\"").unwrap();
        assert_eq!(back, Winner::Team("mali".to_string()));
        assert_eq!(back.team_id(), Some("mali"));
    }
}

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

const TEAMS_JSON: &str = include_str!("../data/teams.json");

/// Number of entries in every team's recent-form sequence.
pub const FORM_LEN: usize = 5;

// Serialized form of a drawn result; no team may use it as an id.
const RESERVED_DRAW_ID: &str = "draw";

static BUILTIN: OnceCell<TeamRegistry> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "L")]
    Loss,
}

impl FormResult {
    pub fn points(self) -> u32 {
        match self {
            FormResult::Win => 3,
            FormResult::Draw => 1,
            FormResult::Loss => 0,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub name_fr: String,
    pub code: String,
    pub flag_code: String,
    pub fifa_rank: u32,
    pub titles: u32,
    // Percentage points, precomputed.
    pub champion_prob: f64,
    pub finalist_prob: f64,
    pub third_place_prob: f64,
    pub recent_form: Vec<FormResult>,
    pub group: String,
    pub accent_color: String,
}

impl Team {
    /// Points over the recent-form window (W=3, D=1, L=0).
    pub fn form_points(&self) -> u32 {
        self.recent_form.iter().map(|r| r.points()).sum()
    }

    pub fn form_string(&self) -> String {
        self.recent_form.iter().map(|r| r.symbol()).collect()
    }
}

/// Immutable catalog of the competing teams, in fixture order.
#[derive(Debug, Clone)]
pub struct TeamRegistry {
    teams: Vec<Team>,
}

impl TeamRegistry {
    /// Registry backed by the fixture compiled into the binary. Parsed once per process.
    pub fn builtin() -> Result<&'static TeamRegistry> {
        BUILTIN.get_or_try_init(|| Self::from_json(TEAMS_JSON).context("builtin team fixture"))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let teams: Vec<Team> = serde_json::from_str(raw).context("invalid team json")?;
        Self::from_teams(teams)
    }

    pub fn from_teams(teams: Vec<Team>) -> Result<Self> {
        validate_teams(&teams)?;
        Ok(Self { teams })
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn get_team_by_id(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    /// Fixture index of a team; used as the tie-break for every ranking.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.teams.iter().position(|t| t.id == id)
    }

    /// The `n` teams with the highest championship odds, descending.
    /// Equal odds keep fixture order (`sort_by` is stable).
    pub fn top_teams(&self, n: usize) -> Vec<&Team> {
        let mut sorted: Vec<&Team> = self.teams.iter().collect();
        sorted.sort_by(|a, b| {
            b.champion_prob
                .partial_cmp(&a.champion_prob)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(n);
        sorted
    }
}

fn validate_teams(teams: &[Team]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(teams.len());
    for team in teams {
        if team.id.trim().is_empty() {
            bail!("team with empty id ({})", team.name);
        }
        if team.id == RESERVED_DRAW_ID {
            bail!("team id {RESERVED_DRAW_ID:?} is reserved for drawn results");
        }
        if !seen.insert(team.id.as_str()) {
            bail!("duplicate team id: {}", team.id);
        }
        if team.fifa_rank == 0 {
            bail!("team {}: rank must be >= 1", team.id);
        }
        for (label, p) in [
            ("champion", team.champion_prob),
            ("finalist", team.finalist_prob),
            ("third place", team.third_place_prob),
        ] {
            if !(0.0..=100.0).contains(&p) {
                bail!("team {}: {label} probability {p} outside [0, 100]", team.id);
            }
        }
        if team.recent_form.len() != FORM_LEN {
            bail!(
                "team {}: recent form has {} entries, expected {FORM_LEN}",
                team.id,
                team.recent_form.len()
            );
        }
    }
    Ok(())
}

/// Colour band for a percentage value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbabilityTier {
    Strong,
    Good,
    Fair,
    Low,
    Remote,
}

impl ProbabilityTier {
    pub fn of(prob: f64) -> Self {
        if prob >= 30.0 {
            ProbabilityTier::Strong
        } else if prob >= 15.0 {
            ProbabilityTier::Good
        } else if prob >= 5.0 {
            ProbabilityTier::Fair
        } else if prob >= 1.0 {
            ProbabilityTier::Low
        } else {
            ProbabilityTier::Remote
        }
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

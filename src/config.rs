use std::env;
use std::time::Duration;

const DEFAULT_SIM_RUNS: u32 = 1000;
const MAX_SIM_RUNS: u32 = 100_000;
const DEFAULT_REVEAL_TICK_MS: u64 = 350;
const MIN_REVEAL_TICK_MS: u64 = 50;
const DEFAULT_TOP_CONTENDERS: usize = 5;
const MAX_TOP_CONTENDERS: usize = 16;
const MAX_SIM_THREADS: usize = 64;

/// Runtime knobs shared by the dashboard and the headless runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub sim_runs: u32,
    pub sim_seed: Option<u64>,
    pub sim_threads: Option<usize>,
    pub reveal_tick: Duration,
    pub top_contenders: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sim_runs: DEFAULT_SIM_RUNS,
            sim_seed: None,
            sim_threads: None,
            reveal_tick: Duration::from_millis(DEFAULT_REVEAL_TICK_MS),
            top_contenders: DEFAULT_TOP_CONTENDERS,
        }
    }
}

impl AppConfig {
    /// Read from the process environment. Call after any `.env` files are loaded.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values fall back to the default rather than failing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sim_runs = lookup("SIM_RUNS")
            .and_then(|val| val.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_SIM_RUNS)
            .clamp(1, MAX_SIM_RUNS);
        let sim_seed = lookup("SIM_SEED").and_then(|val| val.trim().parse::<u64>().ok());
        let sim_threads = lookup("SIM_THREADS")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .map(|n| n.clamp(1, MAX_SIM_THREADS));
        let reveal_tick_ms = lookup("REVEAL_TICK_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REVEAL_TICK_MS)
            .max(MIN_REVEAL_TICK_MS);
        let top_contenders = lookup("TOP_CONTENDERS")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_CONTENDERS)
            .clamp(1, MAX_TOP_CONTENDERS);
        Self {
            sim_runs,
            sim_seed,
            sim_threads,
            reveal_tick: Duration::from_millis(reveal_tick_ms),
            top_contenders,
        }
    }
}

/// Pull `.env.local` then `.env` into the environment; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

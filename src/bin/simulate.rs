use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use can25_terminal::bracket::{BracketShape, BracketState, Stage, is_upset, run_bracket};
use can25_terminal::config::{AppConfig, load_dotenv};
use can25_terminal::montecarlo::{TournamentOdds, simulate_odds, with_sim_pool};
use can25_terminal::predict::HeuristicPredictor;
use can25_terminal::teams::{TeamRegistry, format_percent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Bracket,
    Odds,
}

#[derive(Serialize)]
struct BracketReport<'a> {
    generated_at: String,
    seed: u64,
    bracket: &'a BracketState,
}

#[derive(Serialize)]
struct OddsReport<'a> {
    generated_at: String,
    odds: &'a TournamentOdds,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    load_dotenv();
    let config = AppConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let mode = parse_mode(&args)?;
    let json = args.iter().any(|a| a == "--json");
    let runs = match flag_value(&args, "--runs") {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("invalid --runs value: {raw}"))?,
        None => config.sim_runs,
    };
    let seed = match flag_value(&args, "--seed") {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid --seed value: {raw}"))?,
        None => config.sim_seed.unwrap_or_else(rand::random),
    };

    let registry = TeamRegistry::builtin()?;
    let shape = BracketShape::builtin(registry)?;
    let generated_at = chrono::Local::now().to_rfc3339();

    match mode {
        Mode::Bracket => {
            let predictor = HeuristicPredictor::new(registry, StdRng::seed_from_u64(seed));
            let state = run_bracket(shape, predictor);
            if json {
                let report = BracketReport {
                    generated_at,
                    seed,
                    bracket: &state,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_bracket(registry, &state, seed);
            }
        }
        Mode::Odds => {
            let odds = with_sim_pool(config.sim_threads, || {
                simulate_odds(registry, &shape, runs, seed)
            })?;
            if json {
                let report = OddsReport {
                    generated_at,
                    odds: &odds,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_odds(&odds);
            }
        }
    }
    Ok(())
}

fn parse_mode(args: &[String]) -> Result<Mode> {
    let positional = args.iter().enumerate().find(|(idx, arg)| {
        !arg.starts_with("--")
            && !(*idx > 0 && matches!(args[idx - 1].as_str(), "--runs" | "--seed"))
    });
    match positional.map(|(_, arg)| arg.as_str()) {
        None | Some("bracket") => Ok(Mode::Bracket),
        Some("odds") => Ok(Mode::Odds),
        Some(other) => bail!("unknown command {other:?} (expected bracket or odds)"),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            return Some(raw.trim());
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.trim());
        }
    }
    None
}

fn print_bracket(registry: &TeamRegistry, state: &BracketState, seed: u64) {
    let name = |id: &str| {
        registry
            .get_team_by_id(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    println!("Bracket run (seed {seed})");
    for stage in Stage::ALL {
        println!();
        println!("{}", stage.label());
        for m in state.stage(stage) {
            let winner = m.winner.as_deref().map(name).unwrap_or_default();
            let odds = m
                .odds
                .map(|o| {
                    format!(
                        "{} / {} / {}",
                        format_percent(o.team1_win_prob),
                        format_percent(o.draw_prob),
                        format_percent(o.team2_win_prob)
                    )
                })
                .unwrap_or_default();
            let upset = if is_upset(m, registry) { "  UPSET" } else { "" };
            println!(
                "  #{:<2} {:>14} v {:<14} -> {:<14} [{odds}]{upset}",
                m.id,
                name(&m.team1),
                name(&m.team2),
                winner
            );
        }
    }
    println!();
    match state.champion.as_deref() {
        Some(id) => println!("Champion: {}", name(id)),
        None => println!("Champion: n/a"),
    }
    if let Some(id) = state.runner_up() {
        println!("Runner-up: {}", name(id));
    }
    if let Some(id) = state.third_place_winner() {
        println!("Third: {}", name(id));
    }
}

fn print_odds(odds: &TournamentOdds) {
    println!("Tournament odds: {} runs, seed {}", odds.runs, odds.seed);
    println!(
        "{:>3}  {:<16} {:>8} {:>8} {:>8} {:>8}",
        "#", "Team", "Champ", "Final", "Semi", "3rd"
    );
    for (idx, row) in odds.rows.iter().enumerate() {
        println!(
            "{:>3}  {:<16} {:>8} {:>8} {:>8} {:>8}",
            idx + 1,
            row.name,
            format_percent(row.champion_pct),
            format_percent(row.finalist_pct),
            format_percent(row.semifinal_pct),
            format_percent(row.third_place_pct)
        );
    }
}

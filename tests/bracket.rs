use rand::SeedableRng;
use rand::rngs::StdRng;

use can25_terminal::bracket::{
    BracketRunner, BracketShape, BracketState, Pairing, Phase, ROUND_OF_16_FIXTURE, Stage,
    run_bracket,
};
use can25_terminal::predict::{HeuristicPredictor, MatchPredictor, PredictionResult};
use can25_terminal::teams::TeamRegistry;

struct AlwaysDraw;

impl MatchPredictor for AlwaysDraw {
    fn predict(&mut self, _team1_id: &str, _team2_id: &str) -> PredictionResult {
        PredictionResult::neutral()
    }
}

fn shape() -> BracketShape {
    BracketShape::builtin(TeamRegistry::builtin().unwrap()).unwrap()
}

fn seeded(seed: u64) -> HeuristicPredictor<'static, StdRng> {
    HeuristicPredictor::new(TeamRegistry::builtin().unwrap(), StdRng::seed_from_u64(seed))
}

fn assert_consistent(state: &BracketState) {
    assert_eq!(state.round_of_16.len(), 8);
    assert_eq!(state.quarter_finals.len(), 4);
    assert_eq!(state.semi_finals.len(), 2);
    assert!(state.third_place.is_some());
    assert!(state.final_match.is_some());
    assert_eq!(state.matches().count(), 16);

    for m in state.matches() {
        let winner = m.winner.as_deref().expect("every match resolved");
        assert!(winner == m.team1 || winner == m.team2, "match {}", m.id);
        assert!(m.odds.is_some());
    }

    let winners = |ms: &[can25_terminal::bracket::Match]| -> Vec<String> {
        ms.iter().map(|m| m.winner.clone().unwrap()).collect()
    };
    let r16 = winners(&state.round_of_16);
    for (i, qf) in state.quarter_finals.iter().enumerate() {
        assert_eq!(qf.team1, r16[2 * i]);
        assert_eq!(qf.team2, r16[2 * i + 1]);
    }
    let qf = winners(&state.quarter_finals);
    for (i, sf) in state.semi_finals.iter().enumerate() {
        assert_eq!(sf.team1, qf[2 * i]);
        assert_eq!(sf.team2, qf[2 * i + 1]);
    }
    let sf = &state.semi_finals;
    let third = state.third_place.as_ref().unwrap();
    assert_eq!(third.team1, sf[0].loser().unwrap());
    assert_eq!(third.team2, sf[1].loser().unwrap());
    let fin = state.final_match.as_ref().unwrap();
    assert_eq!(fin.team1, sf[0].winner.clone().unwrap());
    assert_eq!(fin.team2, sf[1].winner.clone().unwrap());
    assert_eq!(state.champion, fin.winner);
}

#[test]
fn full_run_is_complete_and_consistent() {
    for seed in [1, 2, 3, 42, 2025] {
        let state = run_bracket(shape(), seeded(seed));
        assert_consistent(&state);
        assert_eq!(state.progress(), 100);
    }
}

#[test]
fn round_of_16_follows_fixture() {
    let state = run_bracket(shape(), seeded(8));
    for (m, (a, b)) in state.round_of_16.iter().zip(ROUND_OF_16_FIXTURE) {
        assert_eq!((m.team1.as_str(), m.team2.as_str()), (a, b));
    }
    let ids: Vec<u32> = state.matches().map(|m| m.id).collect();
    assert_eq!(ids, (1..=16u32).collect::<Vec<_>>());
}

#[test]
fn drawn_knockouts_send_team1_through() {
    let state = run_bracket(shape(), AlwaysDraw);
    assert_consistent(&state);
    for m in state.matches() {
        assert_eq!(m.winner.as_deref(), Some(m.team1.as_str()), "match {}", m.id);
    }
    assert_eq!(state.champion.as_deref(), Some("senegal"));
    assert_eq!(state.runner_up(), Some("egypt"));
    assert_eq!(state.third_place_winner(), Some("morocco"));
}

#[test]
fn snapshots_arrive_once_per_stage() {
    let mut runner = BracketRunner::new(shape(), seeded(4));
    let snaps: Vec<_> = runner.snapshots().collect();
    let stages: Vec<Stage> = snaps.iter().map(|s| s.completed).collect();
    assert_eq!(stages, Stage::ALL);

    assert_eq!(snaps[0].state.progress(), 20);
    assert!(snaps[0].state.round_of_16.iter().all(|m| m.is_resolved()));
    assert!(snaps[0].state.quarter_finals.iter().all(|m| !m.is_resolved()));
    assert!(snaps[2].state.third_place.is_some());
    assert!(snaps[2].state.champion.is_none());
    assert_eq!(snaps[4].state.progress(), 100);
    assert_eq!(runner.phase(), Phase::Complete);
}

#[test]
fn restart_discards_the_previous_run() {
    let mut runner = BracketRunner::new(shape(), seeded(6));
    for _ in 0..10 {
        runner.step_match();
    }
    assert_eq!(runner.phase(), Phase::Resolving(Stage::QuarterFinal));
    runner.restart();
    assert_eq!(runner.phase(), Phase::Idle);
    assert_eq!(runner.state(), &BracketState::default());
    assert_eq!(runner.state().progress(), 0);

    let state = runner.run().clone();
    assert_consistent(&state);
}

#[test]
fn snapshots_restart_a_finished_runner() {
    let mut runner = BracketRunner::new(shape(), AlwaysDraw);
    runner.run();
    assert_eq!(runner.snapshots().count(), 5);
}

#[test]
fn malformed_shape_fails_fast() {
    let reg = TeamRegistry::builtin().unwrap();
    let mut pairs: Vec<Pairing> = ROUND_OF_16_FIXTURE
        .iter()
        .map(|(a, b)| Pairing {
            team1: a.to_string(),
            team2: b.to_string(),
        })
        .collect();
    pairs.pop();
    assert!(BracketShape::new(pairs.clone(), reg).is_err());

    pairs.push(Pairing {
        team1: "ivory-coast".to_string(),
        team2: "unknown".to_string(),
    });
    let err = BracketShape::new(pairs, reg).unwrap_err();
    assert!(err.to_string().contains("unknown team"));
}

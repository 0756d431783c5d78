use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use can25_terminal::bracket::{Match, Stage, is_upset};
use can25_terminal::config::{AppConfig, load_dotenv};
use can25_terminal::predict::{PredictionResult, Winner};
use can25_terminal::state::{AppState, Screen, Slot};
use can25_terminal::teams::{ProbabilityTier, Team, TeamRegistry, format_percent};

struct App<'r> {
    state: AppState<'r>,
    should_quit: bool,
}

impl<'r> App<'r> {
    fn new(state: AppState<'r>) -> Self {
        Self {
            state,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_overlay = false;
            } else if key.code == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(c @ '1'..='5') => {
                if let Some(screen) = Screen::from_digit(c) {
                    self.state.set_screen(screen);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char(' ') if self.state.screen == Screen::Predictor => {
                self.state.toggle_selected_team()
            }
            KeyCode::Char('a') if self.state.screen == Screen::Predictor => {
                self.state.assign_selected(Slot::A)
            }
            KeyCode::Char('b') if self.state.screen == Screen::Predictor => {
                self.state.assign_selected(Slot::B)
            }
            KeyCode::Char('p') | KeyCode::Enter => {
                self.state.set_screen(Screen::Predictor);
                self.state.run_prediction();
            }
            KeyCode::Char('r') => {
                self.state.set_screen(Screen::Bracket);
                self.state.start_bracket();
            }
            KeyCode::Char('f') if self.state.screen == Screen::Bracket => {
                self.state.reveal_all()
            }
            KeyCode::Char('s') => {
                self.state.set_screen(Screen::Simulation);
                self.state.run_simulation();
            }
            KeyCode::Char('x') => self.state.reset_screen(),
            KeyCode::Char('?') => self.state.help_overlay = true,
            _ => {}
        }
    }

    fn on_tick(&mut self) {
        if self.state.bracket_revealing() {
            self.state.advance_reveal();
        }
    }
}

fn main() -> io::Result<()> {
    load_dotenv();
    let config = AppConfig::from_env();

    let registry = match TeamRegistry::builtin() {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };
    let state = match AppState::new(registry, config) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(state);
    app.state
        .push_log("[INFO] Loaded 16 teams. Press r for a bracket, s for odds, ? for help");
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = app.state.config().reveal_tick;
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match state.screen {
        Screen::Overview => render_overview(frame, chunks[1], state),
        Screen::Predictor => render_predictor(frame, chunks[1], state),
        Screen::Bracket => render_bracket(frame, chunks[1], state),
        Screen::Simulation => render_simulation(frame, chunks[1], state),
        Screen::About => render_about(frame, chunks[1], state),
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let tabs = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if *s == state.screen {
                format!("[{} {}]", i + 1, s.label())
            } else {
                format!(" {} {} ", i + 1, s.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let line1 = format!("  ___   CAN 2025 PREDICTOR | {}", state.screen.label());
    let line2 = format!(" (_o_)  {tabs}");
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Overview => "1-5 Screens | j/k/↑/↓ Move | r Bracket | s Odds | ? Help | q Quit",
        Screen::Predictor => {
            "Space Pick | a/b Slot A/B | Enter/p Predict | x Clear | j/k Move | ? Help | q Quit"
        }
        Screen::Bracket => "r Run/Restart | f Reveal all | x Clear | j/k Scroll | ? Help | q Quit",
        Screen::Simulation => "s Run simulation | x Clear | j/k Scroll | ? Help | q Quit",
        Screen::About => "1-5 Screens | ? Help | q Quit",
    }
    .to_string()
}

fn tier_color(prob: f64) -> Color {
    match ProbabilityTier::of(prob) {
        ProbabilityTier::Strong => Color::Green,
        ProbabilityTier::Good => Color::Cyan,
        ProbabilityTier::Fair => Color::Yellow,
        ProbabilityTier::Low => Color::LightRed,
        ProbabilityTier::Remote => Color::DarkGray,
    }
}

fn accent_color(team: &Team) -> Color {
    let hex = team.accent_color.trim_start_matches('#');
    let channel = |i: usize| hex.get(i..i + 2).and_then(|s| u8::from_str_radix(s, 16).ok());
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) if hex.len() == 6 => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}

fn render_overview(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(40)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(3)])
        .split(columns[0]);

    let champion = Paragraph::new(champion_lines(state))
        .block(Block::default().title("Predicted Champion").borders(Borders::ALL));
    frame.render_widget(champion, left[0]);

    let contenders = state.contenders();
    let block = Block::default()
        .title(format!("Top {} Contenders", contenders.len()))
        .borders(Borders::ALL);
    let inner = block.inner(left[1]);
    frame.render_widget(block, left[1]);
    frame.render_widget(contenders_chart(&contenders), inner);

    render_ranking_table(frame, columns[1], state);
}

fn champion_lines(state: &AppState) -> Vec<Line<'static>> {
    let Some(team) = state.contenders().first().copied() else {
        return vec![Line::from("No teams loaded")];
    };
    vec![
        Line::from(Span::styled(
            format!("{} ({})", team.name, team.code),
            Style::default()
                .fg(accent_color(team))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{} · Group {}", team.name_fr, team.group)),
        Line::from(""),
        Line::from(vec![
            Span::raw("Title odds  "),
            Span::styled(
                format_percent(team.champion_prob),
                Style::default().fg(tier_color(team.champion_prob)),
            ),
        ]),
        Line::from(format!("FIFA rank   {}", team.fifa_rank)),
        Line::from(format!("Titles      {}", team.titles)),
        Line::from(format!(
            "Form        {} ({} pts)",
            team.form_string(),
            team.form_points()
        )),
    ]
}

fn contenders_chart(teams: &[&Team]) -> BarChart<'static> {
    let bars: Vec<Bar<'static>> = teams
        .iter()
        .map(|t| {
            Bar::default()
                .label(Line::from(t.code.clone()))
                .value((t.champion_prob * 10.0).round() as u64)
                .text_value(format_percent(t.champion_prob))
                .style(Style::default().fg(accent_color(t)))
        })
        .collect();
    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
}

fn ranking_columns() -> [Constraint; 7] {
    [
        Constraint::Length(4),
        Constraint::Min(16),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(7),
    ]
}

fn render_ranking_table(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Title Odds").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);
    let widths = ranking_columns();
    let header_style = Style::default().add_modifier(Modifier::BOLD);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(sections[0]);
    for (i, title) in ["#", "Team", "FIFA", "Champ", "Final", "3rd", "Form"]
        .iter()
        .enumerate()
    {
        render_cell_text(frame, cols[i], title, header_style);
    }

    let teams = state.ranked_teams();
    let list_area = sections[1];
    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, teams.len(), visible);
    for (row, idx) in (start..end).enumerate() {
        let team = teams[idx];
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + row as u16,
            width: list_area.width,
            height: 1,
        };
        let selected = idx == state.selected;
        let row_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if selected {
            frame.render_widget(Block::default().style(row_style), row_area);
        }
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);
        render_cell_text(frame, cols[0], &format!("{}", idx + 1), row_style);
        render_cell_text(frame, cols[1], &team.name, row_style.fg(accent_color(team)));
        render_cell_text(frame, cols[2], &team.fifa_rank.to_string(), row_style);
        render_cell_text(
            frame,
            cols[3],
            &format_percent(team.champion_prob),
            row_style.fg(tier_color(team.champion_prob)),
        );
        render_cell_text(frame, cols[4], &format_percent(team.finalist_prob), row_style);
        render_cell_text(frame, cols[5], &format_percent(team.third_place_prob), row_style);
        render_cell_text(frame, cols[6], &team.form_string(), row_style);
    }
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, area);
}

fn render_predictor(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(40)])
        .split(area);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Min(4),
        ])
        .split(columns[1]);

    let picker = Paragraph::new(picker_text(state, columns[0].height.saturating_sub(2)))
        .block(Block::default().title("Teams").borders(Borders::ALL));
    frame.render_widget(picker, columns[0]);

    let slots = Paragraph::new(slots_text(state))
        .block(Block::default().title("Matchup").borders(Borders::ALL));
    frame.render_widget(slots, right[0]);

    let block = Block::default().title("Win / Draw / Win").borders(Borders::ALL);
    let inner = block.inner(right[1]);
    frame.render_widget(block, right[1]);
    if let Some(prediction) = &state.prediction {
        frame.render_widget(prediction_chart(prediction), inner);
    }

    let verdict = Paragraph::new(prediction_text(state))
        .block(Block::default().title("Prediction").borders(Borders::ALL));
    frame.render_widget(verdict, right[2]);
}

fn picker_text(state: &AppState, height: u16) -> String {
    let teams = state.ranked_teams();
    let (start, end) = visible_range(state.selected, teams.len(), height as usize);
    teams[start..end]
        .iter()
        .enumerate()
        .map(|(offset, team)| {
            let idx = start + offset;
            let cursor = if idx == state.selected { ">" } else { " " };
            let slot = if state.slot_a.as_deref() == Some(team.id.as_str()) {
                "[A]"
            } else if state.slot_b.as_deref() == Some(team.id.as_str()) {
                "[B]"
            } else {
                "   "
            };
            format!("{cursor}{slot} {:<16} #{}", team.name, team.fifa_rank)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn slots_text(state: &AppState) -> String {
    let describe = |slot: &Option<String>| match slot
        .as_deref()
        .and_then(|id| state.registry().get_team_by_id(id))
    {
        Some(t) => format!(
            "{} (#{}, form {} = {} pts)",
            t.name,
            t.fifa_rank,
            t.form_string(),
            t.form_points()
        ),
        None => "(empty)".to_string(),
    };
    format!(
        "A: {}\n        vs\nB: {}",
        describe(&state.slot_a),
        describe(&state.slot_b)
    )
}

fn prediction_chart(p: &PredictionResult) -> BarChart<'static> {
    let bar = |label: &str, value: f64, color: Color| {
        Bar::default()
            .label(Line::from(label.to_string()))
            .value(value.round() as u64)
            .text_value(format_percent(value))
            .style(Style::default().fg(color))
    };
    let bars = [
        bar("A", p.team1_win_prob, Color::Green),
        bar("D", p.draw_prob, Color::Yellow),
        bar("B", p.team2_win_prob, Color::Red),
    ];
    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn prediction_text(state: &AppState) -> String {
    let Some(p) = &state.prediction else {
        return "Pick two teams, then press Enter".to_string();
    };
    let verdict = match &p.winner {
        Winner::Team(id) => format!("{} to win", state.team_name(id)),
        Winner::Draw => "Draw".to_string(),
    };
    format!(
        "{verdict}\nConfidence: {:.1}\nA {} | Draw {} | B {}",
        p.confidence,
        format_percent(p.team1_win_prob),
        format_percent(p.draw_prob),
        format_percent(p.team2_win_prob),
    )
}

fn render_bracket(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let Some(bracket) = state.bracket_state() else {
        let empty = Paragraph::new("No bracket yet. Press r to play one out.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Bracket").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let progress = bracket.progress();
    let status = match bracket.champion.as_deref() {
        Some(id) => format!("Champion: {}", state.team_name(id)),
        None => format!("Revealing... {}/16 matches", bracket.resolved_count()),
    };
    let filled = (progress as usize) / 5;
    let gauge = format!(
        "[{}{}] {progress:>3}%  {status}",
        "#".repeat(filled),
        ".".repeat(20 - filled)
    );
    frame.render_widget(
        Paragraph::new(gauge).block(Block::default().title("Progress").borders(Borders::ALL)),
        rows[0],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
        ])
        .split(rows[1]);
    let panels = [
        (Stage::RoundOf16.label(), vec![Stage::RoundOf16]),
        (Stage::QuarterFinal.label(), vec![Stage::QuarterFinal]),
        (Stage::SemiFinal.label(), vec![Stage::SemiFinal]),
        ("Finals", vec![Stage::ThirdPlace, Stage::Final]),
    ];
    // Selection walks matches in play order; find which one is highlighted.
    let selected_id = bracket.matches().nth(state.selected).map(|m| m.id);
    for ((title, stages), column) in panels.iter().zip(columns.iter()) {
        let lines: Vec<Line> = stages
            .iter()
            .flat_map(|stage| {
                let header = (*stage == Stage::ThirdPlace || *stage == Stage::Final)
                    .then(|| Line::from(Span::styled(
                        stage.label(),
                        Style::default().add_modifier(Modifier::UNDERLINED),
                    )));
                header
                    .into_iter()
                    .chain(bracket.stage(*stage).iter().map(|m| {
                        match_line(state, m, selected_id == Some(m.id))
                    }))
                    .collect::<Vec<_>>()
            })
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().title(*title).borders(Borders::ALL)),
            *column,
        );
    }
}

fn match_line(
    state: &AppState,
    m: &Match,
    selected: bool,
) -> Line<'static> {
    let code = |id: &str| {
        state
            .registry()
            .get_team_by_id(id)
            .map(|t| t.code.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let side = |id: &str| {
        let style = match m.winner.as_deref() {
            Some(w) if w == id => Style::default().add_modifier(Modifier::BOLD).fg(Color::Green),
            Some(_) => Style::default().fg(Color::DarkGray),
            None => Style::default(),
        };
        Span::styled(code(id), style)
    };
    let base = if selected {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::raw(format!("#{:<2} ", m.id)),
        side(&m.team1),
        Span::raw(" v "),
        side(&m.team2),
    ];
    if let Some(odds) = m.odds {
        spans.push(Span::styled(
            format!(" {:.0}/{:.0}", odds.team1_win_prob, odds.team2_win_prob),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if is_upset(m, state.registry()) {
        spans.push(Span::styled(" !", Style::default().fg(Color::Magenta)));
    }
    Line::from(spans).style(base)
}

fn odds_columns() -> [Constraint; 6] {
    [
        Constraint::Length(4),
        Constraint::Min(16),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(9),
    ]
}

fn render_simulation(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(odds) = &state.odds else {
        let msg = format!(
            "No simulation yet. Press s to play {} tournaments.",
            state.config().sim_runs
        );
        let empty = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Simulation").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let block = Block::default()
        .title(format!("{} runs · seed {}", odds.runs, odds.seed))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);
    let widths = odds_columns();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(sections[0]);
    let header_style = Style::default().add_modifier(Modifier::BOLD);
    for (i, title) in ["#", "Team", "Champ", "Final", "Semi", "3rd"].iter().enumerate() {
        render_cell_text(frame, cols[i], title, header_style);
    }

    let list_area = sections[1];
    let (start, end) = visible_range(state.selected, odds.rows.len(), list_area.height as usize);
    for (row, idx) in (start..end).enumerate() {
        let r = &odds.rows[idx];
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + row as u16,
            width: list_area.width,
            height: 1,
        };
        let row_style = if idx == state.selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);
        render_cell_text(frame, cols[0], &format!("{}", idx + 1), row_style);
        render_cell_text(frame, cols[1], &r.name, row_style);
        render_cell_text(
            frame,
            cols[2],
            &format_percent(r.champion_pct),
            row_style.fg(tier_color(r.champion_pct)),
        );
        render_cell_text(frame, cols[3], &format_percent(r.finalist_pct), row_style);
        render_cell_text(frame, cols[4], &format_percent(r.semifinal_pct), row_style);
        render_cell_text(frame, cols[5], &format_percent(r.third_place_pct), row_style);
    }
}

fn render_about(frame: &mut Frame, area: Rect, state: &AppState) {
    let cfg = state.config();
    let text = [
        "Match model".to_string(),
        "  strength = 0.5 + (rank2 - rank1)/200 + (title1 - title2)/100, clamped to [0.2, 0.8]"
            .to_string(),
        "  draw     = 15 + 15 * (1 - |strength - 0.5|)".to_string(),
        "  team1    = strength * (100 - draw), team2 takes the rest".to_string(),
        "  winner   = one uniform roll in [0, 100) against those bands".to_string(),
        String::new(),
        "Knockout rules".to_string(),
        "  a drawn tie sends the first-listed team through".to_string(),
        "  upset: team2 wins holding under half of team1's title odds".to_string(),
        String::new(),
        "Settings".to_string(),
        format!(
            "  SIM_RUNS={}  SIM_SEED={}",
            cfg.sim_runs,
            cfg.sim_seed
                .map_or_else(|| "random".to_string(), |s| s.to_string())
        ),
        format!(
            "  REVEAL_TICK_MS={}  TOP_CONTENDERS={}",
            cfg.reveal_tick.as_millis(),
            cfg.top_contenders
        ),
    ]
    .join("\n");
    let about = Paragraph::new(text).block(Block::default().title("About").borders(Borders::ALL));
    frame.render_widget(about, area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No activity yet".to_string();
    }
    let skip = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "CAN 2025 Predictor - Help",
        "",
        "Global:",
        "  1-5          Overview / Predictor / Bracket / Simulation / About",
        "  j/k or ↑/↓   Move/scroll",
        "  Enter / p    Predict the picked matchup",
        "  r            Run or restart the bracket",
        "  s            Run the Monte Carlo odds",
        "  x            Clear the current screen",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Predictor:",
        "  Space        Pick / unpick highlighted team",
        "  a / b        Put highlighted team in slot A / B",
        "",
        "Bracket:",
        "  f            Reveal remaining matches",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

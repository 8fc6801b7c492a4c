use anyhow::{Context, Result};
use clap::Parser;
use late_dash_core::{
    ActorKind, CellKind, Direction as Heading, Position,
    config::EngineConfig,
    hazard::HazardMode,
    level::LevelData,
    search::SearchOutcome,
    session::{LossReason, Session, SessionStatus, StepOutcome},
};
use log::{error, info};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    collections::HashSet,
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Built-in level to start on, numbered from 1
    #[arg(short, long, default_value_t = 1)]
    level: usize,

    /// Level file (TOML) to play instead of a built-in level
    #[arg(long, value_name = "LEVEL_FILE")]
    level_file: Option<PathBuf>,

    /// Engine configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Log output goes here so it does not tear the alternate screen
    #[arg(long, value_name = "LOG_FILE", default_value = "late_dash.log")]
    log_file: PathBuf,
}

struct App {
    /// The level being played.
    session: Session,
    /// Kept to build sessions for later levels.
    config: EngineConfig,
    /// Built-in level number, `None` for a level loaded from a file.
    level_number: Option<usize>,
    /// Last thing worth telling the player.
    message: String,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(level: LevelData, config: EngineConfig, level_number: Option<usize>) -> Result<Self> {
        let session = Session::new(level, config.clone()).context("Failed to start level")?;
        Ok(App {
            session,
            config,
            level_number,
            message: String::from("Space plans a route, 'a' follows it."),
            should_quit: false,
        })
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Up => self.step(Heading::Up),
            KeyCode::Down => self.step(Heading::Down),
            KeyCode::Left => self.step(Heading::Left),
            KeyCode::Right => self.step(Heading::Right),
            KeyCode::Char(' ') => self.plan(),
            KeyCode::Char('a') => {
                if !self.session.start_auto_move() {
                    self.message = String::from("Nothing to follow, plan a route first.");
                }
            }
            KeyCode::Char('b') => match self.session.toggle_speed_boost() {
                Ok(true) => self.message = String::from("Speed boost on."),
                Ok(false) => self.message = String::from("Speed boost off."),
                Err(err) => self.message = err.to_string(),
            },
            KeyCode::Char('r') => match self.session.reset() {
                Ok(()) => self.message = String::from("Level restarted."),
                Err(err) => self.message = err.to_string(),
            },
            KeyCode::Char('n') => self.next_level(),
            _ => {}
        }
    }

    fn step(&mut self, heading: Heading) {
        match self.session.step(heading) {
            Ok(outcome) => self.report_step(outcome),
            Err(err) => self.message = err.to_string(),
        }
    }

    fn plan(&mut self) {
        match self.session.plan() {
            Ok(SearchOutcome::Found(result)) => {
                self.message = format!(
                    "Route: {} steps, {:.1} moves, {} nodes expanded.",
                    result.steps(),
                    result.total_cost,
                    result.expanded
                );
            }
            Ok(SearchOutcome::NotFound { expanded, .. }) => {
                self.message = format!("No route to the goal ({expanded} nodes expanded).");
            }
            Err(err) => self.message = err.to_string(),
        }
    }

    fn next_level(&mut self) {
        let Some(number) = self.level_number else {
            self.message = String::from("No next level for a level file.");
            return;
        };
        if self.session.status() != SessionStatus::Won {
            self.message = String::from("Reach the goal first.");
            return;
        }

        let next = number % LevelData::builtin_count() + 1;
        let started = LevelData::builtin(next)
            .map_err(anyhow::Error::from)
            .and_then(|level| Session::new(level, self.config.clone()).map_err(Into::into));
        match started {
            Ok(session) => {
                info!("Advancing to level {}", next);
                self.session = session;
                self.level_number = Some(next);
                self.message = format!("Level {next}.");
            }
            Err(err) => {
                error!("Failed to load level {}: {:#}", next, err);
                self.message = format!("{err:#}");
            }
        }
    }

    fn report_step(&mut self, outcome: StepOutcome) {
        self.message = match outcome {
            StepOutcome::Moved {
                teleported: true, ..
            } => String::from("Through the door."),
            StepOutcome::Moved { .. } => return,
            StepOutcome::Blocked => String::from("Blocked."),
            StepOutcome::Won => String::from("Goal reached! 'n' for the next level."),
            StepOutcome::Lost(reason) => loss_message(reason),
        };
    }

    /// Advances the simulation by the time elapsed since the last frame.
    fn tick(&mut self, dt: f64) {
        match self.session.tick(dt) {
            Ok(report) => {
                if let Some(outcome) = report.mover {
                    self.report_step(outcome);
                }
                if let SessionStatus::Lost(reason) = self.session.status() {
                    self.message = loss_message(reason);
                }
            }
            Err(err) => {
                error!("Tick failed: {}", err);
                self.message = err.to_string();
            }
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn loss_message(reason: LossReason) -> String {
    match reason {
        LossReason::OutOfMoves => String::from("Out of moves. 'r' to retry."),
        LossReason::Caught => String::from("Caught by the hazard. 'r' to retry."),
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let (level, level_number) = match &args.level_file {
        Some(path) => {
            // Ensure the level file exists
            if !path.exists() {
                return Err(anyhow::anyhow!(
                    "Level file does not exist: {}",
                    path.display()
                ));
            }
            let level = LevelData::from_file(path)
                .with_context(|| format!("Failed to load level {}", path.display()))?;
            (level, None)
        }
        None => {
            let number = if (1..=LevelData::builtin_count()).contains(&args.level) {
                args.level
            } else {
                1
            };
            (LevelData::builtin(number)?, Some(number))
        }
    };

    // Build the app before touching the terminal so load errors print plainly
    let mut app = App::new(level, config, level_number)?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?; // Use alternate screen and enable mouse capture
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into) // Map io::Error to anyhow::Error
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let frame_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = frame_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        // Poll for events (keyboard, mouse, etc.)
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        // The hazard and auto-move run on real elapsed time
        let elapsed = last_tick.elapsed();
        if elapsed >= frame_rate {
            app.tick(elapsed.as_secs_f64());
            last_tick = Instant::now();
        }

        // Exit loop if requested
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the map
            Constraint::Percentage(20), // Area for the run status
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.session);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new(
        "Arrows: move  Space: plan  a: follow  b: boost  r: restart  n: next level  q/Esc: quit",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders moves, boost, hazard state and the last message.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let session = &app.session;

    let boost = session.speed_boost();
    let boost_text = match (session.speed_gadget_collected(), boost.active, boost.moves_left) {
        (false, _, _) => String::from("not collected"),
        (true, false, _) => String::from("ready ('b')"),
        (true, true, Some(left)) => format!("active, {left} moves left"),
        (true, true, None) => String::from("active"),
    };

    let hazard_text = match session.hazard() {
        Some(hazard) => format!(
            "{:?} at ({}, {})",
            hazard.mode(),
            hazard.position().row,
            hazard.position().col
        ),
        None => String::from("none"),
    };

    let status_style = match session.status() {
        SessionStatus::Playing => Style::default(),
        SessionStatus::Won => Style::default().fg(Color::Green).bold(),
        SessionStatus::Lost(_) => Style::default().fg(Color::Red).bold(),
    };

    let items = vec![
        ListItem::new(format!(
            "Moves: {:.1} / {:.1}",
            session.moves_spent(),
            session.max_moves()
        )),
        ListItem::new(format!("Speed boost: {boost_text}")),
        ListItem::new(format!("Hazard: {hazard_text}")),
        ListItem::new(Span::styled(app.message.as_str(), status_style)),
    ];

    let title = match app.level_number {
        Some(number) => format!("Level {} - {}", number, session.level().name),
        None => session.level().name.clone(),
    };
    let status_widget = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(status_widget, area);
}

/// Renders the grid with the planned route and the explored area beneath it.
fn render_map(frame: &mut Frame, area: Rect, session: &Session) {
    let grid = session.grid();
    let route: HashSet<Position> = session
        .path()
        .iter()
        .skip(session.path_index())
        .copied()
        .collect();
    let explored = session.explored();
    let hazard_mode = session.hazard().map(|hazard| hazard.mode());

    let mut lines: Vec<Line> = Vec::with_capacity(grid.rows());

    for row in 0..grid.rows() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.cols());
        for col in 0..grid.cols() {
            let position = Position::new(row as i32, col as i32);
            let cell = grid.cell_at(position).unwrap_or_default();
            let span = match cell {
                CellKind::Actor(ActorKind::Mover) => {
                    Span::styled("N", Style::default().fg(Color::Cyan).bold())
                }
                CellKind::Actor(ActorKind::Hazard) => {
                    let style = match hazard_mode {
                        Some(HazardMode::Chase) => Style::default().fg(Color::LightRed).bold(),
                        Some(HazardMode::Paused) => Style::default().fg(Color::Magenta),
                        _ => Style::default().fg(Color::Red),
                    };
                    Span::styled("G", style)
                }
                CellKind::Wall => Span::styled("#", Style::default().fg(Color::DarkGray)),
                CellKind::Goal => Span::styled("S", Style::default().fg(Color::Green).bold()),
                CellKind::SpeedGadget => Span::styled("B", Style::default().fg(Color::Yellow)),
                CellKind::DoorGadget => Span::styled("D", Style::default().fg(Color::Blue)),
                CellKind::Empty if route.contains(&position) => {
                    Span::styled("*", Style::default().fg(Color::Yellow))
                }
                CellKind::Empty if explored.contains(&position) => {
                    Span::styled(".", Style::default().fg(Color::DarkGray))
                }
                CellKind::Empty => Span::raw(" "),
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Late Dash").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

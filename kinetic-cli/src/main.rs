use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{LevelFilter, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use kinetic::catalog::ExerciseCatalog;
use kinetic::config::KineticConfig;
use kinetic::db::SqliteStore;
use kinetic::db::models::{DisplayableSet, Workout};
use kinetic::db::operations::{
    DEFAULT_RECENT_LIMIT, get_recent_workouts, get_today_stats, update_stats,
};
use kinetic::logging::init_logger;
use kinetic::session::{
    LiveSession, SessionDriver, SessionEvent, SetInput, SystemClock, format_elapsed,
};
use kinetic::stats::{StatsPolicy, workout_minutes};

use crossterm::event::{self, KeyCode, KeyEventKind};
use ratatui::{
    DefaultTerminal,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
};

#[derive(Parser, Debug)]
#[command(version, about = "Kinetic - live workout tracker", long_about = None)]
struct Args {
    /// SQLite file backing the store (overrides DATABASE_URL)
    #[arg(long, global = true)]
    db: Option<String>,
    /// User whose workouts are tracked (overrides KINETIC_USER_ID)
    #[arg(short, long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a live workout from a template
    Live {
        #[arg(short, long, default_value = "push_day")]
        template: String,
    },
    /// Show overall, weekly and today's stats
    Stats,
    /// List completed workouts, newest first
    History {
        #[arg(short, long)]
        verbose: bool,
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// List workout templates
    Templates,
    /// List the exercise library
    Exercises,
}

const NORMAL_HELP: &str =
    "tab: field | +/-: adjust | e: edit | enter: complete set | s: skip rest | n: next set | x: next exercise | f: finish | q: quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Reps,
    Weight,
    Duration,
    Distance,
}

impl Field {
    const ALL: [Field; 4] = [Field::Reps, Field::Weight, Field::Duration, Field::Distance];

    fn next(self) -> Self {
        let idx = Field::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Field::ALL[(idx + 1) % Field::ALL.len()]
    }

    fn label(self) -> &'static str {
        match self {
            Field::Reps => "Reps",
            Field::Weight => "Weight (lbs)",
            Field::Duration => "Duration (s)",
            Field::Distance => "Distance (m)",
        }
    }

    fn value(self, input: &SetInput) -> String {
        let value = match self {
            Field::Reps => input.reps.map(|r| r.to_string()),
            Field::Weight => input.weight.map(|w| format!("{:.1}", w)),
            Field::Duration => input.duration.map(|d| d.to_string()),
            Field::Distance => input.distance.map(|d| format!("{:.0}", d)),
        };
        value.unwrap_or_else(|| "-".to_string())
    }

    fn adjust(self, input: &mut SetInput, up: bool) {
        let sign = if up { 1 } else { -1 };
        match self {
            Field::Reps => input.adjust_reps(sign),
            Field::Weight => input.adjust_weight(2.5 * sign as f64),
            Field::Duration => input.adjust_duration(15 * sign),
            Field::Distance => {
                input.distance = Some((input.distance.unwrap_or(0.0) + 100.0 * sign as f64).max(0.0))
            }
        }
    }

    fn set(self, input: &mut SetInput, text: &str) -> Result<()> {
        let text = text.trim();
        match self {
            Field::Reps => input.reps = Some(text.parse().context("reps must be a whole number")?),
            Field::Weight => input.weight = Some(text.parse().context("weight must be a number")?),
            Field::Duration => {
                input.duration = Some(text.parse().context("duration must be whole seconds")?)
            }
            Field::Distance => {
                input.distance = Some(text.parse().context("distance must be a number")?)
            }
        }
        Ok(())
    }
}

enum InputMode {
    Normal,
    Editing,
}

struct LiveScreen {
    driver: SessionDriver,
    events: broadcast::Receiver<SessionEvent>,
    store: Arc<SqliteStore>,
    policy: StatsPolicy,
    field: Field,
    input_mode: InputMode,
    input_buffer: String,
    status_message: String,
}

impl LiveScreen {
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SessionEvent::RestStarted { seconds } => {
                    self.status_message = format!("Rest {}s (s to skip)", seconds);
                }
                SessionEvent::RestFinished => {
                    self.status_message = "Rest over, next set!".to_string();
                }
                SessionEvent::SetCompleted { set_number, .. } => {
                    self.status_message = format!("Set {} logged", set_number);
                }
                _ => {}
            }
        }
    }

    fn complete_set(&mut self) {
        if let Err(e) = self.driver.complete_set() {
            self.status_message = e.to_string();
        }
        self.drain_events();
    }

    fn edit_input(&mut self, f: impl FnOnce(&mut SetInput) -> Result<()>) {
        let result = self.driver.with_session(|session| match session.input_mut() {
            Ok(input) => f(input),
            Err(e) => Err(e.into()),
        });
        if let Err(e) = result {
            self.status_message = e.to_string();
        }
    }

    async fn finish(&mut self) -> Option<Workout> {
        match self.driver.finish(&self.store, &self.policy).await {
            Ok(workout) => Some(workout),
            Err(e) => {
                self.status_message = format!("{} (f to retry)", e);
                None
            }
        }
    }

    fn draw(&self, terminal: &mut DefaultTerminal) -> Result<()> {
        let snapshot = self.driver.snapshot();
        let input = self.driver.with_session(|s| s.input().clone());
        let names = self.driver.with_session(|s| {
            s.completed_sets()
                .iter()
                .map(|set| DisplayableSet::new(set, s.catalog().name_of(&set.exercise_id)).to_string())
                .collect::<Vec<_>>()
        });

        terminal.draw(|frame| {
            let chunks = Layout::vertical([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(6),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

            // Header
            let header = Paragraph::new(format!(
                "{}   {}   {} kcal",
                snapshot.workout_name.as_deref().unwrap_or("Workout"),
                snapshot.elapsed,
                snapshot.calories
            ))
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(header, chunks[0]);

            // Current exercise, or the rest countdown
            let exercise_title = match (snapshot.exercise_index, snapshot.exercise_name.as_deref()) {
                (Some(idx), Some(name)) => format!(
                    "Exercise {}/{}: {}  (set {})",
                    idx + 1,
                    snapshot.exercise_count,
                    name,
                    snapshot.set_number.unwrap_or(1)
                ),
                _ => "No exercises left. Press f to finish".to_string(),
            };
            match snapshot.rest_seconds_remaining {
                Some(remaining) => {
                    let total = self
                        .driver
                        .with_session(|s| {
                            s.current_exercise()
                                .map(|e| e.category)
                                .map(|c| s.rest_policy().rest_for(c))
                        })
                        .unwrap_or(remaining)
                        .max(1);
                    let gauge = Gauge::default()
                        .block(Block::default().borders(Borders::ALL).title(exercise_title))
                        .gauge_style(Style::default().fg(Color::Green))
                        .ratio(f64::from(remaining.min(total)) / f64::from(total))
                        .label(format!("Rest {}", format_elapsed(i64::from(remaining))));
                    frame.render_widget(gauge, chunks[1]);
                }
                None => {
                    let current = Paragraph::new(exercise_title)
                        .style(Style::default().fg(Color::White))
                        .block(Block::default().borders(Borders::ALL));
                    frame.render_widget(current, chunks[1]);
                }
            }

            // Set input
            let fields: Vec<ListItem> = Field::ALL
                .iter()
                .map(|field| {
                    let value = match (&self.input_mode, *field == self.field) {
                        (InputMode::Editing, true) => format!("{}_", self.input_buffer),
                        _ => field.value(&input),
                    };
                    let style = if *field == self.field {
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(format!("{:<14}{}", field.label(), value)).style(style)
                })
                .collect();
            let input_list =
                List::new(fields).block(Block::default().borders(Borders::ALL).title("Next set"));
            frame.render_widget(input_list, chunks[2]);

            // Completed sets
            if names.is_empty() {
                let empty_msg = Paragraph::new("No sets recorded yet.")
                    .style(Style::default().fg(Color::Gray))
                    .block(Block::default().borders(Borders::ALL).title("Sets"));
                frame.render_widget(empty_msg, chunks[3]);
            } else {
                let items: Vec<ListItem> = names.iter().map(|n| ListItem::new(n.as_str())).collect();
                let list = List::new(items).block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!("Sets ({} total)", names.len())),
                );
                let mut list_state = ListState::default();
                list_state.select(Some(names.len() - 1));
                frame.render_stateful_widget(list, chunks[3], &mut list_state);
            }

            // Footer with status
            let footer = Paragraph::new(self.status_message.as_str())
                .style(Style::default().fg(Color::White))
                .block(Block::default().borders(Borders::ALL).title("Status"));
            frame.render_widget(footer, chunks[4]);
        })?;
        Ok(())
    }
}

async fn run_live_workout(mut terminal: DefaultTerminal, mut screen: LiveScreen) -> Result<Option<Workout>> {
    loop {
        screen.drain_events();
        screen.draw(&mut terminal)?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let event::Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match screen.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(None),
                KeyCode::Tab => screen.field = screen.field.next(),
                KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up | KeyCode::Char('k') => {
                    let field = screen.field;
                    screen.edit_input(|input| {
                        field.adjust(input, true);
                        Ok(())
                    });
                }
                KeyCode::Char('-') | KeyCode::Down | KeyCode::Char('j') => {
                    let field = screen.field;
                    screen.edit_input(|input| {
                        field.adjust(input, false);
                        Ok(())
                    });
                }
                KeyCode::Char('e') => {
                    if screen.driver.state().is_resting() {
                        screen.status_message = "Resting; skip the rest to edit".to_string();
                    } else {
                        screen.input_mode = InputMode::Editing;
                        screen.input_buffer.clear();
                        screen.status_message = format!("Enter {}:", screen.field.label());
                    }
                }
                KeyCode::Enter | KeyCode::Char('c') => screen.complete_set(),
                KeyCode::Char('s') => match screen.driver.skip_rest() {
                    Ok(()) => screen.status_message = NORMAL_HELP.to_string(),
                    Err(e) => screen.status_message = e.to_string(),
                },
                KeyCode::Char('n') => match screen.driver.next_set() {
                    Ok(()) => screen.status_message = "Next set".to_string(),
                    Err(e) => screen.status_message = e.to_string(),
                },
                KeyCode::Char('x') => match screen.driver.next_exercise() {
                    Ok(()) => screen.status_message = "Next exercise".to_string(),
                    Err(e) => screen.status_message = e.to_string(),
                },
                KeyCode::Char('f') => {
                    if let Some(workout) = screen.finish().await {
                        return Ok(Some(workout));
                    }
                }
                _ => {}
            },
            InputMode::Editing => match key.code {
                KeyCode::Enter => {
                    let field = screen.field;
                    let text = std::mem::take(&mut screen.input_buffer);
                    screen.input_mode = InputMode::Normal;
                    screen.status_message = NORMAL_HELP.to_string();
                    screen.edit_input(|input| field.set(input, &text));
                }
                KeyCode::Esc => {
                    screen.input_mode = InputMode::Normal;
                    screen.input_buffer.clear();
                    screen.status_message = NORMAL_HELP.to_string();
                }
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                    screen.input_buffer.push(c);
                }
                KeyCode::Backspace => {
                    screen.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}

fn print_workout(workout: &Workout, catalog: &ExerciseCatalog, policy: &StatsPolicy, verbose: bool) {
    println!(
        "{}  {} - {:.0} min, {} kcal, {} sets",
        workout.date,
        workout.name,
        workout_minutes(workout, policy),
        workout.total_calories.unwrap_or(0),
        workout.exercises.len()
    );
    if verbose {
        for set in &workout.exercises {
            let displayable = DisplayableSet::new(set, catalog.name_of(&set.exercise_id));
            println!("\t{}", displayable)
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = KineticConfig::from_env()?;
    if let Some(db) = args.db {
        config.database_url = db;
    }
    if let Some(user) = args.user {
        config.user_id = user;
    }
    init_logger(config.log_level);

    let catalog = Arc::new(ExerciseCatalog::builtin());

    match args.command {
        Commands::Live { template } => {
            let template = catalog
                .template(&template)
                .cloned()
                .with_context(|| format!("Unknown template '{}'. See `kinetic-cli templates`", template))?;
            let store = Arc::new(
                SqliteStore::open(&config.database_url)
                    .with_context(|| format!("Failed to open {}", config.database_url))?,
            );

            let session = LiveSession::new(&config.user_id, Arc::clone(&catalog), Arc::new(SystemClock))
                .with_rest_policy(config.rest);
            let mut driver = SessionDriver::new(session);
            let events = driver.subscribe();
            driver.start(template)?;

            let screen = LiveScreen {
                driver,
                events,
                store,
                policy: config.stats,
                field: Field::Reps,
                input_mode: InputMode::Normal,
                input_buffer: String::new(),
                status_message: NORMAL_HELP.to_string(),
            };

            // Log lines would tear the TUI.
            log::set_max_level(LevelFilter::Off);
            let terminal = ratatui::init();
            let result = run_live_workout(terminal, screen).await;
            ratatui::restore();
            log::set_max_level(config.log_level);

            match result? {
                Some(workout) => {
                    info!("Workout {} saved", workout.id);
                    println!("Workout saved:");
                    print_workout(&workout, &catalog, &config.stats, true);
                }
                None => println!("Exited without saving the workout"),
            }
            Ok(())
        }
        Commands::Stats => {
            let store = SqliteStore::open(&config.database_url)?;
            let now = chrono::Utc::now();
            let stats = update_stats(&store, &config.user_id, now, &config.stats).await?;
            let today = get_today_stats(&store, &config.user_id, now, &config.stats).await?;

            println!("Stats for {}", config.user_id);
            println!(
                "  total:    {} workouts, {} kcal, {} min",
                stats.total_workouts, stats.total_calories, stats.total_minutes
            );
            println!(
                "  weekly:   {} workouts, {} kcal, {} min",
                stats.weekly_workouts, stats.weekly_calories, stats.weekly_minutes
            );
            println!(
                "  today:    {} workouts, {} kcal, {} min",
                today.workouts_completed, today.calories_burned, today.minutes_active
            );
            println!("  streak:   {} days", stats.current_streak);
            Ok(())
        }
        Commands::History { verbose, limit } => {
            let store = SqliteStore::open(&config.database_url)?;
            let workouts = get_recent_workouts(&store, &config.user_id, limit).await?;
            if workouts.is_empty() {
                println!("No completed workouts yet");
            }
            for workout in &workouts {
                print_workout(workout, &catalog, &config.stats, verbose);
            }
            Ok(())
        }
        Commands::Templates => {
            for template in catalog.templates() {
                let exercises: Vec<&str> = catalog
                    .template_exercises(template)
                    .iter()
                    .map(|e| e.name.as_str())
                    .collect();
                println!(
                    "{:<14}{} ({}, {}, {})",
                    template.id, template.name, template.duration, template.category, template.difficulty
                );
                println!("\t{}", exercises.join(", "));
            }
            Ok(())
        }
        Commands::Exercises => {
            for exercise in catalog.exercises() {
                println!(
                    "{:<20}{:<20}{:<12}{}",
                    exercise.id,
                    exercise.name,
                    exercise.category,
                    exercise.muscle_groups.join(", ")
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_cycle_through_all_inputs() {
        let mut field = Field::Reps;
        for expected in [Field::Weight, Field::Duration, Field::Distance, Field::Reps] {
            field = field.next();
            assert_eq!(field, expected);
        }
    }

    #[test]
    fn field_adjustments_never_go_negative() {
        let mut input = SetInput::default();
        Field::Weight.adjust(&mut input, false);
        Field::Distance.adjust(&mut input, false);
        Field::Reps.adjust(&mut input, true);
        assert_eq!(input.weight, Some(0.0));
        assert_eq!(input.distance, Some(0.0));
        assert_eq!(input.reps, Some(1));
    }

    #[test]
    fn typed_values_are_parsed_per_field() {
        let mut input = SetInput::default();
        Field::Duration.set(&mut input, "90").unwrap();
        Field::Weight.set(&mut input, "42.5").unwrap();
        assert_eq!(input.duration, Some(90));
        assert_eq!(input.weight, Some(42.5));
        assert!(Field::Reps.set(&mut input, "1.5").is_err());
    }
}

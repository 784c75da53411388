/////////////////////
/// STOPWATCH - a terminal stopwatch with a productivity limit
///
/// Counts up one second at a time. An optional upper limit (in seconds) stops
/// the count, turns the display red and raises a desktop notification.
/// - 's' or 'space' starts (ignored while running or until reset after a limit stop)
/// - 'r' resets to 00:00 and clears the limit
/// - 'l' opens the limit dialog (only while stopped)
/// - 'q' or 'esc' quits
///
pub const APP_VERSION: &str = "STOPWATCH V0.1.0";
const LOG_FILE_NAME: &str = "stopwatch.log";
const DIALOG_TITLE: &str = "Set upper limit in seconds";

use std::fs::File;
use std::time::Instant;
#[macro_use] extern crate log;
extern crate simplelog;
use simplelog::*;
#[macro_use]
extern crate ini;

mod config;
mod notify;
mod stopwatch;
mod tui;

use build_time::build_time_local;
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::*};
use strum::EnumIs;

use crate::notify::{DesktopNotifier, Notifier, SilentNotifier};
use crate::stopwatch::Stopwatch;
use crate::tui::{Event, Tui};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIs)]
enum AppState {
  #[default]
  Timer,
  Settings,
  Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Message {
  Start,
  Reset,
  OpenSettings,
  Input(char),
  Backspace,
  Confirm,
  Cancel,
  Frame,
  Quit,
}

fn init_logging() {
  let mut loggers: Vec<Box<dyn SharedLogger>> = vec![
    TermLogger::new(LevelFilter::Warn, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
  ];
  match File::create(LOG_FILE_NAME) {
    Ok(log_file) => loggers.push(WriteLogger::new(LevelFilter::Info, Config::default(), log_file)),
    Err(e) => {
      eprintln!("Warning: Could not create log file: {}", e);
      eprintln!("Continuing with terminal logging only.");
    }
  }
  CombinedLogger::init(loggers).unwrap_or_else(|e| {
    eprintln!("Warning: Could not initialize logger: {}", e);
  });
  info!("Logging for {} initialized", APP_VERSION);
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  init_logging();
  let config = config::Config::load();
  let notifier: Box<dyn Notifier> = if config.notifications {
    Box::new(DesktopNotifier)
  } else {
    Box::new(SilentNotifier)
  };
  let mut app = App::new(&config, notifier);
  app.run().await
}

struct App {
  state: AppState,
  stopwatch: Stopwatch,
  limit_input: String,
}

impl App {
  fn new(config: &config::Config, notifier: Box<dyn Notifier>) -> Self {
    let mut stopwatch = Stopwatch::new(notifier);
    stopwatch.set_limit_secs(config.limit);
    Self {
      state: Default::default(),
      stopwatch,
      limit_input: String::new(),
    }
  }

  async fn run(&mut self) -> Result<()> {
    let mut tui = Tui::new()?;
    tui.enter()?;
    while !self.state.is_quitting() {
      tui.draw(|f| self.ui(f))?;
      let event = tui.next().await?; // blocks until next event
      let message = self.handle_event(event);
      self.update(message, Instant::now());
    }
    tui.exit()?;
    println!("Thanks for using {} (built: {})\n", APP_VERSION, build_time_local!("%Y-%b-%d at %H:%M:%S"));
    Ok(())
  }

  // Event handler (keyboard, frame)
  fn handle_event(&self, event: Event) -> Message {
    let key = match event {
      Event::Key(key) => key,
      Event::Frame | Event::Error => return Message::Frame,
      Event::Closed => return Message::Quit,
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Message::Quit;
    }
    if self.state.is_settings() {
      return Self::dialog_message(key);
    }
    match key.code {
      KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Message::Quit,
      KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char(' ') => Message::Start,
      KeyCode::Char('r') | KeyCode::Char('R') => Message::Reset,
      KeyCode::Char('l') | KeyCode::Char('L') => Message::OpenSettings,
      _ => Message::Frame,
    }
  }

  fn dialog_message(key: KeyEvent) -> Message {
    match key.code {
      KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => Message::Input(c),
      KeyCode::Backspace => Message::Backspace,
      KeyCode::Enter => Message::Confirm,
      KeyCode::Esc => Message::Cancel,
      _ => Message::Frame,
    }
  }

  fn update(&mut self, message: Message, now: Instant) {
    // ticks that fell due before this event run first
    self.stopwatch.poll(now);
    match message {
      Message::Start => self.stopwatch.start(now),
      Message::Reset => self.stopwatch.reset(),
      Message::OpenSettings => self.open_settings(),
      Message::Input(c) => self.limit_input.push(c),
      Message::Backspace => {
        self.limit_input.pop();
      }
      Message::Confirm => self.confirm_settings(),
      Message::Cancel => self.close_settings(),
      Message::Frame => {}
      Message::Quit => self.quit(),
    }
  }

  fn open_settings(&mut self) {
    if !self.stopwatch.settings_enabled() {
      return;
    }
    self.limit_input.clear();
    self.state = AppState::Settings;
  }

  fn confirm_settings(&mut self) {
    self.stopwatch.set_threshold(&self.limit_input);
    self.close_settings();
  }

  fn close_settings(&mut self) {
    self.limit_input.clear();
    self.state = AppState::Timer;
  }

  fn quit(&mut self) {
    self.stopwatch.reset();
    self.state = AppState::Quitting;
  }

  fn ui(&self, f: &mut Frame) {
    let layout = self.layout(f.size());
    f.render_widget(self.title_paragraph(), layout[0]);
    match self.timer_text() {
      Ok(text) => f.render_widget(text, layout[1]),
      Err(e) => error!("Unable to build timer text: {}", e),
    }
    if let Some(gauge) = self.progress_gauge() {
      f.render_widget(gauge, layout[2]);
    }
    f.render_widget(self.status_paragraph(), layout[3]);
    f.render_widget(self.help_paragraph(), layout[4]);
    if self.state.is_settings() {
      let area = centered_rect(50, 7, f.size());
      f.render_widget(Clear, area);
      f.render_widget(self.settings_dialog(), area);
    }
  }

  fn layout(&self, area: Rect) -> Vec<Rect> {
    let layout = Layout::default()
      .direction(Direction::Vertical)
      .constraints(vec![
        Constraint::Length(3), // top bar
        Constraint::Length(9), // elapsed time
        Constraint::Length(3), // progress
        Constraint::Length(2), // limit
        Constraint::Length(2), // help
      ])
      .split(area);
    layout.to_vec()
  }

  fn title_paragraph(&self) -> Paragraph<'_> {
    let title_text = Line::from(vec![APP_VERSION.into(), " - productivity ".dim(), "timer".into()]);
    Paragraph::new(title_text).gray()
  }

  fn timer_text(&self) -> Result<tui_big_text::BigText<'_>> {
    let style = Style::new().fg(self.stopwatch.label_color());
    let lines = vec![self.stopwatch.label().into()];
    let text = tui_big_text::BigTextBuilder::default()
      .lines(lines)
      .style(style)
      .build()?;
    Ok(text)
  }

  // Hidden while idle; sweeps once a minute in a fresh random tint each tick
  fn progress_gauge(&self) -> Option<Gauge<'_>> {
    let tint = self.stopwatch.progress()?;
    let secs = (self.stopwatch.elapsed_ms() / 1000) % 60;
    Some(
      Gauge::default()
        .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded))
        .gauge_style(Style::default().fg(tint))
        .ratio(secs as f64 / 60.0)
        .label(""),
    )
  }

  fn status_paragraph(&self) -> Paragraph<'_> {
    let limit = match self.stopwatch.threshold_ms() {
      Some(ms) => stopwatch::format_elapsed(ms),
      None => "none".to_string(),
    };
    let mut spans = vec!["limit: ".dim(), limit.into()];
    if self.stopwatch.label_color() == stopwatch::LIMIT_LABEL_COLOR {
      spans.push("  Time's up!".red().bold());
    }
    Paragraph::new(Line::from(spans)).gray()
  }

  fn help_paragraph(&self) -> Paragraph<'_> {
    let mut help = vec!["s ".into(), "start".dim(), " : r ".into(), "reset".dim()];
    if self.stopwatch.settings_enabled() {
      help.extend(vec![" : l ".into(), "limit".dim()]);
    }
    help.extend(vec![" : q ".into(), "quit".dim()]);
    Paragraph::new(Line::from(help)).gray()
  }

  fn settings_dialog(&self) -> Paragraph<'_> {
    let lines = vec![
      Line::from(vec![self.limit_input.as_str().green().bold(), "█".green()]),
      Line::from(""),
      Line::from("Enter: OK  •  Esc: Cancel".dim().italic()),
    ];
    Paragraph::new(lines).block(
      Block::default()
        .title(DIALOG_TITLE)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded),
    )
  }
}

/// A `height`-row box, `percent_x` wide, in the middle of `area`
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(0),
      Constraint::Length(height),
      Constraint::Min(0),
    ])
    .split(area);

  Layout::default()
    .direction(Direction::Horizontal)
    .constraints([
      Constraint::Percentage((100 - percent_x) / 2),
      Constraint::Percentage(percent_x),
      Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(rows[1])[1]
}

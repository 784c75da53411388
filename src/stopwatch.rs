//! The timer controller: elapsed counter, optional upper limit, and the one
//! second post-and-reschedule tick that drives the label and progress tint.
//!
//! All methods take the current `Instant` from the caller so the event loop
//! owns the clock and tests can step time by hand.
use std::time::{Duration, Instant};

use rand::{thread_rng, Rng};
use ratatui::style::Color;

use crate::notify::{Notifier, TIMES_UP};

pub const TICK_PERIOD_MS: u64 = 1000;
pub const IDLE_LABEL: &str = "00:00";
pub const DEFAULT_LABEL_COLOR: Color = Color::White;
pub const RESET_LABEL_COLOR: Color = Color::Gray;
pub const LIMIT_LABEL_COLOR: Color = Color::Red;
pub const DEFAULT_TINT: Color = Color::Cyan;

/// Parse user text into a limit in seconds. Anything that is not a positive
/// integer means "no limit"; zero or negative values could never be reached.
pub fn parse_limit(input: &str) -> Option<u32> {
  match input.parse::<i32>() {
    Ok(secs) if secs > 0 => Some(secs as u32),
    Ok(secs) => {
      info!("Limit {} can never be reached, running without a limit", secs);
      None
    }
    Err(e) => {
      info!("Limit input '{}' is not a number ({}), running without a limit", input, e);
      None
    }
  }
}

/// "MM:SS", both zero-padded. Minutes keep counting past 59.
pub fn format_elapsed(ms: u64) -> String {
  let secs = ms / 1000;
  format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn random_tint() -> Color {
  let mut rng = thread_rng();
  Color::Rgb(rng.gen(), rng.gen(), rng.gen())
}

pub struct Stopwatch {
  elapsed_ms: u64,
  threshold_ms: Option<u64>,
  next_tick: Option<Instant>,
  label: String,
  label_color: Color,
  progress: Option<Color>,
  settings_enabled: bool,
  notifier: Box<dyn Notifier>,
}

impl Stopwatch {
  pub fn new(notifier: Box<dyn Notifier>) -> Self {
    Self {
      elapsed_ms: 0,
      threshold_ms: None,
      next_tick: None,
      label: IDLE_LABEL.to_string(),
      label_color: DEFAULT_LABEL_COLOR,
      progress: None,
      settings_enabled: true,
      notifier,
    }
  }

  pub fn elapsed_ms(&self) -> u64 {
    self.elapsed_ms
  }

  pub fn threshold_ms(&self) -> Option<u64> {
    self.threshold_ms
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn label_color(&self) -> Color {
    self.label_color
  }

  /// Tint of the progress indicator, `None` while it is hidden.
  pub fn progress(&self) -> Option<Color> {
    self.progress
  }

  pub fn settings_enabled(&self) -> bool {
    self.settings_enabled
  }

  pub fn is_running(&self) -> bool {
    self.next_tick.is_some()
  }

  pub fn next_tick(&self) -> Option<Instant> {
    self.next_tick
  }

  pub fn start(&mut self, now: Instant) {
    if self.elapsed_ms != 0 || self.next_tick.is_some() {
      return;
    }
    self.settings_enabled = false;
    self.progress = Some(DEFAULT_TINT);
    self.next_tick = Some(now + Duration::from_millis(TICK_PERIOD_MS));
    info!("Started (limit: {:?} ms)", self.threshold_ms);
  }

  /// Run every tick whose deadline is at or before `now`.
  pub fn poll(&mut self, now: Instant) {
    while let Some(due) = self.next_tick {
      if due > now {
        break;
      }
      self.tick(due);
    }
  }

  pub fn tick(&mut self, due: Instant) {
    self.elapsed_ms += TICK_PERIOD_MS;
    self.label = format_elapsed(self.elapsed_ms);
    self.progress = Some(random_tint());
    self.next_tick = Some(due + Duration::from_millis(TICK_PERIOD_MS));

    if Some(self.elapsed_ms) == self.threshold_ms {
      self.next_tick = None;
      self.label_color = LIMIT_LABEL_COLOR;
      self.progress = None;
      self.settings_enabled = true;
      info!("Limit reached at {}", self.label);
      self.notify();
    }
  }

  pub fn reset(&mut self) {
    self.next_tick = None;
    self.elapsed_ms = 0;
    self.threshold_ms = None;
    self.label = IDLE_LABEL.to_string();
    self.label_color = RESET_LABEL_COLOR;
    self.progress = None;
    self.settings_enabled = true;
  }

  pub fn set_threshold(&mut self, input: &str) {
    self.set_limit_secs(parse_limit(input));
  }

  pub fn set_limit_secs(&mut self, limit: Option<u32>) {
    self.threshold_ms = limit.map(|secs| secs as u64 * 1000);
    info!("Limit set to {:?} ms", self.threshold_ms);
  }

  pub fn notify(&mut self) {
    if let Err(e) = self.notifier.notify(&TIMES_UP) {
      warn!("Failed to raise notification: {}", e);
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::notify::Alert;
  use color_eyre::eyre::{eyre, Result};
  use std::cell::RefCell;
  use std::rc::Rc;

  #[derive(Clone, Default)]
  pub(crate) struct RecordingNotifier {
    pub sent: Rc<RefCell<Vec<Alert>>>,
  }

  impl Notifier for RecordingNotifier {
    fn notify(&mut self, alert: &Alert) -> Result<()> {
      self.sent.borrow_mut().push(*alert);
      Ok(())
    }
  }

  struct FailingNotifier;

  impl Notifier for FailingNotifier {
    fn notify(&mut self, _alert: &Alert) -> Result<()> {
      Err(eyre!("no notification daemon"))
    }
  }

  fn stopwatch() -> (Stopwatch, Rc<RefCell<Vec<Alert>>>) {
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();
    (Stopwatch::new(Box::new(notifier)), sent)
  }

  fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
  }

  #[test]
  fn test_new_is_idle() {
    let (sw, _) = stopwatch();
    assert_eq!(sw.elapsed_ms(), 0);
    assert!(!sw.is_running());
    assert!(sw.settings_enabled());
    assert_eq!(sw.progress(), None);
    assert_eq!(sw.label(), "00:00");
  }

  #[test]
  fn test_start_schedules_first_tick() {
    let (mut sw, _) = stopwatch();
    let t0 = Instant::now();
    sw.start(t0);
    assert!(sw.is_running());
    assert!(!sw.settings_enabled());
    assert_eq!(sw.progress(), Some(DEFAULT_TINT));
    assert_eq!(sw.next_tick(), Some(t0 + secs(1)));

    // nothing happens before the first deadline
    sw.poll(t0 + Duration::from_millis(999));
    assert_eq!(sw.elapsed_ms(), 0);

    sw.poll(t0 + secs(1));
    assert_eq!(sw.elapsed_ms(), 1000);
    assert_eq!(sw.label(), "00:01");
  }

  #[test]
  fn test_start_while_running_is_noop() {
    let (mut sw, _) = stopwatch();
    let t0 = Instant::now();
    sw.start(t0);
    sw.start(t0 + Duration::from_millis(500));
    assert_eq!(sw.next_tick(), Some(t0 + secs(1)));

    sw.poll(t0 + secs(3));
    sw.start(t0 + secs(3));
    assert_eq!(sw.elapsed_ms(), 3000);
    assert_eq!(sw.next_tick(), Some(t0 + secs(4)));
  }

  #[test]
  fn test_label_after_65_seconds() {
    let (mut sw, _) = stopwatch();
    let t0 = Instant::now();
    sw.start(t0);
    sw.poll(t0 + secs(65));
    assert_eq!(sw.elapsed_ms(), 65000);
    assert_eq!(sw.label(), "01:05");
  }

  #[test]
  fn test_tick_sets_a_tint() {
    let (mut sw, _) = stopwatch();
    let t0 = Instant::now();
    sw.start(t0);
    sw.poll(t0 + secs(1));
    assert!(matches!(sw.progress(), Some(Color::Rgb(_, _, _))));
  }

  #[test]
  fn test_reset_returns_to_idle() {
    let (mut sw, _) = stopwatch();
    let t0 = Instant::now();
    sw.set_threshold("30");
    sw.start(t0);
    sw.poll(t0 + secs(12));
    sw.reset();
    assert_eq!(sw.elapsed_ms(), 0);
    assert_eq!(sw.threshold_ms(), None);
    assert_eq!(sw.label(), "00:00");
    assert_eq!(sw.label_color(), Color::Gray);
    assert_eq!(sw.progress(), None);
    assert!(sw.settings_enabled());
    assert!(!sw.is_running());

    // cancelled: later polls do nothing
    sw.poll(t0 + secs(60));
    assert_eq!(sw.elapsed_ms(), 0);
  }

  #[test]
  fn test_reset_when_idle() {
    let (mut sw, _) = stopwatch();
    sw.reset();
    assert_eq!(sw.elapsed_ms(), 0);
    assert_eq!(sw.label(), "00:00");
    assert_eq!(sw.label_color(), Color::Gray);
  }

  #[test]
  fn test_threshold_stops_and_notifies_once() {
    let (mut sw, sent) = stopwatch();
    let t0 = Instant::now();
    sw.set_threshold("5");
    assert_eq!(sw.threshold_ms(), Some(5000));
    sw.start(t0);

    sw.poll(t0 + secs(4));
    assert!(sw.is_running());
    assert!(sent.borrow().is_empty());

    sw.poll(t0 + secs(5));
    assert!(!sw.is_running());
    assert_eq!(sw.elapsed_ms(), 5000);
    assert_eq!(sw.label(), "00:05");
    assert_eq!(sw.label_color(), Color::Red);
    assert_eq!(sw.progress(), None);
    assert!(sw.settings_enabled());

    sw.poll(t0 + secs(30));
    assert_eq!(sw.elapsed_ms(), 5000);
    assert_eq!(*sent.borrow(), vec![TIMES_UP]);
  }

  #[test]
  fn test_start_after_limit_needs_reset() {
    let (mut sw, _) = stopwatch();
    let t0 = Instant::now();
    sw.set_threshold("2");
    sw.start(t0);
    sw.poll(t0 + secs(2));
    assert!(!sw.is_running());

    sw.start(t0 + secs(3));
    assert!(!sw.is_running());

    sw.reset();
    sw.start(t0 + secs(4));
    assert!(sw.is_running());
  }

  #[test]
  fn test_invalid_threshold_runs_unlimited() {
    for input in ["", "abc", "1.5", " 5", "0", "-3"] {
      let (mut sw, sent) = stopwatch();
      let t0 = Instant::now();
      sw.set_threshold(input);
      assert_eq!(sw.threshold_ms(), None, "input {:?}", input);
      sw.start(t0);
      sw.poll(t0 + secs(600));
      assert!(sw.is_running());
      assert_eq!(sw.elapsed_ms(), 600_000);
      assert!(sent.borrow().is_empty());
    }
  }

  #[test]
  fn test_notifier_failure_still_stops() {
    let mut sw = Stopwatch::new(Box::new(FailingNotifier));
    let t0 = Instant::now();
    sw.set_threshold("1");
    sw.start(t0);
    sw.poll(t0 + secs(1));
    assert!(!sw.is_running());
    assert_eq!(sw.label_color(), Color::Red);
  }

  #[test]
  fn test_format_elapsed() {
    assert_eq!(format_elapsed(0), "00:00");
    assert_eq!(format_elapsed(9000), "00:09");
    assert_eq!(format_elapsed(65000), "01:05");
    assert_eq!(format_elapsed(3_599_000), "59:59");
    assert_eq!(format_elapsed(6_000_000), "100:00");
  }

  #[test]
  fn test_parse_limit() {
    assert_eq!(parse_limit("10"), Some(10));
    assert_eq!(parse_limit("0"), None);
    assert_eq!(parse_limit("-1"), None);
    assert_eq!(parse_limit(""), None);
    assert_eq!(parse_limit("ten"), None);
    assert_eq!(parse_limit("99999999999"), None);
  }
}

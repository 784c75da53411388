use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use crossterm::event::KeyEvent;
use futures::{FutureExt, StreamExt};
use ratatui::backend::CrosstermBackend as Backend;
use ratatui::Terminal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Redraw interval. Stopwatch ticks are scheduled separately on their own
/// deadline, this only decides how quickly a due tick shows up on screen.
pub const FRAME_INTERVAL_MS: u64 = 50;

/// What the event task forwards to the main loop.
#[derive(Clone, Debug)]
pub enum Event {
  /// Crossterm reported a read error; the loop carries on.
  Error,
  /// The terminal input stream ended, nothing more will arrive.
  Closed,
  /// Redraw request every `FRAME_INTERVAL_MS`. Not a stopwatch tick: the
  /// controller runs its own one second ticks whenever a frame finds them due.
  Frame,
  Key(KeyEvent),
}

pub struct Tui {
  pub terminal: Terminal<Backend<std::io::Stderr>>,
  task: JoinHandle<()>,
  cancellation_token: CancellationToken,
  event_rx: UnboundedReceiver<Event>,
  event_tx: UnboundedSender<Event>,
}

impl Tui {
  pub fn new() -> Result<Tui> {
    let mut terminal = Terminal::new(Backend::new(std::io::stderr()))?;
    terminal.clear()?;
    let (event_tx, event_rx) = unbounded_channel();
    let cancellation_token = CancellationToken::new();
    let task = tokio::spawn(async {});
    Ok(Self { terminal, task, cancellation_token, event_rx, event_tx })
  }

  pub async fn next(&mut self) -> Result<Event> {
    self.event_rx.recv().await.ok_or(eyre!("Event channel closed"))
  }

  pub fn enter(&mut self) -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stderr(), crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    self.start();
    Ok(())
  }

  pub fn exit(&self) -> Result<()> {
    self.stop()?;
    crossterm::execute!(std::io::stderr(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    crossterm::terminal::disable_raw_mode()?;
    Ok(())
  }

  fn stop(&self) -> Result<()> {
    self.cancellation_token.cancel();
    let mut counter = 0;
    while !self.task.is_finished() {
      std::thread::sleep(Duration::from_millis(250));
      counter += 1;
      if counter > 5 {
        self.task.abort();
      }
      if counter > 10 {
        error!("Failed to abort event task for unknown reason");
        return Err(eyre!("Unable to abort event task"));
      }
    }
    Ok(())
  }

  fn start(&mut self) {
    let frame_rate = Duration::from_millis(FRAME_INTERVAL_MS);
    self.cancellation_token.cancel();
    self.cancellation_token = CancellationToken::new();
    let cancellation_token = self.cancellation_token.clone();
    let event_tx = self.event_tx.clone();
    self.task = tokio::spawn(async move {
      let mut reader = crossterm::event::EventStream::new();
      let mut interval = tokio::time::interval(frame_rate);
      loop {
        let delay = interval.tick();
        let crossterm_event = reader.next().fuse();
        let event = tokio::select! {
          _ = cancellation_token.cancelled() => break,
          maybe_event = crossterm_event => match maybe_event {
            Some(Ok(crossterm::event::Event::Key(key)))
              if key.kind == crossterm::event::KeyEventKind::Press => Event::Key(key),
            Some(Ok(_)) => continue,
            None => {
              warn!("Terminal input stream ended");
              if let Err(e) = event_tx.send(Event::Closed) {
                error!("Failed to send close event: {}", e);
              }
              break;
            }
            Some(Err(e)) => {
              warn!("Terminal event error: {}", e);
              Event::Error
            }
          },
          _ = delay => Event::Frame,
        };
        if let Err(e) = event_tx.send(event) {
          error!("Failed to send event: {}", e);
          break;
        }
      }
    });
  }
}

impl std::ops::Deref for Tui {
  type Target = Terminal<Backend<std::io::Stderr>>;

  fn deref(&self) -> &Self::Target {
    &self.terminal
  }
}

impl std::ops::DerefMut for Tui {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.terminal
  }
}

impl Drop for Tui {
  fn drop(&mut self) {
    if let Err(e) = self.exit() {
      eprintln!("Error during cleanup: {}", e);
    }
  }
}

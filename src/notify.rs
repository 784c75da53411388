//! Desktop notifications raised when the stopwatch reaches its upper limit.
//!
//! The controller only talks to the `Notifier` trait, so the terminal binary can
//! swap in a silent implementation (config `notifications = false`) and tests can
//! count what was sent.
use color_eyre::eyre::{eyre, Result};
use notify_rust::{Notification, Timeout};
#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::{Hint, Urgency};

pub const APP_NAME: &str = "stopwatch";

/// A fixed notification: re-sending it replaces the previous one instead of stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
  pub id: u32,
  pub summary: &'static str,
  pub body: &'static str,
}

pub const TIMES_UP: Alert = Alert {
  id: 393939,
  summary: "Time's up!",
  body: "I believe I can fly",
};

pub trait Notifier {
  fn notify(&mut self, alert: &Alert) -> Result<()>;
}

/// Sends through the platform notification service (D-Bus on Linux).
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
  fn build(alert: &Alert) -> Notification {
    let mut notification = Notification::new();
    notification
      .summary(alert.summary)
      .body(alert.body)
      .appname(APP_NAME)
      .icon("alarm-clock")
      .timeout(Timeout::Never);

    #[cfg(all(unix, not(target_os = "macos")))]
    {
      // dismissed once clicked, like an auto-cancel alert
      notification
        .urgency(Urgency::Critical)
        .id(alert.id)
        .hint(Hint::Resident(false));
    }
    notification
  }
}

impl Notifier for DesktopNotifier {
  fn notify(&mut self, alert: &Alert) -> Result<()> {
    Self::build(alert)
      .show()
      .map_err(|e| eyre!("Unable to show notification {}: {}", alert.id, e))?;
    info!("Notification {} shown: {}", alert.id, alert.summary);
    Ok(())
  }
}

/// Used when notifications are switched off in the config file.
#[derive(Debug, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
  fn notify(&mut self, alert: &Alert) -> Result<()> {
    info!("Notifications disabled, skipping '{}'", alert.summary);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_times_up_alert_text() {
    assert_eq!(TIMES_UP.id, 393939);
    assert_eq!(TIMES_UP.summary, "Time's up!");
    assert_eq!(TIMES_UP.body, "I believe I can fly");
  }

  #[test]
  fn test_desktop_notification_fields() {
    let notification = DesktopNotifier::build(&TIMES_UP);
    assert_eq!(notification.summary, "Time's up!");
    assert_eq!(notification.body, "I believe I can fly");
    assert_eq!(notification.appname, APP_NAME);
    assert_eq!(notification.timeout, Timeout::Never);
  }

  #[cfg(all(unix, not(target_os = "macos")))]
  #[test]
  fn test_desktop_notification_is_dismissed_on_click() {
    let notification = DesktopNotifier::build(&TIMES_UP);
    assert_eq!(notification.id, Some(TIMES_UP.id));
    assert!(notification.hints.contains(&Hint::Resident(false)));
  }

  #[test]
  fn test_silent_notifier_never_fails() {
    let mut notifier = SilentNotifier;
    assert!(notifier.notify(&TIMES_UP).is_ok());
    assert!(notifier.notify(&TIMES_UP).is_ok());
  }
}

use std::collections::HashMap;

use crate::stopwatch::parse_limit;

pub const CONF_FILE_NAME: &str = "stopwatch.ini";
const SECTION: &str = "stopwatch";

type IniMap = HashMap<String, HashMap<String, Option<String>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Limit in seconds applied at start-up, `None` for no limit.
  pub limit: Option<u32>,
  pub notifications: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self { limit: None, notifications: true }
  }
}

/// Parse an on/off config value, falling back to `default` when unrecognised
fn parse_bool_config(value: &str, config_name: &str, default: bool) -> bool {
  match value.trim().to_ascii_lowercase().as_str() {
    "true" | "yes" | "on" | "1" => true,
    "false" | "no" | "off" | "0" => false,
    _ => {
      warn!("Config value '{}' = '{}' is not a boolean, using default {}", config_name, value, default);
      eprintln!("Warning: Invalid {} value '{}', using default {}", config_name, value, default);
      default
    }
  }
}

impl Config {
  pub fn load() -> Self {
    info!("Reading config from {}", CONF_FILE_NAME);
    match ini!(safe CONF_FILE_NAME) {
      Ok(map) => Self::from_ini(&map),
      Err(error) => {
        eprintln!("Warning: Couldn't load config file '{}': {}", CONF_FILE_NAME, error);
        eprintln!("Continuing with default values.");
        info!("Using default configuration");
        Self::default()
      }
    }
  }

  fn from_ini(map: &IniMap) -> Self {
    let mut config = Self::default();
    for (key, value) in map {
      info!("{} / {:?}", key, value);
    }

    let Some(section) = map.get(SECTION) else {
      warn!("No [{}] section in {}, using defaults", SECTION, CONF_FILE_NAME);
      return config;
    };

    if let Some(val) = section.get("limit").and_then(|v| v.as_ref()) {
      info!("Found limit config: {}", val);
      config.limit = parse_limit(val.trim());
      if config.limit.is_none() {
        warn!("Config limit '{}' is not a positive number of seconds, running without a limit", val);
      }
    }

    if let Some(val) = section.get("notifications").and_then(|v| v.as_ref()) {
      info!("Found notifications config: {}", val);
      config.notifications = parse_bool_config(val, "notifications", true);
    }

    config
  }
}

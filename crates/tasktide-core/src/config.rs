use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::calendar::{
  DEFAULT_AGENDA_LOOKAHEAD_DAYS,
  ViewMode,
  WeekStart
};
use crate::datetime::resolve_timezone;

const CONFIG_ENV_VAR: &str =
  "TASKTIDE_CONFIG";
const CONFIG_FILE_NAME: &str =
  "tasktide.toml";

fn calendar_default_week_start()
-> WeekStartSetting {
  WeekStartSetting::Index(1)
}

fn calendar_default_lookahead() -> u32 {
  DEFAULT_AGENDA_LOOKAHEAD_DAYS
}

fn calendar_default_day_cell_limit()
-> usize {
  3
}

fn calendar_default_view() -> String {
  "month".to_string()
}

fn data_default_owner() -> String {
  "me".to_string()
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Default, Deserialize,
)]
pub enum TimeFormat {
  #[serde(rename = "12h")]
  Hour12,
  #[default]
  #[serde(rename = "24h")]
  Hour24
}

impl TimeFormat {
  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key.trim() {
      | "12h" | "12" => Some(Self::Hour12),
      | "24h" | "24" => Some(Self::Hour24),
      | _ => None
    }
  }

  pub fn format(
    self,
    time: NaiveTime
  ) -> String {
    match self {
      | Self::Hour12 => {
        time.format("%-I:%M%P").to_string()
      }
      | Self::Hour24 => {
        time.format("%H:%M").to_string()
      }
    }
  }
}

/// Week start as written in the file: `1` or `"monday"`.
#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(untagged)]
pub enum WeekStartSetting {
  Index(i64),
  Name(String)
}

impl WeekStartSetting {
  fn resolve(&self) -> Option<WeekStart> {
    match self {
      | Self::Index(idx) => {
        WeekStart::from_index(*idx).ok()
      }
      | Self::Name(name) => {
        let trimmed = name.trim();
        trimmed
          .parse::<i64>()
          .ok()
          .and_then(|idx| {
            WeekStart::from_index(idx).ok()
          })
          .or_else(|| {
            WeekStart::from_name(trimmed)
          })
      }
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
pub struct CalendarSection {
  #[serde(
    default = "calendar_default_week_start"
  )]
  pub week_start:            WeekStartSetting,
  #[serde(
    default = "calendar_default_lookahead"
  )]
  pub agenda_lookahead_days: u32,
  #[serde(default)]
  pub time_format:           TimeFormat,
  pub timezone:              Option<String>,
  #[serde(
    default = "calendar_default_day_cell_limit"
  )]
  pub day_cell_limit:        usize,
  #[serde(
    default = "calendar_default_view"
  )]
  pub default_view:          String
}

impl Default for CalendarSection {
  fn default() -> Self {
    Self {
      week_start:
        calendar_default_week_start(),
      agenda_lookahead_days:
        calendar_default_lookahead(),
      time_format: TimeFormat::default(),
      timezone: None,
      day_cell_limit:
        calendar_default_day_cell_limit(),
      default_view:
        calendar_default_view()
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
pub struct DataSection {
  pub location: Option<PathBuf>,
  #[serde(default = "data_default_owner")]
  pub owner:    String
}

impl Default for DataSection {
  fn default() -> Self {
    Self {
      location: None,
      owner:    data_default_owner()
    }
  }
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub struct Config {
  #[serde(default)]
  pub calendar:    CalendarSection,
  #[serde(default)]
  pub data:        DataSection,
  #[serde(skip)]
  pub loaded_file: Option<PathBuf>
}

/// Read-only settings the calendar core consumes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct CalendarSettings {
  pub week_start:            WeekStart,
  pub agenda_lookahead_days: u32,
  pub time_format:           TimeFormat,
  pub timezone:              Tz,
  pub day_cell_limit:        usize
}

impl Default for CalendarSettings {
  fn default() -> Self {
    Self {
      week_start:            WeekStart::default(),
      agenda_lookahead_days:
        DEFAULT_AGENDA_LOOKAHEAD_DAYS,
      time_format:           TimeFormat::default(),
      timezone:              chrono_tz::UTC,
      day_cell_limit:
        calendar_default_day_cell_limit()
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(config_override)?
    else {
      warn!(
        "no tasktide.toml found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    let mut cfg = Self::load_file(&path)?;
    cfg.sanitize();
    Ok(cfg)
  }

  pub fn from_toml_str(
    raw: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Config =
      toml::from_str(raw)
        .context("failed to parse config")?;
    cfg.sanitize();
    Ok(cfg)
  }

  fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut cfg: Config =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;
    info!(
      config = %path.display(),
      week_start = ?cfg.calendar.week_start,
      lookahead = cfg.calendar.agenda_lookahead_days,
      "loaded config"
    );
    cfg.loaded_file = Some(path);
    Ok(cfg)
  }

  fn sanitize(&mut self) {
    if self
      .calendar
      .week_start
      .resolve()
      .is_none()
    {
      warn!(
        week_start = ?self.calendar.week_start,
        "invalid week_start; using monday"
      );
      self.calendar.week_start =
        calendar_default_week_start();
    }

    if self.calendar.agenda_lookahead_days
      == 0
    {
      warn!(
        "agenda_lookahead_days must be \
         positive; using default"
      );
      self
        .calendar
        .agenda_lookahead_days =
        calendar_default_lookahead();
    }

    if self.calendar.day_cell_limit == 0 {
      self.calendar.day_cell_limit =
        calendar_default_day_cell_limit();
    }

    if ViewMode::from_key(
      &self.calendar.default_view
    )
    .is_err()
    {
      warn!(
        view = %self.calendar.default_view,
        "unknown default_view; using month"
      );
      self.calendar.default_view =
        calendar_default_view();
    }
  }

  /// Applies `key=value` overrides from the command line.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");
      match key.as_str() {
        | "calendar.week_start" => {
          let setting =
            WeekStartSetting::Name(
              value.to_string()
            );
          if setting.resolve().is_none() {
            return Err(anyhow!(
              "invalid week_start override: \
               {value}"
            ));
          }
          self.calendar.week_start =
            setting;
        }
        | "calendar.agenda_lookahead_days" => {
          let days: u32 = value
            .parse()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
              anyhow!(
                "invalid lookahead \
                 override: {value}"
              )
            })?;
          self
            .calendar
            .agenda_lookahead_days = days;
        }
        | "calendar.time_format" => {
          self.calendar.time_format =
            TimeFormat::from_key(value)
              .ok_or_else(|| {
                anyhow!(
                  "invalid time_format \
                   override: {value}"
                )
              })?;
        }
        | "calendar.timezone" => {
          self.calendar.timezone =
            Some(value.to_string());
        }
        | "calendar.day_cell_limit" => {
          self.calendar.day_cell_limit =
            value
              .parse()
              .ok()
              .filter(|n| *n > 0)
              .ok_or_else(|| {
                anyhow!(
                  "invalid day_cell_limit \
                   override: {value}"
                )
              })?;
        }
        | "calendar.default_view" => {
          ViewMode::from_key(value)?;
          self.calendar.default_view =
            value.to_string();
        }
        | "data.location" => {
          self.data.location =
            Some(PathBuf::from(value));
        }
        | "data.owner" => {
          self.data.owner =
            value.to_string();
        }
        | _ => {
          warn!(key = %key, "ignoring unknown config override");
        }
      }
    }
    Ok(())
  }

  pub fn default_view(&self) -> ViewMode {
    ViewMode::from_key(
      &self.calendar.default_view
    )
    .unwrap_or_default()
  }

  pub fn settings(
    &self
  ) -> CalendarSettings {
    CalendarSettings {
      week_start: self
        .calendar
        .week_start
        .resolve()
        .unwrap_or_default(),
      agenda_lookahead_days: self
        .calendar
        .agenda_lookahead_days,
      time_format: self
        .calendar
        .time_format,
      timezone: resolve_timezone(
        self.calendar.timezone.as_deref()
      ),
      day_cell_limit: self
        .calendar
        .day_cell_limit
    }
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.data.location.as_deref()
  {
    expand_tilde(cfg_value)
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      env_path
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    return Ok(None);
  };
  let candidate = config_dir
    .join("tasktide")
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::data_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine data \
         directory"
      )
    })?;
  Ok(base.join("tasktide"))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

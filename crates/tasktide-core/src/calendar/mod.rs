//! Date math and task grouping behind the calendar views.

pub mod binning;
pub mod filter;
pub mod navigate;
pub mod range;
pub mod reschedule;
pub mod stats;

use std::fmt;

use chrono::Weekday;

use crate::datetime::parse_weekday_name;
use crate::error::{
  CalendarError,
  CalendarResult
};

pub use binning::{
  DayCell,
  TaskDateIndex,
  bin,
  sorted_for_display,
  tasks_for_date,
  tasks_in_range
};
pub use filter::{
  CalendarFilterSet,
  FilterUpdate
};
pub use navigate::{
  Direction,
  step
};
pub use range::{
  DateRange,
  compute_range
};
pub use reschedule::{
  ReschedulePlan,
  TimeSlot,
  compute_new_due,
  plan_reschedule,
  validate_drop
};
pub use stats::CalendarStats;

pub const DEFAULT_AGENDA_LOOKAHEAD_DAYS:
  u32 = 30;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
pub enum ViewMode {
  #[default]
  Month,
  Week,
  Day,
  Agenda
}

impl ViewMode {
  pub fn all() -> [Self; 4] {
    [
      Self::Month,
      Self::Week,
      Self::Day,
      Self::Agenda
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week",
      | Self::Day => "day",
      | Self::Agenda => "agenda"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Month => "Month",
      | Self::Week => "Week",
      | Self::Day => "Day",
      | Self::Agenda => "Agenda"
    }
  }

  pub fn from_key(
    key: &str
  ) -> CalendarResult<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "month" => Ok(Self::Month),
      | "week" => Ok(Self::Week),
      | "day" => Ok(Self::Day),
      | "agenda" | "list" => {
        Ok(Self::Agenda)
      }
      | _ => Err(
        CalendarError::InvalidViewMode(
          key.to_string()
        )
      )
    }
  }
}

impl fmt::Display for ViewMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl std::str::FromStr for ViewMode {
  type Err = CalendarError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_key(s)
  }
}

/// First day of the week, stored as a chrono weekday but exchanged as
/// 0-6 with 0 = Sunday.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct WeekStart(Weekday);

impl Default for WeekStart {
  fn default() -> Self {
    Self(Weekday::Mon)
  }
}

impl WeekStart {
  pub const MONDAY: Self =
    Self(Weekday::Mon);
  pub const SUNDAY: Self =
    Self(Weekday::Sun);

  pub fn from_index(
    index: i64
  ) -> CalendarResult<Self> {
    let day = match index {
      | 0 => Weekday::Sun,
      | 1 => Weekday::Mon,
      | 2 => Weekday::Tue,
      | 3 => Weekday::Wed,
      | 4 => Weekday::Thu,
      | 5 => Weekday::Fri,
      | 6 => Weekday::Sat,
      | other => {
        return Err(
          CalendarError::InvalidWeekStart(
            other
          )
        );
      }
    };
    Ok(Self(day))
  }

  pub fn from_name(
    name: &str
  ) -> Option<Self> {
    parse_weekday_name(
      &name.trim().to_ascii_lowercase()
    )
    .map(Self)
  }

  pub fn index(self) -> u8 {
    self.0.num_days_from_sunday() as u8
  }

  pub fn weekday(self) -> Weekday {
    self.0
  }
}

impl From<Weekday> for WeekStart {
  fn from(day: Weekday) -> Self {
    Self(day)
  }
}

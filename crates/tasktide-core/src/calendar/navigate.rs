use chrono::{
  Datelike,
  NaiveDate
};

use super::ViewMode;
use super::range::days_in_month;
use crate::datetime::add_days;
use crate::error::{
  CalendarError,
  CalendarResult
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Direction {
  Previous,
  Next
}

impl Direction {
  pub fn sign(self) -> i64 {
    match self {
      | Self::Previous => -1,
      | Self::Next => 1
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
      | "prev" | "previous" | "back" => {
        Ok(Self::Previous)
      }
      | "next" | "forward" => {
        Ok(Self::Next)
      }
      | _ => Err(
        CalendarError::InvalidDirection(
          key.to_string()
        )
      )
    }
  }
}

/// Anchor one period before or after `anchor`. Agenda pages by its whole
/// window so consecutive pages neither overlap nor leave gaps.
pub fn step(
  anchor: NaiveDate,
  view: ViewMode,
  direction: Direction,
  lookahead_days: u32
) -> CalendarResult<NaiveDate> {
  let sign = direction.sign();
  match view {
    | ViewMode::Month => {
      shift_months(anchor, sign as i32)
    }
    | ViewMode::Week => {
      add_days(anchor, sign * 7)
    }
    | ViewMode::Day => {
      add_days(anchor, sign)
    }
    | ViewMode::Agenda => {
      if lookahead_days == 0 {
        return Err(
          CalendarError::InvalidLookahead(
            lookahead_days
          )
        );
      }
      add_days(
        anchor,
        sign * i64::from(lookahead_days)
      )
    }
  }
}

/// Moves by whole months, clamping the day to the target month's length.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> CalendarResult<NaiveDate> {
  let total = i64::from(date.year()) * 12
    + i64::from(date.month0())
    + i64::from(months);
  let year = i32::try_from(
    total.div_euclid(12)
  )
  .map_err(|_| {
    CalendarError::DateOutOfRange(date)
  })?;
  let month =
    total.rem_euclid(12) as u32 + 1;
  let day = date.day().min(
    days_in_month(year, month).map_err(
      |_| {
        CalendarError::DateOutOfRange(
          date
        )
      }
    )?
  );
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .ok_or(CalendarError::DateOutOfRange(
    date
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn month_step_clamps_short_months() {
    assert_eq!(
      step(
        day(2024, 1, 31),
        ViewMode::Month,
        Direction::Next,
        30
      )
      .expect("step"),
      day(2024, 2, 29)
    );
    assert_eq!(
      step(
        day(2023, 1, 31),
        ViewMode::Month,
        Direction::Next,
        30
      )
      .expect("step"),
      day(2023, 2, 28)
    );
    assert_eq!(
      step(
        day(2024, 3, 31),
        ViewMode::Month,
        Direction::Previous,
        30
      )
      .expect("step"),
      day(2024, 2, 29)
    );
  }

  #[test]
  fn month_step_crosses_year_boundaries() {
    assert_eq!(
      shift_months(day(2024, 12, 15), 1)
        .expect("shift"),
      day(2025, 1, 15)
    );
    assert_eq!(
      shift_months(day(2024, 1, 15), -1)
        .expect("shift"),
      day(2023, 12, 15)
    );
    assert_eq!(
      shift_months(day(2024, 2, 29), 12)
        .expect("shift"),
      day(2025, 2, 28)
    );
  }

  #[test]
  fn week_day_and_agenda_steps() {
    let anchor = day(2024, 1, 10);
    assert_eq!(
      step(
        anchor,
        ViewMode::Week,
        Direction::Previous,
        30
      )
      .expect("step"),
      day(2024, 1, 3)
    );
    assert_eq!(
      step(
        anchor,
        ViewMode::Day,
        Direction::Next,
        30
      )
      .expect("step"),
      day(2024, 1, 11)
    );
    assert_eq!(
      step(
        anchor,
        ViewMode::Agenda,
        Direction::Next,
        30
      )
      .expect("step"),
      day(2024, 2, 9)
    );
  }

  #[test]
  fn next_then_previous_returns_to_anchor() {
    let mut anchor = day(2023, 11, 1);
    for _ in 0..120 {
      for view in ViewMode::all() {
        if view == ViewMode::Month
          && anchor.day() > 28
        {
          continue;
        }
        let forward = step(
          anchor,
          view,
          Direction::Next,
          21
        )
        .expect("forward");
        let back = step(
          forward,
          view,
          Direction::Previous,
          21
        )
        .expect("back");
        assert_eq!(back, anchor, "{view}");
      }
      anchor = anchor
        .succ_opt()
        .expect("next day");
    }
  }

  #[test]
  fn direction_keys() {
    assert_eq!(
      Direction::from_key("prev")
        .expect("prev"),
      Direction::Previous
    );
    assert!(
      Direction::from_key("sideways")
        .is_err()
    );
  }
}

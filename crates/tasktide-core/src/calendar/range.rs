use chrono::{
  Datelike,
  NaiveDate,
  NaiveDateTime
};

use super::{
  ViewMode,
  WeekStart
};
use crate::datetime::{
  add_days,
  end_of_day,
  start_of_day
};
use crate::error::{
  CalendarError,
  CalendarResult
};

/// Inclusive span of local wall-clock time a view shows. Only built by
/// [`compute_range`], so `start <= end` always holds.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DateRange {
  start: NaiveDateTime,
  end:   NaiveDateTime
}

impl DateRange {
  fn from_days(
    first: NaiveDate,
    last: NaiveDate
  ) -> Self {
    debug_assert!(first <= last);
    Self {
      start: start_of_day(first),
      end:   end_of_day(last)
    }
  }

  pub fn start(&self) -> NaiveDateTime {
    self.start
  }

  pub fn end(&self) -> NaiveDateTime {
    self.end
  }

  pub fn start_date(&self) -> NaiveDate {
    self.start.date()
  }

  pub fn end_date(&self) -> NaiveDate {
    self.end.date()
  }

  pub fn contains_date(
    &self,
    day: NaiveDate
  ) -> bool {
    day >= self.start_date()
      && day <= self.end_date()
  }

  pub fn day_count(&self) -> i64 {
    (self.end_date() - self.start_date())
      .num_days()
      + 1
  }

  pub fn days(
    &self
  ) -> impl Iterator<Item = NaiveDate> + '_ {
    self
      .start_date()
      .iter_days()
      .take(self.day_count() as usize)
  }
}

/// Visible range for `view` anchored on `anchor`.
pub fn compute_range(
  anchor: NaiveDate,
  view: ViewMode,
  week_start: WeekStart,
  lookahead_days: u32
) -> CalendarResult<DateRange> {
  let (first, last) = date_window(
    anchor,
    view,
    week_start,
    lookahead_days
  )?;
  Ok(DateRange::from_days(first, last))
}

fn date_window(
  anchor: NaiveDate,
  view: ViewMode,
  week_start: WeekStart,
  lookahead_days: u32
) -> CalendarResult<(NaiveDate, NaiveDate)>
{
  match view {
    | ViewMode::Month => {
      Ok((
        first_day_of_month(
          anchor.year(),
          anchor.month()
        )?,
        last_day_of_month(
          anchor.year(),
          anchor.month()
        )?
      ))
    }
    | ViewMode::Week => {
      let start = start_of_week(
        anchor, week_start
      )?;
      Ok((start, add_days(start, 6)?))
    }
    | ViewMode::Day => {
      Ok((anchor, anchor))
    }
    | ViewMode::Agenda => {
      if lookahead_days == 0 {
        return Err(
          CalendarError::InvalidLookahead(
            lookahead_days
          )
        );
      }
      let end = add_days(
        anchor,
        i64::from(lookahead_days) - 1
      )?;
      Ok((anchor, end))
    }
  }
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> CalendarResult<NaiveDate> {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .ok_or_else(|| {
    CalendarError::InvalidDate(format!(
      "{year}-{month:02}"
    ))
  })
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> CalendarResult<NaiveDate> {
  let first =
    first_day_of_month(year, month)?;
  let (next_year, next_month) =
    if month >= 12 {
      (year.checked_add(1), 1_u32)
    } else {
      (Some(year), month + 1)
    };
  let next_first = next_year
    .and_then(|y| {
      NaiveDate::from_ymd_opt(
        y, next_month, 1
      )
    })
    .ok_or(
      CalendarError::DateOutOfRange(first)
    )?;
  add_days(next_first, -1)
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> CalendarResult<u32> {
  Ok(last_day_of_month(year, month)?.day())
}

/// The `week_start`-aligned day on or before `day`.
pub fn start_of_week(
  day: NaiveDate,
  week_start: WeekStart
) -> CalendarResult<NaiveDate> {
  let day_idx = day
    .weekday()
    .num_days_from_sunday()
    as i64;
  let start_idx =
    i64::from(week_start.index());
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

/// Whole weeks covering the anchor's month, adjacent-month days included.
/// Presentation only; the month's range stays [`compute_range`]'s.
pub fn month_grid(
  anchor: NaiveDate,
  week_start: WeekStart
) -> CalendarResult<Vec<NaiveDate>> {
  let first = first_day_of_month(
    anchor.year(),
    anchor.month()
  )?;
  let last = last_day_of_month(
    anchor.year(),
    anchor.month()
  )?;
  let grid_start =
    start_of_week(first, week_start)?;
  let grid_end = add_days(
    start_of_week(last, week_start)?,
    6
  )?;
  let len =
    (grid_end - grid_start).num_days() + 1;
  Ok(
    grid_start
      .iter_days()
      .take(len as usize)
      .collect()
  )
}

pub fn title_for_view(
  anchor: NaiveDate,
  view: ViewMode,
  week_start: WeekStart,
  lookahead_days: u32
) -> CalendarResult<String> {
  let range = compute_range(
    anchor,
    view,
    week_start,
    lookahead_days
  )?;
  let title = match view {
    | ViewMode::Month => {
      anchor
        .format("%B %Y")
        .to_string()
    }
    | ViewMode::Week => {
      format!(
        "Week {} - {}",
        range
          .start_date()
          .format("%Y-%m-%d"),
        range
          .end_date()
          .format("%Y-%m-%d")
      )
    }
    | ViewMode::Day => {
      anchor
        .format("%A, %Y-%m-%d")
        .to_string()
    }
    | ViewMode::Agenda => {
      format!(
        "Agenda {} - {}",
        range
          .start_date()
          .format("%Y-%m-%d"),
        range
          .end_date()
          .format("%Y-%m-%d")
      )
    }
  };
  Ok(title)
}

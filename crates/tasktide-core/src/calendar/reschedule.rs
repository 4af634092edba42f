use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  NaiveDate,
  NaiveTime,
  Utc
};
use chrono_tz::Tz;
use tasktide_shared::TaskPatch;

use crate::datetime::{
  local_naive,
  parse_clock_time,
  to_utc_from_local
};
use crate::error::{
  CalendarError,
  CalendarResult
};
use crate::task::{
  Task,
  TaskId,
  format_due_timestamp
};

/// Hour and minute a task is dropped onto in the day/week grids.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct TimeSlot {
  hour:   u32,
  minute: u32
}

impl TimeSlot {
  pub fn new(
    hour: u32,
    minute: u32
  ) -> CalendarResult<Self> {
    if hour > 23 || minute > 59 {
      return Err(
        CalendarError::InvalidTimeSlot {
          hour,
          minute
        }
      );
    }
    Ok(Self {
      hour,
      minute
    })
  }

  pub fn hour(self) -> u32 {
    self.hour
  }

  pub fn minute(self) -> u32 {
    self.minute
  }

  pub fn time(self) -> NaiveTime {
    NaiveTime::from_hms_opt(
      self.hour,
      self.minute,
      0
    )
    .unwrap_or(NaiveTime::MIN)
  }
}

impl FromStr for TimeSlot {
  type Err = CalendarError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (hour, minute) =
      parse_clock_time(s).ok_or_else(
        || {
          CalendarError::InvalidDate(
            format!(
              "unrecognized time '{s}'; \
               expected HH:MM or H:MMam/pm"
            )
          )
        }
      )?;
    Self::new(hour, minute)
  }
}

impl fmt::Display for TimeSlot {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:02}:{:02}",
      self.hour, self.minute
    )
  }
}

/// Outcome of a valid drop, handed to the task backend for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ReschedulePlan {
  pub task_id:      TaskId,
  pub previous_due: Option<DateTime<Utc>>,
  pub new_due:      DateTime<Utc>
}

impl ReschedulePlan {
  pub fn patch(&self) -> TaskPatch {
    TaskPatch::due(Some(
      format_due_timestamp(self.new_due)
    ))
  }

  pub fn is_noop(&self) -> bool {
    self.previous_due
      == Some(self.new_due)
  }
}

/// Rejects drops with nothing dragged or no target. Past targets are
/// allowed; overdue is a display concern.
pub fn validate_drop(
  task: Option<&Task>,
  target: Option<NaiveDate>
) -> CalendarResult<()> {
  if task.is_none() {
    return Err(
      CalendarError::NothingDragged
    );
  }
  if target.is_none() {
    return Err(
      CalendarError::MissingDropTarget
    );
  }
  Ok(())
}

/// New due instant for `task` moved to `target`. Without a slot the
/// task's local time-of-day is kept; an undated task lands on local
/// midnight.
pub fn compute_new_due(
  task: &Task,
  target: NaiveDate,
  slot: Option<TimeSlot>,
  tz: Tz
) -> CalendarResult<DateTime<Utc>> {
  let time = match (slot, task.due) {
    | (Some(slot), _) => slot.time(),
    | (None, Some(due)) => {
      local_naive(due, tz).time()
    }
    | (None, None) => NaiveTime::MIN
  };

  to_utc_from_local(
    target.and_time(time),
    tz,
    "reschedule"
  )
}

pub fn plan_reschedule(
  task: &Task,
  target: NaiveDate,
  slot: Option<TimeSlot>,
  tz: Tz
) -> CalendarResult<ReschedulePlan> {
  let new_due = compute_new_due(
    task, target, slot, tz
  )?;
  tracing::debug!(
    task = %task.id,
    previous = ?task.due,
    new_due = %new_due,
    "planned reschedule"
  );
  Ok(ReschedulePlan {
    task_id: task.id.clone(),
    previous_due: task.due,
    new_due
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn at(
    y: i32,
    m: u32,
    d: u32,
    h: u32,
    min: u32
  ) -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(y, m, d, h, min, 0)
      .single()
      .expect("valid timestamp")
  }

  #[test]
  fn drop_without_slot_keeps_time_of_day() {
    let task = Task::new("t", "call")
      .with_due(at(2024, 1, 5, 14, 30));
    let due = compute_new_due(
      &task,
      day(2024, 1, 10),
      None,
      chrono_tz::UTC
    )
    .expect("new due");
    assert_eq!(due, at(2024, 1, 10, 14, 30));
  }

  #[test]
  fn local_time_of_day_survives_dst_change()
  {
    let tz = chrono_tz::America::New_York;
    let task = Task::new("t", "call")
      .with_due(at(2024, 3, 5, 19, 30));
    let due = compute_new_due(
      &task,
      day(2024, 3, 12),
      None,
      tz
    )
    .expect("new due");
    assert_eq!(due, at(2024, 3, 12, 18, 30));
  }

  #[test]
  fn slot_overrides_time_and_undated_lands_on_midnight()
  {
    let task = Task::new("t", "call")
      .with_due(at(2024, 1, 5, 14, 30));
    let slot: TimeSlot =
      "9:15am".parse().expect("slot");
    assert_eq!(
      compute_new_due(
        &task,
        day(2024, 1, 10),
        Some(slot),
        chrono_tz::UTC
      )
      .expect("new due"),
      at(2024, 1, 10, 9, 15)
    );

    let undated = Task::new("u", "idea");
    assert_eq!(
      compute_new_due(
        &undated,
        day(2024, 1, 10),
        None,
        chrono_tz::UTC
      )
      .expect("new due"),
      at(2024, 1, 10, 0, 0)
    );
  }

  #[test]
  fn validate_drop_rules() {
    let task = Task::new("t", "x");
    assert!(matches!(
      validate_drop(None, Some(day(2024, 1, 1))),
      Err(CalendarError::NothingDragged)
    ));
    assert!(matches!(
      validate_drop(Some(&task), None),
      Err(
        CalendarError::MissingDropTarget
      )
    ));
    validate_drop(
      Some(&task),
      Some(day(1999, 1, 1))
    )
    .expect("past dates are allowed");
  }

  #[test]
  fn time_slot_bounds() {
    assert!(TimeSlot::new(24, 0).is_err());
    assert!(TimeSlot::new(7, 60).is_err());
    assert_eq!(
      TimeSlot::new(7, 5)
        .expect("slot")
        .to_string(),
      "07:05"
    );
  }

  #[test]
  fn plan_builds_due_patch() {
    let task = Task::new("t", "x")
      .with_due(at(2024, 1, 5, 14, 30));
    let plan = plan_reschedule(
      &task,
      day(2024, 1, 10),
      None,
      chrono_tz::UTC
    )
    .expect("plan");
    assert!(!plan.is_noop());
    assert_eq!(
      plan.patch().due,
      Some(Some(
        "2024-01-10T14:30:00.000Z"
          .to_string()
      ))
    );
  }
}

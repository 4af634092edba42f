use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use super::DateRange;
use crate::datetime::local_date;
use crate::task::Task;

/// Tasks grouped by the local calendar day they are due. Buckets keep
/// the input order; sorting is a query-time concern.
#[derive(
  Debug, Clone, Default, PartialEq,
)]
pub struct TaskDateIndex {
  buckets: BTreeMap<NaiveDate, Vec<Task>>
}

impl TaskDateIndex {
  pub fn get(
    &self,
    day: NaiveDate
  ) -> &[Task] {
    self
      .buckets
      .get(&day)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn dates(
    &self
  ) -> impl Iterator<Item = NaiveDate> + '_
  {
    self.buckets.keys().copied()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (NaiveDate, &[Task])>
  {
    self.buckets.iter().map(
      |(day, tasks)| {
        (*day, tasks.as_slice())
      }
    )
  }

  pub fn len(&self) -> usize {
    self.buckets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buckets.is_empty()
  }

  /// Number of binned tasks across all buckets.
  pub fn task_count(&self) -> usize {
    self
      .buckets
      .values()
      .map(Vec::len)
      .sum()
  }
}

pub fn bin(
  tasks: &[Task],
  tz: Tz
) -> TaskDateIndex {
  let mut buckets: BTreeMap<
    NaiveDate,
    Vec<Task>
  > = BTreeMap::new();
  for task in tasks {
    let Some(due) = task.due else {
      continue;
    };
    buckets
      .entry(local_date(due, tz))
      .or_default()
      .push(task.clone());
  }

  tracing::trace!(
    total_tasks = tasks.len(),
    days = buckets.len(),
    "binned tasks by due date"
  );
  TaskDateIndex {
    buckets
  }
}

pub fn tasks_for_date(
  tasks: &[Task],
  day: NaiveDate,
  tz: Tz
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|task| {
      task
        .due
        .is_some_and(|due| {
          local_date(due, tz) == day
        })
    })
    .cloned()
    .collect()
}

/// Tasks whose local due date is one of the range's days, in input
/// order. Agrees with `bin` and `tasks_for_date` at every instant.
pub fn tasks_in_range(
  tasks: &[Task],
  range: &DateRange,
  tz: Tz
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|task| {
      task.due.is_some_and(|due| {
        range.contains_date(local_date(
          due, tz
        ))
      })
    })
    .cloned()
    .collect()
}

/// Display order within a day: due time, then higher priority first.
/// Undated tasks sink to the end. Ties keep input order.
pub fn sorted_for_display(
  tasks: &[Task]
) -> Vec<Task> {
  let mut sorted = tasks.to_vec();
  sorted.sort_by_key(|task| {
    (
      task.due.is_none(),
      task.due,
      Reverse(task.priority)
    )
  });
  sorted
}

/// One calendar cell: what fits, plus how many were cut.
#[derive(
  Debug, Clone, PartialEq,
)]
pub struct DayCell {
  pub shown:    Vec<Task>,
  pub overflow: usize
}

impl DayCell {
  pub fn truncate(
    tasks: &[Task],
    limit: usize
  ) -> Self {
    let shown = tasks
      .iter()
      .take(limit)
      .cloned()
      .collect::<Vec<_>>();
    let overflow =
      tasks.len().saturating_sub(limit);
    Self {
      shown,
      overflow
    }
  }

  pub fn overflow_label(
    &self
  ) -> Option<String> {
    (self.overflow > 0).then(|| {
      format!("+{} more", self.overflow)
    })
  }
}

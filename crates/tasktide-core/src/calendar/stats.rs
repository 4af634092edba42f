use crate::task::{
  Status,
  Task
};

/// Per-status counts for the tasks of a visible period.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct CalendarStats {
  pub total:       usize,
  pub pending:     usize,
  pub in_progress: usize,
  pub completed:   usize,
  pub failed:      usize
}

impl CalendarStats {
  pub fn summarize(
    tasks: &[Task]
  ) -> Self {
    let mut stats = Self::default();
    for task in tasks {
      stats.push(task.status);
    }
    stats
  }

  pub fn push(&mut self, status: Status) {
    self.total =
      self.total.saturating_add(1);
    let slot = match status {
      | Status::Pending => {
        &mut self.pending
      }
      | Status::InProgress => {
        &mut self.in_progress
      }
      | Status::Completed => {
        &mut self.completed
      }
      | Status::Failed => &mut self.failed
    };
    *slot = slot.saturating_add(1);
  }

  /// Share of the period already completed, 0.0 when empty.
  pub fn completion_ratio(&self) -> f64 {
    if self.total == 0 {
      return 0.0;
    }
    self.completed as f64
      / self.total as f64
  }
}

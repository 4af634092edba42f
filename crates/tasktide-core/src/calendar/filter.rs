use std::collections::BTreeSet;

use crate::task::{
  Priority,
  Status,
  Task,
  normalize_tag
};

/// Compound calendar filter. An empty dimension filters nothing.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct CalendarFilterSet {
  pub priority: BTreeSet<Priority>,
  pub status:   BTreeSet<Status>,
  pub tags:     BTreeSet<String>
}

/// Replacement value for one filter dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
  Priority(BTreeSet<Priority>),
  Status(BTreeSet<Status>),
  Tags(BTreeSet<String>)
}

impl CalendarFilterSet {
  pub fn is_empty(&self) -> bool {
    self.priority.is_empty()
      && self.status.is_empty()
      && self.tags.is_empty()
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }

  pub fn update(
    &mut self,
    update: FilterUpdate
  ) {
    match update {
      | FilterUpdate::Priority(set) => {
        self.priority = set;
      }
      | FilterUpdate::Status(set) => {
        self.status = set;
      }
      | FilterUpdate::Tags(set) => {
        self.tags = set
          .into_iter()
          .map(|tag| normalize_tag(&tag))
          .filter(|tag| !tag.is_empty())
          .collect();
      }
    }
  }

  pub fn toggle_priority(
    &mut self,
    priority: Priority
  ) {
    if !self.priority.remove(&priority) {
      self.priority.insert(priority);
    }
  }

  pub fn toggle_status(
    &mut self,
    status: Status
  ) {
    if !self.status.remove(&status) {
      self.status.insert(status);
    }
  }

  pub fn toggle_tag(
    &mut self,
    tag: &str
  ) {
    let tag = normalize_tag(tag);
    if tag.is_empty() {
      return;
    }
    if !self.tags.remove(&tag) {
      self.tags.insert(tag);
    }
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    let priority_match = self
      .priority
      .is_empty()
      || self
        .priority
        .contains(&task.priority);

    let status_match = self
      .status
      .is_empty()
      || self.status.contains(&task.status);

    let tags_match = self.tags.is_empty()
      || self
        .tags
        .iter()
        .any(|tag| task.has_tag(tag));

    priority_match
      && status_match
      && tags_match
  }
}

/// Tasks passing every dimension of `filters`, in input order.
pub fn apply(
  tasks: &[Task],
  filters: &CalendarFilterSet
) -> Vec<Task> {
  if filters.is_empty() {
    return tasks.to_vec();
  }

  tasks
    .iter()
    .filter(|task| filters.matches(task))
    .cloned()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Vec<Task> {
    vec![
      Task::new("1", "deploy")
        .with_priority(Priority::High)
        .with_status(Status::InProgress)
        .with_tags(["work", "urgent"]),
      Task::new("2", "groceries")
        .with_priority(Priority::Low)
        .with_tags(["home"]),
      Task::new("3", "retro")
        .with_status(Status::Completed)
        .with_tags(["work"]),
      Task::new("4", "untagged")
        .with_status(Status::Failed),
    ]
  }

  fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks
      .iter()
      .map(|t| t.id.as_str())
      .collect()
  }

  #[test]
  fn empty_filter_is_identity() {
    let tasks = sample();
    assert_eq!(
      apply(
        &tasks,
        &CalendarFilterSet::default()
      ),
      tasks
    );
  }

  #[test]
  fn tags_match_on_any_shared_tag() {
    let task = Task::new("t", "x")
      .with_tags(["work", "urgent"]);

    let mut hit =
      CalendarFilterSet::default();
    hit.update(FilterUpdate::Tags(
      ["urgent", "home"]
        .into_iter()
        .map(String::from)
        .collect()
    ));
    assert!(hit.matches(&task));

    let mut miss =
      CalendarFilterSet::default();
    miss.update(FilterUpdate::Tags(
      ["home", "personal"]
        .into_iter()
        .map(String::from)
        .collect()
    ));
    assert!(!miss.matches(&task));
  }

  #[test]
  fn non_ascii_tags_match_in_any_case() {
    let tasks = vec![
      Task::new("1", "picnic")
        .with_tags(["Été"]),
      Task::new("2", "ski")
        .with_tags(["Hiver"]),
    ];

    let mut toggled =
      CalendarFilterSet::default();
    toggled.toggle_tag("ÉTÉ");
    assert_eq!(
      ids(&apply(&tasks, &toggled)),
      vec!["1"]
    );

    let mut replaced =
      CalendarFilterSet::default();
    replaced.update(FilterUpdate::Tags(
      ["Été".to_string()]
        .into_iter()
        .collect()
    ));
    assert!(replaced.tags.contains("été"));
    assert_eq!(
      ids(&apply(&tasks, &replaced)),
      vec!["1"]
    );
  }

  #[test]
  fn dimensions_are_anded() {
    let tasks = sample();
    let mut filters =
      CalendarFilterSet::default();
    filters.toggle_tag("Work");
    assert_eq!(
      ids(&apply(&tasks, &filters)),
      vec!["1", "3"]
    );

    filters.toggle_status(
      Status::Completed
    );
    assert_eq!(
      ids(&apply(&tasks, &filters)),
      vec!["3"]
    );

    filters.toggle_priority(
      Priority::High
    );
    assert!(
      apply(&tasks, &filters).is_empty()
    );
  }

  #[test]
  fn toggling_twice_and_clear_restore_everything()
  {
    let tasks = sample();
    let mut filters =
      CalendarFilterSet::default();
    filters.toggle_priority(Priority::Low);
    filters.toggle_priority(Priority::Low);
    assert!(filters.is_empty());

    filters.toggle_status(Status::Failed);
    filters.toggle_tag(" home ");
    assert!(
      apply(&tasks, &filters).is_empty()
    );

    filters.clear();
    assert_eq!(
      apply(&tasks, &filters).len(),
      tasks.len()
    );
  }
}

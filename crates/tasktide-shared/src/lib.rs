use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
  #[serde(alias = "todo")]
  Pending,
  #[serde(
    alias = "in_progress",
    alias = "inprogress"
  )]
  InProgress,
  #[serde(alias = "done")]
  Completed,
  Failed
}

impl TaskStatus {
  pub fn all() -> [Self; 4] {
    [
      Self::Pending,
      Self::InProgress,
      Self::Completed,
      Self::Failed
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Pending => "pending",
      | Self::InProgress => {
        "in-progress"
      }
      | Self::Completed => "completed",
      | Self::Failed => "failed"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "pending" | "todo" => {
        Some(Self::Pending)
      }
      | "in-progress"
      | "in_progress"
      | "inprogress" => {
        Some(Self::InProgress)
      }
      | "completed" | "done" => {
        Some(Self::Completed)
      }
      | "failed" => Some(Self::Failed),
      | _ => None
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High
}

impl TaskPriority {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Low => "low",
      | Self::Medium => "medium",
      | Self::High => "high"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" | "l" => Some(Self::Low),
      | "medium" | "m" => {
        Some(Self::Medium)
      }
      | "high" | "h" => Some(Self::High),
      | _ => None
    }
  }
}

/// Task as the backend sends it. Older payloads carry `_id`, newer ones
/// carry `id`; both are kept so the core can pick one.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct TaskDto {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub id:          Option<String>,
  #[serde(
    rename = "_id",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub legacy_id:   Option<String>,
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub status:      Option<TaskStatus>,
  #[serde(default)]
  pub priority:    Option<TaskPriority>,
  #[serde(default)]
  pub tags:        Vec<String>,
  #[serde(default)]
  pub due:         Option<String>,
  #[serde(default)]
  pub project:     Option<String>
}

impl TaskDto {
  /// The identity every consumer should key on: a non-blank `_id`
  /// wins over `id`, trimmed.
  pub fn canonical_id(&self) -> Option<&str> {
    [&self.legacy_id, &self.id]
      .into_iter()
      .filter_map(|id| id.as_deref())
      .map(str::trim)
      .find(|id| !id.is_empty())
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct TaskCreate {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub project:     Option<String>,
  #[serde(default)]
  pub tags:        Vec<String>,
  pub priority:    Option<TaskPriority>,
  pub status:      Option<TaskStatus>,
  pub due:         Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct TaskPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub status:      Option<TaskStatus>,
  pub priority:    Option<TaskPriority>,
  pub tags:        Option<Vec<String>>,
  pub project: Option<Option<String>>,
  pub due: Option<Option<String>>
}

impl TaskPatch {
  pub fn due(
    due: Option<String>
  ) -> Self {
    Self {
      due: Some(due),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn task_dto_accepts_legacy_identity_field()
  {
    let raw = r#"{
      "_id": "65a1",
      "title": "Ship calendar",
      "status": "in_progress",
      "priority": "high",
      "tags": ["work"],
      "due": "2024-01-05T10:00:00Z"
    }"#;

    let dto: TaskDto =
      serde_json::from_str(raw)
        .expect("parse dto");
    assert_eq!(
      dto.legacy_id.as_deref(),
      Some("65a1")
    );
    assert_eq!(dto.id, None);
    assert_eq!(
      dto.status,
      Some(TaskStatus::InProgress)
    );
    assert_eq!(
      dto.priority,
      Some(TaskPriority::High)
    );
  }

  #[test]
  fn canonical_id_prefers_non_blank_legacy_id()
  {
    let both = TaskDto {
      id: Some("new".into()),
      legacy_id: Some(" old ".into()),
      ..TaskDto::default()
    };
    assert_eq!(
      both.canonical_id(),
      Some("old")
    );

    let blank_legacy = TaskDto {
      id: Some("new".into()),
      legacy_id: Some("  ".into()),
      ..TaskDto::default()
    };
    assert_eq!(
      blank_legacy.canonical_id(),
      Some("new")
    );

    assert_eq!(
      TaskDto::default().canonical_id(),
      None
    );
  }

  #[test]
  fn status_serializes_kebab_case() {
    let json = serde_json::to_string(
      &TaskStatus::InProgress
    )
    .expect("serialize");
    assert_eq!(json, "\"in-progress\"");
    assert_eq!(
      TaskStatus::from_key("done"),
      Some(TaskStatus::Completed)
    );
  }

  #[test]
  fn due_patch_distinguishes_clear_from_unset()
  {
    let clear = TaskPatch::due(None);
    assert_eq!(clear.due, Some(None));
    assert!(!clear.is_empty());
    assert!(
      TaskPatch::default().is_empty()
    );
  }
}

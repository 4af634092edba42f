use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tasktide_shared::{TaskDto, TaskPatch};

use crate::error::{CalendarError, CalendarResult};

pub use tasktide_shared::{TaskPriority as Priority, TaskStatus as Status};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub due: Option<DateTime<Utc>>,
    pub project: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(id),
            title: title.into(),
            description: String::new(),
            status: Status::Pending,
            priority: Priority::Medium,
            tags: vec![],
            due: None,
            project: None,
        }
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = normalize_tag(tag);
        self.tags.iter().any(|t| normalize_tag(t) == wanted)
    }

    /// Applies a backend patch in place. `due` strings go through the same
    /// parser as incoming DTOs so both paths agree on accepted formats.
    pub fn apply_patch(&mut self, patch: &TaskPatch) -> CalendarResult<()> {
        if let Some(title) = patch.title.as_ref() {
            self.title = title.clone();
        }
        if let Some(description) = patch.description.as_ref() {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(tags) = patch.tags.as_ref() {
            self.tags = normalize_tags(tags);
        }
        if let Some(project) = patch.project.as_ref() {
            self.project = project.clone();
        }
        if let Some(due) = patch.due.as_ref() {
            self.due = due.as_deref().map(parse_due_timestamp).transpose()?;
        }
        Ok(())
    }

    pub fn to_dto(&self) -> TaskDto {
        TaskDto {
            id: Some(self.id.to_string()),
            legacy_id: None,
            title: self.title.clone(),
            description: self.description.clone(),
            status: Some(self.status),
            priority: Some(self.priority),
            tags: self.tags.clone(),
            due: self.due.map(format_due_timestamp),
            project: self.project.clone(),
        }
    }
}

impl TryFrom<TaskDto> for Task {
    type Error = CalendarError;

    fn try_from(dto: TaskDto) -> Result<Self, Self::Error> {
        let id = dto
            .canonical_id()
            .map(TaskId::new)
            .ok_or_else(|| {
                CalendarError::InvalidTask(format!("task '{}' has no id or _id", dto.title))
            })?;

        let due = dto.due.as_deref().map(parse_due_timestamp).transpose()?;

        Ok(Self {
            id,
            title: dto.title,
            description: dto.description,
            status: dto.status.unwrap_or(Status::Pending),
            priority: dto.priority.unwrap_or_default(),
            tags: normalize_tags(&dto.tags),
            due,
            project: dto.project,
        })
    }
}

/// Accepts RFC 3339 and the compact `YYYYMMDDTHHMMSSZ` form.
pub fn parse_due_timestamp(raw: &str) -> CalendarResult<DateTime<Utc>> {
    let token = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(token, "%Y%m%dT%H%M%SZ")
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|_| CalendarError::InvalidDate(format!("unrecognized due timestamp: {raw}")))
}

pub fn format_due_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Comparison key for tags. Filters and task tags both go through this.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Trims, drops blanks and case-insensitive duplicates, keeping first spelling.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        let key = normalize_tag(tag);
        if tag.is_empty() || out.iter().any(|t| normalize_tag(t) == key) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn legacy_id_wins_over_id() {
        let dto = TaskDto {
            id: Some("new".into()),
            legacy_id: Some("old".into()),
            title: "x".into(),
            ..TaskDto::default()
        };
        let task = Task::try_from(dto).expect("convert");
        assert_eq!(task.id.as_str(), "old");
    }

    #[test]
    fn missing_identity_is_rejected() {
        let dto = TaskDto {
            id: Some("  ".into()),
            title: "orphan".into(),
            ..TaskDto::default()
        };
        let err = Task::try_from(dto).expect_err("no id");
        assert!(matches!(err, CalendarError::InvalidTask(_)));
    }

    #[test]
    fn defaults_fill_missing_status_and_priority() {
        let dto = TaskDto {
            id: Some("t1".into()),
            tags: vec![" Work ".into(), "work".into(), String::new(), "home".into()],
            due: Some("20240105T100000Z".into()),
            ..TaskDto::default()
        };
        let task = Task::try_from(dto).expect("convert");
        assert_eq!(task.status, Status::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.tags, vec!["Work".to_string(), "home".to_string()]);
        assert_eq!(
            task.due,
            Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).single()
        );
    }

    #[test]
    fn tag_lookup_folds_non_ascii_case() {
        let task = Task::new("t1", "trip").with_tags(["Été", "été", "Œuvre"]);
        assert_eq!(task.tags, vec!["Été".to_string(), "Œuvre".to_string()]);
        assert!(task.has_tag("été"));
        assert!(task.has_tag(" ÉTÉ "));
        assert!(task.has_tag("œuvre"));
        assert!(!task.has_tag("ete"));
    }

    #[test]
    fn patch_can_clear_due() {
        let due = Utc
            .with_ymd_and_hms(2024, 1, 5, 14, 30, 0)
            .single()
            .expect("valid due");
        let mut task = Task::new("t1", "call").with_due(due);
        task.apply_patch(&TaskPatch::due(None)).expect("patch");
        assert_eq!(task.due, None);

        task.apply_patch(&TaskPatch::due(Some("2024-01-10T14:30:00Z".into())))
            .expect("patch");
        assert_eq!(
            task.due,
            Utc.with_ymd_and_hms(2024, 1, 10, 14, 30, 0).single()
        );
    }

    #[test]
    fn dto_round_trip_keeps_due_instant() {
        let due = Utc
            .with_ymd_and_hms(2024, 1, 5, 23, 59, 59)
            .single()
            .expect("valid due");
        let task = Task::new("t1", "x").with_due(due);
        let back = Task::try_from(task.to_dto()).expect("convert");
        assert_eq!(back, task);
    }
}

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tasktide_shared::{TaskCreate, TaskDto, TaskPatch, TaskStatus};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::session::{TaskMutator, TaskSource};
use crate::task::{Task, normalize_tags, parse_due_timestamp};

const TASKS_FILE: &str = "tasks.data";

/// Task backend kept in a JSON-lines file. Every line is one task tagged
/// with its owner; mutations act on the owner the store was opened for.
#[derive(Debug)]
pub struct FileTaskStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTask {
    owner: String,
    #[serde(flatten)]
    task: TaskDto,
}

impl StoredTask {
    fn id(&self) -> Option<&str> {
        self.task.canonical_id()
    }
}

impl FileTaskStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path, owner: &str) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join(TASKS_FILE);
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")
                .with_context(|| format!("failed to create {}", tasks_path.display()))?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            owner,
            "opened task store"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            owner: owner.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn load(&self) -> anyhow::Result<Vec<StoredTask>> {
        load_jsonl(&self.tasks_path).with_context(|| format!("failed to load {TASKS_FILE}"))
    }

    fn save(&self, records: &[StoredTask]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, records)
            .with_context(|| format!("failed to save {TASKS_FILE}"))
    }

    fn position(&self, records: &[StoredTask], id: &str) -> anyhow::Result<usize> {
        records
            .iter()
            .position(|record| record.owner == self.owner && record.id() == Some(id))
            .ok_or_else(|| anyhow!("task not found: {id}"))
    }
}

impl TaskSource for FileTaskStore {
    #[tracing::instrument(skip(self))]
    fn fetch_tasks(&self, owner: &str) -> anyhow::Result<Vec<TaskDto>> {
        let tasks: Vec<TaskDto> = self
            .load()?
            .into_iter()
            .filter(|record| record.owner == owner)
            .map(|record| record.task)
            .collect();
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }
}

impl TaskMutator for FileTaskStore {
    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    fn create_task(&mut self, input: TaskCreate) -> anyhow::Result<TaskDto> {
        if input.title.trim().is_empty() {
            return Err(anyhow!("task title must not be empty"));
        }
        if let Some(due) = input.due.as_deref() {
            parse_due_timestamp(due).context("invalid due date")?;
        }

        let task = TaskDto {
            id: Some(Uuid::new_v4().to_string()),
            legacy_id: None,
            title: input.title.trim().to_string(),
            description: input.description,
            status: Some(input.status.unwrap_or(TaskStatus::Pending)),
            priority: Some(input.priority.unwrap_or_default()),
            tags: normalize_tags(&input.tags),
            due: input.due,
            project: input.project,
        };

        let mut records = self.load()?;
        records.push(StoredTask {
            owner: self.owner.clone(),
            task: task.clone(),
        });
        self.save(&records)?;
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch))]
    fn update_task(&mut self, id: &str, patch: TaskPatch) -> anyhow::Result<TaskDto> {
        let mut records = self.load()?;
        let idx = self.position(&records, id)?;

        let mut task = Task::try_from(records[idx].task.clone())
            .with_context(|| format!("stored task {id} is malformed"))?;
        task.apply_patch(&patch)
            .with_context(|| format!("failed to apply update to {id}"))?;

        // Identity fields stay as stored so `_id` keeps winning on reload.
        let stored = &records[idx].task;
        let updated = TaskDto {
            id: stored.id.clone(),
            legacy_id: stored.legacy_id.clone(),
            ..task.to_dto()
        };
        records[idx].task = updated.clone();
        self.save(&records)?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    fn delete_task(&mut self, id: &str) -> anyhow::Result<()> {
        let mut records = self.load()?;
        let idx = self.position(&records, id)?;
        records.remove(idx);
        self.save(&records)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<StoredTask>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: StoredTask = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic(path: &Path, records: &[StoredTask]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

//! Glue between a task backend and a [`CalendarStore`].
//!
//! The store only changes after the backend has answered successfully.
//! Refresh results carry a generation ticket so a slow response can never
//! overwrite a newer one.

use chrono::NaiveDate;
use tasktide_shared::{TaskCreate, TaskDto, TaskPatch};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{ReschedulePlan, TimeSlot};
use crate::error::{CalendarError, CalendarResult};
use crate::store::CalendarStore;
use crate::task::{Task, TaskId};

pub trait TaskSource {
    fn fetch_tasks(&self, owner: &str) -> anyhow::Result<Vec<TaskDto>>;
}

pub trait TaskMutator {
    fn create_task(&mut self, input: TaskCreate) -> anyhow::Result<TaskDto>;
    fn update_task(&mut self, id: &str, patch: TaskPatch) -> anyhow::Result<TaskDto>;
    fn delete_task(&mut self, id: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { loaded: usize, skipped: usize },
    Discarded,
}

/// Hands out increasing tickets; only the latest one may land.
#[derive(Debug, Default)]
pub struct RefreshTracker {
    issued: u64,
}

impl RefreshTracker {
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued = self.issued.saturating_add(1);
        RefreshTicket(self.issued)
    }

    pub fn is_current(&self, ticket: RefreshTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Replaces the store's tasks with `result` if `ticket` is still the
    /// newest. Entries that fail conversion are skipped with a warning.
    pub fn complete_refresh(
        &self,
        store: &mut CalendarStore,
        ticket: RefreshTicket,
        result: anyhow::Result<Vec<TaskDto>>,
    ) -> CalendarResult<RefreshOutcome> {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, latest = self.issued, "discarding stale refresh");
            return Ok(RefreshOutcome::Discarded);
        }
        let dtos = result.map_err(CalendarError::Backend)?;
        let (tasks, skipped) = convert_dtos(dtos);
        let loaded = tasks.len();
        store.set_tasks(tasks)?;
        Ok(RefreshOutcome::Applied { loaded, skipped })
    }
}

fn convert_dtos(dtos: Vec<TaskDto>) -> (Vec<Task>, usize) {
    let mut tasks = Vec::with_capacity(dtos.len());
    let mut skipped = 0;
    for dto in dtos {
        match Task::try_from(dto) {
            Ok(task) => tasks.push(task),
            Err(err) => {
                warn!(error = %err, "skipping malformed task from backend");
                skipped += 1;
            }
        }
    }
    (tasks, skipped)
}

#[derive(Debug)]
pub struct CalendarSession<B> {
    backend: B,
    store: CalendarStore,
    owner: String,
    refreshes: RefreshTracker,
}

impl<B> CalendarSession<B>
where
    B: TaskSource + TaskMutator,
{
    pub fn new(backend: B, store: CalendarStore, owner: impl Into<String>) -> Self {
        Self {
            backend,
            store,
            owner: owner.into(),
            refreshes: RefreshTracker::default(),
        }
    }

    pub fn store(&self) -> &CalendarStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CalendarStore {
        &mut self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn into_parts(self) -> (B, CalendarStore) {
        (self.backend, self.store)
    }

    /// Fetches and applies in one step.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub fn refresh(&mut self) -> CalendarResult<RefreshOutcome> {
        let ticket = self.begin_refresh();
        let result = self.backend.fetch_tasks(&self.owner);
        let outcome = self.complete_refresh(ticket, result)?;
        info!(?outcome, "refreshed tasks");
        Ok(outcome)
    }

    /// First half of a refresh whose fetch runs elsewhere.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.refreshes.begin_refresh()
    }

    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: anyhow::Result<Vec<TaskDto>>,
    ) -> CalendarResult<RefreshOutcome> {
        self.refreshes
            .complete_refresh(&mut self.store, ticket, result)
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub fn create(&mut self, input: TaskCreate) -> CalendarResult<TaskId> {
        let dto = self
            .backend
            .create_task(input)
            .map_err(CalendarError::Backend)?;
        let task = Task::try_from(dto)?;
        let id = task.id.clone();
        self.store.add_task(task)?;
        debug!(%id, "created task");
        Ok(id)
    }

    /// Drops the dragged task onto `target` and persists the new due date.
    /// The drag is cleared even when this fails. If the backend took the
    /// change but its answer cannot be applied locally, the store is
    /// reloaded from the backend instead.
    #[instrument(skip(self))]
    pub fn reschedule_dragged(
        &mut self,
        target: Option<NaiveDate>,
        slot: Option<TimeSlot>,
    ) -> CalendarResult<ReschedulePlan> {
        let plan = self.store.drop_dragged(target, slot)?;
        if plan.is_noop() {
            debug!(task = %plan.task_id, "drop onto current due date; nothing to persist");
            return Ok(plan);
        }
        let dto = self
            .backend
            .update_task(plan.task_id.as_str(), plan.patch())
            .map_err(CalendarError::Backend)?;
        let applied = Task::try_from(dto).and_then(|task| self.store.update_task(task));
        if let Err(err) = applied {
            warn!(
                task = %plan.task_id,
                error = %err,
                "backend saved the reschedule but the store rejected its reply; resyncing"
            );
            self.refresh()?;
        }
        info!(task = %plan.task_id, new_due = %plan.new_due, "rescheduled task");
        Ok(plan)
    }

    /// Moves `id` onto `target` without going through a UI drag.
    pub fn reschedule(
        &mut self,
        id: &TaskId,
        target: NaiveDate,
        slot: Option<TimeSlot>,
    ) -> CalendarResult<ReschedulePlan> {
        self.store.set_dragged_task(Some(id.clone()))?;
        self.reschedule_dragged(Some(target), slot)
    }

    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &TaskId) -> CalendarResult<()> {
        if self.store.state().task(id).is_none() {
            return Err(CalendarError::TaskNotFound(id.clone()));
        }
        self.backend
            .delete_task(id.as_str())
            .map_err(CalendarError::Backend)?;
        self.store.remove_task(id)
    }
}

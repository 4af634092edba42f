//! Calendar session state and its transition function.
//!
//! [`CalendarState::apply`] is pure: it takes a state and an action and
//! returns the next state, or an error with the input state untouched.
//! [`CalendarStore`] owns one state plus a clock and is what UI bindings
//! talk to.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument, warn};

use crate::calendar::filter::apply as apply_filters;
use crate::calendar::range::title_for_view;
use crate::calendar::{
    CalendarFilterSet, CalendarStats, DateRange, DayCell, Direction, FilterUpdate, ReschedulePlan,
    TaskDateIndex, TimeSlot, ViewMode, bin, compute_range, plan_reschedule, sorted_for_display,
    step, tasks_in_range, validate_drop,
};
use crate::clock::{Clock, SystemClock};
use crate::config::CalendarSettings;
use crate::error::{CalendarError, CalendarResult};
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq)]
pub enum CalendarAction {
    SetView(ViewMode),
    SetAnchorDate(NaiveDate),
    Navigate(Direction),
    /// Carries the date so the transition never reads a clock.
    GoToToday(NaiveDate),
    SelectDate(NaiveDate),
    SetTasks(Vec<Task>),
    AddTask(Task),
    UpdateTask(Task),
    RemoveTask(TaskId),
    SetFilters(CalendarFilterSet),
    UpdateFilter(FilterUpdate),
    ClearFilters,
    SetDraggedTask(Option<TaskId>),
    SelectTask(TaskId),
    DeselectTask(TaskId),
    ClearSelection,
}

impl CalendarAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetView(_) => "set_view",
            Self::SetAnchorDate(_) => "set_anchor_date",
            Self::Navigate(_) => "navigate",
            Self::GoToToday(_) => "go_to_today",
            Self::SelectDate(_) => "select_date",
            Self::SetTasks(_) => "set_tasks",
            Self::AddTask(_) => "add_task",
            Self::UpdateTask(_) => "update_task",
            Self::RemoveTask(_) => "remove_task",
            Self::SetFilters(_) => "set_filters",
            Self::UpdateFilter(_) => "update_filter",
            Self::ClearFilters => "clear_filters",
            Self::SetDraggedTask(_) => "set_dragged_task",
            Self::SelectTask(_) => "select_task",
            Self::DeselectTask(_) => "deselect_task",
            Self::ClearSelection => "clear_selection",
        }
    }
}

/// Everything the calendar screen shows. Derived fields (`date_range`,
/// `task_date_index`) are private and only recomputed from their inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarState {
    current_view: ViewMode,
    anchor_date: NaiveDate,
    selected_date: NaiveDate,
    date_range: DateRange,
    tasks: Vec<Task>,
    task_date_index: TaskDateIndex,
    filters: CalendarFilterSet,
    dragged_task_id: Option<TaskId>,
    selected_task_ids: BTreeSet<TaskId>,
    settings: CalendarSettings,
}

impl CalendarState {
    pub fn new(
        today: NaiveDate,
        view: ViewMode,
        settings: CalendarSettings,
    ) -> CalendarResult<Self> {
        let date_range = compute_range(
            today,
            view,
            settings.week_start,
            settings.agenda_lookahead_days,
        )?;
        Ok(Self {
            current_view: view,
            anchor_date: today,
            selected_date: today,
            date_range,
            tasks: vec![],
            task_date_index: TaskDateIndex::default(),
            filters: CalendarFilterSet::default(),
            dragged_task_id: None,
            selected_task_ids: BTreeSet::new(),
            settings,
        })
    }

    pub fn current_view(&self) -> ViewMode {
        self.current_view
    }

    pub fn anchor_date(&self) -> NaiveDate {
        self.anchor_date
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_date_index(&self) -> &TaskDateIndex {
        &self.task_date_index
    }

    pub fn filters(&self) -> &CalendarFilterSet {
        &self.filters
    }

    pub fn dragged_task_id(&self) -> Option<&TaskId> {
        self.dragged_task_id.as_ref()
    }

    pub fn selected_task_ids(&self) -> &BTreeSet<TaskId> {
        &self.selected_task_ids
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Next state after `action`. On error `self` is unchanged.
    pub fn apply(&self, action: CalendarAction) -> CalendarResult<Self> {
        let mut next = self.clone();
        match action {
            CalendarAction::SetView(view) => {
                next.current_view = view;
                next.recompute_range()?;
            }
            CalendarAction::SetAnchorDate(date) => {
                next.anchor_date = date;
                next.recompute_range()?;
            }
            CalendarAction::Navigate(direction) => {
                next.anchor_date = step(
                    self.anchor_date,
                    self.current_view,
                    direction,
                    self.settings.agenda_lookahead_days,
                )?;
                next.recompute_range()?;
            }
            CalendarAction::GoToToday(today) => {
                next.anchor_date = today;
                next.selected_date = today;
                next.recompute_range()?;
            }
            CalendarAction::SelectDate(date) => {
                next.selected_date = date;
            }
            CalendarAction::SetTasks(tasks) => {
                ensure_unique_ids(&tasks)?;
                next.replace_tasks(tasks);
            }
            CalendarAction::AddTask(task) => {
                if self.task(&task.id).is_some() {
                    return Err(CalendarError::DuplicateTask(task.id));
                }
                let mut tasks = self.tasks.clone();
                tasks.push(task);
                next.replace_tasks(tasks);
            }
            CalendarAction::UpdateTask(task) => {
                let idx = self.position(&task.id)?;
                let mut tasks = self.tasks.clone();
                tasks[idx] = task;
                next.replace_tasks(tasks);
            }
            CalendarAction::RemoveTask(id) => {
                let idx = self.position(&id)?;
                let mut tasks = self.tasks.clone();
                tasks.remove(idx);
                next.replace_tasks(tasks);
            }
            CalendarAction::SetFilters(filters) => {
                next.filters = filters;
            }
            CalendarAction::UpdateFilter(update) => {
                next.filters.update(update);
            }
            CalendarAction::ClearFilters => {
                next.filters.clear();
            }
            CalendarAction::SetDraggedTask(id) => {
                if let Some(id) = id.as_ref()
                    && self.task(id).is_none()
                {
                    return Err(CalendarError::StaleDrop(id.clone()));
                }
                next.dragged_task_id = id;
            }
            CalendarAction::SelectTask(id) => {
                self.position(&id)?;
                next.selected_task_ids.insert(id);
            }
            CalendarAction::DeselectTask(id) => {
                next.selected_task_ids.remove(&id);
            }
            CalendarAction::ClearSelection => {
                next.selected_task_ids.clear();
            }
        }
        Ok(next)
    }

    fn position(&self, id: &TaskId) -> CalendarResult<usize> {
        self.tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| CalendarError::TaskNotFound(id.clone()))
    }

    fn recompute_range(&mut self) -> CalendarResult<()> {
        self.date_range = compute_range(
            self.anchor_date,
            self.current_view,
            self.settings.week_start,
            self.settings.agenda_lookahead_days,
        )?;
        Ok(())
    }

    /// Swaps in a new collection and rebuilds everything derived from it.
    fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.task_date_index = bin(&tasks, self.settings.timezone);
        self.selected_task_ids
            .retain(|id| tasks.iter().any(|task| &task.id == id));
        if let Some(dragged) = self.dragged_task_id.as_ref()
            && !tasks.iter().any(|task| &task.id == dragged)
        {
            self.dragged_task_id = None;
        }
        self.tasks = tasks;
    }
}

fn ensure_unique_ids(tasks: &[Task]) -> CalendarResult<()> {
    let mut seen = BTreeSet::new();
    for task in tasks {
        if !seen.insert(&task.id) {
            return Err(CalendarError::DuplicateTask(task.id.clone()));
        }
    }
    Ok(())
}

/// Owns a [`CalendarState`] and the clock used for "today".
pub struct CalendarStore {
    state: CalendarState,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CalendarStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CalendarStore {
    pub fn new(
        settings: CalendarSettings,
        view: ViewMode,
        clock: Arc<dyn Clock>,
    ) -> CalendarResult<Self> {
        let today = clock.today(settings.timezone);
        let state = CalendarState::new(today, view, settings)?;
        debug!(%today, view = %view, "calendar store created");
        Ok(Self { state, clock })
    }

    pub fn with_system_clock(settings: CalendarSettings, view: ViewMode) -> CalendarResult<Self> {
        Self::new(settings, view, Arc::new(SystemClock))
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today(self.state.settings.timezone)
    }

    /// Current instant from the injected clock. Renderers use this for
    /// overdue checks.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[instrument(skip(self, action), fields(action = action.name()))]
    pub fn dispatch(&mut self, action: CalendarAction) -> CalendarResult<()> {
        match self.state.apply(action) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "calendar action rejected");
                Err(err)
            }
        }
    }

    pub fn set_view(&mut self, view: ViewMode) -> CalendarResult<()> {
        self.dispatch(CalendarAction::SetView(view))
    }

    /// Parses a view key from the UI; unknown keys are rejected.
    pub fn set_view_key(&mut self, key: &str) -> CalendarResult<()> {
        self.set_view(ViewMode::from_key(key)?)
    }

    pub fn set_anchor_date(&mut self, date: NaiveDate) -> CalendarResult<()> {
        self.dispatch(CalendarAction::SetAnchorDate(date))
    }

    pub fn navigate(&mut self, direction: Direction) -> CalendarResult<()> {
        self.dispatch(CalendarAction::Navigate(direction))
    }

    pub fn go_to_today(&mut self) -> CalendarResult<()> {
        let today = self.today();
        self.dispatch(CalendarAction::GoToToday(today))
    }

    pub fn select_date(&mut self, date: NaiveDate) -> CalendarResult<()> {
        self.dispatch(CalendarAction::SelectDate(date))
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) -> CalendarResult<()> {
        self.dispatch(CalendarAction::SetTasks(tasks))
    }

    pub fn add_task(&mut self, task: Task) -> CalendarResult<()> {
        self.dispatch(CalendarAction::AddTask(task))
    }

    pub fn update_task(&mut self, task: Task) -> CalendarResult<()> {
        self.dispatch(CalendarAction::UpdateTask(task))
    }

    pub fn remove_task(&mut self, id: &TaskId) -> CalendarResult<()> {
        self.dispatch(CalendarAction::RemoveTask(id.clone()))
    }

    pub fn set_filters(&mut self, filters: CalendarFilterSet) -> CalendarResult<()> {
        self.dispatch(CalendarAction::SetFilters(filters))
    }

    pub fn update_filter(&mut self, update: FilterUpdate) -> CalendarResult<()> {
        self.dispatch(CalendarAction::UpdateFilter(update))
    }

    pub fn clear_filters(&mut self) -> CalendarResult<()> {
        self.dispatch(CalendarAction::ClearFilters)
    }

    pub fn set_dragged_task(&mut self, id: Option<TaskId>) -> CalendarResult<()> {
        self.dispatch(CalendarAction::SetDraggedTask(id))
    }

    pub fn select_task(&mut self, id: &TaskId) -> CalendarResult<()> {
        self.dispatch(CalendarAction::SelectTask(id.clone()))
    }

    pub fn deselect_task(&mut self, id: &TaskId) -> CalendarResult<()> {
        self.dispatch(CalendarAction::DeselectTask(id.clone()))
    }

    pub fn clear_selection(&mut self) -> CalendarResult<()> {
        self.dispatch(CalendarAction::ClearSelection)
    }

    /// Clears the drag without rescheduling anything.
    pub fn end_drag(&mut self) {
        self.state.dragged_task_id = None;
    }

    /// Turns the current drag into a reschedule plan. The drag is cleared
    /// whatever the outcome; the store's tasks are not touched until the
    /// backend confirms through [`CalendarStore::update_task`].
    #[instrument(skip(self))]
    pub fn drop_dragged(
        &mut self,
        target: Option<NaiveDate>,
        slot: Option<TimeSlot>,
    ) -> CalendarResult<ReschedulePlan> {
        let dragged = self.state.dragged_task_id.take();
        let task = match dragged.as_ref() {
            Some(id) => Some(
                self.state
                    .task(id)
                    .ok_or_else(|| CalendarError::StaleDrop(id.clone()))?,
            ),
            None => None,
        };
        validate_drop(task, target)?;
        match (task, target) {
            (Some(task), Some(target)) => {
                plan_reschedule(task, target, slot, self.state.settings.timezone)
            }
            (None, _) => Err(CalendarError::NothingDragged),
            (_, None) => Err(CalendarError::MissingDropTarget),
        }
    }

    /// Tasks in the visible range that pass the active filters.
    pub fn visible_tasks(&self) -> Vec<Task> {
        let in_range = tasks_in_range(
            &self.state.tasks,
            &self.state.date_range,
            self.state.settings.timezone,
        );
        apply_filters(&in_range, &self.state.filters)
    }

    /// Filtered, display-sorted tasks due on `date`.
    pub fn tasks_on(&self, date: NaiveDate) -> Vec<Task> {
        let bucket = self.state.task_date_index.get(date);
        sorted_for_display(&apply_filters(bucket, &self.state.filters))
    }

    /// One truncated cell per day of the visible range.
    pub fn day_cells(&self) -> Vec<(NaiveDate, DayCell)> {
        let limit = self.state.settings.day_cell_limit;
        self.state
            .date_range
            .days()
            .map(|day| (day, DayCell::truncate(&self.tasks_on(day), limit)))
            .collect()
    }

    pub fn stats(&self) -> CalendarStats {
        CalendarStats::summarize(&self.visible_tasks())
    }

    pub fn title(&self) -> CalendarResult<String> {
        title_for_view(
            self.state.anchor_date,
            self.state.current_view,
            self.state.settings.week_start,
            self.state.settings.agenda_lookahead_days,
        )
    }
}

use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tasktide_shared::TaskCreate;
use tracing::{debug, info};

use crate::calendar::{CalendarFilterSet, Direction, FilterUpdate, TimeSlot, ViewMode};
use crate::cli::{Command, FilterArgs, ViewArgs};
use crate::datetime::{parse_anchor_date, to_utc_from_local};
use crate::render::Renderer;
use crate::session::{CalendarSession, TaskMutator, TaskSource};
use crate::store::CalendarStore;
use crate::task::{Priority, Status, TaskId, format_due_timestamp};

#[tracing::instrument(skip(session, renderer, out))]
pub fn dispatch<B, W>(
    session: &mut CalendarSession<B>,
    renderer: &Renderer,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()>
where
    B: TaskSource + TaskMutator,
    W: Write,
{
    match command {
        Command::Range(args) => {
            apply_view_args(session.store_mut(), &args)?;
            let range = session.store().state().date_range();
            writeln!(
                out,
                "{} {}",
                range.start().format("%Y-%m-%d %H:%M:%S%.3f"),
                range.end().format("%Y-%m-%d %H:%M:%S%.3f")
            )?;
            writeln!(out, "{} days", range.day_count())?;
        }
        Command::Show(args) => {
            apply_view_args(session.store_mut(), &args)?;
            renderer.write_period(out, session.store())?;
        }
        Command::Agenda { from, filters } => {
            let store = session.store_mut();
            store.set_view(ViewMode::Agenda)?;
            if let Some(from) = from.as_deref() {
                let date = parse_anchor_date(from, store.today())?;
                store.set_anchor_date(date)?;
            }
            store.set_filters(build_filters(&filters)?)?;
            renderer.write_agenda(out, session.store())?;
        }
        Command::Add {
            title,
            due,
            at,
            priority,
            tags,
            project,
        } => {
            let due = match due.as_deref() {
                Some(expr) => Some(due_from_expr(session.store(), expr, at.as_deref())?),
                None if at.is_some() => return Err(anyhow!("--at requires --due")),
                None => None,
            };
            let priority = priority
                .as_deref()
                .map(|raw| Priority::from_key(raw).ok_or_else(|| anyhow!("unknown priority: {raw}")))
                .transpose()?;

            let id = session.create(TaskCreate {
                title: title.join(" "),
                description: String::new(),
                project,
                tags,
                priority,
                status: None,
                due,
            })?;
            info!(%id, "task added");
            writeln!(out, "created task {id}")?;
        }
        Command::Reschedule { id, date, at } => {
            let target = parse_anchor_date(&date, session.store().today())?;
            let slot = at
                .as_deref()
                .map(str::parse::<TimeSlot>)
                .transpose()?;
            let plan = session.reschedule(&TaskId::new(id), target, slot)?;
            renderer.write_plan(out, &plan)?;
        }
        Command::Stats(args) => {
            apply_view_args(session.store_mut(), &args)?;
            let store = session.store();
            renderer.write_stats(out, &store.title()?, &store.stats())?;
        }
    }
    Ok(())
}

fn apply_view_args(store: &mut CalendarStore, args: &ViewArgs) -> anyhow::Result<()> {
    if let Some(view) = args.view.as_deref() {
        store.set_view_key(view)?;
    }
    if let Some(date) = args.date.as_deref() {
        let anchor = parse_anchor_date(date, store.today())?;
        store.set_anchor_date(anchor)?;
        store.select_date(anchor)?;
    }
    for _ in 0..args.next {
        store.navigate(Direction::Next)?;
    }
    for _ in 0..args.prev {
        store.navigate(Direction::Previous)?;
    }
    store.set_filters(build_filters(&args.filters)?)?;
    debug!(
        view = %store.state().current_view(),
        anchor = %store.state().anchor_date(),
        "view arguments applied"
    );
    Ok(())
}

fn build_filters(args: &FilterArgs) -> anyhow::Result<CalendarFilterSet> {
    let priority: BTreeSet<Priority> = args
        .priority
        .iter()
        .map(|raw| Priority::from_key(raw).ok_or_else(|| anyhow!("unknown priority: {raw}")))
        .collect::<anyhow::Result<_>>()?;
    let status: BTreeSet<Status> = args
        .status
        .iter()
        .map(|raw| Status::from_key(raw).ok_or_else(|| anyhow!("unknown status: {raw}")))
        .collect::<anyhow::Result<_>>()?;

    let mut filters = CalendarFilterSet::default();
    filters.update(FilterUpdate::Priority(priority));
    filters.update(FilterUpdate::Status(status));
    filters.update(FilterUpdate::Tags(args.tags.iter().cloned().collect()));
    Ok(filters)
}

/// Date expression plus optional time of day, as a backend timestamp.
fn due_from_expr(store: &CalendarStore, expr: &str, at: Option<&str>) -> anyhow::Result<String> {
    let date: NaiveDate = parse_anchor_date(expr, store.today())?;
    let time = match at {
        Some(raw) => raw.parse::<TimeSlot>()?.time(),
        None => chrono::NaiveTime::MIN,
    };
    let due = to_utc_from_local(date.and_time(time), store.state().settings().timezone, "due")
        .with_context(|| format!("cannot place due date {expr}"))?;
    Ok(format_due_timestamp(due))
}

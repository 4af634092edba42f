use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarStats, DayCell, ReschedulePlan, ViewMode};
use crate::config::{CalendarSettings, TimeFormat};
use crate::datetime::local_naive;
use crate::store::CalendarStore;
use crate::task::{Status, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    time_format: TimeFormat,
    timezone: Tz,
}

impl Renderer {
    pub fn new(settings: &CalendarSettings, color: bool) -> Self {
        Self {
            color,
            time_format: settings.time_format,
            timezone: settings.timezone,
        }
    }

    /// Title, then one block per day. Month and agenda views skip empty days.
    pub fn write_period<W: Write>(&self, mut out: W, store: &CalendarStore) -> anyhow::Result<()> {
        let state = store.state();
        writeln!(out, "{}", store.title()?)?;

        let skip_empty = matches!(state.current_view(), ViewMode::Month | ViewMode::Agenda);
        let now = store.now();
        let mut printed = 0usize;
        for (day, cell) in store.day_cells() {
            if skip_empty && cell.shown.is_empty() {
                continue;
            }
            self.write_day(&mut out, day, &cell, day == state.selected_date(), now)?;
            printed += 1;
        }

        if printed == 0 {
            writeln!(out, "no tasks in this period")?;
        }
        Ok(())
    }

    fn write_day<W: Write>(
        &self,
        out: &mut W,
        day: NaiveDate,
        cell: &DayCell,
        selected: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let marker = if selected { "*" } else { " " };
        let heading = day.format("%a %Y-%m-%d").to_string();
        writeln!(out, "{marker}{}", self.paint(&heading, "1"))?;

        if cell.shown.is_empty() {
            writeln!(out, "    -")?;
            return Ok(());
        }
        for task in &cell.shown {
            writeln!(out, "    {}", self.task_line(task, now))?;
        }
        if let Some(label) = cell.overflow_label() {
            writeln!(out, "    {label}")?;
        }
        Ok(())
    }

    fn task_line(&self, task: &Task, now: DateTime<Utc>) -> String {
        let time = self.due_time(task);
        let time = match task.due {
            Some(due) if due < now && task.status != Status::Completed => self.paint(&time, "31"),
            _ => time,
        };
        let mut line = format!("{time} {}", task.title);
        if task.priority != Default::default() {
            line.push_str(&format!(" [{}]", task.priority.as_key()));
        }
        if task.status != Status::Pending {
            line.push_str(&format!(" ({})", task.status.as_key()));
        }
        for tag in &task.tags {
            line.push_str(&format!(" +{tag}"));
        }
        line
    }

    fn due_time(&self, task: &Task) -> String {
        task.due
            .map(|due| {
                self.time_format
                    .format(local_naive(due, self.timezone).time())
            })
            .unwrap_or_else(|| "--:--".to_string())
    }

    /// Every visible task in one table, chronological.
    pub fn write_agenda<W: Write>(&self, mut out: W, store: &CalendarStore) -> anyhow::Result<()> {
        writeln!(out, "{}", store.title()?)?;

        let headers = vec![
            "Date".to_string(),
            "Time".to_string(),
            "ID".to_string(),
            "Priority".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];

        let mut rows = Vec::new();
        for day in store.state().date_range().days() {
            for task in store.tasks_on(day) {
                let tags = task
                    .tags
                    .iter()
                    .map(|tag| format!("+{tag}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                rows.push(vec![
                    day.format("%Y-%m-%d").to_string(),
                    self.due_time(&task),
                    self.paint(task.id.as_str(), "33"),
                    task.priority.as_key().to_string(),
                    task.title.clone(),
                    tags,
                ]);
            }
        }

        if rows.is_empty() {
            writeln!(out, "no tasks in this period")?;
            return Ok(());
        }
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn write_stats<W: Write>(&self, mut out: W, title: &str, stats: &CalendarStats) -> anyhow::Result<()> {
        writeln!(out, "{title}")?;
        writeln!(out, "total        {}", stats.total)?;
        writeln!(out, "pending      {}", stats.pending)?;
        writeln!(out, "in-progress  {}", stats.in_progress)?;
        writeln!(out, "completed    {}", stats.completed)?;
        writeln!(out, "failed       {}", stats.failed)?;
        writeln!(out, "done         {:.0}%", stats.completion_ratio() * 100.0)?;
        Ok(())
    }

    pub fn write_plan<W: Write>(&self, mut out: W, plan: &ReschedulePlan) -> anyhow::Result<()> {
        let new_due = local_naive(plan.new_due, self.timezone);
        if plan.is_noop() {
            writeln!(out, "task {} already due {}", plan.task_id, new_due.format("%Y-%m-%d %H:%M"))?;
        } else {
            writeln!(out, "rescheduled {} to {}", plan.task_id, new_due.format("%Y-%m-%d %H:%M"))?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ", width = *width)?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::clock::FixedClock;
    use crate::task::Priority;

    fn store(view: ViewMode, tasks: Vec<Task>) -> CalendarStore {
        let now = Utc
            .with_ymd_and_hms(2024, 1, 10, 9, 0, 0)
            .single()
            .expect("valid now");
        let mut store = CalendarStore::new(
            CalendarSettings::default(),
            view,
            Arc::new(FixedClock(now)),
        )
        .expect("store");
        store.set_tasks(tasks).expect("tasks");
        store
    }

    fn due(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, d, h, m, 0)
            .single()
            .expect("valid due")
    }

    fn render(view: ViewMode, tasks: Vec<Task>) -> String {
        let store = store(view, tasks);
        let renderer = Renderer::new(store.state().settings(), false);
        let mut buf = Vec::new();
        renderer.write_period(&mut buf, &store).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn day_view_truncates_with_more_label() {
        let mut store = store(ViewMode::Day, vec![]);
        store
            .set_anchor_date(NaiveDate::from_ymd_opt(2030, 1, 3).expect("date"))
            .expect("anchor");
        let tasks = (0..5)
            .map(|i| Task::new(format!("t{i}"), format!("task {i}")).with_due(due(3, 9 + i, 5)))
            .collect();
        store.set_tasks(tasks).expect("tasks");

        let renderer = Renderer::new(store.state().settings(), false);
        let mut buf = Vec::new();
        renderer.write_period(&mut buf, &store).expect("render");
        let text = String::from_utf8(buf).expect("utf8");

        assert!(text.starts_with("Thursday, 2030-01-03\n"));
        assert!(text.contains("09:05 task 0"));
        assert!(text.contains("11:05 task 2"));
        assert!(!text.contains("task 3"));
        assert!(text.contains("+2 more"));
    }

    #[test]
    fn week_view_lists_empty_days() {
        let text = render(ViewMode::Week, vec![]);
        assert_eq!(text.matches("    -").count(), 7);
        assert!(text.contains("*Wed 2024-01-10"));
    }

    #[test]
    fn month_view_skips_empty_days() {
        let text = render(ViewMode::Month, vec![]);
        assert!(text.ends_with("no tasks in this period\n"));
    }

    #[test]
    fn twelve_hour_format_and_annotations() {
        let settings = CalendarSettings {
            time_format: TimeFormat::Hour12,
            ..CalendarSettings::default()
        };
        let renderer = Renderer::new(&settings, false);
        let task = Task::new("a", "deploy")
            .with_due(due(3, 14, 5))
            .with_priority(Priority::High)
            .with_status(Status::InProgress)
            .with_tags(["ops"]);
        assert_eq!(
            renderer.task_line(&task, due(1, 0, 0)),
            "2:05pm deploy [high] (in-progress) +ops"
        );
    }

    #[test]
    fn agenda_table_aligns_wide_titles() {
        let store = store(
            ViewMode::Agenda,
            vec![
                Task::new("a", "日本語のタスク")
                    .with_due(Utc.with_ymd_and_hms(2024, 1, 12, 8, 0, 0).single().expect("due")),
            ],
        );
        let renderer = Renderer::new(store.state().settings(), false);
        let mut buf = Vec::new();
        renderer.write_agenda(&mut buf, &store).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Agenda 2024-01-10"));
        assert!(lines[1].starts_with("Date"));
        assert!(lines[3].contains("日本語のタスク"));
        assert_eq!(
            UnicodeWidthStr::width(lines[1]),
            UnicodeWidthStr::width(lines[2])
        );
    }
}

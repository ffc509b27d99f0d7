//! Terminal rendering of tasks, details and statistics.

use chrono::NaiveDateTime;
use comfy_table::presets::{NOTHING, UTF8_FULL};
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::clock::Clock;
use crate::models::{Priority, Task};
use crate::parse::{format_duration, truncate_text};
use crate::storage::TaskStats;

const DESCRIPTION_WIDTH: usize = 40;

/// The color used for a priority level.
pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

/// The marker shown next to a priority level.
pub fn priority_icon(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟡",
        Priority::Low => "🟢",
    }
}

/// Human label for a due date relative to `now`.
pub fn format_due(due: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    let Some(due) = due else {
        return "No due date".to_string();
    };
    if due.date() == now.date() {
        return "Today".to_string();
    }
    // Whole days, rounded toward the past.
    let days = (due - now).num_seconds().div_euclid(86_400);
    match days {
        -1 => "Yesterday (overdue)".to_string(),
        d if d < 0 => format!("Overdue by {}d", d.abs()),
        1 => "Tomorrow".to_string(),
        d if d < 7 => format!("In {} days", d),
        _ => due.format("%Y-%m-%d").to_string(),
    }
}

fn due_color(task: &Task, clock: &dyn Clock) -> Color {
    if task.is_overdue(clock) {
        Color::Red
    } else if task.is_due_today(clock) {
        Color::Yellow
    } else {
        Color::Blue
    }
}

fn priority_cell(priority: Priority) -> Cell {
    Cell::new(format!(
        "{} {}",
        priority.as_str().to_uppercase(),
        priority_icon(priority)
    ))
    .fg(priority_color(priority))
    .add_attribute(Attribute::Bold)
}

/// Builds the task table with a "title • N pending • M overdue" caption line.
pub fn task_table(tasks: &[Task], title: &str, clock: &dyn Clock) -> String {
    if tasks.is_empty() {
        return format!("{title}\nNo tasks found.");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Tags").add_attribute(Attribute::Bold),
        ]);

    let now = clock.now();
    for t in tasks {
        let id = t.id.map(|id| id.to_string()).unwrap_or_default();
        let tags = t.tags.as_slice().join(", ");
        table.add_row(vec![
            Cell::new(id).fg(Color::Cyan),
            priority_cell(t.priority),
            Cell::new(truncate_text(&t.description, DESCRIPTION_WIDTH)),
            Cell::new(format_due(t.due_date, now)).fg(due_color(t, clock)),
            Cell::new(tags).fg(Color::Green),
        ]);
    }

    let pending = tasks.iter().filter(|t| !t.completed).count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(clock)).count();
    format!("{title} • {pending} pending • {overdue} overdue\n{table}")
}

/// Builds the multi-line detail view of a single task.
pub fn task_detail(task: &Task, clock: &dyn Clock) -> String {
    let now = clock.now();
    let mut lines = Vec::new();
    lines.push(format!(
        "Task {}: {}",
        task.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
        task.description
    ));
    lines.push(format!(
        "Priority: {} {}",
        task.priority.as_str().to_uppercase(),
        priority_icon(task.priority)
    ));
    lines.push(format!("Created: {}", task.created_at.format("%Y-%m-%d %H:%M")));
    if task.due_date.is_some() {
        let mut due = format_due(task.due_date, now);
        if task.is_overdue(clock) {
            due.push_str(" ⚠️");
        }
        lines.push(format!("Due: {due}"));
    }
    if !task.tags.is_empty() {
        lines.push(format!("Tags: {}", task.tags.as_slice().join(", ")));
    }
    if let (true, Some(done)) = (task.completed, task.completed_at) {
        lines.push(format!(
            "Completed: {} (after {})",
            done.format("%Y-%m-%d %H:%M"),
            format_duration(task.created_at, done)
        ));
    }
    lines.join("\n")
}

/// Builds the statistics table.
pub fn stats_table(stats: &TaskStats) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.add_row(vec![
        Cell::new("Total Tasks").fg(Color::Cyan),
        Cell::new(stats.total).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Pending").fg(Color::Cyan),
        Cell::new(stats.pending).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Completed").fg(Color::Cyan),
        Cell::new(stats.completed).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Overdue").fg(Color::Cyan),
        Cell::new(stats.overdue).fg(Color::Red),
    ]);
    table
}

/// Prints a task table to stdout.
pub fn render_task_table(tasks: &[Task], title: &str, clock: &dyn Clock) {
    println!("{}", task_table(tasks, title, clock));
}

/// Prints the detail view of a task.
pub fn render_task_detail(task: &Task, clock: &dyn Clock) {
    println!("{}", task_detail(task, clock));
}

/// Prints the statistics table.
pub fn render_stats(stats: &TaskStats) {
    println!("Statistics\n{}", stats_table(stats));
}

/// Prints a success message.
pub fn render_success(message: &str) {
    println!("✅ {message}");
}

/// Prints an error message to stderr.
pub fn render_error(message: &str) {
    eprintln!("❌ {message}");
}

/// Prints a warning message.
pub fn render_warning(message: &str) {
    println!("⚠️  {message}");
}

/// Prints an informational message.
pub fn render_info(message: &str) {
    println!("ℹ️  {message}");
}

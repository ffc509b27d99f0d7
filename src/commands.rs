use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::error::TaskError;
use crate::models::Task;
use crate::parse::{parse_date, parse_priority, parse_tags, sanitize_description, validate_task_id};
use crate::storage::{TaskStats, TaskStore};
use crate::ui::{
    render_info, render_stats, render_success, render_task_detail, render_task_table,
    render_warning,
};

/// Window used by [`cmd_upcoming`].
pub const UPCOMING_DAYS: i64 = 7;

/// Which base set of tasks `list` starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    #[default]
    Pending,
    All,
    Overdue,
}

impl ListScope {
    fn title(self) -> &'static str {
        match self {
            ListScope::Pending => "Pending Tasks",
            ListScope::All => "All Tasks",
            ListScope::Overdue => "Overdue Tasks",
        }
    }
}

fn require_id(raw: &str) -> Result<i64, TaskError> {
    validate_task_id(raw).ok_or_else(|| TaskError::validation(format!("Invalid task ID '{}'", raw)))
}

fn load_existing(store: &TaskStore, id: i64) -> Result<Task, TaskError> {
    store.get(id)?.ok_or_else(|| TaskError::not_found(id))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), TaskError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Adds a new task to the database.
///
/// An unparseable due date is rejected before anything is written.
pub fn cmd_add(
    store: &TaskStore,
    description: &str,
    priority: Option<&str>,
    due: Option<&str>,
    tags: Option<&str>,
    silent: bool,
) -> Result<Task, TaskError> {
    let clock = store.clock();
    let description = sanitize_description(description);
    if description.is_empty() {
        return Err(TaskError::validation("description is required"));
    }
    let mut task = Task::new(description, clock)?;
    if let Some(p) = priority {
        task = task.with_priority(parse_priority(p));
    }
    if let Some(d) = due {
        let due_date = parse_date(d, clock.now())
            .ok_or_else(|| TaskError::validation(format!("Invalid due date: {}", d)))?;
        task = task.with_due_date(Some(due_date));
    }
    if let Some(t) = tags {
        task = task.with_tags(parse_tags(t).iter());
    }

    let id = store.create(&mut task)?;
    info!(id, "task added");
    if !silent {
        render_success(&format!("Task created with ID: {}", id));
        render_task_detail(&task, clock);
    }
    Ok(task)
}

/// Lists tasks from `scope`, narrowed by priority and exact tag when given.
pub fn cmd_list(
    store: &TaskStore,
    scope: ListScope,
    priority: Option<&str>,
    tag: Option<&str>,
    json: bool,
    silent: bool,
) -> Result<Vec<Task>, TaskError> {
    let mut tasks = match scope {
        ListScope::Pending => store.list_pending()?,
        ListScope::All => store.list_all()?,
        ListScope::Overdue => store.list_overdue()?,
    };
    if let Some(p) = priority {
        let wanted = parse_priority(p);
        tasks.retain(|t| t.priority == wanted);
    }
    if let Some(tag) = tag {
        tasks.retain(|t| t.tags.contains(tag));
    }

    if !silent {
        if json {
            print_json(&tasks)?;
        } else {
            render_task_table(&tasks, scope.title(), store.clock());
        }
    }
    Ok(tasks)
}

/// Marks a task as complete by ID.
///
/// A task that is already complete is left untouched.
pub fn cmd_done(store: &TaskStore, id: &str, silent: bool) -> Result<Task, TaskError> {
    let id = require_id(id)?;
    let mut task = load_existing(store, id)?;
    if task.completed {
        if !silent {
            render_warning(&format!("Task {} is already completed", id));
        }
        return Ok(task);
    }

    task.mark_completed(store.clock());
    store.update(&task)?;
    info!(id, "task completed");
    if !silent {
        render_success(&format!("Task {} marked as completed", id));
    }
    Ok(task)
}

/// Edits an existing task's details. Tags in `add_tags` are added, never replaced.
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    store: &TaskStore,
    id: &str,
    description: Option<&str>,
    priority: Option<&str>,
    due: Option<&str>,
    add_tags: Option<&str>,
    remove_tags: Option<&str>,
    silent: bool,
) -> Result<Task, TaskError> {
    let id = require_id(id)?;
    let clock = store.clock();
    let mut task = load_existing(store, id)?;

    if let Some(d) = description {
        let d = sanitize_description(d);
        if d.is_empty() {
            return Err(TaskError::validation("description is required"));
        }
        task.update_description(d, clock);
    }
    if let Some(p) = priority {
        task.update_priority(parse_priority(p), clock);
    }
    if let Some(d) = due {
        let due_date = parse_date(d, clock.now())
            .ok_or_else(|| TaskError::validation(format!("Invalid due date: {}", d)))?;
        task.update_due_date(Some(due_date), clock);
    }
    if let Some(t) = add_tags {
        for tag in parse_tags(t).iter() {
            task.add_tag(tag, clock);
        }
    }
    if let Some(t) = remove_tags {
        for tag in parse_tags(t).iter() {
            task.remove_tag(tag, clock);
        }
    }

    store.update(&task)?;
    if !silent {
        render_success(&format!("Task {} updated", id));
        render_task_detail(&task, clock);
    }
    Ok(task)
}

/// Removes a task from the database by ID.
///
/// Asks for confirmation on stdin unless `force` is set. Returns whether the task was removed.
pub fn cmd_delete(store: &TaskStore, id: &str, force: bool, silent: bool) -> Result<bool, TaskError> {
    let id = require_id(id)?;
    let task = load_existing(store, id)?;

    if !force {
        print!("Delete task '{}'? [y/N] ", task.description);
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(false);
        }
    }

    let removed = store.delete(id)?;
    if !silent {
        if removed {
            render_success(&format!("Task {} deleted", id));
        } else {
            render_warning(&format!("Task {} was already gone", id));
        }
    }
    Ok(removed)
}

/// Removes every completed task.
pub fn cmd_clear(store: &TaskStore, silent: bool) -> Result<usize, TaskError> {
    let removed = store.clear_completed()?;
    info!(removed, "cleared completed tasks");
    if !silent {
        if removed > 0 {
            render_success(&format!("Cleared {} completed task(s)", removed));
        } else {
            render_info("No completed tasks to clear");
        }
    }
    Ok(removed)
}

/// Shows the full details of a single task by ID.
pub fn cmd_show(store: &TaskStore, id: &str, json: bool, silent: bool) -> Result<Task, TaskError> {
    let id = require_id(id)?;
    let task = load_existing(store, id)?;
    if !silent {
        if json {
            print_json(&task)?;
        } else {
            render_task_detail(&task, store.clock());
        }
    }
    Ok(task)
}

/// Overdue tasks, then tasks due today that are not already overdue.
pub fn cmd_today(store: &TaskStore, silent: bool) -> Result<(Vec<Task>, Vec<Task>), TaskError> {
    let clock = store.clock();
    let overdue = store.list_overdue()?;
    let today: Vec<Task> = store
        .list_due_today()?
        .into_iter()
        .filter(|t| !t.is_overdue(clock))
        .collect();

    if !silent {
        if overdue.is_empty() && today.is_empty() {
            render_info("No tasks due today");
        }
        if !overdue.is_empty() {
            render_task_table(&overdue, "Overdue Tasks", clock);
        }
        if !today.is_empty() {
            render_task_table(&today, "Due Today", clock);
        }
    }
    Ok((overdue, today))
}

/// Lists pending tasks due within the next [`UPCOMING_DAYS`] days.
pub fn cmd_upcoming(store: &TaskStore, silent: bool) -> Result<Vec<Task>, TaskError> {
    let tasks = store.list_upcoming(UPCOMING_DAYS)?;
    if !silent {
        if tasks.is_empty() {
            render_info(&format!("No upcoming tasks in the next {} days", UPCOMING_DAYS));
        } else {
            render_task_table(
                &tasks,
                &format!("Upcoming Tasks (Next {} Days)", UPCOMING_DAYS),
                store.clock(),
            );
        }
    }
    Ok(tasks)
}

/// Searches task descriptions and tags for `query`.
pub fn cmd_search(store: &TaskStore, query: &str, json: bool, silent: bool) -> Result<Vec<Task>, TaskError> {
    let tasks = store.search(query)?;
    if !silent {
        if json {
            print_json(&tasks)?;
        } else if tasks.is_empty() {
            render_info(&format!("No tasks found matching: {}", query));
        } else {
            render_task_table(&tasks, &format!("Search Results: {}", query), store.clock());
        }
    }
    Ok(tasks)
}

/// Displays task statistics.
pub fn cmd_stats(store: &TaskStore, json: bool, silent: bool) -> Result<TaskStats, TaskError> {
    let stats = store.stats()?;
    if !silent {
        if json {
            print_json(&stats)?;
        } else {
            render_stats(&stats);
        }
    }
    Ok(stats)
}

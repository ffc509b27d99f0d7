//! SQLite persistence for tasks.
//!
//! One table, one connection. Every public method locks the connection for
//! the duration of a single statement, so each call is atomic on its own and
//! a `&TaskStore` can be shared between threads.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::TaskError;
use crate::models::{Priority, Tags, Task};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'medium'
        CHECK(priority IN ('low', 'medium', 'high')),
    due_date TEXT,
    completed BOOLEAN NOT NULL DEFAULT FALSE,
    tags TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT
);
";

const SELECT_TASKS: &str = "SELECT id, description, priority, due_date, completed, tags, \
     created_at, updated_at, completed_at FROM tasks";

/// Fixed-width so that text comparison in SQL orders chronologically.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9f";

const TAG_SEPARATOR: &str = ",";

/// Aggregate counts over the whole table.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    pub overdue: u64,
}

/// Durable collection of tasks backed by a SQLite file.
pub struct TaskStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    path: Option<PathBuf>,
}

impl TaskStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, TaskError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            clock,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        info!(path = %path.display(), "opened task store");
        Ok(store)
    }

    /// A private database that disappears when the store is dropped.
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self, TaskError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            clock,
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Idempotent.
    pub fn init_schema(&self) -> Result<(), TaskError> {
        self.conn.lock().execute_batch(SCHEMA)?;
        debug!("task schema ready");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The time source used for overdue and due-today queries.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Inserts `task` as a new row and writes the generated id back onto it.
    ///
    /// Any id already on the task is ignored. Tags containing the column
    /// separator are rejected.
    pub fn create(&self, task: &mut Task) -> Result<i64, TaskError> {
        check_tags(&task.tags)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tasks (description, priority, due_date, completed, tags, \
             created_at, updated_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                task.description,
                task.priority.as_str(),
                task.due_date.map(format_timestamp),
                task.completed,
                join_tags(&task.tags),
                format_timestamp(task.created_at),
                format_timestamp(task.updated_at),
                task.completed_at.map(format_timestamp),
            ],
        )?;
        let id = conn.last_insert_rowid();
        task.id = Some(id);
        debug!(id, "created task");
        Ok(id)
    }

    /// Returns `Ok(None)` when no task has this id.
    pub fn get(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &format!("{SELECT_TASKS} WHERE id = ?1"),
                params![id],
                RawTask::from_row,
            )
            .optional()?;
        raw.map(RawTask::into_task).transpose()
    }

    /// Every task, newest first.
    pub fn list_all(&self) -> Result<Vec<Task>, TaskError> {
        self.query(
            &format!("{SELECT_TASKS} ORDER BY created_at DESC, id DESC"),
            [],
        )
    }

    /// Tasks not yet completed, newest first.
    pub fn list_pending(&self) -> Result<Vec<Task>, TaskError> {
        self.query(
            &format!("{SELECT_TASKS} WHERE completed = 0 ORDER BY created_at DESC, id DESC"),
            [],
        )
    }

    /// Completed tasks, most recently completed first.
    pub fn list_completed(&self) -> Result<Vec<Task>, TaskError> {
        self.query(
            &format!("{SELECT_TASKS} WHERE completed = 1 ORDER BY completed_at DESC, id DESC"),
            [],
        )
    }

    /// Pending tasks whose due date has passed, oldest deadline first.
    pub fn list_overdue(&self) -> Result<Vec<Task>, TaskError> {
        let now = format_timestamp(self.clock.now());
        self.query(
            &format!(
                "{SELECT_TASKS} WHERE completed = 0 AND due_date IS NOT NULL AND due_date < ?1 \
                 ORDER BY due_date ASC, id ASC"
            ),
            params![now],
        )
    }

    /// Pending tasks due on today's calendar date.
    ///
    /// Unlike [`Task::is_due_today`], completed tasks are excluded.
    pub fn list_due_today(&self) -> Result<Vec<Task>, TaskError> {
        let start = self.clock.now().date().and_time(NaiveTime::MIN);
        let end = start + Duration::days(1);
        self.query(
            &format!(
                "{SELECT_TASKS} WHERE completed = 0 AND due_date >= ?1 AND due_date < ?2 \
                 ORDER BY due_date ASC, id ASC"
            ),
            params![format_timestamp(start), format_timestamp(end)],
        )
    }

    /// Pending tasks due between now and `days` from now, inclusive, soonest first.
    pub fn list_upcoming(&self, days: i64) -> Result<Vec<Task>, TaskError> {
        let now = self.clock.now();
        let until = Duration::try_days(days)
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| TaskError::validation(format!("upcoming window of {days} days is out of range")))?;
        self.query(
            &format!(
                "{SELECT_TASKS} WHERE completed = 0 AND due_date >= ?1 AND due_date <= ?2 \
                 ORDER BY due_date ASC, id ASC"
            ),
            params![format_timestamp(now), format_timestamp(until)],
        )
    }

    /// Overwrites every mutable field of the row with `task.id`.
    ///
    /// Timestamps are written as carried by `task`. Returns whether a row matched;
    /// an unknown id is not an error.
    pub fn update(&self, task: &Task) -> Result<bool, TaskError> {
        let id = task
            .id
            .ok_or_else(|| TaskError::validation("cannot update a task that was never created"))?;
        check_tags(&task.tags)?;
        let changed = self.conn.lock().execute(
            "UPDATE tasks SET description = ?1, priority = ?2, due_date = ?3, completed = ?4, \
             tags = ?5, updated_at = ?6, completed_at = ?7 WHERE id = ?8",
            params![
                task.description,
                task.priority.as_str(),
                task.due_date.map(format_timestamp),
                task.completed,
                join_tags(&task.tags),
                format_timestamp(task.updated_at),
                task.completed_at.map(format_timestamp),
                id,
            ],
        )?;
        debug!(id, changed, "updated task");
        Ok(changed > 0)
    }

    /// Returns whether a row was removed.
    pub fn delete(&self, id: i64) -> Result<bool, TaskError> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        debug!(id, changed, "deleted task");
        Ok(changed > 0)
    }

    /// Deletes all completed tasks and returns how many were removed.
    pub fn clear_completed(&self) -> Result<usize, TaskError> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM tasks WHERE completed = 1", [])?;
        debug!(removed, "cleared completed tasks");
        Ok(removed)
    }

    /// Case-insensitive substring match on the description or the joined tag text.
    ///
    /// Matching runs over the comma-joined tags, so a query may hit part of a tag
    /// or span two adjacent tags.
    pub fn search(&self, query: &str) -> Result<Vec<Task>, TaskError> {
        let pattern = format!("%{}%", escape_like(query));
        self.query(
            &format!(
                "{SELECT_TASKS} WHERE description LIKE ?1 ESCAPE '\\' OR tags LIKE ?1 ESCAPE '\\' \
                 ORDER BY created_at DESC, id DESC"
            ),
            params![pattern],
        )
    }

    pub fn stats(&self) -> Result<TaskStats, TaskError> {
        let now = format_timestamp(self.clock.now());
        let conn = self.conn.lock();
        let stats = conn.query_row(
            "SELECT COUNT(*), \
             COALESCE(SUM(completed = 0), 0), \
             COALESCE(SUM(completed = 1), 0), \
             COALESCE(SUM(completed = 0 AND due_date IS NOT NULL AND due_date < ?1), 0) \
             FROM tasks",
            params![now],
            |row| {
                Ok(TaskStats {
                    total: row.get::<_, i64>(0)? as u64,
                    pending: row.get::<_, i64>(1)? as u64,
                    completed: row.get::<_, i64>(2)? as u64,
                    overdue: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;
        Ok(stats)
    }

    fn query<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Task>, TaskError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawTask::from_row)?;
        let mut tasks = Vec::new();
        for raw in rows {
            tasks.push(raw?.into_task()?);
        }
        Ok(tasks)
    }
}

/// A row as stored, before column values are interpreted.
struct RawTask {
    id: i64,
    description: String,
    priority: String,
    due_date: Option<String>,
    completed: bool,
    tags: Option<String>,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl RawTask {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            description: row.get(1)?,
            priority: row.get(2)?,
            due_date: row.get(3)?,
            completed: row.get(4)?,
            tags: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            completed_at: row.get(8)?,
        })
    }

    fn into_task(self) -> Result<Task, TaskError> {
        let priority = self
            .priority
            .parse::<Priority>()
            .map_err(|_| corrupt("priority", &self.priority))?;
        Ok(Task {
            id: Some(self.id),
            description: self.description,
            priority,
            due_date: parse_optional_timestamp("due_date", self.due_date)?,
            completed: self.completed,
            tags: split_tags(self.tags.as_deref()),
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            completed_at: parse_optional_timestamp("completed_at", self.completed_at)?,
        })
    }
}

fn corrupt(column: &'static str, value: &str) -> TaskError {
    TaskError::Corrupt {
        column,
        value: value.to_string(),
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<NaiveDateTime, TaskError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| corrupt(column, value))
}

fn parse_optional_timestamp(
    column: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDateTime>, TaskError> {
    value.map(|v| parse_timestamp(column, &v)).transpose()
}

fn check_tags(tags: &Tags) -> Result<(), TaskError> {
    match tags.iter().find(|t| t.contains(TAG_SEPARATOR)) {
        Some(tag) => Err(TaskError::validation(format!(
            "tag '{tag}' must not contain '{TAG_SEPARATOR}'"
        ))),
        None => Ok(()),
    }
}

/// `None` for an empty set so the column stays NULL.
fn join_tags(tags: &Tags) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.as_slice().join(TAG_SEPARATOR))
    }
}

fn split_tags(joined: Option<&str>) -> Tags {
    joined
        .map(|s| s.split(TAG_SEPARATOR).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default()
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn setup() -> (Arc<FixedClock>, TaskStore) {
        let clock = Arc::new(FixedClock::new(noon()));
        let store = TaskStore::open_in_memory(clock.clone()).unwrap();
        (clock, store)
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let (_clock, store) = setup();
        store.init_schema().unwrap();
        store.init_schema().unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_tags_round_trip_through_column() {
        let tags: Tags = ["a", "b c", "d"].into_iter().collect();
        let joined = join_tags(&tags);
        assert_eq!(joined.as_deref(), Some("a,b c,d"));
        assert_eq!(split_tags(joined.as_deref()), tags);
        assert_eq!(join_tags(&Tags::new()), None);
        assert!(split_tags(None).is_empty());
        assert!(split_tags(Some("")).is_empty());
    }

    #[test]
    fn test_tag_with_separator_is_rejected() {
        let (clock, store) = setup();
        let mut task = Task::new("x", &*clock).unwrap().with_tags(["a,b"]);
        assert!(matches!(store.create(&mut task), Err(TaskError::Validation(_))));
        assert!(task.id.is_none());
        assert!(store.list_all().unwrap().is_empty());

        let mut ok = Task::new("x", &*clock).unwrap().with_tags(["a"]);
        store.create(&mut ok).unwrap();
        ok.add_tag("b,c", &*clock);
        assert!(matches!(store.update(&ok), Err(TaskError::Validation(_))));
        assert_eq!(store.get(ok.id.unwrap()).unwrap().unwrap().tags.as_slice(), ["a"]);
    }

    #[test]
    fn test_list_upcoming_rejects_out_of_range_window() {
        let (_clock, store) = setup();
        assert!(matches!(
            store.list_upcoming(i64::MAX),
            Err(TaskError::Validation(_))
        ));
        assert!(matches!(
            store.list_upcoming(100_000_000),
            Err(TaskError::Validation(_))
        ));
    }

    #[test]
    fn test_timestamp_format_keeps_nanoseconds() {
        let ts = noon() + Duration::nanoseconds(123_456_789);
        let s = format_timestamp(ts);
        assert_eq!(s, "2025-06-15T12:00:00.123456789");
        assert_eq!(parse_timestamp("created_at", &s).unwrap(), ts);
    }

    #[test]
    fn test_parse_timestamp_accepts_sqlite_default_format() {
        let ts = parse_timestamp("created_at", "2025-06-15 12:00:00").unwrap();
        assert_eq!(ts, noon());
        assert!(matches!(
            parse_timestamp("created_at", "yesterday"),
            Err(TaskError::Corrupt { column: "created_at", .. })
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let (clock, store) = setup();
        let mut a = Task::new("50% off sale", &*clock).unwrap();
        let mut b = Task::new("500 items", &*clock).unwrap();
        store.create(&mut a).unwrap();
        store.create(&mut b).unwrap();

        let found = store.search("50%").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[test]
    fn test_corrupt_priority_is_reported() {
        let (_clock, store) = setup();
        {
            let conn = store.conn.lock();
            conn.execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 INSERT INTO tasks (description, priority, created_at, updated_at)
                 VALUES ('bad', 'urgent', '2025-06-15T12:00:00', '2025-06-15T12:00:00');",
            )
            .unwrap();
        }
        assert!(matches!(
            store.list_all(),
            Err(TaskError::Corrupt { column: "priority", .. })
        ));
    }

    #[test]
    fn test_update_without_id_is_rejected() {
        let (clock, store) = setup();
        let task = Task::new("never saved", &*clock).unwrap();
        assert!(matches!(store.update(&task), Err(TaskError::Validation(_))));
    }
}

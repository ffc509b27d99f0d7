use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::TaskError;

/// Task priority levels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of the stored form. Use [`crate::parse::parse_priority`] for user input.
impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Insertion-ordered set of tags. Membership is exact, case-sensitive string equality.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tag` unless it is empty or already present. Returns whether the set changed.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if tag.is_empty() || self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    /// Removes `tag` if present. Returns whether the set changed.
    pub fn remove(&mut self, tag: &str) -> bool {
        match self.0.iter().position(|t| t == tag) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

/// Represents a single task.
///
/// Mutators only change the in-memory value. Persist the result with
/// [`TaskStore::update`](crate::storage::TaskStore::update).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Assigned by the store on creation.
    pub id: Option<i64>,
    /// The description of the task.
    pub description: String,
    /// The priority of the task.
    pub priority: Priority,
    /// The due date of the task.
    pub due_date: Option<NaiveDateTime>,
    /// Whether the task is completed.
    pub completed: bool,
    /// Tags attached to the task.
    pub tags: Tags,
    /// When the task was created.
    pub created_at: NaiveDateTime,
    /// When the task was last modified.
    pub updated_at: NaiveDateTime,
    /// When the task was completed, if it has been.
    pub completed_at: Option<NaiveDateTime>,
}

impl Task {
    /// Creates an unsaved, pending, medium-priority task stamped with the clock's "now".
    ///
    /// Fails if `description` is empty.
    pub fn new(description: impl Into<String>, clock: &dyn Clock) -> Result<Self, TaskError> {
        let description = description.into();
        if description.is_empty() {
            return Err(TaskError::validation("description is required"));
        }
        let now = clock.now();
        Ok(Task {
            id: None,
            description,
            priority: Priority::default(),
            due_date: None,
            completed: false,
            tags: Tags::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDateTime>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Sets the initial completion flag. `completed_at` stays unset.
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Calling this on a completed task re-stamps `completed_at`.
    pub fn mark_completed(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        self.completed = true;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn update_description(&mut self, description: impl Into<String>, clock: &dyn Clock) {
        self.description = description.into();
        self.updated_at = clock.now();
    }

    pub fn update_priority(&mut self, priority: Priority, clock: &dyn Clock) {
        self.priority = priority;
        self.updated_at = clock.now();
    }

    pub fn update_due_date(&mut self, due_date: Option<NaiveDateTime>, clock: &dyn Clock) {
        self.due_date = due_date;
        self.updated_at = clock.now();
    }

    pub fn add_tag(&mut self, tag: impl Into<String>, clock: &dyn Clock) {
        if self.tags.insert(tag) {
            self.updated_at = clock.now();
        }
    }

    pub fn remove_tag(&mut self, tag: &str, clock: &dyn Clock) {
        if self.tags.remove(tag) {
            self.updated_at = clock.now();
        }
    }

    /// Pending with a due date strictly in the past.
    pub fn is_overdue(&self, clock: &dyn Clock) -> bool {
        match self.due_date {
            Some(due) if !self.completed => due < clock.now(),
            _ => false,
        }
    }

    /// Due on today's calendar date, whether or not completed.
    pub fn is_due_today(&self, clock: &dyn Clock) -> bool {
        self.due_date
            .map(|due| due.date() == clock.now().date())
            .unwrap_or(false)
    }
}

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use todomaster::clock::FixedClock;
use todomaster::commands::*;
use todomaster::error::TaskError;
use todomaster::models::Priority;
use todomaster::storage::TaskStore;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Runs `f` against a fresh on-disk store in its own temp directory.
fn with_test_db<F>(f: F)
where
    F: FnOnce(&TaskStore, &FixedClock),
{
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(now()));
    let store = TaskStore::open(dir.path().join("tasks.db"), clock.clone()).unwrap();
    f(&store, &*clock);
}

#[test]
fn test_add_and_list() {
    with_test_db(|store, _clock| {
        cmd_add(store, "Test Task", Some("high"), None, Some("work, urgent"), true).unwrap();

        let tasks = cmd_list(store, ListScope::Pending, None, None, false, true).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Test Task");
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[0].tags.as_slice(), ["work", "urgent"]);
    });
}

#[test]
fn test_add_with_due_date() {
    with_test_db(|store, _clock| {
        let task = cmd_add(store, "Dentist", None, Some("2025-07-01"), None, true).unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(task.due_date, Some(expected));
        assert_eq!(task.priority, Priority::Medium);
    });
}

#[test]
fn test_add_invalid_due_date_writes_nothing() {
    with_test_db(|store, _clock| {
        let err = cmd_add(store, "Broken", None, Some("someday"), None, true).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert!(store.list_all().unwrap().is_empty());
    });
}

#[test]
fn test_add_huge_relative_due_date_is_rejected() {
    with_test_db(|store, _clock| {
        for due in ["+100000000d", "+99999999w"] {
            let err = cmd_add(store, "Far away", None, Some(due), None, true).unwrap_err();
            assert!(matches!(err, TaskError::Validation(_)));
        }
        assert!(store.list_all().unwrap().is_empty());
    });
}

#[test]
fn test_edit_huge_relative_due_date_keeps_task() {
    with_test_db(|store, _clock| {
        let task = cmd_add(store, "Stay put", None, Some("+1d"), None, true).unwrap();
        let id = task.id.unwrap().to_string();

        let err = cmd_edit(store, &id, None, None, Some("+99999999w"), None, None, true).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(store.get(task.id.unwrap()).unwrap().unwrap(), task);
    });
}

#[test]
fn test_add_rejects_blank_description() {
    with_test_db(|store, _clock| {
        let err = cmd_add(store, "  <> ", None, None, None, true).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    });
}

#[test]
fn test_list_filters() {
    with_test_db(|store, clock| {
        cmd_add(store, "High work", Some("h"), None, Some("work"), true).unwrap();
        clock.advance(Duration::seconds(1));
        cmd_add(store, "Low home", Some("low"), None, Some("home"), true).unwrap();
        clock.advance(Duration::seconds(1));
        cmd_add(store, "Late", None, Some("yesterday"), None, true).unwrap();

        let high = cmd_list(store, ListScope::All, Some("high"), None, false, true).unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].description, "High work");

        let home = cmd_list(store, ListScope::All, None, Some("home"), false, true).unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].description, "Low home");

        let overdue = cmd_list(store, ListScope::Overdue, None, None, false, true).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].description, "Late");
    });
}

#[test]
fn test_complete_task() {
    with_test_db(|store, clock| {
        let task = cmd_add(store, "Task to complete", None, None, None, true).unwrap();
        let id = task.id.unwrap().to_string();

        clock.advance(Duration::minutes(1));
        cmd_done(store, &id, true).unwrap();

        let tasks = cmd_list(store, ListScope::All, None, None, false, true).unwrap();
        assert!(tasks[0].completed);
        assert!(tasks[0].completed_at.is_some());
    });
}

#[test]
fn test_complete_twice_keeps_first_completion() {
    with_test_db(|store, clock| {
        let task = cmd_add(store, "Once", None, None, None, true).unwrap();
        let id = task.id.unwrap().to_string();

        let first = cmd_done(store, &id, true).unwrap();
        clock.advance(Duration::hours(1));
        let second = cmd_done(store, &id, true).unwrap();
        assert_eq!(first.completed_at, second.completed_at);
    });
}

#[test]
fn test_done_invalid_and_missing_ids() {
    with_test_db(|store, _clock| {
        assert!(matches!(cmd_done(store, "abc", true), Err(TaskError::Validation(_))));
        assert!(matches!(cmd_done(store, "0", true), Err(TaskError::Validation(_))));
        assert!(matches!(
            cmd_done(store, "77", true),
            Err(TaskError::NotFound { id: 77 })
        ));
    });
}

#[test]
fn test_edit_task() {
    with_test_db(|store, clock| {
        let task = cmd_add(store, "Draft", Some("low"), None, Some("a, b"), true).unwrap();
        let id = task.id.unwrap().to_string();

        clock.advance(Duration::minutes(5));
        let edited = cmd_edit(
            store,
            &id,
            Some("Final"),
            Some("high"),
            Some("tomorrow"),
            Some("c, a"),
            Some("b"),
            true,
        )
        .unwrap();

        assert_eq!(edited.description, "Final");
        assert_eq!(edited.priority, Priority::High);
        assert_eq!(edited.due_date, Some(now() + Duration::minutes(5) + Duration::days(1)));
        assert_eq!(edited.tags.as_slice(), ["a", "c"]);
        assert_eq!(edited.updated_at, now() + Duration::minutes(5));
        assert_eq!(edited.created_at, task.created_at);

        let stored = store.get(task.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored, edited);
    });
}

#[test]
fn test_delete_task() {
    with_test_db(|store, _clock| {
        let task = cmd_add(store, "Task to delete", None, None, None, true).unwrap();
        let id = task.id.unwrap().to_string();

        assert!(cmd_delete(store, &id, true, true).unwrap());
        assert!(store.list_all().unwrap().is_empty());
        assert!(matches!(
            cmd_delete(store, &id, true, true),
            Err(TaskError::NotFound { .. })
        ));
    });
}

#[test]
fn test_clear_and_stats() {
    with_test_db(|store, _clock| {
        for name in ["one", "two", "three"] {
            cmd_add(store, name, None, None, None, true).unwrap();
        }
        let first = store.list_all().unwrap().pop().unwrap();
        cmd_done(store, &first.id.unwrap().to_string(), true).unwrap();

        let stats = cmd_stats(store, false, true).unwrap();
        assert_eq!((stats.total, stats.pending, stats.completed), (3, 2, 1));

        assert_eq!(cmd_clear(store, true).unwrap(), 1);
        assert_eq!(cmd_clear(store, true).unwrap(), 0);
        assert_eq!(cmd_stats(store, false, true).unwrap().total, 2);
    });
}

#[test]
fn test_show_task() {
    with_test_db(|store, _clock| {
        let task = cmd_add(store, "Look at me", None, None, None, true).unwrap();
        let shown = cmd_show(store, &task.id.unwrap().to_string(), false, true).unwrap();
        assert_eq!(shown, task);
    });
}

#[test]
fn test_today_splits_overdue_from_due_today() {
    with_test_db(|store, _clock| {
        cmd_add(store, "This morning", None, Some("2025-06-15T08:00:00"), None, true).unwrap();
        cmd_add(store, "This evening", None, Some("2025-06-15T20:00:00"), None, true).unwrap();
        cmd_add(store, "Last week", None, Some("2025-06-08"), None, true).unwrap();
        cmd_add(store, "Next week", None, Some("2025-06-22"), None, true).unwrap();

        let (overdue, today) = cmd_today(store, true).unwrap();
        let overdue: Vec<_> = overdue.iter().map(|t| t.description.as_str()).collect();
        let today: Vec<_> = today.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(overdue, ["Last week", "This morning"]);
        assert_eq!(today, ["This evening"]);
    });
}

#[test]
fn test_upcoming() {
    with_test_db(|store, _clock| {
        cmd_add(store, "Soon", None, Some("+3d"), None, true).unwrap();
        cmd_add(store, "Later", None, Some("+2w"), None, true).unwrap();
        cmd_add(store, "Undated", None, None, None, true).unwrap();

        let upcoming = cmd_upcoming(store, true).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].description, "Soon");
    });
}

#[test]
fn test_search_tasks() {
    with_test_db(|store, clock| {
        cmd_add(store, "Buy milk", None, None, Some("shopping"), true).unwrap();
        clock.advance(Duration::seconds(1));
        cmd_add(store, "Buy bread", None, None, Some("shopping"), true).unwrap();
        clock.advance(Duration::seconds(1));
        cmd_add(store, "Write code", None, None, Some("work"), true).unwrap();

        let found = cmd_search(store, "shopping", false, true).unwrap();
        let names: Vec<_> = found.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, ["Buy bread", "Buy milk"]);
    });
}

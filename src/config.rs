use std::path::PathBuf;

/// Environment variable that overrides the default database location.
pub const DB_ENV_VAR: &str = "TODOMASTER_DB";

/// Returns the path to the tasks database file (`tasks.db`).
///
/// The path is determined in the following order:
/// 1. `explicit` (the `--db` flag).
/// 2. `TODOMASTER_DB` environment variable.
/// 3. `~/.local/share/todomaster/tasks.db` (on Linux).
/// 4. `./tasks.db` (fallback).
///
/// The directory is not created here; [`TaskStore::open`](crate::storage::TaskStore::open) does that.
pub fn db_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(p) = explicit {
        return p;
    }
    if let Some(p) = std::env::var_os(DB_ENV_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(p);
    }
    match dirs::data_local_dir() {
        Some(mut p) => {
            p.push("todomaster");
            p.push("tasks.db");
            p
        }
        None => PathBuf::from("tasks.db"),
    }
}

//! # TodoMaster
//!
//! A terminal to-do list backed by a local SQLite file.
//!
//! Tasks carry a description, a priority (`low`, `medium`, `high`), an optional due
//! date and a set of tags. The library splits into:
//!
//! *   [`models`]: the [`Task`](models::Task) record and its state transitions.
//! *   [`storage`]: [`TaskStore`](storage::TaskStore), the persistent collection and its queries.
//! *   [`clock`]: the time source both of the above read "now" from.
//! *   [`parse`] / [`ui`]: turning user input into field values and tasks into terminal output.
//! *   [`commands`]: one function per CLI subcommand.
//!
//! Record mutators never persist on their own; pass the changed task to
//! [`TaskStore::update`](storage::TaskStore::update).
//!
//! ## Data Storage
//!
//! Tasks are saved in your local data directory:
//! *   Linux: `~/.local/share/todomaster/tasks.db`
//! *   macOS: `~/Library/Application Support/todomaster/tasks.db`
//! *   Windows: `%LOCALAPPDATA%\todomaster\tasks.db`
//!
//! You can override this with `--db` or the `TODOMASTER_DB` environment variable.

pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod parse;
pub mod storage;
pub mod ui;

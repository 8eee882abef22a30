//!
//! waypoint storage module
//! -----------------------
//! SQLite persistence for users and their trip records. Every resource row
//! carries the owning `user_id`, and every repository method takes the owner
//! explicitly and filters on it; there is no unscoped read or write of
//! resource data.
//!
//! The public API centers around the `Store` type, which is usually wrapped in a
//! thread-safe `SharedStore` (`Arc<Mutex<Store>>`) by the server. Holding the
//! mutex serializes writers, and task moves additionally run inside an
//! immediate transaction so the read-compute-write of a column is atomic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

mod schema;
mod users;
mod todos;
mod itinerary;
mod stays;
mod expenses;

pub use users::{Profile, ProfileUpdate, UserCredentials, UserSummary};
pub use todos::{NewTodo, Todo, TodoUpdate};
pub use itinerary::{ItineraryInput, ItineraryItem};
pub use stays::{Stay, StayInput};
pub use expenses::{Expense, ExpenseInput};

/// Handle on the trip database.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (creating if needed) the database file at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating database directory {}", dir.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("opening database {}", path.display()))?;
        let store = Self { conn, path: Some(path) };
        store.init()?;
        Ok(store)
    }

    /// Private throwaway database, used by tests and tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        let store = Self { conn, path: None };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(schema::PRAGMAS).context("applying pragmas")?;
        self.conn.execute_batch(schema::TABLES).context("creating tables")?;
        debug!(target: "waypoint::storage", path = ?self.path, "schema ensured");
        Ok(())
    }
}

#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Store::open(path)?))))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Store::open_in_memory()?))))
    }
}

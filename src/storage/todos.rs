use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Store;
use crate::error::{AppError, AppResult};
use crate::ordering::{self, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<String>,
    pub position: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<String>,
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

const TODO_COLUMNS: &str = "id, title, status, due_date, position";

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        status: row.get(2)?,
        due_date: row.get(3)?,
        position: row.get(4)?,
    })
}

fn fetch_todo(conn: &Connection, owner: i64, id: i64) -> AppResult<Option<Todo>> {
    let sql = format!("SELECT {} FROM todos WHERE id = ?1 AND user_id = ?2", TODO_COLUMNS);
    Ok(conn.query_row(&sql, params![id, owner], todo_from_row).optional()?)
}

fn todo_not_found(id: i64) -> AppError {
    AppError::not_found("todo_not_found".to_string(), format!("todo {} not found", id))
}

/// `(id, position)` of every item in the owner's column, in display order,
/// leaving out `exclude`.
fn column(conn: &Connection, owner: i64, status: TaskStatus, exclude: Option<i64>) -> AppResult<Vec<(i64, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, position FROM todos
         WHERE user_id = ?1 AND status = ?2 AND id != ?3
         ORDER BY position, id",
    )?;
    let rows = stmt.query_map(params![owner, status, exclude.unwrap_or(-1)], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn column_max(conn: &Connection, owner: i64, status: TaskStatus) -> AppResult<Option<f64>> {
    Ok(conn.query_row(
        "SELECT MAX(position) FROM todos WHERE user_id = ?1 AND status = ?2",
        params![owner, status],
        |row| row.get(0),
    )?)
}

/// Give every item of `items` a fresh, evenly spaced rank in its current order.
fn renumber(conn: &Connection, owner: i64, items: &[(i64, f64)]) -> AppResult<Vec<f64>> {
    let fresh = ordering::renumbered(items.len());
    let mut stmt = conn.prepare("UPDATE todos SET position = ?1 WHERE id = ?2 AND user_id = ?3")?;
    for ((id, _), pos) in items.iter().zip(&fresh) {
        stmt.execute(params![pos, id, owner])?;
    }
    Ok(fresh)
}

impl Store {
    /// All of the owner's todos, grouped by column and ordered by rank.
    pub fn list_todos(&self, owner: i64) -> AppResult<Vec<Todo>> {
        let sql = format!(
            "SELECT {} FROM todos WHERE user_id = ?1
             ORDER BY CASE status WHEN 'pending' THEN 0 WHEN 'in-progress' THEN 1 ELSE 2 END, position, id",
            TODO_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], todo_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn todo(&self, owner: i64, id: i64) -> AppResult<Todo> {
        fetch_todo(&self.conn, owner, id)?.ok_or_else(|| todo_not_found(id))
    }

    /// New todos land at the end of the pending column.
    pub fn create_todo(&mut self, owner: i64, new: &NewTodo) -> AppResult<Todo> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(AppError::user("invalid_title", "title cannot be empty"));
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let position = ordering::append_position(column_max(&tx, owner, TaskStatus::Pending)?);
        tx.execute(
            "INSERT INTO todos (user_id, title, status, due_date, position) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![owner, title, TaskStatus::Pending, new.due_date, position],
        )?;
        let id = tx.last_insert_rowid();
        let todo = fetch_todo(&tx, owner, id)?.ok_or_else(|| todo_not_found(id))?;
        tx.commit()?;
        Ok(todo)
    }

    /// Edit title, due date or column. A column change appends the item to the
    /// end of its new column.
    pub fn update_todo(&mut self, owner: i64, id: i64, update: &TodoUpdate) -> AppResult<Todo> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = fetch_todo(&tx, owner, id)?.ok_or_else(|| todo_not_found(id))?;
        if let Some(title) = update.title.as_deref() {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::user("invalid_title", "title cannot be empty"));
            }
            tx.execute("UPDATE todos SET title = ?1 WHERE id = ?2 AND user_id = ?3", params![title, id, owner])?;
        }
        if let Some(due) = update.due_date.as_deref() {
            tx.execute("UPDATE todos SET due_date = ?1 WHERE id = ?2 AND user_id = ?3", params![due, id, owner])?;
        }
        if let Some(status) = update.status.filter(|s| *s != current.status) {
            let position = ordering::append_position(column_max(&tx, owner, status)?);
            tx.execute(
                "UPDATE todos SET status = ?1, position = ?2 WHERE id = ?3 AND user_id = ?4",
                params![status, position, id, owner],
            )?;
        }
        let todo = fetch_todo(&tx, owner, id)?.ok_or_else(|| todo_not_found(id))?;
        tx.commit()?;
        Ok(todo)
    }

    /// Move a todo to `index` of column `status`.
    ///
    /// Only the moved row is written, unless the destination column can no
    /// longer be bisected at that spot; then the column is renumbered first,
    /// inside the same transaction.
    pub fn move_todo(&mut self, owner: i64, id: i64, status: TaskStatus, index: usize) -> AppResult<Todo> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if fetch_todo(&tx, owner, id)?.is_none() {
            return Err(todo_not_found(id));
        }
        let others = column(&tx, owner, status, Some(id))?;
        if index > others.len() {
            return Err(AppError::user(
                "invalid_index".to_string(),
                format!("index {} out of range for column '{}' of {} items", index, status, others.len()),
            ));
        }
        let mut positions: Vec<f64> = others.iter().map(|(_, p)| *p).collect();
        if !ordering::is_well_formed(&positions) || ordering::is_degenerate(&positions, index) {
            warn!(
                target: "waypoint::ordering",
                user_id = owner, column = %status, items = others.len(),
                "column ranks exhausted; renumbering"
            );
            positions = renumber(&tx, owner, &others)?;
        }
        let position = ordering::insertion_position(&positions, index);
        tx.execute(
            "UPDATE todos SET status = ?1, position = ?2 WHERE id = ?3 AND user_id = ?4",
            params![status, position, id, owner],
        )?;
        let todo = fetch_todo(&tx, owner, id)?.ok_or_else(|| todo_not_found(id))?;
        tx.commit()?;
        debug!(target: "waypoint::ordering", todo_id = id, column = %status, index, position, "todo moved");
        Ok(todo)
    }

    pub fn delete_todo(&self, owner: i64, id: i64) -> AppResult<()> {
        let n = self.conn.execute("DELETE FROM todos WHERE id = ?1 AND user_id = ?2", params![id, owner])?;
        if n == 0 { return Err(todo_not_found(id)); }
        Ok(())
    }
}

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::Store;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub title: String,
    pub amount: f64,
    pub category: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseInput {
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

const COLUMNS: &str = "id, title, amount, category, date, notes";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        title: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        date: row.get(4)?,
        notes: row.get(5)?,
    })
}

impl Store {
    /// Most recent first.
    pub fn list_expenses(&self, owner: i64) -> AppResult<Vec<Expense>> {
        let sql = format!("SELECT {} FROM expenses WHERE user_id = ?1 ORDER BY date DESC, id DESC", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn create_expense(&self, owner: i64, e: &ExpenseInput) -> AppResult<Expense> {
        if e.title.trim().is_empty() {
            return Err(AppError::user("invalid_title", "title cannot be empty"));
        }
        if !e.amount.is_finite() {
            return Err(AppError::user("invalid_amount", "amount must be a finite number"));
        }
        self.conn.execute(
            "INSERT INTO expenses (user_id, title, amount, category, date, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![owner, e.title.trim(), e.amount, e.category, e.date, e.notes],
        )?;
        let id = self.conn.last_insert_rowid();
        let sql = format!("SELECT {} FROM expenses WHERE id = ?1 AND user_id = ?2", COLUMNS);
        self.conn
            .query_row(&sql, params![id, owner], from_row)
            .optional()?
            .ok_or_else(|| AppError::internal("store_error", "inserted expense vanished"))
    }

    pub fn delete_expense(&self, owner: i64, id: i64) -> AppResult<()> {
        let n = self.conn.execute("DELETE FROM expenses WHERE id = ?1 AND user_id = ?2", params![id, owner])?;
        if n == 0 {
            return Err(AppError::not_found("expense_not_found".to_string(), format!("expense {} not found", id)));
        }
        Ok(())
    }

    /// Sum of the owner's expenses, for budget tracking against `budget_limit`.
    pub fn expense_total(&self, owner: i64) -> AppResult<f64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM expenses WHERE user_id = ?1",
            params![owner],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(title: &str, amount: f64, date: &str) -> ExpenseInput {
        ExpenseInput { title: title.into(), amount, date: Some(date.into()), ..Default::default() }
    }

    #[test]
    fn newest_first_and_totals() {
        let store = Store::open_in_memory().expect("store");
        let u = store.create_user("alice", "h", None).expect("user");
        store.create_expense(u, &expense("train", 30.0, "2025-06-01")).expect("create");
        store.create_expense(u, &expense("dinner", 55.5, "2025-06-03")).expect("create");
        let titles: Vec<String> = store.list_expenses(u).expect("list").into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["dinner", "train"]);
        assert_eq!(store.expense_total(u).expect("total"), 85.5);
    }

    #[test]
    fn deleting_owner_cascades() {
        let store = Store::open_in_memory().expect("store");
        let u = store.create_user("alice", "h", None).expect("user");
        store.create_expense(u, &expense("taxi", 12.0, "2025-06-02")).expect("create");
        assert!(store.delete_user("alice").expect("delete"));
        assert_eq!(store.expense_total(u).expect("total"), 0.0);
    }
}

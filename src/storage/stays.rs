use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::Store;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stay {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub booking_ref: Option<String>,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StayInput {
    pub name: String,
    pub address: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub booking_ref: Option<String>,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

const COLUMNS: &str = "id, name, address, check_in, check_out, booking_ref, notes, price, website, phone, email";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Stay> {
    Ok(Stay {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        check_in: row.get(3)?,
        check_out: row.get(4)?,
        booking_ref: row.get(5)?,
        notes: row.get(6)?,
        price: row.get(7)?,
        website: row.get(8)?,
        phone: row.get(9)?,
        email: row.get(10)?,
    })
}

fn not_found(id: i64) -> AppError {
    AppError::not_found("stay_not_found".to_string(), format!("stay {} not found", id))
}

fn validate(input: &StayInput) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::user("invalid_name", "name cannot be empty"));
    }
    if let (Some(a), Some(b)) = (input.check_in.as_deref(), input.check_out.as_deref()) {
        // ISO dates compare correctly as strings
        if !a.is_empty() && !b.is_empty() && b < a {
            return Err(AppError::user("invalid_dates", "check-out is before check-in"));
        }
    }
    Ok(())
}

impl Store {
    pub fn list_stays(&self, owner: i64) -> AppResult<Vec<Stay>> {
        let sql = format!("SELECT {} FROM stays WHERE user_id = ?1 ORDER BY check_in, id", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn stay(&self, owner: i64, id: i64) -> AppResult<Stay> {
        let sql = format!("SELECT {} FROM stays WHERE id = ?1 AND user_id = ?2", COLUMNS);
        self.conn.query_row(&sql, params![id, owner], from_row).optional()?.ok_or_else(|| not_found(id))
    }

    pub fn create_stay(&self, owner: i64, s: &StayInput) -> AppResult<Stay> {
        validate(s)?;
        self.conn.execute(
            "INSERT INTO stays (user_id, name, address, check_in, check_out, booking_ref, notes, price, website, phone, email)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![owner, s.name.trim(), s.address, s.check_in, s.check_out, s.booking_ref, s.notes, s.price, s.website, s.phone, s.email],
        )?;
        self.stay(owner, self.conn.last_insert_rowid())
    }

    pub fn update_stay(&self, owner: i64, id: i64, s: &StayInput) -> AppResult<Stay> {
        validate(s)?;
        let n = self.conn.execute(
            "UPDATE stays SET name = ?1, address = ?2, check_in = ?3, check_out = ?4, booking_ref = ?5, notes = ?6,
                price = ?7, website = ?8, phone = ?9, email = ?10
             WHERE id = ?11 AND user_id = ?12",
            params![s.name.trim(), s.address, s.check_in, s.check_out, s.booking_ref, s.notes, s.price, s.website, s.phone, s.email, id, owner],
        )?;
        if n == 0 { return Err(not_found(id)); }
        self.stay(owner, id)
    }

    pub fn delete_stay(&self, owner: i64, id: i64) -> AppResult<()> {
        let n = self.conn.execute("DELETE FROM stays WHERE id = ?1 AND user_id = ?2", params![id, owner])?;
        if n == 0 { return Err(not_found(id)); }
        Ok(())
    }
}

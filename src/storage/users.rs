use rusqlite::{params, OptionalExtension, Row, ToSql, Transaction};
use serde::{Deserialize, Deserializer, Serialize};

use super::Store;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub home_city: Option<String>,
    pub home_lat: Option<f64>,
    pub home_lon: Option<f64>,
    pub trip_date: Option<String>,
    pub budget_limit: Option<f64>,
}

/// Partial profile update. The outer `Option` records whether a field was
/// sent at all; `Some(None)` (JSON `null`) clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "present")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub home_city: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub home_lat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub home_lon: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub trip_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub budget_limit: Option<Option<f64>>,
    /// Plain text; hashed by the caller before it reaches the store.
    pub password: Option<String>,
}

// Only called for keys present in the body, so `null` arrives as `Some(None)`
fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn set_column<T: ToSql>(tx: &Transaction<'_>, column: &str, value: &Option<Option<T>>, user_id: i64) -> rusqlite::Result<()> {
    if let Some(value) = value {
        tx.execute(&format!("UPDATE users SET {} = ?1 WHERE id = ?2", column), params![value, user_id])?;
    }
    Ok(())
}

const PROFILE_COLUMNS: &str = "id, username, display_name, home_city, home_lat, home_lon, trip_date, budget_limit";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        home_city: row.get(3)?,
        home_lat: row.get(4)?,
        home_lon: row.get(5)?,
        trip_date: row.get(6)?,
        budget_limit: row.get(7)?,
    })
}

impl Store {
    pub fn create_user(&self, username: &str, password_hash: &str, display_name: Option<&str>) -> AppResult<i64> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::user("invalid_username", "username cannot be empty"));
        }
        let res = self.conn.execute(
            "INSERT INTO users (username, password_hash, display_name) VALUES (?1, ?2, ?3)",
            params![username, password_hash, display_name],
        );
        match res {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) => match AppError::from(e) {
                AppError::Conflict { .. } => Err(AppError::conflict("username_taken".to_string(), format!("username '{}' already exists", username))),
                other => Err(other),
            },
        }
    }

    pub fn find_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, username, password_hash, display_name FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserCredentials {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                        display_name: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    pub fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        let mut stmt = self.conn.prepare("SELECT id, username, display_name FROM users ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(UserSummary { id: row.get(0)?, username: row.get(1)?, display_name: row.get(2)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a user and, through the foreign keys, everything they own.
    pub fn delete_user(&self, username: &str) -> AppResult<bool> {
        let n = self.conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;
        Ok(n > 0)
    }

    pub fn set_password(&self, username: &str, password_hash: &str) -> AppResult<bool> {
        let n = self.conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE username = ?2",
            params![password_hash, username],
        )?;
        Ok(n > 0)
    }

    pub fn profile(&self, user_id: i64) -> AppResult<Profile> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", PROFILE_COLUMNS);
        self.conn
            .query_row(&sql, params![user_id], profile_from_row)
            .optional()?
            .ok_or_else(|| AppError::not_found("user_not_found", "user not found"))
    }

    /// Apply a profile update. `password_hash` replaces the stored hash when given.
    pub fn update_profile(&mut self, user_id: i64, update: &ProfileUpdate, password_hash: Option<&str>) -> AppResult<Profile> {
        let tx = self.conn.transaction()?;
        let exists = tx
            .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(AppError::not_found("user_not_found", "user not found"));
        }
        if let Some(hash) = password_hash {
            tx.execute("UPDATE users SET password_hash = ?1 WHERE id = ?2", params![hash, user_id])?;
        }
        set_column(&tx, "display_name", &update.display_name, user_id)?;
        set_column(&tx, "home_city", &update.home_city, user_id)?;
        set_column(&tx, "home_lat", &update.home_lat, user_id)?;
        set_column(&tx, "home_lon", &update.home_lon, user_id)?;
        set_column(&tx, "trip_date", &update.trip_date, user_id)?;
        set_column(&tx, "budget_limit", &update.budget_limit, user_id)?;
        tx.commit()?;
        self.profile(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_username_is_conflict() {
        let store = Store::open_in_memory().expect("store");
        store.create_user("alice", "h", None).expect("first");
        let err = store.create_user("alice", "h", None).expect_err("duplicate");
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.code_str(), "username_taken");
    }

    #[test]
    fn profile_update_is_partial() {
        let mut store = Store::open_in_memory().expect("store");
        let id = store.create_user("bob", "h", Some("Bob")).expect("user");
        let upd = ProfileUpdate {
            home_city: Some(Some("Lisbon".to_string())),
            budget_limit: Some(Some(2500.0)),
            ..Default::default()
        };
        let p = store.update_profile(id, &upd, None).expect("update");
        assert_eq!(p.display_name.as_deref(), Some("Bob"));
        assert_eq!(p.home_city.as_deref(), Some("Lisbon"));
        assert_eq!(p.budget_limit, Some(2500.0));

        store.update_profile(id, &ProfileUpdate::default(), Some("h2")).expect("password");
        assert_eq!(store.find_credentials("bob").expect("lookup").map(|c| c.password_hash), Some("h2".to_string()));
    }

    #[test]
    fn null_clears_and_absent_keeps() {
        let mut store = Store::open_in_memory().expect("store");
        let id = store.create_user("dana", "h", Some("Dana")).expect("user");
        let set: ProfileUpdate = serde_json::from_str(r#"{"home_city":"Oslo","budget_limit":900.5}"#).expect("json");
        store.update_profile(id, &set, None).expect("set");

        let clear: ProfileUpdate = serde_json::from_str(r#"{"budget_limit":null}"#).expect("json");
        assert_eq!(clear.budget_limit, Some(None));
        assert_eq!(clear.home_city, None);
        let p = store.update_profile(id, &clear, None).expect("clear");
        assert_eq!(p.budget_limit, None);
        assert_eq!(p.home_city.as_deref(), Some("Oslo"));
        assert_eq!(p.display_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn admin_operations() {
        let store = Store::open_in_memory().expect("store");
        store.create_user("carol", "h", None).expect("user");
        assert!(store.set_password("carol", "h2").expect("passwd"));
        assert!(!store.set_password("nobody", "h2").expect("passwd"));
        assert_eq!(store.list_users().expect("list").len(), 1);
        assert!(store.delete_user("carol").expect("delete"));
        assert!(store.list_users().expect("list").is_empty());
        assert!(store.profile(1).is_err());
    }
}

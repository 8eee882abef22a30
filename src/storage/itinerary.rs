use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::Store;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItineraryItem {
    pub id: i64,
    pub title: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItineraryInput {
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

const COLUMNS: &str = "id, title, date, time, location, description, type, lat, lon";

fn from_row(row: &Row<'_>) -> rusqlite::Result<ItineraryItem> {
    Ok(ItineraryItem {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        location: row.get(4)?,
        description: row.get(5)?,
        kind: row.get(6)?,
        lat: row.get(7)?,
        lon: row.get(8)?,
    })
}

fn not_found(id: i64) -> AppError {
    AppError::not_found("itinerary_not_found".to_string(), format!("itinerary item {} not found", id))
}

fn require_title(input: &ItineraryInput) -> AppResult<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::user("invalid_title", "title cannot be empty"));
    }
    Ok(())
}

impl Store {
    /// Chronological itinerary for the owner.
    pub fn list_itinerary(&self, owner: i64) -> AppResult<Vec<ItineraryItem>> {
        let sql = format!("SELECT {} FROM itinerary WHERE user_id = ?1 ORDER BY date, time, id", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn itinerary_item(&self, owner: i64, id: i64) -> AppResult<ItineraryItem> {
        let sql = format!("SELECT {} FROM itinerary WHERE id = ?1 AND user_id = ?2", COLUMNS);
        self.conn.query_row(&sql, params![id, owner], from_row).optional()?.ok_or_else(|| not_found(id))
    }

    pub fn create_itinerary(&self, owner: i64, input: &ItineraryInput) -> AppResult<ItineraryItem> {
        require_title(input)?;
        self.conn.execute(
            "INSERT INTO itinerary (user_id, title, date, time, location, description, type, lat, lon)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![owner, input.title.trim(), input.date, input.time, input.location, input.description, input.kind, input.lat, input.lon],
        )?;
        self.itinerary_item(owner, self.conn.last_insert_rowid())
    }

    pub fn update_itinerary(&self, owner: i64, id: i64, input: &ItineraryInput) -> AppResult<ItineraryItem> {
        require_title(input)?;
        let n = self.conn.execute(
            "UPDATE itinerary SET title = ?1, date = ?2, time = ?3, location = ?4, description = ?5, type = ?6, lat = ?7, lon = ?8
             WHERE id = ?9 AND user_id = ?10",
            params![input.title.trim(), input.date, input.time, input.location, input.description, input.kind, input.lat, input.lon, id, owner],
        )?;
        if n == 0 { return Err(not_found(id)); }
        self.itinerary_item(owner, id)
    }

    pub fn delete_itinerary(&self, owner: i64, id: i64) -> AppResult<()> {
        let n = self.conn.execute("DELETE FROM itinerary WHERE id = ?1 AND user_id = ?2", params![id, owner])?;
        if n == 0 { return Err(not_found(id)); }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, date: &str, time: &str) -> ItineraryInput {
        ItineraryInput { title: title.into(), date: Some(date.into()), time: Some(time.into()), ..Default::default() }
    }

    #[test]
    fn listed_in_date_then_time_order() {
        let store = Store::open_in_memory().expect("store");
        let u = store.create_user("alice", "h", None).expect("user");
        store.create_itinerary(u, &item("dinner", "2025-06-02", "19:00")).expect("create");
        store.create_itinerary(u, &item("flight", "2025-06-01", "08:30")).expect("create");
        store.create_itinerary(u, &item("museum", "2025-06-02", "10:00")).expect("create");
        let titles: Vec<String> = store.list_itinerary(u).expect("list").into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["flight", "museum", "dinner"]);
    }

    #[test]
    fn update_and_delete_are_owner_scoped() {
        let store = Store::open_in_memory().expect("store");
        let u = store.create_user("alice", "h", None).expect("user");
        let v = store.create_user("victor", "h", None).expect("user");
        let it = store.create_itinerary(u, &item("hike", "2025-06-03", "07:00")).expect("create");
        assert_eq!(store.update_itinerary(v, it.id, &item("x", "2025-01-01", "00:00")).expect_err("foreign").http_status(), 404);
        assert_eq!(store.delete_itinerary(v, it.id).expect_err("foreign").http_status(), 404);
        let updated = store.update_itinerary(u, it.id, &item("long hike", "2025-06-03", "06:00")).expect("update");
        assert_eq!(updated.title, "long hike");
        store.delete_itinerary(u, it.id).expect("delete");
        assert!(store.list_itinerary(u).expect("list").is_empty());
    }
}

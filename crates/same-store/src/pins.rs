//! Pinned notes: paths a user wants surfaced ahead of ranked search.

use crate::error::StoreError;
use crate::pool::Store;
use rusqlite::params;

pub fn pin(store: &Store, path: &str, pinned_at: f64) -> Result<(), StoreError> {
    store.with_connection_mut(|conn| {
        conn.execute(
            "INSERT INTO pins (path, pinned_at) VALUES (?1, ?2)
             ON CONFLICT(path) DO UPDATE SET pinned_at = excluded.pinned_at",
            params![path, pinned_at],
        )?;
        Ok(())
    })
}

pub fn unpin(store: &Store, path: &str) -> Result<bool, StoreError> {
    store.with_connection_mut(|conn| {
        Ok(conn.execute("DELETE FROM pins WHERE path = ?1", params![path])? > 0)
    })
}

pub fn is_pinned(store: &Store, path: &str) -> Result<bool, StoreError> {
    store.with_connection(|conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pins WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    })
}

pub fn list_pinned(store: &Store) -> Result<Vec<String>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT path FROM pins ORDER BY pinned_at DESC")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_unpin_round_trip() {
        let store = Store::memory().unwrap();
        assert!(!is_pinned(&store, "a.md").unwrap());
        pin(&store, "a.md", 1.0).unwrap();
        assert!(is_pinned(&store, "a.md").unwrap());
        assert!(unpin(&store, "a.md").unwrap());
        assert!(!is_pinned(&store, "a.md").unwrap());
    }

    #[test]
    fn list_pinned_orders_most_recent_first() {
        let store = Store::memory().unwrap();
        pin(&store, "old.md", 1.0).unwrap();
        pin(&store, "new.md", 2.0).unwrap();
        assert_eq!(list_pinned(&store).unwrap(), vec!["new.md", "old.md"]);
    }
}

// Record Store - Machine and Purchase tables in one SQLite file
// The store owns the only connection; every call locks it, so all writes are serialised.

use crate::error::{InventoryError, Result};
use crate::models::Record;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

pub struct Store {
    conn: Mutex<Connection>,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // AUTOINCREMENT: ids of deleted rows are never handed out again
    conn.execute(
        "CREATE TABLE IF NOT EXISTS machine (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS purchase (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            product_name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            cost INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn insert_sql<R: Record>() -> String {
    let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::COLLECTION.table(),
        R::COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

fn select_sql<R: Record>() -> String {
    format!(
        "SELECT id, {} FROM {}",
        R::COLUMNS.join(", "),
        R::COLLECTION.table()
    )
}

fn not_found<R: Record>(id: i64) -> InventoryError {
    InventoryError::NotFound {
        collection: R::COLLECTION.table(),
        id,
    }
}

impl Store {
    /// Open (or create) the database file and make sure both tables exist
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        info!(path = %path.display(), "database opened");
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// Release the connection, reporting any error SQLite raises on close
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| InventoryError::StorageUnavailable("connection lock poisoned".into()))?;
        conn.close().map_err(|(_, err)| InventoryError::from(err))?;
        info!("database closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| InventoryError::StorageUnavailable("connection lock poisoned".into()))
    }

    /// Insert a record and return its freshly assigned id
    pub fn create<R: Record>(&self, fields: &R::Fields) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(&insert_sql::<R>(), params_from_iter(R::to_values(fields)))?;
        let id = conn.last_insert_rowid();
        debug!(collection = R::COLLECTION.table(), id, "record created");
        Ok(id)
    }

    /// Insert every row inside one transaction.
    ///
    /// Rows are pulled lazily, so a reader can stream straight into the
    /// database. The first `Err` rolls back everything inserted so far.
    pub fn create_all<R, I>(&self, rows: I) -> Result<usize>
    where
        R: Record,
        I: IntoIterator<Item = Result<R::Fields>>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(&insert_sql::<R>())?;
            for row in rows {
                let fields = row?;
                stmt.execute(params_from_iter(R::to_values(&fields)))?;
                inserted += 1;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    pub fn get<R: Record>(&self, id: i64) -> Result<R> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE id = ?1", select_sql::<R>());
        conn.query_row(&sql, params![id], R::from_row)
            .optional()?
            .ok_or_else(|| not_found::<R>(id))
    }

    /// All records of a collection, in insertion order
    pub fn list<R: Record>(&self) -> Result<Vec<R>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", select_sql::<R>()))?;
        let records = stmt
            .query_map([], R::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Overwrite every data column of an existing record; the id never changes
    pub fn update<R: Record>(&self, id: i64, fields: &R::Fields) -> Result<()> {
        let conn = self.lock()?;
        let assignments: Vec<String> = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            R::COLLECTION.table(),
            assignments.join(", "),
            R::COLUMNS.len() + 1
        );

        let mut values = R::to_values(fields);
        values.push(rusqlite::types::Value::Integer(id));

        let changed = conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(not_found::<R>(id));
        }
        debug!(collection = R::COLLECTION.table(), id, "record updated");
        Ok(())
    }

    /// Remove a record permanently. Deleting an id twice fails the second time.
    pub fn delete<R: Record>(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::COLLECTION.table());
        let changed = conn.execute(&sql, params![id])?;
        if changed == 0 {
            return Err(not_found::<R>(id));
        }
        debug!(collection = R::COLLECTION.table(), id, "record deleted");
        Ok(())
    }

    pub fn count<R: Record>(&self) -> Result<i64> {
        let conn = self.lock()?;
        let sql = format!("SELECT COUNT(*) FROM {}", R::COLLECTION.table());
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }
}

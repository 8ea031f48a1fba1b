// Inventory Service - the use cases the web layer and CLI call
// Store errors propagate unchanged; fields are validated before the store is touched.

use crate::csv_io::{export_string, read_rows, write_csv};
use crate::db::Store;
use crate::error::Result;
use crate::models::Record;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Records of one collection plus the sum of their quantities
#[derive(Debug, Clone, Serialize)]
pub struct Listing<R> {
    pub records: Vec<R>,
    pub total_quantity: u64,
}

pub struct Inventory {
    store: Store,
}

impl Inventory {
    pub fn new(store: Store) -> Self {
        Inventory { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Shut down, closing the underlying store
    pub fn close(self) -> Result<()> {
        self.store.close()
    }

    pub fn list_with_total<R: Record>(&self) -> Result<Listing<R>> {
        let records = self.store.list::<R>()?;
        let total_quantity = records.iter().map(|r| u64::from(r.quantity())).sum();
        Ok(Listing {
            records,
            total_quantity,
        })
    }

    pub fn get<R: Record>(&self, id: i64) -> Result<R> {
        self.store.get::<R>(id)
    }

    pub fn add<R: Record>(&self, fields: &R::Fields) -> Result<i64> {
        R::validate(fields)?;
        let id = self.store.create::<R>(fields)?;
        info!(collection = R::COLLECTION.table(), id, "record added");
        Ok(id)
    }

    pub fn edit<R: Record>(&self, id: i64, fields: &R::Fields) -> Result<()> {
        R::validate(fields)?;
        self.store.update::<R>(id, fields)?;
        info!(collection = R::COLLECTION.table(), id, "record edited");
        Ok(())
    }

    pub fn remove<R: Record>(&self, id: i64) -> Result<()> {
        self.store.delete::<R>(id)?;
        info!(collection = R::COLLECTION.table(), id, "record removed");
        Ok(())
    }

    pub fn export_all<R: Record>(&self) -> Result<String> {
        let records = self.store.list::<R>()?;
        export_string(&records)
    }

    /// Write the collection to `<stem>_<YYYYmmdd_HHMMSS>.csv` inside `dir`.
    ///
    /// Never overwrites: if the name is taken a numeric suffix is appended.
    pub fn export_to_dir<R: Record>(&self, dir: &Path) -> Result<PathBuf> {
        let records = self.store.list::<R>()?;
        fs::create_dir_all(dir)?;

        let stem = format!(
            "{}_{}",
            R::COLLECTION.file_stem(),
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let (path, file) = create_unique(dir, &stem)?;

        if let Err(err) = write_csv(&records, BufWriter::new(file)) {
            let _ = fs::remove_file(&path);
            return Err(err);
        }

        info!(
            collection = R::COLLECTION.table(),
            rows = records.len(),
            path = %path.display(),
            "collection exported"
        );
        Ok(path)
    }

    /// Import every row of a CSV document as a new record.
    ///
    /// All-or-nothing: the first malformed row aborts the import and nothing
    /// from the document is kept.
    pub fn import_all<R: Record, Rd: Read>(&self, reader: Rd) -> Result<usize> {
        let rows = read_rows::<R, _>(reader)?;
        match self.store.create_all::<R, _>(rows) {
            Ok(count) => {
                info!(collection = R::COLLECTION.table(), count, "CSV imported");
                Ok(count)
            }
            Err(err) => {
                warn!(collection = R::COLLECTION.table(), error = %err, "CSV import rejected");
                Err(err)
            }
        }
    }

    pub fn import_file<R: Record>(&self, path: &Path) -> Result<usize> {
        let file = File::open(path)?;
        self.import_all::<R, _>(BufReader::new(file))
    }
}

fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File)> {
    let mut suffix = 0;
    loop {
        let name = if suffix == 0 {
            format!("{}.csv", stem)
        } else {
            format!("{}_{}.csv", stem, suffix)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => suffix += 1,
            Err(err) => return Err(err.into()),
        }
    }
}

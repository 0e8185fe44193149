//!
//! salesdesk storage module
//! ------------------------
//! On-disk store for the back-office entities using one JSON table file per
//! entity kind: `<root>/<table>.json`. Each file holds a monotonically
//! increasing `next_id` counter plus the rows themselves. Every operation
//! loads, mutates and rewrites the table file; the data set is a handful of
//! reference rows, not a query workload.
//!
//! The public API centers around the `Store` type, which is wrapped in a
//! thread-safe `SharedStore` (`Arc<Mutex<Store>>`) by the server.

use std::{fs, path::{Path, PathBuf}};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on table '{table}': {source}")]
    Io {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt table file '{table}': {source}")]
    Corrupt {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("no {table} row with id {id}")]
    NoSuchRow { table: &'static str, id: i64 },
}

/// A row kind the store knows how to persist. `TABLE` names the backing file;
/// ids are assigned by the store on `create` and never reused within a table.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const TABLE: &'static str;
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile<E> {
    next_id: i64,
    rows: Vec<E>,
}

impl<E> Default for TableFile<E> {
    fn default() -> Self {
        Self { next_id: 1, rows: Vec::new() }
    }
}

/// Filesystem-backed store for all entity tables under a configured root.
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Create a new Store rooted at the given folder, creating it if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io { table: "<root>", source: e })?;
        Ok(Self { root })
    }

    pub fn root_path(&self) -> &PathBuf { &self.root }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.json", table))
    }

    fn load<E: Entity>(&self) -> Result<TableFile<E>, StoreError> {
        let path = self.table_path(E::TABLE);
        if !path.exists() {
            return Ok(TableFile::default());
        }
        let raw = fs::read(&path).map_err(|e| StoreError::Io { table: E::TABLE, source: e })?;
        serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt { table: E::TABLE, source: e })
    }

    fn save<E: Entity>(&self, file: &TableFile<E>) -> Result<(), StoreError> {
        let path = self.table_path(E::TABLE);
        let raw = serde_json::to_vec_pretty(file)
            .map_err(|e| StoreError::Corrupt { table: E::TABLE, source: e })?;
        fs::write(&path, raw).map_err(|e| StoreError::Io { table: E::TABLE, source: e })
    }

    /// Insert a row, assigning it the table's next free id. Returns the row
    /// as stored.
    pub fn create<E: Entity>(&self, mut row: E) -> Result<E, StoreError> {
        let mut file = self.load::<E>()?;
        row.set_id(file.next_id);
        file.next_id += 1;
        file.rows.push(row.clone());
        self.save(&file)?;
        debug!(target: "salesdesk::storage", "create: table='{}' id={}", E::TABLE, row.id());
        Ok(row)
    }

    pub fn find_by_id<E: Entity>(&self, id: i64) -> Result<Option<E>, StoreError> {
        let file = self.load::<E>()?;
        Ok(file.rows.into_iter().find(|r| r.id() == id))
    }

    pub fn find_all<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        Ok(self.load::<E>()?.rows)
    }

    /// Replace the stored row carrying the same id. Errors if the id is not
    /// present in the table.
    pub fn update<E: Entity>(&self, row: &E) -> Result<(), StoreError> {
        let mut file = self.load::<E>()?;
        let Some(slot) = file.rows.iter_mut().find(|r| r.id() == row.id()) else {
            return Err(StoreError::NoSuchRow { table: E::TABLE, id: row.id() });
        };
        *slot = row.clone();
        self.save(&file)
    }

    /// Remove the row with the given id. Removing an absent id is a no-op.
    pub fn delete<E: Entity>(&self, id: i64) -> Result<(), StoreError> {
        let mut file = self.load::<E>()?;
        let before = file.rows.len();
        file.rows.retain(|r| r.id() != id);
        if file.rows.len() != before {
            self.save(&file)?;
            debug!(target: "salesdesk::storage", "delete: table='{}' id={}", E::TABLE, id);
        }
        Ok(())
    }
}

/// Thread-safe handle shared across request handlers.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        Ok(SharedStore(Arc::new(Mutex::new(Store::new(root)?))))
    }
}

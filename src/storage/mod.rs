//! In-memory relation store.
//!
//! The catalog maps table names to relations. Every relation sits behind
//! its own read/write lock; statements take the locks they need through a
//! [`LockRequest`], always in table-name order, and hold them in a
//! [`LockSet`] until the statement finishes.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::{
    RawRwLock, RwLock,
    lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard},
};

use crate::{
    error::{Error, Result},
    sql::schema::Table,
};

pub mod engine;
pub mod memory;
pub mod relation;

pub use relation::{Inserted, Relation, RowId};

type TableHandle = (String, Arc<RwLock<Relation>>, LockMode);

/// Catalog of the tables of one database
#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<BTreeMap<String, Arc<RwLock<Relation>>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new table. Returns false when it already existed and
    /// `if_not_exists` was given.
    pub fn create_table(
        &self,
        schema: Table,
        if_not_exists: bool,
        autoincrement_start: i64,
    ) -> Result<bool> {
        schema.validate()?;
        let mut tables = self.tables.write();
        if tables.contains_key(&schema.name) {
            if if_not_exists {
                return Ok(false);
            }
            return Err(Error::Schema(format!("table {} already exists", schema.name)));
        }
        tracing::info!(table = %schema.name, columns = schema.columns.len(), "created table");
        tables.insert(
            schema.name.clone(),
            Arc::new(RwLock::new(Relation::new(schema, autoincrement_start))),
        );
        Ok(true)
    }

    /// Removes a table once no statement is using it. Returns false when it
    /// was missing and `if_exists` was given.
    pub fn drop_table(&self, name: &str, if_exists: bool) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(relation) = tables.get(name).cloned() else {
            if if_exists {
                return Ok(false);
            }
            return Err(Error::Schema(format!("table {} does not exist", name)));
        };
        // wait for statements already holding the table
        relation.write().mark_dropped();
        tables.remove(name);
        tracing::info!(table = %name, "dropped table");
        Ok(true)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Acquires every lock of `request` in table-name order. The catalog
    /// lock is only held while looking the tables up.
    pub fn lock(&self, request: &LockRequest) -> Result<LockSet> {
        Self::acquire(self.lookup(request)?)
    }

    fn lookup(&self, request: &LockRequest) -> Result<Vec<TableHandle>> {
        let tables = self.tables.read();
        request
            .tables
            .iter()
            .map(|(name, mode)| {
                tables
                    .get(name)
                    .cloned()
                    .map(|relation| (name.clone(), relation, *mode))
                    .ok_or_else(|| Error::Schema(format!("table {} does not exist", name)))
            })
            .collect()
    }

    // A table can be dropped between the lookup and taking its lock. DROP
    // marks the relation under its write lock, so seeing the mark here means
    // the table is gone.
    fn acquire(handles: Vec<TableHandle>) -> Result<LockSet> {
        let mut guards = BTreeMap::new();
        for (name, relation, mode) in handles {
            tracing::trace!(table = %name, ?mode, "acquiring table lock");
            let guard = match mode {
                LockMode::Read => TableGuard::Read(relation.read_arc()),
                LockMode::Write => TableGuard::Write(relation.write_arc()),
            };
            if guard.is_dropped() {
                return Err(Error::Schema(format!("table {} does not exist", name)));
            }
            guards.insert(name, guard);
        }
        Ok(LockSet { guards })
    }
}

/// How a statement uses a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockMode {
    Read,
    Write,
}

/// Tables a statement touches. A table asked for both ways is write locked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockRequest {
    tables: BTreeMap<String, LockMode>,
}

impl LockRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self, table: impl Into<String>) {
        self.tables.entry(table.into()).or_insert(LockMode::Read);
    }

    pub fn write(&mut self, table: impl Into<String>) {
        self.tables.insert(table.into(), LockMode::Write);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

enum TableGuard {
    Read(ArcRwLockReadGuard<RawRwLock, Relation>),
    Write(ArcRwLockWriteGuard<RawRwLock, Relation>),
}

impl TableGuard {
    fn is_dropped(&self) -> bool {
        match self {
            TableGuard::Read(guard) => guard.is_dropped(),
            TableGuard::Write(guard) => guard.is_dropped(),
        }
    }
}

/// Locks held by one statement, released together when dropped
pub struct LockSet {
    guards: BTreeMap<String, TableGuard>,
}

impl LockSet {
    /// A set holding no locks, for statements that only touch the catalog
    pub fn empty() -> Self {
        Self { guards: BTreeMap::new() }
    }

    pub fn table(&self, name: &str) -> Result<&Relation> {
        match self.guards.get(name) {
            Some(TableGuard::Read(guard)) => Ok(&**guard),
            Some(TableGuard::Write(guard)) => Ok(&**guard),
            None => Err(Error::Internal(format!("table {} is not locked", name))),
        }
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Relation> {
        match self.guards.get_mut(name) {
            Some(TableGuard::Write(guard)) => Ok(&mut **guard),
            Some(TableGuard::Read(_)) => {
                Err(Error::Internal(format!("table {} is only read locked", name)))
            }
            None => Err(Error::Internal(format!("table {} is not locked", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::{LockRequest, Store};
    use crate::{
        error::{Error, Result},
        sql::{
            schema::{Column, Table},
            types::{DataType, Value},
        },
    };

    fn counter_table(name: &str) -> Table {
        let mut id = Column::new("id", DataType::Integer);
        id.autoincrement = true;
        Table {
            name: name.into(),
            columns: vec![id, Column::new("label", DataType::Text)],
        }
    }

    #[test]
    fn test_create_and_drop() -> Result<()> {
        let store = Store::new();
        assert!(store.create_table(counter_table("b"), false, 1)?);
        assert!(store.create_table(counter_table("a"), false, 1)?);
        assert!(!store.create_table(counter_table("a"), true, 1)?);
        assert!(matches!(store.create_table(counter_table("a"), false, 1), Err(Error::Schema(_))));
        assert_eq!(store.table_names(), vec!["a".to_string(), "b".to_string()]);

        assert!(store.drop_table("a", false)?);
        assert!(!store.drop_table("a", true)?);
        assert!(matches!(store.drop_table("a", false), Err(Error::Schema(_))));
        assert!(!store.has_table("a"));
        Ok(())
    }

    #[test]
    fn test_lock_modes() -> Result<()> {
        let store = Store::new();
        store.create_table(counter_table("a"), false, 1)?;
        store.create_table(counter_table("b"), false, 1)?;

        let mut request = LockRequest::new();
        request.read("a");
        request.write("b");
        request.read("b");
        let mut locks = store.lock(&request)?;
        assert!(locks.table("a").is_ok());
        assert!(locks.table_mut("a").is_err());
        locks
            .table_mut("b")?
            .insert(vec![vec![None, Some(Value::from("x"))]])?;
        assert_eq!(locks.table("b")?.len(), 1);
        drop(locks);

        let mut missing = LockRequest::new();
        missing.read("nope");
        assert!(matches!(store.lock(&missing), Err(Error::Schema(_))));
        Ok(())
    }

    #[test]
    fn test_lock_after_concurrent_drop() -> Result<()> {
        let store = Store::new();
        store.create_table(counter_table("a"), false, 1)?;
        store.create_table(counter_table("t"), false, 1)?;

        let mut request = LockRequest::new();
        request.read("a");
        request.read("t");
        // the statement has found both tables but holds no lock yet
        let handles = store.lookup(&request)?;
        assert!(store.drop_table("t", false)?);
        assert!(matches!(Store::acquire(handles), Err(Error::Schema(_))));

        let mut write = LockRequest::new();
        write.write("t");
        assert!(matches!(store.lock(&write), Err(Error::Schema(_))));
        assert!(store.lock(&request).is_err());

        request = LockRequest::new();
        request.write("a");
        let handles = store.lookup(&request)?;
        assert!(Store::acquire(handles)?.table_mut("a").is_ok());
        Ok(())
    }

    #[test]
    fn test_concurrent_writers_serialize() -> Result<()> {
        let store = Arc::new(Store::new());
        store.create_table(counter_table("a"), false, 1)?;
        store.create_table(counter_table("b"), false, 1)?;

        let handles = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || -> Result<()> {
                    let mut request = LockRequest::new();
                    // half the threads name the tables in the opposite order
                    if i % 2 == 0 {
                        request.write("b");
                        request.write("a");
                    } else {
                        request.write("a");
                        request.write("b");
                    }
                    for _ in 0..50 {
                        let mut locks = store.lock(&request)?;
                        locks.table_mut("a")?.insert(vec![vec![None, None]])?;
                        locks.table_mut("b")?.insert(vec![vec![None, None]])?;
                    }
                    Ok(())
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().map_err(|_| Error::Internal("writer panicked".into()))??;
        }

        let mut request = LockRequest::new();
        request.read("a");
        let locks = store.lock(&request)?;
        let ids = locks
            .table("a")?
            .rows()
            .map(|row| row.map(|r| r[0].clone()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(ids.len(), 400);
        assert_eq!(ids.last(), Some(&Value::Integer(400)));
        Ok(())
    }
}

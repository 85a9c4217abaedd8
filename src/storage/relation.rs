use std::collections::HashSet;

use crate::{
    error::{Error, Result},
    sql::{
        schema::{Table, UpdateSpec},
        types::{Row, Value, current_timestamp},
    },
    storage::{engine::Engine, memory::MemoryEngine},
};

/// Position of a row inside its relation. Assigned on insert, never reused.
pub type RowId = u64;

/// A stored table: its schema plus the encoded rows in insertion order
#[derive(Debug)]
pub struct Relation {
    schema: Table,
    rows: MemoryEngine,
    next_row_id: RowId,
    next_autoincrement: i64,
    /// Set by DROP TABLE while it holds the write lock
    dropped: bool,
}

/// Outcome of a successful insert
#[derive(Debug, Clone, PartialEq)]
pub struct Inserted {
    pub rows: Vec<Row>,
    pub last_insert_id: Option<i64>,
}

impl Relation {
    pub fn new(schema: Table, autoincrement_start: i64) -> Self {
        Self {
            schema,
            rows: MemoryEngine::new(),
            next_row_id: 0,
            next_autoincrement: autoincrement_start,
            dropped: false,
        }
    }

    pub fn schema(&self) -> &Table {
        &self.schema
    }

    /// True once the table was dropped. Statements that were waiting on its
    /// lock must not use it.
    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    pub(crate) fn mark_dropped(&mut self) {
        self.dropped = true;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lazily decodes rows together with their ids, in insertion order.
    /// Every call starts a fresh pass.
    pub fn scan(&self) -> impl Iterator<Item = Result<(RowId, Row)>> + '_ {
        self.rows.scan().map(|entry| {
            let (key, value) = entry?;
            Ok((decode_row_id(&key)?, bincode::deserialize(&value)?))
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Result<Row>> + '_ {
        self.scan().map(|entry| entry.map(|(_, row)| row))
    }

    /// Appends rows. Each input row has one slot per column, `None` meaning
    /// the statement supplied nothing for it. Every row is completed and
    /// validated before any is stored, so a failing row leaves the relation
    /// and its autoincrement counter untouched.
    pub fn insert(&mut self, rows: Vec<Vec<Option<Value>>>) -> Result<Inserted> {
        let mut next_autoincrement = self.next_autoincrement;
        let mut last_insert_id = None;
        let mut prepared = Vec::with_capacity(rows.len());

        for slots in rows {
            if slots.len() != self.schema.columns.len() {
                return Err(Error::Schema(format!(
                    "table {} has {} columns but {} values were supplied",
                    self.schema.name,
                    self.schema.columns.len(),
                    slots.len()
                )));
            }

            let mut row = Vec::with_capacity(slots.len());
            for (column, slot) in self.schema.columns.iter().zip(slots) {
                let value = match slot {
                    Some(value) if column.autoincrement && !value.is_null() => {
                        return Err(Error::Constraint(format!(
                            "column {} is autoincrement and cannot be assigned",
                            column.name
                        )));
                    }
                    Some(value) if !column.autoincrement => value,
                    _ if column.autoincrement => {
                        let id = next_autoincrement;
                        next_autoincrement += 1;
                        last_insert_id = Some(id);
                        Value::Integer(id)
                    }
                    None => column.default_value().ok_or_else(|| {
                        Error::Constraint(format!("column {} cannot be null", column.name))
                    })?,
                    Some(value) => value,
                };
                row.push(value);
            }
            prepared.push(self.prepare(row)?);
        }

        self.check_unique(&prepared, &HashSet::new())?;

        for row in &prepared {
            let id = self.next_row_id;
            self.rows.set(encode_row_id(id), bincode::serialize(row)?)?;
            self.next_row_id += 1;
        }
        self.next_autoincrement = next_autoincrement;

        Ok(Inserted {
            rows: prepared,
            last_insert_id,
        })
    }

    /// Replaces whole rows. ON UPDATE columns are re-stamped whatever the
    /// caller assigned to them. Nothing is written unless every row passes.
    pub fn update(&mut self, changes: Vec<(RowId, Row)>) -> Result<usize> {
        let stamped = self
            .schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.on_update == Some(UpdateSpec::CurrentTimestamp))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        let mut ids = HashSet::new();
        let mut prepared = Vec::with_capacity(changes.len());
        for (id, row) in changes {
            if self.rows.get(&encode_row_id(id))?.is_none() {
                return Err(Error::Internal(format!(
                    "row {} of table {} vanished during update",
                    id, self.schema.name
                )));
            }
            let mut row = self.prepare(row)?;
            for &i in &stamped {
                row[i] = Value::Timestamp(current_timestamp());
            }
            ids.insert(id);
            prepared.push((id, row));
        }

        let rows = prepared.iter().map(|(_, row)| row.clone()).collect::<Vec<_>>();
        self.check_unique(&rows, &ids)?;

        for (id, row) in &prepared {
            self.rows.set(encode_row_id(*id), bincode::serialize(row)?)?;
        }
        Ok(prepared.len())
    }

    pub fn delete(&mut self, ids: &[RowId]) -> Result<usize> {
        let mut count = 0;
        for id in ids {
            if self.rows.delete(&encode_row_id(*id))? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Removes every row. The autoincrement counter keeps its value.
    pub fn truncate(&mut self) -> usize {
        self.rows.clear()
    }

    /// Coerces values to their column types and enforces NOT NULL
    fn prepare(&self, row: Row) -> Result<Row> {
        if row.len() != self.schema.columns.len() {
            return Err(Error::Schema(format!(
                "table {} has {} columns but row has {} values",
                self.schema.name,
                self.schema.columns.len(),
                row.len()
            )));
        }
        self.schema
            .columns
            .iter()
            .zip(row)
            .map(|(column, value)| {
                let value = value.coerce(column.datatype).map_err(|_| {
                    Error::Schema(format!(
                        "column {} of type {} cannot hold this value",
                        column.name, column.datatype
                    ))
                })?;
                if value.is_null() && !column.nullable {
                    return Err(Error::Constraint(format!("column {} cannot be null", column.name)));
                }
                Ok(value)
            })
            .collect()
    }

    /// Primary key uniqueness of `rows` against each other and against the
    /// stored rows not listed in `replaced`
    fn check_unique(&self, rows: &[Row], replaced: &HashSet<RowId>) -> Result<()> {
        let Some(pk) = self.schema.primary_key() else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        for entry in self.scan() {
            let (id, row) = entry?;
            if !replaced.contains(&id) {
                seen.insert(bincode::serialize(&row[pk])?);
            }
        }
        for row in rows {
            if !seen.insert(bincode::serialize(&row[pk])?) {
                return Err(Error::Constraint(format!(
                    "duplicate value {} for primary key {}.{}",
                    row[pk], self.schema.name, self.schema.columns[pk].name
                )));
            }
        }
        Ok(())
    }
}

fn encode_row_id(id: RowId) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn decode_row_id(key: &[u8]) -> Result<RowId> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| Error::Internal(format!("malformed row key {:?}", key)))?;
    Ok(RowId::from_be_bytes(bytes))
}

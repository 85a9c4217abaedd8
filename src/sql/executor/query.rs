use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Context, ResultSet},
        plan::{ColumnRef, Direction, Expression, SelectItem},
    },
};

use super::Executor;

/// Table scan executor. Columns are labelled `table.column`.
pub struct Scan {
    table_name: String,
}

impl Scan {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl Executor for Scan {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let relation = ctx.locks.table(&self.table_name)?;
        let rows = relation.rows().collect::<Result<Vec<_>>>()?;
        Ok(ResultSet::Scan {
            columns: relation.schema().labels(),
            rows,
        })
    }
}

/// WHERE executor - keeps the rows matching the predicate
pub struct Filter {
    source: Box<dyn Executor>,
    predicate: Expression,
}

impl Filter {
    pub fn new(source: Box<dyn Executor>, predicate: Expression) -> Box<Self> {
        Box::new(Self { source, predicate })
    }
}

impl Executor for Filter {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        match self.source.execute(ctx)? {
            ResultSet::Scan { columns, rows } => {
                let mut matched = Vec::new();
                for row in rows {
                    if self.predicate.matches(&columns, &row)? {
                        matched.push(row);
                    }
                }
                Ok(ResultSet::Scan { columns, rows: matched })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// ORDER BY executor - sorts rows by specified columns
pub struct Order {
    source: Box<dyn Executor>,
    order_by: Vec<(ColumnRef, Direction)>,
}

impl Order {
    pub fn new(source: Box<dyn Executor>, order_by: Vec<(ColumnRef, Direction)>) -> Box<Self> {
        Box::new(Self { source, order_by })
    }
}

impl Executor for Order {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        match self.source.execute(ctx)? {
            ResultSet::Scan { columns, mut rows } => {
                let keys = self
                    .order_by
                    .iter()
                    .map(|(column, direction)| Ok((column.resolve(&columns)?, *direction)))
                    .collect::<Result<Vec<_>>>()?;

                // Stable multi-key sort, NULLs first
                rows.sort_by(|a, b| {
                    for (i, direction) in &keys {
                        match a[*i].sort_cmp(&b[*i]) {
                            Ordering::Equal => {}
                            o if *direction == Direction::Asc => return o,
                            o => return o.reverse(),
                        }
                    }
                    Ordering::Equal
                });

                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// LIMIT executor - restricts the number of rows returned
pub struct Limit {
    source: Box<dyn Executor>,
    limit: usize,
}

impl Limit {
    pub fn new(source: Box<dyn Executor>, limit: usize) -> Box<Self> {
        Box::new(Self { source, limit })
    }
}

impl Executor for Limit {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        match self.source.execute(ctx)? {
            ResultSet::Scan { columns, rows } => Ok(ResultSet::Scan {
                columns,
                rows: rows.into_iter().take(self.limit).collect(),
            }),
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// OFFSET executor - skips the first N rows
pub struct Offset {
    source: Box<dyn Executor>,
    offset: usize,
}

impl Offset {
    pub fn new(source: Box<dyn Executor>, offset: usize) -> Box<Self> {
        Box::new(Self { source, offset })
    }
}

impl Executor for Offset {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        match self.source.execute(ctx)? {
            ResultSet::Scan { columns, rows } => Ok(ResultSet::Scan {
                columns,
                rows: rows.into_iter().skip(self.offset).collect(),
            }),
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// Projection executor - picks the selected columns and names them
/// without their table qualifier
pub struct Projection {
    source: Box<dyn Executor>,
    items: Vec<SelectItem>,
}

impl Projection {
    pub fn new(source: Box<dyn Executor>, items: Vec<SelectItem>) -> Box<Self> {
        Box::new(Self { source, items })
    }
}

impl Executor for Projection {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        match self.source.execute(ctx)? {
            ResultSet::Scan { columns, rows } => {
                let mut picked = Vec::new();
                for item in &self.items {
                    match item {
                        SelectItem::All => picked.extend(0..columns.len()),
                        SelectItem::AllOf(table) => {
                            let before = picked.len();
                            picked.extend(
                                columns
                                    .iter()
                                    .enumerate()
                                    .filter(|(_, label)| label_table(label) == table)
                                    .map(|(i, _)| i),
                            );
                            if picked.len() == before {
                                return Err(Error::Schema(format!(
                                    "table {} is not part of the query",
                                    table
                                )));
                            }
                        }
                        SelectItem::Column(column) => picked.push(column.resolve(&columns)?),
                    }
                }

                let names = picked.iter().map(|&i| label_column(&columns[i]).to_string()).collect();
                let rows = rows
                    .into_iter()
                    .map(|row| picked.iter().map(|&i| row[i].clone()).collect())
                    .collect();
                Ok(ResultSet::Scan { columns: names, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

fn label_table(label: &str) -> &str {
    label.split_once('.').map_or("", |(table, _)| table)
}

fn label_column(label: &str) -> &str {
    label.split_once('.').map_or(label, |(_, column)| column)
}

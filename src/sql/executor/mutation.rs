use std::collections::HashSet;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Context, ResultSet},
        plan::{ColumnRef, Expression},
        schema::Table,
        types::Value,
    },
};

use super::Executor;

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Expression>>,
    returning: Option<ColumnRef>,
}

impl Insert {
    pub fn new(
        table_name: String,
        columns: Vec<String>,
        rows: Vec<Vec<Expression>>,
        returning: Option<ColumnRef>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            rows,
            returning,
        })
    }
}

/// Evaluates a VALUES entry. DEFAULT yields None, leaving the column to
/// its default or autoincrement.
fn insert_value(expr: &Expression) -> Result<Option<Value>> {
    match expr {
        Expression::Default => Ok(None),
        Expression::Field(column) => Err(Error::Schema(format!(
            "column reference {} is not allowed in VALUES",
            column
        ))),
        expr => Ok(Some(expr.evaluate(&[], &[])?)),
    }
}

// Lines up one VALUES tuple with the table's columns.
//
// insert into t(d, c) values (1, 2)      -> [None, None, Some(2), Some(1)]
// insert into t values (1, 2, 3, 4)      -> every column in order
// insert into t values ('x') where t has
//   (id AUTOINCREMENT, email)            -> [None, Some('x')]
fn make_row(
    table: &Table,
    columns: &[String],
    values: Vec<Option<Value>>,
) -> Result<Vec<Option<Value>>> {
    let width = table.columns.len();

    if columns.is_empty() {
        if values.len() == width {
            return Ok(values);
        }
        let generated = table.columns.iter().filter(|c| c.autoincrement).count();
        if generated > 0 && values.len() == width - generated {
            let mut values = values.into_iter();
            return Ok(table
                .columns
                .iter()
                .map(|c| if c.autoincrement { None } else { values.next().flatten() })
                .collect());
        }
        return Err(Error::Schema(format!(
            "table {} has {} columns but {} values were supplied",
            table.name,
            width,
            values.len()
        )));
    }

    if columns.len() != values.len() {
        return Err(Error::Schema(format!(
            "{} columns named but {} values supplied",
            columns.len(),
            values.len()
        )));
    }

    let mut row = vec![None; width];
    let mut seen = HashSet::new();
    for (name, value) in columns.iter().zip(values) {
        if !seen.insert(name) {
            return Err(Error::Schema(format!("column {} specified more than once", name)));
        }
        row[table.get_col_index(name)?] = value;
    }
    Ok(row)
}

impl Executor for Insert {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let relation = ctx.locks.table_mut(&self.table_name)?;
        let table = relation.schema().clone();

        let mut rows = Vec::with_capacity(self.rows.len());
        for exprs in &self.rows {
            let values = exprs.iter().map(insert_value).collect::<Result<Vec<_>>>()?;
            rows.push(make_row(&table, &self.columns, values)?);
        }

        let inserted = relation.insert(rows)?;
        tracing::debug!(
            table = %self.table_name,
            count = inserted.rows.len(),
            last_insert_id = ?inserted.last_insert_id,
            "inserted rows"
        );

        match self.returning {
            Some(column) => {
                let index = column.resolve(&table.labels())?;
                Ok(ResultSet::Scan {
                    columns: vec![column.name],
                    rows: inserted.rows.into_iter().map(|row| vec![row[index].clone()]).collect(),
                })
            }
            None => Ok(ResultSet::Insert {
                count: inserted.rows.len(),
                last_insert_id: inserted.last_insert_id,
            }),
        }
    }
}

/// UPDATE executor
pub struct Update {
    table_name: String,
    predicate: Expression,
    assignments: Vec<(String, Expression)>,
}

impl Update {
    pub fn new(
        table_name: String,
        predicate: Expression,
        assignments: Vec<(String, Expression)>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            predicate,
            assignments,
        })
    }
}

impl Executor for Update {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let relation = ctx.locks.table_mut(&self.table_name)?;
        let table = relation.schema().clone();
        let labels = table.labels();

        let mut targets = Vec::with_capacity(self.assignments.len());
        let mut seen = HashSet::new();
        for (name, expr) in &self.assignments {
            let index = table.get_col_index(name)?;
            if !seen.insert(index) {
                return Err(Error::Schema(format!("column {} assigned more than once", name)));
            }
            if table.columns[index].autoincrement {
                return Err(Error::Constraint(format!(
                    "column {} is autoincrement and cannot be assigned",
                    name
                )));
            }
            targets.push((index, expr));
        }

        // Compute every new row before writing any of them
        let mut changes = Vec::new();
        for entry in relation.scan() {
            let (id, row) = entry?;
            if !self.predicate.matches(&labels, &row)? {
                continue;
            }
            let mut new_row = row.clone();
            for (index, expr) in &targets {
                let column = &table.columns[*index];
                new_row[*index] = match expr {
                    Expression::Default => column.default_value().ok_or_else(|| {
                        Error::Constraint(format!("column {} has no default", column.name))
                    })?,
                    expr => expr.evaluate(&labels, &row)?,
                };
            }
            changes.push((id, new_row));
        }

        let count = relation.update(changes)?;
        tracing::debug!(table = %self.table_name, count, "updated rows");
        Ok(ResultSet::Update { count })
    }
}

/// DELETE executor
pub struct Delete {
    table_name: String,
    predicate: Expression,
}

impl Delete {
    pub fn new(table_name: String, predicate: Expression) -> Box<Self> {
        Box::new(Self { table_name, predicate })
    }
}

impl Executor for Delete {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let relation = ctx.locks.table_mut(&self.table_name)?;
        let labels = relation.schema().labels();

        let mut ids = Vec::new();
        for entry in relation.scan() {
            let (id, row) = entry?;
            if self.predicate.matches(&labels, &row)? {
                ids.push(id);
            }
        }

        let count = relation.delete(&ids)?;
        tracing::debug!(table = %self.table_name, count, "deleted rows");
        Ok(ResultSet::Delete { count })
    }
}

//! Synchronous driver over named in-memory databases.
//!
//! ```ignore
//! let mut conn = ramdb::driver::open("accounts")?;
//! conn.exec("CREATE TABLE account (id INT AUTOINCREMENT, email TEXT)", &[])?;
//! conn.exec("INSERT INTO account (email) VALUES ($1)", &["foo@bar.com".into()])?;
//!
//! let mut rows = conn.query("SELECT id, email FROM account", &[])?;
//! while rows.next() {
//!     let (id, email): (i64, String) = rows.scan()?;
//! }
//! ```

use std::{collections::HashMap, sync::OnceLock};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    config::Config,
    error::{Error, Result},
    sql::{
        engine::{Engine, Session},
        executor::ResultSet,
        types::{Row, Value},
    },
};

/// Databases opened so far, by name. They live as long as the process.
fn databases() -> &'static Mutex<HashMap<String, Engine>> {
    static DATABASES: OnceLock<Mutex<HashMap<String, Engine>>> = OnceLock::new();
    DATABASES.get_or_init(Default::default)
}

/// Opens a connection to the database named by `dsn`, creating it on first
/// use. Options in the DSN only take effect when the database is created.
pub fn open(dsn: &str) -> Result<Connection> {
    let (name, config) = Config::from_dsn(dsn)?;
    let mut databases = databases().lock();
    let engine = databases
        .entry(name)
        .or_insert_with_key(|name| {
            tracing::info!(database = %name, ?config, "created database");
            Engine::new(config)
        })
        .clone();
    Ok(Connection::new(engine))
}

/// Outcome of a statement run through [`Connection::exec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: usize,
    pub last_insert_id: Option<i64>,
}

pub struct Connection {
    session: Session,
}

impl Connection {
    pub fn new(engine: Engine) -> Self {
        Self {
            session: engine.session(),
        }
    }

    pub fn exec(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let result = self.session.execute(sql, params)?;
        let last_insert_id = match result {
            ResultSet::Insert { last_insert_id, .. } => last_insert_id,
            _ => None,
        };
        Ok(ExecResult {
            rows_affected: result.count(),
            last_insert_id,
        })
    }

    /// Runs a statement and returns its rows. Statements that produce no rows
    /// give an empty set.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        match self.session.execute(sql, params)? {
            ResultSet::Scan { columns, rows } => Ok(Rows::new(columns, rows)),
            _ => Ok(Rows::new(Vec::new(), Vec::new())),
        }
    }

    /// Runs a query and scans its first row, if any
    pub fn query_row<T: FromRow>(&mut self, sql: &str, params: &[Value]) -> Result<Option<T>> {
        let mut rows = self.query(sql, params)?;
        if !rows.next() {
            return Ok(None);
        }
        rows.scan().map(Some)
    }
}

/// Cursor over the rows of a query. Call [`Rows::next`] before reading each row.
#[derive(Debug)]
pub struct Rows {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
}

impl Rows {
    fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
            current: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Advances to the next row, returning false once the rows are exhausted
    pub fn next(&mut self) -> bool {
        self.current = self.rows.next();
        self.current.is_some()
    }

    fn current(&self) -> Result<&Row> {
        self.current
            .as_ref()
            .ok_or_else(|| Error::Parameter("no current row, call next() first".into()))
    }

    /// Reads one column of the current row
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        let row = self.current()?;
        let value = row.get(index).ok_or_else(|| {
            Error::Parameter(format!(
                "column index {} out of range for {} columns",
                index,
                row.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Reads the whole current row
    pub fn scan<T: FromRow>(&self) -> Result<T> {
        T::from_row(self.current()?)
    }
}

/// Conversion from a column value into a Rust type
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, target: &str) -> Result<T> {
    Err(Error::Parameter(format!("can not scan {} into {}", value, target)))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(*v),
            value => mismatch(value, "i64"),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(v) => i32::try_from(*v).or_else(|_| mismatch(value, "i32")),
            value => mismatch(value, "i32"),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            value => mismatch(value, "f64"),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(*v),
            value => mismatch(value, "bool"),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            value => mismatch(value, "String"),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Timestamp(v) => Ok(*v),
            value => mismatch(value, "DateTime<Utc>"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

/// Conversion from a whole row, one destination per column
pub trait FromRow: Sized {
    fn from_row(row: &[Value]) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: &[Value]) -> Result<Self> {
        Ok(row.to_vec())
    }
}

fn check_width(row: &[Value], width: usize) -> Result<()> {
    if row.len() != width {
        return Err(Error::Parameter(format!(
            "row has {} columns but {} destinations were given",
            row.len(),
            width
        )));
    }
    Ok(())
}

macro_rules! impl_from_row {
    ($width:expr; $($t:ident => $i:tt),+) => {
        impl<$($t: FromValue),+> FromRow for ($($t,)+) {
            fn from_row(row: &[Value]) -> Result<Self> {
                check_width(row, $width)?;
                Ok(($($t::from_value(&row[$i])?,)+))
            }
        }
    };
}

impl_from_row!(1; A => 0);
impl_from_row!(2; A => 0, B => 1);
impl_from_row!(3; A => 0, B => 1, C => 2);
impl_from_row!(4; A => 0, B => 1, C => 2, D => 3);
impl_from_row!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_from_row!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);

#[cfg(test)]
mod tests {
    use super::{ExecResult, FromValue, open};
    use crate::{
        error::{Error, Result},
        sql::types::Value,
    };

    #[test]
    fn test_open_shares_database() -> Result<()> {
        let mut first = open("driver_test_shared")?;
        first.exec("CREATE TABLE t (id INT AUTOINCREMENT, name TEXT)", &[])?;
        let result = first.exec(
            "INSERT INTO t (name) VALUES ($1), ($2)",
            &[Value::from("a"), Value::from("b")],
        )?;
        assert_eq!(
            result,
            ExecResult {
                rows_affected: 2,
                last_insert_id: Some(2)
            }
        );

        let mut second = open("driver_test_shared?autoincrement_start=50")?;
        let count: Option<(i64,)> = second.query_row("SELECT COUNT(*) FROM t", &[])?;
        assert_eq!(count, Some((2,)));

        let mut other = open("driver_test_other")?;
        assert!(matches!(other.exec("SELECT * FROM t", &[]), Err(Error::Schema(_))));
        Ok(())
    }

    #[test]
    fn test_rows_cursor() -> Result<()> {
        let mut conn = open("driver_test_rows")?;
        conn.exec("CREATE TABLE t (id INT, name TEXT, score FLOAT)", &[])?;
        conn.exec("INSERT INTO t VALUES (1, 'x', 1.5), (2, NULL, 3)", &[])?;

        let mut rows = conn.query("SELECT id, name, score FROM t ORDER BY id", &[])?;
        assert_eq!(rows.columns(), ["id", "name", "score"]);
        assert!(matches!(rows.get::<i64>(0), Err(Error::Parameter(_))));

        assert!(rows.next());
        let (id, name, score): (i64, String, f64) = rows.scan()?;
        assert_eq!((id, name.as_str(), score), (1, "x", 1.5));

        assert!(rows.next());
        assert_eq!(rows.get::<Option<String>>(1)?, None);
        assert_eq!(rows.get::<f64>(2)?, 3.0);
        assert!(matches!(rows.get::<String>(0), Err(Error::Parameter(_))));
        assert!(matches!(rows.get::<i64>(3), Err(Error::Parameter(_))));
        assert!(matches!(rows.scan::<(i64, i64)>(), Err(Error::Parameter(_))));

        assert!(!rows.next());
        assert_eq!(conn.query_row::<(i64,)>("SELECT id FROM t WHERE id = 9", &[])?, None);
        Ok(())
    }

    #[test]
    fn test_from_value() -> Result<()> {
        assert_eq!(i32::from_value(&Value::Integer(7))?, 7);
        assert!(i32::from_value(&Value::Integer(i64::MAX)).is_err());
        assert!(bool::from_value(&Value::Boolean(true))?);
        assert_eq!(Option::<i64>::from_value(&Value::Integer(1))?, Some(1));
        assert_eq!(Value::from_value(&Value::Null)?, Value::Null);
        Ok(())
    }
}

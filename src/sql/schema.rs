use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Value, current_timestamp},
};

/// Table schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Validates table schema
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::Schema(format!("table {} has no columns", self.name)));
        }

        let mut names = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.as_str()) {
                return Err(Error::Schema(format!(
                    "duplicate column {} in table {}",
                    column.name, self.name
                )));
            }
            if column.autoincrement && column.datatype != DataType::Integer {
                return Err(Error::Schema(format!(
                    "autoincrement column {} must be an integer",
                    column.name
                )));
            }
            if column.on_update.is_some() && column.datatype != DataType::Timestamp {
                return Err(Error::Schema(format!(
                    "ON UPDATE CURRENT_TIMESTAMP column {} must be a timestamp",
                    column.name
                )));
            }
            match &column.default {
                Some(DefaultSpec::CurrentTimestamp) if column.datatype != DataType::Timestamp => {
                    return Err(Error::Schema(format!(
                        "DEFAULT CURRENT_TIMESTAMP column {} must be a timestamp",
                        column.name
                    )));
                }
                Some(DefaultSpec::Value(Value::Null)) if !column.nullable => {
                    return Err(Error::Schema(format!(
                        "NOT NULL column {} cannot default to NULL",
                        column.name
                    )));
                }
                _ => {}
            }
        }

        if self.columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(Error::Schema(format!(
                "Multiple primary keys for table {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Returns the column index for a given column name
    pub fn get_col_index(&self, col_name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == col_name)
            .ok_or_else(|| {
                Error::Schema(format!("column {} not found in table {}", col_name, self.name))
            })
    }

    /// Position of the primary key column, if any
    pub fn primary_key(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    /// Qualified column labels (`table.column`) used while evaluating rows
    pub fn labels(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| format!("{}.{}", self.name, c.name))
            .collect()
    }
}

/// Column schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
    pub autoincrement: bool,
    pub primary_key: bool,
    pub default: Option<DefaultSpec>,
    pub on_update: Option<UpdateSpec>,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            nullable: true,
            autoincrement: false,
            primary_key: false,
            default: None,
            on_update: None,
        }
    }

    /// Value used when an INSERT supplies nothing for this column.
    /// None means the column has no default and is not nullable.
    pub fn default_value(&self) -> Option<Value> {
        match &self.default {
            Some(spec) => Some(spec.value()),
            None if self.nullable => Some(Value::Null),
            None => None,
        }
    }
}

/// DEFAULT clause of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultSpec {
    Value(Value),
    CurrentTimestamp,
}

impl DefaultSpec {
    pub fn value(&self) -> Value {
        match self {
            DefaultSpec::Value(value) => value.clone(),
            DefaultSpec::CurrentTimestamp => Value::Timestamp(current_timestamp()),
        }
    }
}

/// ON UPDATE clause of a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateSpec {
    CurrentTimestamp,
}

#[cfg(test)]
mod tests {
    use super::{Column, DefaultSpec, Table, UpdateSpec};
    use crate::{
        error::{Error, Result},
        sql::types::{DataType, Value},
    };

    fn account() -> Table {
        let mut id = Column::new("id", DataType::Integer);
        id.autoincrement = true;
        let mut modified = Column::new("modified", DataType::Timestamp);
        modified.default = Some(DefaultSpec::CurrentTimestamp);
        modified.on_update = Some(UpdateSpec::CurrentTimestamp);
        Table {
            name: "account".into(),
            columns: vec![id, Column::new("email", DataType::Text), modified],
        }
    }

    #[test]
    fn test_validate() -> Result<()> {
        let table = account();
        table.validate()?;
        assert_eq!(table.get_col_index("email")?, 1);
        assert!(matches!(table.get_col_index("nope"), Err(Error::Schema(_))));
        assert_eq!(table.labels()[2], "account.modified");

        let mut dup = account();
        dup.columns.push(Column::new("email", DataType::Text));
        assert!(dup.validate().is_err());

        let mut bad = account();
        bad.columns[1].autoincrement = true;
        assert!(bad.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_default_value() {
        let table = account();
        assert_eq!(table.columns[1].default_value(), Some(Value::Null));
        assert!(matches!(table.columns[2].default_value(), Some(Value::Timestamp(_))));

        let mut required = Column::new("name", DataType::Text);
        required.nullable = false;
        assert_eq!(required.default_value(), None);
    }
}

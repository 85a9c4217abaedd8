use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    sql::{
        plan::{AggregateCall, Function},
        types::Value,
    },
};

use super::{Context, Executor, ResultSet};

/// Aggregate executor - computes aggregate functions (COUNT, SUM, MIN, MAX, AVG)
/// over all input rows, producing a single row
pub struct Aggregate {
    source: Box<dyn Executor>,
    calls: Vec<AggregateCall>,
}

impl Aggregate {
    pub fn new(source: Box<dyn Executor>, calls: Vec<AggregateCall>) -> Box<Self> {
        Box::new(Self { source, calls })
    }
}

impl Executor for Aggregate {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let ResultSet::Scan { columns, rows } = self.source.execute(ctx)? else {
            return Err(Error::Internal("Unexpected result set".into()));
        };

        let mut names = Vec::with_capacity(self.calls.len());
        let mut values = Vec::with_capacity(self.calls.len());
        for call in &self.calls {
            let position = match &call.arg {
                Some(column) => Some(column.resolve(&columns)?),
                None => None,
            };
            let mut accumulator = <dyn Accumulator>::build(call.func);
            for row in &rows {
                match position {
                    Some(i) => accumulator.accumulate(&row[i])?,
                    // count(*) counts rows, whatever they hold
                    None => accumulator.accumulate(&Value::Boolean(true))?,
                }
            }
            names.push(call.to_string());
            values.push(accumulator.finalize());
        }

        Ok(ResultSet::Scan {
            columns: names,
            rows: vec![values],
        })
    }
}

/// Running state of one aggregate function. NULL inputs are ignored.
pub trait Accumulator {
    fn accumulate(&mut self, value: &Value) -> Result<()>;
    fn finalize(self: Box<Self>) -> Value;
}

impl dyn Accumulator {
    pub fn build(func: Function) -> Box<dyn Accumulator> {
        match func {
            Function::Count => Box::new(Count::default()),
            Function::Min => Box::new(Extreme::new(Ordering::Less)),
            Function::Max => Box::new(Extreme::new(Ordering::Greater)),
            Function::Sum => Box::new(Sum::default()),
            Function::Avg => Box::new(Avg::default()),
        }
    }
}

/// COUNT - counts non-null values
#[derive(Default)]
pub struct Count {
    count: i64,
}

impl Accumulator for Count {
    fn accumulate(&mut self, value: &Value) -> Result<()> {
        if !value.is_null() {
            self.count += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Value {
        Value::Integer(self.count)
    }
}

/// MIN / MAX - keeps the value that compares `keep` against the others
pub struct Extreme {
    keep: Ordering,
    best: Option<Value>,
}

impl Extreme {
    fn new(keep: Ordering) -> Self {
        Self { keep, best: None }
    }
}

impl Accumulator for Extreme {
    fn accumulate(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let replace = match &self.best {
            None => true,
            Some(best) => value.compare(best) == Some(self.keep),
        };
        if replace {
            self.best = Some(value.clone());
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Value {
        self.best.unwrap_or(Value::Null)
    }
}

/// SUM - stays an integer until a float shows up
#[derive(Default)]
pub struct Sum {
    sum: Option<Value>,
}

impl Accumulator for Sum {
    fn accumulate(&mut self, value: &Value) -> Result<()> {
        let sum = match (&self.sum, value) {
            (_, Value::Null) => return Ok(()),
            (None, Value::Integer(v)) => Value::Integer(*v),
            (None, Value::Float(v)) => Value::Float(*v),
            (Some(Value::Integer(s)), Value::Integer(v)) => match s.checked_add(*v) {
                Some(s) => Value::Integer(s),
                None => Value::Float(*s as f64 + *v as f64),
            },
            (Some(Value::Integer(s)), Value::Float(v)) => Value::Float(*s as f64 + v),
            (Some(Value::Float(s)), Value::Integer(v)) => Value::Float(s + *v as f64),
            (Some(Value::Float(s)), Value::Float(v)) => Value::Float(s + v),
            (_, value) => {
                return Err(Error::Schema(format!("can not sum non-numeric value {}", value)));
            }
        };
        self.sum = Some(sum);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Value {
        self.sum.unwrap_or(Value::Null)
    }
}

/// AVG - SUM / COUNT as a float
#[derive(Default)]
pub struct Avg {
    sum: f64,
    count: usize,
}

impl Accumulator for Avg {
    fn accumulate(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => return Ok(()),
            Value::Integer(v) => self.sum += *v as f64,
            Value::Float(v) => self.sum += v,
            value => {
                return Err(Error::Schema(format!(
                    "can not average non-numeric value {}",
                    value
                )));
            }
        }
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Value {
        match self.count {
            0 => Value::Null,
            n => Value::Float(self.sum / n as f64),
        }
    }
}

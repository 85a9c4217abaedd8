use std::{cmp::Ordering, fmt::Display};

use crate::{
    config::Config,
    error::{Error, Result},
    sql::{
        executor::{Context, Executor, ResultSet},
        parser::decl::Instruction,
        schema::Table,
        types::{Value, current_timestamp},
    },
    storage::{LockRequest, LockSet, Store},
};

mod planner;

pub use planner::Planner;

/// Execution plan node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    CreateTable {
        schema: Table,
        if_not_exists: bool,
    },
    DropTable {
        table_name: String,
        if_exists: bool,
    },
    Truncate {
        table_name: String,
    },
    Insert {
        table_name: String,
        columns: Vec<String>,
        rows: Vec<Vec<Expression>>,
        returning: Option<ColumnRef>,
    },
    Scan {
        table_name: String,
    },
    NestedLoopJoin {
        left: Box<Node>,
        right: Box<Node>,
        predicate: Option<Expression>,
        outer: bool,
    },
    Filter {
        source: Box<Node>,
        predicate: Expression,
    },
    Order {
        source: Box<Node>,
        order_by: Vec<(ColumnRef, Direction)>,
    },
    Offset {
        source: Box<Node>,
        offset: usize,
    },
    Limit {
        source: Box<Node>,
        limit: usize,
    },
    Projection {
        source: Box<Node>,
        items: Vec<SelectItem>,
    },
    Aggregate {
        source: Box<Node>,
        calls: Vec<AggregateCall>,
    },
    Update {
        table_name: String,
        predicate: Expression,
        assignments: Vec<(String, Expression)>,
    },
    Delete {
        table_name: String,
        predicate: Expression,
    },
}

impl Node {
    /// Adds the table locks needed to run this node
    fn collect_locks(&self, request: &mut LockRequest) {
        match self {
            Node::CreateTable { .. } | Node::DropTable { .. } => {}
            Node::Scan { table_name } => request.read(table_name.as_str()),
            Node::Truncate { table_name }
            | Node::Insert { table_name, .. }
            | Node::Update { table_name, .. }
            | Node::Delete { table_name, .. } => request.write(table_name.as_str()),
            Node::NestedLoopJoin { left, right, .. } => {
                left.collect_locks(request);
                right.collect_locks(request);
            }
            Node::Filter { source, .. }
            | Node::Order { source, .. }
            | Node::Offset { source, .. }
            | Node::Limit { source, .. }
            | Node::Projection { source, .. }
            | Node::Aggregate { source, .. } => source.collect_locks(request),
        }
    }
}

/// Execution plan
#[derive(Debug, Clone, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    /// Binds `params` and lowers the declaration tree into plan nodes
    pub fn build(instruction: &Instruction, params: &[Value], config: &Config) -> Result<Self> {
        Planner::new(params, config.strict_params).build(instruction)
    }

    pub fn locks(&self) -> LockRequest {
        let mut request = LockRequest::new();
        self.0.collect_locks(&mut request);
        request
    }

    /// Runs the plan while holding every table lock it needs
    pub fn execute(self, store: &Store, config: &Config) -> Result<ResultSet> {
        let request = self.locks();
        let locks = if request.is_empty() {
            LockSet::empty()
        } else {
            store.lock(&request)?
        };
        let mut ctx = Context { store, locks, config };
        <dyn Executor>::build(self.0).execute(&mut ctx)
    }
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// SELECT list entry
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    All,
    AllOf(String),
    Column(ColumnRef),
}

/// Builtin aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Function::Count => "count",
            Function::Min => "min",
            Function::Max => "max",
            Function::Sum => "sum",
            Function::Avg => "avg",
        })
    }
}

/// `func(column)`, or `count(*)` when `arg` is None
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub func: Function,
    pub arg: Option<ColumnRef>,
}

impl Display for AggregateCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.arg {
            Some(column) => write!(f, "{}({})", self.func, column.name),
            None => write!(f, "{}(*)", self.func),
        }
    }
}

/// Reference to a column, optionally qualified by its table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(table: Option<String>, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
        }
    }

    /// Position of the column among `table.column` labels. An unqualified
    /// name matching more than one label is ambiguous.
    pub fn resolve(&self, labels: &[String]) -> Result<usize> {
        let mut found = labels.iter().enumerate().filter(|(_, label)| match &self.table {
            Some(table) => label
                .strip_prefix(table.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|name| name == self.name),
            None => label
                .strip_suffix(self.name.as_str())
                .is_some_and(|prefix| prefix.ends_with('.')),
        });
        match (found.next(), found.next()) {
            (Some((i, _)), None) => Ok(i),
            (Some(_), Some(_)) => {
                Err(Error::Schema(format!("column reference {} is ambiguous", self)))
            }
            (None, _) => Err(Error::Schema(format!("column {} does not exist", self))),
        }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::NotEqual => ordering != Ordering::Equal,
            CompareOp::Less => ordering == Ordering::Less,
            CompareOp::LessEqual => ordering != Ordering::Greater,
            CompareOp::Greater => ordering == Ordering::Greater,
            CompareOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

/// Bound expression, evaluated against one (possibly joined) row
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Value),
    Field(ColumnRef),
    CurrentTimestamp,
    /// The DEFAULT keyword, only meaningful as an INSERT or SET value
    Default,
    Compare(CompareOp, Box<Expression>, Box<Expression>),
    IsNull(Box<Expression>, bool),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Evaluates the expression. `labels` names the row's values as
    /// `table.column`.
    pub fn evaluate(&self, labels: &[String], row: &[Value]) -> Result<Value> {
        Ok(match self {
            Expression::Constant(value) => value.clone(),
            Expression::Field(column) => row
                .get(column.resolve(labels)?)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("row has no value for {}", column)))?,
            Expression::CurrentTimestamp => Value::Timestamp(current_timestamp()),
            Expression::Default => {
                return Err(Error::Schema("DEFAULT is not allowed in an expression".into()));
            }
            // NULL is neither equal nor unequal to anything
            Expression::Compare(op, lhs, rhs) => {
                match lhs.evaluate(labels, row)?.compare(&rhs.evaluate(labels, row)?) {
                    Some(ordering) => Value::Boolean(op.holds(ordering)),
                    None => Value::Null,
                }
            }
            Expression::IsNull(expr, negated) => {
                Value::Boolean(expr.evaluate(labels, row)?.is_null() != *negated)
            }
            Expression::And(lhs, rhs) => {
                Value::Boolean(lhs.matches(labels, row)? && rhs.matches(labels, row)?)
            }
            Expression::Or(lhs, rhs) => {
                Value::Boolean(lhs.matches(labels, row)? || rhs.matches(labels, row)?)
            }
        })
    }

    /// Predicate form of `evaluate`
    pub fn matches(&self, labels: &[String], row: &[Value]) -> Result<bool> {
        Ok(self.evaluate(labels, row)?.is_truthy())
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnRef, CompareOp, Expression};
    use crate::{
        error::{Error, Result},
        sql::types::Value,
    };

    fn labels() -> Vec<String> {
        ["a.id", "a.email", "b.id", "b.a_id"].iter().map(|s| s.to_string()).collect()
    }

    fn field(table: Option<&str>, name: &str) -> Box<Expression> {
        Box::new(Expression::Field(ColumnRef::new(table.map(String::from), name)))
    }

    fn constant(value: impl Into<Value>) -> Box<Expression> {
        Box::new(Expression::Constant(value.into()))
    }

    #[test]
    fn test_resolve() -> Result<()> {
        let labels = labels();
        assert_eq!(ColumnRef::new(None, "email").resolve(&labels)?, 1);
        assert_eq!(ColumnRef::new(Some("b".into()), "id").resolve(&labels)?, 2);
        assert!(matches!(ColumnRef::new(None, "id").resolve(&labels), Err(Error::Schema(_))));
        assert!(matches!(ColumnRef::new(None, "nope").resolve(&labels), Err(Error::Schema(_))));
        assert!(matches!(ColumnRef::new(None, "d").resolve(&labels), Err(Error::Schema(_))));
        Ok(())
    }

    #[test]
    fn test_null_semantics() -> Result<()> {
        let labels = labels();
        let row = vec![Value::Integer(1), Value::Null, Value::Integer(7), Value::Integer(1)];

        let eq = Expression::Compare(CompareOp::Equal, field(None, "email"), constant(Value::Null));
        assert!(!eq.matches(&labels, &row)?);
        let ne = Expression::Compare(CompareOp::NotEqual, field(None, "email"), constant("x"));
        assert!(!ne.matches(&labels, &row)?);

        let is_null = Expression::IsNull(field(Some("a"), "email"), false);
        assert!(is_null.matches(&labels, &row)?);
        let not_null = Expression::IsNull(field(Some("a"), "email"), true);
        assert!(!not_null.matches(&labels, &row)?);
        Ok(())
    }

    #[test]
    fn test_connectives() -> Result<()> {
        let labels = labels();
        let row = vec![Value::Integer(1), Value::from("x"), Value::Integer(7), Value::Integer(1)];

        let join = Expression::Compare(
            CompareOp::Equal,
            field(Some("a"), "id"),
            field(Some("b"), "a_id"),
        );
        let big = Expression::Compare(CompareOp::Greater, field(Some("b"), "id"), constant(10i64));
        let and = Expression::And(Box::new(join.clone()), Box::new(big.clone()));
        let or = Expression::Or(Box::new(join), Box::new(big));
        assert!(!and.matches(&labels, &row)?);
        assert!(or.matches(&labels, &row)?);

        // the right side is never evaluated once the left decides
        let broken = Box::new(Expression::Default);
        let short = Expression::Or(constant(1i64), broken.clone());
        assert!(short.matches(&labels, &row)?);
        assert!(Expression::And(constant(1i64), broken).matches(&labels, &row).is_err());
        Ok(())
    }
}

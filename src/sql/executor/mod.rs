use crate::{
    config::Config,
    error::Result,
    sql::{
        executor::{
            agg::Aggregate,
            join::NestedLoopJoin,
            mutation::{Delete, Insert, Update},
            query::{Filter, Limit, Offset, Order, Projection, Scan},
            schema::{CreateTable, DropTable, Truncate},
        },
        plan::Node,
        types::Row,
    },
    storage::{LockSet, Store},
};

mod agg;
mod join;
mod mutation;
mod query;
mod schema;

/// State shared by the executors of one statement
pub struct Context<'a> {
    pub store: &'a Store,
    /// Table locks taken for the statement, released when it finishes
    pub locks: LockSet,
    pub config: &'a Config,
}

/// SQL executor trait
pub trait Executor {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet>;
}

impl dyn Executor {
    /// Builds the executor tree for a plan node
    pub fn build(node: Node) -> Box<dyn Executor> {
        match node {
            Node::CreateTable { schema, if_not_exists } => CreateTable::new(schema, if_not_exists),
            Node::DropTable { table_name, if_exists } => DropTable::new(table_name, if_exists),
            Node::Truncate { table_name } => Truncate::new(table_name),
            Node::Insert {
                table_name,
                columns,
                rows,
                returning,
            } => Insert::new(table_name, columns, rows, returning),
            Node::Scan { table_name } => Scan::new(table_name),
            Node::NestedLoopJoin {
                left,
                right,
                predicate,
                outer,
            } => NestedLoopJoin::new(Self::build(*left), Self::build(*right), predicate, outer),
            Node::Filter { source, predicate } => Filter::new(Self::build(*source), predicate),
            Node::Order { source, order_by } => Order::new(Self::build(*source), order_by),
            Node::Offset { source, offset } => Offset::new(Self::build(*source), offset),
            Node::Limit { source, limit } => Limit::new(Self::build(*source), limit),
            Node::Projection { source, items } => Projection::new(Self::build(*source), items),
            Node::Aggregate { source, calls } => Aggregate::new(Self::build(*source), calls),
            Node::Update {
                table_name,
                predicate,
                assignments,
            } => Update::new(table_name, predicate, assignments),
            Node::Delete { table_name, predicate } => Delete::new(table_name, predicate),
        }
    }
}

/// Execution result set
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    CreateTable {
        table_name: String,
    },
    DropTable {
        table_name: String,
    },
    Truncate {
        table_name: String,
    },
    Insert {
        count: usize,
        last_insert_id: Option<i64>,
    },
    /// Rows of a query. Inside the executor tree columns are `table.column`
    /// labels; the final projection turns them into plain column names.
    Scan {
        columns: Vec<String>,
        rows: Vec<Row>,
    },
    Update {
        count: usize,
    },
    Delete {
        count: usize,
    },
}

impl ResultSet {
    /// Rows changed by a mutation, or rows returned by a query
    pub fn count(&self) -> usize {
        match self {
            ResultSet::Insert { count, .. }
            | ResultSet::Update { count }
            | ResultSet::Delete { count } => *count,
            ResultSet::Scan { rows, .. } => rows.len(),
            _ => 0,
        }
    }
}

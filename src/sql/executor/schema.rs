use crate::{
    error::Result,
    sql::{
        executor::{Context, Executor, ResultSet},
        schema::Table,
    },
};

/// CREATE TABLE executor
pub struct CreateTable {
    schema: Table,
    if_not_exists: bool,
}

impl CreateTable {
    pub fn new(schema: Table, if_not_exists: bool) -> Box<Self> {
        Box::new(Self { schema, if_not_exists })
    }
}

impl Executor for CreateTable {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let table_name = self.schema.name.clone();
        ctx.store
            .create_table(self.schema, self.if_not_exists, ctx.config.autoincrement_start)?;
        Ok(ResultSet::CreateTable { table_name })
    }
}

/// DROP TABLE executor
pub struct DropTable {
    table_name: String,
    if_exists: bool,
}

impl DropTable {
    pub fn new(table_name: String, if_exists: bool) -> Box<Self> {
        Box::new(Self { table_name, if_exists })
    }
}

impl Executor for DropTable {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        ctx.store.drop_table(&self.table_name, self.if_exists)?;
        Ok(ResultSet::DropTable {
            table_name: self.table_name,
        })
    }
}

/// TRUNCATE executor - empties a table, keeping its autoincrement counter
pub struct Truncate {
    table_name: String,
}

impl Truncate {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl Executor for Truncate {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let removed = ctx.locks.table_mut(&self.table_name)?.truncate();
        tracing::info!(table = %self.table_name, removed, "truncated table");
        Ok(ResultSet::Truncate {
            table_name: self.table_name,
        })
    }
}

use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    sql::{
        executor::ResultSet,
        parser::{decl::Instruction, parse},
        plan::Plan,
        types::Value,
    },
    storage::Store,
};

/// SQL engine: one in-memory database, shared by every clone
#[derive(Clone, Default)]
pub struct Engine {
    store: Arc<Store>,
    config: Arc<Config>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(Store::new()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn session(&self) -> Session {
        Session { engine: self.clone() }
    }

    /// Executes one parsed statement with its bound parameters. Parameters
    /// are checked before any table is touched.
    pub fn execute(&self, instruction: &Instruction, params: &[Value]) -> Result<ResultSet> {
        Plan::build(instruction, params, &self.config)?.execute(&self.store, &self.config)
    }
}

/// SQL session for executing statements
pub struct Session {
    engine: Engine,
}

impl Session {
    /// Parses and executes a SQL statement
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        tracing::debug!(sql, params = params.len(), "executing statement");
        let result = parse(sql).and_then(|instruction| self.engine.execute(&instruction, params));
        match &result {
            Ok(result) => tracing::debug!(count = result.count(), "statement finished"),
            Err(err) => tracing::warn!(sql, error = %err, "statement failed"),
        }
        result
    }
}

//! Shared helpers for the driver integration tests

use ramdb::{Connection, Result, open};
use tracing_subscriber::EnvFilter;

/// Routes engine logs to the test output. Set RUST_LOG=ramdb=debug to see
/// every statement.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Opens a fresh database. Each test passes its own name since databases
/// live for the whole test process.
pub fn connect(name: &str) -> Result<Connection> {
    init_logging();
    open(name)
}

#[allow(dead_code)]
/// Opens a database holding an `account` table with an autoincrement key
pub fn account_db(name: &str) -> Result<Connection> {
    let mut conn = connect(name)?;
    conn.exec(
        "CREATE TABLE account (
            id BIGINT PRIMARY KEY AUTOINCREMENT,
            email VARCHAR(255),
            age INT
        )",
        &[],
    )?;
    Ok(conn)
}

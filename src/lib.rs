//! ramdb - an embeddable, in-memory SQL database
//!
//! The crate provides:
//! - SQL parsing into declaration trees (lexer, recursive-descent parser)
//! - Planning and nested-loop execution of those trees
//! - A per-table locked relation store kept entirely in memory
//! - A small synchronous driver over named databases

pub mod config;
pub mod driver;
pub mod error;
pub mod sql;
pub mod storage;

pub use config::Config;
pub use driver::{Connection, ExecResult, Rows, open};
pub use error::{Error, Result};
pub use sql::{
    engine::{Engine, Session},
    executor::ResultSet,
    parser::parse,
    types::Value,
};

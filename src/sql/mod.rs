//! SQL processing
//!
//! - `parser`: lexer and recursive-descent parser producing declaration trees
//! - `types`: data types and runtime values
//! - `schema`: table and column definitions
//! - `plan`: lowering of declaration trees into plan nodes
//! - `executor`: plan node execution against locked relations
//! - `engine`: statement entry point and sessions

pub mod parser;
pub mod types;
pub mod schema;
pub mod plan;
pub mod executor;
pub mod engine;

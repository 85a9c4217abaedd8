use serde::Deserialize;

use crate::error::Result;

/// Engine options, given as the query part of a data source name:
/// `accounts?autoincrement_start=100&strict_params=false`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// First value handed out by autoincrement columns of new tables
    pub autoincrement_start: i64,
    /// Reject statements given more arguments than they have placeholders
    pub strict_params: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autoincrement_start: 1,
            strict_params: true,
        }
    }
}

impl Config {
    /// Splits a data source name into the database name and its options
    pub fn from_dsn(dsn: &str) -> Result<(String, Config)> {
        match dsn.split_once('?') {
            Some((name, query)) => Ok((name.to_string(), serde_urlencoded::from_str(query)?)),
            None => Ok((dsn.to_string(), Config::default())),
        }
    }
}

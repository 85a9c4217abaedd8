use crate::{
    error::{Error, Result},
    sql::{plan::Expression, types::Value},
};

use super::{Context, Executor, ResultSet};

/// Nested Loop Join executor - Cartesian product of two inputs, filtered by
/// the ON predicate when there is one
pub struct NestedLoopJoin {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    predicate: Option<Expression>,
    outer: bool,
}

impl NestedLoopJoin {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        predicate: Option<Expression>,
        outer: bool,
    ) -> Box<Self> {
        Box::new(Self {
            left,
            right,
            predicate,
            outer,
        })
    }
}

impl Executor for NestedLoopJoin {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<ResultSet> {
        let (
            ResultSet::Scan {
                columns: lcols,
                rows: lrows,
            },
            ResultSet::Scan {
                columns: rcols,
                rows: rrows,
            },
        ) = (self.left.execute(ctx)?, self.right.execute(ctx)?)
        else {
            return Err(Error::Internal("Unexpected result set".into()));
        };

        // Labels stay qualified so that `a.id` and `b.id` remain distinct
        let mut columns = lcols;
        columns.extend(rcols.iter().cloned());

        let mut rows = Vec::new();
        for lrow in &lrows {
            let mut matched = false;
            for rrow in &rrows {
                let mut row = lrow.clone();
                row.extend(rrow.iter().cloned());
                let keep = match &self.predicate {
                    Some(predicate) => predicate.matches(&columns, &row)?,
                    None => true,
                };
                if keep {
                    rows.push(row);
                    matched = true;
                }
            }

            // LEFT JOIN keeps unmatched left rows, padded with NULLs
            if self.outer && !matched {
                let mut row = lrow.clone();
                row.extend(std::iter::repeat_n(Value::Null, rcols.len()));
                rows.push(row);
            }
        }

        Ok(ResultSet::Scan { columns, rows })
    }
}

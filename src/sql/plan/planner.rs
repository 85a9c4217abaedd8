use std::collections::BTreeSet;

use crate::{
    error::{Error, Result},
    sql::{
        parser::{
            decl::{Decl, Instruction},
            lexer::{Keyword, TokenKind},
        },
        plan::{
            AggregateCall, ColumnRef, CompareOp, Direction, Expression, Function, Node, Plan,
            SelectItem,
        },
        schema::{Column, DefaultSpec, Table, UpdateSpec},
        types::{DataType, Value},
    },
};

/// Query planner - lowers a declaration tree into execution plan nodes,
/// substituting placeholders with the bound parameters
pub struct Planner<'a> {
    params: &'a [Value],
    strict_params: bool,
}

impl<'a> Planner<'a> {
    pub fn new(params: &'a [Value], strict_params: bool) -> Self {
        Self { params, strict_params }
    }

    /// Builds an execution plan. Placeholders are checked against the
    /// parameters before anything else happens.
    pub fn build(&mut self, instruction: &Instruction) -> Result<Plan> {
        let root = instruction
            .root()
            .ok_or_else(|| Error::Internal("empty instruction".into()))?;
        self.check_params(root)?;
        Ok(Plan(self.build_statement(root)?))
    }

    /// Every index in `1..=n` must be used, and exactly n arguments given
    /// (at least n when parameters are not strict)
    fn check_params(&self, root: &Decl) -> Result<()> {
        let mut indexes = BTreeSet::new();
        let mut invalid = None;
        root.walk(&mut |decl| {
            if decl.is(TokenKind::Placeholder) {
                match decl.lexeme[1..].parse::<usize>() {
                    Ok(index) if index > 0 => {
                        indexes.insert(index);
                    }
                    _ => invalid = Some(decl.lexeme.clone()),
                }
            }
        });
        if let Some(placeholder) = invalid {
            return Err(Error::Parameter(format!("invalid placeholder {}", placeholder)));
        }

        let used = indexes.len();
        if let Some(&highest) = indexes.last() {
            if highest != used {
                return Err(Error::Parameter(format!(
                    "placeholder ${} used but only {} distinct placeholders appear",
                    highest, used
                )));
            }
        }
        let given = self.params.len();
        if given < used || (self.strict_params && given > used) {
            return Err(Error::Parameter(format!(
                "statement expects {} arguments, got {}",
                used, given
            )));
        }
        Ok(())
    }

    fn build_statement(&self, root: &Decl) -> Result<Node> {
        match root.kind {
            TokenKind::Keyword(Keyword::Select) => self.build_select(root),
            TokenKind::Keyword(Keyword::Insert) => self.build_insert(root),
            TokenKind::Keyword(Keyword::Update) => self.build_update(root),
            TokenKind::Keyword(Keyword::Delete) => self.build_delete(root),
            TokenKind::Keyword(Keyword::Create) => self.build_create_table(root),
            TokenKind::Keyword(Keyword::Drop) => Ok(Node::DropTable {
                table_name: table_name(root)?,
                if_exists: root.child_keyword(Keyword::If).is_some(),
            }),
            TokenKind::Keyword(Keyword::Truncate) => Ok(Node::Truncate {
                table_name: table_name(root)?,
            }),
            _ => Err(Error::Internal(format!("cannot plan statement {}", root.lexeme))),
        }
    }

    /// scan/join -> filter -> order -> offset -> limit -> projection, or
    /// scan/join -> filter -> aggregate -> offset -> limit
    fn build_select(&self, select: &Decl) -> Result<Node> {
        let mut items = Vec::new();
        let mut calls = Vec::new();
        let mut node = None;
        let mut predicate = None;
        let mut order_by = Vec::new();
        let mut limit = None;
        let mut offset = None;

        for child in &select.children {
            match child.kind {
                TokenKind::Asterisk => match child.child_keyword(Keyword::Table) {
                    Some(table) => items.push(SelectItem::AllOf(table.lexeme.clone())),
                    None => items.push(SelectItem::All),
                },
                TokenKind::Ident => items.push(SelectItem::Column(column_ref(child))),
                TokenKind::Keyword(
                    keyword @ (Keyword::Count
                    | Keyword::Min
                    | Keyword::Max
                    | Keyword::Sum
                    | Keyword::Avg),
                ) => calls.push(self.build_aggregate(keyword, child)?),
                TokenKind::Keyword(Keyword::From) => {
                    for table in &child.children {
                        let scan = Node::Scan {
                            table_name: table.lexeme.clone(),
                        };
                        node = Some(match node {
                            None => scan,
                            Some(left) => Node::NestedLoopJoin {
                                left: Box::new(left),
                                right: Box::new(scan),
                                predicate: None,
                                outer: false,
                            },
                        });
                    }
                }
                TokenKind::Keyword(Keyword::Join) => {
                    let left = node
                        .take()
                        .ok_or_else(|| Error::Internal("JOIN without FROM".into()))?;
                    node = Some(self.build_join(left, child)?);
                }
                TokenKind::Keyword(Keyword::Where) => predicate = Some(self.build_where(child)?),
                TokenKind::Keyword(Keyword::Order) => {
                    for term in &child.children {
                        let direction = match term.kind {
                            TokenKind::Keyword(Keyword::Desc) => Direction::Desc,
                            _ => Direction::Asc,
                        };
                        let attr = term
                            .children
                            .first()
                            .ok_or_else(|| Error::Internal("ORDER BY term without column".into()))?;
                        order_by.push((column_ref(attr), direction));
                    }
                }
                TokenKind::Keyword(Keyword::Limit) => limit = Some(count_arg(child)?),
                TokenKind::Keyword(Keyword::Offset) => offset = Some(count_arg(child)?),
                // FOR UPDATE is advisory
                TokenKind::Keyword(Keyword::For) => {}
                _ => {
                    return Err(Error::Internal(format!(
                        "unexpected SELECT clause {}",
                        child.lexeme
                    )));
                }
            }
        }

        let mut node = node.ok_or_else(|| Error::Internal("SELECT without FROM".into()))?;
        if let Some(predicate) = predicate {
            node = Node::Filter {
                source: Box::new(node),
                predicate,
            };
        }

        let aggregated = !calls.is_empty();
        if aggregated {
            if !items.is_empty() {
                return Err(Error::Schema(
                    "cannot mix aggregate functions and plain columns without GROUP BY".into(),
                ));
            }
            node = Node::Aggregate {
                source: Box::new(node),
                calls,
            };
        } else if !order_by.is_empty() {
            node = Node::Order {
                source: Box::new(node),
                order_by,
            };
        }

        // OFFSET applies before LIMIT
        if let Some(offset) = offset {
            node = Node::Offset {
                source: Box::new(node),
                offset,
            };
        }
        if let Some(limit) = limit {
            node = Node::Limit {
                source: Box::new(node),
                limit,
            };
        }

        if !aggregated {
            node = Node::Projection {
                source: Box::new(node),
                items,
            };
        }
        Ok(node)
    }

    fn build_join(&self, left: Node, join: &Decl) -> Result<Node> {
        let right = Node::Scan {
            table_name: table_name(join)?,
        };
        let predicate = match join.child_keyword(Keyword::On) {
            Some(on) => Some(self.build_predicate(first_child(on)?)?),
            None => None,
        };
        Ok(Node::NestedLoopJoin {
            left: Box::new(left),
            right: Box::new(right),
            predicate,
            outer: join.child_keyword(Keyword::Left).is_some(),
        })
    }

    fn build_aggregate(&self, keyword: Keyword, decl: &Decl) -> Result<AggregateCall> {
        let func = match keyword {
            Keyword::Count => Function::Count,
            Keyword::Min => Function::Min,
            Keyword::Max => Function::Max,
            Keyword::Sum => Function::Sum,
            _ => Function::Avg,
        };
        let arg = first_child(decl)?;
        Ok(AggregateCall {
            func,
            arg: match arg.kind {
                TokenKind::Asterisk => None,
                _ => Some(column_ref(arg)),
            },
        })
    }

    fn build_insert(&self, insert: &Decl) -> Result<Node> {
        let into = insert
            .child_keyword(Keyword::Into)
            .ok_or_else(|| Error::Internal("INSERT without INTO".into()))?;
        let table = first_child(into)?;

        let rows = match insert.child_keyword(Keyword::Values) {
            Some(values) => values
                .children
                .iter()
                .map(|tuple| {
                    tuple
                        .children
                        .iter()
                        .map(|v| self.build_value(v))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        let returning = match insert.child_keyword(Keyword::Returning) {
            Some(returning) => Some(column_ref(first_child(returning)?)),
            None => None,
        };

        Ok(Node::Insert {
            table_name: table.lexeme.clone(),
            columns: table.children.iter().map(|c| c.lexeme.clone()).collect(),
            rows,
            returning,
        })
    }

    fn build_update(&self, update: &Decl) -> Result<Node> {
        let mut assignments = Vec::new();
        if let Some(set) = update.child_keyword(Keyword::Set) {
            for assignment in &set.children {
                match assignment.children.as_slice() {
                    [column, value] => {
                        assignments.push((column.lexeme.clone(), self.build_value(value)?))
                    }
                    _ => return Err(Error::Internal("malformed SET assignment".into())),
                }
            }
        }
        Ok(Node::Update {
            table_name: table_name(update)?,
            predicate: self.build_statement_where(update)?,
            assignments,
        })
    }

    fn build_delete(&self, delete: &Decl) -> Result<Node> {
        let from = delete
            .child_keyword(Keyword::From)
            .ok_or_else(|| Error::Internal("DELETE without FROM".into()))?;
        Ok(Node::Delete {
            table_name: table_name(from)?,
            predicate: self.build_statement_where(delete)?,
        })
    }

    fn build_create_table(&self, create: &Decl) -> Result<Node> {
        let table = create
            .child_keyword(Keyword::Table)
            .ok_or_else(|| Error::Internal("CREATE without TABLE".into()))?;
        let columns = table
            .children
            .iter()
            .map(|c| self.build_column(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(Node::CreateTable {
            schema: Table {
                name: table.lexeme.clone(),
                columns,
            },
            if_not_exists: create.child_keyword(Keyword::If).is_some(),
        })
    }

    fn build_column(&self, decl: &Decl) -> Result<Column> {
        let datatype = match first_child(decl)?.kind {
            TokenKind::Keyword(
                Keyword::Int | Keyword::Integer | Keyword::Bigint | Keyword::Smallint,
            ) => DataType::Integer,
            TokenKind::Keyword(
                Keyword::Text | Keyword::Varchar | Keyword::Char | Keyword::String,
            ) => DataType::Text,
            TokenKind::Keyword(
                Keyword::Float | Keyword::Double | Keyword::Real | Keyword::Decimal,
            ) => DataType::Float,
            TokenKind::Keyword(Keyword::Bool | Keyword::Boolean) => DataType::Boolean,
            TokenKind::Keyword(Keyword::Timestamp | Keyword::Datetime | Keyword::Date) => {
                DataType::Timestamp
            }
            _ => {
                return Err(Error::Schema(format!(
                    "column {} has an unknown type",
                    decl.lexeme
                )));
            }
        };

        let mut column = Column::new(decl.lexeme.clone(), datatype);
        let mut explicit_null = false;
        for modifier in decl.children.iter().skip(1) {
            match modifier.kind {
                TokenKind::Keyword(Keyword::Autoincrement) => column.autoincrement = true,
                TokenKind::Keyword(Keyword::Not) => column.nullable = false,
                TokenKind::Keyword(Keyword::Null) => explicit_null = true,
                TokenKind::Keyword(Keyword::Primary) => column.primary_key = true,
                TokenKind::Keyword(Keyword::On) => {
                    column.on_update = Some(UpdateSpec::CurrentTimestamp)
                }
                TokenKind::Keyword(Keyword::Default) => {
                    column.default = Some(match self.build_value(first_child(modifier)?)? {
                        Expression::Constant(value) => DefaultSpec::Value(value.coerce(datatype)?),
                        Expression::CurrentTimestamp => DefaultSpec::CurrentTimestamp,
                        _ => {
                            return Err(Error::Schema(format!(
                                "default of column {} must be a constant",
                                decl.lexeme
                            )));
                        }
                    })
                }
                // UNIQUE is accepted but not enforced
                _ => {}
            }
        }

        if column.primary_key {
            if explicit_null {
                return Err(Error::Schema(format!("primary key {} cannot be NULL", column.name)));
            }
            column.nullable = false;
        } else if explicit_null && !column.nullable {
            return Err(Error::Schema(format!("column {} is both NULL and NOT NULL", column.name)));
        }
        Ok(column)
    }

    fn build_statement_where(&self, statement: &Decl) -> Result<Expression> {
        let clause = statement
            .child_keyword(Keyword::Where)
            .ok_or_else(|| Error::Internal(format!("{} without WHERE", statement.lexeme)))?;
        self.build_where(clause)
    }

    fn build_where(&self, clause: &Decl) -> Result<Expression> {
        self.build_predicate(first_child(clause)?)
    }

    fn build_predicate(&self, decl: &Decl) -> Result<Expression> {
        let binary = |decl: &Decl| -> Result<(Box<Expression>, Box<Expression>)> {
            match decl.children.as_slice() {
                [lhs, rhs] => Ok((
                    Box::new(self.build_predicate(lhs)?),
                    Box::new(self.build_predicate(rhs)?),
                )),
                _ => Err(Error::Internal(format!("{} expects two operands", decl.lexeme))),
            }
        };

        Ok(match decl.kind {
            TokenKind::Keyword(Keyword::And) => {
                let (lhs, rhs) = binary(decl)?;
                Expression::And(lhs, rhs)
            }
            TokenKind::Keyword(Keyword::Or) => {
                let (lhs, rhs) = binary(decl)?;
                Expression::Or(lhs, rhs)
            }
            TokenKind::Keyword(Keyword::Is) => match decl.children.as_slice() {
                [operand, null] => {
                    let operand = Box::new(self.build_value(operand)?);
                    Expression::IsNull(operand, null.is_keyword(Keyword::Not))
                }
                _ => return Err(Error::Internal("malformed IS predicate".into())),
            },
            kind @ (TokenKind::Equal
            | TokenKind::NotEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual) => {
                let op = match kind {
                    TokenKind::Equal => CompareOp::Equal,
                    TokenKind::NotEqual => CompareOp::NotEqual,
                    TokenKind::Less => CompareOp::Less,
                    TokenKind::LessEqual => CompareOp::LessEqual,
                    TokenKind::Greater => CompareOp::Greater,
                    _ => CompareOp::GreaterEqual,
                };
                match decl.children.as_slice() {
                    [lhs, rhs] => {
                        let lhs = Box::new(self.build_value(lhs)?);
                        Expression::Compare(op, lhs, Box::new(self.build_value(rhs)?))
                    }
                    _ => {
                        return Err(Error::Internal(format!(
                            "{} expects two operands",
                            decl.lexeme
                        )));
                    }
                }
            }
            _ => self.build_value(decl)?,
        })
    }

    /// Literal, bound placeholder, CURRENT_TIMESTAMP, DEFAULT or column
    fn build_value(&self, decl: &Decl) -> Result<Expression> {
        Ok(match decl.kind {
            TokenKind::Number => Expression::Constant(parse_number(&decl.lexeme)?),
            TokenKind::String => Expression::Constant(Value::Text(decl.lexeme.clone())),
            TokenKind::Placeholder => {
                let index = decl.lexeme[1..].parse::<usize>()?;
                let value = index
                    .checked_sub(1)
                    .and_then(|i| self.params.get(i))
                    .ok_or_else(|| Error::Parameter(format!("no argument for {}", decl.lexeme)))?;
                Expression::Constant(value.clone())
            }
            TokenKind::Keyword(Keyword::Null) => Expression::Constant(Value::Null),
            TokenKind::Keyword(Keyword::True) => Expression::Constant(Value::Boolean(true)),
            TokenKind::Keyword(Keyword::False) => Expression::Constant(Value::Boolean(false)),
            TokenKind::Keyword(Keyword::CurrentTimestamp) => Expression::CurrentTimestamp,
            TokenKind::Keyword(Keyword::Default) => Expression::Default,
            TokenKind::Ident => Expression::Field(column_ref(decl)),
            _ => return Err(Error::Internal(format!("unexpected value {}", decl.lexeme))),
        })
    }
}

fn parse_number(lexeme: &str) -> Result<Value> {
    if lexeme.contains('.') {
        return Ok(Value::Float(lexeme.parse::<f64>()?));
    }
    match lexeme.parse::<i64>() {
        Ok(i) => Ok(Value::Integer(i)),
        // too large for an integer
        Err(_) => Ok(Value::Float(lexeme.parse::<f64>()?)),
    }
}

/// LIMIT / OFFSET argument
fn count_arg(clause: &Decl) -> Result<usize> {
    Ok(first_child(clause)?.lexeme.parse::<usize>()?)
}

fn column_ref(attr: &Decl) -> ColumnRef {
    ColumnRef::new(
        attr.child_keyword(Keyword::Table).map(|t| t.lexeme.clone()),
        attr.lexeme.clone(),
    )
}

fn table_name(decl: &Decl) -> Result<String> {
    decl.child_keyword(Keyword::Table)
        .map(|t| t.lexeme.clone())
        .ok_or_else(|| Error::Internal(format!("{} without table", decl.lexeme)))
}

fn first_child(decl: &Decl) -> Result<&Decl> {
    decl.children
        .first()
        .ok_or_else(|| Error::Internal(format!("{} has no operand", decl.lexeme)))
}

//! Declaration tree produced by the parser.
//!
//! Every node carries the kind of the token it was built from, its literal
//! text and an ordered list of children. Statement shapes:
//!
//! ```text
//! SELECT  select [item.., from [table..], join.., where [pred], order [asc|desc [attr]..],
//!                 limit [number], offset [number], for [update]]
//! INSERT  insert [into [table [ident..]], values [( [value..]..], returning [attr]]
//! UPDATE  update [table, set [= [ident, value]..], where [pred]]
//! DELETE  delete [from [table], where [pred]]
//! CREATE  create [if?, table [ident [type, modifier..]..]]
//! DROP    drop [if?, table]
//! TRUNCATE truncate [table]
//! ```

use std::fmt::Display;

use super::lexer::{Keyword, Token, TokenKind};

/// A node of the declaration tree
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: TokenKind,
    pub lexeme: String,
    pub children: Vec<Decl>,
}

impl Decl {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            children: Vec::new(),
        }
    }

    pub fn keyword(keyword: Keyword) -> Self {
        Self::new(TokenKind::Keyword(keyword), keyword.to_str().to_lowercase())
    }

    /// Builds a leaf from a token. Keywords get their canonical lowercase
    /// spelling so that equal statements produce equal trees.
    pub fn from_token(token: &Token) -> Self {
        match token.kind {
            TokenKind::Keyword(keyword) => Self::keyword(keyword),
            kind => Self::new(kind, token.lexeme.clone()),
        }
    }

    pub fn add(&mut self, child: Decl) {
        self.children.push(child);
    }

    pub fn with(mut self, child: Decl) -> Self {
        self.add(child);
        self
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// First child of the given kind
    pub fn child(&self, kind: TokenKind) -> Option<&Decl> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn child_keyword(&self, keyword: Keyword) -> Option<&Decl> {
        self.child(TokenKind::Keyword(keyword))
    }

    /// The synthesized always-true WHERE clause
    pub fn implicit_where() -> Self {
        Self::keyword(Keyword::Where).with(Self::new(TokenKind::Number, "1"))
    }

    /// Depth-first walk over this node and all of its descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Decl)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    fn fmt_tree(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        writeln!(f, "{:width$}{:?} '{}'", "", self.kind, self.lexeme, width = depth * 2)?;
        for child in &self.children {
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for Decl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// One parsed statement, ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub decls: Vec<Decl>,
}

impl Instruction {
    pub fn root(&self) -> Option<&Decl> {
        self.decls.first()
    }

    /// Renders the tree back into SQL text which parses into an equal tree
    pub fn to_sql(&self) -> String {
        self.decls
            .iter()
            .map(render_statement)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for decl in &self.decls {
            write!(f, "{}", decl)?;
        }
        Ok(())
    }
}

fn render_statement(decl: &Decl) -> String {
    let mut out = Vec::new();
    match decl.kind {
        TokenKind::Keyword(Keyword::Select) => {
            out.push("SELECT".to_string());
            let items = decl
                .children
                .iter()
                .take_while(|c| !c.is_keyword(Keyword::From))
                .map(render_item)
                .collect::<Vec<_>>();
            out.push(items.join(", "));
            for clause in decl.children.iter().skip(items.len()) {
                out.push(render_clause(clause));
            }
        }
        TokenKind::Keyword(Keyword::Insert) => {
            out.push("INSERT".to_string());
            out.extend(decl.children.iter().map(render_clause));
        }
        TokenKind::Keyword(Keyword::Update) => {
            out.push("UPDATE".to_string());
            out.extend(decl.children.iter().map(render_clause));
        }
        TokenKind::Keyword(Keyword::Delete) => {
            out.push("DELETE".to_string());
            out.extend(decl.children.iter().map(render_clause));
        }
        TokenKind::Keyword(Keyword::Truncate) => {
            out.push("TRUNCATE".to_string());
            out.extend(decl.children.iter().map(render_clause));
        }
        TokenKind::Keyword(Keyword::Drop) => {
            out.push("DROP TABLE".to_string());
            out.extend(decl.children.iter().map(render_clause));
        }
        TokenKind::Keyword(Keyword::Create) => {
            out.push("CREATE TABLE".to_string());
            for child in &decl.children {
                match child.kind {
                    TokenKind::Keyword(Keyword::Table) => {
                        let columns = child.children.iter().map(render_column).collect::<Vec<_>>();
                        let name = render_name(&child.lexeme);
                        out.push(format!("{} ({})", name, columns.join(", ")));
                    }
                    _ => out.push(render_clause(child)),
                }
            }
        }
        _ => out.push(render_expr(decl, 0)),
    }
    out.join(" ")
}

fn render_clause(decl: &Decl) -> String {
    let list = |children: &[Decl], f: fn(&Decl) -> String| {
        children.iter().map(f).collect::<Vec<_>>().join(", ")
    };
    match decl.kind {
        TokenKind::Keyword(Keyword::From) => {
            format!("FROM {}", list(&decl.children, render_clause))
        }
        TokenKind::Keyword(Keyword::Table) => render_name(&decl.lexeme),
        TokenKind::Keyword(Keyword::Join) => {
            let mut parts = Vec::new();
            for child in &decl.children {
                match child.kind {
                    TokenKind::Keyword(Keyword::Left) => parts.push("LEFT".to_string()),
                    TokenKind::Keyword(Keyword::Table) => {
                        parts.push(format!("JOIN {}", render_name(&child.lexeme)))
                    }
                    _ => parts.push(render_clause(child)),
                }
            }
            parts.join(" ")
        }
        TokenKind::Keyword(Keyword::On) => {
            format!("ON {}", list(&decl.children, |c| render_expr(c, 0)))
        }
        TokenKind::Keyword(Keyword::Where) => {
            format!("WHERE {}", list(&decl.children, |c| render_expr(c, 0)))
        }
        TokenKind::Keyword(Keyword::Order) => {
            format!("ORDER BY {}", list(&decl.children, render_clause))
        }
        TokenKind::Keyword(Keyword::Asc) => format!("{} ASC", list(&decl.children, render_item)),
        TokenKind::Keyword(Keyword::Desc) => format!("{} DESC", list(&decl.children, render_item)),
        TokenKind::Keyword(Keyword::Limit) => {
            format!("LIMIT {}", list(&decl.children, render_item))
        }
        TokenKind::Keyword(Keyword::Offset) => {
            format!("OFFSET {}", list(&decl.children, render_item))
        }
        TokenKind::Keyword(Keyword::For) => "FOR UPDATE".to_string(),
        TokenKind::Keyword(Keyword::Into) => {
            let table = list(&decl.children, |t| {
                if t.children.is_empty() {
                    render_name(&t.lexeme)
                } else {
                    let cols = t
                        .children
                        .iter()
                        .map(|c| render_name(&c.lexeme))
                        .collect::<Vec<_>>();
                    format!("{} ({})", render_name(&t.lexeme), cols.join(", "))
                }
            });
            format!("INTO {}", table)
        }
        TokenKind::Keyword(Keyword::Values) => {
            let tuples = decl
                .children
                .iter()
                .map(|t| format!("({})", list(&t.children, render_item)))
                .collect::<Vec<_>>();
            format!("VALUES {}", tuples.join(", "))
        }
        TokenKind::Keyword(Keyword::Returning) => {
            format!("RETURNING {}", list(&decl.children, render_item))
        }
        TokenKind::Keyword(Keyword::Set) => {
            let assignments = decl
                .children
                .iter()
                .map(|a| match a.children.as_slice() {
                    [col, value] => {
                        format!("{} = {}", render_name(&col.lexeme), render_item(value))
                    }
                    _ => String::new(),
                })
                .collect::<Vec<_>>();
            format!("SET {}", assignments.join(", "))
        }
        TokenKind::Keyword(Keyword::If) => decl.lexeme.to_uppercase(),
        _ => render_item(decl),
    }
}

/// Projection items, attributes and values
fn render_item(decl: &Decl) -> String {
    let qualifier = decl
        .child_keyword(Keyword::Table)
        .map(|t| format!("{}.", render_name(&t.lexeme)))
        .unwrap_or_default();
    match decl.kind {
        TokenKind::Asterisk => format!("{}*", qualifier),
        TokenKind::Ident => format!("{}{}", qualifier, render_name(&decl.lexeme)),
        TokenKind::String => format!("'{}'", decl.lexeme.replace('\'', "''")),
        TokenKind::Keyword(keyword) if decl.children.is_empty() => keyword.to_str().to_string(),
        TokenKind::Keyword(keyword) => format!(
            "{}({})",
            keyword.to_str(),
            decl.children.iter().map(render_item).collect::<Vec<_>>().join(", ")
        ),
        _ => decl.lexeme.clone(),
    }
}

/// Predicates. `parent` is the binding strength of the enclosing connective:
/// 0 for none, 1 for OR, 2 for AND.
fn render_expr(decl: &Decl, parent: u8) -> String {
    let binary = |op: &str, strength: u8| match decl.children.as_slice() {
        [lhs, rhs] => {
            let text = format!(
                "{} {} {}",
                render_expr(lhs, strength),
                op,
                render_expr(rhs, strength + 1)
            );
            if parent > strength { format!("({})", text) } else { text }
        }
        _ => String::new(),
    };
    match decl.kind {
        TokenKind::Keyword(Keyword::Or) => binary("OR", 1),
        TokenKind::Keyword(Keyword::And) => binary("AND", 2),
        TokenKind::Keyword(Keyword::Is) => match decl.children.as_slice() {
            [attr, null] if null.is_keyword(Keyword::Not) => {
                format!("{} IS NOT NULL", render_item(attr))
            }
            [attr, _] => format!("{} IS NULL", render_item(attr)),
            _ => String::new(),
        },
        TokenKind::Equal
        | TokenKind::NotEqual
        | TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual => match decl.children.as_slice() {
            [lhs, rhs] => format!("{} {} {}", render_item(lhs), decl.lexeme, render_item(rhs)),
            _ => String::new(),
        },
        _ => render_item(decl),
    }
}

fn render_column(decl: &Decl) -> String {
    let mut parts = vec![render_name(&decl.lexeme)];
    for child in &decl.children {
        parts.push(match child.kind {
            TokenKind::Keyword(Keyword::Not) => "NOT NULL".to_string(),
            TokenKind::Keyword(Keyword::Default) => {
                let value = child.children.iter().map(render_item).collect::<Vec<_>>();
                format!("DEFAULT {}", value.join(""))
            }
            TokenKind::Keyword(Keyword::On) => "ON UPDATE CURRENT_TIMESTAMP".to_string(),
            TokenKind::Keyword(Keyword::Primary) => "PRIMARY KEY".to_string(),
            TokenKind::Keyword(keyword) => {
                let mut text = keyword.to_str().to_string();
                let sizes = child
                    .children
                    .iter()
                    .filter(|c| c.is(TokenKind::Number))
                    .map(|c| c.lexeme.clone())
                    .collect::<Vec<_>>();
                if !sizes.is_empty() {
                    text = format!("{}({})", text, sizes.join(", "));
                }
                if child.child_keyword(Keyword::With).is_some() {
                    text.push_str(" WITH TIME ZONE");
                }
                text
            }
            _ => child.lexeme.clone(),
        });
    }
    parts.join(" ")
}

/// Quotes names that would not lex back into the same identifier
fn render_name(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && Keyword::from_str(name).is_none();
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

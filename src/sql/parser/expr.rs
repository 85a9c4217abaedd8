//! Predicate, value and builtin function sub-grammars shared by the
//! statement parsers.

use crate::error::Result;

use super::{
    Parser,
    decl::Decl,
    lexer::{Keyword, TokenKind},
};

const BUILTINS: [Keyword; 5] = [
    Keyword::Count,
    Keyword::Min,
    Keyword::Max,
    Keyword::Sum,
    Keyword::Avg,
];

impl Parser {
    /// WHERE predicate
    pub(super) fn parse_where(&mut self) -> Result<Decl> {
        let clause = self.expect_keyword(Keyword::Where)?;
        Ok(clause.with(self.parse_predicate()?))
    }

    /// predicate := and_expr (OR and_expr)*
    pub(super) fn parse_predicate(&mut self) -> Result<Decl> {
        let mut lhs = self.parse_and()?;
        while let Some(or) = self.next_if_keyword(Keyword::Or) {
            let rhs = self.parse_and()?;
            lhs = or.with(lhs).with(rhs);
        }
        Ok(lhs)
    }

    /// and_expr := atom (AND atom)*
    fn parse_and(&mut self) -> Result<Decl> {
        let mut lhs = self.parse_atom()?;
        while let Some(and) = self.next_if_keyword(Keyword::And) {
            let rhs = self.parse_atom()?;
            lhs = and.with(lhs).with(rhs);
        }
        Ok(lhs)
    }

    /// atom := ( predicate ) | operand op value | operand IS [NOT] NULL | literal
    fn parse_atom(&mut self) -> Result<Decl> {
        if self.next_if(TokenKind::OpenParen).is_some() {
            let inner = self.parse_predicate()?;
            self.expect(TokenKind::CloseParen)?;
            return Ok(inner);
        }

        let lhs = self.parse_value()?;
        match self.current().map(|t| t.kind) {
            Some(
                kind @ (TokenKind::Equal
                | TokenKind::NotEqual
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual),
            ) => {
                let op = self.expect(kind)?;
                let rhs = self.parse_value()?;
                Ok(op.with(lhs).with(rhs))
            }
            Some(TokenKind::Keyword(Keyword::Is)) => {
                let is = self.expect_keyword(Keyword::Is)?.with(lhs);
                match self.next_if_keyword(Keyword::Not) {
                    Some(not) => Ok(is.with(not.with(self.expect_keyword(Keyword::Null)?))),
                    None => Ok(is.with(self.expect_keyword(Keyword::Null)?)),
                }
            }
            // Bare literal such as the implicit `1`
            _ if matches!(
                lhs.kind,
                TokenKind::Number
                    | TokenKind::Keyword(Keyword::True)
                    | TokenKind::Keyword(Keyword::False)
            ) =>
            {
                Ok(lhs)
            }
            _ => Err(self.error("expected comparison operator")),
        }
    }

    /// Literal, placeholder, CURRENT_TIMESTAMP, DEFAULT or attribute
    pub(super) fn parse_value(&mut self) -> Result<Decl> {
        let Some(token) = self.current() else {
            return Err(self.error("expected a value"));
        };
        match token.kind {
            TokenKind::Minus => {
                self.advance();
                let number = self.expect(TokenKind::Number)?;
                Ok(Decl::new(TokenKind::Number, format!("-{}", number.lexeme)))
            }
            TokenKind::Number | TokenKind::String | TokenKind::Placeholder => {
                let decl = Decl::from_token(token);
                self.advance();
                Ok(decl)
            }
            TokenKind::Keyword(
                keyword @ (Keyword::Null
                | Keyword::True
                | Keyword::False
                | Keyword::Default
                | Keyword::CurrentTimestamp),
            ) => self.expect_keyword(keyword),
            TokenKind::Keyword(Keyword::Now)
                if self.peek_at(1).is_some_and(|t| t.kind == TokenKind::OpenParen) =>
            {
                self.parse_current_timestamp()
            }
            _ => self.parse_attribute(),
        }
    }

    /// CURRENT_TIMESTAMP or NOW(), both yield the same declaration
    pub(super) fn parse_current_timestamp(&mut self) -> Result<Decl> {
        if self.next_if_keyword(Keyword::Now).is_some() {
            self.expect(TokenKind::OpenParen)?;
            self.expect(TokenKind::CloseParen)?;
            return Ok(Decl::keyword(Keyword::CurrentTimestamp));
        }
        self.expect_keyword(Keyword::CurrentTimestamp)
    }

    /// column or table.column
    pub(super) fn parse_attribute(&mut self) -> Result<Decl> {
        let name = self.parse_name()?;
        if self.next_if(TokenKind::Period).is_none() {
            return Ok(Decl::new(TokenKind::Ident, name));
        }
        let table = Decl::new(TokenKind::Keyword(Keyword::Table), name);
        Ok(Decl::new(TokenKind::Ident, self.parse_name()?).with(table))
    }

    /// A builtin name directly followed by an opening parenthesis
    pub(super) fn peek_builtin(&self) -> bool {
        BUILTINS.iter().any(|k| self.peek_keyword(*k))
            && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::OpenParen)
    }

    /// COUNT(*) | COUNT(attr), and MIN/MAX/SUM/AVG(attr)
    pub(super) fn parse_builtin_func(&mut self) -> Result<Decl> {
        let func = match self.current().map(|t| t.kind) {
            Some(TokenKind::Keyword(keyword)) if BUILTINS.contains(&keyword) => {
                self.expect_keyword(keyword)?
            }
            _ => return Err(self.error("expected builtin function")),
        };
        self.expect(TokenKind::OpenParen)?;
        let arg = match self.next_if(TokenKind::Asterisk) {
            Some(star) if func.is_keyword(Keyword::Count) => star,
            Some(_) => {
                let name = func.lexeme.to_uppercase();
                return Err(self.error(format!("{} requires a column", name)));
            }
            None => self.parse_attribute()?,
        };
        self.expect(TokenKind::CloseParen)?;
        Ok(func.with(arg))
    }
}

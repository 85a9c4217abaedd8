use crate::error::{Error, Result};
use decl::{Decl, Instruction};
use lexer::{Keyword, Token, TokenKind, tokenize};

pub mod decl;
mod expr;
pub mod lexer;

/// Parses one SQL statement into its declaration tree
pub fn parse(input: &str) -> Result<Instruction> {
    Parser::new(input).parse()
}

/// SQL Parser - recursive descent over the token sequence, building a
/// declaration tree
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    end: usize,
}

impl Parser {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &str) -> Self {
        Parser {
            tokens: tokenize(input),
            index: 0,
            end: input.len(),
        }
    }

    /// Parses the input SQL statement. A trailing semicolon is optional.
    pub fn parse(&mut self) -> Result<Instruction> {
        let decl = self.parse_statement()?;
        self.next_if(TokenKind::Semicolon);
        // No tokens allowed after the statement
        if self.current().is_some() {
            return Err(self.error("unexpected token after end of statement"));
        }
        Ok(Instruction { decls: vec![decl] })
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<Decl> {
        match self.current().map(|t| t.kind) {
            Some(TokenKind::Keyword(Keyword::Select)) => self.parse_select(),
            Some(TokenKind::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(TokenKind::Keyword(Keyword::Update)) => self.parse_update(),
            Some(TokenKind::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(TokenKind::Keyword(Keyword::Create)) => self.parse_create_table(),
            Some(TokenKind::Keyword(Keyword::Drop)) => self.parse_drop_table(),
            Some(TokenKind::Keyword(Keyword::Truncate)) => self.parse_truncate(),
            _ => Err(self.error("expected a statement")),
        }
    }

    /// SELECT items FROM tables [JOIN ..]* [WHERE|ORDER BY|LIMIT|OFFSET|FOR UPDATE]*
    fn parse_select(&mut self) -> Result<Decl> {
        let mut select = self.expect_keyword(Keyword::Select)?;

        loop {
            select.add(self.parse_select_item()?);
            if self.next_if(TokenKind::Comma).is_none() {
                break;
            }
        }

        let mut from = self.expect_keyword(Keyword::From)?;
        loop {
            from.add(self.parse_table()?);
            if self.next_if(TokenKind::Comma).is_none() {
                break;
            }
        }
        select.add(from);

        // A bare FROM list selects every row
        if self.at_end() {
            select.add(Decl::implicit_where());
            return Ok(select);
        }

        while self.peek_join() {
            let join = self.parse_join()?;
            select.add(join);
        }

        let mut where_index = None;
        loop {
            let keyword = match self.current().map(|t| t.kind) {
                Some(TokenKind::Keyword(keyword)) => keyword,
                _ => break,
            };
            match keyword {
                Keyword::Where => {
                    let clause = self.parse_where()?;
                    match where_index {
                        // Replaces the implicit predicate added by an earlier clause
                        Some(i) if select.children[i] == Decl::implicit_where() => {
                            select.children[i] = clause
                        }
                        Some(_) => return Err(self.error("duplicate WHERE clause")),
                        None => {
                            where_index = Some(select.children.len());
                            select.add(clause);
                        }
                    }
                    continue;
                }
                Keyword::Order | Keyword::Limit | Keyword::Offset | Keyword::For => {}
                _ => break,
            }
            if where_index.is_none() {
                where_index = Some(select.children.len());
                select.add(Decl::implicit_where());
            }
            let clause = match keyword {
                Keyword::Order => self.parse_order_by()?,
                Keyword::Limit => self.parse_pagination(Keyword::Limit)?,
                Keyword::Offset => self.parse_pagination(Keyword::Offset)?,
                _ => self.parse_for_update()?,
            };
            select.add(clause);
        }

        if where_index.is_none() {
            select.add(Decl::implicit_where());
        }
        Ok(select)
    }

    /// `*`, `t.*`, builtin function call or attribute
    fn parse_select_item(&mut self) -> Result<Decl> {
        if let Some(star) = self.next_if(TokenKind::Asterisk) {
            return Ok(star);
        }
        if self.peek_builtin() {
            return self.parse_builtin_func();
        }
        if self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Period)
            && self.peek_at(2).is_some_and(|t| t.kind == TokenKind::Asterisk)
        {
            let table = Decl::new(TokenKind::Keyword(Keyword::Table), self.parse_name()?);
            self.expect(TokenKind::Period)?;
            return Ok(self.expect(TokenKind::Asterisk)?.with(table));
        }
        self.parse_attribute()
    }

    /// [LEFT [OUTER] | INNER] JOIN table ON predicate
    fn parse_join(&mut self) -> Result<Decl> {
        let mut left = None;
        if self.peek_keyword(Keyword::Left) {
            left = Some(self.expect_keyword(Keyword::Left)?);
            self.next_if_keyword(Keyword::Outer);
        } else {
            self.next_if_keyword(Keyword::Inner);
        }

        let mut join = self.expect_keyword(Keyword::Join)?;
        if let Some(left) = left {
            join.add(left);
        }
        join.add(self.parse_table()?);

        let mut on = self.expect_keyword(Keyword::On)?;
        on.add(self.parse_predicate()?);
        join.add(on);
        Ok(join)
    }

    fn parse_order_by(&mut self) -> Result<Decl> {
        self.expect_keyword(Keyword::Order)?;
        self.expect_keyword(Keyword::By)?;
        let mut order = Decl::new(TokenKind::Keyword(Keyword::Order), "order by");
        loop {
            let attr = self.parse_attribute()?;
            let direction = match self.next_if_keyword(Keyword::Desc) {
                Some(desc) => desc,
                None => {
                    self.next_if_keyword(Keyword::Asc);
                    Decl::keyword(Keyword::Asc)
                }
            };
            order.add(direction.with(attr));
            if self.next_if(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(order)
    }

    /// LIMIT n / OFFSET n
    fn parse_pagination(&mut self, keyword: Keyword) -> Result<Decl> {
        let clause = self.expect_keyword(keyword)?;
        let number = self.expect(TokenKind::Number)?;
        if number.lexeme.parse::<usize>().is_err() {
            return Err(Error::syntax(
                format!("{} expects a non-negative integer in range", keyword),
                number.lexeme,
                self.previous_position(),
            ));
        }
        Ok(clause.with(number))
    }

    fn parse_for_update(&mut self) -> Result<Decl> {
        let for_decl = self.expect_keyword(Keyword::For)?;
        let update = self.expect_keyword(Keyword::Update)?;
        Ok(for_decl.with(update))
    }

    /// INSERT INTO table [(cols)] VALUES (..)[, (..)]* [RETURNING attr]
    fn parse_insert(&mut self) -> Result<Decl> {
        let mut insert = self.expect_keyword(Keyword::Insert)?;
        let into = self.expect_keyword(Keyword::Into)?;

        let mut table = self.parse_table()?;
        if self.next_if(TokenKind::OpenParen).is_some() {
            loop {
                table.add(Decl::new(TokenKind::Ident, self.parse_name()?));
                if self.next_if(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::CloseParen)?;
        }
        insert.add(into.with(table));

        let mut values = self.expect_keyword(Keyword::Values)?;
        loop {
            let mut tuple = self.expect(TokenKind::OpenParen)?;
            loop {
                tuple.add(self.parse_value()?);
                if self.next_if(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::CloseParen)?;
            values.add(tuple);
            if self.next_if(TokenKind::Comma).is_none() {
                break;
            }
        }
        insert.add(values);

        if let Some(returning) = self.next_if_keyword(Keyword::Returning) {
            let attr = self.parse_attribute()?;
            insert.add(returning.with(attr));
        }
        Ok(insert)
    }

    /// UPDATE table SET col = value[, ..] [WHERE predicate]
    fn parse_update(&mut self) -> Result<Decl> {
        let mut update = self.expect_keyword(Keyword::Update)?;
        update.add(self.parse_table()?);

        let mut set = self.expect_keyword(Keyword::Set)?;
        loop {
            let column = Decl::new(TokenKind::Ident, self.parse_name()?);
            let assignment = self.expect(TokenKind::Equal)?;
            let value = self.parse_value()?;
            set.add(assignment.with(column).with(value));
            if self.next_if(TokenKind::Comma).is_none() {
                break;
            }
        }
        update.add(set);

        if self.peek_keyword(Keyword::Where) {
            update.add(self.parse_where()?);
        } else {
            update.add(Decl::implicit_where());
        }
        Ok(update)
    }

    /// DELETE FROM table [WHERE predicate]
    fn parse_delete(&mut self) -> Result<Decl> {
        let mut delete = self.expect_keyword(Keyword::Delete)?;
        let from = self.expect_keyword(Keyword::From)?;
        let table = self.parse_table()?;
        delete.add(from.with(table));

        if self.peek_keyword(Keyword::Where) {
            delete.add(self.parse_where()?);
        } else {
            delete.add(Decl::implicit_where());
        }
        Ok(delete)
    }

    /// TRUNCATE [TABLE] table
    fn parse_truncate(&mut self) -> Result<Decl> {
        let truncate = self.expect_keyword(Keyword::Truncate)?;
        self.next_if_keyword(Keyword::Table);
        let table = self.parse_table()?;
        Ok(truncate.with(table))
    }

    /// DROP TABLE [IF EXISTS] table
    fn parse_drop_table(&mut self) -> Result<Decl> {
        let mut drop = self.expect_keyword(Keyword::Drop)?;
        self.expect_keyword(Keyword::Table)?;
        if self.next_if_keyword(Keyword::If).is_some() {
            self.expect_keyword(Keyword::Exists)?;
            drop.add(Decl::new(TokenKind::Keyword(Keyword::If), "if exists"));
        }
        drop.add(self.parse_table()?);
        Ok(drop)
    }

    /// CREATE TABLE [IF NOT EXISTS] table (column definitions)
    fn parse_create_table(&mut self) -> Result<Decl> {
        let mut create = self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;
        if self.next_if_keyword(Keyword::If).is_some() {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            create.add(Decl::new(TokenKind::Keyword(Keyword::If), "if not exists"));
        }

        let mut table = self.parse_table()?;
        self.expect(TokenKind::OpenParen)?;
        loop {
            table.add(self.parse_column()?);
            if self.next_if(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        create.add(table);
        Ok(create)
    }

    /// Column definition: name, type, then modifiers in any order
    fn parse_column(&mut self) -> Result<Decl> {
        let mut column = Decl::new(TokenKind::Ident, self.parse_name()?);
        column.add(self.parse_column_type()?);

        loop {
            let keyword = match self.current().map(|t| t.kind) {
                Some(TokenKind::Keyword(keyword)) => keyword,
                _ => break,
            };
            let modifier = match keyword {
                Keyword::Autoincrement | Keyword::Null | Keyword::Unique => {
                    self.expect_keyword(keyword)?
                }
                Keyword::Not => {
                    let not = self.expect_keyword(Keyword::Not)?;
                    not.with(self.expect_keyword(Keyword::Null)?)
                }
                Keyword::Default => {
                    let default = self.expect_keyword(Keyword::Default)?;
                    default.with(self.parse_value()?)
                }
                Keyword::On => {
                    let on = self.expect_keyword(Keyword::On)?;
                    let update = self.expect_keyword(Keyword::Update)?;
                    let now = self.parse_current_timestamp()?;
                    on.with(update.with(now))
                }
                Keyword::Primary => {
                    let primary = self.expect_keyword(Keyword::Primary)?;
                    primary.with(self.expect_keyword(Keyword::Key)?)
                }
                _ => break,
            };
            column.add(modifier);
        }
        Ok(column)
    }

    fn parse_column_type(&mut self) -> Result<Decl> {
        let keyword = match self.current().map(|t| t.kind) {
            Some(TokenKind::Keyword(keyword)) => keyword,
            _ => return Err(self.error("expected column type")),
        };
        match keyword {
            Keyword::Int
            | Keyword::Integer
            | Keyword::Bigint
            | Keyword::Smallint
            | Keyword::Text
            | Keyword::Varchar
            | Keyword::Char
            | Keyword::String
            | Keyword::Float
            | Keyword::Double
            | Keyword::Real
            | Keyword::Decimal
            | Keyword::Bool
            | Keyword::Boolean
            | Keyword::Datetime
            | Keyword::Date => {
                let mut datatype = self.expect_keyword(keyword)?;
                // VARCHAR(255), DECIMAL(10, 2): sizes are kept but not enforced
                if self.next_if(TokenKind::OpenParen).is_some() {
                    loop {
                        datatype.add(self.expect(TokenKind::Number)?);
                        if self.next_if(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expect(TokenKind::CloseParen)?;
                }
                Ok(datatype)
            }
            Keyword::Timestamp => {
                let mut datatype = self.expect_keyword(Keyword::Timestamp)?;
                if self.next_if_keyword(Keyword::With).is_some() {
                    self.expect_keyword(Keyword::Time)?;
                    self.expect_keyword(Keyword::Zone)?;
                    datatype.add(Decl::new(TokenKind::Keyword(Keyword::With), "with time zone"));
                }
                Ok(datatype)
            }
            _ => Err(self.error("expected column type")),
        }
    }

    /// Table reference
    fn parse_table(&mut self) -> Result<Decl> {
        Ok(Decl::new(TokenKind::Keyword(Keyword::Table), self.parse_name()?))
    }

    /// Table or column name: identifier, quoted name or non-reserved keyword
    fn parse_name(&mut self) -> Result<String> {
        match self.current() {
            Some(token) if matches!(token.kind, TokenKind::Ident | TokenKind::String) => {
                let name = token.lexeme.clone();
                self.advance();
                Ok(name)
            }
            Some(Token {
                kind: TokenKind::Keyword(keyword),
                lexeme,
                ..
            }) if !keyword.is_reserved() => {
                let name = lexeme.to_lowercase();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    /// Current token, or None at end of input
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    /// Consumes and returns the current token
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// End of statement: no more tokens or only the closing semicolon
    fn at_end(&self) -> bool {
        match self.current() {
            None => true,
            Some(token) => token.kind == TokenKind::Semicolon && self.peek_at(1).is_none(),
        }
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|t| t.kind == kind)
    }

    fn peek_keyword(&self, keyword: Keyword) -> bool {
        self.peek_is(TokenKind::Keyword(keyword))
    }

    fn peek_join(&self) -> bool {
        self.peek_keyword(Keyword::Join)
            || self.peek_keyword(Keyword::Left)
            || self.peek_keyword(Keyword::Inner)
    }

    /// Expects a specific token kind, returns a syntax error if different
    fn expect(&mut self, kind: TokenKind) -> Result<Decl> {
        match self.current() {
            Some(token) if token.kind == kind => {
                let decl = Decl::from_token(token);
                self.advance();
                Ok(decl)
            }
            _ => Err(self.error(format!("expected {}", kind))),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Decl> {
        self.expect(TokenKind::Keyword(keyword))
    }

    /// Consumes the current token if it has the given kind
    fn next_if(&mut self, kind: TokenKind) -> Option<Decl> {
        if self.peek_is(kind) { self.expect(kind).ok() } else { None }
    }

    fn next_if_keyword(&mut self, keyword: Keyword) -> Option<Decl> {
        self.next_if(TokenKind::Keyword(keyword))
    }

    fn previous_position(&self) -> usize {
        self.index
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.position)
    }

    /// Syntax error pointing at the current token
    fn error(&self, message: impl Into<String>) -> Error {
        match self.current() {
            Some(token) if token.kind == TokenKind::Invalid => {
                Error::syntax("unrecognized input", token.lexeme.clone(), token.position)
            }
            Some(token) => Error::syntax(message, token.lexeme.clone(), token.position),
            None => Error::syntax(
                format!("{}, got end of input", message.into()),
                "",
                self.end,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Parser, parse};
    use crate::{
        error::{Error, Result},
        sql::parser::{
            decl::{Decl, Instruction},
            lexer::{Keyword, TokenKind},
        },
    };

    fn root(sql: &str) -> Result<Decl> {
        Ok(parse(sql)?.decls.remove(0))
    }

    fn kinds(decl: &Decl) -> Vec<TokenKind> {
        decl.children.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_parser_select_implicit_where() -> Result<()> {
        let select = root("SELECT * FROM account")?;
        assert_eq!(
            kinds(&select),
            vec![
                TokenKind::Asterisk,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Where),
            ]
        );
        assert_eq!(select.children[2], Decl::implicit_where());

        let ordered = root("select id from account order by id desc limit 2 offset 1 for update")?;
        assert_eq!(
            kinds(&ordered),
            vec![
                TokenKind::Ident,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Keyword(Keyword::Order),
                TokenKind::Keyword(Keyword::Limit),
                TokenKind::Keyword(Keyword::Offset),
                TokenKind::Keyword(Keyword::For),
            ]
        );
        assert_eq!(ordered.children[2], Decl::implicit_where());
        Ok(())
    }

    #[test]
    fn test_parser_select_where_after_limit() -> Result<()> {
        let a = root("SELECT id FROM t LIMIT 1 WHERE id = 2")?;
        let b = root("SELECT id FROM t WHERE id = 2 LIMIT 1")?;
        assert_eq!(a, b);
        assert!(parse("SELECT id FROM t WHERE id = 1 WHERE id = 2").is_err());
        Ok(())
    }

    #[test]
    fn test_parser_select_joins() -> Result<()> {
        let select = root(
            "SELECT a.id, COUNT(b.id), c.* FROM a, x
             JOIN b ON a.id = b.a_id
             LEFT OUTER JOIN c ON c.b_id = b.id AND c.flag IS NOT NULL
             WHERE a.id > 3",
        )?;
        assert_eq!(
            kinds(&select),
            vec![
                TokenKind::Ident,
                TokenKind::Keyword(Keyword::Count),
                TokenKind::Asterisk,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Join),
                TokenKind::Keyword(Keyword::Join),
                TokenKind::Keyword(Keyword::Where),
            ]
        );
        assert_eq!(select.children[3].children.len(), 2);
        let left_join = &select.children[5];
        assert!(left_join.children[0].is_keyword(Keyword::Left));
        assert_eq!(left_join.children[1].lexeme, "c");
        let on = left_join.child_keyword(Keyword::On).map(|on| &on.children[0]);
        assert!(on.is_some_and(|p| p.is_keyword(Keyword::And)));
        Ok(())
    }

    #[test]
    fn test_parser_predicate_precedence() -> Result<()> {
        let select = root("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3")?;
        let predicate = &select.child_keyword(Keyword::Where).unwrap().children[0];
        assert!(predicate.is_keyword(Keyword::Or));
        assert!(predicate.children[1].is_keyword(Keyword::And));

        let select = root("SELECT * FROM t WHERE (a = 1 OR b = 2) AND c = 3")?;
        let predicate = &select.child_keyword(Keyword::Where).unwrap().children[0];
        assert!(predicate.is_keyword(Keyword::And));
        assert!(predicate.children[0].is_keyword(Keyword::Or));
        Ok(())
    }

    #[test]
    fn test_parser_delete() -> Result<()> {
        let delete = root("DELETE FROM account")?;
        assert_eq!(delete.children[1], Decl::implicit_where());

        let delete = root("DELETE FROM account WHERE email IS NULL;")?;
        let predicate = &delete.children[1].children[0];
        assert!(predicate.is_keyword(Keyword::Is));
        assert!(predicate.children[1].is_keyword(Keyword::Null));
        Ok(())
    }

    #[test]
    fn test_parser_truncate() -> Result<()> {
        let truncate = root("TRUNCATE account")?;
        assert_eq!(truncate.children.len(), 1);
        assert_eq!(truncate.children[0].lexeme, "account");
        assert_eq!(root("truncate table account")?, truncate);
        assert!(parse("TRUNCATE account WHERE id = 1").is_err());
        Ok(())
    }

    #[test]
    fn test_parser_create_table() -> Result<()> {
        let sql1 = "CREATE TABLE account (
            id INT AUTOINCREMENT,
            email VARCHAR(255) NOT NULL DEFAULT 'none',
            modified TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
        );";
        let sql2 = "create   table account (id int auto_increment,
            email varchar ( 255 ) not null default 'none',
            modified timestamp with time zone default now() on update current_timestamp)";
        assert_eq!(parse(sql1)?, parse(sql2)?);

        let create = root(sql1)?;
        let table = &create.children[0];
        assert_eq!(table.children.len(), 3);
        let modified = &table.children[2];
        assert!(modified.children[0].is_keyword(Keyword::Timestamp));
        assert!(modified.child_keyword(Keyword::On).is_some());

        assert!(parse("CREATE TABLE t (id)").is_err());
        Ok(())
    }

    #[test]
    fn test_parser_insert_quoted_columns() -> Result<()> {
        let insert = root("INSERT INTO account ('email') VALUES ('foo@bar.com'), ($1)")?;
        let table = &insert.children[0].children[0];
        assert_eq!(table.lexeme, "account");
        assert_eq!(table.children[0], Decl::new(TokenKind::Ident, "email"));
        let values = &insert.children[1];
        assert_eq!(values.children.len(), 2);
        assert_eq!(values.children[1].children[0], Decl::new(TokenKind::Placeholder, "$1"));
        Ok(())
    }

    #[test]
    fn test_parser_syntax_errors() {
        let err = parse("SELECT * FORM account").unwrap_err();
        assert_eq!(
            err,
            Error::Syntax {
                message: "expected FROM".into(),
                token: "form".into(),
                position: 9,
            }
        );

        match parse("SELECT * FROM account LIMIT") {
            Err(Error::Syntax { position, token, .. }) => {
                assert_eq!(position, 27);
                assert_eq!(token, "");
            }
            other => panic!("unexpected result {:?}", other),
        }

        assert!(matches!(parse("SELECT * FROM a WHERE x ~ 1"), Err(Error::Syntax { .. })));
        assert!(matches!(parse("SELECT * FROM a LIMIT 1.5"), Err(Error::Syntax { .. })));
        match parse("SELECT * FROM a LIMIT 99999999999999999999") {
            Err(Error::Syntax { token, position, .. }) => {
                assert_eq!(token, "99999999999999999999");
                assert_eq!(position, 22);
            }
            other => panic!("unexpected result {:?}", other),
        }
        let offset = parse("SELECT * FROM a OFFSET 99999999999999999999");
        assert!(matches!(offset, Err(Error::Syntax { .. })));
        assert!(matches!(parse("UPDATE a SET"), Err(Error::Syntax { .. })));
        assert!(matches!(parse(""), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_parser_round_trip() -> Result<()> {
        let statements = [
            "SELECT * FROM account",
            "select a.id, count(*) from a join b on a.id = b.a_id \
             where a.x = 'it''s' or (a.y <= -2.5 and b.z is not null) \
             order by a.id desc, b.z limit 10 offset 2",
            "SELECT \"Mixed\".* FROM \"Mixed\" \
             LEFT JOIN other ON \"Mixed\".id != other.id FOR UPDATE",
            "INSERT INTO account (email, \"date\") VALUES ('a', $1), ('b', NULL) RETURNING id",
            "UPDATE account SET email = 'x', modified = CURRENT_TIMESTAMP \
             WHERE id = $1 AND modified IS NULL",
            "DELETE FROM account WHERE a = 1 AND (b = 2 AND c = 3)",
            "CREATE TABLE IF NOT EXISTS account (id BIGINT PRIMARY KEY AUTOINCREMENT, \
             email TEXT NOT NULL UNIQUE, \
             d TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP, \
             n DECIMAL(10, 2) DEFAULT -1)",
            "DROP TABLE IF EXISTS account",
            "TRUNCATE account",
        ];
        for sql in statements {
            let instruction: Instruction = Parser::new(sql).parse()?;
            let rendered = instruction.to_sql();
            assert_eq!(parse(&rendered)?, instruction, "{}", rendered);
        }
        Ok(())
    }
}

//! SQL Lexer - Tokenizes SQL input text into a stream of tokens

use std::{fmt::Display, iter::Peekable, str::CharIndices};

/// Kind of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// SQL reserved or type keyword
    Keyword(Keyword),
    /// Identifier such as table name or column name
    Ident,
    /// String literal
    String,
    /// Numeric literal (integer or floating-point)
    Number,
    /// Positional parameter placeholder (`$1`, `$2`, ...)
    Placeholder,
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Period,
    Asterisk,
    Minus,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// Unrecognized input, reported by the parser
    Invalid,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenKind::Keyword(keyword) => keyword.to_str(),
            TokenKind::Ident => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Placeholder => "placeholder",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Period => ".",
            TokenKind::Asterisk => "*",
            TokenKind::Minus => "-",
            TokenKind::Equal => "=",
            TokenKind::NotEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Invalid => "invalid input",
        })
    }
}

/// A single lexical token in the SQL input
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifiers are lowercased unless quoted, strings are unescaped
    pub lexeme: String,
    /// Byte offset of the token in the statement text
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lexeme)
    }
}

macro_rules! keywords {
    ($($variant:ident => $text:literal $(| $alias:literal)*,)*) => {
        /// SQL keywords
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            /// Attempts to parse a string as a keyword (case-insensitive)
            pub fn from_str(ident: &str) -> Option<Keyword> {
                Some(match ident.to_uppercase().as_str() {
                    $($text $(| $alias)* => Keyword::$variant,)*
                    _ => return None,
                })
            }

            /// Returns the uppercase string representation of the keyword
            pub fn to_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }
        }
    };
}

keywords! {
    // Statements
    Select => "SELECT",
    Insert => "INSERT",
    Update => "UPDATE",
    Delete => "DELETE",
    Create => "CREATE",
    Drop => "DROP",
    Truncate => "TRUNCATE",
    // Clauses
    From => "FROM",
    Where => "WHERE",
    Join => "JOIN",
    Inner => "INNER",
    Left => "LEFT",
    Outer => "OUTER",
    On => "ON",
    Order => "ORDER",
    By => "BY",
    Asc => "ASC",
    Desc => "DESC",
    Limit => "LIMIT",
    Offset => "OFFSET",
    For => "FOR",
    Into => "INTO",
    Values => "VALUES",
    Returning => "RETURNING",
    Set => "SET",
    Table => "TABLE",
    If => "IF",
    Exists => "EXISTS",
    // Predicates and literals
    And => "AND",
    Or => "OR",
    Not => "NOT",
    Is => "IS",
    Null => "NULL",
    True => "TRUE",
    False => "FALSE",
    Count => "COUNT",
    Min => "MIN",
    Max => "MAX",
    Sum => "SUM",
    Avg => "AVG",
    CurrentTimestamp => "CURRENT_TIMESTAMP",
    Now => "NOW",
    // Column modifiers
    Default => "DEFAULT",
    Autoincrement => "AUTOINCREMENT" | "AUTO_INCREMENT",
    Primary => "PRIMARY",
    Key => "KEY",
    Unique => "UNIQUE",
    With => "WITH",
    Time => "TIME",
    Zone => "ZONE",
    // Data types
    Int => "INT",
    Integer => "INTEGER",
    Bigint => "BIGINT",
    Smallint => "SMALLINT",
    Text => "TEXT",
    Varchar => "VARCHAR",
    Char => "CHAR",
    String => "STRING",
    Float => "FLOAT",
    Double => "DOUBLE",
    Real => "REAL",
    Decimal => "DECIMAL",
    Bool => "BOOL",
    Boolean => "BOOLEAN",
    Timestamp => "TIMESTAMP",
    Datetime => "DATETIME",
    Date => "DATE",
}

impl Keyword {
    /// Non-reserved keywords may also be used as table or column names
    pub fn is_reserved(&self) -> bool {
        !matches!(
            self,
            Keyword::Key
                | Keyword::Time
                | Keyword::Zone
                | Keyword::Text
                | Keyword::String
                | Keyword::Date
                | Keyword::Timestamp
                | Keyword::Datetime
                | Keyword::Count
                | Keyword::Min
                | Keyword::Max
                | Keyword::Sum
                | Keyword::Avg
                | Keyword::Now
        )
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// SQL lexical analyzer (lexer/tokenizer)
pub struct Lexer<'a> {
    input: &'a str,
    iter: Peekable<CharIndices<'a>>,
}

/// Tokenizes a whole statement. Never fails: bad input becomes
/// [`TokenKind::Invalid`] tokens.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan()
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given SQL text
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            iter: input.char_indices().peekable(),
        }
    }

    /// Byte offset of the next character
    fn offset(&mut self) -> usize {
        self.iter.peek().map_or(self.input.len(), |(i, _)| *i)
    }

    fn peek(&mut self) -> Option<char> {
        self.iter.peek().map(|(_, c)| *c)
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.next_if(|(_, c)| predicate(*c)).map(|(_, c)| c)
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Skips whitespace and `--` line comments
    fn erase_whitespace(&mut self) {
        loop {
            self.next_while(|c| c.is_whitespace());
            let rest = &self.input[self.offset()..];
            if !rest.starts_with("--") {
                return;
            }
            self.next_while(|c| c != '\n');
        }
    }

    /// Scans and returns the next token
    fn scan(&mut self) -> Option<Token> {
        self.erase_whitespace();
        let start = self.offset();
        let token = match self.peek()? {
            '\'' => self.scan_quoted('\'', TokenKind::String),
            '"' => self.scan_quoted('"', TokenKind::Ident),
            '`' => self.scan_quoted('`', TokenKind::Ident),
            '$' => self.scan_placeholder(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_alphabetic() || c == '_' => self.scan_ident(),
            _ => self.scan_symbol(),
        };
        Some(Token::new(token.0, token.1, start))
    }

    /// Scans a quoted string or identifier; a doubled quote escapes itself
    fn scan_quoted(&mut self, quote: char, kind: TokenKind) -> (TokenKind, String) {
        let start = self.offset();
        self.iter.next();
        let mut val = String::new();
        loop {
            match self.iter.next() {
                Some((_, c)) if c == quote => {
                    if self.next_if(|c| c == quote).is_none() {
                        return (kind, val);
                    }
                    val.push(quote);
                }
                Some((_, c)) => val.push(c),
                None => return (TokenKind::Invalid, self.input[start..].to_string()),
            }
        }
    }

    fn scan_placeholder(&mut self) -> (TokenKind, String) {
        self.iter.next();
        match self.next_while(|c| c.is_ascii_digit()) {
            Some(digits) => (TokenKind::Placeholder, format!("${}", digits)),
            None => (TokenKind::Invalid, "$".to_string()),
        }
    }

    /// Scans a numeric literal (integer or floating-point)
    fn scan_number(&mut self) -> (TokenKind, String) {
        let mut val = self.next_while(|c| c.is_ascii_digit()).unwrap_or_default();
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        (TokenKind::Number, val)
    }

    /// Scans an identifier or keyword
    fn scan_ident(&mut self) -> (TokenKind, String) {
        let val = self
            .next_while(|c| c.is_alphanumeric() || c == '_')
            .unwrap_or_default();
        match Keyword::from_str(&val) {
            Some(keyword) => (TokenKind::Keyword(keyword), val),
            None => (TokenKind::Ident, val.to_lowercase()),
        }
    }

    /// Scans a one or two character symbol
    fn scan_symbol(&mut self) -> (TokenKind, String) {
        let Some((_, c)) = self.iter.next() else {
            return (TokenKind::Invalid, String::new());
        };
        let kind = match c {
            '*' => TokenKind::Asterisk,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Period,
            '-' => TokenKind::Minus,
            '=' => TokenKind::Equal,
            '!' if self.next_if(|c| c == '=').is_some() => {
                return (TokenKind::NotEqual, "!=".into());
            }
            '<' if self.next_if(|c| c == '=').is_some() => {
                return (TokenKind::LessEqual, "<=".into());
            }
            '<' if self.next_if(|c| c == '>').is_some() => {
                return (TokenKind::NotEqual, "<>".into());
            }
            '>' if self.next_if(|c| c == '=').is_some() => {
                return (TokenKind::GreaterEqual, ">=".into());
            }
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            _ => TokenKind::Invalid,
        };
        (kind, c.to_string())
    }
}

use std::fmt;

use crate::ast::BinaryOperator;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub loc: Location,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, loc: Location) -> Token<'a> {
        Token { kind, loc }
    }
}

/// A 1-indexed position in the source buffer.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub row: usize,
    pub col: usize,
}

impl Location {
    pub const START: Location = Location { row: 1, col: 1 };

    pub const fn new(row: usize, col: usize) -> Location {
        Location { row, col }
    }

    /// Attaches this location to the provided value.
    pub fn wrap<T>(self, inner: T) -> Located<T> {
        Located { loc: self, inner }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::START
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({self})")
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Located<T> {
    pub loc: Location,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Located<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.inner)
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for Located<T> {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Number(u64),
    Operator(BinaryOperator),
    /// Identifier text, owned by the compilation arena.
    Ident(&'a str),
    Keyword(Keyword),
    Semicolon,
    Colon,
    Equal,
    OpenParen,
    CloseParen,
    OpenCurly,
    CloseCurly,
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number `{n}`"),
            TokenKind::Operator(op) => write!(f, "operator `{op}`"),
            TokenKind::Ident(name) => write!(f, "identifier `{name}`"),
            TokenKind::Keyword(keyword) => write!(f, "keyword `{keyword}`"),
            TokenKind::Semicolon => f.write_str("`;`"),
            TokenKind::Colon => f.write_str("`:`"),
            TokenKind::Equal => f.write_str("`=`"),
            TokenKind::OpenParen => f.write_str("`(`"),
            TokenKind::CloseParen => f.write_str("`)`"),
            TokenKind::OpenCurly => f.write_str("`{`"),
            TokenKind::CloseCurly => f.write_str("`}`"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Return,
    Let,
    If,
    While,
    True,
    False,
}

impl Keyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            Keyword::Return => "return",
            Keyword::Let => "let",
            Keyword::If => "if",
            Keyword::While => "while",
            Keyword::True => "true",
            Keyword::False => "false",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub static KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "return" => Keyword::Return,
    "let" => Keyword::Let,
    "if" => Keyword::If,
    "while" => Keyword::While,
    "true" => Keyword::True,
    "false" => Keyword::False,
};

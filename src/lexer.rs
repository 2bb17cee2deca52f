use std::iter::Peekable;

use crate::{
    arena::{self, Arena},
    ast::BinaryOperator,
    token::{Located, Location, Token, TokenKind, KEYWORDS},
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// Lexing is fail-fast: on the first error the buffer is cleared and the
/// error is returned.
pub fn lex<'a>(
    src: &str,
    arena: &'a Arena,
    tokens: &mut Vec<Token<'a>>,
) -> Result<(), Located<Error>> {
    assert_eq!(tokens.len(), 0, "must pass clean tokens buffer");
    let result = Lexer::new(src, arena, tokens).lex();
    if result.is_err() {
        tokens.clear();
    }
    result
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new<'a>(src: &str, arena: &'a Arena) -> Result<Vec<Token<'a>>, Located<Error>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, arena, &mut tokens)?;
    Ok(tokens)
}

struct Lexer<'src, 'a, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    /// Byte offset of the next character.
    cursor: usize,
    /// Location of the next character.
    loc: Location,
    /// Byte offset and location where the current token starts.
    mark: (usize, Location),
    arena: &'a Arena,
    tokens: &'tok mut Vec<Token<'a>>,
}

impl<'a> Lexer<'_, 'a, '_> {
    /// Scans the source string until the input is exhausted or an error is
    /// found.
    fn lex(mut self) -> Result<(), Located<Error>> {
        loop {
            self.skip_trivia();
            if self.is_finished() {
                return Ok(());
            }
            self.tokenize_one()?;
        }
    }

    /// Scans a single token starting at the current character.
    fn tokenize_one(&mut self) -> Result<(), Located<Error>> {
        use TokenKind::*;
        let kind = match self.mark_advance() {
            c if c.is_ascii_digit() => self.number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword()?,
            ';' => Semicolon,
            ':' => Colon,
            '=' => Equal,
            '(' => OpenParen,
            ')' => CloseParen,
            '{' => OpenCurly,
            '}' => CloseCurly,
            c => match BinaryOperator::from_char(c) {
                Some(op) => Operator(op),
                None => return Err(self.error(Error::UnexpectedCharacter(c))),
            },
        };
        self.produce(kind);
        Ok(())
    }

    fn number(&mut self) -> Result<TokenKind<'static>, Located<Error>> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek().is_ascii_alphabetic() {
            // Reported where the letters begin.
            return Err(self.loc.wrap(Error::UnexpectedLetterNearNumber));
        }
        self.substr()
            .parse()
            .map(TokenKind::Number)
            .map_err(|_| self.error(Error::NumberOutOfRange))
    }

    fn identifier_or_keyword(&mut self) -> Result<TokenKind<'a>, Located<Error>> {
        while matches!(self.peek(), c if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let substr = self.substr();
        if let Some(&keyword) = KEYWORDS.get(substr) {
            return Ok(TokenKind::Keyword(keyword));
        }
        let name = self
            .arena
            .alloc_str(substr)
            .map_err(|e| self.error(e.into()))?;
        Ok(TokenKind::Ident(name))
    }

    /// Skips whitespace and `#` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                c if c.is_ascii_whitespace() => {
                    self.advance();
                }
                '#' => {
                    while !self.is_finished() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }
}

impl<'src, 'a, 'tok> Lexer<'src, 'a, 'tok> {
    /// Constructs a new lexer with the default state.
    fn new(src: &'src str, arena: &'a Arena, tokens: &'tok mut Vec<Token<'a>>) -> Self {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            loc: Location::START,
            mark: (0, Location::START),
            arena,
            tokens,
        }
    }

    fn is_finished(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.mark = (self.cursor, self.loc);
        self.advance()
    }

    /// Returns the next character and advances the iterator, keeping track of
    /// the current location.
    fn advance(&mut self) -> char {
        let Some(c) = self.iter.next() else {
            return '\0';
        };
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.loc.row += 1;
            self.loc.col = 1;
        } else {
            self.loc.col += 1;
        }
        c
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &'src str {
        &self.src[self.mark.0..self.cursor]
    }

    /// Wraps the error with the location of the current mark.
    fn error(&self, error: Error) -> Located<Error> {
        self.mark.1.wrap(error)
    }

    /// Produces a token using the marked location.
    fn produce(&mut self, kind: TokenKind<'a>) {
        self.tokens.push(Token::new(kind, self.mark.1));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected letter near number literal")]
    UnexpectedLetterNearNumber,
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("number literal does not fit in 64 bits")]
    NumberOutOfRange,
    #[error(transparent)]
    Arena(#[from] arena::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Keyword as Kw;
    use pretty_assertions::assert_eq;

    #[test]
    fn tests_with_location() {
        use BinaryOperator::*;
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/<>" => [
                (Operator(Add), (1, 1)),
                (Operator(Sub), (1, 2)),
                (Operator(Mul), (1, 3)),
                (Operator(Div), (1, 4)),
                (Operator(Lt), (1, 5)),
                (Operator(Gt), (1, 6)),
            ],
            "12\nab" => [
                (Number(12), (1, 1)),
                (Ident("ab"), (2, 1)),
            ],
            "return let if while true false" => [
                (Keyword(Kw::Return), (1, 1)),
                (Keyword(Kw::Let), (1, 8)),
                (Keyword(Kw::If), (1, 12)),
                (Keyword(Kw::While), (1, 15)),
                (Keyword(Kw::True), (1, 21)),
                (Keyword(Kw::False), (1, 26)),
            ],
            "Return _x x_1 lets iff" => [
                (Ident("Return"), (1, 1)),
                (Ident("_x"), (1, 8)),
                (Ident("x_1"), (1, 11)),
                (Ident("lets"), (1, 15)),
                (Ident("iff"), (1, 20)),
            ],
            "let x: i32 = 10;" => [
                (Keyword(Kw::Let), (1, 1)),
                (Ident("x"), (1, 5)),
                (Colon, (1, 6)),
                (Ident("i32"), (1, 8)),
                (Equal, (1, 12)),
                (Number(10), (1, 14)),
                (Semicolon, (1, 16)),
            ],
            "(){}" => [
                (OpenParen, (1, 1)),
                (CloseParen, (1, 2)),
                (OpenCurly, (1, 3)),
                (CloseCurly, (1, 4)),
            ],
            "1 # the rest is ignored ( $\n  2 #trailing" => [
                (Number(1), (1, 1)),
                (Number(2), (2, 3)),
            ],
            "0/007/18446744073709551615" => [
                (Number(0), (1, 1)),
                (Operator(Div), (1, 2)),
                (Number(7), (1, 3)),
                (Operator(Div), (1, 6)),
                (Number(u64::MAX), (1, 7)),
            ],
            "\n\n\t  x" => [(Ident("x"), (3, 4))],
            "# a \0 b\nreturn 1;" => [
                (Keyword(Kw::Return), (2, 1)),
                (Number(1), (2, 8)),
                (Semicolon, (2, 9)),
            ],
            "" => [],
            "  # only a comment" => [],
        });

        for (input, tokens) in cases {
            let arena = Arena::default();
            let lexed = lex_in_new(input, &arena).expect("failed to lex");
            assert_eq!(lexed, tokens.as_slice(), "input: {input:?}");
        }
    }

    #[test]
    fn tests_errors() {
        let cases: &[(&str, Error, (usize, usize))] = &[
            ("12ab", Error::UnexpectedLetterNearNumber, (1, 3)),
            ("let x = 1\n  + 2x", Error::UnexpectedLetterNearNumber, (2, 6)),
            ("let $", Error::UnexpectedCharacter('$'), (1, 5)),
            ("x\n\n  é", Error::UnexpectedCharacter('é'), (3, 3)),
            ("x != 1", Error::UnexpectedCharacter('!'), (1, 3)),
            ("x\0", Error::UnexpectedCharacter('\0'), (1, 2)),
            ("18446744073709551616", Error::NumberOutOfRange, (1, 1)),
        ];

        for (input, error, (row, col)) in cases {
            let arena = Arena::default();
            let result = lex_in_new(input, &arena);
            assert_eq!(
                result,
                Err(Location::new(*row, *col).wrap(error.clone())),
                "input: {input:?}"
            );
        }
    }

    #[test]
    fn failed_lex_leaves_no_tokens() {
        let arena = Arena::default();
        let mut tokens = Vec::new();
        assert!(lex("1 + 2 $", &arena, &mut tokens).is_err());
        assert!(tokens.is_empty());
    }

    #[test]
    fn identifiers_are_allocated_in_the_arena() {
        let arena = Arena::with_capacity(16);
        let tokens = lex_in_new("abc let def", &arena).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(arena.used(), 16);

        let arena = Arena::with_capacity(8);
        let result = lex_in_new("short  exhausting_identifier", &arena);
        assert_eq!(
            result,
            Err(Location::new(1, 8).wrap(Error::Arena(arena::Error::Exhausted {
                requested: 21,
                capacity: 8,
            })))
        );
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, ($row:expr, $col:expr))),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Location::new($row, $col))),*
                ],
            )),*]
        }};
    }
    use cases;
}

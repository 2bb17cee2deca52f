use crate::{
    arena::{self, Arena},
    ast::{Expr, ExprKind, Ident, Program, Statement, StatementKind},
    token::{Keyword, Located, Location, Token, TokenKind},
};

type Result<T, E = Located<Error>> = std::result::Result<T, E>;

/// Maximum nesting of blocks and parentheses, and maximum height of an
/// expression tree. Later stages recurse over the AST, so this also bounds
/// their stack usage.
pub const MAX_NESTING: usize = 256;

/// Parses a whole program. Parsing is fail-fast: the first syntax error aborts
/// the parse, there is no resynchronization.
pub fn parse_program<'a>(tokens: &[Token<'a>], arena: &'a Arena) -> Result<Program<'a>> {
    Parser::new(tokens, arena).parse_program()
}

/// Parses a single expression spanning all of the provided tokens.
pub fn parse_expr<'a>(tokens: &[Token<'a>], arena: &'a Arena) -> Result<&'a Expr<'a>> {
    let mut p = Parser::new(tokens, arena);
    let expr = p.parse_expr(0)?;
    match p.peek() {
        Some(token) => Err(token.loc.wrap(Error::Unexpected {
            expected: "end of input",
            found: token.kind.to_string(),
        })),
        None => Ok(expr),
    }
}

struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    /// Blocks and parentheses currently open.
    depth: usize,
    arena: &'a Arena,
}

impl<'a> Parser<'_, 'a> {
    fn parse_program(&mut self) -> Result<Program<'a>> {
        let mut statements = Vec::with_capacity(16);
        while !self.is_finished() {
            statements.push(self.parse_statement()?);
        }
        let statements = self.alloc_slice(&statements)?;
        Ok(Program { statements })
    }

    /// Dispatches on the leading token of the statement.
    fn parse_statement(&mut self) -> Result<Statement<'a>> {
        let token = self.next_or_eof("statement")?;
        let kind = match token.kind {
            TokenKind::Keyword(Keyword::Return) => {
                let value = self.parse_expr(0)?;
                self.consume(TokenKind::Semicolon, "`;` after return value")?;
                StatementKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Let) => {
                let name = self.parse_ident("variable name after `let`")?;
                self.consume(TokenKind::Colon, "`:` after variable name")?;
                let ty = self.parse_ident("type name after `:`")?;
                self.consume(TokenKind::Equal, "`=` after variable type")?;
                let value = self.parse_expr(0)?;
                self.consume(TokenKind::Semicolon, "`;` after variable definition")?;
                StatementKind::VariableDefine { name, ty, value }
            }
            TokenKind::Keyword(Keyword::If) => {
                let cond = self.parse_expr(0)?;
                let body = self.parse_block("`{` after if condition")?;
                StatementKind::If { cond, body }
            }
            TokenKind::Keyword(Keyword::While) => {
                let cond = self.parse_expr(0)?;
                let body = self.parse_block("`{` after while condition")?;
                StatementKind::While { cond, body }
            }
            TokenKind::Ident(name) => {
                let name = Ident {
                    name,
                    loc: token.loc,
                };
                self.consume(TokenKind::Equal, "`=` after variable name")?;
                let value = self.parse_expr(0)?;
                self.consume(TokenKind::Semicolon, "`;` after assigned value")?;
                StatementKind::SetVariable { name, value }
            }
            other => {
                let error = Error::UnexpectedStatement {
                    found: other.to_string(),
                };
                return Err(token.loc.wrap(error));
            }
        };
        Ok(Statement {
            kind,
            loc: token.loc,
        })
    }

    /// Parses `{ statement* }`.
    fn parse_block(&mut self, opening: &'static str) -> Result<&'a [Statement<'a>]> {
        let open = self.consume(TokenKind::OpenCurly, opening)?;
        self.nested(open.loc, |p| {
            let mut body = Vec::new();
            loop {
                match p.peek() {
                    Some(Token {
                        kind: TokenKind::CloseCurly,
                        ..
                    }) => break,
                    Some(_) => body.push(p.parse_statement()?),
                    None => return Err(p.eof("`}` to close block")),
                }
            }
            p.next();
            p.alloc_slice(&body)
        })
    }

    fn parse_ident(&mut self, expected: &'static str) -> Result<Ident<'a>> {
        let token = self.next_or_eof(expected)?;
        match token.kind {
            TokenKind::Ident(name) => Ok(Ident {
                name,
                loc: token.loc,
            }),
            other => Err(token.loc.wrap(Error::Unexpected {
                expected,
                found: other.to_string(),
            })),
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<&'a Expr<'a>> {
        self.parse_binary(min_prec).map(|(expr, _)| expr)
    }

    /// Precedence climbing. Operators binding at least as tight as `min_prec`
    /// are folded into the left operand; the right operand is parsed one
    /// level tighter, which makes every operator left-associative.
    ///
    /// Returns the expression along with the height of its tree.
    fn parse_binary(&mut self, min_prec: u8) -> Result<(&'a Expr<'a>, usize)> {
        let (mut lhs, mut height) = self.parse_primary()?;

        while let Some(Token {
            kind: TokenKind::Operator(op),
            loc,
        }) = self.peek()
        {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.next();
            let (rhs, rhs_height) = self.parse_binary(prec + 1)?;
            height = height.max(rhs_height) + 1;
            if height > MAX_NESTING {
                return Err(loc.wrap(Error::NestingTooDeep { limit: MAX_NESTING }));
            }
            lhs = self.alloc(Expr {
                kind: ExprKind::Binary { op, lhs, rhs },
                loc,
            })?;
        }

        Ok((lhs, height))
    }

    fn parse_primary(&mut self) -> Result<(&'a Expr<'a>, usize)> {
        let token = self.next_or_eof("expression")?;
        let kind = match token.kind {
            TokenKind::Number(n) => ExprKind::Number(n),
            TokenKind::Ident(name) => ExprKind::Variable(name),
            TokenKind::Keyword(Keyword::True) => ExprKind::Bool(true),
            TokenKind::Keyword(Keyword::False) => ExprKind::Bool(false),
            TokenKind::OpenParen => {
                return self.nested(token.loc, |p| {
                    let inner = p.parse_binary(0)?;
                    p.consume(TokenKind::CloseParen, "`)` to close parenthesized expression")?;
                    Ok(inner)
                });
            }
            other => {
                let error = Error::UnexpectedInExpr {
                    found: other.to_string(),
                };
                return Err(token.loc.wrap(error));
            }
        };
        let expr = self.alloc(Expr {
            kind,
            loc: token.loc,
        })?;
        Ok((expr, 1))
    }
}

// Utility functions.
impl<'t, 'a> Parser<'t, 'a> {
    fn new(tokens: &'t [Token<'a>], arena: &'a Arena) -> Parser<'t, 'a> {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            arena,
        }
    }

    /// Runs `f` one nesting level deeper; `open` locates the opening token.
    fn nested<T>(&mut self, open: Location, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth == MAX_NESTING {
            return Err(open.wrap(Error::NestingTooDeep { limit: MAX_NESTING }));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn is_finished(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Returns the current token without advancing.
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    /// Returns the current token and advances.
    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn next_or_eof(&mut self, expected: &'static str) -> Result<Token<'a>> {
        self.next().ok_or_else(|| self.eof(expected))
    }

    /// Consumes a token of the provided kind or fails.
    fn consume(&mut self, expect: TokenKind<'_>, expected: &'static str) -> Result<Token<'a>> {
        let token = self.next_or_eof(expected)?;
        if token.kind == expect {
            Ok(token)
        } else {
            Err(token.loc.wrap(Error::Unexpected {
                expected,
                found: token.kind.to_string(),
            }))
        }
    }

    /// End of input errors are reported at the last token.
    fn eof(&self, expected: &'static str) -> Located<Error> {
        self.last_loc().wrap(Error::UnexpectedEof { expected })
    }

    fn last_loc(&self) -> Location {
        let idx = self.pos.min(self.tokens.len()).saturating_sub(1);
        self.tokens
            .get(idx)
            .map_or(Location::START, |token| token.loc)
    }

    fn alloc<T: Copy>(&self, value: T) -> Result<&'a T> {
        self.arena
            .alloc(value)
            .map_err(|e| self.last_loc().wrap(e.into()))
    }

    fn alloc_slice<T: Copy>(&self, items: &[T]) -> Result<&'a [T]> {
        self.arena
            .alloc_slice(items)
            .map_err(|e| self.last_loc().wrap(e.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("expected {expected}, but got {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("unexpected {found} in expression")]
    UnexpectedInExpr { found: String },
    #[error("unexpected {found} at start of statement")]
    UnexpectedStatement { found: String },
    #[error("nesting is deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
    #[error(transparent)]
    Arena(#[from] arena::Error),
}

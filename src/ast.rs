// program   ::= statement*
// statement ::= return expr ';'
//             | let ID ':' ID '=' expr ';'
//             | ID '=' expr ';'
//             | if expr '{' statement* '}'
//             | while expr '{' statement* '}'
// expr      ::= primary (OP expr)*
// primary   ::= NUMBER | ID | '(' expr ')' | true | false

// Precedence
//
// * /
// + -
// > <

use std::fmt;

use crate::token::Location;

/// A parsed program: the statements of the single implicit entry function.
///
/// Every node borrows from the compilation arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Program<'a> {
    pub statements: &'a [Statement<'a>],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Statement<'a> {
    pub kind: StatementKind<'a>,
    /// Location of the statement's leading token.
    pub loc: Location,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatementKind<'a> {
    Return(&'a Expr<'a>),
    VariableDefine {
        name: Ident<'a>,
        /// The annotation text as written; validated by the type checker.
        ty: Ident<'a>,
        value: &'a Expr<'a>,
    },
    SetVariable {
        name: Ident<'a>,
        value: &'a Expr<'a>,
    },
    If {
        cond: &'a Expr<'a>,
        body: &'a [Statement<'a>],
    },
    While {
        cond: &'a Expr<'a>,
        body: &'a [Statement<'a>],
    },
    /// Marks a statement that failed to parse. Never produced by a
    /// successful parse.
    Error,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Expr<'a> {
    pub kind: ExprKind<'a>,
    /// For binary expressions, the location of the operator.
    pub loc: Location,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExprKind<'a> {
    Number(u64),
    Bool(bool),
    Variable(&'a str),
    Binary {
        op: BinaryOperator,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
}

impl BinaryOperator {
    pub const fn from_char(c: char) -> Option<BinaryOperator> {
        let op = match c {
            '+' => BinaryOperator::Add,
            '-' => BinaryOperator::Sub,
            '*' => BinaryOperator::Mul,
            '/' => BinaryOperator::Div,
            '>' => BinaryOperator::Gt,
            '<' => BinaryOperator::Lt,
            _ => return None,
        };
        Some(op)
    }

    pub const fn as_char(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Sub => '-',
            BinaryOperator::Mul => '*',
            BinaryOperator::Div => '/',
            BinaryOperator::Gt => '>',
            BinaryOperator::Lt => '<',
        }
    }

    /// Higher binds tighter.
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Gt | BinaryOperator::Lt => 1,
            BinaryOperator::Add | BinaryOperator::Sub => 2,
            BinaryOperator::Mul | BinaryOperator::Div => 3,
        }
    }

    pub const fn is_comparison(self) -> bool {
        matches!(self, BinaryOperator::Gt | BinaryOperator::Lt)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ident<'a> {
    pub name: &'a str,
    pub loc: Location,
}

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

use std::{fmt, mem};

use crate::{
    ast::{BinaryOperator, Expr, ExprKind, Program, Statement, StatementKind},
    token::{Located, Location},
};

/// Checks the whole program, collecting every type error found.
pub fn check(program: &Program<'_>) -> Result<(), Vec<Located<Error>>> {
    Checker::with_capacity(16).check(program)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
}

impl Type {
    /// Resolves a type annotation as written in the source.
    pub fn from_annotation(text: &str) -> Option<Type> {
        match text {
            "i32" => Some(Type::Int),
            "bool" => Some(Type::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("i32"),
            Type::Bool => f.write_str("bool"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Variable<'a> {
    pub name: &'a str,
    pub ty: Type,
}

/// The type checker.
///
/// The scope is a flat, append-only list searched front to back, so the
/// *first* definition of a name wins. Nested `if`/`while` bodies share the
/// enclosing scope: a `let` inside a body stays visible after the body
/// closes. Only a whole unit (the implicit entry function) gets a fresh list,
/// which is restored once the unit has been checked.
///
/// Errors do not stop the walk; every statement is visited and all errors are
/// reported together.
pub struct Checker<'a> {
    vars: Vec<Variable<'a>>,
    errors: Vec<Located<Error>>,
}

impl<'a> Checker<'a> {
    pub fn with_capacity(capacity: usize) -> Checker<'a> {
        Checker {
            vars: Vec::with_capacity(capacity),
            errors: Vec::with_capacity(8),
        }
    }

    pub fn check(mut self, program: &Program<'a>) -> Result<(), Vec<Located<Error>>> {
        self.check_unit(program.statements);
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn check_unit(&mut self, body: &[Statement<'a>]) {
        let saved = mem::take(&mut self.vars);
        for statement in body {
            self.check_statement(statement);
        }
        self.vars = saved;
    }

    fn check_statement(&mut self, statement: &Statement<'a>) {
        match statement.kind {
            StatementKind::VariableDefine { name, ty, value } => {
                let inferred = self.check_expr(value);
                let Some(declared) = Type::from_annotation(ty.name) else {
                    self.error(ty.loc, Error::UnknownType(ty.name.into()));
                    return;
                };
                match inferred {
                    Some(inferred) if inferred != declared => {
                        let error = Error::Mismatch {
                            expected: declared,
                            actual: inferred,
                        };
                        self.error(value.loc, error);
                    }
                    _ => {}
                }
                // Later uses see the declared type even if the initializer
                // was wrong, so one bad definition doesn't cascade.
                self.vars.push(Variable {
                    name: name.name,
                    ty: declared,
                });
            }
            StatementKind::SetVariable { name, value } => {
                let actual = self.check_expr(value);
                let Some(expected) = self.lookup(name.name) else {
                    self.error(name.loc, Error::UndefinedVariable(name.name.into()));
                    return;
                };
                match actual {
                    Some(actual) if actual != expected => {
                        self.error(value.loc, Error::Mismatch { expected, actual });
                    }
                    _ => {}
                }
            }
            StatementKind::If { cond, body } | StatementKind::While { cond, body } => {
                self.check_condition(cond);
                for statement in body {
                    self.check_statement(statement);
                }
            }
            // There is a single implicit function, so there is no return type
            // to check against.
            StatementKind::Return(value) => {
                self.check_expr(value);
            }
            StatementKind::Error => {}
        }
    }

    fn check_condition(&mut self, cond: &Expr<'a>) {
        match self.check_expr(cond) {
            Some(Type::Bool) | None => {}
            Some(other) => self.error(cond.loc, Error::NonBooleanCondition(other)),
        }
    }

    /// Infers the type of the expression. `None` means an error was already
    /// reported for it.
    fn check_expr(&mut self, expr: &Expr<'a>) -> Option<Type> {
        match expr.kind {
            ExprKind::Number(_) => Some(Type::Int),
            ExprKind::Bool(_) => Some(Type::Bool),
            ExprKind::Variable(name) => {
                let ty = self.lookup(name);
                if ty.is_none() {
                    self.error(expr.loc, Error::UndefinedVariable(name.into()));
                }
                ty
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_expr(lhs);
                let rhs = self.check_expr(rhs);
                let (lhs, rhs) = (lhs?, rhs?);
                if lhs != rhs {
                    self.error(expr.loc, Error::OperandMismatch { op, lhs, rhs });
                    return None;
                }
                if op.is_comparison() {
                    Some(Type::Bool)
                } else {
                    Some(Type::Int)
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Type> {
        self.vars.iter().find(|var| var.name == name).map(|var| var.ty)
    }

    fn error(&mut self, loc: Location, error: Error) {
        self.errors.push(loc.wrap(error));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected type {expected}, but got {actual}")]
    Mismatch { expected: Type, actual: Type },
    #[error("mismatched operand types for `{op}`: {lhs} and {rhs}")]
    OperandMismatch {
        op: BinaryOperator,
        lhs: Type,
        rhs: Type,
    },
    #[error("condition must be of type bool, but got {0}")]
    NonBooleanCondition(Type),
    #[error("{0} is not defined")]
    UndefinedVariable(String),
    #[error("unknown type {0}")]
    UnknownType(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arena::Arena, lexer, parser, util::test_utils::tree_tests};
    use pretty_assertions::assert_eq;

    #[test]
    fn variable_resolves_to_declared_type() {
        let arena = Arena::default();
        let tokens = lexer::lex_in_new("let x: i32 = 1 + 2; let b: bool = x > 1;", &arena).unwrap();
        let program = parser::parse_program(&tokens, &arena).unwrap();

        let mut checker = Checker::with_capacity(4);
        for statement in program.statements {
            checker.check_statement(statement);
        }
        assert!(checker.errors.is_empty());
        assert_eq!(checker.lookup("x"), Some(Type::Int));
        assert_eq!(checker.lookup("b"), Some(Type::Bool));
        assert_eq!(checker.lookup("y"), None);
    }

    #[test]
    fn unit_scope_is_restored() {
        let arena = Arena::default();
        let tokens = lexer::lex_in_new("let x: i32 = 1;", &arena).unwrap();
        let program = parser::parse_program(&tokens, &arena).unwrap();

        let mut checker = Checker::with_capacity(4);
        checker.vars.push(Variable {
            name: "outer",
            ty: Type::Bool,
        });
        checker.check_unit(program.statements);
        assert_eq!(
            checker.vars,
            [Variable {
                name: "outer",
                ty: Type::Bool
            }]
        );
    }

    #[test]
    fn error_statements_are_ignored() {
        let program = Program {
            statements: &[Statement {
                kind: StatementKind::Error,
                loc: Location::START,
            }],
        };
        assert_eq!(check(&program), Ok(()));
    }

    tree_tests! {
        use checker;

        fn test_accepts_arithmetic_definition() {
            let program = "let x: i32 = 1 + 2; return x;";
            let tree_ok = "
                let x: i32 (1:1)
                  binary + (1:16)
                    number 1 (1:14)
                    number 2 (1:18)
                return (1:21)
                  variable x (1:28)
            ";
        }

        fn test_accepts_comparisons_of_any_matching_type() {
            let program = "let b: bool = 1 < 2; let c: bool = true > false; return 0;";
            let expected_errors = &[];
        }

        fn test_accepts_loop_with_boolean_condition() {
            let program = "
                let i: i32 = 0;
                while i < 10 {
                    i = i + 1;
                }
                return i;
            ";
            let expected_errors = &[];
        }

        fn test_rejects_declared_type_mismatch() {
            let program = "let x: bool = 1;";
            let expected_errors = &["1:15: expected type bool, but got i32"];
        }

        fn test_rejects_assignment_type_mismatch() {
            let program = "let x: i32 = 1; let y: bool = true; x = y;";
            let expected_errors = &["1:41: expected type i32, but got bool"];
        }

        fn test_rejects_unknown_type_annotation() {
            let program = "let x: u8 = 1;";
            let expected_errors = &["1:8: unknown type u8"];
        }

        fn test_rejects_operand_mismatch() {
            let program = "let x: i32 = 1 + true;";
            let expected_errors = &["1:16: mismatched operand types for `+`: i32 and bool"];
        }

        fn test_rejects_non_boolean_if_condition() {
            let program = "if 1 { }";
            let expected_errors = &["1:4: condition must be of type bool, but got i32"];
        }

        fn test_rejects_non_boolean_while_condition() {
            let program = "while 1 + 1 { }";
            let expected_errors = &["1:9: condition must be of type bool, but got i32"];
        }

        fn test_rejects_undefined_variables() {
            let program = "return y;\nz = 1;";
            let expected_errors = &[
                "1:8: y is not defined",
                "2:1: z is not defined",
            ];
        }

        fn test_accumulates_errors_in_order() {
            let program = "
                let a: bool = 1;
                if 1 { y = 2; }
                let b: i32 = true < 1;
            ";
            let expected_errors = &[
                "2:31: expected type bool, but got i32",
                "3:20: condition must be of type bool, but got i32",
                "3:24: y is not defined",
                "4:35: mismatched operand types for `<`: bool and i32",
            ];
        }

        fn test_bad_initializer_does_not_cascade() {
            let program = "let x: i32 = y; x = 1; return x;";
            let expected_errors = &["1:14: y is not defined"];
        }

        fn test_definition_inside_block_leaks_into_enclosing_scope() {
            let program = "if true { let x: i32 = 1; } x = 2; return x;";
            let expected_errors = &[];
        }

        fn test_first_definition_wins_when_shadowed() {
            let program = "let x: i32 = 1; let x: bool = true; x = false;";
            let expected_errors = &["1:41: expected type i32, but got bool"];
        }
    }
}

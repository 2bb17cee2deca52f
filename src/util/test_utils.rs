use crate::{
    arena::Arena,
    ast::{Expr, Program},
    codegen, ir, lexer, parser, type_checker,
    util::fmt::tree,
    Options,
};

pub fn format_errors<E: std::fmt::Display>(errors: &[E]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}

/// Each variant contains the input.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
    CheckerProgram(&'static str),
    CodegenProgram(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Runs the input through the stages the test kind covers, returning the
/// printed output (AST tree or IR text) and the formatted errors.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let arena = Arena::default();

    match test {
        Test::ParserProgram(input) => match parse_program(input, &arena) {
            Ok(program) => (tree::print_program_string(&program), vec![]),
            Err(errors) => (String::new(), errors),
        },
        Test::ParserExpr(input) => match parse_expr(input, &arena) {
            Ok(expr) => (tree::print_expr_string(expr), vec![]),
            Err(errors) => (String::new(), errors),
        },
        Test::CheckerProgram(input) => match parse_program(input, &arena) {
            Ok(program) => {
                let tree = tree::print_program_string(&program);
                match type_checker::check(&program) {
                    Ok(()) => (tree, vec![]),
                    Err(errors) => (tree, format_errors(&errors)),
                }
            }
            Err(errors) => (String::new(), errors),
        },
        Test::CodegenProgram(input) => {
            let program = match parse_program(input, &arena) {
                Ok(program) => program,
                Err(errors) => return (String::new(), errors),
            };
            if let Err(errors) = type_checker::check(&program) {
                return (String::new(), format_errors(&errors));
            }
            match codegen::lower_program(&program, &arena, &Options::default()) {
                Ok((module, warnings)) => {
                    (ir::write::write_module_string(&module), format_errors(&warnings))
                }
                Err(error) => (String::new(), vec![error.to_string()]),
            }
        }
    }
}

fn parse_program<'a>(input: &str, arena: &'a Arena) -> Result<Program<'a>, Vec<String>> {
    let tokens = lexer::lex_in_new(input, arena).map_err(|e| vec![e.to_string()])?;
    parser::parse_program(&tokens, arena).map_err(|e| vec![e.to_string()])
}

fn parse_expr<'a>(input: &str, arena: &'a Arena) -> Result<&'a Expr<'a>, Vec<String>> {
    let tokens = lexer::lex_in_new(input, arena).map_err(|e| vec![e.to_string()])?;
    parser::parse_expr(&tokens, arena).map_err(|e| vec![e.to_string()])
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, ir_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(checker, program), $source:expr) => {
        crate::util::test_utils::Test::CheckerProgram($source)
    };
    (@@get_test(codegen, program), $source:expr) => {
        crate::util::test_utils::Test::CodegenProgram($source)
    };
}
pub(crate) use tree_tests;

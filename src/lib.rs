use std::fmt::Write as _;

use crate::{
    arena::Arena,
    token::Located,
    util::fmt::{
        diagnostic::{self, Severity},
        tree,
    },
};

/// Fixed-capacity storage for everything one compilation allocates.
pub mod arena;

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The type checker walks the AST, checking the soundness of its types.
pub mod type_checker;

/// The code generator lowers a checked AST into the IR.
pub mod codegen;

pub mod ast;
pub mod ir;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

/// A source file to compile.
#[derive(Copy, Clone, Debug)]
pub struct Source<'s> {
    /// Name used in diagnostics, usually the path.
    pub name: &'s str,
    pub text: &'s str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Hard ceiling, in bytes, for the compilation arena.
    pub arena_capacity: usize,
    pub function_name: String,
    pub entry_block: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            arena_capacity: arena::DEFAULT_CAPACITY,
            function_name: "main".into(),
            entry_block: "start".into(),
        }
    }
}

#[derive(Debug)]
pub struct Compiled {
    /// The module in QBE textual form.
    pub ir: String,
    pub warnings: Vec<Located<codegen::Warning>>,
    pub stats: Stats,
}

/// Sizes observed along the pipeline.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub tokens: usize,
    pub statements: usize,
    pub arena_used: usize,
}

/// Compiles the source into IR text.
///
/// Stages run one after the other, each to completion. Lexing and parsing stop
/// at the first error; type checking reports every error it finds. Nothing
/// allocated in the arena escapes this call.
pub fn compile(source: &Source<'_>, options: &Options) -> Result<Compiled, CompileError> {
    let arena = Arena::try_with_capacity(options.arena_capacity)?;
    let tokens = lexer::lex_in_new(source.text, &arena)?;
    let program = parser::parse_program(&tokens, &arena)?;
    type_checker::check(&program).map_err(CompileError::Type)?;
    let (module, warnings) = codegen::lower_program(&program, &arena, options)?;

    Ok(Compiled {
        ir: ir::write::write_module_string(&module),
        warnings,
        stats: Stats {
            tokens: tokens.len(),
            statements: program.statements.len(),
            arena_used: arena.used(),
        },
    })
}

/// Lexes the source, listing one token per line with its location.
pub fn dump_tokens(source: &Source<'_>, options: &Options) -> Result<String, CompileError> {
    let arena = Arena::try_with_capacity(options.arena_capacity)?;
    let tokens = lexer::lex_in_new(source.text, &arena)?;
    let mut out = String::with_capacity(tokens.len() * 16);
    for token in &tokens {
        writeln!(out, "{} {}", token.loc, token.kind).expect("writing to a String never fails");
    }
    Ok(out)
}

/// Parses the source, printing the AST as an indented tree.
pub fn dump_ast(source: &Source<'_>, options: &Options) -> Result<String, CompileError> {
    let arena = Arena::try_with_capacity(options.arena_capacity)?;
    let tokens = lexer::lex_in_new(source.text, &arena)?;
    let program = parser::parse_program(&tokens, &arena)?;
    Ok(tree::print_program_string(&program))
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    Arena(#[from] arena::Error),
    #[error("{0}")]
    Lex(#[from] Located<lexer::Error>),
    #[error("{0}")]
    Parse(#[from] Located<parser::Error>),
    #[error("type checking failed with {} error(s)", .0.len())]
    Type(Vec<Located<type_checker::Error>>),
    #[error("{0}")]
    Codegen(#[from] codegen::Error),
}

impl CompileError {
    /// Renders every diagnostic carried by the error against its source.
    pub fn render(&self, source: &Source<'_>) -> String {
        let mut buf = Vec::with_capacity(512);
        self.write(&mut buf, source).expect("writing to a Vec never fails");
        String::from_utf8(buf).expect("diagnostic output is valid UTF-8")
    }

    fn write(&self, w: &mut Vec<u8>, source: &Source<'_>) -> std::io::Result<()> {
        let Source { name, text } = *source;
        match self {
            CompileError::Arena(e) => diagnostic::render(w, Severity::Error, name, text, None, e),
            CompileError::Lex(e) => diagnostic::render_located(w, Severity::Error, name, text, e),
            CompileError::Parse(e) => diagnostic::render_located(w, Severity::Error, name, text, e),
            CompileError::Type(errors) => errors
                .iter()
                .try_for_each(|e| diagnostic::render_located(w, Severity::Error, name, text, e)),
            CompileError::Codegen(e) => {
                diagnostic::render(w, Severity::Error, name, text, e.loc(), e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn source(text: &str) -> Source<'_> {
        Source {
            name: "test.nsl",
            text,
        }
    }

    #[test]
    fn compiles_to_ir() {
        let compiled = compile(&source("let x: i32 = 6; return x / 2;"), &Options::default()).unwrap();
        assert_eq!(
            compiled.ir,
            indoc! {"
                export function w $main() {
                @start
                \t%t0 =l alloc8 1
                \tstorew 6, %t0
                \t%t1 =w loadw %t0
                \t%t2 =w div %t1, 2
                \tret %t2
                }
            "}
        );
        assert!(compiled.warnings.is_empty());
        assert_eq!(compiled.stats.tokens, 12);
        assert_eq!(compiled.stats.statements, 2);
        assert!(compiled.stats.arena_used > 0);
    }

    #[test]
    fn renders_lex_errors() {
        let src = source("let x: i32 = 1;\nx = 2 $ 3;");
        let error = compile(&src, &Options::default()).unwrap_err();
        assert_eq!(error.to_string(), "2:7: unexpected character '$'");
        assert_eq!(
            error.render(&src),
            indoc! {"
                error: unexpected character '$'
                  --> test.nsl:2:7
                    |
                  2 | x = 2 $ 3;
                    |       ^
            "}
        );
    }

    #[test]
    fn renders_parse_errors() {
        let src = source("return (1;");
        let error = compile(&src, &Options::default()).unwrap_err();
        assert_eq!(
            error.render(&src),
            indoc! {"
                error: expected `)` to close parenthesized expression, but got `;`
                  --> test.nsl:1:10
                    |
                  1 | return (1;
                    |          ^
            "}
        );
    }

    #[test]
    fn renders_every_type_error() {
        let src = source("let a: bool = 1;\nb = 2;");
        let error = compile(&src, &Options::default()).unwrap_err();
        assert_eq!(error.to_string(), "type checking failed with 2 error(s)");
        assert_eq!(
            error.render(&src),
            indoc! {"
                error: expected type bool, but got i32
                  --> test.nsl:1:15
                    |
                  1 | let a: bool = 1;
                    |               ^
                error: b is not defined
                  --> test.nsl:2:1
                    |
                  2 | b = 2;
                    | ^
            "}
        );
    }

    #[test]
    fn arena_capacity_is_enforced() {
        let options = Options {
            arena_capacity: 64,
            ..Options::default()
        };
        let error = compile(&source("let x: i32 = 1 + 2 + 3 + 4;"), &options).unwrap_err();
        assert!(
            matches!(error, CompileError::Parse(ref e) if matches!(e.inner, parser::Error::Arena(_))),
            "{error:?}"
        );
    }

    #[test]
    fn unreservable_arena_is_an_error() {
        let options = Options {
            arena_capacity: usize::MAX,
            ..Options::default()
        };
        let src = source("return 1;");
        let error = compile(&src, &options).unwrap_err();
        assert!(matches!(error, CompileError::Arena(arena::Error::Reserve { .. })), "{error:?}");
        assert_eq!(
            error.render(&src),
            format!("error: could not reserve a {} byte arena\n  --> test.nsl\n", usize::MAX)
        );
    }

    #[test]
    fn deep_nesting_is_a_diagnostic() {
        let text = format!("return {}1{};", "(".repeat(50_000), ")".repeat(50_000));
        let error = compile(&source(&text), &Options::default()).unwrap_err();
        assert_eq!(error.to_string(), "1:264: nesting is deeper than 256 levels");

        let nested = "if true {\n".repeat(300) + "return 1;\n" + &"}\n".repeat(300);
        let compiled = compile(&source(&nested), &Options::default());
        assert!(matches!(compiled, Err(CompileError::Parse(_))));

        let shallow = "while true {\n".repeat(200) + "return 1;\n" + &"}\n".repeat(200);
        assert!(compile(&source(&shallow), &Options::default()).is_ok());
    }

    #[test]
    fn independent_compiles_agree() {
        let src = source("let i: i32 = 0; while i < 3 { i = i + 1; } return i;");
        let first = compile(&src, &Options::default()).unwrap();
        let second = compile(&src, &Options::default()).unwrap();
        assert_eq!(first.ir, second.ir);
    }

    #[test]
    fn dumps_tokens_and_ast() {
        let src = source("return 1;");
        assert_eq!(
            dump_tokens(&src, &Options::default()).unwrap(),
            "1:1 keyword `return`\n1:8 number `1`\n1:9 `;`\n"
        );
        assert_eq!(
            dump_ast(&src, &Options::default()).unwrap(),
            "return (1:1)\n  number 1 (1:8)\n"
        );
    }
}

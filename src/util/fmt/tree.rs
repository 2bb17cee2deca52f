use std::io::Write;

use crate::ast::*;

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(program: &Program<'_>) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("tree output is valid UTF-8")
}

pub fn print_expr_string(expr: &Expr<'_>) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, 0, expr).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("tree output is valid UTF-8")
}

pub fn print_program(w: &mut impl Write, program: &Program<'_>) -> std::io::Result<()> {
    for statement in program.statements {
        print_statement(w, 0, statement)?;
    }
    Ok(())
}

fn print_statement(w: &mut impl Write, i: usize, statement: &Statement<'_>) -> std::io::Result<()> {
    sp(w, i)?;
    let loc = statement.loc;
    match &statement.kind {
        StatementKind::Return(value) => {
            writeln!(w, "return ({loc})")?;
            print_expr(w, i + 1, value)?;
        }
        StatementKind::VariableDefine { name, ty, value } => {
            writeln!(w, "let {name}: {ty} ({loc})")?;
            print_expr(w, i + 1, value)?;
        }
        StatementKind::SetVariable { name, value } => {
            writeln!(w, "set {name} ({loc})")?;
            print_expr(w, i + 1, value)?;
        }
        StatementKind::If { cond, body } => {
            writeln!(w, "if ({loc})")?;
            print_expr(w, i + 1, cond)?;
            print_body(w, i + 1, body)?;
        }
        StatementKind::While { cond, body } => {
            writeln!(w, "while ({loc})")?;
            print_expr(w, i + 1, cond)?;
            print_body(w, i + 1, body)?;
        }
        StatementKind::Error => {
            writeln!(w, "error ({loc})")?;
        }
    }
    Ok(())
}

fn print_body(w: &mut impl Write, i: usize, body: &[Statement<'_>]) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "body")?;
    for statement in body {
        print_statement(w, i + 1, statement)?;
    }
    Ok(())
}

pub fn print_expr(w: &mut impl Write, i: usize, expr: &Expr<'_>) -> std::io::Result<()> {
    sp(w, i)?;
    let loc = expr.loc;
    match &expr.kind {
        ExprKind::Number(n) => writeln!(w, "number {n} ({loc})")?,
        ExprKind::Bool(b) => writeln!(w, "bool {b} ({loc})")?,
        ExprKind::Variable(name) => writeln!(w, "variable {name} ({loc})")?,
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op} ({loc})")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

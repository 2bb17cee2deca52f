//! QBE textual form of the IR.

use std::io::{self, Write};

use crate::ir::{Block, Function, Instruction, Module, Statement};

pub fn write_module_string(module: &Module<'_>) -> String {
    let mut buf = Vec::with_capacity(4096);
    write_module(&mut buf, module).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("IR output is valid UTF-8")
}

pub fn write_module(w: &mut impl Write, module: &Module<'_>) -> io::Result<()> {
    for (i, function) in module.functions.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        write_function(w, function)?;
    }
    Ok(())
}

fn write_function(w: &mut impl Write, function: &Function<'_>) -> io::Result<()> {
    let Function {
        name, return_type, ..
    } = function;
    writeln!(w, "export function {return_type} ${name}() {{")?;
    for block in &function.blocks {
        write_block(w, block)?;
    }
    writeln!(w, "}}")
}

fn write_block(w: &mut impl Write, block: &Block<'_>) -> io::Result<()> {
    writeln!(w, "{}", block.name)?;
    for statement in &block.statements {
        write_statement(w, statement)?;
    }
    Ok(())
}

fn write_statement(w: &mut impl Write, statement: &Statement<'_>) -> io::Result<()> {
    match statement {
        Statement::Assign { dest, ty, instr } => {
            write!(w, "\t{dest} ={ty} ")?;
            write_instruction(w, instr)?;
        }
        Statement::Throwaway(instr) => {
            write!(w, "\t")?;
            write_instruction(w, instr)?;
        }
        Statement::Label(label) => write!(w, "{label}")?,
    }
    writeln!(w)
}

fn write_instruction(w: &mut impl Write, instr: &Instruction<'_>) -> io::Result<()> {
    match instr {
        Instruction::Return(value) => write!(w, "ret {value}"),
        Instruction::Add(lhs, rhs) => write!(w, "add {lhs}, {rhs}"),
        Instruction::Sub(lhs, rhs) => write!(w, "sub {lhs}, {rhs}"),
        Instruction::Mul(lhs, rhs) => write!(w, "mul {lhs}, {rhs}"),
        Instruction::Div(lhs, rhs) => write!(w, "div {lhs}, {rhs}"),
        Instruction::Alloc8(size) => write!(w, "alloc8 {size}"),
        Instruction::StoreW { value, slot } => write!(w, "storew {value}, {slot}"),
        Instruction::LoadW(slot) => write!(w, "loadw {slot}"),
        Instruction::Cmp { ty, op, lhs, rhs } => {
            write!(w, "c{}{ty} {lhs}, {rhs}", op.as_str())
        }
        Instruction::Jmp(label) => write!(w, "jmp {label}"),
        Instruction::Jnz {
            cond,
            then,
            otherwise,
        } => write!(w, "jnz {cond}, {then}, {otherwise}"),
    }
}

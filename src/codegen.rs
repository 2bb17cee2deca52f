use std::collections::HashMap;

use crate::{
    arena::{self, Arena},
    ast::{BinaryOperator, Expr, ExprKind, Program, Statement, StatementKind},
    ir::{BlockRef, Comparison, Instruction, Label, Module, Temp, Type, Value},
    token::{Located, Location},
    Options,
};

/// Lowers a checked program into a module with a single function.
///
/// Control flow is expressed with label markers and jumps inside the one
/// physical entry block; no further blocks are created. The function always
/// ends in a terminator: an implicit `ret 0` is appended when the last
/// statement falls through.
///
/// Returns the module together with the non-fatal warnings.
pub fn lower_program<'a>(
    program: &Program<'a>,
    arena: &'a Arena,
    options: &Options,
) -> Result<(Module<'a>, Vec<Located<Warning>>), Error> {
    let mut module = Module::new();
    let function = module.create_function(arena.alloc_str(&options.function_name)?, Type::Word);
    let entry = module.push_block(function, Label(arena.alloc_str(&options.entry_block)?));

    let mut codegen = Codegen {
        arena,
        module,
        entry,
        counter: 0,
        slots: HashMap::with_capacity(16),
        warnings: Vec::new(),
    };
    for statement in program.statements {
        codegen.lower_statement(statement)?;
    }
    if !codegen.module.block(entry).is_terminated() {
        codegen.module.push_instruction(entry, Instruction::Return(Value::Const(0)));
    }
    Ok((codegen.module, codegen.warnings))
}

/// One lowering session.
///
/// Temporaries and labels share the same counter, so their numbers interleave.
/// The counter is local to the session, which makes the output a pure
/// function of the input.
struct Codegen<'a> {
    arena: &'a Arena,
    module: Module<'a>,
    entry: BlockRef,
    counter: u64,
    /// Maps each source variable to the temporary holding its stack slot.
    slots: HashMap<&'a str, Temp<'a>>,
    warnings: Vec<Located<Warning>>,
}

impl<'a> Codegen<'a> {
    fn lower_statement(&mut self, statement: &Statement<'a>) -> Result<(), Error> {
        match statement.kind {
            StatementKind::Return(value) => {
                let value = self.lower_expr(value)?;
                self.push(Instruction::Return(value))?;
            }
            StatementKind::VariableDefine { name, value, .. } => {
                let slot = self.fresh_temp()?;
                self.assign_to(slot, Instruction::Alloc8(1), Type::Long)?;
                // The first definition of a name owns it, matching lookup in
                // the type checker.
                self.slots.entry(name.name).or_insert(slot);
                let value = self.lower_expr(value)?;
                self.push(Instruction::StoreW { value, slot })?;
            }
            StatementKind::SetVariable { name, value } => {
                let slot = self.slot(name.name, name.loc)?;
                let value = self.lower_expr(value)?;
                self.push(Instruction::StoreW { value, slot })?;
            }
            StatementKind::If { cond, body } => {
                let cond = self.lower_expr(cond)?;
                let then = self.fresh_label("then_")?;
                let otherwise = self.fresh_label("else_")?;
                let flag = self.fresh_temp()?;
                self.branch(flag, cond, then, otherwise)?;
                self.label(then);
                self.lower_body(body)?;
                self.label(otherwise);
            }
            StatementKind::While { cond, body } => {
                let header = self.fresh_label("header_")?;
                let body_label = self.fresh_label("body_")?;
                let out = self.fresh_label("out_")?;
                let flag = self.fresh_temp()?;
                self.label(header);
                let cond = self.lower_expr(cond)?;
                self.branch(flag, cond, body_label, out)?;
                self.label(body_label);
                self.lower_body(body)?;
                self.push(Instruction::Jmp(header))?;
                self.label(out);
            }
            StatementKind::Error => {
                let warning = statement.loc.wrap(Warning::SkippedErrorStatement);
                self.warnings.push(warning);
            }
        }
        Ok(())
    }

    fn lower_body(&mut self, body: &[Statement<'a>]) -> Result<(), Error> {
        body.iter().try_for_each(|statement| self.lower_statement(statement))
    }

    /// Tests `cond` against zero into `flag` and jumps accordingly.
    fn branch(
        &mut self,
        flag: Temp<'a>,
        cond: Value<'a>,
        then: Label<'a>,
        otherwise: Label<'a>,
    ) -> Result<(), Error> {
        let cmp = Instruction::Cmp {
            ty: Type::Word,
            op: Comparison::Ne,
            lhs: cond,
            rhs: Value::Const(0),
        };
        self.assign_to(flag, cmp, Type::Word)?;
        self.push(Instruction::Jnz {
            cond: flag.into(),
            then,
            otherwise,
        })
    }

    fn lower_expr(&mut self, expr: &Expr<'a>) -> Result<Value<'a>, Error> {
        match expr.kind {
            ExprKind::Number(n) => Ok(Value::Const(n)),
            ExprKind::Bool(b) => Ok(Value::Const(u64::from(b))),
            ExprKind::Variable(name) => {
                let slot = self.slot(name, expr.loc)?;
                self.assign(Instruction::LoadW(slot))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                let instr = match op {
                    BinaryOperator::Add => Instruction::Add(lhs, rhs),
                    BinaryOperator::Sub => Instruction::Sub(lhs, rhs),
                    BinaryOperator::Mul => Instruction::Mul(lhs, rhs),
                    BinaryOperator::Div => Instruction::Div(lhs, rhs),
                    BinaryOperator::Gt => Instruction::Cmp {
                        ty: Type::Word,
                        op: Comparison::Gt,
                        lhs,
                        rhs,
                    },
                    BinaryOperator::Lt => Instruction::Cmp {
                        ty: Type::Word,
                        op: Comparison::Lt,
                        lhs,
                        rhs,
                    },
                };
                self.assign(instr)
            }
        }
    }

    fn slot(&self, name: &str, loc: Location) -> Result<Temp<'a>, Error> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| Error::UndefinedVariable {
                name: name.into(),
                loc,
            })
    }
}

/// Emission utilities.
impl<'a> Codegen<'a> {
    /// Binds the result of a word instruction to a fresh temporary.
    fn assign(&mut self, instr: Instruction<'a>) -> Result<Value<'a>, Error> {
        let dest = self.fresh_temp()?;
        self.assign_to(dest, instr, Type::Word)?;
        Ok(dest.into())
    }

    fn assign_to(&mut self, dest: Temp<'a>, instr: Instruction<'a>, ty: Type) -> Result<(), Error> {
        self.ensure_reachable()?;
        self.module.assign_instruction(self.entry, instr, ty, dest);
        Ok(())
    }

    fn push(&mut self, instr: Instruction<'a>) -> Result<(), Error> {
        self.ensure_reachable()?;
        self.module.push_instruction(self.entry, instr);
        Ok(())
    }

    fn label(&mut self, label: Label<'a>) {
        self.module.push_label(self.entry, label);
    }

    /// Code following a terminator must start with a label.
    fn ensure_reachable(&mut self) -> Result<(), Error> {
        if self.module.block(self.entry).is_terminated() {
            let label = self.fresh_label("dead_")?;
            self.label(label);
        }
        Ok(())
    }

    fn fresh_temp(&mut self) -> Result<Temp<'a>, Error> {
        self.fresh_name("t").map(Temp)
    }

    fn fresh_label(&mut self, prefix: &str) -> Result<Label<'a>, Error> {
        self.fresh_name(prefix).map(Label)
    }

    fn fresh_name(&mut self, prefix: &str) -> Result<&'a str, Error> {
        let name = self.arena.alloc_str(&format!("{prefix}{}", self.counter))?;
        self.counter += 1;
        Ok(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("skipped a statement that failed to parse")]
    SkippedErrorStatement,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no stack slot for variable {name}")]
    UndefinedVariable { name: String, loc: Location },
    #[error(transparent)]
    Arena(#[from] arena::Error),
}

impl Error {
    pub fn loc(&self) -> Option<Location> {
        match self {
            Error::UndefinedVariable { loc, .. } => Some(*loc),
            Error::Arena(_) => None,
        }
    }
}

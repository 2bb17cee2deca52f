//! A small block-structured IR in the shape the QBE backend expects.
//!
//! The model knows nothing about the source language. Functions hold blocks,
//! blocks hold an ordered stream of statements, and a statement is either an
//! instruction (with or without a destination temporary) or a label marker.
//! All names borrow from the compilation arena.

use std::fmt;

pub mod write;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit integer.
    Word,
    /// 64-bit integer, also used for addresses.
    Long,
}

impl Type {
    pub const fn as_char(self) -> char {
        match self {
            Type::Word => 'w',
            Type::Long => 'l',
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Temp<'a>(pub &'a str);

impl fmt::Display for Temp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label<'a>(pub &'a str);

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Value<'a> {
    Const(u64),
    Temp(Temp<'a>),
}

impl<'a> From<Temp<'a>> for Value<'a> {
    fn from(temp: Temp<'a>) -> Self {
        Value::Temp(temp)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(n) => write!(f, "{n}"),
            Value::Temp(temp) => write!(f, "{temp}"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    Ne,
    /// Signed greater than.
    Gt,
    /// Signed less than.
    Lt,
}

impl Comparison {
    pub const fn as_str(self) -> &'static str {
        match self {
            Comparison::Ne => "ne",
            Comparison::Gt => "sgt",
            Comparison::Lt => "slt",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction<'a> {
    Return(Value<'a>),
    Add(Value<'a>, Value<'a>),
    Sub(Value<'a>, Value<'a>),
    Mul(Value<'a>, Value<'a>),
    Div(Value<'a>, Value<'a>),
    /// Reserves a stack slot of the given size in bytes, 8-byte aligned.
    Alloc8(u64),
    StoreW {
        value: Value<'a>,
        slot: Temp<'a>,
    },
    LoadW(Temp<'a>),
    Cmp {
        /// Type of the operands.
        ty: Type,
        op: Comparison,
        lhs: Value<'a>,
        rhs: Value<'a>,
    },
    Jmp(Label<'a>),
    Jnz {
        cond: Value<'a>,
        then: Label<'a>,
        otherwise: Label<'a>,
    },
}

impl Instruction<'_> {
    /// Whether control never falls through to the next statement.
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return(_) | Instruction::Jmp(_) | Instruction::Jnz { .. }
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Statement<'a> {
    Assign {
        dest: Temp<'a>,
        ty: Type,
        instr: Instruction<'a>,
    },
    Throwaway(Instruction<'a>),
    Label(Label<'a>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block<'a> {
    pub name: Label<'a>,
    pub statements: Vec<Statement<'a>>,
}

impl Block<'_> {
    /// Whether the statement stream ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        match self.statements.last() {
            Some(Statement::Assign { instr, .. } | Statement::Throwaway(instr)) => {
                instr.is_terminator()
            }
            Some(Statement::Label(_)) | None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function<'a> {
    pub name: &'a str,
    pub return_type: Type,
    pub blocks: Vec<Block<'a>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Module<'a> {
    pub functions: Vec<Function<'a>>,
}

/// Handle to a function of a [`Module`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FunctionRef(usize);

/// Handle to a block of a [`Module`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockRef {
    function: usize,
    block: usize,
}

/// Builder operations.
///
/// Handles are only meaningful for the module that returned them.
impl<'a> Module<'a> {
    pub fn new() -> Module<'a> {
        Module::default()
    }

    pub fn create_function(&mut self, name: &'a str, return_type: Type) -> FunctionRef {
        self.functions.push(Function {
            name,
            return_type,
            blocks: Vec::new(),
        });
        FunctionRef(self.functions.len() - 1)
    }

    pub fn push_block(&mut self, function: FunctionRef, name: Label<'a>) -> BlockRef {
        let blocks = &mut self.functions[function.0].blocks;
        blocks.push(Block {
            name,
            statements: Vec::with_capacity(32),
        });
        BlockRef {
            function: function.0,
            block: blocks.len() - 1,
        }
    }

    /// Records an instruction whose result is discarded.
    pub fn push_instruction(&mut self, block: BlockRef, instr: Instruction<'a>) {
        self.block_mut(block).statements.push(Statement::Throwaway(instr));
    }

    /// Records an instruction whose result is bound to `dest`.
    pub fn assign_instruction(
        &mut self,
        block: BlockRef,
        instr: Instruction<'a>,
        ty: Type,
        dest: Temp<'a>,
    ) {
        let statement = Statement::Assign { dest, ty, instr };
        self.block_mut(block).statements.push(statement);
    }

    /// Records a jump target inside the block's statement stream.
    pub fn push_label(&mut self, block: BlockRef, name: Label<'a>) {
        self.block_mut(block).statements.push(Statement::Label(name));
    }

    pub fn function(&self, function: FunctionRef) -> &Function<'a> {
        &self.functions[function.0]
    }

    pub fn block(&self, block: BlockRef) -> &Block<'a> {
        &self.functions[block.function].blocks[block.block]
    }

    fn block_mut(&mut self, block: BlockRef) -> &mut Block<'a> {
        &mut self.functions[block.function].blocks[block.block]
    }
}

//! The closed set of SSA instructions. Each instruction belongs to exactly one basic block. Control
//! flow instructions ([InstructionKind::If], [InstructionKind::Jump], [InstructionKind::Return],
//! [InstructionKind::Panic]) terminate their block.
use std::fmt;

use crate::{FunctionId, TypeId};

/// Index of an instruction in its [crate::Program].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionId(pub(crate) usize);

impl InstructionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
    Nil,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Str(value) => write!(f, "{value:?}"),
            Literal::Nil => f.write_str("nil"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    pub value: Literal,
    pub ty: TypeId,
}

/// An instruction operand. Every operand is exactly one of a constant, a parameter of the
/// enclosing function (by position, receiver first), or a register defined by another
/// instruction of the same function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Const(Constant),
    Parameter(usize),
    Register(InstructionId),
}

/// Binary operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    /// `x + y`, also string concatenation.
    Add,

    /// `x - y`
    Sub,

    /// `x * y`
    Mul,

    /// `x / y`, truncated toward zero.
    Div,

    /// `x % y`, sign of the dividend.
    Rem,

    /// `x & y`
    And,

    /// `x | y`
    Or,

    /// `x ^ y`
    Xor,

    /// `x &^ y`
    AndNot,

    /// `x << y`
    Shl,

    /// `x >> y`, arithmetic.
    Shr,

    /// `x == y`
    Eq,

    /// `x != y`
    Ne,

    /// `x < y`
    Lt,

    /// `x <= y`
    Le,

    /// `x > y`
    Gt,

    /// `x >= y`
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::AndNot => "&^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    /// Arithmetic negation `-x`.
    Neg,

    /// Logical negation `!x`.
    Not,

    /// Load through a pointer `*x`.
    Deref,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Deref => "*",
        }
    }
}

/// Functions provided by the runtime rather than the program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Terminates the program with the exit code given as the only argument.
    Exit,

    /// Writes its arguments to the program output.
    Println,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "exit" => Some(Builtin::Exit),
            "println" => Some(Builtin::Println),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Println => "println",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callee {
    /// Call of a statically known function.
    Static(FunctionId),

    /// Dynamic dispatch of `method` on the dynamic type of `receiver`, which has an interface
    /// type.
    Invoke { receiver: Operand, method: String },

    Builtin(Builtin),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallCommon {
    pub callee: Callee,
    pub args: Vec<Operand>,
}

impl CallCommon {
    pub fn is_invoke(&self) -> bool {
        matches!(self.callee, Callee::Invoke { .. })
    }

    pub fn static_callee(&self) -> Option<FunctionId> {
        match self.callee {
            Callee::Static(function) => Some(function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    BinOp {
        op: BinaryOp,
        x: Operand,
        y: Operand,
    },
    UnOp {
        op: UnaryOp,
        x: Operand,
    },

    /// One edge per predecessor block, in the order of the block's predecessor list.
    Phi {
        edges: Vec<Operand>,
    },
    Call(CallCommon),

    /// Allocates local storage cell `local` of the enclosing function. The register holds a
    /// pointer to the cell.
    Alloc {
        local: usize,
    },

    /// Wraps a concrete value into an interface value. The register type is the interface.
    MakeInterface {
        x: Operand,
    },
    Store {
        addr: Operand,
        value: Operand,
    },

    /// Continue with the first successor if `cond` is true, with the second otherwise.
    If {
        cond: Operand,
    },

    /// Continue with the only successor.
    Jump,
    Return {
        value: Option<Operand>,
    },
    Panic {
        value: Operand,
    },
}

impl InstructionKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionKind::If { .. }
                | InstructionKind::Jump
                | InstructionKind::Return { .. }
                | InstructionKind::Panic { .. }
        )
    }

    /// Whether executing this instruction leaves the function.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            InstructionKind::Return { .. } | InstructionKind::Panic { .. }
        )
    }

    pub fn as_call(&self) -> Option<&CallCommon> {
        match self {
            InstructionKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            InstructionKind::BinOp { x, y, .. } => vec![x, y],
            InstructionKind::UnOp { x, .. } | InstructionKind::MakeInterface { x } => vec![x],
            InstructionKind::Phi { edges } => edges.iter().collect(),
            InstructionKind::Call(call) => {
                let mut operands = Vec::with_capacity(call.args.len() + 1);
                if let Callee::Invoke { receiver, .. } = &call.callee {
                    operands.push(receiver);
                }
                operands.extend(call.args.iter());
                operands
            }
            InstructionKind::Store { addr, value } => vec![addr, value],
            InstructionKind::If { cond } => vec![cond],
            InstructionKind::Return { value } => value.iter().collect(),
            InstructionKind::Panic { value } => vec![value],
            InstructionKind::Alloc { .. } | InstructionKind::Jump => Vec::new(),
        }
    }
}

/// The temporary defined by an instruction, such as `t3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Register {
    pub name: String,
    pub ty: TypeId,
}

impl Register {
    /// The numeric suffix of the register name: `t12` is register 12.
    pub fn number(&self) -> Option<i64> {
        self.name.get(1..).and_then(|suffix| suffix.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub register: Option<Register>,
    pub(crate) function: FunctionId,
    pub(crate) block: usize,
    pub(crate) index: usize,
}

impl Instruction {
    /// Function containing this instruction.
    pub fn function(&self) -> FunctionId {
        self.function
    }

    /// Index of the containing block within the function.
    pub fn block(&self) -> usize {
        self.block
    }

    /// Position of this instruction within its block.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.register.as_ref().map(|r| r.name.as_str())
    }
}

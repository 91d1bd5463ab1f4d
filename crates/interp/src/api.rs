//! Callbacks through which the interpreter describes instructions to the host.
use ssa::{BinaryOp, Literal};

use crate::registry::Handle;

/// An operand as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Var {
    Const(Literal),

    /// Zero-based position in the parameter list of the enclosing function.
    Parameter(usize),

    /// A register, identified by the numeric suffix of its name.
    Local(i64),
}

/// Binary operators that are reported to the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOpKind {
    /// The reportable counterpart of an SSA operator. Bitwise operators and shifts have none.
    pub fn from_op(op: BinaryOp) -> Option<Self> {
        Some(match op {
            BinaryOp::Eq => BinOpKind::Eq,
            BinaryOp::Ne => BinOpKind::Ne,
            BinaryOp::Lt => BinOpKind::Lt,
            BinaryOp::Le => BinOpKind::Le,
            BinaryOp::Gt => BinOpKind::Gt,
            BinaryOp::Ge => BinOpKind::Ge,
            BinaryOp::Add => BinOpKind::Add,
            BinaryOp::Sub => BinOpKind::Sub,
            BinaryOp::Mul => BinOpKind::Mul,
            BinaryOp::Div => BinOpKind::Div,
            BinaryOp::Rem => BinOpKind::Mod,
            BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Xor
            | BinaryOp::AndNot
            | BinaryOp::Shl
            | BinaryOp::Shr => return None,
        })
    }

    /// Wire code of the operator. `0` is reserved for illegal operators.
    pub fn code(self) -> i64 {
        match self {
            BinOpKind::Eq => 1,
            BinOpKind::Ne => 2,
            BinOpKind::Lt => 3,
            BinOpKind::Le => 4,
            BinOpKind::Gt => 5,
            BinOpKind::Ge => 6,
            BinOpKind::Add => 7,
            BinOpKind::Sub => 8,
            BinOpKind::Mul => 9,
            BinOpKind::Div => 10,
            BinOpKind::Mod => 11,
        }
    }
}

/// Host side of the interpreter. The host tracks the last block left by a branch so that a phi
/// can select the edge control arrived through.
pub trait Api {
    /// An entry parameter named `name` is read from the host at position `index`.
    fn mk_int_register_reading(&mut self, name: &str, index: usize);

    /// Register `register` holds `lhs op rhs`.
    fn mk_bin_op(&mut self, register: i64, op: BinOpKind, lhs: Var, rhs: Var);

    /// Conditional branch on `expr`. The handles refer to the first instruction of each target.
    fn mk_if(&mut self, expr: Var, positive: Handle, negative: Handle);

    fn mk_return(&mut self, value: Option<Var>);

    /// Register `register` is defined as `value`.
    fn mk_variable(&mut self, register: i64, value: Var);

    fn last_block(&self) -> Option<usize>;

    fn set_last_block(&mut self, block: usize);
}

/// Method codes of the word encoding.
pub mod method {
    pub const REGISTER_READING: i64 = 1;
    pub const BIN_OP: i64 = 2;
    pub const IF: i64 = 3;
    pub const RETURN: i64 = 4;
    pub const VARIABLE: i64 = 5;
}

/// Operand kind codes of the word encoding.
pub mod var_kind {
    pub const ILLEGAL: i64 = 0;
    pub const CONST: i64 = 1;
    pub const PARAMETER: i64 = 2;
    pub const LOCAL: i64 = 3;
}

/// Encodes callbacks as a flat sequence of `i64` words, one record per callback:
///
/// | callback | words |
/// |----------|-------|
/// | register reading | `1, index` |
/// | binary operation | `2, op, register, kind, value, kind, value` |
/// | conditional branch | `3, expr, positive, negative` |
/// | return | `4, kind, value` |
/// | variable | `5, register, kind, value` |
///
/// Constants are encoded by their integer value with booleans as `0` or `1`. Operands without an
/// integer encoding are written as the illegal pair `0, -1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordApi {
    words: Vec<i64>,
    last_block: Option<usize>,
}

impl WordApi {
    pub fn new(last_block: Option<usize>) -> Self {
        Self {
            words: Vec::with_capacity(20),
            last_block,
        }
    }

    pub fn words(&self) -> &[i64] {
        &self.words
    }

    /// Completes the record: `-1` if no callback fired, followed by the last block.
    pub fn finish(mut self) -> Vec<i64> {
        if self.words.is_empty() {
            self.words.push(-1);
        }
        self.words.push(self.last_block.map_or(-1, |block| block as i64));
        self.words
    }

    fn encode(var: &Var) -> [i64; 2] {
        match var {
            Var::Const(Literal::Int(value)) => [var_kind::CONST, *value],
            Var::Const(Literal::Bool(value)) => [var_kind::CONST, i64::from(*value)],
            Var::Const(Literal::Str(_) | Literal::Nil) => [var_kind::ILLEGAL, -1],
            Var::Parameter(index) => [var_kind::PARAMETER, *index as i64],
            Var::Local(register) => [var_kind::LOCAL, *register],
        }
    }
}

impl Api for WordApi {
    fn mk_int_register_reading(&mut self, _name: &str, index: usize) {
        self.words.extend([method::REGISTER_READING, index as i64]);
    }

    fn mk_bin_op(&mut self, register: i64, op: BinOpKind, lhs: Var, rhs: Var) {
        self.words.extend([method::BIN_OP, op.code(), register]);
        self.words.extend(Self::encode(&lhs));
        self.words.extend(Self::encode(&rhs));
    }

    fn mk_if(&mut self, expr: Var, positive: Handle, negative: Handle) {
        let [_, expr] = Self::encode(&expr);
        self.words.extend([
            method::IF,
            expr,
            positive.raw() as i64,
            negative.raw() as i64,
        ]);
    }

    fn mk_return(&mut self, value: Option<Var>) {
        self.words.push(method::RETURN);
        match value {
            Some(value) => self.words.extend(Self::encode(&value)),
            None => self.words.extend([var_kind::ILLEGAL, -1]),
        }
    }

    fn mk_variable(&mut self, register: i64, value: Var) {
        self.words.extend([method::VARIABLE, register]);
        self.words.extend(Self::encode(&value));
    }

    fn last_block(&self) -> Option<usize> {
        self.last_block
    }

    fn set_last_block(&mut self, block: usize) {
        self.last_block = Some(block);
    }
}

/// A callback as recorded by [Recorder].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RegisterReading {
        name: String,
        index: usize,
    },
    BinOp {
        register: i64,
        op: BinOpKind,
        lhs: Var,
        rhs: Var,
    },
    If {
        expr: Var,
        positive: Handle,
        negative: Handle,
    },
    Return(Option<Var>),
    Variable {
        register: i64,
        value: Var,
    },
}

/// Records every callback in order. Useful for hosts that process callbacks after a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub last_block: Option<usize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl Api for Recorder {
    fn mk_int_register_reading(&mut self, name: &str, index: usize) {
        self.events.push(Event::RegisterReading {
            name: name.to_owned(),
            index,
        });
    }

    fn mk_bin_op(&mut self, register: i64, op: BinOpKind, lhs: Var, rhs: Var) {
        self.events.push(Event::BinOp {
            register,
            op,
            lhs,
            rhs,
        });
    }

    fn mk_if(&mut self, expr: Var, positive: Handle, negative: Handle) {
        self.events.push(Event::If {
            expr,
            positive,
            negative,
        });
    }

    fn mk_return(&mut self, value: Option<Var>) {
        self.events.push(Event::Return(value));
    }

    fn mk_variable(&mut self, register: i64, value: Var) {
        self.events.push(Event::Variable { register, value });
    }

    fn last_block(&self) -> Option<usize> {
        self.last_block
    }

    fn set_last_block(&mut self, block: usize) {
        self.last_block = Some(block);
    }
}

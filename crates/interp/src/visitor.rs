//! Per-instruction dispatch. The [Executor] evaluates instructions against the frame stack, the
//! [Reporter] describes them to the host through [Api] callbacks without touching any frame.
use ssa::{
    Builtin, CallCommon, Callee, FunctionId, InstructionId, InstructionKind, Literal, Operand,
    Program, UnaryOp,
};

use crate::api::{Api, BinOpKind, Var};
use crate::frame::{Frame, FrameStack, Key};
use crate::registry::{Handle, Registry};
use crate::value::{Pointer, Value};
use crate::{Error, Result};

/// Describes how control proceeds after an instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Continuation {
    /// The next instruction of the same block.
    #[default]
    Next,

    /// The first instruction of the given block of the same function.
    Jump(usize),

    /// Leave the function, optionally with a value.
    Return(Option<Value>),

    /// Enter `callee` with `args`. The calling instruction completes when the callee returns.
    Call { callee: FunctionId, args: Vec<Value> },
}

pub trait InstructionVisitor {
    fn visit(&mut self, instruction: InstructionId) -> Result<Continuation>;
}

/// Fully executes instructions in the innermost frame.
pub struct Executor<'a> {
    program: &'a Program,
    frames: &'a mut FrameStack,
    output: &'a mut Vec<String>,
}

impl<'a> Executor<'a> {
    pub fn new(
        program: &'a Program,
        frames: &'a mut FrameStack,
        output: &'a mut Vec<String>,
    ) -> Self {
        Self {
            program,
            frames,
            output,
        }
    }

    fn top(&self) -> Result<&Frame> {
        self.frames
            .top()
            .ok_or_else(|| Error::InternalError("no frame to execute in".into()))
    }

    fn top_mut(&mut self) -> Result<&mut Frame> {
        self.frames
            .top_mut()
            .ok_or_else(|| Error::InternalError("no frame to execute in".into()))
    }

    fn eval(&self, operand: &Operand) -> Result<Value> {
        self.top()?.eval(self.program, operand)
    }

    fn pointer(&self, operand: &Operand) -> Result<Pointer> {
        match self.eval(operand)? {
            Value::Pointer(pointer) => Ok(pointer),
            Value::Nil => Err(nil_dereference()),
            other => Err(Error::Runtime(format!("{other} is not a pointer"))),
        }
    }

    fn call(&mut self, call: &CallCommon) -> Result<Continuation> {
        let program = self.program;
        let mut args = call
            .args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>>>()?;

        let callee = match &call.callee {
            Callee::Static(callee) => *callee,
            Callee::Invoke { receiver, method } => {
                let (ty, value) = match self.eval(receiver)? {
                    Value::Interface { ty, value } => (ty, *value),
                    Value::Nil => return Err(nil_dereference()),
                    other => {
                        return Err(Error::Runtime(format!(
                            "cannot invoke {method} on non-interface value {other}"
                        )))
                    }
                };
                let types = program.types();
                let callee = program.lookup_method(ty, method).ok_or_else(|| {
                    Error::Runtime(format!(
                        "{ty} has no method {method}",
                        ty = types.display(ty)
                    ))
                })?;

                // A value receiver method called through a pointer receives the pointee
                let by_value = program
                    .function(callee)
                    .params()
                    .first()
                    .is_some_and(|param| types.pointer_elem(param.ty).is_none());
                let receiver = match value {
                    Value::Pointer(pointer) if by_value => self.frames.load(pointer)?,
                    value => value,
                };
                args.insert(0, receiver);
                callee
            }
            Callee::Builtin(Builtin::Exit) => {
                let code = args
                    .first()
                    .and_then(Value::as_int)
                    .ok_or_else(|| Error::Runtime("exit requires an integer code".into()))?;
                let code = i32::try_from(code)
                    .map_err(|_| Error::Runtime(format!("exit code {code} out of range")))?;
                return Err(Error::Exit(code));
            }
            Callee::Builtin(Builtin::Println) => {
                let line = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::info!(target: "ssa_interp::output", "{line}");
                self.output.push(line);
                return Ok(Continuation::Next);
            }
        };

        let function = program.function(callee);
        if function.is_external() {
            return Err(Error::Runtime(format!(
                "call to external function {name}",
                name = function.name()
            )));
        }

        Ok(Continuation::Call { callee, args })
    }
}

impl InstructionVisitor for Executor<'_> {
    fn visit(&mut self, id: InstructionId) -> Result<Continuation> {
        let program = self.program;
        let instruction = program.instruction(id);

        let value = match &instruction.kind {
            InstructionKind::BinOp { op, x, y } => {
                Value::binary(*op, &self.eval(x)?, &self.eval(y)?)?
            }
            InstructionKind::UnOp {
                op: UnaryOp::Deref,
                x,
            } => {
                let pointer = self.pointer(x)?;
                self.frames.load(pointer)?
            }
            InstructionKind::UnOp { op, x } => Value::unary(*op, &self.eval(x)?)?,
            InstructionKind::Phi { edges } => {
                let pending = self.top_mut()?.take_pending_phi(id);
                match pending {
                    Some(value) => value,
                    None => {
                        let block = program.block_of(id);
                        let last_block = self.top()?.prev_block();
                        let edge = last_block
                            .and_then(|last| block.preds().iter().position(|&pred| pred == last))
                            .and_then(|position| edges.get(position))
                            .ok_or(Error::UnknownPredecessor {
                                last_block,
                                block: block.index(),
                            })?;
                        self.eval(edge)?
                    }
                }
            }
            InstructionKind::Call(call) => return self.call(call),
            InstructionKind::Alloc { local } => {
                let frame = self.top()?;
                let ty = program.function(frame.function()).locals()[*local].ty;
                let zero = Value::zero(program.types(), ty);
                Value::Pointer(self.top_mut()?.allocate(*local, zero))
            }
            InstructionKind::MakeInterface { x } => match self.eval(x)? {
                value @ Value::Interface { .. } => value,
                value => {
                    let function = self.top()?.function();
                    let ty = program.operand_type(function, x).ok_or_else(|| {
                        Error::InternalError("operand of make interface has no type".into())
                    })?;
                    Value::Interface {
                        ty,
                        value: Box::new(value),
                    }
                }
            },
            InstructionKind::Store { addr, value } => {
                let pointer = self.pointer(addr)?;
                let value = self.eval(value)?;
                self.frames.store(pointer, value)?;
                return Ok(Continuation::Next);
            }
            InstructionKind::If { cond } => {
                let cond = self.eval(cond)?;
                let taken = cond
                    .as_bool()
                    .ok_or_else(|| Error::Runtime(format!("non-boolean condition {cond}")))?;
                let succs = program.block_of(id).succs();
                let target = succs
                    .get(if taken { 0 } else { 1 })
                    .ok_or_else(|| Error::InternalError("branch without two successors".into()))?;
                return Ok(Continuation::Jump(*target));
            }
            InstructionKind::Jump => {
                let target = program
                    .block_of(id)
                    .succs()
                    .first()
                    .ok_or_else(|| Error::InternalError("jump without a successor".into()))?;
                return Ok(Continuation::Jump(*target));
            }
            InstructionKind::Return { value } => {
                let value = value.as_ref().map(|value| self.eval(value)).transpose()?;
                return Ok(Continuation::Return(value));
            }
            InstructionKind::Panic { value } => {
                return Err(Error::TargetPanic(self.eval(value)?.to_string()));
            }
        };

        if instruction.register.is_some() {
            self.top_mut()?.set(Key::Register(id), value);
        }
        Ok(Continuation::Next)
    }
}

fn nil_dereference() -> Error {
    Error::Runtime("invalid memory address or nil pointer dereference".into())
}

/// Describes instructions to the host. Operands are reported by their three-way tagging:
/// constants by value, parameters by position and registers by the numeric suffix of their name.
pub struct Reporter<'a> {
    program: &'a Program,
    api: &'a mut dyn Api,
    registry: &'a mut Registry,
}

impl<'a> Reporter<'a> {
    pub fn new(program: &'a Program, api: &'a mut dyn Api, registry: &'a mut Registry) -> Self {
        Self {
            program,
            api,
            registry,
        }
    }

    /// Handle of the first instruction of `block`, or nil if the block is empty.
    fn block_entry(&mut self, function: FunctionId, block: usize) -> Handle {
        self.program
            .function(function)
            .block(block)
            .and_then(|block| block.first_instruction())
            .map_or(Handle::NIL, |first| self.registry.handle(first))
    }
}

/// Resolves an operand for the host.
pub fn resolve_var(program: &Program, operand: &Operand) -> Result<Var> {
    match operand {
        Operand::Const(constant) => Ok(Var::Const(constant.value.clone())),
        Operand::Parameter(index) => Ok(Var::Parameter(*index)),
        Operand::Register(id) => register_number(program, *id).map(Var::Local),
    }
}

/// The numeric suffix of the register defined by `instruction`.
pub fn register_number(program: &Program, instruction: InstructionId) -> Result<i64> {
    let register = program.instruction(instruction).register.as_ref().ok_or_else(|| {
        Error::InternalError(format!(
            "instruction {index} does not define a register",
            index = instruction.index()
        ))
    })?;
    register
        .number()
        .ok_or_else(|| Error::RegisterName(register.name.clone()))
}

impl InstructionVisitor for Reporter<'_> {
    fn visit(&mut self, id: InstructionId) -> Result<Continuation> {
        let program = self.program;
        let instruction = program.instruction(id);
        let var = |operand: &Operand| resolve_var(program, operand);

        match &instruction.kind {
            InstructionKind::BinOp { op, x, y } => match BinOpKind::from_op(*op) {
                Some(kind) => {
                    let register = register_number(program, id)?;
                    self.api.mk_bin_op(register, kind, var(x)?, var(y)?);
                }
                None => tracing::warn!(
                    op = op.symbol(),
                    register = instruction.name(),
                    "binary operator is not reported"
                ),
            },
            InstructionKind::UnOp {
                op: UnaryOp::Neg,
                x,
            } => {
                let register = register_number(program, id)?;
                let zero = Var::Const(Literal::Int(0));
                self.api.mk_bin_op(register, BinOpKind::Sub, zero, var(x)?);
            }
            InstructionKind::UnOp {
                op: UnaryOp::Not,
                x,
            } => {
                let register = register_number(program, id)?;
                let no = Var::Const(Literal::Bool(false));
                self.api.mk_bin_op(register, BinOpKind::Eq, var(x)?, no);
            }
            InstructionKind::Phi { edges } => {
                let block = program.block_of(id);
                let last_block = self.api.last_block();
                let edge = last_block
                    .and_then(|last| block.preds().iter().position(|&pred| pred == last))
                    .and_then(|position| edges.get(position))
                    .ok_or(Error::UnknownPredecessor {
                        last_block,
                        block: block.index(),
                    })?;
                let register = register_number(program, id)?;
                self.api.mk_variable(register, var(edge)?);
            }
            InstructionKind::If { cond } => {
                let block = program.block_of(id);
                let function = instruction.function();
                let (positive, negative) = match block.succs() {
                    &[then, otherwise] => (
                        self.block_entry(function, then),
                        self.block_entry(function, otherwise),
                    ),
                    _ => {
                        return Err(Error::InternalError(
                            "branch without two successors".into(),
                        ))
                    }
                };
                self.api.set_last_block(block.index());
                self.api.mk_if(var(cond)?, positive, negative);
            }
            InstructionKind::Jump => {
                self.api.set_last_block(program.block_of(id).index());
            }
            InstructionKind::Return { value } => {
                let value = value.as_ref().map(var).transpose()?;
                self.api.mk_return(value);
            }
            InstructionKind::UnOp {
                op: UnaryOp::Deref,
                ..
            }
            | InstructionKind::Call(_)
            | InstructionKind::Alloc { .. }
            | InstructionKind::MakeInterface { .. }
            | InstructionKind::Store { .. }
            | InstructionKind::Panic { .. } => {}
        }

        Ok(Continuation::Next)
    }
}

use std::collections::HashMap;

use ssa::{FunctionId, InstructionId, Operand, Program};

use crate::value::{Pointer, Value};
use crate::{Error, Result};

/// Storage location of a computed value within a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Parameter(usize),
    Register(InstructionId),
}

/// Activation record of a function under execution.
#[derive(Debug, Clone)]
pub struct Frame {
    id: u64,
    function: FunctionId,
    block: usize,
    prev_block: Option<usize>,
    index: usize,
    env: HashMap<Key, Value>,
    locals: Vec<Value>,

    /// The call instruction of the caller that created this frame. `None` for the entry frame.
    caller: Option<InstructionId>,

    /// Phi values of the current block, computed together on entry to the block.
    pending_phis: HashMap<InstructionId, Value>,
    result: Option<Value>,
}

impl Frame {
    pub fn new(
        id: u64,
        function: FunctionId,
        args: Vec<Value>,
        caller: Option<InstructionId>,
    ) -> Self {
        let env = args
            .into_iter()
            .enumerate()
            .map(|(i, value)| (Key::Parameter(i), value))
            .collect();

        Self {
            id,
            function,
            block: 0,
            prev_block: None,
            index: 0,
            env,
            locals: Vec::new(),
            caller,
            pending_phis: HashMap::new(),
            result: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn block(&self) -> usize {
        self.block
    }

    /// The block control arrived from.
    pub fn prev_block(&self) -> Option<usize> {
        self.prev_block
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn caller(&self) -> Option<InstructionId> {
        self.caller
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    /// The instruction to be executed next, if the current block has one.
    pub fn current(&self, program: &Program) -> Option<InstructionId> {
        program
            .function(self.function)
            .block(self.block)?
            .instructions()
            .get(self.index)
            .copied()
    }

    pub fn advance(&mut self) {
        self.index += 1;
    }

    /// Transfers control to the start of `block`.
    pub fn jump(&mut self, block: usize, phis: HashMap<InstructionId, Value>) {
        self.prev_block = Some(self.block);
        self.block = block;
        self.index = 0;
        self.pending_phis = phis;
    }

    pub fn take_pending_phi(&mut self, phi: InstructionId) -> Option<Value> {
        self.pending_phis.remove(&phi)
    }

    pub fn get(&self, key: Key) -> Option<&Value> {
        self.env.get(&key)
    }

    pub fn set(&mut self, key: Key, value: Value) {
        self.env.insert(key, value);
    }

    /// Value of an operand in this frame.
    pub fn eval(&self, program: &Program, operand: &Operand) -> Result<Value> {
        match operand {
            Operand::Const(constant) => Ok(Value::from_literal(&constant.value)),
            Operand::Parameter(index) => self.env.get(&Key::Parameter(*index)).cloned().ok_or_else(
                || {
                    Error::InternalError(format!(
                        "parameter {index} of {function} is unset",
                        function = program.function(self.function).name()
                    ))
                },
            ),
            Operand::Register(id) => self.env.get(&Key::Register(*id)).cloned().ok_or_else(|| {
                Error::Runtime(format!(
                    "{register} used before its definition",
                    register = program.instruction(*id).name().unwrap_or("<unnamed>")
                ))
            }),
        }
    }

    /// Creates local storage cell `local` holding `value` and returns its address.
    pub fn allocate(&mut self, local: usize, value: Value) -> Pointer {
        if self.locals.len() <= local {
            self.locals.resize(local + 1, Value::Nil);
        }
        self.locals[local] = value;
        Pointer {
            frame: self.id,
            local,
        }
    }

    pub fn local(&self, local: usize) -> Option<&Value> {
        self.locals.get(local)
    }

    pub fn local_mut(&mut self, local: usize) -> Option<&mut Value> {
        self.locals.get_mut(local)
    }

    pub fn clear_locals(&mut self) {
        self.locals.clear();
    }
}

/// The explicit call stack. The innermost frame is last.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
    next_id: u64,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a frame for `function` and returns it.
    pub fn push(
        &mut self,
        function: FunctionId,
        args: Vec<Value>,
        caller: Option<InstructionId>,
    ) -> &mut Frame {
        let id = self.next_id;
        self.next_id += 1;
        self.frames.push(Frame::new(id, function, args, caller));
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn load(&self, pointer: Pointer) -> Result<Value> {
        self.frames
            .iter()
            .find(|frame| frame.id == pointer.frame)
            .and_then(|frame| frame.local(pointer.local))
            .cloned()
            .ok_or_else(|| dangling(pointer))
    }

    pub fn store(&mut self, pointer: Pointer, value: Value) -> Result<()> {
        let cell = self
            .frames
            .iter_mut()
            .find(|frame| frame.id == pointer.frame)
            .and_then(|frame| frame.local_mut(pointer.local))
            .ok_or_else(|| dangling(pointer))?;
        *cell = value;
        Ok(())
    }
}

fn dangling(pointer: Pointer) -> Error {
    Error::Runtime(format!(
        "dangling pointer to local {local} of frame {frame}",
        local = pointer.local,
        frame = pointer.frame
    ))
}

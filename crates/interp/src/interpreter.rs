use std::collections::HashMap;
use std::rc::Rc;

use ssa::{FunctionId, InstructionId, InstructionKind, Program};

use crate::api::Api;
use crate::frame::{Frame, FrameStack, Key};
use crate::registry::Registry;
use crate::value::Value;
use crate::visitor::{Continuation, Executor, InstructionVisitor, Reporter};
use crate::{Error, Result};

/// Exit code of [Interpreter::start] when the entrypoint does not exist.
pub const EXIT_ENTRY_NOT_FOUND: i32 = 1;

/// Exit code of a panic or runtime error in the interpreted program.
pub const EXIT_FAULT: i32 = 2;

/// Resumable interpreter. Execution never runs ahead of the caller: every call advances by at
/// most one instruction.
#[derive(Debug)]
pub struct Interpreter {
    program: Rc<Program>,
    entrypoint: String,
    frames: FrameStack,
    registry: Registry,
    result: Option<Value>,
    exit_code: Option<i32>,
    output: Vec<String>,
    tracing: bool,
}

impl Interpreter {
    pub fn new(program: Rc<Program>, entrypoint: impl Into<String>) -> Self {
        Self {
            program,
            entrypoint: entrypoint.into(),
            frames: FrameStack::new(),
            registry: Registry::new(),
            result: None,
            exit_code: None,
            output: Vec::new(),
            tracing: false,
        }
    }

    /// Log every executed instruction at trace level.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// The entry function in the main package.
    pub fn entry(&self) -> Option<FunctionId> {
        self.program.main_package()?.func(&self.entrypoint)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    /// Whether the frame stack is empty, either because the entry function returned or because
    /// execution faulted.
    pub fn is_done(&self) -> bool {
        self.frames.is_empty()
    }

    /// The value returned by the entry function. `None` until the entry function has returned.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Exit code recorded by the last recovered fault.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Lines written by `println`.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Resets execution state and enters the entry function. Every entry parameter is announced
    /// to the host as a register reading and starts at its zero value.
    ///
    /// Returns `0` on success, [EXIT_ENTRY_NOT_FOUND] if the entrypoint does not exist, or the
    /// exit code of a fault.
    pub fn start(&mut self, api: &mut dyn Api) -> i32 {
        self.frames.clear();
        self.result = None;
        self.exit_code = None;
        self.output.clear();

        let Some(entry) = self.entry() else {
            tracing::error!(entrypoint = %self.entrypoint, "entrypoint not found");
            return EXIT_ENTRY_NOT_FOUND;
        };

        match self.enter(entry, api) {
            Ok(()) => 0,
            Err(err) => self.recover(err),
        }
    }

    fn enter(&mut self, entry: FunctionId, api: &mut dyn Api) -> Result<()> {
        let program = Rc::clone(&self.program);
        let function = program.function(entry);
        if function.blocks().first().map_or(true, |b| b.instructions().is_empty()) {
            return Err(Error::EmptyFunction(function.name().to_owned()));
        }

        let args = function
            .params()
            .iter()
            .enumerate()
            .map(|(i, param)| {
                api.mk_int_register_reading(&format!("p{i}"), i);
                Value::zero(program.types(), param.ty)
            })
            .collect();

        tracing::debug!(function = function.name(), "entering");
        self.frames.push(entry, args, None);
        Ok(())
    }

    /// Executes the next instruction of the innermost frame. Returns true when no frames remain.
    /// Faults are recovered: the frame stack is cleared and the exit code recorded.
    pub fn frame_step(&mut self, api: &mut dyn Api) -> bool {
        if self.frames.is_empty() {
            return true;
        }

        match self.try_frame_step(api) {
            Ok(done) => done,
            Err(err) => {
                self.recover(err);
                true
            }
        }
    }

    fn try_frame_step(&mut self, api: &mut dyn Api) -> Result<bool> {
        let program = Rc::clone(&self.program);
        let top = self.top()?;
        let id = top.current(&program).ok_or_else(|| {
            Error::InternalError(format!(
                "no instruction {index} in block {block} of {function}",
                index = top.index(),
                block = top.block(),
                function = program.function(top.function()).name()
            ))
        })?;

        if self.tracing {
            tracing::trace!(
                depth = self.frames.len(),
                instruction = %program.display_instruction(id),
                "execute"
            );
        }

        let continuation =
            Executor::new(&program, &mut self.frames, &mut self.output).visit(id)?;
        match continuation {
            Continuation::Next => self.top_mut()?.advance(),
            Continuation::Jump(target) => {
                let frame = self.top_mut()?;
                let from = frame.block();
                let phis = entry_phis(&program, frame, target)?;
                frame.jump(target, phis);
                api.set_last_block(from);
            }
            Continuation::Return(value) => self.ret(&program, value)?,
            Continuation::Call { callee, args } => {
                tracing::debug!(function = program.function(callee).name(), "call");
                self.frames.push(callee, args, Some(id));
            }
        }

        Ok(self.frames.is_empty())
    }

    fn ret(&mut self, program: &Program, value: Option<Value>) -> Result<()> {
        let mut frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::InternalError("return without a frame".into()))?;
        frame.clear_locals();
        let value = value.unwrap_or(Value::Unit);
        frame.set_result(value.clone());

        match self.frames.top_mut() {
            Some(caller) => {
                if let Some(site) = frame.caller() {
                    if program.instruction(site).register.is_some() {
                        caller.set(Key::Register(site), value);
                    }
                }
                caller.advance();
            }
            None => {
                tracing::debug!(result = %value, "entry function returned");
                self.result = Some(value);
            }
        }
        Ok(())
    }

    fn recover(&mut self, err: Error) -> i32 {
        let code = match &err {
            Error::Exit(code) => {
                tracing::info!(code, "program exited");
                *code
            }
            Error::TargetPanic(message) => {
                tracing::error!(%message, "program panicked");
                EXIT_FAULT
            }
            Error::Runtime(message) => {
                tracing::error!(%message, "runtime error");
                EXIT_FAULT
            }
            _ => {
                tracing::error!(%err, "execution failed");
                err.exit_code()
            }
        };

        self.frames.clear();
        self.exit_code = Some(code);
        code
    }

    /// Describes `instruction` to the host and returns the instruction that lexically follows
    /// it. The frame stack is neither consulted nor changed. Errors are not recovered.
    pub fn step(
        &mut self,
        api: &mut dyn Api,
        instruction: InstructionId,
    ) -> Result<Option<InstructionId>> {
        let program = Rc::clone(&self.program);
        if program.get_instruction(instruction).is_none() {
            return Err(Error::InternalError(format!(
                "instruction {index} is not part of the program",
                index = instruction.index()
            )));
        }

        if self.tracing {
            tracing::trace!(instruction = %program.display_instruction(instruction), "step");
        }
        Reporter::new(&program, api, &mut self.registry).visit(instruction)?;
        Ok(lexical_next(&program, instruction))
    }

    fn top(&self) -> Result<&Frame> {
        self.frames
            .top()
            .ok_or_else(|| Error::InternalError("frame stack is empty".into()))
    }

    fn top_mut(&mut self) -> Result<&mut Frame> {
        self.frames
            .top_mut()
            .ok_or_else(|| Error::InternalError("frame stack is empty".into()))
    }
}

/// The next instruction in the block of `instruction`, or else the first instruction of the
/// block's first successor.
pub fn lexical_next(program: &Program, instruction: InstructionId) -> Option<InstructionId> {
    let block = program.block_of(instruction);
    let index = program.instruction(instruction).index();
    if let Some(&next) = block.instructions().get(index + 1) {
        return Some(next);
    }

    let function = program.function(program.parent(instruction));
    let succ = *block.succs().first()?;
    function.block(succ)?.first_instruction()
}

/// Values of the phis at the start of `target` when entered from the current block of `frame`.
/// All phis are evaluated before any is assigned.
fn entry_phis(
    program: &Program,
    frame: &Frame,
    target: usize,
) -> Result<HashMap<InstructionId, Value>> {
    let function = program.function(frame.function());
    let block = function
        .block(target)
        .ok_or_else(|| Error::InternalError(format!("missing block {target}")))?;

    let mut phis = HashMap::new();
    for &id in block.instructions() {
        let InstructionKind::Phi { edges } = &program.instruction(id).kind else {
            break;
        };
        let edge = block
            .preds()
            .iter()
            .position(|&pred| pred == frame.block())
            .and_then(|position| edges.get(position))
            .ok_or(Error::UnknownPredecessor {
                last_block: Some(frame.block()),
                block: target,
            })?;
        phis.insert(id, frame.eval(program, edge)?);
    }
    Ok(phis)
}

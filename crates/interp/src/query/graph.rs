use ssa::{CallGraph, Callee, FunctionId, InstructionId, InstructionKind, Program};

use crate::{Error, Result};

/// Control flow and call queries over instructions and functions.
#[derive(Debug, Copy, Clone)]
pub struct ApplicationGraph<'a> {
    program: &'a Program,
    call_graph: &'a CallGraph,
}

impl<'a> ApplicationGraph<'a> {
    pub fn new(program: &'a Program, call_graph: &'a CallGraph) -> Self {
        Self {
            program,
            call_graph,
        }
    }

    /// Every instruction of every predecessor block followed by the instructions that precede
    /// `instruction` in its own block.
    pub fn predecessors(&self, instruction: InstructionId) -> Vec<InstructionId> {
        let program = self.program;
        let Some(inst) = program.get_instruction(instruction) else {
            return Vec::new();
        };
        let function = program.function(inst.function());
        let block = program.block_of(instruction);

        let mut result: Vec<InstructionId> = block
            .preds()
            .iter()
            .filter_map(|&pred| function.block(pred))
            .flat_map(|pred| pred.instructions().iter().copied())
            .collect();
        result.extend_from_slice(&block.instructions()[..inst.index()]);
        result
    }

    /// The instructions that follow `instruction` in its own block followed by every instruction
    /// of every successor block.
    pub fn successors(&self, instruction: InstructionId) -> Vec<InstructionId> {
        let program = self.program;
        let Some(inst) = program.get_instruction(instruction) else {
            return Vec::new();
        };
        let function = program.function(inst.function());
        let block = program.block_of(instruction);

        let mut result = block.instructions()[inst.index() + 1..].to_vec();
        result.extend(
            block
                .succs()
                .iter()
                .filter_map(|&succ| function.block(succ))
                .flat_map(|succ| succ.instructions().iter().copied()),
        );
        result
    }

    /// The function a call instruction enters. For a dynamic call the call graph is consulted
    /// and only a unique target is returned.
    pub fn callees(&self, instruction: InstructionId) -> Vec<FunctionId> {
        let Some(InstructionKind::Call(call)) =
            self.program.get_instruction(instruction).map(|i| &i.kind)
        else {
            return Vec::new();
        };

        match &call.callee {
            Callee::Static(callee) => vec![*callee],
            Callee::Invoke { .. } => match self.call_graph.callees_at(instruction).as_slice() {
                &[callee] => vec![callee],
                _ => Vec::new(),
            },
            Callee::Builtin(_) => Vec::new(),
        }
    }

    /// Call sites of every incoming call graph edge. Functions without a node have no callers.
    pub fn callers(&self, function: FunctionId) -> Vec<InstructionId> {
        self.call_graph.call_sites(function)
    }

    /// The first instruction of the entry block.
    pub fn entry_points(&self, function: FunctionId) -> Result<Vec<InstructionId>> {
        let f = self.program.function(function);
        f.block(0)
            .and_then(|entry| entry.first_instruction())
            .map(|first| vec![first])
            .ok_or_else(|| Error::EmptyFunction(f.name().to_owned()))
    }

    /// Every return and panic instruction in block order.
    pub fn exit_points(&self, function: FunctionId) -> Vec<InstructionId> {
        self.program
            .function(function)
            .instructions()
            .filter(|&id| self.program.instruction(id).kind.is_exit())
            .collect()
    }

    pub fn method_of(&self, instruction: InstructionId) -> FunctionId {
        self.program.parent(instruction)
    }

    pub fn statements_of(&self, function: FunctionId) -> Vec<InstructionId> {
        self.program.function(function).instructions().collect()
    }
}

use std::fmt;

use crate::{Callee, FunctionId, InstructionId, InstructionKind, Operand, Program, Type};

impl Program {
    /// Formats the whole program as a listing that [crate::parse] accepts.
    pub fn display(&self) -> ProgramDisplay<'_> {
        ProgramDisplay { program: self }
    }

    pub fn display_function(&self, function: FunctionId) -> FunctionDisplay<'_> {
        FunctionDisplay {
            program: self,
            function,
        }
    }

    pub fn display_instruction(&self, instruction: InstructionId) -> InstructionDisplay<'_> {
        InstructionDisplay {
            program: self,
            instruction,
        }
    }

    pub fn display_operand(&self, function: FunctionId, operand: &Operand) -> OperandDisplay<'_> {
        OperandDisplay {
            program: self,
            function,
            operand: operand.clone(),
        }
    }
}

pub struct ProgramDisplay<'a> {
    program: &'a Program,
}

impl fmt::Display for ProgramDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self.program.types();
        writeln!(f, "package {}", self.program.package().name())?;

        for id in types.ids() {
            if let Type::Named(named) = types.ty(id) {
                if let Some(underlying) = named.underlying {
                    write!(f, "\ntype {} {}\n", named.name, types.display(underlying))?;
                }
            }
        }

        for (id, _) in self.program.functions() {
            write!(f, "\n{}", self.program.display_function(id))?;
        }
        Ok(())
    }
}

pub struct FunctionDisplay<'a> {
    program: &'a Program,
    function: FunctionId,
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program;
        let types = program.types();
        let function = program.function(self.function);

        if function.synthetic().is_some() && function.name() != "init" {
            f.write_str("synthetic ")?;
        }
        f.write_str("func ")?;

        let mut params = function.params();
        let mut name = function.name();
        if function.receiver().is_some() {
            if let Some((receiver, rest)) = params.split_first() {
                write!(f, "({} {}) ", receiver.name, types.display(receiver.ty))?;
                params = rest;
            }
            name = name.rsplit_once('.').map_or(name, |(_, method)| method);
        }

        write!(f, "{name}(")?;
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", param.name, types.display(param.ty))?;
        }
        f.write_str(")")?;
        if let Some(result) = function.result() {
            write!(f, " {}", types.display(result))?;
        }

        if function.is_external() {
            return writeln!(f);
        }

        writeln!(f, " {{")?;
        for block in function.blocks() {
            match block.comment() {
                Some(comment) => writeln!(f, "{}: {comment}", block.index())?,
                None => writeln!(f, "{}:", block.index())?,
            }
            for &instruction in block.instructions() {
                writeln!(f, "    {}", program.display_instruction(instruction))?;
            }
        }
        writeln!(f, "}}")
    }
}

pub struct InstructionDisplay<'a> {
    program: &'a Program,
    instruction: InstructionId,
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program;
        let instruction = program.instruction(self.instruction);
        let function = instruction.function();
        let operand = |operand: &Operand| program.display_operand(function, operand);
        let block = program.block_of(self.instruction);

        if let Some(name) = instruction.name() {
            write!(f, "{name} = ")?;
        }

        match &instruction.kind {
            InstructionKind::BinOp { op, x, y } => {
                write!(f, "{} {} {}", operand(x), op.symbol(), operand(y))
            }
            InstructionKind::UnOp { op, x } => write!(f, "{}{}", op.symbol(), operand(x)),
            InstructionKind::Phi { edges } => {
                f.write_str("phi [")?;
                for (i, (pred, edge)) in block.preds().iter().zip(edges).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{pred}: {}", operand(edge))?;
                }
                f.write_str("]")
            }
            InstructionKind::Call(call) => {
                match &call.callee {
                    Callee::Static(callee) => {
                        write!(f, "call {}(", program.function(*callee).name())?
                    }
                    Callee::Invoke { receiver, method } => {
                        write!(f, "invoke {}.{method}(", operand(receiver))?
                    }
                    Callee::Builtin(builtin) => write!(f, "call {}(", builtin.name())?,
                }
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", operand(arg))?;
                }
                f.write_str(")")
            }
            InstructionKind::Alloc { local } => {
                let local = &program.function(function).locals()[*local];
                write!(f, "local {}", program.types().display(local.ty))
            }
            InstructionKind::MakeInterface { x } => {
                let ty = instruction.register.as_ref().map(|r| r.ty);
                match ty {
                    Some(ty) => write!(
                        f,
                        "make {} <- {}",
                        program.types().display(ty),
                        operand(x)
                    ),
                    None => write!(f, "make <- {}", operand(x)),
                }
            }
            InstructionKind::Store { addr, value } => {
                write!(f, "*{} = {}", operand(addr), operand(value))
            }
            InstructionKind::If { cond } => match block.succs() {
                [then, otherwise] => write!(f, "if {} goto {then} else {otherwise}", operand(cond)),
                _ => write!(f, "if {}", operand(cond)),
            },
            InstructionKind::Jump => match block.succs().first() {
                Some(target) => write!(f, "jump {target}"),
                None => f.write_str("jump"),
            },
            InstructionKind::Return { value: Some(value) } => {
                write!(f, "return {}", operand(value))
            }
            InstructionKind::Return { value: None } => f.write_str("return"),
            InstructionKind::Panic { value } => write!(f, "panic {}", operand(value)),
        }
    }
}

pub struct OperandDisplay<'a> {
    program: &'a Program,
    function: FunctionId,
    operand: Operand,
}

impl fmt::Display for OperandDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::Const(constant) => write!(
                f,
                "{}:{}",
                constant.value,
                self.program.types().display(constant.ty)
            ),
            Operand::Parameter(index) => {
                match self.program.function(self.function).params().get(*index) {
                    Some(param) => f.write_str(&param.name),
                    None => write!(f, "<param {index}>"),
                }
            }
            Operand::Register(id) => match self.program.instruction(*id).name() {
                Some(name) => f.write_str(name),
                None => write!(f, "<instruction {}>", id.index()),
            },
        }
    }
}

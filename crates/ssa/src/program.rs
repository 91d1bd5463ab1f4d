use std::collections::BTreeMap;

use crate::{Instruction, InstructionId, TypeId, TypeUniverse};

/// Index of a function in its [Program].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) usize);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeId,
}

/// A local storage cell allocated by an [crate::InstructionKind::Alloc] instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub(crate) index: usize,
    pub(crate) comment: Option<String>,
    pub(crate) instructions: Vec<InstructionId>,
    pub(crate) preds: Vec<usize>,
    pub(crate) succs: Vec<usize>,
}

impl BasicBlock {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn instructions(&self) -> &[InstructionId] {
        &self.instructions
    }

    /// Indices of the blocks that may transfer control to this block.
    pub fn preds(&self) -> &[usize] {
        &self.preds
    }

    /// Indices of the blocks this block may transfer control to. For a conditional branch the
    /// first successor is taken when the condition is true.
    pub fn succs(&self) -> &[usize] {
        &self.succs
    }

    pub fn first_instruction(&self) -> Option<InstructionId> {
        self.instructions.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub(crate) name: String,
    pub(crate) params: Vec<Parameter>,
    pub(crate) result: Option<TypeId>,
    pub(crate) locals: Vec<Local>,
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) receiver: Option<TypeId>,
    pub(crate) synthetic: Option<String>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in positional order. The receiver of a method is parameter 0.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn result(&self) -> Option<TypeId> {
        self.result
    }

    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    /// Blocks in order. Block 0 is the entry block.
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&BasicBlock> {
        self.blocks.get(index)
    }

    /// The type this function is declared as a method on.
    pub fn receiver(&self) -> Option<TypeId> {
        self.receiver
    }

    /// Describes why the function was generated rather than written, e.g. `package initializer`.
    pub fn synthetic(&self) -> Option<&str> {
        self.synthetic.as_deref()
    }

    /// A function without a body is provided outside of the program.
    pub fn is_external(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every instruction of every block, in block order.
    pub fn instructions(&self) -> impl Iterator<Item = InstructionId> + '_ {
        self.blocks
            .iter()
            .flat_map(|block| block.instructions.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub(crate) name: String,
    pub(crate) members: BTreeMap<String, FunctionId>,
}

impl Package {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A main package is one named `main`.
    pub fn is_main(&self) -> bool {
        self.name == "main"
    }

    /// Looks up a package level function. Methods are not package members.
    pub fn func(&self, name: &str) -> Option<FunctionId> {
        self.members.get(name).copied()
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, FunctionId)> {
        self.members.iter().map(|(name, &id)| (name.as_str(), id))
    }
}

/// A loaded program. Immutable once built.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) package: Package,
    pub(crate) functions: Vec<Function>,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) types: TypeUniverse,
}

impl Program {
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// The main package, if the program has one.
    pub fn main_package(&self) -> Option<&Package> {
        Some(&self.package).filter(|package| package.is_main())
    }

    pub fn types(&self) -> &TypeUniverse {
        &self.types
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn get_function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0)
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, function)| (FunctionId(i), function))
    }

    pub fn instruction(&self, id: InstructionId) -> &Instruction {
        &self.instructions[id.0]
    }

    pub fn get_instruction(&self, id: InstructionId) -> Option<&Instruction> {
        self.instructions.get(id.0)
    }

    /// The block containing the instruction.
    pub fn block_of(&self, id: InstructionId) -> &BasicBlock {
        let instruction = self.instruction(id);
        &self.function(instruction.function).blocks[instruction.block]
    }

    /// Function containing the instruction.
    pub fn parent(&self, id: InstructionId) -> FunctionId {
        self.instruction(id).function
    }

    /// Type of an operand in the context of the function it appears in.
    pub fn operand_type(&self, function: FunctionId, operand: &crate::Operand) -> Option<TypeId> {
        match operand {
            crate::Operand::Const(constant) => Some(constant.ty),
            crate::Operand::Parameter(index) => {
                self.function(function).params.get(*index).map(|p| p.ty)
            }
            crate::Operand::Register(id) => self.instruction(*id).register.as_ref().map(|r| r.ty),
        }
    }

    /// Resolves the method `name` of the concrete type `ty`.
    pub fn lookup_method(&self, ty: TypeId, name: &str) -> Option<FunctionId> {
        self.types.lookup_method(ty, name)
    }
}

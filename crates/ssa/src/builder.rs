use std::collections::{BTreeMap, HashMap};

use crate::{
    BasicBlock, Builtin, CallCommon, Callee, Constant, Error, Function, FunctionId, Instruction,
    InstructionId, InstructionKind, Local, Method, Operand, Package, Parameter, Program, Register,
    Result, Signature, TypeId, TypeUniverse,
};
use crate::{BinaryOp, UnaryOp};

/// An operand before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSpec {
    Const(Constant),

    /// A parameter or register name.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalleeSpec {
    /// A function or method (`T.Method`) of the package, or a builtin.
    Function(String),
    Invoke { receiver: ValueSpec, method: String },
}

/// An instruction before name resolution. Blocks are referenced by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionSpec {
    BinOp {
        op: BinaryOp,
        x: ValueSpec,
        y: ValueSpec,
    },
    UnOp {
        op: UnaryOp,
        x: ValueSpec,
    },

    /// Edges keyed by predecessor block index, in any order.
    Phi {
        edges: Vec<(usize, ValueSpec)>,
    },
    Call {
        callee: CalleeSpec,
        args: Vec<ValueSpec>,
    },
    Alloc {
        ty: TypeId,
    },
    MakeInterface {
        interface: TypeId,
        x: ValueSpec,
    },
    Store {
        addr: ValueSpec,
        value: ValueSpec,
    },
    If {
        cond: ValueSpec,
        then_block: usize,
        else_block: usize,
    },
    Jump {
        target: usize,
    },
    Return {
        value: Option<ValueSpec>,
    },
    Panic {
        value: ValueSpec,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSpec {
    pub register: Option<String>,
    pub instruction: InstructionSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockSpec {
    pub comment: Option<String>,
    pub statements: Vec<StatementSpec>,
}

/// Receiver of a method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSpec {
    pub name: String,

    /// The named type the method is declared on.
    pub named: TypeId,
    pub pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub receiver: Option<ReceiverSpec>,
    pub params: Vec<Parameter>,
    pub result: Option<TypeId>,
    pub synthetic: Option<String>,
}

/// Incrementally assembles a [Program]. Functions are declared first and their bodies resolved
/// when the program is built, so bodies may reference functions declared later.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    package: Option<String>,
    types: TypeUniverse,
    functions: Vec<Function>,
    bodies: Vec<Option<Vec<BlockSpec>>>,
    by_name: HashMap<String, FunctionId>,
    members: BTreeMap<String, FunctionId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        match &self.package {
            Some(existing) if *existing != name => Err(Error::Build(format!(
                "found packages {existing} and {name}"
            ))),
            _ => {
                self.package = Some(name);
                Ok(())
            }
        }
    }

    pub fn types(&self) -> &TypeUniverse {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeUniverse {
        &mut self.types
    }

    pub fn function_id(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    /// Declares a function signature. Methods are registered with their receiver type under the
    /// name `Type.Method` and are not package members.
    pub fn declare(&mut self, decl: FunctionDecl) -> Result<FunctionId> {
        let id = FunctionId(self.functions.len());
        let mut params = Vec::with_capacity(decl.params.len() + 1);
        let (name, receiver) = match &decl.receiver {
            Some(receiver) => {
                let type_name = self.types.display(receiver.named).to_string();
                let ty = if receiver.pointer {
                    self.types.pointer(receiver.named)
                } else {
                    receiver.named
                };
                params.push(Parameter {
                    name: receiver.name.clone(),
                    ty,
                });
                self.types.add_method(
                    receiver.named,
                    Method {
                        name: decl.name.clone(),
                        function: id,
                        signature: Signature {
                            params: decl.params.iter().map(|p| p.ty).collect(),
                            result: decl.result,
                        },
                        pointer_receiver: receiver.pointer,
                    },
                )?;
                (format!("{type_name}.{method}", method = decl.name), Some(receiver.named))
            }
            None => (decl.name.clone(), None),
        };
        params.extend(decl.params);

        if self.by_name.contains_key(&name) {
            return Err(Error::Build(format!("function {name} redeclared")));
        }
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(Error::Build(format!(
                    "duplicate parameter {param} in {name}",
                    param = param.name
                )));
            }
        }

        let synthetic = decl.synthetic.or_else(|| {
            (receiver.is_none() && name == "init").then(|| "package initializer".to_owned())
        });

        if receiver.is_none() {
            self.members.insert(name.clone(), id);
        }
        self.by_name.insert(name.clone(), id);
        self.functions.push(Function {
            name,
            params,
            result: decl.result,
            locals: Vec::new(),
            blocks: Vec::new(),
            receiver,
            synthetic,
        });
        self.bodies.push(None);

        Ok(id)
    }

    pub fn define(&mut self, id: FunctionId, blocks: Vec<BlockSpec>) -> Result<()> {
        let body = self
            .bodies
            .get_mut(id.0)
            .ok_or_else(|| Error::InternalError(format!("undeclared function {id:?}")))?;
        if body.is_some() {
            return Err(Error::Build(format!(
                "function {name} has multiple bodies",
                name = self.functions[id.0].name
            )));
        }
        *body = Some(blocks);
        Ok(())
    }

    pub fn build(mut self) -> Result<Program> {
        let package = self.package.take().ok_or(Error::NoPackage)?;
        if let Some(name) = self.types.undefined_names().next() {
            return Err(Error::Build(format!("undefined type {name}")));
        }

        let mut instructions = Vec::new();
        let bodies = std::mem::take(&mut self.bodies);
        for (i, body) in bodies.into_iter().enumerate() {
            if let Some(blocks) = body {
                self.lower(FunctionId(i), blocks, &mut instructions)?;
            }
        }

        Ok(Program {
            package: Package {
                name: package,
                members: self.members,
            },
            functions: self.functions,
            instructions,
            types: self.types,
        })
    }

    fn lower(
        &mut self,
        function: FunctionId,
        specs: Vec<BlockSpec>,
        instructions: &mut Vec<Instruction>,
    ) -> Result<()> {
        let name = self.functions[function.0].name.clone();
        let fail = |message: String| Error::Build(format!("{name}: {message}"));

        // Control flow edges follow from the block terminators
        let mut succs = vec![Vec::new(); specs.len()];
        for (b, block) in specs.iter().enumerate() {
            let count = block.statements.len();
            if count == 0 {
                return Err(fail(format!("block {b} is empty")));
            }
            for (i, statement) in block.statements.iter().enumerate() {
                let targets = match &statement.instruction {
                    InstructionSpec::If {
                        then_block,
                        else_block,
                        ..
                    } => vec![*then_block, *else_block],
                    InstructionSpec::Jump { target } => vec![*target],
                    InstructionSpec::Return { .. } | InstructionSpec::Panic { .. } => Vec::new(),
                    _ if i + 1 == count => {
                        return Err(fail(format!("block {b} does not end in a control instruction")))
                    }
                    _ => continue,
                };
                if i + 1 != count {
                    return Err(fail(format!(
                        "control instruction is not last in block {b}"
                    )));
                }
                if let Some(target) = targets.iter().find(|&&t| t >= specs.len()) {
                    return Err(fail(format!("block {b} jumps to missing block {target}")));
                }
                succs[b] = targets;
            }
        }

        let mut preds = vec![Vec::new(); specs.len()];
        for (b, targets) in succs.iter().enumerate() {
            for &target in targets {
                preds[target].push(b);
            }
        }

        // Assign instruction ids so that registers may be referenced before their definition
        let base = instructions.len();
        let mut registers = HashMap::new();
        let mut next = base;
        for block in &specs {
            for statement in &block.statements {
                if let Some(register) = &statement.register {
                    if self.functions[function.0]
                        .params
                        .iter()
                        .any(|p| p.name == *register)
                    {
                        return Err(fail(format!("register {register} shadows a parameter")));
                    }
                    if registers
                        .insert(register.clone(), InstructionId(next))
                        .is_some()
                    {
                        return Err(fail(format!("register {register} defined more than once")));
                    }
                }
                next += 1;
            }
        }

        let scope = Scope {
            params: &self.functions[function.0].params,
            registers: &registers,
        };

        let mut locals = Vec::new();
        let mut lowered = Vec::with_capacity(next - base);
        for (b, block) in specs.iter().enumerate() {
            for statement in &block.statements {
                let kind = match &statement.instruction {
                    InstructionSpec::BinOp { op, x, y } => InstructionKind::BinOp {
                        op: *op,
                        x: scope.resolve(x).map_err(&fail)?,
                        y: scope.resolve(y).map_err(&fail)?,
                    },
                    InstructionSpec::UnOp { op, x } => InstructionKind::UnOp {
                        op: *op,
                        x: scope.resolve(x).map_err(&fail)?,
                    },
                    InstructionSpec::Phi { edges } => {
                        if edges.len() != preds[b].len() {
                            return Err(fail(format!(
                                "phi in block {b} has {count} edges for {expected} predecessors",
                                count = edges.len(),
                                expected = preds[b].len()
                            )));
                        }
                        let mut ordered = Vec::with_capacity(edges.len());
                        let mut remaining: Vec<_> = edges.iter().collect();
                        for pred in &preds[b] {
                            let position = remaining
                                .iter()
                                .position(|(block, _)| block == pred)
                                .ok_or_else(|| {
                                    fail(format!("phi in block {b} has no edge for block {pred}"))
                                })?;
                            let (_, value) = remaining.remove(position);
                            ordered.push(scope.resolve(value).map_err(&fail)?);
                        }
                        InstructionKind::Phi { edges: ordered }
                    }
                    InstructionSpec::Call { callee, args } => {
                        let callee = match callee {
                            CalleeSpec::Function(name) => match self.by_name.get(name) {
                                Some(&id) => Callee::Static(id),
                                None => Builtin::from_name(name)
                                    .map(Callee::Builtin)
                                    .ok_or_else(|| fail(format!("undefined function {name}")))?,
                            },
                            CalleeSpec::Invoke { receiver, method } => Callee::Invoke {
                                receiver: scope.resolve(receiver).map_err(&fail)?,
                                method: method.clone(),
                            },
                        };
                        let args = args
                            .iter()
                            .map(|arg| scope.resolve(arg))
                            .collect::<std::result::Result<Vec<_>, _>>()
                            .map_err(&fail)?;
                        if let Callee::Static(id) = &callee {
                            let target = &self.functions[id.0];
                            if target.params.len() != args.len() {
                                return Err(fail(format!(
                                    "{callee} expects {expected} arguments, got {count}",
                                    callee = target.name,
                                    count = args.len(),
                                    expected = target.params.len()
                                )));
                            }
                        }
                        InstructionKind::Call(CallCommon { callee, args })
                    }
                    InstructionSpec::Alloc { ty } => {
                        let register = statement
                            .register
                            .clone()
                            .ok_or_else(|| fail("local is not assigned to a register".into()))?;
                        locals.push(Local {
                            name: register,
                            ty: *ty,
                        });
                        InstructionKind::Alloc {
                            local: locals.len() - 1,
                        }
                    }
                    InstructionSpec::MakeInterface { x, .. } => InstructionKind::MakeInterface {
                        x: scope.resolve(x).map_err(&fail)?,
                    },
                    InstructionSpec::Store { addr, value } => InstructionKind::Store {
                        addr: scope.resolve(addr).map_err(&fail)?,
                        value: scope.resolve(value).map_err(&fail)?,
                    },
                    InstructionSpec::If { cond, .. } => InstructionKind::If {
                        cond: scope.resolve(cond).map_err(&fail)?,
                    },
                    InstructionSpec::Jump { .. } => InstructionKind::Jump,
                    InstructionSpec::Return { value } => InstructionKind::Return {
                        value: value
                            .as_ref()
                            .map(|value| scope.resolve(value))
                            .transpose()
                            .map_err(&fail)?,
                    },
                    InstructionSpec::Panic { value } => InstructionKind::Panic {
                        value: scope.resolve(value).map_err(&fail)?,
                    },
                };
                lowered.push(kind);
            }
        }

        let statements: Vec<_> = specs.iter().flat_map(|block| &block.statements).collect();
        let types = self.infer_types(function, base, &statements, &lowered, &locals)?;

        // Dynamic dispatch is only defined on interface receivers
        for kind in &lowered {
            let InstructionKind::Call(CallCommon {
                callee: Callee::Invoke { receiver, method },
                args,
            }) = kind
            else {
                continue;
            };
            let receiver = match receiver {
                Operand::Const(constant) => Some(constant.ty),
                Operand::Parameter(index) => {
                    self.functions[function.0].params.get(*index).map(|p| p.ty)
                }
                Operand::Register(id) => types[id.0 - base],
            };
            let Some(ty) = receiver else {
                continue;
            };
            let ty_name = self.types.display(ty).to_string();
            if !self.types.is_interface(ty) {
                return Err(fail(format!(
                    "cannot invoke {method} on non-interface type {ty_name}"
                )));
            }
            let signature = self
                .types
                .method_signature(ty, method)
                .ok_or_else(|| fail(format!("type {ty_name} has no method {method}")))?;
            if signature.params.len() != args.len() {
                return Err(fail(format!(
                    "{method} expects {expected} arguments, got {count}",
                    count = args.len(),
                    expected = signature.params.len()
                )));
            }
        }

        let mut blocks = Vec::with_capacity(specs.len());
        let mut kinds = lowered.into_iter();
        let mut types = types.into_iter();
        for (b, block) in specs.into_iter().enumerate() {
            let mut ids = Vec::with_capacity(block.statements.len());
            for (index, statement) in block.statements.into_iter().enumerate() {
                let kind = kinds
                    .next()
                    .ok_or_else(|| Error::InternalError("instruction count mismatch".into()))?;
                let ty = types.next().flatten();
                let register = match (statement.register, ty) {
                    (Some(name), Some(ty)) => Some(Register { name, ty }),
                    (Some(name), None) => {
                        return Err(fail(format!("{name} does not produce a value")))
                    }
                    (None, _) => None,
                };
                ids.push(InstructionId(instructions.len()));
                instructions.push(Instruction {
                    kind,
                    register,
                    function,
                    block: b,
                    index,
                });
            }
            blocks.push(BasicBlock {
                index: b,
                comment: block.comment,
                instructions: ids,
                preds: std::mem::take(&mut preds[b]),
                succs: std::mem::take(&mut succs[b]),
            });
        }

        let target = &mut self.functions[function.0];
        target.blocks = blocks;
        target.locals = locals;
        Ok(())
    }

    /// Infers the type of every register. Phi edges may reference registers defined later in
    /// the listing, so inference repeats until no more types can be resolved.
    fn infer_types(
        &mut self,
        function: FunctionId,
        base: usize,
        statements: &[&StatementSpec],
        kinds: &[InstructionKind],
        locals: &[Local],
    ) -> Result<Vec<Option<TypeId>>> {
        let name = &self.functions[function.0].name;
        let params: Vec<TypeId> = self.functions[function.0]
            .params
            .iter()
            .map(|p| p.ty)
            .collect();
        let mut types: Vec<Option<TypeId>> = vec![None; kinds.len()];

        loop {
            let mut progress = false;
            for (i, kind) in kinds.iter().enumerate() {
                if types[i].is_some() || statements[i].register.is_none() {
                    continue;
                }

                let operand_type = |operand: &Operand| match operand {
                    Operand::Const(constant) => Some(constant.ty),
                    Operand::Parameter(index) => params.get(*index).copied(),
                    Operand::Register(id) => types[id.0 - base],
                };

                let ty = match kind {
                    InstructionKind::BinOp { op, .. } if op.is_comparison() => {
                        Some(self.types.bool())
                    }
                    InstructionKind::BinOp { x, y, .. } => {
                        operand_type(x).or_else(|| operand_type(y))
                    }
                    InstructionKind::UnOp {
                        op: UnaryOp::Not, ..
                    } => Some(self.types.bool()),
                    InstructionKind::UnOp {
                        op: UnaryOp::Neg,
                        x,
                    } => operand_type(x),
                    InstructionKind::UnOp {
                        op: UnaryOp::Deref,
                        x,
                    } => match operand_type(x) {
                        Some(ty) => Some(self.types.pointer_elem(ty).ok_or_else(|| {
                            Error::Build(format!(
                                "{name}: cannot dereference {value} of type {ty}",
                                value = statements[i].register.as_deref().unwrap_or_default(),
                                ty = self.types.display(ty)
                            ))
                        })?),
                        None => None,
                    },
                    InstructionKind::Phi { edges } => edges.iter().find_map(operand_type),
                    InstructionKind::Call(call) => {
                        let result = match &call.callee {
                            Callee::Static(callee) => Some(self.functions[callee.0].result),
                            Callee::Invoke { receiver, method } => match operand_type(receiver) {
                                Some(ty) => Some(
                                    self.types
                                        .method_signature(ty, method)
                                        .ok_or_else(|| {
                                            Error::Build(format!(
                                                "{name}: type {ty} has no method {method}",
                                                ty = self.types.display(ty)
                                            ))
                                        })?
                                        .result,
                                ),
                                None => None,
                            },
                            Callee::Builtin(_) => Some(None),
                        };
                        match result {
                            Some(None) => {
                                return Err(Error::Build(format!(
                                    "{name}: call assigned to {register} has no result",
                                    register =
                                        statements[i].register.as_deref().unwrap_or_default()
                                )))
                            }
                            Some(result) => result,
                            None => None,
                        }
                    }
                    InstructionKind::Alloc { local } => Some(self.types.pointer(locals[*local].ty)),
                    InstructionKind::MakeInterface { .. } => match &statements[i].instruction {
                        InstructionSpec::MakeInterface { interface, .. } => {
                            if !self.types.is_interface(*interface) {
                                return Err(Error::Build(format!(
                                    "{name}: {ty} is not an interface",
                                    ty = self.types.display(*interface)
                                )));
                            }
                            Some(*interface)
                        }
                        _ => {
                            return Err(Error::InternalError(
                                "instruction kind does not match its specification".into(),
                            ))
                        }
                    },
                    InstructionKind::Store { .. }
                    | InstructionKind::If { .. }
                    | InstructionKind::Jump
                    | InstructionKind::Return { .. }
                    | InstructionKind::Panic { .. } => {
                        return Err(Error::Build(format!(
                            "{name}: {register} does not produce a value",
                            register = statements[i].register.as_deref().unwrap_or_default()
                        )))
                    }
                };

                if let Some(ty) = ty {
                    types[i] = Some(ty);
                    progress = true;
                }
            }

            if !progress {
                break;
            }
        }

        let unresolved =
            (0..kinds.len()).find(|&i| statements[i].register.is_some() && types[i].is_none());
        if let Some(i) = unresolved {
            return Err(Error::Build(format!(
                "{name}: cannot infer the type of {register}",
                register = statements[i].register.as_deref().unwrap_or_default()
            )));
        }

        Ok(types)
    }
}

struct Scope<'a> {
    params: &'a [Parameter],
    registers: &'a HashMap<String, InstructionId>,
}

impl Scope<'_> {
    fn resolve(&self, value: &ValueSpec) -> std::result::Result<Operand, String> {
        match value {
            ValueSpec::Const(constant) => Ok(Operand::Const(constant.clone())),
            ValueSpec::Name(name) => {
                if let Some(index) = self.params.iter().position(|p| p.name == *name) {
                    Ok(Operand::Parameter(index))
                } else {
                    self.registers
                        .get(name)
                        .map(|&id| Operand::Register(id))
                        .ok_or_else(|| format!("undefined value {name}"))
                }
            }
        }
    }
}

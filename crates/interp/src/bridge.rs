use std::path::Path;
use std::rc::Rc;

use ssa::{CallGraph, FunctionId, Program};

use crate::api::Api;
use crate::config::Config;
use crate::interpreter::Interpreter;
use crate::query::{ApplicationGraph, TypeQueries};
use crate::registry::Handle;
use crate::value::Value;
use crate::{Error, Result};

/// Everything a host needs for one analysis session: the loaded program, its call graph and an
/// interpreter. Entities are exchanged with the host as [Handle]s.
#[derive(Debug)]
pub struct Bridge {
    program: Rc<Program>,
    call_graph: CallGraph,
    interpreter: Interpreter,
    config: Config,
    calls: u64,
}

impl Bridge {
    /// Loads the listing at `file` and prepares to interpret `entrypoint` of its main package.
    pub fn initialize(file: impl AsRef<Path>, entrypoint: &str, debug: bool) -> Result<Self> {
        let config = if debug {
            Config::debug()
        } else {
            Config::default()
        };
        let program = ssa::load(file)?;
        Self::with_config(program, entrypoint, config)
    }

    pub fn with_config(
        program: Program,
        entrypoint: impl Into<String>,
        config: Config,
    ) -> Result<Self> {
        let entrypoint = entrypoint.into();
        let main = program
            .main_package()
            .ok_or_else(|| ssa::Error::NoMainPackage(program.package().name().to_owned()))?;
        if main.func(&entrypoint).is_none() {
            return Err(Error::EntryNotFound(entrypoint));
        }

        if config.dump_ssa {
            tracing::info!("loaded program\n{}", program.display());
        }

        let mut call_graph = CallGraph::cha(&program);
        call_graph.delete_synthetic_nodes(&program);

        let program = Rc::new(program);
        let interpreter = Interpreter::new(Rc::clone(&program), entrypoint)
            .with_tracing(config.enable_tracing);

        Ok(Self {
            program,
            call_graph,
            interpreter,
            config,
            calls: 0,
        })
    }

    /// Ends the session. Every handle issued by this bridge becomes meaningless.
    pub fn shutdown(self) {
        tracing::debug!(
            calls = self.calls,
            handles = self.interpreter.registry().len(),
            "shutdown"
        );
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Number of calls the host made into this bridge.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn record(&mut self, call: &'static str) {
        self.calls += 1;
        if self.config.debug_log {
            tracing::debug!(call, count = self.calls, "bridge call");
        }
    }

    fn function_handle(&mut self, function: FunctionId) -> Handle {
        self.interpreter.registry_mut().handle(function)
    }

    pub fn main(&mut self) -> Result<Handle> {
        self.record("main");
        let entry = self
            .interpreter
            .entry()
            .ok_or_else(|| Error::EntryNotFound(self.interpreter.entrypoint().to_owned()))?;
        Ok(self.function_handle(entry))
    }

    /// Looks up a package function, or a method by its qualified name such as `Square.Area`.
    pub fn method(&mut self, name: &str) -> Result<Handle> {
        self.record("method");
        let function = self
            .program
            .package()
            .func(name)
            .or_else(|| {
                self.program
                    .functions()
                    .find(|(_, f)| f.name() == name)
                    .map(|(id, _)| id)
            })
            .ok_or_else(|| Error::FunctionNotFound(name.to_owned()))?;
        Ok(self.function_handle(function))
    }

    pub fn predecessors(&mut self, instruction: Handle) -> Result<Vec<Handle>> {
        self.record("predecessors");
        let id = self.interpreter.registry().instruction(instruction)?;
        let found = ApplicationGraph::new(&self.program, &self.call_graph).predecessors(id);
        Ok(self.interpreter.registry_mut().handles(found))
    }

    pub fn successors(&mut self, instruction: Handle) -> Result<Vec<Handle>> {
        self.record("successors");
        let id = self.interpreter.registry().instruction(instruction)?;
        let found = ApplicationGraph::new(&self.program, &self.call_graph).successors(id);
        Ok(self.interpreter.registry_mut().handles(found))
    }

    pub fn callees(&mut self, instruction: Handle) -> Result<Vec<Handle>> {
        self.record("callees");
        let id = self.interpreter.registry().instruction(instruction)?;
        let found = ApplicationGraph::new(&self.program, &self.call_graph).callees(id);
        Ok(self.interpreter.registry_mut().handles(found))
    }

    pub fn callers(&mut self, function: Handle) -> Result<Vec<Handle>> {
        self.record("callers");
        let id = self.interpreter.registry().function(function)?;
        let found = ApplicationGraph::new(&self.program, &self.call_graph).callers(id);
        Ok(self.interpreter.registry_mut().handles(found))
    }

    pub fn entry_points(&mut self, function: Handle) -> Result<Vec<Handle>> {
        self.record("entry_points");
        let id = self.interpreter.registry().function(function)?;
        let found = ApplicationGraph::new(&self.program, &self.call_graph).entry_points(id)?;
        Ok(self.interpreter.registry_mut().handles(found))
    }

    pub fn exit_points(&mut self, function: Handle) -> Result<Vec<Handle>> {
        self.record("exit_points");
        let id = self.interpreter.registry().function(function)?;
        let found = ApplicationGraph::new(&self.program, &self.call_graph).exit_points(id);
        Ok(self.interpreter.registry_mut().handles(found))
    }

    pub fn method_of(&mut self, instruction: Handle) -> Result<Handle> {
        self.record("method_of");
        let id = self.interpreter.registry().instruction(instruction)?;
        let function = ApplicationGraph::new(&self.program, &self.call_graph).method_of(id);
        Ok(self.function_handle(function))
    }

    pub fn statements_of(&mut self, function: Handle) -> Result<Vec<Handle>> {
        self.record("statements_of");
        let id = self.interpreter.registry().function(function)?;
        let found = ApplicationGraph::new(&self.program, &self.call_graph).statements_of(id);
        Ok(self.interpreter.registry_mut().handles(found))
    }

    /// Number of parameters and number of locals of a function. Locals count both allocated
    /// storage cells and registers.
    pub fn method_info(&mut self, function: Handle) -> Result<(usize, usize)> {
        self.record("method_info");
        let id = self.interpreter.registry().function(function)?;
        let function = self.program.function(id);
        let registers = function
            .instructions()
            .filter(|&i| self.program.instruction(i).register.is_some())
            .count();
        Ok((function.params().len(), function.locals().len() + registers))
    }

    pub fn any_type(&mut self) -> Handle {
        self.record("any_type");
        let any = TypeQueries::new(self.program.types()).any_type();
        self.interpreter.registry_mut().handle(any)
    }

    pub fn find_sub_types(&mut self, ty: Handle) -> Result<Vec<Handle>> {
        self.record("find_sub_types");
        let id = self.interpreter.registry().ty(ty)?;
        let found = TypeQueries::new(self.program.types()).find_sub_types(id);
        Ok(self.interpreter.registry_mut().handles(found))
    }

    pub fn is_instantiable(&mut self, ty: Handle) -> Result<bool> {
        self.record("is_instantiable");
        let id = self.interpreter.registry().ty(ty)?;
        Ok(TypeQueries::new(self.program.types()).is_instantiable(id))
    }

    pub fn is_final(&mut self, ty: Handle) -> Result<bool> {
        self.record("is_final");
        let id = self.interpreter.registry().ty(ty)?;
        Ok(TypeQueries::new(self.program.types()).is_final(id))
    }

    pub fn has_common_subtype(&mut self, ty: Handle, others: &[Handle]) -> Result<bool> {
        self.record("has_common_subtype");
        let registry = self.interpreter.registry();
        let id = registry.ty(ty)?;
        let others = others
            .iter()
            .map(|&other| registry.ty(other))
            .collect::<Result<Vec<_>>>()?;
        Ok(TypeQueries::new(self.program.types()).has_common_subtype(id, &others))
    }

    pub fn is_supertype(&mut self, ty: Handle, sub: Handle) -> Result<bool> {
        self.record("is_supertype");
        let registry = self.interpreter.registry();
        let (ty, sub) = (registry.ty(ty)?, registry.ty(sub)?);
        Ok(TypeQueries::new(self.program.types()).is_supertype(ty, sub))
    }

    pub fn start(&mut self, api: &mut dyn Api) -> i32 {
        self.record("start");
        self.interpreter.start(api)
    }

    /// Reports `instruction` and returns the handle of the lexically next instruction, or
    /// [Handle::NIL] if there is none.
    pub fn step(&mut self, api: &mut dyn Api, instruction: Handle) -> Result<Handle> {
        self.record("step");
        let id = self.interpreter.registry().instruction(instruction)?;
        let next = self.interpreter.step(api, id)?;
        Ok(next.map_or(Handle::NIL, |next| {
            self.interpreter.registry_mut().handle(next)
        }))
    }

    pub fn frame_step(&mut self, api: &mut dyn Api) -> bool {
        self.record("frame_step");
        self.interpreter.frame_step(api)
    }

    pub fn result(&self) -> Option<&Value> {
        self.interpreter.result()
    }
}

use std::collections::BTreeMap;

use crate::{Callee, FunctionId, InstructionId, InstructionKind, Program, Type, TypeId};

/// A call from the instruction `site` of `caller` to `callee`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub caller: FunctionId,
    pub site: InstructionId,
    pub callee: FunctionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    incoming: Vec<Edge>,
    outgoing: Vec<Edge>,
}

impl Node {
    pub fn incoming(&self) -> &[Edge] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[Edge] {
        &self.outgoing
    }
}

/// Call graph over the functions of a [Program].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    nodes: BTreeMap<FunctionId, Node>,
}

impl CallGraph {
    /// Builds the call graph using class hierarchy analysis. A dynamic call of method `M` on an
    /// interface `I` may reach `M` of every named type `T` such that `T` or `*T` implements `I`.
    pub fn cha(program: &Program) -> Self {
        let mut graph = Self::default();
        for (id, _) in program.functions() {
            graph.nodes.entry(id).or_default();
        }

        for (caller, function) in program.functions() {
            for site in function.instructions() {
                let InstructionKind::Call(call) = &program.instruction(site).kind else {
                    continue;
                };

                match &call.callee {
                    Callee::Static(callee) => graph.add_edge(Edge {
                        caller,
                        site,
                        callee: *callee,
                    }),
                    Callee::Invoke { receiver, method } => {
                        let Some(interface) = program.operand_type(caller, receiver) else {
                            continue;
                        };
                        for callee in implementations(program, interface, method) {
                            graph.add_edge(Edge {
                                caller,
                                site,
                                callee,
                            });
                        }
                    }
                    Callee::Builtin(_) => {}
                }
            }
        }

        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges().count(),
            "built call graph"
        );
        graph
    }

    fn add_edge(&mut self, edge: Edge) {
        let outgoing = &mut self.nodes.entry(edge.caller).or_default().outgoing;
        if outgoing.contains(&edge) {
            return;
        }
        outgoing.push(edge);
        self.nodes.entry(edge.callee).or_default().incoming.push(edge);
    }

    fn remove_edge(&mut self, edge: &Edge) {
        if let Some(node) = self.nodes.get_mut(&edge.caller) {
            node.outgoing.retain(|e| e != edge);
        }
        if let Some(node) = self.nodes.get_mut(&edge.callee) {
            node.incoming.retain(|e| e != edge);
        }
    }

    /// Removes every synthetic function from the graph. Each caller of a synthetic function is
    /// connected directly to each of its callees through the original call site.
    pub fn delete_synthetic_nodes(&mut self, program: &Program) {
        let synthetic: Vec<FunctionId> = self
            .nodes
            .keys()
            .copied()
            .filter(|&id| program.function(id).synthetic().is_some())
            .collect();

        for id in synthetic {
            let Some(node) = self.nodes.get(&id).cloned() else {
                continue;
            };

            for incoming in node.incoming.iter().filter(|e| e.caller != id) {
                for outgoing in node.outgoing.iter().filter(|e| e.callee != id) {
                    self.add_edge(Edge {
                        caller: incoming.caller,
                        site: incoming.site,
                        callee: outgoing.callee,
                    });
                }
            }
            for edge in node.incoming.iter().chain(node.outgoing.iter()) {
                self.remove_edge(edge);
            }
            self.nodes.remove(&id);

            tracing::trace!(function = program.function(id).name(), "deleted synthetic node");
        }
    }

    pub fn node(&self, function: FunctionId) -> Option<&Node> {
        self.nodes.get(&function)
    }

    pub fn contains(&self, function: FunctionId) -> bool {
        self.nodes.contains_key(&function)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (FunctionId, &Node)> {
        self.nodes.iter().map(|(&id, node)| (id, node))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.nodes.values().flat_map(|node| node.outgoing.iter())
    }

    /// Functions that may be called from the call instruction `site`.
    pub fn callees_at(&self, site: InstructionId) -> Vec<FunctionId> {
        self.edges()
            .filter(|edge| edge.site == site)
            .map(|edge| edge.callee)
            .collect()
    }

    /// Call sites that may reach `function`.
    pub fn call_sites(&self, function: FunctionId) -> Vec<InstructionId> {
        self.nodes
            .get(&function)
            .map(|node| node.incoming.iter().map(|edge| edge.site).collect())
            .unwrap_or_default()
    }
}

/// The methods named `method` of every concrete named type whose pointer method set satisfies
/// `interface`.
fn implementations(program: &Program, interface: TypeId, method: &str) -> Vec<FunctionId> {
    let types = program.types();
    let Type::Interface(required) = types.ty(types.underlying(interface)) else {
        return Vec::new();
    };

    let mut callees = Vec::new();
    for id in types.ids() {
        let Type::Named(named) = types.ty(id) else {
            continue;
        };
        if types.is_interface(id) {
            continue;
        }

        let satisfied = required.iter().all(|spec| {
            named
                .methods
                .iter()
                .any(|m| m.name == spec.name && m.signature == spec.signature)
        });
        if !satisfied {
            continue;
        }

        if let Some(found) = named.methods.iter().find(|m| m.name == method) {
            if !callees.contains(&found.function) {
                callees.push(found.function);
            }
        }
    }
    callees
}

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Error, FunctionId, Result};

/// Index of a type in the [TypeUniverse]. Two types are identical if and only if their ids are
/// equal, since every type is interned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Predeclared types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicKind {
    Int,
    Bool,
    String,
}

impl BasicKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(BasicKind::Int),
            "bool" => Some(BasicKind::Bool),
            "string" => Some(BasicKind::String),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Int => "int",
            BasicKind::Bool => "bool",
            BasicKind::String => "string",
        }
    }
}

/// Parameter and result types of a function or interface method. Receivers are not part of the
/// signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub params: Vec<TypeId>,
    pub result: Option<TypeId>,
}

/// A method required by an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSpec {
    pub name: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
}

/// A concrete method declared on a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub function: FunctionId,
    pub signature: Signature,

    /// Methods with a pointer receiver are only in the method set of `*T`, never of `T`.
    pub pointer_receiver: bool,
}

/// A named type. Named types are identified by name alone.
#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: String,

    /// Unset only while the declaration has been referenced but not yet read.
    pub underlying: Option<TypeId>,
    pub methods: Vec<Method>,
}

impl PartialEq for NamedType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for NamedType {}

impl Hash for NamedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicKind),
    Named(NamedType),
    Pointer(TypeId),
    Chan(TypeId),

    /// Method specs are kept sorted by name so that structurally equal interfaces intern to the
    /// same id.
    Interface(Vec<MethodSpec>),
    Struct(Vec<Field>),
}

/// Every type discovered while loading a program.
#[derive(Debug, Clone)]
pub struct TypeUniverse {
    types: Vec<Type>,
    interned: HashMap<Type, TypeId>,
    any: TypeId,
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeUniverse {
    /// Create a universe holding the predeclared types and the empty interface.
    pub fn new() -> Self {
        let mut universe = Self {
            types: Vec::new(),
            interned: HashMap::new(),
            any: TypeId(0),
        };

        universe.intern(Type::Basic(BasicKind::Int));
        universe.intern(Type::Basic(BasicKind::Bool));
        universe.intern(Type::Basic(BasicKind::String));
        universe.any = universe.intern(Type::Interface(Vec::new()));
        universe
    }

    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }

        let id = TypeId(self.types.len());
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        self.intern(Type::Basic(kind))
    }

    pub fn int(&mut self) -> TypeId {
        self.basic(BasicKind::Int)
    }

    pub fn bool(&mut self) -> TypeId {
        self.basic(BasicKind::Bool)
    }

    pub fn string(&mut self) -> TypeId {
        self.basic(BasicKind::String)
    }

    /// The empty interface, implemented by every type.
    pub fn any(&self) -> TypeId {
        self.any
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Pointer(elem))
    }

    pub fn chan(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Chan(elem))
    }

    pub fn interface(&mut self, mut methods: Vec<MethodSpec>) -> TypeId {
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods.dedup_by(|a, b| a.name == b.name);
        self.intern(Type::Interface(methods))
    }

    pub fn structure(&mut self, fields: Vec<Field>) -> TypeId {
        self.intern(Type::Struct(fields))
    }

    /// Returns the id of the named type, creating an undefined declaration if this is the first
    /// reference to it.
    pub fn declare_named(&mut self, name: &str) -> TypeId {
        self.intern(Type::Named(NamedType {
            name: name.to_owned(),
            underlying: None,
            methods: Vec::new(),
        }))
    }

    pub fn define_named(&mut self, id: TypeId, underlying: TypeId) -> Result<()> {
        if self.underlying(underlying) == id {
            return Err(Error::Build(format!(
                "invalid recursive type {name}",
                name = self.display(id)
            )));
        }

        match &mut self.types[id.0] {
            Type::Named(named) if named.underlying.is_none() => {
                named.underlying = Some(underlying);
                Ok(())
            }
            Type::Named(named) => Err(Error::Build(format!(
                "type {name} redeclared",
                name = named.name
            ))),
            _ => Err(Error::InternalError(format!(
                "type {id:?} is not a named type"
            ))),
        }
    }

    pub fn add_method(&mut self, id: TypeId, method: Method) -> Result<()> {
        match &mut self.types[id.0] {
            Type::Named(named) => {
                if named.methods.iter().any(|m| m.name == method.name) {
                    return Err(Error::Build(format!(
                        "method {ty}.{method} redeclared",
                        ty = named.name,
                        method = method.name
                    )));
                }
                named.methods.push(method);
                Ok(())
            }
            _ => Err(Error::Build(format!(
                "invalid receiver type {ty}",
                ty = self.display(id)
            ))),
        }
    }

    /// Named types that were referenced but never declared.
    pub fn undefined_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().filter_map(|ty| match ty {
            Type::Named(named) if named.underlying.is_none() => Some(named.name.as_str()),
            _ => None,
        })
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0)
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(TypeId)
    }

    pub fn named(&self, name: &str) -> Option<TypeId> {
        self.types
            .iter()
            .position(|ty| matches!(ty, Type::Named(named) if named.name == name))
            .map(TypeId)
    }

    /// Follows named types to their underlying type. Undefined names are their own underlying
    /// type.
    pub fn underlying(&self, mut id: TypeId) -> TypeId {
        while let Type::Named(NamedType {
            underlying: Some(underlying),
            ..
        }) = &self.types[id.0]
        {
            id = *underlying;
        }
        id
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.types[self.underlying(id).0], Type::Interface(_))
    }

    /// The element type of a pointer, if this is a pointer.
    pub fn pointer_elem(&self, id: TypeId) -> Option<TypeId> {
        match self.types[self.underlying(id).0] {
            Type::Pointer(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match self.types[self.underlying(id).0] {
            Type::Basic(kind) => Some(kind),
            _ => None,
        }
    }

    /// The methods callable on a value of this type.
    pub fn method_set(&self, id: TypeId) -> Vec<MethodSpec> {
        let spec = |m: &Method| MethodSpec {
            name: m.name.clone(),
            signature: m.signature.clone(),
        };

        if let Type::Interface(methods) = &self.types[self.underlying(id).0] {
            return methods.clone();
        }

        match &self.types[id.0] {
            Type::Named(named) => named
                .methods
                .iter()
                .filter(|m| !m.pointer_receiver)
                .map(spec)
                .collect(),
            Type::Pointer(elem) => match &self.types[elem.0] {
                Type::Named(named) if !self.is_interface(*elem) => {
                    named.methods.iter().map(spec).collect()
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Structural implementation check: the method set of `ty` contains every method of
    /// `interface` with an identical signature.
    pub fn implements(&self, ty: TypeId, interface: TypeId) -> bool {
        let Type::Interface(required) = &self.types[self.underlying(interface).0] else {
            return false;
        };
        if required.is_empty() {
            return true;
        }

        let provided = self.method_set(ty);
        required.iter().all(|r| provided.contains(r))
    }

    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }

    /// A value of type `value` may be assigned to a variable of type `target`.
    pub fn assignable_to(&self, value: TypeId, target: TypeId) -> bool {
        self.identical(value, target)
            || (self.is_interface(target) && self.implements(value, target))
    }

    /// Resolves the concrete method `name` for a receiver of type `ty`.
    pub fn lookup_method(&self, ty: TypeId, name: &str) -> Option<FunctionId> {
        let (named, pointer) = match &self.types[ty.0] {
            Type::Named(named) => (named, false),
            Type::Pointer(elem) => match &self.types[elem.0] {
                Type::Named(named) => (named, true),
                _ => return None,
            },
            _ => return None,
        };

        named
            .methods
            .iter()
            .find(|m| m.name == name && (pointer || !m.pointer_receiver))
            .map(|m| m.function)
    }

    /// Signature of method `name` callable on `ty`, whether `ty` is an interface or concrete.
    pub fn method_signature(&self, ty: TypeId, name: &str) -> Option<Signature> {
        self.method_set(ty)
            .into_iter()
            .find(|m| m.name == name)
            .map(|m| m.signature)
    }

    pub fn display(&self, id: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { universe: self, id }
    }
}

pub struct TypeDisplay<'a> {
    universe: &'a TypeUniverse,
    id: TypeId,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display = |id| self.universe.display(id);
        match self.universe.ty(self.id) {
            Type::Basic(kind) => f.write_str(kind.name()),
            Type::Named(named) => f.write_str(&named.name),
            Type::Pointer(elem) => write!(f, "*{}", display(*elem)),
            Type::Chan(elem) => write!(f, "chan {}", display(*elem)),
            Type::Interface(methods) => {
                if methods.is_empty() {
                    return f.write_str("interface{}");
                }
                f.write_str("interface { ")?;
                for (i, method) in methods.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}(", method.name)?;
                    for (j, param) in method.signature.params.iter().enumerate() {
                        if j > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", display(*param))?;
                    }
                    f.write_str(")")?;
                    if let Some(result) = method.signature.result {
                        write!(f, " {}", display(result))?;
                    }
                }
                f.write_str(" }")
            }
            Type::Struct(fields) => {
                if fields.is_empty() {
                    return f.write_str("struct{}");
                }
                f.write_str("struct { ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{} {}", field.name, display(field.ty))?;
                }
                f.write_str(" }")
            }
        }
    }
}

//! Opaque handles for entities exposed to the host. Handles are small integers issued in order of
//! first request; `0` is never issued and stands for nil.
use std::collections::HashMap;
use std::fmt;

use ssa::{FunctionId, InstructionId, TypeId};

use crate::{Error, Result};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub const NIL: Handle = Handle(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Instruction(InstructionId),
    Function(FunctionId),
    Type(TypeId),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Instruction(_) => EntityKind::Instruction,
            Entity::Function(_) => EntityKind::Function,
            Entity::Type(_) => EntityKind::Type,
        }
    }
}

impl From<InstructionId> for Entity {
    fn from(id: InstructionId) -> Self {
        Entity::Instruction(id)
    }
}

impl From<FunctionId> for Entity {
    fn from(id: FunctionId) -> Self {
        Entity::Function(id)
    }
}

impl From<TypeId> for Entity {
    fn from(id: TypeId) -> Self {
        Entity::Type(id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Instruction,
    Function,
    Type,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Instruction => "instruction",
            EntityKind::Function => "function",
            EntityKind::Type => "type",
        })
    }
}

/// Handle table for a single session. Entries are never evicted, so a handle stays valid until
/// the registry is dropped and the same entity is always given the same handle.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: Vec<Entity>,
    handles: HashMap<Entity, Handle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, entity: impl Into<Entity>) -> Handle {
        let entity = entity.into();
        if let Some(&handle) = self.handles.get(&entity) {
            return handle;
        }

        self.entities.push(entity);
        let handle = Handle(self.entities.len() as u64);
        self.handles.insert(entity, handle);
        handle
    }

    pub fn handles<T: Into<Entity>>(
        &mut self,
        entities: impl IntoIterator<Item = T>,
    ) -> Vec<Handle> {
        entities
            .into_iter()
            .map(|entity| self.handle(entity))
            .collect()
    }

    pub fn get(&self, handle: Handle) -> Option<Entity> {
        let index = usize::try_from(handle.0.checked_sub(1)?).ok()?;
        self.entities.get(index).copied()
    }

    pub fn instruction(&self, handle: Handle) -> Result<InstructionId> {
        match self.get(handle) {
            Some(Entity::Instruction(id)) => Ok(id),
            _ => Err(Error::InvalidHandle {
                handle,
                expected: EntityKind::Instruction,
            }),
        }
    }

    pub fn function(&self, handle: Handle) -> Result<FunctionId> {
        match self.get(handle) {
            Some(Entity::Function(id)) => Ok(id),
            _ => Err(Error::InvalidHandle {
                handle,
                expected: EntityKind::Function,
            }),
        }
    }

    pub fn ty(&self, handle: Handle) -> Result<TypeId> {
        match self.get(handle) {
            Some(Entity::Type(id)) => Ok(id),
            _ => Err(Error::InvalidHandle {
                handle,
                expected: EntityKind::Type,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

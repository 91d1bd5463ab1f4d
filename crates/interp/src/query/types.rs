use ssa::{TypeId, TypeUniverse};

/// Subtype queries over every type discovered while loading the program.
#[derive(Debug, Copy, Clone)]
pub struct TypeQueries<'a> {
    types: &'a TypeUniverse,
}

impl<'a> TypeQueries<'a> {
    pub fn new(types: &'a TypeUniverse) -> Self {
        Self { types }
    }

    /// The empty interface.
    pub fn any_type(&self) -> TypeId {
        self.types.any()
    }

    /// Every discovered type implementing the interface `ty`. Empty if `ty` is not an interface.
    pub fn find_sub_types(&self, ty: TypeId) -> Vec<TypeId> {
        if !self.types.is_interface(ty) {
            return Vec::new();
        }

        self.types
            .ids()
            .filter(|&candidate| self.types.implements(candidate, ty))
            .collect()
    }

    pub fn is_instantiable(&self, ty: TypeId) -> bool {
        !self.types.is_interface(ty)
    }

    pub fn is_final(&self, ty: TypeId) -> bool {
        !self.types.is_interface(ty)
    }

    /// Whether some discovered concrete type is a subtype of `ty` and of every type in `others`.
    pub fn has_common_subtype(&self, ty: TypeId, others: &[TypeId]) -> bool {
        self.types
            .ids()
            .filter(|&candidate| !self.types.is_interface(candidate))
            .any(|candidate| {
                std::iter::once(&ty)
                    .chain(others)
                    .all(|&supertype| self.is_supertype(supertype, candidate))
            })
    }

    /// `sub` is identical to `ty` or assignable to it.
    pub fn is_supertype(&self, ty: TypeId, sub: TypeId) -> bool {
        self.types.identical(ty, sub) || self.types.assignable_to(sub, ty)
    }
}

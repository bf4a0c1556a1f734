// schema.rs: State schema model
//
// `StateDecl` is the state type as the front end describes it: every member,
// readable or not, with per-usage type expressions. `Schema` is the canonical
// form after interning, which the validator checks operations against.
//
// Preconditions: none.
// Postconditions: `Schema` preserves member declaration order.
// Failure modes: none (duplicate names are reported by the validator).
// Side effects: interns member types into the given `TypeTable`.

use crate::id::TypeId;
use crate::types::{TypeExpr, TypeTable};

// ── Front-end declarations ─────────────────────────────────────────────────

/// One member of the state type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub nullable: bool,
    /// Publicly readable (field or accessor).
    pub accessible: bool,
}

impl MemberDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
            accessible: true,
        }
    }

    pub fn private(mut self) -> Self {
        self.accessible = false;
        self
    }
}

/// The state type being diffed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDecl {
    pub name: String,
    /// Overrides equals/hash.
    pub structural_equality: bool,
    pub members: Vec<MemberDecl>,
}

// ── Declared type traits ───────────────────────────────────────────────────

/// What the front end knows about one declared (object) type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredTypeInfo {
    pub name: String,
    pub structural_equality: bool,
}

/// Equality traits of declared types, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct DeclaredTypes {
    types: Vec<DeclaredTypeInfo>,
}

const PLATFORM_STRUCTURAL_TYPES: &[&str] = &[
    "java.lang.String",
    "java.lang.Byte",
    "java.lang.Short",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Character",
    "java.lang.Float",
    "java.lang.Double",
    "java.lang.Boolean",
    "java.util.List",
    "java.util.Set",
    "java.util.Map",
];

impl DeclaredTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library types known to override equals/hash.
    pub fn with_platform_defaults() -> Self {
        let mut types = Self::new();
        for name in PLATFORM_STRUCTURAL_TYPES {
            types.register(*name, true);
        }
        types
    }

    /// Register or replace the traits of a declared type.
    pub fn register(&mut self, name: impl Into<String>, structural_equality: bool) {
        let name = name.into();
        match self.types.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.structural_equality = structural_equality,
            None => self.types.push(DeclaredTypeInfo {
                name,
                structural_equality,
            }),
        }
    }

    pub fn extend(&mut self, other: &DeclaredTypes) {
        for info in &other.types {
            self.register(info.name.clone(), info.structural_equality);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&DeclaredTypeInfo> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Unknown types are treated as lacking structural equality.
    pub fn has_structural_equality(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|t| t.structural_equality)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclaredTypeInfo> {
        self.types.iter()
    }
}

// ── Canonical schema ───────────────────────────────────────────────────────

/// A named, canonically typed value: a schema member or operation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: TypeId,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMember {
    pub field: FieldSpec,
    pub accessible: bool,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub state_name: String,
    pub structural_equality: bool,
    members: Vec<SchemaMember>,
}

impl Schema {
    /// Canonicalize a state declaration.
    pub fn from_decl(decl: &StateDecl, types: &mut TypeTable) -> Self {
        let members = decl
            .members
            .iter()
            .map(|m| SchemaMember {
                field: FieldSpec {
                    name: m.name.clone(),
                    ty: types.intern(&m.ty),
                    nullable: m.nullable,
                },
                accessible: m.accessible,
            })
            .collect();
        Schema {
            state_name: decl.name.clone(),
            structural_equality: decl.structural_equality,
            members,
        }
    }

    /// All members, readable or not, in declaration order.
    pub fn members(&self) -> &[SchemaMember] {
        &self.members
    }

    /// Readable fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.members
            .iter()
            .filter(|m| m.accessible)
            .map(|m| &m.field)
    }

    /// The readable field with this name and type.
    pub fn find(&self, name: &str, ty: TypeId) -> Option<&FieldSpec> {
        self.fields().find(|f| f.name == name && f.ty == ty)
    }

    /// Any member with this name and type, readable or not.
    pub fn find_member(&self, name: &str, ty: TypeId) -> Option<&SchemaMember> {
        self.members
            .iter()
            .find(|m| m.field.name == name && m.field.ty == ty)
    }

    /// Any member with this name, regardless of type.
    pub fn find_by_name(&self, name: &str) -> Option<&SchemaMember> {
        self.members.iter().find(|m| m.field.name == name)
    }
}

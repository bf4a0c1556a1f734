// types.rs: Type expressions and the canonical type table
//
// A `TypeExpr` is per-usage type metadata as a front end hands it over: two
// parameters of the same type carry two independent trees. `TypeTable`
// interns those trees into one canonical `TypeDescriptor` per distinct
// structural type, so every later pass compares types by `TypeId`.
//
// Preconditions: none.
// Postconditions: structurally equal expressions intern to the same TypeId;
//                 ids are allocated in first-interned order.
// Failure modes: none.
// Side effects: none.

use std::collections::HashMap;
use std::fmt;

use crate::id::TypeId;

// ── Primitives ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
    Boolean,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Byte,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Char,
        Primitive::Float,
        Primitive::Double,
        Primitive::Boolean,
    ];

    pub fn from_keyword(s: &str) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| p.keyword() == s)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Char => "char",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Boolean => "boolean",
        }
    }

    pub fn kind(self) -> TypeKind {
        match self {
            Primitive::Byte | Primitive::Short | Primitive::Int | Primitive::Long => {
                TypeKind::IntegerPrimitive
            }
            Primitive::Float => TypeKind::FloatPrimitive,
            Primitive::Double => TypeKind::DoublePrimitive,
            Primitive::Boolean => TypeKind::BooleanPrimitive,
            Primitive::Char => TypeKind::OtherPrimitive,
        }
    }
}

/// Coarse classification used by equality selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    IntegerPrimitive,
    FloatPrimitive,
    DoublePrimitive,
    BooleanPrimitive,
    OtherPrimitive,
    Array,
    Declared,
}

// ── Type expressions (uncanonical) ─────────────────────────────────────────

/// A type as written at one usage site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Primitive(Primitive),
    Array(Box<TypeExpr>),
    /// Object type by qualified name, with generic arguments.
    Declared { name: String, args: Vec<TypeExpr> },
}

impl TypeExpr {
    pub fn declared(name: impl Into<String>) -> Self {
        TypeExpr::Declared {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Declared {
            name: name.into(),
            args,
        }
    }

    pub fn array_of(elem: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(elem))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(p) => write!(f, "{}", p.keyword()),
            TypeExpr::Array(elem) => write!(f, "{}[]", elem),
            TypeExpr::Declared { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
        }
    }
}

// ── Canonical descriptors ──────────────────────────────────────────────────

/// The one canonical description of a structural type. Children are
/// referenced by `TypeId`, so equality of descriptors is shallow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    Array(TypeId),
    Declared { name: String, args: Vec<TypeId> },
}

impl TypeDescriptor {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDescriptor::Primitive(p) => p.kind(),
            TypeDescriptor::Array(_) => TypeKind::Array,
            TypeDescriptor::Declared { .. } => TypeKind::Declared,
        }
    }
}

/// Interner for canonical type descriptors.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: Vec<TypeDescriptor>,
    ids: HashMap<TypeDescriptor, TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a type expression, returning its canonical id.
    pub fn intern(&mut self, expr: &TypeExpr) -> TypeId {
        let desc = match expr {
            TypeExpr::Primitive(p) => TypeDescriptor::Primitive(*p),
            TypeExpr::Array(elem) => TypeDescriptor::Array(self.intern(elem)),
            TypeExpr::Declared { name, args } => TypeDescriptor::Declared {
                name: name.clone(),
                args: args.iter().map(|a| self.intern(a)).collect(),
            },
        };
        self.insert(desc)
    }

    fn insert(&mut self, desc: TypeDescriptor) -> TypeId {
        if let Some(&id) = self.ids.get(&desc) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(desc.clone());
        self.ids.insert(desc, id);
        id
    }

    /// Look up an already-interned expression without inserting it.
    pub fn lookup(&self, expr: &TypeExpr) -> Option<TypeId> {
        let desc = match expr {
            TypeExpr::Primitive(p) => TypeDescriptor::Primitive(*p),
            TypeExpr::Array(elem) => TypeDescriptor::Array(self.lookup(elem)?),
            TypeExpr::Declared { name, args } => TypeDescriptor::Declared {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|a| self.lookup(a))
                    .collect::<Option<Vec<_>>>()?,
            },
        };
        self.ids.get(&desc).copied()
    }

    /// Panics on an id from another table; ids are only minted by `intern`.
    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.0 as usize]
    }

    pub fn kind(&self, id: TypeId) -> TypeKind {
        self.get(id).kind()
    }

    /// Qualified name of a declared type (generic arguments erased).
    pub fn declared_name(&self, id: TypeId) -> Option<&str> {
        match self.get(id) {
            TypeDescriptor::Declared { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Canonical text form of an interned type.
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId) {
        match self.get(id) {
            TypeDescriptor::Primitive(p) => out.push_str(p.keyword()),
            TypeDescriptor::Array(elem) => {
                self.write_type(out, *elem);
                out.push_str("[]");
            }
            TypeDescriptor::Declared { name, args } => {
                out.push_str(name);
                if !args.is_empty() {
                    out.push('<');
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.write_type(out, *a);
                    }
                    out.push('>');
                }
            }
        }
    }
}

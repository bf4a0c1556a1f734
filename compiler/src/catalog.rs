// catalog.rs: Receiver operation catalog
//
// `ReceiverDecl` lists the receiver's operations in source declaration order.
// `OperationCatalog` is the canonical form: same order, parameter types
// interned. Operation order is call order for the initial dispatch and
// processing order for the update dispatch.
//
// Preconditions: none.
// Postconditions: `OperationId(i)` is the i-th declared operation.
// Failure modes: none.
// Side effects: interns parameter types into the given `TypeTable`.

use crate::id::OperationId;
use crate::schema::FieldSpec;
use crate::types::{TypeExpr, TypeTable};

// ── Front-end declarations ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub nullable: bool,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDecl {
    pub name: String,
    pub parameters: Vec<ParamDecl>,
}

impl OperationDecl {
    pub fn new(name: impl Into<String>, parameters: Vec<ParamDecl>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// The receiver interface whose operations consume state fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverDecl {
    pub name: String,
    pub operations: Vec<OperationDecl>,
}

// ── Canonical catalog ──────────────────────────────────────────────────────

/// An operation with canonically typed parameters, in call-argument order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub parameters: Vec<FieldSpec>,
}

impl Operation {
    /// `name(a, b)` form used in listings and diagnostics.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct OperationCatalog {
    pub receiver_name: String,
    operations: Vec<Operation>,
}

impl OperationCatalog {
    pub fn from_decl(decl: &ReceiverDecl, types: &mut TypeTable) -> Self {
        let operations = decl
            .operations
            .iter()
            .map(|op| Operation {
                name: op.name.clone(),
                parameters: op
                    .parameters
                    .iter()
                    .map(|p| FieldSpec {
                        name: p.name.clone(),
                        ty: types.intern(&p.ty),
                        nullable: p.nullable,
                    })
                    .collect(),
            })
            .collect();
        OperationCatalog {
            receiver_name: decl.name.clone(),
            operations,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operations with their ids, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (OperationId, &Operation)> {
        self.operations
            .iter()
            .enumerate()
            .map(|(i, op)| (OperationId(i as u32), op))
    }

    pub fn get(&self, id: OperationId) -> &Operation {
        &self.operations[id.index()]
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

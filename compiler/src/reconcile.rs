// reconcile.rs: Field reconciliation across operations
//
// Merges every operation parameter into a deduplicated set of logical fields
// and records which operations consume each one. Identity is decided by an
// injected `FieldIdentity` predicate with a linear scan, never by container
// hashing, so the caller controls exactly what "same field" means.
//
// Preconditions: parameter types are interned in one `TypeTable`.
// Postconditions: fields are ordered by first introduction (operation
//                 declaration order, then parameter order); each consumer
//                 list holds an operation at most once, in declaration order;
//                 every parameter maps to exactly one field.
// Failure modes: none.
// Side effects: none.

use crate::catalog::OperationCatalog;
use crate::id::{FieldId, OperationId};
use crate::schema::FieldSpec;

// ── Identity predicate ─────────────────────────────────────────────────────

/// Decides whether two parameters denote the same logical field.
pub trait FieldIdentity {
    fn same_field(&self, a: &FieldSpec, b: &FieldSpec) -> bool;
}

/// Same name, same canonical type, same nullability.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralIdentity;

impl FieldIdentity for StructuralIdentity {
    fn same_field(&self, a: &FieldSpec, b: &FieldSpec) -> bool {
        a.name == b.name && a.ty == b.ty && a.nullable == b.nullable
    }
}

impl<F> FieldIdentity for F
where
    F: Fn(&FieldSpec, &FieldSpec) -> bool,
{
    fn same_field(&self, a: &FieldSpec, b: &FieldSpec) -> bool {
        self(a, b)
    }
}

// ── Dependency index ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalField {
    pub spec: FieldSpec,
    /// Consuming operations in declaration order; the first introduced the field.
    pub consumers: Vec<OperationId>,
}

impl LogicalField {
    pub fn is_shared(&self) -> bool {
        self.consumers.len() > 1
    }
}

/// Logical field → consuming operations. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyIndex {
    fields: Vec<LogicalField>,
    /// Per operation, per parameter: the logical field it resolved to.
    params: Vec<Vec<FieldId>>,
}

impl DependencyIndex {
    pub fn fields(&self) -> &[LogicalField] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &LogicalField)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| (FieldId(i as u32), f))
    }

    pub fn get(&self, id: FieldId) -> &LogicalField {
        &self.fields[id.index()]
    }

    /// Logical fields of an operation's parameters, in parameter order.
    pub fn parameter_fields(&self, op: OperationId) -> &[FieldId] {
        &self.params[op.index()]
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ── Entry points ───────────────────────────────────────────────────────────

/// Reconcile with structural (name, type, nullability) identity.
pub fn reconcile(catalog: &OperationCatalog) -> DependencyIndex {
    reconcile_with(catalog, &StructuralIdentity)
}

/// Reconcile with a caller-supplied identity predicate.
pub fn reconcile_with(catalog: &OperationCatalog, identity: &impl FieldIdentity) -> DependencyIndex {
    let mut fields: Vec<LogicalField> = Vec::new();
    let mut params = Vec::with_capacity(catalog.len());

    for (op_id, op) in catalog.iter() {
        let mut op_fields = Vec::with_capacity(op.parameters.len());
        for param in &op.parameters {
            let pos = match fields
                .iter()
                .position(|f| identity.same_field(&f.spec, param))
            {
                Some(pos) => pos,
                None => {
                    fields.push(LogicalField {
                        spec: param.clone(),
                        consumers: Vec::new(),
                    });
                    fields.len() - 1
                }
            };
            let consumers = &mut fields[pos].consumers;
            if !consumers.contains(&op_id) {
                consumers.push(op_id);
            }
            op_fields.push(FieldId(pos as u32));
        }
        params.push(op_fields);
    }

    DependencyIndex { fields, params }
}

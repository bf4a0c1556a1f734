//! Dispatch plan: the validated two-branch change-dispatch program.
//!
//! `DispatchPlan` is a self-contained, pre-resolved description of what a
//! generated dispatcher does.  An emitter reads it and produces target
//! source without consulting any upstream analysis artifact.
//!
//! Initial branch: every operation, declaration order, arguments read from
//! the new state.  Update branch: per operation, an OR of per-field changed
//! terms in parameter order.  A field consumed by more than one operation
//! gets exactly one cached comparison, emitted before the first operation
//! that references it; single-consumer fields are compared inline.

use std::fmt;

use crate::catalog::{Operation, OperationCatalog};
use crate::equality::{self, EqualityHelper, EqualityStrategy};
use crate::id::{ComparisonId, FieldId, OperationId};
use crate::schema::{FieldSpec, Schema};
use crate::types::TypeTable;
use crate::validate::ValidatedIndex;

// ── Plan types ─────────────────────────────────────────────────────────────

/// A once-computed changed-check shared by several operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedComparison {
    pub id: ComparisonId,
    /// Emitted variable name, e.g. `titleChanged`.
    pub name: String,
    pub field: FieldId,
    pub strategy: EqualityStrategy,
    /// The operation before whose rule the comparison is computed.
    pub first_use: OperationId,
}

/// One disjunct of an update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTerm {
    Cached(ComparisonId),
    Inline {
        field: FieldId,
        strategy: EqualityStrategy,
    },
}

/// Call `operation` iff any term reports a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRule {
    pub operation: OperationId,
    /// OR-ed in parameter order; a parameterless operation has no terms
    /// and is only ever called by the initial branch.
    pub terms: Vec<ChangeTerm>,
}

#[derive(Debug, Clone)]
pub struct DispatchPlan {
    pub state_name: String,
    pub receiver_name: String,
    pub types: TypeTable,
    /// Logical fields, indexed by `FieldId`.
    pub fields: Vec<FieldSpec>,
    pub operations: Vec<Operation>,
    /// Per operation, its parameters' logical fields in call-argument order.
    pub arguments: Vec<Vec<FieldId>>,
    pub initial_calls: Vec<OperationId>,
    pub shared_comparisons: Vec<CachedComparison>,
    pub update_rules: Vec<UpdateRule>,
    /// Distinct helper routines referenced by the plan, in first-use order.
    pub helpers: Vec<EqualityHelper>,
}

impl DispatchPlan {
    pub fn field(&self, id: FieldId) -> &FieldSpec {
        &self.fields[id.index()]
    }

    pub fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id.index()]
    }

    pub fn comparison(&self, id: ComparisonId) -> &CachedComparison {
        &self.shared_comparisons[id.index()]
    }

    pub fn arguments(&self, op: OperationId) -> &[FieldId] {
        &self.arguments[op.index()]
    }

    /// The cached comparison for a field, if it is shared.
    pub fn cached_for(&self, field: FieldId) -> Option<&CachedComparison> {
        self.shared_comparisons.iter().find(|c| c.field == field)
    }

    /// Comparisons computed right before `op`'s rule.
    pub fn introduced_at(&self, op: OperationId) -> impl Iterator<Item = &CachedComparison> {
        self.shared_comparisons
            .iter()
            .filter(move |c| c.first_use == op)
    }

    pub fn rule(&self, op: OperationId) -> Option<&UpdateRule> {
        self.update_rules.iter().find(|r| r.operation == op)
    }
}

// ── Builder ────────────────────────────────────────────────────────────────

/// Build the dispatch plan for a validated unit.
pub fn build(
    schema: &Schema,
    validated: ValidatedIndex<'_>,
    catalog: &OperationCatalog,
    types: &TypeTable,
) -> DispatchPlan {
    let index = validated.index();

    let mut shared_comparisons: Vec<CachedComparison> = Vec::new();
    let mut update_rules = Vec::with_capacity(catalog.len());
    let mut helpers: Vec<EqualityHelper> = Vec::new();
    let mut arguments = Vec::with_capacity(catalog.len());

    for (op_id, op) in catalog.iter() {
        let params = index.parameter_fields(op_id);
        arguments.push(params.to_vec());

        let mut terms: Vec<ChangeTerm> = Vec::with_capacity(params.len());
        let mut covered: Vec<FieldId> = Vec::with_capacity(params.len());
        for &field_id in params {
            if covered.contains(&field_id) {
                continue;
            }
            covered.push(field_id);

            let field = index.get(field_id);
            let strategy = equality::select(types, field.spec.ty, field.spec.nullable);
            if let Some(helper) = strategy.helper() {
                if !helpers.contains(&helper) {
                    helpers.push(helper);
                }
            }

            if !field.is_shared() {
                tracing::trace!(operation = %op.name, field = %field.spec.name, ?strategy, "inline comparison");
                terms.push(ChangeTerm::Inline {
                    field: field_id,
                    strategy,
                });
                continue;
            }

            let cached = match shared_comparisons.iter().find(|c| c.field == field_id) {
                Some(existing) => existing.id,
                None => {
                    let id = ComparisonId(shared_comparisons.len() as u32);
                    let name = comparison_name(&shared_comparisons, &field.spec.name);
                    tracing::trace!(operation = %op.name, field = %field.spec.name, %name, "cached comparison");
                    shared_comparisons.push(CachedComparison {
                        id,
                        name,
                        field: field_id,
                        strategy,
                        first_use: op_id,
                    });
                    id
                }
            };
            terms.push(ChangeTerm::Cached(cached));
        }

        update_rules.push(UpdateRule {
            operation: op_id,
            terms,
        });
    }

    DispatchPlan {
        state_name: schema.state_name.clone(),
        receiver_name: catalog.receiver_name.clone(),
        types: types.clone(),
        fields: index.fields().iter().map(|f| f.spec.clone()).collect(),
        operations: catalog.operations().to_vec(),
        arguments,
        initial_calls: catalog.iter().map(|(id, _)| id).collect(),
        shared_comparisons,
        update_rules,
        helpers,
    }
}

fn comparison_name(existing: &[CachedComparison], field: &str) -> String {
    let base = format!("{}Changed", field);
    if !existing.iter().any(|c| c.name == base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}{}", base, n);
        if !existing.iter().any(|c| c.name == candidate) {
            return candidate;
        }
        n += 1;
    }
}

// ── Listing ────────────────────────────────────────────────────────────────

impl DispatchPlan {
    fn write_call(&self, f: &mut fmt::Formatter<'_>, op: OperationId) -> fmt::Result {
        let args: Vec<String> = self
            .arguments(op)
            .iter()
            .map(|&field| format!("new.{}", self.field(field).name))
            .collect();
        write!(f, "{}({})", self.operation(op).name, args.join(", "))
    }

    fn changed_expr(&self, field: FieldId, strategy: EqualityStrategy) -> String {
        let name = &self.field(field).name;
        match strategy.helper() {
            None => format!("prev.{} != new.{}", name, name),
            Some(helper) => format!(
                "!{}(prev.{}, new.{})",
                helper.name(&self.types),
                name,
                name
            ),
        }
    }

    fn term_expr(&self, term: ChangeTerm) -> String {
        match term {
            ChangeTerm::Cached(id) => self.comparison(id).name.clone(),
            ChangeTerm::Inline { field, strategy } => self.changed_expr(field, strategy),
        }
    }
}

impl fmt::Display for DispatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "plan {} -> {}", self.state_name, self.receiver_name)?;

        writeln!(f, "fields:")?;
        for (i, field) in self.fields.iter().enumerate() {
            let consumers: Vec<&str> = self
                .arguments
                .iter()
                .enumerate()
                .filter(|(_, args)| args.contains(&FieldId(i as u32)))
                .map(|(op, _)| self.operations[op].name.as_str())
                .collect();
            writeln!(
                f,
                "  {}: {}{} [{}]",
                field.name,
                self.types.display(field.ty),
                if field.nullable { "?" } else { "" },
                consumers.join(", ")
            )?;
        }

        writeln!(f, "initial:")?;
        for &op in &self.initial_calls {
            write!(f, "  ")?;
            self.write_call(f, op)?;
            writeln!(f)?;
        }

        writeln!(f, "update:")?;
        for rule in &self.update_rules {
            for cached in self.introduced_at(rule.operation) {
                writeln!(
                    f,
                    "  let {} = {}",
                    cached.name,
                    self.changed_expr(cached.field, cached.strategy)
                )?;
            }
            let cond = if rule.terms.is_empty() {
                "false".to_string()
            } else {
                rule.terms
                    .iter()
                    .map(|&t| self.term_expr(t))
                    .collect::<Vec<_>>()
                    .join(" || ")
            };
            write!(f, "  if {}: ", cond)?;
            self.write_call(f, rule.operation)?;
            writeln!(f)?;
        }

        write!(f, "helpers:")?;
        if self.helpers.is_empty() {
            write!(f, " none")?;
        }
        for helper in &self.helpers {
            write!(f, "\n  {}", helper.name(&self.types))?;
        }
        Ok(())
    }
}

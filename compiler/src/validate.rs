// validate.rs: Schema/catalog compatibility checks
//
// Runs every check over the dependency index and collects all diagnostics;
// no check short-circuits another. Only a clean run (no error-level
// diagnostics) yields a `ValidatedIndex`, which is the sole way into the
// plan builder.
//
// Checks, in reporting order:
//   1. duplicate schema member names              (E0001)
//   2. coverage: every logical field is readable   (E0100)
//   3. nullability consistency across operations   (E0200)
//   4. nullability safety against the schema       (E0201)
//   5. structural equality of object types         (W0300, non-blocking)
//
// Preconditions: schema, catalog and index share one `TypeTable`.
// Postconditions: `validated` is Some iff no error-level diagnostic exists.
// Failure modes: every violation becomes a `Diagnostic`.
// Side effects: none.

use crate::catalog::OperationCatalog;
use crate::diag::{codes, has_errors, Diagnostic, RelatedKind};
use crate::id::OperationId;
use crate::reconcile::{DependencyIndex, LogicalField};
use crate::schema::{DeclaredTypes, Schema};
use crate::types::{TypeKind, TypeTable};

/// Proof that an index passed validation against its schema.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedIndex<'a> {
    index: &'a DependencyIndex,
}

impl<'a> ValidatedIndex<'a> {
    pub fn index(&self) -> &'a DependencyIndex {
        self.index
    }
}

#[derive(Debug)]
pub struct ValidateResult<'a> {
    pub validated: Option<ValidatedIndex<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything the validator reads.
#[derive(Debug, Clone, Copy)]
pub struct ValidateInput<'a> {
    pub schema: &'a Schema,
    pub catalog: &'a OperationCatalog,
    pub index: &'a DependencyIndex,
    pub types: &'a TypeTable,
    pub declared: &'a DeclaredTypes,
    pub structural_equality_warnings: bool,
}

pub fn validate(input: ValidateInput<'_>) -> ValidateResult<'_> {
    let ctx = ValidateCtx {
        input,
        diagnostics: Vec::new(),
    };
    ctx.run()
}

struct ValidateCtx<'a> {
    input: ValidateInput<'a>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ValidateCtx<'a> {
    fn run(mut self) -> ValidateResult<'a> {
        self.check_duplicate_members();
        self.check_coverage();
        self.check_nullability_consistency();
        self.check_nullability_safety();
        if self.input.structural_equality_warnings {
            self.check_structural_equality();
        }

        let validated = if has_errors(&self.diagnostics) {
            None
        } else {
            Some(ValidatedIndex {
                index: self.input.index,
            })
        };
        ValidateResult {
            validated,
            diagnostics: self.diagnostics,
        }
    }

    fn type_name(&self, field: &LogicalField) -> String {
        self.input.types.display(field.spec.ty)
    }

    fn consumer_names(&self, ops: &[OperationId]) -> String {
        ops.iter()
            .map(|&op| self.input.catalog.get(op).name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn with_consumers(&self, mut diag: Diagnostic, ops: &[OperationId]) -> Diagnostic {
        for &op in ops {
            diag = diag.with_operation(self.input.catalog.get(op).signature());
        }
        diag
    }

    // ── 1. Duplicate members ──

    fn check_duplicate_members(&mut self) {
        let schema = self.input.schema;
        let members = schema.members();
        for (i, m) in members.iter().enumerate() {
            let name = &m.field.name;
            let first = members.iter().position(|o| &o.field.name == name);
            let repeats = members[i + 1..]
                .iter()
                .any(|o| &o.field.name == name);
            if first == Some(i) && repeats {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::DUPLICATE_SCHEMA_FIELD,
                        format!(
                            "state `{}` declares member `{}` more than once",
                            schema.state_name, name
                        ),
                    )
                    .with_hint("member names of a state type must be unique")
                    .with_field(name.clone()),
                );
            }
        }
    }

    // ── 2. Coverage ──

    fn check_coverage(&mut self) {
        let schema = self.input.schema;
        let index = self.input.index;
        let state = &schema.state_name;
        for (_, field) in index.iter() {
            let spec = &field.spec;
            if schema.find(&spec.name, spec.ty).is_some() {
                continue;
            }
            let ty = self.type_name(field);
            let ops = self.consumer_names(&field.consumers);

            let (message, hint) = if schema.find_member(&spec.name, spec.ty).is_some() {
                (
                    format!(
                        "field `{}` of type `{}` used by {} is not accessible in state `{}`",
                        spec.name, ty, ops, state
                    ),
                    format!(
                        "make `{}` publicly readable, add an accessor for it to `{}`, or remove the parameter from {}",
                        spec.name, state, ops
                    ),
                )
            } else {
                let mut message = format!(
                    "field `{}` of type `{}` used by {} is missing from state `{}`",
                    spec.name, ty, ops, state
                );
                if let Some(other) = schema.find_by_name(&spec.name) {
                    message.push_str(&format!(
                        " (state member `{}` has type `{}`)",
                        spec.name,
                        self.input.types.display(other.field.ty)
                    ));
                }
                (
                    message,
                    format!(
                        "add a field or accessor `{}: {}` to `{}`, or remove the parameter from {}",
                        spec.name, ty, state, ops
                    ),
                )
            };

            let diag = Diagnostic::error(codes::SCHEMA_COVERAGE, message)
                .with_hint(hint)
                .with_related(RelatedKind::Field, spec.name.clone(), Some(ty));
            let diag = self.with_consumers(diag, &field.consumers);
            self.diagnostics.push(diag);
        }
    }

    // ── 3. Nullability consistency ──

    fn check_nullability_consistency(&mut self) {
        let index = self.input.index;
        let fields = index.fields();
        let mut seen: Vec<&str> = Vec::new();
        for field in fields {
            let name = field.spec.name.as_str();
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);

            let same_name: Vec<&LogicalField> =
                fields.iter().filter(|f| f.spec.name == name).collect();
            let nullable_in = collect_consumers(&same_name, true);
            let non_null_in = collect_consumers(&same_name, false);
            if nullable_in.is_empty() || non_null_in.is_empty() {
                continue;
            }

            let message = format!(
                "parameter `{}` has conflicting nullability: nullable in {}, non-null in {}",
                name,
                self.consumer_names(&nullable_in),
                self.consumer_names(&non_null_in)
            );
            let diag = Diagnostic::error(codes::NULLABILITY_CONSISTENCY, message)
                .with_hint(format!(
                    "declare `{}` with the same nullability in every operation",
                    name
                ))
                .with_field(name);
            let mut all = nullable_in;
            for op in non_null_in {
                if !all.contains(&op) {
                    all.push(op);
                }
            }
            all.sort();
            let diag = self.with_consumers(diag, &all);
            self.diagnostics.push(diag);
        }
    }

    // ── 4. Nullability safety ──

    fn check_nullability_safety(&mut self) {
        let schema = self.input.schema;
        let index = self.input.index;
        for (_, field) in index.iter() {
            let spec = &field.spec;
            if spec.nullable {
                continue;
            }
            let Some(member) = schema.find(&spec.name, spec.ty) else {
                // Reported by coverage.
                continue;
            };
            if !member.nullable {
                continue;
            }
            let ops = self.consumer_names(&field.consumers);
            let diag = Diagnostic::error(
                codes::NULLABILITY_SAFETY,
                format!(
                    "state member `{}.{}` has weaker nullability than expected: it is nullable, but {} require(s) it non-null",
                    schema.state_name, spec.name, ops
                ),
            )
            .with_hint(format!(
                "make `{}` non-null in `{}`, or declare the parameter nullable in {}",
                spec.name, schema.state_name, ops
            ))
            .with_related(RelatedKind::Field, spec.name.clone(), Some(self.type_name(field)));
            let diag = self.with_consumers(diag, &field.consumers);
            self.diagnostics.push(diag);
        }
    }

    // ── 5. Structural equality ──

    fn check_structural_equality(&mut self) {
        let schema = self.input.schema;
        let types = self.input.types;
        let declared = self.input.declared;
        let index = self.input.index;

        if !schema.structural_equality {
            self.diagnostics.push(
                Diagnostic::warning(
                    codes::STRUCTURAL_EQUALITY,
                    format!(
                        "state `{}` does not override equals/hashCode, this will restrict diffing to reference only comparisons",
                        schema.state_name
                    ),
                )
                .with_related(RelatedKind::Type, schema.state_name.clone(), None),
            );
        }

        // Erased type name → fields of that type, in index order.
        let mut lacking: Vec<(&str, Vec<&str>)> = Vec::new();
        for (_, field) in index.iter() {
            if types.kind(field.spec.ty) != TypeKind::Declared {
                continue;
            }
            let Some(name) = types.declared_name(field.spec.ty) else {
                continue;
            };
            if declared.has_structural_equality(name) {
                continue;
            }
            match lacking.iter_mut().find(|(n, _)| *n == name) {
                Some((_, fields)) => {
                    if !fields.contains(&field.spec.name.as_str()) {
                        fields.push(&field.spec.name);
                    }
                }
                None => lacking.push((name, vec![&field.spec.name])),
            }
        }

        for (name, fields) in lacking {
            let mut diag = Diagnostic::warning(
                codes::STRUCTURAL_EQUALITY,
                format!(
                    "type `{}` does not override equals/hashCode, diffing of {} will degrade to reference comparison",
                    name,
                    fields
                        .iter()
                        .map(|f| format!("`{}`", f))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
            .with_related(RelatedKind::Type, name, None);
            for f in fields {
                diag = diag.with_field(f);
            }
            self.diagnostics.push(diag);
        }
    }
}

fn collect_consumers(fields: &[&LogicalField], nullable: bool) -> Vec<OperationId> {
    let mut ops = Vec::new();
    for f in fields.iter().filter(|f| f.spec.nullable == nullable) {
        for &op in &f.consumers {
            if !ops.contains(&op) {
                ops.push(op);
            }
        }
    }
    ops.sort();
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{OperationDecl, ParamDecl, ReceiverDecl};
    use crate::diag::DiagLevel;
    use crate::reconcile::reconcile;
    use crate::schema::{MemberDecl, StateDecl};
    use crate::types::{Primitive, TypeExpr};

    fn string() -> TypeExpr {
        TypeExpr::declared("java.lang.String")
    }

    fn int() -> TypeExpr {
        TypeExpr::Primitive(Primitive::Int)
    }

    struct Fixture {
        types: TypeTable,
        schema: Schema,
        catalog: OperationCatalog,
        index: DependencyIndex,
        declared: DeclaredTypes,
    }

    fn fixture(members: Vec<MemberDecl>, ops: Vec<OperationDecl>) -> Fixture {
        let mut types = TypeTable::new();
        let schema = Schema::from_decl(
            &StateDecl {
                name: "ViewState".to_string(),
                structural_equality: true,
                members,
            },
            &mut types,
        );
        let catalog = OperationCatalog::from_decl(
            &ReceiverDecl {
                name: "Renderer".to_string(),
                operations: ops,
            },
            &mut types,
        );
        let index = reconcile(&catalog);
        Fixture {
            types,
            schema,
            catalog,
            index,
            declared: DeclaredTypes::with_platform_defaults(),
        }
    }

    fn run(f: &Fixture) -> ValidateResult<'_> {
        validate(ValidateInput {
            schema: &f.schema,
            catalog: &f.catalog,
            index: &f.index,
            types: &f.types,
            declared: &f.declared,
            structural_equality_warnings: true,
        })
    }

    fn codes_of(result: &ValidateResult<'_>) -> Vec<&'static str> {
        result.diagnostics.iter().map(|d| d.code.0).collect()
    }

    #[test]
    fn clean_unit_validates() {
        let f = fixture(
            vec![
                MemberDecl::new("firstName", string(), false),
                MemberDecl::new("age", int(), false),
            ],
            vec![
                OperationDecl::new("renderName", vec![ParamDecl::new("firstName", string(), false)]),
                OperationDecl::new("renderAge", vec![ParamDecl::new("age", int(), false)]),
            ],
        );
        let result = run(&f);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert!(result.validated.is_some());
    }

    #[test]
    fn missing_field_names_field_and_operation() {
        let f = fixture(
            vec![MemberDecl::new("age", int(), false)],
            vec![OperationDecl::new("renderScore", vec![ParamDecl::new("score", int(), false)])],
        );
        let result = run(&f);
        assert!(result.validated.is_none());
        assert_eq!(codes_of(&result), vec!["E0100"]);
        let d = &result.diagnostics[0];
        assert!(d.message.contains("`score`"));
        assert!(d.message.contains("missing"));
        assert!(d.message.contains("renderScore"));
        assert_eq!(d.operations().collect::<Vec<_>>(), vec!["renderScore(score)"]);
    }

    #[test]
    fn private_member_is_reported_as_not_accessible() {
        let f = fixture(
            vec![MemberDecl::new("score", int(), false).private()],
            vec![OperationDecl::new("renderScore", vec![ParamDecl::new("score", int(), false)])],
        );
        let result = run(&f);
        assert_eq!(codes_of(&result), vec!["E0100"]);
        assert!(result.diagnostics[0].message.contains("not accessible"));
    }

    #[test]
    fn type_mismatch_is_missing_with_context() {
        let f = fixture(
            vec![MemberDecl::new("score", TypeExpr::Primitive(Primitive::Long), false)],
            vec![OperationDecl::new("renderScore", vec![ParamDecl::new("score", int(), false)])],
        );
        let result = run(&f);
        assert_eq!(codes_of(&result), vec!["E0100"]);
        assert!(result.diagnostics[0].message.contains("has type `long`"));
    }

    #[test]
    fn conflicting_nullability_reported_once_per_name() {
        let f = fixture(
            vec![MemberDecl::new("title", string(), true)],
            vec![
                OperationDecl::new("a", vec![ParamDecl::new("title", string(), true)]),
                OperationDecl::new("b", vec![ParamDecl::new("title", string(), false)]),
                OperationDecl::new("c", vec![ParamDecl::new("title", string(), false)]),
            ],
        );
        let result = run(&f);
        let consistency: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.code == codes::NULLABILITY_CONSISTENCY)
            .collect();
        assert_eq!(consistency.len(), 1);
        assert_eq!(consistency[0].operations().count(), 3);
        assert!(result.validated.is_none());
    }

    #[test]
    fn nullable_schema_non_null_operation_is_unsafe() {
        let f = fixture(
            vec![MemberDecl::new("title", string(), true)],
            vec![OperationDecl::new("renderTitle", vec![ParamDecl::new("title", string(), false)])],
        );
        let result = run(&f);
        assert_eq!(codes_of(&result), vec!["E0201"]);
        assert!(result.diagnostics[0].message.contains("weaker nullability"));
    }

    #[test]
    fn matching_nullability_is_safe() {
        for (schema_nullable, op_nullable) in [(true, true), (false, false), (false, true)] {
            let f = fixture(
                vec![MemberDecl::new("title", string(), schema_nullable)],
                vec![OperationDecl::new(
                    "renderTitle",
                    vec![ParamDecl::new("title", string(), op_nullable)],
                )],
            );
            assert!(run(&f).validated.is_some());
        }
    }

    #[test]
    fn all_checks_run_after_first_failure() {
        let f = fixture(
            vec![
                MemberDecl::new("title", string(), true),
                MemberDecl::new("title", string(), true),
            ],
            vec![
                OperationDecl::new("a", vec![ParamDecl::new("score", int(), false)]),
                OperationDecl::new("b", vec![ParamDecl::new("title", string(), false)]),
                OperationDecl::new("c", vec![ParamDecl::new("title", string(), true)]),
            ],
        );
        assert_eq!(codes_of(&run(&f)), vec!["E0001", "E0100", "E0200", "E0201"]);
    }

    #[test]
    fn object_types_without_equals_warn_once_per_type() {
        let address = || TypeExpr::declared("com.example.Address");
        let mut f = fixture(
            vec![
                MemberDecl::new("home", address(), false),
                MemberDecl::new("work", address(), false),
            ],
            vec![
                OperationDecl::new("renderHome", vec![ParamDecl::new("home", address(), false)]),
                OperationDecl::new("renderWork", vec![ParamDecl::new("work", address(), false)]),
            ],
        );
        f.schema.structural_equality = false;
        let result = run(&f);
        assert!(result.validated.is_some());
        assert_eq!(codes_of(&result), vec!["W0300", "W0300"]);
        assert!(result.diagnostics.iter().all(|d| d.level == DiagLevel::Warning));
        assert!(result.diagnostics[0].message.contains("state `ViewState`"));
        assert!(result.diagnostics[1].message.contains("`home`, `work`"));

        f.declared.register("com.example.Address", true);
        f.schema.structural_equality = true;
        assert!(run(&f).diagnostics.is_empty());
    }

    #[test]
    fn warnings_can_be_disabled() {
        let f = fixture(
            vec![MemberDecl::new("addr", TypeExpr::declared("Address"), false)],
            vec![OperationDecl::new("r", vec![ParamDecl::new("addr", TypeExpr::declared("Address"), false)])],
        );
        let result = validate(ValidateInput {
            schema: &f.schema,
            catalog: &f.catalog,
            index: &f.index,
            types: &f.types,
            declared: &f.declared,
            structural_equality_warnings: false,
        });
        assert!(result.diagnostics.is_empty());
    }
}

// pipeline.rs: Analysis state and pass orchestration
//
// Holds all pass artifacts in a borrow-split struct (upstream/downstream)
// and runs the minimal set of passes for a given terminal PassId.
//
// Preconditions: the AnalysisUnit is set before calling run_pipeline.
// Postconditions: all artifacts for required passes are populated, or has_error is set.
// Failure modes: Validate emitting error-level diagnostics; a pass finding an
//   upstream artifact missing.
// Side effects: calls on_pass_complete after each pass; emits tracing events.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::catalog::{OperationCatalog, ReceiverDecl};
use crate::diag::{has_errors, Diagnostic};
use crate::manifest::UnitManifest;
use crate::pass::{descriptor, required_passes, ArtifactId, PassId};
use crate::plan::DispatchPlan;
use crate::reconcile::{reconcile_with, DependencyIndex, FieldIdentity, StructuralIdentity};
use crate::schema::{DeclaredTypes, Schema, StateDecl};
use crate::types::TypeTable;
use crate::validate::{validate, ValidateInput, ValidateResult};

// ── Inputs ─────────────────────────────────────────────────────────────────

/// One state type paired with one receiver interface.
#[derive(Debug, Clone)]
pub struct AnalysisUnit {
    pub state: StateDecl,
    pub receiver: ReceiverDecl,
    /// Equality traits of declared types, on top of the platform defaults.
    pub declared: DeclaredTypes,
}

impl AnalysisUnit {
    pub fn new(state: StateDecl, receiver: ReceiverDecl) -> Self {
        Self {
            state,
            receiver,
            declared: DeclaredTypes::new(),
        }
    }

    pub fn with_declared(mut self, declared: DeclaredTypes) -> Self {
        self.declared = declared;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Emit W0300 for object-typed fields compared by identity.
    pub structural_equality_warnings: bool,
    /// Seed declared-type info with `DeclaredTypes::with_platform_defaults`.
    pub platform_defaults: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            structural_equality_warnings: true,
            platform_defaults: true,
        }
    }
}

// ── Artifact storage ───────────────────────────────────────────────────────

/// Artifacts that `ValidatedIndex` borrows, set before the validated block.
pub struct UpstreamArtifacts {
    pub unit: AnalysisUnit,
    /// Effective declared-type info: platform defaults merged with the unit's.
    pub declared: Option<DeclaredTypes>,
    pub types: Option<TypeTable>,
    pub schema: Option<Schema>,
    pub catalog: Option<OperationCatalog>,
    pub index: Option<DependencyIndex>,
}

/// Artifacts set while `ValidatedIndex` is alive; a separate struct so upstream stays borrowed.
pub struct DownstreamArtifacts {
    pub plan: Option<DispatchPlan>,
}

/// Provenance metadata for reproducibility checks and cache-key use.
///
/// `input_fingerprint`: SHA-256 of `UnitManifest::canonical_json()` for the unit.
/// `plan_fingerprint`: SHA-256 of the plan's `Display` listing.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub input_fingerprint: [u8; 32],
    pub plan_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    pub fn input_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.input_fingerprint)
    }

    pub fn plan_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.plan_fingerprint)
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "input_fingerprint": self.input_fingerprint_hex(),
            "plan_fingerprint": self.plan_fingerprint_hex(),
            "compiler_version": self.compiler_version,
        })
        .to_string()
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(text: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Compute provenance from an analysis unit and the plan built for it.
pub fn compute_provenance(unit: &AnalysisUnit, plan: &DispatchPlan) -> Provenance {
    Provenance {
        input_fingerprint: sha256(&UnitManifest::from_unit(unit).canonical_json()),
        plan_fingerprint: sha256(&plan.to_string()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

/// Holds all analysis artifacts and accumulated diagnostics.
pub struct AnalysisState {
    pub upstream: UpstreamArtifacts,
    pub downstream: DownstreamArtifacts,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
}

impl AnalysisState {
    pub fn new(unit: AnalysisUnit) -> Self {
        Self {
            upstream: UpstreamArtifacts {
                unit,
                declared: None,
                types: None,
                schema: None,
                catalog: None,
                index: None,
            },
            downstream: DownstreamArtifacts { plan: None },
            diagnostics: Vec::new(),
            has_error: false,
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A pass produced error-level diagnostics. `diagnostics` holds every
    /// diagnostic accumulated up to and including that pass.
    #[error("{} failed with {} error(s)", pass_name(.failing_pass), error_count(.diagnostics))]
    Diagnostics {
        failing_pass: PassId,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("{} ran without its {artifact:?} input", pass_name(.pass))]
    MissingArtifact { pass: PassId, artifact: ArtifactId },
}

impl PipelineError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            PipelineError::Diagnostics { diagnostics, .. } => diagnostics,
            PipelineError::MissingArtifact { .. } => &[],
        }
    }
}

fn pass_name(pass: &PassId) -> &'static str {
    descriptor(*pass).name
}

fn error_count(diags: &[Diagnostic]) -> usize {
    diags.iter().filter(|d| d.is_error()).count()
}

fn require<T>(slot: &Option<T>, pass: PassId, artifact: ArtifactId) -> Result<&T, PipelineError> {
    slot.as_ref()
        .ok_or(PipelineError::MissingArtifact { pass, artifact })
}

// ── Pass completion ────────────────────────────────────────────────────────

/// Per-pass post-processing: callback, accumulate, log, error check.
/// Takes split borrows to avoid conflicting with `ValidatedIndex` borrows on upstream.
fn finish_pass_core(
    all_diags: &mut Vec<Diagnostic>,
    has_error: &mut bool,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    let is_err = has_errors(&diags);
    tracing::debug!(
        pass = descriptor(pass_id).name,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        diagnostics = diags.len(),
        "pass complete"
    );
    all_diags.extend(diags);
    if is_err {
        *has_error = true;
        return Err(PipelineError::Diagnostics {
            failing_pass: pass_id,
            diagnostics: all_diags.clone(),
        });
    }
    Ok(())
}

/// Per-pass post-processing for passes that produce no diagnostics.
fn finish_pass_no_diags(
    pass_id: PassId,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) {
    on_pass_complete(pass_id, &[]);
    tracing::debug!(
        pass = descriptor(pass_id).name,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        diagnostics = 0,
        "pass complete"
    );
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → log → error check.
///
/// Preconditions: `state.upstream.unit` is set; no pass has run yet.
/// Postconditions: artifacts for all passes in `required_passes(terminal)` are
///   populated, or `state.has_error` is true and no plan exists.
/// Failure modes: Validate producing error-level diagnostics.
/// Side effects: calls `on_pass_complete` after each pass.
pub fn run_pipeline(
    state: &mut AnalysisState,
    terminal: PassId,
    options: &PipelineOptions,
    identity: &impl FieldIdentity,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    let passes = required_passes(terminal);

    for &pass_id in &passes {
        match pass_id {
            // ValidatedIndex-dependent passes run in a scoped block
            PassId::Validate => {
                return run_validated_and_downstream(state, &passes, options, &mut on_pass_complete);
            }
            // Validate precedes BuildPlan and runs it inside the scoped block
            PassId::BuildPlan => {
                return Err(PipelineError::MissingArtifact {
                    pass: PassId::BuildPlan,
                    artifact: ArtifactId::Validated,
                });
            }
            PassId::Canonicalize => {
                let t = Instant::now();
                let unit = &state.upstream.unit;
                let mut types = TypeTable::new();
                let schema = Schema::from_decl(&unit.state, &mut types);
                let catalog = OperationCatalog::from_decl(&unit.receiver, &mut types);
                let mut declared = if options.platform_defaults {
                    DeclaredTypes::with_platform_defaults()
                } else {
                    DeclaredTypes::new()
                };
                declared.extend(&unit.declared);
                let elapsed = t.elapsed();
                state.upstream.types = Some(types);
                state.upstream.schema = Some(schema);
                state.upstream.catalog = Some(catalog);
                state.upstream.declared = Some(declared);
                finish_pass_no_diags(PassId::Canonicalize, elapsed, &mut on_pass_complete);
            }
            PassId::Reconcile => {
                let t = Instant::now();
                let catalog = require(
                    &state.upstream.catalog,
                    PassId::Reconcile,
                    ArtifactId::Catalog,
                )?;
                let index = reconcile_with(catalog, identity);
                let elapsed = t.elapsed();
                state.upstream.index = Some(index);
                finish_pass_no_diags(PassId::Reconcile, elapsed, &mut on_pass_complete);
            }
        }
    }
    Ok(())
}

// ── ValidatedIndex scoped block ────────────────────────────────────────────

fn run_validated_and_downstream(
    state: &mut AnalysisState,
    passes: &[PassId],
    options: &PipelineOptions,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    let up = &state.upstream;
    let types = require(&up.types, PassId::Validate, ArtifactId::Types)?;
    let schema = require(&up.schema, PassId::Validate, ArtifactId::Schema)?;
    let catalog = require(&up.catalog, PassId::Validate, ArtifactId::Catalog)?;
    let index = require(&up.index, PassId::Validate, ArtifactId::Index)?;
    let declared = up.declared.as_ref();
    let empty = DeclaredTypes::new();

    let t = Instant::now();
    let ValidateResult {
        validated,
        diagnostics,
    } = validate(ValidateInput {
        schema,
        catalog,
        index,
        types,
        declared: declared.unwrap_or(&empty),
        structural_equality_warnings: options.structural_equality_warnings,
    });
    let elapsed = t.elapsed();
    finish_pass_core(
        &mut state.diagnostics,
        &mut state.has_error,
        PassId::Validate,
        diagnostics,
        elapsed,
        on_pass_complete,
    )?;

    if passes.contains(&PassId::BuildPlan) {
        let validated = validated.ok_or(PipelineError::MissingArtifact {
            pass: PassId::BuildPlan,
            artifact: ArtifactId::Validated,
        })?;
        let t = Instant::now();
        let plan = crate::plan::build(schema, validated, catalog, types);
        let elapsed = t.elapsed();
        state.downstream.plan = Some(plan);
        finish_pass_no_diags(PassId::BuildPlan, elapsed, on_pass_complete);
    }
    // validated drops here, releasing the upstream borrows

    Ok(())
}

// ── Entry points ───────────────────────────────────────────────────────────

/// A successful analysis: the plan plus everything a caller reports on.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub plan: DispatchPlan,
    pub index: DependencyIndex,
    /// Non-blocking diagnostics (warnings only).
    pub warnings: Vec<Diagnostic>,
    pub provenance: Provenance,
}

/// Analyze one unit with default options.
pub fn analyze(unit: AnalysisUnit) -> Result<Analysis, PipelineError> {
    analyze_with(unit, &PipelineOptions::default(), |_, _| {})
}

/// Run every pass and package the result.
///
/// Preconditions: none.
/// Postconditions: on Ok, `plan` satisfies coverage, consistency and safety.
/// Failure modes: `PipelineError::Diagnostics` with every diagnostic found.
/// Side effects: calls `on_pass_complete` after each pass.
pub fn analyze_with(
    unit: AnalysisUnit,
    options: &PipelineOptions,
    on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<Analysis, PipelineError> {
    let mut state = AnalysisState::new(unit);
    run_pipeline(
        &mut state,
        PassId::BuildPlan,
        options,
        &StructuralIdentity,
        on_pass_complete,
    )?;

    let plan = state
        .downstream
        .plan
        .take()
        .ok_or(PipelineError::MissingArtifact {
            pass: PassId::BuildPlan,
            artifact: ArtifactId::Plan,
        })?;
    let index = state
        .upstream
        .index
        .take()
        .ok_or(PipelineError::MissingArtifact {
            pass: PassId::BuildPlan,
            artifact: ArtifactId::Index,
        })?;
    let provenance = compute_provenance(&state.upstream.unit, &plan);
    Ok(Analysis {
        plan,
        index,
        warnings: state.diagnostics,
        provenance,
    })
}

/// Parse a JSON manifest and analyze it with default options.
pub fn analyze_manifest(json: &str) -> Result<Analysis, AnalyzeManifestError> {
    let unit = UnitManifest::from_json(json)?.to_unit()?;
    Ok(analyze(unit)?)
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeManifestError {
    #[error(transparent)]
    Manifest(#[from] crate::manifest::ManifestError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{OperationDecl, ParamDecl};
    use crate::schema::MemberDecl;
    use crate::types::{Primitive, TypeExpr};

    fn int() -> TypeExpr {
        TypeExpr::Primitive(Primitive::Int)
    }

    fn unit(members: Vec<MemberDecl>, ops: Vec<OperationDecl>) -> AnalysisUnit {
        AnalysisUnit::new(
            StateDecl {
                name: "S".to_string(),
                structural_equality: true,
                members,
            },
            ReceiverDecl {
                name: "R".to_string(),
                operations: ops,
            },
        )
    }

    fn ok_unit() -> AnalysisUnit {
        unit(
            vec![MemberDecl::new("a", int(), false)],
            vec![OperationDecl::new("onA", vec![ParamDecl::new("a", int(), false)])],
        )
    }

    #[test]
    fn runs_all_passes_in_order() {
        let mut seen = Vec::new();
        let analysis = analyze_with(ok_unit(), &PipelineOptions::default(), |pass, _| {
            seen.push(pass)
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                PassId::Canonicalize,
                PassId::Reconcile,
                PassId::Validate,
                PassId::BuildPlan
            ]
        );
        assert_eq!(analysis.plan.update_rules.len(), 1);
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn validation_errors_stop_before_plan() {
        let bad = unit(
            vec![],
            vec![OperationDecl::new("onA", vec![ParamDecl::new("a", int(), false)])],
        );
        let mut state = AnalysisState::new(bad);
        let mut seen = Vec::new();
        let err = run_pipeline(
            &mut state,
            PassId::BuildPlan,
            &PipelineOptions::default(),
            &StructuralIdentity,
            |pass, _| seen.push(pass),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Diagnostics {
                failing_pass: PassId::Validate,
                ..
            }
        ));
        assert_eq!(err.diagnostics()[0].code.0, "E0100");
        assert!(state.has_error);
        assert!(state.downstream.plan.is_none());
        assert!(!seen.contains(&PassId::BuildPlan));
        assert_eq!(err.to_string(), "validate failed with 1 error(s)");
    }

    #[test]
    fn terminal_reconcile_builds_index_only() {
        let mut state = AnalysisState::new(ok_unit());
        run_pipeline(
            &mut state,
            PassId::Reconcile,
            &PipelineOptions::default(),
            &StructuralIdentity,
            |_, _| {},
        )
        .unwrap();
        assert_eq!(state.upstream.index.as_ref().map(|i| i.len()), Some(1));
        assert!(state.downstream.plan.is_none());
    }

    #[test]
    fn every_terminal_runs_its_required_prefix() {
        for terminal in crate::pass::ALL_PASSES {
            let mut state = AnalysisState::new(ok_unit());
            let mut seen = Vec::new();
            run_pipeline(
                &mut state,
                terminal,
                &PipelineOptions::default(),
                &StructuralIdentity,
                |pass, _| seen.push(pass),
            )
            .unwrap();
            assert_eq!(seen, required_passes(terminal));
            assert_eq!(
                state.downstream.plan.is_some(),
                terminal == PassId::BuildPlan
            );
        }
    }

    #[test]
    fn custom_identity_is_used_by_reconcile() {
        let u = unit(
            vec![MemberDecl::new("a", int(), false)],
            vec![
                OperationDecl::new("one", vec![ParamDecl::new("a", int(), false)]),
                OperationDecl::new("two", vec![ParamDecl::new("a", int(), false)]),
            ],
        );
        let never = |_: &crate::schema::FieldSpec, _: &crate::schema::FieldSpec| false;
        let mut state = AnalysisState::new(u);
        run_pipeline(
            &mut state,
            PassId::Reconcile,
            &PipelineOptions::default(),
            &never,
            |_, _| {},
        )
        .unwrap();
        assert_eq!(state.upstream.index.as_ref().map(|i| i.len()), Some(2));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: PipelineOptions =
            serde_json::from_str(r#"{ "structural_equality_warnings": false }"#).unwrap();
        assert!(!opts.structural_equality_warnings);
        assert!(opts.platform_defaults);
    }

    #[test]
    fn disabling_platform_defaults_warns_on_strings() {
        let u = unit(
            vec![MemberDecl::new("s", TypeExpr::declared("java.lang.String"), false)],
            vec![OperationDecl::new(
                "onS",
                vec![ParamDecl::new("s", TypeExpr::declared("java.lang.String"), false)],
            )],
        );
        let with = analyze(u.clone()).unwrap();
        assert!(with.warnings.is_empty());
        let opts = PipelineOptions {
            platform_defaults: false,
            ..PipelineOptions::default()
        };
        let without = analyze_with(u, &opts, |_, _| {}).unwrap();
        assert_eq!(without.warnings.len(), 1);
        assert_eq!(without.warnings[0].code.0, "W0300");
    }

    #[test]
    fn provenance_is_stable_and_hex_encoded() {
        let a = analyze(ok_unit()).unwrap().provenance;
        let b = analyze(ok_unit()).unwrap().provenance;
        assert_eq!(a, b);
        assert_eq!(a.input_fingerprint_hex().len(), 64);
        assert!(a.to_json().contains(env!("CARGO_PKG_VERSION")));
    }
}

// pass.rs: Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the planner's four passes, their dependency edges, and the
// artifacts they produce. The pipeline runner uses `required_passes` to run
// the minimal prefix for a requested terminal pass.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Canonicalize,
    Reconcile,
    Validate,
    BuildPlan,
}

/// Machine-readable artifact identifiers. Each maps to a concrete type
/// in the analysis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Types,     // TypeTable
    Schema,    // Schema
    Catalog,   // OperationCatalog
    Index,     // DependencyIndex
    Validated, // ValidatedIndex
    Plan,      // DispatchPlan
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a pass.
pub struct PassDescriptor {
    /// Name used in logs and `PipelineError`.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
    /// Artifacts this pass produces.
    pub outputs: &'static [ArtifactId],
    /// What the pass output depends on.
    pub invalidation_key: &'static str,
    /// Post-conditions (documentation only).
    pub invariants: &'static str,
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Canonicalize => PassDescriptor {
            name: "canonicalize",
            inputs: &[],
            outputs: &[ArtifactId::Types, ArtifactId::Schema, ArtifactId::Catalog],
            invalidation_key: "state decl + receiver decl",
            invariants: "every type interned, equal types share one TypeId",
        },
        PassId::Reconcile => PassDescriptor {
            name: "reconcile",
            inputs: &[PassId::Canonicalize],
            outputs: &[ArtifactId::Index],
            invalidation_key: "catalog + field identity",
            invariants: "each parameter maps to exactly one logical field",
        },
        PassId::Validate => PassDescriptor {
            name: "validate",
            inputs: &[PassId::Reconcile],
            outputs: &[ArtifactId::Validated],
            invalidation_key: "schema + index + declared types + options",
            invariants: "coverage, consistency and safety hold for every field",
        },
        PassId::BuildPlan => PassDescriptor {
            name: "build_plan",
            inputs: &[PassId::Validate],
            outputs: &[ArtifactId::Plan],
            invalidation_key: "validated index + catalog",
            invariants: "each shared field compared at most once per dispatch",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

pub const ALL_PASSES: [PassId; 4] = [
    PassId::Canonicalize,
    PassId::Reconcile,
    PassId::Validate,
    PassId::BuildPlan,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────

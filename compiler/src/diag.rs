// diag.rs: Unified diagnostics model
//
// Provides the shared diagnostic types used by every analysis pass. Nothing
// here is source-located: the inputs are declarations handed over by a front
// end, so diagnostics point at operations and fields by name instead.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0100`, `W0300`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Two schema members share a name.
    pub const DUPLICATE_SCHEMA_FIELD: DiagCode = DiagCode("E0001");
    /// An operation parameter has no readable counterpart in the schema.
    pub const SCHEMA_COVERAGE: DiagCode = DiagCode("E0100");
    /// One field name is declared both nullable and non-null across operations.
    pub const NULLABILITY_CONSISTENCY: DiagCode = DiagCode("E0200");
    /// Schema field is nullable where an operation requires non-null.
    pub const NULLABILITY_SAFETY: DiagCode = DiagCode("E0201");
    /// Object type lacks structural equality; diffing degrades to identity.
    pub const STRUCTURAL_EQUALITY: DiagCode = DiagCode("W0300");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related item ─────────────────────────────────────────────────────────

/// What a related item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedKind {
    Operation,
    Field,
    Type,
}

/// A secondary reference providing context for a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Related {
    pub kind: RelatedKind,
    pub name: String,
    pub label: Option<String>,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any analysis pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagCode,
    pub level: DiagLevel,
    pub message: String,
    pub hint: Option<String>,
    pub related: Vec<Related>,
}

impl Diagnostic {
    pub fn error(code: DiagCode, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, code, message)
    }

    pub fn warning(code: DiagCode, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, code, message)
    }

    /// Create a new diagnostic with no hint and no related items.
    pub fn new(level: DiagLevel, code: DiagCode, message: impl Into<String>) -> Self {
        Self {
            code,
            level,
            message: message.into(),
            hint: None,
            related: Vec::new(),
        }
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related operation.
    pub fn with_operation(self, name: impl Into<String>) -> Self {
        self.with_related(RelatedKind::Operation, name, None)
    }

    /// Attach a related field.
    pub fn with_field(self, name: impl Into<String>) -> Self {
        self.with_related(RelatedKind::Field, name, None)
    }

    /// Attach a related item with an optional label.
    pub fn with_related(
        mut self,
        kind: RelatedKind,
        name: impl Into<String>,
        label: Option<String>,
    ) -> Self {
        self.related.push(Related {
            kind,
            name: name.into(),
            label,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }

    /// Related operation names, in attachment order.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.related
            .iter()
            .filter(|r| r.kind == RelatedKind::Operation)
            .map(|r| r.name.as_str())
    }
}

/// True if any diagnostic has error level.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

impl fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedKind::Operation => write!(f, "operation"),
            RelatedKind::Field => write!(f, "field"),
            RelatedKind::Type => write!(f, "type"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        write!(f, "{}[{}]: {}", level, self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        for r in &self.related {
            write!(f, "\n  --> {} {}", r.kind, r.name)?;
            if let Some(label) = &r.label {
                write!(f, " ({})", label)?;
            }
        }
        Ok(())
    }
}

// dpc: Diff Plan Compiler
//
// Library root. Pass order: canonicalize (schema, catalog) → reconcile →
// validate → build plan; `pipeline::analyze` runs all of them.

pub mod catalog;
pub mod diag;
pub mod equality;
pub mod id;
pub mod interp;
pub mod lexer;
pub mod manifest;
pub mod parser;
pub mod pass;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod schema;
pub mod types;
pub mod validate;

pub use pipeline::{analyze, analyze_with, Analysis, AnalysisUnit, PipelineError, PipelineOptions};

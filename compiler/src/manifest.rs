// manifest.rs: JSON interchange form of one analysis unit
//
// A front end that extracts state members and receiver operations from
// compile-time metadata can hand them over as a manifest instead of building
// declarations in Rust. Types are written as text (`java.util.List<Foo>`,
// `int[]`, `String?`) and parsed by `parser::parse_decl`; a trailing `?`
// and `"nullable": true` both mark a declaration nullable.
//
// `canonical_json` renders compact JSON with a fixed key order. It is the
// input to the unit fingerprint, so it must not depend on how the manifest
// was obtained.

use serde::{Deserialize, Serialize};

use crate::catalog::{OperationDecl, ParamDecl, ReceiverDecl};
use crate::parser::{parse_decl, TypeSyntaxError};
use crate::pipeline::AnalysisUnit;
use crate::schema::{DeclaredTypes, MemberDecl, StateDecl};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitManifest {
    pub state: StateManifest,
    pub receiver: ReceiverManifest,
    #[serde(default)]
    pub types: Vec<TypeManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateManifest {
    pub name: String,
    #[serde(default)]
    pub structural_equality: bool,
    pub fields: Vec<MemberManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default = "default_accessible")]
    pub accessible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverManifest {
    pub name: String,
    pub operations: Vec<OperationManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationManifest {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParamManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeManifest {
    pub name: String,
    pub structural_equality: bool,
}

fn default_accessible() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{location}: {source}")]
    Type {
        location: String,
        #[source]
        source: TypeSyntaxError,
    },
}

impl UnitManifest {
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Compact JSON, keys in declaration order.
    pub fn canonical_json(&self) -> String {
        // Only string/bool/sequence fields: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse every type and build the declarations.
    pub fn to_unit(&self) -> Result<AnalysisUnit, ManifestError> {
        let mut members = Vec::with_capacity(self.state.fields.len());
        for m in &self.state.fields {
            let decl = parse_decl(&m.ty).map_err(|source| ManifestError::Type {
                location: format!("state {} field {}", self.state.name, m.name),
                source,
            })?;
            members.push(MemberDecl {
                name: m.name.clone(),
                ty: decl.ty,
                nullable: m.nullable || decl.nullable,
                accessible: m.accessible,
            });
        }

        let mut operations = Vec::with_capacity(self.receiver.operations.len());
        for op in &self.receiver.operations {
            let mut parameters = Vec::with_capacity(op.parameters.len());
            for p in &op.parameters {
                let decl = parse_decl(&p.ty).map_err(|source| ManifestError::Type {
                    location: format!(
                        "receiver {} operation {} parameter {}",
                        self.receiver.name, op.name, p.name
                    ),
                    source,
                })?;
                parameters.push(ParamDecl {
                    name: p.name.clone(),
                    ty: decl.ty,
                    nullable: p.nullable || decl.nullable,
                });
            }
            operations.push(OperationDecl {
                name: op.name.clone(),
                parameters,
            });
        }

        let mut declared = DeclaredTypes::new();
        for t in &self.types {
            declared.register(t.name.clone(), t.structural_equality);
        }

        Ok(AnalysisUnit {
            state: StateDecl {
                name: self.state.name.clone(),
                structural_equality: self.state.structural_equality,
                members,
            },
            receiver: ReceiverDecl {
                name: self.receiver.name.clone(),
                operations,
            },
            declared,
        })
    }

    /// Manifest form of a unit; nullability always goes to the flag.
    pub fn from_unit(unit: &AnalysisUnit) -> Self {
        UnitManifest {
            state: StateManifest {
                name: unit.state.name.clone(),
                structural_equality: unit.state.structural_equality,
                fields: unit
                    .state
                    .members
                    .iter()
                    .map(|m| MemberManifest {
                        name: m.name.clone(),
                        ty: m.ty.to_string(),
                        nullable: m.nullable,
                        accessible: m.accessible,
                    })
                    .collect(),
            },
            receiver: ReceiverManifest {
                name: unit.receiver.name.clone(),
                operations: unit
                    .receiver
                    .operations
                    .iter()
                    .map(|op| OperationManifest {
                        name: op.name.clone(),
                        parameters: op
                            .parameters
                            .iter()
                            .map(|p| ParamManifest {
                                name: p.name.clone(),
                                ty: p.ty.to_string(),
                                nullable: p.nullable,
                            })
                            .collect(),
                    })
                    .collect(),
            },
            types: unit
                .declared
                .iter()
                .map(|t| TypeManifest {
                    name: t.name.clone(),
                    structural_equality: t.structural_equality,
                })
                .collect(),
        }
    }
}

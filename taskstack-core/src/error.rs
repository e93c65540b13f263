//! Synthesis error taxonomy

use thiserror::Error;

/// Errors raised while declaring constructs or synthesizing a template
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    #[error("duplicate parameter: {0}")]
    DuplicateParameter(String),

    #[error("invalid stack name: {0}")]
    InvalidStackName(String),

    #[error("invalid construct id: {0}")]
    InvalidConstructId(String),

    #[error("invalid resource name for {kind}: {name}")]
    InvalidResourceName { kind: &'static str, name: String },

    #[error("{from} references undeclared target {to}")]
    DanglingReference { from: String, to: String },

    #[error("no resource with logical id {0}")]
    ResourceNotFound(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

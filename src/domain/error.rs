//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::hierarchy::NodeId;

/// Declaration mistakes detected while a model type is being built.
///
/// These abort type construction: a type that fails here never becomes usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{model}.{field}: explicit parent '{parent}' is not a declared child of this model")]
    UnknownParent {
        model: String,
        field: String,
        parent: String,
    },

    #[error("{model}.{field}: explicit parent '{parent}' is shadowed by a non-child attribute")]
    ShadowedParent {
        model: String,
        field: String,
        parent: String,
    },

    #[error("{model}.{field}: explicit parent chain loops back onto itself")]
    CyclicParent { model: String, field: String },

    #[error("{model}: attribute '{attribute}' declared more than once")]
    DuplicateAttribute { model: String, attribute: String },

    #[error("model '{model}' is already registered")]
    DuplicateModel { model: String },
}

/// Domain errors represent model and hierarchy violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("{model} has no attribute '{attribute}'")]
    AttributeNotFound { model: String, attribute: String },

    #[error("{model}.{attribute} is not callable")]
    NotCallable { model: String, attribute: String },

    #[error("{model}.{attribute} is a method, not a value")]
    NotReadable { model: String, attribute: String },

    #[error("assigning parent {parent} to {node} would create a cycle")]
    CycleDetected { node: NodeId, parent: NodeId },

    #[error("{method}: {message}")]
    InvalidArgument { method: String, message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

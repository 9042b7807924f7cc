use thiserror::Error;

use crate::identity::IdentityError;
use crate::request::stage::{Entity, Operation};
use crate::request::validation::Violations;
use crate::storage::StorageError;
use crate::store::StoreError;

/// Every way a pipeline run can short-circuit
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("role {role:?} may not perform {operation:?}")]
    Forbidden {
        operation: Operation,
        role: Option<String>,
    },

    #[error("validation failed: {0}")]
    Validation(Violations),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: Entity, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("identity provider rejected {operation:?}: {source}")]
    Identity {
        operation: Operation,
        #[source]
        source: IdentityError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        PipelineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn identity(operation: Operation, source: IdentityError) -> Self {
        PipelineError::Identity { operation, source }
    }
}

impl From<crate::thumbnail::ReconcileError> for PipelineError {
    fn from(err: crate::thumbnail::ReconcileError) -> Self {
        match err {
            crate::thumbnail::ReconcileError::Store(e) => PipelineError::Store(e),
            crate::thumbnail::ReconcileError::Storage(e) => PipelineError::Storage(e),
        }
    }
}

use crate::entity::Entity;
use thiserror::Error;

/// Errors raised while configuring or filling the spatial hash grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("spatial hash capacity exceeded: {required} insertions requested, {capacity} available")]
    CapacityExceeded { required: usize, capacity: usize },

    #[error("invalid spatial hash config: {reason}")]
    InvalidConfig { reason: String },
}

/// Errors that abort a collision step before any position is committed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("entity {entity} at snapshot index {index} has a non-finite position")]
    InvalidEntityState { entity: Entity, index: usize },
}

impl StepError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

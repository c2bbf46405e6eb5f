// Error taxonomy for the collection view engine

use thiserror::Error;

/// Errors surfaced at the collection boundary. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Explicitly rejected input (empty id, invalid collection name, ...)
    #[error("invalid {what}: {reason}")]
    Validation { what: String, reason: String },

    /// The collaborator failed to load records; the store keeps its previous contents
    #[error("failed to load {collection}: {reason}")]
    Load { collection: String, reason: String },

    /// A single mutate/remove failed
    #[error("failed to {action} record {id}: {reason}")]
    Mutation { action: String, id: String, reason: String },
}

impl Error {
    pub fn validation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn load(collection: &str, report: &eyre::Report) -> Self {
        Error::Load {
            collection: collection.to_string(),
            reason: format!("{:#}", report),
        }
    }

    pub(crate) fn mutation(action: &str, id: &str, report: &eyre::Report) -> Self {
        Error::Mutation {
            action: action.to_string(),
            id: id.to_string(),
            reason: format!("{:#}", report),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

use crate::datasource::ChainError;
use crate::domain::{Perspective, ProposalId, ProposalState, WeiConversionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid parameter selection: {0:?}")]
    InvalidParameterSelection(String),
    #[error("Invalid value for {parameter}: {reason}")]
    InvalidParameterValue { parameter: String, reason: String },
    #[error("No route found between pickup and dropoff")]
    NoRouteFound,
    #[error("Transaction {action} rejected: {reason}")]
    TransactionRejected { action: String, reason: String },
    #[error("Transaction {action} not confirmed within {after_ms}ms")]
    TransactionTimedOut { action: String, after_ms: u64 },
    #[error("Proposal {proposal_id} must be {required}, found {}", state_name(.actual))]
    ProposalNotReady {
        proposal_id: ProposalId,
        required: ProposalState,
        actual: Option<ProposalState>,
    },
    #[error("Unknown proposal: {0}")]
    UnknownProposal(ProposalId),
    #[error("No active ride")]
    NoActiveRide,
    #[error("{action} is not available to a {perspective}")]
    WrongPerspective {
        action: &'static str,
        perspective: Perspective,
    },
    #[error("Account {0} is not registered as a {1}")]
    NotRegistered(String, Perspective),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

fn state_name(state: &Option<ProposalState>) -> String {
    match state {
        Some(state) => state.to_string(),
        None => "unknown".to_string(),
    }
}

impl From<WeiConversionError> for CoreError {
    fn from(err: WeiConversionError) -> Self {
        CoreError::InvalidParameterValue {
            parameter: "amount".to_string(),
            reason: err.to_string(),
        }
    }
}

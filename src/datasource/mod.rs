//! Collaborator abstractions: chain reads, transaction submission, the event
//! feed and the routing service.

use crate::domain::{
    Address, BlockNumber, Coordinates, Decimal, ExecutionRequest, FeeParameters, LifecycleEvent,
    ProposalId, ProposalRequest, ProposalState, RideRecord, RideRequest, Route, VoteSupport,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod mapbox;
pub mod mock;

pub use mapbox::MapboxDistanceService;
pub use mock::{MockChain, MockDistanceService, MockEventFeed};

/// Read-only view of the ride contract, token and governor.
///
/// Implementations return raw contract state; sentinel filtering happens in
/// the reconcilers.
#[async_trait]
pub trait ChainReader: Send + Sync + fmt::Debug {
    /// Current fare parameters and DAO treasury balance.
    async fn fee_parameters(&self) -> Result<FeeParameters, ChainError>;

    /// All request slots, including emptied ones (zero rider).
    async fn open_ride_requests(&self) -> Result<Vec<RideRequest>, ChainError>;

    /// The active-ride slot for `participant`, zeroed when there is none.
    async fn active_ride(&self, participant: &Address) -> Result<RideRecord, ChainError>;

    async fn proposal_state(&self, proposal_id: &ProposalId)
        -> Result<ProposalState, ChainError>;

    async fn block_number(&self) -> Result<BlockNumber, ChainError>;

    async fn is_rider(&self, account: &Address) -> Result<bool, ChainError>;

    async fn is_driver(&self, account: &Address) -> Result<bool, ChainError>;
}

/// A state-changing call against the LiteRide contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum TransactionRequest {
    CreateRider,
    CreateDriver,
    /// Token allowance letting the ride contract collect the fare.
    ApproveFare {
        amount: Decimal,
    },
    RequestRide {
        rider: Address,
        distance_miles: u64,
        amount: Decimal,
        pickup: Coordinates,
        dropoff: Coordinates,
    },
    AcceptRide {
        rider: Address,
        request_block: BlockNumber,
    },
    StartRide {
        rider: Address,
        request_block: BlockNumber,
    },
    EndRide {
        rider: Address,
        request_block: BlockNumber,
        distance_miles: u64,
    },
    Propose(ProposalRequest),
    CastVote {
        proposal_id: ProposalId,
        support: VoteSupport,
        reason: String,
    },
    Queue(ExecutionRequest),
    Execute(ExecutionRequest),
}

impl TransactionRequest {
    /// Contract method name, used in logs and errors.
    pub fn action(&self) -> &'static str {
        match self {
            TransactionRequest::CreateRider => "createRider",
            TransactionRequest::CreateDriver => "createDriver",
            TransactionRequest::ApproveFare { .. } => "approve",
            TransactionRequest::RequestRide { .. } => "requestRide",
            TransactionRequest::AcceptRide { .. } => "acceptRide",
            TransactionRequest::StartRide { .. } => "startRide",
            TransactionRequest::EndRide { .. } => "endRide",
            TransactionRequest::Propose(_) => "propose",
            TransactionRequest::CastVote { .. } => "castVoteWithReason",
            TransactionRequest::Queue(_) => "queue",
            TransactionRequest::Execute(_) => "execute",
        }
    }
}

/// Confirmation of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: BlockNumber,
}

/// Signs and submits transactions, resolving once they are confirmed.
///
/// The signing identity is owned by the implementation.
#[async_trait]
pub trait ChainWriter: Send + Sync + fmt::Debug {
    async fn submit(
        &self,
        tx: &TransactionRequest,
        gas_limit: Option<u64>,
    ) -> Result<TxReceipt, ChainError>;
}

/// Push-delivered lifecycle events.
#[async_trait]
pub trait EventFeed: Send + Sync + fmt::Debug {
    /// Start a new listener. The stream ends when the feed shuts down.
    async fn subscribe(&self) -> Result<BoxStream<'static, LifecycleEvent>, ChainError>;
}

/// Driving distance between two points.
#[async_trait]
pub trait DistanceService: Send + Sync + fmt::Debug {
    /// `Ok(None)` when no drivable route exists.
    async fn route(
        &self,
        pickup: Coordinates,
        dropoff: Coordinates,
    ) -> Result<Option<Route>, ChainError>;
}

/// Error type for collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Transport failure before the call reached the node (retryable)
    NetworkError(String),
    /// HTTP error from an off-chain service
    HttpError { status: u16, message: String },
    /// The wallet or the chain refused the call
    Rejected(String),
    /// Response could not be decoded
    ParseError(String),
    /// Other error
    Other(String),
}

impl ChainError {
    /// Whether retrying the same call can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ChainError::NetworkError(_) => true,
            ChainError::HttpError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ChainError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ChainError::Rejected(msg) => write!(f, "Rejected: {}", msg),
            ChainError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ChainError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

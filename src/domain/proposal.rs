//! Governance proposals and the requests built from them.

use crate::domain::{Address, BlockNumber, ProposalId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Governor proposal state, in the contract's numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Pending = 0,
    Active = 1,
    Canceled = 2,
    Defeated = 3,
    Succeeded = 4,
    Queued = 5,
    Expired = 6,
    Executed = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown proposal state {0}")]
pub struct UnknownProposalState(pub u8);

impl TryFrom<u8> for ProposalState {
    type Error = UnknownProposalState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ProposalState::Pending,
            1 => ProposalState::Active,
            2 => ProposalState::Canceled,
            3 => ProposalState::Defeated,
            4 => ProposalState::Succeeded,
            5 => ProposalState::Queued,
            6 => ProposalState::Expired,
            7 => ProposalState::Executed,
            other => return Err(UnknownProposalState(other)),
        })
    }
}

impl std::fmt::Display for ProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProposalState::Pending => "Pending",
            ProposalState::Active => "Active",
            ProposalState::Canceled => "Canceled",
            ProposalState::Defeated => "Defeated",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Queued => "Queued",
            ProposalState::Expired => "Expired",
            ProposalState::Executed => "Executed",
        };
        write!(f, "{}", name)
    }
}

/// ABI-encoded contract call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Calldata(pub Vec<u8>);

impl Calldata {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl std::fmt::Display for Calldata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A proposal observed on the governor.
///
/// `state` is `None` until fetched; it is never derived locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: ProposalId,
    pub proposer: Address,
    pub targets: Vec<Address>,
    /// Native value per call, in wei.
    pub values: Vec<u128>,
    pub signatures: Vec<String>,
    pub calldatas: Vec<Calldata>,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub description: String,
    pub state: Option<ProposalState>,
}

/// Arguments for `propose`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub targets: Vec<Address>,
    pub values: Vec<u128>,
    pub calldatas: Vec<Calldata>,
    pub description: String,
}

/// Arguments shared by `queue` and `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub proposal_id: ProposalId,
    pub targets: Vec<Address>,
    pub values: Vec<u128>,
    pub calldatas: Vec<Calldata>,
    /// Keccak-256 of the UTF-8 description.
    pub description_hash: [u8; 32],
}

/// Ride-contract parameters the DAO may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GovernedParameter {
    BaseFee,
    BaseFeeDistance,
    DistanceFee,
    DaoFee,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown governed parameter {0:?}")]
pub struct UnknownParameter(pub String);

impl GovernedParameter {
    pub const ALL: [GovernedParameter; 4] = [
        GovernedParameter::BaseFee,
        GovernedParameter::BaseFeeDistance,
        GovernedParameter::DistanceFee,
        GovernedParameter::DaoFee,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            GovernedParameter::BaseFee => "baseFee",
            GovernedParameter::BaseFeeDistance => "baseFeeDistance",
            GovernedParameter::DistanceFee => "distanceFee",
            GovernedParameter::DaoFee => "daoFee",
        }
    }

    /// Solidity signature of the ride-contract setter.
    pub fn setter_signature(&self) -> &'static str {
        match self {
            GovernedParameter::BaseFee => "updateBaseFee(uint256)",
            GovernedParameter::BaseFeeDistance => "updateBaseFeeDistance(uint256)",
            GovernedParameter::DistanceFee => "updateDistanceFee(uint256)",
            GovernedParameter::DaoFee => "updateDaoFee(uint256)",
        }
    }

    /// Token amounts go on chain as wei; distances and percentages as-is.
    pub fn is_token_amount(&self) -> bool {
        matches!(
            self,
            GovernedParameter::BaseFee | GovernedParameter::DistanceFee
        )
    }
}

impl FromStr for GovernedParameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GovernedParameter::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| UnknownParameter(s.to_string()))
    }
}

impl std::fmt::Display for GovernedParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Ballot choice for `castVote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteSupport {
    Against = 0,
    For = 1,
}

impl VoteSupport {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

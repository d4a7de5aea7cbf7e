//! Lifecycle events pushed by the ride contract and the governor.

use crate::domain::{
    Address, BlockNumber, Calldata, Coordinates, Decimal, Proposal, ProposalId, RideId,
    RideRequest,
};
use serde::{Deserialize, Serialize};

/// Fields every ride event carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideEventFields {
    pub ride_id: RideId,
    pub driver: Address,
    pub rider: Address,
    pub distance_estimated: u64,
    pub amount_agreed: Decimal,
    pub pickup: Coordinates,
    pub dropoff: Coordinates,
    pub request_block: BlockNumber,
}

impl RideEventFields {
    pub fn to_request(&self) -> RideRequest {
        RideRequest {
            ride_id: self.ride_id.clone(),
            rider: self.rider.clone(),
            distance_estimated: self.distance_estimated,
            amount_estimated: self.amount_agreed,
            pickup: self.pickup,
            dropoff: self.dropoff,
            request_block: self.request_block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalCreated {
    pub proposal_id: ProposalId,
    pub proposer: Address,
    pub targets: Vec<Address>,
    pub values: Vec<u128>,
    pub signatures: Vec<String>,
    pub calldatas: Vec<Calldata>,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub description: String,
}

impl ProposalCreated {
    pub fn into_proposal(self) -> Proposal {
        Proposal {
            proposal_id: self.proposal_id,
            proposer: self.proposer,
            targets: self.targets,
            values: self.values,
            signatures: self.signatures,
            calldatas: self.calldatas,
            start_block: self.start_block,
            end_block: self.end_block,
            description: self.description,
            state: None,
        }
    }
}

/// One push notification from the event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    RideRequested(RideEventFields),
    RideAccepted {
        #[serde(flatten)]
        ride: RideEventFields,
        accepted_block: BlockNumber,
    },
    RideStarted {
        #[serde(flatten)]
        ride: RideEventFields,
        accepted_block: BlockNumber,
        started_block: BlockNumber,
    },
    RideEnded {
        ride_id: RideId,
        driver: Address,
        rider: Address,
    },
    ProposalCreated(ProposalCreated),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::RideRequested(_) => "RideRequested",
            LifecycleEvent::RideAccepted { .. } => "RideAccepted",
            LifecycleEvent::RideStarted { .. } => "RideStarted",
            LifecycleEvent::RideEnded { .. } => "RideEnded",
            LifecycleEvent::ProposalCreated(_) => "ProposalCreated",
        }
    }

    pub fn ride_id(&self) -> Option<&RideId> {
        match self {
            LifecycleEvent::RideRequested(ride)
            | LifecycleEvent::RideAccepted { ride, .. }
            | LifecycleEvent::RideStarted { ride, .. } => Some(&ride.ride_id),
            LifecycleEvent::RideEnded { ride_id, .. } => Some(ride_id),
            LifecycleEvent::ProposalCreated(_) => None,
        }
    }
}

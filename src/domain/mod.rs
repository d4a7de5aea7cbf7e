//! Domain types for the LiteRide core.
//!
//! This module provides:
//! - Lossless token amounts via the Decimal wrapper, with wei conversion
//! - Domain primitives: Address, BlockNumber, RideId, ProposalId, Coordinates
//! - Ride requests, rides and the raw active-ride snapshot
//! - Fee parameters and trip estimates
//! - Governance proposals and lifecycle events

pub mod decimal;
pub mod events;
pub mod fees;
pub mod primitives;
pub mod proposal;
pub mod ride;

pub use decimal::{Decimal, WeiConversionError};
pub use events::{LifecycleEvent, ProposalCreated, RideEventFields};
pub use fees::{FeeParameters, Route, TripEstimate};
pub use primitives::{
    Address, BlockNumber, Coordinates, CoordinatesParseError, Perspective, ProposalId, RideId,
};
pub use proposal::{
    Calldata, ExecutionRequest, GovernedParameter, Proposal, ProposalRequest, ProposalState,
    UnknownParameter, UnknownProposalState, VoteSupport,
};
pub use ride::{Ride, RideRecord, RideRequest, RideStatus};

//! Ride requests and rides.

use crate::domain::{Address, BlockNumber, Coordinates, Decimal, RideId};
use serde::{Deserialize, Serialize};

/// A pending ride offer waiting for a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    pub ride_id: RideId,
    pub rider: Address,
    /// Estimated distance in whole miles.
    pub distance_estimated: u64,
    pub amount_estimated: Decimal,
    pub pickup: Coordinates,
    pub dropoff: Coordinates,
    pub request_block: BlockNumber,
}

/// Lifecycle position of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Requested,
    Accepted,
    Started,
    Ended,
}

impl RideStatus {
    /// Whether `next` is the single forward step from `self`.
    pub fn can_advance_to(&self, next: RideStatus) -> bool {
        matches!(
            (self, next),
            (RideStatus::Requested, RideStatus::Accepted)
                | (RideStatus::Accepted, RideStatus::Started)
                | (RideStatus::Started, RideStatus::Ended)
        )
    }
}

/// A request that a driver has accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub ride_id: RideId,
    pub rider: Address,
    pub driver: Address,
    pub distance_estimated: u64,
    pub amount_estimated: Decimal,
    pub pickup: Coordinates,
    pub dropoff: Coordinates,
    pub request_block: BlockNumber,
    pub accepted_block: BlockNumber,
    pub started_block: Option<BlockNumber>,
    pub end_block: Option<BlockNumber>,
    pub status: RideStatus,
}

impl Ride {
    pub fn is_started(&self) -> bool {
        self.status == RideStatus::Started
    }
}

/// Raw contents of the on-chain active-ride slot.
///
/// Empty slots come back with zero addresses and zero blocks rather than
/// being absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRecord {
    pub ride_id: RideId,
    pub rider: Address,
    pub driver: Address,
    pub distance_estimated: u64,
    pub amount_estimated: Decimal,
    pub pickup: Coordinates,
    pub dropoff: Coordinates,
    pub request_block: BlockNumber,
    pub accepted_block: BlockNumber,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
}

impl RideRecord {
    /// The record an empty slot decodes to.
    pub fn empty() -> Self {
        RideRecord {
            ride_id: RideId::new("0"),
            rider: Address::zero(),
            driver: Address::zero(),
            distance_estimated: 0,
            amount_estimated: Decimal::zero(),
            pickup: Coordinates::new(0.0, 0.0),
            dropoff: Coordinates::new(0.0, 0.0),
            request_block: BlockNumber::default(),
            accepted_block: BlockNumber::default(),
            start_block: BlockNumber::default(),
            end_block: BlockNumber::default(),
        }
    }

    /// Convert to a tracked ride, or `None` if the slot holds nothing live.
    pub fn into_ride(self) -> Option<Ride> {
        if !self.end_block.is_unset() {
            return None;
        }
        let (status, started_block) = if self.start_block.is_unset() {
            (RideStatus::Accepted, None)
        } else {
            (RideStatus::Started, Some(self.start_block))
        };
        Some(Ride {
            ride_id: self.ride_id,
            rider: self.rider,
            driver: self.driver,
            distance_estimated: self.distance_estimated,
            amount_estimated: self.amount_estimated,
            pickup: self.pickup,
            dropoff: self.dropoff,
            request_block: self.request_block,
            accepted_block: self.accepted_block,
            started_block,
            end_block: None,
            status,
        })
    }
}

//! Fee parameters, routes and trip estimates.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Global fare configuration held by the ride contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParameters {
    /// Flat fare for any ride up to `base_fee_distance`.
    pub base_fee: Decimal,
    /// Miles covered by the base fee.
    pub base_fee_distance: u64,
    /// Price per mile beyond `base_fee_distance`.
    pub distance_fee: Decimal,
    /// Percentage of each fare retained by the DAO.
    pub dao_fee: u32,
    /// Treasury balance, informational.
    pub dao_balance: Decimal,
}

/// A driving route as reported by the distance service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_miles: f64,
    pub duration_minutes: f64,
}

/// Fare quote for a pickup/dropoff pair. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripEstimate {
    pub estimate: Decimal,
    /// Route distance floored to whole miles.
    pub distance_in_miles: u64,
    pub duration_in_minutes: f64,
}

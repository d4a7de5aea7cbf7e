//! Fare estimation.

use crate::domain::{Decimal, FeeParameters, Route, TripEstimate};
use crate::error::CoreError;

/// Fare for a trip of `distance_miles` whole miles.
///
/// Trips shorter than `base_fee_distance` pay the base fee; longer trips add
/// `distance_fee` per mile beyond it. A trip of exactly `base_fee_distance`
/// takes the second branch with a zero surcharge. Fares too large to
/// represent clamp to [`Decimal::MAX`].
pub fn estimate_fare(
    base_fee: Decimal,
    base_fee_distance: u64,
    distance_fee: Decimal,
    distance_miles: u64,
) -> Decimal {
    if distance_miles < base_fee_distance {
        return base_fee;
    }
    let remaining = distance_miles - base_fee_distance;
    base_fee.saturating_add(Decimal::from(remaining).saturating_mul(distance_fee))
}

/// Floor a measured distance to whole miles, as the ride contract stores it.
pub fn floor_miles(distance: f64) -> u64 {
    if !distance.is_finite() || distance <= 0.0 {
        return 0;
    }
    distance.floor() as u64
}

/// Quote a trip from the current fee parameters and a driving route.
pub fn trip_estimate(
    params: &FeeParameters,
    route: Option<Route>,
) -> Result<TripEstimate, CoreError> {
    let route = route.ok_or(CoreError::NoRouteFound)?;
    let distance_in_miles = floor_miles(route.distance_miles);
    let estimate = estimate_fare(
        params.base_fee,
        params.base_fee_distance,
        params.distance_fee,
        distance_in_miles,
    );

    Ok(TripEstimate {
        estimate,
        distance_in_miles,
        duration_in_minutes: route.duration_minutes,
    })
}

//! Pure computation: fares, ride reconciliation and proposal tracking.

pub mod abi;
pub mod fare;
pub mod governance;
pub mod reconciler;

pub use fare::{estimate_fare, floor_miles, trip_estimate};
pub use governance::{
    build_execution_request, build_parameter_change_proposal, build_queue_request, DaoView,
    ProposalTracker,
};
pub use reconciler::{EndedEventPolicy, EventOutcome, IgnoreReason, RideReconciler, RideView};

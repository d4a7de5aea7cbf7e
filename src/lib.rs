pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod telemetry;

pub use config::{Config, TxPolicy};
pub use datasource::{
    ChainError, ChainReader, ChainWriter, DistanceService, EventFeed, MapboxDistanceService,
    MockChain, MockDistanceService, MockEventFeed, TransactionRequest, TxReceipt,
};
pub use domain::{
    Address, BlockNumber, Coordinates, Decimal, FeeParameters, LifecycleEvent, Perspective,
    Proposal, ProposalId, ProposalState, Ride, RideId, RideRequest, TripEstimate, VoteSupport,
};
pub use engine::{EndedEventPolicy, EventOutcome, RideReconciler, RideView};
pub use error::CoreError;
pub use orchestration::{DaoSession, RideSession, Subscription, TransactionSubmitter};

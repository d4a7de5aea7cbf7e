//! Sessions binding the reconcilers to the chain, the event feed and the
//! routing service.

pub mod dao;
pub mod ride;
pub mod submit;
pub mod subscription;

pub use dao::{refresh_proposal_states, DaoSession};
pub use ride::RideSession;
pub use submit::TransactionSubmitter;
pub use subscription::{EventSink, Subscription};

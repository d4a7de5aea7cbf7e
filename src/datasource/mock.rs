//! In-memory collaborators for tests and offline embedding.

use super::{
    ChainError, ChainReader, ChainWriter, DistanceService, EventFeed, TransactionRequest,
    TxReceipt,
};
use crate::domain::{
    Address, BlockNumber, Coordinates, FeeParameters, LifecycleEvent, ProposalId, ProposalState,
    RideRecord, RideRequest, Route,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

#[derive(Debug, Default)]
struct ChainState {
    fee_parameters: Option<FeeParameters>,
    requests: Vec<RideRequest>,
    active_rides: HashMap<Address, RideRecord>,
    proposal_states: HashMap<ProposalId, ProposalState>,
    proposal_state_reads: Vec<ProposalId>,
    block: BlockNumber,
    riders: HashSet<Address>,
    drivers: HashSet<Address>,
    submitted: Vec<(TransactionRequest, Option<u64>)>,
    submit_failures: VecDeque<ChainError>,
    submit_delay: Option<Duration>,
}

/// Mock chain acting as both reader and writer for a single signer.
#[derive(Debug)]
pub struct MockChain {
    signer: Address,
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(signer: Address) -> Self {
        Self {
            signer,
            state: Mutex::new(ChainState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_fee_parameters(self, params: FeeParameters) -> Self {
        self.set_fee_parameters(params);
        self
    }

    pub fn with_request(self, request: RideRequest) -> Self {
        self.state().requests.push(request);
        self
    }

    pub fn with_rider(self, account: Address) -> Self {
        self.state().riders.insert(account);
        self
    }

    pub fn with_driver(self, account: Address) -> Self {
        self.state().drivers.insert(account);
        self
    }

    pub fn with_block(self, block: u64) -> Self {
        self.state().block = BlockNumber::new(block);
        self
    }

    pub fn set_fee_parameters(&self, params: FeeParameters) {
        self.state().fee_parameters = Some(params);
    }

    pub fn set_requests(&self, requests: Vec<RideRequest>) {
        self.state().requests = requests;
    }

    pub fn set_active_ride(&self, participant: Address, record: RideRecord) {
        self.state().active_rides.insert(participant, record);
    }

    pub fn clear_active_ride(&self, participant: &Address) {
        self.state().active_rides.remove(participant);
    }

    pub fn set_proposal_state(&self, proposal_id: ProposalId, state: ProposalState) {
        self.state().proposal_states.insert(proposal_id, state);
    }

    /// Make the next `submit` fail with `error`.
    pub fn fail_next_submit(&self, error: ChainError) {
        self.state().submit_failures.push_back(error);
    }

    /// Delay every confirmation by `delay`.
    pub fn set_submit_delay(&self, delay: Duration) {
        self.state().submit_delay = Some(delay);
    }

    /// Every submitted transaction, in order, with its gas limit.
    pub fn submitted(&self) -> Vec<(TransactionRequest, Option<u64>)> {
        self.state().submitted.clone()
    }

    /// Proposal ids whose state was read, in order.
    pub fn proposal_state_reads(&self) -> Vec<ProposalId> {
        self.state().proposal_state_reads.clone()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn fee_parameters(&self) -> Result<FeeParameters, ChainError> {
        self.state()
            .fee_parameters
            .clone()
            .ok_or_else(|| ChainError::Other("fee parameters not set".to_string()))
    }

    async fn open_ride_requests(&self) -> Result<Vec<RideRequest>, ChainError> {
        Ok(self.state().requests.clone())
    }

    async fn active_ride(&self, participant: &Address) -> Result<RideRecord, ChainError> {
        Ok(self
            .state()
            .active_rides
            .get(participant)
            .cloned()
            .unwrap_or_else(RideRecord::empty))
    }

    async fn proposal_state(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<ProposalState, ChainError> {
        let mut state = self.state();
        state.proposal_state_reads.push(proposal_id.clone());
        state
            .proposal_states
            .get(proposal_id)
            .copied()
            .ok_or_else(|| ChainError::Rejected(format!("unknown proposal id {}", proposal_id)))
    }

    async fn block_number(&self) -> Result<BlockNumber, ChainError> {
        Ok(self.state().block)
    }

    async fn is_rider(&self, account: &Address) -> Result<bool, ChainError> {
        Ok(self.state().riders.contains(account))
    }

    async fn is_driver(&self, account: &Address) -> Result<bool, ChainError> {
        Ok(self.state().drivers.contains(account))
    }
}

#[async_trait]
impl ChainWriter for MockChain {
    async fn submit(
        &self,
        tx: &TransactionRequest,
        gas_limit: Option<u64>,
    ) -> Result<TxReceipt, ChainError> {
        let delay = self.state().submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some(error) = state.submit_failures.pop_front() {
            return Err(error);
        }

        match tx {
            TransactionRequest::CreateRider => {
                state.riders.insert(self.signer.clone());
            }
            TransactionRequest::CreateDriver => {
                state.drivers.insert(self.signer.clone());
            }
            _ => {}
        }

        state.submitted.push((tx.clone(), gas_limit));
        state.block = BlockNumber::new(state.block.as_u64() + 1);
        Ok(TxReceipt {
            tx_hash: format!("0x{:064x}", state.submitted.len()),
            block_number: state.block,
        })
    }
}

/// Event feed backed by a broadcast channel; every subscriber sees every
/// event published after it subscribed.
#[derive(Debug)]
pub struct MockEventFeed {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl MockEventFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Publish an event; returns the number of listeners reached.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for MockEventFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventFeed for MockEventFeed {
    async fn subscribe(&self) -> Result<BoxStream<'static, LifecycleEvent>, ChainError> {
        let receiver = self.sender.subscribe();
        let events = stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event listener lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(events.boxed())
    }
}

/// Distance service returning a fixed route.
#[derive(Debug, Clone, Default)]
pub struct MockDistanceService {
    route: Option<Route>,
}

impl MockDistanceService {
    pub fn new(route: Option<Route>) -> Self {
        Self { route }
    }

    pub fn with_route(distance_miles: f64, duration_minutes: f64) -> Self {
        Self::new(Some(Route {
            distance_miles,
            duration_minutes,
        }))
    }

    pub fn no_route() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl DistanceService for MockDistanceService {
    async fn route(
        &self,
        _pickup: Coordinates,
        _dropoff: Coordinates,
    ) -> Result<Option<Route>, ChainError> {
        Ok(self.route)
    }
}

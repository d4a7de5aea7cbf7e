use crate::config::Config;
use crate::datasource::{ChainReader, ChainWriter, EventFeed, TransactionRequest, TxReceipt};
use crate::domain::{Address, Decimal, Proposal, ProposalId, ProposalState, VoteSupport};
use crate::engine::{
    build_execution_request, build_parameter_change_proposal, build_queue_request, DaoView,
    ProposalTracker,
};
use crate::error::CoreError;
use crate::orchestration::submit::TransactionSubmitter;
use crate::orchestration::subscription::Subscription;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The governance panel: fee parameters, proposals and their lifecycle
/// actions.
#[derive(Debug, Clone)]
pub struct DaoSession {
    reader: Arc<dyn ChainReader>,
    submitter: TransactionSubmitter,
    tracker: Arc<Mutex<ProposalTracker>>,
    ride_contract: Address,
    vote_reason: String,
}

impl DaoSession {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        config: &Config,
    ) -> Self {
        Self {
            reader,
            submitter: TransactionSubmitter::new(writer, config.tx_policy),
            tracker: Arc::new(Mutex::new(ProposalTracker::new())),
            ride_contract: config.ride_contract.clone(),
            vote_reason: config.vote_reason.clone(),
        }
    }

    pub async fn subscribe(&self, feed: &dyn EventFeed) -> Result<Subscription, CoreError> {
        let events = feed.subscribe().await?;
        info!("DAO session subscribed to proposal events");
        Ok(Subscription::spawn(events, self.tracker.clone()))
    }

    /// Reload the block number and fee parameters, then fetch the state of
    /// every tracked proposal.
    pub async fn refresh(&self) -> Result<DaoView, CoreError> {
        let block = self.reader.block_number().await?;
        let parameters = self.reader.fee_parameters().await?;
        let proposals = self.tracker.lock().await.proposals().to_vec();
        let refreshed = refresh_proposal_states(self.reader.as_ref(), &proposals).await?;

        let mut tracker = self.tracker.lock().await;
        tracker.load_block_number(block);
        tracker.load_parameters(parameters);
        for proposal in &refreshed {
            if let Some(state) = proposal.state {
                tracker.set_state(&proposal.proposal_id, state);
            }
        }
        Ok(tracker.view().clone())
    }

    pub async fn view(&self) -> DaoView {
        self.tracker.lock().await.view().clone()
    }

    /// Propose changing one ride-contract parameter.
    pub async fn propose(
        &self,
        parameter_key: &str,
        new_value: Decimal,
        description: &str,
    ) -> Result<TxReceipt, CoreError> {
        let request = build_parameter_change_proposal(
            &self.ride_contract,
            parameter_key,
            new_value,
            description,
        )?;
        self.submit_and_refresh(&TransactionRequest::Propose(request)).await
    }

    /// Vote on an active proposal.
    pub async fn vote(
        &self,
        proposal_id: &ProposalId,
        support: VoteSupport,
    ) -> Result<TxReceipt, CoreError> {
        let proposal = self.tracked(proposal_id).await?;
        if proposal.state != Some(ProposalState::Active) {
            return Err(CoreError::ProposalNotReady {
                proposal_id: proposal.proposal_id,
                required: ProposalState::Active,
                actual: proposal.state,
            });
        }
        let tx = TransactionRequest::CastVote {
            proposal_id: proposal.proposal_id,
            support,
            reason: self.vote_reason.clone(),
        };
        self.submit_and_refresh(&tx).await
    }

    pub async fn queue(&self, proposal_id: &ProposalId) -> Result<TxReceipt, CoreError> {
        let proposal = self.tracked(proposal_id).await?;
        let request = build_queue_request(&proposal)?;
        self.submit_and_refresh(&TransactionRequest::Queue(request)).await
    }

    pub async fn execute(&self, proposal_id: &ProposalId) -> Result<TxReceipt, CoreError> {
        let proposal = self.tracked(proposal_id).await?;
        let request = build_execution_request(&proposal)?;
        self.submit_and_refresh(&TransactionRequest::Execute(request)).await
    }

    async fn tracked(&self, proposal_id: &ProposalId) -> Result<Proposal, CoreError> {
        self.tracker
            .lock()
            .await
            .proposal(proposal_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownProposal(proposal_id.clone()))
    }

    async fn submit_and_refresh(&self, tx: &TransactionRequest) -> Result<TxReceipt, CoreError> {
        let receipt = self.submitter.submit(tx, None).await?;
        if let Err(e) = self.refresh().await {
            warn!("Refresh after {} failed: {}", tx.action(), e);
        }
        Ok(receipt)
    }
}

/// Fetch the governor state of each proposal, one read at a time, in order.
pub async fn refresh_proposal_states(
    reader: &dyn ChainReader,
    proposals: &[Proposal],
) -> Result<Vec<Proposal>, CoreError> {
    let mut refreshed = Vec::with_capacity(proposals.len());
    for proposal in proposals {
        let state = reader.proposal_state(&proposal.proposal_id).await?;
        debug!("Proposal {} is {}", proposal.proposal_id, state);
        let mut proposal = proposal.clone();
        proposal.state = Some(state);
        refreshed.push(proposal);
    }
    Ok(refreshed)
}

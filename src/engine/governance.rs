use super::abi;
use super::reconciler::{EventOutcome, IgnoreReason};
use crate::domain::{
    Address, BlockNumber, Decimal, ExecutionRequest, FeeParameters, GovernedParameter,
    LifecycleEvent, Proposal, ProposalId, ProposalRequest, ProposalState,
};
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Placeholder key of an empty parameter selection.
pub const NO_PARAMETER: &str = "none";

/// The DAO panel's view: fee parameters and observed proposals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DaoView {
    pub current_block: Option<BlockNumber>,
    pub parameters: Option<FeeParameters>,
    pub proposals: Vec<Proposal>,
}

/// Tracks proposals seen on the event feed and their fetched state.
///
/// The tracker never advances a proposal's state itself; states come from
/// the governor through `set_state`.
#[derive(Debug, Clone, Default)]
pub struct ProposalTracker {
    view: DaoView,
}

impl ProposalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &DaoView {
        &self.view
    }

    pub fn parameters(&self) -> Option<&FeeParameters> {
        self.view.parameters.as_ref()
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.view.proposals
    }

    pub fn proposal(&self, proposal_id: &ProposalId) -> Option<&Proposal> {
        self.view
            .proposals
            .iter()
            .find(|p| &p.proposal_id == proposal_id)
    }

    pub fn load_block_number(&mut self, block: BlockNumber) {
        self.view.current_block = Some(block);
    }

    /// Replace the parameter snapshot.
    pub fn load_parameters(&mut self, parameters: FeeParameters) {
        self.view.parameters = Some(parameters);
    }

    pub fn apply_event(&mut self, event: &LifecycleEvent) -> EventOutcome {
        let created = match event {
            LifecycleEvent::ProposalCreated(created) => created,
            _ => return EventOutcome::Ignored(IgnoreReason::Unrelated),
        };

        if self.proposal(&created.proposal_id).is_some() {
            debug!(
                "Stale event ignored: ProposalCreated {} already tracked",
                created.proposal_id
            );
            return EventOutcome::Ignored(IgnoreReason::DuplicateProposal);
        }

        info!(
            "Tracking proposal {} from {}",
            created.proposal_id, created.proposer
        );
        self.view.proposals.push(created.clone().into_proposal());
        EventOutcome::Applied
    }

    /// Record a state fetched from the governor. Returns false for an
    /// untracked id.
    pub fn set_state(&mut self, proposal_id: &ProposalId, state: ProposalState) -> bool {
        match self
            .view
            .proposals
            .iter_mut()
            .find(|p| &p.proposal_id == proposal_id)
        {
            Some(proposal) => {
                proposal.state = Some(state);
                true
            }
            None => false,
        }
    }
}

/// Build a `propose` call that changes one ride-contract parameter.
///
/// `parameter_key` is one of `baseFee`, `baseFeeDistance`, `distanceFee`,
/// `daoFee`. Fee amounts are encoded in wei; the distance and the DAO
/// percentage must be whole numbers.
pub fn build_parameter_change_proposal(
    target: &Address,
    parameter_key: &str,
    new_value: Decimal,
    description: &str,
) -> Result<ProposalRequest, CoreError> {
    if parameter_key == NO_PARAMETER {
        return Err(CoreError::InvalidParameterSelection(
            parameter_key.to_string(),
        ));
    }
    let parameter: GovernedParameter = parameter_key
        .parse()
        .map_err(|_| CoreError::InvalidParameterSelection(parameter_key.to_string()))?;

    let encoded_value = if parameter.is_token_amount() {
        new_value
            .to_wei()
            .map_err(|e| CoreError::InvalidParameterValue {
                parameter: parameter.key().to_string(),
                reason: e.to_string(),
            })?
    } else {
        new_value
            .to_u64_exact()
            .map(u128::from)
            .ok_or_else(|| CoreError::InvalidParameterValue {
                parameter: parameter.key().to_string(),
                reason: format!("{} is not a non-negative whole number", new_value),
            })?
    };

    Ok(ProposalRequest {
        targets: vec![target.clone()],
        values: vec![0],
        calldatas: vec![abi::encode_uint256_call(
            parameter.setter_signature(),
            encoded_value,
        )],
        description: description.to_string(),
    })
}

/// Build the `queue` call for a proposal that has succeeded.
pub fn build_queue_request(proposal: &Proposal) -> Result<ExecutionRequest, CoreError> {
    require_state(proposal, ProposalState::Succeeded)?;
    Ok(execution_request(proposal))
}

/// Build the `execute` call for a queued proposal.
pub fn build_execution_request(proposal: &Proposal) -> Result<ExecutionRequest, CoreError> {
    require_state(proposal, ProposalState::Queued)?;
    Ok(execution_request(proposal))
}

fn require_state(proposal: &Proposal, required: ProposalState) -> Result<(), CoreError> {
    if proposal.state == Some(required) {
        return Ok(());
    }
    Err(CoreError::ProposalNotReady {
        proposal_id: proposal.proposal_id.clone(),
        required,
        actual: proposal.state,
    })
}

fn execution_request(proposal: &Proposal) -> ExecutionRequest {
    ExecutionRequest {
        proposal_id: proposal.proposal_id.clone(),
        targets: proposal.targets.clone(),
        values: proposal.values.clone(),
        calldatas: proposal.calldatas.clone(),
        description_hash: abi::description_hash(&proposal.description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Calldata, ProposalCreated};

    fn ride_contract() -> Address {
        Address::new("0x00000000000000000000000000000000000000aa")
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn created(id: &str) -> LifecycleEvent {
        LifecycleEvent::ProposalCreated(ProposalCreated {
            proposal_id: ProposalId::new(id),
            proposer: Address::new("0xp1"),
            targets: vec![ride_contract()],
            values: vec![0],
            signatures: vec![String::new()],
            calldatas: vec![Calldata(vec![1, 2, 3])],
            start_block: BlockNumber::new(10),
            end_block: BlockNumber::new(60),
            description: format!("proposal {}", id),
        })
    }

    fn proposal_in(state: Option<ProposalState>) -> Proposal {
        let mut tracker = ProposalTracker::new();
        tracker.apply_event(&created("0x01"));
        let mut proposal = tracker.proposals()[0].clone();
        proposal.state = state;
        proposal
    }

    #[test]
    fn test_proposals_grow_only_from_events() {
        let mut tracker = ProposalTracker::new();
        assert!(tracker.proposals().is_empty());

        assert!(tracker.apply_event(&created("0x01")).is_applied());
        assert!(tracker.apply_event(&created("0x02")).is_applied());
        assert_eq!(
            tracker.apply_event(&created("0x01")),
            EventOutcome::Ignored(IgnoreReason::DuplicateProposal)
        );

        let ids: Vec<_> = tracker
            .proposals()
            .iter()
            .map(|p| p.proposal_id.as_str())
            .collect();
        assert_eq!(ids, vec!["0x01", "0x02"]);
        assert!(tracker.proposals().iter().all(|p| p.state.is_none()));
    }

    #[test]
    fn test_ride_events_are_unrelated() {
        let mut tracker = ProposalTracker::new();
        let event = LifecycleEvent::RideEnded {
            ride_id: crate::domain::RideId::new("1"),
            driver: Address::new("0xd1"),
            rider: Address::new("0xr1"),
        };
        assert_eq!(
            tracker.apply_event(&event),
            EventOutcome::Ignored(IgnoreReason::Unrelated)
        );
    }

    #[test]
    fn test_set_state() {
        let mut tracker = ProposalTracker::new();
        tracker.apply_event(&created("0x01"));
        assert!(tracker.set_state(&ProposalId::new("0x01"), ProposalState::Active));
        assert!(!tracker.set_state(&ProposalId::new("0x99"), ProposalState::Active));
        assert_eq!(tracker.proposals()[0].state, Some(ProposalState::Active));
    }

    #[test]
    fn test_parameter_change_rejects_placeholder_and_unknown() {
        for key in ["none", "", "tip"] {
            let result = build_parameter_change_proposal(&ride_contract(), key, d("1"), "x");
            assert!(
                matches!(result, Err(CoreError::InvalidParameterSelection(ref k)) if k == key),
                "key {:?}",
                key
            );
        }
    }

    #[test]
    fn test_parameter_change_encodes_fee_in_wei() {
        let request =
            build_parameter_change_proposal(&ride_contract(), "baseFee", d("2.5"), "raise base fee")
                .unwrap();

        assert_eq!(request.targets, vec![ride_contract()]);
        assert_eq!(request.values, vec![0]);
        assert_eq!(request.description, "raise base fee");
        assert_eq!(
            request.calldatas,
            vec![abi::encode_uint256_call(
                "updateBaseFee(uint256)",
                2_500_000_000_000_000_000
            )]
        );
    }

    #[test]
    fn test_parameter_change_encodes_integers_verbatim() {
        let request =
            build_parameter_change_proposal(&ride_contract(), "baseFeeDistance", d("4"), "d")
                .unwrap();
        assert_eq!(
            request.calldatas,
            vec![abi::encode_uint256_call("updateBaseFeeDistance(uint256)", 4)]
        );

        let request =
            build_parameter_change_proposal(&ride_contract(), "daoFee", d("15"), "d").unwrap();
        assert_eq!(
            request.calldatas,
            vec![abi::encode_uint256_call("updateDaoFee(uint256)", 15)]
        );
    }

    #[test]
    fn test_parameter_change_rejects_fractional_integers() {
        let result =
            build_parameter_change_proposal(&ride_contract(), "daoFee", d("2.5"), "d");
        assert!(matches!(
            result,
            Err(CoreError::InvalidParameterValue { ref parameter, .. }) if parameter == "daoFee"
        ));
    }

    #[test]
    fn test_queue_requires_succeeded() {
        assert!(build_queue_request(&proposal_in(Some(ProposalState::Succeeded))).is_ok());
        for state in [None, Some(ProposalState::Active), Some(ProposalState::Queued)] {
            assert!(matches!(
                build_queue_request(&proposal_in(state)),
                Err(CoreError::ProposalNotReady {
                    required: ProposalState::Succeeded,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_execute_requires_queued() {
        let proposal = proposal_in(Some(ProposalState::Queued));
        let request = build_execution_request(&proposal).unwrap();

        assert_eq!(request.proposal_id, proposal.proposal_id);
        assert_eq!(request.targets, proposal.targets);
        assert_eq!(request.values, proposal.values);
        assert_eq!(request.calldatas, proposal.calldatas);
        assert_eq!(
            request.description_hash,
            abi::keccak256(proposal.description.as_bytes())
        );

        assert!(matches!(
            build_execution_request(&proposal_in(Some(ProposalState::Succeeded))),
            Err(CoreError::ProposalNotReady {
                required: ProposalState::Queued,
                actual: Some(ProposalState::Succeeded),
                ..
            })
        ));
    }
}

use async_trait::async_trait;
use literide::domain::{RideEventFields, RideRecord, RideStatus};
use literide::{
    Address, BlockNumber, ChainError, ChainReader, Config, CoreError, Coordinates, Decimal,
    FeeParameters, LifecycleEvent, MockChain, MockDistanceService, MockEventFeed, Perspective,
    ProposalId, ProposalState, RideId, RideRequest, RideSession, RideView, TransactionRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn driver() -> Address {
    Address::new("0x00000000000000000000000000000000000000d1")
}

fn other_driver() -> Address {
    Address::new("0x00000000000000000000000000000000000000d2")
}

fn rider() -> Address {
    Address::new("0x00000000000000000000000000000000000000e1")
}

fn pickup() -> Coordinates {
    Coordinates::new(-0.12, 51.5)
}

fn dropoff() -> Coordinates {
    Coordinates::new(-0.08, 51.52)
}

fn config(extra: &[(&str, &str)]) -> Config {
    let mut env = HashMap::new();
    env.insert(
        "LITERIDE_CONTRACT_ADDRESS".to_string(),
        "0x00000000000000000000000000000000000000aa".to_string(),
    );
    for (key, value) in extra {
        env.insert(key.to_string(), value.to_string());
    }
    Config::from_env_map(env).unwrap()
}

fn fee_parameters() -> FeeParameters {
    FeeParameters {
        base_fee: d("5"),
        base_fee_distance: 3,
        distance_fee: d("2"),
        dao_fee: 10,
        dao_balance: Decimal::zero(),
    }
}

fn request(ride_id: &str, rider: Address) -> RideRequest {
    RideRequest {
        ride_id: RideId::new(ride_id),
        rider,
        distance_estimated: 6,
        amount_estimated: d("11"),
        pickup: pickup(),
        dropoff: dropoff(),
        request_block: BlockNumber::new(100),
    }
}

fn fields(ride_id: &str, driver: Address) -> RideEventFields {
    RideEventFields {
        ride_id: RideId::new(ride_id),
        driver,
        rider: rider(),
        distance_estimated: 6,
        amount_agreed: d("11"),
        pickup: pickup(),
        dropoff: dropoff(),
        request_block: BlockNumber::new(100),
    }
}

fn record(ride_id: &str, started: bool) -> RideRecord {
    RideRecord {
        ride_id: RideId::new(ride_id),
        rider: rider(),
        driver: driver(),
        distance_estimated: 6,
        amount_estimated: d("11"),
        pickup: pickup(),
        dropoff: dropoff(),
        request_block: BlockNumber::new(100),
        accepted_block: BlockNumber::new(101),
        start_block: if started {
            BlockNumber::new(102)
        } else {
            BlockNumber::default()
        },
        end_block: BlockNumber::default(),
    }
}

fn session(
    actor: Address,
    perspective: Perspective,
    chain: &Arc<MockChain>,
    config: &Config,
) -> RideSession {
    RideSession::new(
        actor,
        perspective,
        chain.clone(),
        chain.clone(),
        Arc::new(MockDistanceService::with_route(10.9, 24.0)),
        config,
    )
}

/// Holds `open_ride_requests` open until the test releases it.
#[derive(Debug)]
struct GatedReader {
    chain: Arc<MockChain>,
    entered: Notify,
    release: Notify,
}

impl GatedReader {
    fn new(chain: Arc<MockChain>) -> Self {
        Self {
            chain,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ChainReader for GatedReader {
    async fn fee_parameters(&self) -> Result<FeeParameters, ChainError> {
        self.chain.fee_parameters().await
    }

    async fn open_ride_requests(&self) -> Result<Vec<RideRequest>, ChainError> {
        let requests = self.chain.open_ride_requests().await;
        self.entered.notify_one();
        self.release.notified().await;
        requests
    }

    async fn active_ride(&self, participant: &Address) -> Result<RideRecord, ChainError> {
        self.chain.active_ride(participant).await
    }

    async fn proposal_state(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<ProposalState, ChainError> {
        self.chain.proposal_state(proposal_id).await
    }

    async fn block_number(&self) -> Result<BlockNumber, ChainError> {
        self.chain.block_number().await
    }

    async fn is_rider(&self, account: &Address) -> Result<bool, ChainError> {
        self.chain.is_rider(account).await
    }

    async fn is_driver(&self, account: &Address) -> Result<bool, ChainError> {
        self.chain.is_driver(account).await
    }
}

fn gated_session(reader: &Arc<GatedReader>, chain: &Arc<MockChain>) -> RideSession {
    RideSession::new(
        driver(),
        Perspective::Driver,
        reader.clone(),
        chain.clone(),
        Arc::new(MockDistanceService::with_route(10.9, 24.0)),
        &config(&[]),
    )
}

/// Run a refresh that stalls inside the snapshot read while `event` is
/// published and applied, then let the read finish.
async fn refresh_around(
    reader: &Arc<GatedReader>,
    session: &RideSession,
    event: LifecycleEvent,
    applied: impl Fn(&RideView) -> bool,
) -> RideView {
    let feed = MockEventFeed::new();
    let _subscription = session.subscribe(&feed).await.unwrap();

    let refreshing = session.clone();
    let refresh = tokio::spawn(async move { refreshing.refresh().await });
    reader.entered.notified().await;

    feed.publish(event);
    tokio::time::timeout(Duration::from_secs(1), async {
        while !applied(&session.view().await) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    reader.release.notify_one();
    refresh.await.unwrap().unwrap()
}

#[tokio::test]
async fn test_request_published_during_refresh_is_kept() {
    let chain = Arc::new(MockChain::new(driver()));
    chain.set_requests(vec![request("1", rider())]);
    let reader = Arc::new(GatedReader::new(chain.clone()));
    let session = gated_session(&reader, &chain);

    let event = LifecycleEvent::RideRequested(fields("5", Address::zero()));
    let view = refresh_around(&reader, &session, event, |v| {
        v.open_requests.iter().any(|r| r.ride_id == RideId::new("5"))
    })
    .await;

    let ids: Vec<_> = view.open_requests.iter().map(|r| r.ride_id.clone()).collect();
    assert_eq!(ids, vec![RideId::new("1"), RideId::new("5")]);
    assert_eq!(session.view().await, view);
}

#[tokio::test]
async fn test_accept_published_during_refresh_is_kept() {
    let chain = Arc::new(MockChain::new(driver()));
    let reader = Arc::new(GatedReader::new(chain.clone()));
    let session = gated_session(&reader, &chain);

    let event = LifecycleEvent::RideAccepted {
        ride: fields("7", driver()),
        accepted_block: BlockNumber::new(101),
    };
    let view = refresh_around(&reader, &session, event, |v| v.current_ride.is_some()).await;

    let ride = view.current_ride.unwrap();
    assert_eq!(ride.ride_id, RideId::new("7"));
    assert_eq!(ride.status, RideStatus::Accepted);
}

#[tokio::test]
async fn test_authenticate_then_sign_up() {
    let chain = Arc::new(MockChain::new(driver()));
    let session = session(driver(), Perspective::Driver, &chain, &config(&[]));

    let err = assert_err!(session.authenticate().await);
    assert!(matches!(err, CoreError::NotRegistered(_, Perspective::Driver)));

    assert_ok!(session.sign_up().await);
    assert_ok!(session.authenticate().await);
    assert_eq!(
        chain.submitted(),
        vec![(TransactionRequest::CreateDriver, Some(60_000))]
    );
}

#[tokio::test]
async fn test_refresh_drops_empty_slots() {
    let chain = Arc::new(MockChain::new(driver()));
    chain.set_requests(vec![
        request("1", rider()),
        request("2", Address::zero()),
        request("1", rider()),
    ]);
    chain.set_active_ride(driver(), record("7", false));
    let session = session(driver(), Perspective::Driver, &chain, &config(&[]));

    let view = session.refresh().await.unwrap();
    assert_eq!(view.open_requests.len(), 1);
    assert_eq!(view.open_requests[0].ride_id, RideId::new("1"));
    let ride = view.current_ride.unwrap();
    assert_eq!(ride.ride_id, RideId::new("7"));
    assert_eq!(ride.status, RideStatus::Accepted);
}

#[tokio::test]
async fn test_rider_requests_ride_after_approval() {
    let chain = Arc::new(MockChain::new(rider()).with_fee_parameters(fee_parameters()));
    let session = session(rider(), Perspective::Rider, &chain, &config(&[]));

    let estimate = session.estimate_trip(pickup(), dropoff()).await.unwrap();
    assert_eq!(estimate.estimate, d("19"));

    assert_ok!(session.request_ride(pickup(), dropoff(), &estimate).await);
    assert_eq!(
        chain.submitted(),
        vec![
            (TransactionRequest::ApproveFare { amount: d("19") }, None),
            (
                TransactionRequest::RequestRide {
                    rider: rider(),
                    distance_miles: 10,
                    amount: d("19"),
                    pickup: pickup(),
                    dropoff: dropoff(),
                },
                Some(1_000_000)
            ),
        ]
    );
}

#[tokio::test]
async fn test_rejected_approval_skips_request() {
    let chain = Arc::new(MockChain::new(rider()).with_fee_parameters(fee_parameters()));
    chain.fail_next_submit(ChainError::Rejected("insufficient balance".to_string()));
    let session = session(rider(), Perspective::Rider, &chain, &config(&[]));

    let estimate = session.estimate_trip(pickup(), dropoff()).await.unwrap();
    let err = assert_err!(session.request_ride(pickup(), dropoff(), &estimate).await);
    assert!(matches!(
        err,
        CoreError::TransactionRejected { ref action, .. } if action == "approve"
    ));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_role_checks() {
    let chain = Arc::new(MockChain::new(driver()).with_fee_parameters(fee_parameters()));
    let driver_session = session(driver(), Perspective::Driver, &chain, &config(&[]));
    let rider_session = session(rider(), Perspective::Rider, &chain, &config(&[]));

    let estimate = driver_session
        .estimate_trip(pickup(), dropoff())
        .await
        .unwrap();
    let err = assert_err!(
        driver_session
            .request_ride(pickup(), dropoff(), &estimate)
            .await
    );
    assert!(matches!(
        err,
        CoreError::WrongPerspective {
            action: "requestRide",
            perspective: Perspective::Driver
        }
    ));

    let err = assert_err!(rider_session.accept_ride(&request("1", rider())).await);
    assert!(matches!(err, CoreError::WrongPerspective { .. }));
    let err = assert_err!(rider_session.end_ride(3.0).await);
    assert!(matches!(err, CoreError::WrongPerspective { .. }));

    let err = assert_err!(driver_session.start_ride().await);
    assert!(matches!(err, CoreError::NoActiveRide));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_driver_lifecycle_from_events_and_actions() {
    let chain = Arc::new(MockChain::new(driver()).with_block(100));
    let session = session(driver(), Perspective::Driver, &chain, &config(&[]));
    let feed = MockEventFeed::new();
    let subscription = session.subscribe(&feed).await.unwrap();

    feed.publish(LifecycleEvent::RideRequested(fields("1", Address::zero())));
    feed.publish(LifecycleEvent::RideRequested(fields("1", Address::zero())));
    feed.publish(LifecycleEvent::RideAccepted {
        ride: fields("1", other_driver()),
        accepted_block: BlockNumber::new(101),
    });
    drop(feed);
    subscription.finished().await;

    let view = session.view().await;
    assert_eq!(view.open_requests.len(), 1);
    assert!(view.current_ride.is_none());

    // Accept; the chain now reports the ride as ours.
    chain.set_active_ride(driver(), record("1", false));
    assert_ok!(session.accept_ride(&view.open_requests[0]).await);
    let ride = session.current_ride().await.unwrap();
    assert_eq!(ride.status, RideStatus::Accepted);
    assert_eq!(ride.rider, rider());

    chain.set_active_ride(driver(), record("1", true));
    assert_ok!(session.start_ride().await);
    assert_eq!(
        session.current_ride().await.map(|r| r.status),
        Some(RideStatus::Started)
    );

    chain.clear_active_ride(&driver());
    assert_ok!(session.end_ride(4.7).await);
    assert!(session.current_ride().await.is_none());

    let submitted: Vec<_> = chain.submitted().into_iter().map(|(tx, _)| tx).collect();
    assert_eq!(
        submitted,
        vec![
            TransactionRequest::AcceptRide {
                rider: rider(),
                request_block: BlockNumber::new(100),
            },
            TransactionRequest::StartRide {
                rider: rider(),
                request_block: BlockNumber::new(100),
            },
            TransactionRequest::EndRide {
                rider: rider(),
                request_block: BlockNumber::new(100),
                distance_miles: 4,
            },
        ]
    );
}

#[tokio::test]
async fn test_started_event_for_other_ride_is_ignored() {
    let chain = Arc::new(MockChain::new(driver()));
    chain.set_active_ride(driver(), record("1", false));
    let session = session(driver(), Perspective::Driver, &chain, &config(&[]));
    session.refresh().await.unwrap();

    let feed = MockEventFeed::new();
    let subscription = session.subscribe(&feed).await.unwrap();
    feed.publish(LifecycleEvent::RideStarted {
        ride: fields("2", driver()),
        accepted_block: BlockNumber::new(101),
        started_block: BlockNumber::new(102),
    });
    drop(feed);
    subscription.finished().await;

    let ride = session.current_ride().await.unwrap();
    assert_eq!(ride.ride_id, RideId::new("1"));
    assert_eq!(ride.status, RideStatus::Accepted);
}

#[tokio::test]
async fn test_ended_event_clears_view() {
    let chain = Arc::new(MockChain::new(driver()));
    chain.set_requests(vec![request("5", rider())]);
    chain.set_active_ride(driver(), record("1", true));
    let session = session(driver(), Perspective::Driver, &chain, &config(&[]));
    let view = session.refresh().await.unwrap();
    assert_eq!(view.open_requests.len(), 1);

    let feed = MockEventFeed::new();
    let subscription = session.subscribe(&feed).await.unwrap();
    feed.publish(LifecycleEvent::RideEnded {
        ride_id: RideId::new("1"),
        driver: driver(),
        rider: rider(),
    });
    drop(feed);
    subscription.finished().await;

    let view = session.view().await;
    assert!(view.current_ride.is_none());
    assert!(view.open_requests.is_empty());
}

#[tokio::test]
async fn test_strict_policy_checks_ride_id_on_end() {
    let chain = Arc::new(MockChain::new(driver()));
    chain.set_active_ride(driver(), record("1", true));
    let observed = session(driver(), Perspective::Driver, &chain, &config(&[]));
    let strict = session(
        driver(),
        Perspective::Driver,
        &chain,
        &config(&[("ENDED_EVENT_POLICY", "strict")]),
    );
    observed.refresh().await.unwrap();
    strict.refresh().await.unwrap();

    let feed = MockEventFeed::new();
    let observed_sub = observed.subscribe(&feed).await.unwrap();
    let strict_sub = strict.subscribe(&feed).await.unwrap();
    feed.publish(LifecycleEvent::RideEnded {
        ride_id: RideId::new("9"),
        driver: driver(),
        rider: rider(),
    });
    drop(feed);
    observed_sub.finished().await;
    strict_sub.finished().await;

    assert!(observed.current_ride().await.is_none());
    assert_eq!(
        strict.current_ride().await.map(|r| r.ride_id),
        Some(RideId::new("1"))
    );
}

#[tokio::test]
async fn test_rejected_transaction_keeps_view() {
    let chain = Arc::new(MockChain::new(driver()));
    chain.set_requests(vec![request("1", rider())]);
    let session = session(driver(), Perspective::Driver, &chain, &config(&[]));
    let before = session.refresh().await.unwrap();

    chain.fail_next_submit(ChainError::Rejected("ride already taken".to_string()));
    chain.set_requests(vec![]);
    let err = assert_err!(session.accept_ride(&before.open_requests[0]).await);
    assert!(matches!(err, CoreError::TransactionRejected { .. }));
    assert_eq!(session.view().await, before);
}

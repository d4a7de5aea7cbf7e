use crate::config::Config;
use crate::datasource::{
    ChainReader, ChainWriter, DistanceService, EventFeed, TransactionRequest, TxReceipt,
};
use crate::domain::{
    Address, Coordinates, Perspective, Ride, RideRecord, RideRequest, TripEstimate,
};
use crate::engine::{floor_miles, trip_estimate, RideReconciler, RideView};
use crate::error::CoreError;
use crate::orchestration::submit::TransactionSubmitter;
use crate::orchestration::subscription::Subscription;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One participant's ride panel: the reconciled view plus the actions the
/// participant's role allows.
#[derive(Debug, Clone)]
pub struct RideSession {
    actor: Address,
    perspective: Perspective,
    reader: Arc<dyn ChainReader>,
    submitter: TransactionSubmitter,
    distance: Arc<dyn DistanceService>,
    reconciler: Arc<Mutex<RideReconciler>>,
    ride_gas_limit: u64,
    signup_gas_limit: u64,
}

impl RideSession {
    pub fn new(
        actor: Address,
        perspective: Perspective,
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        distance: Arc<dyn DistanceService>,
        config: &Config,
    ) -> Self {
        let reconciler =
            RideReconciler::new(actor.clone(), perspective, config.ended_event_policy);
        Self {
            actor,
            perspective,
            reader,
            submitter: TransactionSubmitter::new(writer, config.tx_policy),
            distance,
            reconciler: Arc::new(Mutex::new(reconciler)),
            ride_gas_limit: config.ride_gas_limit,
            signup_gas_limit: config.signup_gas_limit,
        }
    }

    pub fn actor(&self) -> &Address {
        &self.actor
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    /// Start applying feed events to this session's view.
    pub async fn subscribe(&self, feed: &dyn EventFeed) -> Result<Subscription, CoreError> {
        let events = feed.subscribe().await?;
        info!("{} {} subscribed to ride events", self.perspective, self.actor);
        Ok(Subscription::spawn(events, self.reconciler.clone()))
    }

    /// Reload open requests and the active ride, replacing the current view.
    ///
    /// Events applied while the reads are in flight are replayed on top of
    /// the snapshot.
    pub async fn refresh(&self) -> Result<RideView, CoreError> {
        self.reconciler.lock().await.begin_load();
        let snapshot = self.read_snapshot().await;

        let mut reconciler = self.reconciler.lock().await;
        match snapshot {
            Ok((requests, record)) => {
                reconciler.finish_load(requests, record);
                Ok(reconciler.view().clone())
            }
            Err(e) => {
                reconciler.abort_load();
                Err(e)
            }
        }
    }

    async fn read_snapshot(&self) -> Result<(Vec<RideRequest>, RideRecord), CoreError> {
        let requests = self.reader.open_ride_requests().await?;
        let record = self.reader.active_ride(&self.actor).await?;
        Ok((requests, record))
    }

    pub async fn view(&self) -> RideView {
        self.reconciler.lock().await.view().clone()
    }

    pub async fn current_ride(&self) -> Option<Ride> {
        self.reconciler.lock().await.current_ride().cloned()
    }

    /// Check that the actor is registered for this session's role.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let registered = match self.perspective {
            Perspective::Rider => self.reader.is_rider(&self.actor).await?,
            Perspective::Driver => self.reader.is_driver(&self.actor).await?,
        };
        if !registered {
            return Err(CoreError::NotRegistered(
                self.actor.to_string(),
                self.perspective,
            ));
        }
        Ok(())
    }

    /// Register the actor for this session's role.
    pub async fn sign_up(&self) -> Result<TxReceipt, CoreError> {
        let tx = match self.perspective {
            Perspective::Rider => TransactionRequest::CreateRider,
            Perspective::Driver => TransactionRequest::CreateDriver,
        };
        self.submitter.submit(&tx, Some(self.signup_gas_limit)).await
    }

    /// Quote a trip using the current fee parameters.
    pub async fn estimate_trip(
        &self,
        pickup: Coordinates,
        dropoff: Coordinates,
    ) -> Result<TripEstimate, CoreError> {
        let params = self.reader.fee_parameters().await?;
        let route = self.distance.route(pickup, dropoff).await?;
        if route.is_none() {
            warn!("No route between {} and {}", pickup, dropoff);
        }
        trip_estimate(&params, route)
    }

    /// Approve the quoted fare, then post the ride request.
    pub async fn request_ride(
        &self,
        pickup: Coordinates,
        dropoff: Coordinates,
        estimate: &TripEstimate,
    ) -> Result<TxReceipt, CoreError> {
        self.require(Perspective::Rider, "requestRide")?;
        estimate.estimate.to_wei()?;

        self.submitter
            .submit(
                &TransactionRequest::ApproveFare {
                    amount: estimate.estimate,
                },
                None,
            )
            .await?;

        let tx = TransactionRequest::RequestRide {
            rider: self.actor.clone(),
            distance_miles: estimate.distance_in_miles,
            amount: estimate.estimate,
            pickup,
            dropoff,
        };
        self.submit_and_refresh(&tx).await
    }

    pub async fn accept_ride(&self, request: &RideRequest) -> Result<TxReceipt, CoreError> {
        self.require(Perspective::Driver, "acceptRide")?;
        let tx = TransactionRequest::AcceptRide {
            rider: request.rider.clone(),
            request_block: request.request_block,
        };
        self.submit_and_refresh(&tx).await
    }

    pub async fn start_ride(&self) -> Result<TxReceipt, CoreError> {
        self.require(Perspective::Driver, "startRide")?;
        let ride = self.current_ride().await.ok_or(CoreError::NoActiveRide)?;
        let tx = TransactionRequest::StartRide {
            rider: ride.rider,
            request_block: ride.request_block,
        };
        self.submit_and_refresh(&tx).await
    }

    /// End the tracked ride with the recorded distance, floored to whole miles.
    pub async fn end_ride(&self, distance_miles: f64) -> Result<TxReceipt, CoreError> {
        self.require(Perspective::Driver, "endRide")?;
        let ride = self.current_ride().await.ok_or(CoreError::NoActiveRide)?;
        let tx = TransactionRequest::EndRide {
            rider: ride.rider,
            request_block: ride.request_block,
            distance_miles: floor_miles(distance_miles),
        };
        self.submit_and_refresh(&tx).await
    }

    fn require(&self, perspective: Perspective, action: &'static str) -> Result<(), CoreError> {
        if self.perspective != perspective {
            return Err(CoreError::WrongPerspective {
                action,
                perspective: self.perspective,
            });
        }
        Ok(())
    }

    async fn submit_and_refresh(&self, tx: &TransactionRequest) -> Result<TxReceipt, CoreError> {
        let receipt = self.submitter.submit(tx, Some(self.ride_gas_limit)).await?;
        if let Err(e) = self.refresh().await {
            warn!("Refresh after {} failed: {}", tx.action(), e);
        }
        Ok(receipt)
    }
}

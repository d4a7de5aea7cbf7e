use crate::domain::{
    Address, BlockNumber, LifecycleEvent, Perspective, Ride, RideEventFields, RideId,
    RideRecord, RideRequest, RideStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How strictly `RideEnded` is matched against the tracked ride.
///
/// `Observed` keeps the historical asymmetry: drivers match on their own
/// address, riders match on ride id only. `Strict` requires both checks for
/// either perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndedEventPolicy {
    #[default]
    Observed,
    Strict,
}

/// Result of feeding one event to a reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl EventOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EventOutcome::Applied)
    }
}

/// Why an event was dropped. Drops are expected traffic, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The request is already in the open set.
    DuplicateRequest,
    /// The local actor is not the participant the event names.
    NotParticipant,
    /// No ride is being tracked.
    NoTrackedRide,
    /// The event is for a different ride than the tracked one.
    RideMismatch,
    /// The tracked ride is not in a state the event can advance.
    OutOfOrder,
    /// The proposal is already tracked.
    DuplicateProposal,
    /// The event kind does not concern this view.
    Unrelated,
}

/// The local actor's view of open requests and its current ride.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RideView {
    pub open_requests: Vec<RideRequest>,
    pub current_ride: Option<Ride>,
}

/// Merges snapshot reads and lifecycle events into a [`RideView`].
///
/// Snapshot loads replace their part of the view outright; events mutate it.
/// Events are applied in arrival order with no buffering, so an event whose
/// prerequisite has not been seen yet is dropped.
///
/// A snapshot read takes time. Events that land between [`begin_load`] and
/// [`finish_load`] are applied immediately and also logged, then replayed on
/// top of the snapshot so the load cannot erase them.
///
/// [`begin_load`]: RideReconciler::begin_load
/// [`finish_load`]: RideReconciler::finish_load
#[derive(Debug, Clone)]
pub struct RideReconciler {
    actor: Address,
    perspective: Perspective,
    ended_policy: EndedEventPolicy,
    view: RideView,
    loads_in_flight: usize,
    events_during_load: Vec<LifecycleEvent>,
}

impl RideReconciler {
    pub fn new(actor: Address, perspective: Perspective, ended_policy: EndedEventPolicy) -> Self {
        Self {
            actor,
            perspective,
            ended_policy,
            view: RideView::default(),
            loads_in_flight: 0,
            events_during_load: Vec::new(),
        }
    }

    pub fn actor(&self) -> &Address {
        &self.actor
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    pub fn view(&self) -> &RideView {
        &self.view
    }

    pub fn open_requests(&self) -> &[RideRequest] {
        &self.view.open_requests
    }

    pub fn current_ride(&self) -> Option<&Ride> {
        self.view.current_ride.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.current_ride().map(Ride::is_started).unwrap_or(false)
    }

    /// Replace the open-request set with a fresh snapshot.
    ///
    /// Emptied slots (zero rider) are dropped, and a repeated ride id keeps
    /// its first entry.
    pub fn load_open_requests(&mut self, requests: Vec<RideRequest>) {
        let mut open: Vec<RideRequest> = Vec::with_capacity(requests.len());
        for request in requests {
            if request.rider.is_zero() {
                continue;
            }
            if open.iter().any(|r| r.ride_id == request.ride_id) {
                continue;
            }
            open.push(request);
        }
        debug!(
            "Loaded {} open ride requests for {}",
            open.len(),
            self.actor
        );
        self.view.open_requests = open;
    }

    /// Replace the current ride with the active-ride snapshot.
    pub fn load_active_ride(&mut self, record: RideRecord) {
        let own_slot = match self.perspective {
            Perspective::Driver => &record.driver,
            Perspective::Rider => &record.rider,
        };
        self.view.current_ride = if own_slot.is_zero() {
            None
        } else {
            record.into_ride()
        };
        debug!(
            "Loaded active ride for {} {}: {:?}",
            self.perspective,
            self.actor,
            self.view.current_ride.as_ref().map(|r| &r.ride_id)
        );
    }

    /// Mark the start of a snapshot read.
    pub fn begin_load(&mut self) {
        self.loads_in_flight += 1;
    }

    /// Install a snapshot read since [`begin_load`](Self::begin_load), then
    /// replay the events that arrived while it was in flight.
    pub fn finish_load(&mut self, requests: Vec<RideRequest>, record: RideRecord) {
        self.load_open_requests(requests);
        self.load_active_ride(record);

        // Overlapping loads share the log until the last one lands.
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        let replay = if self.loads_in_flight == 0 {
            std::mem::take(&mut self.events_during_load)
        } else {
            self.events_during_load.clone()
        };
        if !replay.is_empty() {
            debug!("Replaying {} events received during load", replay.len());
        }
        for event in &replay {
            self.dispatch(event);
        }
    }

    /// Drop a snapshot read that failed after [`begin_load`](Self::begin_load).
    pub fn abort_load(&mut self) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if self.loads_in_flight == 0 {
            self.events_during_load.clear();
        }
    }

    /// Apply one lifecycle event to the view.
    pub fn apply_event(&mut self, event: &LifecycleEvent) -> EventOutcome {
        if self.loads_in_flight > 0 {
            self.events_during_load.push(event.clone());
        }
        self.dispatch(event)
    }

    fn dispatch(&mut self, event: &LifecycleEvent) -> EventOutcome {
        let outcome = match event {
            LifecycleEvent::RideRequested(fields) => self.handle_requested(fields),
            LifecycleEvent::RideAccepted {
                ride,
                accepted_block,
            } => self.handle_accepted(ride, *accepted_block),
            LifecycleEvent::RideStarted {
                ride,
                started_block,
                ..
            } => self.handle_started(&ride.ride_id, *started_block),
            LifecycleEvent::RideEnded {
                ride_id,
                driver,
                rider,
            } => self.handle_ended(ride_id, driver, rider),
            LifecycleEvent::ProposalCreated(_) => EventOutcome::Ignored(IgnoreReason::Unrelated),
        };

        match outcome {
            EventOutcome::Applied => info!(
                "Applied {} for ride {:?} ({} {})",
                event.name(),
                event.ride_id().map(RideId::as_str),
                self.perspective,
                self.actor
            ),
            EventOutcome::Ignored(reason) => debug!(
                "Stale event ignored: {} for ride {:?}, reason {:?}",
                event.name(),
                event.ride_id().map(RideId::as_str),
                reason
            ),
        }
        outcome
    }

    fn handle_requested(&mut self, fields: &RideEventFields) -> EventOutcome {
        if self
            .view
            .open_requests
            .iter()
            .any(|r| r.ride_id == fields.ride_id)
        {
            return EventOutcome::Ignored(IgnoreReason::DuplicateRequest);
        }
        self.view.open_requests.push(fields.to_request());
        EventOutcome::Applied
    }

    fn handle_accepted(
        &mut self,
        fields: &RideEventFields,
        accepted_block: BlockNumber,
    ) -> EventOutcome {
        if !self.is_own(&fields.driver, &fields.rider) {
            return EventOutcome::Ignored(IgnoreReason::NotParticipant);
        }

        // The open-request entry stays until the next snapshot load.
        self.view.current_ride = Some(Ride {
            ride_id: fields.ride_id.clone(),
            rider: fields.rider.clone(),
            driver: fields.driver.clone(),
            distance_estimated: fields.distance_estimated,
            amount_estimated: fields.amount_agreed,
            pickup: fields.pickup,
            dropoff: fields.dropoff,
            request_block: fields.request_block,
            accepted_block,
            started_block: None,
            end_block: None,
            status: RideStatus::Accepted,
        });
        EventOutcome::Applied
    }

    fn handle_started(&mut self, ride_id: &RideId, started_block: BlockNumber) -> EventOutcome {
        let ride = match self.view.current_ride.as_mut() {
            Some(ride) => ride,
            None => return EventOutcome::Ignored(IgnoreReason::NoTrackedRide),
        };
        if &ride.ride_id != ride_id {
            return EventOutcome::Ignored(IgnoreReason::RideMismatch);
        }
        if !ride.status.can_advance_to(RideStatus::Started) {
            return EventOutcome::Ignored(IgnoreReason::OutOfOrder);
        }
        ride.started_block = Some(started_block);
        ride.status = RideStatus::Started;
        EventOutcome::Applied
    }

    fn handle_ended(
        &mut self,
        ride_id: &RideId,
        driver: &Address,
        rider: &Address,
    ) -> EventOutcome {
        let tracked = match self.view.current_ride.as_ref() {
            Some(ride) => ride,
            None => return EventOutcome::Ignored(IgnoreReason::NoTrackedRide),
        };

        let (check_identity, check_ride_id) = match (self.ended_policy, self.perspective) {
            (EndedEventPolicy::Strict, _) => (true, true),
            (EndedEventPolicy::Observed, Perspective::Driver) => (true, false),
            (EndedEventPolicy::Observed, Perspective::Rider) => (false, true),
        };

        if check_identity && !self.is_own(driver, rider) {
            return EventOutcome::Ignored(IgnoreReason::NotParticipant);
        }
        if check_ride_id && &tracked.ride_id != ride_id {
            return EventOutcome::Ignored(IgnoreReason::RideMismatch);
        }

        self.view.current_ride = None;
        // Requests are stale once a ride ends; the next load repopulates them.
        self.view.open_requests.clear();
        EventOutcome::Applied
    }

    fn is_own(&self, driver: &Address, rider: &Address) -> bool {
        match self.perspective {
            Perspective::Driver => driver == &self.actor,
            Perspective::Rider => rider == &self.actor,
        }
    }
}

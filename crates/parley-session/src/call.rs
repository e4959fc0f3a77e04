//! Audio/video call lifecycle on top of an active connection.
//!
//! Media acquisition is asynchronous, so the controller splits it in two.
//! `begin_*` checks state and hands out a [`CallTicket`]. `finish_*` takes
//! the acquired stream back. Ending the call in between bumps the epoch,
//! so the late stream is dropped (and its tracks stopped) instead of
//! reviving a dead call.

use std::sync::Arc;

use parley_core::{CallState, ConnectionState};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{CallError, CallResult};
use crate::media::{LocalStream, MediaConstraints, MediaDevices, RemoteMedia};

/// The transport's call negotiation, treated as opaque.
pub trait CallSignaling: Send {
    /// Offers a call carrying `stream`.
    fn offer(&mut self, stream: &LocalStream) -> Result<(), String>;

    /// Accepts the pending inbound call with `stream`.
    fn accept(&mut self, stream: &LocalStream) -> Result<(), String>;

    /// Tears down the current or pending call.
    fn hang_up(&mut self);
}

/// Notifications for whoever renders the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    StateChanged(CallState),
    RemoteStream(RemoteMedia),
    Error(String),
}

/// Proof that a call was started or answered in a given epoch.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct CallTicket {
    epoch: u64,
    expected: CallState,
}

/// Owns the local stream and the remote media handle of one call.
pub struct CallController {
    state: CallState,
    epoch: u64,
    answering: bool,
    local: Option<LocalStream>,
    remote: Option<RemoteMedia>,
    constraints: MediaConstraints,
    connection: watch::Receiver<ConnectionState>,
    devices: Arc<dyn MediaDevices>,
    signaling: Box<dyn CallSignaling>,
    events: mpsc::UnboundedSender<CallEvent>,
}

impl CallController {
    /// Creates a controller observing `connection`.
    pub fn new(
        connection: watch::Receiver<ConnectionState>,
        devices: Arc<dyn MediaDevices>,
        signaling: Box<dyn CallSignaling>,
    ) -> (Self, mpsc::UnboundedReceiver<CallEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let controller = Self {
            state: CallState::NoCall,
            epoch: 0,
            answering: false,
            local: None,
            remote: None,
            constraints: MediaConstraints::default(),
            connection,
            devices,
            signaling,
            events,
        };
        (controller, events_rx)
    }

    /// Sets which devices calls capture.
    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Current call state.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// The local stream of the current call.
    pub fn local_stream(&self) -> Option<&LocalStream> {
        self.local.as_ref()
    }

    /// The remote media of the current call.
    pub fn remote_media(&self) -> Option<&RemoteMedia> {
        self.remote.as_ref()
    }

    fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Places a call: acquires media and offers it.
    pub async fn start_call(&mut self) -> CallResult<()> {
        let ticket = self.begin_start_call()?;
        let devices = Arc::clone(&self.devices);
        let media = devices.acquire(self.constraints).await;
        self.finish_start_call(ticket, media)
    }

    /// First half of [`CallController::start_call`].
    pub fn begin_start_call(&mut self) -> CallResult<CallTicket> {
        if self.state != CallState::NoCall {
            return Err(CallError::InvalidState {
                operation: "start a call",
                state: self.state,
            });
        }
        let connection = self.connection_state();
        if !connection.is_active() {
            return Err(CallError::NoConnection(connection));
        }
        self.transition(CallState::Outgoing);
        Ok(self.ticket(CallState::Outgoing))
    }

    /// Second half of [`CallController::start_call`].
    pub fn finish_start_call(
        &mut self,
        ticket: CallTicket,
        media: Result<LocalStream, String>,
    ) -> CallResult<()> {
        let stream = self.redeem(ticket, media)?;
        if let Err(reason) = self.signaling.offer(&stream) {
            return Err(self.abort(CallError::Signaling(reason)));
        }
        info!(tracks = stream.track_count(), "call offered");
        self.local = Some(stream);
        Ok(())
    }

    /// Records an inbound call request.
    pub fn handle_remote_offer(&mut self) -> CallResult<()> {
        let connection = self.connection_state();
        if self.state != CallState::NoCall || !connection.is_active() {
            warn!(state = %self.state, connection = %connection, "rejecting inbound call");
            self.signaling.hang_up();
            if !connection.is_active() {
                return Err(CallError::NoConnection(connection));
            }
            return Err(CallError::InvalidState {
                operation: "receive a call",
                state: self.state,
            });
        }
        self.transition(CallState::Incoming);
        Ok(())
    }

    /// Answers the inbound call: acquires media and accepts.
    pub async fn answer_call(&mut self) -> CallResult<()> {
        let ticket = self.begin_answer_call()?;
        let devices = Arc::clone(&self.devices);
        let media = devices.acquire(self.constraints).await;
        self.finish_answer_call(ticket, media)
    }

    /// First half of [`CallController::answer_call`].
    ///
    /// Only one answer may be in flight; a second one is rejected before
    /// it acquires anything.
    pub fn begin_answer_call(&mut self) -> CallResult<CallTicket> {
        if self.state != CallState::Incoming || self.answering {
            return Err(CallError::InvalidState {
                operation: "answer a call",
                state: self.state,
            });
        }
        self.answering = true;
        Ok(self.ticket(CallState::Incoming))
    }

    /// Second half of [`CallController::answer_call`].
    pub fn finish_answer_call(
        &mut self,
        ticket: CallTicket,
        media: Result<LocalStream, String>,
    ) -> CallResult<()> {
        let stream = self.redeem(ticket, media)?;
        if let Err(reason) = self.signaling.accept(&stream) {
            return Err(self.abort(CallError::Signaling(reason)));
        }
        info!(tracks = stream.track_count(), "call answered");
        self.answering = false;
        self.local = Some(stream);
        self.transition(CallState::Active);
        Ok(())
    }

    /// The remote side's media arrived.
    pub fn handle_remote_stream(&mut self, media: RemoteMedia) {
        let waiting = matches!(self.state, CallState::Outgoing | CallState::Active);
        if !waiting || self.local.is_none() {
            debug!(state = %self.state, media = media.id(), "ignoring remote stream");
            return;
        }
        info!(media = media.id(), "remote stream available");
        self.remote = Some(media.clone());
        self.emit(CallEvent::RemoteStream(media));
        self.transition(CallState::Active);
    }

    /// The remote side hung up or rejected the call.
    pub fn handle_remote_hangup(&mut self) {
        if self.state == CallState::NoCall {
            return;
        }
        info!("remote ended the call");
        self.release();
    }

    /// Ends the call. Calling it with no call in progress does nothing.
    pub fn end_call(&mut self) {
        if self.state == CallState::NoCall {
            return;
        }
        info!("ending call");
        self.signaling.hang_up();
        self.release();
    }

    /// Ends any call once the connection is no longer active.
    pub fn handle_connection_state(&mut self, state: ConnectionState) {
        if !state.is_active() && self.state != CallState::NoCall {
            info!(connection = %state, "connection lost, ending call");
            self.end_call();
        }
    }

    fn ticket(&self, expected: CallState) -> CallTicket {
        CallTicket {
            epoch: self.epoch,
            expected,
        }
    }

    fn redeem(
        &mut self,
        ticket: CallTicket,
        media: Result<LocalStream, String>,
    ) -> CallResult<LocalStream> {
        if ticket.epoch != self.epoch || ticket.expected != self.state {
            // dropping the stream stops its tracks
            debug!(ticket = ticket.epoch, epoch = self.epoch, "discarding media for an ended call");
            return Err(CallError::Superseded);
        }
        media.map_err(|reason| self.abort(CallError::MediaAcquisition(reason)))
    }

    fn abort(&mut self, error: CallError) -> CallError {
        warn!(error = %error, "call attempt failed");
        self.emit(CallEvent::Error(error.to_string()));
        self.signaling.hang_up();
        self.release();
        error
    }

    fn release(&mut self) {
        self.epoch += 1;
        self.answering = false;
        if let Some(mut stream) = self.local.take() {
            stream.stop_all();
        }
        self.remote = None;
        self.transition(CallState::NoCall);
    }

    fn transition(&mut self, next: CallState) {
        if self.state == next {
            return;
        }
        info!(from = %self.state, to = %next, "call state changed");
        self.state = next;
        self.emit(CallEvent::StateChanged(next));
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for CallController {
    fn drop(&mut self) {
        self.end_call();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::FakeDevices;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorded {
        offers: usize,
        accepts: usize,
        hang_ups: usize,
    }

    struct FakeSignaling {
        log: Arc<Mutex<Recorded>>,
        refuse: bool,
    }

    impl CallSignaling for FakeSignaling {
        fn offer(&mut self, _stream: &LocalStream) -> Result<(), String> {
            self.log.lock().unwrap().offers += 1;
            if self.refuse {
                return Err("peer does not support calls".into());
            }
            Ok(())
        }

        fn accept(&mut self, _stream: &LocalStream) -> Result<(), String> {
            self.log.lock().unwrap().accepts += 1;
            Ok(())
        }

        fn hang_up(&mut self) {
            self.log.lock().unwrap().hang_ups += 1;
        }
    }

    struct Harness {
        controller: CallController,
        events: mpsc::UnboundedReceiver<CallEvent>,
        devices: Arc<FakeDevices>,
        signaling: Arc<Mutex<Recorded>>,
        connection: watch::Sender<ConnectionState>,
    }

    fn harness_with(devices: FakeDevices, refuse: bool) -> Harness {
        let (connection, connection_rx) = watch::channel(ConnectionState::Active);
        let devices = Arc::new(devices);
        let signaling = Arc::new(Mutex::new(Recorded::default()));
        let (controller, events) = CallController::new(
            connection_rx,
            devices.clone(),
            Box::new(FakeSignaling {
                log: Arc::clone(&signaling),
                refuse,
            }),
        );
        Harness {
            controller,
            events,
            devices,
            signaling,
            connection,
        }
    }

    fn harness(tracks: usize) -> Harness {
        harness_with(FakeDevices::with_tracks(tracks), false)
    }

    fn states(events: &mut mpsc::UnboundedReceiver<CallEvent>) -> Vec<CallState> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let CallEvent::StateChanged(state) = event {
                out.push(state);
            }
        }
        out
    }

    #[tokio::test]
    async fn outgoing_call_becomes_active_on_remote_stream() {
        let mut h = harness(2);
        h.controller.start_call().await.unwrap();
        assert_eq!(h.controller.state(), CallState::Outgoing);
        assert_eq!(h.signaling.lock().unwrap().offers, 1);

        h.controller.handle_remote_stream(RemoteMedia::new("remote-1"));
        assert_eq!(h.controller.state(), CallState::Active);
        assert_eq!(h.controller.remote_media().map(|m| m.id()), Some("remote-1"));
        assert_eq!(states(&mut h.events), vec![CallState::Outgoing, CallState::Active]);
    }

    #[tokio::test]
    async fn second_start_is_rejected_without_acquiring() {
        let mut h = harness(2);
        h.controller.start_call().await.unwrap();
        let err = h.controller.start_call().await.unwrap_err();
        assert!(matches!(err, CallError::InvalidState { .. }));
        assert_eq!(h.devices.acquisitions(), 1);
        assert_eq!(h.devices.live_count(), 2);
    }

    #[tokio::test]
    async fn end_call_stops_every_track() {
        for n in [0, 1, 2, 3, 7] {
            let mut h = harness(n);
            h.controller.start_call().await.unwrap();
            h.controller.handle_remote_stream(RemoteMedia::new("remote"));
            assert_eq!(h.devices.live_count(), n);

            h.controller.end_call();
            assert_eq!(h.controller.state(), CallState::NoCall);
            assert_eq!(h.devices.live_count(), 0, "n = {n}");
            assert_eq!(h.devices.handed_out_count(), n);
            assert!(h.controller.remote_media().is_none());
            assert_eq!(h.signaling.lock().unwrap().hang_ups, 1);
        }
    }

    #[tokio::test]
    async fn end_call_is_idempotent() {
        let mut h = harness(1);
        h.controller.end_call();
        assert!(states(&mut h.events).is_empty());

        h.controller.start_call().await.unwrap();
        h.controller.end_call();
        h.controller.end_call();
        assert_eq!(h.signaling.lock().unwrap().hang_ups, 1);
        assert_eq!(states(&mut h.events), vec![CallState::Outgoing, CallState::NoCall]);
    }

    #[tokio::test]
    async fn media_failure_leaves_nothing_held() {
        let mut h = harness_with(FakeDevices::denied(), false);
        let err = h.controller.start_call().await.unwrap_err();
        assert!(matches!(err, CallError::MediaAcquisition(_)));
        assert_eq!(h.controller.state(), CallState::NoCall);
        assert!(h.controller.local_stream().is_none());
        assert!(
            std::iter::from_fn(|| h.events.try_recv().ok())
                .any(|e| matches!(e, CallEvent::Error(_)))
        );

        // a fresh attempt is allowed afterwards
        assert!(h.controller.begin_start_call().is_ok());
    }

    #[tokio::test]
    async fn signaling_refusal_releases_media() {
        let mut h = harness_with(FakeDevices::with_tracks(2), true);
        let err = h.controller.start_call().await.unwrap_err();
        assert!(matches!(err, CallError::Signaling(_)));
        assert_eq!(h.devices.live_count(), 0);
        assert_eq!(h.controller.state(), CallState::NoCall);
    }

    #[tokio::test]
    async fn media_arriving_after_end_is_dropped() {
        let mut h = harness(3);
        let ticket = h.controller.begin_start_call().unwrap();
        let media = h.devices.acquire(MediaConstraints::default()).await;

        h.controller.end_call();
        let err = h.controller.finish_start_call(ticket, media).unwrap_err();
        assert!(matches!(err, CallError::Superseded));
        assert_eq!(h.devices.live_count(), 0);
        assert_eq!(h.controller.state(), CallState::NoCall);
        assert!(h.controller.local_stream().is_none());
    }

    #[tokio::test]
    async fn incoming_call_answered() {
        let mut h = harness(2);
        assert!(h.controller.begin_answer_call().is_err());

        h.controller.handle_remote_offer().unwrap();
        assert_eq!(h.controller.state(), CallState::Incoming);
        h.controller.answer_call().await.unwrap();
        assert_eq!(h.controller.state(), CallState::Active);
        assert_eq!(h.signaling.lock().unwrap().accepts, 1);

        h.controller.handle_remote_stream(RemoteMedia::new("caller"));
        assert!(h.controller.remote_media().is_some());

        h.controller.handle_remote_hangup();
        assert_eq!(h.controller.state(), CallState::NoCall);
        assert_eq!(h.devices.live_count(), 0);
        assert_eq!(h.signaling.lock().unwrap().hang_ups, 0);
    }

    #[tokio::test]
    async fn second_answer_is_rejected_without_acquiring() {
        let mut h = harness(2);
        h.controller.handle_remote_offer().unwrap();

        let ticket = h.controller.begin_answer_call().unwrap();
        let media = h.devices.acquire(MediaConstraints::default()).await;

        let err = h.controller.answer_call().await.unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(h.devices.acquisitions(), 1);
        assert_eq!(h.controller.state(), CallState::Incoming);

        h.controller.finish_answer_call(ticket, media).unwrap();
        assert_eq!(h.controller.state(), CallState::Active);
        assert_eq!(h.devices.live_count(), 2);
        assert_eq!(h.signaling.lock().unwrap().accepts, 1);
    }

    #[tokio::test]
    async fn failed_answer_allows_a_new_call() {
        let mut h = harness_with(FakeDevices::denied(), false);
        h.controller.handle_remote_offer().unwrap();
        let err = h.controller.answer_call().await.unwrap_err();
        assert!(matches!(err, CallError::MediaAcquisition(_)));
        assert_eq!(h.controller.state(), CallState::NoCall);

        h.controller.handle_remote_offer().unwrap();
        assert!(h.controller.begin_answer_call().is_ok());
    }

    #[tokio::test]
    async fn offer_while_busy_is_rejected() {
        let mut h = harness(1);
        h.controller.start_call().await.unwrap();
        assert!(h.controller.handle_remote_offer().unwrap_err().is_invalid_state());
        assert_eq!(h.controller.state(), CallState::Outgoing);
    }

    #[tokio::test]
    async fn start_requires_active_connection() {
        let mut h = harness(1);
        h.connection.send_replace(ConnectionState::AwaitingHandshake);
        let err = h.controller.start_call().await.unwrap_err();
        assert!(matches!(err, CallError::NoConnection(ConnectionState::AwaitingHandshake)));
        assert_eq!(h.devices.acquisitions(), 0);
    }

    #[tokio::test]
    async fn losing_the_connection_ends_the_call() {
        let mut h = harness(2);
        h.controller.start_call().await.unwrap();
        h.controller.handle_remote_stream(RemoteMedia::new("remote"));

        h.controller.handle_connection_state(ConnectionState::Active);
        assert_eq!(h.controller.state(), CallState::Active);

        h.controller.handle_connection_state(ConnectionState::Closed);
        assert_eq!(h.controller.state(), CallState::NoCall);
        assert_eq!(h.devices.live_count(), 0);
    }
}

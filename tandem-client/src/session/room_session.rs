use crate::chat::ChatChannel;
use crate::config::{GlarePolicy, SessionConfig};
use crate::error::{ConnectivityCandidateError, NegotiationError, Result};
use crate::media::{CaptureBackend, MediaDeviceManager};
use crate::peer::{LinkContext, LinkState, PeerLink};
use crate::session::negotiation::{Deferred, InFlight, Negotiation, Settled, settled};
use crate::session::{Lifecycle, SessionCommand, SessionEvent, SessionHandle, SessionSnapshot};
use crate::signaling::SignalingChannel;
use crate::transport::{Connectivity, LinkId, TransportEvent, TransportFactory};
use std::collections::VecDeque;
use std::sync::Arc;
use tandem_core::{IceCandidate, ParticipantId, SessionDescription, SignalData, SignalEvent};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// The session actor for one room membership.
///
/// Owns the peer link, the local media and the chat log. Commands, signaling
/// events and transport callbacks are handled on its single task. Offer and
/// answer steps run on a separate task that borrows the link, so chat and
/// commands are served while a handshake is suspended.
pub struct RoomSession {
    config: SessionConfig,
    local_id: ParticipantId,

    signaling: Arc<dyn SignalingChannel>,
    transports: Arc<dyn TransportFactory>,
    media: MediaDeviceManager,
    chat: ChatChannel,

    link: Option<PeerLink>,
    link_ctx: LinkContext,
    next_seq: u64,

    /// The link while one of its negotiations runs.
    in_flight: Option<InFlight>,
    /// Link input held back until `in_flight` settles.
    deferred: VecDeque<Deferred>,

    /// Remote candidates that arrived before any link existed.
    early_candidates: Vec<(ParticipantId, IceCandidate)>,

    command_rx: mpsc::Receiver<SessionCommand>,
    signal_rx: mpsc::UnboundedReceiver<SignalEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,

    events: broadcast::Sender<SessionEvent>,
    lifecycle: watch::Sender<Lifecycle>,
    leave_requested: Arc<watch::Sender<bool>>,
}

impl RoomSession {
    /// Acquire local media, announce presence in the room and start the
    /// session loop.
    ///
    /// Fails without announcing anything if the camera or microphone can't
    /// be acquired.
    pub async fn join(
        config: SessionConfig,
        signaling: Arc<dyn SignalingChannel>,
        capture: Arc<dyn CaptureBackend>,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<SessionHandle> {
        let local_id = signaling.local_id();
        let (lifecycle_tx, lifecycle_rx) = watch::channel(Lifecycle::Joining);
        info!(
            "{} ({}) joining room {}",
            config.username, local_id, config.room_id
        );

        let media = MediaDeviceManager::new(capture);
        if let Err(e) = media.list_cameras().await {
            warn!("Camera list unavailable: {}", e);
        }
        media.start(None).await?;

        let signal_rx = signaling.subscribe();
        if let Err(e) = signaling.join(&config.room_id, &config.username).await {
            signaling.unsubscribe();
            media.stop_all().await;
            return Err(e.into());
        }

        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        let (leave_tx, leave_rx) = watch::channel(false);
        let leave_tx = Arc::new(leave_tx);

        let link_ctx = LinkContext {
            signaling: Arc::clone(&signaling),
            transport: config.transport.clone(),
            step_timeout: config.negotiation_timeout(),
            cancel: leave_rx,
        };

        let handle = SessionHandle::new(
            local_id.clone(),
            config.room_id.clone(),
            command_tx,
            events_tx.clone(),
            lifecycle_rx,
            Arc::clone(&leave_tx),
        );

        let session = RoomSession {
            chat: ChatChannel::new(Arc::clone(&signaling)),
            config,
            local_id,
            signaling,
            transports,
            media,
            link: None,
            link_ctx,
            next_seq: 0,
            in_flight: None,
            deferred: VecDeque::new(),
            early_candidates: Vec::new(),
            command_rx,
            signal_rx,
            transport_rx,
            transport_tx,
            events: events_tx,
            lifecycle: lifecycle_tx,
            leave_requested: leave_tx,
        };
        session.lifecycle.send_replace(Lifecycle::Active);
        tokio::spawn(session.run());

        Ok(handle)
    }

    async fn run(mut self) {
        info!("Session loop for room {} started", self.config.room_id);

        while self.lifecycle() != Lifecycle::Left {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        info!("All session handles dropped");
                        self.leave().await;
                    }
                },

                event = self.signal_rx.recv() => match event {
                    Some(event) => self.handle_signal(event).await,
                    None => {
                        warn!("Signaling channel lost, ending session");
                        self.emit(SessionEvent::SignalingLost);
                        self.leave().await;
                    }
                },

                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }

                res = settled(&mut self.in_flight) => {
                    self.on_settled(res).await;
                }
            }
        }

        info!("Session loop for room {} finished", self.config.room_id);
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::SwitchCamera { index, reply } => {
                let res = self.media.switch_to(index, self.link.as_ref()).await;
                match &res {
                    Ok(_) => {
                        if let Some(flight) = self.in_flight.as_mut() {
                            flight.stream_replaced = true;
                        }
                    }
                    Err(e) => warn!("Camera switch to {} failed: {}", index, e),
                }
                let _ = reply.send(res.map_err(Into::into));
            }

            SessionCommand::ListCameras { reply } => {
                let _ = reply.send(self.media.list_cameras().await.map_err(Into::into));
            }

            SessionCommand::SendChat { text, reply } => {
                let res = self
                    .chat
                    .send(&self.config.room_id, &self.config.username, &text)
                    .await;
                let _ = reply.send(res.map_err(Into::into));
            }

            SessionCommand::ChatLog { reply } => {
                let _ = reply.send(self.chat.log().to_vec());
            }

            SessionCommand::SetTrackEnabled {
                kind,
                enabled,
                reply,
            } => {
                let _ = reply.send(self.media.set_enabled(kind, enabled).await);
            }

            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot().await);
            }

            SessionCommand::Leave { reply } => {
                self.leave().await;
                let _ = reply.send(());
            }
        }
    }

    async fn handle_signal(&mut self, event: SignalEvent) {
        if self.is_leaving() {
            debug!("Ignoring {} while leaving", event.name());
            return;
        }

        match event {
            SignalEvent::UserJoined { id } => self.on_user_joined(id).await,

            SignalEvent::Signal {
                from: Some(from),
                data,
                ..
            } => self.on_signal(from, data).await,

            SignalEvent::Signal { from: None, .. } => {
                warn!("Dropping signal without a sender");
            }

            SignalEvent::ChatMessage {
                username, message, ..
            } => {
                let message = self.chat.receive(username, message);
                self.emit(SessionEvent::ChatReceived(message));
            }

            other => debug!("Ignoring {} event", other.name()),
        }
    }

    /// A second participant arrived: this side offers.
    async fn on_user_joined(&mut self, remote: ParticipantId) {
        if remote == self.local_id {
            return;
        }
        if let Some(linked) = self.linked_remote() {
            warn!(
                "{} joined while linked to {}; only two participants are supported",
                remote, linked
            );
            return;
        }

        info!("{} joined, starting negotiation", remote);
        let stream = self.media.active_stream().await;
        self.launch_new(remote, true, Negotiation::Offer { stream }, Vec::new());
    }

    async fn on_signal(&mut self, from: ParticipantId, data: SignalData) {
        if self.in_flight.is_some() {
            debug!("Deferring signal from {} until negotiation settles", from);
            self.deferred.push_back(Deferred::Signal(from, data));
            return;
        }
        let SignalData { sdp, candidate } = data;

        if let Some(desc) = sdp {
            if desc.is_offer() {
                self.on_offer(from.clone(), desc).await;
            } else {
                self.on_answer(from.clone(), desc);
            }
        }
        if let Some(candidate) = candidate {
            if self.in_flight.is_some() {
                // Anything still deferred arrived after this candidate.
                self.deferred
                    .push_front(Deferred::Signal(from, SignalData::candidate(candidate)));
            } else {
                self.on_remote_candidate(from, candidate).await;
            }
        }
    }

    /// The remote offers: answer, unless a link to it already exists and
    /// glare resolution keeps ours.
    async fn on_offer(&mut self, from: ParticipantId, offer: SessionDescription) {
        let mut carried = Vec::new();

        if let Some(link) = self.link.as_mut() {
            if link.remote() != &from {
                warn!(
                    "Offer from {} while linked to {}; ignoring",
                    from,
                    link.remote()
                );
                return;
            }

            if !yields_on_glare(self.config.glare, &self.local_id, link) {
                info!(
                    "Ignoring offer from {}, link already {:?}",
                    from,
                    link.state()
                );
                return;
            }

            info!("Offers crossed with {}; answering theirs", from);
            carried = link.take_pending_candidates();
            link.close().await;
            self.link = None;
        }

        let stream = self.media.active_stream().await;
        self.launch_new(from, false, Negotiation::Answer { stream, offer }, carried);
    }

    fn on_answer(&mut self, from: ParticipantId, answer: SessionDescription) {
        match self.link.take() {
            Some(link) if link.remote() == &from => {
                self.launch(link, Negotiation::Complete { answer });
            }
            Some(link) => {
                warn!("Answer from {} but linked to {}", from, link.remote());
                self.link = Some(link);
            }
            None => warn!("Answer from {} without a peer link", from),
        }
    }

    async fn on_remote_candidate(&mut self, from: ParticipantId, candidate: IceCandidate) {
        match self.link.as_mut() {
            Some(link) if link.remote() == &from => {
                if let Err(e) = link.add_remote_candidate(candidate).await {
                    self.emit(SessionEvent::CandidateFailed(e));
                }
            }
            Some(link) => {
                warn!(
                    "Dropping candidate from {}, linked to {}",
                    from,
                    link.remote()
                );
            }
            None => {
                debug!("Holding candidate from {} until a link exists", from);
                self.early_candidates.push((from, candidate));
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.is_leaving() {
            return;
        }
        if self.in_flight.as_ref().is_some_and(|f| &f.id == event.link()) {
            self.deferred.push_back(Deferred::Transport(event));
            return;
        }
        let Some(link) = self.link.as_mut().filter(|l| l.id() == event.link()) else {
            debug!("Dropping event from stale link {}", event.link());
            return;
        };

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                // Our offer may still be dropped for theirs; its candidates
                // would then point at a closed connection.
                if yields_on_glare(self.config.glare, &self.local_id, link) {
                    link.hold_local_candidate(candidate);
                } else if let Err(e) = link.send_local_candidate(candidate).await {
                    warn!("Failed to send local candidate: {}", e);
                }
            }

            TransportEvent::RemoteTrack(LinkId { remote, .. }, track) => {
                if link.on_remote_track() {
                    self.emit(SessionEvent::PeerConnected {
                        remote: remote.clone(),
                    });
                }
                self.emit(SessionEvent::RemoteTrack { remote, track });
            }

            TransportEvent::StateChanged(id, state) => match state {
                Connectivity::Failed | Connectivity::Disconnected => {
                    warn!("Peer link {} is {:?}", id, state);
                }
                _ => debug!("Peer link {} is {:?}", id, state),
            },
        }
    }

    /// Open a fresh link to `remote` and negotiate on it off the loop. The
    /// link starts with any candidates already received from `remote`.
    fn launch_new(
        &mut self,
        remote: ParticipantId,
        outbound: bool,
        negotiation: Negotiation,
        carried: Vec<IceCandidate>,
    ) {
        self.next_seq += 1;
        let id = LinkId {
            remote: remote.clone(),
            seq: self.next_seq,
        };

        let (early, others): (Vec<_>, Vec<_>) = self
            .early_candidates
            .drain(..)
            .partition(|(from, _)| *from == remote);
        if !others.is_empty() {
            warn!("Dropping {} candidates from other participants", others.len());
        }
        let mut candidates: Vec<IceCandidate> = early.into_iter().map(|(_, c)| c).collect();
        candidates.extend(carried);
        let pending_candidates = candidates.len();

        debug!("Starting {} negotiation on {}", negotiation.name(), id);
        let factory = Arc::clone(&self.transports);
        let ctx = self.link_ctx.clone();
        let transport_tx = self.transport_tx.clone();
        let events = self.events.clone();
        let link_id = id.clone();
        let task = tokio::spawn(async move {
            let mut link = match PeerLink::open(link_id, factory.as_ref(), &ctx, transport_tx).await
            {
                Ok(link) => link,
                Err(e) => return (None, Err(e)),
            };
            link.preload_candidates(candidates);
            let _ = events.send(SessionEvent::PeerLinkCreated { remote, outbound });

            let outcome = negotiation.run(&mut link).await;
            (Some(link), outcome)
        });

        self.in_flight = Some(InFlight {
            id,
            state: LinkState::Idle,
            has_remote_description: false,
            pending_candidates,
            stream_replaced: false,
            task,
        });
    }

    /// Negotiate on the existing `link` off the loop.
    fn launch(&mut self, mut link: PeerLink, negotiation: Negotiation) {
        debug!("Starting {} negotiation on {}", negotiation.name(), link.id());
        let id = link.id().clone();
        let state = link.state();
        let has_remote_description = link.has_remote_description();
        let pending_candidates = link.pending_candidates();

        let task = tokio::spawn(async move {
            let outcome = negotiation.run(&mut link).await;
            (Some(link), outcome)
        });

        self.in_flight = Some(InFlight {
            id,
            state,
            has_remote_description,
            pending_candidates,
            stream_replaced: false,
            task,
        });
    }

    /// Take the link back from its negotiation task, then replay whatever
    /// arrived for it meanwhile.
    async fn on_settled(&mut self, res: Result<Settled, JoinError>) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        let (link, outcome) = res.unwrap_or_else(|e| {
            let err = NegotiationError::Transport {
                peer: flight.remote().clone(),
                reason: format!("negotiation task ended: {e}"),
            };
            (None, Err(err))
        });

        match (link, outcome) {
            (Some(mut link), Ok(failures)) => {
                if flight.stream_replaced {
                    if let Some(stream) = self.media.active_stream().await {
                        if let Err(e) = link.substitute_tracks(&stream).await {
                            warn!("Could not move {} to the new camera: {}", link.id(), e);
                        }
                    }
                }
                if !link.is_awaiting_answer() {
                    if let Err(e) = link.release_local_candidates().await {
                        warn!("Failed to send held candidates: {}", e);
                    }
                }
                self.link = Some(link);
                self.candidates_failed(failures);
            }
            (link, outcome) => {
                if let Some(mut link) = link {
                    link.close().await;
                }
                if let Err(e) = outcome {
                    self.negotiation_failed(e);
                }
            }
        }

        self.replay_deferred().await;
    }

    async fn replay_deferred(&mut self) {
        if self.is_leaving() {
            self.deferred.clear();
            return;
        }
        while self.in_flight.is_none() {
            let Some(item) = self.deferred.pop_front() else {
                break;
            };
            match item {
                Deferred::Signal(from, data) => self.on_signal(from, data).await,
                Deferred::Transport(event) => self.handle_transport_event(event).await,
            }
        }
    }

    async fn discard_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close().await;
        }
    }

    fn negotiation_failed(&self, err: NegotiationError) {
        if matches!(err, NegotiationError::Cancelled(_)) {
            debug!("{}", err);
            return;
        }
        warn!("Negotiation failed: {}", err);
        self.emit(SessionEvent::NegotiationFailed(err));
    }

    fn candidates_failed(&self, failures: Vec<ConnectivityCandidateError>) {
        for failure in failures {
            self.emit(SessionEvent::CandidateFailed(failure));
        }
    }

    /// Tear down everything this membership holds. Safe to repeat.
    async fn leave(&mut self) {
        if self.lifecycle() == Lifecycle::Left {
            return;
        }
        info!("Leaving room {}", self.config.room_id);

        // Aborts any suspended negotiation step.
        self.leave_requested.send_replace(true);
        if let Some(flight) = self.in_flight.take() {
            match flight.task.await {
                Ok((Some(mut link), _)) => link.close().await,
                Ok((None, _)) => {}
                Err(e) => warn!("Negotiation task for {} ended abnormally: {}", flight.id, e),
            }
        }
        self.deferred.clear();

        self.discard_link().await;
        self.early_candidates.clear();
        self.media.stop_all().await;

        if let Err(e) = self
            .signaling
            .leave(&self.config.room_id, &self.config.username)
            .await
        {
            warn!("Could not announce leave: {}", e);
        }
        self.signaling.unsubscribe();
        self.chat.clear();

        self.lifecycle.send_replace(Lifecycle::Left);
        self.emit(SessionEvent::Left);
    }

    async fn snapshot(&self) -> SessionSnapshot {
        let (remote, link_state, has_remote_description, link_pending) =
            match (&self.in_flight, &self.link) {
                (Some(f), _) => (
                    Some(f.remote().clone()),
                    Some(f.state),
                    f.has_remote_description,
                    f.pending_candidates,
                ),
                (None, Some(l)) => (
                    Some(l.remote().clone()),
                    Some(l.state()),
                    l.has_remote_description(),
                    l.pending_candidates(),
                ),
                (None, None) => (None, None, false, 0),
            };
        let deferred = self.deferred.iter().filter(|d| d.is_candidate()).count();

        SessionSnapshot {
            lifecycle: self.lifecycle(),
            local_id: self.local_id.clone(),
            room_id: self.config.room_id.clone(),
            remote,
            link_state,
            has_remote_description,
            negotiating: self.in_flight.is_some(),
            pending_candidates: self.early_candidates.len() + link_pending + deferred,
            selected_camera: self.media.selected_index().await,
            chat_len: self.chat.log().len(),
        }
    }

    fn linked_remote(&self) -> Option<&ParticipantId> {
        match (&self.in_flight, &self.link) {
            (Some(f), _) => Some(f.remote()),
            (None, Some(l)) => Some(l.remote()),
            (None, None) => None,
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    fn is_leaving(&self) -> bool {
        *self.leave_requested.borrow() || self.lifecycle() == Lifecycle::Left
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Under `LowerIdAnswers` the smaller id drops its own pending offer when
/// offers cross.
fn yields_on_glare(policy: GlarePolicy, local: &ParticipantId, link: &PeerLink) -> bool {
    policy == GlarePolicy::LowerIdAnswers && link.is_awaiting_answer() && local < link.remote()
}

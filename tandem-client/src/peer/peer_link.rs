use crate::error::{ConnectivityCandidateError, MediaError, NegotiationError, SignalingError};
use crate::media::LocalStream;
use crate::peer::CandidateBuffer;
use crate::signaling::SignalingChannel;
use crate::transport::{LinkId, PeerTransport, TransportConfig, TransportEvent, TransportFactory};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{IceCandidate, ParticipantId, SessionDescription, SignalData, SignalEvent};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Negotiation state of the single peer connection of a room membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkState {
    Idle,
    OfferSent,
    AnswerPending,
    /// First remote media track received.
    Connected,
    Closed,
}

/// Everything a link needs besides its transport.
#[derive(Clone)]
pub struct LinkContext {
    pub signaling: Arc<dyn SignalingChannel>,
    pub transport: TransportConfig,
    pub step_timeout: Duration,
    /// Flips to `true` when the room is being left.
    pub cancel: watch::Receiver<bool>,
}

/// Owns one connection object and drives it through offer/answer.
///
/// Remote candidates are queued until a remote description is applied, then
/// drained in arrival order.
pub struct PeerLink {
    id: LinkId,
    transport: Arc<dyn PeerTransport>,
    signaling: Arc<dyn SignalingChannel>,
    state: LinkState,
    remote_description_set: bool,
    pending: CandidateBuffer,
    /// Local candidates kept back while our offer may still be dropped.
    held_local: Vec<IceCandidate>,
    step_timeout: Duration,
    cancel: watch::Receiver<bool>,
}

impl PeerLink {
    pub async fn open(
        id: LinkId,
        factory: &dyn TransportFactory,
        ctx: &LinkContext,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, NegotiationError> {
        let remote = id.remote.clone();
        let transport = bounded(
            &remote,
            "open connection",
            ctx.step_timeout,
            &ctx.cancel,
            factory.open(id.clone(), &ctx.transport, events),
        )
        .await
        .map_err(|e| match e {
            NegotiationError::Description { peer, reason, .. } => {
                NegotiationError::Transport { peer, reason }
            }
            other => other,
        })?;

        debug!("Opened peer link {}", id);
        Ok(Self {
            id,
            transport,
            signaling: Arc::clone(&ctx.signaling),
            state: LinkState::Idle,
            remote_description_set: false,
            pending: CandidateBuffer::new(),
            held_local: Vec::new(),
            step_timeout: ctx.step_timeout,
            cancel: ctx.cancel.clone(),
        })
    }

    pub fn id(&self) -> &LinkId {
        &self.id
    }

    pub fn remote(&self) -> &ParticipantId {
        &self.id.remote
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description_set
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending.len()
    }

    /// Our offer is out and no answer has been applied yet.
    pub fn is_awaiting_answer(&self) -> bool {
        self.state == LinkState::OfferSent && !self.remote_description_set
    }

    /// Candidates that arrived before this link existed.
    pub fn preload_candidates(&mut self, candidates: Vec<IceCandidate>) {
        if !candidates.is_empty() {
            debug!("Preloading {} candidates into {}", candidates.len(), self.id);
            self.pending.extend(candidates);
        }
    }

    /// Hand queued candidates over to a replacement link.
    pub fn take_pending_candidates(&mut self) -> Vec<IceCandidate> {
        self.pending.drain()
    }

    /// This side initiates: attach tracks, offer, send.
    pub async fn start_outbound(
        &mut self,
        stream: Option<&LocalStream>,
    ) -> Result<(), NegotiationError> {
        self.ensure_idle("create offer")?;

        if let Some(stream) = stream {
            self.step("attach tracks", self.transport.attach_stream(stream))
                .await?;
        }
        let offer = self
            .step("create offer", self.transport.create_offer())
            .await?;
        self.step(
            "set local description",
            self.transport.set_local_description(offer.clone()),
        )
        .await?;
        self.send_description(offer).await?;

        self.state = LinkState::OfferSent;
        info!("Sent offer to {}", self.remote());
        Ok(())
    }

    /// The remote initiated: apply its offer, answer, send the answer back.
    pub async fn accept_offer(
        &mut self,
        stream: Option<&LocalStream>,
        offer: SessionDescription,
    ) -> Result<Vec<ConnectivityCandidateError>, NegotiationError> {
        self.ensure_idle("accept offer")?;
        if !offer.is_offer() {
            return Err(self.rejected("accept offer", "description is not an offer"));
        }

        if let Some(stream) = stream {
            self.step("attach tracks", self.transport.attach_stream(stream))
                .await?;
        }
        self.step(
            "set remote description",
            self.transport.set_remote_description(offer),
        )
        .await?;
        let failures = self.on_remote_description().await;

        let answer = self
            .step("create answer", self.transport.create_answer())
            .await?;
        self.step(
            "set local description",
            self.transport.set_local_description(answer.clone()),
        )
        .await?;
        self.send_description(answer).await?;

        self.state = LinkState::AnswerPending;
        info!("Sent answer to {}", self.remote());
        Ok(failures)
    }

    /// Apply the answer to our offer. Nothing is sent.
    pub async fn complete_outbound(
        &mut self,
        answer: SessionDescription,
    ) -> Result<Vec<ConnectivityCandidateError>, NegotiationError> {
        if !self.is_awaiting_answer() {
            warn!(
                "Ignoring answer from {} in state {:?}",
                self.remote(),
                self.state
            );
            return Ok(Vec::new());
        }
        if answer.is_offer() {
            return Err(self.rejected("complete offer", "description is not an answer"));
        }

        self.step(
            "set remote description",
            self.transport.set_remote_description(answer),
        )
        .await?;
        info!("Applied answer from {}", self.remote());
        Ok(self.on_remote_description().await)
    }

    /// Apply now if the transport can take it, otherwise queue.
    pub async fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), ConnectivityCandidateError> {
        if self.state == LinkState::Closed {
            debug!("Dropping candidate for closed link {}", self.id);
            return Ok(());
        }
        if !self.remote_description_set {
            self.pending.push(candidate);
            debug!(
                "Queued candidate from {} ({} pending)",
                self.remote(),
                self.pending.len()
            );
            return Ok(());
        }
        self.apply_candidate(candidate).await
    }

    /// Forward a locally gathered candidate to the remote, whatever the state.
    pub async fn send_local_candidate(
        &self,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError> {
        if self.state == LinkState::Closed {
            return Ok(());
        }
        self.signaling
            .send(SignalEvent::Signal {
                to: self.remote().clone(),
                from: None,
                data: SignalData::candidate(candidate),
            })
            .await
    }

    /// Keep a gathered candidate back instead of sending it. Dropped on close.
    pub fn hold_local_candidate(&mut self, candidate: IceCandidate) {
        if self.state != LinkState::Closed {
            self.held_local.push(candidate);
        }
    }

    pub fn held_local_candidates(&self) -> usize {
        self.held_local.len()
    }

    /// Send everything kept back by `hold_local_candidate`, in order.
    pub async fn release_local_candidates(&mut self) -> Result<(), SignalingError> {
        let held = std::mem::take(&mut self.held_local);
        if !held.is_empty() {
            debug!("Releasing {} held candidates to {}", held.len(), self.remote());
        }
        for candidate in held {
            self.send_local_candidate(candidate).await?;
        }
        Ok(())
    }

    /// Returns `true` on the transition into `Connected`.
    pub fn on_remote_track(&mut self) -> bool {
        match self.state {
            LinkState::Connected | LinkState::Closed => false,
            _ => {
                self.state = LinkState::Connected;
                info!("Peer link {} connected", self.id);
                true
            }
        }
    }

    /// Swap the outbound tracks in place; the connection is not renegotiated.
    pub async fn substitute_tracks(&self, stream: &LocalStream) -> Result<(), MediaError> {
        if self.state == LinkState::Closed {
            return Ok(());
        }
        self.transport
            .replace_stream(stream)
            .await
            .map_err(|e| MediaError::TrackSubstitution(format!("{e:#}")))
    }

    /// Release the connection. A no-op once closed.
    pub async fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        self.state = LinkState::Closed;
        self.pending.clear();
        self.held_local.clear();

        if let Err(e) = self.transport.close().await {
            warn!("Error closing peer link {}: {:#}", self.id, e);
        }
        info!("Peer link {} closed", self.id);
    }

    async fn on_remote_description(&mut self) -> Vec<ConnectivityCandidateError> {
        self.remote_description_set = true;

        let queued = self.pending.drain();
        if !queued.is_empty() {
            debug!("Draining {} queued candidates for {}", queued.len(), self.id);
        }

        let mut failures = Vec::new();
        for candidate in queued {
            if let Err(e) = self.apply_candidate(candidate).await {
                failures.push(e);
            }
        }
        failures
    }

    async fn apply_candidate(
        &self,
        candidate: IceCandidate,
    ) -> Result<(), ConnectivityCandidateError> {
        self.transport
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| {
                let err = ConnectivityCandidateError {
                    peer: self.remote().clone(),
                    reason: format!("{e:#}"),
                };
                warn!("{}", err);
                err
            })
    }

    async fn send_description(&self, desc: SessionDescription) -> Result<(), NegotiationError> {
        self.signaling
            .send(SignalEvent::Signal {
                to: self.remote().clone(),
                from: None,
                data: SignalData::description(desc),
            })
            .await
            .map_err(|e| self.rejected("send description", &e.to_string()))
    }

    async fn step<T>(
        &self,
        step: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, NegotiationError> {
        bounded(self.remote(), step, self.step_timeout, &self.cancel, fut).await
    }

    fn ensure_idle(&self, step: &'static str) -> Result<(), NegotiationError> {
        if self.state == LinkState::Idle {
            Ok(())
        } else {
            Err(self.rejected(step, &format!("link is {:?}", self.state)))
        }
    }

    fn rejected(&self, step: &'static str, reason: &str) -> NegotiationError {
        NegotiationError::Description {
            peer: self.remote().clone(),
            step,
            reason: reason.to_owned(),
        }
    }
}

/// Run one suspension point, bounded by `timeout` and aborted when leaving.
async fn bounded<T>(
    peer: &ParticipantId,
    step: &'static str,
    timeout: Duration,
    cancel: &watch::Receiver<bool>,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, NegotiationError> {
    tokio::select! {
        biased;
        _ = leaving(cancel.clone()) => Err(NegotiationError::Cancelled(peer.clone())),
        res = tokio::time::timeout(timeout, fut) => match res {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(NegotiationError::Description {
                peer: peer.clone(),
                step,
                reason: format!("{e:#}"),
            }),
            Err(_) => Err(NegotiationError::Timeout {
                peer: peer.clone(),
                step,
            }),
        },
    }
}

async fn leaving(mut cancel: watch::Receiver<bool>) {
    let closed = cancel.wait_for(|left| *left).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

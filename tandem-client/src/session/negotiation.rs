use crate::error::{ConnectivityCandidateError, NegotiationError};
use crate::media::LocalStream;
use crate::peer::{LinkState, PeerLink};
use crate::transport::{LinkId, TransportEvent};
use tandem_core::{ParticipantId, SessionDescription, SignalData};
use tokio::task::JoinHandle;

pub(crate) type Outcome = Result<Vec<ConnectivityCandidateError>, NegotiationError>;

/// What a settled negotiation hands back: the link, if it was opened, and how
/// the steps went.
pub(crate) type Settled = (Option<PeerLink>, Outcome);

/// One offer/answer exchange to run on a link.
pub(crate) enum Negotiation {
    Offer {
        stream: Option<LocalStream>,
    },
    Answer {
        stream: Option<LocalStream>,
        offer: SessionDescription,
    },
    Complete {
        answer: SessionDescription,
    },
}

impl Negotiation {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Negotiation::Offer { .. } => "offer",
            Negotiation::Answer { .. } => "answer",
            Negotiation::Complete { .. } => "complete",
        }
    }

    pub(crate) async fn run(self, link: &mut PeerLink) -> Outcome {
        match self {
            Negotiation::Offer { stream } => link
                .start_outbound(stream.as_ref())
                .await
                .map(|()| Vec::new()),
            Negotiation::Answer { stream, offer } => {
                link.accept_offer(stream.as_ref(), offer).await
            }
            Negotiation::Complete { answer } => link.complete_outbound(answer).await,
        }
    }
}

/// A negotiation running on its own task while the session keeps serving
/// commands and chat.
pub(crate) struct InFlight {
    pub id: LinkId,
    /// Link state when the task took the link.
    pub state: LinkState,
    pub has_remote_description: bool,
    pub pending_candidates: usize,
    /// The camera changed while the link was away.
    pub stream_replaced: bool,
    pub task: JoinHandle<Settled>,
}

impl InFlight {
    pub fn remote(&self) -> &ParticipantId {
        &self.id.remote
    }
}

/// Link input that arrived while the link was inside a negotiation task.
/// Replayed in arrival order once the task settles.
pub(crate) enum Deferred {
    Signal(ParticipantId, SignalData),
    Transport(TransportEvent),
}

impl Deferred {
    pub fn is_candidate(&self) -> bool {
        matches!(self, Deferred::Signal(_, data) if data.candidate.is_some())
    }
}

/// Resolves when the in-flight negotiation settles; never, if there is none.
pub(crate) async fn settled(
    in_flight: &mut Option<InFlight>,
) -> Result<Settled, tokio::task::JoinError> {
    match in_flight {
        Some(flight) => (&mut flight.task).await,
        None => std::future::pending().await,
    }
}

use std::collections::VecDeque;
use tandem_core::IceCandidate;

/// Remote candidates received before the transport had a remote description.
/// Drained in arrival order.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    queue: VecDeque<IceCandidate>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.queue.push_back(candidate);
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = IceCandidate>) {
        self.queue.extend(candidates);
    }

    /// Take everything queued, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.queue.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

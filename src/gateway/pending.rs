use crate::domain_model::AccessToken;
use crate::gateway::ApiError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// How a refresh settled, as delivered to every request queued behind it.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Refreshed(AccessToken),
    Failed(ApiError),
}

/// A request suspended until the in-flight refresh settles.
#[derive(Debug)]
pub struct PendingRequest {
    completion: oneshot::Sender<RefreshOutcome>,
}

impl PendingRequest {
    pub fn new() -> (Self, oneshot::Receiver<RefreshOutcome>) {
        let (completion, rx) = oneshot::channel();
        (Self { completion }, rx)
    }

    pub fn complete(self, outcome: RefreshOutcome) {
        // The receiver is gone if the caller stopped waiting.
        let _ = self.completion.send(outcome);
    }
}

#[derive(Debug, Default)]
pub struct RefreshState {
    refreshing: bool,
    queue: VecDeque<PendingRequest>,
}

impl RefreshState {
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Claims the refresh. Returns false if another caller holds it.
    /// The claimer must wrap the refresh in a `RefreshGuard`.
    pub fn begin(&mut self) -> bool {
        if self.refreshing {
            return false;
        }
        self.refreshing = true;
        true
    }

    pub fn enqueue(&mut self, pending: PendingRequest) {
        self.queue.push_back(pending);
    }

    fn take_queue(&mut self) -> VecDeque<PendingRequest> {
        std::mem::take(&mut self.queue)
    }

    fn finish(&mut self) -> VecDeque<PendingRequest> {
        self.refreshing = false;
        self.take_queue()
    }
}

pub(crate) fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive hold on the `Refreshing` state.
///
/// `complete` drains the queue in arrival order. Dropping the guard clears
/// the flag and empties the queue, also when the owning future is dropped
/// before it drained; whatever is still queued then gets the recorded
/// outcome, or `Cancelled` if none was recorded.
pub(crate) struct RefreshGuard<'a> {
    state: &'a Mutex<RefreshState>,
    outcome: Option<RefreshOutcome>,
}

impl<'a> RefreshGuard<'a> {
    /// Only call after `RefreshState::begin` returned true.
    pub(crate) fn new(state: &'a Mutex<RefreshState>) -> Self {
        Self {
            state,
            outcome: None,
        }
    }

    /// Settles the refresh without resuming anyone yet. Queued requests get
    /// `outcome` on `complete` or, at the latest, when the guard drops.
    pub(crate) fn record(&mut self, outcome: RefreshOutcome) {
        self.outcome = Some(outcome);
    }

    /// Resumes every queued request with `outcome`. Returns how many.
    pub(crate) fn complete(&mut self, outcome: RefreshOutcome) -> usize {
        let queue = lock(self.state).take_queue();
        let drained = queue.len();
        for pending in queue {
            pending.complete(outcome.clone());
        }
        self.outcome = Some(outcome);
        drained
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let queue = lock(self.state).finish();
        let outcome = self
            .outcome
            .take()
            .unwrap_or(RefreshOutcome::Failed(ApiError::Cancelled));
        for pending in queue {
            pending.complete(outcome.clone());
        }
    }
}

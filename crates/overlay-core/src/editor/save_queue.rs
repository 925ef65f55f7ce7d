//! Single-slot save queue: at most one write in flight plus one pending.
//!
//! The pending slot is a flag, not a list. Intermediate states requested while
//! a write is in flight collapse into one follow-up write, which is built from
//! whatever the state is when it actually starts.

/// Queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Sending,
    SendingPending,
}

/// What the caller must do after [`SaveQueue::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    /// Start a write now with the current state.
    Start,
    /// A write is already in flight; a follow-up has been queued.
    Queued,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveQueue {
    state: SaveState,
}

impl SaveQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SaveState::Idle
    }

    pub fn request(&mut self) -> SaveDecision {
        match self.state {
            SaveState::Idle => {
                self.state = SaveState::Sending;
                SaveDecision::Start
            }
            SaveState::Sending | SaveState::SendingPending => {
                self.state = SaveState::SendingPending;
                SaveDecision::Queued
            }
        }
    }

    /// The in-flight write finished (successfully or not). Returns `true` when
    /// a queued follow-up must start now; the queue then stays `Sending`.
    pub fn complete(&mut self) -> bool {
        match self.state {
            SaveState::SendingPending => {
                self.state = SaveState::Sending;
                true
            }
            SaveState::Sending | SaveState::Idle => {
                self.state = SaveState::Idle;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_into_one_follow_up() {
        let mut queue = SaveQueue::new();
        assert_eq!(queue.request(), SaveDecision::Start);
        assert_eq!(queue.request(), SaveDecision::Queued);
        assert_eq!(queue.request(), SaveDecision::Queued);
        assert_eq!(queue.state(), SaveState::SendingPending);

        assert!(queue.complete());
        assert_eq!(queue.state(), SaveState::Sending);
        assert!(!queue.complete());
        assert!(queue.is_idle());
    }

    #[test]
    fn test_request_after_idle_starts_again() {
        let mut queue = SaveQueue::new();
        queue.request();
        queue.complete();
        assert_eq!(queue.request(), SaveDecision::Start);
    }
}

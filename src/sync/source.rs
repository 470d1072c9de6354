#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Disconnected,
    ConnectingPush,
    LivePush,
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Start,
    PushConnected,
    PushDisconnected,
    PushConnectError,
    PollTick,
    PollFinished,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAction {
    OpenPush,
    ClosePush,
    StartPolling,
    StopPolling,
    FetchPoll,
    /// Full fetch after push (re)connects, for records created while it was down.
    CatchUp,
}

/// Decides whether push or poll drives the cache. Exactly one is active at a time.
#[derive(Debug, Clone)]
pub struct UpdateSource {
    state: SourceState,
    push_enabled: bool,
    /// Survives leaving `Polling` so a late response still blocks a second fetch.
    poll_in_flight: bool,
}

impl UpdateSource {
    pub fn new(push_enabled: bool) -> Self {
        Self { state: SourceState::Disconnected, push_enabled, poll_in_flight: false }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Push events may touch the cache only while push is live.
    pub fn accepts_push(&self) -> bool {
        self.state == SourceState::LivePush
    }

    pub fn is_polling(&self) -> bool {
        self.state == SourceState::Polling
    }

    pub fn poll_in_flight(&self) -> bool {
        self.poll_in_flight
    }

    pub fn handle(&mut self, event: SourceEvent) -> Vec<SourceAction> {
        use SourceAction::*;
        use SourceState::*;

        if event == SourceEvent::PollFinished {
            self.poll_in_flight = false;
        }

        let (next, actions) = match (self.state, &event) {
            (Disconnected, SourceEvent::Start) if self.push_enabled => (ConnectingPush, vec![OpenPush]),
            (Disconnected, SourceEvent::Start) => (Polling, vec![StartPolling]),

            (ConnectingPush, SourceEvent::PushConnected) => (LivePush, vec![CatchUp]),
            (Polling, SourceEvent::PushConnected) => (LivePush, vec![StopPolling, CatchUp]),

            (LivePush, SourceEvent::PushDisconnected) => (ConnectingPush, vec![]),

            (ConnectingPush | LivePush, SourceEvent::PushConnectError) => (Polling, vec![StartPolling]),

            (Polling, SourceEvent::PollTick) if !self.poll_in_flight => {
                self.poll_in_flight = true;
                (Polling, vec![FetchPoll])
            }

            (Disconnected, SourceEvent::Shutdown) => (Disconnected, vec![]),
            (state, SourceEvent::Shutdown) => {
                let mut actions = Vec::new();
                if self.push_enabled {
                    actions.push(ClosePush);
                }
                if state == Polling {
                    actions.push(StopPolling);
                }
                (Disconnected, actions)
            }

            (state, _) => (state, vec![]),
        };

        if next != self.state {
            log::info!("update source {:?} -> {:?} on {:?}", self.state, next, event);
        }
        self.state = next;
        actions
    }
}

//! Metrics link state machine
//!
//! Pure functions only: the client feeds in what it observed and executes the
//! returned action, so every rule can be tested without sockets or clocks.

/// Minimum spacing between connection attempts
pub const RECONNECT_BACKOFF_MS: u32 = 5_000;

/// Minimum spacing between periodic metric publishes
pub const PUBLISH_INTERVAL_MS: u32 = 30_000;

/// Link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Bridge turned off by the caller
    #[default]
    Disabled,
    /// Enabled, no broker session
    Disconnected,
    /// Connection attempt in progress
    Connecting,
    /// Broker session open
    Connected,
}

/// Events observed by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Enable,
    Disable,
    NetworkLost,
    AttemptStarted,
    ConnectSucceeded,
    ConnectFailed,
    TransportLost,
}

/// Work the client should do on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkAction {
    Idle,
    Disconnect,
    Connect,
    Publish,
}

/// Everything the planner looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkInputs {
    pub enabled: bool,
    pub network_up: bool,
    pub transport_connected: bool,
    pub now_ms: u32,
    /// `None` before the first attempt
    pub last_attempt_ms: Option<u32>,
    /// `None` before the first publish
    pub last_publish_ms: Option<u32>,
}

/// Planner result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStep {
    pub next: LinkState,
    pub action: LinkAction,
}

/// `true` when `interval_ms` has passed since `since`, or there is no `since`
fn elapsed(now_ms: u32, since: Option<u32>, interval_ms: u32) -> bool {
    match since {
        Some(t) => now_ms.wrapping_sub(t) >= interval_ms,
        None => true,
    }
}

impl LinkState {
    /// Display text
    pub const fn as_str(&self) -> &'static str {
        match self {
            LinkState::Disabled => "Disabled",
            LinkState::Disconnected => "Disconnected",
            LinkState::Connecting => "Connecting",
            LinkState::Connected => "Connected",
        }
    }

    /// Process an event and return the next state
    pub fn transition(self, event: LinkEvent) -> Self {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            // Turning the bridge off wins from anywhere
            (_, Disable) => Disabled,

            (Disabled, Enable) => Disconnected,

            (Disabled | Disconnected | Connecting, AttemptStarted) => Connecting,
            (Connecting, ConnectSucceeded) => Connected,
            (Connecting, ConnectFailed) => Disconnected,

            (Connected, TransportLost) => Disconnected,
            (Connecting | Connected, NetworkLost) => Disconnected,

            // Default: stay in current state
            _ => self,
        }
    }

    /// Decide what to do on one maintenance tick
    pub fn plan(self, inputs: &LinkInputs) -> LinkStep {
        let was_connected = self == LinkState::Connected;

        if !inputs.enabled {
            return LinkStep {
                next: self.transition(LinkEvent::Disable),
                action: if was_connected {
                    LinkAction::Disconnect
                } else {
                    LinkAction::Idle
                },
            };
        }

        if !inputs.network_up {
            return LinkStep {
                next: LinkState::Disconnected,
                action: if was_connected {
                    LinkAction::Disconnect
                } else {
                    LinkAction::Idle
                },
            };
        }

        if was_connected {
            if !inputs.transport_connected {
                // Reconnect on a later tick, never this one
                return LinkStep {
                    next: self.transition(LinkEvent::TransportLost),
                    action: LinkAction::Idle,
                };
            }

            let action = if elapsed(inputs.now_ms, inputs.last_publish_ms, PUBLISH_INTERVAL_MS) {
                LinkAction::Publish
            } else {
                LinkAction::Idle
            };
            return LinkStep { next: self, action };
        }

        if elapsed(inputs.now_ms, inputs.last_attempt_ms, RECONNECT_BACKOFF_MS) {
            LinkStep {
                next: self.transition(LinkEvent::AttemptStarted),
                action: LinkAction::Connect,
            }
        } else {
            LinkStep {
                next: LinkState::Disconnected,
                action: LinkAction::Idle,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(now_ms: u32) -> LinkInputs {
        LinkInputs {
            enabled: true,
            network_up: true,
            transport_connected: false,
            now_ms,
            last_attempt_ms: None,
            last_publish_ms: None,
        }
    }

    #[test]
    fn test_disable_from_any_state() {
        let states = [
            LinkState::Disabled,
            LinkState::Disconnected,
            LinkState::Connecting,
            LinkState::Connected,
        ];

        for state in states {
            assert_eq!(state.transition(LinkEvent::Disable), LinkState::Disabled);
        }
    }

    #[test]
    fn test_connect_flow() {
        let state = LinkState::Disabled.transition(LinkEvent::Enable);
        assert_eq!(state, LinkState::Disconnected);

        let connecting = state.transition(LinkEvent::AttemptStarted);
        assert_eq!(connecting, LinkState::Connecting);

        assert_eq!(
            connecting.transition(LinkEvent::ConnectFailed),
            LinkState::Disconnected
        );

        let connected = connecting.transition(LinkEvent::ConnectSucceeded);
        assert_eq!(connected, LinkState::Connected);

        assert_eq!(
            connected.transition(LinkEvent::TransportLost),
            LinkState::Disconnected
        );
        assert_eq!(
            connected.transition(LinkEvent::NetworkLost),
            LinkState::Disconnected
        );
    }

    #[test]
    fn test_irrelevant_events_ignored() {
        assert_eq!(
            LinkState::Disabled.transition(LinkEvent::ConnectSucceeded),
            LinkState::Disabled
        );
        assert_eq!(
            LinkState::Connected.transition(LinkEvent::Enable),
            LinkState::Connected
        );
    }

    #[test]
    fn test_first_attempt_is_immediate() {
        let step = LinkState::Disconnected.plan(&inputs(0));
        assert_eq!(step.action, LinkAction::Connect);
        assert_eq!(step.next, LinkState::Connecting);
    }

    #[test]
    fn test_backoff_after_failed_attempt() {
        let mut i = inputs(10_000);
        i.last_attempt_ms = Some(8_000);
        let step = LinkState::Disconnected.plan(&i);
        assert_eq!(step.action, LinkAction::Idle);
        assert_eq!(step.next, LinkState::Disconnected);

        i.now_ms = 13_000;
        assert_eq!(LinkState::Disconnected.plan(&i).action, LinkAction::Connect);
    }

    #[test]
    fn test_backoff_across_clock_wrap() {
        let mut i = inputs(1_000);
        i.last_attempt_ms = Some(u32::MAX - 1_000);
        assert_eq!(LinkState::Disconnected.plan(&i).action, LinkAction::Idle);

        i.now_ms = 4_000;
        assert_eq!(LinkState::Disconnected.plan(&i).action, LinkAction::Connect);
    }

    #[test]
    fn test_transport_loss_waits_for_next_tick() {
        let step = LinkState::Connected.plan(&inputs(50_000));
        assert_eq!(step.next, LinkState::Disconnected);
        assert_eq!(step.action, LinkAction::Idle);
    }

    #[test]
    fn test_publish_gate() {
        let mut i = inputs(100_000);
        i.transport_connected = true;
        assert_eq!(LinkState::Connected.plan(&i).action, LinkAction::Publish);

        i.last_publish_ms = Some(80_000);
        assert_eq!(LinkState::Connected.plan(&i).action, LinkAction::Idle);

        i.now_ms = 110_000;
        let step = LinkState::Connected.plan(&i);
        assert_eq!(step.action, LinkAction::Publish);
        assert_eq!(step.next, LinkState::Connected);
    }

    #[test]
    fn test_disabled_input_disconnects_live_session() {
        let mut i = inputs(0);
        i.enabled = false;
        i.transport_connected = true;

        let step = LinkState::Connected.plan(&i);
        assert_eq!(step.next, LinkState::Disabled);
        assert_eq!(step.action, LinkAction::Disconnect);

        let step = LinkState::Disabled.plan(&i);
        assert_eq!(step.action, LinkAction::Idle);
    }

    #[test]
    fn test_network_loss() {
        let mut i = inputs(0);
        i.network_up = false;

        let step = LinkState::Connected.plan(&i);
        assert_eq!(step.next, LinkState::Disconnected);
        assert_eq!(step.action, LinkAction::Disconnect);

        let step = LinkState::Disconnected.plan(&i);
        assert_eq!(step.action, LinkAction::Idle);
    }

    #[test]
    fn test_state_text() {
        assert_eq!(LinkState::Disabled.as_str(), "Disabled");
        assert_eq!(LinkState::Connected.as_str(), "Connected");
    }
}

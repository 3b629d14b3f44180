//! Typing indicator state machines.
//!
//! Two small machines per conversation, both deadline-based with time passed
//! in explicitly:
//!
//! - [`LocalTyping`] decides when the local user's start/stop events are
//!   emitted: start on the first keystroke, stop when the 2000 ms debounce
//!   expires or immediately on send.
//! - [`RemoteTyping`] tracks who is typing on the other side, with a 5 s
//!   force-clear so a lost stop event cannot leave the indicator stuck.
//!
//! The driver (`flock-client`) polls [`LocalTyping::deadline`] /
//! [`RemoteTyping::deadline`] to schedule wakeups.

use chrono::{DateTime, Duration, Utc};

use flock_shared::constants::{REMOTE_TYPING_TIMEOUT_MS, TYPING_DEBOUNCE_MS};

/// Wire action the caller should take after a local transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    /// Nothing to emit.
    None,
    /// Emit `start_typing`.
    Start,
    /// Emit `stop_typing`.
    Stop,
}

/// Local-side typing debounce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTyping {
    /// Deadline at which `stop_typing` fires; `None` while idle.
    deadline: Option<DateTime<Utc>>,
}

impl LocalTyping {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user typed something. Emits start only on the idle→typing edge;
    /// every keystroke re-arms the debounce.
    pub fn on_input(&mut self, now: DateTime<Utc>) -> TypingSignal {
        let was_idle = self.deadline.is_none();
        self.deadline = Some(now + Duration::milliseconds(TYPING_DEBOUNCE_MS as i64));
        if was_idle {
            TypingSignal::Start
        } else {
            TypingSignal::None
        }
    }

    /// The user sent the message: cancel the pending debounce and emit stop
    /// immediately.
    pub fn on_send(&mut self) -> TypingSignal {
        if self.deadline.take().is_some() {
            TypingSignal::Stop
        } else {
            TypingSignal::None
        }
    }

    /// Check the debounce. Emits stop exactly once when the deadline passes.
    pub fn poll(&mut self, now: DateTime<Utc>) -> TypingSignal {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                TypingSignal::Stop
            }
            _ => TypingSignal::None,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }
}

/// Receiver-side typing indicator for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTyping {
    typing: Option<(String, DateTime<Utc>)>,
}

impl RemoteTyping {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `user_typing` event arrived. Re-arms the force-clear deadline.
    pub fn on_typing(&mut self, user_name: &str, now: DateTime<Utc>) {
        let deadline = now + Duration::milliseconds(REMOTE_TYPING_TIMEOUT_MS as i64);
        self.typing = Some((user_name.to_string(), deadline));
    }

    /// A `user_stopped_typing` event arrived.
    pub fn on_stopped(&mut self) {
        self.typing = None;
    }

    /// Force-clear a stale indicator whose refresh never arrived. Returns
    /// `true` if the indicator was cleared.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        match &self.typing {
            Some((_, deadline)) if now >= *deadline => {
                self.typing = None;
                true
            }
            _ => false,
        }
    }

    /// Name of the user currently shown as typing, if any.
    pub fn typing_user(&self) -> Option<&str> {
        self.typing.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.typing.as_ref().map(|(_, d)| *d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn start_emitted_only_on_idle_edge() {
        let mut typing = LocalTyping::new();
        assert_eq!(typing.on_input(at(0)), TypingSignal::Start);
        assert_eq!(typing.on_input(at(500)), TypingSignal::None);
        assert_eq!(typing.on_input(at(1000)), TypingSignal::None);
    }

    #[test]
    fn stop_fires_exactly_once_after_debounce() {
        let mut typing = LocalTyping::new();
        typing.on_input(at(0));

        assert_eq!(typing.poll(at(1999)), TypingSignal::None);
        assert_eq!(typing.poll(at(2000)), TypingSignal::Stop);
        // Already idle: further polls emit nothing.
        assert_eq!(typing.poll(at(5000)), TypingSignal::None);
        assert!(!typing.is_typing());
    }

    #[test]
    fn keystroke_rearms_the_debounce() {
        let mut typing = LocalTyping::new();
        typing.on_input(at(0));
        typing.on_input(at(1500));

        assert_eq!(typing.poll(at(2000)), TypingSignal::None);
        assert_eq!(typing.poll(at(3500)), TypingSignal::Stop);
    }

    #[test]
    fn send_cancels_the_timer_and_stops_immediately() {
        let mut typing = LocalTyping::new();
        typing.on_input(at(0));

        assert_eq!(typing.on_send(), TypingSignal::Stop);
        // The cancelled deadline must not fire a second stop.
        assert_eq!(typing.poll(at(2000)), TypingSignal::None);
        // Send while idle emits nothing.
        assert_eq!(typing.on_send(), TypingSignal::None);
    }

    #[test]
    fn remote_indicator_clears_on_stop_event() {
        let mut remote = RemoteTyping::new();
        remote.on_typing("Ada", at(0));
        assert_eq!(remote.typing_user(), Some("Ada"));

        remote.on_stopped();
        assert_eq!(remote.typing_user(), None);
    }

    #[test]
    fn lost_stop_event_is_force_cleared() {
        let mut remote = RemoteTyping::new();
        remote.on_typing("Ada", at(0));

        assert!(!remote.poll(at(4999)));
        assert!(remote.poll(at(5000)));
        assert_eq!(remote.typing_user(), None);
        assert!(!remote.poll(at(6000)));
    }

    #[test]
    fn refresh_extends_the_force_clear_deadline() {
        let mut remote = RemoteTyping::new();
        remote.on_typing("Ada", at(0));
        remote.on_typing("Ada", at(3000));

        assert!(!remote.poll(at(5000)));
        assert!(remote.poll(at(8000)));
    }
}

//! Client liveness monitoring for attended sessions.

use std::sync::{Arc, Mutex, PoisonError};

use playmux_types::SessionEvent;

use crate::config::WatchdogConfig;
use crate::events::EventBus;
use crate::timer::TimerTask;

/// Outcome of one watchdog tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Client must acknowledge; monitoring continues.
    NeedReply,
    /// Client exceeded the timeout; monitoring stops.
    ClientNoReply,
}

/// Accumulates time without a client reply.
#[derive(Debug, Clone)]
pub struct Watchdog {
    period_ms: u64,
    timeout_ms: u64,
    no_reply_ms: u64,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            period_ms: config.period_ms,
            timeout_ms: config.timeout_ms,
            no_reply_ms: 0,
        }
    }

    pub fn tick(&mut self) -> Verdict {
        if self.no_reply_ms > self.timeout_ms {
            return Verdict::ClientNoReply;
        }
        self.no_reply_ms += self.period_ms;
        Verdict::NeedReply
    }

    pub fn reply(&mut self) {
        self.no_reply_ms = 0;
    }

    pub fn no_reply_ms(&self) -> u64 {
        self.no_reply_ms
    }
}

/// Running watchdog; dropping it cancels the timer.
pub struct WatchdogTask {
    state: Arc<Mutex<Watchdog>>,
    _timer: TimerTask,
}

impl WatchdogTask {
    /// Start ticking every `config.period_ms`, emitting on `events`.
    pub fn spawn(config: WatchdogConfig, events: EventBus<SessionEvent>) -> Self {
        let state = Arc::new(Mutex::new(Watchdog::new(config)));
        let ticking = state.clone();
        let timer = TimerTask::periodic(config.period(), move || {
            let verdict = ticking
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .tick();
            match verdict {
                Verdict::NeedReply => {
                    events.emit(SessionEvent::NeedReply);
                    true
                }
                Verdict::ClientNoReply => {
                    tracing::warn!("client stopped replying");
                    events.emit(SessionEvent::ClientNoReply);
                    false
                }
            }
        });
        Self {
            state,
            _timer: timer,
        }
    }

    pub fn reply(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reply();
    }

    pub fn no_reply_ms(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .no_reply_ms()
    }
}

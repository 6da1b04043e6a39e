//! Auto-throttle on rate-limit responses.
//!
//! Watches status codes; any code from the trigger set arms the throttle
//! and grows a per-request delay. A quiet period disarms it again. The
//! state sits behind a plain mutex; the critical sections only compute a
//! duration, the sleeping happens outside the lock.

use std::{
    collections::HashSet,
    sync::Mutex,
    time::{Duration, Instant},
};

const BASE_DELAY: Duration = Duration::from_millis(500);
const STEP: Duration = Duration::from_millis(250);
const MAX_DELAY: Duration = Duration::from_secs(5);
const QUIET_AFTER: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct ThrottleState {
    active: bool,
    delay: Duration,
    last_trigger: Option<Instant>,
}

/// Adaptive request pacing driven by throttle-indicating status codes.
#[derive(Debug)]
pub struct AutoThrottle {
    trigger_codes: HashSet<u16>,
    state: Mutex<ThrottleState>,
}

impl AutoThrottle {
    /// Throttle armed by any status in `trigger_codes` (typically 429/503).
    #[must_use]
    pub fn new(trigger_codes: HashSet<u16>) -> Self {
        Self {
            trigger_codes,
            state: Mutex::new(ThrottleState { active: false, delay: BASE_DELAY, last_trigger: None }),
        }
    }

    /// Feed an observed status code.
    pub fn observe(&self, status: u16) {
        if !self.trigger_codes.contains(&status) {
            return;
        }
        let Ok(mut state) = self.state.lock() else { return };
        if state.active {
            state.delay = (state.delay + STEP).min(MAX_DELAY);
        } else {
            state.active = true;
            state.delay = BASE_DELAY;
        }
        state.last_trigger = Some(Instant::now());
        tracing::debug!(status, delay_ms = state.delay.as_millis() as u64, "auto-throttle armed");
    }

    /// Delay to inject before the next request, if the throttle is armed.
    /// Disarms itself after a quiet period.
    #[must_use]
    pub fn current_delay(&self) -> Option<Duration> {
        let Ok(mut state) = self.state.lock() else { return None };
        if !state.active {
            return None;
        }
        match state.last_trigger {
            Some(last) if last.elapsed() >= QUIET_AFTER => {
                state.active = false;
                state.last_trigger = None;
                tracing::debug!("auto-throttle disarmed after quiet period");
                None
            },
            _ => Some(state.delay),
        }
    }
}

//! Simulated "peer is typing" presence
//!
//! The delay is a presentation heuristic: a fixed base plus a per-character
//! factor, capped so long messages don't stall playback.

use std::time::Duration;

/// Tunable coefficients for the simulated typing delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingConfig {
    pub base: Duration,
    pub per_char: Duration,
    pub max: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            per_char: Duration::from_millis(20),
            max: Duration::from_secs(4),
        }
    }
}

/// Computes and waits out typing delays
#[derive(Debug, Clone, Copy, Default)]
pub struct TypingSimulator {
    config: TypingConfig,
}

impl TypingSimulator {
    pub fn new(config: TypingConfig) -> Self {
        Self { config }
    }

    /// Delay for a message of this length: `base + per_char * chars`, capped at `max`
    pub fn delay_for(&self, text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        self.config
            .base
            .saturating_add(self.config.per_char.saturating_mul(chars))
            .min(self.config.max)
    }

    /// Suspend the calling task for the simulated typing time of `text`
    pub async fn simulate_delay(&self, text: &str) {
        tokio::time::sleep(self.delay_for(text)).await;
    }
}

/// Process-local typing flag. `show`/`hide` are idempotent and report
/// whether the value actually changed.
#[derive(Debug, Default)]
pub struct TypingSignal {
    active: bool,
}

impl TypingSignal {
    pub fn show(&mut self) -> bool {
        let changed = !self.active;
        self.active = true;
        changed
    }

    pub fn hide(&mut self) -> bool {
        let changed = self.active;
        self.active = false;
        changed
    }
}

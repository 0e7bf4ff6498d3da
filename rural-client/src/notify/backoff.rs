//! Délais de reconnexion

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Paramètres du canal de notifications
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Nombre maximal de reconnexions consécutives
    pub max_attempts: u32,

    /// Délai de base (multiplié par 2^tentative)
    pub base_delay_ms: u64,

    /// Plafond du délai
    pub max_delay_ms: u64,

    /// Topic souscrit à chaque ouverture
    pub topic: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            topic: "analysis.completed".into(),
        }
    }
}

/// Compteur de tentatives avec délai exponentiel `min(base * 2^n, max)`
#[derive(Debug, Clone)]
pub struct Backoff {
    attempts: u32,
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl Backoff {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            attempts: 0,
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Incrémente le compteur puis retourne le délai avant la prochaine
    /// tentative, ou `None` une fois le plafond de tentatives atteint
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;

        let factor = 2u64.checked_pow(self.attempts).unwrap_or(u64::MAX);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Some(Duration::from_millis(delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let mut backoff = Backoff::new(&ChannelConfig::default());
        let delays: Vec<u128> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_millis())
            .collect();

        assert_eq!(delays, vec![2_000, 4_000, 8_000, 16_000, 30_000]);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = Backoff::new(&ChannelConfig::default());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(2_000)));
    }

    #[test]
    fn test_large_attempt_counts_saturate() {
        let config = ChannelConfig {
            max_attempts: 100,
            ..Default::default()
        };
        let mut backoff = Backoff::new(&config);
        let last = std::iter::from_fn(|| backoff.next_delay()).last();
        assert_eq!(last, Some(Duration::from_millis(30_000)));
    }
}

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// How values received from a controller reach the other controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriggerMode {
    /// Every change is written to the siblings as soon as it arrives
    None,
    /// Changes are held back and exchanged in batches every `interval_ms`
    Scheduled { interval_ms: u64 },
}

/// Exchange policy attached to global tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTrigger {
    name: String,
    mode: TriggerMode,
}

impl DataTrigger {
    pub fn immediate(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: TriggerMode::None,
        }
    }

    pub fn scheduled(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            mode: TriggerMode::Scheduled {
                interval_ms: interval.as_millis() as u64,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.mode, TriggerMode::None)
    }

    pub fn interval(&self) -> Option<Duration> {
        match self.mode {
            TriggerMode::None => None,
            TriggerMode::Scheduled { interval_ms } => Some(Duration::from_millis(interval_ms)),
        }
    }

    /// Delay before the next sweep: what is left of `interval` after a
    /// sweep that ran from `start` to `end`, never negative.
    pub fn calculate_next_start_time(start: Instant, end: Instant, interval: Duration) -> Duration {
        interval.saturating_sub(end.saturating_duration_since(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_start_time_subtracts_sweep_duration() {
        let start = Instant::now();
        let end = start + Duration::from_millis(300);
        assert_eq!(
            DataTrigger::calculate_next_start_time(start, end, Duration::from_secs(1)),
            Duration::from_millis(700)
        );
    }

    #[test]
    fn test_next_start_time_never_negative() {
        let start = Instant::now();
        let end = start + Duration::from_millis(1500);
        assert_eq!(
            DataTrigger::calculate_next_start_time(start, end, Duration::from_secs(1)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_modes() {
        let none = DataTrigger::immediate("Direct");
        assert!(none.is_immediate());
        assert_eq!(none.interval(), None);

        let scheduled = DataTrigger::scheduled("Every2s", Duration::from_secs(2));
        assert!(!scheduled.is_immediate());
        assert_eq!(scheduled.interval(), Some(Duration::from_secs(2)));
        assert_eq!(
            scheduled.mode(),
            TriggerMode::Scheduled { interval_ms: 2000 }
        );
    }
}

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, warn};

use domain::service::{Feature, FeatureActivationService};
use domain::{DomainError, Result};
use infrastructure::PollLimits;

/// Decides which poll intervals the target hardware may use.
pub struct PollIntervalPolicy {
    limits: PollLimits,
    target_model: String,
    features: Arc<dyn FeatureActivationService>,
}

impl PollIntervalPolicy {
    pub fn new(
        limits: PollLimits,
        target_model: impl Into<String>,
        features: Arc<dyn FeatureActivationService>,
    ) -> Self {
        Self {
            limits,
            target_model: target_model.into(),
            features,
        }
    }

    pub fn limits(&self) -> &PollLimits {
        &self.limits
    }

    pub fn target_model(&self) -> &str {
        &self.target_model
    }

    /// Intervals below the normal minimum need fast logging on an
    /// allowed model.
    pub fn fast_logging_allowed(&self) -> bool {
        self.features.is_feature_enabled(Feature::FastLogging)
            && self
                .limits
                .fast_log_models
                .iter()
                .any(|m| m == &self.target_model)
    }

    pub fn validate(&self, interval_ms: u64) -> Result<()> {
        let limits = &self.limits;
        if (limits.min_interval_ms..=limits.max_interval_ms).contains(&interval_ms) {
            return Ok(());
        }
        if interval_ms >= limits.fast_log_min_interval_ms
            && interval_ms < limits.min_interval_ms
            && self.fast_logging_allowed()
        {
            return Ok(());
        }

        let min = if self.fast_logging_allowed() {
            limits.fast_log_min_interval_ms
        } else {
            limits.min_interval_ms
        };
        Err(DomainError::InvalidArgument(format!(
            "Poll interval {interval_ms} ms outside {min}..={} ms on {}",
            limits.max_interval_ms, self.target_model
        )))
    }
}

impl std::fmt::Debug for PollIntervalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollIntervalPolicy")
            .field("limits", &self.limits)
            .field("target_model", &self.target_model)
            .finish()
    }
}

/// Named poll rate shared by the tags assigned to it.
pub struct PollGroup {
    name: String,
    interval_ms: RwLock<u64>,
    policy: Arc<PollIntervalPolicy>,
}

impl PollGroup {
    pub fn new(
        name: impl Into<String>,
        interval_ms: u64,
        policy: Arc<PollIntervalPolicy>,
    ) -> Result<Self> {
        policy.validate(interval_ms)?;
        Ok(Self {
            name: name.into(),
            interval_ms: RwLock::new(interval_ms),
            policy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval_ms(&self) -> u64 {
        *self.interval_ms.read()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// Keeps the current interval when `interval_ms` is rejected.
    pub fn set_interval(&self, interval_ms: u64) -> Result<()> {
        if let Err(e) = self.policy.validate(interval_ms) {
            warn!(poll_group = %self.name, interval_ms, error = %e, "Poll interval rejected");
            return Err(e);
        }
        *self.interval_ms.write() = interval_ms;
        debug!(poll_group = %self.name, interval_ms, "Poll interval changed");
        Ok(())
    }
}

impl std::fmt::Debug for PollGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollGroup")
            .field("name", &self.name)
            .field("interval_ms", &self.interval_ms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::ConfiguredFeatures;

    fn policy(model: &str, fast_logging: bool) -> Arc<PollIntervalPolicy> {
        let features = ConfiguredFeatures::new();
        if fast_logging {
            features.enable(Feature::FastLogging);
        }
        Arc::new(PollIntervalPolicy::new(
            PollLimits::default(),
            model,
            Arc::new(features),
        ))
    }

    #[test]
    fn normal_band_is_always_accepted() {
        let policy = policy("Panel PP886M", false);
        assert!(policy.validate(100).is_ok());
        assert!(policy.validate(3_600_000).is_ok());
        assert!(policy.validate(99).is_err());
        assert!(policy.validate(3_600_001).is_err());
    }

    #[test]
    fn fast_interval_needs_feature_and_model() {
        assert!(policy("Panel PP886M", true).validate(50).is_err());
        assert!(policy("Panel PP886H", false).validate(50).is_err());
        assert!(policy("Panel PP886H", true).validate(50).is_ok());
        assert!(policy("Panel PP886H", true).validate(10).is_ok());
        assert!(policy("Panel PP886H", true).validate(9).is_err());
    }

    #[test]
    fn rejected_interval_keeps_previous() {
        let group = PollGroup::new("Fast", 500, policy("Panel PP886M", true)).unwrap();

        let err = group.set_interval(50).unwrap_err();

        assert!(err.is_argument_error());
        assert_eq!(group.interval_ms(), 500);
        group.set_interval(250).unwrap();
        assert_eq!(group.interval(), Duration::from_millis(250));
    }
}

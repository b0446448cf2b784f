use std::collections::HashSet;

use domain::service::{Feature, FeatureActivationService};
use parking_lot::RwLock;

use crate::config::FeaturesConfig;

/// Feature activation read from the runtime configuration.
#[derive(Debug, Default)]
pub struct ConfiguredFeatures {
    enabled: RwLock<HashSet<Feature>>,
}

impl ConfiguredFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FeaturesConfig) -> Self {
        let features = Self::new();
        if config.fast_logging {
            features.enable(Feature::FastLogging);
        }
        features
    }

    pub fn enable(&self, feature: Feature) {
        self.enabled.write().insert(feature);
    }

    pub fn disable(&self, feature: Feature) {
        self.enabled.write().remove(&feature);
    }
}

impl FeatureActivationService for ConfiguredFeatures {
    fn is_feature_enabled(&self, feature: Feature) -> bool {
        self.enabled.read().contains(&feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_logging_follows_config() {
        let off = ConfiguredFeatures::from_config(&FeaturesConfig::default());
        assert!(!off.is_feature_enabled(Feature::FastLogging));

        let on = ConfiguredFeatures::from_config(&FeaturesConfig { fast_logging: true });
        assert!(on.is_feature_enabled(Feature::FastLogging));
        on.disable(Feature::FastLogging);
        assert!(!on.is_feature_enabled(Feature::FastLogging));
    }
}

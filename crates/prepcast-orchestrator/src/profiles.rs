use crate::types::{PipelineConfig, StrategyKind};
use prepcast_steps::StepConfig;
use serde_json::json;
use std::collections::BTreeMap;

/// Step name of the context-mining step tuned by the strategies.
pub const REASONING_STEP: &str = "reasoning_extraction";
/// Step name of the explanation-generation step tuned by the strategies.
pub const GENERATION_STEP: &str = "llm_processing";

/// Strategy → per-step configuration table used by the plan phase.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyProfiles {
    profiles: BTreeMap<StrategyKind, PipelineConfig>,
}

impl StrategyProfiles {
    /// A table with no strategies. Planning against it fails.
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Install or replace the pipeline config of one strategy.
    pub fn set(&mut self, kind: StrategyKind, config: PipelineConfig) {
        self.profiles.insert(kind, config);
    }

    /// Overlay step settings onto a strategy, key by key.
    pub fn merge_step(&mut self, kind: StrategyKind, step: &str, settings: StepConfig) {
        let entry = self
            .profiles
            .entry(kind)
            .or_default()
            .entry(step.to_string())
            .or_default();
        for (key, value) in settings {
            entry.insert(key, value);
        }
    }

    pub fn config_for(&self, kind: StrategyKind) -> Option<&PipelineConfig> {
        self.profiles.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        self.profiles.keys().copied()
    }
}

impl Default for StrategyProfiles {
    fn default() -> Self {
        let mut profiles = Self::empty();
        profiles.set(StrategyKind::Quality, profile("enhanced", 15, 0.2, 1000));
        profiles.set(StrategyKind::Balanced, profile("standard", 10, 0.5, 750));
        profiles.set(StrategyKind::Performance, profile("basic", 5, 0.7, 500));
        profiles
    }
}

fn profile(depth: &str, search_timeout: u64, temperature: f64, max_tokens: u64) -> PipelineConfig {
    let mut reasoning = StepConfig::new();
    reasoning.insert("depth".into(), json!(depth));
    reasoning.insert("search_timeout".into(), json!(search_timeout));

    let mut generation = StepConfig::new();
    generation.insert("temperature".into(), json!(temperature));
    generation.insert("max_tokens".into(), json!(max_tokens));

    let mut config = PipelineConfig::new();
    config.insert(REASONING_STEP.to_string(), reasoning);
    config.insert(GENERATION_STEP.to_string(), generation);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles_cover_every_strategy() {
        let profiles = StrategyProfiles::default();
        assert_eq!(profiles.kinds().count(), 3);

        let quality = profiles.config_for(StrategyKind::Quality).unwrap();
        assert_eq!(quality[REASONING_STEP]["depth"], "enhanced");
        assert_eq!(quality[GENERATION_STEP]["temperature"], 0.2);

        let fast = profiles.config_for(StrategyKind::Performance).unwrap();
        assert_eq!(fast[REASONING_STEP]["depth"], "basic");
        assert_eq!(fast[GENERATION_STEP]["max_tokens"], 500);
    }

    #[test]
    fn test_merge_step_overlays_keys() {
        let mut profiles = StrategyProfiles::default();
        let mut settings = StepConfig::new();
        settings.insert("max_tokens".into(), json!(2000));
        profiles.merge_step(StrategyKind::Quality, GENERATION_STEP, settings);

        let quality = profiles.config_for(StrategyKind::Quality).unwrap();
        assert_eq!(quality[GENERATION_STEP]["max_tokens"], 2000);
        assert_eq!(quality[GENERATION_STEP]["temperature"], 0.2);
    }

    #[test]
    fn test_empty_has_no_strategies() {
        let profiles = StrategyProfiles::empty();
        assert!(profiles.config_for(StrategyKind::Balanced).is_none());
    }
}

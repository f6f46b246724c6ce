use crate::step::{Step, StepConfig};
use parking_lot::Mutex;
use prepcast_core::{PrepcastError, PrepcastResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds a step instance from its registered name and a configuration.
pub type StepFactory =
    Arc<dyn Fn(&str, StepConfig) -> PrepcastResult<Arc<dyn Step>> + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    factories: HashMap<String, StepFactory>,
    /// Registration order of `factories` keys.
    order: Vec<String>,
    /// At most one default-configured instance per name.
    defaults: HashMap<String, Arc<dyn Step>>,
}

/// Central registry mapping step names to factories.
///
/// Default-configured instances are cached and shared; configured instances
/// are always built fresh and never cached. One lock guards the
/// check-cache-else-construct-and-insert sequence, so concurrent default
/// requests for the same name never construct twice.
pub struct StepRegistry {
    state: Mutex<RegistryState>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Install or replace the factory for `name`.
    ///
    /// Replacing a factory drops the cached default instance built by the old
    /// one. Configured instances already handed out are not tracked.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&str, StepConfig) -> PrepcastResult<Arc<dyn Step>> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut state = self.state.lock();
        let replaced = state
            .factories
            .insert(name.clone(), Arc::new(factory))
            .is_some();
        if replaced {
            state.defaults.remove(&name);
            info!(step = %name, "Re-registered step, cached instance invalidated");
        } else {
            state.order.push(name.clone());
            info!(step = %name, "Registered step");
        }
    }

    /// Obtain a step instance.
    ///
    /// `None` (or an empty map) returns the cached default instance, building
    /// and caching it on first use. A non-empty config always builds a new
    /// instance that is not cached.
    pub fn create(&self, name: &str, config: Option<StepConfig>) -> PrepcastResult<Arc<dyn Step>> {
        match config.filter(|c| !c.is_empty()) {
            None => {
                let mut state = self.state.lock();
                if let Some(step) = state.defaults.get(name) {
                    return Ok(step.clone());
                }
                let factory = Self::lookup(&state, name)?;
                let step = factory(name, StepConfig::new())?;
                state.defaults.insert(name.to_string(), step.clone());
                debug!(step = %name, "Cached default step instance");
                Ok(step)
            }
            Some(config) => {
                let factory = Self::lookup(&self.state.lock(), name)?;
                debug!(step = %name, "Building configured step instance");
                factory(name, config)
            }
        }
    }

    fn lookup(state: &RegistryState, name: &str) -> PrepcastResult<StepFactory> {
        state.factories.get(name).cloned().ok_or_else(|| {
            warn!(step = %name, "Step not found");
            PrepcastError::StepNotFound(name.to_string())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().factories.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn list_names(&self) -> Vec<String> {
        self.state.lock().order.clone()
    }

    pub fn step_count(&self) -> usize {
        self.state.lock().factories.len()
    }

    /// Number of cached default instances.
    pub fn cached_count(&self) -> usize {
        self.state.lock().defaults.len()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::FnStep;
    use prepcast_core::{Context, Outcome};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tagged(tag: &'static str) -> impl Fn(&str, StepConfig) -> PrepcastResult<Arc<dyn Step>> {
        move |name: &str, config: StepConfig| {
            Ok(Arc::new(FnStep::new(name, config, move |_, _| {
                Outcome::success(Context::new()).with_value("tag", json!(tag))
            })) as Arc<dyn Step>)
        }
    }

    fn config(key: &str, value: serde_json::Value) -> StepConfig {
        let mut c = StepConfig::new();
        c.insert(key.to_string(), value);
        c
    }

    #[test]
    fn test_register_and_list() {
        let registry = StepRegistry::new();
        registry.register("select", tagged("a"));
        registry.register("explain", tagged("b"));
        registry.register("select", tagged("c"));

        assert_eq!(registry.list_names(), vec!["select", "explain"]);
        assert_eq!(registry.step_count(), 2);
        assert!(registry.contains("explain"));
        assert!(!registry.contains("render"));
    }

    #[test]
    fn test_create_unknown_is_not_found() {
        let registry = StepRegistry::new();
        let err = registry.create("render", None).err().unwrap();
        assert!(matches!(err, PrepcastError::StepNotFound(name) if name == "render"));
    }

    #[test]
    fn test_default_instance_is_cached() {
        let registry = StepRegistry::new();
        registry.register("select", tagged("a"));

        let first = registry.create("select", None).unwrap();
        let second = registry.create("select", None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cached_count(), 1);
    }

    #[test]
    fn test_empty_config_uses_default_instance() {
        let registry = StepRegistry::new();
        registry.register("select", tagged("a"));

        let default = registry.create("select", None).unwrap();
        let empty = registry.create("select", Some(StepConfig::new())).unwrap();
        assert!(Arc::ptr_eq(&default, &empty));
    }

    #[test]
    fn test_configured_instances_are_fresh_and_uncached() {
        let registry = StepRegistry::new();
        registry.register("explain", tagged("a"));

        let default = registry.create("explain", None).unwrap();
        let hot = registry
            .create("explain", Some(config("temperature", json!(0.7))))
            .unwrap();
        let cold = registry
            .create("explain", Some(config("temperature", json!(0.2))))
            .unwrap();

        assert!(!Arc::ptr_eq(&default, &hot));
        assert!(!Arc::ptr_eq(&hot, &cold));
        assert_eq!(hot.config()["temperature"], json!(0.7));
        assert_eq!(registry.cached_count(), 1);
        assert!(Arc::ptr_eq(&default, &registry.create("explain", None).unwrap()));
    }

    #[tokio::test]
    async fn test_reregistration_invalidates_cached_instance() {
        let registry = StepRegistry::new();
        registry.register("select", tagged("old"));
        let stale = registry.create("select", None).unwrap();

        registry.register("select", tagged("new"));
        assert_eq!(registry.cached_count(), 0);

        let fresh = registry.create("select", None).unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        let out = fresh.execute(&Context::new()).await;
        assert_eq!(out.data()["tag"], "new");
    }

    #[test]
    fn test_factory_error_is_propagated_and_not_cached() {
        let registry = StepRegistry::new();
        registry.register("render", |name: &str, _config: StepConfig| {
            Err(PrepcastError::StepConstruction {
                name: name.to_string(),
                reason: "no output dir".to_string(),
            })
        });
        assert!(matches!(
            registry.create("render", None),
            Err(PrepcastError::StepConstruction { .. })
        ));
        assert_eq!(registry.cached_count(), 0);
    }

    #[test]
    fn test_concurrent_default_creation_builds_once() {
        let registry = Arc::new(StepRegistry::new());
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        registry.register("select", move |name: &str, config: StepConfig| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(Arc::new(FnStep::new(name, config, |_, _| Outcome::success(Context::new())))
                as Arc<dyn Step>)
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.create("select", None).unwrap())
            })
            .collect();
        let steps: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(steps.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_concurrent_configured_creation_never_shares() {
        let registry = Arc::new(StepRegistry::new());
        registry.register("explain", tagged("a"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry
                        .create("explain", Some(config("max_tokens", json!(100 + i))))
                        .unwrap()
                })
            })
            .collect();
        let steps: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for (i, a) in steps.iter().enumerate() {
            for b in &steps[i + 1..] {
                assert!(!Arc::ptr_eq(a, b));
            }
        }
        assert_eq!(registry.cached_count(), 0);
    }
}

//! Step contract and registry.
//!
//! A step is a named, independently configurable unit of processing. Steps are
//! built on demand by factories held in a [`StepRegistry`], which caches one
//! default-configured instance per name and builds a fresh, uncached instance
//! whenever explicit configuration is supplied.

/// Name → factory table with default-instance caching.
pub mod registry;
/// The `Step` trait and helpers for implementing it.
pub mod step;

pub use registry::{StepFactory, StepRegistry};
pub use step::{missing_keys, FnStep, Step, StepConfig, StepDescriptor};

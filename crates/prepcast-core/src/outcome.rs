use serde::Serialize;
use serde_json::{Map, Value};

/// The mapping threaded through a pipeline run.
///
/// Backed by `serde_json::Map` with `preserve_order`, so keys iterate in
/// insertion order and a later insert of an existing key overwrites in place.
pub type Context = Map<String, Value>;

/// Uniform result envelope returned by every step and by the engine itself.
///
/// Fields are private so that `error` can only be set on a failing outcome.
/// A failing outcome without an error message is representable (some steps
/// report failure without a cause) but discouraged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    success: bool,
    data: Context,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    metadata: Map<String, Value>,
}

impl Outcome {
    /// A successful outcome carrying `data`.
    pub fn success(data: Context) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: Map::new(),
        }
    }

    /// A failing outcome with an error message and no data.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Context::new(),
            error: Some(error.into()),
            metadata: Map::new(),
        }
    }

    /// A failing outcome that reports no cause.
    pub fn silent_failure() -> Self {
        Self {
            success: false,
            ..Self::default()
        }
    }

    /// Precondition failure for a step that needs keys absent from its context.
    pub fn missing_keys(missing: &[&str]) -> Self {
        Self::failure(format!("missing required keys: {}", missing.join(", ")))
    }

    /// Replace the data map.
    pub fn with_data(mut self, data: Context) -> Self {
        self.data = data;
        self
    }

    /// Insert a single data entry.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Insert a single metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the producer reported success.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The data map (for a pipeline: the accumulated context).
    pub fn data(&self) -> &Context {
        &self.data
    }

    /// The error message, present only on failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Diagnostic and strategic annotations.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Mutable access to metadata, for layers that annotate an inner result.
    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.metadata
    }

    /// Consume the outcome, keeping only its data.
    pub fn into_data(self) -> Context {
        self.data
    }
}

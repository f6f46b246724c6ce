use prepcast_core::{Context, Outcome, Question};
use prepcast_steps::missing_keys;
use serde_json::Value;

/// Check `required` and decode the `question` key.
///
/// Returns the failing outcome the step should report when a key is missing
/// or the question does not decode.
pub(crate) fn question_input(context: &Context, required: &[&str]) -> Result<Question, Outcome> {
    let missing = missing_keys(context, required);
    if !missing.is_empty() {
        return Err(Outcome::missing_keys(&missing));
    }
    let raw = context.get("question").cloned().unwrap_or(Value::Null);
    serde_json::from_value(raw).map_err(|e| Outcome::failure(format!("invalid question data: {e}")))
}

/// A string-valued context key, or empty.
pub(crate) fn text<'a>(context: &'a Context, key: &str) -> &'a str {
    context.get(key).and_then(Value::as_str).unwrap_or_default()
}
